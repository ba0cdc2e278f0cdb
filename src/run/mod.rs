//! Exclusive execution of watch searches.
//!
//! A run expands its seed keywords, rewrites the report pipeline's shared
//! filter and settings documents, delegates fetching and rendering to the
//! pipeline, and restores the documents before the next run may start. Only
//! one run is active per process; concurrent requests are rejected rather
//! than queued. Link-list runs additionally match and rank the persisted
//! result sets against the expanded keywords.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
