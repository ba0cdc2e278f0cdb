//! Watch task lifecycle management.
//!
//! Users own named watch tasks (keywords, exclusion filters, platform scope,
//! report cadence). Every run of a stored task appends one execution record.
//! Only the owning user may mutate a task. The module follows hexagonal
//! architecture:
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
