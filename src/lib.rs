//! Trendwatch: persistent keyword watch tasks with exclusive report runs.
//!
//! Users register watch tasks (keywords, exclusion filters, platform scope,
//! report cadence) and execute them on demand or as ad hoc searches. Each
//! run temporarily repoints the report pipeline's shared configuration,
//! delegates fetching and rendering, restores the configuration, and
//! records an audit entry.
//!
//! # Architecture
//!
//! Trendwatch follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, files, HTTP)
//!
//! # Modules
//!
//! - [`task`]: Users, watch tasks, and execution history
//! - [`run`]: Run exclusivity, configuration override, and result ranking
//! - [`config`]: Process configuration

pub mod config;
pub mod run;
pub mod task;
