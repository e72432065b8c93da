//! Core domain logic for the Tablefire restaurant floor.
//! This crate is the single source of truth for ordering, kitchen and
//! billing invariants.

pub mod auth;
pub mod db;
pub mod logging;
pub mod model;
pub mod provision;
pub mod realtime;
pub mod repo;
pub mod service;

pub use auth::session::Session;
pub use auth::AuthError;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use realtime::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeKind, LiveTable};
pub use repo::{RepoError, RepoResult};
pub use service::{ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
