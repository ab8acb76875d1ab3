//! Core domain logic for cardopt.
//!
//! Users own card options; at most one card option per user is the default.
//! SQLite enforces that rule with a partial unique index, and the
//! default-switch service moves the flag between two rows atomically.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod tracking;

pub use config::{ConfigError, StoreConfig, StoreTarget};
pub use logging::{
    default_log_level, flush_logging, init_logging, init_stderr_logging, logging_status, LogSink,
};
pub use model::card_option::{CardOption, CardOptionId};
pub use model::user::{User, UserId};
pub use repo::card_option_repo::{
    CardOptionListQuery, CardOptionRepository, SqliteCardOptionRepository,
};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::default_switch::{
    plan_switch, DefaultSwitchService, PreconditionViolation, SwitchError, SwitchOutcome,
    SwitchPlan,
};
pub use service::owner_service::OwnerService;
pub use tracking::{diff_flags, FlagChange};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
