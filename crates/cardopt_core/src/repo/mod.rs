//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories are only built over migrated connections.
//! - SQLite constraint rejections and connectivity failures surface as
//!   their own `RepoError` variants instead of opaque DB errors.

pub mod card_option_repo;
pub mod error;
mod guard;
pub mod user_repo;

pub use error::{RepoError, RepoResult};
