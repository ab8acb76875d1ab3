//! Domain model for owners and their card options.
//!
//! # Responsibility
//! - Define the records persisted in the `User` and `CardOption` tables.
//!
//! # Invariants
//! - Every card option belongs to exactly one user.
//! - Per user, at most one card option is flagged as default at any
//!   committed point in time.

pub mod card_option;
pub mod user;
