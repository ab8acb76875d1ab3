//! Owner fixture and inspection use cases.
//!
//! # Invariants
//! - `seed_owner` creates the user and all of its card options atomically;
//!   a seed with two defaults is rejected by storage and leaves no rows.

use crate::model::card_option::CardOption;
use crate::model::user::{User, UserId};
use crate::repo::card_option_repo::{CardOptionListQuery, CardOptionRepository};
use crate::repo::error::RepoResult;
use log::info;

/// Owner-level service facade.
pub struct OwnerService<R: CardOptionRepository> {
    repo: R,
}

impl<R: CardOptionRepository> OwnerService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates one user owning card options with the given default flags.
    pub fn seed_owner(&self, defaults: &[bool]) -> RepoResult<(User, Vec<CardOption>)> {
        let (user, options) = self.repo.create_owner(defaults)?;
        info!(
            "event=owner_seed module=service status=ok user_id={} card_options={}",
            user.id,
            options.len()
        );
        Ok((user, options))
    }

    /// Lists one user's card options ordered by id.
    pub fn card_options(&self, user_id: UserId) -> RepoResult<Vec<CardOption>> {
        self.repo
            .list_card_options(&CardOptionListQuery::for_user(user_id))
    }

    /// Returns the user's current default, if any.
    pub fn default_option(&self, user_id: UserId) -> RepoResult<Option<CardOption>> {
        let query = CardOptionListQuery {
            user_id: Some(user_id),
            defaults_only: true,
        };
        Ok(self.repo.list_card_options(&query)?.into_iter().next())
    }

    /// Lists users whose committed state breaks the single-default rule.
    ///
    /// Always empty while the partial unique index is in place.
    pub fn audit_defaults(&self) -> RepoResult<Vec<UserId>> {
        self.repo.owners_with_multiple_defaults()
    }
}
