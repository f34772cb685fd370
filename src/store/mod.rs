//! Data access for the four collections.
//!
//! Every diary, weight and custom-food operation takes an [`Owner`] and is
//! filtered by it, so a record belonging to someone else behaves exactly like
//! a missing one.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    auth::repo_types::{ProfileFields, User},
    diary::repo_types::{
        DiaryEntry, DiaryEntryPatch, DiaryFilter, NewDiaryEntry, NewWeightEntry, WeightEntry,
    },
    food::{
        dto::PopularFood,
        repo_types::{CustomFood, NewCustomFood},
    },
};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// The authenticated user on whose behalf a query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner(Uuid);

impl Owner {
    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl From<&User> for Owner {
    fn from(user: &User) -> Self {
        Owner(user.user_id)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field ("Username" or "Email") is already taken.
    #[error("{0} already registered")]
    Conflict(&'static str),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn update_user(
        &self,
        user_id: Uuid,
        patch: &ProfileFields,
        now: OffsetDateTime,
    ) -> StoreResult<Option<User>>;

    // diary entries
    async fn insert_diary_entry(
        &self,
        owner: &Owner,
        new: NewDiaryEntry,
        now: OffsetDateTime,
    ) -> StoreResult<DiaryEntry>;
    /// Newest first.
    async fn list_diary_entries(
        &self,
        owner: &Owner,
        filter: DiaryFilter,
    ) -> StoreResult<Vec<DiaryEntry>>;
    async fn find_diary_entry(
        &self,
        owner: &Owner,
        entry_id: Uuid,
    ) -> StoreResult<Option<DiaryEntry>>;
    async fn update_diary_entry(
        &self,
        owner: &Owner,
        entry_id: Uuid,
        patch: &DiaryEntryPatch,
        now: OffsetDateTime,
    ) -> StoreResult<Option<DiaryEntry>>;
    async fn delete_diary_entry(&self, owner: &Owner, entry_id: Uuid) -> StoreResult<bool>;
    /// The owner's diary grouped by `food_name`: most logged first, ties in
    /// first-seen order. Each group carries the earliest entry's `fdc_id`,
    /// `brand` and `nutrition` and the latest `created_at`.
    async fn popular_foods(&self, owner: &Owner, limit: i64) -> StoreResult<Vec<PopularFood>>;

    // custom foods
    async fn insert_custom_food(
        &self,
        owner: &Owner,
        new: NewCustomFood,
        now: OffsetDateTime,
    ) -> StoreResult<CustomFood>;
    /// Newest first.
    async fn list_custom_foods(&self, owner: &Owner) -> StoreResult<Vec<CustomFood>>;
    async fn delete_custom_food(&self, owner: &Owner, food_id: Uuid) -> StoreResult<bool>;

    // weight log
    async fn insert_weight_entry(
        &self,
        owner: &Owner,
        new: NewWeightEntry,
        now: OffsetDateTime,
    ) -> StoreResult<WeightEntry>;
    /// Most recent date first, at most `limit` entries.
    async fn list_weight_entries(&self, owner: &Owner, limit: i64) -> StoreResult<Vec<WeightEntry>>;
}
