//! `AccountStore` trait — async interface to the account document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::onboarding::model::{AccountRecord, AccountStatus, Partition, ProfileDetails};

/// Outcome of a create-if-absent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record already exists under this (partition, uid).
    KeyTaken,
    /// Another record, in any partition, already owns the email.
    EmailTaken,
}

/// Field-equality predicates supported by [`AccountStore::query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Matches the normalized email.
    Email(String),
    /// Matches the lifecycle status; `None` selects records without one.
    Status(Option<AccountStatus>),
}

/// Guarded multi-field writes. Each variant is applied in a single statement
/// and only when the record is in the state the variant expects.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountUpdate {
    /// Write the profile and move to `pending`. Requires status absent or
    /// `profile_pending`.
    SubmitProfile {
        profile: ProfileDetails,
        completed_at: DateTime<Utc>,
    },
    /// Move `pending` to `approved`.
    Approve,
}

/// Backend-agnostic account store.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Fetch the record stored under (partition, uid).
    async fn get(&self, partition: Partition, uid: &str)
    -> Result<Option<AccountRecord>, DatabaseError>;

    /// Insert a record unless its key or email is already taken.
    async fn create(&self, record: &AccountRecord) -> Result<CreateOutcome, DatabaseError>;

    /// Apply a guarded update. Returns `false` when the record is missing or
    /// not in the expected state; nothing is written in that case.
    async fn update(
        &self,
        partition: Partition,
        uid: &str,
        update: &AccountUpdate,
    ) -> Result<bool, DatabaseError>;

    /// List records in a partition matching `filter`, oldest first.
    async fn query(
        &self,
        partition: Partition,
        filter: &AccountFilter,
    ) -> Result<Vec<AccountRecord>, DatabaseError>;
}
