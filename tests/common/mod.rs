//! Shared fixtures: a scripted identity provider and a store wrapper that
//! counts writes and can be told to fail them.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use campus_transit::error::{DatabaseError, IdentityError};
use campus_transit::identity::{Identity, IdentityProvider};
use campus_transit::onboarding::{AccountRecord, Partition, ProfileForm};
use campus_transit::store::{AccountFilter, AccountStore, AccountUpdate, CreateOutcome, LibSqlStore};

/// Identity provider that resolves credentials from a fixed table.
pub struct ScriptedProvider {
    identities: HashMap<String, Identity>,
    signed_out: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            identities: HashMap::new(),
            signed_out: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, credential: &str, identity: Identity) -> Self {
        self.identities.insert(credential.to_string(), identity);
        self
    }

    pub fn sign_outs(&self) -> Vec<String> {
        self.signed_out.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn sign_in(&self, credential: &str) -> Result<Identity, IdentityError> {
        if credential == "cancel" {
            return Err(IdentityError::Cancelled {
                provider: "scripted".into(),
            });
        }
        self.identities
            .get(credential)
            .cloned()
            .ok_or_else(|| IdentityError::Rejected {
                provider: "scripted".into(),
                reason: "unknown credential".into(),
            })
    }

    async fn sign_out(&self, uid: &str) -> Result<(), IdentityError> {
        self.signed_out.lock().unwrap().push(uid.to_string());
        Ok(())
    }
}

/// Wraps the libSQL store, counting writes and optionally rejecting updates.
pub struct CountingStore {
    pub inner: LibSqlStore,
    writes: AtomicUsize,
    fail_updates: AtomicBool,
    /// Written straight to `inner` just before the next `create`.
    interloper: Mutex<Option<AccountRecord>>,
}

impl CountingStore {
    pub async fn new() -> Self {
        Self {
            inner: LibSqlStore::new_memory().await.unwrap(),
            writes: AtomicUsize::new(0),
            fail_updates: AtomicBool::new(false),
            interloper: Mutex::new(None),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Simulate another writer landing `record` between the manager's
    /// checks and its `create`.
    pub fn create_first(&self, record: AccountRecord) {
        *self.interloper.lock().unwrap() = Some(record);
    }
}

#[async_trait]
impl AccountStore for CountingStore {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        self.inner.init_schema().await
    }

    async fn get(
        &self,
        partition: Partition,
        uid: &str,
    ) -> Result<Option<AccountRecord>, DatabaseError> {
        self.inner.get(partition, uid).await
    }

    async fn create(&self, record: &AccountRecord) -> Result<CreateOutcome, DatabaseError> {
        let interloper = self.interloper.lock().unwrap().take();
        if let Some(other) = interloper {
            self.inner.create(&other).await?;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(record).await
    }

    async fn update(
        &self,
        partition: Partition,
        uid: &str,
        update: &AccountUpdate,
    ) -> Result<bool, DatabaseError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DatabaseError::Query("network unreachable".into()));
        }
        self.inner.update(partition, uid, update).await
    }

    async fn query(
        &self,
        partition: Partition,
        filter: &AccountFilter,
    ) -> Result<Vec<AccountRecord>, DatabaseError> {
        self.inner.query(partition, filter).await
    }
}

pub fn jane() -> Identity {
    Identity {
        uid: "google-jane".into(),
        email: "a@x.com".into(),
        display_name: "Jane Doe".into(),
        photo_url: None,
        email_verified: true,
        provider: "google".into(),
    }
}

pub fn full_profile() -> ProfileForm {
    ProfileForm {
        father_name: Some("J".into()),
        cnic: Some("12345-1234567-1".into()),
        dob: Some("2000-01-01".into()),
        phone: Some("0300".into()),
        user_type: Some("student".into()),
        payment_method: Some("monthly".into()),
    }
}
