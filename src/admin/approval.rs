//! Account approval — the only path from `pending` to `approved`.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::AdminError;
use crate::onboarding::model::{AccountRecord, AccountStatus, Partition};
use crate::store::{AccountFilter, AccountStore, AccountUpdate};

/// Administrative operations over the account store.
pub struct AccountAdmin {
    store: Arc<dyn AccountStore>,
}

impl AccountAdmin {
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self { store }
    }

    /// Accounts whose profile is submitted and awaiting review.
    pub async fn list_pending(&self, partition: Partition) -> Result<Vec<AccountRecord>, AdminError> {
        self.list(partition, Some(AccountStatus::Pending)).await
    }

    /// Accounts in `partition` with the given status (`None` = no status).
    pub async fn list(
        &self,
        partition: Partition,
        status: Option<AccountStatus>,
    ) -> Result<Vec<AccountRecord>, AdminError> {
        Ok(self
            .store
            .query(partition, &AccountFilter::Status(status))
            .await?)
    }

    /// Approve a pending account.
    pub async fn approve(&self, partition: Partition, uid: &str) -> Result<AccountRecord, AdminError> {
        if self.store.update(partition, uid, &AccountUpdate::Approve).await? {
            info!(%partition, uid, "Account approved");
            return self
                .store
                .get(partition, uid)
                .await?
                .ok_or_else(|| AdminError::NotFound {
                    partition: partition.to_string(),
                    uid: uid.to_string(),
                });
        }

        match self.store.get(partition, uid).await? {
            None => Err(AdminError::NotFound {
                partition: partition.to_string(),
                uid: uid.to_string(),
            }),
            Some(record) => {
                let state = record
                    .status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "without status".to_string());
                warn!(%partition, uid, %state, "Approval refused");
                Err(AdminError::InvalidTransition {
                    uid: uid.to_string(),
                    state,
                    target: AccountStatus::Approved.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::identity::Identity;
    use crate::onboarding::model::ProfileDetails;
    use crate::store::LibSqlStore;

    async fn setup() -> (Arc<LibSqlStore>, AccountAdmin) {
        let store = Arc::new(LibSqlStore::new_memory().await.unwrap());
        let admin = AccountAdmin::new(store.clone());
        (store, admin)
    }

    async fn seed(store: &LibSqlStore, uid: &str, email: &str, submit: bool) {
        let identity = Identity {
            uid: uid.into(),
            email: email.into(),
            display_name: "Student".into(),
            photo_url: None,
            email_verified: true,
            provider: "google".into(),
        };
        let record = AccountRecord::from_identity(&identity, Partition::Provider, Utc::now());
        store.create(&record).await.unwrap();
        if submit {
            let update = AccountUpdate::SubmitProfile {
                profile: ProfileDetails {
                    father_name: "F".into(),
                    cnic: "1".into(),
                    dob: "2001-02-03".into(),
                    phone: "0300".into(),
                    user_type: "faculty".into(),
                    payment_method: "semester".into(),
                },
                completed_at: Utc::now(),
            };
            assert!(store.update(Partition::Provider, uid, &update).await.unwrap());
        }
    }

    #[tokio::test]
    async fn approve_pending_account() {
        let (store, admin) = setup().await;
        seed(&store, "u1", "a@x.com", true).await;

        let pending = admin.list_pending(Partition::Provider).await.unwrap();
        assert_eq!(pending.len(), 1);

        let approved = admin.approve(Partition::Provider, "u1").await.unwrap();
        assert_eq!(approved.status, Some(AccountStatus::Approved));
        assert!(admin.list_pending(Partition::Provider).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cannot_approve_before_profile() {
        let (store, admin) = setup().await;
        seed(&store, "u1", "a@x.com", false).await;

        let err = admin.approve(Partition::Provider, "u1").await.unwrap_err();
        assert!(matches!(
            err,
            AdminError::InvalidTransition { ref state, .. } if state == "profile_pending"
        ));
    }

    #[tokio::test]
    async fn approving_twice_is_refused() {
        let (store, admin) = setup().await;
        seed(&store, "u1", "a@x.com", true).await;

        admin.approve(Partition::Provider, "u1").await.unwrap();
        let err = admin.approve(Partition::Provider, "u1").await.unwrap_err();
        assert!(matches!(err, AdminError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn approve_unknown_account() {
        let (_store, admin) = setup().await;
        let err = admin.approve(Partition::Provider, "nobody").await.unwrap_err();
        assert!(matches!(err, AdminError::NotFound { .. }));
    }
}
