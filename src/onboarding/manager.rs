//! OnboardingManager — coordinates identity sign-in, account creation,
//! profile submission, and step routing.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{DatabaseError, OnboardingError};
use crate::identity::{Identity, IdentityProvider, Session};
use crate::store::{AccountFilter, AccountStore, AccountUpdate, CreateOutcome};

use super::model::{AccountRecord, Partition, ProfileForm, normalize_email};
use super::state::{OnboardingStep, route_existing};

/// Result of a successful onboarding operation.
#[derive(Debug, Clone)]
pub struct Transition {
    /// Step the user should see next.
    pub step: OnboardingStep,
    /// Present when the step keeps the user signed in.
    pub session: Option<Session>,
    /// The account as stored after the operation.
    pub account: Option<AccountRecord>,
    /// Short user-facing message.
    pub notice: String,
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient notification for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// What the presentation layer renders after any onboarding operation,
/// success or failure.
#[derive(Debug, Clone, Serialize)]
pub struct FlowEvent {
    pub step: OnboardingStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountRecord>,
    pub notice: Notice,
}

impl From<Transition> for FlowEvent {
    fn from(t: Transition) -> Self {
        Self {
            step: t.step,
            session_token: t.session.map(|s| s.id),
            account: t.account,
            notice: Notice {
                level: NoticeLevel::Info,
                message: t.notice,
            },
        }
    }
}

impl FlowEvent {
    /// An error notice that leaves the user on `step`.
    pub fn error(step: OnboardingStep, message: impl Into<String>) -> Self {
        Self {
            step,
            session_token: None,
            account: None,
            notice: Notice {
                level: NoticeLevel::Error,
                message: message.into(),
            },
        }
    }
}

impl From<&OnboardingError> for FlowEvent {
    fn from(err: &OnboardingError) -> Self {
        Self::error(err.stays_at(), err.to_string())
    }
}

/// Drives the onboarding flow for one sign-up partition.
pub struct OnboardingManager {
    store: Arc<dyn AccountStore>,
    provider: Arc<dyn IdentityProvider>,
    partition: Partition,
}

impl OnboardingManager {
    pub fn new(
        store: Arc<dyn AccountStore>,
        provider: Arc<dyn IdentityProvider>,
        partition: Partition,
    ) -> Self {
        Self {
            store,
            provider,
            partition,
        }
    }

    /// Sign in with a provider credential and decide the next step.
    ///
    /// 1. Verify the credential with the identity provider.
    /// 2. If an account exists for the identity, route on its status.
    /// 3. Otherwise check every partition for the email.
    /// 4. Create the account (`profile_pending`) and show the profile form.
    pub async fn sign_in(&self, credential: &str) -> Result<Transition, OnboardingError> {
        let identity = self.provider.sign_in(credential).await.map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Sign-in rejected");
            OnboardingError::Auth(e)
        })?;

        if let Some(record) = self.load(&identity.uid).await? {
            return Ok(self.route(identity, record).await);
        }

        self.ensure_email_free(&identity).await?;

        let record = AccountRecord::from_identity(&identity, self.partition, Utc::now());
        match self.store.create(&record).await.map_err(|e| self.storage_failure(e))? {
            CreateOutcome::Created => {
                info!(
                    partition = %self.partition,
                    uid = %record.uid,
                    username = %record.username,
                    "Account created, awaiting profile"
                );
                Ok(Transition {
                    step: OnboardingStep::ProfileForm,
                    session: Some(Session::new(self.partition, identity)),
                    account: Some(record),
                    notice: "Account created. Please complete your profile.".to_string(),
                })
            }
            CreateOutcome::KeyTaken => {
                // A concurrent sign-in created it first; route on what it wrote.
                let existing = self.load(&identity.uid).await?.ok_or_else(|| {
                    OnboardingError::Storage(DatabaseError::NotFound {
                        entity: "account".to_string(),
                        id: identity.uid.clone(),
                    })
                })?;
                Ok(self.route(identity, existing).await)
            }
            CreateOutcome::EmailTaken => Err(self.duplicate(&identity).await),
        }
    }

    /// Validate and store the profile, then end the session.
    ///
    /// The six fields and the `pending` status are written in one guarded
    /// update; on any failure nothing is written.
    pub async fn submit_profile(
        &self,
        session: &Session,
        form: &ProfileForm,
    ) -> Result<Transition, OnboardingError> {
        let profile = form.validate().map_err(|missing| {
            info!(uid = %session.identity.uid, ?missing, "Profile rejected, fields missing");
            OnboardingError::Validation { missing }
        })?;

        let uid = session.identity.uid.as_str();
        let update = AccountUpdate::SubmitProfile {
            profile,
            completed_at: Utc::now(),
        };

        let applied = self
            .store
            .update(session.partition, uid, &update)
            .await
            .map_err(|e| {
                warn!(uid, error = %e, "Profile write failed");
                OnboardingError::Submission {
                    reason: e.to_string(),
                }
            })?;

        if !applied {
            let reason = match self.store.get(session.partition, uid).await {
                Ok(Some(record)) => match record.status {
                    Some(status) => format!("profile already submitted (account is {status})"),
                    None => "account is not accepting a profile".to_string(),
                },
                Ok(None) => "account not found".to_string(),
                Err(e) => e.to_string(),
            };
            warn!(uid, %reason, "Profile write not applied");
            return Err(OnboardingError::Submission { reason });
        }

        info!(uid, "Profile submitted, awaiting approval");
        self.end_provider_session(uid).await;

        let account = self.store.get(session.partition, uid).await.unwrap_or_else(|e| {
            warn!(uid, error = %e, "Could not re-read account after submission");
            None
        });

        Ok(Transition {
            step: OnboardingStep::PendingApproval,
            session: None,
            account,
            notice: "Profile submitted. You can sign in once an administrator approves your account."
                .to_string(),
        })
    }

    /// Re-derive the step for a live session without writing anything.
    pub async fn resume(&self, session: &Session) -> Result<Transition, OnboardingError> {
        let record = self
            .store
            .get(session.partition, &session.identity.uid)
            .await
            .map_err(|e| self.storage_failure(e))?
            .ok_or_else(|| {
                OnboardingError::Storage(DatabaseError::NotFound {
                    entity: "account".to_string(),
                    id: session.identity.uid.clone(),
                })
            })?;

        let step = route_existing(&session.identity, &record);
        Ok(Transition {
            step,
            session: step.keeps_session().then(|| session.clone()),
            notice: notice_for(step).to_string(),
            account: Some(record),
        })
    }

    async fn load(&self, uid: &str) -> Result<Option<AccountRecord>, OnboardingError> {
        self.store
            .get(self.partition, uid)
            .await
            .map_err(|e| self.storage_failure(e))
    }

    /// Route an identity whose account already exists. Never writes; signs
    /// the provider session out when the step does not keep it.
    async fn route(&self, identity: Identity, record: AccountRecord) -> Transition {
        let step = route_existing(&identity, &record);
        info!(uid = %identity.uid, status = ?record.status, %step, "Returning account routed");

        let session = if step.keeps_session() {
            Some(Session::new(self.partition, identity))
        } else {
            self.end_provider_session(&identity.uid).await;
            None
        };

        Transition {
            step,
            session,
            notice: notice_for(step).to_string(),
            account: Some(record),
        }
    }

    /// Fail with `DuplicateAccount` if another account already holds the
    /// email. The identity's own record, created by a concurrent sign-in
    /// after `load`, is skipped and surfaces as `KeyTaken` instead.
    async fn ensure_email_free(&self, identity: &Identity) -> Result<(), OnboardingError> {
        let email = normalize_email(&identity.email);
        for partition in Partition::ALL {
            let matches = self
                .store
                .query(partition, &AccountFilter::Email(email.clone()))
                .await
                .map_err(|e| self.storage_failure(e))?;
            let taken = matches
                .iter()
                .any(|r| !(r.partition == self.partition && r.uid == identity.uid));
            if taken {
                info!(%partition, email = %email, "Email already registered");
                return Err(self.duplicate(identity).await);
            }
        }
        Ok(())
    }

    async fn duplicate(&self, identity: &Identity) -> OnboardingError {
        self.end_provider_session(&identity.uid).await;
        OnboardingError::DuplicateAccount {
            email: normalize_email(&identity.email),
        }
    }

    async fn end_provider_session(&self, uid: &str) {
        if let Err(e) = self.provider.sign_out(uid).await {
            warn!(uid, error = %e, "Provider sign-out failed");
        }
    }

    fn storage_failure(&self, e: DatabaseError) -> OnboardingError {
        warn!(partition = %self.partition, error = %e, "Account store unavailable");
        OnboardingError::Storage(e)
    }
}

fn notice_for(step: OnboardingStep) -> &'static str {
    match step {
        OnboardingStep::SignIn => "Please sign in.",
        OnboardingStep::ProfileForm => "Please complete your profile.",
        OnboardingStep::PendingApproval => "Your account is awaiting administrator approval.",
        OnboardingStep::VerifyEmail => "Please verify your email address before continuing.",
        OnboardingStep::Approved => "Welcome back.",
    }
}
