//! Onboarding state machine — which step a user sees next.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

use super::model::{AccountRecord, AccountStatus};

/// The steps of the onboarding flow.
///
/// Progresses linearly: SignIn → ProfileForm → PendingApproval → Approved.
/// VerifyEmail is a side exit for legacy records whose email is unverified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    SignIn,
    ProfileForm,
    PendingApproval,
    VerifyEmail,
    Approved,
}

impl OnboardingStep {
    /// Whether this step ends the flow (the user is sent elsewhere).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Whether the user keeps an authenticated session on this step.
    pub fn keeps_session(&self) -> bool {
        matches!(self, Self::ProfileForm | Self::Approved)
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::SignIn
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SignIn => "sign_in",
            Self::ProfileForm => "profile_form",
            Self::PendingApproval => "pending_approval",
            Self::VerifyEmail => "verify_email",
            Self::Approved => "approved",
        };
        write!(f, "{s}")
    }
}

/// Route a signed-in identity with an existing record to its next step.
///
/// Reads only; never requires a write.
pub fn route_existing(identity: &Identity, record: &AccountRecord) -> OnboardingStep {
    match record.status {
        Some(AccountStatus::Approved) => OnboardingStep::Approved,
        Some(AccountStatus::Pending) => OnboardingStep::PendingApproval,
        Some(AccountStatus::ProfilePending) => OnboardingStep::ProfileForm,
        None if identity.email_verified => OnboardingStep::ProfileForm,
        None => OnboardingStep::VerifyEmail,
    }
}
