//! Error types for campus-transit.

use crate::onboarding::state::OnboardingStep;

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Identity provider errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Provider {provider} rejected the credential: {reason}")]
    Rejected { provider: String, reason: String },

    #[error("Sign-in with {provider} was cancelled")]
    Cancelled { provider: String },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Failures of the onboarding flow. Each one leaves the user on a step,
/// see [`OnboardingError::stays_at`].
#[derive(Debug, thiserror::Error)]
pub enum OnboardingError {
    #[error("Sign-in failed: {0}")]
    Auth(#[from] IdentityError),

    #[error("An account with email {email} is already registered")]
    DuplicateAccount { email: String },

    #[error("Please fill in all fields: {}", missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("Could not submit profile: {reason}")]
    Submission { reason: String },

    #[error("Account storage unavailable: {0}")]
    Storage(#[from] DatabaseError),
}

impl OnboardingError {
    /// The step the user remains on after this failure.
    pub fn stays_at(&self) -> OnboardingStep {
        match self {
            Self::Auth(_) | Self::DuplicateAccount { .. } | Self::Storage(_) => {
                OnboardingStep::SignIn
            }
            Self::Validation { .. } | Self::Submission { .. } => OnboardingStep::ProfileForm,
        }
    }
}

/// Administrative account-management errors.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Account {uid} not found in partition {partition}")]
    NotFound { partition: String, uid: String },

    #[error("Account {uid} is {state}, cannot transition to {target}")]
    InvalidTransition {
        uid: String,
        state: String,
        target: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_lists_missing_fields() {
        let err = OnboardingError::Validation {
            missing: vec!["cnic", "phone"],
        };
        assert_eq!(err.to_string(), "Please fill in all fields: cnic, phone");
    }

    #[test]
    fn errors_stay_on_expected_steps() {
        let auth = OnboardingError::Auth(IdentityError::Cancelled {
            provider: "google".into(),
        });
        assert_eq!(auth.stays_at(), OnboardingStep::SignIn);

        let dup = OnboardingError::DuplicateAccount {
            email: "a@x.com".into(),
        };
        assert_eq!(dup.stays_at(), OnboardingStep::SignIn);

        let submit = OnboardingError::Submission {
            reason: "network".into(),
        };
        assert_eq!(submit.stays_at(), OnboardingStep::ProfileForm);

        let invalid = OnboardingError::Validation { missing: vec!["dob"] };
        assert_eq!(invalid.stays_at(), OnboardingStep::ProfileForm);
    }
}
