//! Identity providers and authenticated sessions.

pub mod google;
pub mod session;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IdentityError;

pub use google::GoogleIdentityProvider;
pub use session::{Session, SessionTable, spawn_expiry_task};

/// Authenticated user info returned by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned stable user id.
    pub uid: String,
    pub email: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
    /// Sign-up method name, e.g. "google".
    pub provider: String,
}

/// An external sign-in service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short provider name used in logs and `sign_up_methods`.
    fn name(&self) -> &str;

    /// Exchange a client credential (e.g. an ID token) for an identity.
    async fn sign_in(&self, credential: &str) -> Result<Identity, IdentityError>;

    /// End the provider-side session for `uid`.
    async fn sign_out(&self, uid: &str) -> Result<(), IdentityError>;
}
