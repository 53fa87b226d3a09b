//! Google sign-in — verifies ID tokens against the tokeninfo endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::IdentityError;

use super::{Identity, IdentityProvider};

const PROVIDER_NAME: &str = "google";

/// Issuers Google uses for ID tokens.
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Claims returned by the tokeninfo endpoint. Google encodes booleans as
/// strings here, so `email_verified` is accepted in either form.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    iss: String,
    aud: String,
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<serde_json::Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Identity provider backed by Google ID tokens.
pub struct GoogleIdentityProvider {
    client_id: String,
    tokeninfo_url: String,
    client: reqwest::Client,
}

impl GoogleIdentityProvider {
    pub fn new(client_id: impl Into<String>, tokeninfo_url: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            tokeninfo_url: tokeninfo_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn rejected(reason: impl Into<String>) -> IdentityError {
        IdentityError::Rejected {
            provider: PROVIDER_NAME.to_string(),
            reason: reason.into(),
        }
    }

    /// Check the claims and map them into an [`Identity`].
    fn identity_from_claims(&self, info: TokenInfo) -> Result<Identity, IdentityError> {
        if info.aud != self.client_id {
            return Err(Self::rejected("token was issued for a different client"));
        }
        if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
            return Err(Self::rejected(format!("unexpected issuer {}", info.iss)));
        }

        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| Self::rejected("token carries no email"))?;

        let email_verified = match info.email_verified {
            Some(serde_json::Value::Bool(b)) => b,
            Some(serde_json::Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };

        let display_name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(Identity {
            uid: info.sub,
            email,
            display_name,
            photo_url: info.picture,
            email_verified,
            provider: PROVIDER_NAME.to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn sign_in(&self, credential: &str) -> Result<Identity, IdentityError> {
        if credential.trim().is_empty() {
            return Err(IdentityError::Cancelled {
                provider: PROVIDER_NAME.to_string(),
            });
        }

        let resp = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|e| IdentityError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Google rejected ID token");
            return Err(Self::rejected("the sign-in token is invalid or expired"));
        }
        if !status.is_success() {
            return Err(IdentityError::RequestFailed {
                provider: PROVIDER_NAME.to_string(),
                reason: format!("tokeninfo returned {status}"),
            });
        }

        let info: TokenInfo = resp.json().await.map_err(|e| IdentityError::InvalidResponse {
            provider: PROVIDER_NAME.to_string(),
            reason: e.to_string(),
        })?;

        let identity = self.identity_from_claims(info)?;
        info!(uid = %identity.uid, verified = identity.email_verified, "Google identity verified");
        Ok(identity)
    }

    async fn sign_out(&self, uid: &str) -> Result<(), IdentityError> {
        // ID tokens are stateless; there is no provider session to revoke.
        debug!(uid, "Google sign-out");
        Ok(())
    }
}
