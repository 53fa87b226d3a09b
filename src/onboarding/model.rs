//! Account record and profile data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Subdivision of the account store by sign-up method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    /// Email/password sign-ups.
    Direct,
    /// Federated (identity provider) sign-ups.
    Provider,
}

impl Partition {
    /// Every partition, in the order uniqueness checks visit them.
    pub const ALL: [Partition; 2] = [Partition::Direct, Partition::Provider];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Provider => "provider",
        }
    }
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Partition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "provider" => Ok(Self::Provider),
            other => Err(format!("unknown partition '{other}'")),
        }
    }
}

/// Lifecycle of an account. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    ProfilePending,
    Pending,
    Approved,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProfilePending => "profile_pending",
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile_pending" => Ok(Self::ProfilePending),
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            other => Err(format!("unknown account status '{other}'")),
        }
    }
}

/// The six profile fields, written once on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub father_name: String,
    pub cnic: String,
    pub dob: String,
    pub phone: String,
    pub user_type: String,
    pub payment_method: String,
}

/// Raw profile form as submitted by the client. Every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub father_name: Option<String>,
    #[serde(default)]
    pub cnic: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl ProfileForm {
    /// Check that every field is present and non-blank.
    ///
    /// Returns the trimmed details, or the names of the missing fields.
    pub fn validate(&self) -> Result<ProfileDetails, Vec<&'static str>> {
        let fields: [(&'static str, &Option<String>); 6] = [
            ("father_name", &self.father_name),
            ("cnic", &self.cnic),
            ("dob", &self.dob),
            ("phone", &self.phone),
            ("user_type", &self.user_type),
            ("payment_method", &self.payment_method),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().map(str::trim).unwrap_or("").is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let take = |v: &Option<String>| v.as_deref().unwrap_or_default().trim().to_string();
        Ok(ProfileDetails {
            father_name: take(&self.father_name),
            cnic: take(&self.cnic),
            dob: take(&self.dob),
            phone: take(&self.phone),
            user_type: take(&self.user_type),
            payment_method: take(&self.payment_method),
        })
    }
}

/// Stored representation of a signed-up user, one per (partition, uid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub uid: String,
    pub partition: Partition,
    pub email: String,
    pub display_name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    /// Absent on records written by older sign-up paths.
    pub status: Option<AccountStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_completed_at: Option<DateTime<Utc>>,
    pub sign_up_methods: Vec<String>,
}

impl AccountRecord {
    /// Build the initial record for a first-time sign-in.
    pub fn from_identity(identity: &Identity, partition: Partition, now: DateTime<Utc>) -> Self {
        Self {
            uid: identity.uid.clone(),
            partition,
            email: normalize_email(&identity.email),
            display_name: identity.display_name.clone(),
            username: derive_username(&identity.display_name),
            photo_url: identity.photo_url.clone(),
            email_verified: identity.email_verified,
            created_at: now,
            status: Some(AccountStatus::ProfilePending),
            profile: None,
            profile_completed_at: None,
            sign_up_methods: vec![identity.provider.clone()],
        }
    }
}

/// Display name with all whitespace removed, lower-cased.
pub fn derive_username(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Canonical form used for storage and cross-partition comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_form() -> ProfileForm {
        ProfileForm {
            father_name: Some("J".into()),
            cnic: Some("12345-1234567-1".into()),
            dob: Some("2000-01-01".into()),
            phone: Some("0300".into()),
            user_type: Some("student".into()),
            payment_method: Some("monthly".into()),
        }
    }

    #[test]
    fn username_strips_whitespace_and_lowercases() {
        assert_eq!(derive_username("Jane Doe"), "janedoe");
        assert_eq!(derive_username("  Ali\tRaza  Khan "), "alirazakhan");
        assert_eq!(derive_username(""), "");
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Jane.Doe@X.com "), "jane.doe@x.com");
    }

    #[test]
    fn complete_form_validates() {
        let details = full_form().validate().unwrap();
        assert_eq!(details.cnic, "12345-1234567-1");
        assert_eq!(details.payment_method, "monthly");
    }

    #[test]
    fn validation_trims_values() {
        let form = ProfileForm {
            phone: Some("  0300 ".into()),
            ..full_form()
        };
        assert_eq!(form.validate().unwrap().phone, "0300");
    }

    #[test]
    fn missing_and_blank_fields_are_reported() {
        let form = ProfileForm {
            cnic: None,
            phone: Some("   ".into()),
            ..full_form()
        };
        assert_eq!(form.validate().unwrap_err(), vec!["cnic", "phone"]);
    }

    #[test]
    fn empty_form_reports_all_six() {
        let missing = ProfileForm::default().validate().unwrap_err();
        assert_eq!(missing.len(), 6);
    }

    #[test]
    fn status_display_matches_serde() {
        for status in [
            AccountStatus::ProfilePending,
            AccountStatus::Pending,
            AccountStatus::Approved,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
            assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
        }
    }

    #[test]
    fn partition_parse() {
        assert_eq!("direct".parse::<Partition>().unwrap(), Partition::Direct);
        assert_eq!("provider".parse::<Partition>().unwrap(), Partition::Provider);
        assert!("google".parse::<Partition>().is_err());
    }

    #[test]
    fn record_from_identity() {
        let identity = Identity {
            uid: "g-1".into(),
            email: "A@X.com".into(),
            display_name: "Jane Doe".into(),
            photo_url: None,
            email_verified: true,
            provider: "google".into(),
        };
        let record = AccountRecord::from_identity(&identity, Partition::Provider, Utc::now());
        assert_eq!(record.email, "a@x.com");
        assert_eq!(record.username, "janedoe");
        assert_eq!(record.status, Some(AccountStatus::ProfilePending));
        assert_eq!(record.sign_up_methods, vec!["google".to_string()]);
        assert!(record.profile.is_none());
    }
}
