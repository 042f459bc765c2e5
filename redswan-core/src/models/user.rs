//! User identity and compliance status models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress of a compliance check (KYC or accreditation)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    NotStarted,
    InProgress,
    PendingReview,
    Approved,
    Rejected,
}

/// Identity verification status
pub type KycStatus = VerificationStatus;

/// Accredited-investor verification status
pub type AccreditationStatus = VerificationStatus;

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::NotStarted => "not_started",
            VerificationStatus::InProgress => "in_progress",
            VerificationStatus::PendingReview => "pending_review",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }

    /// Badge label shown on the profile screen, e.g. `PENDING REVIEW`
    pub fn label(&self) -> String {
        self.as_str().replacen('_', " ", 1).to_uppercase()
    }

    /// Badge colour class
    pub fn tone(&self) -> StatusTone {
        match self {
            VerificationStatus::Approved => StatusTone::Success,
            VerificationStatus::PendingReview => StatusTone::Warning,
            VerificationStatus::Rejected => StatusTone::Error,
            VerificationStatus::NotStarted | VerificationStatus::InProgress => StatusTone::Neutral,
        }
    }

    /// Check if the review has concluded
    pub fn is_final(&self) -> bool {
        matches!(self, VerificationStatus::Approved | VerificationStatus::Rejected)
    }

    /// Check if `next` follows this status in the linear progression
    ///
    /// not_started -> in_progress -> pending_review -> approved | rejected.
    /// Re-setting the current value is allowed.
    pub fn can_transition_to(&self, next: VerificationStatus) -> bool {
        use VerificationStatus::*;

        if *self == next {
            return true;
        }

        matches!(
            (self, next),
            (NotStarted, InProgress)
                | (InProgress, PendingReview)
                | (PendingReview, Approved)
                | (PendingReview, Rejected)
        )
    }

    /// Accreditation progression, which has no in-progress step:
    /// not_started -> pending_review -> approved | rejected.
    pub fn can_accreditation_transition_to(&self, next: VerificationStatus) -> bool {
        matches!(
            (self, next),
            (VerificationStatus::NotStarted, VerificationStatus::PendingReview)
        ) || self.can_transition_to(next)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<VerificationStatus> for String {
    fn from(status: VerificationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "not_started" => Ok(VerificationStatus::NotStarted),
            "in_progress" => Ok(VerificationStatus::InProgress),
            "pending_review" => Ok(VerificationStatus::PendingReview),
            "approved" => Ok(VerificationStatus::Approved),
            "rejected" => Ok(VerificationStatus::Rejected),
            _ => Err(format!("Invalid verification status: {}", value)),
        }
    }
}

impl TryFrom<String> for VerificationStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Colour class of a status badge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTone {
    Success,
    Warning,
    Error,
    Neutral,
}

/// Third-party identity verification service, picked by country
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationProvider {
    Veriff,
    ShuftiPro,
}

impl VerificationProvider {
    pub fn for_country(country: &str) -> Self {
        if country == "US" {
            VerificationProvider::Veriff
        } else {
            VerificationProvider::ShuftiPro
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VerificationProvider::Veriff => "Veriff",
            VerificationProvider::ShuftiPro => "ShuftiPro",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            VerificationProvider::Veriff => "Trusted identity verification for US investors",
            VerificationProvider::ShuftiPro => "Global identity verification service",
        }
    }
}

/// The authenticated investor
///
/// Field names follow the persisted `user` record layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub kyc_status: KycStatus,
    pub accreditation_status: AccreditationStatus,
    pub country: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl User {
    /// Create a new user with no compliance progress
    pub fn new(email: impl Into<String>, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: None,
            kyc_status: VerificationStatus::NotStarted,
            accreditation_status: VerificationStatus::NotStarted,
            country: "US".to_string(),
            created_at: Utc::now(),
            wallet_address: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Avatar initials
    pub fn initials(&self) -> String {
        self.first_name
            .chars()
            .next()
            .into_iter()
            .chain(self.last_name.chars().next())
            .collect()
    }

    pub fn verification_provider(&self) -> VerificationProvider {
        VerificationProvider::for_country(&self.country)
    }

    /// Merge a partial update into this record.
    ///
    /// `id` and `created_at` are not part of [`UserUpdate`] and never change.
    pub fn apply(&mut self, update: UserUpdate) {
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(phone) = update.phone {
            self.phone = Some(phone);
        }
        if let Some(status) = update.kyc_status {
            self.kyc_status = status;
        }
        if let Some(status) = update.accreditation_status {
            self.accreditation_status = status;
        }
        if let Some(country) = update.country {
            self.country = country;
        }
        if let Some(address) = update.wallet_address {
            self.wallet_address = Some(address);
        }
    }
}

/// Partial user record for [`User::apply`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub kyc_status: Option<KycStatus>,
    pub accreditation_status: Option<AccreditationStatus>,
    pub country: Option<String>,
    pub wallet_address: Option<String>,
}

impl UserUpdate {
    pub fn kyc(status: KycStatus) -> Self {
        Self {
            kyc_status: Some(status),
            ..Default::default()
        }
    }

    pub fn accreditation(status: AccreditationStatus) -> Self {
        Self {
            accreditation_status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == UserUpdate::default()
    }
}
