//! Error types for the session layer

use thiserror::Error;

use crate::models::user::VerificationStatus;
use crate::storage::StorageError;

/// Errors surfaced by the session store and its collaborators
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for {0}")]
    DuplicateEmail(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Secure storage error: {0}")]
    Persistence(#[from] StorageError),

    #[error("No user is logged in")]
    NotAuthenticated,

    #[error("Cannot move verification status from {from} to {to}")]
    InvalidStatusTransition {
        from: VerificationStatus,
        to: VerificationStatus,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Token error: {0}")]
    Token(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Serialization(error.to_string())
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, Error>;

/// Call sites that present session failures to the user.
///
/// Screens show one generic message per action rather than the error detail;
/// the detail goes to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    Login,
    Register,
    Logout,
    UpdateProfile,
    Verification,
}

impl SessionAction {
    /// The message shown to the user when this action fails for any reason
    pub fn failure_message(&self) -> &'static str {
        match self {
            SessionAction::Login => "Invalid email or password",
            SessionAction::Register => "Registration failed. Please try again.",
            SessionAction::Logout => "Logout failed. Please try again.",
            SessionAction::UpdateProfile => "Could not save your profile. Please try again.",
            SessionAction::Verification => "Could not update your verification status.",
        }
    }
}
