//! Authentication backends
//!
//! The session store never checks credentials itself. It hands them to an
//! [`AuthBackend`] and persists whatever grant comes back, so swapping the
//! demo backend for a real one changes no caller.

pub mod demo;
pub mod local;
pub mod token;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::user::User;

pub use demo::DemoAuthBackend;
pub use local::LocalAuthBackend;
pub use token::{Claims, TokenIssuer};

/// Outcome of a successful login or registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub user: User,
    /// Opaque credential sent with subsequent requests
    pub token: String,
}

/// Registration input
#[derive(Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("phone", &self.phone)
            .finish_non_exhaustive()
    }
}

impl NewAccount {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: None,
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

/// Credential exchange used by the session store
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange credentials for a grant. Fails with `InvalidCredentials`.
    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthGrant>;

    /// Create an account. Fails with `DuplicateEmail` or `ValidationFailed`.
    async fn register(&self, account: NewAccount) -> Result<AuthGrant>;

    /// Whether a persisted session is only valid together with its token
    fn requires_token(&self) -> bool {
        false
    }

    /// Check that a previously issued token is still acceptable
    async fn verify_token(&self, _token: &str) -> Result<()> {
        Ok(())
    }

    /// Push profile changes made on the client back to the account record
    async fn sync_profile(&self, _user: &User) -> Result<()> {
        Ok(())
    }
}
