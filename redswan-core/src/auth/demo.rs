//! Fixture backend that accepts any credentials

use async_trait::async_trait;
use tracing::info;

use super::{AuthBackend, AuthGrant, NewAccount};
use crate::error::Result;
use crate::models::user::User;

/// Placeholder token handed out by the demo backend
pub const DEMO_TOKEN: &str = "mock-token";

/// Backend used while no real authentication service exists.
///
/// Every login succeeds with a "John Doe" investor carrying the given email;
/// registration succeeds with the given names. Nothing is checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoAuthBackend;

impl DemoAuthBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthBackend for DemoAuthBackend {
    async fn authenticate(&self, email: &str, _password: &str) -> Result<AuthGrant> {
        info!("demo login for {}", email);

        Ok(AuthGrant {
            user: User::new(email, "John", "Doe"),
            token: DEMO_TOKEN.to_string(),
        })
    }

    async fn register(&self, account: NewAccount) -> Result<AuthGrant> {
        info!("demo registration for {}", account.email);

        let mut user = User::new(account.email, account.first_name, account.last_name);
        user.phone = account.phone;

        Ok(AuthGrant {
            user,
            token: DEMO_TOKEN.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::VerificationStatus;

    #[tokio::test]
    async fn test_demo_login_always_succeeds() {
        let backend = DemoAuthBackend::new();
        let grant = backend.authenticate("a@b.com", "x").await.unwrap();

        assert_eq!(grant.user.email, "a@b.com");
        assert_eq!(grant.user.full_name(), "John Doe");
        assert_eq!(grant.user.country, "US");
        assert_eq!(grant.user.kyc_status, VerificationStatus::NotStarted);
        assert_eq!(grant.user.accreditation_status, VerificationStatus::NotStarted);
        assert_eq!(grant.token, DEMO_TOKEN);
    }

    #[tokio::test]
    async fn test_demo_register_keeps_names() {
        let backend = DemoAuthBackend::new();
        let grant = backend
            .register(NewAccount::new("jane@example.com", "pw", "Jane", "Roe").with_phone("5551234567"))
            .await
            .unwrap();

        assert_eq!(grant.user.full_name(), "Jane Roe");
        assert_eq!(grant.user.phone.as_deref(), Some("5551234567"));
    }
}
