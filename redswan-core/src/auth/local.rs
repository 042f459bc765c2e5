//! On-device credential backend
//!
//! Accounts live in the secure store under [`ACCOUNTS_KEY`] as a JSON map
//! keyed by normalized email. Passwords are bcrypt hashed and grants carry a
//! signed JWT from [`TokenIssuer`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{AuthBackend, AuthGrant, NewAccount, TokenIssuer};
use crate::error::{Error, Result};
use crate::models::user::User;
use crate::storage::{SecureStore, ACCOUNTS_KEY};
use crate::validation::{normalize_email, AccountValidator};

/// Stored account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecord {
    password_hash: String,
    user: User,
}

type AccountTable = HashMap<String, AccountRecord>;

/// Credential backend keeping its account table in a [`SecureStore`]
pub struct LocalAuthBackend {
    store: Arc<dyn SecureStore>,
    tokens: TokenIssuer,
    validator: AccountValidator,
    hash_cost: u32,
    // Serializes read-modify-write cycles on the account table
    write_lock: Mutex<()>,
}

impl LocalAuthBackend {
    pub fn new(store: Arc<dyn SecureStore>, tokens: TokenIssuer) -> Result<Self> {
        Ok(Self {
            store,
            tokens,
            validator: AccountValidator::new()?,
            hash_cost: DEFAULT_COST,
            write_lock: Mutex::new(()),
        })
    }

    /// Override the bcrypt work factor
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    async fn load_accounts(&self) -> Result<AccountTable> {
        match self.store.get(ACCOUNTS_KEY).await? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(HashMap::new()),
        }
    }

    async fn save_accounts(&self, accounts: &AccountTable) -> Result<()> {
        let json = serde_json::to_string(accounts)?;
        self.store.set(ACCOUNTS_KEY, &json).await?;
        Ok(())
    }

    fn validate(&self, account: &NewAccount) -> Result<()> {
        self.validator.validate_name("First name", &account.first_name)?;
        self.validator.validate_name("Last name", &account.last_name)?;
        self.validator.validate_email(account.email.trim())?;
        self.validator.validate_password(&account.password)?;
        if let Some(phone) = &account.phone {
            self.validator.validate_phone(phone)?;
        }
        Ok(())
    }
}

#[async_trait]
impl AuthBackend for LocalAuthBackend {
    async fn authenticate(&self, email: &str, password: &str) -> Result<AuthGrant> {
        let accounts = self.load_accounts().await?;

        let record = accounts
            .get(&normalize_email(email))
            .ok_or(Error::InvalidCredentials)?;

        let matches = verify(password, &record.password_hash).unwrap_or_else(|e| {
            warn!("unreadable password hash for {}: {}", record.user.id, e);
            false
        });
        if !matches {
            return Err(Error::InvalidCredentials);
        }

        let token = self.tokens.issue(&record.user)?;
        info!("authenticated user {}", record.user.id);

        Ok(AuthGrant {
            user: record.user.clone(),
            token,
        })
    }

    async fn register(&self, account: NewAccount) -> Result<AuthGrant> {
        self.validate(&account)?;

        let _guard = self.write_lock.lock().await;
        let mut accounts = self.load_accounts().await?;

        let email = normalize_email(&account.email);
        if accounts.contains_key(&email) {
            return Err(Error::DuplicateEmail(email));
        }

        let password_hash = hash(&account.password, self.hash_cost)
            .map_err(|e| Error::ValidationFailed(format!("Failed to hash password: {}", e)))?;

        let mut user = User::new(
            email.clone(),
            account.first_name.trim(),
            account.last_name.trim(),
        );
        user.phone = account.phone;

        accounts.insert(
            email,
            AccountRecord {
                password_hash,
                user: user.clone(),
            },
        );
        self.save_accounts(&accounts).await?;

        let token = self.tokens.issue(&user)?;
        info!("registered user {}", user.id);

        Ok(AuthGrant { user, token })
    }

    fn requires_token(&self) -> bool {
        true
    }

    async fn verify_token(&self, token: &str) -> Result<()> {
        self.tokens.validate(token).map(|_| ())
    }

    async fn sync_profile(&self, user: &User) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut accounts = self.load_accounts().await?;

        let current_key = accounts
            .iter()
            .find(|(_, record)| record.user.id == user.id)
            .map(|(key, _)| key.clone())
            .ok_or(Error::NotAuthenticated)?;

        let new_key = normalize_email(&user.email);
        if new_key != current_key {
            self.validator.validate_email(&new_key)?;
            if accounts.contains_key(&new_key) {
                return Err(Error::DuplicateEmail(new_key));
            }
        }

        if let Some(mut record) = accounts.remove(&current_key) {
            record.user = user.clone();
            accounts.insert(new_key, record);
        }

        self.save_accounts(&accounts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::VerificationStatus;
    use crate::storage::MemoryStore;
    use chrono::Duration;

    fn backend(store: Arc<MemoryStore>) -> LocalAuthBackend {
        LocalAuthBackend::new(store, TokenIssuer::new("test-secret", Duration::hours(1)))
            .unwrap()
            .with_hash_cost(4)
    }

    fn account() -> NewAccount {
        NewAccount::new("Ada@Example.com", "Str0ng!pass", "Ada", "Lovelace")
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = Arc::new(MemoryStore::new());
        let backend = backend(store.clone());

        let registered = backend.register(account()).await.unwrap();
        assert_eq!(registered.user.email, "ada@example.com");
        assert!(backend.verify_token(&registered.token).await.is_ok());

        let grant = backend.authenticate("ada@example.com", "Str0ng!pass").await.unwrap();
        assert_eq!(grant.user, registered.user);

        let raw = store.get(ACCOUNTS_KEY).await.unwrap().unwrap();
        assert!(!raw.contains("Str0ng!pass"));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let backend = backend(Arc::new(MemoryStore::new()));
        backend.register(account()).await.unwrap();

        assert!(matches!(
            backend.authenticate("ada@example.com", "Wr0ng!pass").await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            backend.authenticate("nobody@example.com", "Str0ng!pass").await,
            Err(Error::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let backend = backend(Arc::new(MemoryStore::new()));
        backend.register(account()).await.unwrap();

        let again = NewAccount::new("ada@example.com ", "An0ther!pass", "Ada", "L");
        assert!(matches!(backend.register(again).await, Err(Error::DuplicateEmail(_))));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let backend = backend(Arc::new(MemoryStore::new()));

        let weak = NewAccount::new("ada@example.com", "password", "Ada", "Lovelace");
        assert!(matches!(backend.register(weak).await, Err(Error::ValidationFailed(_))));

        let nameless = NewAccount::new("ada@example.com", "Str0ng!pass", " ", "Lovelace");
        assert!(matches!(backend.register(nameless).await, Err(Error::ValidationFailed(_))));

        let bad_phone = account().with_phone("12ab");
        assert!(matches!(backend.register(bad_phone).await, Err(Error::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_sync_profile_is_returned_on_next_login() {
        let backend = backend(Arc::new(MemoryStore::new()));
        let mut user = backend.register(account()).await.unwrap().user;

        user.kyc_status = VerificationStatus::PendingReview;
        backend.sync_profile(&user).await.unwrap();

        let grant = backend.authenticate("ada@example.com", "Str0ng!pass").await.unwrap();
        assert_eq!(grant.user.kyc_status, VerificationStatus::PendingReview);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_persistence() {
        let store = Arc::new(MemoryStore::new());
        let backend = backend(store.clone());

        store.set_fail_writes(true);
        assert!(matches!(backend.register(account()).await, Err(Error::Persistence(_))));
    }
}
