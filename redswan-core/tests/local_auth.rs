//! Tests for sessions backed by the encrypted store and local credentials

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tempfile::TempDir;

use redswan_core::auth::{LocalAuthBackend, NewAccount, TokenIssuer};
use redswan_core::config::{AuthMode, SessionConfig};
use redswan_core::storage::{
    EncryptedFileStore, MemoryStore, SecureStore, StorageError, ACCOUNTS_KEY, TOKEN_KEY, USER_KEY,
};
use redswan_core::{
    Error, SessionAction, SessionPhase, SessionStore, User, UserUpdate, VerificationStatus,
};

const PASSWORD: &str = "Str0ng!pass";

fn local_session(dir: &TempDir, ttl: Duration) -> SessionStore {
    let storage: Arc<dyn SecureStore> =
        Arc::new(EncryptedFileStore::new(dir.path(), [3u8; 32]).unwrap());
    let backend = LocalAuthBackend::new(storage.clone(), TokenIssuer::new("test-secret", ttl))
        .unwrap()
        .with_hash_cost(4);

    SessionStore::new(storage, Arc::new(backend))
}

#[tokio::test]
async fn test_register_logout_login() {
    let dir = TempDir::new().unwrap();
    let session = local_session(&dir, Duration::hours(1));

    let registered = session
        .register_account(
            NewAccount::new("ada@example.com", PASSWORD, "Ada", "Lovelace").with_phone("5551234567"),
        )
        .await
        .unwrap();
    session.logout().await.unwrap();
    assert!(!session.is_authenticated().await);

    let user = session.login("ADA@example.com", PASSWORD).await.unwrap();
    assert_eq!(user, registered);
    assert_ne!(session.token().await.as_deref(), Some("mock-token"));
}

#[tokio::test]
async fn test_bad_credentials_rejected() {
    let dir = TempDir::new().unwrap();
    let session = local_session(&dir, Duration::hours(1));
    session
        .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
        .await
        .unwrap();
    session.logout().await.unwrap();

    let err = session.login("ada@example.com", "Wr0ng!pass").await.unwrap_err();
    assert!(matches!(err, Error::InvalidCredentials));
    assert!(!session.is_authenticated().await);
    assert_eq!(SessionAction::Login.failure_message(), "Invalid email or password");
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let dir = TempDir::new().unwrap();
    let session = local_session(&dir, Duration::hours(1));
    session
        .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
        .await
        .unwrap();

    let err = session
        .register("ada@example.com", PASSWORD, "Ada", "Byron")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateEmail(_)));

    // The existing session survives the failed attempt
    assert_eq!(session.current_user().await.unwrap().last_name, "Lovelace");
}

#[tokio::test]
async fn test_session_survives_restart() {
    let dir = TempDir::new().unwrap();

    let user = {
        let session = local_session(&dir, Duration::hours(1));
        session
            .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
            .await
            .unwrap();
        session.advance_kyc(VerificationStatus::InProgress).await.unwrap()
    };

    let restarted = local_session(&dir, Duration::hours(1));
    let snapshot = restarted.restore().await;

    assert_eq!(snapshot.phase, SessionPhase::Authenticated);
    assert_eq!(snapshot.user, Some(user));

    // The account table saw the status change too
    restarted.logout().await.unwrap();
    let again = restarted.login("ada@example.com", PASSWORD).await.unwrap();
    assert_eq!(again.kyc_status, VerificationStatus::InProgress);
}

#[tokio::test]
async fn test_expired_token_restores_anonymous() {
    let dir = TempDir::new().unwrap();

    {
        let session = local_session(&dir, Duration::hours(-2));
        session
            .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
            .await
            .unwrap();
    }

    let restarted = local_session(&dir, Duration::hours(1));
    let snapshot = restarted.restore().await;
    assert_eq!(snapshot.phase, SessionPhase::Anonymous);

    let storage = EncryptedFileStore::new(dir.path(), [3u8; 32]).unwrap();
    assert_eq!(storage.get(USER_KEY).await.unwrap(), None);
    assert_eq!(storage.get(TOKEN_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_token_restores_anonymous() {
    let dir = TempDir::new().unwrap();

    {
        let session = local_session(&dir, Duration::hours(-2));
        session
            .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
            .await
            .unwrap();
    }
    std::fs::remove_file(dir.path().join("token.enc")).unwrap();

    let restarted = local_session(&dir, Duration::hours(1));
    let snapshot = restarted.restore().await;
    assert_eq!(snapshot.phase, SessionPhase::Anonymous);
    assert_eq!(restarted.token().await, None);

    let storage = EncryptedFileStore::new(dir.path(), [3u8; 32]).unwrap();
    assert_eq!(storage.get(USER_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn test_unreadable_token_restores_anonymous() {
    let dir = TempDir::new().unwrap();

    {
        let session = local_session(&dir, Duration::hours(1));
        session
            .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
            .await
            .unwrap();
    }
    std::fs::write(dir.path().join("token.enc"), b"not a sealed entry").unwrap();

    let restarted = local_session(&dir, Duration::hours(1));
    assert_eq!(restarted.restore().await.phase, SessionPhase::Anonymous);

    // The account itself is intact
    let user = restarted.login("ada@example.com", PASSWORD).await.unwrap();
    assert_eq!(user.first_name, "Ada");
}

/// Store that can refuse writes to the `user` key only
struct UserWriteFailingStore {
    inner: MemoryStore,
    fail_user_writes: AtomicBool,
}

#[async_trait]
impl SecureStore for UserWriteFailingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if key == USER_KEY && self.fail_user_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("user writes are disabled".to_string()));
        }
        self.inner.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.inner.delete(key).await
    }
}

#[tokio::test]
async fn test_failed_user_write_leaves_account_unchanged() {
    let storage = Arc::new(UserWriteFailingStore {
        inner: MemoryStore::new(),
        fail_user_writes: AtomicBool::new(false),
    });
    let backend = LocalAuthBackend::new(
        storage.clone(),
        TokenIssuer::new("test-secret", Duration::hours(1)),
    )
    .unwrap()
    .with_hash_cost(4);
    let session = SessionStore::new(storage.clone(), Arc::new(backend));
    session
        .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
        .await
        .unwrap();

    storage.fail_user_writes.store(true, Ordering::SeqCst);
    let err = session
        .update_user(UserUpdate::kyc(VerificationStatus::Approved))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Persistence(_)));
    assert_eq!(
        session.current_user().await.unwrap().kyc_status,
        VerificationStatus::NotStarted
    );

    storage.fail_user_writes.store(false, Ordering::SeqCst);
    session.logout().await.unwrap();
    let user = session.login("ada@example.com", PASSWORD).await.unwrap();
    assert_eq!(user.kyc_status, VerificationStatus::NotStarted);
}

#[tokio::test]
async fn test_failed_profile_sync_rolls_back_user_record() {
    let dir = TempDir::new().unwrap();
    let session = local_session(&dir, Duration::hours(1));
    session
        .register("ada@example.com", PASSWORD, "Ada", "Lovelace")
        .await
        .unwrap();

    let storage = EncryptedFileStore::new(dir.path(), [3u8; 32]).unwrap();
    storage.delete(ACCOUNTS_KEY).await.unwrap();

    let err = session
        .update_user(UserUpdate::kyc(VerificationStatus::InProgress))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
    assert_eq!(
        session.current_user().await.unwrap().kyc_status,
        VerificationStatus::NotStarted
    );

    let persisted: User =
        serde_json::from_str(&storage.get(USER_KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(persisted.kyc_status, VerificationStatus::NotStarted);
}

#[tokio::test]
async fn test_from_config_uses_demo_backend() {
    let dir = TempDir::new().unwrap();
    let config = SessionConfig {
        storage_path: dir.path().join("store"),
        auth_mode: AuthMode::Demo,
        ..SessionConfig::default()
    };

    let session = SessionStore::from_config(&config).unwrap();
    let user = session.login("a@b.com", "x").await.unwrap();

    assert_eq!(user.full_name(), "John Doe");
    assert!(dir.path().join("store").join("user.enc").exists());
}
