//! Session store: single source of truth for who is logged in
//!
//! A [`SessionStore`] is created once at startup and handed to every screen.
//! It restores the last session from secure storage, delegates credential
//! checks to an [`AuthBackend`], and writes every change through to storage
//! before applying it in memory. Mutations are serialized, so storage and
//! memory never disagree after an operation returns.

pub mod events;
pub mod state;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth::{AuthBackend, AuthGrant, DemoAuthBackend, LocalAuthBackend, NewAccount, TokenIssuer};
use crate::config::{AuthMode, SessionConfig};
use crate::error::{Error, Result};
use crate::models::user::{User, UserUpdate, VerificationStatus};
use crate::storage::{EncryptedFileStore, SecureStore, TOKEN_KEY, USER_KEY};

pub use events::{SessionEvent, EVENT_CHANNEL_CAPACITY};
pub use state::{SessionPhase, SessionSnapshot};

use state::SessionState;

/// Process-wide session
pub struct SessionStore {
    storage: Arc<dyn SecureStore>,
    backend: Arc<dyn AuthBackend>,
    state: RwLock<SessionState>,
    // Held for the whole of every mutating operation
    op_lock: Mutex<()>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn SecureStore>, backend: Arc<dyn AuthBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            storage,
            backend,
            state: RwLock::new(SessionState::default()),
            op_lock: Mutex::new(()),
            events,
        }
    }

    /// Build a store over the encrypted on-disk store with the configured backend
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let storage: Arc<dyn SecureStore> = Arc::new(EncryptedFileStore::new(
            config.storage_path.clone(),
            config.encryption_key,
        )?);

        let backend: Arc<dyn AuthBackend> = match config.auth_mode {
            AuthMode::Demo => Arc::new(DemoAuthBackend::new()),
            AuthMode::Local => Arc::new(LocalAuthBackend::new(
                storage.clone(),
                TokenIssuer::new(config.jwt_secret.clone(), config.token_ttl),
            )?),
        };

        info!(
            "session store at {} using {} auth",
            config.storage_path.display(),
            config.auth_mode
        );
        Ok(Self::new(storage, backend))
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.phase.is_authenticated()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.phase.is_loading()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.state.read().await.phase
    }

    /// Session token of the current user
    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.snapshot()
    }

    /// Load the persisted session. Runs once; later calls return the current state.
    ///
    /// Never fails: unreadable or unparsable storage leaves the session anonymous.
    pub async fn restore(&self) -> SessionSnapshot {
        let _op = self.op_lock.lock().await;
        self.restore_locked().await;
        self.snapshot().await
    }

    /// Log in, replacing any current session
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let _op = self.op_lock.lock().await;
        self.restore_locked().await;

        let grant = self.backend.authenticate(email, password).await.map_err(|e| {
            warn!("login failed: {}", e);
            e
        })?;

        let user = self.sign_in(grant).await?;
        info!("user {} logged in", user.id);
        self.publish(SessionEvent::LoggedIn {
            user_id: user.id.clone(),
        });
        Ok(user)
    }

    /// Create an account and log into it
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<User> {
        self.register_account(NewAccount::new(email, password, first_name, last_name))
            .await
    }

    /// [`SessionStore::register`] with the full registration form
    pub async fn register_account(&self, account: NewAccount) -> Result<User> {
        let _op = self.op_lock.lock().await;
        self.restore_locked().await;

        let grant = self.backend.register(account).await.map_err(|e| {
            warn!("registration failed: {}", e);
            e
        })?;

        let user = self.sign_in(grant).await?;
        info!("user {} registered", user.id);
        self.publish(SessionEvent::Registered {
            user_id: user.id.clone(),
        });
        Ok(user)
    }

    /// Clear the session from memory and storage. Calling it while logged out is a no-op.
    pub async fn logout(&self) -> Result<()> {
        let _op = self.op_lock.lock().await;
        self.restore_locked().await;

        self.storage.delete(USER_KEY).await?;
        self.storage.delete(TOKEN_KEY).await?;

        let mut state = self.state.write().await;
        let was_authenticated = state.user.is_some();
        state.sign_out();
        drop(state);

        if was_authenticated {
            info!("user logged out");
            self.publish(SessionEvent::LoggedOut);
        }
        Ok(())
    }

    /// Merge `update` into the current user and persist it.
    ///
    /// Returns `Ok(None)` without touching anything when nobody is logged in.
    /// Status fields are taken as given; see [`SessionStore::advance_kyc`] for
    /// checked transitions.
    pub async fn update_user(&self, update: UserUpdate) -> Result<Option<User>> {
        let _op = self.op_lock.lock().await;
        self.restore_locked().await;
        self.update_locked(update).await
    }

    /// Move KYC status one step along its progression
    pub async fn advance_kyc(&self, next: VerificationStatus) -> Result<User> {
        self.advance_status(
            next,
            |user| user.kyc_status,
            VerificationStatus::can_transition_to,
            UserUpdate::kyc,
        )
        .await
    }

    /// Move accreditation status one step along its progression.
    ///
    /// Documents go straight to review, so `not_started -> pending_review` is allowed.
    pub async fn advance_accreditation(&self, next: VerificationStatus) -> Result<User> {
        self.advance_status(
            next,
            |user| user.accreditation_status,
            VerificationStatus::can_accreditation_transition_to,
            UserUpdate::accreditation,
        )
        .await
    }

    async fn advance_status(
        &self,
        next: VerificationStatus,
        current: fn(&User) -> VerificationStatus,
        allowed: fn(&VerificationStatus, VerificationStatus) -> bool,
        update: fn(VerificationStatus) -> UserUpdate,
    ) -> Result<User> {
        let _op = self.op_lock.lock().await;
        self.restore_locked().await;

        let user = self.current_user().await.ok_or(Error::NotAuthenticated)?;
        let from = current(&user);
        if !allowed(&from, next) {
            return Err(Error::InvalidStatusTransition { from, to: next });
        }

        self.update_locked(update(next))
            .await?
            .ok_or(Error::NotAuthenticated)
    }

    async fn update_locked(&self, update: UserUpdate) -> Result<Option<User>> {
        let Some(mut user) = self.current_user().await else {
            debug!("update ignored: no user logged in");
            return Ok(None);
        };

        let previous = user.clone();
        user.apply(update);

        let json = serde_json::to_string(&user)?;
        self.storage.set(USER_KEY, &json).await?;
        if let Err(e) = self.backend.sync_profile(&user).await {
            warn!("profile sync failed for user {}: {}", user.id, e);
            self.rollback_user_record(Some(&previous)).await;
            return Err(e);
        }

        self.state.write().await.user = Some(user.clone());
        debug!("user {} updated", user.id);
        self.publish(SessionEvent::UserUpdated { user: user.clone() });
        Ok(Some(user))
    }

    /// Persist a grant, then make it the current session
    async fn sign_in(&self, grant: AuthGrant) -> Result<User> {
        let AuthGrant { user, token } = grant;

        let json = serde_json::to_string(&user)?;
        let previous = self.current_user().await;

        self.storage.set(USER_KEY, &json).await?;
        if let Err(e) = self.storage.set(TOKEN_KEY, &token).await {
            self.rollback_user_record(previous.as_ref()).await;
            return Err(e.into());
        }

        self.state.write().await.sign_in(user.clone(), Some(token));
        Ok(user)
    }

    /// Best-effort return of the `user` key to its previous value
    async fn rollback_user_record(&self, previous: Option<&User>) {
        let result = match previous {
            Some(user) => match serde_json::to_string(user) {
                Ok(json) => self.storage.set(USER_KEY, &json).await,
                Err(e) => {
                    warn!("could not serialize previous user for rollback: {}", e);
                    return;
                }
            },
            None => self.storage.delete(USER_KEY).await,
        };

        if let Err(e) = result {
            warn!("rollback of user record failed: {}", e);
        }
    }

    /// Caller must hold `op_lock`
    async fn restore_locked(&self) {
        {
            let mut state = self.state.write().await;
            if state.phase != SessionPhase::Uninitialized {
                return;
            }
            state.phase = SessionPhase::Loading;
        }

        let (mut user, mut token) = self.read_persisted().await;

        let rejected = match (user.as_ref(), token.as_deref()) {
            (Some(_), Some(persisted)) => match self.backend.verify_token(persisted).await {
                Ok(()) => false,
                Err(e) => {
                    warn!("discarding persisted session: {}", e);
                    true
                }
            },
            (Some(_), None) if self.backend.requires_token() => {
                warn!("discarding persisted session: no readable session token");
                true
            }
            _ => false,
        };
        if rejected {
            self.clear_persisted().await;
            user = None;
            token = None;
        }

        let mut state = self.state.write().await;
        match user {
            Some(user) => {
                info!("restored session for user {}", user.id);
                state.sign_in(user, token);
            }
            None => {
                debug!("no persisted session");
                state.sign_out();
            }
        }
        let authenticated = state.phase.is_authenticated();
        drop(state);

        self.publish(SessionEvent::Restored { authenticated });
    }

    async fn read_persisted(&self) -> (Option<User>, Option<String>) {
        let user = match self.storage.get(USER_KEY).await {
            Ok(Some(json)) => match serde_json::from_str::<User>(&json) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("Error loading user: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Error loading user: {}", e);
                None
            }
        };

        let token = match self.storage.get(TOKEN_KEY).await {
            Ok(token) => token,
            Err(e) => {
                warn!("Error loading session token: {}", e);
                None
            }
        };

        (user, token)
    }

    async fn clear_persisted(&self) {
        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(e) = self.storage.delete(key).await {
                warn!("could not clear {}: {}", key, e);
            }
        }
    }

    fn publish(&self, event: SessionEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            debug!("no subscribers for session event {}", name);
        }
    }
}
