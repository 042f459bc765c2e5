//! Session state machine

use crate::models::user::User;

/// Lifecycle of the process-wide session
///
/// `Uninitialized -> Loading -> Authenticated | Anonymous`, then
/// `Authenticated -> Anonymous` on logout and `Anonymous -> Authenticated`
/// on login or registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Uninitialized,
    Loading,
    Authenticated,
    Anonymous,
}

impl SessionPhase {
    /// True until the initial restore has finished
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionPhase::Uninitialized | SessionPhase::Loading)
    }

    pub fn is_authenticated(&self) -> bool {
        *self == SessionPhase::Authenticated
    }
}

/// In-memory session, mirrored to secure storage
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub phase: SessionPhase,
    pub user: Option<User>,
    pub token: Option<String>,
}

impl SessionState {
    pub fn sign_in(&mut self, user: User, token: Option<String>) {
        self.user = Some(user);
        self.token = token;
        self.phase = SessionPhase::Authenticated;
    }

    pub fn sign_out(&mut self) {
        self.user = None;
        self.token = None;
        self.phase = SessionPhase::Anonymous;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            user: self.user.clone(),
        }
    }
}

/// Read-only view of the session handed to screens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub user: Option<User>,
}

impl SessionSnapshot {
    pub fn is_loading(&self) -> bool {
        self.phase.is_loading()
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase.is_authenticated()
    }
}
