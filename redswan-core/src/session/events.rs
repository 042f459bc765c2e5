//! Session change notifications

use crate::models::user::User;

/// Channel capacity; slow subscribers past this lag and skip events
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Published whenever the session changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Initial restore finished
    Restored { authenticated: bool },
    LoggedIn { user_id: String },
    Registered { user_id: String },
    LoggedOut,
    UserUpdated { user: User },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Restored { .. } => "restored",
            SessionEvent::LoggedIn { .. } => "logged_in",
            SessionEvent::Registered { .. } => "registered",
            SessionEvent::LoggedOut => "logged_out",
            SessionEvent::UserUpdated { .. } => "user_updated",
        }
    }
}
