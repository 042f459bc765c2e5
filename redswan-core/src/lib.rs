//! RedSwan Core - session and identity layer for the tokenized real-estate client
//!
//! This library holds the one piece of shared, stateful logic in the client:
//! who is logged in. It provides the user model, the secure key-value storage
//! the session is mirrored to, pluggable authentication backends and the
//! session store every screen reads from.

pub mod error;
pub mod config;
pub mod models;
pub mod validation;
pub mod storage;
pub mod auth;
pub mod session;

// Re-export commonly used types for convenience
pub use error::{Error, Result, SessionAction};
pub use models::user::{
    AccreditationStatus, KycStatus, StatusTone, User, UserUpdate, VerificationProvider,
    VerificationStatus,
};
pub use session::{SessionEvent, SessionPhase, SessionSnapshot, SessionStore};
