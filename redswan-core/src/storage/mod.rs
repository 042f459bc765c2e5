//! Secure key-value storage the session is mirrored to
//!
//! The session store only needs three operations on a device-scoped secure
//! slot: read a string, write a string, remove a key. [`SecureStore`] is that
//! seam; [`EncryptedFileStore`] backs it with AES-256-GCM encrypted files and
//! [`MemoryStore`] keeps everything in process.

pub mod encrypted;
pub mod memory;

use std::io;

use async_trait::async_trait;

pub use encrypted::EncryptedFileStore;
pub use memory::MemoryStore;

/// Key holding the serialized current user
pub const USER_KEY: &str = "user";
/// Key holding the opaque session token
pub const TOKEN_KEY: &str = "token";
/// Key holding the on-device account table of the local auth backend
pub const ACCOUNTS_KEY: &str = "accounts";

/// Secure storage error
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Encryption error: {0}")]
    Encryption(String),
    #[error("Corrupted entry {key}: {reason}")]
    Corrupted { key: String, reason: String },
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Device-scoped secure key-value storage
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
