//! Session configuration loaded from the environment

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use base64::{engine::general_purpose, Engine as _};
use chrono::Duration;

/// Which authentication backend the session talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Accept any credentials and fabricate a fixture user
    Demo,
    /// Verify credentials against the on-device account table
    Local,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "demo" => Ok(AuthMode::Demo),
            "local" => Ok(AuthMode::Local),
            _ => Err(format!("Invalid auth mode: {} (expected demo or local)", value)),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Demo => f.write_str("demo"),
            AuthMode::Local => f.write_str("local"),
        }
    }
}

/// Session configuration
#[derive(Clone)]
pub struct SessionConfig {
    /// Directory of the encrypted secure store
    pub storage_path: PathBuf,
    /// AES-256 key for the secure store
    pub encryption_key: [u8; 32],
    pub auth_mode: AuthMode,
    /// HMAC secret for issued session tokens
    pub jwt_secret: String,
    /// Lifetime of issued session tokens
    pub token_ttl: Duration,
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("storage_path", &self.storage_path)
            .field("auth_mode", &self.auth_mode)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./data/secure_store"),
            encryption_key: [0u8; 32],
            auth_mode: AuthMode::Demo,
            jwt_secret: "default_secret_change_in_production".to_string(),
            token_ttl: Duration::hours(24),
        }
    }
}

impl SessionConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let storage_path = std::env::var("REDSWAN_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage_path);

        let auth_mode = match std::env::var("REDSWAN_AUTH_MODE") {
            Ok(value) => value.parse().unwrap_or_else(|e| {
                tracing::warn!("{}; using {}", e, defaults.auth_mode);
                defaults.auth_mode
            }),
            Err(_) => defaults.auth_mode,
        };

        let jwt_secret = std::env::var("REDSWAN_JWT_SECRET").unwrap_or(defaults.jwt_secret);

        let token_ttl = std::env::var("REDSWAN_TOKEN_TTL_HOURS")
            .ok()
            .and_then(|hours| hours.parse::<i64>().ok())
            .filter(|hours| *hours > 0)
            .map(Duration::hours)
            .unwrap_or(defaults.token_ttl);

        Self {
            storage_path,
            encryption_key: Self::load_encryption_key(),
            auth_mode,
            jwt_secret,
            token_ttl,
        }
    }

    fn load_encryption_key() -> [u8; 32] {
        if let Ok(key_str) = std::env::var("REDSWAN_STORAGE_KEY") {
            if let Some(key) = decode_key(&key_str) {
                return key;
            }
            tracing::warn!("REDSWAN_STORAGE_KEY is not a base64 encoded 32-byte key");
        }

        tracing::warn!("Using default storage encryption key - this is not secure for production!");
        [0u8; 32]
    }
}

fn decode_key(encoded: &str) -> Option<[u8; 32]> {
    let bytes = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    bytes.try_into().ok()
}
