//! Encrypted on-disk secure store

use std::fs;
use std::io;
use std::path::PathBuf;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs as async_fs;
use tracing::debug;

use super::{SecureStore, StorageError};

/// AES-GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// On-disk envelope for one entry
#[derive(Debug, Serialize, Deserialize)]
struct SealedEntry {
    /// Encryption nonce, base64
    nonce: String,
    /// Encrypted value, base64
    ciphertext: String,
    /// SHA-256 of the plaintext value
    value_hash: String,
}

/// Secure store keeping one AES-256-GCM encrypted file per key
#[derive(Clone)]
pub struct EncryptedFileStore {
    root: PathBuf,
    cipher: Aes256Gcm,
}

impl EncryptedFileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>, encryption_key: [u8; 32]) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let key = Key::<Aes256Gcm>::from_slice(&encryption_key);
        let cipher = Aes256Gcm::new(key);

        Ok(Self { root, cipher })
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');

        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(format!("{}.enc", key)))
    }

    fn hash_value(value: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(value);
        format!("{:x}", hasher.finalize())
    }

    fn seal(&self, value: &str) -> Result<Vec<u8>, StorageError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, value.as_bytes())
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        let entry = SealedEntry {
            nonce: general_purpose::STANDARD.encode(nonce),
            ciphertext: general_purpose::STANDARD.encode(ciphertext),
            value_hash: Self::hash_value(value.as_bytes()),
        };

        serde_json::to_vec(&entry).map_err(|e| StorageError::Encryption(e.to_string()))
    }

    fn open(&self, key: &str, sealed: &[u8]) -> Result<String, StorageError> {
        let corrupted = |reason: String| StorageError::Corrupted {
            key: key.to_string(),
            reason,
        };

        let entry: SealedEntry =
            serde_json::from_slice(sealed).map_err(|e| corrupted(e.to_string()))?;

        let nonce = general_purpose::STANDARD
            .decode(&entry.nonce)
            .map_err(|e| corrupted(e.to_string()))?;
        if nonce.len() != NONCE_LEN {
            return Err(corrupted(format!("nonce is {} bytes", nonce.len())));
        }

        let ciphertext = general_purpose::STANDARD
            .decode(&entry.ciphertext)
            .map_err(|e| corrupted(e.to_string()))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|e| StorageError::Encryption(e.to_string()))?;

        let actual = Self::hash_value(&plaintext);
        if actual != entry.value_hash {
            return Err(corrupted("hash mismatch".to_string()));
        }

        String::from_utf8(plaintext).map_err(|e| corrupted(e.to_string()))
    }
}

#[async_trait]
impl SecureStore for EncryptedFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.entry_path(key)?;

        let sealed = match async_fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        self.open(key, &sealed).map(Some)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;
        let sealed = self.seal(value)?;

        // Write then rename so a crash never leaves a half-written entry
        let tmp_path = path.with_extension("enc.tmp");
        async_fs::write(&tmp_path, &sealed).await?;
        async_fs::rename(&tmp_path, &path).await?;

        debug!("stored {} ({} bytes sealed)", key, sealed.len());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.entry_path(key)?;

        let metadata = match async_fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // Overwrite before unlinking
        let zeros = vec![0u8; metadata.len() as usize];
        async_fs::write(&path, &zeros).await?;
        async_fs::remove_file(&path).await?;

        debug!("deleted {}", key);
        Ok(())
    }
}
