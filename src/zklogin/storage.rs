// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Login Session Storage
//!
//! The login flow never touches ambient storage; it is handed a
//! [`SessionStore`]. [`MemorySessionStore`] keeps values for the lifetime of
//! the process. [`FileSessionStore`] lets the CLI resume a flow across
//! invocations (redirect round trip). On unix its file is owner-only
//! (`0600`) since it holds the ephemeral secret key.

use super::error::{LoginError, LoginResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Logical storage keys, all scoped to one login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKey {
    EphemeralPrivateKey,
    StateString,
    Nonce,
    NonceRandomness,
    MaxEpoch,
    CreatedAt,
    ResolvedAddress,
    ResolvedToken,
}

impl SessionKey {
    pub const ALL: [SessionKey; 8] = [
        SessionKey::EphemeralPrivateKey,
        SessionKey::StateString,
        SessionKey::Nonce,
        SessionKey::NonceRandomness,
        SessionKey::MaxEpoch,
        SessionKey::CreatedAt,
        SessionKey::ResolvedAddress,
        SessionKey::ResolvedToken,
    ];

    /// Keys that exist only while a login round trip is in flight
    pub const EPHEMERAL: [SessionKey; 6] = [
        SessionKey::EphemeralPrivateKey,
        SessionKey::StateString,
        SessionKey::Nonce,
        SessionKey::NonceRandomness,
        SessionKey::MaxEpoch,
        SessionKey::CreatedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SessionKey::EphemeralPrivateKey => "zkLogin:ephemeralPrivateKey",
            SessionKey::StateString => "zkLogin:state",
            SessionKey::Nonce => "zkLogin:nonce",
            SessionKey::NonceRandomness => "zkLogin:randomness",
            SessionKey::MaxEpoch => "zkLogin:maxEpoch",
            SessionKey::CreatedAt => "zkLogin:createdAt",
            SessionKey::ResolvedAddress => "zkLogin:address",
            SessionKey::ResolvedToken => "zkLogin:jwt",
        }
    }
}

/// Session-scoped key/value storage
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn put(&self, key: SessionKey, value: String) -> LoginResult<()>;

    async fn get(&self, key: SessionKey) -> LoginResult<Option<String>>;

    async fn remove(&self, key: SessionKey) -> LoginResult<()>;

    /// Remove every login key
    async fn clear(&self) -> LoginResult<()>;
}

#[derive(Clone, Default)]
pub struct MemorySessionStore {
    values: Arc<RwLock<HashMap<SessionKey, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.values.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, key: SessionKey, value: String) -> LoginResult<()> {
        self.values.write().await.insert(key, value);
        Ok(())
    }

    async fn get(&self, key: SessionKey) -> LoginResult<Option<String>> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn remove(&self, key: SessionKey) -> LoginResult<()> {
        self.values.write().await.remove(&key);
        Ok(())
    }

    async fn clear(&self) -> LoginResult<()> {
        let mut values = self.values.write().await;
        let removed = values.len();
        values.clear();
        tracing::debug!("🗑️  Cleared {} login session values", removed);
        Ok(())
    }
}

/// JSON file store for command-line flows
pub struct FileSessionStore {
    path: PathBuf,
    lock: RwLock<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    async fn read_all(&self) -> LoginResult<HashMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| LoginError::storage(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(LoginError::storage(format!("{}: {}", self.path.display(), e))),
        }
    }

    async fn write_all(&self, values: &HashMap<String, String>) -> LoginResult<()> {
        if values.is_empty() {
            return match tokio::fs::remove_file(&self.path).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                    Err(LoginError::storage(e.to_string()))
                }
                _ => Ok(()),
            };
        }
        let bytes = serde_json::to_vec(values).map_err(|e| LoginError::storage(e.to_string()))?;
        let io_err = |e: std::io::Error| LoginError::storage(format!("{}: {}", self.path.display(), e));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await.map_err(io_err)?;
        // `mode` only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(io_err)?;
        }
        file.write_all(&bytes).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn put(&self, key: SessionKey, value: String) -> LoginResult<()> {
        let _guard = self.lock.write().await;
        let mut values = self.read_all().await?;
        values.insert(key.as_str().to_string(), value);
        self.write_all(&values).await
    }

    async fn get(&self, key: SessionKey) -> LoginResult<Option<String>> {
        let _guard = self.lock.read().await;
        Ok(self.read_all().await?.remove(key.as_str()))
    }

    async fn remove(&self, key: SessionKey) -> LoginResult<()> {
        let _guard = self.lock.write().await;
        let mut values = self.read_all().await?;
        values.remove(key.as_str());
        self.write_all(&values).await
    }

    async fn clear(&self) -> LoginResult<()> {
        let _guard = self.lock.write().await;
        self.write_all(&HashMap::new()).await
    }
}
