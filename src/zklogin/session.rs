// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ephemeral Login Sessions
//!
//! One [`EphemeralSession`] per login attempt: a fresh Ed25519 signing key,
//! the OAuth `state` and the `nonce` sent to the identity provider. The
//! session lives in the injected [`SessionStore`] until the attempt is
//! resolved, abandoned or logged out, and is never reused. A stored session
//! older than the manager's TTL is treated as abandoned and cleared on load.
//!
//! ## Nonce strategies
//!
//! - [`NonceStrategy::KeyBound`] (default): `Poseidon(pk_hi, pk_lo, max_epoch,
//!   randomness)` truncated to its low 160 bits and base64url encoded. The
//!   token's nonce claim therefore commits to the ephemeral public key, so a
//!   token cannot be replayed with a substituted key.
//! - [`NonceStrategy::LegacyDecimal`]: nine random decimal digits (under 30
//!   bits). Only for verifiers that expect the old format.

use super::error::{LoginError, LoginResult};
use super::storage::{SessionKey, SessionStore};
use crate::config::DEFAULT_SESSION_TTL_SECS;
use crate::zk::field::fr_to_be_bytes;
use crate::zk::poseidon::poseidon_hash;
use crate::zk::ZkResult;
use ark_bn254::Fr;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Length of the OAuth `state` value
pub const STATE_LENGTH: usize = 32;

/// Digits in a legacy decimal nonce
pub const LEGACY_NONCE_DIGITS: usize = 9;

/// Bytes of the Poseidon digest kept in a key-bound nonce
pub const NONCE_BYTES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NonceStrategy {
    #[default]
    KeyBound,
    LegacyDecimal,
}

impl FromStr for NonceStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "key-bound" => Ok(NonceStrategy::KeyBound),
            "legacy-decimal" => Ok(NonceStrategy::LegacyDecimal),
            other => Err(format!("unknown nonce strategy: {}", other)),
        }
    }
}

impl fmt::Display for NonceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonceStrategy::KeyBound => f.write_str("key-bound"),
            NonceStrategy::LegacyDecimal => f.write_str("legacy-decimal"),
        }
    }
}

/// Random 32-character alphanumeric OAuth state
pub fn generate_state() -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// Nine random decimal digits
pub fn generate_legacy_nonce() -> String {
    format!("{:09}", OsRng.gen_range(0..1_000_000_000u32))
}

/// Nonce committing to the ephemeral public key, expiry epoch and randomness
pub fn key_bound_nonce(public_key: &[u8; 32], max_epoch: u64, randomness: u128) -> ZkResult<String> {
    let mut hi = [0u8; 16];
    let mut lo = [0u8; 16];
    hi.copy_from_slice(&public_key[..16]);
    lo.copy_from_slice(&public_key[16..]);

    let digest = poseidon_hash(&[
        Fr::from(u128::from_be_bytes(hi)),
        Fr::from(u128::from_be_bytes(lo)),
        Fr::from(max_epoch),
        Fr::from(randomness),
    ])?;
    let bytes = fr_to_be_bytes(&digest);
    Ok(URL_SAFE_NO_PAD.encode(&bytes[32 - NONCE_BYTES..]))
}

/// State for one login round trip
#[derive(Clone)]
pub struct EphemeralSession {
    signing_key: SigningKey,
    pub state: String,
    pub nonce: String,
    /// Decimal nonce randomness, present for key-bound nonces
    pub randomness: Option<String>,
    pub max_epoch: u64,
    pub created_at: DateTime<Utc>,
}

impl EphemeralSession {
    pub fn strategy(&self) -> NonceStrategy {
        if self.randomness.is_some() {
            NonceStrategy::KeyBound
        } else {
            NonceStrategy::LegacyDecimal
        }
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn public_key_base64(&self) -> String {
        STANDARD.encode(self.public_key_bytes())
    }

    /// Sign with the ephemeral key
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Time since the session was created; zero if `created_at` is in the future
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Whether the nonce is consistent with the key, epoch and randomness
    fn nonce_is_consistent(&self) -> bool {
        match &self.randomness {
            Some(randomness) => randomness
                .parse::<u128>()
                .ok()
                .and_then(|r| key_bound_nonce(&self.public_key_bytes(), self.max_epoch, r).ok())
                .map(|expected| expected == self.nonce)
                .unwrap_or(false),
            None => {
                self.nonce.len() == LEGACY_NONCE_DIGITS
                    && self.nonce.bytes().all(|b| b.is_ascii_digit())
            }
        }
    }
}

impl fmt::Debug for EphemeralSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralSession")
            .field("public_key", &self.public_key_base64())
            .field("max_epoch", &self.max_epoch)
            .field("created_at", &self.created_at)
            .field("strategy", &self.strategy())
            .finish_non_exhaustive()
    }
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    strategy: NonceStrategy,
    max_epoch_offset: u64,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, strategy: NonceStrategy, max_epoch_offset: u64) -> Self {
        Self {
            store,
            strategy,
            max_epoch_offset,
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Generate and persist a fresh session, replacing any in-flight one
    pub async fn start_session(&self, current_epoch: u64) -> LoginResult<EphemeralSession> {
        self.clear().await?;

        let signing_key = SigningKey::generate(&mut OsRng);
        let max_epoch = current_epoch.saturating_add(self.max_epoch_offset);
        let (nonce, randomness) = match self.strategy {
            NonceStrategy::KeyBound => {
                let randomness: u128 = OsRng.gen();
                let nonce =
                    key_bound_nonce(&signing_key.verifying_key().to_bytes(), max_epoch, randomness)?;
                (nonce, Some(randomness.to_string()))
            }
            NonceStrategy::LegacyDecimal => {
                warn!("⚠️  Using legacy decimal login nonce (under 30 bits of entropy)");
                (generate_legacy_nonce(), None)
            }
        };

        let session = EphemeralSession {
            signing_key,
            state: generate_state(),
            nonce,
            randomness,
            max_epoch,
            created_at: Utc::now(),
        };
        self.persist(&session).await?;

        info!(
            "🔑 Started login session (strategy: {}, max epoch: {})",
            self.strategy, session.max_epoch
        );
        Ok(session)
    }

    async fn persist(&self, session: &EphemeralSession) -> LoginResult<()> {
        let store = &self.store;
        store
            .put(
                SessionKey::EphemeralPrivateKey,
                STANDARD.encode(session.signing_key.to_bytes()),
            )
            .await?;
        store.put(SessionKey::StateString, session.state.clone()).await?;
        store.put(SessionKey::Nonce, session.nonce.clone()).await?;
        if let Some(randomness) = &session.randomness {
            store.put(SessionKey::NonceRandomness, randomness.clone()).await?;
        }
        store
            .put(SessionKey::MaxEpoch, session.max_epoch.to_string())
            .await?;
        store
            .put(SessionKey::CreatedAt, session.created_at.to_rfc3339())
            .await?;
        Ok(())
    }

    /// Resume the in-flight session; `None` when nothing usable is stored
    pub async fn load_session(&self) -> LoginResult<Option<EphemeralSession>> {
        let store = &self.store;
        let (Some(key), Some(state), Some(nonce), Some(max_epoch), Some(created_at)) = (
            store.get(SessionKey::EphemeralPrivateKey).await?,
            store.get(SessionKey::StateString).await?,
            store.get(SessionKey::Nonce).await?,
            store.get(SessionKey::MaxEpoch).await?,
            store.get(SessionKey::CreatedAt).await?,
        ) else {
            return Ok(None);
        };
        let randomness = store.get(SessionKey::NonceRandomness).await?;

        let session = decode_signing_key(&key).and_then(|signing_key| {
            Some(EphemeralSession {
                signing_key,
                state,
                nonce,
                randomness,
                max_epoch: max_epoch.parse().ok()?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .ok()?
                    .with_timezone(&Utc),
            })
        });

        match session {
            Some(session) if !session.nonce_is_consistent() => {
                warn!("⚠️  Stored login nonce does not match the stored key; discarding session");
            }
            Some(session) if session.age_at(Utc::now()) > self.ttl => {
                warn!(
                    "⚠️  Stored login session expired ({}s old, ttl {}s); discarding it",
                    session.age_at(Utc::now()).as_secs(),
                    self.ttl.as_secs()
                );
            }
            Some(session) => return Ok(Some(session)),
            None => {
                warn!("⚠️  Stored login session is corrupt; discarding it");
            }
        }
        self.clear().await?;
        Ok(None)
    }

    /// Like [`load_session`](Self::load_session) but missing data is an error
    pub async fn require_session(&self) -> LoginResult<EphemeralSession> {
        self.load_session()
            .await?
            .ok_or_else(|| LoginError::session_missing("no ephemeral key or nonce stored"))
    }

    /// Remove the in-flight session values
    pub async fn clear(&self) -> LoginResult<()> {
        for key in SessionKey::EPHEMERAL {
            self.store.remove(key).await?;
        }
        Ok(())
    }
}

fn decode_signing_key(encoded: &str) -> Option<SigningKey> {
    let bytes = STANDARD.decode(encoded).ok()?;
    let secret: [u8; 32] = bytes.try_into().ok()?;
    Some(SigningKey::from_bytes(&secret))
}
