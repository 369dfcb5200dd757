// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime configuration
//!
//! Everything except [`BuildMode`] is read from the environment. The build
//! mode decides whether development-only proof placeholders are allowed, so
//! it is always passed explicitly by the caller.

pub mod chains;
pub mod provider;

pub use chains::{LedgerConfig, NetworkRegistry, SuiNetwork, DEFAULT_GAS_BUDGET};
pub use provider::OAuthConfig;

use crate::zklogin::session::NonceStrategy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default wall-clock ceiling for one proving run
pub const DEFAULT_PROOF_TIMEOUT_SECS: u64 = 60;

/// Upper bound accepted for the proving timeout
pub const MAX_PROOF_TIMEOUT_SECS: u64 = 600;

/// Wall-clock lifetime of an ephemeral login session
pub const DEFAULT_SESSION_TTL_SECS: u64 = 600;

/// Epochs an ephemeral key stays valid after the current one
pub const DEFAULT_MAX_EPOCH_OFFSET: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    #[default]
    Production,
}

impl BuildMode {
    /// Only development builds may substitute placeholder proofs
    pub fn allows_placeholder_proofs(self) -> bool {
        matches!(self, BuildMode::Development)
    }

    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => f.write_str("development"),
            BuildMode::Production => f.write_str("production"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(format!("unknown build mode: {}", other)),
        }
    }
}

/// Root that circuit artifacts are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactLocation {
    Http(Url),
    Directory(PathBuf),
}

impl Default for ArtifactLocation {
    fn default() -> Self {
        ArtifactLocation::Directory(PathBuf::from("./public"))
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactLocation::Http(url) => write!(f, "{}", url),
            ArtifactLocation::Directory(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZkConfig {
    pub artifacts: ArtifactLocation,
    pub proof_timeout: Duration,
    pub nonce_strategy: NonceStrategy,
    pub max_epoch_offset: u64,
    /// Stored sessions older than this are discarded
    pub session_ttl: Duration,
    /// Per-deployment salt mixed into derived account addresses
    pub address_salt: String,
    pub oauth: OAuthConfig,
    pub ledger: LedgerConfig,
    pub build_mode: BuildMode,
}

impl Default for ZkConfig {
    fn default() -> Self {
        Self {
            artifacts: ArtifactLocation::default(),
            proof_timeout: Duration::from_secs(DEFAULT_PROOF_TIMEOUT_SECS),
            nonce_strategy: NonceStrategy::default(),
            max_epoch_offset: DEFAULT_MAX_EPOCH_OFFSET,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            address_salt: String::new(),
            oauth: OAuthConfig::google("", "http://localhost:3000/auth/callback"),
            ledger: LedgerConfig::testnet(),
            build_mode: BuildMode::Production,
        }
    }
}

impl ZkConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `ZK_ARTIFACT_BASE_URL`: HTTP root for circuit artifacts (takes precedence)
    /// - `ZK_ARTIFACT_DIR`: local directory root for circuit artifacts
    /// - `ZK_PROOF_TIMEOUT_SECS`: proving timeout (default: 60)
    /// - `ZK_NONCE_STRATEGY`: `key-bound` (default) or `legacy-decimal`
    /// - `ZK_MAX_EPOCH_OFFSET`: ephemeral key lifetime in epochs (default: 2)
    /// - `ZK_SESSION_TTL_SECS`: ephemeral session lifetime (default: 600)
    /// - `ZK_ADDRESS_SALT`: salt for address derivation
    /// - `OAUTH_*`, `SUI_*`: see [`OAuthConfig`] and [`LedgerConfig`]
    ///
    /// The build mode is always `Production`; use [`ZkConfig::with_build_mode`].
    pub fn from_env() -> Self {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        config.oauth = OAuthConfig::from_env();
        config.ledger = std::env::var("SUI_NETWORK")
            .ok()
            .and_then(|n| n.parse::<SuiNetwork>().ok())
            .and_then(|n| NetworkRegistry::new().get(n).cloned())
            .unwrap_or_else(LedgerConfig::testnet);
        config
    }

    /// Build from an arbitrary key lookup; unknown or malformed values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let artifacts = lookup("ZK_ARTIFACT_BASE_URL")
            .and_then(|raw| Url::parse(&raw).ok())
            .map(ArtifactLocation::Http)
            .or_else(|| lookup("ZK_ARTIFACT_DIR").map(|d| ArtifactLocation::Directory(d.into())))
            .unwrap_or(defaults.artifacts);

        Self {
            artifacts,
            proof_timeout: lookup("ZK_PROOF_TIMEOUT_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.proof_timeout),
            nonce_strategy: lookup("ZK_NONCE_STRATEGY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.nonce_strategy),
            max_epoch_offset: lookup("ZK_MAX_EPOCH_OFFSET")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_epoch_offset),
            session_ttl: lookup("ZK_SESSION_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            address_salt: lookup("ZK_ADDRESS_SALT").unwrap_or(defaults.address_salt),
            ..defaults
        }
    }

    pub fn with_build_mode(mut self, build_mode: BuildMode) -> Self {
        self.build_mode = build_mode;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.proof_timeout.is_zero() {
            return Err("proof_timeout must be > 0".to_string());
        }
        if self.proof_timeout > Duration::from_secs(MAX_PROOF_TIMEOUT_SECS) {
            return Err(format!(
                "proof_timeout too large (max {}s)",
                MAX_PROOF_TIMEOUT_SECS
            ));
        }
        if self.max_epoch_offset == 0 || self.max_epoch_offset > 30 {
            return Err("max_epoch_offset must be between 1 and 30".to_string());
        }
        if self.session_ttl.is_zero() {
            return Err("session_ttl must be > 0".to_string());
        }
        if self.build_mode.is_production() && self.address_salt.is_empty() {
            return Err("ZK_ADDRESS_SALT must be set in production".to_string());
        }
        Ok(())
    }
}
