// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Login Error Types
//!
//! ## Classification
//!
//! - **Security violation**: `InvalidTokenFormat`, `NonceMismatch`,
//!   `StateMismatch`. Possible forgery; the flow aborts and nothing is retried.
//! - **Restart required**: `SessionMissing`, `MissingToken`, `Cancelled`.

use crate::zk::ZkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoginError {
    /// No usable ephemeral session in the store
    #[error("No login session found: {reason}")]
    SessionMissing { reason: String },

    /// Identity token is not a three-segment structured token
    #[error("Invalid identity token format: {reason}")]
    InvalidTokenFormat { reason: String },

    /// Token's nonce claim differs from the session nonce
    #[error("Identity token nonce does not match the login session")]
    NonceMismatch,

    /// Provider echoed a different `state`
    #[error("OAuth state does not match the login session")]
    StateMismatch,

    /// Callback did not carry an identity token
    #[error("Identity provider callback did not include an id_token")]
    MissingToken,

    /// Operation is not valid in the current login state
    #[error("Cannot {action} while login is {from}")]
    InvalidTransition { from: String, action: String },

    #[error("Login was cancelled")]
    Cancelled,

    #[error("Session storage error: {reason}")]
    Storage { reason: String },

    #[error("Login configuration error: {reason}")]
    Configuration { reason: String },

    #[error("Address derivation failed: {0}")]
    Zk(#[from] ZkError),
}

pub type LoginResult<T> = Result<T, LoginError>;

impl LoginError {
    pub fn session_missing(reason: impl Into<String>) -> Self {
        Self::SessionMissing {
            reason: reason.into(),
        }
    }

    pub fn invalid_token(reason: impl Into<String>) -> Self {
        Self::InvalidTokenFormat {
            reason: reason.into(),
        }
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        Self::Storage {
            reason: reason.into(),
        }
    }

    /// Possible forgery or replay; never retried silently
    pub fn is_security_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidTokenFormat { .. } | Self::NonceMismatch | Self::StateMismatch
        )
    }

    /// The user has to start a fresh login
    pub fn requires_restart(&self) -> bool {
        !matches!(
            self,
            Self::InvalidTransition { .. } | Self::Storage { .. } | Self::Configuration { .. }
        )
    }
}
