// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Login State Machine
//!
//! ```text
//! Idle -> SessionStarted -> AwaitingIdentityToken -> Resolved
//!   \___________\__________________\_____________-> Aborted
//! ```
//!
//! `Resolved` and `Aborted` are terminal for an attempt. A new attempt always
//! starts a fresh session, so nonces are never reused. Aborting or logging
//! out clears every login key from the store.

use super::error::{LoginError, LoginResult};
use super::resolver::{IdentityBinding, IdentityBindingResolver};
use super::session::{EphemeralSession, NonceStrategy, SessionManager};
use super::storage::{SessionKey, SessionStore};
use crate::config::{OAuthConfig, ZkConfig};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    SessionStarted,
    AwaitingIdentityToken,
    Resolved,
    Aborted,
}

impl LoginState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoginState::Resolved | LoginState::Aborted)
    }
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where to send the user, plus the values the provider will echo back
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub state: String,
    pub nonce: String,
}

/// Parameters returned by the provider in the redirect fragment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub id_token: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parse a full redirect URL, a `#fragment` or a bare fragment
    pub fn parse(callback: &str) -> Self {
        let fragment = match callback.split_once('#') {
            Some((_, fragment)) => fragment,
            None => callback.split_once('?').map(|(_, q)| q).unwrap_or(callback),
        };

        let mut params = CallbackParams::default();
        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                "id_token" => params.id_token = value,
                "state" => params.state = value,
                "error" => params.error = value,
                _ => {}
            }
        }
        params
    }
}

/// Build the provider authorization URL for a session
pub fn authorization_url(oauth: &OAuthConfig, session: &EphemeralSession) -> LoginResult<Url> {
    Url::parse_with_params(
        &oauth.authorization_endpoint,
        &[
            ("client_id", oauth.client_id.as_str()),
            ("redirect_uri", oauth.redirect_uri.as_str()),
            ("response_type", "id_token"),
            ("scope", oauth.scope.as_str()),
            ("nonce", session.nonce.as_str()),
            ("state", session.state.as_str()),
            ("prompt", "select_account"),
        ],
    )
    .map_err(|e| LoginError::Configuration {
        reason: format!("authorization endpoint: {}", e),
    })
}

pub struct LoginFlow {
    state: LoginState,
    store: Arc<dyn SessionStore>,
    sessions: SessionManager,
    resolver: IdentityBindingResolver,
    oauth: OAuthConfig,
    binding: Option<IdentityBinding>,
}

impl LoginFlow {
    pub fn new(
        store: Arc<dyn SessionStore>,
        oauth: OAuthConfig,
        resolver: IdentityBindingResolver,
        strategy: NonceStrategy,
        max_epoch_offset: u64,
    ) -> Self {
        Self {
            state: LoginState::Idle,
            sessions: SessionManager::new(store.clone(), strategy, max_epoch_offset),
            store,
            resolver,
            oauth,
            binding: None,
        }
    }

    /// Build from runtime configuration; out-of-range settings are refused
    pub fn from_config(store: Arc<dyn SessionStore>, config: &ZkConfig) -> LoginResult<Self> {
        config
            .validate()
            .map_err(|reason| LoginError::Configuration { reason })?;
        Ok(Self::new(
            store,
            config.oauth.clone(),
            IdentityBindingResolver::new(config.address_salt.clone()),
            config.nonce_strategy,
            config.max_epoch_offset,
        )
        .with_session_ttl(config.session_ttl))
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = self.sessions.with_ttl(ttl);
        self
    }

    pub fn state(&self) -> LoginState {
        self.state
    }

    pub fn binding(&self) -> Option<&IdentityBinding> {
        self.binding.as_ref()
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    fn transition_error(&self, action: &str) -> LoginError {
        LoginError::InvalidTransition {
            from: self.state.to_string(),
            action: action.to_string(),
        }
    }

    /// `Idle -> SessionStarted`
    pub async fn start_session(&mut self, current_epoch: u64) -> LoginResult<EphemeralSession> {
        if !matches!(self.state, LoginState::Idle | LoginState::Aborted) {
            return Err(self.transition_error("start a session"));
        }
        let session = self.sessions.start_session(current_epoch).await?;
        self.binding = None;
        self.state = LoginState::SessionStarted;
        Ok(session)
    }

    /// `SessionStarted -> AwaitingIdentityToken`
    pub async fn authorize(&mut self) -> LoginResult<AuthorizationRequest> {
        if self.state != LoginState::SessionStarted {
            return Err(self.transition_error("redirect to the identity provider"));
        }
        let session = match self.sessions.load_session().await {
            Ok(Some(session)) => session,
            Ok(None) => return Err(self.abort(LoginError::session_missing("session vanished before redirect")).await),
            Err(e) => return Err(self.abort(e).await),
        };
        let url = authorization_url(&self.oauth, &session)?;
        self.state = LoginState::AwaitingIdentityToken;
        info!("🌐 Redirecting to identity provider {}", self.oauth.authorization_endpoint);
        Ok(AuthorizationRequest {
            url,
            state: session.state,
            nonce: session.nonce,
        })
    }

    /// Start a session and build its authorization request
    pub async fn begin(&mut self, current_epoch: u64) -> LoginResult<AuthorizationRequest> {
        self.start_session(current_epoch).await?;
        self.authorize().await
    }

    /// Pick up a flow whose redirect happened in an earlier process
    pub async fn resume(&mut self) -> LoginResult<()> {
        if self.state != LoginState::Idle {
            return Err(self.transition_error("resume a login"));
        }
        match self.sessions.load_session().await {
            Ok(Some(_)) => {
                self.state = LoginState::AwaitingIdentityToken;
                Ok(())
            }
            Ok(None) => Err(self.abort(LoginError::session_missing("nothing stored to resume")).await),
            Err(e) => Err(self.abort(e).await),
        }
    }

    /// `AwaitingIdentityToken -> Resolved | Aborted`
    pub async fn handle_callback(&mut self, callback: &str) -> LoginResult<IdentityBinding> {
        if self.state != LoginState::AwaitingIdentityToken {
            return Err(self.transition_error("handle callback"));
        }

        let params = CallbackParams::parse(callback);
        if let Some(reason) = params.error {
            warn!("Identity provider returned error: {}", reason);
            return Err(self.abort(LoginError::Cancelled).await);
        }

        let session = match self.sessions.load_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                return Err(self
                    .abort(LoginError::session_missing("ephemeral key or nonce not found"))
                    .await)
            }
            Err(e) => return Err(self.abort(e).await),
        };

        if params.state.as_deref() != Some(session.state.as_str()) {
            error!("🚨 OAuth state mismatch; aborting login");
            return Err(self.abort(LoginError::StateMismatch).await);
        }
        let Some(raw_token) = params.id_token else {
            return Err(self.abort(LoginError::MissingToken).await);
        };

        let binding = match self.resolver.resolve_binding(&raw_token, &session.nonce) {
            Ok(binding) => binding,
            Err(e) => return Err(self.abort(e).await),
        };

        if let Err(e) = self.persist_binding(&binding).await {
            return Err(self.abort(e).await);
        }

        info!(
            "✅ Login resolved for {} ({})",
            binding.display_name, binding.account_address
        );
        self.state = LoginState::Resolved;
        self.binding = Some(binding.clone());
        Ok(binding)
    }

    /// Drop the ephemeral session and record the resolved identity
    async fn persist_binding(&self, binding: &IdentityBinding) -> LoginResult<()> {
        self.sessions.clear().await?;
        self.store
            .put(SessionKey::ResolvedAddress, binding.account_address.clone())
            .await?;
        self.store
            .put(SessionKey::ResolvedToken, binding.raw_token.clone())
            .await
    }

    /// Explicit cancel from any state
    pub async fn cancel(&mut self) -> LoginResult<()> {
        let _ = self.abort(LoginError::Cancelled).await;
        Ok(())
    }

    /// Forget the resolved identity and any in-flight session
    pub async fn logout(&mut self) -> LoginResult<()> {
        self.store.clear().await?;
        self.binding = None;
        self.state = LoginState::Idle;
        info!("👋 Logged out");
        Ok(())
    }

    /// Address resolved by this or an earlier process
    pub async fn current_address(&self) -> LoginResult<Option<String>> {
        self.store.get(SessionKey::ResolvedAddress).await
    }

    async fn abort(&mut self, reason: LoginError) -> LoginError {
        if let Err(e) = self.store.clear().await {
            warn!("Failed to clear login session during abort: {}", e);
        }
        self.binding = None;
        self.state = LoginState::Aborted;
        if reason.is_security_violation() {
            error!("🚨 Login aborted: {}", reason);
        } else {
            info!("Login aborted: {}", reason);
        }
        reason
    }
}
