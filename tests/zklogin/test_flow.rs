// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Login State Machine Tests
//!
//! Drives `Idle -> SessionStarted -> AwaitingIdentityToken -> Resolved` and
//! every abort path, checking the store after each.

use super::support::{callback, google_token, token_with_claims, CLIENT_ID, ISSUER, REDIRECT_URI};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use suipeer_zk::config::{BuildMode, OAuthConfig, ZkConfig};
use suipeer_zk::zklogin::{
    derive_address, FileSessionStore, IdentityBindingResolver, LoginError, LoginFlow, LoginResult,
    LoginState, MemorySessionStore, NonceStrategy, SessionKey, SessionStore,
};

const SALT: &str = "test-salt";

fn flow_with(store: Arc<dyn SessionStore>) -> LoginFlow {
    LoginFlow::new(
        store,
        OAuthConfig::google(CLIENT_ID, REDIRECT_URI),
        IdentityBindingResolver::new(SALT),
        NonceStrategy::KeyBound,
        2,
    )
}

fn flow() -> (LoginFlow, MemorySessionStore) {
    let store = MemorySessionStore::new();
    (flow_with(Arc::new(store.clone())), store)
}

/// Memory store whose reads or writes can be switched to fail
#[derive(Default)]
struct FlakyStore {
    inner: MemorySessionStore,
    fail_gets: AtomicBool,
    fail_puts: AtomicBool,
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn put(&self, key: SessionKey, value: String) -> LoginResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(LoginError::storage("disk full"));
        }
        self.inner.put(key, value).await
    }

    async fn get(&self, key: SessionKey) -> LoginResult<Option<String>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(LoginError::storage("permission denied"));
        }
        self.inner.get(key).await
    }

    async fn remove(&self, key: SessionKey) -> LoginResult<()> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> LoginResult<()> {
        self.inner.clear().await
    }
}

async fn assert_store_empty(store: &MemorySessionStore) {
    for key in SessionKey::ALL {
        assert!(store.get(key).await.unwrap().is_none(), "{:?} survived", key);
    }
}

#[tokio::test]
async fn test_full_login() {
    let (mut flow, store) = flow();
    assert_eq!(flow.state(), LoginState::Idle);

    let session = flow.start_session(100).await.unwrap();
    assert_eq!(flow.state(), LoginState::SessionStarted);

    let request = flow.authorize().await.unwrap();
    assert_eq!(flow.state(), LoginState::AwaitingIdentityToken);
    assert_eq!(request.nonce, session.nonce);
    assert_eq!(request.state, session.state);

    let params: HashMap<String, String> = request.url.query_pairs().into_owned().collect();
    assert_eq!(request.url.host_str(), Some("accounts.google.com"));
    assert_eq!(params["response_type"], "id_token");
    assert_eq!(params["scope"], "openid email profile");
    assert_eq!(params["prompt"], "select_account");
    assert_eq!(params["client_id"], CLIENT_ID);
    assert_eq!(params["redirect_uri"], REDIRECT_URI);
    assert_eq!(params["state"], request.state);
    assert_eq!(params["nonce"], request.nonce);

    let token = google_token("110169484474386276334", &request.nonce);
    let binding = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap();
    assert_eq!(flow.state(), LoginState::Resolved);
    assert_eq!(
        binding.account_address,
        derive_address(ISSUER, "110169484474386276334", CLIENT_ID, SALT).unwrap()
    );
    assert_eq!(binding.display_name, "reviewer@example.org");

    assert_eq!(
        flow.current_address().await.unwrap(),
        Some(binding.account_address.clone())
    );
    assert_eq!(
        store.get(SessionKey::ResolvedToken).await.unwrap(),
        Some(token)
    );
    for key in SessionKey::EPHEMERAL {
        assert!(store.get(key).await.unwrap().is_none(), "{:?} survived", key);
    }

    flow.logout().await.unwrap();
    assert_eq!(flow.state(), LoginState::Idle);
    assert!(flow.binding().is_none());
    assert_store_empty(&store).await;
}

#[tokio::test]
async fn test_state_mismatch_aborts() {
    let (mut flow, store) = flow();
    let request = flow.begin(1).await.unwrap();

    let token = google_token("sub", &request.nonce);
    let err = flow
        .handle_callback(&callback(&token, "forged-state"))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::StateMismatch));
    assert!(err.is_security_violation());
    assert_eq!(flow.state(), LoginState::Aborted);
    assert_store_empty(&store).await;
}

#[tokio::test]
async fn test_nonce_mismatch_aborts() {
    let (mut flow, store) = flow();
    let request = flow.begin(1).await.unwrap();

    let token = google_token("sub", "some-other-nonce");
    let err = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::NonceMismatch));
    assert_eq!(flow.state(), LoginState::Aborted);
    assert_store_empty(&store).await;
}

#[tokio::test]
async fn test_missing_token_aborts() {
    let (mut flow, store) = flow();
    let request = flow.begin(1).await.unwrap();

    let err = flow
        .handle_callback(&format!("{}#state={}", REDIRECT_URI, request.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::MissingToken));
    assert_eq!(flow.state(), LoginState::Aborted);
    assert_store_empty(&store).await;
}

#[tokio::test]
async fn test_malformed_token_aborts() {
    let (mut flow, _) = flow();
    let request = flow.begin(1).await.unwrap();

    let err = flow
        .handle_callback(&callback("only.two", &request.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::InvalidTokenFormat { .. }));
    assert_eq!(flow.state(), LoginState::Aborted);
}

#[tokio::test]
async fn test_session_missing_aborts() {
    let (mut flow, store) = flow();
    let request = flow.begin(1).await.unwrap();

    // Storage wiped between redirect and callback
    store.clear().await.unwrap();

    let token = google_token("sub", &request.nonce);
    let err = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::SessionMissing { .. }));
    assert_eq!(flow.state(), LoginState::Aborted);
}

#[tokio::test]
async fn test_provider_error_is_cancel() {
    let (mut flow, store) = flow();
    let request = flow.begin(1).await.unwrap();

    let err = flow
        .handle_callback(&format!(
            "{}#error=access_denied&state={}",
            REDIRECT_URI, request.state
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::Cancelled));
    assert_eq!(flow.state(), LoginState::Aborted);
    assert_store_empty(&store).await;
}

#[tokio::test]
async fn test_explicit_cancel() {
    let (mut flow, store) = flow();
    flow.begin(1).await.unwrap();

    flow.cancel().await.unwrap();
    assert_eq!(flow.state(), LoginState::Aborted);
    assert_store_empty(&store).await;
}

#[tokio::test]
async fn test_invalid_transitions() {
    let (mut flow, _) = flow();

    let err = flow.authorize().await.unwrap_err();
    assert!(matches!(err, LoginError::InvalidTransition { .. }));
    assert_eq!(flow.state(), LoginState::Idle);

    let err = flow.handle_callback("#state=x").await.unwrap_err();
    assert!(matches!(err, LoginError::InvalidTransition { .. }));

    let request = flow.begin(1).await.unwrap();
    let token = google_token("sub", &request.nonce);
    flow.handle_callback(&callback(&token, &request.state))
        .await
        .unwrap();

    // A resolved flow cannot accept another callback or start over without logout
    let err = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot handle callback while login is Resolved"
    );
    assert!(matches!(
        flow.start_session(2).await,
        Err(LoginError::InvalidTransition { .. })
    ));
    assert_eq!(flow.state(), LoginState::Resolved);
}

#[tokio::test]
async fn test_restart_after_abort_uses_new_nonce() {
    let (mut flow, _) = flow();
    let first = flow.begin(1).await.unwrap();
    flow.cancel().await.unwrap();

    let second = flow.begin(1).await.unwrap();
    assert_eq!(flow.state(), LoginState::AwaitingIdentityToken);
    assert_ne!(first.nonce, second.nonce);

    // A token minted for the abandoned attempt is refused
    let stale = google_token("sub", &first.nonce);
    let err = flow
        .handle_callback(&callback(&stale, &second.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::NonceMismatch));
}

#[tokio::test]
async fn test_resume_across_processes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let request = {
        let mut flow = flow_with(Arc::new(FileSessionStore::new(&path)));
        flow.begin(7).await.unwrap()
    };
    assert!(path.exists());

    let mut resumed = flow_with(Arc::new(FileSessionStore::new(&path)));
    resumed.resume().await.unwrap();
    assert_eq!(resumed.state(), LoginState::AwaitingIdentityToken);

    let token = google_token("sub", &request.nonce);
    let binding = resumed
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap();
    assert_eq!(resumed.state(), LoginState::Resolved);

    let reader = flow_with(Arc::new(FileSessionStore::new(&path)));
    assert_eq!(
        reader.current_address().await.unwrap(),
        Some(binding.account_address)
    );
}

#[tokio::test]
async fn test_resume_without_session_aborts() {
    let (mut flow, _) = flow();
    let err = flow.resume().await.unwrap_err();
    assert!(matches!(err, LoginError::SessionMissing { .. }));
    assert_eq!(flow.state(), LoginState::Aborted);
}

#[tokio::test]
async fn test_audience_array_uses_first_entry() {
    let (mut flow, _) = flow();
    let request = flow.begin(1).await.unwrap();
    let token = token_with_claims(&json!({
        "iss": ISSUER,
        "sub": "sub-1",
        "aud": [CLIENT_ID, "other-client"],
        "nonce": request.nonce,
    }));

    let binding = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap();
    assert_eq!(
        binding.account_address,
        derive_address(ISSUER, "sub-1", CLIENT_ID, SALT).unwrap()
    );
    assert_eq!(binding.display_name, format!("sub-1 @ {}", ISSUER));
}

#[tokio::test]
async fn test_from_config_refuses_invalid_settings() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());

    // Production without a deployment salt
    let config = ZkConfig::default();
    assert_eq!(config.build_mode, BuildMode::Production);
    assert!(matches!(
        LoginFlow::from_config(store.clone(), &config),
        Err(LoginError::Configuration { .. })
    ));

    let mut config = ZkConfig {
        address_salt: SALT.to_string(),
        ..ZkConfig::default()
    };
    config.proof_timeout = Duration::ZERO;
    assert!(LoginFlow::from_config(store.clone(), &config).is_err());

    config.proof_timeout = Duration::from_secs(30);
    config.max_epoch_offset = 0;
    assert!(LoginFlow::from_config(store.clone(), &config).is_err());

    config.max_epoch_offset = 2;
    config.session_ttl = Duration::from_secs(90);
    let flow = LoginFlow::from_config(store, &config).unwrap();
    assert_eq!(flow.state(), LoginState::Idle);
    assert_eq!(flow.sessions().ttl(), Duration::from_secs(90));
}

#[tokio::test]
async fn test_abandoned_session_cannot_complete() {
    let (flow, store) = flow();
    let mut flow = flow.with_session_ttl(Duration::from_secs(600));
    let request = flow.begin(1).await.unwrap();

    // User came back from the provider hours later
    let abandoned = Utc::now() - chrono::Duration::hours(6);
    store
        .put(SessionKey::CreatedAt, abandoned.to_rfc3339())
        .await
        .unwrap();

    let token = google_token("sub", &request.nonce);
    let err = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::SessionMissing { .. }));
    assert_eq!(flow.state(), LoginState::Aborted);
    assert_store_empty(&store).await;
}

#[tokio::test]
async fn test_unreadable_store_aborts_callback() {
    let store = Arc::new(FlakyStore::default());
    let mut flow = flow_with(store.clone());
    let request = flow.begin(1).await.unwrap();

    store.fail_gets.store(true, Ordering::SeqCst);
    let token = google_token("sub", &request.nonce);
    let err = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::Storage { .. }));
    assert_eq!(flow.state(), LoginState::Aborted);
    assert!(flow.binding().is_none());
    assert!(store.inner.is_empty().await);
}

#[tokio::test]
async fn test_failed_binding_write_aborts_callback() {
    let store = Arc::new(FlakyStore::default());
    let mut flow = flow_with(store.clone());
    let request = flow.begin(1).await.unwrap();

    store.fail_puts.store(true, Ordering::SeqCst);
    let token = google_token("sub", &request.nonce);
    let err = flow
        .handle_callback(&callback(&token, &request.state))
        .await
        .unwrap_err();
    assert!(matches!(err, LoginError::Storage { .. }));
    assert_eq!(flow.state(), LoginState::Aborted);
    assert!(flow.binding().is_none());
    assert!(store.inner.is_empty().await);

    // A fresh attempt is allowed once storage recovers
    store.fail_puts.store(false, Ordering::SeqCst);
    assert!(flow.begin(2).await.is_ok());
}
