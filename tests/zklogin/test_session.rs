// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::collections::HashSet;
use std::sync::Arc;
use suipeer_zk::zklogin::{
    key_bound_nonce, MemorySessionStore, NonceStrategy, SessionKey, SessionManager, SessionStore,
};

fn manager(strategy: NonceStrategy) -> (SessionManager, MemorySessionStore) {
    let store = MemorySessionStore::new();
    (SessionManager::new(Arc::new(store.clone()), strategy, 2), store)
}

#[tokio::test]
async fn test_sequential_sessions_get_fresh_nonces() {
    let (manager, _) = manager(NonceStrategy::KeyBound);

    let first = manager.start_session(10).await.unwrap();
    manager.clear().await.unwrap();
    assert!(manager.load_session().await.unwrap().is_none());

    let second = manager.start_session(10).await.unwrap();
    assert_ne!(first.nonce, second.nonce);
    assert_ne!(first.state, second.state);
    assert_ne!(first.public_key_bytes(), second.public_key_bytes());

    let loaded = manager.load_session().await.unwrap().unwrap();
    assert_eq!(loaded.nonce, second.nonce);
    assert_ne!(loaded.nonce, first.nonce);
}

#[tokio::test]
async fn test_start_replaces_in_flight_session() {
    let (manager, _) = manager(NonceStrategy::KeyBound);
    let first = manager.start_session(1).await.unwrap();
    let second = manager.start_session(1).await.unwrap();

    let loaded = manager.load_session().await.unwrap().unwrap();
    assert_eq!(loaded.nonce, second.nonce);
    assert_ne!(loaded.nonce, first.nonce);
}

#[tokio::test]
async fn test_key_bound_nonce_commits_to_session_key() {
    let (manager, _) = manager(NonceStrategy::KeyBound);
    let session = manager.start_session(40).await.unwrap();

    let randomness: u128 = session.randomness.as_deref().unwrap().parse().unwrap();
    let expected = key_bound_nonce(&session.public_key_bytes(), 42, randomness).unwrap();
    assert_eq!(session.nonce, expected);
    assert_eq!(session.max_epoch, 42);
}

#[tokio::test]
async fn test_many_nonces_are_distinct() {
    let (manager, _) = manager(NonceStrategy::KeyBound);
    let mut seen = HashSet::new();
    for _ in 0..32 {
        let session = manager.start_session(0).await.unwrap();
        assert!(seen.insert(session.nonce));
    }
}

#[tokio::test]
async fn test_clear_keeps_resolved_identity() {
    let (manager, store) = manager(NonceStrategy::LegacyDecimal);
    manager.start_session(0).await.unwrap();
    store
        .put(SessionKey::ResolvedAddress, "0xabc".to_string())
        .await
        .unwrap();

    manager.clear().await.unwrap();
    for key in SessionKey::EPHEMERAL {
        assert!(store.get(key).await.unwrap().is_none(), "{:?} survived", key);
    }
    assert_eq!(
        store.get(SessionKey::ResolvedAddress).await.unwrap().as_deref(),
        Some("0xabc")
    );
}
