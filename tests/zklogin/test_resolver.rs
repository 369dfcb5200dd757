// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use super::support::{google_token, token_with_claims, CLIENT_ID, ISSUER};
use serde_json::json;
use suipeer_zk::zklogin::{derive_address, IdentityBindingResolver, LoginError};

#[test]
fn test_resolve_idempotent() {
    let resolver = IdentityBindingResolver::new("salt");
    let token = google_token("42", "nonce-1");
    let first = resolver.resolve(&token, "nonce-1").unwrap();
    let second = resolver.resolve(&token, "nonce-1").unwrap();
    assert_eq!(first, second);
    assert_eq!(first, derive_address(ISSUER, "42", CLIENT_ID, "salt").unwrap());
}

#[test]
fn test_address_shape() {
    let address = derive_address(ISSUER, "42", CLIENT_ID, "salt").unwrap();
    assert!(address.starts_with("0x"));
    assert_eq!(address.len(), 66);
    assert!(address[2..].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_identity_components_change_address() {
    let base = derive_address(ISSUER, "42", CLIENT_ID, "salt").unwrap();
    assert_ne!(base, derive_address("https://other.issuer", "42", CLIENT_ID, "salt").unwrap());
    assert_ne!(base, derive_address(ISSUER, "43", CLIENT_ID, "salt").unwrap());
    assert_ne!(base, derive_address(ISSUER, "42", "other-client", "salt").unwrap());
    assert_ne!(base, derive_address(ISSUER, "42", CLIENT_ID, "pepper").unwrap());
}

#[test]
fn test_nonce_must_match_exactly() {
    let resolver = IdentityBindingResolver::new("salt");
    let token = google_token("42", "nonce-1");
    assert!(matches!(
        resolver.resolve(&token, "nonce-1 "),
        Err(LoginError::NonceMismatch)
    ));
    assert!(matches!(
        resolver.resolve(&token, "NONCE-1"),
        Err(LoginError::NonceMismatch)
    ));
}

#[test]
fn test_malformed_and_wrong_nonce_are_distinct() {
    let resolver = IdentityBindingResolver::new("salt");
    let wrong = resolver
        .resolve(&google_token("42", "nonce-1"), "nonce-2")
        .unwrap_err();
    let malformed = resolver.resolve("a.b", "nonce-1").unwrap_err();
    assert!(matches!(wrong, LoginError::NonceMismatch));
    assert!(matches!(malformed, LoginError::InvalidTokenFormat { .. }));
    assert_ne!(wrong.to_string(), malformed.to_string());
}

#[test]
fn test_token_without_audience_is_malformed() {
    let token = token_with_claims(&json!({
        "iss": ISSUER,
        "sub": "42",
        "aud": [],
        "nonce": "n",
    }));
    let err = IdentityBindingResolver::new("salt").resolve(&token, "n").unwrap_err();
    assert!(matches!(err, LoginError::InvalidTokenFormat { .. }));
}
