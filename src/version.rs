// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the SuiPeer ZK toolkit

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-zk-credentials-2025-10-20";

/// Semantic version number
pub const VERSION_NUMBER: &str = env!("CARGO_PKG_VERSION");

/// Build date
pub const BUILD_DATE: &str = "2025-10-20";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "poseidon-commitments",
    "groth16-bn254",
    "credential-circuit",
    "reviewer-qualification-circuit",
    "anonymous-review-circuit",
    "coalesced-artifact-fetch",
    "proof-timeout",
    "proof-cancellation",
    "key-bound-nonce",
    "zklogin-address-derivation",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("SuiPeer ZK {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info as JSON
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
        "wire_format": crate::zk::PROOF_WIRE_FORMAT,
    })
}
