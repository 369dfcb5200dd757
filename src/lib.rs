// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod contracts;
pub mod version;
pub mod zk;
pub mod zklogin;

// Re-export main types
pub use config::{BuildMode, LedgerConfig, OAuthConfig, ZkConfig};
pub use contracts::{LedgerClient, VerificationSubmitter, VerifierTarget};
pub use zk::{
    CircuitInputs, CircuitKind, CommitmentHasher, CredentialTuple, EncodedProof, ProofEncoder,
    ProofGenerator, ZkError, ZkProofBundle,
};
pub use zklogin::{IdentityBindingResolver, LoginError, LoginFlow, SessionManager, SessionStore};
