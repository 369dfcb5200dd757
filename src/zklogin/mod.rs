// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! zkLogin Session Binding
//!
//! Ephemeral key and nonce management for OAuth logins, identity token
//! parsing and derivation of the account address the proofs are tied to.
//!
//! ## Module Structure
//!
//! - `storage`: injected session storage
//! - `session`: ephemeral keys, OAuth state and nonces
//! - `token`: identity token decoding
//! - `resolver`: nonce check and address derivation
//! - `flow`: login state machine
//! - `error`: error taxonomy

pub mod error;
pub mod flow;
pub mod resolver;
pub mod session;
pub mod storage;
pub mod token;

pub use error::{LoginError, LoginResult};
pub use flow::{authorization_url, AuthorizationRequest, CallbackParams, LoginFlow, LoginState};
pub use resolver::{derive_address, IdentityBinding, IdentityBindingResolver};
pub use session::{
    generate_legacy_nonce, generate_state, key_bound_nonce, EphemeralSession, NonceStrategy,
    SessionManager,
};
pub use storage::{FileSessionStore, MemorySessionStore, SessionKey, SessionStore};
pub use token::{Audience, IdentityClaims, IdentityToken, TokenHeader};
