// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identity Binding Resolution
//!
//! Turns a returned identity token plus the session nonce into a stable
//! account address:
//!
//! ```text
//! seed    = Poseidon(H(sub), H(aud), H(salt))
//! address = 0x || hex(blake3(0x05 || len(iss) || iss || be32(seed)))
//! ```
//!
//! `H` maps bytes into the scalar field. The token's nonce claim must equal
//! the session nonce byte-for-byte; the nonce itself is not part of the
//! address, so the same identity resolves to the same address every login.

use super::error::{LoginError, LoginResult};
use super::token::IdentityToken;
use crate::zk::field::{bytes_to_field, fr_to_be_bytes};
use crate::zk::poseidon::poseidon_hash;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Signature scheme flag prefixed to the address preimage
pub const ADDRESS_SCHEME_FLAG: u8 = 0x05;

/// Result of a successful login
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentityBinding {
    pub account_address: String,
    pub raw_token: String,
    pub issuer: String,
    pub display_name: String,
}

impl std::fmt::Debug for IdentityBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityBinding")
            .field("account_address", &self.account_address)
            .field("issuer", &self.issuer)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

/// Derive the account address for an issuer/subject/audience under `salt`
pub fn derive_address(issuer: &str, subject: &str, audience: &str, salt: &str) -> LoginResult<String> {
    let iss_len = u8::try_from(issuer.len())
        .map_err(|_| LoginError::invalid_token("issuer longer than 255 bytes"))?;

    let seed = poseidon_hash(&[
        bytes_to_field(subject.as_bytes()),
        bytes_to_field(audience.as_bytes()),
        bytes_to_field(salt.as_bytes()),
    ])?;

    let mut hasher = blake3::Hasher::new();
    hasher.update(&[ADDRESS_SCHEME_FLAG, iss_len]);
    hasher.update(issuer.as_bytes());
    hasher.update(&fr_to_be_bytes(&seed));
    Ok(format!("0x{}", hasher.finalize().to_hex()))
}

#[derive(Clone)]
pub struct IdentityBindingResolver {
    salt: String,
}

impl IdentityBindingResolver {
    pub fn new(salt: impl Into<String>) -> Self {
        Self { salt: salt.into() }
    }

    /// Account address for `raw_token`, which must carry `expected_nonce`
    pub fn resolve(&self, raw_token: &str, expected_nonce: &str) -> LoginResult<String> {
        Ok(self.resolve_binding(raw_token, expected_nonce)?.account_address)
    }

    pub fn resolve_binding(
        &self,
        raw_token: &str,
        expected_nonce: &str,
    ) -> LoginResult<IdentityBinding> {
        let token = IdentityToken::parse(raw_token)?;
        let claims = &token.claims;

        if claims.nonce.as_deref().map(str::as_bytes) != Some(expected_nonce.as_bytes()) {
            error!(
                "🚨 Identity token nonce mismatch for issuer {}; aborting login",
                claims.iss
            );
            return Err(LoginError::NonceMismatch);
        }

        let audience = claims
            .aud
            .primary()
            .ok_or_else(|| LoginError::invalid_token("token has no audience"))?;
        let account_address = derive_address(&claims.iss, &claims.sub, audience, &self.salt)?;
        debug!("Resolved identity from {} to {}", claims.iss, account_address);

        Ok(IdentityBinding {
            account_address,
            raw_token: token.raw().to_string(),
            issuer: claims.iss.clone(),
            display_name: claims.display_name(),
        })
    }
}
