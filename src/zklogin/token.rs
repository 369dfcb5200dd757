// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Identity Token Parsing
//!
//! Structural decoding of `header.payload.signature` tokens. Nothing here
//! checks the signature; claims are used for display and as inputs to the
//! binding resolver, which enforces the nonce. The header is decoded
//! permissively so providers using any `alg` still parse.

use super::error::{LoginError, LoginResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `aud` is either a string or an array of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// The audience the token was issued for
    pub fn primary(&self) -> Option<&str> {
        match self {
            Audience::One(aud) => Some(aud.as_str()),
            Audience::Many(list) => list.first().map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub iss: String,
    pub sub: String,
    pub aud: Audience,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl IdentityClaims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map(|exp| exp <= now).unwrap_or(false)
    }

    /// Short human-readable identity, never including the raw token
    pub fn display_name(&self) -> String {
        self.email
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| format!("{} @ {}", self.sub, self.iss))
    }
}

/// JOSE header fields kept for display; unknown fields are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(default)]
    pub typ: Option<String>,
    #[serde(default)]
    pub kid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct IdentityToken {
    raw: String,
    pub header: TokenHeader,
    pub claims: IdentityClaims,
}

impl IdentityToken {
    pub fn parse(raw: &str) -> LoginResult<Self> {
        let segments: Vec<&str> = raw.split('.').collect();
        if segments.len() != 3 {
            return Err(LoginError::invalid_token(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        }
        if segments.iter().any(|s| s.is_empty()) {
            return Err(LoginError::invalid_token("empty segment"));
        }

        let header = decode_segment(segments[0], "header")?;
        let claims: IdentityClaims = decode_segment(segments[1], "payload")?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            claims,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, name: &str) -> LoginResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .map_err(|e| LoginError::invalid_token(format!("{} encoding: {}", name, e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| LoginError::invalid_token(format!("{} json: {}", name, e)))
}
