// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OAuth identity provider settings for the login flow

use serde::{Deserialize, Serialize};
use url::Url;

pub const GOOGLE_AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Scopes requested from the identity provider
pub const DEFAULT_SCOPE: &str = "openid email profile";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub redirect_uri: String,
    pub authorization_endpoint: String,
    pub scope: String,
}

impl OAuthConfig {
    pub fn google(client_id: impl Into<String>, redirect_uri: impl Into<String>) -> Self {
        OAuthConfig {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            authorization_endpoint: GOOGLE_AUTH_ENDPOINT.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    /// Read `OAUTH_CLIENT_ID`, `OAUTH_REDIRECT_URI` and `OAUTH_AUTH_ENDPOINT`
    pub fn from_env() -> Self {
        OAuthConfig {
            client_id: std::env::var("OAUTH_CLIENT_ID").unwrap_or_default(),
            redirect_uri: std::env::var("OAUTH_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:3000/auth/callback".to_string()),
            authorization_endpoint: std::env::var("OAUTH_AUTH_ENDPOINT")
                .unwrap_or_else(|_| GOOGLE_AUTH_ENDPOINT.to_string()),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.client_id.trim().is_empty() {
            return Err("OAUTH_CLIENT_ID is not set".to_string());
        }
        Url::parse(&self.redirect_uri)
            .map_err(|e| format!("invalid redirect uri {}: {}", self.redirect_uri, e))?;
        Url::parse(&self.authorization_endpoint).map_err(|e| {
            format!(
                "invalid authorization endpoint {}: {}",
                self.authorization_endpoint, e
            )
        })?;
        Ok(())
    }
}
