// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth wire types and token freshness math.

use serde::{Deserialize, Serialize};

use crate::provider::Provider;

/// Standard OAuth2 token response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// RFC 8628 device authorization response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

/// A stored OAuth token with its freshness metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Expiry as epoch seconds; `None` means no known expiry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub provider: Provider,
    /// Creation time as epoch seconds.
    pub created_at: u64,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl OAuthToken {
    /// Treat a token as expired this long before its real expiry.
    pub const EXPIRY_BUFFER_SECS: u64 = 5 * 60;
    /// Start refreshing this long before the real expiry.
    pub const REFRESH_BUFFER_SECS: u64 = 10 * 60;

    /// Build from a token endpoint response.
    pub fn from_response(response: &TokenResponse, provider: Provider, now: u64) -> Self {
        Self {
            access_token: response.access_token.clone(),
            token_type: response.token_type.clone().unwrap_or_else(default_token_type),
            scopes: response
                .scope
                .as_deref()
                .map(|s| s.split([' ', ',']).filter(|p| !p.is_empty()).map(String::from).collect())
                .unwrap_or_default(),
            expires_at: (response.expires_in > 0).then(|| now + response.expires_in),
            refresh_token: response.refresh_token.clone(),
            provider,
            created_at: now,
        }
    }

    /// Expired (with the 5-minute buffer applied). Tokens without an
    /// expiry never expire.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Self::EXPIRY_BUFFER_SECS >= expires_at,
            None => false,
        }
    }

    /// Within the 10-minute refresh window (or already expired).
    pub fn needs_refresh_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Self::REFRESH_BUFFER_SECS >= expires_at,
            None => false,
        }
    }

    pub fn refreshable(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Current time as epoch seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
