// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Authentication configuration

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};
use std::fmt;

/// Credentials sent with every request
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer(String),
}

impl AuthConfig {
    /// Pick the strongest configured scheme: a token wins over a password
    pub fn from_parts(
        username: Option<String>,
        password: Option<String>,
        token: Option<String>,
    ) -> Self {
        match (token, username) {
            (Some(token), _) => AuthConfig::Bearer(token),
            (None, Some(username)) => AuthConfig::Basic {
                username,
                password: password.unwrap_or_default(),
            },
            (None, None) => AuthConfig::None,
        }
    }

    pub fn headers(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        let value = match self {
            AuthConfig::None => return Ok(headers),
            AuthConfig::Basic { username, password } => {
                let encoded = STANDARD.encode(format!("{username}:{password}"));
                HeaderValue::from_str(&format!("Basic {encoded}"))?
            }
            AuthConfig::Bearer(token) => HeaderValue::from_str(&format!("Bearer {token}"))?,
        };
        let mut value = value;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::None => write!(f, "AuthConfig::None"),
            AuthConfig::Basic { username, .. } => {
                write!(f, "AuthConfig::Basic {{ username: {username:?}, password: **** }}")
            }
            AuthConfig::Bearer(_) => write!(f, "AuthConfig::Bearer(****)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header() {
        let auth = AuthConfig::Basic {
            username: "admin".into(),
            password: "badger".into(),
        };
        let headers = auth.headers().unwrap();
        assert_eq!(headers[AUTHORIZATION], "Basic YWRtaW46YmFkZ2Vy");
        assert!(headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn token_wins_over_password() {
        let auth = AuthConfig::from_parts(Some("admin".into()), Some("pw".into()), Some("tok".into()));
        assert_eq!(auth, AuthConfig::Bearer("tok".into()));
        assert!(AuthConfig::default().headers().unwrap().is_empty());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let auth = AuthConfig::from_parts(Some("admin".into()), Some("badger".into()), None);
        let shown = format!("{auth:?}");
        assert!(shown.contains("admin"));
        assert!(!shown.contains("badger"));
    }
}
