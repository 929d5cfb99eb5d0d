use crate::db;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rusqlite::Connection;
use thiserror::Error;
use tracing::warn;

pub const TOKEN_KEY: &str = "token";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("token is not a JWT: {0}")]
    MalformedToken(String),
    #[error("token payload has no username")]
    MissingUsername,
}

/// Reads the `username` claim without verifying the signature.
pub fn decode_username(token: &str) -> Result<String, SessionError> {
    let mut parts = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_sig), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SessionError::MalformedToken(
            "expected three dot-separated parts".into(),
        ));
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SessionError::MalformedToken(format!("payload is not base64url: {e}")))?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| SessionError::MalformedToken(format!("payload is not JSON: {e}")))?;
    claims
        .get("username")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or(SessionError::MissingUsername)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    username: String,
}

impl Session {
    pub fn from_token(token: &str) -> Result<Self, SessionError> {
        let username = decode_username(token)?;
        Ok(Self {
            token: token.trim().to_string(),
            username,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// A stored token that no longer decodes counts as logged out.
    pub fn load(conn: &Connection) -> anyhow::Result<Option<Session>> {
        let Some(token) = db::secure_get(conn, TOKEN_KEY)? else {
            return Ok(None);
        };
        match Session::from_token(&token) {
            Ok(s) => Ok(Some(s)),
            Err(e) => {
                warn!(error = %e, "stored token is unusable");
                Ok(None)
            }
        }
    }

    pub fn establish(conn: &Connection, token: &str) -> anyhow::Result<Session> {
        let session = Session::from_token(token)?;
        db::secure_set(conn, TOKEN_KEY, session.token())?;
        Ok(session)
    }

    pub fn clear(conn: &Connection) -> anyhow::Result<()> {
        db::secure_delete(conn, TOKEN_KEY)
    }
}

pub fn initial_route(session: Option<&Session>) -> &'static str {
    if session.is_some() {
        "Home"
    } else {
        "Landing"
    }
}
