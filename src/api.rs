use crate::config::Config;
use crate::scores::{ScoreSubmission, StoredScore};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server answered {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Server-provided `error` text, if the backend sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Remote study backend. `HttpBackend` talks to the real service.
pub trait Backend {
    /// Raw history body; callers decide how to treat non-array payloads.
    fn list_scores(&self, username: &str) -> Result<serde_json::Value, ApiError>;
    fn get_score(
        &self,
        username: &str,
        subject: &str,
        paper: &str,
    ) -> Result<Option<StoredScore>, ApiError>;
    fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), ApiError>;
    fn get_user(&self, username: &str) -> Result<String, ApiError>;
    fn login(&self, credentials: &Credentials) -> Result<String, ApiError>;
    fn signup(&self, credentials: &Credentials) -> Result<(), ApiError>;
}

struct RawResponse {
    status: u16,
    content_type: Option<String>,
    body: serde_json::Value,
}

impl RawResponse {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn error_message(&self) -> Option<String> {
        self.body
            .get("error")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    fn rejected(&self) -> ApiError {
        ApiError::Rejected {
            status: self.status,
            message: self.error_message(),
        }
    }
}

pub struct HttpBackend {
    agent: ureq::Agent,
    base: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Self {
        let mut builder = ureq::Agent::config_builder().http_status_as_error(false);
        if let Some(ms) = config.http_timeout_ms {
            builder = builder.timeout_global(Some(Duration::from_millis(ms)));
        }
        let agent: ureq::Agent = builder.build().into();
        Self {
            agent,
            base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn read(response: ureq::http::Response<ureq::Body>) -> Result<RawResponse, ApiError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(ureq::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let text = response
            .into_body()
            .read_to_string()
            .map_err(|e| ApiError::Network(format!("failed reading response body: {e}")))?;
        // Empty or non-JSON bodies are common on error paths.
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::Null)
        };
        debug!(status, "backend response");
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<RawResponse, ApiError> {
        let mut req = self.agent.get(&self.url(path));
        for (k, v) in query {
            req = req.query(*k, *v);
        }
        let response = req
            .call()
            .map_err(|e| ApiError::Network(format!("GET {path}: {e}")))?;
        Self::read(response)
    }

    fn post(&self, path: &str, body: &serde_json::Value) -> Result<RawResponse, ApiError> {
        let payload = body.to_string();
        let response = self
            .agent
            .post(&self.url(path))
            .header("Content-Type", "application/json")
            .send(payload.as_str())
            .map_err(|e| ApiError::Network(format!("POST {path}: {e}")))?;
        Self::read(response)
    }
}

impl Backend for HttpBackend {
    fn list_scores(&self, username: &str) -> Result<serde_json::Value, ApiError> {
        let resp = self.get("/api/scores", &[("username", username)])?;
        if !resp.is_success() {
            return Err(resp.rejected());
        }
        Ok(resp.body)
    }

    fn get_score(
        &self,
        username: &str,
        subject: &str,
        paper: &str,
    ) -> Result<Option<StoredScore>, ApiError> {
        let resp = self.get(
            "/api/scores",
            &[("username", username), ("subject", subject), ("paper", paper)],
        )?;
        if !resp.is_success() {
            return Err(resp.rejected());
        }
        Ok(StoredScore::from_body(&resp.body))
    }

    fn submit_score(&self, submission: &ScoreSubmission) -> Result<(), ApiError> {
        let body = serde_json::to_value(submission)
            .map_err(|e| ApiError::Malformed(format!("cannot encode submission: {e}")))?;
        let resp = self.post("/api/scores", &body)?;
        if !resp.is_success() {
            return Err(resp.rejected());
        }
        Ok(())
    }

    fn get_user(&self, username: &str) -> Result<String, ApiError> {
        let resp = self.get("/api/user", &[("username", username)])?;
        if !resp.is_success() {
            return Err(resp.rejected());
        }
        let is_json = resp
            .content_type
            .as_deref()
            .map(|ct| ct.contains("application/json"))
            .unwrap_or(false);
        if !is_json {
            return Err(ApiError::Malformed("user response is not JSON".into()));
        }
        resp.body
            .get("username")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .ok_or_else(|| ApiError::Malformed("user response has no username".into()))
    }

    fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let resp = self.post(
            "/api/login",
            &json!({ "username": credentials.username, "password": credentials.password }),
        )?;
        if !resp.is_success() {
            return Err(resp.rejected());
        }
        match resp.body.get("token").and_then(|v| v.as_str()) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(resp.rejected()),
        }
    }

    fn signup(&self, credentials: &Credentials) -> Result<(), ApiError> {
        let resp = self.post(
            "/api/signup",
            &json!({ "username": credentials.username, "password": credentials.password }),
        )?;
        if !resp.is_success() {
            return Err(resp.rejected());
        }
        Ok(())
    }
}
