use crate::api::{ApiError, Backend};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{info, warn};

/// One saved attempt as the backend returns it in a user's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    #[serde(default)]
    pub username: String,
    pub subject: String,
    pub paper: String,
    #[serde(default)]
    pub scored: f64,
    #[serde(default)]
    pub total: f64,
    pub score: f64,
    pub date: String,
}

/// Body of `POST /api/scores`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub username: String,
    pub subject: String,
    pub paper: String,
    pub scored: f64,
    pub total: f64,
    pub score: f64,
    pub date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScore {
    pub scored: Option<f64>,
    pub total: Option<f64>,
    pub score: f64,
}

impl StoredScore {
    /// `None` when the lookup body carries no numeric `score`.
    pub fn from_body(body: &serde_json::Value) -> Option<Self> {
        let score = body.get("score").and_then(|v| v.as_f64())?;
        Some(Self {
            scored: body.get("scored").and_then(|v| v.as_f64()),
            total: body.get("total").and_then(|v| v.as_f64()),
            score,
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "scored": self.scored,
            "total": self.total,
            "score": self.score,
            "percent": format_percent(self.score),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmitError {
    #[error("You must be logged in to submit a score.")]
    NotAuthenticated,
    #[error("{0}")]
    InvalidInput(String),
    #[error("Network error. Please check your connection and try again.")]
    NetworkFailure(String),
    #[error("{0}")]
    ServerRejected(String),
}

impl SubmitError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmitError::NotAuthenticated => "not_authenticated",
            SubmitError::InvalidInput(_) => "invalid_input",
            SubmitError::NetworkFailure(_) => "network_failure",
            SubmitError::ServerRejected(_) => "server_rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marks {
    pub scored: f64,
    pub total: f64,
}

impl Marks {
    pub fn percentage(&self) -> f64 {
        self.scored / self.total * 100.0
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_marks(scored: &str, total: &str) -> Result<Marks, SubmitError> {
    let (Some(scored), Some(total)) = (parse_number(scored), parse_number(total)) else {
        return Err(SubmitError::InvalidInput(
            "Please enter valid marks.".to_string(),
        ));
    };
    if total == 0.0 {
        return Err(SubmitError::InvalidInput(
            "Please enter valid marks.".to_string(),
        ));
    }
    if scored < 0.0 || scored > total {
        return Err(SubmitError::InvalidInput(
            "Scored marks cannot be negative or greater than total marks.".to_string(),
        ));
    }
    Ok(Marks { scored, total })
}

pub fn format_percent(score: f64) -> String {
    format!("{:.2}", score)
}

/// Validates a submission without touching the network.
pub fn prepare_submission(
    username: Option<&str>,
    subject: &str,
    paper: &str,
    scored: &str,
    total: &str,
    now: DateTime<Utc>,
) -> Result<ScoreSubmission, SubmitError> {
    let Some(username) = username else {
        return Err(SubmitError::NotAuthenticated);
    };
    let marks = parse_marks(scored, total)?;
    Ok(ScoreSubmission {
        username: username.to_string(),
        subject: subject.to_string(),
        paper: paper.to_string(),
        scored: marks.scored,
        total: marks.total,
        score: marks.percentage(),
        date: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// Per-paper display values: last loaded or last successfully submitted score.
#[derive(Debug, Default)]
pub struct ScoreRecorder {
    displayed: HashMap<(String, String), StoredScore>,
}

impl ScoreRecorder {
    pub fn displayed(&self, subject: &str, paper: &str) -> Option<StoredScore> {
        self.displayed
            .get(&(subject.to_string(), paper.to_string()))
            .copied()
    }

    /// Passive load. A failed lookup is logged and keeps whatever is already displayed.
    pub fn load(
        &mut self,
        backend: &dyn Backend,
        username: &str,
        subject: &str,
        paper: &str,
    ) -> Option<StoredScore> {
        match backend.get_score(username, subject, paper) {
            Ok(Some(stored)) => {
                self.displayed
                    .insert((subject.to_string(), paper.to_string()), stored);
                Some(stored)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(subject, paper, error = %e, "failed to fetch saved score");
                self.displayed(subject, paper)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &mut self,
        backend: &dyn Backend,
        username: Option<&str>,
        subject: &str,
        paper: &str,
        scored: &str,
        total: &str,
        now: DateTime<Utc>,
    ) -> Result<StoredScore, SubmitError> {
        let submission = prepare_submission(username, subject, paper, scored, total, now)?;
        match backend.submit_score(&submission) {
            Ok(()) => {
                let stored = StoredScore {
                    scored: Some(submission.scored),
                    total: Some(submission.total),
                    score: submission.score,
                };
                self.displayed
                    .insert((subject.to_string(), paper.to_string()), stored);
                info!(subject, paper, score = submission.score, "score saved");
                Ok(stored)
            }
            Err(ApiError::Network(reason)) => {
                warn!(subject, paper, %reason, "score submit failed");
                Err(SubmitError::NetworkFailure(reason))
            }
            Err(e) => {
                warn!(subject, paper, error = %e, "score submit rejected");
                Err(SubmitError::ServerRejected(
                    e.server_message()
                        .unwrap_or("Failed to save score")
                        .to_string(),
                ))
            }
        }
    }
}
