use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::paper::PaperKey;
use rusqlite::Connection;
use std::path::PathBuf;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn required_path(req: &Request, key: &str) -> Result<PathBuf, serde_json::Value> {
    required_str(req, key).map(PathBuf::from)
}

/// Validated `paper` param; the id must be a well-formed `session_year_variant`.
pub fn required_paper(req: &Request) -> Result<String, serde_json::Value> {
    let raw = required_str(req, "paper")?;
    PaperKey::parse(&raw)
        .map_err(|e| err(&req.id, "bad_params", e.to_string(), None))?;
    Ok(raw)
}

/// Form input as text: strings pass through, numbers are rendered, anything else is empty.
pub fn input_text(req: &Request, key: &str) -> String {
    match req.params.get(key) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

pub fn db_conn<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn require_username(state: &AppState, req: &Request) -> Result<String, serde_json::Value> {
    state
        .username()
        .map(|u| u.to_string())
        .ok_or_else(|| err(&req.id, "not_authenticated", "log in first", None))
}
