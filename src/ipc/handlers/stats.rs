use crate::catalog::Level;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_username;
use crate::ipc::types::{AppState, Request};
use crate::stats::{decode_history, FilterSelection, StatsView, TimeRange};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

fn handle_stats_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match require_username(state, req) {
        Ok(u) => u,
        Err(e) => return e,
    };

    let records = match state.backend.list_scores(&username) {
        Ok(body) => decode_history(&body),
        Err(e) => {
            warn!(error = %e, "score history unavailable; showing empty stats");
            Vec::new()
        }
    };
    let view = StatsView::new(&username, records);
    info!(records = view.entries.len(), "stats opened");
    let snapshot = view.snapshot_json(Utc::now());
    state.stats = Some(view);
    ok(&req.id, snapshot)
}

fn optional_text(v: &serde_json::Value) -> Result<Option<String>, ()> {
    match v {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) => Ok(Some(s.clone())),
        serde_json::Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(()),
    }
}

/// Applies the provided fields in dependency order: level, subject, group, sitting, year, window.
fn apply_selection(
    current: &FilterSelection,
    params: &serde_json::Value,
) -> Result<FilterSelection, String> {
    let mut next = current.clone();

    if let Some(v) = params.get("level") {
        let level = v
            .as_str()
            .and_then(Level::parse)
            .ok_or_else(|| format!("unknown level: {v}"))?;
        next.set_level(level);
    }
    if let Some(v) = params.get("subject") {
        let code = v.as_str().ok_or("subject must be a string")?;
        next.set_subject(code).map_err(|e| e.to_string())?;
    }
    if let Some(v) = params.get("paperGroup") {
        let group = optional_text(v)
            .ok()
            .flatten()
            .ok_or("paperGroup must be a string")?;
        next.set_paper_group(&group).map_err(|e| e.to_string())?;
    }
    if let Some(v) = params.get("session") {
        let session = optional_text(v).map_err(|_| "session must be a string or null")?;
        next.set_session(session.as_deref());
    }
    if let Some(v) = params.get("year") {
        let year = optional_text(v).map_err(|_| "year must be a string or null")?;
        next.set_year(year.as_deref()).map_err(|e| e.to_string())?;
    }
    if let Some(v) = params.get("timeRange") {
        let range = v
            .as_str()
            .and_then(TimeRange::parse)
            .ok_or_else(|| format!("unknown timeRange: {v}"))?;
        next.set_time_range(range);
    }
    Ok(next)
}

fn handle_stats_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(view) = state.stats.as_mut() else {
        return err(&req.id, "stats_not_open", "call stats.open first", None);
    };
    match apply_selection(&view.selection, &req.params) {
        Ok(next) => {
            view.selection = next;
            ok(&req.id, view.snapshot_json(Utc::now()))
        }
        Err(message) => err(&req.id, "bad_params", message, None),
    }
}

fn handle_stats_options(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(view) = state.stats.as_ref() else {
        return err(&req.id, "stats_not_open", "call stats.open first", None);
    };
    ok(
        &req.id,
        json!({ "selection": view.selection, "options": view.options_json() }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "stats.open" => Some(handle_stats_open(state, req)),
        "stats.select" => Some(handle_stats_select(state, req)),
        "stats.options" => Some(handle_stats_options(state, req)),
        _ => None,
    }
}
