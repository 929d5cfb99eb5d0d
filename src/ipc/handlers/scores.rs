use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{input_text, required_paper, required_str};
use crate::ipc::types::{AppState, Request};
use crate::scores::format_percent;
use chrono::Utc;
use serde_json::json;

fn handle_scores_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let paper = match required_paper(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    // No session or no saved score both read as "nothing to show".
    let stored = match state.session.as_ref() {
        Some(s) => state
            .recorder
            .load(state.backend.as_ref(), s.username(), &subject, &paper),
        None => None,
    };
    ok(
        &req.id,
        json!({
            "subject": subject,
            "paper": paper,
            "score": stored.map(|s| s.to_json()),
        }),
    )
}

fn handle_scores_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let paper = match required_paper(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let scored = input_text(req, "scored");
    let total = input_text(req, "total");

    let username = state.session.as_ref().map(|s| s.username());
    let result = state.recorder.submit(
        state.backend.as_ref(),
        username,
        &subject,
        &paper,
        &scored,
        &total,
        Utc::now(),
    );
    match result {
        Ok(stored) => ok(
            &req.id,
            json!({
                "subject": subject,
                "paper": paper,
                "scored": stored.scored,
                "total": stored.total,
                "score": stored.score,
                "percent": format_percent(stored.score),
                "message": format!("Score saved! You got {}%", format_percent(stored.score)),
            }),
        ),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scores.get" => Some(handle_scores_get(state, req)),
        "scores.submit" => Some(handle_scores_submit(state, req)),
        _ => None,
    }
}
