use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{required_path, required_str};
use crate::ipc::types::{AppState, Request};
use crate::papers::{filter_papers, load_catalog, years, PaperEntry};
use serde_json::json;

fn catalog(req: &Request) -> Result<Vec<PaperEntry>, serde_json::Value> {
    let path = required_path(req, "path")?;
    load_catalog(&path).map_err(|e| {
        err(
            &req.id,
            "fixture_load_failed",
            format!("{e:?}"),
            Some(json!({ "path": path.to_string_lossy() })),
        )
    })
}

fn handle_papers_years(_state: &mut AppState, req: &Request) -> serde_json::Value {
    match catalog(req) {
        Ok(entries) => ok(&req.id, json!({ "years": years(&entries) })),
        Err(e) => e,
    }
}

fn handle_papers_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let entries = match catalog(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (session, year, group) = match (
        required_str(req, "session"),
        required_str(req, "year"),
        required_str(req, "paperGroup"),
    ) {
        (Ok(s), Ok(y), Ok(g)) => (s, y, g),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e,
    };
    let papers: Vec<serde_json::Value> = filter_papers(&entries, &session, &year, &group)
        .into_iter()
        .map(|p| p.to_json())
        .collect();
    ok(&req.id, json!({ "papers": papers }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "papers.years" => Some(handle_papers_years(state, req)),
        "papers.list" => Some(handle_papers_list(state, req)),
        _ => None,
    }
}
