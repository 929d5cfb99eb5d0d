use crate::ipc::error::ok;
use crate::ipc::helpers::required_path;
use crate::ipc::types::{AppState, Request};
use crate::updates::{latest, load_updates, Update};
use serde_json::json;
use tracing::warn;

// Missing or unreadable feeds show as empty.
fn feed(req: &Request) -> Result<Vec<Update>, serde_json::Value> {
    let path = required_path(req, "path")?;
    Ok(load_updates(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "updates feed unavailable");
        Vec::new()
    }))
}

fn handle_updates_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    match feed(req) {
        Ok(updates) => ok(&req.id, json!({ "updates": updates })),
        Err(e) => e,
    }
}

fn handle_updates_latest(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let limit = req
        .params
        .get("limit")
        .and_then(|v| v.as_u64())
        .unwrap_or(1) as usize;
    match feed(req) {
        Ok(updates) => {
            let items: Vec<serde_json::Value> = latest(&updates, limit)
                .iter()
                .map(|u| {
                    let mut v = json!(u);
                    v["primaryCategory"] = json!(u.primary_category());
                    v
                })
                .collect();
            ok(&req.id, json!({ "updates": items }))
        }
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "updates.list" => Some(handle_updates_list(state, req)),
        "updates.latest" => Some(handle_updates_latest(state, req)),
        _ => None,
    }
}
