use crate::config::{self, Config};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_path;
use crate::ipc::types::{AppState, Request};
use crate::session::Session;
use serde_json::json;
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "apiBase": state.config.api_base,
            "authenticated": state.session.is_some(),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_path(req, "path") {
        Ok(p) => p,
        Err(e) => return e,
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    // Best-effort: a broken override must not keep the workspace from opening.
    let mut cfg = Config::from_env();
    match db::settings_get_json(&conn, config::SETTINGS_KEY) {
        Ok(Some(overrides)) => {
            if let Err(e) = cfg.apply_overrides(&overrides) {
                warn!(error = %e, "ignoring stored config overrides");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed reading stored config overrides"),
    }

    let session = match Session::load(&conn) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    state.config = cfg;
    state.rebuild_backend();
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.session = session;
    state.reset_user_views();
    info!(workspace = %path.display(), authenticated = state.session.is_some(), "workspace selected");

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "authenticated": state.session.is_some(),
            "username": state.username(),
        }),
    )
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "config": state.config }))
}

fn handle_config_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mut next = state.config.clone();
    if let Err(e) = next.apply_overrides(&req.params) {
        return err(&req.id, "bad_params", e, None);
    }

    if let Some(conn) = state.db.as_ref() {
        let mut stored = match db::settings_get_json(conn, config::SETTINGS_KEY) {
            Ok(Some(v)) if v.is_object() => v,
            Ok(_) => json!({}),
            Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
        };
        if let Some(params) = req.params.as_object() {
            for key in ["apiBase", "httpTimeoutMs"] {
                if let Some(v) = params.get(key) {
                    stored[key] = v.clone();
                }
            }
        }
        if let Err(e) = db::settings_set_json(conn, config::SETTINGS_KEY, &stored) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }

    state.config = next;
    state.rebuild_backend();
    ok(&req.id, json!({ "config": state.config }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "config.get" => Some(handle_config_get(state, req)),
        "config.set" => Some(handle_config_set(state, req)),
        _ => None,
    }
}
