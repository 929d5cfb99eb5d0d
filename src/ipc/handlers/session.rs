use crate::api::{ApiError, Credentials};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, require_username, required_str};
use crate::ipc::types::{AppState, Request};
use crate::session::{self, Session};
use serde_json::json;
use tracing::{info, warn};

const LOGIN_NETWORK_MESSAGE: &str = "Network error. Please try again.";

fn credentials(req: &Request) -> Result<Credentials, serde_json::Value> {
    Ok(Credentials {
        username: required_str(req, "username")?,
        password: required_str(req, "password")?,
    })
}

fn account_err(req: &Request, code: &str, fallback: &str, e: &ApiError) -> serde_json::Value {
    match e {
        ApiError::Network(_) => err(&req.id, "network_failure", LOGIN_NETWORK_MESSAGE, None),
        _ => err(&req.id, code, e.server_message().unwrap_or(fallback), None),
    }
}

fn handle_session_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "authenticated": state.session.is_some(),
            "username": state.username(),
            "initialRoute": session::initial_route(state.session.as_ref()),
        }),
    )
}

fn handle_session_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let creds = match credentials(req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    let token = match state.backend.login(&creds) {
        Ok(t) => t,
        Err(e) => {
            warn!(username = %creds.username, error = %e, "login failed");
            return account_err(req, "login_failed", "Invalid username or password", &e);
        }
    };
    let established = match Session::establish(conn, &token) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "login_failed", format!("unusable token: {e}"), None),
    };

    info!(username = %established.username(), "logged in");
    let username = established.username().to_string();
    state.session = Some(established);
    state.reset_user_views();
    ok(
        &req.id,
        json!({
            "username": username,
            "initialRoute": session::initial_route(state.session.as_ref()),
        }),
    )
}

fn handle_session_signup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let creds = match credentials(req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match state.backend.signup(&creds) {
        Ok(()) => {
            info!(username = %creds.username, "account created");
            ok(&req.id, json!({ "created": true, "next": "Login" }))
        }
        Err(e) => {
            warn!(username = %creds.username, error = %e, "signup failed");
            account_err(req, "signup_failed", "Signup failed", &e)
        }
    }
}

fn handle_session_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(conn) = state.db.as_ref() {
        if let Err(e) = Session::clear(conn) {
            return err(&req.id, "db_update_failed", e.to_string(), None);
        }
    }
    state.session = None;
    state.reset_user_views();
    ok(&req.id, json!({ "initialRoute": session::initial_route(None) }))
}

fn handle_user_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let username = match require_username(state, req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    match state.backend.get_user(&username) {
        Ok(name) => ok(&req.id, json!({ "username": name, "source": "server" })),
        Err(e) => {
            warn!(error = %e, "falling back to token username");
            ok(&req.id, json!({ "username": username, "source": "token" }))
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.status" => Some(handle_session_status(state, req)),
        "session.login" => Some(handle_session_login(state, req)),
        "session.signup" => Some(handle_session_signup(state, req)),
        "session.logout" => Some(handle_session_logout(state, req)),
        "user.get" => Some(handle_user_get(state, req)),
        _ => None,
    }
}
