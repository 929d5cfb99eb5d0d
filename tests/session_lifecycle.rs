use serde_json::json;

mod test_support;

use test_support::{request_err, request_ok, spawn_sidecar, temp_dir, StubBackend, PASSWORD};

#[test]
fn login_persists_across_restarts_until_logout() {
    let stub = StubBackend::start();
    let workspace = temp_dir("nexusd-session");
    let ws = json!({ "path": workspace.to_string_lossy() });

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar(&stub.base);
        let selected = request_ok(&mut stdin, &mut reader, "1", "workspace.select", ws.clone());
        assert_eq!(selected["authenticated"], json!(false));

        let status = request_ok(&mut stdin, &mut reader, "2", "session.status", json!({}));
        assert_eq!(status["initialRoute"], json!("Landing"));
        assert!(status["username"].is_null());

        let login = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "session.login",
            json!({ "username": "ayesha", "password": PASSWORD }),
        );
        assert_eq!(login["username"], json!("ayesha"));
        assert_eq!(login["initialRoute"], json!("Home"));
        drop(stdin);
        let _ = child.wait();
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar(&stub.base);
    let selected = request_ok(&mut stdin, &mut reader, "4", "workspace.select", ws);
    assert_eq!(selected["authenticated"], json!(true));
    assert_eq!(selected["username"], json!("ayesha"));

    let user = request_ok(&mut stdin, &mut reader, "5", "user.get", json!({}));
    assert_eq!(user["username"], json!("ayesha"));
    assert_eq!(user["source"], json!("server"));

    let out = request_ok(&mut stdin, &mut reader, "6", "session.logout", json!({}));
    assert_eq!(out["initialRoute"], json!("Landing"));
    let status = request_ok(&mut stdin, &mut reader, "7", "session.status", json!({}));
    assert_eq!(status["authenticated"], json!(false));
    let (code, _) = request_err(&mut stdin, &mut reader, "8", "user.get", json!({}));
    assert_eq!(code, "not_authenticated");
}

#[test]
fn rejected_credentials_surface_server_message() {
    let stub = StubBackend::start();
    let workspace = temp_dir("nexusd-badlogin");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&stub.base);

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "0",
        "session.login",
        json!({ "username": "ayesha", "password": PASSWORD }),
    );
    assert_eq!(code, "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "session.login",
        json!({ "username": "ayesha", "password": "wrong" }),
    );
    assert_eq!(code, "login_failed");
    assert_eq!(message, "Invalid credentials");

    let (code, _) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "session.login",
        json!({ "username": "x" }),
    );
    assert_eq!(code, "bad_params");

    let status = request_ok(&mut stdin, &mut reader, "4", "session.status", json!({}));
    assert_eq!(status["authenticated"], json!(false));
}

#[test]
fn signup_routes_to_login_without_signing_in() {
    let stub = StubBackend::start();
    let workspace = temp_dir("nexusd-signup");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&stub.base);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.signup",
        json!({ "username": "newcomer", "password": "pw" }),
    );
    assert_eq!(created["created"], json!(true));
    assert_eq!(created["next"], json!("Login"));
    let status = request_ok(&mut stdin, &mut reader, "3", "session.status", json!({}));
    assert_eq!(status["authenticated"], json!(false));

    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "session.signup",
        json!({ "username": "taken", "password": "pw" }),
    );
    assert_eq!(code, "signup_failed");
    assert_eq!(message, "Username already taken");
}

#[test]
fn user_lookup_falls_back_to_token_on_non_json() {
    let stub = StubBackend::start();
    let workspace = temp_dir("nexusd-ghost");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&stub.base);
    test_support::login(&mut stdin, &mut reader, &workspace, "ghost");

    let user = request_ok(&mut stdin, &mut reader, "u", "user.get", json!({}));
    assert_eq!(user["username"], json!("ghost"));
    assert_eq!(user["source"], json!("token"));
}

#[test]
fn unreachable_backend_is_a_network_failure() {
    let stub = StubBackend::start();
    let workspace = temp_dir("nexusd-offline");
    let (_child, mut stdin, mut reader) = spawn_sidecar(&stub.base);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "config.set",
        json!({ "apiBase": "http://127.0.0.1:1" }),
    );
    let (code, message) = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "session.login",
        json!({ "username": "ayesha", "password": PASSWORD }),
    );
    assert_eq!(code, "network_failure");
    assert_eq!(message, "Network error. Please try again.");
}
