#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

pub const PASSWORD: &str = "hunter2";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn make_token(username: &str) -> String {
    format!(
        "{}.{}.stub-signature",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(json!({ "username": username, "iat": 1700000000 }).to_string())
    )
}

pub fn spawn_sidecar(api_base: &str) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_nexusd");
    let mut child = Command::new(exe)
        .env("NEXUS_API_BASE", api_base)
        .env("NEXUS_HTTP_TIMEOUT_MS", "5000")
        .env("NEXUS_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn nexusd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

pub fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

pub fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or(serde_json::Value::Null)
}

/// Returns `(code, message)` of an error response.
pub fn request_err(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> (String, String) {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded: {}",
        method,
        value
    );
    let error = value.get("error").cloned().unwrap_or_default();
    (
        error.get("code").and_then(|v| v.as_str()).unwrap_or("").to_string(),
        error.get("message").and_then(|v| v.as_str()).unwrap_or("").to_string(),
    )
}

/// Opens a fresh workspace and logs in as `username`.
pub fn login(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    workspace: &std::path::Path,
    username: &str,
) {
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        stdin,
        reader,
        "login",
        "session.login",
        json!({ "username": username, "password": PASSWORD }),
    );
}

#[derive(Debug, Clone)]
pub struct Hit {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub body: serde_json::Value,
}

#[derive(Default)]
struct StubState {
    scores: Vec<serde_json::Value>,
    hits: Vec<Hit>,
}

/// In-process stand-in for the study backend's `/api/*` endpoints.
pub struct StubBackend {
    pub base: String,
    state: Arc<Mutex<StubState>>,
}

impl StubBackend {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub backend");
        let base = format!("http://{}", listener.local_addr().expect("local addr"));
        let state = Arc::new(Mutex::new(StubState::default()));
        let shared = Arc::clone(&state);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let _ = serve(stream, &shared);
            }
        });
        Self { base, state }
    }

    pub fn seed(&self, records: Vec<serde_json::Value>) {
        self.state.lock().expect("stub state").scores.extend(records);
    }

    pub fn hits(&self) -> Vec<Hit> {
        self.state.lock().expect("stub state").hits.clone()
    }

    pub fn posted_scores(&self) -> Vec<serde_json::Value> {
        self.hits()
            .into_iter()
            .filter(|h| h.method == "POST" && h.path == "/api/scores")
            .map(|h| h.body)
            .collect()
    }
}

fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(b) => {
                        out.push(b);
                        i += 2;
                    }
                    Err(_) => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

fn parse_query(q: &str) -> HashMap<String, String> {
    q.split('&')
        .filter(|kv| !kv.is_empty())
        .map(|kv| {
            let (k, v) = kv.split_once('=').unwrap_or((kv, ""));
            (percent_decode(k), percent_decode(v))
        })
        .collect()
}

fn serve(stream: TcpStream, state: &Arc<Mutex<StubState>>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("/").to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            break;
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    let hit = Hit {
        method,
        path: path.to_string(),
        query: parse_query(query),
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    };

    let (status, content_type, payload) = {
        let mut st = state.lock().expect("stub state");
        st.hits.push(hit.clone());
        route(&mut st, &hit)
    };

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} Stub\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        payload.len(),
        payload
    )?;
    stream.flush()
}

const JSON: &str = "application/json";

fn route(st: &mut StubState, hit: &Hit) -> (u16, &'static str, String) {
    let q = |k: &str| hit.query.get(k).cloned().unwrap_or_default();
    let field = |k: &str| {
        hit.body
            .get(k)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };
    match (hit.method.as_str(), hit.path.as_str()) {
        ("POST", "/api/login") => {
            if field("password") == PASSWORD {
                (200, JSON, json!({ "token": make_token(&field("username")) }).to_string())
            } else {
                (401, JSON, json!({ "error": "Invalid credentials" }).to_string())
            }
        }
        ("POST", "/api/signup") => {
            if field("username") == "taken" {
                (409, JSON, json!({ "error": "Username already taken" }).to_string())
            } else {
                (201, JSON, "{}".to_string())
            }
        }
        ("GET", "/api/user") => {
            let username = q("username");
            if username == "ghost" {
                (200, "text/html", "<html>maintenance</html>".to_string())
            } else {
                (200, JSON, json!({ "username": username }).to_string())
            }
        }
        ("GET", "/api/scores") => {
            let username = q("username");
            if username == "broken" {
                return (200, JSON, json!({ "error": "history offline" }).to_string());
            }
            let mine = st
                .scores
                .iter()
                .filter(|r| r.get("username").and_then(|v| v.as_str()) == Some(username.as_str()));
            match (hit.query.get("subject"), hit.query.get("paper")) {
                (Some(subject), Some(paper)) => {
                    let found = mine
                        .filter(|r| {
                            r.get("subject").and_then(|v| v.as_str()) == Some(subject.as_str())
                                && r.get("paper").and_then(|v| v.as_str()) == Some(paper.as_str())
                        })
                        .last()
                        .map(|r| {
                            json!({ "scored": r["scored"], "total": r["total"], "score": r["score"] })
                        })
                        .unwrap_or_else(|| json!({}));
                    (200, JSON, found.to_string())
                }
                _ => {
                    let all: Vec<serde_json::Value> = mine.cloned().collect();
                    (200, JSON, serde_json::Value::Array(all).to_string())
                }
            }
        }
        ("POST", "/api/scores") => {
            if field("subject") == "REJECT" {
                return (400, JSON, json!({ "error": "Subject not accepted" }).to_string());
            }
            if field("subject") == "CRASH" {
                return (500, "text/plain", "internal error".to_string());
            }
            // Upsert on (username, subject, paper).
            let key = (field("username"), field("subject"), field("paper"));
            st.scores.retain(|r| {
                let same = |k: &str, v: &str| r.get(k).and_then(|x| x.as_str()) == Some(v);
                !(same("username", &key.0) && same("subject", &key.1) && same("paper", &key.2))
            });
            st.scores.push(hit.body.clone());
            (201, JSON, "{}".to_string())
        }
        _ => (404, JSON, json!({ "error": "not found" }).to_string()),
    }
}
