use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE: &str = "https://nexuslearn-mu.vercel.app";

/// Settings key under which workspace-level overrides are persisted.
pub const SETTINGS_KEY: &str = "config.overrides";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub api_base: String,
    /// Global per-request timeout; unset means wait for the transport.
    pub http_timeout_ms: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            http_timeout_ms: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Config::default();
        if let Some(base) = lookup("NEXUS_API_BASE").filter(|v| !v.trim().is_empty()) {
            cfg.api_base = base.trim().to_string();
        }
        if let Some(ms) = lookup("NEXUS_HTTP_TIMEOUT_MS").and_then(|v| v.trim().parse::<u64>().ok())
        {
            cfg.http_timeout_ms = Some(ms).filter(|ms| *ms > 0);
        }
        cfg
    }

    /// Applies `{apiBase?, httpTimeoutMs?}`; `httpTimeoutMs: null` clears the timeout.
    pub fn apply_overrides(&mut self, v: &serde_json::Value) -> Result<(), String> {
        let Some(obj) = v.as_object() else {
            return Err("config overrides must be an object".into());
        };
        if let Some(base) = obj.get("apiBase") {
            let Some(base) = base.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
                return Err("apiBase must be a non-empty string".into());
            };
            if !base.starts_with("http://") && !base.starts_with("https://") {
                return Err(format!("apiBase must be an http(s) URL: {base}"));
            }
            self.api_base = base.to_string();
        }
        if let Some(timeout) = obj.get("httpTimeoutMs") {
            if timeout.is_null() {
                self.http_timeout_ms = None;
            } else {
                let Some(ms) = timeout.as_u64().filter(|ms| *ms > 0) else {
                    return Err("httpTimeoutMs must be a positive integer or null".into());
                };
                self.http_timeout_ms = Some(ms);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn env_values_override_defaults() {
        let cfg = Config::from_lookup(|k| match k {
            "NEXUS_API_BASE" => Some(" http://127.0.0.1:9 ".into()),
            "NEXUS_HTTP_TIMEOUT_MS" => Some("2500".into()),
            _ => None,
        });
        assert_eq!(cfg.api_base, "http://127.0.0.1:9");
        assert_eq!(cfg.http_timeout_ms, Some(2500));

        let cfg = Config::from_lookup(|_| None);
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn overrides_validate_before_applying() {
        let mut cfg = Config::default();
        assert!(cfg.apply_overrides(&json!({ "apiBase": "ftp://x" })).is_err());
        assert!(cfg.apply_overrides(&json!({ "httpTimeoutMs": -1 })).is_err());
        assert!(cfg.apply_overrides(&json!([])).is_err());
        assert_eq!(cfg, Config::default());

        cfg.apply_overrides(&json!({ "apiBase": "http://localhost:3000/", "httpTimeoutMs": 500 }))
            .expect("apply");
        assert_eq!(cfg.api_base, "http://localhost:3000/");
        assert_eq!(cfg.http_timeout_ms, Some(500));
        cfg.apply_overrides(&json!({ "httpTimeoutMs": null })).expect("clear");
        assert_eq!(cfg.http_timeout_ms, None);
    }
}
