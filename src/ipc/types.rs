use crate::api::{Backend, HttpBackend};
use crate::config::Config;
use crate::scores::ScoreRecorder;
use crate::session::Session;
use crate::stats::StatsView;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Session>,
    pub backend: Box<dyn Backend>,
    pub recorder: ScoreRecorder,
    pub stats: Option<StatsView>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let backend = Box::new(HttpBackend::new(&config));
        Self {
            config,
            workspace: None,
            db: None,
            session: None,
            backend,
            recorder: ScoreRecorder::default(),
            stats: None,
        }
    }

    pub fn rebuild_backend(&mut self) {
        self.backend = Box::new(HttpBackend::new(&self.config));
    }

    pub fn username(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.username())
    }

    /// Drops per-user views after the signed-in user changes.
    pub fn reset_user_views(&mut self) {
        self.recorder = ScoreRecorder::default();
        self.stats = None;
    }
}
