use std::collections::VecDeque;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::ImportConfig;
use crate::summary::ImportSummary;

pub const RUN_HISTORY_LIMIT: usize = 200;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One finished import run as reported by `import.status` / `import.log`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csv_kind: Option<String>,
    pub started_at: String,
    pub finished_at: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ImportSummary>,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct AppState {
    pub config: ImportConfig,
    pub db: Connection,
    pub history: VecDeque<RunRecord>,
}

impl AppState {
    pub fn new(config: ImportConfig, db: Connection) -> Self {
        Self {
            config,
            db,
            history: VecDeque::new(),
        }
    }

    pub fn push_run(&mut self, run: RunRecord) {
        if self.history.len() == RUN_HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(run);
    }
}
