use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::session::SessionSlot;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: Config,
    pub session: SessionSlot,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            workspace: None,
            db: None,
            config,
            session: SessionSlot::default(),
        }
    }

    pub fn conn(&self) -> AppResult<&Connection> {
        self.db.as_ref().ok_or(AppError::NoWorkspace)
    }
}
