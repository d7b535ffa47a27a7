use serde_json::json;

use crate::auth::Rejection;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadParams(String),
    #[error("{0}")]
    NotFound(String),
    #[error("select a workspace first")]
    NoWorkspace,
    #[error("{message}")]
    Unauthorized {
        message: &'static str,
        redirect: &'static str,
    },
    #[error("verification failed: {0}")]
    VerificationFailed(Rejection),
    #[error("attendance save failed: {0}")]
    SaveFailed(#[source] rusqlite::Error),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error("{0:#}")]
    Backup(anyhow::Error),
}

impl AppError {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::BadParams(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Stable wire code for the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadParams(_) => "bad_params",
            Self::NotFound(_) => "not_found",
            Self::NoWorkspace => "no_workspace",
            Self::Unauthorized { .. } => "unauthorized",
            Self::VerificationFailed(_) => "verification_failed",
            Self::SaveFailed(_) => "save_failed",
            Self::Db(_) => "db_query_failed",
            Self::Backup(_) => "backup_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Unauthorized { redirect, .. } => Some(json!({ "redirect": redirect })),
            Self::VerificationFailed(reason) => Some(json!({ "reason": reason.as_str() })),
            Self::SaveFailed(_) => Some(json!({ "table": "attendance" })),
            _ => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
