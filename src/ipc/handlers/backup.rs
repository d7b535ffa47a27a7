use crate::backup;
use crate::error::{AppError, AppResult};
use crate::ipc::error::respond;
use crate::ipc::handlers::core::open_workspace;
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn export_bundle(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let Some(workspace) = state.workspace.as_ref() else {
        return Err(AppError::NoWorkspace);
    };
    let out_path = PathBuf::from(required_str(params, "outPath")?);
    let summary =
        backup::export_workspace_bundle(workspace, &out_path).map_err(AppError::Backup)?;
    Ok(json!({
        "outPath": out_path.to_string_lossy(),
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "dbSha256": summary.db_sha256,
    }))
}

fn import_bundle(state: &mut AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let Some(workspace) = state.workspace.clone() else {
        return Err(AppError::NoWorkspace);
    };
    let in_path = PathBuf::from(required_str(params, "inPath")?);

    // Release the database file before it is replaced.
    state.db = None;
    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    // Reopen whatever is on disk now, restored or not.
    let reopened = open_workspace(state, workspace.clone());
    let summary = imported.map_err(AppError::Backup)?;
    reopened.map_err(AppError::Backup)?;
    state.session.clear();

    Ok(json!({
        "workspacePath": workspace.to_string_lossy(),
        "bundleFormatDetected": summary.bundle_format_detected,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.exportWorkspaceBundle" => export_bundle(state, &req.params),
        "backup.importWorkspaceBundle" => import_bundle(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
