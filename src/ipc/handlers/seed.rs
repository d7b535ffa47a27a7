use crate::error::AppResult;
use crate::ipc::error::respond;
use crate::ipc::helpers::required_array;
use crate::ipc::types::{AppState, Request};
use crate::seed;
use serde_json::json;

fn seed_demo_data(state: &AppState) -> AppResult<serde_json::Value> {
    let report = seed::seed_demo_data(state.conn()?)?;
    Ok(json!({
        "classCodesSuccess": report.class_codes_ok,
        "sectionASuccess": report.section_a_ok,
        "message": report.message,
    }))
}

fn seed_import_subjects(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let rows = required_array(params, "subjects")?;
    let report = seed::import_subjects(state.conn()?, rows)?;
    Ok(json!({ "imported": report.imported, "skipped": report.skipped }))
}

fn seed_import_students(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let rows = required_array(params, "students")?;
    let report = seed::import_students(state.conn()?, rows)?;
    Ok(json!({ "imported": report.imported, "skipped": report.skipped }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "seed.demoData" => seed_demo_data(state),
        "seed.importSubjects" => seed_import_subjects(state, &req.params),
        "seed.importStudents" => seed_import_students(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
