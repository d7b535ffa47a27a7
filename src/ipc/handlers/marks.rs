use crate::auth::Role;
use crate::error::{AppError, AppResult};
use crate::ipc::error::respond;
use crate::ipc::helpers::{optional_f64, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::marks;
use serde_json::json;

fn marks_upsert(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    state.session.require(Role::Teacher)?;
    let student_id = required_i64(params, "studentId")?;
    let subject_id = required_i64(params, "subjectId")?;
    let value = optional_f64(params, "marks")?
        .ok_or_else(|| AppError::bad_params("missing marks"))?;
    let out_of = optional_f64(params, "outOf")?.unwrap_or(100.0);
    let row = marks::upsert_mark(state.conn()?, student_id, subject_id, value, out_of)?;
    Ok(json!({ "mark": row }))
}

fn marks_for_student(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let student_id = required_i64(params, "studentId")?;
    let rows = marks::marks_for_student(state.conn()?, student_id)?;
    Ok(json!({ "studentId": student_id, "marks": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "marks.upsert" => marks_upsert(state, &req.params),
        "marks.forStudent" => marks_for_student(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
