use crate::error::{AppError, AppResult};
use crate::ipc::error::{ok, respond};
use crate::ipc::helpers::{optional_str, required_array, required_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, ClassCode};
use serde_json::json;

fn subjects_list(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let section = optional_str(params, "section");
    let subjects = roster::list_subjects(state.conn()?, section.as_deref())?;
    Ok(json!({ "subjects": subjects }))
}

fn subjects_by_code(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let code = required_str(params, "code")?;
    let subject = roster::subject_by_code(state.conn()?, &code)?;
    Ok(json!({ "subject": subject }))
}

fn students_list(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let section = optional_str(params, "section");
    let students = roster::list_students(state.conn()?, section.as_deref())?;
    Ok(json!({ "students": students }))
}

fn students_set_photo(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let student_id = required_i64(params, "studentId")?;
    let photo_url = optional_str(params, "photoUrl");
    let student = roster::set_student_photo(state.conn()?, student_id, photo_url.as_deref())?;
    tracing::info!(student_id, cleared = photo_url.is_none(), "student photo updated");
    Ok(json!({ "student": student }))
}

fn parse_class_code(v: &serde_json::Value) -> AppResult<ClassCode> {
    let mut cc: ClassCode = serde_json::from_value(v.clone())
        .map_err(|e| AppError::bad_params(format!("invalid class code: {}", e)))?;
    cc.id = None;
    Ok(cc)
}

fn class_codes_create(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let cc = parse_class_code(params)?;
    let created = roster::insert_class_code(state.conn()?, &cc)?;
    Ok(json!({ "classCode": created }))
}

fn class_codes_create_many(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let codes = required_array(params, "classCodes")?
        .iter()
        .map(parse_class_code)
        .collect::<AppResult<Vec<_>>>()?;
    let created = roster::insert_class_codes(state.conn()?, &codes)?;
    Ok(json!({ "classCodes": created }))
}

fn class_codes_delete(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let id = required_i64(params, "id")?;
    roster::delete_class_code(state.conn()?, id)?;
    Ok(json!({ "deleted": id }))
}

fn handle_class_codes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classCodes": [] }));
    };
    respond(
        &req.id,
        roster::list_class_codes(conn).map(|codes| json!({ "classCodes": codes })),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "subjects.list" => subjects_list(state, &req.params),
        "subjects.byCode" => subjects_by_code(state, &req.params),
        "students.list" => students_list(state, &req.params),
        "students.setPhoto" => students_set_photo(state, &req.params),
        "classCodes.list" => return Some(handle_class_codes_list(state, req)),
        "classCodes.create" => class_codes_create(state, &req.params),
        "classCodes.createMany" => class_codes_create_many(state, &req.params),
        "classCodes.delete" => class_codes_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
