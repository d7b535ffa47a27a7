use crate::attendance::{self, AttendanceStatus, SaveBatch, Selection};
use crate::auth::Role;
use crate::error::{AppError, AppResult};
use crate::ipc::error::respond;
use crate::ipc::helpers::{
    as_id, date_or_today, optional_i64, optional_str, required_array, required_i64,
};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use crate::session::{Profile, TeacherSession};
use serde_json::json;

fn teacher_session(state: &AppState) -> AppResult<&TeacherSession> {
    match &state.session.require(Role::Teacher)?.profile {
        Profile::Teacher(t) => Ok(t),
        _ => Err(AppError::Unauthorized {
            message: "Unauthorized access",
            redirect: "/",
        }),
    }
}

fn parse_selection(idx: usize, v: &serde_json::Value) -> AppResult<Selection> {
    let student_id = v
        .get("studentId")
        .and_then(as_id)
        .ok_or_else(|| AppError::bad_params(format!("records[{}].studentId missing", idx)))?;
    let status = match v.get("status") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => None,
        Some(serde_json::Value::String(s)) => Some(
            s.parse::<AttendanceStatus>()
                .map_err(|e| AppError::bad_params(format!("records[{}]: {}", idx, e)))?,
        ),
        Some(_) => {
            return Err(AppError::bad_params(format!(
                "records[{}].status must be string or null",
                idx
            )))
        }
    };
    Ok(Selection { student_id, status })
}

fn attendance_save(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let teacher = teacher_session(state)?;
    let subject_id = optional_i64(params, "subjectId")?
        .or(teacher.subject_id)
        .ok_or_else(|| AppError::bad_params("missing subjectId"))?;
    let class_id = optional_str(params, "classId").unwrap_or_else(|| teacher.section.clone());
    let teacher_id = optional_str(params, "teacherId").unwrap_or_else(|| teacher.name.clone());
    let date = date_or_today(params)?;
    let selections = required_array(params, "records")?
        .iter()
        .enumerate()
        .map(|(idx, v)| parse_selection(idx, v))
        .collect::<AppResult<Vec<_>>>()?;

    let outcome = attendance::save_batch(
        state.conn()?,
        &SaveBatch {
            date,
            class_id,
            subject_id,
            teacher_id,
            selections,
        },
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "attendance batch rejected by store");
        e
    })?;
    Ok(json!({ "success": true, "data": outcome }))
}

fn attendance_day_sheet(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let teacher = teacher_session(state)?;
    let section = optional_str(params, "section").unwrap_or_else(|| teacher.section.clone());
    let subject_id = optional_i64(params, "subjectId")?
        .or(teacher.subject_id)
        .ok_or_else(|| AppError::bad_params("missing subjectId"))?;
    let date = date_or_today(params)?;
    let rows = attendance::day_sheet(state.conn()?, &section, subject_id, date)?;
    Ok(json!({
        "date": date.format("%Y-%m-%d").to_string(),
        "section": section,
        "subjectId": subject_id,
        "rows": rows,
    }))
}

fn attendance_for_student(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let student_id = required_i64(params, "studentId")?;
    let conn = state.conn()?;
    roster::student_by_id(conn, student_id)?;
    let records = attendance::student_history(conn, student_id)?;
    Ok(json!({ "records": records }))
}

fn attendance_summary(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<serde_json::Value> {
    let student_id = required_i64(params, "studentId")?;
    let conn = state.conn()?;
    roster::student_by_id(conn, student_id)?;
    let records = attendance::student_history(conn, student_id)?;
    Ok(json!({
        "studentId": student_id,
        "total": records.len(),
        "percentage": attendance::percentage(&records),
        "byMonth": attendance::group_by_month(&records),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.save" => attendance_save(state, &req.params),
        "attendance.daySheet" => attendance_day_sheet(state, &req.params),
        "attendance.forStudent" => attendance_for_student(state, &req.params),
        "attendance.summary" => attendance_summary(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
