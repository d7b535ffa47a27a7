//! View models for the four dashboards. Each one re-checks the session role
//! before reading anything.

use crate::attendance;
use crate::auth::Role;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::ipc::error::respond;
use crate::ipc::helpers::date_or_today;
use crate::ipc::types::{AppState, Request};
use crate::marks;
use crate::roster;
use crate::session::Profile;
use rusqlite::Connection;
use serde_json::json;

fn role_mismatch() -> AppError {
    AppError::Unauthorized {
        message: "Unauthorized access",
        redirect: "/",
    }
}

fn student_overview(conn: &Connection, student_id: i64) -> AppResult<serde_json::Value> {
    let student = roster::student_by_id(conn, student_id)?;
    let records = attendance::student_history(conn, student_id)?;
    let marks = marks::marks_for_student(conn, student_id)?;
    Ok(json!({
        "student": {
            "id": student.id,
            "sno": student.sno,
            "studentName": student.student_name,
            "section": student.section,
            "photoUrl": student.photo_url,
        },
        "attendance": {
            "records": records,
            "total": records.len(),
            "percentage": attendance::percentage(&records),
            "byMonth": attendance::group_by_month(&records),
        },
        "marks": marks,
    }))
}

fn teacher_dashboard(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let session = state.session.require(Role::Teacher)?;
    let Profile::Teacher(teacher) = &session.profile else {
        return Err(role_mismatch());
    };
    let conn = state.conn()?;
    let date = date_or_today(params)?;
    let sheet = match teacher.subject_id {
        Some(subject_id) => Some(attendance::day_sheet(conn, &teacher.section, subject_id, date)?),
        None => None,
    };
    let subjects = roster::list_subjects(conn, Some(teacher.section.as_str()))?;
    Ok(json!({
        "profile": session.to_json(),
        "date": date.format("%Y-%m-%d").to_string(),
        "subjects": subjects,
        "students": roster::list_students(conn, Some(teacher.section.as_str()))?.len(),
        "sheet": sheet,
    }))
}

fn student_dashboard(state: &AppState) -> AppResult<serde_json::Value> {
    let session = state.session.require(Role::Student)?;
    let Profile::Student(student) = &session.profile else {
        return Err(role_mismatch());
    };
    let mut view = student_overview(state.conn()?, student.student_id)?;
    view["profile"] = session.to_json();
    Ok(view)
}

fn mentor_dashboard(state: &AppState) -> AppResult<serde_json::Value> {
    let session = state.session.require(Role::ParentMentor)?;
    let Profile::ParentMentor(parent) = &session.profile else {
        return Err(role_mismatch());
    };
    let mut view = student_overview(state.conn()?, parent.student_id)?;
    view["profile"] = session.to_json();
    Ok(view)
}

fn admin_dashboard(state: &AppState) -> AppResult<serde_json::Value> {
    let session = state.session.require(Role::Admin)?;
    let conn = state.conn()?;
    Ok(json!({
        "profile": session.to_json(),
        "counts": {
            "subjects": db::count_rows(conn, "subjects")?,
            "students": db::count_rows(conn, "students")?,
            "classCodes": db::count_rows(conn, "class_codes")?,
            "attendance": db::count_rows(conn, "attendance")?,
        },
        "classCodes": roster::list_class_codes(conn)?,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "dashboard.teacher" => teacher_dashboard(state, &req.params),
        "dashboard.student" => student_dashboard(state),
        "dashboard.mentor" => mentor_dashboard(state),
        "dashboard.admin" => admin_dashboard(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
