use rusqlite::Connection;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::roster;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRow {
    pub subject_id: i64,
    pub subject: Option<String>,
    pub marks: f64,
    pub out_of: f64,
    pub grade: &'static str,
}

pub fn grade_letter(marks: f64, out_of: f64) -> &'static str {
    let pct = if out_of > 0.0 { marks / out_of * 100.0 } else { 0.0 };
    match pct {
        p if p >= 90.0 => "A+",
        p if p >= 80.0 => "A",
        p if p >= 70.0 => "B+",
        p if p >= 60.0 => "B",
        p if p >= 50.0 => "C",
        p if p >= 40.0 => "D",
        _ => "F",
    }
}

pub fn upsert_mark(
    conn: &Connection,
    student_id: i64,
    subject_id: i64,
    marks: f64,
    out_of: f64,
) -> AppResult<MarkRow> {
    if !(out_of.is_finite() && out_of > 0.0) {
        return Err(AppError::bad_params("outOf must be greater than 0"));
    }
    if !(marks.is_finite() && (0.0..=out_of).contains(&marks)) {
        return Err(AppError::bad_params("marks must be between 0 and outOf"));
    }
    roster::student_by_id(conn, student_id)?;
    let subject = roster::subject_by_id(conn, subject_id)?
        .ok_or_else(|| AppError::not_found("subject not found"))?;

    conn.execute(
        "INSERT INTO marks(student_id, subject_id, marks, out_of, updated_at)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(student_id, subject_id) DO UPDATE SET
           marks = excluded.marks,
           out_of = excluded.out_of,
           updated_at = excluded.updated_at",
        (
            student_id,
            subject_id,
            marks,
            out_of,
            chrono::Local::now().to_rfc3339(),
        ),
    )?;
    Ok(MarkRow {
        subject_id,
        subject: Some(subject.subject_name),
        marks,
        out_of,
        grade: grade_letter(marks, out_of),
    })
}

pub fn marks_for_student(conn: &Connection, student_id: i64) -> AppResult<Vec<MarkRow>> {
    let mut stmt = conn.prepare(
        "SELECT m.subject_id, s.subject_name, m.marks, m.out_of
         FROM marks m
         LEFT JOIN subjects s ON s.id = m.subject_id
         WHERE m.student_id = ?
         ORDER BY m.subject_id",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            let marks: f64 = r.get(2)?;
            let out_of: f64 = r.get(3)?;
            Ok(MarkRow {
                subject_id: r.get(0)?,
                subject: r.get(1)?,
                marks,
                out_of,
                grade: grade_letter(marks, out_of),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::seed;

    #[test]
    fn grade_boundaries() {
        assert_eq!(grade_letter(90.0, 100.0), "A+");
        assert_eq!(grade_letter(89.9, 100.0), "A");
        assert_eq!(grade_letter(35.0, 50.0), "B+");
        assert_eq!(grade_letter(39.0, 100.0), "F");
        assert_eq!(grade_letter(10.0, 0.0), "F");
    }

    #[test]
    fn upsert_replaces_and_validates() {
        let conn = open_in_memory();
        seed::seed_demo_data(&conn).expect("seed");

        upsert_mark(&conn, 1, 2, 61.0, 100.0).expect("first");
        upsert_mark(&conn, 1, 2, 84.0, 100.0).expect("replace");
        let rows = marks_for_student(&conn, 1).expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject.as_deref(), Some("TOC"));
        assert_eq!(rows[0].grade, "A");

        assert_eq!(upsert_mark(&conn, 1, 2, 101.0, 100.0).unwrap_err().code(), "bad_params");
        assert_eq!(upsert_mark(&conn, 1, 77, 50.0, 100.0).unwrap_err().code(), "not_found");
        assert_eq!(upsert_mark(&conn, 500, 2, 50.0, 100.0).unwrap_err().code(), "not_found");
    }
}
