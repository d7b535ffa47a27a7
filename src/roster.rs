//! Subjects, students and class codes as stored in the workspace.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: i64,
    pub subject_name: String,
    pub code: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: i64,
    pub sno: i64,
    pub student_name: String,
    pub student_code: String,
    pub parent_code: String,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub sno: i64,
    pub year: i64,
    pub section: String,
    pub code: String,
}

pub(crate) const SUBJECT_COLUMNS: &str = "id, subject_name, code, section";
pub(crate) const STUDENT_COLUMNS: &str =
    "id, sno, student_name, student_code, parent_code, section, photo_url";

pub(crate) fn subject_from_row(r: &Row<'_>) -> rusqlite::Result<Subject> {
    Ok(Subject {
        id: r.get(0)?,
        subject_name: r.get(1)?,
        code: r.get(2)?,
        section: r.get(3)?,
    })
}

pub(crate) fn student_from_row(r: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: r.get(0)?,
        sno: r.get(1)?,
        student_name: r.get(2)?,
        student_code: r.get(3)?,
        parent_code: r.get(4)?,
        section: r.get(5)?,
        photo_url: r.get(6)?,
    })
}

fn class_code_from_row(r: &Row<'_>) -> rusqlite::Result<ClassCode> {
    Ok(ClassCode {
        id: Some(r.get(0)?),
        sno: r.get(1)?,
        year: r.get(2)?,
        section: r.get(3)?,
        code: r.get(4)?,
    })
}

pub fn list_subjects(conn: &Connection, section: Option<&str>) -> AppResult<Vec<Subject>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUBJECT_COLUMNS}
         FROM subjects
         WHERE ?1 IS NULL OR section = ?1
         ORDER BY section, id"
    ))?;
    let rows = stmt
        .query_map([section], subject_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn subject_by_code(conn: &Connection, code: &str) -> AppResult<Subject> {
    conn.query_row(
        &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE code = ? ORDER BY id LIMIT 1"),
        [code],
        subject_from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("subject not found"))
}

pub fn subject_by_id(conn: &Connection, id: i64) -> AppResult<Option<Subject>> {
    Ok(conn
        .query_row(
            &format!("SELECT {SUBJECT_COLUMNS} FROM subjects WHERE id = ?"),
            [id],
            subject_from_row,
        )
        .optional()?)
}

pub fn list_students(conn: &Connection, section: Option<&str>) -> AppResult<Vec<Student>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {STUDENT_COLUMNS}
         FROM students
         WHERE ?1 IS NULL OR section = ?1
         ORDER BY section, sno, id"
    ))?;
    let rows = stmt
        .query_map([section], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn student_by_id(conn: &Connection, id: i64) -> AppResult<Student> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?"),
        [id],
        student_from_row,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("student not found"))
}

pub fn upsert_subject(conn: &Connection, s: &Subject) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO subjects(id, subject_name, code, section)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           subject_name = excluded.subject_name,
           code = excluded.code,
           section = excluded.section",
        (s.id, &s.subject_name, &s.code, &s.section),
    )?;
    Ok(())
}

pub fn upsert_student(conn: &Connection, s: &Student) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO students(id, sno, student_name, student_code, parent_code, section, photo_url)
         VALUES(?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           sno = excluded.sno,
           student_name = excluded.student_name,
           student_code = excluded.student_code,
           parent_code = excluded.parent_code,
           section = excluded.section,
           photo_url = COALESCE(excluded.photo_url, students.photo_url)",
        (
            s.id,
            s.sno,
            &s.student_name,
            &s.student_code,
            &s.parent_code,
            &s.section,
            &s.photo_url,
        ),
    )?;
    Ok(())
}

/// Points a student's profile photo at `photo_url`, or clears it with `None`.
pub fn set_student_photo(
    conn: &Connection,
    student_id: i64,
    photo_url: Option<&str>,
) -> AppResult<Student> {
    let n = conn.execute(
        "UPDATE students SET photo_url = ? WHERE id = ?",
        (photo_url, student_id),
    )?;
    if n == 0 {
        return Err(AppError::not_found("student not found"));
    }
    student_by_id(conn, student_id)
}

pub fn list_class_codes(conn: &Connection) -> AppResult<Vec<ClassCode>> {
    let mut stmt =
        conn.prepare("SELECT id, sno, year, section, code FROM class_codes ORDER BY sno")?;
    let rows = stmt
        .query_map([], class_code_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn validate_class_code(cc: &ClassCode) -> AppResult<()> {
    if cc.section.trim().is_empty() {
        return Err(AppError::bad_params("section must not be empty"));
    }
    if cc.code.trim().is_empty() {
        return Err(AppError::bad_params("code must not be empty"));
    }
    Ok(())
}

pub fn insert_class_code(conn: &Connection, cc: &ClassCode) -> AppResult<ClassCode> {
    validate_class_code(cc)?;
    conn.execute(
        "INSERT INTO class_codes(sno, year, section, code) VALUES(?, ?, ?, ?)",
        (cc.sno, cc.year, cc.section.trim(), cc.code.trim()),
    )?;
    Ok(ClassCode {
        id: Some(conn.last_insert_rowid()),
        sno: cc.sno,
        year: cc.year,
        section: cc.section.trim().to_string(),
        code: cc.code.trim().to_string(),
    })
}

/// All-or-nothing insert of several class codes.
pub fn insert_class_codes(conn: &Connection, codes: &[ClassCode]) -> AppResult<Vec<ClassCode>> {
    for cc in codes {
        validate_class_code(cc)?;
    }
    let tx = conn.unchecked_transaction()?;
    let mut inserted = Vec::with_capacity(codes.len());
    for cc in codes {
        inserted.push(insert_class_code(&tx, cc)?);
    }
    tx.commit()?;
    Ok(inserted)
}

pub fn upsert_class_code(conn: &Connection, cc: &ClassCode) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO class_codes(sno, year, section, code)
         VALUES(?, ?, ?, ?)
         ON CONFLICT(sno) DO UPDATE SET
           year = excluded.year,
           section = excluded.section,
           code = excluded.code",
        (cc.sno, cc.year, &cc.section, &cc.code),
    )?;
    Ok(())
}

pub fn delete_class_code(conn: &Connection, id: i64) -> AppResult<()> {
    let n = conn.execute("DELETE FROM class_codes WHERE id = ?", [id])?;
    if n == 0 {
        return Err(AppError::not_found("class code not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;

    fn code(sno: i64, section: &str) -> ClassCode {
        ClassCode {
            id: None,
            sno,
            year: 12,
            section: section.to_string(),
            code: format!("CA12{}00{}", section, sno),
        }
    }

    #[test]
    fn class_codes_batch_is_atomic() {
        let conn = open_in_memory();
        insert_class_code(&conn, &code(1, "A")).expect("insert first");

        // sno 1 collides, so nothing from this batch may land.
        let err = insert_class_codes(&conn, &[code(2, "B"), code(1, "C")]).unwrap_err();
        assert_eq!(err.code(), "db_query_failed");
        let listed = list_class_codes(&conn).expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].section, "A");
    }

    #[test]
    fn delete_missing_class_code_is_not_found() {
        let conn = open_in_memory();
        let err = delete_class_code(&conn, 42).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn photo_survives_reseed_and_can_be_cleared() {
        let conn = open_in_memory();
        let mut s = Student {
            id: 1,
            sno: 1,
            student_name: "Aarav Agarwal".to_string(),
            student_code: "X7A2P9Q5L8".to_string(),
            parent_code: "PA9X5L7T3M1".to_string(),
            section: "A".to_string(),
            photo_url: None,
        };
        upsert_student(&conn, &s).expect("insert");

        let updated = set_student_photo(&conn, 1, Some("student-photos/aarav.jpg")).expect("set");
        assert_eq!(updated.photo_url.as_deref(), Some("student-photos/aarav.jpg"));

        s.student_name = "Aarav A.".to_string();
        upsert_student(&conn, &s).expect("reseed");
        let kept = student_by_id(&conn, 1).expect("student");
        assert_eq!(kept.photo_url.as_deref(), Some("student-photos/aarav.jpg"));

        let cleared = set_student_photo(&conn, 1, None).expect("clear");
        assert!(cleared.photo_url.is_none());
        assert_eq!(set_student_photo(&conn, 9, None).unwrap_err().code(), "not_found");
    }

    #[test]
    fn section_filter_applies_to_students() {
        let conn = open_in_memory();
        for (id, section) in [(1, "A"), (2, "B"), (3, "A")] {
            upsert_student(
                &conn,
                &Student {
                    id,
                    sno: id,
                    student_name: format!("Student {id}"),
                    student_code: format!("S{id}"),
                    parent_code: format!("P{id}"),
                    section: section.to_string(),
                    photo_url: None,
                },
            )
            .expect("upsert");
        }
        let a = list_students(&conn, Some("A")).expect("list");
        assert_eq!(a.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(list_students(&conn, None).expect("list all").len(), 3);
    }
}
