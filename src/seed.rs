//! Demo data for a fresh workspace, plus tolerant JSON row import.

use rusqlite::Connection;
use serde_json::Value;

use crate::error::AppResult;
use crate::roster::{self, ClassCode, Student, Subject};

/// Fallback access codes for the demo subjects, keyed by subject name.
const DEMO_SUBJECT_CODES: [(&str, &str); 6] = [
    ("DMS", "8253A-67K"),
    ("TOC", "3135B-23X"),
    ("DCCN", "9402C-11M"),
    ("DBMS", "2856D-96T"),
    ("JAVA", "7361E-39J"),
    ("MPI", "5247F-72L"),
];

const DEMO_CLASS_CODES: [(i64, i64, &str, &str); 5] = [
    (1, 12, "A", "CA12A001"),
    (2, 12, "B", "CA12B002"),
    (3, 12, "C", "CA12C003"),
    (4, 12, "D", "CA12D004"),
    (5, 12, "E", "CA12E005"),
];

// (sno, name, student code, parent code)
const DEMO_STUDENTS_SECTION_A: [(i64, &str, &str, &str); 15] = [
    (1, "Aarav Agarwal", "X7A2P9Q5L8", "PA9X5L7T3M1"),
    (2, "Aakash Anand", "M3T8Z1Y4W6", "PA7A3Q9P5G1"),
    (3, "Aaryan Ahuja", "K9V4B7X2C1", "PA5N1B7M9X3"),
    (4, "Aniket Arya", "D6Q1N8J5T3", "PA1Y3G9K7T5"),
    (5, "Arjun Acharya", "P5A9Y2L7Z8", "PA3P9A7X1B5"),
    (6, "Aditya Ajmera", "C1M6X4T3V9", "PA5X7L3T9M1"),
    (7, "Abhinav Arora", "W8K7Q2N5B1", "PA1A9Q7P3G6"),
    (8, "Aman Awasthi", "Y4D3P9L8M2", "PA7N5B9M1X3"),
    (9, "Ashish Ameta", "A9T5X1Z7Q6", "PA3Y1G7K9T5"),
    (10, "Anshul Akhtar", "N2V8B4Y3D1", "PA9P1A3X7M6"),
    (11, "Avinash Alok", "L7M5X9C2Q8", "PA2X9L7T5B3"),
    (12, "Arnav Atre", "Z4T1K3Y6P9", "PA7A1Q5P9G3"),
    (13, "Anirudh Ashraf", "X8D2N7M5B4", "PA1N7B5M3X9"),
    (14, "Akshay Advani", "Q9V1A3T6Y8", "PA6Y9G3K7T1"),
    (15, "Amit Aulakh", "P7B4L2Z1M6", "PA2P7A9X3M5"),
];

pub fn fallback_subject_code(subject_name: &str) -> Option<&'static str> {
    let name = subject_name.trim();
    DEMO_SUBJECT_CODES
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, code)| *code)
}

pub fn demo_subjects() -> Vec<Subject> {
    DEMO_SUBJECT_CODES
        .iter()
        .enumerate()
        .map(|(i, (name, code))| Subject {
            id: i as i64 + 1,
            subject_name: name.to_string(),
            code: code.to_string(),
            section: "A".to_string(),
        })
        .collect()
}

pub fn demo_students() -> Vec<Student> {
    DEMO_STUDENTS_SECTION_A
        .iter()
        .map(|(sno, name, student_code, parent_code)| Student {
            id: *sno,
            sno: *sno,
            student_name: name.to_string(),
            student_code: student_code.to_string(),
            parent_code: parent_code.to_string(),
            section: "A".to_string(),
            photo_url: None,
        })
        .collect()
}

pub fn demo_class_codes() -> Vec<ClassCode> {
    DEMO_CLASS_CODES
        .iter()
        .map(|(sno, year, section, code)| ClassCode {
            id: None,
            sno: *sno,
            year: *year,
            section: section.to_string(),
            code: code.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoSeedReport {
    pub class_codes_ok: bool,
    pub section_a_ok: bool,
    pub message: String,
}

fn upsert_all<T>(
    conn: &Connection,
    rows: &[T],
    f: fn(&Connection, &T) -> rusqlite::Result<()>,
) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    for row in rows {
        f(&tx, row)?;
    }
    tx.commit()
}

/// Upserts the demo class codes, subjects and students. Each group is
/// committed on its own so one failing group does not hide the others.
pub fn seed_demo_data(conn: &Connection) -> AppResult<DemoSeedReport> {
    let class_codes = upsert_all(conn, &demo_class_codes(), roster::upsert_class_code);
    let subjects = upsert_all(conn, &demo_subjects(), roster::upsert_subject);
    let students = upsert_all(conn, &demo_students(), roster::upsert_student);

    let mut problems = Vec::new();
    for (what, res) in [
        ("class codes", &class_codes),
        ("subjects", &subjects),
        ("students", &students),
    ] {
        if let Err(e) = res {
            tracing::warn!(group = what, error = %e, "demo seed failed");
            problems.push(format!("{}: {}", what, e));
        }
    }

    let message = if problems.is_empty() {
        "All data uploaded successfully".to_string()
    } else {
        format!("Error uploading some data: {}", problems.join("; "))
    };
    Ok(DemoSeedReport {
        class_codes_ok: class_codes.is_ok(),
        section_a_ok: subjects.is_ok() && students.is_ok(),
        message,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

fn str_field<'a>(row: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| row.get(*k).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn int_field(row: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| {
        let v = row.get(*k)?;
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

/// Accepts both camelCase and the snake_case column names of exported sheets.
pub fn subject_from_json(row: &Value) -> Option<Subject> {
    let id = int_field(row, &["id"])?;
    let subject_name = str_field(row, &["subjectName", "subject_name"])?.to_string();
    let section = str_field(row, &["section"])?.to_ascii_uppercase();
    let code = match str_field(row, &["code"]) {
        Some(c) => c.to_string(),
        None => fallback_subject_code(&subject_name)?.to_string(),
    };
    Some(Subject {
        id,
        subject_name,
        code,
        section,
    })
}

pub fn student_from_json(row: &Value) -> Option<Student> {
    let id = int_field(row, &["id"])?;
    Some(Student {
        id,
        sno: int_field(row, &["sno"]).unwrap_or(id),
        student_name: str_field(row, &["studentName", "student_name"])?.to_string(),
        student_code: str_field(row, &["studentCode", "student_code"])?.to_string(),
        parent_code: str_field(row, &["parentCode", "parent_code"])?.to_string(),
        section: str_field(row, &["section"])?.to_ascii_uppercase(),
        photo_url: str_field(row, &["photoUrl", "photo_url"]).map(str::to_string),
    })
}

fn import_rows<T>(
    conn: &Connection,
    rows: &[Value],
    parse: fn(&Value) -> Option<T>,
    store: fn(&Connection, &T) -> rusqlite::Result<()>,
) -> AppResult<ImportReport> {
    let mut report = ImportReport::default();
    let tx = conn.unchecked_transaction()?;
    for (idx, raw) in rows.iter().enumerate() {
        match parse(raw) {
            Some(row) => {
                store(&tx, &row)?;
                report.imported += 1;
            }
            None => {
                tracing::debug!(row = idx, "skipping malformed import row");
                report.skipped += 1;
            }
        }
    }
    tx.commit()?;
    Ok(report)
}

pub fn import_subjects(conn: &Connection, rows: &[Value]) -> AppResult<ImportReport> {
    import_rows(conn, rows, subject_from_json, roster::upsert_subject)
}

pub fn import_students(conn: &Connection, rows: &[Value]) -> AppResult<ImportReport> {
    import_rows(conn, rows, student_from_json, roster::upsert_student)
}
