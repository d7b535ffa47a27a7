//! Unique-code verification for the four login roles.

use std::fmt;
use std::str::FromStr;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::BypassPolicy;
use crate::roster::{self, Student, Subject};

pub const DEMO_TEACHER_NAME: &str = "Aayush";
pub const DEMO_TEACHER_SUBJECT: &str = "History";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Teacher,
    Student,
    Admin,
    #[serde(rename = "Parent/Mentor")]
    ParentMentor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Teacher, Role::Student, Role::Admin, Role::ParentMentor];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Teacher => "Teacher",
            Role::Student => "Student",
            Role::Admin => "Admin",
            Role::ParentMentor => "Parent/Mentor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            "admin" => Ok(Role::Admin),
            "parent/mentor" | "parent" | "mentor" => Ok(Role::ParentMentor),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The record a code resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifiedRecord {
    DemoTeacher { name: String, subject: String },
    Subject(Subject),
    Student(Student),
    /// Parent/mentor codes authenticate against the linked student's row.
    Parent(Student),
    Admin,
}

impl VerifiedRecord {
    pub fn role(&self) -> Role {
        match self {
            VerifiedRecord::DemoTeacher { .. } | VerifiedRecord::Subject(_) => Role::Teacher,
            VerifiedRecord::Student(_) => Role::Student,
            VerifiedRecord::Parent(_) => Role::ParentMentor,
            VerifiedRecord::Admin => Role::Admin,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            VerifiedRecord::DemoTeacher { name, subject } => serde_json::json!({
                "kind": "demoTeacher",
                "name": name,
                "subjectName": subject,
            }),
            VerifiedRecord::Subject(s) => serde_json::json!({
                "kind": "subject",
                "subject": s,
            }),
            VerifiedRecord::Student(s) => serde_json::json!({
                "kind": "student",
                "student": s,
            }),
            VerifiedRecord::Parent(s) => serde_json::json!({
                "kind": "parent",
                "studentId": s.id,
                "studentName": s.student_name,
                "section": s.section,
            }),
            VerifiedRecord::Admin => serde_json::json!({ "kind": "admin" }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyCode,
    MissingSection,
    NotFound,
    Ambiguous,
    BackendUnavailable,
}

impl Rejection {
    pub fn as_str(self) -> &'static str {
        match self {
            Rejection::EmptyCode => "empty_code",
            Rejection::MissingSection => "missing_section",
            Rejection::NotFound => "not_found",
            Rejection::Ambiguous => "ambiguous",
            Rejection::BackendUnavailable => "backend_unavailable",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Rejection::EmptyCode => "code must not be empty",
            Rejection::MissingSection => "teacher login requires a section",
            Rejection::NotFound => "invalid code",
            Rejection::Ambiguous => "code matches more than one record",
            Rejection::BackendUnavailable => "record store unavailable",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verification {
    Valid(VerifiedRecord),
    Invalid(Rejection),
}

impl Verification {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verification::Valid(_))
    }
}

/// Looks a code up for the given role. Store failures come back as
/// `BackendUnavailable`, never as an error.
pub fn verify(
    conn: Option<&Connection>,
    bypass: &BypassPolicy,
    role: Role,
    code: &str,
    section: Option<&str>,
) -> Verification {
    let code = code.trim();
    let section = section.map(str::trim).filter(|s| !s.is_empty());
    if code.is_empty() {
        return Verification::Invalid(Rejection::EmptyCode);
    }

    match role {
        Role::Admin => Verification::Valid(VerifiedRecord::Admin),
        Role::Teacher if bypass.matches(code) => {
            tracing::info!(section = ?section, "demo teacher code accepted");
            Verification::Valid(VerifiedRecord::DemoTeacher {
                name: DEMO_TEACHER_NAME.to_string(),
                subject: DEMO_TEACHER_SUBJECT.to_string(),
            })
        }
        Role::Teacher => {
            let Some(section) = section else {
                return Verification::Invalid(Rejection::MissingSection);
            };
            lookup_single(conn, role, |conn| {
                query_all(
                    conn,
                    &format!(
                        "SELECT {} FROM subjects WHERE code = ? AND section = ?",
                        roster::SUBJECT_COLUMNS
                    ),
                    (code, section),
                    roster::subject_from_row,
                )
            })
            .map_or_else(Verification::Invalid, |s| {
                Verification::Valid(VerifiedRecord::Subject(s))
            })
        }
        Role::Student => {
            lookup_single(conn, role, |conn| student_lookup(conn, "student_code", code))
                .map_or_else(Verification::Invalid, |s| {
                    Verification::Valid(VerifiedRecord::Student(s))
                })
        }
        Role::ParentMentor => {
            lookup_single(conn, role, |conn| student_lookup(conn, "parent_code", code))
                .map_or_else(Verification::Invalid, |s| {
                    Verification::Valid(VerifiedRecord::Parent(s))
                })
        }
    }
}

fn student_lookup(conn: &Connection, column: &str, code: &str) -> rusqlite::Result<Vec<Student>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM students WHERE {} = ?",
            roster::STUDENT_COLUMNS,
            column
        ),
        [code],
        roster::student_from_row,
    )
}

fn query_all<T, P, F>(conn: &Connection, sql: &str, params: P, f: F) -> rusqlite::Result<Vec<T>>
where
    P: rusqlite::Params,
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, f)?.collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn lookup_single<T, F>(conn: Option<&Connection>, role: Role, f: F) -> Result<T, Rejection>
where
    F: FnOnce(&Connection) -> rusqlite::Result<Vec<T>>,
{
    let Some(conn) = conn else {
        tracing::warn!(%role, "code lookup without an open workspace");
        return Err(Rejection::BackendUnavailable);
    };
    let mut rows = match f(conn) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(%role, error = %e, "code lookup failed");
            return Err(Rejection::BackendUnavailable);
        }
    };
    match rows.len() {
        0 => Err(Rejection::NotFound),
        1 => Ok(rows.remove(0)),
        n => {
            tracing::warn!(%role, matches = n, "code resolves to more than one record");
            Err(Rejection::Ambiguous)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_in_memory;
    use crate::seed;

    fn seeded() -> Connection {
        let conn = open_in_memory();
        seed::seed_demo_data(&conn).expect("seed");
        conn
    }

    #[test]
    fn role_names_parse_with_aliases() {
        assert_eq!("Parent/Mentor".parse::<Role>(), Ok(Role::ParentMentor));
        assert_eq!("mentor".parse::<Role>(), Ok(Role::ParentMentor));
        assert_eq!(" teacher ".parse::<Role>(), Ok(Role::Teacher));
        assert!("principal".parse::<Role>().is_err());
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn bypass_code_is_valid_for_any_section() {
        let conn = seeded();
        let policy = BypassPolicy::default();
        for section in [Some("A"), Some("E"), Some("Z"), None] {
            let v = verify(Some(&conn), &policy, Role::Teacher, "aayush123", section);
            match v {
                Verification::Valid(VerifiedRecord::DemoTeacher { subject, .. }) => {
                    assert_eq!(subject, "History")
                }
                other => panic!("unexpected {:?} for {:?}", other, section),
            }
        }
    }

    #[test]
    fn disabled_bypass_falls_through_to_lookup() {
        let conn = seeded();
        let policy = BypassPolicy {
            enabled: false,
            ..BypassPolicy::default()
        };
        let v = verify(Some(&conn), &policy, Role::Teacher, "aayush123", Some("E"));
        assert_eq!(v, Verification::Invalid(Rejection::NotFound));
    }

    #[test]
    fn teacher_code_is_scoped_to_section() {
        let conn = seeded();
        let policy = BypassPolicy::default();
        let ok = verify(Some(&conn), &policy, Role::Teacher, "8253A-67K", Some("A"));
        match ok {
            Verification::Valid(VerifiedRecord::Subject(s)) => {
                assert_eq!(s.subject_name, "DMS");
                assert_eq!(s.section, "A");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            verify(Some(&conn), &policy, Role::Teacher, "8253A-67K", Some("B")),
            Verification::Invalid(Rejection::NotFound)
        );
        assert_eq!(
            verify(Some(&conn), &policy, Role::Teacher, "8253A-67K", None),
            Verification::Invalid(Rejection::MissingSection)
        );
    }

    #[test]
    fn student_and_parent_codes_resolve_the_same_row() {
        let conn = seeded();
        let policy = BypassPolicy::default();
        let student = verify(Some(&conn), &policy, Role::Student, "X7A2P9Q5L8", Some("Q"));
        let parent = verify(Some(&conn), &policy, Role::ParentMentor, "PA9X5L7T3M1", None);
        match (student, parent) {
            (
                Verification::Valid(VerifiedRecord::Student(s)),
                Verification::Valid(VerifiedRecord::Parent(p)),
            ) => {
                assert_eq!(s.student_name, "Aarav Agarwal");
                assert_eq!(s.section, "A");
                assert_eq!(s.id, p.id);
            }
            other => panic!("unexpected {:?}", other),
        }
        // A student code is not a parent code.
        assert_eq!(
            verify(Some(&conn), &policy, Role::ParentMentor, "X7A2P9Q5L8", None),
            Verification::Invalid(Rejection::NotFound)
        );
    }

    #[test]
    fn colliding_codes_are_rejected() {
        let conn = seeded();
        let mut dup = roster::student_by_id(&conn, 2).expect("student 2");
        dup.id = 99;
        dup.student_code = "X7A2P9Q5L8".to_string();
        roster::upsert_student(&conn, &dup).expect("insert duplicate");
        assert_eq!(
            verify(Some(&conn), &BypassPolicy::default(), Role::Student, "X7A2P9Q5L8", None),
            Verification::Invalid(Rejection::Ambiguous)
        );
    }

    #[test]
    fn admin_accepts_any_non_empty_code() {
        let policy = BypassPolicy::default();
        assert!(verify(None, &policy, Role::Admin, "anything", None).is_valid());
        assert_eq!(
            verify(None, &policy, Role::Admin, "   ", None),
            Verification::Invalid(Rejection::EmptyCode)
        );
    }

    #[test]
    fn missing_store_is_treated_as_failure() {
        let policy = BypassPolicy::default();
        assert_eq!(
            verify(None, &policy, Role::Student, "X7A2P9Q5L8", None),
            Verification::Invalid(Rejection::BackendUnavailable)
        );
        // The demo teacher needs no store.
        assert!(verify(None, &policy, Role::Teacher, "aayush123", Some("C")).is_valid());
    }
}
