use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Month, NaiveDate};
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::roster;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Late => "late",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(AttendanceStatus::Present),
            "absent" => Ok(AttendanceStatus::Absent),
            "late" => Ok(AttendanceStatus::Late),
            other => Err(format!("unknown attendance status: {}", other)),
        }
    }
}

/// One row of a teacher's sheet. `None` means nobody touched it.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub student_id: i64,
    pub status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone)]
pub struct SaveBatch {
    pub date: NaiveDate,
    pub class_id: String,
    pub subject_id: i64,
    pub teacher_id: String,
    pub selections: Vec<Selection>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub late: usize,
}

impl StatusCounts {
    fn bump(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Late => self.late += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.late
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOutcome {
    pub date: String,
    pub class_id: String,
    pub subject_id: i64,
    pub saved: usize,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceMark {
    pub id: String,
    pub student_id: i64,
    pub class_id: String,
    pub subject_id: i64,
    pub date: String,
    pub status: AttendanceStatus,
    pub teacher_id: String,
    pub marked_at: String,
}

pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::bad_params("date must be YYYY-MM-DD"))
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Writes a whole sheet in one transaction; unset selections land as absent.
/// Each student may appear once per batch.
pub fn save_batch(conn: &Connection, batch: &SaveBatch) -> AppResult<SaveOutcome> {
    if batch.class_id.trim().is_empty() {
        return Err(AppError::bad_params("classId must not be empty"));
    }
    let mut seen = HashSet::with_capacity(batch.selections.len());
    if let Some(dup) = batch.selections.iter().find(|s| !seen.insert(s.student_id)) {
        return Err(AppError::bad_params(format!(
            "studentId {} appears more than once",
            dup.student_id
        )));
    }
    let date = batch.date.format("%Y-%m-%d").to_string();
    let marked_at = chrono::Local::now().to_rfc3339();
    let mut counts = StatusCounts::default();

    let tx = conn.unchecked_transaction().map_err(AppError::SaveFailed)?;
    for sel in &batch.selections {
        let status = sel.status.unwrap_or(AttendanceStatus::Absent);
        tx.execute(
            "INSERT INTO attendance(id, student_id, class_id, subject_id, date, status, teacher_id, marked_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(student_id, date, subject_id) DO UPDATE SET
               class_id = excluded.class_id,
               status = excluded.status,
               teacher_id = excluded.teacher_id,
               marked_at = excluded.marked_at",
            (
                uuid::Uuid::new_v4().to_string(),
                sel.student_id,
                &batch.class_id,
                batch.subject_id,
                &date,
                status.as_str(),
                &batch.teacher_id,
                &marked_at,
            ),
        )
        .map_err(AppError::SaveFailed)?;
        counts.bump(status);
    }
    tx.commit().map_err(AppError::SaveFailed)?;

    tracing::info!(
        date = %date,
        class_id = %batch.class_id,
        subject_id = batch.subject_id,
        saved = batch.selections.len(),
        "attendance saved"
    );
    Ok(SaveOutcome {
        date,
        class_id: batch.class_id.clone(),
        subject_id: batch.subject_id,
        saved: batch.selections.len(),
        counts,
    })
}

const MARK_COLUMNS: &str =
    "id, student_id, class_id, subject_id, date, status, teacher_id, marked_at";

fn mark_from_row(r: &Row<'_>) -> rusqlite::Result<AttendanceMark> {
    let raw_status: String = r.get(5)?;
    let status = raw_status.parse::<AttendanceStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;
    Ok(AttendanceMark {
        id: r.get(0)?,
        student_id: r.get(1)?,
        class_id: r.get(2)?,
        subject_id: r.get(3)?,
        date: r.get(4)?,
        status,
        teacher_id: r.get(6)?,
        marked_at: r.get(7)?,
    })
}

/// All marks for one student, newest first.
pub fn student_history(conn: &Connection, student_id: i64) -> AppResult<Vec<AttendanceMark>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MARK_COLUMNS}
         FROM attendance
         WHERE student_id = ?
         ORDER BY date DESC, subject_id"
    ))?;
    let rows = stmt
        .query_map([student_id], mark_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn marks_on(
    conn: &Connection,
    subject_id: i64,
    date: NaiveDate,
) -> AppResult<Vec<AttendanceMark>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MARK_COLUMNS}
         FROM attendance
         WHERE subject_id = ? AND date = ?
         ORDER BY student_id"
    ))?;
    let rows = stmt
        .query_map(
            (subject_id, date.format("%Y-%m-%d").to_string()),
            mark_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn rounded_percent(part: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{}%", ((part as f64 / total as f64) * 100.0).round() as i64)
}

/// Share of `present` marks, e.g. `"89%"`.
pub fn percentage(records: &[AttendanceMark]) -> String {
    let present = records
        .iter()
        .filter(|r| r.status == AttendanceStatus::Present)
        .count();
    rounded_percent(present, records.len())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    pub month: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
    pub percentage: String,
}

/// Per calendar month, oldest first. Rows with unparseable dates are ignored.
pub fn group_by_month(records: &[AttendanceMark]) -> Vec<MonthSummary> {
    let mut by_month: BTreeMap<(i32, u32), StatusCounts> = BTreeMap::new();
    for r in records {
        let Ok(date) = NaiveDate::parse_from_str(&r.date, "%Y-%m-%d") else {
            continue;
        };
        by_month
            .entry((date.year(), date.month()))
            .or_default()
            .bump(r.status);
    }
    by_month
        .into_iter()
        .map(|((year, month), counts)| {
            let name = u8::try_from(month)
                .ok()
                .and_then(|m| Month::try_from(m).ok())
                .map(|m| m.name())
                .unwrap_or("Unknown");
            MonthSummary {
                month: format!("{} {}", name, year),
                percentage: rounded_percent(counts.present, counts.total()),
                counts,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub student_id: i64,
    pub sno: i64,
    pub student_name: String,
    pub status: Option<AttendanceStatus>,
}

/// The section roster with whatever is already recorded for the day.
pub fn day_sheet(
    conn: &Connection,
    section: &str,
    subject_id: i64,
    date: NaiveDate,
) -> AppResult<Vec<SheetRow>> {
    let students = roster::list_students(conn, Some(section))?;
    let marks = marks_on(conn, subject_id, date)?;
    Ok(students
        .into_iter()
        .map(|s| SheetRow {
            status: marks
                .iter()
                .find(|m| m.student_id == s.id)
                .map(|m| m.status),
            student_id: s.id,
            sno: s.sno,
            student_name: s.student_name,
        })
        .collect())
}
