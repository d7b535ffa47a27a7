//! The logged-in profile, where each role lands, and the dashboard guard.

use serde::{Deserialize, Serialize};

use crate::auth::{Role, VerifiedRecord, DEMO_TEACHER_SUBJECT};
use crate::error::{AppError, AppResult};

const DEMO_TEACHER_SECTION: &str = "E";
const CLASS_YEAR: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Entry,
    TeacherDashboard,
    StudentDashboard,
    AdminDashboard,
    MentorDashboard,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Entry => "/",
            Route::TeacherDashboard => "/teacher-dashboard",
            Route::StudentDashboard => "/student-dashboard",
            Route::AdminDashboard => "/admin-dashboard",
            Route::MentorDashboard => "/mentor-dashboard",
        }
    }
}

pub fn dispatch(role: Role) -> Route {
    match role {
        Role::Teacher => Route::TeacherDashboard,
        Role::Student => Route::StudentDashboard,
        Role::Admin => Route::AdminDashboard,
        Role::ParentMentor => Route::MentorDashboard,
    }
}

/// Optional login-form fields merged into the profile.
#[derive(Debug, Clone, Default)]
pub struct LoginExtras {
    pub section: Option<String>,
    pub subject: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherSession {
    pub name: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<i64>,
    pub section: String,
    pub class_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSession {
    pub name: String,
    pub student_id: i64,
    pub sno: i64,
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentSession {
    pub name: String,
    pub student_id: i64,
    pub student_name: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSession {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Profile {
    Teacher(TeacherSession),
    Student(StudentSession),
    Admin(AdminSession),
    #[serde(rename = "Parent/Mentor")]
    ParentMentor(ParentSession),
}

impl Profile {
    pub fn role(&self) -> Role {
        match self {
            Profile::Teacher(_) => Role::Teacher,
            Profile::Student(_) => Role::Student,
            Profile::Admin(_) => Role::Admin,
            Profile::ParentMentor(_) => Role::ParentMentor,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Profile::Teacher(t) => &t.name,
            Profile::Student(s) => &s.name,
            Profile::Admin(a) => &a.name,
            Profile::ParentMentor(p) => &p.name,
        }
    }
}

/// One login. The flattened JSON form is what the shell keeps for the tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProfile {
    pub session_id: String,
    pub logged_in_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub profile: Profile,
}

impl SessionProfile {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn class_label(section: &str) -> String {
    format!("{} {}", CLASS_YEAR, section)
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Display name for a subject-code login, which has no person attached.
fn teacher_name_from_code(code: &str) -> String {
    let prefix = match code.split_once('-') {
        Some((head, _)) if !head.is_empty() => head.to_string(),
        _ => code.chars().take(4).collect(),
    };
    format!("Teacher {}", prefix)
}

/// Builds the profile for a verified record.
pub fn commit(record: &VerifiedRecord, extras: &LoginExtras) -> SessionProfile {
    let profile = match record {
        VerifiedRecord::DemoTeacher { name, subject } => {
            let section = non_empty(&extras.section)
                .unwrap_or(DEMO_TEACHER_SECTION)
                .to_ascii_uppercase();
            let subject = non_empty(&extras.subject)
                .map(str::to_string)
                .unwrap_or_else(|| {
                    if subject.is_empty() {
                        DEMO_TEACHER_SUBJECT.to_string()
                    } else {
                        subject.clone()
                    }
                });
            Profile::Teacher(TeacherSession {
                name: name.clone(),
                subject,
                subject_id: None,
                class_label: class_label(&section),
                section,
            })
        }
        VerifiedRecord::Subject(s) => Profile::Teacher(TeacherSession {
            name: teacher_name_from_code(&s.code),
            subject: s.subject_name.clone(),
            subject_id: Some(s.id),
            section: s.section.clone(),
            class_label: class_label(&s.section),
        }),
        VerifiedRecord::Student(s) => Profile::Student(StudentSession {
            name: s.student_name.clone(),
            student_id: s.id,
            sno: s.sno,
            section: s.section.clone(),
            photo_url: s.photo_url.clone(),
        }),
        VerifiedRecord::Parent(s) => Profile::ParentMentor(ParentSession {
            name: format!("Parent of {}", s.student_name),
            student_id: s.id,
            student_name: s.student_name.clone(),
            section: s.section.clone(),
        }),
        VerifiedRecord::Admin => Profile::Admin(AdminSession {
            name: "Admin".to_string(),
            section: non_empty(&extras.section).map(str::to_string),
        }),
    };

    SessionProfile {
        session_id: uuid::Uuid::new_v4().to_string(),
        logged_in_at: chrono::Local::now().to_rfc3339(),
        email: non_empty(&extras.email).map(str::to_string),
        profile,
    }
}

/// The single session slot of the process.
#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Option<SessionProfile>,
}

impl SessionSlot {
    pub fn current(&self) -> Option<&SessionProfile> {
        self.current.as_ref()
    }

    /// Replaces whatever session was there.
    pub fn store(&mut self, profile: SessionProfile) -> &SessionProfile {
        if let Some(prev) = self.current.as_ref() {
            tracing::info!(previous = %prev.role(), "replacing existing session");
        }
        self.current.insert(profile)
    }

    pub fn clear(&mut self) -> Option<SessionProfile> {
        self.current.take()
    }

    /// Dashboard entry check: a session must exist and carry `role`.
    pub fn require(&self, role: Role) -> AppResult<&SessionProfile> {
        let Some(current) = self.current.as_ref() else {
            return Err(AppError::Unauthorized {
                message: "You need to login first",
                redirect: Route::Entry.path(),
            });
        };
        if current.role() != role {
            tracing::warn!(expected = %role, actual = %current.role(), "dashboard role mismatch");
            return Err(AppError::Unauthorized {
                message: "Unauthorized access",
                redirect: Route::Entry.path(),
            });
        }
        Ok(current)
    }
}
