use crate::auth::{self, Verification};
use crate::error::{AppError, AppResult};
use crate::ipc::error::{ok, respond};
use crate::ipc::helpers::{optional_str, required_role};
use crate::ipc::types::{AppState, Request};
use crate::session::{self, LoginExtras, Route};
use serde_json::json;

fn verify_from_params(
    state: &AppState,
    params: &serde_json::Value,
) -> AppResult<(auth::Role, Verification)> {
    let role = required_role(params)?;
    // A blank code is a rejection, not a malformed request.
    let code = params.get("code").and_then(|v| v.as_str()).unwrap_or("");
    let section = optional_str(params, "section");
    let verification = auth::verify(
        state.db.as_ref(),
        &state.config.teacher_bypass,
        role,
        code,
        section.as_deref(),
    );
    Ok((role, verification))
}

fn auth_verify(state: &AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let (role, verification) = verify_from_params(state, params)?;
    Ok(match verification {
        Verification::Valid(record) => json!({
            "valid": true,
            "role": role,
            "record": record.to_json(),
        }),
        Verification::Invalid(reason) => json!({
            "valid": false,
            "role": role,
            "record": null,
            "reason": reason.as_str(),
        }),
    })
}

fn session_login(state: &mut AppState, params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let (role, verification) = verify_from_params(state, params)?;
    let record = match verification {
        Verification::Valid(record) => record,
        Verification::Invalid(reason) => {
            tracing::warn!(%role, reason = reason.as_str(), "login rejected");
            return Err(AppError::VerificationFailed(reason));
        }
    };

    let extras = LoginExtras {
        section: optional_str(params, "section"),
        subject: optional_str(params, "subject"),
        email: optional_str(params, "email"),
    };
    let profile = session::commit(&record, &extras);
    let route = session::dispatch(profile.role());
    let stored = state.session.store(profile);
    tracing::info!(role = %stored.role(), name = stored.profile.name(), "logged in");

    Ok(json!({
        "profile": stored.to_json(),
        "route": route.path(),
    }))
}

fn session_get(state: &AppState) -> serde_json::Value {
    json!({
        "profile": state.session.current().map(|p| p.to_json()),
    })
}

fn session_logout(state: &mut AppState) -> serde_json::Value {
    let previous = state.session.clear();
    if let Some(p) = previous.as_ref() {
        tracing::info!(role = %p.role(), "logged out");
    }
    json!({
        "loggedOut": previous.is_some(),
        "route": Route::Entry.path(),
    })
}

fn session_dispatch(params: &serde_json::Value) -> AppResult<serde_json::Value> {
    let role = required_role(params)?;
    Ok(json!({ "route": session::dispatch(role).path() }))
}

fn handle_auth_verify(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, auth_verify(state, &req.params))
}

fn handle_session_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, session_login(state, &req.params))
}

fn handle_session_dispatch(_state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, session_dispatch(&req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.verify" => Some(handle_auth_verify(state, req)),
        "session.login" => Some(handle_session_login(state, req)),
        "session.get" => Some(ok(&req.id, session_get(state))),
        "session.logout" => Some(ok(&req.id, session_logout(state))),
        "session.dispatch" => Some(handle_session_dispatch(state, req)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db;
    use crate::seed;

    fn state() -> AppState {
        let mut state = AppState::new(Config {
            workspace: None,
            log_json: false,
            teacher_bypass: Default::default(),
        });
        let conn = db::open_in_memory();
        seed::seed_demo_data(&conn).expect("seed");
        state.db = Some(conn);
        state
    }

    #[test]
    fn failed_login_keeps_previous_session() {
        let mut st = state();
        session_login(&mut st, &json!({ "role": "Student", "code": "X7A2P9Q5L8" }))
            .expect("student login");
        let err = session_login(&mut st, &json!({ "role": "Student", "code": "doesnotexist" }))
            .unwrap_err();
        assert_eq!(err.code(), "verification_failed");
        assert_eq!(
            st.session.current().map(|p| p.profile.name().to_string()),
            Some("Aarav Agarwal".to_string())
        );
    }

    #[test]
    fn login_profile_role_matches_input() {
        let mut st = state();
        for (role, code, section, route) in [
            ("Teacher", "aayush123", Some("E"), "/teacher-dashboard"),
            ("Teacher", "9402C-11M", Some("A"), "/teacher-dashboard"),
            ("Student", "M3T8Z1Y4W6", None, "/student-dashboard"),
            ("Parent/Mentor", "PA7A3Q9P5G1", None, "/mentor-dashboard"),
            ("Admin", "root", None, "/admin-dashboard"),
        ] {
            let out = session_login(
                &mut st,
                &json!({ "role": role, "code": code, "section": section }),
            )
            .expect("login");
            assert_eq!(out["route"], route);
            assert_eq!(out["profile"]["role"], role);
        }
    }
}
