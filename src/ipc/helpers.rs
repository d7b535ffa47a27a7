use chrono::NaiveDate;
use serde_json::Value;

use crate::attendance;
use crate::auth::Role;
use crate::error::{AppError, AppResult};

pub fn optional_str(params: &Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_str(params: &Value, key: &str) -> AppResult<String> {
    optional_str(params, key).ok_or_else(|| AppError::bad_params(format!("missing {}", key)))
}

/// Ids arrive as numbers or as numeric strings depending on the shell.
pub fn as_id(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
}

pub fn optional_i64(params: &Value, key: &str) -> AppResult<Option<i64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => as_id(v)
            .map(Some)
            .ok_or_else(|| AppError::bad_params(format!("{} must be an integer", key))),
    }
}

pub fn required_i64(params: &Value, key: &str) -> AppResult<i64> {
    optional_i64(params, key)?.ok_or_else(|| AppError::bad_params(format!("missing {}", key)))
}

pub fn optional_f64(params: &Value, key: &str) -> AppResult<Option<f64>> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| AppError::bad_params(format!("{} must be a number", key))),
    }
}

pub fn required_role(params: &Value) -> AppResult<Role> {
    required_str(params, "role")?
        .parse::<Role>()
        .map_err(AppError::BadParams)
}

pub fn date_or_today(params: &Value) -> AppResult<NaiveDate> {
    match optional_str(params, "date") {
        Some(raw) => attendance::parse_date(&raw),
        None => Ok(attendance::today()),
    }
}

pub fn required_array<'a>(params: &'a Value, key: &str) -> AppResult<&'a Vec<Value>> {
    params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| AppError::bad_params(format!("missing {}", key)))
}
