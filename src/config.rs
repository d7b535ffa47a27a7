use std::env;
use std::path::PathBuf;

pub const DEFAULT_BYPASS_CODE: &str = "aayush123";

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub log_json: bool,
    pub teacher_bypass: BypassPolicy,
}

/// Demo teacher login that skips the subject lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassPolicy {
    pub enabled: bool,
    pub code: String,
}

impl Default for BypassPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            code: DEFAULT_BYPASS_CODE.to_string(),
        }
    }
}

impl BypassPolicy {
    pub fn matches(&self, code: &str) -> bool {
        self.enabled && !self.code.is_empty() && code == self.code
    }
}

pub fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            workspace: env_string("CLASSKEEPER_WORKSPACE").map(PathBuf::from),
            log_json: env_bool("CLASSKEEPER_LOG_JSON", false),
            teacher_bypass: BypassPolicy {
                enabled: env_bool("CLASSKEEPER_TEACHER_BYPASS", true),
                code: env_string("CLASSKEEPER_TEACHER_BYPASS_CODE")
                    .unwrap_or_else(|| DEFAULT_BYPASS_CODE.to_string()),
            },
        }
    }
}
