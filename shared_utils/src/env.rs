use std::path::PathBuf;

use thiserror::Error;

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable required by the application is not set.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// An environment variable is set but holds an empty value.
    #[error("Environment variable {0} is empty")]
    EmptyEnvVar(String),
}

/// Reads an environment variable, returning a structured error if it's missing.
///
/// This is a thin wrapper around `std::env::var` that provides a more
/// ergonomic and specific error type for missing variables.
///
/// # Arguments
/// * `name` - The name of the environment variable to read.
pub fn get_env_var(name: &str) -> Result<String, ConfigError> {
    let value = std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyEnvVar(name.to_string()));
    }
    Ok(value)
}

/// Reads an environment variable holding a filesystem path.
pub fn get_env_path(name: &str) -> Result<PathBuf, ConfigError> {
    get_env_var(name).map(|v| PathBuf::from(v.trim()))
}

/// Best-effort host name of the current machine.
///
/// Checks `HOSTNAME` first, then `/proc/sys/kernel/hostname`. That file only
/// exists on Linux, so elsewhere the host is `None` unless `HOSTNAME` is set.
pub fn current_host() -> Option<String> {
    if let Ok(host) = get_env_var("HOSTNAME") {
        return Some(host.trim().to_string());
    }
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Best-effort login name of the current user.
pub fn current_user() -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|name| get_env_var(name).ok())
        .map(|s| s.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_is_reported_by_name() {
        let err = get_env_var("WEAVE_SHARED_UTILS_SURELY_UNSET").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref n) if n == "WEAVE_SHARED_UTILS_SURELY_UNSET"));
        assert!(err.to_string().contains("WEAVE_SHARED_UTILS_SURELY_UNSET"));
    }

    #[test]
    fn path_variable_reads_through() {
        // PATH is set in every test environment we run under.
        let p = get_env_path("PATH").unwrap();
        assert!(!p.as_os_str().is_empty());
    }
}
