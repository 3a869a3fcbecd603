//! Configuration loading
//!
//! Reads a JSON5 file, layers environment overrides on top and validates the
//! result. A missing file is not an error: defaults apply.

pub mod types;

pub use types::{
    ChatConfig, Config, LogFormat, LoggingConfig, ServerConfig, SessionConfig, DEFAULT_BIND,
};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "CLASSPOLL_CONFIG";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid environment override {var}={value}: {message}")]
    Env {
        var: &'static str,
        value: String,
        message: String,
    },

    #[error("Invalid configuration: {}", format_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

/// One problem found by [`validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dot-notation path of the offending key
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Resolve the config file path: explicit path, then `$CLASSPOLL_CONFIG`,
/// then the per-user config directory.
pub fn get_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("classpoll")
        .join("config.json5")
}

/// Load, override from the process environment, and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let path = get_config_path(explicit);
    let mut config = load_config_from(&path)?;
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate(&config).map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Parse the file at `path` without overrides or validation.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    json5::from_str(&raw).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply `PORT`, `CLASSPOLL_BIND`, `CLASSPOLL_LOG_LEVEL` and
/// `CLASSPOLL_LOG_FORMAT` as looked up through `lookup`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("PORT") {
        config.server.port = value.trim().parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            message: "expected a port number".to_string(),
            value,
        })?;
    }
    if let Some(value) = lookup("CLASSPOLL_BIND") {
        config.server.bind = value.trim().to_string();
    }
    if let Some(value) = lookup("CLASSPOLL_LOG_LEVEL") {
        config.logging.level = value.trim().to_string();
    }
    if let Some(value) = lookup("CLASSPOLL_LOG_FORMAT") {
        config.logging.format = value.parse().map_err(|message| ConfigError::Env {
            var: "CLASSPOLL_LOG_FORMAT",
            value: value.clone(),
            message,
        })?;
    }
    Ok(())
}

/// Check cross-field constraints, reporting every issue found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let mut check = |ok: bool, path: &str, message: &str| {
        if !ok {
            issues.push(ValidationIssue {
                path: path.to_string(),
                message: message.to_string(),
            });
        }
    };

    check(!config.server.bind.trim().is_empty(), "server.bind", "must not be empty");
    check(config.server.queue_size > 0, "server.queueSize", "must be at least 1");
    check(config.polls.max_options >= 2, "polls.maxOptions", "must be at least 2");
    check(
        config.polls.max_time_limit_secs > 0,
        "polls.maxTimeLimitSecs",
        "must be at least 1",
    );
    check(
        (1..=config.polls.max_time_limit_secs).contains(&config.polls.default_time_limit_secs),
        "polls.defaultTimeLimitSecs",
        "must be between 1 and polls.maxTimeLimitSecs",
    );
    check(
        config.chat.max_message_length > 0,
        "chat.maxMessageLength",
        "must be at least 1",
    );
    check(
        config.session.max_name_length > 0,
        "session.maxNameLength",
        "must be at least 1",
    );
    check(
        tracing_subscriber::EnvFilter::try_new(&config.logging.level).is_ok(),
        "logging.level",
        "is not a valid log filter",
    );

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}
