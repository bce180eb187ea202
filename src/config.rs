//! Configuration management for aistack
//!
//! All settings are assembled once at process start from constants with
//! environment-variable overrides, into an immutable [`AistackConfig`] that
//! is passed by reference into the prober, builder, and dispatcher. There is
//! no global mutable state and nothing is ever written to disk.
//!
//! # Environment Variables
//!
//! - `AISTACK_ROOT`: directory holding the compose files - default: the
//!   directory of the executable, falling back to the current directory
//! - `AISTACK_WEBUI_URL`: web UI base URL - default: "http://localhost:8080"
//! - `AISTACK_POLL_ATTEMPTS`: readiness poll retry budget - default: "10"
//! - `AISTACK_POLL_INTERVAL_SECS`: seconds between poll attempts - default: "2.5"
//! - `AISTACK_LOG_LEVEL`: logging level - default: "info" (see `src/main.rs`)

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::probe::EnvironmentFacts;

/// Name of the inference-engine compose service.
pub const ENGINE_SERVICE: &str = "ollama";

/// Name of the web-UI compose service.
pub const UI_SERVICE: &str = "open-webui";

const COMPOSE_FILE_CPU: &str = "docker-compose.cpu.yaml";
const COMPOSE_FILE_GPU: &str = "docker-compose.gpu.yaml";

const DEFAULT_WEBUI_URL: &str = "http://localhost:8080";
const DEFAULT_POLL_ATTEMPTS: u32 = 10;
const DEFAULT_POLL_INTERVAL_SECS: f64 = 2.5;

/// Models the stack knows how to serve; shown in help text and used as the
/// allowed set for `chat` alongside whatever is already installed.
pub const MODEL_CATALOG: &[&str] = &[
    "gemma3:1b",
    "gemma3:4b",
    "llama3.1:8b",
    "llama3.2:1b",
    "llama3.2:3b",
    "qwen2.5:1.5b",
    "qwen2.5:3b",
    "qwen2.5:7b",
    "qwen2.5-coder:1.5b-base",
    "qwen2.5-coder:3b-base",
];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration value
    #[error("failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    /// Configuration validation failed
    #[error("configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for aistack
///
/// Constructed once via [`AistackConfig::from_env`] and treated as read-only
/// afterwards.
#[derive(Debug, Clone)]
pub struct AistackConfig {
    /// Inference-engine compose service name
    pub engine_service: String,

    /// Web-UI compose service name
    pub ui_service: String,

    /// Compose profile file used when no accelerator is present
    pub compose_file_cpu: String,

    /// Compose profile file used when an accelerator is present
    pub compose_file_gpu: String,

    /// Base URL of the web UI, polled for readiness and opened in the browser
    pub webui_url: String,

    /// Readiness poll retry budget
    pub poll_attempts: u32,

    /// Pause between readiness poll attempts
    pub poll_interval: Duration,

    /// Settle pause before starting the stack or an interactive chat
    pub settle_pause: Duration,

    /// Working directory for every spawned command; the compose files live here
    pub app_root: PathBuf,

    /// Known model identifiers (`name:tag`)
    pub model_catalog: Vec<String>,
}

impl AistackConfig {
    /// Loads configuration from environment variables with defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let webui_url =
            env::var("AISTACK_WEBUI_URL").unwrap_or_else(|_| DEFAULT_WEBUI_URL.to_string());

        let poll_attempts = match env::var("AISTACK_POLL_ATTEMPTS") {
            Ok(v) => v.parse::<u32>().map_err(|e| ConfigError::ParseError {
                field: "AISTACK_POLL_ATTEMPTS".to_string(),
                error: e.to_string(),
            })?,
            Err(_) => DEFAULT_POLL_ATTEMPTS,
        };

        let poll_interval_secs = match env::var("AISTACK_POLL_INTERVAL_SECS") {
            Ok(v) => v.parse::<f64>().map_err(|e| ConfigError::ParseError {
                field: "AISTACK_POLL_INTERVAL_SECS".to_string(),
                error: e.to_string(),
            })?,
            Err(_) => DEFAULT_POLL_INTERVAL_SECS,
        };
        if !poll_interval_secs.is_finite() || poll_interval_secs < 0.0 {
            return Err(ConfigError::ParseError {
                field: "AISTACK_POLL_INTERVAL_SECS".to_string(),
                error: "must be a non-negative number of seconds".to_string(),
            });
        }

        let app_root = env::var("AISTACK_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_app_root());

        let config = Self {
            engine_service: ENGINE_SERVICE.to_string(),
            ui_service: UI_SERVICE.to_string(),
            compose_file_cpu: COMPOSE_FILE_CPU.to_string(),
            compose_file_gpu: COMPOSE_FILE_GPU.to_string(),
            webui_url,
            poll_attempts,
            poll_interval: Duration::from_secs_f64(poll_interval_secs),
            settle_pause: Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS),
            app_root,
            model_catalog: MODEL_CATALOG.iter().map(|m| m.to_string()).collect(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the assembled configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webui_url.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "web UI URL must not be empty".to_string(),
            ));
        }
        if !self.webui_url.starts_with("http://") && !self.webui_url.starts_with("https://") {
            return Err(ConfigError::ValidationFailed(format!(
                "web UI URL must be http(s), got '{}'",
                self.webui_url
            )));
        }
        if self.poll_attempts == 0 {
            return Err(ConfigError::ValidationFailed(
                "poll attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The compose profile file for this run, chosen once from the probed
    /// environment and used by every command built afterwards.
    pub fn compose_profile(&self, facts: &EnvironmentFacts) -> &str {
        if facts.has_accelerator {
            &self.compose_file_gpu
        } else {
            &self.compose_file_cpu
        }
    }

    /// Default model suggestion for this environment.
    pub fn default_model(&self, facts: &EnvironmentFacts) -> &str {
        if facts.has_accelerator {
            "qwen2.5:7b"
        } else {
            "qwen2.5:3b"
        }
    }
}

/// The compose files ship next to the binary; fall back to the current
/// directory when the executable path cannot be resolved.
fn default_app_root() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::HostOs;
    use serial_test::serial;

    fn cpu_facts() -> EnvironmentFacts {
        EnvironmentFacts {
            has_accelerator: false,
            host_os: HostOs::Posix,
            is_wsl: false,
        }
    }

    fn gpu_facts() -> EnvironmentFacts {
        EnvironmentFacts {
            has_accelerator: true,
            host_os: HostOs::Posix,
            is_wsl: false,
        }
    }

    fn clear_env() {
        env::remove_var("AISTACK_WEBUI_URL");
        env::remove_var("AISTACK_POLL_ATTEMPTS");
        env::remove_var("AISTACK_POLL_INTERVAL_SECS");
        env::remove_var("AISTACK_ROOT");
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = AistackConfig::from_env().unwrap();
        assert_eq!(config.webui_url, "http://localhost:8080");
        assert_eq!(config.poll_attempts, 10);
        assert_eq!(config.poll_interval, Duration::from_millis(2500));
        assert_eq!(config.engine_service, "ollama");
        assert_eq!(config.ui_service, "open-webui");
        assert_eq!(config.model_catalog.len(), 10);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("AISTACK_WEBUI_URL", "http://localhost:9999");
        env::set_var("AISTACK_POLL_ATTEMPTS", "3");
        env::set_var("AISTACK_POLL_INTERVAL_SECS", "0.5");
        env::set_var("AISTACK_ROOT", "/opt/aistack");

        let config = AistackConfig::from_env().unwrap();
        assert_eq!(config.webui_url, "http://localhost:9999");
        assert_eq!(config.poll_attempts, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.app_root, PathBuf::from("/opt/aistack"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_poll_attempts() {
        clear_env();
        env::set_var("AISTACK_POLL_ATTEMPTS", "lots");
        let err = AistackConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_validation_rejects_bad_url() {
        clear_env();
        env::set_var("AISTACK_WEBUI_URL", "localhost:8080");
        let err = AistackConfig::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationFailed(_)));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_profile_selection_is_exclusive() {
        clear_env();
        let config = AistackConfig::from_env().unwrap();
        assert_eq!(
            config.compose_profile(&cpu_facts()),
            "docker-compose.cpu.yaml"
        );
        assert_eq!(
            config.compose_profile(&gpu_facts()),
            "docker-compose.gpu.yaml"
        );
    }

    #[test]
    #[serial]
    fn test_default_model_tracks_accelerator() {
        clear_env();
        let config = AistackConfig::from_env().unwrap();
        assert_eq!(config.default_model(&cpu_facts()), "qwen2.5:3b");
        assert_eq!(config.default_model(&gpu_facts()), "qwen2.5:7b");
        assert!(config
            .model_catalog
            .contains(&config.default_model(&gpu_facts()).to_string()));
    }
}
