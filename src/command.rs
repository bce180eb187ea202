//! Concrete command construction
//!
//! [`CommandBuilder`] maps the probed environment plus the static
//! configuration into fully-formed [`InvocationRequest`]s for every action
//! the CLI can take. All builder operations are pure; nothing here executes
//! a process.
//!
//! Commands are built as explicit program + argument vectors and executed
//! without a shell, so a model name can never smuggle shell syntax into the
//! invocation. The one exception is the browser opener, which by nature is a
//! platform shell one-liner; its URL is single-quoted.

use thiserror::Error;

use crate::config::AistackConfig;
use crate::probe::EnvironmentFacts;

/// Errors raised while building a command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Model identifier was empty; no command is built and nothing runs.
    #[error("model name must not be empty")]
    InvalidModel,
}

/// A fully-formed external command: program plus argument vector, ready to
/// hand to the process runner. Never re-parsed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub program: String,
    pub args: Vec<String>,
}

impl InvocationRequest {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Single-line rendering for logs and error messages.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for arg in &self.args {
            s.push(' ');
            s.push_str(arg);
        }
        s
    }
}

/// Which compose services a start command targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceTarget {
    /// Inference engine only
    Engine,
    /// Web UI only
    Ui,
    /// Every service in the profile
    Full,
}

/// Scope of a model listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope {
    Local,
    Remote,
}

/// Pure mapping from environment + configuration to concrete commands.
///
/// The compose profile is fixed at construction from the probed environment;
/// every command built by one instance references that same profile.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    profile: String,
    engine_service: String,
    ui_service: String,
    webui_url: String,
    windows_open: bool,
}

impl CommandBuilder {
    pub fn new(config: &AistackConfig, facts: &EnvironmentFacts) -> Self {
        Self {
            profile: config.compose_profile(facts).to_string(),
            engine_service: config.engine_service.clone(),
            ui_service: config.ui_service.clone(),
            webui_url: config.webui_url.clone(),
            windows_open: facts.windows_style_open(),
        }
    }

    /// The compose profile file this builder was fixed to.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    fn compose(&self, tail: &[&str]) -> InvocationRequest {
        let mut args = vec!["compose".to_string(), "-f".to_string(), self.profile.clone()];
        args.extend(tail.iter().map(|s| s.to_string()));
        InvocationRequest {
            program: "docker".to_string(),
            args,
        }
    }

    /// `docker compose exec <engine> ollama <tail...>`
    fn exec_engine(&self, tail: &[&str]) -> InvocationRequest {
        let mut head = vec!["exec", self.engine_service.as_str(), "ollama"];
        head.extend_from_slice(tail);
        self.compose(&head)
    }

    /// Start command: `up`, optionally detached, targeting the engine, the
    /// web UI, or the full service set.
    pub fn start(&self, daemon: bool, target: ServiceTarget) -> InvocationRequest {
        let mut tail = vec!["up"];
        if daemon {
            tail.push("-d");
        }
        match target {
            ServiceTarget::Engine => tail.push(self.engine_service.as_str()),
            ServiceTarget::Ui => tail.push(self.ui_service.as_str()),
            ServiceTarget::Full => {}
        }
        self.compose(&tail)
    }

    pub fn stop(&self) -> InvocationRequest {
        self.compose(&["stop"])
    }

    /// Pulls fresher container images for all services.
    pub fn update(&self) -> InvocationRequest {
        self.compose(&["pull"])
    }

    pub fn pull(&self, model: &str) -> Result<InvocationRequest, CommandError> {
        self.model_command("pull", model)
    }

    pub fn remove(&self, model: &str) -> Result<InvocationRequest, CommandError> {
        self.model_command("rm", model)
    }

    /// Interactive chat session with the given model.
    pub fn chat(&self, model: &str) -> Result<InvocationRequest, CommandError> {
        self.model_command("run", model)
    }

    fn model_command(&self, verb: &str, model: &str) -> Result<InvocationRequest, CommandError> {
        if model.trim().is_empty() {
            return Err(CommandError::InvalidModel);
        }
        Ok(self.exec_engine(&[verb, model]))
    }

    pub fn list(&self, scope: ListScope) -> InvocationRequest {
        match scope {
            ListScope::Local => self.exec_engine(&["list"]),
            ListScope::Remote => self.exec_engine(&["list", "all", "models"]),
        }
    }

    /// `ollama --version`, captured by the dispatcher to tell whether the
    /// engine container is up.
    pub fn engine_version(&self) -> InvocationRequest {
        self.compose(&["exec", self.engine_service.as_str(), "ollama", "--version"])
    }

    /// Platform shell one-liner opening the web UI in the default browser.
    /// On Windows and under WSL this goes through `powershell.exe`; anywhere
    /// else through `sh`/`xdg-open`. The URL is shell-quoted.
    pub fn open_browser(&self) -> InvocationRequest {
        let url = shell_quote(&self.webui_url);
        if self.windows_open {
            InvocationRequest::new("powershell.exe", ["-c".to_string(), format!("start {url}")])
        } else {
            InvocationRequest::new("sh", ["-c".to_string(), format!("xdg-open {url}")])
        }
    }
}

/// Single-quotes a string for POSIX and PowerShell shells, escaping embedded
/// single quotes.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
