//! Subcommand dispatch
//!
//! [`Dispatcher`] maps one parsed subcommand to one invocation (or ordered
//! sequence) of the executor and produces the process exit code. Each run of
//! the program services exactly one subcommand and exits; there are no state
//! transitions.
//!
//! The only concurrency introduced here is the detached readiness-poller
//! task, spawned for `run start --with-webui --open` and for
//! `open-webui --with-webui` before the blocking foreground start command.
//! The task is never joined: if the foreground command returns and the
//! process exits while the poll is still pending, the browser silently does
//! not open. That race is accepted behavior.
//!
//! The locally-installed-model list is discovered at most once per process
//! (it shells out to the engine) and memoized in a write-once cell.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::cli::{Commands, RunToggle};
use crate::command::{CommandBuilder, CommandError, InvocationRequest, ListScope, ServiceTarget};
use crate::config::AistackConfig;
use crate::probe::EnvironmentFacts;
use crate::readiness::wait_until_ready;
use crate::runner::CommandExecutor;

/// User-facing dispatch failures. Probe and readiness failures never land
/// here; they degrade in place.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Rejected before any command was built.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Model name not in the allowed set; nothing was executed for it.
    #[error("unknown model '{model}' (installed: {installed})")]
    UnknownModel { model: String, installed: String },
}

/// Routes one subcommand to the executor.
pub struct Dispatcher<E: CommandExecutor + 'static> {
    config: AistackConfig,
    facts: EnvironmentFacts,
    builder: CommandBuilder,
    executor: Arc<E>,
    local_models: OnceCell<Vec<String>>,
}

impl<E: CommandExecutor + 'static> Dispatcher<E> {
    pub fn new(config: AistackConfig, facts: EnvironmentFacts, executor: Arc<E>) -> Self {
        let builder = CommandBuilder::new(&config, &facts);
        Self {
            config,
            facts,
            builder,
            executor,
            local_models: OnceCell::new(),
        }
    }

    /// Services one subcommand to completion and returns the exit code the
    /// program should report.
    pub async fn dispatch(&self, command: Commands) -> Result<i32, DispatchError> {
        match command {
            Commands::Version => self.handle_version(),
            Commands::Run { toggle } => match toggle {
                RunToggle::Start {
                    daemon,
                    with_webui,
                    open,
                } => self.handle_start(daemon, with_webui, open).await,
                RunToggle::Stop => Ok(self.run_foreground(&[self.builder.stop()]).await),
            },
            Commands::Update => Ok(self.run_foreground(&[self.builder.update()]).await),
            Commands::Pull(args) => self.handle_pull(&args.models).await,
            Commands::Rm(args) => self.handle_rm(&args.models).await,
            Commands::List { source } => {
                let request = self.builder.list(ListScope::from(source));
                Ok(self.run_foreground(&[request]).await)
            }
            Commands::OpenWebui { with_webui } => self.handle_open_webui(with_webui).await,
            Commands::Chat { model } => self.handle_chat(&model).await,
        }
    }

    fn handle_version(&self) -> Result<i32, DispatchError> {
        println!("{}-v{}{}", crate::NAME, crate::VERSION, self.facts.gpu_tag());
        Ok(0)
    }

    async fn handle_start(
        &self,
        daemon: bool,
        with_webui: bool,
        open: bool,
    ) -> Result<i32, DispatchError> {
        println!(
            "> gpu mode: {}",
            if self.facts.has_accelerator { "on" } else { "off" }
        );
        if !self.docker_is_running().await {
            warn!("docker compose does not answer; the start command will likely fail");
        }
        sleep(self.config.settle_pause).await;

        let target = if with_webui {
            ServiceTarget::Full
        } else {
            ServiceTarget::Engine
        };
        if with_webui && open {
            self.spawn_open_when_ready();
        }

        Ok(self.run_foreground(&[self.builder.start(daemon, target)]).await)
    }

    async fn handle_pull(&self, models: &[String]) -> Result<i32, DispatchError> {
        // Validate every name before anything runs.
        let requests = models
            .iter()
            .map(|m| self.builder.pull(m))
            .collect::<Result<Vec<_>, _>>()?;

        if !self.engine_is_running().await {
            warn!(
                service = %self.config.engine_service,
                "inference engine does not answer; pull will likely fail"
            );
        }

        Ok(self.run_foreground(&requests).await)
    }

    async fn handle_rm(&self, models: &[String]) -> Result<i32, DispatchError> {
        let requests = models
            .iter()
            .map(|m| self.builder.remove(m))
            .collect::<Result<Vec<_>, _>>()?;

        // When the installed list is discoverable, removals are restricted
        // to it; with nothing discovered the name passes through to the
        // engine untouched.
        let installed = self.local_models().await;
        if !installed.is_empty() {
            for model in models {
                if !installed.contains(model) {
                    return Err(DispatchError::UnknownModel {
                        model: model.clone(),
                        installed: installed.join(", "),
                    });
                }
            }
        }

        Ok(self.run_foreground(&requests).await)
    }

    async fn handle_open_webui(&self, with_webui: bool) -> Result<i32, DispatchError> {
        if with_webui {
            self.spawn_open_when_ready();
            Ok(self
                .run_foreground(&[self.builder.start(false, ServiceTarget::Ui)])
                .await)
        } else {
            // Against an already-running instance the poll is the action, so
            // it stays in the foreground and its failure is the exit status.
            Ok(self.poll_and_open().await)
        }
    }

    async fn handle_chat(&self, model: &str) -> Result<i32, DispatchError> {
        let request = self.builder.chat(model)?;

        let installed = self.local_models().await;
        let known = self.config.model_catalog.iter().any(|m| m == model)
            || installed.iter().any(|m| m == model);
        if !known {
            return Err(DispatchError::UnknownModel {
                model: model.to_string(),
                installed: installed.join(", "),
            });
        }

        println!("> set model: {}{}", model, self.facts.gpu_tag());
        if !self.engine_is_running().await {
            warn!(
                service = %self.config.engine_service,
                "inference engine does not answer; chat will likely fail"
            );
        }
        sleep(self.config.settle_pause).await;

        Ok(self.run_foreground(&[request]).await)
    }

    /// Runs requests with inherited streams and maps the result to an exit
    /// code (interrupt counts as clean).
    async fn run_foreground(&self, requests: &[InvocationRequest]) -> i32 {
        self.executor
            .execute(requests, false)
            .await
            .program_exit_code()
    }

    /// Locally installed models, discovered once per process by running the
    /// listing command captured and parsing its output.
    pub async fn local_models(&self) -> &[String] {
        self.local_models
            .get_or_init(|| async {
                let request = self.builder.list(ListScope::Local);
                let result = self.executor.execute(&[request], true).await;
                let models = parse_model_list(result.stdout.as_deref().unwrap_or(""));
                debug!(count = models.len(), "discovered locally installed models");
                models
            })
            .await
    }

    /// The engine container answers `ollama --version` with output.
    async fn engine_is_running(&self) -> bool {
        let result = self
            .executor
            .execute(&[self.builder.engine_version()], true)
            .await;
        result
            .stdout
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false)
    }

    /// Both `docker --version` and `docker compose version` answer.
    async fn docker_is_running(&self) -> bool {
        for request in [
            InvocationRequest::new("docker", ["--version"]),
            InvocationRequest::new("docker", ["compose", "version"]),
        ] {
            let result = self.executor.execute(&[request], true).await;
            let answered = result
                .stdout
                .as_deref()
                .map(|s| !s.trim().is_empty())
                .unwrap_or(false);
            if !answered {
                return false;
            }
        }
        true
    }

    /// Foreground poll-then-open; exit code 1 when the budget is exhausted.
    async fn poll_and_open(&self) -> i32 {
        if wait_until_ready(
            &self.config.webui_url,
            self.config.poll_attempts,
            self.config.poll_interval,
        )
        .await
        {
            self.run_foreground(&[self.builder.open_browser()]).await
        } else {
            eprintln!(
                "the limit of {} attempts has been exceeded, probably the {} server is not running",
                self.config.poll_attempts, self.config.ui_service
            );
            1
        }
    }

    /// Detached poll-then-open. Fire-and-forget by design: the handle is
    /// dropped, the program may exit before the poll finishes, and in that
    /// case the browser does not open.
    fn spawn_open_when_ready(&self) {
        let url = self.config.webui_url.clone();
        let attempts = self.config.poll_attempts;
        let interval = self.config.poll_interval;
        let ui_service = self.config.ui_service.clone();
        let open = self.builder.open_browser();
        let executor = Arc::clone(&self.executor);

        tokio::spawn(async move {
            if wait_until_ready(&url, attempts, interval).await {
                executor.execute(&[open], false).await;
            } else {
                eprintln!(
                    "the limit of {attempts} attempts has been exceeded, \
                     probably the {ui_service} server is not running"
                );
            }
        });
    }
}

/// Parses the engine's tabular listing output: one header line, then one
/// model identifier in the first column of each row.
fn parse_model_list(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(|m| m.to_string())
        .collect()
}
