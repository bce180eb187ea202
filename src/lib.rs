//! aistack - CLI front end for a containerized local AI-model serving stack
//!
//! This library drives a `docker compose` stack running the ollama inference
//! engine and the open-webui chat interface. It probes the host once at
//! startup, derives the matching orchestration commands, and executes them
//! as child processes.
//!
//! # Core Concepts
//!
//! - **Environment Facts**: GPU availability and host OS family, probed once
//!   per invocation and immutable afterwards
//! - **Orchestration profile**: the CPU-only or GPU compose file, selected
//!   exactly once per run from the probed environment
//! - **Concrete Command**: a fully-formed program + argument vector, built
//!   pure and executed without a shell
//! - **Readiness poll**: bounded-retry check of the web UI's local HTTP
//!   endpoint before the browser is opened
//!
//! # Example Usage
//!
//! ```ignore
//! use aistack::{AistackConfig, Dispatcher, EnvironmentFacts, ProcessRunner};
//! use aistack::cli::Commands;
//! use std::sync::Arc;
//!
//! async fn start_stack() -> i32 {
//!     let config = AistackConfig::from_env().expect("config");
//!     let facts = EnvironmentFacts::detect();
//!     let runner = Arc::new(ProcessRunner::new(config.app_root.clone()));
//!     let dispatcher = Dispatcher::new(config, facts, runner);
//!
//!     match dispatcher.dispatch(Commands::Version).await {
//!         Ok(code) => code,
//!         Err(e) => {
//!             eprintln!("{e}");
//!             2
//!         }
//!     }
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`probe`]: environment probing (GPU, OS family, WSL)
//! - [`command`]: pure construction of concrete commands
//! - [`runner`]: child-process execution with best-effort sequencing
//! - [`readiness`]: bounded-retry HTTP readiness polling
//! - [`dispatch`]: mapping of subcommands onto the runner and poller

// Public modules
pub mod cli;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod probe;
pub mod readiness;
pub mod runner;

// Re-export key types for convenient access
pub use command::{CommandBuilder, CommandError, InvocationRequest, ListScope, ServiceTarget};
pub use config::{AistackConfig, ConfigError};
pub use dispatch::{DispatchError, Dispatcher};
pub use probe::{EnvironmentFacts, HostOs};
pub use readiness::wait_until_ready;
pub use runner::{CommandExecutor, InvocationResult, ProcessRunner};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
