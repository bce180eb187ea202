use clap::{Parser, Subcommand, ValueEnum};

use crate::command::ListScope;

/// CLI front end for a containerized local AI-model serving stack
#[derive(Parser, Debug)]
#[command(
    name = "aistack",
    about = "Launch and manage a containerized local AI-model serving stack (ollama + open-webui)",
    version,
    author,
    long_about = "aistack drives a docker compose stack running the ollama inference engine and \
                  the open-webui chat interface. It picks the CPU or GPU compose profile from \
                  the detected hardware and forwards start/stop, model management, and chat \
                  actions to the stack."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Increase verbosity")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Show the aistack version")]
    Version,

    #[command(about = "Start/stop the serving stack")]
    Run {
        #[command(subcommand)]
        toggle: RunToggle,
    },

    #[command(
        alias = "upgrade",
        about = "Pull newer container images for all services"
    )]
    Update,

    #[command(
        about = "Pull one or more models (ollama running is required)",
        long_about = "Pulls models into the inference engine.\n\n\
                      Known models include 'gemma3:1b', 'llama3.2:3b', 'qwen2.5:7b', \
                      'qwen2.5-coder:3b-base'; any name:tag the engine accepts works."
    )]
    Pull(ModelsArgs),

    #[command(about = "Remove one or more installed models (ollama running is required)")]
    Rm(ModelsArgs),

    #[command(about = "List models (ollama running is required)")]
    List {
        #[arg(
            value_enum,
            value_name = "SOURCE",
            default_value = "local",
            help = "Source of models to list"
        )]
        source: ListScopeArg,
    },

    #[command(name = "open-webui", about = "Open the web UI in the browser")]
    OpenWebui {
        #[arg(long, help = "Start the web UI service instead of expecting one running")]
        with_webui: bool,
    },

    #[command(about = "Interactive chat with a model (ollama running is required)")]
    Chat {
        #[arg(value_name = "MODEL_NAME", help = "Model to chat with (name:tag)")]
        model: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunToggle {
    #[command(about = "Start the inference engine")]
    Start {
        #[arg(short = 'd', long, help = "Run the server in daemon mode")]
        daemon: bool,

        #[arg(long, help = "Also start the open-webui gui server")]
        with_webui: bool,

        #[arg(
            short = 'o',
            long,
            requires = "with_webui",
            help = "Open the web UI in the browser once it is ready (requires --with-webui)"
        )]
        open: bool,
    },

    #[command(about = "Stop the stack")]
    Stop,
}

#[derive(Parser, Debug, Clone)]
pub struct ModelsArgs {
    #[arg(
        value_name = "MODEL_NAME",
        required = true,
        num_args = 1..,
        help = "Model name with tag (ex.: 'qwen2.5:3b')"
    )]
    pub models: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScopeArg {
    Local,
    Remote,
}

impl From<ListScopeArg> for ListScope {
    fn from(arg: ListScopeArg) -> Self {
        match arg {
            ListScopeArg::Local => ListScope::Local,
            ListScopeArg::Remote => ListScope::Remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        // Verify that CLI structure is valid
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_run_start_defaults() {
        let args = CliArgs::parse_from(["aistack", "run", "start"]);
        match args.command {
            Commands::Run {
                toggle: RunToggle::Start {
                    daemon,
                    with_webui,
                    open,
                },
            } => {
                assert!(!daemon);
                assert!(!with_webui);
                assert!(!open);
            }
            _ => panic!("Expected run start"),
        }
    }

    #[test]
    fn test_run_start_all_flags() {
        let args = CliArgs::parse_from(["aistack", "run", "start", "-d", "--with-webui", "--open"]);
        match args.command {
            Commands::Run {
                toggle: RunToggle::Start {
                    daemon,
                    with_webui,
                    open,
                },
            } => {
                assert!(daemon);
                assert!(with_webui);
                assert!(open);
            }
            _ => panic!("Expected run start"),
        }
    }

    #[test]
    fn test_open_requires_with_webui() {
        let result = CliArgs::try_parse_from(["aistack", "run", "start", "--open"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_run_stop() {
        let args = CliArgs::parse_from(["aistack", "run", "stop"]);
        assert!(matches!(
            args.command,
            Commands::Run {
                toggle: RunToggle::Stop
            }
        ));
    }

    #[test]
    fn test_upgrade_alias() {
        let args = CliArgs::parse_from(["aistack", "upgrade"]);
        assert!(matches!(args.command, Commands::Update));
    }

    #[test]
    fn test_pull_requires_a_model() {
        assert!(CliArgs::try_parse_from(["aistack", "pull"]).is_err());
    }

    #[test]
    fn test_pull_multiple_models_in_order() {
        let args = CliArgs::parse_from(["aistack", "pull", "gemma3:1b", "qwen2.5:3b"]);
        match args.command {
            Commands::Pull(models) => {
                assert_eq!(models.models, vec!["gemma3:1b", "qwen2.5:3b"]);
            }
            _ => panic!("Expected pull"),
        }
    }

    #[test]
    fn test_list_defaults_to_local() {
        let args = CliArgs::parse_from(["aistack", "list"]);
        match args.command {
            Commands::List { source } => assert_eq!(source, ListScopeArg::Local),
            _ => panic!("Expected list"),
        }
    }

    #[test]
    fn test_list_remote() {
        let args = CliArgs::parse_from(["aistack", "list", "remote"]);
        match args.command {
            Commands::List { source } => assert_eq!(source, ListScopeArg::Remote),
            _ => panic!("Expected list"),
        }
    }

    #[test]
    fn test_open_webui_flag() {
        let args = CliArgs::parse_from(["aistack", "open-webui", "--with-webui"]);
        match args.command {
            Commands::OpenWebui { with_webui } => assert!(with_webui),
            _ => panic!("Expected open-webui"),
        }
    }

    #[test]
    fn test_chat_takes_one_model() {
        let args = CliArgs::parse_from(["aistack", "chat", "llama3.2:3b"]);
        match args.command {
            Commands::Chat { model } => assert_eq!(model, "llama3.2:3b"),
            _ => panic!("Expected chat"),
        }
        assert!(CliArgs::try_parse_from(["aistack", "chat"]).is_err());
        assert!(CliArgs::try_parse_from(["aistack", "chat", "a", "b"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["aistack", "-v", "version"]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["aistack", "-q", "version"]);
        assert!(args.quiet);

        let args = CliArgs::parse_from(["aistack", "--log-level", "debug", "version"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_list_scope_conversion() {
        assert_eq!(ListScope::from(ListScopeArg::Local), ListScope::Local);
        assert_eq!(ListScope::from(ListScopeArg::Remote), ListScope::Remote);
    }
}
