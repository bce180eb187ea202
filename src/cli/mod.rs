pub mod commands;

pub use commands::{CliArgs, Commands, ListScopeArg, ModelsArgs, RunToggle};
