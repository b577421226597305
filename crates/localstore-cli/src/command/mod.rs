use std::path::PathBuf;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};

use self::config::{ConfigCommand, PathCommand};
use self::item::{ClearCommand, GetCommand, GetManyCommand, ListCommand, RemoveAllCommand, RemoveCommand, SetCommand};

use crate::config::{CliConfig, Overrides};
use crate::logger::LoggerFormat;

pub mod config;
pub mod item;

#[async_trait]
pub trait RunCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()>;
}

#[derive(Parser, Debug)]
#[command(term_width = 0, version, about, name = "localstore")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Application namespace, e.g. `com.example.app`
    #[arg(short, long, global = true, env = "LOCALSTORE_NAMESPACE")]
    pub namespace: Option<String>,
    /// Storage backend: `text`, `sqlite` or `json`
    #[arg(short, long, global = true, env = "LOCALSTORE_BACKEND")]
    pub backend: Option<String>,
    /// Directory holding namespace directories
    #[arg(long, global = true, env = "LOCALSTORE_BASE_DIR", value_name = "DIR")]
    pub base_dir: Option<PathBuf>,
    /// Sets a custom config file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, value_enum, default_value_t = LoggerFormat::Pretty)]
    pub log_format: LoggerFormat,
}

impl GlobalArgs {
    fn overrides(&self) -> Overrides {
        Overrides { namespace: self.namespace.clone(), backend: self.backend.clone(), base_dir: self.base_dir.clone() }
    }

    /// The config file layered under this invocation's flags.
    pub fn effective_config(&self) -> anyhow::Result<CliConfig> {
        Ok(CliConfig::load(self.config.clone())?.merge(self.overrides()))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Prints the value stored under a key
    Get(GetCommand),
    /// Stores a value under a key
    Set(SetCommand),
    /// Removes a key
    Remove(RemoveCommand),
    /// Prints every entry as JSON
    List(ListCommand),
    /// Prints the requested entries that exist as JSON
    GetMany(GetManyCommand),
    /// Removes every entry
    RemoveAll(RemoveAllCommand),
    /// Resets the storage to its empty state
    Clear(ClearCommand),
    /// Prints the namespace's storage directory
    Path(PathCommand),
    #[clap(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    pub async fn run(&self) -> anyhow::Result<()> {
        let args = &self.global;
        match &self.command {
            Command::Get(cmd) => cmd.run(args).await,
            Command::Set(cmd) => cmd.run(args).await,
            Command::Remove(cmd) => cmd.run(args).await,
            Command::List(cmd) => cmd.run(args).await,
            Command::GetMany(cmd) => cmd.run(args).await,
            Command::RemoveAll(cmd) => cmd.run(args).await,
            Command::Clear(cmd) => cmd.run(args).await,
            Command::Path(cmd) => cmd.run(args).await,
            Command::Config(cmd) => cmd.run(args).await,
        }
    }
}
