use async_trait::async_trait;
use clap::{Args, Subcommand};
use tracing::info;

use super::{GlobalArgs, RunCommand};
use crate::config::config_file_path;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Writes the given --namespace, --backend and --base-dir as defaults
    Init(InitConfigCommand),
    /// Prints the configuration this invocation would use
    Show(ShowConfigCommand),
}

#[async_trait]
impl RunCommand for ConfigCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        match self {
            ConfigCommand::Init(cmd) => cmd.run(args).await,
            ConfigCommand::Show(cmd) => cmd.run(args).await,
        }
    }
}

#[derive(Args, Debug)]
pub struct InitConfigCommand {}

#[async_trait]
impl RunCommand for InitConfigCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let config = args.effective_config()?;
        if let Some(namespace) = &config.namespace {
            localstore_storage::validate_namespace(namespace)?;
        }
        let path = config.save(args.config.clone())?;
        info!(path = %path.display(), "wrote config file");
        println!("{}", path.display());
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ShowConfigCommand {}

#[async_trait]
impl RunCommand for ShowConfigCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let config = args.effective_config()?;
        println!("# {}", config_file_path(args.config.clone())?.display());
        print!("{}", toml::to_string(&config)?);
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct PathCommand {}

#[async_trait]
impl RunCommand for PathCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let options = args.effective_config()?.storage_options()?;
        let root = tokio::task::spawn_blocking(move || options.resolve_root()).await??;
        println!("{}", root.path().display());
        Ok(())
    }
}
