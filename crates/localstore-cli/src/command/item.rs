use std::collections::BTreeMap;
use std::io::{stdout, Write};

use async_trait::async_trait;
use clap::Args;
use localstore_storage::{AsyncLocalStorage, AsyncStorage, Entries};
use thiserror::Error;
use tracing::info;

use super::{GlobalArgs, RunCommand};

/// Returned by `get` for an absent key so the process exits non-zero without a message.
#[derive(Error, Debug)]
#[error("key `{0}` not found")]
pub struct KeyNotFound(pub String);

async fn open_storage(args: &GlobalArgs) -> anyhow::Result<AsyncLocalStorage> {
    let options = args.effective_config()?.storage_options()?;
    Ok(AsyncLocalStorage::open(options).await?)
}

fn print_entries(entries: Entries) -> anyhow::Result<()> {
    let sorted: BTreeMap<_, _> = entries.into_iter().collect();
    let mut out = stdout().lock();
    serde_json::to_writer_pretty(&mut out, &sorted)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Args, Debug)]
pub struct GetCommand {
    pub key: String,
}

#[async_trait]
impl RunCommand for GetCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let storage = open_storage(args).await?;
        match storage.get_item(&self.key).await? {
            Some(value) => {
                println!("{value}");
                Ok(())
            }
            None => Err(KeyNotFound(self.key.clone()).into()),
        }
    }
}

#[derive(Args, Debug)]
pub struct SetCommand {
    pub key: String,
    pub value: String,
}

#[async_trait]
impl RunCommand for SetCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let storage = open_storage(args).await?;
        storage.set_item(&self.key, &self.value).await?;
        info!(key = %self.key, "stored item");
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct RemoveCommand {
    pub key: String,
}

#[async_trait]
impl RunCommand for RemoveCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let storage = open_storage(args).await?;
        storage.remove_item(&self.key).await?;
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ListCommand {}

#[async_trait]
impl RunCommand for ListCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let storage = open_storage(args).await?;
        print_entries(storage.get_all().await?)
    }
}

#[derive(Args, Debug)]
pub struct GetManyCommand {
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[async_trait]
impl RunCommand for GetManyCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let storage = open_storage(args).await?;
        print_entries(storage.get_many(&self.keys).await?)
    }
}

#[derive(Args, Debug)]
pub struct RemoveAllCommand {}

#[async_trait]
impl RunCommand for RemoveAllCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let storage = open_storage(args).await?;
        storage.remove_all().await?;
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct ClearCommand {}

#[async_trait]
impl RunCommand for ClearCommand {
    async fn run(&self, args: &GlobalArgs) -> anyhow::Result<()> {
        let storage = open_storage(args).await?;
        storage.clear().await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::KeyNotFound;
    use crate::command::Cli;

    fn cli(base: &tempfile::TempDir, rest: &[&str]) -> Cli {
        let config = base.path().join("cli_config.toml");
        let mut argv = vec![
            "localstore",
            "--namespace",
            "test.cli",
            "--base-dir",
            base.path().to_str().expect("temp path should be utf-8"),
            "--config",
            config.to_str().expect("temp path should be utf-8"),
        ];
        argv.extend_from_slice(rest);
        Cli::try_parse_from(argv).expect("parsing should be successful")
    }

    #[tokio::test]
    async fn set_then_get_should_succeed_for_every_backend() {
        for backend in ["text", "sqlite", "json"] {
            let base = tempfile::tempdir().expect("creating temp dir should be successful");

            cli(&base, &["-b", backend, "set", "greeting", "hello"]).run().await.expect("set should be successful");
            cli(&base, &["-b", backend, "get", "greeting"]).run().await.expect("get should be successful");
        }
    }

    #[tokio::test]
    async fn get_of_absent_key_should_fail_with_key_not_found() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");

        let error = cli(&base, &["get", "missing"]).run().await.expect_err("get of absent key should fail");

        assert!(error.is::<KeyNotFound>());
    }

    #[tokio::test]
    async fn remove_and_clear_should_succeed_on_empty_storage() {
        let base = tempfile::tempdir().expect("creating temp dir should be successful");

        cli(&base, &["remove", "missing"]).run().await.expect("remove should be successful");
        cli(&base, &["remove-all"]).run().await.expect("remove-all should be successful");
        cli(&base, &["clear"]).run().await.expect("clear should be successful");
        cli(&base, &["list"]).run().await.expect("list should be successful");
    }
}
