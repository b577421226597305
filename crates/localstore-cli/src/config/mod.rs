use std::path::PathBuf;

use config::{Config, File, FileFormat};
use localstore_config_path::application_dir;
use localstore_storage::{BackendKind, StorageOptions};
use serde::{Deserialize, Serialize};

const CONFIG_FILE_NAME: &str = "cli_config.toml";

/// Defaults read from `cli_config.toml`. Command-line flags and environment
/// variables take precedence over every field.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
}

/// Values given on the command line (or through their environment variables).
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub namespace: Option<String>,
    pub backend: Option<String>,
    pub base_dir: Option<PathBuf>,
}

impl CliConfig {
    pub fn load(config_path: Option<PathBuf>) -> anyhow::Result<CliConfig> {
        let config_file_path = config_file_path(config_path)?;

        let config = Config::builder()
            .add_source(File::from(config_file_path).format(FileFormat::Toml).required(false))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn save(&self, config_path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
        let config_file_path = config_file_path(config_path)?;
        if let Some(parent) = config_file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_file_path, toml::to_string(self)?)?;
        Ok(config_file_path)
    }

    /// Layers `overrides` on top of the file values.
    pub fn merge(self, overrides: Overrides) -> CliConfig {
        CliConfig {
            namespace: overrides.namespace.or(self.namespace),
            backend: overrides.backend.or(self.backend),
            base_dir: overrides.base_dir.or(self.base_dir),
        }
    }

    pub fn storage_options(&self) -> anyhow::Result<StorageOptions> {
        let namespace = self.namespace.clone().ok_or_else(|| {
            anyhow::anyhow!(
                "No namespace given. Pass --namespace, set LOCALSTORE_NAMESPACE or add it to the config file"
            )
        })?;
        let backend = self.backend.as_deref().map(BackendKind::from_selector).unwrap_or_default();

        Ok(StorageOptions::builder()
            .namespace(namespace)
            .backend(backend)
            .maybe_base_dir(self.base_dir.clone())
            .build())
    }
}

pub fn config_file_path(config_path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(path_override) = config_path {
        return Ok(path_override);
    }
    let app_dir = application_dir().ok_or_else(|| anyhow::anyhow!("Failed to get user config directory"))?;
    Ok(app_dir.join(CONFIG_FILE_NAME))
}
