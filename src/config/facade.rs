//! Config loading facade: assembles the layered sources into a `DraftsmithConfig`.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::DraftsmithConfig;
use config::{ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader
///
/// Precedence, lowest to highest: defaults, global file, workspace
/// `draftsmith.toml`, workspace `draftsmith.{DRAFTSMITH_PROFILE}.toml`, environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    workspace_root: PathBuf,
    global_path: Option<PathBuf>,
    read_environment: bool,
}

impl ConfigLoader {
    pub fn for_workspace(workspace_root: &Path) -> Self {
        Self {
            workspace_root: workspace_root.to_path_buf(),
            global_path: global_file::global_config_path(),
            read_environment: true,
        }
    }

    /// Override (or disable, with `None`) the global config file.
    pub fn with_global_path(mut self, path: Option<PathBuf>) -> Self {
        self.global_path = path;
        self
    }

    pub fn with_environment(mut self, read_environment: bool) -> Self {
        self.read_environment = read_environment;
        self
    }

    /// Load configuration for a workspace with every source enabled.
    pub fn load(workspace_root: &Path) -> Result<DraftsmithConfig, ConfigError> {
        Self::for_workspace(workspace_root).build()
    }

    /// Load defaults, one explicit file and the environment.
    pub fn load_from_file(path: &Path) -> Result<DraftsmithConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        environment::add_to_builder(builder)
            .build()?
            .try_deserialize()
    }

    pub fn build(&self) -> Result<DraftsmithConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = global_file::add_to_builder(builder, self.global_path.as_deref())?;
        builder = workspace_file::add_to_builder(builder, &self.workspace_root)?;
        if self.read_environment {
            builder = environment::add_to_builder(builder);
        }

        let mut config: DraftsmithConfig = builder.build()?.try_deserialize()?;
        if config.workspace_root.is_none() {
            config.workspace_root = Some(self.workspace_root.clone());
        }
        debug!(
            workspace = %self.workspace_root.display(),
            provider = ?config.provider.provider_type,
            "Configuration loaded"
        );
        Ok(config)
    }
}
