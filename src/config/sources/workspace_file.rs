//! Workspace config file source: `draftsmith.toml` at the workspace root, then
//! an optional `draftsmith.<profile>.toml` overlay.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::{Path, PathBuf};

pub const WORKSPACE_FILE: &str = "draftsmith.toml";
/// Selects the overlay file. Unset or blank means no overlay.
pub const PROFILE_VAR: &str = "DRAFTSMITH_PROFILE";

/// Workspace files in the order they apply; missing files are left out.
pub fn workspace_files(workspace_root: &Path, profile: Option<&str>) -> Vec<PathBuf> {
    let overlay = profile
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| workspace_root.join(format!("draftsmith.{}.toml", p)));

    std::iter::once(workspace_root.join(WORKSPACE_FILE))
        .chain(overlay)
        .filter(|path| path.is_file())
        .collect()
}

pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let profile = std::env::var(PROFILE_VAR).ok();
    Ok(workspace_files(workspace_root, profile.as_deref())
        .into_iter()
        .fold(builder, |builder, path| {
            builder.add_source(File::from(path).format(FileFormat::Toml))
        }))
}
