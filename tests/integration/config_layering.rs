//! Configuration layering: defaults, workspace files and environment.

use draftsmith::config::{ConfigLoader, ProviderType};
use draftsmith::store::StorageBackend;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that touch process environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

struct EnvGuard {
    names: Vec<&'static str>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        for (name, value) in vars {
            std::env::set_var(name, value);
        }
        Self {
            names: vars.iter().map(|(name, _)| *name).collect(),
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for name in &self.names {
            std::env::remove_var(name);
        }
    }
}

fn loader(workspace: &TempDir) -> ConfigLoader {
    ConfigLoader::for_workspace(workspace.path()).with_global_path(None)
}

fn write_workspace_file(workspace: &TempDir, name: &str, content: &str) {
    std::fs::write(workspace.path().join(name), content).unwrap();
}

#[test]
fn defaults_apply_without_any_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();

    let config = loader(&workspace).with_environment(false).build().unwrap();

    assert_eq!(config.provider.provider_type, ProviderType::Gemini);
    assert_eq!(config.storage.backend, StorageBackend::Sled);
    assert_eq!(config.client.max_concurrent, 4);
    assert_eq!(config.workspace_root.as_deref(), Some(workspace.path()));
    assert!(config.validate().is_ok());
}

#[test]
fn profile_file_overrides_base_file() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();
    write_workspace_file(
        &workspace,
        "draftsmith.toml",
        "[client]\nmax_concurrent = 2\nmin_interval_ms = 900\n\n[convergence]\ntarget_words = 5000\n",
    );
    write_workspace_file(&workspace, "draftsmith.staging.toml", "[client]\nmax_concurrent = 6\n");
    let _env = EnvGuard::set(&[("DRAFTSMITH_PROFILE", "staging")]);

    let config = loader(&workspace).build().unwrap();

    assert_eq!(config.client.max_concurrent, 6);
    assert_eq!(config.client.min_interval_ms, 900);
    assert_eq!(config.convergence.target_words, 5_000);
}

#[test]
fn environment_variables_win_over_files() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();
    write_workspace_file(
        &workspace,
        "draftsmith.toml",
        "[provider]\nprovider_type = \"gemini\"\n\n[client]\nmax_retries = 1\n",
    );
    let _env = EnvGuard::set(&[
        ("DRAFTSMITH_PROVIDER__PROVIDER_TYPE", "openai"),
        ("DRAFTSMITH_CLIENT__MAX_RETRIES", "7"),
        ("DRAFTSMITH_PIPELINE__BANNED_TITLE_TERMS", "apa,guide*"),
    ]);

    let config = loader(&workspace).build().unwrap();

    assert_eq!(config.provider.provider_type, ProviderType::OpenAI);
    assert_eq!(config.provider.resolved_model(), "gpt-4o-mini");
    assert_eq!(config.client.max_retries, 7);
    assert_eq!(config.pipeline.banned_title_terms, vec!["apa", "guide*"]);
}

#[test]
fn invalid_values_are_reported_together() {
    let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let workspace = TempDir::new().unwrap();
    write_workspace_file(
        &workspace,
        "draftsmith.toml",
        "[client]\nmax_concurrent = 0\n\n[logging]\nformat = \"xml\"\n",
    );

    let config = loader(&workspace).with_environment(false).build().unwrap();
    let err = config.ensure_valid().unwrap_err().to_string();

    assert!(err.contains("Client: max_concurrent must be at least 1"));
    assert!(err.contains("Logging:"));
}
