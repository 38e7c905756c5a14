//! Context supplier: reusable instruction text prepended to provider prompts.
//!
//! Context is read from directories of `.txt`/`.md` files and cached for a
//! bounded time. Loading never fails; unreadable directories or files are
//! logged and skipped.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Source of context blocks for generation calls.
pub trait ContextSupplier: Send + Sync {
    fn load_context(&self) -> Vec<String>;
}

/// Context loader settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub enabled: bool,
    /// Directories to read, relative paths resolve against the workspace root
    pub directories: Vec<PathBuf>,
    pub extensions: Vec<String>,
    /// Per-file character cap; `None` reads files whole
    pub max_file_chars: Option<usize>,
    pub cache_ttl_secs: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directories: vec![PathBuf::from("docs/rules"), PathBuf::from("docs/prompts")],
            extensions: vec!["txt".to_string(), "md".to_string()],
            max_file_chars: Some(8_000),
            cache_ttl_secs: 60,
        }
    }
}

/// Fixed context, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    blocks: Vec<String>,
}

impl StaticContext {
    pub fn new(blocks: Vec<String>) -> Self {
        Self { blocks }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl ContextSupplier for StaticContext {
    fn load_context(&self) -> Vec<String> {
        self.blocks.clone()
    }
}

struct CachedContext {
    blocks: Vec<String>,
    loaded_at: Instant,
}

/// Reads context files from disk with a TTL cache.
pub struct PromptContextLoader {
    directories: Vec<PathBuf>,
    extensions: Vec<String>,
    max_file_chars: Option<usize>,
    ttl: Duration,
    cache: Mutex<Option<CachedContext>>,
}

impl PromptContextLoader {
    pub fn new(workspace_root: &Path, config: &ContextConfig) -> Self {
        let directories = config
            .directories
            .iter()
            .map(|dir| {
                if dir.is_absolute() {
                    dir.clone()
                } else {
                    workspace_root.join(dir)
                }
            })
            .collect();
        Self {
            directories,
            extensions: config
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_file_chars: config.max_file_chars,
            ttl: Duration::from_secs(config.cache_ttl_secs),
            cache: Mutex::new(None),
        }
    }

    /// Drop the cached blocks so the next load reads from disk.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    fn read_all(&self) -> Vec<String> {
        let mut blocks = Vec::new();
        for dir in &self.directories {
            if !dir.is_dir() {
                debug!(directory = %dir.display(), "Context directory missing, skipping");
                continue;
            }
            let walker = WalkDir::new(dir)
                .follow_links(false)
                .sort_by_file_name();
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(directory = %dir.display(), error = %e, "Failed to walk context directory");
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !self.wanted(entry.path()) {
                    continue;
                }
                match std::fs::read_to_string(entry.path()) {
                    Ok(content) => {
                        let name = entry.file_name().to_string_lossy();
                        blocks.push(format!("# {}\n\n{}", name, self.cap(content)));
                    }
                    Err(e) => {
                        warn!(path = %entry.path().display(), error = %e, "Cannot read context file");
                    }
                }
            }
        }
        blocks
    }

    fn wanted(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    fn cap(&self, content: String) -> String {
        match self.max_file_chars {
            Some(max) => match content.char_indices().nth(max) {
                Some((cut, _)) => format!("{}\n\n[Truncated to {} characters]", &content[..cut], max),
                None => content,
            },
            None => content,
        }
    }
}

impl ContextSupplier for PromptContextLoader {
    fn load_context(&self) -> Vec<String> {
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return cached.blocks.clone();
            }
        }
        let blocks = self.read_all();
        debug!(blocks = blocks.len(), "Context reloaded");
        *cache = Some(CachedContext {
            blocks: blocks.clone(),
            loaded_at: Instant::now(),
        });
        blocks
    }
}
