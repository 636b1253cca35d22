//! Execution context for server commands.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::config::ServerConfig;
use crate::output::Output;

/// File names searched for when no `--config` is given.
pub const CONFIG_NAMES: [&str; 3] = ["lease.toml", ".lease.toml", "lease.json"];

/// Execution context for commands.
pub struct Context {
    /// Effective configuration (file, then environment).
    pub config: ServerConfig,
    /// Where the configuration was read from, if anywhere.
    pub config_path: Option<PathBuf>,
    /// Output handler.
    pub output: Output,
    /// Working directory.
    pub cwd: PathBuf,
}

impl Context {
    /// Load context from config file and environment.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        let (mut config, config_path) = if let Some(path) = config_path {
            (ServerConfig::load(path)?, Some(PathBuf::from(path)))
        } else {
            match Self::find_config(&cwd) {
                Some(path) => {
                    let config = ServerConfig::load(&path.to_string_lossy())?;
                    (config, Some(path))
                }
                None => (ServerConfig::default(), None),
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(Self {
            config,
            config_path,
            output,
            cwd,
        })
    }

    /// Find config file in directory tree.
    fn find_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            for name in &CONFIG_NAMES {
                let config_path = current.join(name);
                if config_path.exists() {
                    return Some(config_path);
                }
            }

            if !current.pop() {
                break;
            }
        }

        None
    }

    /// Resolve a path relative to the working directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        if PathBuf::from(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.cwd.join(path)
        }
    }
}
