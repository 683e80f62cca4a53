use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Explicit installer configuration: every well-known path derives from a
/// single root directory, constructed once and passed down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerConfig {
    root: PathBuf,
}

impl InstallerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Per-user default root: `~/.loadout`, or `%LOCALAPPDATA%\Loadout`
    /// on Windows.
    pub fn default_user_config() -> Result<Self> {
        if cfg!(windows) {
            let app_data = std::env::var("LOCALAPPDATA")
                .context("LOCALAPPDATA is not set; cannot resolve Windows user root")?;
            return Ok(Self::new(PathBuf::from(app_data).join("Loadout")));
        }

        let home = std::env::var("HOME").context("HOME is not set; cannot resolve user root")?;
        Ok(Self::new(PathBuf::from(home).join(".loadout")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// The single resumable installation-progress record.
    pub fn state_file_path(&self) -> PathBuf {
        self.state_dir().join("install-state.json")
    }

    /// Append-only audit trail of rollback attempts.
    pub fn rollback_journal_path(&self) -> PathBuf {
        self.state_dir().join("rollback.journal")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.state_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}
