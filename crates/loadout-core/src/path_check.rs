use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::manifest::InstallManifest;

/// What already sits at a prospective installation target.
#[derive(Debug)]
pub struct ExistingInstall {
    pub exists: bool,
    pub manifest: Option<InstallManifest>,
}

/// Expands and probes target paths on behalf of the orchestrator.
pub trait PathValidator {
    /// Expands a raw user-supplied path into an absolute one.
    fn expand(&self, raw: &str) -> Result<PathBuf>;

    /// Reports whether an installation (or anything else) already exists
    /// at `target`. The default implementation treats a loadable manifest
    /// as evidence of a prior installation.
    fn check_existing(&self, target: &Path) -> ExistingInstall {
        ExistingInstall {
            exists: target.exists(),
            manifest: InstallManifest::load(target).ok(),
        }
    }
}

/// Minimal validator: `~` expansion against a fixed home directory,
/// relative paths anchored at the current working directory.
#[derive(Debug, Clone)]
pub struct HomePathValidator {
    home: PathBuf,
}

impl HomePathValidator {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl PathValidator for HomePathValidator {
    fn expand(&self, raw: &str) -> Result<PathBuf> {
        if raw == "~" {
            return Ok(self.home.clone());
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            return Ok(self.home.join(rest));
        }

        let path = Path::new(raw);
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        let cwd = std::env::current_dir().context("failed to resolve current directory")?;
        Ok(cwd.join(path))
    }
}
