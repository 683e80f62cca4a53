use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use loadout_core::ManifestError;

/// Expected per-tool failure modes. The batch driver pattern-matches on
/// these to decide continuation; unexpected faults travel as `Other`.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid package content for '{tool}': {issues:?}")]
    InvalidPackage { tool: String, issues: Vec<String> },

    #[error("filesystem error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("manifest not found at {0}")]
    ManifestMissing(PathBuf),

    #[error("manifest unreadable at {path}: {reason}")]
    ManifestCorrupt { path: PathBuf, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ManifestError> for InstallError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Missing(path) => Self::ManifestMissing(path),
            ManifestError::Io { source, .. } => Self::FileSystem(source),
            ManifestError::Corrupt { path, source } => Self::ManifestCorrupt {
                path,
                reason: source.to_string(),
            },
        }
    }
}

/// In-memory record of every file written during one single-tool install,
/// appended in write order (manifest last). Primary rollback source while
/// the process is alive.
#[derive(Debug, Clone)]
pub struct SessionLog {
    pub target_path: PathBuf,
    pub installed_files: Vec<PathBuf>,
}

impl SessionLog {
    pub fn new(target: &Path) -> Self {
        Self {
            target_path: target.to_path_buf(),
            installed_files: Vec::new(),
        }
    }

    pub fn record(&mut self, path: PathBuf) {
        self.installed_files.push(path);
    }
}

/// A full recursive copy of a pre-existing target, taken before any
/// destructive operation. Never auto-pruned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: DateTime<Utc>,
}

/// Which rollback tier handled an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollbackStrategy {
    SessionLog,
    Manifest,
    Backup,
    None,
}

/// One line of the append-only rollback journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackLogEntry {
    pub tool: String,
    pub target_path: PathBuf,
    pub strategy: RollbackStrategy,
    pub files_removed: u64,
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub tool: String,
    pub variant: String,
    pub target_path: PathBuf,
    pub files_installed: u64,
    pub bytes_transferred: u64,
    pub backup_path: Option<PathBuf>,
    pub manifest_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTool {
    pub tool_id: String,
    pub error: String,
}

/// Result of a multi-tool batch run. A failed tool never aborts the batch;
/// it lands here and the loop continues.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub successful: Vec<String>,
    pub failed: Vec<FailedTool>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UninstallOutcome {
    pub success: bool,
    pub cancelled: bool,
    pub files_removed: u64,
    pub directories_removed: u64,
    pub backup_path: Option<PathBuf>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VariantChangeOutcome {
    pub success: bool,
    pub cancelled: bool,
    pub from_variant: String,
    pub to_variant: String,
    pub files_added: u64,
    pub files_removed: u64,
    pub backup_path: Option<PathBuf>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub verification: Option<crate::verify::VerificationReport>,
}
