use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::fs_utils::copy_dir;
use crate::types::BackupRecord;

/// Which operation a backup protects. The kind shows up in the backup
/// directory name so a human can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    Install,
    Uninstall,
    Upgrade,
}

impl BackupKind {
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Install => "backup",
            Self::Uninstall => "uninstall-backup",
            Self::Upgrade => "upgrade-backup",
        }
    }
}

/// ISO 8601 timestamp with `:` and `.` replaced by `-` so it is safe as a
/// path component on every platform.
pub fn backup_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Takes a full recursive copy of `target` as a sibling directory named
/// `<target>.<kind>.<timestamp>`. Backups are retained indefinitely.
pub fn create_backup(target: &Path, kind: BackupKind) -> Result<BackupRecord> {
    let timestamp = Utc::now();
    let base_name = target
        .file_name()
        .ok_or_else(|| anyhow!("backup target has no file name: {}", target.display()))?
        .to_string_lossy();
    let backup_name = format!(
        "{}.{}.{}",
        base_name,
        kind.suffix(),
        backup_timestamp(timestamp)
    );
    let backup_path = target.with_file_name(backup_name);

    copy_dir(target, &backup_path)?;

    Ok(BackupRecord {
        original_path: target.to_path_buf(),
        backup_path,
        timestamp,
    })
}
