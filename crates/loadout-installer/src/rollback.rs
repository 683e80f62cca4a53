use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, warn};

use loadout_core::{Category, InstallManifest};

use crate::engine::Installer;
use crate::fs_utils::{count_files, prune_empty_dirs, remove_file_if_exists};
use crate::types::{BackupRecord, RollbackLogEntry, RollbackStrategy, SessionLog};

impl Installer {
    /// Rolls back a partial installation at `target`.
    ///
    /// Three-tier strategy, first matching tier wins: the in-process
    /// session log, the on-disk manifest, then a registered backup.
    /// Partial removal failures are recorded in the journal and never
    /// abort the remaining removals.
    pub(crate) fn rollback(&mut self, tool: &str, target: &Path, session: Option<&SessionLog>) {
        let (strategy, files_removed, errors) = if let Some(session) =
            session.filter(|session| session.target_path == target)
        {
            rollback_from_session(session)
        } else if let Ok(manifest) = InstallManifest::load(target) {
            rollback_from_manifest(&manifest, target)
        } else if let Some(record) = self.backups.get(target).cloned() {
            restore_from_backup(&record, target)
        } else {
            (
                RollbackStrategy::None,
                0,
                vec!["no session log, manifest, or backup available".to_string()],
            )
        };

        let entry = RollbackLogEntry {
            tool: tool.to_string(),
            target_path: target.to_path_buf(),
            strategy,
            files_removed,
            errors,
            timestamp: Utc::now(),
        };
        debug!(
            tool,
            target = %target.display(),
            strategy = ?entry.strategy,
            files_removed = entry.files_removed,
            error_count = entry.errors.len(),
            "rollback finished"
        );
        self.append_rollback_journal(&entry);
    }

    /// Cross-process recovery entry point: rolls back a target for which
    /// no in-memory session log exists (manifest and backup tiers only).
    pub fn rollback_target(&mut self, tool: &str, target: &Path) {
        self.rollback(tool, target, None);
    }

    /// Journal appends are best-effort; losing an audit line must not turn
    /// a successful rollback into a failure.
    fn append_rollback_journal(&self, entry: &RollbackLogEntry) {
        let path = self.config.rollback_journal_path();
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let line = serde_json::to_string(entry)
                .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
            let mut file = fs::OpenOptions::new().create(true).append(true).open(&path)?;
            file.write_all(line.as_bytes())?;
            file.write_all(b"\n")?;
            file.flush()
        })();
        if let Err(err) = result {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to append rollback journal entry"
            );
        }
    }
}

/// Tier (a): remove every session-logged file in reverse write order (the
/// manifest, written last, goes first), then prune emptied directories.
fn rollback_from_session(session: &SessionLog) -> (RollbackStrategy, u64, Vec<String>) {
    let mut removed = 0u64;
    let mut errors = Vec::new();

    for path in session.installed_files.iter().rev() {
        match remove_file_if_exists(path) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(err) => errors.push(format!("{}: {err}", path.display())),
        }
    }
    prune_empty_dirs(&session.target_path);

    (RollbackStrategy::SessionLog, removed, errors)
}

/// Tier (b): reconstruct expected paths from the manifest using the same
/// per-category naming rule as verification, remove them, remove the
/// manifest, prune.
fn rollback_from_manifest(
    manifest: &InstallManifest,
    target: &Path,
) -> (RollbackStrategy, u64, Vec<String>) {
    let mut removed = 0u64;
    let mut errors = Vec::new();

    for category in Category::ALL {
        for item in manifest.installed_files.get(category) {
            let path = manifest.expected_item_path(category, item);
            if category.is_directory_item() {
                if !path.exists() {
                    continue;
                }
                let contained = count_files(&path).unwrap_or(0);
                match fs::remove_dir_all(&path) {
                    Ok(()) => removed += contained,
                    Err(err) => errors.push(format!("{}: {err}", path.display())),
                }
            } else {
                match remove_file_if_exists(&path) {
                    Ok(true) => removed += 1,
                    Ok(false) => {}
                    Err(err) => errors.push(format!("{}: {err}", path.display())),
                }
            }
        }
    }

    let manifest_path = InstallManifest::path_for(target);
    match remove_file_if_exists(&manifest_path) {
        Ok(true) => removed += 1,
        Ok(false) => {}
        Err(err) => errors.push(format!("{}: {err}", manifest_path.display())),
    }
    prune_empty_dirs(target);

    (RollbackStrategy::Manifest, removed, errors)
}

/// Tier (c): delete the current target wholesale and restore the backup
/// copy in its place.
fn restore_from_backup(record: &BackupRecord, target: &Path) -> (RollbackStrategy, u64, Vec<String>) {
    let mut errors = Vec::new();
    let removed = count_files(target).unwrap_or(0);

    if target.exists() {
        if let Err(err) = fs::remove_dir_all(target) {
            errors.push(format!("{}: {err}", target.display()));
            return (RollbackStrategy::Backup, 0, errors);
        }
    }
    if let Err(err) = crate::fs_utils::copy_dir(&record.backup_path, target) {
        errors.push(format!(
            "failed to restore backup {}: {err}",
            record.backup_path.display()
        ));
    }

    (RollbackStrategy::Backup, removed, errors)
}
