use std::fs;
use std::path::Path;

use tracing::debug;

use loadout_core::{Category, InstallManifest};

use crate::backup::{create_backup, BackupKind};
use crate::engine::{percentage, Installer};
use crate::fs_utils::{count_files, prune_empty_dirs, remove_file_if_exists};
use crate::progress::{UninstallPlan, UninstallProgress};
use crate::types::UninstallOutcome;

impl Installer {
    /// Removes a tool's installation, touching only what the manifest
    /// enumerates: files the user added after installation survive, even
    /// inside category directories.
    ///
    /// The confirmation gate is consulted before any mutation; declining
    /// yields a cancelled outcome. A full backup is taken first, and a
    /// backup failure aborts the uninstall since the backup is the only
    /// recovery path once removal starts.
    pub fn uninstall(&mut self, tool: &str, target: &Path) -> UninstallOutcome {
        let mut outcome = UninstallOutcome::default();

        let manifest = match InstallManifest::load(target) {
            Ok(manifest) => manifest,
            Err(err) => {
                outcome.errors.push(err.to_string());
                return outcome;
            }
        };

        let total_files = match removal_file_count(&manifest) {
            Ok(total) => total,
            Err(err) => {
                outcome.errors.push(err.to_string());
                return outcome;
            }
        };

        let plan = UninstallPlan {
            tool: manifest.tool.clone(),
            variant: manifest.variant.clone(),
            total_files,
            components: manifest.components,
        };
        if !self.gate.confirm_uninstall(&plan) {
            outcome.cancelled = true;
            debug!(tool, target = %target.display(), "uninstall declined");
            return outcome;
        }

        match create_backup(target, BackupKind::Uninstall) {
            Ok(record) => outcome.backup_path = Some(record.backup_path),
            Err(err) => {
                outcome
                    .errors
                    .push(format!("failed to back up before uninstall: {err}"));
                return outcome;
            }
        }

        for category in Category::ALL {
            for item in manifest.installed_files.get(category) {
                let path = manifest.expected_item_path(category, item);
                if category.is_directory_item() {
                    if !path.exists() {
                        outcome
                            .warnings
                            .push(format!("{category} item already absent: {item}"));
                        continue;
                    }
                    let contained = count_files(&path).unwrap_or(0);
                    match fs::remove_dir_all(&path) {
                        Ok(()) => {
                            outcome.files_removed += contained;
                            outcome.directories_removed += 1;
                        }
                        Err(err) => outcome.errors.push(format!("{}: {err}", path.display())),
                    }
                } else {
                    match remove_file_if_exists(&path) {
                        Ok(true) => outcome.files_removed += 1,
                        Ok(false) => outcome
                            .warnings
                            .push(format!("{category} item already absent: {item}")),
                        Err(err) => outcome.errors.push(format!("{}: {err}", path.display())),
                    }
                }

                self.progress.uninstall_progress(&UninstallProgress {
                    category,
                    name: item.clone(),
                    files_removed: outcome.files_removed,
                    total_files,
                    percentage: percentage(outcome.files_removed, total_files),
                });
            }
        }

        // The manifest goes last so an interrupted uninstall can still be
        // resumed from it.
        let manifest_path = InstallManifest::path_for(target);
        match remove_file_if_exists(&manifest_path) {
            Ok(true) => outcome.files_removed += 1,
            Ok(false) => {}
            Err(err) => outcome
                .errors
                .push(format!("{}: {err}", manifest_path.display())),
        }

        outcome.directories_removed += prune_empty_dirs(target);
        outcome.success = outcome.errors.is_empty();
        outcome
    }
}

/// Total file count an uninstall would remove, with skill directories
/// counted recursively and the manifest itself included. Reported to the
/// confirmation gate before any mutation; `files_removed` in the outcome
/// tallies against the same total.
fn removal_file_count(manifest: &InstallManifest) -> anyhow::Result<u64> {
    // The manifest is removed last.
    let mut total = 1u64;
    for category in Category::ALL {
        for item in manifest.installed_files.get(category) {
            let path = manifest.expected_item_path(category, item);
            if category.is_directory_item() {
                if path.exists() {
                    total += count_files(&path)?;
                }
            } else {
                total += 1;
            }
        }
    }
    Ok(total)
}
