use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::debug;

use loadout_core::{Category, InstallManifest, ResolvedContent};

use crate::backup::{create_backup, BackupKind};
use crate::engine::{plan_entries, Installer};
use crate::fs_utils::{copy_dir, remove_file_if_exists};
use crate::progress::{UpgradeProgress, VariantChangePlan};
use crate::types::VariantChangeOutcome;
use crate::verify::verify;

impl Installer {
    /// Moves an installed tool from its current variant to `new_variant`
    /// by diffing the two content sets per category and applying only the
    /// difference.
    ///
    /// Removals are additionally gated on the manifest's installed-files
    /// list, so a user file that happens to share an item's name is never
    /// deleted. If post-change verification fails the outcome is reported
    /// as failed with the backup path attached; the mutation is not
    /// automatically reverted.
    pub fn change_variant(
        &mut self,
        tool: &str,
        new_variant: &str,
        target: &Path,
    ) -> VariantChangeOutcome {
        let mut outcome = VariantChangeOutcome {
            to_variant: new_variant.to_string(),
            ..VariantChangeOutcome::default()
        };

        let manifest = match InstallManifest::load(target) {
            Ok(manifest) => manifest,
            Err(err) => {
                outcome.errors.push(err.to_string());
                return outcome;
            }
        };
        outcome.from_variant = manifest.variant.clone();

        if manifest.variant == new_variant {
            outcome.success = true;
            return outcome;
        }

        let current = match self.resolver.resolve(tool, &manifest.variant) {
            Ok(content) => content,
            Err(err) => {
                outcome
                    .errors
                    .push(format!("failed to resolve current variant: {err}"));
                return outcome;
            }
        };
        let next = match self.resolver.resolve(tool, new_variant) {
            Ok(content) => content,
            Err(err) => {
                outcome
                    .errors
                    .push(format!("failed to resolve target variant: {err}"));
                return outcome;
            }
        };

        let diff = diff_contents(&current, &next);
        let plan = VariantChangePlan {
            tool: tool.to_string(),
            from_variant: manifest.variant.clone(),
            to_variant: new_variant.to_string(),
            files_to_add: diff.describe_additions(),
            files_to_remove: diff.describe_removals(),
        };
        if !self.gate.confirm_variant_change(&plan) {
            outcome.cancelled = true;
            debug!(tool, target = %target.display(), "variant change declined");
            return outcome;
        }

        match create_backup(target, BackupKind::Upgrade) {
            Ok(record) => {
                self.progress.upgrade_progress(&UpgradeProgress::BackingUp {
                    backup_path: record.backup_path.clone(),
                });
                outcome.backup_path = Some(record.backup_path);
            }
            Err(err) => {
                outcome
                    .errors
                    .push(format!("failed to back up before variant change: {err}"));
                return outcome;
            }
        }

        for (category, name) in &diff.removals {
            // Only items the manifest actually installed are removable; a
            // colliding name the manifest never listed stays untouched.
            if !manifest.installed_files.contains(*category, name) {
                outcome.warnings.push(format!(
                    "skipping removal of unmanaged {category} item: {name}"
                ));
                continue;
            }
            self.progress.upgrade_progress(&UpgradeProgress::Removing {
                category: *category,
                name: name.clone(),
            });

            let path = manifest.expected_item_path(*category, name);
            if category.is_directory_item() {
                if !path.exists() {
                    continue;
                }
                match fs::remove_dir_all(&path) {
                    Ok(()) => outcome.files_removed += 1,
                    Err(err) => outcome.errors.push(format!("{}: {err}", path.display())),
                }
            } else {
                match remove_file_if_exists(&path) {
                    Ok(true) => outcome.files_removed += 1,
                    Ok(false) => {}
                    Err(err) => outcome.errors.push(format!("{}: {err}", path.display())),
                }
            }
        }

        for (category, name, source) in &diff.additions {
            self.progress.upgrade_progress(&UpgradeProgress::Adding {
                category: *category,
                name: name.clone(),
            });

            let destination = target
                .join(category.dir_name())
                .join(category.installed_file_name(name));
            let result = if category.is_directory_item() && source.is_dir() {
                copy_dir(source, &destination).map(|_| ())
            } else {
                (|| {
                    if let Some(parent) = destination.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::copy(source, &destination).map(|_| ())
                })()
                .map_err(anyhow::Error::from)
            };
            match result {
                Ok(()) => outcome.files_added += 1,
                Err(err) => outcome
                    .errors
                    .push(format!("{}: {err}", destination.display())),
            }
        }

        // All four category directories exist after a change, even empty.
        for category in Category::ALL {
            if let Err(err) = fs::create_dir_all(target.join(category.dir_name())) {
                outcome.errors.push(format!(
                    "failed to ensure {category} directory: {err}"
                ));
            }
        }

        self.progress
            .upgrade_progress(&UpgradeProgress::WritingManifest);
        let total_files = match plan_entries(&next) {
            Ok(entries) => entries.len() as u64,
            Err(err) => {
                outcome.errors.push(err.to_string());
                return outcome;
            }
        };
        match self.build_manifest(tool, new_variant, target, &next, total_files) {
            Ok(new_manifest) => {
                if let Err(err) = new_manifest.write(target) {
                    outcome.errors.push(err.to_string());
                    return outcome;
                }
            }
            Err(err) => {
                outcome.errors.push(err.to_string());
                return outcome;
            }
        }

        self.progress.upgrade_progress(&UpgradeProgress::Verifying);
        let report = verify(tool, target);
        let verified = report.valid;
        outcome.verification = Some(report);
        outcome.success = outcome.errors.is_empty() && verified;
        outcome
    }
}

struct ContentDiff {
    /// Items present in the target variant but not the current one, with
    /// their source paths.
    additions: Vec<(Category, String, std::path::PathBuf)>,
    /// Items present in the current variant but not the target one.
    removals: Vec<(Category, String)>,
}

impl ContentDiff {
    fn describe_additions(&self) -> Vec<String> {
        self.additions
            .iter()
            .map(|(category, name, _)| format!("{category}/{name}"))
            .collect()
    }

    fn describe_removals(&self) -> Vec<String> {
        self.removals
            .iter()
            .map(|(category, name)| format!("{category}/{name}"))
            .collect()
    }
}

/// Diffs two resolved content sets by item basename per category. Agent
/// names are compared after stripping the stored file extension.
fn diff_contents(current: &ResolvedContent, next: &ResolvedContent) -> ContentDiff {
    let mut additions = Vec::new();
    let mut removals = Vec::new();

    for category in Category::ALL {
        let current_names: BTreeSet<String> =
            current.item_names(category).into_iter().collect();
        let next_names: BTreeSet<String> = next.item_names(category).into_iter().collect();

        for source in next.for_category(category) {
            if let Some(name) = category.item_name(source) {
                if !current_names.contains(&name) {
                    additions.push((category, name, source.clone()));
                }
            }
        }
        for name in current_names {
            if !next_names.contains(&name) {
                removals.push((category, name));
            }
        }
    }

    ContentDiff {
        additions,
        removals,
    }
}
