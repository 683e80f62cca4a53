use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, warn};

use loadout_core::{
    Category, CategoryPaths, ContentResolver, FileTotals, InstallManifest, PathValidator,
    ResolvedContent,
};

use crate::backup::{create_backup, BackupKind};
use crate::config::InstallerConfig;
use crate::progress::{
    AlwaysConfirm, ConfirmationGate, InstallProgress, NullProgress, ProgressSink,
};
use crate::state::StateLedger;
use crate::types::{
    BackupRecord, BatchReport, FailedTool, InstallError, InstallOutcome, SessionLog,
};

/// Tolerated difference between the resolver-reported file count and what
/// the pre-scan actually finds before a diagnostic is emitted.
pub(crate) const FILE_COUNT_SLACK: u64 = 5;

/// One file the install plan will copy.
#[derive(Debug, Clone)]
pub(crate) struct PlanEntry {
    pub source: PathBuf,
    pub relative: PathBuf,
    pub size: u64,
    pub category: Category,
}

/// The installation orchestrator. Drives per-tool install, rollback,
/// backup, uninstall, verification and variant changes; consumes the state
/// ledger and the injected collaborators.
pub struct Installer {
    pub(crate) config: InstallerConfig,
    pub(crate) resolver: Box<dyn ContentResolver>,
    pub(crate) validator: Box<dyn PathValidator>,
    pub(crate) progress: Box<dyn ProgressSink>,
    pub(crate) gate: Box<dyn ConfirmationGate>,
    pub(crate) ledger: StateLedger,
    pub(crate) backups: HashMap<PathBuf, BackupRecord>,
}

impl Installer {
    pub fn new(
        config: InstallerConfig,
        resolver: Box<dyn ContentResolver>,
        validator: Box<dyn PathValidator>,
    ) -> Self {
        let ledger = StateLedger::new(&config);
        Self {
            config,
            resolver,
            validator,
            progress: Box::new(NullProgress),
            gate: Box::new(AlwaysConfirm),
            ledger,
            backups: HashMap::new(),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_gate(mut self, gate: Box<dyn ConfirmationGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn config(&self) -> &InstallerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &StateLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut StateLedger {
        &mut self.ledger
    }

    /// Installs one tool's variant content into `target`.
    ///
    /// There is no state in which a partially written installation is left
    /// behind: any failure past validation triggers a rollback before the
    /// error is returned to the caller.
    pub fn install_one(
        &mut self,
        tool: &str,
        variant: &str,
        target: &Path,
    ) -> Result<InstallOutcome, InstallError> {
        let validation = self.resolver.validate(tool, variant)?;
        if !validation.valid {
            return Err(InstallError::InvalidPackage {
                tool: tool.to_string(),
                issues: validation.issues,
            });
        }
        let content = self.resolver.resolve(tool, variant)?;

        let existing = self.validator.check_existing(target);
        let mut backup_path = None;
        if existing.exists {
            match create_backup(target, BackupKind::Install) {
                Ok(record) => {
                    backup_path = Some(record.backup_path.clone());
                    self.backups.insert(target.to_path_buf(), record);
                }
                Err(err) => warn!(
                    target = %target.display(),
                    error = %err,
                    "failed to back up existing installation; continuing"
                ),
            }
        }

        let mut session = SessionLog::new(target);
        match self.copy_and_commit(tool, variant, target, &content, &mut session) {
            Ok(mut outcome) => {
                outcome.backup_path = backup_path;
                Ok(outcome)
            }
            Err(err) => {
                self.rollback(tool, target, Some(&session));
                Err(err)
            }
        }
    }

    fn copy_and_commit(
        &mut self,
        tool: &str,
        variant: &str,
        target: &Path,
        content: &ResolvedContent,
        session: &mut SessionLog,
    ) -> Result<InstallOutcome, InstallError> {
        fs::create_dir_all(target)?;

        let entries = plan_entries(content)?;
        let total_files = entries.len() as u64;
        let total_bytes: u64 = entries.iter().map(|entry| entry.size).sum();
        if content.total_files.abs_diff(total_files) > FILE_COUNT_SLACK {
            warn!(
                tool,
                variant,
                reported = content.total_files,
                planned = total_files,
                "resolver-reported file count disagrees with install plan"
            );
        }

        if self.ledger.is_initialized() {
            self.ledger.begin_tool_attempt()?;
        }

        let mut bytes_transferred = 0u64;
        for (index, entry) in entries.iter().enumerate() {
            let destination = target.join(&entry.relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&entry.source, &destination)?;
            session.record(destination);
            bytes_transferred += entry.size;

            let relative = entry.relative.to_string_lossy().into_owned();
            debug!(category = %entry.category, file = %relative, "copied");
            // Checkpoint order matches copy completion order; the file is
            // durably present before its checkpoint persists.
            if self.ledger.is_initialized() {
                self.ledger
                    .checkpoint_file(&relative, entry.size, total_files, total_bytes)?;
            }

            let files_completed = index as u64 + 1;
            self.progress.install_progress(&InstallProgress {
                current_file: relative,
                files_completed,
                total_files,
                percentage: percentage(files_completed, total_files),
                bytes_transferred,
                total_bytes,
            });
        }

        let manifest = self.build_manifest(tool, variant, target, content, total_files)?;
        let manifest_path = manifest.write(target).map_err(InstallError::Other)?;
        session.record(manifest_path.clone());
        debug!(tool, variant, target = %target.display(), "install committed");

        Ok(InstallOutcome {
            tool: tool.to_string(),
            variant: variant.to_string(),
            target_path: target.to_path_buf(),
            files_installed: total_files,
            bytes_transferred: total_bytes,
            backup_path: None,
            manifest_path,
        })
    }

    /// Builds the manifest for a freshly installed or regenerated target
    /// from variant metadata, resolved content and the computed size.
    pub(crate) fn build_manifest(
        &self,
        tool: &str,
        variant: &str,
        target: &Path,
        content: &ResolvedContent,
        total_files: u64,
    ) -> Result<InstallManifest, InstallError> {
        let size = self.resolver.size(tool, variant)?;
        let metadata = self.resolver.metadata(tool, variant)?;

        Ok(InstallManifest {
            tool: tool.to_string(),
            variant: variant.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            installed_at: Utc::now(),
            variant_info: metadata,
            components: content.component_counts(),
            installed_files: loadout_core::InstalledFiles {
                agents: content.item_names(Category::Agents),
                skills: content.item_names(Category::Skills),
                resources: content.item_names(Category::Resources),
                hooks: content.item_names(Category::Hooks),
            },
            paths: CategoryPaths::for_target(target),
            files: FileTotals {
                total: total_files,
                formatted_size: size.formatted,
            },
        })
    }

    /// Installs `tools` in order under one resumable ledger session.
    ///
    /// Tools already completed or failed in a prior (resumed) run are
    /// skipped without re-attempt. A tool failure records the error and
    /// continues with the next tool; the batch itself only errors on
    /// ledger misuse. On full success the ledger is cleared, leaving no
    /// resumable trace.
    pub fn install_many(
        &mut self,
        variant: &str,
        tools: &[String],
        paths: &BTreeMap<String, PathBuf>,
        resume: bool,
    ) -> Result<BatchReport> {
        if resume {
            if self.ledger.load().is_none() {
                warn!("no resumable state found; starting a fresh run");
                self.ledger.init(variant, tools.to_vec(), paths.clone())?;
            }
        } else {
            self.ledger.init(variant, tools.to_vec(), paths.clone())?;
        }

        let mut report = BatchReport::default();
        for tool in tools {
            let already_done = {
                let state = self
                    .ledger
                    .state()
                    .ok_or_else(|| anyhow::anyhow!("ledger state vanished mid-batch"))?;
                state.is_completed(tool) || state.is_failed(tool)
            };
            if already_done {
                report.skipped.push(tool.clone());
                continue;
            }

            let Some(target) = paths.get(tool).cloned() else {
                let message = format!("no target path configured for '{tool}'");
                self.ledger.advance_on_failure(&message, None)?;
                report.failed.push(FailedTool {
                    tool_id: tool.clone(),
                    error: message,
                });
                continue;
            };

            match self.install_one(tool, variant, &target) {
                Ok(_) => {
                    self.ledger.advance_on_success()?;
                    report.successful.push(tool.clone());
                }
                Err(err) => {
                    let message = err.to_string();
                    self.ledger.advance_on_failure(&message, None)?;
                    report.failed.push(FailedTool {
                        tool_id: tool.clone(),
                        error: message,
                    });
                }
            }
        }

        let any_failure = self
            .ledger
            .state()
            .map(|state| !state.failed_tools.is_empty())
            .unwrap_or(false);
        if !any_failure {
            self.ledger.clear();
        }

        Ok(report)
    }
}

pub(crate) fn percentage(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

/// Flattens the four content categories into a single ordered copy plan.
/// Agents, resources and hooks contribute one file each; skills are walked
/// recursively preserving their relative structure.
pub(crate) fn plan_entries(content: &ResolvedContent) -> Result<Vec<PlanEntry>, InstallError> {
    let mut entries = Vec::new();

    for category in Category::ALL {
        for source in content.for_category(category) {
            if category.is_directory_item() && source.is_dir() {
                let dir_name = source
                    .file_name()
                    .ok_or_else(|| {
                        anyhow::anyhow!("skill directory has no name: {}", source.display())
                    })
                    .map_err(InstallError::Other)?
                    .to_os_string();
                let base = PathBuf::from(category.dir_name()).join(dir_name);
                for (file, size) in crate::fs_utils::walk_files(source)? {
                    let rel = file.strip_prefix(source).map_err(|_| {
                        InstallError::Other(anyhow::anyhow!(
                            "failed to relativize {}",
                            file.display()
                        ))
                    })?;
                    entries.push(PlanEntry {
                        relative: base.join(rel),
                        source: file,
                        size,
                        category,
                    });
                }
            } else {
                let file_name = source
                    .file_name()
                    .ok_or_else(|| {
                        anyhow::anyhow!("content file has no name: {}", source.display())
                    })
                    .map_err(InstallError::Other)?;
                let size = fs::metadata(source)?.len();
                entries.push(PlanEntry {
                    relative: PathBuf::from(category.dir_name()).join(file_name),
                    source: source.clone(),
                    size,
                    category,
                });
            }
        }
    }

    Ok(entries)
}
