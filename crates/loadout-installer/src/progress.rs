use std::path::PathBuf;

use loadout_core::{Category, ComponentCounts};

/// Per-file progress during a single-tool install.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallProgress {
    pub current_file: String,
    pub files_completed: u64,
    pub total_files: u64,
    pub percentage: f64,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

/// Per-item progress during uninstall.
#[derive(Debug, Clone, PartialEq)]
pub struct UninstallProgress {
    pub category: Category,
    pub name: String,
    pub files_removed: u64,
    pub total_files: u64,
    pub percentage: f64,
}

/// Stage events during a variant change.
#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeProgress {
    BackingUp { backup_path: PathBuf },
    Removing { category: Category, name: String },
    Adding { category: Category, name: String },
    WritingManifest,
    Verifying,
}

/// Receives progress events from the orchestrator. No behavior depends on
/// the sink beyond reporting; the default implementations drop everything.
pub trait ProgressSink {
    fn install_progress(&mut self, _event: &InstallProgress) {}
    fn uninstall_progress(&mut self, _event: &UninstallProgress) {}
    fn upgrade_progress(&mut self, _event: &UpgradeProgress) {}
}

/// Discards all progress events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// What an uninstall is about to remove, presented before any mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct UninstallPlan {
    pub tool: String,
    pub variant: String,
    pub total_files: u64,
    pub components: ComponentCounts,
}

/// What a variant change is about to do, presented before any mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantChangePlan {
    pub tool: String,
    pub from_variant: String,
    pub to_variant: String,
    pub files_to_add: Vec<String>,
    pub files_to_remove: Vec<String>,
}

/// Gates destructive operations. Declining is not an error; it yields a
/// cancelled outcome with no mutation performed.
pub trait ConfirmationGate {
    fn confirm_uninstall(&mut self, _plan: &UninstallPlan) -> bool {
        true
    }

    fn confirm_variant_change(&mut self, _plan: &VariantChangePlan) -> bool {
        true
    }
}

/// Approves everything; the unattended default.
#[derive(Debug, Default)]
pub struct AlwaysConfirm;

impl ConfirmationGate for AlwaysConfirm {}
