mod backup;
mod config;
mod engine;
mod fs_utils;
mod progress;
mod rollback;
mod state;
mod types;
mod uninstall;
mod upgrade;
mod verify;

pub use backup::{backup_timestamp, create_backup, BackupKind};
pub use config::InstallerConfig;
pub use engine::Installer;
pub use progress::{
    AlwaysConfirm, ConfirmationGate, InstallProgress, NullProgress, ProgressSink,
    UninstallPlan, UninstallProgress, UpgradeProgress, VariantChangePlan,
};
pub use state::{
    InstallationState, ResumeSummary, Stage, StateLedger, ToolFailure, ToolProgress,
    STATE_SCHEMA_VERSION,
};
pub use types::{
    BackupRecord, BatchReport, FailedTool, InstallError, InstallOutcome, RollbackLogEntry,
    RollbackStrategy, SessionLog, UninstallOutcome, VariantChangeOutcome,
};
pub use verify::{verify, CategoryCheck, VerificationReport};
