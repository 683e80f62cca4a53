use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::InstallerConfig;

/// Current on-disk schema of the installation state record.
pub const STATE_SCHEMA_VERSION: &str = "2";

/// Lifecycle stage of a multi-tool installation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Initializing,
    Installing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolFailure {
    pub tool_id: String,
    pub error_message: String,
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per-file progress of the tool currently being installed. Reset whenever
/// `current_tool` changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolProgress {
    pub tool_id: Option<String>,
    pub files_completed: Vec<String>,
    pub total_files: u64,
    pub bytes_transferred: u64,
    pub total_bytes: u64,
}

impl ToolProgress {
    fn reset_for(tool: Option<&str>) -> Self {
        Self {
            tool_id: tool.map(ToOwned::to_owned),
            files_completed: Vec::new(),
            total_files: 0,
            bytes_transferred: 0,
            total_bytes: 0,
        }
    }
}

/// The resumable installation-progress record, persisted as camelCase JSON
/// at a well-known location. `variant`, `tools` and `paths` are set once at
/// init and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationState {
    pub schema_version: String,
    pub session_id: String,
    pub variant: String,
    pub tools: Vec<String>,
    pub paths: BTreeMap<String, PathBuf>,
    pub current_tool: Option<String>,
    pub completed_tools: Vec<String>,
    pub failed_tools: Vec<ToolFailure>,
    pub current_tool_progress: ToolProgress,
    pub stage: Stage,
    pub last_error: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl InstallationState {
    pub fn is_completed(&self, tool: &str) -> bool {
        self.completed_tools.iter().any(|entry| entry == tool)
    }

    pub fn is_failed(&self, tool: &str) -> bool {
        self.failed_tools.iter().any(|entry| entry.tool_id == tool)
    }

    fn next_pending_tool(&self) -> Option<String> {
        self.tools
            .iter()
            .find(|tool| !self.is_completed(tool) && !self.is_failed(tool))
            .cloned()
    }
}

/// Derived read-only view over a resumable record.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeSummary {
    pub variant: String,
    pub stage: Stage,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub remaining: Vec<String>,
    pub current_tool: Option<String>,
    /// Percentage complete of the in-flight tool, 0.0 when nothing is in
    /// flight or its total is unknown.
    pub current_percentage: f64,
}

/// The only component that touches the progress file.
///
/// Every mutating operation persists immediately; persistence is
/// best-effort (failures are logged and swallowed so a state write can
/// never abort an in-progress copy). Reads are defensive: any corruption
/// loads as "no prior state".
#[derive(Debug)]
pub struct StateLedger {
    state_path: PathBuf,
    state: Option<InstallationState>,
}

impl StateLedger {
    pub fn new(config: &InstallerConfig) -> Self {
        Self {
            state_path: config.state_file_path(),
            state: None,
        }
    }

    pub fn state(&self) -> Option<&InstallationState> {
        self.state.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    /// Builds a fresh record with `current_tool = tools[0]` and persists
    /// it. Must be called (or `load` must succeed) before any other
    /// mutating operation.
    pub fn init(
        &mut self,
        variant: &str,
        tools: Vec<String>,
        paths: BTreeMap<String, PathBuf>,
    ) -> Result<&InstallationState> {
        let current_tool = tools.first().cloned();
        let state = InstallationState {
            schema_version: STATE_SCHEMA_VERSION.to_string(),
            session_id: Uuid::new_v4().to_string(),
            variant: variant.to_string(),
            tools,
            paths,
            current_tool: current_tool.clone(),
            completed_tools: Vec::new(),
            failed_tools: Vec::new(),
            current_tool_progress: ToolProgress::reset_for(current_tool.as_deref()),
            stage: Stage::Initializing,
            last_error: None,
            last_updated: Utc::now(),
        };
        self.state = Some(state);
        self.persist();
        self.state
            .as_ref()
            .ok_or_else(|| anyhow!("state ledger failed to initialize"))
    }

    /// Discards progress carried over from an earlier attempt of the
    /// current tool, so a re-attempt's checkpoints start from zero.
    /// A crashed run leaves its in-flight tool in neither the completed
    /// nor the failed set; without this reset its re-attempt would append
    /// onto the stale entries. Completed and failed records are untouched.
    pub fn begin_tool_attempt(&mut self) -> Result<()> {
        let state = self.state_mut()?;
        let current = state.current_tool.clone();
        state.current_tool_progress = ToolProgress::reset_for(current.as_deref());
        self.persist();
        Ok(())
    }

    /// Appends one completed file to the in-flight tool's progress and
    /// persists. Called once per copied file; this is what makes resume
    /// granular to the file level.
    pub fn checkpoint_file(
        &mut self,
        relative_path: &str,
        size: u64,
        total_files: u64,
        total_bytes: u64,
    ) -> Result<()> {
        let state = self.state_mut()?;
        state
            .current_tool_progress
            .files_completed
            .push(relative_path.to_string());
        state.current_tool_progress.bytes_transferred += size;
        state.current_tool_progress.total_files = total_files;
        state.current_tool_progress.total_bytes = total_bytes;
        state.stage = Stage::Installing;
        self.persist();
        Ok(())
    }

    /// Moves `current_tool` into the completed set and advances to the
    /// next pending tool; with none remaining the run terminates in
    /// `Completed` or `Failed` depending on whether any failure occurred.
    pub fn advance_on_success(&mut self) -> Result<()> {
        let state = self.state_mut()?;
        if let Some(tool) = state.current_tool.take() {
            if !state.is_completed(&tool) {
                state.completed_tools.push(tool);
            }
        }
        Self::advance(state);
        self.persist();
        Ok(())
    }

    /// Records a failure for `current_tool` and advances the same way as
    /// success.
    pub fn advance_on_failure(&mut self, message: &str, detail: Option<String>) -> Result<()> {
        let state = self.state_mut()?;
        if let Some(tool) = state.current_tool.take() {
            state.failed_tools.push(ToolFailure {
                tool_id: tool,
                error_message: message.to_string(),
                error_detail: detail,
                timestamp: Utc::now(),
            });
        }
        state.last_error = Some(message.to_string());
        Self::advance(state);
        self.persist();
        Ok(())
    }

    fn advance(state: &mut InstallationState) {
        match state.next_pending_tool() {
            Some(next) => {
                state.current_tool_progress = ToolProgress::reset_for(Some(&next));
                state.current_tool = Some(next);
            }
            None => {
                state.current_tool = None;
                state.current_tool_progress = ToolProgress::reset_for(None);
                state.stage = if state.failed_tools.is_empty() {
                    Stage::Completed
                } else {
                    Stage::Failed
                };
            }
        }
    }

    /// Reads the on-disk record into memory. Absent, unreadable or
    /// unparsable records load as `None`; a schema-version mismatch is
    /// warned about but does not invalidate the record.
    pub fn load(&mut self) -> Option<&InstallationState> {
        let raw = match fs::read_to_string(&self.state_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(
                    path = %self.state_path.display(),
                    error = %err,
                    "failed to read installation state; treating as absent"
                );
                return None;
            }
        };

        let state: InstallationState = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(err) => {
                warn!(
                    path = %self.state_path.display(),
                    error = %err,
                    "installation state is corrupt; treating as absent"
                );
                return None;
            }
        };

        self.state = Some(migrate_state(state));
        self.state.as_ref()
    }

    /// Deletes the on-disk record and resets in-memory state.
    pub fn clear(&mut self) {
        self.state = None;
        match fs::remove_file(&self.state_path) {
            Ok(()) => debug!(path = %self.state_path.display(), "cleared installation state"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => warn!(
                path = %self.state_path.display(),
                error = %err,
                "failed to remove installation state file"
            ),
        }
    }

    pub fn resume_summary(&mut self) -> Option<ResumeSummary> {
        if self.state.is_none() {
            self.load();
        }
        let state = self.state.as_ref()?;

        let remaining = state
            .tools
            .iter()
            .filter(|tool| !state.is_completed(tool) && !state.is_failed(tool))
            .cloned()
            .collect();
        let progress = &state.current_tool_progress;
        let current_percentage = if progress.total_files == 0 {
            0.0
        } else {
            progress.files_completed.len() as f64 / progress.total_files as f64 * 100.0
        };

        Some(ResumeSummary {
            variant: state.variant.clone(),
            stage: state.stage,
            completed: state.completed_tools.clone(),
            failed: state
                .failed_tools
                .iter()
                .map(|failure| failure.tool_id.clone())
                .collect(),
            remaining,
            current_tool: state.current_tool.clone(),
            current_percentage,
        })
    }

    /// True iff a loadable record exists and the run did not complete.
    pub fn has_interrupted(&mut self) -> bool {
        if self.state.is_none() {
            self.load();
        }
        self.state
            .as_ref()
            .is_some_and(|state| state.stage != Stage::Completed)
    }

    fn state_mut(&mut self) -> Result<&mut InstallationState> {
        self.state
            .as_mut()
            .ok_or_else(|| anyhow!("state ledger is not initialized; call init or load first"))
    }

    /// Best-effort write of the in-memory record via temp-file + rename.
    /// The rename is the atomicity boundary: a reader never observes a
    /// half-written record, even across a process kill.
    fn persist(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        state.last_updated = Utc::now();

        let payload = match serde_json::to_string_pretty(state) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize installation state");
                return;
            }
        };

        if let Err(err) = write_atomic(&self.state_path, payload.as_bytes()) {
            warn!(
                path = %self.state_path.display(),
                error = %err,
                "failed to persist installation state"
            );
        }
    }
}

fn write_atomic(path: &Path, payload: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Migration hook keyed by `schema_version`. The current version passes
/// through; unknown versions are loaded as-is with a warning until a
/// migration path exists for them.
fn migrate_state(state: InstallationState) -> InstallationState {
    if state.schema_version != STATE_SCHEMA_VERSION {
        warn!(
            found = %state.schema_version,
            expected = STATE_SCHEMA_VERSION,
            "installation state schema version mismatch; loading without migration"
        );
    }
    state
}
