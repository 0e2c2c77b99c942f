//! Batch state machine.
//!
//! ```text
//! Idle ──submit──▶ Collecting ──begin──▶ Analyzing ──▶ Done | Failed ──purge──▶ Idle
//! ```
//!
//! A batch owns its [`Workspace`]; leaving `Done` or `Failed` always goes
//! through a purge.

use std::fmt;
use std::path::{Path, PathBuf};

use analyzer_core::error::{AnalyzerError, Result};
use analyzer_core::models::Report;
use analyzer_data::analysis::{AnalysisMetadata, AnalysisResult};
use analyzer_report::labels::Labels;
use tracing::{debug, warn};

use crate::workspace::Workspace;

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No raw exports in the workspace.
    Idle,
    /// Raw exports are accumulating.
    Collecting,
    /// An analysis owns the workspace.
    Analyzing,
    /// The analysis finished; a purge is due.
    Done,
    /// The analysis failed or was cancelled; a purge is due.
    Failed,
}

/// How an analysis ended.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Reports were written and delivered.
    Completed {
        artifacts: Vec<PathBuf>,
        report: Report,
        metadata: AnalysisMetadata,
    },
    /// The workspace held no raw exports.
    EmptyInput,
    /// Any other error; `cancelled` when the user stopped the analysis.
    Failed { cancelled: bool, message: String },
}

impl BatchOutcome {
    /// Classify the result of the pipeline.
    pub fn from_result(result: Result<(Vec<PathBuf>, AnalysisResult)>) -> Self {
        match result {
            Ok((artifacts, result)) => Self::Completed {
                artifacts,
                report: result.report,
                metadata: result.metadata,
            },
            Err(AnalyzerError::EmptyInput(_)) => Self::EmptyInput,
            Err(e) => Self::Failed {
                cancelled: matches!(e, AnalyzerError::Cancelled),
                message: e.to_string(),
            },
        }
    }

    /// State the batch moves to after this outcome.
    pub fn final_state(&self) -> BatchState {
        match self {
            Self::Completed { .. } | Self::EmptyInput => BatchState::Done,
            Self::Failed { .. } => BatchState::Failed,
        }
    }

    /// User-facing notice, `None` when the artifacts speak for themselves.
    pub fn notice(&self, labels: &Labels) -> Option<&'static str> {
        match self {
            Self::Completed { .. } => None,
            Self::EmptyInput => Some(labels.empty_input_notice),
            Self::Failed {
                cancelled: true, ..
            } => Some(labels.cancelled_notice),
            Self::Failed { .. } => Some(labels.failure_notice),
        }
    }

    pub fn artifacts(&self) -> &[PathBuf] {
        match self {
            Self::Completed { artifacts, .. } => artifacts,
            _ => &[],
        }
    }
}

/// Summary of the workspace for `status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Idle,
    Pending(usize),
    Running,
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Pending(1) => write!(f, "1 file pending"),
            Self::Pending(n) => write!(f, "{} files pending", n),
            Self::Running => write!(f, "analysis running"),
        }
    }
}

// ── Batch ─────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Batch {
    workspace: Workspace,
    state: BatchState,
}

impl Batch {
    /// Take ownership of `workspace`. Exports left from an earlier run put the
    /// batch straight into `Collecting`.
    pub fn new(workspace: Workspace) -> Self {
        let state = if workspace.pending_files().is_empty() {
            BatchState::Idle
        } else {
            BatchState::Collecting
        };
        Self { workspace, state }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn root(&self) -> &Path {
        self.workspace.root()
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn status(&self) -> BatchStatus {
        if self.state == BatchState::Analyzing || self.workspace.is_locked() {
            return BatchStatus::Running;
        }
        match self.workspace.pending_files().len() {
            0 => BatchStatus::Idle,
            n => BatchStatus::Pending(n),
        }
    }

    /// Copy raw exports into the workspace.
    pub fn submit(&mut self, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        self.ensure_not_analyzing()?;
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            stored.push(self.workspace.submit(file)?);
        }
        if !stored.is_empty() {
            self.transition(BatchState::Collecting);
        }
        Ok(stored)
    }

    /// Enter `Analyzing`. An empty workspace is allowed; the analysis then
    /// ends with the empty-input outcome.
    pub fn begin(&mut self) -> Result<()> {
        self.ensure_not_analyzing()?;
        self.transition(BatchState::Analyzing);
        Ok(())
    }

    /// Record the outcome of the running analysis.
    pub fn finish(&mut self, outcome: &BatchOutcome) {
        if self.state != BatchState::Analyzing {
            warn!(state = ?self.state, "finishing a batch that was not analyzing");
        }
        self.transition(outcome.final_state());
    }

    /// Empty the workspace and return to `Idle`.
    ///
    /// The state is `Idle` afterwards even when some entry could not be
    /// removed; the error is still returned.
    pub fn purge(&mut self) -> Result<usize> {
        self.ensure_not_analyzing()?;
        let result = self.workspace.purge();
        self.transition(BatchState::Idle);
        result
    }

    fn ensure_not_analyzing(&self) -> Result<()> {
        if self.state == BatchState::Analyzing {
            Err(AnalyzerError::Busy(self.workspace.root().to_path_buf()))
        } else {
            Ok(())
        }
    }

    fn transition(&mut self, next: BatchState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "batch state change");
            self.state = next;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            report: Report::default(),
            metadata: AnalysisMetadata {
                generated_at: "2024-03-05T10:00:00Z".to_string(),
                files_processed: 1,
                files_repaired: 0,
                records_merged: 1,
                venues_resolved: 1,
                load_time_seconds: 0.0,
                aggregate_time_seconds: 0.0,
            },
        }
    }

    fn batch_with_file(tmp: &TempDir) -> Batch {
        let src = tmp.path().join("source.xlsx");
        std::fs::write(&src, b"x").unwrap();
        let mut batch = Batch::new(Workspace::open(tmp.path().join("ws")).unwrap());
        batch.submit(&[src]).unwrap();
        batch
    }

    #[test]
    fn test_lifecycle_happy_path() {
        let tmp = TempDir::new().unwrap();
        let mut batch = batch_with_file(&tmp);
        assert_eq!(batch.state(), BatchState::Collecting);
        assert_eq!(batch.status(), BatchStatus::Pending(1));

        batch.begin().unwrap();
        assert_eq!(batch.state(), BatchState::Analyzing);
        assert_eq!(batch.status(), BatchStatus::Running);

        let outcome = BatchOutcome::from_result(Ok((vec![], analysis())));
        batch.finish(&outcome);
        assert_eq!(batch.state(), BatchState::Done);

        batch.purge().unwrap();
        assert_eq!(batch.state(), BatchState::Idle);
        assert_eq!(batch.status(), BatchStatus::Idle);
    }

    #[test]
    fn test_submit_rejected_while_analyzing() {
        let tmp = TempDir::new().unwrap();
        let mut batch = batch_with_file(&tmp);
        batch.begin().unwrap();

        let err = batch.submit(&[tmp.path().join("source.xlsx")]).unwrap_err();
        assert!(matches!(err, AnalyzerError::Busy(_)));
        assert!(matches!(batch.begin().unwrap_err(), AnalyzerError::Busy(_)));
        assert!(matches!(batch.purge().unwrap_err(), AnalyzerError::Busy(_)));
    }

    #[test]
    fn test_new_batch_picks_up_leftovers() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("0.xlsx"), b"x").unwrap();
        let batch = Batch::new(Workspace::open(tmp.path()).unwrap());
        assert_eq!(batch.state(), BatchState::Collecting);
    }

    #[test]
    fn test_outcome_classification() {
        let empty = BatchOutcome::from_result(Err(AnalyzerError::EmptyInput(PathBuf::from("/w"))));
        assert_eq!(empty, BatchOutcome::EmptyInput);
        assert_eq!(empty.final_state(), BatchState::Done);

        let cancelled = BatchOutcome::from_result(Err(AnalyzerError::Cancelled));
        assert!(matches!(
            cancelled,
            BatchOutcome::Failed {
                cancelled: true,
                ..
            }
        ));
        assert_eq!(cancelled.final_state(), BatchState::Failed);

        let failed = BatchOutcome::from_result(Err(AnalyzerError::Render("boom".to_string())));
        assert!(matches!(
            failed,
            BatchOutcome::Failed {
                cancelled: false,
                ..
            }
        ));

        let panicked = AnalyzerError::Other(std::io::Error::other("task panicked").into());
        assert_eq!(
            BatchOutcome::from_result(Err(panicked)),
            BatchOutcome::Failed {
                cancelled: false,
                message: "task panicked".to_string(),
            }
        );
    }

    #[test]
    fn test_outcome_notices() {
        let labels = Labels::italian();
        assert_eq!(
            BatchOutcome::EmptyInput.notice(&labels),
            Some("Non ho trovato file excel (.xlsx), fai l'upload dei file prima.")
        );
        let failed = BatchOutcome::Failed {
            cancelled: false,
            message: "x".to_string(),
        };
        assert_eq!(failed.notice(&labels), Some(labels.failure_notice));
        let done = BatchOutcome::from_result(Ok((vec![PathBuf::from("a.xlsx")], analysis())));
        assert_eq!(done.notice(&labels), None);
        assert_eq!(done.artifacts(), &[PathBuf::from("a.xlsx")]);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(BatchStatus::Idle.to_string(), "idle");
        assert_eq!(BatchStatus::Pending(1).to_string(), "1 file pending");
        assert_eq!(BatchStatus::Pending(3).to_string(), "3 files pending");
        assert_eq!(BatchStatus::Running.to_string(), "analysis running");
    }
}
