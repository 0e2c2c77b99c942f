//! Async batch runner.
//!
//! Runs one analysis at a time in a tokio task, sending [`BatchEvent`]s
//! through an `mpsc` channel so the caller can follow progress without any
//! shared mutable state. The pipeline itself is synchronous and runs on the
//! blocking pool.
//!
//! The channel is unbounded: an analysis emits a handful of state events and
//! one progress event per venue, and sending never waits on the reader.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use analyzer_core::cancel::CancelFlag;
use analyzer_core::error::{AnalyzerError, Result};
use analyzer_core::office::OfficeSuite;
use analyzer_core::progress::ProgressReporter;
use analyzer_core::registry::AnalyzerConfig;
use analyzer_core::time_utils::today;
use analyzer_data::analysis::{analyze_workspace, AnalysisResult};
use analyzer_report::labels::Labels;
use analyzer_report::paginated::PaginatedRenderer;
use analyzer_report::workbook::WorkbookRenderer;
use analyzer_report::ReportRenderer;
use chrono_tz::Tz;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::batch::{Batch, BatchOutcome, BatchState, BatchStatus};
use crate::workspace::{Workspace, WorkspaceLock};

/// Scratch directory, inside the workspace, where artifacts are rendered
/// before delivery.
const STAGING_DIR: &str = ".staging";

// ── Public types ──────────────────────────────────────────────────────────────

/// Which artifacts an analysis produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Workbook,
    Pdf,
    Both,
}

impl OutputFormat {
    pub fn includes_workbook(self) -> bool {
        matches!(self, Self::Workbook | Self::Both)
    }

    pub fn includes_pdf(self) -> bool {
        matches!(self, Self::Pdf | Self::Both)
    }
}

impl FromStr for OutputFormat {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "workbook" => Ok(Self::Workbook),
            "pdf" => Ok(Self::Pdf),
            "both" => Ok(Self::Both),
            other => Err(AnalyzerError::Config(format!(
                "unknown report format \"{}\"",
                other
            ))),
        }
    }
}

/// Everything an analysis needs besides the workspace and the office suite.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub analyzer: AnalyzerConfig,
    pub labels: Labels,
    /// Timezone of the date embedded in artifact names.
    pub timezone: Tz,
    /// Where finished artifacts are delivered.
    pub output_dir: PathBuf,
}

/// Notifications sent while an analysis runs.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    StateChanged(BatchState),
    /// A progress message such as `"Processing venue Troisi"`.
    Progress(String),
    /// Always the last event of an analysis.
    Finished(BatchOutcome),
}

// ── BatchRunner ───────────────────────────────────────────────────────────────

/// Owns the batch and serializes access to it.
///
/// Every operation uses `try_lock`: while an analysis is running, other
/// requests are rejected with [`AnalyzerError::Busy`] instead of waiting.
pub struct BatchRunner {
    root: PathBuf,
    batch: Arc<Mutex<Batch>>,
    office: Arc<dyn OfficeSuite>,
    config: Arc<RunnerConfig>,
}

impl BatchRunner {
    pub fn new(workspace: Workspace, office: Arc<dyn OfficeSuite>, config: RunnerConfig) -> Self {
        Self {
            root: workspace.root().to_path_buf(),
            batch: Arc::new(Mutex::new(Batch::new(workspace))),
            office,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn status(&self) -> BatchStatus {
        match self.batch.try_lock() {
            Ok(batch) => batch.status(),
            Err(_) => BatchStatus::Running,
        }
    }

    /// Copy raw exports into the workspace.
    ///
    /// Holds the workspace lock while copying, so exports are never added
    /// under an analysis running in another process.
    pub fn submit(&self, files: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut batch = self.batch.try_lock().map_err(|_| self.busy())?;
        let lock = batch.workspace().lock()?;
        let stored = batch.submit(files);
        lock.release();
        let stored = stored?;
        info!(count = stored.len(), "exports submitted");
        Ok(stored)
    }

    /// Discard every pending export.
    pub fn purge(&self) -> Result<usize> {
        let mut batch = self.batch.try_lock().map_err(|_| self.busy())?;
        let lock = batch.workspace().lock()?;
        let result = batch.purge();
        lock.release();
        result
    }

    /// Start an analysis in the background.
    ///
    /// Returns the event receiver and a handle to cancel or await the
    /// analysis. Fails with [`AnalyzerError::Busy`] when another analysis,
    /// in this or another process, holds the workspace.
    ///
    /// Events are buffered, so the receiver may be read before, during or
    /// after [`AnalysisHandle::join`], or dropped.
    pub fn start(
        &self,
        format: OutputFormat,
    ) -> Result<(mpsc::UnboundedReceiver<BatchEvent>, AnalysisHandle)> {
        let mut batch = self
            .batch
            .clone()
            .try_lock_owned()
            .map_err(|_| self.busy())?;
        let lock = batch.workspace().lock()?;
        batch.begin()?;

        let cancel = CancelFlag::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let job = AnalysisJob {
            office: Arc::clone(&self.office),
            config: Arc::clone(&self.config),
            cancel: cancel.clone(),
            format,
            tx,
        };
        let handle = tokio::spawn(job.run(batch, lock));

        Ok((rx, AnalysisHandle { handle, cancel }))
    }

    /// Run an analysis to completion, logging its progress.
    pub async fn analyze(&self, format: OutputFormat) -> Result<BatchOutcome> {
        let (mut rx, handle) = self.start(format)?;
        while let Some(event) = rx.recv().await {
            debug!(?event, "batch event");
        }
        Ok(handle.join().await)
    }

    fn busy(&self) -> AnalyzerError {
        AnalyzerError::Busy(self.root.clone())
    }
}

// ── AnalysisHandle ────────────────────────────────────────────────────────────

/// A handle to a running analysis.
#[derive(Debug)]
pub struct AnalysisHandle {
    handle: JoinHandle<BatchOutcome>,
    cancel: CancelFlag,
}

impl AnalysisHandle {
    /// Ask the analysis to stop at the next checkpoint. The workspace is
    /// still purged.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Wait for the analysis to end.
    pub async fn join(self) -> BatchOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => BatchOutcome::from_result(Err(AnalyzerError::Other(e.into()))),
        }
    }
}

// ── Private implementation ────────────────────────────────────────────────────

struct AnalysisJob {
    office: Arc<dyn OfficeSuite>,
    config: Arc<RunnerConfig>,
    cancel: CancelFlag,
    format: OutputFormat,
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl AnalysisJob {
    /// Run the pipeline, then purge unconditionally and release the lock.
    async fn run(self, mut batch: OwnedMutexGuard<Batch>, lock: WorkspaceLock) -> BatchOutcome {
        self.emit(BatchEvent::StateChanged(BatchState::Analyzing));

        let root = batch.root().to_path_buf();
        let office = Arc::clone(&self.office);
        let config = Arc::clone(&self.config);
        let cancel = self.cancel.clone();
        let format = self.format;
        let progress = ChannelProgress {
            tx: self.tx.clone(),
        };

        let joined = tokio::task::spawn_blocking(move || {
            run_pipeline(&root, &config, office.as_ref(), &progress, &cancel, format)
        })
        .await;

        let outcome = BatchOutcome::from_result(
            joined.unwrap_or_else(|e| Err(AnalyzerError::Other(e.into()))),
        );
        match &outcome {
            BatchOutcome::Completed { artifacts, .. } => {
                info!(artifacts = artifacts.len(), "analysis delivered")
            }
            BatchOutcome::EmptyInput => info!("nothing to analyze"),
            BatchOutcome::Failed { message, .. } => error!(error = %message, "analysis failed"),
        }

        batch.finish(&outcome);
        self.emit(BatchEvent::StateChanged(batch.state()));

        if let Err(e) = batch.purge() {
            warn!(error = %e, "workspace purge incomplete");
        }
        lock.release();
        self.emit(BatchEvent::StateChanged(batch.state()));

        self.emit(BatchEvent::Finished(outcome.clone()));
        outcome
    }

    fn emit(&self, event: BatchEvent) {
        if self.tx.send(event).is_err() {
            debug!("batch event receiver dropped");
        }
    }
}

/// Forwards renderer progress to the event channel.
struct ChannelProgress {
    tx: mpsc::UnboundedSender<BatchEvent>,
}

impl ProgressReporter for ChannelProgress {
    fn report(&self, message: &str) {
        info!(target: "progress", "{}", message);
        let _ = self.tx.send(BatchEvent::Progress(message.to_string()));
    }
}

/// Analyze the workspace, render every requested artifact into the staging
/// directory and, only when all of them succeeded, deliver them.
fn run_pipeline(
    root: &Path,
    config: &RunnerConfig,
    office: &dyn OfficeSuite,
    progress: &dyn ProgressReporter,
    cancel: &CancelFlag,
    format: OutputFormat,
) -> Result<(Vec<PathBuf>, AnalysisResult)> {
    let result = analyze_workspace(root, &config.analyzer, office, cancel)?;
    let date = today(config.timezone);

    let mut renderers: Vec<Box<dyn ReportRenderer + '_>> = Vec::new();
    if format.includes_workbook() {
        renderers.push(Box::new(WorkbookRenderer::new(&config.labels)));
    }
    if format.includes_pdf() {
        renderers.push(Box::new(PaginatedRenderer::new(
            &config.labels,
            office,
            progress,
            cancel,
        )));
    }

    let staging = root.join(STAGING_DIR);
    std::fs::create_dir_all(&staging)?;
    let mut staged = Vec::with_capacity(renderers.len());
    for renderer in &renderers {
        cancel.check()?;
        staged.push(renderer.render(&result.report, &staging, date)?);
    }

    cancel.check()?;
    std::fs::create_dir_all(&config.output_dir)?;
    let artifacts = staged
        .iter()
        .map(|path| deliver(path, &config.output_dir))
        .collect::<Result<Vec<_>>>()?;

    Ok((artifacts, result))
}

/// Copy an artifact into `out_dir`, keeping its file name.
fn deliver(artifact: &Path, out_dir: &Path) -> Result<PathBuf> {
    let name = artifact
        .file_name()
        .ok_or_else(|| AnalyzerError::Render(format!("artifact {} has no name", artifact.display())))?;
    let target = out_dir.join(name);
    std::fs::copy(artifact, &target)?;
    info!(path = %target.display(), "artifact delivered");
    Ok(target)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
