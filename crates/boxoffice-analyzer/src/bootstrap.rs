use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use analyzer_core::office::{LibreOffice, OfficeConfig, OfficeSuite};
use analyzer_core::registry::AnalyzerConfig;
use analyzer_core::settings::{Settings, APP_DIR};
use analyzer_core::time_utils::resolve_timezone;
use analyzer_report::labels::Labels;
use analyzer_runtime::runner::{BatchRunner, RunnerConfig};
use analyzer_runtime::workspace::Workspace;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the per-user directory hierarchy exists.
///
/// Creates, if absent:
/// - `~/.boxoffice-analyzer/logs/`
/// - the workspace directory
/// - the report output directory
pub fn ensure_directories(settings: &Settings) -> anyhow::Result<()> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(home.join(APP_DIR).join("logs"))?;
    std::fs::create_dir_all(settings.workspace_dir())?;
    std::fs::create_dir_all(settings.output_dir())?;
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to a `tracing` filter directive.
fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        other => other.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so that stdout only carries results. When `log_file`
/// is given, the same events are appended to it without colours.
/// `RUST_LOG`, when set, takes precedence over `log_level`.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

// ── Runner assembly ────────────────────────────────────────────────────────────

pub fn office_suite(settings: &Settings) -> LibreOffice {
    LibreOffice::new(&OfficeConfig {
        soffice_path: settings.soffice_path.clone(),
        timeout_ms: Some(settings.office_timeout_ms),
    })
}

/// Everything an analysis needs, resolved from the settings.
pub fn runner_config(settings: &Settings) -> anyhow::Result<RunnerConfig> {
    let analyzer = AnalyzerConfig::load(settings.config.as_deref())?;
    Ok(RunnerConfig {
        analyzer,
        labels: Labels::from_name(&settings.labels),
        timezone: resolve_timezone(&settings.timezone),
        output_dir: settings.output_dir(),
    })
}

pub fn build_runner(settings: &Settings) -> anyhow::Result<BatchRunner> {
    let office = office_suite(settings);
    if !office.is_available() {
        tracing::warn!(
            "office suite not found; damaged exports cannot be repaired and PDF output is unavailable"
        );
    }
    let workspace = Workspace::open(settings.workspace_dir())?;
    Ok(BatchRunner::new(
        workspace,
        Arc::new(office),
        runner_config(settings)?,
    ))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
