mod bootstrap;

use anyhow::Result;
use analyzer_core::error::AnalyzerError;
use analyzer_core::settings::{Command, Settings};
use analyzer_report::labels::Labels;
use analyzer_report::summary::render_summary;
use analyzer_runtime::batch::BatchOutcome;
use analyzer_runtime::runner::{BatchEvent, BatchRunner, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories(&settings)?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Box-office analyzer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        workspace = %settings.workspace_dir().display(),
        output = %settings.output_dir().display(),
        labels = %settings.labels,
        timezone = %settings.timezone,
        "settings resolved"
    );

    let runner = bootstrap::build_runner(&settings)?;
    let labels = runner.config().labels.clone();

    let result = match settings.action() {
        Command::Submit { files } => runner.submit(&files).map(|stored| {
            println!("{} file(s) added, {}", stored.len(), runner.status());
        }),
        Command::Status => {
            println!("{}", runner.status());
            Ok(())
        }
        Command::Purge => runner.purge().map(|removed| {
            println!("{} entries removed", removed);
        }),
        Command::Analyze { format } => match format.parse::<OutputFormat>() {
            Ok(format) => run_analysis(&runner, format, &labels).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => Ok(()),
        Err(AnalyzerError::Busy(_)) => {
            eprintln!("{}", labels.busy_notice);
            std::process::exit(2);
        }
        Err(e) => Err(e.into()),
    }
}

/// Run one analysis, following its progress and cancelling it on Ctrl+C.
async fn run_analysis(
    runner: &BatchRunner,
    format: OutputFormat,
    labels: &Labels,
) -> analyzer_core::Result<()> {
    let (mut rx, handle) = runner.start(format)?;
    let cancel = handle.cancel_flag();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(BatchEvent::Progress(message)) => eprintln!("{}", message),
                Some(BatchEvent::StateChanged(state)) => tracing::debug!(?state, "batch state"),
                Some(BatchEvent::Finished(_)) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c(), if !cancel.is_cancelled() => {
                tracing::info!("Ctrl+C received; cancelling analysis");
                cancel.cancel();
            }
        }
    }

    let outcome = handle.join().await;
    if let BatchOutcome::Completed {
        artifacts,
        report,
        metadata,
    } = &outcome
    {
        print!("{}", render_summary(report, labels));
        println!();
        for artifact in artifacts {
            println!("Report written: {}", artifact.display());
        }
        tracing::info!(
            files = metadata.files_processed,
            repaired = metadata.files_repaired,
            records = metadata.records_merged,
            "analysis summary"
        );
    }
    if let Some(notice) = outcome.notice(labels) {
        println!("{}", notice);
    }
    Ok(())
}
