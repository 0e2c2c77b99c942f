//! Headless office-suite collaborator.
//!
//! Some exports are written by tools that produce workbooks the spreadsheet
//! reader rejects; opening them in a real office suite and saving them again
//! yields a well-formed file. The same suite renders the paginated report to
//! PDF.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio::runtime::{Builder, Handle};
use tokio::time;
use tracing::{debug, info};

use crate::error::{AnalyzerError, Result};

/// Default location of the LibreOffice binary.
pub const DEFAULT_SOFFICE_PATH: &str = "/usr/bin/soffice";

/// Default per-invocation timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Operations the analyzer needs from an office suite.
///
/// Implementations block; call them from synchronous code such as the
/// blocking pool, never from inside an async task.
pub trait OfficeSuite: Send + Sync {
    /// Open `path` and save it back in place in `.xlsx` format.
    fn resave(&self, path: &Path) -> Result<()>;

    /// Export the workbook at `path` to a PDF placed in `out_dir`, one page
    /// per worksheet. Returns the PDF path (`<stem>.pdf`).
    fn export_pdf(&self, path: &Path, out_dir: &Path) -> Result<PathBuf>;

    /// `true` when the suite can be invoked at all.
    fn is_available(&self) -> bool;
}

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct OfficeConfig {
    pub soffice_path: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
}

// ── LibreOffice ───────────────────────────────────────────────────────────────

/// [`OfficeSuite`] backed by `soffice --headless --convert-to`.
pub struct LibreOffice {
    soffice_path: PathBuf,
    timeout: Duration,
}

impl LibreOffice {
    pub fn new(config: &OfficeConfig) -> Self {
        Self {
            soffice_path: config
                .soffice_path
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOFFICE_PATH)),
            timeout: Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        }
    }

    /// Run `soffice --convert-to <filter>` on `input`, writing into `out_dir`.
    fn convert(&self, input: &Path, filter: &str, out_dir: &Path) -> Result<()> {
        let abs_input = input
            .canonicalize()
            .map_err(|e| AnalyzerError::Office(format!("failed to canonicalize path: {}", e)))?;

        let mut command = Command::new(&self.soffice_path);
        command
            .arg("--headless")
            .arg("--norestore")
            .arg("--nofirststartwizard")
            .arg("--nolockcheck")
            .arg("--convert-to")
            .arg(filter)
            .arg("--outdir")
            .arg(out_dir)
            .arg(&abs_input);

        let output = run_with_timeout(command, self.timeout)?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !stdout.trim().is_empty() || !stderr.trim().is_empty() {
            debug!(
                soffice_stdout = %stdout.trim(),
                soffice_stderr = %stderr.trim(),
                "soffice conversion output"
            );
        }

        if !output.status.success() {
            return Err(AnalyzerError::Office(format!(
                "soffice failed (exit {}): stderr={}, stdout={}",
                output.status.code().unwrap_or(-1),
                stderr.trim(),
                stdout.trim()
            )));
        }
        Ok(())
    }
}

impl OfficeSuite for LibreOffice {
    fn resave(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        let scratch = parent.join(".repair");
        std::fs::create_dir_all(&scratch)?;

        let result = self
            .convert(path, "xlsx:Calc MS Excel 2007 XML", &scratch)
            .and_then(|()| {
                let file_name = path
                    .file_stem()
                    .map(|stem| format!("{}.xlsx", stem.to_string_lossy()))
                    .ok_or_else(|| AnalyzerError::Office("path has no file name".to_string()))?;
                let repaired = scratch.join(file_name);
                if !repaired.exists() {
                    return Err(AnalyzerError::Office(format!(
                        "repaired file not created at {}",
                        repaired.display()
                    )));
                }
                std::fs::rename(&repaired, path)?;
                Ok(())
            });

        let _ = std::fs::remove_dir_all(&scratch);
        if result.is_ok() {
            info!(path = %path.display(), "workbook repaired by office suite");
        }
        result
    }

    fn export_pdf(&self, path: &Path, out_dir: &Path) -> Result<PathBuf> {
        self.convert(path, "pdf", out_dir)?;

        let stem = path
            .file_stem()
            .ok_or_else(|| AnalyzerError::Office("path has no file name".to_string()))?;
        let pdf = out_dir.join(format!("{}.pdf", stem.to_string_lossy()));
        if !pdf.exists() {
            return Err(AnalyzerError::Office(format!(
                "PDF output file not created at {}",
                pdf.display()
            )));
        }
        Ok(pdf)
    }

    fn is_available(&self) -> bool {
        self.soffice_path.exists()
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

/// Run `command` to completion, collecting its output, and kill it once
/// `timeout` elapses.
///
/// Runs on the ambient tokio runtime when there is one, otherwise on a
/// throwaway current-thread runtime.
fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Output> {
    command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let run = async move {
        time::timeout(timeout, command.output())
            .await
            .map_err(|_| AnalyzerError::Office(format!("soffice timed out after {:?}", timeout)))?
            .map_err(|e| AnalyzerError::Office(format!("failed to spawn soffice: {}", e)))
    };

    match Handle::try_current() {
        Ok(handle) => handle.block_on(run),
        Err(_) => Builder::new_current_thread().enable_all().build()?.block_on(run),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let office = LibreOffice::new(&OfficeConfig::default());
        assert_eq!(office.soffice_path, PathBuf::from(DEFAULT_SOFFICE_PATH));
        assert_eq!(office.timeout, Duration::from_millis(DEFAULT_TIMEOUT_MS));
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let office = LibreOffice::new(&OfficeConfig {
            soffice_path: Some(PathBuf::from("/definitely/not/soffice")),
            timeout_ms: Some(1_000),
        });
        assert!(!office.is_available());
    }

    #[test]
    fn test_resave_with_missing_binary_fails_and_cleans_scratch() {
        let tmp = TempDir::new().expect("tempdir");
        let file = tmp.path().join("0.xlsx");
        std::fs::write(&file, b"not a workbook").expect("write");

        let office = LibreOffice::new(&OfficeConfig {
            soffice_path: Some(PathBuf::from("/definitely/not/soffice")),
            timeout_ms: Some(1_000),
        });
        let err = office.resave(&file).unwrap_err();
        assert!(matches!(err, AnalyzerError::Office(_)));
        assert!(!tmp.path().join(".repair").exists());
        assert!(file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_kills_slow_process() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let err = run_with_timeout(command, Duration::from_millis(200)).unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_collects_output() {
        let mut command = Command::new("echo");
        command.arg("hello");
        let output = run_with_timeout(command, Duration::from_secs(5)).expect("run");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_with_timeout_drains_large_output() {
        // Far more than a pipe buffer on both streams.
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg("head -c 200000 /dev/zero; head -c 100000 /dev/zero >&2; exit 0");
        let started = std::time::Instant::now();
        let output = run_with_timeout(command, Duration::from_secs(10)).expect("run");
        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 200_000);
        assert_eq!(output.stderr.len(), 100_000);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_with_timeout_on_blocking_pool() {
        let output = tokio::task::spawn_blocking(|| {
            let mut command = Command::new("sh");
            command.arg("-c").arg("head -c 200000 /dev/zero");
            run_with_timeout(command, Duration::from_secs(10))
        })
        .await
        .expect("join")
        .expect("run");
        assert_eq!(output.stdout.len(), 200_000);

        let err = tokio::task::spawn_blocking(|| {
            let mut command = Command::new("sleep");
            command.arg("5");
            run_with_timeout(command, Duration::from_millis(200))
        })
        .await
        .expect("join")
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
