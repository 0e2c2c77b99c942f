//! The directory where raw exports accumulate between analyses.
//!
//! Everything in it is transient: after each analysis, successful or not,
//! the whole directory is emptied except for a few protected entries.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use analyzer_core::error::{AnalyzerError, Result};
use analyzer_data::reader::{find_spreadsheet_files, SPREADSHEET_EXTENSION};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Marker held while an analysis owns the workspace.
pub const LOCK_FILE: &str = ".analysis.lock";

/// How long a lock file without a readable PID is honoured after its last
/// write.
const UNREADABLE_LOCK_GRACE: Duration = Duration::from_secs(60);

/// Entries a purge never removes.
pub const PROTECTED_ENTRIES: &[&str] = &[LOCK_FILE, ".keep", "registry.json"];

/// Handle to a workspace directory.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open the workspace at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy `source` into the workspace as `<n>.xlsx`, `n` being the first
    /// free index. Returns the stored path.
    pub fn submit(&self, source: &Path) -> Result<PathBuf> {
        if !source.is_file() {
            return Err(AnalyzerError::FileRead {
                path: source.to_path_buf(),
                source: std::io::Error::new(ErrorKind::NotFound, "not a file"),
            });
        }

        let mut index = self.pending_files().len();
        let target = loop {
            let candidate = self
                .root
                .join(format!("{}.{}", index, SPREADSHEET_EXTENSION));
            if !candidate.exists() {
                break candidate;
            }
            index += 1;
        };

        std::fs::copy(source, &target).map_err(|e| AnalyzerError::FileRead {
            path: source.to_path_buf(),
            source: e,
        })?;
        debug!(source = %source.display(), stored = %target.display(), "export submitted");
        Ok(target)
    }

    /// Raw exports waiting for analysis, sorted by path.
    pub fn pending_files(&self) -> Vec<PathBuf> {
        find_spreadsheet_files(&self.root)
    }

    /// Remove every file and directory except [`PROTECTED_ENTRIES`].
    ///
    /// Keeps going past entries it cannot remove and reports the first
    /// failure once everything else is gone. Returns the number of entries
    /// removed.
    pub fn purge(&self) -> Result<usize> {
        let mut removed = 0usize;
        let mut first_error: Option<AnalyzerError> = None;

        let entries = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok());

        for entry in entries {
            let name = entry.file_name().to_string_lossy();
            if PROTECTED_ENTRIES.contains(&name.as_ref()) {
                continue;
            }
            let path = entry.path();
            let result = if entry.file_type().is_dir() {
                std::fs::remove_dir_all(path)
            } else {
                std::fs::remove_file(path)
            };
            match result {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to purge entry");
                    first_error.get_or_insert(AnalyzerError::Io(e));
                }
            }
        }

        info!(workspace = %self.root.display(), removed, "workspace purged");
        match first_error {
            Some(e) => Err(e),
            None => Ok(removed),
        }
    }

    /// `true` while a live process holds the analysis lock.
    pub fn is_locked(&self) -> bool {
        let path = self.root.join(LOCK_FILE);
        path.exists() && !is_stale(&path)
    }

    /// Take the analysis lock. Fails with [`AnalyzerError::Busy`] when
    /// another analysis, in this or another process, holds it.
    ///
    /// A lock left behind by a process that no longer runs is taken over.
    pub fn lock(&self) -> Result<WorkspaceLock> {
        let path = self.root.join(LOCK_FILE);

        let mut attempt = create_lock(&path);
        let taken = matches!(&attempt, Err(e) if e.kind() == ErrorKind::AlreadyExists);
        if taken && is_stale(&path) {
            warn!(
                path = %path.display(),
                holder = ?lock_holder(&path),
                "taking over stale workspace lock"
            );
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(AnalyzerError::Io(e)),
            }
            attempt = create_lock(&path);
        }

        match attempt {
            Ok(()) => {
                debug!(path = %path.display(), "workspace lock taken");
                Ok(WorkspaceLock { path: Some(path) })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(AnalyzerError::Busy(self.root.clone()))
            }
            Err(e) => Err(AnalyzerError::Io(e)),
        }
    }
}

fn create_lock(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", std::process::id())
}

/// PID recorded in the lock file.
fn lock_holder(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// The recorded process is gone, or no process is recorded and the file has
/// not been written for [`UNREADABLE_LOCK_GRACE`].
fn is_stale(path: &Path) -> bool {
    match lock_holder(path) {
        Some(pid) => !process_alive(pid),
        None => std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .is_some_and(|age| age > UNREADABLE_LOCK_GRACE),
    }
}

fn process_alive(pid: u32) -> bool {
    if pid == std::process::id() {
        return true;
    }
    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}

/// Held analysis lock; the lock file is removed on release or drop.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: Option<PathBuf>,
}

impl WorkspaceLock {
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove workspace lock");
            } else {
                debug!(path = %path.display(), "workspace lock released");
            }
        }
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        self.remove();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
