use clap::{CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-user state directory under the home directory.
pub const APP_DIR: &str = ".boxoffice-analyzer";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Batch analysis of cinema box-office exports
#[derive(Parser, Debug, Clone)]
#[command(
    name = "boxoffice-analyzer",
    about = "Batch analysis of cinema box-office exports",
    version
)]
pub struct Settings {
    /// Workspace directory collecting the raw exports
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Directory receiving finished reports
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// JSON file with the venue registry, column names and sheet layout
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Timezone used for the date in report names (auto-detected if not specified)
    #[arg(long, global = true, default_value = "auto")]
    pub timezone: String,

    /// Language of the report labels
    #[arg(long, global = true, default_value = "en", value_parser = ["en", "it"])]
    pub labels: String,

    /// Path to the LibreOffice binary
    #[arg(long, global = true)]
    pub soffice_path: Option<PathBuf>,

    /// Timeout for a single office-suite invocation, in milliseconds
    #[arg(long, global = true, default_value_t = crate::office::DEFAULT_TIMEOUT_MS)]
    pub office_timeout_ms: u64,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Forget the remembered settings
    #[arg(long, global = true)]
    pub clear: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do with the workspace.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add raw exports to the workspace
    Submit {
        /// Spreadsheet files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Analyze every submitted export, deliver the report and purge the workspace
    Analyze {
        /// Report format
        #[arg(long, default_value = "workbook", value_parser = ["workbook", "pdf", "both"])]
        format: String,
    },
    /// Show the state of the workspace
    Status,
    /// Delete every submitted export
    Purge,
}

// ── Remembered settings ────────────────────────────────────────────────────────

/// Directory, registry, timezone and label choices carried between runs.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soffice_path: Option<PathBuf>,
}

impl LastUsedParams {
    /// `~/.boxoffice-analyzer/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR).join("last_used.json")
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Write through a sibling temp file and rename it into place.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Resolution ─────────────────────────────────────────────────────────────────

impl Settings {
    /// Settings for this run: command-line values first, then the values
    /// remembered from the previous run, then the defaults. The merged result
    /// is remembered for the next run.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);
        let base_dir = config_path
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(home_dir);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_defaults(settings, &base_dir);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins; clap keys args by field name.
        if !is_arg_explicitly_set(&matches, "workspace") && settings.workspace.is_none() {
            settings.workspace = last.workspace;
        }
        if !is_arg_explicitly_set(&matches, "output_dir") && settings.output_dir.is_none() {
            settings.output_dir = last.output_dir;
        }
        if !is_arg_explicitly_set(&matches, "config") && settings.config.is_none() {
            settings.config = last.config;
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "labels") {
            if let Some(v) = last.labels {
                settings.labels = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "soffice_path") && settings.soffice_path.is_none() {
            settings.soffice_path = last.soffice_path;
        }

        settings = Self::resolve_defaults(settings, &base_dir);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Fill unset directories, resolve `"auto"` and apply `--debug`.
    fn resolve_defaults(mut settings: Settings, base_dir: &Path) -> Settings {
        let app_dir = base_dir.join(APP_DIR);
        if settings.workspace.is_none() {
            settings.workspace = Some(app_dir.join("workspace"));
        }
        if settings.output_dir.is_none() {
            settings.output_dir = Some(app_dir.join("reports"));
        }

        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }

    /// Workspace directory; always set after loading.
    pub fn workspace_dir(&self) -> PathBuf {
        self.workspace
            .clone()
            .unwrap_or_else(|| home_dir().join(APP_DIR).join("workspace"))
    }

    /// Report output directory; always set after loading.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(APP_DIR).join("reports"))
    }

    /// The subcommand to run, `status` when none was given.
    pub fn action(&self) -> Command {
        self.command.clone().unwrap_or(Command::Status)
    }
}

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            workspace: s.workspace.clone(),
            output_dir: s.output_dir.clone(),
            config: s.config.clone(),
            timezone: Some(s.timezone.clone()),
            labels: Some(s.labels.clone()),
            soffice_path: s.soffice_path.clone(),
        }
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────────

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Typed on the command line, as opposed to a default.
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    #[test]
    fn test_remembered_settings_round_trip() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            workspace: Some(PathBuf::from("/data/ws")),
            output_dir: Some(PathBuf::from("/data/out")),
            config: None,
            timezone: Some("Europe/Rome".to_string()),
            labels: Some("it".to_string()),
            soffice_path: Some(PathBuf::from("/opt/lo/soffice")),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_remembered_settings_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            labels: Some("it".to_string()),
            ..Default::default()
        };
        params.save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing_or_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["boxoffice-analyzer"]);

        assert!(settings.workspace.is_none());
        assert!(settings.output_dir.is_none());
        assert!(settings.config.is_none());
        assert_eq!(settings.timezone, "auto");
        assert_eq!(settings.labels, "en");
        assert_eq!(settings.office_timeout_ms, crate::office::DEFAULT_TIMEOUT_MS);
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(!settings.clear);
        assert_eq!(settings.action(), Command::Status);
    }

    #[test]
    fn test_settings_subcommands() {
        let settings = Settings::parse_from(["boxoffice-analyzer", "analyze", "--format", "pdf"]);
        assert_eq!(
            settings.action(),
            Command::Analyze {
                format: "pdf".to_string()
            }
        );

        let settings = Settings::parse_from(["boxoffice-analyzer", "analyze"]);
        assert_eq!(
            settings.action(),
            Command::Analyze {
                format: "workbook".to_string()
            }
        );

        let settings = Settings::parse_from(["boxoffice-analyzer", "submit", "a.xlsx", "b.xlsx"]);
        assert_eq!(
            settings.action(),
            Command::Submit {
                files: vec![PathBuf::from("a.xlsx"), PathBuf::from("b.xlsx")]
            }
        );
    }

    #[test]
    fn test_settings_rejects_unknown_format() {
        let result =
            Settings::try_parse_from(["boxoffice-analyzer", "analyze", "--format", "docx"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_submit_requires_files() {
        assert!(Settings::try_parse_from(["boxoffice-analyzer", "submit"]).is_err());
    }

    #[test]
    fn test_load_with_last_used_fills_default_directories() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let settings = Settings::load_with_last_used_impl(
            vec!["boxoffice-analyzer".into(), "--timezone".into(), "UTC".into()],
            &config_path,
        );
        assert_eq!(
            settings.workspace_dir(),
            tmp.path().join(APP_DIR).join("workspace")
        );
        assert_eq!(settings.output_dir(), tmp.path().join(APP_DIR).join("reports"));
        assert_eq!(settings.timezone, "UTC");
    }

    #[test]
    fn test_load_with_last_used_merges_persisted_labels() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            labels: Some("it".to_string()),
            timezone: Some("Europe/Rome".to_string()),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["boxoffice-analyzer".into()], &config_path);
        assert_eq!(settings.labels, "it");
        assert_eq!(settings.timezone, "Europe/Rome");
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            labels: Some("it".to_string()),
            workspace: Some(PathBuf::from("/old/ws")),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec![
                "boxoffice-analyzer".into(),
                "--labels".into(),
                "en".into(),
                "--workspace".into(),
                "/new/ws".into(),
            ],
            &config_path,
        );
        assert_eq!(settings.labels, "en");
        assert_eq!(settings.workspace_dir(), PathBuf::from("/new/ws"));
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            labels: Some("it".to_string()),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["boxoffice-analyzer".into(), "--clear".into()],
            &config_path,
        );

        assert!(!config_path.exists());
        assert_eq!(settings.labels, "en");
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let settings = Settings::load_with_last_used_impl(
            vec!["boxoffice-analyzer".into(), "--debug".into()],
            &config_path,
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            vec![
                "boxoffice-analyzer".into(),
                "--labels".into(),
                "it".into(),
                "status".into(),
            ],
            &config_path,
        );

        assert!(config_path.exists(), "config file must be persisted after run");
        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.labels, Some("it".to_string()));
        assert!(loaded.workspace.is_some());
    }
}
