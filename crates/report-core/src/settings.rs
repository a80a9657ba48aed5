use clap::{CommandFactory, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::{ReportError, Result};
use crate::models::{BucketEdges, HistogramBasis, MeridiemMode, Medium};

/// Directory under the home directory holding persisted state.
pub const APP_DIR_NAME: &str = ".attendance-report";

// ── Enumerated options ─────────────────────────────────────────────────────────

/// Which region resolver backs the lookup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Query ipinfo.io for each participant address.
    Ipinfo,
    /// Read identifier → region pairs from `--region-map`.
    Static,
}

/// Which artifacts to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Html,
    Csv,
    Both,
}

impl OutputFormat {
    pub fn wants_html(&self) -> bool {
        matches!(self, OutputFormat::Html | OutputFormat::Both)
    }

    pub fn wants_csv(&self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Attendance analysis and report generation
#[derive(Parser, Debug, Clone)]
#[command(
    name = "attendance-report",
    about = "Region and duration report for meeting attendance sheets",
    version
)]
pub struct Settings {
    /// Attendance sheet (.csv, .xlsx, .xls) or a directory of sheets
    pub input: Option<PathBuf>,

    /// Medium whose region allow-list is reported
    #[arg(long, value_enum, default_value = "hindi")]
    pub medium: Medium,

    /// Column holding the session identifier
    #[arg(long, default_value = "Meeting ID")]
    pub session_column: String,

    /// Column holding the participant identifier (IP address)
    #[arg(long, default_value = "User Type")]
    pub participant_column: String,

    /// Column holding the start time
    #[arg(long, default_value = "Archiving")]
    pub start_column: String,

    /// Column holding free text with an embedded HH:MM:SS AM/PM time
    #[arg(long, default_value = "Phone")]
    pub embedded_column: String,

    /// Optional column with free-text location, used when lookup fails
    #[arg(long)]
    pub location_column: Option<String>,

    /// Number of preamble lines before the header row
    #[arg(long, default_value = "0")]
    pub header_row: usize,

    /// Comma-separated duration bucket edges in minutes
    #[arg(long, default_value = "0,1,5,20,40,60,80")]
    pub bucket_edges: BucketEdges,

    /// How AM/PM markers are treated when parsing times
    #[arg(long, value_enum, default_value = "strip")]
    pub meridiem: MeridiemMode,

    /// Whether the histogram counts records or per-participant totals
    #[arg(long, value_enum, default_value = "record")]
    pub histogram_basis: HistogramBasis,

    /// Region resolver
    #[arg(long, value_enum, default_value = "ipinfo")]
    pub resolver: ResolverKind,

    /// ipinfo.io API token
    #[arg(long, env = "IPINFO_TOKEN", hide_env_values = true)]
    pub ipinfo_token: Option<String>,

    /// JSON file mapping participant identifiers to regions
    #[arg(long)]
    pub region_map: Option<PathBuf>,

    /// Disable the on-disk region cache
    #[arg(long)]
    pub no_cache: bool,

    /// Maximum concurrent region lookups (1-64)
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u32).range(1..=64))]
    pub lookup_concurrency: u32,

    /// Timeout per region lookup in seconds
    #[arg(long, default_value = "5")]
    pub lookup_timeout_secs: u64,

    /// Directory receiving the generated files
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Artifacts to write
    #[arg(long, value_enum, default_value = "both")]
    pub format: OutputFormat,

    /// Also write per-participant duration totals as CSV
    #[arg(long)]
    pub identity_csv: bool,

    /// Week label written into the CSV export
    #[arg(long, default_value = "1")]
    pub week: String,

    /// Session number written into the CSV export
    #[arg(long, default_value = "1")]
    pub session_no: String,

    /// Session name written into the CSV export
    #[arg(long, default_value = "Session A")]
    pub session_name: String,

    /// Report date (YYYY-MM-DD); today in --timezone when omitted
    #[arg(long)]
    pub date: Option<String>,

    /// Timezone (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Terminal preview theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Show the report in a terminal preview before exiting
    #[arg(long)]
    pub preview: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.attendance-report/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medium: Option<Medium>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedded_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver: Option<ResolverKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir`.
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(APP_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params; `Default` when absent or unparseable.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the file at `path` if it exists.
    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments, merge last-used params for flags not given
    /// explicitly, resolve `"auto"` values and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Same as [`Settings::load_with_last_used`] with an explicit argument
    /// list and config path.
    pub fn load_with_last_used_impl(args: Vec<std::ffi::OsString>, config_path: &Path) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI always wins; clap ids are field names, not flag spellings.
        if !is_arg_explicitly_set(&matches, "medium") {
            if let Some(v) = last.medium {
                settings.medium = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "session_column") {
            if let Some(v) = last.session_column {
                settings.session_column = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "participant_column") {
            if let Some(v) = last.participant_column {
                settings.participant_column = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "start_column") {
            if let Some(v) = last.start_column {
                settings.start_column = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "embedded_column") {
            if let Some(v) = last.embedded_column {
                settings.embedded_column = v;
            }
        }
        if settings.location_column.is_none() {
            settings.location_column = last.location_column;
        }
        if !is_arg_explicitly_set(&matches, "resolver") {
            if let Some(v) = last.resolver {
                settings.resolver = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last.timezone {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Resolve `"auto"` timezone and apply `--debug`.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// The date stamped on exports: `--date` when given, otherwise today in
    /// the configured timezone.
    pub fn report_date(&self) -> Result<NaiveDate> {
        match &self.date {
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                ReportError::Config(format!("--date must be YYYY-MM-DD, got \"{}\"", raw))
            }),
            None => Ok(crate::time_utils::today_in(
                crate::time_utils::resolve_timezone(&self.timezone),
            )),
        }
    }

    /// Check cross-field constraints clap cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.input.is_none() {
            return Err(ReportError::Config("an input file or directory is required".to_string()));
        }
        if self.resolver == ResolverKind::Static && self.region_map.is_none() {
            return Err(ReportError::Config(
                "--resolver static requires --region-map".to_string(),
            ));
        }
        if self.resolver == ResolverKind::Ipinfo && self.ipinfo_token.is_none() {
            return Err(ReportError::Config(
                "--resolver ipinfo requires --ipinfo-token or IPINFO_TOKEN".to_string(),
            ));
        }
        self.report_date()?;
        Ok(())
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            medium: Some(s.medium),
            session_column: Some(s.session_column.clone()),
            participant_column: Some(s.participant_column.clone()),
            start_column: Some(s.start_column.clone()),
            embedded_column: Some(s.embedded_column.clone()),
            location_column: s.location_column.clone(),
            resolver: Some(s.resolver),
            output_dir: Some(s.output_dir.clone()),
            timezone: Some(s.timezone.clone()),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
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

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| (*s).into()).collect()
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            medium: Some(Medium::English),
            session_column: Some("Session".to_string()),
            embedded_column: Some("VoIP".to_string()),
            resolver: Some(ResolverKind::Static),
            timezone: Some("Asia/Kolkata".to_string()),
            ..Default::default()
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.medium, Some(Medium::English));
        assert_eq!(loaded.session_column, Some("Session".to_string()));
        assert_eq!(loaded.embedded_column, Some("VoIP".to_string()));
        assert_eq!(loaded.resolver, Some(ResolverKind::Static));
        assert_eq!(loaded.timezone, Some("Asia/Kolkata".to_string()));
        assert!(loaded.theme.is_none());
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing_or_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        assert!(LastUsedParams::load_from(&path).medium.is_none());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert!(LastUsedParams::load_from(&path).medium.is_none());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["attendance-report"]);

        assert!(settings.input.is_none());
        assert_eq!(settings.medium, Medium::Hindi);
        assert_eq!(settings.session_column, "Meeting ID");
        assert_eq!(settings.participant_column, "User Type");
        assert_eq!(settings.start_column, "Archiving");
        assert_eq!(settings.embedded_column, "Phone");
        assert!(settings.location_column.is_none());
        assert_eq!(settings.header_row, 0);
        assert_eq!(settings.bucket_edges, BucketEdges::default());
        assert_eq!(settings.meridiem, MeridiemMode::Strip);
        assert_eq!(settings.histogram_basis, HistogramBasis::Record);
        assert_eq!(settings.resolver, ResolverKind::Ipinfo);
        assert_eq!(settings.lookup_concurrency, 8);
        assert_eq!(settings.lookup_timeout_secs, 5);
        assert_eq!(settings.format, OutputFormat::Both);
        assert_eq!(settings.week, "1");
        assert_eq!(settings.session_name, "Session A");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.preview);
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_cli_parsing() {
        let settings = Settings::parse_from([
            "attendance-report",
            "sheet.xlsx",
            "--medium",
            "english",
            "--embedded-column",
            "VoIP",
            "--bucket-edges",
            "0,10,30",
            "--meridiem",
            "honor",
            "--histogram-basis",
            "identity",
            "--format",
            "csv",
        ]);
        assert_eq!(settings.input, Some(PathBuf::from("sheet.xlsx")));
        assert_eq!(settings.medium, Medium::English);
        assert_eq!(settings.embedded_column, "VoIP");
        assert_eq!(settings.bucket_edges.as_slice(), &[0.0, 10.0, 30.0]);
        assert_eq!(settings.meridiem, MeridiemMode::Honor);
        assert_eq!(settings.histogram_basis, HistogramBasis::Identity);
        assert!(settings.format.wants_csv());
        assert!(!settings.format.wants_html());
    }

    #[test]
    fn test_settings_rejects_bad_bucket_edges() {
        let result =
            Settings::try_parse_from(["attendance-report", "--bucket-edges", "0,20,5"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_rejects_zero_concurrency() {
        let result =
            Settings::try_parse_from(["attendance-report", "--lookup-concurrency", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_input_and_resolver_config() {
        let settings = Settings::parse_from(["attendance-report", "--ipinfo-token", "t"]);
        assert!(matches!(settings.validate(), Err(ReportError::Config(_))));

        let settings =
            Settings::parse_from(["attendance-report", "a.csv", "--resolver", "static"]);
        assert!(matches!(settings.validate(), Err(ReportError::Config(_))));

        let settings = Settings::parse_from([
            "attendance-report",
            "a.csv",
            "--resolver",
            "static",
            "--region-map",
            "map.json",
        ]);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_report_date_explicit_and_invalid() {
        let settings = Settings::parse_from(["attendance-report", "--date", "2024-09-12"]);
        assert_eq!(
            settings.report_date().unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 12).unwrap()
        );

        let settings = Settings::parse_from(["attendance-report", "--date", "12/09/2024"]);
        assert!(settings.report_date().is_err());
    }

    #[test]
    fn test_load_with_last_used_merges_persisted_columns() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            medium: Some(Medium::English),
            embedded_column: Some("VoIP".to_string()),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(args(&["attendance-report"]), &config_path);
        assert_eq!(settings.medium, Medium::English);
        assert_eq!(settings.embedded_column, "VoIP");
        assert_eq!(settings.timezone, "UTC");
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            medium: Some(Medium::English),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["attendance-report", "--medium", "hindi"]),
            &config_path,
        );
        assert_eq!(settings.medium, Medium::Hindi);
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&config_path).expect("save");

        Settings::load_with_last_used_impl(args(&["attendance-report", "--clear"]), &config_path);

        assert!(!config_path.exists(), "file must be gone after --clear");
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        let settings = Settings::load_with_last_used_impl(
            args(&["attendance-report", "--debug"]),
            &config_path,
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            args(&["attendance-report", "--start-column", "Joined At"]),
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.start_column, Some("Joined At".to_string()));
        assert!(loaded.timezone.is_some());
    }
}
