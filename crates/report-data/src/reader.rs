//! Attendance sheet discovery and loading.
//!
//! Reads `.csv`, `.xlsx` and `.xls` files (or a directory of them) into
//! [`AttendanceRecord`]s using a configurable [`ColumnMapping`].

use std::fs::File;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use report_core::error::{ReportError, Result};
use report_core::models::AttendanceRecord;
use report_core::settings::Settings;
use tracing::{debug, warn};

/// Extensions accepted as attendance sheets.
const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "xlsx", "xls"];

// ── ColumnMapping ─────────────────────────────────────────────────────────────

/// Header names of the columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub session: String,
    pub participant: String,
    pub start: String,
    pub embedded: String,
    pub location: Option<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            session: "Meeting ID".to_string(),
            participant: "User Type".to_string(),
            start: "Archiving".to_string(),
            embedded: "Phone".to_string(),
            location: None,
        }
    }
}

impl ColumnMapping {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            session: settings.session_column.clone(),
            participant: settings.participant_column.clone(),
            start: settings.start_column.clone(),
            embedded: settings.embedded_column.clone(),
            location: settings.location_column.clone(),
        }
    }

    fn required(&self) -> [&str; 4] {
        [&self.session, &self.participant, &self.start, &self.embedded]
    }
}

/// A sheet as header names plus string cells.
#[derive(Debug, Default)]
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all supported sheets recursively under `dir`, sorted by path.
pub fn find_input_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Input path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load every record from `path`, which may be a single sheet or a directory.
///
/// Directory inputs are read in path order and concatenated; files inside a
/// directory that hold only a header are skipped with a warning.
pub fn load_input(
    path: &Path,
    mapping: &ColumnMapping,
    header_row: usize,
) -> Result<Vec<AttendanceRecord>> {
    if !path.is_dir() {
        return load_records(path, mapping, header_row);
    }

    let files = find_input_files(path);
    if files.is_empty() {
        return Err(ReportError::NoInputFiles(path.to_path_buf()));
    }

    let mut all = Vec::new();
    for file in &files {
        match load_records(file, mapping, header_row) {
            Ok(records) => all.extend(records),
            Err(ReportError::EmptyInput(p)) => warn!("Skipping empty sheet {}", p.display()),
            Err(e) => return Err(e),
        }
    }

    if all.is_empty() {
        return Err(ReportError::EmptyInput(path.to_path_buf()));
    }

    debug!("Loaded {} rows from {} files", all.len(), files.len());
    Ok(all)
}

/// Load one sheet, skipping `header_row` preamble lines before the header.
pub fn load_records(
    path: &Path,
    mapping: &ColumnMapping,
    header_row: usize,
) -> Result<Vec<AttendanceRecord>> {
    let table = match extension_of(path).as_deref() {
        Some("csv") => read_csv_table(path, header_row)?,
        Some("xlsx") | Some("xls") => read_workbook_table(path, header_row)?,
        _ => return Err(ReportError::UnsupportedFormat(path.to_path_buf())),
    };

    let records = map_records(&table, mapping)?;
    if records.is_empty() {
        return Err(ReportError::EmptyInput(path.to_path_buf()));
    }

    debug!("Read {} rows from {}", records.len(), path.display());
    Ok(records)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn read_csv_table(path: &Path, header_row: usize) -> Result<RawTable> {
    let file = File::open(path).map_err(|source| ReportError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut lines = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ReportError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        lines.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(split_header(lines, header_row))
}

fn read_workbook_table(path: &Path, header_row: usize) -> Result<RawTable> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReportError::Spreadsheet {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::Spreadsheet {
            path: path.to_path_buf(),
            message: "workbook has no worksheets".to_string(),
        })?
        .map_err(|e| ReportError::Spreadsheet {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let lines = range
        .rows()
        .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>())
        .collect();

    Ok(split_header(lines, header_row))
}

/// Drop preamble lines and split off the header line.
fn split_header(lines: Vec<Vec<String>>, header_row: usize) -> RawTable {
    let mut iter = lines.into_iter().skip(header_row);
    let Some(header) = iter.next() else {
        return RawTable::default();
    };

    let headers = header
        .into_iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    RawTable {
        headers,
        rows: iter.collect(),
    }
}

/// Render a spreadsheet cell the way it would appear as delimited text.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            // Serial values below one day carry only a clock time.
            Some(ndt) if dt.as_f64() < 1.0 => ndt.format("%H:%M:%S").to_string(),
            Some(ndt) => ndt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
        Data::Error(e) => {
            debug!("Spreadsheet cell error: {:?}", e);
            String::new()
        }
    }
}

fn cell(row: &[String], i: usize) -> String {
    row.get(i).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn map_records(table: &RawTable, mapping: &ColumnMapping) -> Result<Vec<AttendanceRecord>> {
    let position = |name: &str| table.headers.iter().position(|h| h == name.trim());

    let missing: Vec<String> = mapping
        .required()
        .into_iter()
        .filter(|name| position(*name).is_none())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ReportError::MissingColumns(missing));
    }

    // Presence checked above.
    let idx = |name: &str| position(name).unwrap_or(usize::MAX);
    let session = idx(mapping.session.as_str());
    let participant = idx(mapping.participant.as_str());
    let start = idx(mapping.start.as_str());
    let embedded = idx(mapping.embedded.as_str());
    let location = match mapping.location.as_deref() {
        Some(name) => {
            let found = position(name);
            if found.is_none() {
                warn!("Location column \"{}\" not found; ignoring it", name);
            }
            found
        }
        None => None,
    };

    let records = table
        .rows
        .iter()
        .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
        .map(|row| AttendanceRecord {
            session_id: cell(row, session),
            participant_id: cell(row, participant),
            start_raw: cell(row, start),
            embedded_raw: cell(row, embedded),
            location: location.map(|i| cell(row, i)).filter(|s| !s.is_empty()),
        })
        .collect();

    Ok(records)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "Meeting ID,User Type,Archiving,Phone";

    fn write_file(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    // ── load_records ──────────────────────────────────────────────────────────

    #[test]
    fn test_load_records_basic_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "sheet.csv",
            &[
                HEADER,
                "m1,10.0.0.1,09:00:00,Joined 09:05:00 AM",
                "m2,10.0.0.2,10:00:00,no time",
            ],
        );

        let records = load_records(&path, &ColumnMapping::default(), 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].session_id, "m1");
        assert_eq!(records[0].participant_id, "10.0.0.1");
        assert_eq!(records[0].start_raw, "09:00:00");
        assert_eq!(records[0].embedded_raw, "Joined 09:05:00 AM");
        assert!(records[0].location.is_none());
    }

    #[test]
    fn test_load_records_extra_columns_and_reordering() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "sheet.csv",
            &[
                "Phone,Name,Archiving,User Type,Meeting ID",
                "at 09:05:00 AM,Asha,09:00:00,1.2.3.4,m1",
            ],
        );

        let records = load_records(&path, &ColumnMapping::default(), 0).unwrap();
        assert_eq!(records[0].session_id, "m1");
        assert_eq!(records[0].participant_id, "1.2.3.4");
        assert_eq!(records[0].embedded_raw, "at 09:05:00 AM");
    }

    #[test]
    fn test_load_records_missing_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "sheet.csv", &["Meeting ID,User Type", "m1,1.2.3.4"]);

        let err = load_records(&path, &ColumnMapping::default(), 0).unwrap_err();
        match err {
            ReportError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["Archiving".to_string(), "Phone".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_records_header_row_skips_preamble() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "sheet.csv",
            &[
                "Attendance export",
                "Generated 2024-09-12",
                HEADER,
                "m1,10.0.0.1,09:00:00,09:05:00 AM",
            ],
        );

        let records = load_records(&path, &ColumnMapping::default(), 2).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].session_id, "m1");
    }

    #[test]
    fn test_load_records_custom_mapping_with_location() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "sheet.csv",
            &[
                "Session,IP,Start,Voice,Place",
                "s1,1.1.1.1,09:00:00,09:10:00 AM,\"Lucknow, Uttar Pradesh\"",
                "s2,1.1.1.2,09:00:00,09:10:00 AM,",
            ],
        );
        let mapping = ColumnMapping {
            session: "Session".to_string(),
            participant: "IP".to_string(),
            start: "Start".to_string(),
            embedded: "Voice".to_string(),
            location: Some("Place".to_string()),
        };

        let records = load_records(&path, &mapping, 0).unwrap();
        assert_eq!(records[0].location.as_deref(), Some("Lucknow, Uttar Pradesh"));
        assert!(records[1].location.is_none());
    }

    #[test]
    fn test_load_records_skips_blank_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            dir.path(),
            "sheet.csv",
            &[HEADER, ",,,", "m1,10.0.0.1,09:00:00,x", ""],
        );

        let records = load_records(&path, &ColumnMapping::default(), 0).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_load_records_short_rows_padded() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "sheet.csv", &[HEADER, "m1,10.0.0.1"]);

        let records = load_records(&path, &ColumnMapping::default(), 0).unwrap();
        assert_eq!(records[0].start_raw, "");
        assert_eq!(records[0].embedded_raw, "");
    }

    #[test]
    fn test_load_records_header_only_is_empty_input() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "sheet.csv", &[HEADER]);

        let err = load_records(&path, &ColumnMapping::default(), 0).unwrap_err();
        assert!(matches!(err, ReportError::EmptyInput(_)));
    }

    #[test]
    fn test_load_records_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "sheet.txt", &[HEADER]);

        let err = load_records(&path, &ColumnMapping::default(), 0).unwrap_err();
        assert!(matches!(err, ReportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_records_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_records(&dir.path().join("absent.csv"), &ColumnMapping::default(), 0)
            .unwrap_err();
        assert!(matches!(err, ReportError::FileRead { .. }));
    }

    #[test]
    fn test_load_records_corrupt_workbook() {
        let dir = TempDir::new().unwrap();
        let path = write_file(dir.path(), "sheet.xlsx", &["definitely not a zip archive"]);

        let err = load_records(&path, &ColumnMapping::default(), 0).unwrap_err();
        assert!(matches!(err, ReportError::Spreadsheet { .. }));
    }

    // ── find_input_files / load_input ─────────────────────────────────────────

    #[test]
    fn test_find_input_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("week-2");
        std::fs::create_dir_all(&sub).unwrap();
        write_file(dir.path(), "b.csv", &[HEADER]);
        write_file(dir.path(), "a.XLSX", &[HEADER]);
        write_file(dir.path(), "notes.txt", &["ignore"]);
        write_file(&sub, "c.csv", &[HEADER]);

        let files = find_input_files(dir.path());
        let names: Vec<&str> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.XLSX", "b.csv", "c.csv"]);
    }

    #[test]
    fn test_find_input_files_nonexistent_path() {
        assert!(find_input_files(Path::new("/tmp/does-not-exist-attendance-xyz")).is_empty());
    }

    #[test]
    fn test_load_input_directory_concatenates_in_order() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "2.csv", &[HEADER, "m2,10.0.0.2,09:00:00,x"]);
        write_file(dir.path(), "1.csv", &[HEADER, "m1,10.0.0.1,09:00:00,x"]);
        write_file(dir.path(), "3.csv", &[HEADER]);

        let records = load_input(dir.path(), &ColumnMapping::default(), 0).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }

    #[test]
    fn test_load_input_directory_without_sheets() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "readme.md", &["nothing here"]);

        let err = load_input(dir.path(), &ColumnMapping::default(), 0).unwrap_err();
        assert!(matches!(err, ReportError::NoInputFiles(_)));
    }

    // ── cell_to_string ────────────────────────────────────────────────────────

    #[test]
    fn test_cell_to_string_numbers() {
        assert_eq!(cell_to_string(&Data::Float(85012345678.0)), "85012345678");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Int(42)), "42");
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("x".to_string())), "x");
    }
}
