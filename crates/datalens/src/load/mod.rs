//! Loading heterogeneous tabular files into a uniform [`Table`].

pub mod encoding;

mod columns;
mod delimited;
mod json;
#[cfg(feature = "parquet")]
mod parquet;
mod spreadsheet;

pub use columns::{NULL_TOKENS, is_null_token};
pub use delimited::{DELIMITER_CANDIDATES, detect_delimiter};
pub use encoding::detect_encoding;
pub use json::JsonShape;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DataLensError, Result};
use crate::table::Table;

/// Source format, normally derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Delimited text: `.csv`, `.tsv`, `.txt`.
    Delimited,
    /// Spreadsheet: `.xlsx`, `.xls`.
    Spreadsheet,
    /// JSON document: `.json`.
    Json,
    /// Columnar binary: `.parquet`.
    Parquet,
}

impl SourceFormat {
    /// Derive the format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "tsv" | "txt" => Ok(SourceFormat::Delimited),
            "xlsx" | "xls" => Ok(SourceFormat::Spreadsheet),
            "json" => Ok(SourceFormat::Json),
            "parquet" => Ok(SourceFormat::Parquet),
            other => Err(DataLensError::UnsupportedFormat(format!(
                "'.{other}' (supported: .csv, .tsv, .txt, .xlsx, .xls, .json, .parquet)"
            ))),
        }
    }
}

/// Caller overrides that bypass auto-detection when supplied.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Explicit format, bypassing extension dispatch.
    pub format: Option<SourceFormat>,
    /// Explicit encoding name, bypassing detection (delimited text only).
    pub encoding: Option<String>,
    /// Explicit delimiter, bypassing detection (delimited text only).
    pub delimiter: Option<u8>,
    /// Explicit sheet name (spreadsheets only).
    pub sheet: Option<String>,
    /// Whether the first record is a header row.
    pub has_header: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: None,
            encoding: None,
            delimiter: None,
            sheet: None,
            has_header: true,
        }
    }
}

/// Metadata recorded at load time; read-only afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadMetadata {
    /// File name without path.
    pub file: String,
    /// Full path to the source.
    pub path: PathBuf,
    /// SHA-256 hash of the bytes read (the whole file for full loads,
    /// only the line prefix for bounded delimited previews).
    pub hash: String,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Concrete format name (csv, tsv, xlsx, json, ...).
    pub format: String,
    /// Encoding used to decode the source ("binary" for non-text formats).
    pub encoding: String,
    /// Delimiter used, for delimited text.
    pub delimiter: Option<char>,
    /// Sheets available in the workbook, for spreadsheets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sheet_names: Vec<String>,
    /// The sheet that was loaded, for spreadsheets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_sheet: Option<String>,
    /// Which detection/fallback strategies were applied, in order.
    pub strategy: Vec<String>,
    /// Number of data rows loaded.
    pub row_count: usize,
    /// Number of columns loaded.
    pub column_count: usize,
    /// When the load happened.
    pub loaded_at: DateTime<Utc>,
}

/// Loads tabular files of unknown encoding, delimiter, and schema.
#[derive(Debug, Default)]
pub struct Loader;

impl Loader {
    pub fn new() -> Self {
        Self
    }

    /// Load a file fully, auto-detecting whatever `options` leaves unset.
    pub fn load(
        &self,
        path: impl AsRef<Path>,
        options: &LoadOptions,
    ) -> Result<(Table, LoadMetadata)> {
        self.load_with_limit(path.as_ref(), options, None)
    }

    /// Load only a bounded row prefix for fast inspection. Delimited
    /// sources stop reading after `row_limit` records rather than
    /// decoding the whole file.
    pub fn preview(
        &self,
        path: impl AsRef<Path>,
        row_limit: usize,
    ) -> Result<(Table, LoadMetadata)> {
        self.load_with_limit(path.as_ref(), &LoadOptions::default(), Some(row_limit))
    }

    /// [`preview`](Self::preview) with explicit load options.
    pub fn preview_with(
        &self,
        path: impl AsRef<Path>,
        options: &LoadOptions,
        row_limit: usize,
    ) -> Result<(Table, LoadMetadata)> {
        self.load_with_limit(path.as_ref(), options, Some(row_limit))
    }

    /// List the sheets of a workbook without loading any of them.
    pub fn sheet_names(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        use calamine::Reader;
        let workbook = calamine::open_workbook_auto(path.as_ref())
            .map_err(|e| DataLensError::Load(format!("spreadsheet open failure: {e}")))?;
        Ok(workbook.sheet_names().to_vec())
    }

    fn load_with_limit(
        &self,
        path: &Path,
        options: &LoadOptions,
        max_rows: Option<usize>,
    ) -> Result<(Table, LoadMetadata)> {
        let format = match options.format {
            Some(f) => f,
            None => SourceFormat::from_path(path)?,
        };

        let mut strategy = Vec::new();

        // A bounded preview of delimited text only reads (and decodes)
        // a line prefix; other formats need the whole file.
        let bytes = match (format, max_rows) {
            (SourceFormat::Delimited, Some(limit)) => {
                // Header line plus `limit` data rows.
                let prefix = read_line_prefix(path, limit + 1)?;
                strategy.push(format!("read: first {} lines only", limit + 1));
                prefix
            }
            _ => fs::read(path).map_err(|e| DataLensError::Io {
                path: path.to_path_buf(),
                source: e,
            })?,
        };
        let size_bytes = fs::metadata(path)
            .map_err(|e| DataLensError::Io {
                path: path.to_path_buf(),
                source: e,
            })?
            .len();
        let hash = format!("sha256:{:x}", Sha256::digest(&bytes));

        let mut encoding = "binary".to_string();
        let mut delimiter = None;
        let mut sheet_names = Vec::new();
        let mut selected_sheet = None;

        let (columns, format_name) = match format {
            SourceFormat::Delimited => {
                let (cols, enc, delim, name) =
                    self.load_delimited(path, &bytes, options, max_rows, &mut strategy)?;
                encoding = enc;
                delimiter = Some(delim as char);
                (cols, name)
            }
            SourceFormat::Spreadsheet => {
                let sheet = spreadsheet::load_spreadsheet(path, options.sheet.as_deref(), max_rows)?;
                match options.sheet {
                    Some(_) => strategy.push(format!("sheet: explicit '{}'", sheet.selected)),
                    None => strategy.push(format!("sheet: defaulted to first ('{}')", sheet.selected)),
                }
                sheet_names = sheet.sheet_names;
                selected_sheet = Some(sheet.selected);
                let name = extension_name(path, "xlsx");
                (sheet.columns, name)
            }
            SourceFormat::Json => {
                let (cols, shape) = json::parse_json(&bytes, max_rows)?;
                strategy.push(format!("json shape: {}", shape.as_str()));
                encoding = "utf-8".to_string();
                (cols, "json".to_string())
            }
            SourceFormat::Parquet => {
                #[cfg(feature = "parquet")]
                {
                    (parquet::load_parquet(path, max_rows)?, "parquet".to_string())
                }
                #[cfg(not(feature = "parquet"))]
                {
                    return Err(DataLensError::UnsupportedFormat(
                        ".parquet requires building with the 'parquet' feature".to_string(),
                    ));
                }
            }
        };

        let table = Table::new(columns)?;
        let metadata = LoadMetadata {
            file: path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.to_path_buf(),
            hash,
            size_bytes,
            format: format_name,
            encoding,
            delimiter,
            sheet_names,
            selected_sheet,
            strategy,
            row_count: table.row_count(),
            column_count: table.column_count(),
            loaded_at: Utc::now(),
        };

        Ok((table, metadata))
    }

    fn load_delimited(
        &self,
        path: &Path,
        bytes: &[u8],
        options: &LoadOptions,
        max_rows: Option<usize>,
        strategy: &mut Vec<String>,
    ) -> Result<(Vec<crate::table::Column>, String, u8, String)> {
        let (text, encoding_used) = decode_with_fallback(path, bytes, options.encoding.as_deref(), strategy)?;

        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let first_line = text.lines().next().unwrap_or("");

        let delimiter = match options.delimiter {
            Some(d) => {
                strategy.push("delimiter: explicit override".to_string());
                d
            }
            None if extension == "tsv" => {
                strategy.push("delimiter: tab (tsv extension)".to_string());
                b'\t'
            }
            None if extension == "txt" && !delimited::has_any_delimiter(first_line) => {
                // Plain .txt with no recognizable delimiter: assume tab.
                strategy.push("delimiter: none detected in .txt, assuming tab".to_string());
                b'\t'
            }
            None => {
                let d = detect_delimiter(first_line);
                strategy.push(format!("delimiter: detected '{}'", escape_delim(d)));
                d
            }
        };

        let (headers, rows) = delimited::parse_delimited(&text, delimiter, options.has_header, max_rows)?;
        let columns = columns::columns_from_rows(&headers, &rows);

        let format_name = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        Ok((columns, encoding_used, delimiter, format_name))
    }
}

/// Decode with the chosen encoding, walking the fallback chain on failure.
fn decode_with_fallback(
    path: &Path,
    bytes: &[u8],
    override_encoding: Option<&str>,
    strategy: &mut Vec<String>,
) -> Result<(String, String)> {
    let chosen = match override_encoding {
        Some(e) => {
            strategy.push(format!("encoding: explicit '{e}'"));
            e.to_string()
        }
        None => {
            let detected = detect_encoding(bytes);
            strategy.push(format!("encoding: detected '{detected}'"));
            detected
        }
    };

    if let Some(text) = encoding::decode(bytes, &chosen) {
        return Ok((text, chosen));
    }

    for fallback in encoding::FALLBACK_ENCODINGS {
        if *fallback == chosen {
            continue;
        }
        if let Some(text) = encoding::decode(bytes, fallback) {
            strategy.push(format!("encoding: fell back to '{fallback}'"));
            return Ok((text, fallback.to_string()));
        }
    }

    Err(DataLensError::Load(format!(
        "could not decode '{}' with '{chosen}' or any fallback encoding",
        path.display()
    )))
}

/// Read at most `max_lines` newline-terminated lines from the start of
/// a file, without pulling the rest into memory.
fn read_line_prefix(path: &Path, max_lines: usize) -> Result<Vec<u8>> {
    use std::io::BufRead;

    let file = fs::File::open(path).map_err(|e| DataLensError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut reader = std::io::BufReader::new(file);
    let mut buf = Vec::new();
    for _ in 0..max_lines {
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| DataLensError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;
        if read == 0 {
            break;
        }
    }
    Ok(buf)
}

fn extension_name(path: &Path, default: &str) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| default.to_string())
}

fn escape_delim(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    use crate::table::ColumnType;

    fn temp_file(suffix: &str, content: &[u8]) -> NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn test_load_csv_round_trip() {
        let file = temp_file(".csv", b"name,age,score\nAlice,30,1.5\nBob,25,2.0\n");
        let loader = Loader::new();
        let (table, meta) = loader.load(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_count(), 3);
        assert_eq!(meta.encoding, "utf-8");
        assert_eq!(meta.delimiter, Some(','));
        assert_eq!(meta.format, "csv");
        assert!(meta.hash.starts_with("sha256:"));
        assert_eq!(
            table.column("age").unwrap().column_type(),
            ColumnType::Integer
        );
        assert_eq!(
            table.column("score").unwrap().column_type(),
            ColumnType::Float
        );
    }

    #[test]
    fn test_load_semicolon_csv() {
        let file = temp_file(".csv", b"a;b\n1;2\n");
        let loader = Loader::new();
        let (table, meta) = loader.load(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(meta.delimiter, Some(';'));
        assert_eq!(meta.format, "csv-semicolon");
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_tsv_extension_forces_tab() {
        let file = temp_file(".tsv", b"a\tb\n1\t2\n");
        let loader = Loader::new();
        let (_, meta) = loader.load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(meta.delimiter, Some('\t'));
        assert_eq!(meta.format, "tsv");
    }

    #[test]
    fn test_txt_without_delimiter_assumes_tab() {
        let file = temp_file(".txt", b"header\nvalue1\nvalue2\n");
        let loader = Loader::new();
        let (table, meta) = loader.load(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(meta.delimiter, Some('\t'));
        assert_eq!(table.column_count(), 1);
    }

    #[test]
    fn test_null_tokens_become_missing() {
        let file = temp_file(".csv", b"v\n1\nNA\n3\n#N/A\n");
        let loader = Loader::new();
        let (table, _) = loader.load(file.path(), &LoadOptions::default()).unwrap();

        let col = table.column("v").unwrap();
        assert_eq!(col.column_type(), ColumnType::Integer);
        assert_eq!(col.data.missing_count(), 2);
    }

    #[test]
    fn test_latin1_fallback() {
        // 0xF1 is ñ in latin-1 and invalid UTF-8.
        let file = temp_file(".csv", b"name\nPe\xf1a\n");
        let loader = Loader::new();
        let (table, meta) = loader.load(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(table.row_count(), 1);
        assert!(meta.encoding == "latin-1" || meta.encoding == "windows-1252");
        assert!(meta.strategy.iter().any(|s| s.starts_with("encoding:")));
    }

    #[test]
    fn test_explicit_delimiter_override() {
        // First line would detect ','; override wins.
        let file = temp_file(".csv", b"a,b|c,d\n1,2|3,4\n");
        let loader = Loader::new();
        let options = LoadOptions {
            delimiter: Some(b'|'),
            ..Default::default()
        };
        let (table, meta) = loader.load(file.path(), &options).unwrap();
        assert_eq!(meta.delimiter, Some('|'));
        assert_eq!(table.column_count(), 2);
    }

    #[test]
    fn test_missing_file() {
        let loader = Loader::new();
        let result = loader.load("/nonexistent/data.csv", &LoadOptions::default());
        assert!(matches!(result, Err(DataLensError::Io { .. })));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = temp_file(".docx", b"not a table");
        let loader = Loader::new();
        let result = loader.load(file.path(), &LoadOptions::default());
        assert!(matches!(result, Err(DataLensError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_json_shape_recorded_in_strategy() {
        let file = temp_file(".json", br#"[{"a": 1}, {"a": 2}]"#);
        let loader = Loader::new();
        let (table, meta) = loader.load(file.path(), &LoadOptions::default()).unwrap();

        assert_eq!(table.row_count(), 2);
        assert!(meta
            .strategy
            .iter()
            .any(|s| s == "json shape: array-of-objects"));
    }

    #[test]
    fn test_preview_is_bounded() {
        let mut content = String::from("n\n");
        for i in 0..1000 {
            content.push_str(&format!("{i}\n"));
        }
        let file = temp_file(".csv", content.as_bytes());
        let loader = Loader::new();
        let (table, meta) = loader.preview(file.path(), 5).unwrap();

        assert_eq!(table.row_count(), 5);
        assert_eq!(meta.row_count, 5);
    }

    #[test]
    fn test_preview_reads_only_a_line_prefix() {
        let mut content = String::from("n\n");
        for i in 0..1000 {
            content.push_str(&format!("{i}\n"));
        }
        let file = temp_file(".csv", content.as_bytes());
        let loader = Loader::new();
        let (table, meta) = loader.preview(file.path(), 5).unwrap();

        assert_eq!(table.row_count(), 5);
        // Size reflects the whole file, the hash only the bytes read.
        assert_eq!(meta.size_bytes, content.len() as u64);
        let prefix: String = content.lines().take(6).map(|l| format!("{l}\n")).collect();
        assert_eq!(
            meta.hash,
            format!("sha256:{:x}", Sha256::digest(prefix.as_bytes()))
        );
        assert!(meta.strategy.iter().any(|s| s.starts_with("read:")));
    }
}
