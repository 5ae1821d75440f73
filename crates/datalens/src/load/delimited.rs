//! Delimited-text parsing with delimiter auto-detection.

use crate::error::{DataLensError, Result};

/// Candidate delimiters, in tie-break order.
pub const DELIMITER_CANDIDATES: &[u8] = &[b',', b';', b'\t', b'|'];

/// Detect the delimiter from the first line only: the candidate with the
/// highest occurrence count wins, comma when every count is zero.
///
/// A heuristic, not a guarantee: a single-column file is indistinguishable
/// from one whose real delimiter is absent from the candidate set.
pub fn detect_delimiter(first_line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0usize;

    for &candidate in DELIMITER_CANDIDATES {
        let count = first_line
            .bytes()
            .filter(|&b| b == candidate)
            .count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }

    best
}

/// Whether the first line contains any candidate delimiter at all.
pub(crate) fn has_any_delimiter(first_line: &str) -> bool {
    first_line
        .bytes()
        .any(|b| DELIMITER_CANDIDATES.contains(&b))
}

/// Parse decoded delimited text into headers and row-major string records.
///
/// Short records are padded with empty cells and long records truncated to
/// the header width, so every row matches the column count.
pub fn parse_delimited(
    text: &str,
    delimiter: u8,
    has_header: bool,
    max_rows: Option<usize>,
) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_header)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = if has_header {
        reader.headers()?.iter().map(|s| s.to_string()).collect()
    } else {
        match reader.records().next() {
            Some(Ok(record)) => (0..record.len())
                .map(|i| format!("column_{}", i + 1))
                .collect(),
            Some(Err(e)) => return Err(e.into()),
            None => return Err(DataLensError::EmptyData("no data rows found".to_string())),
        }
    };

    if headers.is_empty() {
        return Err(DataLensError::EmptyData("no columns found".to_string()));
    }

    // Re-create the reader when the header pass consumed the first record.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_header)
        .flexible(true)
        .from_reader(text.as_bytes());

    let expected = headers.len();
    let mut rows = Vec::new();

    for (row_idx, result) in reader.records().enumerate() {
        if let Some(max) = max_rows {
            if row_idx >= max {
                break;
            }
        }

        let record = result?;
        let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        while row.len() < expected {
            row.push(String::new());
        }
        row.truncate(expected);
        rows.push(row);
    }

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_semicolon() {
        assert_eq!(detect_delimiter("a;b;c"), b';');
    }

    #[test]
    fn test_detect_comma() {
        assert_eq!(detect_delimiter("a,b,c"), b',');
    }

    #[test]
    fn test_detect_tab() {
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
    }

    #[test]
    fn test_detect_pipe() {
        assert_eq!(detect_delimiter("x|y|z"), b'|');
    }

    #[test]
    fn test_no_delimiter_defaults_to_comma() {
        assert_eq!(detect_delimiter("abc"), b',');
        assert!(!has_any_delimiter("abc"));
    }

    #[test]
    fn test_highest_count_wins() {
        // One comma, two semicolons.
        assert_eq!(detect_delimiter("a;b;c,d"), b';');
    }

    #[test]
    fn test_parse_pads_short_rows() {
        let (headers, rows) = parse_delimited("a,b,c\n1,2\n", b',', true, None).unwrap();
        assert_eq!(headers, vec!["a", "b", "c"]);
        assert_eq!(rows, vec![vec!["1", "2", ""]]);
    }

    #[test]
    fn test_parse_truncates_long_rows() {
        let (_, rows) = parse_delimited("a,b\n1,2,3\n", b',', true, None).unwrap();
        assert_eq!(rows, vec![vec!["1", "2"]]);
    }

    #[test]
    fn test_parse_row_limit() {
        let (_, rows) = parse_delimited("a\n1\n2\n3\n", b',', true, Some(2)).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_generated_headers_without_header_row() {
        let (headers, rows) = parse_delimited("1,2\n3,4\n", b',', false, None).unwrap();
        assert_eq!(headers, vec!["column_1", "column_2"]);
        assert_eq!(rows.len(), 2);
    }
}
