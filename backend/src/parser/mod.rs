//! CSV codec with encoding auto-detection.
//!
//! Converts raw text into a [`Dataset`] and back. Fields are split on raw
//! commas: quoted fields are not supported, so cells containing commas or
//! line breaks do not survive a round trip.

use std::path::Path;

use crate::dataset::Dataset;
use crate::error::{CsvError, CsvResult};
use crate::models::{Cell, Row};

/// Field separator for both directions.
pub const DELIMITER: char = ',';

/// Result of parsing raw bytes
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed table
    pub dataset: Dataset,
    /// Detected encoding
    pub encoding: String,
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding.
///
/// Unknown encodings and invalid UTF-8 fall back to lossy UTF-8 decoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        _ => {
            let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

/// Parse CSV text into a dataset.
///
/// Blank lines are skipped. The first remaining line is the header; shorter
/// rows are padded with empty cells and longer rows are truncated.
///
/// # Example
/// ```
/// use csvedit::parser::parse;
///
/// let ds = parse("a,b\n1,2\n,4").unwrap();
/// assert_eq!(ds.columns(), ["a", "b"]);
/// assert_eq!(ds.cell(1, "a").unwrap().as_str(), "");
/// assert_eq!(ds.cell(1, "b").unwrap().as_str(), "4");
/// ```
pub fn parse(text: &str) -> CsvResult<Dataset> {
    let mut lines = text
        .split('\n')
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.strip_suffix('\r').unwrap_or(line)))
        .filter(|(_, line)| !line.trim().is_empty());

    let (header_line, header) = lines
        .next()
        .ok_or_else(|| CsvError::malformed(1, "no non-empty lines"))?;

    let columns: Vec<String> = header.split(DELIMITER).map(str::to_string).collect();
    for (i, name) in columns.iter().enumerate() {
        if columns[..i].contains(name) {
            return Err(CsvError::malformed(
                header_line,
                format!("duplicate column '{}' in header", name),
            ));
        }
    }

    let rows: Vec<Row> = lines
        .map(|(_, line)| {
            let mut fields = line.split(DELIMITER);
            (0..columns.len())
                .map(|_| fields.next().map(Cell::from).unwrap_or_default())
                .collect::<Row>()
        })
        .collect();

    Dataset::from_parts(columns, rows)
        .map_err(|e| CsvError::malformed(header_line, e.to_string()))
}

/// Serialize a dataset, emitting `columns` in the given order.
///
/// Names that are not columns of the dataset produce empty cells.
pub fn serialize(dataset: &Dataset, columns: &[String]) -> String {
    let indices: Vec<Option<usize>> = columns.iter().map(|c| dataset.column_index(c)).collect();

    let mut lines = Vec::with_capacity(dataset.row_count() + 1);
    lines.push(columns.join(","));

    for row in dataset.rows() {
        let fields: Vec<&str> = indices
            .iter()
            .map(|idx| idx.and_then(|i| row.get(i)).map(Cell::as_str).unwrap_or(""))
            .collect();
        lines.push(fields.join(","));
    }

    lines.join("\n")
}

/// Serialize every column in dataset order.
pub fn serialize_all(dataset: &Dataset) -> String {
    serialize(dataset, dataset.columns())
}

/// Parse CSV bytes with encoding auto-detection.
pub fn parse_bytes(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let dataset = parse(&content)?;

    Ok(ParseResult { dataset, encoding })
}

/// Read and parse a CSV file with encoding auto-detection.
pub fn parse_file<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_simple_csv() {
        let ds = parse("name,age\nAlice,30\nBob,25").unwrap();

        assert_eq!(ds.columns(), ["name", "age"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.cell(0, "name").unwrap().as_str(), "Alice");
        assert_eq!(ds.cell(1, "age").unwrap().as_str(), "25");
    }

    #[test]
    fn test_missing_trailing_fields() {
        let ds = parse("a,b,c\n1").unwrap();
        assert_eq!(ds.cell(0, "a").unwrap().as_str(), "1");
        assert_eq!(ds.cell(0, "b").unwrap().as_str(), "");
        assert_eq!(ds.cell(0, "c").unwrap().as_str(), "");
    }

    #[test]
    fn test_extra_fields_dropped() {
        let ds = parse("a,b\n1,2,3,4").unwrap();
        assert_eq!(ds.rows()[0].len(), 2);
        assert_eq!(ds.cell(0, "b").unwrap().as_str(), "2");
    }

    #[test]
    fn test_blank_lines_and_crlf() {
        let ds = parse("\r\na,b\r\n1,2\r\n\r\n   \r\n3,4\r\n").unwrap();
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.cell(1, "b").unwrap().as_str(), "4");
    }

    #[test]
    fn test_values_kept_verbatim() {
        let ds = parse("a, b\n x ,\"y\"").unwrap();
        assert_eq!(ds.columns(), ["a", " b"]);
        assert_eq!(ds.cell(0, "a").unwrap().as_str(), " x ");
        assert_eq!(ds.cell(0, " b").unwrap().as_str(), "\"y\"");
    }

    #[test]
    fn test_empty_input_is_malformed() {
        for input in ["", "\n\n", "  \r\n \n"] {
            match parse(input) {
                Err(CsvError::MalformedInput { .. }) => {}
                other => panic!("expected MalformedInput for {:?}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_duplicate_header_is_malformed() {
        let err = parse("a,b,a\n1,2,3").unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));
    }

    #[test]
    fn test_header_only() {
        let ds = parse("a,b").unwrap();
        assert_eq!(ds.columns(), ["a", "b"]);
        assert_eq!(ds.row_count(), 0);
    }

    #[test]
    fn test_serialize_in_requested_order() {
        let ds = parse("a,b,c\n1,2,3\n4,5,6").unwrap();
        let order = vec!["c".to_string(), "a".to_string(), "ghost".to_string()];
        assert_eq!(serialize(&ds, &order), "c,a,ghost\n3,1,\n6,4,");
    }

    #[test]
    fn test_round_trip() {
        let source = "id,name,score\n1,Ann,9.5\n2,,7\n3,Bo,";
        let ds = parse(source).unwrap();
        let text = serialize_all(&ds);
        assert_eq!(text, source);
        assert_eq!(parse(&text).unwrap(), ds);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert_eq!(decoded, "Société");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let decoded = decode_content(b"\xEF\xBB\xBFa,b", "utf-8");
        assert_eq!(decoded, "a,b");
    }

    #[test]
    fn test_parse_bytes() {
        let result = parse_bytes(b"name,age\nAlice,30").unwrap();
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.dataset.row_count(), 1);
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "x,y\n1,2\n").unwrap();

        let result = parse_file(file.path()).unwrap();
        assert_eq!(result.dataset.columns(), ["x", "y"]);
        assert_eq!(result.dataset.cell(0, "y").unwrap().as_str(), "2");
    }

    #[test]
    fn test_parse_missing_file() {
        let result = parse_file("/definitely/not/here.csv");
        assert!(matches!(result, Err(CsvError::Io(_))));
    }
}
