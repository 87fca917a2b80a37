//! CSV normalizer for sales-history uploads.
//!
//! Decodes the raw bytes, infers the delimiter, maps arbitrary headers onto
//! canonical fields and coerces each row independently. A defective row
//! produces [`RowIssue`]s but never blocks the rest of the file.

pub mod columns;
pub mod sample;
pub mod values;

use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::sales::{SalesRecord, SkuId};
pub use columns::{CanonicalField, ColumnMapping, COLUMN_ALIASES};
pub use sample::{sample_csv, SAMPLE_FILE_NAME, SAMPLE_HEADER};

/// Row messages surfaced in a single failure message are capped at this many.
pub const MAX_SURFACED_MESSAGES: usize = 5;

const SNIFF_SAMPLE_CHARS: usize = 1024;
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("file encoding not supported; please use UTF-8 or Latin-1")]
    Encoding,
    #[error("CSV parsing error: {0}")]
    Parse(String),
    #[error("missing required columns: {}", join_fields(.missing))]
    MissingColumns { missing: Vec<CanonicalField> },
    #[error("CSV processing failed: {summary}")]
    NoValidRows { summary: String, issue_count: usize },
}

fn join_fields(fields: &[CanonicalField]) -> String {
    fields.iter().map(|field| field.as_str()).collect::<Vec<_>>().join(", ")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueSeverity {
    /// The value was defaulted or clamped; the row is still imported.
    Warning,
    /// The row is excluded from the result.
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowIssue {
    /// 1-based line in the source file; the header is line 1.
    pub line: u64,
    pub severity: IssueSeverity,
    pub message: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.line, self.message)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedUpload {
    pub records: Vec<SalesRecord>,
    pub issues: Vec<RowIssue>,
    /// Non-blank data rows seen, valid or not.
    pub total_rows: usize,
    pub mapping: ColumnMapping,
    pub delimiter: char,
}

impl NormalizedUpload {
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }

    pub fn rejected_rows(&self) -> usize {
        self.total_rows - self.records.len()
    }
}

/// Normalizes one uploaded file.
///
/// Fails as a whole only for input-level defects (encoding, no header,
/// missing required columns) or when rows exist but none of them is usable.
pub fn normalize_csv(bytes: &[u8]) -> Result<NormalizedUpload, IngestError> {
    let text = decode(bytes)?;
    let delimiter = detect_delimiter(&text)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| IngestError::Parse(error.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|header| header.trim().is_empty()) {
        return Err(IngestError::Parse("CSV file has no headers".to_string()));
    }

    let mapping = ColumnMapping::detect(&headers);
    let missing = mapping.missing_required();
    if !missing.is_empty() {
        return Err(IngestError::MissingColumns { missing });
    }

    let mut records = Vec::new();
    let mut issues = Vec::new();
    let mut total_rows = 0;

    for (index, result) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let record = match result {
            Ok(record) => record,
            Err(error) => {
                total_rows += 1;
                let line = error.position().map(|pos| pos.line()).unwrap_or(fallback_line);
                issues.push(RowIssue {
                    line,
                    severity: IssueSeverity::Error,
                    message: format!("unreadable row: {error}"),
                });
                continue;
            }
        };

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        total_rows += 1;

        let line = record.position().map(|pos| pos.line()).unwrap_or(fallback_line);
        let (row, row_issues) = transform_row(&record, &mapping, line);
        issues.extend(row_issues);
        records.extend(row);
    }

    if records.is_empty() && !issues.is_empty() {
        let summary = issues
            .iter()
            .take(MAX_SURFACED_MESSAGES)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(IngestError::NoValidRows { summary, issue_count: issues.len() });
    }

    Ok(NormalizedUpload { records, issues, total_rows, mapping, delimiter: char::from(delimiter) })
}

fn transform_row(
    record: &csv::StringRecord,
    mapping: &ColumnMapping,
    line: u64,
) -> (Option<SalesRecord>, Vec<RowIssue>) {
    let field = |name: CanonicalField| {
        mapping.index_of(name).and_then(|index| record.get(index)).unwrap_or("")
    };
    let mut issues = Vec::new();
    let mut issue = |severity, message: String| issues.push(RowIssue { line, severity, message });

    let sku_id = SkuId::parse(field(CanonicalField::SkuId));
    if sku_id.is_none() {
        issue(IssueSeverity::Error, "SKU ID is empty".to_string());
    }

    let raw_date = field(CanonicalField::Date);
    let date = values::parse_date(raw_date);
    if date.is_none() {
        issue(IssueSeverity::Error, format!("unable to parse date `{}`", raw_date.trim()));
    }

    let units_sold = match values::parse_units(field(CanonicalField::UnitsSold)) {
        Some(units) if units < 0 => {
            issue(IssueSeverity::Warning, "units sold cannot be negative".to_string());
            0
        }
        Some(units) => u32::try_from(units).unwrap_or_else(|_| {
            issue(IssueSeverity::Warning, "invalid units sold value".to_string());
            0
        }),
        None => {
            issue(IssueSeverity::Warning, "invalid units sold value".to_string());
            0
        }
    };

    let revenue = match values::parse_revenue(field(CanonicalField::Revenue)) {
        Some(revenue) if revenue.is_sign_negative() && !revenue.is_zero() => {
            issue(IssueSeverity::Warning, "revenue cannot be negative".to_string());
            Decimal::ZERO
        }
        Some(revenue) => revenue,
        None => {
            issue(IssueSeverity::Warning, "invalid revenue value".to_string());
            Decimal::ZERO
        }
    };

    let weather_temp = values::parse_temperature(field(CanonicalField::WeatherTemp))
        .unwrap_or_else(|_| {
            issue(IssueSeverity::Warning, "invalid temperature value".to_string());
            None
        });

    let season = Some(field(CanonicalField::Season).trim())
        .filter(|season| !season.is_empty())
        .map(str::to_string);

    let record = match (sku_id, date) {
        (Some(sku_id), Some(date)) => {
            Some(SalesRecord { sku_id, date, units_sold, revenue, weather_temp, season })
        }
        _ => None,
    };

    (record, issues)
}

/// UTF-8 (a leading byte-order mark is dropped), else Latin-1. Text holding
/// control bytes other than tab and line breaks is treated as binary.
pub fn decode(bytes: &[u8]) -> Result<String, IngestError> {
    let without_bom = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(without_bom) {
        return Ok(text.to_string());
    }

    let binary = bytes.iter().any(|byte| {
        matches!(byte, 0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F)
    });
    if binary {
        return Err(IngestError::Encoding);
    }
    Ok(bytes.iter().map(|&byte| char::from(byte)).collect())
}

/// Infers the field delimiter from the first kilobyte of text.
///
/// A candidate is preferred when every complete sampled line contains it the
/// same number of times as the header; ties go to the more frequent one.
/// Single-column files default to a comma.
pub fn detect_delimiter(text: &str) -> Result<u8, IngestError> {
    let sample: String = text.chars().take(SNIFF_SAMPLE_CHARS).collect();
    let truncated = text.chars().nth(SNIFF_SAMPLE_CHARS).is_some();

    let mut lines: Vec<&str> = sample.lines().filter(|line| !line.trim().is_empty()).collect();
    if truncated && lines.len() > 1 {
        lines.pop();
    }
    let Some(header) = lines.first() else {
        return Err(IngestError::Parse("no header row found".to_string()));
    };

    let mut best: Option<(bool, usize, u8)> = None;
    for candidate in DELIMITER_CANDIDATES {
        let header_count = count_unquoted(header, candidate);
        if header_count == 0 {
            continue;
        }
        let consistent =
            lines.iter().skip(1).all(|line| count_unquoted(line, candidate) == header_count);
        let score = (consistent, header_count, candidate);
        if best.map_or(true, |(c, n, _)| (consistent, header_count) > (c, n)) {
            best = Some(score);
        }
    }

    Ok(best.map(|(_, _, delimiter)| delimiter).unwrap_or(b','))
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut quoted = false;
    line.bytes()
        .filter(|byte| {
            if *byte == b'"' {
                quoted = !quoted;
            }
            !quoted && *byte == delimiter
        })
        .count()
}
