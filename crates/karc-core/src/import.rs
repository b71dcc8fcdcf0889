//! Bulk variant import from delimited text.
//!
//! Column validation happens before anything touches the store: a header
//! missing a required column rejects the whole file. Rows are then inserted
//! as one batch, so a single bad row fails every row.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;

use crate::model::{Inheritance, VariantDraft, VariantStatus};
use crate::services::ValidationError;

/// Which set of required columns applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ImportSchema {
    /// `gene`, `variant`.
    #[default]
    Standard,
    /// `gene`, `variant`, `type`, `significance`.
    Legacy,
}

impl ImportSchema {
    #[must_use]
    pub const fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Standard => &["gene", "variant"],
            Self::Legacy => &["gene", "variant", "type", "significance"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    Csv,
    Tsv,
}

impl ImportFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ValidationError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Ok(Self::Csv),
            "tsv" | "txt" => Ok(Self::Tsv),
            _ => Err(ValidationError::UnsupportedFormat { extension }),
        }
    }

    const fn delimiter(self) -> u8 {
        match self {
            Self::Csv => b',',
            Self::Tsv => b'\t',
        }
    }
}

/// Columns mapped onto variant fields. Anything else is ignored.
pub const RECOGNIZED_COLUMNS: [&str; 17] = [
    "gene",
    "variant",
    "sample_id",
    "chromosome",
    "position",
    "ref_allele",
    "alt_allele",
    "protein_change",
    "consequence",
    "transcript",
    "rank",
    "inheritance",
    "status",
    "notes",
    "type",
    "significance",
    "families",
];

/// A row that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    /// One-based line in the source file.
    pub line: u64,
    pub message: String,
}

/// Parsed file, before anything is written.
#[derive(Debug, Clone, Default)]
pub struct ParsedImport {
    pub drafts: Vec<VariantDraft>,
    pub row_errors: Vec<RowError>,
    pub ignored_columns: Vec<String>,
}

impl ParsedImport {
    /// Data rows seen, valid or not.
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.drafts.len() + self.row_errors.len()
    }
}

/// Outcome reported to the uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub success: usize,
    pub fail: usize,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    #[must_use]
    pub const fn succeeded(count: usize) -> Self {
        Self {
            success: count,
            fail: 0,
            errors: Vec::new(),
        }
    }

    /// Whole batch rejected.
    #[must_use]
    pub const fn failed(total: usize, errors: Vec<RowError>) -> Self {
        Self {
            success: 0,
            fail: total,
            errors,
        }
    }
}

fn normalize_enum_text(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

fn parse_integer(field: &str, raw: &str) -> Result<i64, String> {
    raw.replace(',', "")
        .parse::<i64>()
        .map_err(|_| format!("{field} must be a whole number, got '{raw}'"))
}

struct ColumnMap {
    index: HashMap<&'static str, usize>,
}

impl ColumnMap {
    fn cell<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        let idx = *self.index.get(column)?;
        record.get(idx).map(str::trim).filter(|v| !v.is_empty())
    }

    fn text(&self, record: &StringRecord, column: &str) -> Option<String> {
        self.cell(record, column).map(str::to_string)
    }

    fn to_draft(&self, record: &StringRecord) -> Result<VariantDraft, String> {
        let gene = self.text(record, "gene").ok_or("gene is required")?;
        let variant = self.text(record, "variant").ok_or("variant is required")?;

        let position = self
            .cell(record, "position")
            .map(|v| parse_integer("position", v))
            .transpose()?;
        let families = self
            .cell(record, "families")
            .map(|v| parse_integer("families", v))
            .transpose()?;
        let inheritance = self
            .cell(record, "inheritance")
            .map(|v| normalize_enum_text(v).parse::<Inheritance>())
            .transpose()
            .map_err(|e| e.to_string())?;
        let status = self
            .cell(record, "status")
            .map(|v| normalize_enum_text(v).parse::<VariantStatus>())
            .transpose()
            .map_err(|e| e.to_string())?
            .unwrap_or_default();

        Ok(VariantDraft {
            gene,
            variant,
            sample_id: self.text(record, "sample_id"),
            chromosome: self.text(record, "chromosome"),
            position,
            ref_allele: self.text(record, "ref_allele"),
            alt_allele: self.text(record, "alt_allele"),
            protein_change: self.text(record, "protein_change"),
            consequence: self.text(record, "consequence"),
            transcript: self.text(record, "transcript"),
            rank: self.text(record, "rank"),
            inheritance,
            status,
            notes: self.text(record, "notes"),
            variant_type: self.text(record, "type"),
            significance: self.text(record, "significance"),
            families,
        })
    }
}

/// Parse and validate an import file.
///
/// Fails only on header problems. Row conversion problems are collected in
/// [`ParsedImport::row_errors`].
pub fn parse_variants<R: Read>(
    reader: R,
    format: ImportFormat,
    schema: ImportSchema,
) -> Result<ParsedImport, ValidationError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(format.delimiter())
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| ValidationError::Invalid {
            field: "header".to_string(),
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_ascii_lowercase())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(ValidationError::EmptyImport);
    }

    let missing: Vec<String> = schema
        .required_columns()
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| (*col).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns { missing });
    }

    let mut index = HashMap::new();
    let mut ignored_columns = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        match RECOGNIZED_COLUMNS.iter().find(|c| **c == header.as_str()) {
            Some(column) => {
                index.entry(*column).or_insert(idx);
            }
            None if !header.is_empty() => ignored_columns.push(header.clone()),
            None => {}
        }
    }
    let columns = ColumnMap { index };

    let mut parsed = ParsedImport {
        ignored_columns,
        ..ParsedImport::default()
    };
    for result in rdr.records() {
        match result {
            Ok(record) => {
                if record.iter().all(str::is_empty) {
                    continue;
                }
                let line = record.position().map_or(0, csv::Position::line);
                match columns.to_draft(&record) {
                    Ok(draft) => parsed.drafts.push(draft),
                    Err(message) => parsed.row_errors.push(RowError { line, message }),
                }
            }
            Err(err) => {
                let line = err.position().map_or(0, csv::Position::line);
                parsed.row_errors.push(RowError {
                    line,
                    message: err.to_string(),
                });
            }
        }
    }

    if !parsed.ignored_columns.is_empty() {
        tracing::debug!(columns = ?parsed.ignored_columns, "ignoring unrecognized import columns");
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ParsedImport, ValidationError> {
        parse_variants(text.as_bytes(), ImportFormat::Csv, ImportSchema::Standard)
    }

    #[test]
    fn test_minimal_columns_leave_other_fields_null() {
        let parsed = parse("gene,variant,consequence\nSHANK3,c.1234A>G,missense_variant\n").unwrap();
        assert!(parsed.row_errors.is_empty());
        assert_eq!(parsed.drafts.len(), 1);
        let d = &parsed.drafts[0];
        assert_eq!(d.gene, "SHANK3");
        assert_eq!(d.variant, "c.1234A>G");
        assert_eq!(d.consequence.as_deref(), Some("missense_variant"));
        assert_eq!(
            d,
            &VariantDraft {
                gene: "SHANK3".to_string(),
                variant: "c.1234A>G".to_string(),
                consequence: Some("missense_variant".to_string()),
                ..VariantDraft::default()
            }
        );
    }

    #[test]
    fn test_missing_variant_column_is_named() {
        let err = parse("gene,consequence\nSHANK3,missense_variant\n").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumns {
                missing: vec!["variant".to_string()]
            }
        );
        assert!(err.to_string().contains("variant"));
    }

    #[test]
    fn test_legacy_schema_requires_type_and_significance() {
        let err = parse_variants(
            "gene,variant\nA,1\n".as_bytes(),
            ImportFormat::Csv,
            ImportSchema::Legacy,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingColumns {
                missing: vec!["type".to_string(), "significance".to_string()]
            }
        );

        let ok = parse_variants(
            "Gene,Variant,Type,Significance,Families\nA,1,SNV,pathogenic,3\n".as_bytes(),
            ImportFormat::Csv,
            ImportSchema::Legacy,
        )
        .unwrap();
        assert_eq!(ok.drafts[0].variant_type.as_deref(), Some("SNV"));
        assert_eq!(ok.drafts[0].families, Some(3));
    }

    #[test]
    fn test_unknown_columns_ignored_and_cells_trimmed() {
        let parsed = parse("gene, variant ,lab_code\n CHD8 , c.1A>T ,X-9\n").unwrap();
        assert_eq!(parsed.ignored_columns, vec!["lab_code".to_string()]);
        assert_eq!(parsed.drafts[0].gene, "CHD8");
        assert_eq!(parsed.drafts[0].variant, "c.1A>T");
    }

    #[test]
    fn test_tab_delimited() {
        let parsed = parse_variants(
            "gene\tvariant\tposition\tinheritance\nTP53\tc.743G>A\t7,676,154\tDe Novo\n".as_bytes(),
            ImportFormat::Tsv,
            ImportSchema::Standard,
        )
        .unwrap();
        let d = &parsed.drafts[0];
        assert_eq!(d.position, Some(7_676_154));
        assert_eq!(d.inheritance, Some(Inheritance::DeNovo));
    }

    #[test]
    fn test_bad_rows_are_collected() {
        let parsed = parse(
            "gene,variant,position,status\nA,1,12,available\nB,2,twelve,\n,3,,\nC,4,,archived\n",
        )
        .unwrap();
        assert_eq!(parsed.drafts.len(), 1);
        assert_eq!(parsed.row_errors.len(), 3);
        assert_eq!(parsed.total_rows(), 4);
        assert_eq!(parsed.row_errors[0].line, 3);
        assert!(parsed.row_errors[1].message.contains("gene"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let parsed = parse("gene,variant\n\nA,1\n,\n").unwrap();
        assert_eq!(parsed.total_rows(), 1);
    }

    #[test]
    fn test_empty_file() {
        assert_eq!(parse("").unwrap_err(), ValidationError::EmptyImport);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ImportFormat::from_path(Path::new("a.CSV")).unwrap(), ImportFormat::Csv);
        assert_eq!(ImportFormat::from_path(Path::new("a.tsv")).unwrap(), ImportFormat::Tsv);
        assert_eq!(ImportFormat::from_path(Path::new("a.txt")).unwrap(), ImportFormat::Tsv);
        assert_eq!(
            ImportFormat::from_path(Path::new("cohort.xlsx")).unwrap_err(),
            ValidationError::UnsupportedFormat {
                extension: "xlsx".to_string()
            }
        );
    }
}
