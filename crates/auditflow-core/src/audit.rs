use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// How an input file enters the audit pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// CSV/TSV/plain text: sent to the audit endpoint as-is.
    Delimited,
    /// Spreadsheet container that may hold several candidate sheets.
    Workbook,
}

impl FileKind {
    /// Classify by file extension. `None` means the format is not accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)?;
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "xlsx" | "xlsm" | "xls" => Some(Self::Workbook),
            _ => None,
        }
    }
}

/// A user-selected input file held in memory for the lifetime of the attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    content_type: Option<String>,
    bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_name(&self.name)
    }

    /// Declared MIME type, or one inferred from the extension.
    pub fn content_type(&self) -> &str {
        if let Some(ct) = &self.content_type {
            return ct;
        }
        let lower = self.name.to_ascii_lowercase();
        if lower.ends_with(".csv") {
            "text/csv"
        } else if lower.ends_with(".tsv") {
            "text/tab-separated-values"
        } else if lower.ends_with(".xlsx") {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        } else if lower.ends_with(".xlsm") {
            "application/vnd.ms-excel.sheet.macroEnabled.12"
        } else if lower.ends_with(".xls") {
            "application/vnd.ms-excel"
        } else if lower.ends_with(".txt") {
            "text/plain"
        } else {
            "application/octet-stream"
        }
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            name: self.name.clone(),
            size_bytes: self.bytes.len() as u64,
        }
    }
}

/// Serializable description of the selected file, without its contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub name: String,
    pub size_bytes: u64,
}

/// Explicit correspondence between source columns and required fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub account_column: String,
    pub debit_column: String,
    pub credit_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name_column: Option<String>,
}

/// Column-detection report returned when confidence is below the server threshold.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnDetection {
    pub account_column: Option<String>,
    pub debit_column: Option<String>,
    pub credit_column: Option<String>,
    pub account_confidence: f64,
    pub debit_confidence: f64,
    pub credit_confidence: f64,
    pub overall_confidence: f64,
    pub all_columns: Vec<String>,
    pub detection_notes: Vec<String>,
}

impl ColumnDetection {
    /// Best-guess mapping if every required column was detected.
    pub fn suggested_mapping(&self) -> Option<ColumnMapping> {
        Some(ColumnMapping {
            account_column: self.account_column.clone()?,
            debit_column: self.debit_column.clone()?,
            credit_column: self.credit_column.clone()?,
            account_name_column: None,
        })
    }
}

/// One sheet inside a spreadsheet container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetInfo {
    pub name: String,
    pub row_count: u64,
    pub column_count: u64,
    pub has_data: bool,
}

/// Sheet candidates extracted from a spreadsheet container.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbookInfo {
    pub filename: String,
    pub sheets: Vec<SheetInfo>,
}

impl WorkbookInfo {
    /// Sheets that actually contain data.
    pub fn candidate_sheets(&self) -> impl Iterator<Item = &SheetInfo> {
        self.sheets.iter().filter(|s| s.has_data)
    }

    /// The only data-bearing sheet, if the container is unambiguous.
    pub fn single_candidate(&self) -> Option<&SheetInfo> {
        let mut candidates = self.candidate_sheets();
        let first = candidates.next()?;
        candidates.next().is_none().then_some(first)
    }

    pub fn requires_selection(&self) -> bool {
        self.candidate_sheets().count() > 1
    }
}

/// The user's choice of sheet (and optional cell range) inside a workbook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetSelection {
    pub sheet_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

impl SheetSelection {
    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            sheet_name: name.into(),
            range: None,
        }
    }
}

/// Materiality verdict for an abnormal balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Materiality {
    Material,
    Immaterial,
}

/// An account whose balance runs against its expected direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbnormalBalance {
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    pub amount: f64,
    #[serde(default)]
    pub issue: String,
}

/// An abnormal balance classified against the session's threshold.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedBalance {
    #[serde(flatten)]
    pub balance: AbnormalBalance,
    pub materiality: Materiality,
}

/// Payload of a successful audit computation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditResult {
    pub balanced: bool,
    pub total_debits: f64,
    pub total_credits: f64,
    pub difference: f64,
    pub row_count: u64,
    pub abnormal_balances: Vec<AbnormalBalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratios: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_detection: Option<ColumnDetection>,
}

impl AuditResult {
    /// Whether the result carries computed ratios a benchmark can use.
    pub fn has_ratios(&self) -> bool {
        self.ratios.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Classify abnormal balances: material when `|amount| >= threshold`.
    pub fn classify(&self, threshold: f64) -> Vec<ClassifiedBalance> {
        self.abnormal_balances
            .iter()
            .map(|b| ClassifiedBalance {
                materiality: if b.amount.abs() >= threshold {
                    Materiality::Material
                } else {
                    Materiality::Immaterial
                },
                balance: b.clone(),
            })
            .collect()
    }
}

/// Everything the remote audit endpoint needs for one request.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditRequest {
    pub file: SelectedFile,
    pub materiality_threshold: f64,
    pub column_mapping: Option<ColumnMapping>,
    pub sheet_selection: Option<SheetSelection>,
    /// Manual account overrides read from the mapping-override store.
    pub account_overrides: serde_json::Map<String, serde_json::Value>,
}

/// Structured, non-error responses from the remote audit endpoint.
#[derive(Clone, Debug, PartialEq)]
pub enum AuditOutcome {
    Success(AuditResult),
    RequiresMapping(ColumnDetection),
    RequiresWorkbookSelection(WorkbookInfo),
}
