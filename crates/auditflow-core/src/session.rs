use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audit::{ColumnDetection, ColumnMapping, SheetSelection, WorkbookInfo};

/// Flat status tag of an audit session, as seen by presentation layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Idle,
    Loading,
    AwaitingColumnMapping,
    AwaitingWorkbookSelection,
    Success,
    Error,
}

impl AuditStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::AwaitingColumnMapping => "awaiting_column_mapping",
            Self::AwaitingWorkbookSelection => "awaiting_workbook_selection",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether immaterial items are shown alongside material ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Material items only.
    #[default]
    Strict,
    /// Material and immaterial items.
    Lenient,
}

impl DisplayMode {
    pub fn shows_immaterial(self) -> bool {
        matches!(self, Self::Lenient)
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            other => Err(format!("unknown display mode: {other}")),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
        })
    }
}

/// Structural choices accumulated for the current file across gates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_selection: Option<SheetSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_mapping: Option<ColumnMapping>,
}

/// Low-confidence detection report plus what is needed to resume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingColumnDetection {
    pub detection: ColumnDetection,
    /// Context of the request that produced the report. When the gate
    /// reopens after a confirmed mapping, `context.column_mapping` still holds
    /// the user's previous choice so it can seed the form.
    pub context: RequestContext,
}

impl PendingColumnDetection {
    /// Mapping to pre-fill: the user's previous choice, else the detector's guess.
    pub fn default_mapping(&self) -> Option<ColumnMapping> {
        self.context
            .column_mapping
            .clone()
            .or_else(|| self.detection.suggested_mapping())
    }
}

/// Sheet candidates awaiting the user's structural selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWorkbookInfo {
    pub workbook_info: WorkbookInfo,
}
