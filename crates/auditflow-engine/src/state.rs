use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use auditflow_core::audit::{AuditResult, ClassifiedBalance, FileSummary, Materiality, SelectedFile};
use auditflow_core::benchmark::BenchmarkComparison;
use auditflow_core::ids::{Generation, SessionId};
use auditflow_core::session::{
    AuditStatus, DisplayMode, PendingColumnDetection, PendingWorkbookInfo, RequestContext,
};

use crate::settings::SessionDefaults;

/// Session status with each variant carrying its own payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum AuditPhase {
    #[default]
    Idle,
    Loading,
    AwaitingColumnMapping(PendingColumnDetection),
    AwaitingWorkbookSelection(PendingWorkbookInfo),
    Success {
        result: AuditResult,
        completed_at: DateTime<Utc>,
    },
    Error {
        message: String,
    },
}

impl AuditPhase {
    pub fn status(&self) -> AuditStatus {
        match self {
            Self::Idle => AuditStatus::Idle,
            Self::Loading => AuditStatus::Loading,
            Self::AwaitingColumnMapping(_) => AuditStatus::AwaitingColumnMapping,
            Self::AwaitingWorkbookSelection(_) => AuditStatus::AwaitingWorkbookSelection,
            Self::Success { .. } => AuditStatus::Success,
            Self::Error { .. } => AuditStatus::Error,
        }
    }

    pub fn result(&self) -> Option<&AuditResult> {
        match self {
            Self::Success { result, .. } => Some(result),
            _ => None,
        }
    }
}

/// Benchmark state owned by the benchmark integrator.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct BenchmarkSelection {
    pub(crate) selected_industry: Option<String>,
    pub(crate) comparison_results: Option<BenchmarkComparison>,
    pub(crate) available_industries: Vec<String>,
}

impl BenchmarkSelection {
    /// Drop anything computed against a previous result.
    pub(crate) fn invalidate(&mut self) {
        self.selected_industry = None;
        self.comparison_results = None;
    }
}

/// Mutable session state. Guarded by a mutex that is never held across an await.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub(crate) phase: AuditPhase,
    pub(crate) selected_file: Option<SelectedFile>,
    /// Sheet selection and column mapping accumulated for `selected_file`.
    pub(crate) context: RequestContext,
    pub(crate) generation: Generation,
    pub(crate) materiality_threshold: f64,
    pub(crate) display_mode: DisplayMode,
    pub(crate) threshold_initialized: bool,
    /// Set by a manual display mode change; practice settings then only
    /// supply the threshold.
    pub(crate) display_mode_pinned: bool,
    pub(crate) benchmark: BenchmarkSelection,
}

impl SessionState {
    pub(crate) fn new(defaults: SessionDefaults) -> Self {
        Self {
            phase: AuditPhase::Idle,
            selected_file: None,
            context: RequestContext::default(),
            generation: Generation::default(),
            materiality_threshold: defaults.materiality_threshold,
            display_mode: defaults.display_mode,
            threshold_initialized: false,
            display_mode_pinned: false,
            benchmark: BenchmarkSelection::default(),
        }
    }

    pub(crate) fn status(&self) -> AuditStatus {
        self.phase.status()
    }

    /// Whether a response tagged with `generation` still belongs to this session.
    pub(crate) fn is_current(&self, generation: Generation) -> bool {
        self.generation == generation
    }

    /// Return to idle, invalidating anything in flight.
    ///
    /// Threshold, display mode, the settings latch and the industry list survive.
    pub(crate) fn abandon(&mut self) {
        self.phase = AuditPhase::Idle;
        self.selected_file = None;
        self.context = RequestContext::default();
        self.benchmark.invalidate();
        self.generation = self.generation.next();
    }

    pub(crate) fn view(&self, session_id: &SessionId) -> AuditView {
        let (pending_column_detection, pending_workbook_info) = match &self.phase {
            AuditPhase::AwaitingColumnMapping(p) => (Some(p.clone()), None),
            AuditPhase::AwaitingWorkbookSelection(p) => (None, Some(p.clone())),
            _ => (None, None),
        };
        AuditView {
            session_id: session_id.clone(),
            generation: self.generation,
            status: self.status(),
            result: self.phase.result().cloned(),
            error_message: match &self.phase {
                AuditPhase::Error { message } => Some(message.clone()),
                _ => None,
            },
            selected_file: self.selected_file.as_ref().map(SelectedFile::summary),
            materiality_threshold: self.materiality_threshold,
            display_mode: self.display_mode,
            threshold_initialized: self.threshold_initialized,
            show_column_mapping_modal: pending_column_detection.is_some(),
            pending_column_detection,
            show_workbook_inspector: pending_workbook_info.is_some(),
            pending_workbook_info,
            selected_industry: self.benchmark.selected_industry.clone(),
            available_industries: self.benchmark.available_industries.clone(),
            comparison_results: self.benchmark.comparison_results.clone(),
        }
    }
}

/// Serializable snapshot of everything presentation layers read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditView {
    pub session_id: SessionId,
    pub generation: Generation,
    pub status: AuditStatus,
    pub result: Option<AuditResult>,
    pub error_message: Option<String>,
    pub selected_file: Option<FileSummary>,
    pub materiality_threshold: f64,
    pub display_mode: DisplayMode,
    pub threshold_initialized: bool,
    pub show_column_mapping_modal: bool,
    pub pending_column_detection: Option<PendingColumnDetection>,
    pub show_workbook_inspector: bool,
    pub pending_workbook_info: Option<PendingWorkbookInfo>,
    pub selected_industry: Option<String>,
    pub available_industries: Vec<String>,
    pub comparison_results: Option<BenchmarkComparison>,
}

impl AuditView {
    /// Abnormal balances classified at the current threshold, filtered by display mode.
    pub fn visible_balances(&self) -> Vec<ClassifiedBalance> {
        let Some(result) = &self.result else {
            return Vec::new();
        };
        result
            .classify(self.materiality_threshold)
            .into_iter()
            .filter(|b| {
                self.display_mode.shows_immaterial() || b.materiality == Materiality::Material
            })
            .collect()
    }

    /// Check the per-status invariants of the session.
    pub fn check_invariants(&self) -> Result<(), String> {
        let pending = self.pending_column_detection.is_some() || self.pending_workbook_info.is_some();
        match self.status {
            AuditStatus::Idle => {
                if self.selected_file.is_some()
                    || self.result.is_some()
                    || self.error_message.is_some()
                    || pending
                {
                    return Err(format!("idle session carries state: {self:?}"));
                }
            }
            AuditStatus::Loading => {
                if self.selected_file.is_none() {
                    return Err("loading without a selected file".into());
                }
                if self.result.is_some() || self.error_message.is_some() || pending {
                    return Err("loading session carries stale payload".into());
                }
            }
            AuditStatus::AwaitingColumnMapping => {
                if self.pending_column_detection.is_none() || self.selected_file.is_none() {
                    return Err("column mapping gate without detection or file".into());
                }
            }
            AuditStatus::AwaitingWorkbookSelection => {
                if self.pending_workbook_info.is_none() || self.selected_file.is_none() {
                    return Err("workbook gate without workbook info or file".into());
                }
            }
            AuditStatus::Success => {
                if self.result.is_none() || self.error_message.is_some() {
                    return Err("success without result".into());
                }
            }
            AuditStatus::Error => match &self.error_message {
                Some(m) if !m.is_empty() => {}
                _ => return Err("error status without message".into()),
            },
        }
        if self.status != AuditStatus::Success && self.comparison_results.is_some() {
            return Err("benchmark comparison outlived its result".into());
        }
        Ok(())
    }
}
