//! Collaborator seams consumed by the orchestrator.

use async_trait::async_trait;

use crate::audit::{AuditOutcome, AuditRequest, SelectedFile, WorkbookInfo};
use crate::benchmark::{BenchmarkComparison, BenchmarkRequest};
use crate::errors::AuditError;
use crate::ids::EngagementId;
use crate::practice::PracticeSettings;

/// Remote trial-balance audit computation.
#[async_trait]
pub trait AuditEndpoint: Send + Sync {
    /// Run the audit. Gate-required branches come back as `Ok` outcomes.
    async fn run_audit(&self, request: &AuditRequest) -> Result<AuditOutcome, AuditError>;

    /// List the sheets of a spreadsheet container.
    async fn inspect_workbook(&self, file: &SelectedFile) -> Result<WorkbookInfo, AuditError>;
}

/// Remote industry benchmark comparison.
#[async_trait]
pub trait BenchmarkEndpoint: Send + Sync {
    async fn compare(&self, request: &BenchmarkRequest) -> Result<BenchmarkComparison, AuditError>;

    async fn list_industries(&self) -> Result<Vec<String>, AuditError>;
}

/// Source of practice-level defaults.
#[async_trait]
pub trait PracticeSettingsSource: Send + Sync {
    async fn fetch_practice_settings(&self) -> Result<Option<PracticeSettings>, AuditError>;
}

/// Read-only view of manual account mapping overrides.
pub trait MappingOverrideStore: Send + Sync {
    fn overrides_for_api(&self) -> serde_json::Map<String, serde_json::Value>;
}

/// Externally-owned tracked unit of work an audit can be linked to.
///
/// Callers supply the whole capability or nothing; implementations own
/// their internal state and handle their own failures.
#[async_trait]
pub trait EngagementTracker: Send + Sync {
    fn engagement_id(&self) -> &EngagementId;

    /// Let the tracker refresh its view of tool runs.
    async fn refresh_tool_runs(&self);

    /// Tell the user the result was associated with the engagement.
    fn trigger_link_toast(&self);
}
