//! Deterministic collaborators for testing without a live audit service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use auditflow_core::audit::{
    AuditOutcome, AuditRequest, AuditResult, ColumnDetection, SelectedFile, WorkbookInfo,
};
use auditflow_core::benchmark::{BenchmarkComparison, BenchmarkRequest};
use auditflow_core::errors::AuditError;
use auditflow_core::ids::EngagementId;
use auditflow_core::practice::PracticeSettings;
use auditflow_core::provider::{
    AuditEndpoint, BenchmarkEndpoint, EngagementTracker, PracticeSettingsSource,
};

/// Pre-programmed response for a mock endpoint call.
pub enum MockResponse<T> {
    Ok(T),
    Error(AuditError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse<T>>),
    /// Wait until the `Notify` fires, then yield the inner response.
    Hold(Arc<Notify>, Box<MockResponse<T>>),
}

impl<T> MockResponse<T> {
    pub fn delayed(delay: Duration, inner: MockResponse<T>) -> Self {
        Self::Delay(delay, Box::new(inner))
    }

    pub fn held(gate: Arc<Notify>, inner: MockResponse<T>) -> Self {
        Self::Hold(gate, Box::new(inner))
    }
}

impl MockResponse<AuditOutcome> {
    pub fn success(result: AuditResult) -> Self {
        Self::Ok(AuditOutcome::Success(result))
    }

    pub fn requires_mapping(detection: ColumnDetection) -> Self {
        Self::Ok(AuditOutcome::RequiresMapping(detection))
    }

    pub fn requires_workbook(info: WorkbookInfo) -> Self {
        Self::Ok(AuditOutcome::RequiresWorkbookSelection(info))
    }
}

/// Resolve a response, unrolling nested delays iteratively.
async fn resolve<T>(response: MockResponse<T>) -> Result<T, AuditError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Ok(value) => return Ok(value),
            MockResponse::Error(e) => return Err(e),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
            MockResponse::Hold(gate, inner) => {
                gate.notified().await;
                current = *inner;
            }
        }
    }
}

fn exhausted(what: &str, idx: usize) -> AuditError {
    AuditError::Server {
        status: 500,
        message: format!("mock: no {what} response configured for call {idx}"),
    }
}

/// Mock audit endpoint that returns queued responses in order and records requests.
#[derive(Default)]
pub struct MockAuditEndpoint {
    audits: Mutex<VecDeque<MockResponse<AuditOutcome>>>,
    inspections: Mutex<VecDeque<MockResponse<WorkbookInfo>>>,
    requests: Mutex<Vec<AuditRequest>>,
    audit_calls: AtomicUsize,
    inspect_calls: AtomicUsize,
}

impl MockAuditEndpoint {
    pub fn new(audits: Vec<MockResponse<AuditOutcome>>) -> Self {
        Self {
            audits: Mutex::new(audits.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_inspections(self, inspections: Vec<MockResponse<WorkbookInfo>>) -> Self {
        *self.inspections.lock() = inspections.into();
        self
    }

    pub fn push_audit(&self, response: MockResponse<AuditOutcome>) {
        self.audits.lock().push_back(response);
    }

    pub fn audit_calls(&self) -> usize {
        self.audit_calls.load(Ordering::SeqCst)
    }

    pub fn inspect_calls(&self) -> usize {
        self.inspect_calls.load(Ordering::SeqCst)
    }

    /// Every audit request received so far, in order.
    pub fn requests(&self) -> Vec<AuditRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<AuditRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl AuditEndpoint for MockAuditEndpoint {
    async fn run_audit(&self, request: &AuditRequest) -> Result<AuditOutcome, AuditError> {
        let idx = self.audit_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        let next = self.audits.lock().pop_front();
        match next {
            Some(response) => resolve(response).await,
            None => Err(exhausted("audit", idx)),
        }
    }

    async fn inspect_workbook(&self, _file: &SelectedFile) -> Result<WorkbookInfo, AuditError> {
        let idx = self.inspect_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.inspections.lock().pop_front();
        match next {
            Some(response) => resolve(response).await,
            None => Err(exhausted("inspect", idx)),
        }
    }
}

/// Mock benchmark endpoint with queued comparisons and a fixed industry list.
#[derive(Default)]
pub struct MockBenchmarkEndpoint {
    comparisons: Mutex<VecDeque<MockResponse<BenchmarkComparison>>>,
    industries: Vec<String>,
    requests: Mutex<Vec<BenchmarkRequest>>,
    compare_calls: AtomicUsize,
}

impl MockBenchmarkEndpoint {
    pub fn new(comparisons: Vec<MockResponse<BenchmarkComparison>>) -> Self {
        Self {
            comparisons: Mutex::new(comparisons.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_industries(mut self, industries: &[&str]) -> Self {
        self.industries = industries.iter().map(|s| (*s).to_string()).collect();
        self
    }

    pub fn compare_calls(&self) -> usize {
        self.compare_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<BenchmarkRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl BenchmarkEndpoint for MockBenchmarkEndpoint {
    async fn compare(&self, request: &BenchmarkRequest) -> Result<BenchmarkComparison, AuditError> {
        let idx = self.compare_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        let next = self.comparisons.lock().pop_front();
        match next {
            Some(response) => resolve(response).await,
            None => Err(exhausted("benchmark", idx)),
        }
    }

    async fn list_industries(&self) -> Result<Vec<String>, AuditError> {
        Ok(self.industries.clone())
    }
}

/// Practice settings source that always answers with the same value.
pub struct StaticPracticeSettings(pub Option<PracticeSettings>);

#[async_trait]
impl PracticeSettingsSource for StaticPracticeSettings {
    async fn fetch_practice_settings(&self) -> Result<Option<PracticeSettings>, AuditError> {
        Ok(self.0.clone())
    }
}

/// Engagement tracker that counts how often each capability is invoked.
pub struct RecordingEngagementTracker {
    engagement_id: EngagementId,
    refreshes: AtomicUsize,
    toasts: AtomicUsize,
}

impl RecordingEngagementTracker {
    pub fn new(engagement_id: impl Into<String>) -> Self {
        Self {
            engagement_id: EngagementId::from_raw(engagement_id),
            refreshes: AtomicUsize::new(0),
            toasts: AtomicUsize::new(0),
        }
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn toasts(&self) -> usize {
        self.toasts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngagementTracker for RecordingEngagementTracker {
    fn engagement_id(&self) -> &EngagementId {
        &self.engagement_id
    }

    async fn refresh_tool_runs(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn trigger_link_toast(&self) {
        self.toasts.fetch_add(1, Ordering::SeqCst);
    }
}
