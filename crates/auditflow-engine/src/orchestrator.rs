//! The session aggregate and its read surface.
//!
//! Operations live next to the component that owns them: ingestion and the
//! workbook gate in `ingestion`, the column mapping gate in `mapping`, the
//! remote call in `executor`, post-success continuations in `benchmark` and
//! `engagement`, and reset/rerun in `controller`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use auditflow_core::audit::{AuditResult, FileSummary};
use auditflow_core::benchmark::BenchmarkComparison;
use auditflow_core::ids::{Generation, SessionId};
use auditflow_core::provider::{
    AuditEndpoint, BenchmarkEndpoint, EngagementTracker, MappingOverrideStore,
};
use auditflow_core::session::{
    AuditStatus, DisplayMode, PendingColumnDetection, PendingWorkbookInfo,
};

use crate::error::OrchestratorError;
use crate::events::{AuditEvent, EventEmitter};
use crate::overrides::InMemoryMappingOverrides;
use crate::settings::SessionDefaults;
use crate::state::{AuditPhase, AuditView, SessionState};

pub(crate) struct Inner {
    pub(crate) session_id: SessionId,
    pub(crate) state: Mutex<SessionState>,
    pub(crate) audit: Arc<dyn AuditEndpoint>,
    pub(crate) benchmark: Option<Arc<dyn BenchmarkEndpoint>>,
    pub(crate) overrides: Arc<dyn MappingOverrideStore>,
    pub(crate) engagement: Option<Arc<dyn EngagementTracker>>,
    pub(crate) emitter: EventEmitter,
    pub(crate) tasks: TaskTracker,
}

/// Drives one audit session. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct AuditOrchestrator {
    pub(crate) inner: Arc<Inner>,
}

/// Collaborator wiring for an [`AuditOrchestrator`].
pub struct OrchestratorBuilder {
    session_id: Option<SessionId>,
    audit: Arc<dyn AuditEndpoint>,
    benchmark: Option<Arc<dyn BenchmarkEndpoint>>,
    overrides: Option<Arc<dyn MappingOverrideStore>>,
    engagement: Option<Arc<dyn EngagementTracker>>,
    defaults: SessionDefaults,
}

impl OrchestratorBuilder {
    #[must_use]
    pub fn session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    #[must_use]
    pub fn benchmark(mut self, benchmark: Arc<dyn BenchmarkEndpoint>) -> Self {
        self.benchmark = Some(benchmark);
        self
    }

    #[must_use]
    pub fn overrides(mut self, overrides: Arc<dyn MappingOverrideStore>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    /// Attach an engagement. Without one, post-success linkage is skipped entirely.
    #[must_use]
    pub fn engagement(mut self, engagement: Arc<dyn EngagementTracker>) -> Self {
        self.engagement = Some(engagement);
        self
    }

    #[must_use]
    pub fn defaults(mut self, defaults: SessionDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn build(self) -> AuditOrchestrator {
        let session_id = self.session_id.unwrap_or_default();
        debug!(
            session_id = %session_id,
            threshold = self.defaults.materiality_threshold,
            display_mode = %self.defaults.display_mode,
            benchmark = self.benchmark.is_some(),
            engagement = self.engagement.is_some(),
            "audit session created"
        );
        AuditOrchestrator {
            inner: Arc::new(Inner {
                session_id,
                state: Mutex::new(SessionState::new(self.defaults)),
                audit: self.audit,
                benchmark: self.benchmark,
                overrides: self
                    .overrides
                    .unwrap_or_else(|| Arc::new(InMemoryMappingOverrides::new())),
                engagement: self.engagement,
                emitter: EventEmitter::new(),
                tasks: TaskTracker::new(),
            }),
        }
    }
}

impl AuditOrchestrator {
    pub fn builder(audit: Arc<dyn AuditEndpoint>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            session_id: None,
            audit,
            benchmark: None,
            overrides: None,
            engagement: None,
            defaults: SessionDefaults::default(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.inner.session_id
    }

    /// Snapshot of the whole session.
    pub fn view(&self) -> AuditView {
        self.inner.state.lock().view(&self.inner.session_id)
    }

    pub fn status(&self) -> AuditStatus {
        self.inner.state.lock().status()
    }

    pub fn generation(&self) -> Generation {
        self.inner.state.lock().generation
    }

    pub fn result(&self) -> Option<AuditResult> {
        self.inner.state.lock().phase.result().cloned()
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.inner.state.lock().phase {
            AuditPhase::Error { message } => Some(message.clone()),
            _ => None,
        }
    }

    pub fn selected_file(&self) -> Option<FileSummary> {
        self.inner
            .state
            .lock()
            .selected_file
            .as_ref()
            .map(|f| f.summary())
    }

    pub fn materiality_threshold(&self) -> f64 {
        self.inner.state.lock().materiality_threshold
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.inner.state.lock().display_mode
    }

    pub fn threshold_initialized(&self) -> bool {
        self.inner.state.lock().threshold_initialized
    }

    pub fn show_column_mapping_modal(&self) -> bool {
        self.status() == AuditStatus::AwaitingColumnMapping
    }

    pub fn pending_column_detection(&self) -> Option<PendingColumnDetection> {
        match &self.inner.state.lock().phase {
            AuditPhase::AwaitingColumnMapping(pending) => Some(pending.clone()),
            _ => None,
        }
    }

    pub fn show_workbook_inspector(&self) -> bool {
        self.status() == AuditStatus::AwaitingWorkbookSelection
    }

    pub fn pending_workbook_info(&self) -> Option<PendingWorkbookInfo> {
        match &self.inner.state.lock().phase {
            AuditPhase::AwaitingWorkbookSelection(pending) => Some(pending.clone()),
            _ => None,
        }
    }

    pub fn selected_industry(&self) -> Option<String> {
        self.inner.state.lock().benchmark.selected_industry.clone()
    }

    pub fn available_industries(&self) -> Vec<String> {
        self.inner.state.lock().benchmark.available_industries.clone()
    }

    pub fn comparison_results(&self) -> Option<BenchmarkComparison> {
        self.inner.state.lock().benchmark.comparison_results.clone()
    }

    /// Set the threshold used for client-side classification.
    ///
    /// A manual edit fires the settings latch, so a late practice-settings
    /// delivery can no longer overwrite it.
    pub fn set_materiality_threshold(&self, threshold: f64) -> Result<(), OrchestratorError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(OrchestratorError::InvalidThreshold(threshold));
        }
        let mut state = self.inner.state.lock();
        state.materiality_threshold = threshold;
        state.threshold_initialized = true;
        debug!(session_id = %self.inner.session_id, threshold, "materiality threshold set");
        Ok(())
    }

    /// Set the display mode. Practice settings arriving later keep this mode
    /// but may still supply the threshold.
    pub fn set_display_mode(&self, mode: DisplayMode) {
        let mut state = self.inner.state.lock();
        state.display_mode = mode;
        state.display_mode_pinned = true;
        debug!(session_id = %self.inner.session_id, display_mode = %mode, "display mode set");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.inner.emitter.subscribe()
    }

    /// Wait for every post-success continuation spawned so far.
    pub async fn settle(&self) {
        let tasks = &self.inner.tasks;
        tasks.close();
        tasks.wait().await;
        let _ = tasks.reopen();
    }

    /// Move to `Loading` for a new remote attempt and return its generation.
    ///
    /// Anything computed against the previous result is dropped here.
    pub(crate) fn dispatch(&self, state: &mut SessionState) -> Generation {
        state.generation = state.generation.next();
        state.benchmark.invalidate();
        state.phase = AuditPhase::Loading;
        info!(
            session_id = %self.inner.session_id,
            generation = %state.generation,
            file = state.selected_file.as_ref().map(|f| f.name()).unwrap_or_default(),
            "audit dispatched"
        );
        self.emit_status(state);
        state.generation
    }

    pub(crate) fn set_phase(&self, state: &mut SessionState, phase: AuditPhase) {
        state.phase = phase;
        debug!(
            session_id = %self.inner.session_id,
            generation = %state.generation,
            status = %state.status(),
            "status changed"
        );
        self.emit_status(state);
    }

    pub(crate) fn emit_status(&self, state: &SessionState) {
        let _ = self.inner.emitter.emit(AuditEvent::StatusChanged {
            session_id: self.inner.session_id.clone(),
            generation: state.generation,
            status: state.status(),
        });
    }

    pub(crate) fn emit(&self, event: AuditEvent) {
        let _ = self.inner.emitter.emit(event);
    }

    /// Record that a response for `stale` arrived after the session moved on.
    pub(crate) fn discard_stale(&self, state: &SessionState, stale: Generation) {
        warn!(
            session_id = %self.inner.session_id,
            response_generation = %stale,
            current_generation = %state.generation,
            status = %state.status(),
            "discarding stale response"
        );
        self.emit(AuditEvent::StaleResponseDiscarded {
            session_id: self.inner.session_id.clone(),
            response_generation: stale,
            current_generation: state.generation,
        });
    }
}
