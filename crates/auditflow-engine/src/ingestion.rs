//! File ingestion and the workbook selection gate.

use tracing::{debug, info, instrument, warn};

use auditflow_core::audit::{FileKind, SelectedFile, SheetSelection};
use auditflow_core::ids::Generation;
use auditflow_core::session::{AuditStatus, PendingWorkbookInfo, RequestContext};

use crate::error::OrchestratorError;
use crate::orchestrator::AuditOrchestrator;
use crate::state::AuditPhase;

pub(crate) const NO_DATA_SHEETS_MESSAGE: &str = "The workbook does not contain any sheets with data.";

impl AuditOrchestrator {
    /// Start an audit for a newly selected file.
    ///
    /// Delimited text goes straight to the remote audit. Workbooks are
    /// inspected first; more than one data sheet opens the workbook gate.
    /// Rejected without touching the session when the file type is not
    /// accepted, a request is in flight, or a gate is waiting for input.
    #[instrument(skip(self, file), fields(session_id = %self.inner.session_id, file = file.name()))]
    pub async fn submit_file(&self, file: SelectedFile) -> Result<AuditStatus, OrchestratorError> {
        let Some(kind) = file.kind() else {
            return Err(OrchestratorError::UnsupportedFile(file.name().to_string()));
        };
        let generation = {
            let mut state = self.inner.state.lock();
            match state.status() {
                AuditStatus::Loading => return Err(OrchestratorError::AuditInFlight),
                status @ (AuditStatus::AwaitingColumnMapping
                | AuditStatus::AwaitingWorkbookSelection) => {
                    return Err(OrchestratorError::AwaitingInput(status));
                }
                AuditStatus::Idle | AuditStatus::Success | AuditStatus::Error => {}
            }
            state.selected_file = Some(file.clone());
            state.context = RequestContext::default();
            self.dispatch(&mut state)
        };
        Ok(self.ingest(kind, file, generation).await)
    }

    /// Route a dispatched file by kind.
    pub(crate) async fn ingest(
        &self,
        kind: FileKind,
        file: SelectedFile,
        generation: Generation,
    ) -> AuditStatus {
        match kind {
            FileKind::Delimited => self.execute(generation).await,
            FileKind::Workbook => self.inspect_workbook(file, generation).await,
        }
    }

    async fn inspect_workbook(&self, file: SelectedFile, generation: Generation) -> AuditStatus {
        let inspected = self.inner.audit.inspect_workbook(&file).await;
        {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                self.discard_stale(&state, generation);
                return state.status();
            }
            match inspected {
                Ok(workbook_info) if workbook_info.requires_selection() => {
                    info!(
                        generation = %generation,
                        candidates = workbook_info.candidate_sheets().count(),
                        "workbook selection required"
                    );
                    self.set_phase(
                        &mut state,
                        AuditPhase::AwaitingWorkbookSelection(PendingWorkbookInfo { workbook_info }),
                    );
                    return state.status();
                }
                Ok(workbook_info) => {
                    let Some(sheet) = workbook_info.single_candidate() else {
                        warn!(generation = %generation, "workbook has no data sheets");
                        self.set_phase(
                            &mut state,
                            AuditPhase::Error {
                                message: NO_DATA_SHEETS_MESSAGE.to_string(),
                            },
                        );
                        return state.status();
                    };
                    debug!(generation = %generation, sheet = %sheet.name, "single data sheet selected");
                    state.context.sheet_selection = Some(SheetSelection::sheet(sheet.name.clone()));
                }
                Err(e) => {
                    warn!(generation = %generation, error = %e, "workbook inspection failed");
                    self.set_phase(
                        &mut state,
                        AuditPhase::Error {
                            message: e.user_message(),
                        },
                    );
                    return state.status();
                }
            }
        }
        self.execute(generation).await
    }

    /// Resume with the user's sheet choice.
    #[instrument(skip(self), fields(session_id = %self.inner.session_id))]
    pub async fn confirm_workbook_selection(
        &self,
        selection: SheetSelection,
    ) -> Result<AuditStatus, OrchestratorError> {
        let generation = {
            let mut state = self.inner.state.lock();
            let AuditPhase::AwaitingWorkbookSelection(pending) = &state.phase else {
                return Err(OrchestratorError::NoPendingWorkbook(state.status()));
            };
            if !pending
                .workbook_info
                .sheets
                .iter()
                .any(|s| s.name == selection.sheet_name)
            {
                return Err(OrchestratorError::UnknownSheet(selection.sheet_name));
            }
            state.context.sheet_selection = Some(selection);
            self.dispatch(&mut state)
        };
        Ok(self.execute(generation).await)
    }

    /// Abandon the attempt from the workbook gate. A no-op outside the gate.
    pub fn close_workbook_inspector(&self) {
        let mut state = self.inner.state.lock();
        if !matches!(state.phase, AuditPhase::AwaitingWorkbookSelection(_)) {
            debug!(session_id = %self.inner.session_id, status = %state.status(), "no workbook gate to close");
            return;
        }
        state.abandon();
        self.emit_status(&state);
        info!(session_id = %self.inner.session_id, "workbook selection abandoned");
    }
}
