//! Reset and rerun.

use tracing::{debug, info, instrument};

use auditflow_core::audit::FileKind;
use auditflow_core::session::AuditStatus;

use crate::error::OrchestratorError;
use crate::orchestrator::AuditOrchestrator;

impl AuditOrchestrator {
    /// Return to idle from any status, including mid-flight.
    ///
    /// An in-flight request is not cancelled; its response is discarded when
    /// it lands. Threshold, display mode and the settings latch survive.
    /// Resetting an idle session changes nothing.
    pub fn reset_audit(&self) {
        let mut state = self.inner.state.lock();
        if state.status() == AuditStatus::Idle && state.selected_file.is_none() {
            debug!(session_id = %self.inner.session_id, "reset on idle session");
            return;
        }
        let from = state.status();
        state.abandon();
        self.emit_status(&state);
        info!(session_id = %self.inner.session_id, from = %from, generation = %state.generation, "audit reset");
    }

    /// Replay the last attempt with the retained file and structural choices.
    ///
    /// Reads the threshold and mapping overrides afresh. A no-op without a
    /// file or while a gate is waiting for input.
    #[instrument(skip(self), fields(session_id = %self.inner.session_id))]
    pub async fn rerun_audit(&self) -> Result<AuditStatus, OrchestratorError> {
        let (kind, file, needs_inspection, generation) = {
            let mut state = self.inner.state.lock();
            let Some(file) = state.selected_file.clone() else {
                debug!("rerun without a selected file");
                return Ok(state.status());
            };
            match state.status() {
                AuditStatus::Loading => return Err(OrchestratorError::AuditInFlight),
                status @ (AuditStatus::Idle
                | AuditStatus::AwaitingColumnMapping
                | AuditStatus::AwaitingWorkbookSelection) => {
                    debug!(status = %status, "rerun ignored");
                    return Ok(status);
                }
                AuditStatus::Success | AuditStatus::Error => {}
            }
            let Some(kind) = file.kind() else {
                return Err(OrchestratorError::UnsupportedFile(file.name().to_string()));
            };
            let needs_inspection =
                kind == FileKind::Workbook && state.context.sheet_selection.is_none();
            let generation = self.dispatch(&mut state);
            (kind, file, needs_inspection, generation)
        };
        Ok(if needs_inspection {
            self.ingest(kind, file, generation).await
        } else {
            self.execute(generation).await
        })
    }
}
