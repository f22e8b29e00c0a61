//! Column mapping gate.

use tracing::{debug, info, instrument};

use auditflow_core::audit::ColumnMapping;
use auditflow_core::session::AuditStatus;

use crate::error::OrchestratorError;
use crate::orchestrator::AuditOrchestrator;
use crate::state::AuditPhase;

fn validate(mapping: &ColumnMapping) -> Result<(), OrchestratorError> {
    let required = [
        ("account_column", &mapping.account_column),
        ("debit_column", &mapping.debit_column),
        ("credit_column", &mapping.credit_column),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(OrchestratorError::IncompleteMapping(field));
        }
    }
    Ok(())
}

impl AuditOrchestrator {
    /// Resume the audit with an explicit column mapping.
    ///
    /// Another low-confidence response reopens the gate, seeded with this mapping.
    #[instrument(skip(self, mapping), fields(session_id = %self.inner.session_id))]
    pub async fn confirm_column_mapping(
        &self,
        mapping: ColumnMapping,
    ) -> Result<AuditStatus, OrchestratorError> {
        let generation = {
            let mut state = self.inner.state.lock();
            let AuditPhase::AwaitingColumnMapping(pending) = &state.phase else {
                return Err(OrchestratorError::NoPendingColumnDetection(state.status()));
            };
            validate(&mapping)?;
            let mut context = pending.context.clone();
            context.column_mapping = Some(mapping);
            state.context = context;
            self.dispatch(&mut state)
        };
        Ok(self.execute(generation).await)
    }

    /// Abandon the attempt from the column mapping gate. A no-op outside the gate.
    pub fn close_column_mapping(&self) {
        let mut state = self.inner.state.lock();
        if !matches!(state.phase, AuditPhase::AwaitingColumnMapping(_)) {
            debug!(session_id = %self.inner.session_id, status = %state.status(), "no column mapping gate to close");
            return;
        }
        state.abandon();
        self.emit_status(&state);
        info!(session_id = %self.inner.session_id, "column mapping abandoned");
    }
}
