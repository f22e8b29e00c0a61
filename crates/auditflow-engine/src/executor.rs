//! The remote audit call and the transition on its outcome.

use chrono::Utc;
use tracing::{info, instrument, warn};

use auditflow_core::audit::{AuditOutcome, AuditRequest};
use auditflow_core::ids::Generation;
use auditflow_core::session::{AuditStatus, PendingColumnDetection, PendingWorkbookInfo};

use crate::orchestrator::AuditOrchestrator;
use crate::state::AuditPhase;

impl AuditOrchestrator {
    /// Issue exactly one audit request for `generation` and apply its outcome.
    ///
    /// The outcome is dropped if the session moved past `generation` while
    /// the request was in flight.
    #[instrument(skip(self), fields(session_id = %self.inner.session_id))]
    pub(crate) async fn execute(&self, generation: Generation) -> AuditStatus {
        let account_overrides = self.inner.overrides.overrides_for_api();
        let request = {
            let state = self.inner.state.lock();
            if !state.is_current(generation) {
                return state.status();
            }
            let Some(file) = state.selected_file.clone() else {
                return state.status();
            };
            AuditRequest {
                file,
                materiality_threshold: state.materiality_threshold,
                column_mapping: state.context.column_mapping.clone(),
                sheet_selection: state.context.sheet_selection.clone(),
                account_overrides,
            }
        };

        let outcome = self.inner.audit.run_audit(&request).await;

        let succeeded = {
            let mut state = self.inner.state.lock();
            if !state.is_current(generation) {
                self.discard_stale(&state, generation);
                return state.status();
            }
            match outcome {
                Ok(AuditOutcome::Success(result)) => {
                    info!(
                        generation = %generation,
                        balanced = result.balanced,
                        abnormal = result.abnormal_balances.len(),
                        "audit succeeded"
                    );
                    state.benchmark.invalidate();
                    self.set_phase(
                        &mut state,
                        AuditPhase::Success {
                            result,
                            completed_at: Utc::now(),
                        },
                    );
                    true
                }
                Ok(AuditOutcome::RequiresMapping(detection)) => {
                    info!(
                        generation = %generation,
                        confidence = detection.overall_confidence,
                        "column mapping required"
                    );
                    let pending = PendingColumnDetection {
                        detection,
                        context: state.context.clone(),
                    };
                    self.set_phase(&mut state, AuditPhase::AwaitingColumnMapping(pending));
                    false
                }
                Ok(AuditOutcome::RequiresWorkbookSelection(workbook_info)) => {
                    info!(
                        generation = %generation,
                        sheets = workbook_info.sheets.len(),
                        "workbook selection required"
                    );
                    self.set_phase(
                        &mut state,
                        AuditPhase::AwaitingWorkbookSelection(PendingWorkbookInfo { workbook_info }),
                    );
                    false
                }
                Err(e) => {
                    warn!(generation = %generation, kind = e.error_kind(), error = %e, "audit failed");
                    self.set_phase(
                        &mut state,
                        AuditPhase::Error {
                            message: e.user_message(),
                        },
                    );
                    false
                }
            }
        };

        if succeeded {
            self.link_engagement(generation);
            AuditStatus::Success
        } else {
            self.status()
        }
    }
}
