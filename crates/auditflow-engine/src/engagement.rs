//! Engagement linkage after a successful audit.

use tracing::info;

use auditflow_core::ids::Generation;

use crate::events::AuditEvent;
use crate::orchestrator::AuditOrchestrator;

impl AuditOrchestrator {
    /// Link the success tagged `generation` to the attached engagement, if any.
    ///
    /// Called once per committed success. The linkage runs in the background
    /// and always invokes both engagement capabilities, even if the session
    /// is reset or redispatched before the task is scheduled.
    pub(crate) fn link_engagement(&self, generation: Generation) {
        let Some(tracker) = self.inner.engagement.clone() else {
            return;
        };
        let this = self.clone();
        let _ = self.inner.tasks.spawn(async move {
            tracker.refresh_tool_runs().await;
            tracker.trigger_link_toast();
            info!(
                session_id = %this.inner.session_id,
                engagement_id = %tracker.engagement_id(),
                generation = %generation,
                "audit linked to engagement"
            );
            this.emit(AuditEvent::EngagementLinked {
                session_id: this.inner.session_id.clone(),
                engagement_id: tracker.engagement_id().clone(),
            });
        });
    }
}
