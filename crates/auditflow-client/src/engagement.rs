use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, warn};

use auditflow_core::errors::AuditError;
use auditflow_core::ids::EngagementId;
use auditflow_core::provider::EngagementTracker;

use crate::http::{decode, read_body, send, HttpAuditClient};

/// A tool run recorded against an engagement.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ToolRun {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ToolRunsResponse {
    Wrapped { tool_runs: Vec<ToolRun> },
    Bare(Vec<ToolRun>),
}

type ToastFn = dyn Fn(&EngagementId) + Send + Sync;

/// Engagement tracker backed by the engagement service.
///
/// Refreshing re-reads the engagement's tool runs; the link toast is handed
/// to a caller-supplied notifier.
pub struct HttpEngagementTracker {
    client: HttpAuditClient,
    engagement_id: EngagementId,
    tool_runs: Mutex<Vec<ToolRun>>,
    on_toast: Arc<ToastFn>,
}

impl HttpEngagementTracker {
    pub fn new(
        client: HttpAuditClient,
        engagement_id: EngagementId,
        on_toast: impl Fn(&EngagementId) + Send + Sync + 'static,
    ) -> Self {
        Self {
            client,
            engagement_id,
            tool_runs: Mutex::new(Vec::new()),
            on_toast: Arc::new(on_toast),
        }
    }

    /// Tool runs seen at the last refresh.
    pub fn tool_runs(&self) -> Vec<ToolRun> {
        self.tool_runs.lock().clone()
    }

    async fn fetch_tool_runs(&self) -> Result<Vec<ToolRun>, AuditError> {
        let url = self
            .client
            .url(&format!("/engagements/{}/tool-runs", self.engagement_id));
        let req = self.client.authorize(self.client.http().get(url));
        let body = read_body(send(req).await?).await?;
        Ok(match decode::<ToolRunsResponse>(&body)? {
            ToolRunsResponse::Wrapped { tool_runs } | ToolRunsResponse::Bare(tool_runs) => tool_runs,
        })
    }
}

#[async_trait]
impl EngagementTracker for HttpEngagementTracker {
    fn engagement_id(&self) -> &EngagementId {
        &self.engagement_id
    }

    async fn refresh_tool_runs(&self) {
        match self.fetch_tool_runs().await {
            Ok(runs) => {
                debug!(engagement_id = %self.engagement_id, count = runs.len(), "tool runs refreshed");
                *self.tool_runs.lock() = runs;
            }
            Err(e) => {
                warn!(engagement_id = %self.engagement_id, error = %e, "failed to refresh tool runs");
            }
        }
    }

    fn trigger_link_toast(&self) {
        (self.on_toast)(&self.engagement_id);
    }
}
