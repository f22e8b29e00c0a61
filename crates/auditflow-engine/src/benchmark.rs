//! Industry benchmark comparison against the current result.

use tracing::{debug, info, instrument, warn};

use auditflow_core::benchmark::{BenchmarkComparison, BenchmarkRequest};
use auditflow_core::session::AuditStatus;

use crate::events::AuditEvent;
use crate::orchestrator::AuditOrchestrator;

impl AuditOrchestrator {
    /// Compare the current result's ratios against `industry`.
    ///
    /// Does nothing, and never calls the benchmark endpoint, when the
    /// industry is blank, there is no successful result, the result has no
    /// ratios, or no benchmark endpoint is attached. A comparison that lands
    /// after the result was replaced or the industry changed is dropped.
    #[instrument(skip(self), fields(session_id = %self.inner.session_id))]
    pub async fn change_industry(&self, industry: &str) -> Option<BenchmarkComparison> {
        let industry = industry.trim();
        if industry.is_empty() {
            debug!("blank industry, skipping comparison");
            return None;
        }
        let Some(endpoint) = self.inner.benchmark.clone() else {
            debug!("no benchmark endpoint attached");
            return None;
        };
        let (request, generation) = {
            let mut state = self.inner.state.lock();
            let Some(ratios) = state
                .phase
                .result()
                .and_then(|r| r.ratios.clone())
                .filter(|r| !r.is_empty())
            else {
                debug!(status = %state.status(), "no ratios to benchmark");
                return None;
            };
            state.benchmark.selected_industry = Some(industry.to_string());
            state.benchmark.comparison_results = None;
            let request = BenchmarkRequest {
                industry: industry.to_string(),
                ratios,
            };
            (request, state.generation)
        };

        match endpoint.compare(&request).await {
            Ok(comparison) => {
                let mut state = self.inner.state.lock();
                if !state.is_current(generation)
                    || state.status() != AuditStatus::Success
                    || state.benchmark.selected_industry.as_deref() != Some(industry)
                {
                    debug!(industry, "benchmark comparison superseded");
                    return None;
                }
                state.benchmark.comparison_results = Some(comparison.clone());
                info!(industry, comparisons = comparison.comparisons.len(), "benchmark updated");
                self.emit(AuditEvent::BenchmarkUpdated {
                    session_id: self.inner.session_id.clone(),
                    industry: industry.to_string(),
                });
                Some(comparison)
            }
            Err(e) => {
                warn!(industry, error = %e, "benchmark comparison failed");
                None
            }
        }
    }

    /// Load the benchmark endpoint's industry list.
    ///
    /// On failure the previous list is kept.
    pub async fn refresh_available_industries(&self) -> Vec<String> {
        let Some(endpoint) = self.inner.benchmark.clone() else {
            return self.available_industries();
        };
        match endpoint.list_industries().await {
            Ok(industries) => {
                debug!(session_id = %self.inner.session_id, count = industries.len(), "industries loaded");
                self.inner.state.lock().benchmark.available_industries = industries.clone();
                industries
            }
            Err(e) => {
                warn!(session_id = %self.inner.session_id, error = %e, "failed to load industries");
                self.available_industries()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use auditflow_client::mock::{MockAuditEndpoint, MockBenchmarkEndpoint, MockResponse};
    use auditflow_core::audit::{AuditResult, SelectedFile};
    use auditflow_core::benchmark::BenchmarkComparison;

    use crate::orchestrator::AuditOrchestrator;

    fn with_ratios() -> AuditResult {
        AuditResult {
            balanced: true,
            ratios: Some(BTreeMap::from([("current_ratio".to_string(), 1.8)])),
            ..Default::default()
        }
    }

    fn comparison(industry: &str) -> BenchmarkComparison {
        BenchmarkComparison {
            industry: industry.into(),
            ..Default::default()
        }
    }

    async fn audited(
        result: AuditResult,
        bench: Arc<MockBenchmarkEndpoint>,
    ) -> AuditOrchestrator {
        let orch = AuditOrchestrator::builder(Arc::new(MockAuditEndpoint::new(vec![
            MockResponse::success(result),
        ])))
        .benchmark(bench)
        .build();
        let _ = orch
            .submit_file(SelectedFile::new("tb.csv", b"a".to_vec()))
            .await
            .unwrap();
        orch
    }

    #[tokio::test]
    async fn stores_comparison() {
        let bench = Arc::new(MockBenchmarkEndpoint::new(vec![MockResponse::Ok(comparison(
            "retail",
        ))]));
        let orch = audited(with_ratios(), bench.clone()).await;
        let got = orch.change_industry("retail").await.unwrap();
        assert_eq!(got.industry, "retail");
        assert_eq!(orch.selected_industry().as_deref(), Some("retail"));
        assert_eq!(orch.comparison_results(), Some(comparison("retail")));
        assert_eq!(bench.requests()[0].ratios["current_ratio"], 1.8);
    }

    #[tokio::test]
    async fn skips_without_ratios() {
        let bench = Arc::new(MockBenchmarkEndpoint::new(vec![]));
        let orch = audited(AuditResult::default(), bench.clone()).await;
        assert!(orch.change_industry("retail").await.is_none());
        assert_eq!(bench.compare_calls(), 0);
        assert!(orch.selected_industry().is_none());
    }

    #[tokio::test]
    async fn failure_leaves_results_empty() {
        let bench = Arc::new(MockBenchmarkEndpoint::new(vec![]));
        let orch = audited(with_ratios(), bench.clone()).await;
        assert!(orch.change_industry("retail").await.is_none());
        assert_eq!(bench.compare_calls(), 1);
        assert!(orch.comparison_results().is_none());
        assert_eq!(orch.selected_industry().as_deref(), Some("retail"));
    }

    #[tokio::test]
    async fn industries_refresh() {
        let bench = Arc::new(MockBenchmarkEndpoint::new(vec![]).with_industries(&["retail", "saas"]));
        let orch = AuditOrchestrator::builder(Arc::new(MockAuditEndpoint::new(vec![])))
            .benchmark(bench)
            .build();
        assert_eq!(orch.refresh_available_industries().await, vec!["retail", "saas"]);
        assert_eq!(orch.available_industries().len(), 2);
    }

    #[tokio::test]
    async fn industries_without_endpoint() {
        let orch = AuditOrchestrator::builder(Arc::new(MockAuditEndpoint::new(vec![]))).build();
        assert!(orch.refresh_available_industries().await.is_empty());
    }
}
