//! End-to-end session scenarios against mock endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{broadcast, Notify};
use tokio::time::timeout;

use auditflow_client::mock::{
    MockAuditEndpoint, MockBenchmarkEndpoint, MockResponse, RecordingEngagementTracker,
    StaticPracticeSettings,
};
use auditflow_core::audit::{
    AbnormalBalance, AuditResult, ColumnDetection, ColumnMapping, SelectedFile, SheetInfo,
    SheetSelection, WorkbookInfo,
};
use auditflow_core::benchmark::BenchmarkComparison;
use auditflow_core::errors::{AuditError, SESSION_EXPIRED_MESSAGE};
use auditflow_core::practice::{DefaultMateriality, PracticeSettings, PracticeSettingsState};
use auditflow_core::session::{AuditStatus, DisplayMode};
use auditflow_engine::{AuditEvent, AuditOrchestrator, InMemoryMappingOverrides};

const TIMEOUT: Duration = Duration::from_secs(5);

fn csv() -> SelectedFile {
    SelectedFile::new("trial_balance.csv", b"Account,Debit,Credit\n1000,500,0\n".to_vec())
}

fn xlsx() -> SelectedFile {
    SelectedFile::new("trial_balance.xlsx", b"PK\x03\x04".to_vec())
}

fn result(rows: u64) -> AuditResult {
    AuditResult {
        balanced: true,
        total_debits: 1500.0,
        total_credits: 1500.0,
        row_count: rows,
        abnormal_balances: vec![AbnormalBalance {
            account: "2100".into(),
            account_name: Some("Accounts Payable".into()),
            amount: 1200.0,
            issue: "debit balance on liability".into(),
        }],
        ratios: Some(BTreeMap::from([("current_ratio".to_string(), 1.4)])),
        ..Default::default()
    }
}

fn detection() -> ColumnDetection {
    ColumnDetection {
        account_column: Some("Acct".into()),
        debit_column: Some("Amount".into()),
        credit_column: None,
        overall_confidence: 0.35,
        all_columns: vec!["Acct".into(), "Amount".into(), "Amount 2".into()],
        ..Default::default()
    }
}

fn mapping() -> ColumnMapping {
    ColumnMapping {
        account_column: "Acct".into(),
        debit_column: "Amount".into(),
        credit_column: "Amount 2".into(),
        account_name_column: None,
    }
}

fn practice(value: serde_json::Value, lenient: bool) -> PracticeSettingsState {
    PracticeSettingsState::loaded(Some(PracticeSettings {
        default_materiality: Some(DefaultMateriality {
            kind: "fixed".into(),
            value,
        }),
        show_immaterial_by_default: lenient,
    }))
}

fn orchestrator(mock: &Arc<MockAuditEndpoint>) -> AuditOrchestrator {
    AuditOrchestrator::builder(mock.clone()).build()
}

fn assert_invariants(orch: &AuditOrchestrator) {
    let view = orch.view();
    if let Err(violation) = view.check_invariants() {
        panic!("invariant violated in {}: {violation}", view.status);
    }
}

/// Industries named in `BenchmarkUpdated` events received so far.
fn benchmark_industries(events: &mut broadcast::Receiver<AuditEvent>) -> Vec<String> {
    let mut industries = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let AuditEvent::BenchmarkUpdated { industry, .. } = event {
            industries.push(industry);
        }
    }
    industries
}

/// Yield until the mock has seen `calls` audit requests.
async fn wait_for_calls(mock: &MockAuditEndpoint, calls: usize) {
    timeout(TIMEOUT, async {
        while mock.audit_calls() < calls {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("audit call never issued");
}

#[tokio::test]
async fn null_practice_settings_keep_builtin_defaults() {
    let orch = orchestrator(&Arc::new(MockAuditEndpoint::new(vec![])));
    let _ = orch.observe_practice_settings(&PracticeSettingsState::loaded(None));
    assert_eq!(orch.materiality_threshold(), 500.0);
    assert_eq!(orch.display_mode(), DisplayMode::Strict);
    assert_invariants(&orch);
}

#[tokio::test]
async fn practice_settings_set_threshold_and_mode() {
    let orch = orchestrator(&Arc::new(MockAuditEndpoint::new(vec![])));
    let _ = orch.observe_practice_settings(&PracticeSettingsState::loading());
    assert_eq!(orch.materiality_threshold(), 500.0);
    let _ = orch.observe_practice_settings(&practice(json!(1000), true));
    assert_eq!(orch.materiality_threshold(), 1000.0);
    assert_eq!(orch.display_mode(), DisplayMode::Lenient);
    assert!(orch.view().threshold_initialized);
}

#[tokio::test]
async fn manual_threshold_survives_late_settings() {
    let orch = orchestrator(&Arc::new(MockAuditEndpoint::new(vec![])));
    let _ = orch.observe_practice_settings(&PracticeSettingsState::loading());
    orch.set_materiality_threshold(2000.0).unwrap();
    let _ = orch.observe_practice_settings(&practice(json!(1000), true));
    let _ = orch.observe_practice_settings(&practice(json!(3000), false));
    assert_eq!(orch.materiality_threshold(), 2000.0);
    assert_eq!(orch.display_mode(), DisplayMode::Strict);
}

#[tokio::test]
async fn latch_is_monotonic_across_redeliveries_and_reset() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::success(result(3))]));
    let orch = orchestrator(&mock);
    let _ = orch
        .load_practice_settings(&StaticPracticeSettings(Some(PracticeSettings {
            default_materiality: Some(DefaultMateriality {
                kind: "fixed".into(),
                value: json!("250"),
            }),
            show_immaterial_by_default: false,
        })))
        .await;
    assert!(orch.threshold_initialized());

    let _ = orch.submit_file(csv()).await.unwrap();
    orch.reset_audit();
    let _ = orch.observe_practice_settings(&practice(json!(9999), true));

    assert!(orch.threshold_initialized());
    assert_eq!(orch.materiality_threshold(), 250.0);
    assert_eq!(orch.display_mode(), DisplayMode::Strict);
}

#[tokio::test]
async fn closing_column_mapping_abandons_attempt() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::requires_mapping(
        detection(),
    )]));
    let orch = orchestrator(&mock);

    let status = orch.submit_file(csv()).await.unwrap();
    assert_eq!(status, AuditStatus::AwaitingColumnMapping);
    assert!(orch.pending_column_detection().is_some());
    assert!(orch.show_column_mapping_modal());
    assert_invariants(&orch);

    orch.close_column_mapping();
    assert_eq!(orch.status(), AuditStatus::Idle);
    assert!(orch.selected_file().is_none());
    assert!(orch.pending_column_detection().is_none());
    assert!(!orch.show_column_mapping_modal());
    assert_invariants(&orch);
}

#[tokio::test]
async fn rerun_without_file_never_calls_endpoint() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::requires_mapping(
        detection(),
    )]));
    let orch = orchestrator(&mock);
    assert_eq!(orch.rerun_audit().await.unwrap(), AuditStatus::Idle);
    assert_eq!(mock.audit_calls(), 0);

    let _ = orch.submit_file(csv()).await.unwrap();
    orch.close_column_mapping();
    assert_eq!(orch.rerun_audit().await.unwrap(), AuditStatus::Idle);
    assert_eq!(mock.audit_calls(), 1);
}

#[tokio::test]
async fn engagement_linkage_runs_once_per_success() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![
        MockResponse::success(result(3)),
        MockResponse::success(result(3)),
    ]));
    let tracker = Arc::new(RecordingEngagementTracker::new("eng-2024-q4"));
    let linked = AuditOrchestrator::builder(mock.clone())
        .engagement(tracker.clone())
        .build();

    let _ = linked.submit_file(csv()).await.unwrap();
    linked.settle().await;
    assert_eq!(tracker.refreshes(), 1);
    assert_eq!(tracker.toasts(), 1);

    let _ = linked.rerun_audit().await.unwrap();
    linked.settle().await;
    assert_eq!(tracker.refreshes(), 2);
    assert_eq!(tracker.toasts(), 2);

    let plain_mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::success(result(3))]));
    let plain = orchestrator(&plain_mock);
    let _ = plain.submit_file(csv()).await.unwrap();
    plain.settle().await;

    assert_eq!(tracker.refreshes(), 2);
    assert_eq!(linked.result(), plain.result());
    assert_eq!(linked.view().visible_balances(), plain.view().visible_balances());
}

#[tokio::test]
async fn reset_is_idempotent_from_every_status() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![
        MockResponse::success(result(3)),
        MockResponse::Error(AuditError::Transport("refused".into())),
        MockResponse::requires_mapping(detection()),
    ]));
    let orch = orchestrator(&mock);

    for expected in [AuditStatus::Success, AuditStatus::Error, AuditStatus::AwaitingColumnMapping] {
        assert_eq!(orch.submit_file(csv()).await.unwrap(), expected);
        orch.reset_audit();
        let once = orch.view();
        orch.reset_audit();
        let twice = orch.view();
        assert_eq!(once, twice);
        assert_eq!(twice.status, AuditStatus::Idle);
        assert!(twice.check_invariants().is_ok());
    }
}

#[tokio::test]
async fn response_after_reset_is_discarded() {
    let gate = Arc::new(Notify::new());
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::held(
        gate.clone(),
        MockResponse::success(result(3)),
    )]));
    let orch = orchestrator(&mock);
    let mut events = orch.subscribe();

    let submit = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.submit_file(csv()).await })
    };
    wait_for_calls(&mock, 1).await;
    assert_eq!(orch.status(), AuditStatus::Loading);
    assert_invariants(&orch);

    orch.reset_audit();
    assert_invariants(&orch);
    gate.notify_one();

    let status = timeout(TIMEOUT, submit).await.unwrap().unwrap().unwrap();
    assert_eq!(status, AuditStatus::Idle);
    assert!(orch.result().is_none());
    assert!(orch.selected_file().is_none());
    assert_invariants(&orch);

    let mut discarded = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, AuditEvent::StaleResponseDiscarded { .. }) {
            discarded = true;
        }
    }
    assert!(discarded);
}

#[tokio::test]
async fn stale_response_does_not_overwrite_newer_result() {
    let gate = Arc::new(Notify::new());
    let mock = Arc::new(MockAuditEndpoint::new(vec![
        MockResponse::held(gate.clone(), MockResponse::success(result(1))),
        MockResponse::success(result(2)),
    ]));
    let orch = orchestrator(&mock);

    let first = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.submit_file(csv()).await })
    };
    wait_for_calls(&mock, 1).await;
    orch.reset_audit();

    assert_eq!(orch.submit_file(csv()).await.unwrap(), AuditStatus::Success);
    gate.notify_one();
    let _ = timeout(TIMEOUT, first).await.unwrap().unwrap().unwrap();

    assert_eq!(orch.result().unwrap().row_count, 2);
    assert_invariants(&orch);
}

#[tokio::test]
async fn second_submission_while_loading_is_rejected() {
    let gate = Arc::new(Notify::new());
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::held(
        gate.clone(),
        MockResponse::success(result(3)),
    )]));
    let orch = orchestrator(&mock);
    let first = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.submit_file(csv()).await })
    };
    wait_for_calls(&mock, 1).await;

    assert!(orch.submit_file(csv()).await.is_err());
    assert!(orch.rerun_audit().await.is_err());
    assert_eq!(mock.audit_calls(), 1);

    gate.notify_one();
    assert_eq!(
        timeout(TIMEOUT, first).await.unwrap().unwrap().unwrap(),
        AuditStatus::Success
    );
}

#[tokio::test]
async fn reopened_mapping_gate_retains_previous_mapping() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![
        MockResponse::requires_mapping(detection()),
        MockResponse::requires_mapping(detection()),
        MockResponse::success(result(3)),
    ]));
    let orch = orchestrator(&mock);
    let _ = orch.submit_file(csv()).await.unwrap();
    assert_eq!(
        orch.pending_column_detection().unwrap().default_mapping(),
        None
    );

    let status = orch.confirm_column_mapping(mapping()).await.unwrap();
    assert_eq!(status, AuditStatus::AwaitingColumnMapping);
    let reopened = orch.pending_column_detection().unwrap();
    assert_eq!(reopened.default_mapping(), Some(mapping()));
    assert_invariants(&orch);

    let mut adjusted = mapping();
    adjusted.account_name_column = Some("Description".into());
    let status = orch.confirm_column_mapping(adjusted.clone()).await.unwrap();
    assert_eq!(status, AuditStatus::Success);
    assert_eq!(mock.last_request().unwrap().column_mapping, Some(adjusted));
    assert_eq!(mock.audit_calls(), 3);
}

#[tokio::test]
async fn workbook_gate_confirm_then_mapping_gate() {
    let mock = Arc::new(
        MockAuditEndpoint::new(vec![
            MockResponse::requires_mapping(detection()),
            MockResponse::success(result(3)),
        ])
        .with_inspections(vec![MockResponse::Ok(WorkbookInfo {
            filename: "trial_balance.xlsx".into(),
            sheets: vec![
                SheetInfo { name: "Summary".into(), row_count: 12, column_count: 3, has_data: true },
                SheetInfo { name: "Detail".into(), row_count: 480, column_count: 6, has_data: true },
            ],
        })]),
    );
    let orch = orchestrator(&mock);

    assert_eq!(
        orch.submit_file(xlsx()).await.unwrap(),
        AuditStatus::AwaitingWorkbookSelection
    );
    assert_invariants(&orch);

    let selection = SheetSelection {
        sheet_name: "Detail".into(),
        range: Some("A1:F480".into()),
    };
    assert_eq!(
        orch.confirm_workbook_selection(selection.clone()).await.unwrap(),
        AuditStatus::AwaitingColumnMapping
    );
    assert!(orch.pending_workbook_info().is_none());
    assert_eq!(
        orch.pending_column_detection().unwrap().context.sheet_selection,
        Some(selection.clone())
    );

    assert_eq!(orch.confirm_column_mapping(mapping()).await.unwrap(), AuditStatus::Success);
    let request = mock.last_request().unwrap();
    assert_eq!(request.sheet_selection, Some(selection));
    assert_eq!(request.column_mapping, Some(mapping()));
}

#[tokio::test]
async fn closing_workbook_gate_abandons_attempt() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![]).with_inspections(vec![MockResponse::Ok(
        WorkbookInfo {
            filename: "trial_balance.xlsx".into(),
            sheets: vec![
                SheetInfo { name: "A".into(), has_data: true, ..Default::default() },
                SheetInfo { name: "B".into(), has_data: true, ..Default::default() },
            ],
        },
    )]));
    let orch = orchestrator(&mock);
    let _ = orch.submit_file(xlsx()).await.unwrap();
    orch.close_workbook_inspector();

    let view = orch.view();
    assert_eq!(view.status, AuditStatus::Idle);
    assert!(view.selected_file.is_none());
    assert!(view.pending_workbook_info.is_none());
    assert!(!view.show_workbook_inspector);
    assert_eq!(mock.audit_calls(), 0);
}

#[tokio::test]
async fn server_requested_workbook_selection_opens_gate() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::requires_workbook(
        WorkbookInfo {
            filename: "export.csv".into(),
            sheets: vec![SheetInfo { name: "Sheet1".into(), has_data: true, ..Default::default() }],
        },
    )]));
    let orch = orchestrator(&mock);
    assert_eq!(
        orch.submit_file(csv()).await.unwrap(),
        AuditStatus::AwaitingWorkbookSelection
    );
    assert!(orch.show_workbook_inspector());
    assert_invariants(&orch);
}

#[tokio::test]
async fn authentication_failure_uses_fixed_message() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::Error(
        AuditError::from_status(401, r#"{"detail":"token signature mismatch"}"#),
    )]));
    let orch = orchestrator(&mock);
    assert_eq!(orch.submit_file(csv()).await.unwrap(), AuditStatus::Error);
    assert_eq!(orch.error_message().as_deref(), Some(SESSION_EXPIRED_MESSAGE));
    assert_invariants(&orch);
}

#[tokio::test]
async fn validation_failure_is_verbatim() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::Error(
        AuditError::from_status(422, r#"{"detail":"Could not parse row 14"}"#),
    )]));
    let orch = orchestrator(&mock);
    assert_eq!(orch.submit_file(csv()).await.unwrap(), AuditStatus::Error);
    assert_eq!(orch.error_message().as_deref(), Some("Could not parse row 14"));
}

#[tokio::test]
async fn unsupported_file_is_rejected_before_any_change() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![]));
    let orch = orchestrator(&mock);
    let before = orch.view();
    assert!(orch
        .submit_file(SelectedFile::new("ledger.pdf", b"%PDF-1.7".to_vec()))
        .await
        .is_err());
    assert_eq!(orch.view(), before);
    assert_eq!(mock.audit_calls(), 0);
}

#[tokio::test]
async fn overrides_are_read_into_each_request() {
    let overrides = Arc::new(InMemoryMappingOverrides::new());
    overrides.set("2100", "liability");
    let mock = Arc::new(MockAuditEndpoint::new(vec![
        MockResponse::success(result(3)),
        MockResponse::success(result(3)),
    ]));
    let orch = AuditOrchestrator::builder(mock.clone())
        .overrides(overrides.clone())
        .build();

    let _ = orch.submit_file(csv()).await.unwrap();
    assert_eq!(mock.requests()[0].account_overrides["2100"], json!("liability"));

    overrides.set("1000", "asset");
    let _ = orch.rerun_audit().await.unwrap();
    assert_eq!(mock.requests()[1].account_overrides.len(), 2);
    assert_eq!(overrides.len(), 2);
}

#[tokio::test]
async fn industry_change_is_noop_without_result() {
    let bench = Arc::new(MockBenchmarkEndpoint::new(vec![]));
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::Error(
        AuditError::Transport("refused".into()),
    )]));
    let orch = AuditOrchestrator::builder(mock)
        .benchmark(bench.clone())
        .build();

    for industry in ["", "   ", "retail", "manufacturing"] {
        assert!(orch.change_industry(industry).await.is_none());
    }
    let _ = orch.submit_file(csv()).await.unwrap();
    assert!(orch.change_industry("retail").await.is_none());
    assert_eq!(bench.compare_calls(), 0);
}

#[tokio::test]
async fn new_result_invalidates_benchmark() {
    let bench = Arc::new(MockBenchmarkEndpoint::new(vec![MockResponse::Ok(
        BenchmarkComparison {
            industry: "retail".into(),
            overall_score: Some(71.0),
            ..Default::default()
        },
    )]));
    let mock = Arc::new(MockAuditEndpoint::new(vec![
        MockResponse::success(result(3)),
        MockResponse::success(result(4)),
    ]));
    let orch = AuditOrchestrator::builder(mock)
        .benchmark(bench.clone())
        .build();
    let mut events = orch.subscribe();

    let _ = orch.submit_file(csv()).await.unwrap();
    assert!(orch.change_industry("retail").await.is_some());
    assert!(orch.comparison_results().is_some());
    assert_eq!(benchmark_industries(&mut events), vec!["retail".to_string()]);

    let _ = orch.rerun_audit().await.unwrap();
    assert_eq!(orch.status(), AuditStatus::Success);
    assert!(orch.comparison_results().is_none());
    assert!(orch.selected_industry().is_none());
    assert_invariants(&orch);
}

#[tokio::test]
async fn status_events_follow_transitions() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::requires_mapping(
        detection(),
    )]));
    let orch = orchestrator(&mock);
    let mut events = orch.subscribe();

    let _ = orch.submit_file(csv()).await.unwrap();
    orch.close_column_mapping();

    let mut statuses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let AuditEvent::StatusChanged { status, .. } = event {
            statuses.push(status);
        }
    }
    assert_eq!(
        statuses,
        vec![
            AuditStatus::Loading,
            AuditStatus::AwaitingColumnMapping,
            AuditStatus::Idle
        ]
    );
}

#[tokio::test]
async fn visible_balances_track_threshold_and_mode() {
    let mock = Arc::new(MockAuditEndpoint::new(vec![MockResponse::success(result(3))]));
    let orch = orchestrator(&mock);
    let _ = orch.submit_file(csv()).await.unwrap();

    assert_eq!(orch.view().visible_balances().len(), 1);
    orch.set_materiality_threshold(5000.0).unwrap();
    assert!(orch.view().visible_balances().is_empty());
    orch.set_display_mode(DisplayMode::Lenient);
    assert_eq!(orch.view().visible_balances().len(), 1);
}
