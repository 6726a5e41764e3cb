//! End-to-end guard behavior over the in-memory backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use ff_backend::InMemoryBudgetBackend;
use ff_domain::alert::{AlertKind, AlertSeverity, DowngradeDetails};
use ff_domain::budget::{
    BudgetSettings, BudgetStatus, EnforcementAction, EnforcementMode, OperationRequest, ProjectId,
};
use ff_domain::config::{DowngradeConfig, FailPolicy, GuardConfig};
use ff_domain::error::Error;
use ff_guard::{FixedClock, GuardRegistry};

fn september(day: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 9, day).unwrap()))
}

fn settings(project: &str, budget: f64, mode: EnforcementMode) -> BudgetSettings {
    BudgetSettings {
        project_id: project.into(),
        monthly_budget_usd: budget,
        max_cost_per_query_usd: None,
        enforcement_mode: mode,
    }
}

fn registry_with(backend: &Arc<InMemoryBudgetBackend>, cfg: GuardConfig, day: u32) -> GuardRegistry {
    GuardRegistry::new(backend.clone(), &cfg)
        .without_polling()
        .with_clock(september(day))
}

fn registry(backend: &Arc<InMemoryBudgetBackend>, day: u32) -> GuardRegistry {
    registry_with(backend, GuardConfig::default(), day)
}

#[tokio::test]
async fn high_burn_mid_month_is_at_risk() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("acme".into(), 450.0, Some(settings("acme", 500.0, EnforcementMode::Warn)));
    let reg = registry(&backend, 20);

    let view = reg.get(&"acme".into()).refresh().await.unwrap();
    assert!((view.summary.budget_used_percent - 90.0).abs() < 1e-9);
    assert!((view.summary.projected_month_end.unwrap() - 675.0).abs() < 1e-9);
    assert_eq!(view.summary.status, BudgetStatus::AtRisk);
}

#[tokio::test]
async fn overspend_reports_negative_remaining() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("acme".into(), 600.0, Some(settings("acme", 500.0, EnforcementMode::Warn)));
    let reg = registry(&backend, 12);

    let guard = reg.get(&"acme".into());
    let view = guard.refresh().await.unwrap();
    assert_eq!(view.summary.status, BudgetStatus::OverBudget);
    assert!((view.summary.remaining_budget_usd + 100.0).abs() < 1e-9);
    assert!(guard.is_over_budget());
}

#[tokio::test]
async fn abort_mode_blocks_over_budget_operations() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("acme".into(), 600.0, Some(settings("acme", 500.0, EnforcementMode::Abort)));
    let reg = registry(&backend, 12);
    let guard = reg.get(&"acme".into());

    let err = guard
        .check(&OperationRequest::new("evaluation"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, Error::Blocked(reason) if !reason.is_empty()),
        "expected Blocked, got {err:?}"
    );

    let decision = guard.evaluate(&OperationRequest::new("search"));
    assert!(!decision.allowed);
    assert_eq!(decision.action, EnforcementAction::Block);
    assert!(guard.is_operation_blocked());
    assert_eq!(guard.blocked_message(), decision.reason);
}

#[tokio::test]
async fn auto_downgrade_at_risk_suggests_catalog_model() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project(
        "acme".into(),
        450.0,
        Some(settings("acme", 500.0, EnforcementMode::AutoDowngrade)),
    );
    let mut models = HashMap::new();
    models.insert("gpt-4o".to_string(), "gpt-4o-mini".to_string());
    let cfg = GuardConfig {
        downgrades: DowngradeConfig {
            default_target: None,
            models,
        },
        ..Default::default()
    };
    let reg = registry_with(&backend, cfg, 20);

    let decision = reg
        .get(&"acme".into())
        .check(&OperationRequest::new("evaluation").with_model("gpt-4o"))
        .await
        .unwrap();
    assert!(decision.allowed);
    assert_eq!(decision.action, EnforcementAction::ProceedWithDowngrade);
    let suggestion = decision.suggested_downgrade.unwrap();
    assert_eq!(suggestion.to_model, "gpt-4o-mini");
}

#[tokio::test]
async fn unlimited_budget_never_escalates() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("acme".into(), 99_999.0, Some(settings("acme", 0.0, EnforcementMode::Abort)));
    let reg = registry(&backend, 3);

    let guard = reg.get(&"acme".into());
    let view = guard.refresh().await.unwrap();
    assert_eq!(view.summary.status, BudgetStatus::UnderBudget);
    assert!(view.summary.projected_month_end.is_none());
    assert!(guard.check(&OperationRequest::new("training")).await.is_ok());
    assert!(reg.emitter().log().recent(10).is_empty());
}

#[tokio::test]
async fn at_risk_alert_fires_once_per_session() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("acme".into(), 450.0, Some(settings("acme", 500.0, EnforcementMode::Warn)));
    let reg = registry(&backend, 20);
    let guard = reg.get(&"acme".into());

    guard.refresh().await.unwrap();
    guard.refresh().await.unwrap();

    let alerts = reg.emitter().log().recent(10);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, AlertKind::StatusTransition);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);

    // Escalation is a new (project, status) pair.
    backend.record_spend(&"acme".into(), 100.0);
    guard.refresh().await.unwrap();
    let alerts = reg.emitter().log().recent(10);
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].severity, AlertSeverity::Critical);
}

#[tokio::test]
async fn missing_settings_fall_back_to_plan_defaults() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("fresh".into(), 10.0, None);
    let cfg = GuardConfig {
        default_monthly_budget_usd: 25.0,
        ..Default::default()
    };
    let reg = registry_with(&backend, cfg, 10);

    let guard = reg.get(&"fresh".into());
    let view = guard.refresh().await.unwrap();
    assert!(view.snapshot.settings_defaulted);
    assert_eq!(view.summary.monthly_budget_usd, 25.0);
    assert_eq!(guard.enforcement_mode(), EnforcementMode::Warn);
}

#[tokio::test]
async fn unknown_project_is_not_found_not_defaults() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    let reg = registry(&backend, 10);
    let err = reg
        .get(&"ghost".into())
        .check(&OperationRequest::new("search"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn outage_fails_open_by_default_and_closed_on_request() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("acme".into(), 1.0, None);
    backend.set_unavailable(true);

    let open = registry(&backend, 10);
    let decision = open
        .get(&"acme".into())
        .check(&OperationRequest::new("search"))
        .await
        .unwrap();
    assert!(decision.allowed);
    assert!(decision.warning.is_some());

    let closed = registry_with(
        &backend,
        GuardConfig {
            fail_policy: FailPolicy::Closed,
            ..Default::default()
        },
        10,
    );
    let err = closed
        .get(&"acme".into())
        .check(&OperationRequest::new("search"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Blocked(_)));
}

#[tokio::test]
async fn explicit_notifications_land_in_the_log() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    let reg = registry(&backend, 10);
    let project = ProjectId::from("acme");

    reg.emitter().trigger_downgrade_notification(
        &project,
        &DowngradeDetails {
            operation: Some("evaluation".into()),
            from_model: Some("gpt-4o".into()),
            to_model: "gpt-4o-mini".into(),
            estimated_savings_usd: None,
        },
    );
    reg.emitter()
        .trigger_abort_notification(&project, "over budget in abort mode");

    let alerts = reg.emitter().log().recent(10);
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].kind, AlertKind::OperationAborted);
    assert_eq!(alerts[1].kind, AlertKind::DowngradeApplied);
}

#[tokio::test(start_paused = true)]
async fn concurrent_checks_coalesce_onto_one_read() {
    let backend = Arc::new(InMemoryBudgetBackend::new());
    backend.insert_project("acme".into(), 5.0, None);
    backend.set_latency(Some(Duration::from_millis(200)));
    let reg = registry(&backend, 10);
    let guard = reg.get(&"acme".into());

    let request = OperationRequest::new("search");
    let results = futures_util::future::join_all((0..8).map(|_| guard.check(&request))).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(backend.summary_reads(), 1);
}
