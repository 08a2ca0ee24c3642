//! Quota admission integration tests: window flagging, fail-fast rejection,
//! and the interplay between admission and asynchronous usage recording.

use std::sync::Arc;
use switchyard_core::error::QuotaWindowKind;
use switchyard_core::{
    estimate_tokens, EchoBackend, MemoryUsageStore, Pipeline, PipelineRequest, QuotaWindow,
    StaticQuotaPolicy, SwitchyardError,
};

fn pipeline_with_policy(policy: StaticQuotaPolicy, store: Arc<MemoryUsageStore>) -> Pipeline {
    Pipeline::builder()
        .with_backend(Arc::new(EchoBackend))
        .with_policy(Arc::new(policy))
        .with_store(store)
        .build()
        .unwrap()
}

#[tokio::test]
async fn requests_consume_the_monthly_window_until_rejection() {
    // The echoed completion costs roughly three tokens per prompt token, so
    // one answered request is enough to exhaust this window.
    let policy = StaticQuotaPolicy::new()
        .with_window(QuotaWindow::for_role("student").with_monthly_limit(15));
    let store = Arc::new(MemoryUsageStore::new());
    let pipeline = pipeline_with_policy(policy, store.clone());

    pipeline
        .handle(PipelineRequest::new("user-1", "uma pergunta qualquer"))
        .await
        .unwrap();
    pipeline.shutdown().await;
    assert_eq!(store.len().await, 1);

    // The recorded usage pushed consumption past the window; the next
    // request is rejected before any provider is contacted.
    let error = pipeline
        .handle(PipelineRequest::new("user-1", "outra pergunta diferente"))
        .await
        .unwrap_err();
    match error {
        SwitchyardError::QuotaExceeded { windows, message } => {
            assert_eq!(windows, vec![QuotaWindowKind::Monthly]);
            assert!(message.contains("monthly"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // The rejection itself never reached the ledger or the cache.
    pipeline.shutdown().await;
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn exhausted_quota_still_serves_already_cached_responses() {
    let policy = StaticQuotaPolicy::new()
        .with_window(QuotaWindow::for_role("student").with_monthly_limit(15));
    let store = Arc::new(MemoryUsageStore::new());
    let pipeline = pipeline_with_policy(policy, store.clone());

    let first = pipeline
        .handle(PipelineRequest::new("user-1", "uma pergunta qualquer"))
        .await
        .unwrap();
    assert!(!first.from_cache);
    pipeline.shutdown().await;
    assert_eq!(store.len().await, 1);

    // The window is spent, but the identical question was already answered
    // and paid for; the cache serves it without consulting the ledger.
    let second = pipeline
        .handle(PipelineRequest::new("user-1", "uma pergunta qualquer"))
        .await
        .unwrap();
    assert!(second.from_cache);
    assert_eq!(second.text, first.text);

    // A question the cache has never seen is still rejected.
    let error = pipeline
        .handle(PipelineRequest::new("user-1", "outra pergunta inédita"))
        .await
        .unwrap_err();
    assert!(matches!(error, SwitchyardError::QuotaExceeded { .. }));
}

#[tokio::test]
async fn rejection_names_only_the_windows_that_overflowed() {
    let policy = StaticQuotaPolicy::new().with_window(
        QuotaWindow::for_role("student")
            .with_monthly_limit(1_000_000)
            .with_hourly_limit(1),
    );
    let pipeline = pipeline_with_policy(policy, Arc::new(MemoryUsageStore::new()));

    let error = pipeline
        .handle(PipelineRequest::new("user-1", "uma pergunta qualquer"))
        .await
        .unwrap_err();
    match error {
        SwitchyardError::QuotaExceeded { windows, .. } => {
            assert_eq!(windows, vec![QuotaWindowKind::Hourly]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn other_callers_are_unaffected_by_one_user_exhausting_quota() {
    let policy = StaticQuotaPolicy::new()
        .with_window(QuotaWindow::for_role("student").with_monthly_limit(15))
        .with_window(QuotaWindow::for_role("teacher").with_monthly_limit(1_000_000))
        .with_user_role("teacher-1", "teacher");
    let store = Arc::new(MemoryUsageStore::new());
    let pipeline = pipeline_with_policy(policy, store.clone());

    pipeline
        .handle(PipelineRequest::new("student-1", "uma pergunta qualquer"))
        .await
        .unwrap();
    pipeline.shutdown().await;

    assert!(pipeline
        .handle(PipelineRequest::new("student-1", "pergunta seguinte por favor"))
        .await
        .is_err());
    // A different caller with a roomier role cruises through.
    assert!(pipeline
        .handle(PipelineRequest::new("teacher-1", "pergunta seguinte por favor"))
        .await
        .is_ok());
}

#[tokio::test]
async fn usage_status_reflects_both_consumption_and_limits() {
    let policy = StaticQuotaPolicy::new()
        .with_window(QuotaWindow::for_role("student").with_monthly_limit(10_000));
    let store = Arc::new(MemoryUsageStore::new());
    let pipeline = pipeline_with_policy(policy, store.clone());

    pipeline
        .handle(PipelineRequest::new("user-1", "uma pergunta qualquer"))
        .await
        .unwrap();
    pipeline.shutdown().await;

    let report = pipeline.admission().quota_status("user-1").await.unwrap();
    assert_eq!(report.role, "student");
    assert_eq!(report.token_limit, 10_000);
    assert!(report.tokens_used > 0);
    assert_eq!(
        report.remaining_tokens,
        report.token_limit as i64 - report.tokens_used as i64
    );
    assert_eq!(report.daily_tokens_used, report.tokens_used);
}

#[test]
fn estimation_matches_the_four_character_heuristic() {
    assert_eq!(estimate_tokens("12345678"), 2);
    assert_eq!(estimate_tokens("123456789"), 3);
    // A rejection threshold can thus be provoked with known text sizes.
    let text = "a".repeat(400);
    assert_eq!(estimate_tokens(&text), 100);
}
