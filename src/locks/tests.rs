//! Tests for the locks subsystem.

use super::*;
use crate::test_support::{ScriptedBackend, Step, other_holder};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_millis(10), Duration::from_millis(40))
}

fn shared_request(backend: &Arc<ScriptedBackend>) -> LockRequest {
    LockRequest::new(
        StateTarget::shared("default.tfstate", backend.clone()),
        STATE_LOCK_OPERATION,
    )
}

// ============================================================================
// Descriptor
// ============================================================================

#[test]
fn test_descriptor_build_fills_metadata() {
    let descriptor = LockDescriptor::build("state-lock", "default.tfstate");

    assert!(!descriptor.id.is_empty());
    assert!(descriptor.who.contains('@'));
    assert_eq!(descriptor.operation, "state-lock");
    assert_eq!(descriptor.path, "default.tfstate");
    assert_eq!(descriptor.version, env!("CARGO_PKG_VERSION"));
    assert!(descriptor.info.is_empty());
    assert!(descriptor.age().num_minutes() < 1);
}

#[test]
fn test_descriptor_ids_are_unique() {
    let first = LockDescriptor::build("state-lock", "default.tfstate");
    let second = LockDescriptor::build("state-lock", "default.tfstate");

    assert_ne!(first.id, second.id);
}

#[test]
fn test_descriptor_serialized_field_names() {
    let descriptor = LockDescriptor::build("state-lock", "dev.tfstate").with_info("manual");
    let json = serde_json::to_value(&descriptor).unwrap();

    for field in ["ID", "Operation", "Info", "Who", "Version", "Created", "Path"] {
        assert!(json.get(field).is_some(), "missing field {}", field);
    }
    assert_eq!(json["Info"], "manual");

    let parsed: LockDescriptor = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, descriptor);
}

#[test]
fn test_descriptor_without_info_field_parses() {
    let json = r#"{
        "ID": "1234",
        "Operation": "apply",
        "Who": "alice@build-01",
        "Version": "1.5.0",
        "Created": "2024-01-02T03:04:05Z",
        "Path": "default.tfstate"
    }"#;
    let parsed: LockDescriptor = serde_json::from_str(json).unwrap();

    assert_eq!(parsed.id, "1234");
    assert_eq!(parsed.info, "");
}

#[test]
fn test_descriptor_age_string() {
    let mut descriptor = LockDescriptor::build("state-lock", "default.tfstate");
    assert!(descriptor.age_string().contains('m'));

    descriptor.created = Utc::now() - ChronoDuration::hours(2);
    assert!(descriptor.age_string().contains('h'));

    descriptor.created = Utc::now() - ChronoDuration::days(3);
    assert!(descriptor.age_string().contains('d'));
}

#[test]
fn test_descriptor_display_is_lock_info_block() {
    let holder = other_holder("alice@build-01");
    let display = holder.to_string();

    assert!(display.starts_with("Lock Info:"));
    assert!(display.contains(&holder.id));
    assert!(display.contains("alice@build-01"));
    assert!(display.contains("Operation: apply"));
}

#[test]
fn test_get_owner_string() {
    let owner = descriptor::get_owner_string();
    assert!(owner.contains('@'));
}

#[test]
fn test_request_reuses_target_key() {
    let request = LockRequest::new(StateTarget::local("terraform.tfstate"), "state-lock");

    assert_eq!(request.info.path, "terraform.tfstate");
    assert_eq!(request.lock_id(), request.info.id);
    assert_eq!(request.operation, "state-lock");
}

// ============================================================================
// Coordinator
// ============================================================================

#[test]
fn test_local_target_is_unsupported() {
    let target = StateTarget::local("terraform.tfstate");
    assert!(!target.supports_locking());

    let request = LockRequest::new(target, STATE_LOCK_OPERATION);
    let coordinator = LockCoordinator::new(fast_policy());

    let outcome = coordinator.acquire(&request, Duration::from_secs(10), &CancelSignal::new());
    assert!(matches!(outcome, LockOutcome::Unsupported));
    assert!(outcome.is_success());
    assert_eq!(outcome.lock_id(), None);
}

#[test]
fn test_immediate_claim_is_acquired_without_backoff() {
    let backend = Arc::new(ScriptedBackend::always(Step::Claim));
    let request = shared_request(&backend);
    let coordinator = LockCoordinator::new(RetryPolicy::new(
        Duration::from_secs(10),
        Duration::from_secs(10),
    ));

    let start = Instant::now();
    let outcome = coordinator.acquire(&request, Duration::from_secs(60), &CancelSignal::new());

    assert_eq!(outcome.lock_id(), Some(request.lock_id()));
    assert_eq!(backend.call_count(), 1);
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_conflicts_then_claim_is_acquired() {
    let holder = other_holder("alice@build-01");
    let backend = Arc::new(ScriptedBackend::sequence(
        vec![
            Step::Conflict(Some(holder.clone())),
            Step::Conflict(Some(holder.clone())),
            Step::Conflict(Some(holder)),
        ],
        Step::Claim,
    ));
    let request = shared_request(&backend);
    let coordinator = LockCoordinator::new(fast_policy());

    let outcome = coordinator.acquire(&request, Duration::from_secs(10), &CancelSignal::new());

    assert_eq!(outcome.lock_id(), Some(request.lock_id()));
    let calls = backend.calls();
    assert_eq!(calls.len(), 4);

    // Every retry carries the same descriptor
    assert!(calls.iter().all(|c| c.lock_id == request.lock_id()));
    assert!(calls.iter().all(|c| c.key == "default.tfstate"));

    // Attempts are spaced by the backoff
    for pair in calls.windows(2) {
        assert!(pair[1].at.duration_since(pair[0].at) >= Duration::from_millis(10));
    }
}

#[test]
fn test_permanent_conflict_times_out_with_last_holder() {
    let backend = Arc::new(ScriptedBackend::sequence(
        vec![
            Step::Conflict(Some(other_holder("alice@build-01"))),
            Step::Conflict(None),
        ],
        Step::Conflict(Some(other_holder("bob@build-02"))),
    ));
    let request = shared_request(&backend);
    let coordinator = LockCoordinator::new(fast_policy());
    let timeout = Duration::from_millis(150);

    let start = Instant::now();
    let outcome = coordinator.acquire(&request, timeout, &CancelSignal::new());
    let elapsed = start.elapsed();

    match outcome {
        LockOutcome::TimedOut { last_conflict } => {
            assert_eq!(last_conflict.unwrap().who, "bob@build-02");
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }
    assert!(elapsed >= timeout);
    assert!(backend.call_count() >= 3);
    assert!(backend.abandoned().is_empty());
}

#[test]
fn test_zero_timeout_tries_exactly_once() {
    let holder = other_holder("alice@build-01");
    let backend = Arc::new(ScriptedBackend::always(Step::Conflict(Some(holder.clone()))));
    let request = shared_request(&backend);
    let coordinator = LockCoordinator::new(fast_policy());

    let outcome = coordinator.acquire(&request, Duration::ZERO, &CancelSignal::new());

    match outcome {
        LockOutcome::TimedOut { last_conflict } => assert_eq!(last_conflict, Some(holder)),
        other => panic!("expected TimedOut, got {:?}", other),
    }
    assert_eq!(backend.call_count(), 1);
}

#[test]
fn test_cancel_during_backoff_returns_promptly() {
    let backend = Arc::new(ScriptedBackend::always(Step::Conflict(Some(other_holder(
        "alice@build-01",
    )))));
    let request = shared_request(&backend);
    let coordinator = LockCoordinator::new(RetryPolicy::new(
        Duration::from_secs(30),
        Duration::from_secs(30),
    ));
    let cancel = CancelSignal::new();

    let canceller = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let start = Instant::now();
    let outcome = coordinator.acquire(&request, Duration::from_secs(60), &cancel);
    let elapsed = start.elapsed();
    handle.join().unwrap();

    assert!(matches!(outcome, LockOutcome::Cancelled));
    assert!(elapsed < Duration::from_secs(5));
    assert_eq!(backend.call_count(), 1);

    // The abandoned claim is handed back to the backend
    assert_eq!(backend.abandoned(), vec![request.lock_id().to_string()]);

    // No further claims after cancellation
    thread::sleep(Duration::from_millis(50));
    assert_eq!(backend.call_count(), 1);
}

#[test]
fn test_cancel_before_first_attempt_makes_no_calls() {
    let backend = Arc::new(ScriptedBackend::always(Step::Claim));
    let request = shared_request(&backend);
    let cancel = CancelSignal::new();
    cancel.cancel();

    let outcome = LockCoordinator::new(fast_policy()).acquire(&request, Duration::from_secs(1), &cancel);

    assert!(matches!(outcome, LockOutcome::Cancelled));
    assert_eq!(backend.call_count(), 0);
    assert!(backend.abandoned().is_empty());
}

#[test]
fn test_cancel_while_claim_in_flight_keeps_acquired_lock() {
    let cancel = CancelSignal::new();
    let canceller = cancel.clone();
    let backend = Arc::new(
        ScriptedBackend::always(Step::Claim).with_claim_hook(move |_| canceller.cancel()),
    );
    let request = shared_request(&backend);

    let outcome =
        LockCoordinator::new(fast_policy()).acquire(&request, Duration::from_secs(10), &cancel);

    // The backend accepted the claim: the lock is real and reported, not dropped
    assert_eq!(outcome.lock_id(), Some(request.lock_id()));
    assert!(backend.abandoned().is_empty());
}

#[test]
fn test_cancel_while_conflicting_claim_in_flight() {
    let cancel = CancelSignal::new();
    let canceller = cancel.clone();
    let backend = Arc::new(
        ScriptedBackend::always(Step::Conflict(None)).with_claim_hook(move |_| canceller.cancel()),
    );
    let request = shared_request(&backend);

    let outcome =
        LockCoordinator::new(fast_policy()).acquire(&request, Duration::from_secs(10), &cancel);

    assert!(matches!(outcome, LockOutcome::Cancelled));
    assert_eq!(backend.call_count(), 1);
    assert_eq!(backend.abandoned().len(), 1);
}

#[test]
fn test_transport_error_fails_without_retry() {
    let backend = Arc::new(ScriptedBackend::always(Step::Fail(
        "connection refused".to_string(),
    )));
    let request = shared_request(&backend);

    let outcome = LockCoordinator::new(fast_policy()).acquire(
        &request,
        Duration::from_secs(10),
        &CancelSignal::new(),
    );

    match outcome {
        LockOutcome::Failed { cause } => assert_eq!(cause.to_string(), "connection refused"),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(backend.call_count(), 1);
}

#[test]
fn test_transport_error_after_conflicts_stops_retrying() {
    let backend = Arc::new(ScriptedBackend::sequence(
        vec![
            Step::Conflict(None),
            Step::Conflict(None),
            Step::Fail("permission denied".to_string()),
        ],
        Step::Claim,
    ));
    let request = shared_request(&backend);

    let outcome = LockCoordinator::new(fast_policy()).acquire(
        &request,
        Duration::from_secs(10),
        &CancelSignal::new(),
    );

    assert!(matches!(outcome, LockOutcome::Failed { .. }));
    assert_eq!(backend.call_count(), 3);
}

#[test]
fn test_wait_notice_fires_once_with_holder() {
    let holder = other_holder("alice@build-01");
    let backend = Arc::new(ScriptedBackend::sequence(
        vec![
            Step::Conflict(Some(holder.clone())),
            Step::Conflict(Some(holder.clone())),
        ],
        Step::Claim,
    ));
    let request = shared_request(&backend);

    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let coordinator = LockCoordinator::new(fast_policy())
        .with_wait_notice(move |h| sink.lock().unwrap().push(h.map(|h| h.who.clone())));

    let outcome = coordinator.acquire(&request, Duration::from_secs(10), &CancelSignal::new());

    assert!(outcome.is_success());
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some("alice@build-01".to_string())]
    );
}

#[test]
fn test_wait_notice_not_fired_when_not_waiting() {
    let backend = Arc::new(ScriptedBackend::always(Step::Conflict(None)));
    let request = shared_request(&backend);

    let fired = Arc::new(Mutex::new(false));
    let flag = fired.clone();
    let coordinator =
        LockCoordinator::new(fast_policy()).with_wait_notice(move |_| *flag.lock().unwrap() = true);

    coordinator.acquire(&request, Duration::ZERO, &CancelSignal::new());
    assert!(!*fired.lock().unwrap());
}

// ============================================================================
// Coordinator + shared directory backend
// ============================================================================

#[test]
fn test_shared_dir_second_request_times_out_with_first_holder() {
    let temp_dir = TempDir::new().unwrap();
    let backend: Arc<dyn LockBackend> = Arc::new(SharedDirBackend::new(temp_dir.path()));
    let coordinator = LockCoordinator::new(fast_policy());

    let first = LockRequest::new(
        StateTarget::shared("default.tfstate", backend.clone()),
        STATE_LOCK_OPERATION,
    );
    let outcome = coordinator.acquire(&first, Duration::ZERO, &CancelSignal::new());
    assert_eq!(outcome.lock_id(), Some(first.lock_id()));

    let second = LockRequest::new(
        StateTarget::shared("default.tfstate", backend.clone()),
        STATE_LOCK_OPERATION,
    );
    let outcome = coordinator.acquire(&second, Duration::from_millis(50), &CancelSignal::new());

    match outcome {
        LockOutcome::TimedOut { last_conflict } => {
            assert_eq!(last_conflict.unwrap().id, first.lock_id());
        }
        other => panic!("expected TimedOut, got {:?}", other),
    }
}

#[test]
fn test_shared_dir_lock_released_by_holder_is_acquired_on_retry() {
    let temp_dir = TempDir::new().unwrap();
    let shared = SharedDirBackend::new(temp_dir.path());
    let backend: Arc<dyn LockBackend> = Arc::new(shared.clone());

    let holder = other_holder("alice@build-01");
    shared.claim("default.tfstate", &holder).unwrap();

    let lock_path = shared.lock_path("default.tfstate").unwrap();
    let releaser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        std::fs::remove_file(lock_path).unwrap();
    });

    let request = LockRequest::new(
        StateTarget::shared("default.tfstate", backend),
        STATE_LOCK_OPERATION,
    );
    let outcome = LockCoordinator::new(fast_policy()).acquire(
        &request,
        Duration::from_secs(10),
        &CancelSignal::new(),
    );
    releaser.join().unwrap();

    assert_eq!(outcome.lock_id(), Some(request.lock_id()));
    assert_eq!(
        shared.holder("default.tfstate").unwrap().unwrap().id,
        request.lock_id()
    );
}
