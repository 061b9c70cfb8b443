use std::sync::Arc;
use std::time::Duration;

use cinema_core::{InMemoryStore, ReservationEngine, ReservationError, SeatKey, StoreOperation};
use cinema_load::{
    run_concurrent, run_race, run_sequential, AttemptOutcome, ConcurrentScenario, LoadError, RaceScenario,
    SequentialScenario,
};

fn engine_on(store: &InMemoryStore, endpoint: &str) -> ReservationEngine {
    ReservationEngine::new(Arc::new(store.handle(endpoint)), Duration::from_secs(5))
}

#[tokio::test]
async fn test_sequential_repetition_applies_once() {
    let store = InMemoryStore::new();
    let engine = engine_on(&store, "node1");
    let scenario = SequentialScenario {
        show_id: "showA".to_string(),
        seat_id: "A1".to_string(),
        user_id: "u1".to_string(),
        attempts: 5,
    };

    let report = run_sequential(&engine, &scenario).await.unwrap();

    assert_eq!(
        report.outcomes,
        vec![
            AttemptOutcome::Applied,
            AttemptOutcome::AlreadyTaken,
            AttemptOutcome::AlreadyTaken,
            AttemptOutcome::AlreadyTaken,
            AttemptOutcome::AlreadyTaken,
        ]
    );
    assert_eq!(report.applied(), 1);
    assert_eq!(store.get(&SeatKey::new("showA", "A1")).unwrap().user_id, "u1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_never_double_book() {
    let store = InMemoryStore::new();
    let engine = engine_on(&store, "node1");
    let scenario = ConcurrentScenario {
        seed: Some(7),
        ..ConcurrentScenario::default()
    };

    let report = run_concurrent(&engine, &scenario).await.unwrap();

    assert_eq!(report.clients.len(), 3);
    assert!(report.clients.iter().all(|c| c.attempts() == 10));
    assert_eq!(report.total_failed(), 0);
    assert!(report.total_applied() <= 30);
    // Every key touched on an empty table was won by exactly one client.
    assert_eq!(report.total_applied(), report.distinct_keys_touched());
    assert_eq!(store.len(), report.total_applied());
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_concurrent_records_store_failures_and_continues() {
    let store = InMemoryStore::new();
    store.fail_next(
        StoreOperation::Insert,
        ReservationError::ConsistencyUnavailable("QUORUM needs 2 replicas".to_string()),
    );
    let engine = engine_on(&store, "node1");
    let scenario = ConcurrentScenario {
        clients: 1,
        requests_per_client: 4,
        shows: vec!["show1".to_string()],
        seats_per_show: 10,
        seed: Some(1),
    };

    let report = run_concurrent(&engine, &scenario).await.unwrap();

    let client = &report.clients[0];
    assert_eq!(client.attempts(), 4);
    assert_eq!(client.failed, 1);
    assert!(report.is_consistent());
}

#[tokio::test]
async fn test_invalid_scenario_is_rejected() {
    let store = InMemoryStore::new();
    let engine = engine_on(&store, "node1");
    let scenario = ConcurrentScenario {
        shows: Vec::new(),
        ..ConcurrentScenario::default()
    };

    let err = run_concurrent(&engine, &scenario).await.unwrap_err();

    assert!(matches!(err, LoadError::InvalidScenario(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_huge_attempt_count_is_rejected_without_running() {
    let store = InMemoryStore::new();
    let engine = engine_on(&store, "node1");
    let scenario = SequentialScenario {
        show_id: "showA".to_string(),
        seat_id: "A1".to_string(),
        user_id: "u1".to_string(),
        attempts: usize::MAX,
    };

    let err = run_sequential(&engine, &scenario).await.unwrap_err();

    assert!(matches!(err, LoadError::InvalidScenario(_)));
    assert!(store.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_accounts_for_every_seat() {
    let store = InMemoryStore::new();
    let engines = [engine_on(&store, "node1"), engine_on(&store, "node2")];
    let scenario = RaceScenario {
        show_id: "race_single".to_string(),
        seats: 1,
        delay_min: Duration::from_millis(1),
        delay_max: Duration::from_millis(3),
        seed: None,
    };

    let report = run_race(engines, &scenario).await.unwrap();

    assert_eq!(report.total_applied(), 1);
    assert!(!report.passed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_race_splits_seats_between_coordinators() {
    // 1. Which side wins each seat depends on timing; retry on fresh shows
    let store = InMemoryStore::new();
    let mut passed = false;

    for round in 0..8 {
        let engines = [engine_on(&store, "node1"), engine_on(&store, "node2")];
        let scenario = RaceScenario {
            show_id: format!("race_{}", round),
            seats: 20,
            delay_min: Duration::from_millis(2),
            delay_max: Duration::from_millis(10),
            seed: None,
        };

        let report = run_race(engines, &scenario).await.unwrap();

        // 2. Regardless of the split, each seat has exactly one winner
        assert_eq!(report.total_applied(), 20);
        let won: usize = report.clients.iter().map(|c| c.won.len()).sum();
        assert_eq!(won, 20);

        if report.passed() {
            passed = true;
            break;
        }
    }

    assert!(passed, "one client won every seat in every round");
}
