use futures_util::future::join_all;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{error, info};

use cinema_core::{ReservationEngine, ReserveOutcome, SeatKey};

use crate::report::{AttemptOutcome, ClientSummary, ConcurrentReport, RaceReport, SequentialReport};
use crate::scenario::{seat_ids, ConcurrentScenario, RaceScenario, SequentialScenario};
use crate::LoadError;

/// Same request, over and over, from one actor.
pub async fn run_sequential(engine: &ReservationEngine, scenario: &SequentialScenario) -> Result<SequentialReport, LoadError> {
    scenario.validate()?;
    info!(
        show_id = %scenario.show_id,
        seat_id = %scenario.seat_id,
        attempts = scenario.attempts,
        "Starting sequential repetition"
    );

    let started = Instant::now();
    let mut outcomes = Vec::new();
    for attempt in 1..=scenario.attempts {
        let outcome = attempt_once(
            engine,
            &SeatKey::new(scenario.show_id.clone(), scenario.seat_id.clone()),
            &scenario.user_id,
        )
        .await;
        info!(attempt, ?outcome, "Sequential attempt finished");
        outcomes.push(outcome);
    }

    Ok(SequentialReport {
        outcomes,
        elapsed: started.elapsed(),
    })
}

/// `clients` independent actors choosing random keys from a shared key space.
///
/// Actors only coordinate through the store. Each returns its own summary
/// from its task; summaries are merged after every task has been joined.
pub async fn run_concurrent(engine: &ReservationEngine, scenario: &ConcurrentScenario) -> Result<ConcurrentReport, LoadError> {
    scenario.validate()?;
    info!(
        clients = scenario.clients,
        requests_per_client = scenario.requests_per_client,
        key_space = scenario.key_space(),
        "Starting concurrent clients"
    );

    let seats = seat_ids(scenario.seats_per_show);
    let started = Instant::now();

    let handles: Vec<JoinHandle<ClientSummary>> = (1..=scenario.clients)
        .map(|client_id| {
            let engine = engine.clone();
            let shows = scenario.shows.clone();
            let seats = seats.clone();
            let requests = scenario.requests_per_client;
            let rng = client_rng(scenario.seed, client_id);

            tokio::spawn(async move {
                let mut rng = rng;
                let mut summary = ClientSummary::new(client_id);
                let client_started = Instant::now();

                for _ in 0..requests {
                    let show_id = &shows[rng.gen_range(0..shows.len())];
                    let seat_id = &seats[rng.gen_range(0..seats.len())];
                    let key = SeatKey::new(show_id.clone(), seat_id.clone());

                    let outcome = attempt_once(&engine, &key, &summary.user_id).await;
                    log_attempt(client_id, &key, &outcome);
                    summary.record(key, &outcome);
                }

                summary.elapsed = client_started.elapsed();
                summary
            })
        })
        .collect();

    let clients = join_clients(handles).await?;
    let report = ConcurrentReport {
        clients,
        elapsed: started.elapsed(),
    };
    info!(
        applied = report.total_applied(),
        touched = report.distinct_keys_touched(),
        consistent = report.is_consistent(),
        "Concurrent clients finished"
    );
    Ok(report)
}

/// Two actors, each through its own engine (ideally pinned to different
/// coordinators), both trying to take every seat of one show.
pub async fn run_race(engines: [ReservationEngine; 2], scenario: &RaceScenario) -> Result<RaceReport, LoadError> {
    scenario.validate()?;
    info!(
        show_id = %scenario.show_id,
        seats = scenario.seats,
        coordinators = ?engines.iter().map(|e| e.endpoint().to_string()).collect::<Vec<_>>(),
        "Starting exhaustive race"
    );

    let seats = seat_ids(scenario.seats);
    let started = Instant::now();

    let handles: Vec<JoinHandle<ClientSummary>> = engines
        .into_iter()
        .enumerate()
        .map(|(index, engine)| {
            let client_id = index + 1;
            let show_id = scenario.show_id.clone();
            let seats = seats.clone();
            let (delay_min, delay_max) = (scenario.delay_min, scenario.delay_max);
            let rng = client_rng(scenario.seed, client_id);

            tokio::spawn(async move {
                let mut rng = rng;
                let mut summary = ClientSummary::new(client_id);
                let client_started = Instant::now();

                for seat_id in &seats {
                    // Jitter widens the window in which both actors contend.
                    tokio::time::sleep(rng.gen_range(delay_min..=delay_max)).await;

                    let key = SeatKey::new(show_id.clone(), seat_id.clone());
                    let outcome = attempt_once(&engine, &key, &summary.user_id).await;
                    log_attempt(client_id, &key, &outcome);
                    summary.record(key, &outcome);
                }

                summary.elapsed = client_started.elapsed();
                summary
            })
        })
        .collect();

    let clients = join_clients(handles).await?;
    let report = RaceReport {
        clients,
        seats: scenario.seats,
        elapsed: started.elapsed(),
    };
    info!(applied = report.total_applied(), passed = report.passed(), "Exhaustive race finished");
    Ok(report)
}

async fn attempt_once(engine: &ReservationEngine, key: &SeatKey, user_id: &str) -> AttemptOutcome {
    match engine.reserve(&key.show_id, &key.seat_id, user_id).await {
        Ok(ReserveOutcome::Applied(_)) => AttemptOutcome::Applied,
        Ok(ReserveOutcome::AlreadyTaken { .. }) => AttemptOutcome::AlreadyTaken,
        Err(e) => AttemptOutcome::Failed(e.to_string()),
    }
}

fn log_attempt(client_id: usize, key: &SeatKey, outcome: &AttemptOutcome) {
    match outcome {
        AttemptOutcome::Applied => info!("[Client {}] Reserved {}", client_id, key),
        AttemptOutcome::AlreadyTaken => info!("[Client {}] {} already taken", client_id, key),
        AttemptOutcome::Failed(reason) => error!("[Client {}] Error reserving {}: {}", client_id, key, reason),
    }
}

fn client_rng(seed: Option<u64>, client_id: usize) -> StdRng {
    match seed {
        // Mix the base seed with the client id so clients do not mirror each other.
        Some(seed) => StdRng::seed_from_u64(seed ^ (client_id as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15)),
        None => StdRng::from_entropy(),
    }
}

async fn join_clients(handles: Vec<JoinHandle<ClientSummary>>) -> Result<Vec<ClientSummary>, LoadError> {
    let mut clients = Vec::with_capacity(handles.len());
    for (index, joined) in join_all(handles).await.into_iter().enumerate() {
        let summary = joined.map_err(|e| LoadError::ClientAborted {
            client_id: index + 1,
            reason: e.to_string(),
        })?;
        clients.push(summary);
    }
    Ok(clients)
}
