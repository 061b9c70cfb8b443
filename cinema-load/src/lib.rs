//! Load scenarios that drive the reservation engine under contention.
//!
//! Each scenario checks one observable property of the conditional insert:
//! a single actor repeating itself, many actors over a small key space, and
//! two actors on different coordinators racing for a whole show.

pub mod scenario;
pub mod report;
pub mod runner;

pub use report::{AttemptOutcome, ClientSummary, ConcurrentReport, RaceReport, SequentialReport};
pub use runner::{run_concurrent, run_race, run_sequential};
pub use scenario::{
    seat_ids, ConcurrentScenario, RaceScenario, SequentialScenario, MAX_ATTEMPTS, MAX_CLIENTS, MAX_REQUESTS_PER_CLIENT,
    MAX_SEATS,
};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Invalid scenario: {0}")]
    InvalidScenario(String),
    #[error("Simulated client {client_id} did not finish: {reason}")]
    ClientAborted { client_id: usize, reason: String },
}
