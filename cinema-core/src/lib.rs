pub mod reservation;
pub mod repository;
pub mod engine;
pub mod session;
pub mod memory;

pub use reservation::{ClearOutcome, InsertResult, Reservation, ReserveOutcome, SeatKey, UpdateOutcome};
pub use repository::ReservationStore;
pub use engine::ReservationEngine;
pub use session::UserSession;
pub use memory::{InMemoryStore, StoreOperation};

use std::time::Duration;

/// Failures surfaced by the reservation stack.
///
/// Losing a race (`AlreadyTaken`, `NewSeatTaken`) and the ownership checks of a
/// seat move are outcomes, not errors; see [`ReserveOutcome`] and [`UpdateOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Keyspace unavailable: {0}")]
    Keyspace(String),
    #[error("Consistency level not achievable: {0}")]
    ConsistencyUnavailable(String),
    #[error("Store did not answer within {0:?}")]
    Timeout(Duration),
    #[error("Store request failed: {0}")]
    Transport(String),
    #[error("Unexpected row shape: {0}")]
    Decode(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Seat move in show {show_id} claimed {claimed} but could not release {kept}; both seats are held: {source}")]
    IncompleteMove {
        show_id: String,
        kept: String,
        claimed: String,
        #[source]
        source: Box<ReservationError>,
    },
}

impl ReservationError {
    /// Whether the failure came from the store being unreachable or slow,
    /// as opposed to a rejected request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReservationError::Connection(_)
                | ReservationError::ConsistencyUnavailable(_)
                | ReservationError::Timeout(_)
                | ReservationError::Transport(_)
        )
    }
}

pub type ReservationResult<T> = Result<T, ReservationError>;
