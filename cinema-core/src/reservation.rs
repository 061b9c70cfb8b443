use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a reservation: one seat in one show.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatKey {
    pub show_id: String,
    pub seat_id: String,
}

impl SeatKey {
    pub fn new(show_id: impl Into<String>, seat_id: impl Into<String>) -> Self {
        Self {
            show_id: show_id.into(),
            seat_id: seat_id.into(),
        }
    }
}

impl fmt::Display for SeatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.show_id, self.seat_id)
    }
}

/// A row of the `reservations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub show_id: String,
    pub seat_id: String,
    pub user_id: String,
    pub reservation_time: DateTime<Utc>,
}

impl Reservation {
    /// Build a reservation stamped with the current time.
    ///
    /// The timestamp is truncated to milliseconds, the resolution of the
    /// store's `timestamp` type, so a row echoed back compares equal.
    pub fn now(key: &SeatKey, user_id: impl Into<String>) -> Self {
        Self {
            show_id: key.show_id.clone(),
            seat_id: key.seat_id.clone(),
            user_id: user_id.into(),
            reservation_time: Utc::now().trunc_subsecs(3),
        }
    }

    pub fn key(&self) -> SeatKey {
        SeatKey::new(self.show_id.clone(), self.seat_id.clone())
    }
}

/// Raw result of a conditional insert as reported by a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    Applied,
    /// The precondition failed. Stores echo the row that won when they can.
    NotApplied(Option<Reservation>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    Applied(Reservation),
    AlreadyTaken { existing: Option<Reservation> },
}

impl ReserveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReserveOutcome::Applied(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { released: SeatKey, claimed: Reservation },
    NotFound,
    NotOwner { owner: String },
    NewSeatTaken { existing: Option<Reservation> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared,
}
