use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::repository::ReservationStore;
use crate::reservation::{ClearOutcome, InsertResult, Reservation, ReserveOutcome, SeatKey, UpdateOutcome};
use crate::{ReservationError, ReservationResult};

/// Conditional reservation protocol on top of a [`ReservationStore`].
///
/// The engine keeps no reservation state between calls: the store is the only
/// source of truth and every check is a round trip. Cloning is cheap, so each
/// concurrent actor gets its own handle.
#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn ReservationStore>,
    request_timeout: Duration,
}

impl ReservationEngine {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(store: Arc<dyn ReservationStore>, request_timeout: Duration) -> Self {
        Self {
            store,
            request_timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        self.store.endpoint()
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Claim a seat with an insert-if-absent.
    ///
    /// Losing the race is reported as [`ReserveOutcome::AlreadyTaken`]; nothing
    /// is retried, neither a lost race nor a store failure.
    pub async fn reserve(&self, show_id: &str, seat_id: &str, user_id: &str) -> ReservationResult<ReserveOutcome> {
        require("show_id", show_id)?;
        require("seat_id", seat_id)?;
        require("user_id", user_id)?;

        let key = SeatKey::new(show_id, seat_id);
        self.claim(&key, user_id).await
    }

    /// Move a reservation of `user_id` from `old_seat_id` to `new_seat_id`.
    ///
    /// The move is two independent writes: claim the new seat, then delete the
    /// old one. The old seat is only released once the new one is held. If the
    /// delete fails the user keeps both seats and the caller gets
    /// [`ReservationError::IncompleteMove`]; the new seat is not rolled back.
    pub async fn update_seat(
        &self,
        show_id: &str,
        old_seat_id: &str,
        new_seat_id: &str,
        user_id: &str,
    ) -> ReservationResult<UpdateOutcome> {
        require("show_id", show_id)?;
        require("old_seat_id", old_seat_id)?;
        require("new_seat_id", new_seat_id)?;
        require("user_id", user_id)?;

        let old_key = SeatKey::new(show_id, old_seat_id);
        let new_key = SeatKey::new(show_id, new_seat_id);

        // 1. Current owner of the old seat
        let owner = match self.bounded(self.store.fetch_owner(&old_key)).await? {
            Some(owner) => owner,
            None => {
                debug!(seat = %old_key, "Seat move rejected: no reservation");
                return Ok(UpdateOutcome::NotFound);
            }
        };

        // 2. Ownership gate
        if owner != user_id {
            debug!(seat = %old_key, %owner, user_id, "Seat move rejected: not the owner");
            return Ok(UpdateOutcome::NotOwner { owner });
        }

        // 3. Claim the new seat; the old one stays untouched on failure
        let claimed = match self.claim(&new_key, user_id).await? {
            ReserveOutcome::Applied(claimed) => claimed,
            ReserveOutcome::AlreadyTaken { existing } => {
                return Ok(UpdateOutcome::NewSeatTaken { existing });
            }
        };

        // 4. Release the old seat
        if let Err(source) = self.bounded(self.store.delete(&old_key)).await {
            warn!(
                kept = %old_key,
                claimed = %new_key,
                user_id,
                error = %source,
                "Seat move left both seats reserved"
            );
            return Err(ReservationError::IncompleteMove {
                show_id: show_id.to_string(),
                kept: old_seat_id.to_string(),
                claimed: new_seat_id.to_string(),
                source: Box::new(source),
            });
        }

        info!(from = %old_key, to = %new_key, user_id, "Seat moved");
        Ok(UpdateOutcome::Updated {
            released: old_key,
            claimed,
        })
    }

    /// Delete every reservation. Irreversible; callers confirm first.
    pub async fn clear_all(&self) -> ReservationResult<ClearOutcome> {
        self.bounded(self.store.truncate()).await?;
        warn!(endpoint = self.endpoint(), "All reservations cleared");
        Ok(ClearOutcome::Cleared)
    }

    /// Reservations of one show, ordered by seat.
    pub async fn list_by_show(&self, show_id: &str) -> ReservationResult<Vec<Reservation>> {
        let mut rows = self.bounded(self.store.list_by_show(show_id)).await?;
        rows.sort_by(|a, b| a.seat_id.cmp(&b.seat_id));
        Ok(rows)
    }

    /// Reservations of one user across all shows, ordered by show and seat.
    ///
    /// This is a full-table scan filtered on `user_id`; it does not scale past
    /// small datasets. A secondary index or materialized view would be needed.
    pub async fn list_by_user(&self, user_id: &str) -> ReservationResult<Vec<Reservation>> {
        warn!(user_id, "Listing by user scans every partition");
        let mut rows = self.bounded(self.store.scan_by_user(user_id)).await?;
        rows.sort_by(|a, b| (&a.show_id, &a.seat_id).cmp(&(&b.show_id, &b.seat_id)));
        Ok(rows)
    }

    async fn claim(&self, key: &SeatKey, user_id: &str) -> ReservationResult<ReserveOutcome> {
        let reservation = Reservation::now(key, user_id);

        match self.bounded(self.store.insert_if_absent(&reservation)).await? {
            InsertResult::Applied => {
                info!(seat = %key, user_id, "Reservation applied");
                Ok(ReserveOutcome::Applied(reservation))
            }
            InsertResult::NotApplied(existing) => {
                debug!(
                    seat = %key,
                    user_id,
                    owner = existing.as_ref().map(|row| row.user_id.as_str()),
                    "Seat already reserved"
                );
                Ok(ReserveOutcome::AlreadyTaken { existing })
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> ReservationResult<T>
    where
        F: Future<Output = ReservationResult<T>>,
    {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(endpoint = self.endpoint(), timeout = ?self.request_timeout, "Store request timed out");
                Err(ReservationError::Timeout(self.request_timeout))
            }
        }
    }
}

fn require(field: &str, value: &str) -> ReservationResult<()> {
    if value.trim().is_empty() {
        return Err(ReservationError::InvalidRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}
