use async_trait::async_trait;

use crate::reservation::{InsertResult, Reservation, SeatKey};
use crate::ReservationResult;

/// Store access for the `reservations` table.
///
/// Implementations are pinned to a single coordinator endpoint and hold no
/// reservation state of their own; every call is one round trip.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Coordinator this handle talks to.
    fn endpoint(&self) -> &str;

    /// Insert the row only if no row exists for its key.
    ///
    /// Must be linearizable per key: of any number of concurrent calls for the
    /// same key, exactly one reports [`InsertResult::Applied`].
    async fn insert_if_absent(&self, reservation: &Reservation) -> ReservationResult<InsertResult>;

    async fn fetch_owner(&self, key: &SeatKey) -> ReservationResult<Option<String>>;

    /// Unconditional delete.
    async fn delete(&self, key: &SeatKey) -> ReservationResult<()>;

    async fn list_by_show(&self, show_id: &str) -> ReservationResult<Vec<Reservation>>;

    /// Full scan filtered on `user_id`. Not backed by an index.
    async fn scan_by_user(&self, user_id: &str) -> ReservationResult<Vec<Reservation>>;

    /// Remove every reservation.
    async fn truncate(&self) -> ReservationResult<()>;
}
