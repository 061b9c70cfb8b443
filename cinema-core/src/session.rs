use crate::engine::ReservationEngine;
use crate::reservation::{Reservation, ReserveOutcome, UpdateOutcome};
use crate::{ReservationError, ReservationResult};

/// The acting user, passed explicitly to every call that needs one.
#[derive(Clone)]
pub struct UserSession {
    user_id: String,
    engine: ReservationEngine,
}

impl UserSession {
    /// Start acting as `user_id`. Surrounding whitespace is ignored.
    pub fn login(engine: ReservationEngine, user_id: &str) -> ReservationResult<Self> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ReservationError::InvalidRequest("user id must not be empty".to_string()));
        }
        tracing::info!(user_id, endpoint = engine.endpoint(), "User logged in");
        Ok(Self {
            user_id: user_id.to_string(),
            engine,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn engine(&self) -> &ReservationEngine {
        &self.engine
    }

    pub async fn reserve(&self, show_id: &str, seat_id: &str) -> ReservationResult<ReserveOutcome> {
        self.engine.reserve(show_id, seat_id, &self.user_id).await
    }

    pub async fn update_seat(&self, show_id: &str, old_seat_id: &str, new_seat_id: &str) -> ReservationResult<UpdateOutcome> {
        self.engine
            .update_seat(show_id, old_seat_id, new_seat_id, &self.user_id)
            .await
    }

    pub async fn my_reservations(&self) -> ReservationResult<Vec<Reservation>> {
        self.engine.list_by_user(&self.user_id).await
    }
}
