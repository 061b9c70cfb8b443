use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::repository::ReservationStore;
use crate::reservation::{InsertResult, Reservation, SeatKey};
use crate::{ReservationError, ReservationResult};

/// Store operations that can be targeted by an injected fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Insert,
    FetchOwner,
    Delete,
    ListByShow,
    ScanByUser,
    Truncate,
}

#[derive(Default)]
struct Shared {
    rows: Mutex<BTreeMap<SeatKey, Reservation>>,
    faults: Mutex<Vec<(StoreOperation, ReservationError)>>,
    latency: Mutex<Option<Duration>>,
}

/// Single-process stand-in for the cluster.
///
/// Every key is guarded by one mutex, which makes the conditional insert
/// linearizable. Handles created with [`InMemoryStore::handle`] share the
/// same rows and act as different coordinators of one cluster.
#[derive(Clone)]
pub struct InMemoryStore {
    endpoint: String,
    shared: Arc<Shared>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            endpoint: "memory".to_string(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Another coordinator onto the same data.
    pub fn handle(&self, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Make the next call of `operation` fail with `error`.
    pub fn fail_next(&self, operation: StoreOperation, error: ReservationError) {
        self.shared
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((operation, error));
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.shared.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub fn get(&self, key: &SeatKey) -> Option<Reservation> {
        self.rows().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn rows(&self) -> std::sync::MutexGuard<'_, BTreeMap<SeatKey, Reservation>> {
        self.shared.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn round_trip(&self, operation: StoreOperation) -> ReservationResult<()> {
        let latency = *self.shared.latency.lock().unwrap_or_else(PoisonError::into_inner);
        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            // Let concurrent callers interleave as they would over a network.
            None => tokio::task::yield_now().await,
        }

        let mut faults = self.shared.faults.lock().unwrap_or_else(PoisonError::into_inner);
        match faults.iter().position(|(op, _)| *op == operation) {
            Some(index) => Err(faults.remove(index).1),
            None => Ok(()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn insert_if_absent(&self, reservation: &Reservation) -> ReservationResult<InsertResult> {
        self.round_trip(StoreOperation::Insert).await?;

        let mut rows = self.rows();
        let key = reservation.key();
        if let Some(existing) = rows.get(&key) {
            return Ok(InsertResult::NotApplied(Some(existing.clone())));
        }
        rows.insert(key, reservation.clone());
        Ok(InsertResult::Applied)
    }

    async fn fetch_owner(&self, key: &SeatKey) -> ReservationResult<Option<String>> {
        self.round_trip(StoreOperation::FetchOwner).await?;
        Ok(self.rows().get(key).map(|row| row.user_id.clone()))
    }

    async fn delete(&self, key: &SeatKey) -> ReservationResult<()> {
        self.round_trip(StoreOperation::Delete).await?;
        self.rows().remove(key);
        Ok(())
    }

    async fn list_by_show(&self, show_id: &str) -> ReservationResult<Vec<Reservation>> {
        self.round_trip(StoreOperation::ListByShow).await?;
        Ok(self
            .rows()
            .values()
            .filter(|row| row.show_id == show_id)
            .cloned()
            .collect())
    }

    async fn scan_by_user(&self, user_id: &str) -> ReservationResult<Vec<Reservation>> {
        self.round_trip(StoreOperation::ScanByUser).await?;
        Ok(self
            .rows()
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn truncate(&self) -> ReservationResult<()> {
        self.round_trip(StoreOperation::Truncate).await?;
        self.rows().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handles_share_rows() {
        let node1 = InMemoryStore::new().handle("node1");
        let node2 = node1.handle("node2");
        let reservation = Reservation::now(&SeatKey::new("show1", "A1"), "u1");

        assert_eq!(node1.insert_if_absent(&reservation).await.unwrap(), InsertResult::Applied);
        assert_eq!(
            node2.insert_if_absent(&reservation).await.unwrap(),
            InsertResult::NotApplied(Some(reservation.clone()))
        );
        assert_eq!(node2.endpoint(), "node2");
        assert_eq!(node1.len(), 1);
    }

    #[tokio::test]
    async fn test_fault_is_consumed_once() {
        let store = InMemoryStore::new();
        store.fail_next(
            StoreOperation::Truncate,
            ReservationError::Transport("boom".to_string()),
        );

        assert!(matches!(store.truncate().await, Err(ReservationError::Transport(_))));
        assert!(store.truncate().await.is_ok());
    }
}
