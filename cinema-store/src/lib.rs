pub mod app_config;
pub mod schema;
pub mod cql;
pub mod redis_repo;

pub use app_config::{Backend, Config};
pub use cql::{CqlReservationStore, CqlSession};
pub use redis_repo::RedisReservationStore;

use cinema_core::{InMemoryStore, ReservationEngine, ReservationResult, ReservationStore};
use std::sync::Arc;
use tracing::info;

/// Opens stores for the configured backend, one per coordinator endpoint.
pub struct Connector {
    config: Config,
    // Shared by every `memory` connection so all "nodes" see the same rows.
    memory: InMemoryStore,
}

impl Connector {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            memory: InMemoryStore::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn nodes(&self) -> &[String] {
        &self.config.cluster.nodes
    }

    pub async fn connect(&self, node: &str) -> ReservationResult<Arc<dyn ReservationStore>> {
        let cluster = &self.config.cluster;
        info!(node, backend = ?cluster.backend, "Opening store session");

        let store: Arc<dyn ReservationStore> = match cluster.backend {
            Backend::Cql => {
                let endpoint = self.config.cql_endpoint(node);
                Arc::new(CqlReservationStore::connect(&endpoint, cluster).await?)
            }
            Backend::Redis => {
                let url = self.config.redis_url(node);
                Arc::new(RedisReservationStore::connect(&url, &cluster.keyspace).await?)
            }
            Backend::Memory => Arc::new(self.memory.handle(node)),
        };
        Ok(store)
    }

    /// An engine whose session is pinned to `node`.
    pub async fn engine(&self, node: &str) -> ReservationResult<ReservationEngine> {
        let store = self.connect(node).await?;
        Ok(ReservationEngine::new(store, self.config.cluster.request_timeout()))
    }
}
