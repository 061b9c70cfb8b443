use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use tracing::info;

use cinema_core::{InsertResult, Reservation, ReservationError, ReservationResult, ReservationStore, SeatKey};

// KEYS[1] = reservation key, KEYS[2] = show index, ARGV[1] = row JSON.
// Returns nil when the row was written, otherwise the row already there.
const INSERT_IF_ABSENT: &str = r#"
    local existing = redis.call("GET", KEYS[1])
    if existing then
        return existing
    end
    redis.call("SET", KEYS[1], ARGV[1])
    redis.call("SADD", KEYS[2], KEYS[1])
    return false
"#;

const SCAN_BATCH: usize = 500;

/// [`ReservationStore`] on Redis.
///
/// Rows are JSON values under `{namespace}:reservation:{show}:{seat}`. The
/// conditional insert runs as a Lua script, which Redis executes atomically,
/// so a single key has at most one winner.
#[derive(Clone)]
pub struct RedisReservationStore {
    conn: MultiplexedConnection,
    endpoint: String,
    namespace: String,
    insert_script: redis::Script,
}

impl RedisReservationStore {
    pub async fn connect(url: &str, namespace: &str) -> ReservationResult<Self> {
        let client = redis::Client::open(url).map_err(|e| ReservationError::Connection(format!("{}: {}", url, e)))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| ReservationError::Connection(format!("{}: {}", url, e)))?;

        info!("Connected to {}", url);
        Ok(Self {
            conn,
            endpoint: url.to_string(),
            namespace: namespace.to_string(),
            insert_script: redis::Script::new(INSERT_IF_ABSENT),
        })
    }

    fn row_key(&self, key: &SeatKey) -> String {
        format!("{}:reservation:{}:{}", self.namespace, key.show_id, key.seat_id)
    }

    fn show_index(&self, show_id: &str) -> String {
        format!("{}:show:{}", self.namespace, show_id)
    }

    async fn scan(&self, pattern: &str) -> ReservationResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(classify)?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }

    async fn load_rows(&self, keys: &[String]) -> ReservationResult<Vec<Reservation>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let values: Vec<Option<String>> = redis::cmd("MGET").arg(keys).query_async(&mut conn).await.map_err(classify)?;

        // A key can vanish between the index read and MGET.
        values.into_iter().flatten().map(|json| decode(&json)).collect()
    }
}

fn classify(err: RedisError) -> ReservationError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        ReservationError::Connection(err.to_string())
    } else {
        ReservationError::Transport(err.to_string())
    }
}

fn decode(json: &str) -> ReservationResult<Reservation> {
    serde_json::from_str(json).map_err(|e| ReservationError::Decode(e.to_string()))
}

#[async_trait]
impl ReservationStore for RedisReservationStore {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn insert_if_absent(&self, reservation: &Reservation) -> ReservationResult<InsertResult> {
        let mut conn = self.conn.clone();
        let row = serde_json::to_string(reservation).map_err(|e| ReservationError::Decode(e.to_string()))?;

        let existing: Option<String> = self
            .insert_script
            .key(self.row_key(&reservation.key()))
            .key(self.show_index(&reservation.show_id))
            .arg(row)
            .invoke_async(&mut conn)
            .await
            .map_err(classify)?;

        match existing {
            None => Ok(InsertResult::Applied),
            Some(json) => Ok(InsertResult::NotApplied(decode(&json).ok())),
        }
    }

    async fn fetch_owner(&self, key: &SeatKey) -> ReservationResult<Option<String>> {
        let mut conn = self.conn.clone();
        let row: Option<String> = conn.get(self.row_key(key)).await.map_err(classify)?;
        row.map(|json| decode(&json).map(|r| r.user_id)).transpose()
    }

    async fn delete(&self, key: &SeatKey) -> ReservationResult<()> {
        let mut conn = self.conn.clone();
        let row_key = self.row_key(key);
        let _: () = redis::pipe()
            .atomic()
            .del(&row_key)
            .ignore()
            .srem(self.show_index(&key.show_id), &row_key)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn list_by_show(&self, show_id: &str) -> ReservationResult<Vec<Reservation>> {
        let mut conn = self.conn.clone();
        let keys: Vec<String> = conn.smembers(self.show_index(show_id)).await.map_err(classify)?;
        self.load_rows(&keys).await
    }

    async fn scan_by_user(&self, user_id: &str) -> ReservationResult<Vec<Reservation>> {
        let keys = self.scan(&format!("{}:reservation:*", self.namespace)).await?;
        let rows = self.load_rows(&keys).await?;
        Ok(rows.into_iter().filter(|row| row.user_id == user_id).collect())
    }

    async fn truncate(&self) -> ReservationResult<()> {
        let mut keys = self.scan(&format!("{}:reservation:*", self.namespace)).await?;
        keys.extend(self.scan(&format!("{}:show:*", self.namespace)).await?);

        let mut conn = self.conn.clone();
        for batch in keys.chunks(SCAN_BATCH) {
            let _: () = conn.del(batch).await.map_err(classify)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn redis_url() -> Option<String> {
        std::env::var("CINEMA_TEST_REDIS").ok()
    }

    #[test]
    fn test_script_returns_nil_on_apply() {
        assert!(INSERT_IF_ABSENT.contains("return false"));
        assert!(INSERT_IF_ABSENT.contains("SADD"));
    }

    #[tokio::test]
    #[ignore = "needs a Redis server in CINEMA_TEST_REDIS"]
    async fn test_conditional_insert_against_redis() {
        let Some(url) = redis_url() else { return };
        let store = RedisReservationStore::connect(&url, "cinema_test").await.unwrap();
        store.truncate().await.unwrap();

        let first = Reservation::now(&SeatKey::new("show1", "A1"), "u1");
        let second = Reservation::now(&SeatKey::new("show1", "A1"), "u2");

        assert_eq!(store.insert_if_absent(&first).await.unwrap(), InsertResult::Applied);
        assert_eq!(
            store.insert_if_absent(&second).await.unwrap(),
            InsertResult::NotApplied(Some(first.clone()))
        );
        assert_eq!(store.fetch_owner(&first.key()).await.unwrap().as_deref(), Some("u1"));
        assert_eq!(store.list_by_show("show1").await.unwrap(), vec![first.clone()]);
        assert_eq!(store.scan_by_user("u1").await.unwrap(), vec![first.clone()]);

        store.delete(&first.key()).await.unwrap();
        assert!(store.list_by_show("show1").await.unwrap().is_empty());
        store.truncate().await.unwrap();
    }
}
