use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use scylla::frame::response::result::{ColumnSpec, CqlValue, Row};
use scylla::frame::value::CqlTimestamp;
use scylla::prepared_statement::PreparedStatement;
use scylla::serialize::row::SerializeRow;
use scylla::statement::{Consistency, SerialConsistency};
use scylla::transport::errors::{DbError, QueryError};
use scylla::transport::host_filter::AllowListHostFilter;
use scylla::{QueryResult, Session, SessionBuilder};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use cinema_core::{InsertResult, Reservation, ReservationError, ReservationResult, ReservationStore, SeatKey};

use crate::app_config::ClusterConfig;
use crate::schema;

/// A CQL session pinned to one coordinator.
///
/// The host filter keeps the driver from opening connections to the peers it
/// discovers, so every request is coordinated by `endpoint`.
pub struct CqlSession {
    session: Session,
    endpoint: String,
}

impl CqlSession {
    pub async fn connect(endpoint: &str, connect_timeout: Duration) -> ReservationResult<Self> {
        let only_this_node = AllowListHostFilter::new([endpoint])
            .map_err(|e| ReservationError::Connection(format!("{}: {}", endpoint, e)))?;

        let session = SessionBuilder::new()
            .known_node(endpoint)
            .host_filter(Arc::new(only_this_node))
            .connection_timeout(connect_timeout)
            .build()
            .await
            .map_err(|e| ReservationError::Connection(format!("{}: {}", endpoint, e)))?;

        info!("Connected to {}", endpoint);
        Ok(Self {
            session,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn select_keyspace(&self, keyspace: &str) -> ReservationResult<()> {
        self.session
            .use_keyspace(keyspace, false)
            .await
            .map_err(|e| keyspace_error(keyspace, e))
    }

    pub async fn prepare(&self, template: &str) -> ReservationResult<PreparedStatement> {
        self.session.prepare(template).await.map_err(classify)
    }

    pub async fn execute(&self, statement: &PreparedStatement, params: impl SerializeRow) -> ReservationResult<QueryResult> {
        self.session.execute(statement, params).await.map_err(classify)
    }

    /// Execute and follow the paging state until the last page.
    pub async fn execute_all(&self, statement: &PreparedStatement, params: impl SerializeRow) -> ReservationResult<PagedRows> {
        let mut pages = self
            .session
            .execute_iter(statement.clone(), params)
            .await
            .map_err(classify)?;
        let col_specs = pages.get_column_specs().to_vec();

        let mut rows = Vec::new();
        while let Some(row) = pages.next().await {
            rows.push(row.map_err(classify)?);
        }
        Ok(PagedRows { col_specs, rows })
    }

    /// Run an unprepared statement without bind values (DDL).
    pub async fn run(&self, cql: &str) -> ReservationResult<QueryResult> {
        self.session.query(cql, ()).await.map_err(classify)
    }
}

/// Every row of a paged query, with the column layout of its first page.
pub struct PagedRows {
    pub col_specs: Vec<ColumnSpec>,
    pub rows: Vec<Row>,
}

/// `USE` answers `Invalid` when the keyspace does not exist.
fn keyspace_error(keyspace: &str, err: QueryError) -> ReservationError {
    match err {
        QueryError::DbError(DbError::Invalid, _) => ReservationError::Keyspace(format!("{}: {}", keyspace, err)),
        other => classify(other),
    }
}

/// Maps driver failures onto the reservation error taxonomy.
fn classify(err: QueryError) -> ReservationError {
    match &err {
        QueryError::DbError(DbError::Unavailable { .. }, _)
        | QueryError::DbError(DbError::WriteTimeout { .. }, _)
        | QueryError::DbError(DbError::ReadTimeout { .. }, _) => ReservationError::ConsistencyUnavailable(err.to_string()),
        _ => ReservationError::Transport(err.to_string()),
    }
}

struct Statements {
    insert: PreparedStatement,
    select_by_show: PreparedStatement,
    select_by_user: PreparedStatement,
    select_owner: PreparedStatement,
    delete: PreparedStatement,
    truncate: PreparedStatement,
}

impl Statements {
    async fn prepare(session: &CqlSession) -> ReservationResult<Self> {
        let mut insert = session.prepare(schema::INSERT_IF_NOT_EXISTS).await?;
        insert.set_consistency(Consistency::Quorum);
        insert.set_serial_consistency(Some(SerialConsistency::Serial));

        // Reading at SERIAL sees the latest committed conditional write.
        let mut select_owner = session.prepare(schema::SELECT_OWNER).await?;
        select_owner.set_consistency(Consistency::Serial);

        let mut select_by_show = session.prepare(schema::SELECT_BY_SHOW).await?;
        select_by_show.set_consistency(Consistency::Quorum);

        let mut select_by_user = session.prepare(schema::SELECT_BY_USER).await?;
        select_by_user.set_consistency(Consistency::Quorum);

        let mut delete = session.prepare(schema::DELETE_SEAT).await?;
        delete.set_consistency(Consistency::Quorum);

        let truncate = session.prepare(schema::TRUNCATE).await?;

        Ok(Self {
            insert,
            select_by_show,
            select_by_user,
            select_owner,
            delete,
            truncate,
        })
    }
}

/// [`ReservationStore`] over a Cassandra / ScyllaDB cluster.
pub struct CqlReservationStore {
    session: CqlSession,
    statements: Statements,
}

impl CqlReservationStore {
    /// Connect to `endpoint`, select the keyspace and prepare every statement
    /// once, before the store is shared with any concurrent caller.
    pub async fn connect(endpoint: &str, cluster: &ClusterConfig) -> ReservationResult<Self> {
        let session = CqlSession::connect(endpoint, cluster.connect_timeout()).await?;

        if cluster.create_schema {
            ensure_schema(&session, &cluster.keyspace, cluster.replication_factor).await?;
        }
        session.select_keyspace(&cluster.keyspace).await?;

        let statements = Statements::prepare(&session).await?;
        debug!(endpoint, keyspace = %cluster.keyspace, "Prepared reservation statements");

        Ok(Self { session, statements })
    }
}

/// Create the keyspace and table if they are missing.
pub async fn ensure_schema(session: &CqlSession, keyspace: &str, replication_factor: u32) -> ReservationResult<()> {
    session.run(&schema::create_keyspace(keyspace, replication_factor)).await?;
    session.select_keyspace(keyspace).await?;
    session.run(schema::CREATE_TABLE).await?;
    info!("Schema ready in keyspace {}", keyspace);
    Ok(())
}

#[async_trait]
impl ReservationStore for CqlReservationStore {
    fn endpoint(&self) -> &str {
        self.session.endpoint()
    }

    async fn insert_if_absent(&self, reservation: &Reservation) -> ReservationResult<InsertResult> {
        let result = self
            .session
            .execute(
                &self.statements.insert,
                (
                    &reservation.show_id,
                    &reservation.seat_id,
                    &reservation.user_id,
                    CqlTimestamp(reservation.reservation_time.timestamp_millis()),
                ),
            )
            .await?;

        interpret_insert(&result.col_specs, result.rows.as_deref().unwrap_or_default())
    }

    async fn fetch_owner(&self, key: &SeatKey) -> ReservationResult<Option<String>> {
        let result = self
            .session
            .execute(&self.statements.select_owner, (&key.show_id, &key.seat_id))
            .await?;

        let user_id = column_index(&result.col_specs, "user_id")?;
        match result.rows_or_empty().first() {
            Some(row) => text(row, user_id, "user_id").map(Some),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &SeatKey) -> ReservationResult<()> {
        self.session
            .execute(&self.statements.delete, (&key.show_id, &key.seat_id))
            .await?;
        Ok(())
    }

    async fn list_by_show(&self, show_id: &str) -> ReservationResult<Vec<Reservation>> {
        let page = self.session.execute_all(&self.statements.select_by_show, (show_id,)).await?;
        decode_rows(&page.col_specs, &page.rows)
    }

    async fn scan_by_user(&self, user_id: &str) -> ReservationResult<Vec<Reservation>> {
        let page = self.session.execute_all(&self.statements.select_by_user, (user_id,)).await?;
        decode_rows(&page.col_specs, &page.rows)
    }

    async fn truncate(&self) -> ReservationResult<()> {
        self.session.execute(&self.statements.truncate, ()).await?;
        Ok(())
    }
}

/// Reads the `[applied]` flag of a lightweight transaction. When the write was
/// not applied the coordinator echoes the existing row in the same result.
fn interpret_insert(col_specs: &[ColumnSpec], rows: &[Row]) -> ReservationResult<InsertResult> {
    let applied_index = column_index(col_specs, "[applied]")?;
    let columns = ReservationColumns::of(col_specs).ok();

    let row = rows
        .first()
        .ok_or_else(|| ReservationError::Decode("conditional insert returned no rows".to_string()))?;

    let applied = row
        .columns
        .get(applied_index)
        .and_then(|value| value.as_ref())
        .and_then(CqlValue::as_boolean)
        .ok_or_else(|| ReservationError::Decode("[applied] is not a boolean".to_string()))?;

    if applied {
        return Ok(InsertResult::Applied);
    }
    let existing = columns.and_then(|columns| columns.decode(row).ok());
    Ok(InsertResult::NotApplied(existing))
}

struct ReservationColumns {
    show_id: usize,
    seat_id: usize,
    user_id: usize,
    reservation_time: usize,
}

impl ReservationColumns {
    fn of(col_specs: &[ColumnSpec]) -> ReservationResult<Self> {
        Ok(Self {
            show_id: column_index(col_specs, "show_id")?,
            seat_id: column_index(col_specs, "seat_id")?,
            user_id: column_index(col_specs, "user_id")?,
            reservation_time: column_index(col_specs, "reservation_time")?,
        })
    }

    fn decode(&self, row: &Row) -> ReservationResult<Reservation> {
        Ok(Reservation {
            show_id: text(row, self.show_id, "show_id")?,
            seat_id: text(row, self.seat_id, "seat_id")?,
            user_id: text(row, self.user_id, "user_id")?,
            reservation_time: timestamp(row, self.reservation_time)?,
        })
    }
}

fn decode_rows(col_specs: &[ColumnSpec], rows: &[Row]) -> ReservationResult<Vec<Reservation>> {
    let columns = ReservationColumns::of(col_specs)?;
    rows.iter().map(|row| columns.decode(row)).collect()
}

fn column_index(col_specs: &[ColumnSpec], name: &str) -> ReservationResult<usize> {
    col_specs
        .iter()
        .position(|spec| spec.name == name)
        .ok_or_else(|| ReservationError::Decode(format!("missing column {}", name)))
}

fn text(row: &Row, index: usize, name: &str) -> ReservationResult<String> {
    row.columns
        .get(index)
        .and_then(|value| value.as_ref())
        .and_then(CqlValue::as_text)
        .cloned()
        .ok_or_else(|| ReservationError::Decode(format!("{} is not text", name)))
}

fn timestamp(row: &Row, index: usize) -> ReservationResult<DateTime<Utc>> {
    match row.columns.get(index) {
        Some(Some(CqlValue::Timestamp(CqlTimestamp(millis)))) => DateTime::from_timestamp_millis(*millis)
            .ok_or_else(|| ReservationError::Decode(format!("timestamp {} out of range", millis))),
        _ => Err(ReservationError::Decode("reservation_time is not a timestamp".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scylla::frame::response::result::{ColumnType, TableSpec};

    fn spec(name: &str, typ: ColumnType) -> ColumnSpec {
        ColumnSpec {
            table_spec: TableSpec {
                ks_name: "cinema".to_string(),
                table_name: schema::TABLE.to_string(),
            },
            name: name.to_string(),
            typ,
        }
    }

    fn text_value(value: &str) -> Option<CqlValue> {
        Some(CqlValue::Text(value.to_string()))
    }

    // Column order of an LWT echo: `[applied]`, then the key, then the rest alphabetically.
    fn lwt_specs() -> Vec<ColumnSpec> {
        vec![
            spec("[applied]", ColumnType::Boolean),
            spec("show_id", ColumnType::Text),
            spec("seat_id", ColumnType::Text),
            spec("reservation_time", ColumnType::Timestamp),
            spec("user_id", ColumnType::Text),
        ]
    }

    #[test]
    fn test_applied_insert() {
        let specs = vec![spec("[applied]", ColumnType::Boolean)];
        let rows = vec![Row {
            columns: vec![Some(CqlValue::Boolean(true))],
        }];

        assert_eq!(interpret_insert(&specs, &rows).unwrap(), InsertResult::Applied);
    }

    #[test]
    fn test_rejected_insert_echoes_winner() {
        let rows = vec![Row {
            columns: vec![
                Some(CqlValue::Boolean(false)),
                text_value("show1"),
                text_value("A1"),
                Some(CqlValue::Timestamp(CqlTimestamp(1_700_000_000_123))),
                text_value("alice"),
            ],
        }];

        let result = interpret_insert(&lwt_specs(), &rows).unwrap();

        let InsertResult::NotApplied(Some(existing)) = result else {
            panic!("expected the existing row, got {:?}", result);
        };
        assert_eq!(existing.key(), SeatKey::new("show1", "A1"));
        assert_eq!(existing.user_id, "alice");
        assert_eq!(existing.reservation_time.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_missing_applied_column_is_a_decode_error() {
        let specs = vec![spec("user_id", ColumnType::Text)];
        let rows = vec![Row {
            columns: vec![text_value("alice")],
        }];

        assert!(matches!(interpret_insert(&specs, &rows), Err(ReservationError::Decode(_))));
    }

    #[test]
    fn test_empty_listing_decodes_to_no_rows() {
        let specs: Vec<_> = lwt_specs().into_iter().skip(1).collect();

        assert!(decode_rows(&specs, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_only_invalid_use_means_missing_keyspace() {
        let missing = QueryError::DbError(DbError::Invalid, "Keyspace 'nope' does not exist".to_string());
        assert!(matches!(keyspace_error("nope", missing), ReservationError::Keyspace(_)));

        let unavailable = QueryError::DbError(
            DbError::Unavailable {
                consistency: Consistency::Quorum,
                required: 2,
                alive: 1,
            },
            "Cannot achieve consistency level QUORUM".to_string(),
        );
        assert!(matches!(
            keyspace_error("cinema", unavailable),
            ReservationError::ConsistencyUnavailable(_)
        ));
    }
}
