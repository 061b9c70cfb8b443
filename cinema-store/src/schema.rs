//! CQL schema and statement texts for the `reservations` table.

pub const TABLE: &str = "reservations";

pub fn create_keyspace(keyspace: &str, replication_factor: u32) -> String {
    format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    )
}

pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS reservations (
    show_id text,
    seat_id text,
    user_id text,
    reservation_time timestamp,
    PRIMARY KEY (show_id, seat_id)
)";

pub const INSERT_IF_NOT_EXISTS: &str = "INSERT INTO reservations (show_id, seat_id, user_id, reservation_time) \
     VALUES (?, ?, ?, ?) IF NOT EXISTS";

pub const SELECT_BY_SHOW: &str = "SELECT show_id, seat_id, user_id, reservation_time FROM reservations \
     WHERE show_id = ?";

// Cross-partition scan; there is no index on user_id.
pub const SELECT_BY_USER: &str = "SELECT show_id, seat_id, user_id, reservation_time FROM reservations \
     WHERE user_id = ? ALLOW FILTERING";

pub const SELECT_OWNER: &str = "SELECT user_id FROM reservations WHERE show_id = ? AND seat_id = ?";

pub const DELETE_SEAT: &str = "DELETE FROM reservations WHERE show_id = ? AND seat_id = ?";

pub const TRUNCATE: &str = "TRUNCATE reservations";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_ddl() {
        assert_eq!(
            create_keyspace("cinema", 2),
            "CREATE KEYSPACE IF NOT EXISTS cinema WITH replication = {'class': 'SimpleStrategy', 'replication_factor': 2}"
        );
    }

    #[test]
    fn test_statements_target_the_table() {
        for statement in [INSERT_IF_NOT_EXISTS, SELECT_BY_SHOW, SELECT_BY_USER, SELECT_OWNER, DELETE_SEAT, TRUNCATE] {
            assert!(statement.contains(TABLE), "{}", statement);
        }
        assert!(INSERT_IF_NOT_EXISTS.ends_with("IF NOT EXISTS"));
        assert!(SELECT_BY_USER.ends_with("ALLOW FILTERING"));
    }
}
