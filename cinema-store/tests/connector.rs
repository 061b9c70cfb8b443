use cinema_core::{ReserveOutcome, SeatKey, UpdateOutcome};
use cinema_store::app_config::{Backend, ClusterConfig};
use cinema_store::{Config, Connector};

fn memory_config() -> Config {
    Config {
        cluster: ClusterConfig {
            backend: Backend::Memory,
            nodes: vec!["node1".to_string(), "node2".to_string()],
            ..ClusterConfig::default()
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn test_memory_nodes_share_one_table() {
    let connector = Connector::new(memory_config());
    let node1 = connector.engine("node1").await.unwrap();
    let node2 = connector.engine("node2").await.unwrap();

    assert_eq!(node1.endpoint(), "node1");
    assert_eq!(node2.endpoint(), "node2");

    assert!(node1.reserve("show1", "A1", "u1").await.unwrap().is_applied());
    match node2.reserve("show1", "A1", "u2").await.unwrap() {
        ReserveOutcome::AlreadyTaken { existing } => assert_eq!(existing.unwrap().user_id, "u1"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_engine_uses_configured_timeout() {
    let mut config = memory_config();
    config.cluster.request_timeout_ms = 1234;
    let connector = Connector::new(config);

    let engine = connector.engine("node1").await.unwrap();

    assert_eq!(engine.request_timeout(), std::time::Duration::from_millis(1234));
}

#[tokio::test]
async fn test_unreachable_cql_node_is_a_connection_error() {
    let mut config = Config::default();
    config.cluster.connect_timeout_ms = 200;
    let connector = Connector::new(config);

    // Reserved TEST-NET-1 address, nothing listens there.
    let err = connector.connect("192.0.2.1:9042").await.err().unwrap();

    assert!(matches!(err, cinema_core::ReservationError::Connection(_)), "{:?}", err);
}

#[tokio::test]
#[ignore = "needs a Cassandra or ScyllaDB node in CINEMA_TEST_NODE"]
async fn test_cql_reservation_protocol_live() {
    let Ok(node) = std::env::var("CINEMA_TEST_NODE") else { return };
    let mut config = Config::default();
    config.cluster.create_schema = true;
    config.cluster.replication_factor = 1;
    let connector = Connector::new(config);
    let engine = connector.engine(&node).await.unwrap();
    engine.clear_all().await.unwrap();

    assert!(engine.reserve("showA", "A1", "u1").await.unwrap().is_applied());
    match engine.reserve("showA", "A1", "u2").await.unwrap() {
        ReserveOutcome::AlreadyTaken { existing } => assert_eq!(existing.unwrap().user_id, "u1"),
        other => panic!("unexpected outcome {:?}", other),
    }

    let moved = engine.update_seat("showA", "A1", "A2", "u1").await.unwrap();
    assert!(matches!(moved, UpdateOutcome::Updated { ref released, .. } if *released == SeatKey::new("showA", "A1")));

    let mine = engine.list_by_user("u1").await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].seat_id, "A2");

    engine.clear_all().await.unwrap();
    assert!(engine.list_by_show("showA").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "needs a Cassandra or ScyllaDB node in CINEMA_TEST_NODE"]
async fn test_cql_listings_read_past_the_first_page() {
    let Ok(node) = std::env::var("CINEMA_TEST_NODE") else { return };
    let mut config = Config::default();
    config.cluster.create_schema = true;
    config.cluster.replication_factor = 1;
    let connector = Connector::new(config);
    let engine = connector.engine(&node).await.unwrap();
    engine.clear_all().await.unwrap();

    // The driver's default page holds 5000 rows.
    let seats = 5_100;
    for n in 1..=seats {
        engine.reserve("showPaged", &format!("A{}", n), "pager").await.unwrap();
    }

    assert_eq!(engine.list_by_show("showPaged").await.unwrap().len(), seats);
    assert_eq!(engine.list_by_user("pager").await.unwrap().len(), seats);

    engine.clear_all().await.unwrap();
}
