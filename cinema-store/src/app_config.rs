use cinema_core::ReservationEngine;
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub stress: StressConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cql,
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClusterConfig {
    pub backend: Backend,
    pub nodes: Vec<String>,
    #[serde(default = "default_cql_port")]
    pub port: u16,
    pub keyspace: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub create_schema: bool,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
}

fn default_cql_port() -> u16 { 9042 }
fn default_replication_factor() -> u32 { 2 }

impl ClusterConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Cql,
            nodes: vec!["172.22.0.2".to_string(), "172.22.0.3".to_string()],
            port: default_cql_port(),
            keyspace: "cinema".to_string(),
            connect_timeout_ms: 5_000,
            request_timeout_ms: ReservationEngine::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            create_schema: false,
            replication_factor: default_replication_factor(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub port: u16,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self { port: 6379 }
    }
}

/// Defaults for the stress scenarios offered by the shell.
#[derive(Debug, Deserialize, Clone)]
pub struct StressConfig {
    pub clients: usize,
    pub requests_per_client: usize,
    pub shows: Vec<String>,
    pub seats_per_show: usize,
    pub race_show: String,
    pub race_seats: usize,
    pub race_delay_min_ms: u64,
    pub race_delay_max_ms: u64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            clients: 3,
            requests_per_client: 10,
            shows: vec!["show1".to_string(), "show2".to_string(), "show3".to_string()],
            seats_per_show: 10,
            race_show: "show_Stress_Test_3".to_string(),
            race_seats: 20,
            race_delay_min_ms: 10,
            race_delay_max_ms: 50,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `CINEMA__CLUSTER__BACKEND=memory`, `CINEMA__CLUSTER__NODES=10.0.0.1,10.0.0.2`
            .add_source(
                config::Environment::with_prefix("CINEMA")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cluster.nodes")
                    .with_list_parse_key("stress.shows")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }

    /// `host:port` for the CQL native protocol on `node`.
    pub fn cql_endpoint(&self, node: &str) -> String {
        with_default_port(node, self.cluster.port)
    }

    /// Connection URL for the Redis backend on `node`.
    pub fn redis_url(&self, node: &str) -> String {
        format!("redis://{}/", with_default_port(node, self.redis.port))
    }
}

fn with_default_port(node: &str, port: u16) -> String {
    if node.parse::<std::net::SocketAddr>().is_ok() || node.rsplit_once(':').is_some_and(|(_, p)| p.parse::<u16>().is_ok()) {
        node.to_string()
    } else {
        format!("{}:{}", node, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_checked_in_file() {
        let from_file: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        let default = Config::default();

        assert_eq!(from_file.cluster.nodes, default.cluster.nodes);
        assert_eq!(from_file.cluster.keyspace, default.cluster.keyspace);
        assert_eq!(from_file.cluster.backend, default.cluster.backend);
        assert_eq!(from_file.cluster.request_timeout_ms, default.cluster.request_timeout_ms);
        assert_eq!(from_file.stress.shows, default.stress.shows);
        assert_eq!(from_file.stress.race_seats, default.stress.race_seats);
    }

    #[test]
    fn test_endpoints_get_default_ports() {
        let config = Config::default();

        assert_eq!(config.cql_endpoint("172.22.0.2"), "172.22.0.2:9042");
        assert_eq!(config.cql_endpoint("172.22.0.2:19042"), "172.22.0.2:19042");
        assert_eq!(config.cql_endpoint("cinema-node1"), "cinema-node1:9042");
        assert_eq!(config.redis_url("localhost"), "redis://localhost:6379/");
    }

    #[test]
    fn test_timeouts_are_milliseconds() {
        let cluster = ClusterConfig {
            connect_timeout_ms: 1500,
            request_timeout_ms: 250,
            ..ClusterConfig::default()
        };

        assert_eq!(cluster.connect_timeout(), Duration::from_millis(1500));
        assert_eq!(cluster.request_timeout(), Duration::from_millis(250));
        assert_eq!(
            ClusterConfig::default().request_timeout(),
            ReservationEngine::DEFAULT_REQUEST_TIMEOUT
        );
    }
}
