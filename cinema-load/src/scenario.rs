use std::time::Duration;

use crate::LoadError;

/// Upper bounds on user-supplied scenario sizes.
pub const MAX_ATTEMPTS: usize = 100_000;
pub const MAX_CLIENTS: usize = 1_000;
pub const MAX_REQUESTS_PER_CLIENT: usize = 100_000;
pub const MAX_SEATS: usize = 10_000;

fn within(what: &str, value: usize, max: usize) -> Result<(), LoadError> {
    if value == 0 || value > max {
        return Err(LoadError::InvalidScenario(format!("{} must be between 1 and {}, got {}", what, max, value)));
    }
    Ok(())
}

/// Seat ids `A1..A{count}`.
pub fn seat_ids(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("A{}", i)).collect()
}

/// One actor, one key, `attempts` strictly sequential reservations.
#[derive(Debug, Clone)]
pub struct SequentialScenario {
    pub show_id: String,
    pub seat_id: String,
    pub user_id: String,
    pub attempts: usize,
}

impl SequentialScenario {
    pub fn validate(&self) -> Result<(), LoadError> {
        within("attempts", self.attempts, MAX_ATTEMPTS)
    }
}

/// `clients` concurrent actors, each making `requests_per_client` attempts on
/// keys drawn uniformly from `shows × seat_ids(seats_per_show)`.
#[derive(Debug, Clone)]
pub struct ConcurrentScenario {
    pub clients: usize,
    pub requests_per_client: usize,
    pub shows: Vec<String>,
    pub seats_per_show: usize,
    /// Fixed seed for reproducible key choices; random when `None`.
    pub seed: Option<u64>,
}

impl ConcurrentScenario {
    pub fn validate(&self) -> Result<(), LoadError> {
        within("clients", self.clients, MAX_CLIENTS)?;
        within("requests per client", self.requests_per_client, MAX_REQUESTS_PER_CLIENT)?;
        if self.shows.is_empty() {
            return Err(LoadError::InvalidScenario("key space is empty".to_string()));
        }
        within("seats per show", self.seats_per_show, MAX_SEATS)
    }

    pub fn key_space(&self) -> usize {
        self.shows.len() * self.seats_per_show
    }
}

impl Default for ConcurrentScenario {
    fn default() -> Self {
        Self {
            clients: 3,
            requests_per_client: 10,
            shows: vec!["show1".to_string(), "show2".to_string(), "show3".to_string()],
            seats_per_show: 10,
            seed: None,
        }
    }
}

/// Two actors on different coordinators, each trying every seat of one show
/// in order, sleeping a random delay before each attempt.
#[derive(Debug, Clone)]
pub struct RaceScenario {
    pub show_id: String,
    pub seats: usize,
    pub delay_min: Duration,
    pub delay_max: Duration,
    pub seed: Option<u64>,
}

impl RaceScenario {
    pub fn validate(&self) -> Result<(), LoadError> {
        within("race seats", self.seats, MAX_SEATS)?;
        if self.delay_min > self.delay_max {
            return Err(LoadError::InvalidScenario(format!(
                "delay range {:?}..{:?} is empty",
                self.delay_min, self.delay_max
            )));
        }
        Ok(())
    }
}

impl Default for RaceScenario {
    fn default() -> Self {
        Self {
            show_id: "show_Stress_Test_3".to_string(),
            seats: 20,
            delay_min: Duration::from_millis(10),
            delay_max: Duration::from_millis(50),
            seed: None,
        }
    }
}
