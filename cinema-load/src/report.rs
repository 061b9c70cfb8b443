use cinema_core::SeatKey;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

/// What a single reservation attempt ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Applied,
    AlreadyTaken,
    /// The store failed; the attempt is recorded and the run continues.
    Failed(String),
}

/// Per-actor accumulator. Owned by one task until the join barrier.
#[derive(Debug, Clone, Default)]
pub struct ClientSummary {
    pub client_id: usize,
    pub user_id: String,
    pub applied: usize,
    pub already_taken: usize,
    pub failed: usize,
    pub won: Vec<SeatKey>,
    pub touched: BTreeSet<SeatKey>,
    pub elapsed: Duration,
}

impl ClientSummary {
    pub fn new(client_id: usize) -> Self {
        Self {
            client_id,
            user_id: format!("user_{}", client_id),
            ..Self::default()
        }
    }

    pub fn record(&mut self, key: SeatKey, outcome: &AttemptOutcome) {
        match outcome {
            AttemptOutcome::Applied => {
                self.applied += 1;
                self.won.push(key.clone());
            }
            AttemptOutcome::AlreadyTaken => self.already_taken += 1,
            AttemptOutcome::Failed(_) => self.failed += 1,
        }
        self.touched.insert(key);
    }

    pub fn attempts(&self) -> usize {
        self.applied + self.already_taken + self.failed
    }
}

impl fmt::Display for ClientSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Client {} -> Success: {}, Failed: {}",
            self.client_id,
            self.applied,
            self.already_taken + self.failed
        )?;
        if self.failed > 0 {
            write!(f, " ({} store errors)", self.failed)?;
        }
        write!(f, ", Time: {:.2}s", self.elapsed.as_secs_f64())
    }
}

#[derive(Debug, Clone)]
pub struct SequentialReport {
    pub outcomes: Vec<AttemptOutcome>,
    pub elapsed: Duration,
}

impl SequentialReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, AttemptOutcome::Applied))
    }

    pub fn already_taken(&self) -> usize {
        self.count(|o| matches!(o, AttemptOutcome::AlreadyTaken))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, AttemptOutcome::Failed(_)))
    }

    fn count(&self, predicate: impl Fn(&AttemptOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(*o)).count()
    }
}

impl fmt::Display for SequentialReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Successful reservations: {}", self.applied())?;
        writeln!(f, "Failed attempts: {}", self.already_taken() + self.failed())?;
        if self.failed() > 0 {
            writeln!(f, "Store errors: {}", self.failed())?;
        }
        write!(f, "Time: {:.2} seconds", self.elapsed.as_secs_f64())
    }
}

#[derive(Debug, Clone)]
pub struct ConcurrentReport {
    pub clients: Vec<ClientSummary>,
    pub elapsed: Duration,
}

impl ConcurrentReport {
    pub fn total_applied(&self) -> usize {
        self.clients.iter().map(|c| c.applied).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.clients.iter().map(|c| c.failed).sum()
    }

    /// Distinct keys that received at least one attempt, across all clients.
    pub fn distinct_keys_touched(&self) -> usize {
        self.clients
            .iter()
            .flat_map(|c| c.touched.iter())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// No key was won twice, and on an initially empty table every touched key
    /// was won once. Attempts that failed in the store may leave a touched key
    /// unclaimed, so the equality is only required without store errors.
    pub fn is_consistent(&self) -> bool {
        let won: Vec<_> = self.clients.iter().flat_map(|c| c.won.iter()).collect();
        let unique: BTreeSet<_> = won.iter().collect();
        if unique.len() != won.len() {
            return false;
        }
        let touched = self.distinct_keys_touched();
        if self.total_failed() == 0 {
            won.len() == touched
        } else {
            won.len() <= touched
        }
    }
}

impl fmt::Display for ConcurrentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for client in &self.clients {
            writeln!(f, "{}", client)?;
        }
        write!(
            f,
            "Applied: {}, distinct seats touched: {}, Time: {:.2}s",
            self.total_applied(),
            self.distinct_keys_touched(),
            self.elapsed.as_secs_f64()
        )
    }
}

#[derive(Debug, Clone)]
pub struct RaceReport {
    pub clients: Vec<ClientSummary>,
    pub seats: usize,
    pub elapsed: Duration,
}

impl RaceReport {
    pub fn total_applied(&self) -> usize {
        self.clients.iter().map(|c| c.applied).sum()
    }

    /// Both actors won at least one seat. A statistical health check, not a
    /// correctness proof: a skewed network can legitimately let one side win
    /// every seat.
    pub fn passed(&self) -> bool {
        self.clients.len() == 2 && self.clients.iter().all(|c| c.applied > 0)
    }
}

impl fmt::Display for RaceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for client in &self.clients {
            writeln!(f, "Client {} -> Reserved Seats: {}", client.client_id, client.applied)?;
        }
        if self.passed() {
            write!(f, "Both clients successfully made some reservations. Test PASSED.")
        } else {
            write!(f, "One client reserved everything. Test FAILED.")
        }
    }
}
