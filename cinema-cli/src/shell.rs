use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, info, warn};

use cinema_core::{ReservationEngine, UserSession};
use cinema_load::{run_concurrent, run_race, run_sequential, ConcurrentScenario, RaceScenario, SequentialScenario};
use cinema_store::Connector;

use crate::menu::{self, MainCommand, UserCommand, MAIN_MENU, USER_MENU};
use crate::prompt::Prompt;
use crate::render::{self, RULE};
use crate::ShellError;

/// Interactive front end: pick a coordinator, then loop over the main menu.
pub struct Shell<R, W> {
    prompt: Prompt<R, W>,
    connector: Connector,
}

impl<R, W> Shell<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, out: W, connector: Connector) -> Self {
        Self {
            prompt: Prompt::new(input, out),
            connector,
        }
    }

    /// Runs until the user exits or input ends.
    pub async fn run(&mut self) -> Result<(), ShellError> {
        match self.main_loop().await {
            Ok(()) | Err(ShellError::Closed) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn into_output(self) -> W {
        self.prompt.into_output()
    }

    async fn main_loop(&mut self) -> Result<(), ShellError> {
        self.prompt.say("Cinema Reservation System").await?;

        let node = self.choose_node().await?;
        let engine = self.connector.engine(&node).await?;
        self.prompt.say(RULE).await?;
        self.prompt.say(format!("Connected to {}", engine.endpoint())).await?;

        loop {
            self.prompt.say(RULE).await?;
            self.prompt.say(menu::render(MAIN_MENU)).await?;
            let choice = self.prompt.ask("Select option: ").await?;

            let command = match choice.parse::<MainCommand>() {
                Ok(command) => command,
                Err(_) => {
                    self.prompt.say("Invalid option").await?;
                    continue;
                }
            };

            match command {
                MainCommand::Login => self.login(&engine).await?,
                MainCommand::Exit => {
                    self.prompt.say("Goodbye!").await?;
                    return Ok(());
                }
                MainCommand::StressRepeat => self.stress_repeat(&engine).await?,
                MainCommand::StressConcurrent => self.stress_concurrent(&engine).await?,
                MainCommand::StressRace => self.stress_race().await?,
                MainCommand::ClearAll => self.clear_all(&engine).await?,
            }
        }
    }

    async fn choose_node(&mut self) -> Result<String, ShellError> {
        let nodes = self.connector.nodes().to_vec();
        let Some(first) = nodes.first().cloned() else {
            return Err(ShellError::NoNodes);
        };

        self.prompt.say("Select node to connect to:").await?;
        for (index, node) in nodes.iter().enumerate() {
            self.prompt.say(format!("{}. Node {} ({})", index + 1, index + 1, node)).await?;
        }
        let choice = self
            .prompt
            .ask(&format!("Enter choice [1-{}]: ", nodes.len()))
            .await?;

        let picked = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| nodes.get(i).cloned());
        match picked {
            Some(node) => Ok(node),
            None => {
                self.prompt.say("Invalid choice, defaulting to Node 1").await?;
                Ok(first)
            }
        }
    }

    async fn login(&mut self, engine: &ReservationEngine) -> Result<(), ShellError> {
        let user_id = self.prompt.ask("Enter your User ID: ").await?;
        match UserSession::login(engine.clone(), &user_id) {
            Ok(session) => self.user_loop(&session).await,
            Err(_) => self.prompt.say("Invalid User ID").await,
        }
    }

    async fn user_loop(&mut self, session: &UserSession) -> Result<(), ShellError> {
        loop {
            self.prompt.say(format!("\nLogged in as: {}", session.user_id())).await?;
            self.prompt.say(menu::render(USER_MENU)).await?;
            let choice = self.prompt.ask("Select option: ").await?;

            let command = match choice.parse::<UserCommand>() {
                Ok(command) => command,
                Err(_) => {
                    self.prompt.say("Invalid option").await?;
                    continue;
                }
            };
            self.prompt.say(RULE).await?;

            match command {
                UserCommand::Reserve => {
                    let show_id = self.prompt.ask("Enter Show ID: ").await?;
                    let seat_id = self.prompt.ask("Enter Seat ID: ").await?;
                    let message = match session.reserve(&show_id, &seat_id).await {
                        Ok(outcome) => render::reserve(&show_id, &seat_id, &outcome),
                        Err(e) => render::error(&e),
                    };
                    self.prompt.say(message).await?;
                }
                UserCommand::Update => {
                    let show_id = self.prompt.ask("Enter Show ID: ").await?;
                    let old_seat_id = self.prompt.ask("Enter Old Seat ID: ").await?;
                    let new_seat_id = self.prompt.ask("Enter New Seat ID: ").await?;
                    let message = match session.update_seat(&show_id, &old_seat_id, &new_seat_id).await {
                        Ok(outcome) => render::update(&outcome),
                        Err(e) => render::error(&e),
                    };
                    self.prompt.say(message).await?;
                }
                UserCommand::ViewMine => {
                    let message = match session.my_reservations().await {
                        Ok(rows) => render::user_listing(session.user_id(), &rows),
                        Err(e) => render::error(&e),
                    };
                    self.prompt.say(message).await?;
                }
                UserCommand::ViewShow => {
                    let show_id = self.prompt.ask("Enter Show ID: ").await?;
                    let message = match session.engine().list_by_show(&show_id).await {
                        Ok(rows) => render::show_listing(&show_id, &rows),
                        Err(e) => render::error(&e),
                    };
                    self.prompt.say(message).await?;
                }
                UserCommand::Logout => {
                    self.prompt.say("Logging out...").await?;
                    info!(user_id = session.user_id(), "User logged out");
                    return Ok(());
                }
            }
        }
    }

    async fn stress_repeat(&mut self, engine: &ReservationEngine) -> Result<(), ShellError> {
        self.prompt.say(RULE).await?;
        self.prompt
            .say("Starting Stress Test 1: the client makes the same request very quickly")
            .await?;

        let show_id = self.prompt.ask("Enter Show ID for test: ").await?;
        let seat_id = self.prompt.ask("Enter Seat ID to reserve: ").await?;
        let user_id = self.prompt.ask("Enter User ID: ").await?;
        if show_id.is_empty() || seat_id.is_empty() || user_id.is_empty() {
            return self.prompt.say("Show, seat and user IDs are required").await;
        }
        let Some(attempts) = self.prompt.ask_count("Enter number of attempts", 5).await? else {
            return self.prompt.say("Invalid number").await;
        };

        let scenario = SequentialScenario {
            show_id,
            seat_id,
            user_id,
            attempts,
        };
        match run_sequential(engine, &scenario).await {
            Ok(report) => {
                self.prompt.say(render::attempts(&report)).await?;
                self.prompt.say("\nStress Test Complete").await?;
                self.prompt.say(report.to_string()).await
            }
            Err(e) => self.prompt.say(format!("Error: {}", e)).await,
        }
    }

    async fn stress_concurrent(&mut self, engine: &ReservationEngine) -> Result<(), ShellError> {
        self.prompt.say(RULE).await?;
        self.prompt
            .say("Starting Stress Test 2: several clients make random requests at once")
            .await?;

        let stress = self.connector.config().stress.clone();
        let Some(clients) = self
            .prompt
            .ask_count("Enter number of simulated clients (2 or more)", stress.clients)
            .await?
        else {
            return self.prompt.say("Invalid input").await;
        };
        if clients < 2 {
            return self.prompt.say("At least 2 clients are needed to contend").await;
        }
        let Some(requests_per_client) = self
            .prompt
            .ask_count("Enter number of requests per client", stress.requests_per_client)
            .await?
        else {
            return self.prompt.say("Invalid input").await;
        };

        let scenario = ConcurrentScenario {
            clients,
            requests_per_client,
            shows: stress.shows,
            seats_per_show: stress.seats_per_show,
            seed: None,
        };
        match run_concurrent(engine, &scenario).await {
            Ok(report) => {
                self.prompt.say("\nStress Test 2 Summary:").await?;
                self.prompt.say(report.to_string()).await
            }
            Err(e) => self.prompt.say(format!("Error: {}", e)).await,
        }
    }

    async fn stress_race(&mut self) -> Result<(), ShellError> {
        self.prompt.say(RULE).await?;
        self.prompt
            .say("Starting Stress Test 3: two clients on different nodes take every seat")
            .await?;

        let nodes = self.connector.nodes().to_vec();
        let (first, second) = match nodes.as_slice() {
            [] => return Err(ShellError::NoNodes),
            [only] => {
                warn!(node = %only, "Only one node configured; both race clients share it");
                (only.clone(), only.clone())
            }
            [first, second, ..] => (first.clone(), second.clone()),
        };

        // Fresh sessions, one per coordinator.
        let engines = match (self.connector.engine(&first).await, self.connector.engine(&second).await) {
            (Ok(a), Ok(b)) => [a, b],
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "Could not open race sessions");
                return self.prompt.say(render::error(&e)).await;
            }
        };

        let stress = &self.connector.config().stress;
        let scenario = RaceScenario {
            show_id: stress.race_show.clone(),
            seats: stress.race_seats,
            delay_min: Duration::from_millis(stress.race_delay_min_ms),
            delay_max: Duration::from_millis(stress.race_delay_max_ms),
            seed: None,
        };
        match run_race(engines, &scenario).await {
            Ok(report) => {
                self.prompt.say("\nStress Test 3 Summary:").await?;
                self.prompt.say(report.to_string()).await
            }
            Err(e) => self.prompt.say(format!("Error: {}", e)).await,
        }
    }

    async fn clear_all(&mut self, engine: &ReservationEngine) -> Result<(), ShellError> {
        self.prompt.say(RULE).await?;
        let confirm = self
            .prompt
            .ask("Are you sure you want to delete ALL reservations? (yes/no): ")
            .await?;
        if !confirm.eq_ignore_ascii_case("yes") {
            return self.prompt.say("Clear operation canceled.").await;
        }

        match engine.clear_all().await {
            Ok(_) => self.prompt.say("All reservations have been cleared.").await,
            Err(e) => self.prompt.say(format!("Error clearing reservations: {}", e)).await,
        }
    }
}
