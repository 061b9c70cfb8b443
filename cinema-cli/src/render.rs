use chrono::{DateTime, Local, Utc};

use cinema_core::{Reservation, ReservationError, ReserveOutcome, UpdateOutcome};
use cinema_load::{AttemptOutcome, SequentialReport};

pub const RULE: &str = "==================================";

pub fn time(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

pub fn reserve(show_id: &str, seat_id: &str, outcome: &ReserveOutcome) -> String {
    match outcome {
        ReserveOutcome::Applied(_) => format!("Reservation successful for seat {} in show {}.", seat_id, show_id),
        ReserveOutcome::AlreadyTaken { existing: Some(row) } => {
            format!("Seat {} is already reserved by {}.", seat_id, row.user_id)
        }
        ReserveOutcome::AlreadyTaken { existing: None } => format!("Seat {} is already reserved.", seat_id),
    }
}

pub fn update(outcome: &UpdateOutcome) -> String {
    match outcome {
        UpdateOutcome::Updated { released, claimed } => {
            format!("Seat updated from {} to {}", released.seat_id, claimed.seat_id)
        }
        UpdateOutcome::NotFound => "No reservation found for that seat.".to_string(),
        UpdateOutcome::NotOwner { .. } => "You can only update your own reservations.".to_string(),
        UpdateOutcome::NewSeatTaken { .. } => "New seat is already taken.".to_string(),
    }
}

pub fn error(err: &ReservationError) -> String {
    match err {
        ReservationError::IncompleteMove { kept, claimed, .. } => format!(
            "Seat {} was reserved but {} could not be released; you now hold both. ({})",
            claimed, kept, err
        ),
        other if other.is_transient() => format!("Error: {}. The cluster may be down or overloaded; try again.", other),
        other => format!("Error: {}", other),
    }
}

pub fn show_listing(show_id: &str, rows: &[Reservation]) -> String {
    let mut lines = vec![format!("All reservations for show '{}':", show_id)];
    lines.extend(
        rows.iter()
            .map(|row| format!("Seat: {}, User: {}, Time: {}", row.seat_id, row.user_id, time(&row.reservation_time))),
    );
    if rows.is_empty() {
        lines.push("No reservations.".to_string());
    }
    lines.join("\n")
}

pub fn user_listing(user_id: &str, rows: &[Reservation]) -> String {
    let mut lines = vec![format!("Reservations for user '{}':", user_id)];
    lines.extend(
        rows.iter()
            .map(|row| format!("Show: {}, Seat: {}, Time: {}", row.show_id, row.seat_id, time(&row.reservation_time))),
    );
    if rows.is_empty() {
        lines.push("No reservations.".to_string());
    }
    lines.join("\n")
}

pub fn attempts(report: &SequentialReport) -> String {
    report
        .outcomes
        .iter()
        .enumerate()
        .map(|(i, outcome)| match outcome {
            AttemptOutcome::Applied => format!("Attempt {}: Reservation successful", i + 1),
            AttemptOutcome::AlreadyTaken => format!("Attempt {}: Seat already reserved", i + 1),
            AttemptOutcome::Failed(reason) => format!("Attempt {}: Error: {}", i + 1, reason),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema_core::SeatKey;

    #[test]
    fn test_reserve_messages() {
        let row = Reservation::now(&SeatKey::new("show1", "A1"), "alice");

        assert_eq!(
            reserve("show1", "A1", &ReserveOutcome::Applied(row.clone())),
            "Reservation successful for seat A1 in show show1."
        );
        assert_eq!(
            reserve("show1", "A1", &ReserveOutcome::AlreadyTaken { existing: Some(row) }),
            "Seat A1 is already reserved by alice."
        );
    }

    #[test]
    fn test_empty_listing_says_so() {
        assert_eq!(show_listing("show9", &[]), "All reservations for show 'show9':\nNo reservations.");
    }

    #[test]
    fn test_incomplete_move_names_both_seats() {
        let err = ReservationError::IncompleteMove {
            show_id: "show1".to_string(),
            kept: "A1".to_string(),
            claimed: "A2".to_string(),
            source: Box::new(ReservationError::Transport("reset".to_string())),
        };

        let text = error(&err);
        assert!(text.starts_with("Seat A2 was reserved but A1 could not be released"));
    }

    #[test]
    fn test_transient_errors_suggest_retry() {
        let timeout = error(&ReservationError::Timeout(std::time::Duration::from_secs(10)));
        assert!(timeout.ends_with("try again."));

        let rejected = error(&ReservationError::InvalidRequest("seat_id must not be empty".to_string()));
        assert_eq!(rejected, "Error: Invalid request: seat_id must not be empty");
    }
}
