use std::fmt::Write as _;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainCommand {
    Login,
    Exit,
    StressRepeat,
    StressConcurrent,
    StressRace,
    ClearAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserCommand {
    Reserve,
    Update,
    ViewMine,
    ViewShow,
    Logout,
}

pub const MAIN_MENU: &[(MainCommand, &str)] = &[
    (MainCommand::Login, "Login"),
    (MainCommand::Exit, "Exit"),
    (MainCommand::StressRepeat, "Run Stress Test 1"),
    (MainCommand::StressConcurrent, "Run Stress Test 2"),
    (MainCommand::StressRace, "Run Stress Test 3"),
    (MainCommand::ClearAll, "Clear All Reservations"),
];

pub const USER_MENU: &[(UserCommand, &str)] = &[
    (UserCommand::Reserve, "Make Reservation"),
    (UserCommand::Update, "Update Reservation"),
    (UserCommand::ViewMine, "View My Reservations"),
    (UserCommand::ViewShow, "View All Reservations"),
    (UserCommand::Logout, "Logout"),
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid option: {0:?}")]
pub struct InvalidOption(pub String);

/// Numbered listing, one entry per line, starting at 1.
pub fn render<T>(menu: &[(T, &str)]) -> String {
    let mut out = String::new();
    for (index, (_, label)) in menu.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", index + 1, label);
    }
    out
}

fn pick<T: Copy>(menu: &[(T, &str)], input: &str) -> Result<T, InvalidOption> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| menu.get(i))
        .map(|(command, _)| *command)
        .ok_or_else(|| InvalidOption(input.trim().to_string()))
}

impl FromStr for MainCommand {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        pick(MAIN_MENU, s)
    }
}

impl FromStr for UserCommand {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        pick(USER_MENU, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_menu_numbers() {
        assert_eq!("1".parse::<MainCommand>(), Ok(MainCommand::Login));
        assert_eq!(" 6 ".parse::<MainCommand>(), Ok(MainCommand::ClearAll));
        assert_eq!("5".parse::<UserCommand>(), Ok(UserCommand::Logout));
    }

    #[test]
    fn test_out_of_range_is_invalid() {
        assert!("0".parse::<MainCommand>().is_err());
        assert!("7".parse::<MainCommand>().is_err());
        assert!("6".parse::<UserCommand>().is_err());
        assert_eq!("login".parse::<MainCommand>(), Err(InvalidOption("login".to_string())));
    }

    #[test]
    fn test_render_numbers_from_one() {
        let text = render(USER_MENU);
        assert!(text.starts_with("1. Make Reservation\n"));
        assert!(text.ends_with("5. Logout\n"));
    }
}
