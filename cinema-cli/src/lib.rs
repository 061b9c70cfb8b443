pub mod menu;
pub mod prompt;
pub mod render;
pub mod shell;

pub use shell::Shell;

use cinema_core::ReservationError;

#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("Input closed")]
    Closed,
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("No cluster nodes configured")]
    NoNodes,
    #[error(transparent)]
    Store(#[from] ReservationError),
}
