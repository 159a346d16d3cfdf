use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum SimulatorError {
    // Assembly errors
    ParseError { line: usize, message: String },

    // Runtime errors
    WatchdogExceeded { cycles: usize },
    InvalidRedirect { target: u16 },

    // Internal consistency errors
    InternalInvariant(String),

    // System errors
    IoError(std::io::Error),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatorError::ParseError { line, message } => {
                write!(f, "Parse error on line {}: {}", line, message)
            },
            SimulatorError::WatchdogExceeded { cycles } => {
                write!(
                    f,
                    "Watchdog exceeded: simulation incomplete after {} cycles",
                    cycles
                )
            },
            SimulatorError::InvalidRedirect { target } => {
                write!(f, "Invalid redirect target: {}", target)
            },
            SimulatorError::InternalInvariant(message) => {
                write!(f, "Internal invariant violated: {}", message)
            },
            SimulatorError::IoError(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for SimulatorError {}

impl From<std::io::Error> for SimulatorError {
    fn from(error: std::io::Error) -> Self {
        SimulatorError::IoError(error)
    }
}
