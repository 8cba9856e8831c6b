use core::fmt;
use thiserror::Error;

/// One of the three lines wired to a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    Data,
    Clock,
    Latch,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Line::Data => "data",
            Line::Clock => "clock",
            Line::Latch => "latch",
        };
        f.write_str(name)
    }
}

/// Errors reported by controller setup. Nothing is written to the port
/// registers when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("port {port} is not available (expected 1 or 2)")]
    InvalidPort { port: u8 },

    #[error("{line} pin {pin} is out of range (expected 0 to 7)")]
    PinOutOfRange { line: Line, pin: u8 },

    #[error("{first} and {second} lines share pin {pin}")]
    PinConflict { first: Line, second: Line, pin: u8 },

    #[error("{line} pin {pin} on port {port} has no line behind it")]
    PinNotConnected { port: u8, line: Line, pin: u8 },

    #[error("pin {pin} on port {port} is already used by another controller")]
    PinInUse { port: u8, pin: u8 },
}
