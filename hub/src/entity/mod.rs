mod controller;
mod display;

use std::fmt;

pub use controller::Controller;
pub use display::Display;

/// The three client classes the hub distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Display,
    Controller,
    Inspector,
}

impl ClientKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Display => "display",
            Self::Controller => "controller",
            Self::Inspector => "inspector",
        }
    }
}

impl fmt::Display for ClientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
