use thiserror::Error;

/// Relay error taxonomy. Codes live in a flat numeric space so clients can
/// switch on them: 1xxx connection setup, 2xxx display registration,
/// 3xxx runtime relay, 4xxx protocol, 5xxx auth.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("missing or invalid query parameter: {0}")]
    InvalidParams(String),

    #[error("invalid client type: {0}")]
    InvalidClientType(String),

    #[error("command url unreachable: {0}")]
    CommandUrlUnreachable(String),

    #[error("command schema is not well-formed JSON: {0}")]
    MalformedSchema(String),

    #[error("display id already in use: {0}")]
    DisplayIdConflict(String),

    #[error("display not found: {0}")]
    DisplayNotFound(String),

    #[error("not subscribed to display: {0}")]
    NotSubscribed(String),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("authentication failed")]
    AuthenticationFailed,
}

impl RelayError {
    /// Numeric wire code carried in `error` envelopes.
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidParams(_) => 1001,
            Self::InvalidClientType(_) => 1002,
            Self::CommandUrlUnreachable(_) => 2001,
            Self::MalformedSchema(_) => 2002,
            Self::DisplayIdConflict(_) => 2003,
            Self::DisplayNotFound(_) => 3001,
            Self::NotSubscribed(_) => 3004,
            Self::InvalidMessage(_) => 4001,
            Self::AuthenticationFailed => 5001,
        }
    }
}
