pub mod envelope;
pub mod error;

pub use envelope::{
    ClientMessage, DisplayIds, ErrorPayload, Incoming, InspectorEnvelope, Outgoing, SERVER_SOURCE,
};
pub use error::RelayError;
