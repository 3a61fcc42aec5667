use crate::address::Address;
use crate::protocol::Malformed;

/// Delivery failures reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("no mailbox is open for {0}")]
    UnknownRecipient(Address),
    #[error("mailbox of {0} is closed")]
    Closed(Address),
    #[error("mailbox of {0} is full")]
    Full(Address),
}

/// Failures a role can run into while executing the rental protocol.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RentalError {
    /// No reply arrived within the receive bound.
    #[error("no reply from {peer} within the timeout")]
    Timeout { peer: Address },
    /// The vehicle is reserved, charging or not stocked at the station.
    #[error("vehicle {vehicle} is unavailable at {station}")]
    Unavailable { vehicle: String, station: Address },
    #[error("malformed message: {0}")]
    Malformed(#[from] Malformed),
    /// Every station that could serve the request has been tried.
    #[error("no station can provide {vehicle}")]
    NoStationsAvailable { vehicle: String },
    #[error("vehicle {0} is not in the catalogue")]
    UnknownVehicle(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("gave up on {peer} after {attempts} attempts")]
    RetriesExhausted { peer: Address, attempts: u32 },
}

impl RentalError {
    /// Whether the session may carry on (retry or redirect) after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RentalError::Timeout { .. }
                | RentalError::Unavailable { .. }
                | RentalError::Malformed(_)
                | RentalError::Transport(_)
        )
    }
}
