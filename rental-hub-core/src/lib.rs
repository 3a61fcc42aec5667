//! Core runtime types for rental-hub.
//!
//! Everything the registry, stations and renters share lives here: the
//! message envelope and its ontology, the typed protocol codec, the transport
//! seam and the plumbing used to run each role as a tokio task.

mod address;
mod envelope;
mod error;
mod ontology;
mod protocol;
mod task;
mod transport;

pub use address::Address;
pub use envelope::{Envelope, Template};
pub use error::{RentalError, TransportError};
pub use ontology::{Kind, Performative, UnknownTag};
pub use protocol::{Malformed, Message};
pub use task::{ActorTask, ShutdownSignal, ShutdownTrigger, shutdown_channel};
pub use transport::{Mailbox, Switchboard, Transport};

/// Represents a state transition of a role's state machine.
///
/// Returned by state handlers to name the state the machine moves to next.
#[derive(Debug)]
pub enum Transition<T> {
    /// Transition to a new state.
    To(T),
}

impl<T> Transition<T> {
    /// Create a simple transition to a new state.
    #[must_use]
    pub fn to(state: T) -> Self {
        Self::To(state)
    }

    /// Extract the target state.
    #[must_use]
    pub fn into_state(self) -> T {
        match self {
            Self::To(state) => state,
        }
    }
}

/// Shutdown mode for graceful or immediate termination of an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Graceful shutdown: drain envelopes already in the mailbox before
    /// terminating.
    Graceful,
    /// Immediate shutdown: terminate without touching the mailbox again.
    Immediate,
}

/// Error type returned by an actor task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError<E> {
    /// The actor terminated with a logical error.
    #[error("actor error: {0}")]
    Actor(E),
    /// The actor task panicked or was cancelled.
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}
