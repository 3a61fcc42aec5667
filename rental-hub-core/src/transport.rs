//! The transport seam between roles.
//!
//! Roles never share memory: each one owns a [`Mailbox`] and reaches the others
//! only through a [`Transport`]. [`Switchboard`] is the in-process transport
//! used by the demo and the tests; a network transport implements the same
//! trait and delivers into the same mailboxes.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::address::Address;
use crate::envelope::Envelope;
use crate::error::TransportError;

/// Fire-and-forget delivery of envelopes to their recipient's mailbox.
///
/// `send` never waits: a full or missing mailbox is reported immediately and
/// the caller decides whether the loss matters.
pub trait Transport: Clone + Send + Sync + 'static {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError>;
}

/// Inbox of a single agent.
#[derive(Debug)]
pub struct Mailbox {
    address: Address,
    rx: mpsc::Receiver<Envelope>,
}

impl Mailbox {
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Waits for the next envelope. `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.rx.recv().await
    }

    /// Waits at most `timeout` for the next envelope.
    pub async fn receive(&mut self, timeout: Duration) -> Option<Envelope> {
        tokio::time::timeout(timeout, self.rx.recv()).await.ok().flatten()
    }

    /// Takes an envelope that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<Envelope> {
        self.rx.try_recv().ok()
    }
}

/// In-memory transport routing envelopes by recipient address.
#[derive(Debug, Clone)]
pub struct Switchboard {
    routes: Arc<RwLock<HashMap<Address, mpsc::Sender<Envelope>>>>,
    capacity: usize,
}

impl Default for Switchboard {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}

impl Switchboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a switchboard whose mailboxes hold at most `capacity` envelopes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Opens the mailbox of `address`, replacing any previous one.
    pub fn open(&self, address: impl Into<Address>) -> Mailbox {
        let address = address.into();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone(), tx);
        tracing::debug!(%address, "mailbox opened");
        Mailbox { address, rx }
    }

    /// Stops routing to `address`. Envelopes already queued stay in the mailbox.
    pub fn close(&self, address: &Address) {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address);
    }

    pub fn is_open(&self, address: &Address) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .is_some_and(|tx| !tx.is_closed())
    }
}

impl Transport for Switchboard {
    fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        let tx = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&envelope.to)
            .cloned()
            .ok_or_else(|| TransportError::UnknownRecipient(envelope.to.clone()))?;

        let to = envelope.to.clone();
        tracing::trace!(from = %envelope.sender, %to, kind = %envelope.kind, "routing envelope");
        tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Full(to),
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed(to),
        })
    }
}
