//! Station registry: the single source of truth for which stations exist.
//!
//! Every registration is followed by a broadcast of the full, ordered
//! membership to every member.

use std::convert::Infallible;

use rental_hub_core::{
    ActorTask, Address, Envelope, Mailbox, Message, ShutdownMode, ShutdownSignal,
    ShutdownTrigger, Template, Transport, shutdown_channel,
};
use tokio::sync::watch;

use crate::config::RegistryConfig;

/// Ordered station membership.
///
/// Registration is idempotent: a station that registers again keeps its
/// original position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    members: Vec<Address>,
}

impl Membership {
    /// Adds `station` unless it is already a member. Returns whether it was
    /// added.
    pub fn register(&mut self, station: Address) -> bool {
        if self.members.contains(&station) {
            return false;
        }
        self.members.push(station);
        true
    }

    pub fn members(&self) -> &[Address] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// A handle to a running registry.
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    address: Address,
    members_rx: watch::Receiver<Vec<Address>>,
    shutdown: ShutdownTrigger,
}

impl RegistryHandle {
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn members(&self) -> Vec<Address> {
        self.members_rx.borrow().clone()
    }

    /// Waits until at least `count` stations are registered.
    pub async fn wait_for_members(
        &self,
        count: usize,
    ) -> Result<Vec<Address>, watch::error::RecvError> {
        let mut rx = self.members_rx.clone();
        let members = rx.wait_for(|members| members.len() >= count).await?;
        Ok(members.clone())
    }

    pub fn shutdown_graceful(&self) {
        self.shutdown.graceful();
    }

    pub fn shutdown_immediate(&self) {
        self.shutdown.immediate();
    }
}

/// Resolves to the final membership.
pub type RegistryTask = ActorTask<Vec<Address>, Infallible>;

pub struct Registry<T> {
    address: Address,
    membership: Membership,
    transport: T,
    members_tx: watch::Sender<Vec<Address>>,
}

impl<T: Transport> Registry<T> {
    /// Spawns the registry on `mailbox`.
    pub fn spawn(
        config: &RegistryConfig,
        mailbox: Mailbox,
        transport: T,
    ) -> (RegistryHandle, RegistryTask) {
        if mailbox.address() != &config.address {
            tracing::warn!(
                configured = %config.address,
                mailbox = %mailbox.address(),
                "registry mailbox differs from the configured address"
            );
        }
        let address = mailbox.address().clone();
        let (members_tx, members_rx) = watch::channel(Vec::new());
        let (shutdown, signal) = shutdown_channel();

        let registry = Registry {
            address: address.clone(),
            membership: Membership::default(),
            transport,
            members_tx,
        };
        let task = ActorTask::spawn(registry.run(mailbox, signal));

        (
            RegistryHandle {
                address,
                members_rx,
                shutdown,
            },
            task,
        )
    }

    async fn run(
        mut self,
        mut mailbox: Mailbox,
        mut shutdown: ShutdownSignal,
    ) -> Result<Vec<Address>, Infallible> {
        tracing::info!(registry = %self.address, "registry started");

        loop {
            tokio::select! {
                biased;
                mode = shutdown.requested() => {
                    if mode == ShutdownMode::Graceful {
                        while let Some(envelope) = mailbox.try_recv() {
                            self.handle(envelope);
                        }
                    }
                    break;
                }
                envelope = mailbox.recv() => {
                    let Some(envelope) = envelope else { break };
                    self.handle(envelope);
                }
            }
        }

        tracing::info!(registry = %self.address, members = self.membership.len(), "registry stopped");
        Ok(self.membership.members().to_vec())
    }

    fn handle(&mut self, envelope: Envelope) {
        if !Template::inform().matches(&envelope) {
            tracing::debug!(registry = %self.address, from = %envelope.sender, "ignoring envelope");
            return;
        }

        match envelope.message() {
            Ok(Message::RegisterStation) => {
                let added = self.membership.register(envelope.sender.clone());
                tracing::info!(
                    registry = %self.address,
                    station = %envelope.sender,
                    added,
                    members = self.membership.len(),
                    "station registered"
                );
                self.members_tx.send_replace(self.membership.members().to_vec());
                self.broadcast();
            }
            Ok(other) => {
                tracing::warn!(
                    registry = %self.address,
                    from = %envelope.sender,
                    kind = %other.kind(),
                    "unexpected message"
                );
            }
            Err(error) => {
                tracing::warn!(registry = %self.address, from = %envelope.sender, %error, "dropping malformed message");
            }
        }
    }

    /// Sends the membership to every member. A failed delivery does not stop
    /// the others.
    fn broadcast(&self) {
        let update = Message::UpdateStationData(self.membership.members().to_vec());
        let mut delivered = 0;
        for member in self.membership.members() {
            let envelope = Envelope::inform(self.address.clone(), member.clone(), &update);
            match self.transport.send(envelope) {
                Ok(()) => delivered += 1,
                Err(error) => {
                    tracing::warn!(registry = %self.address, %member, %error, "membership update not delivered");
                }
            }
        }
        tracing::debug!(registry = %self.address, delivered, "membership broadcast");
    }
}
