//! Rental station: owns an inventory, serves reservation, collection and
//! return requests, and charges returned vehicles in the background.
//!
//! The message loop and the charging cycle run as separate tasks. Both reach
//! the inventory only through one mutex, so every check-and-set on a vehicle
//! is atomic with respect to the other task and to other requests.

mod charging;
mod inventory;
mod replies;

use std::convert::Infallible;
use std::sync::Arc;

use rental_hub_core::{
    ActorTask, Address, Envelope, Mailbox, Message, ShutdownMode, ShutdownSignal,
    ShutdownTrigger, Template, Transport, shutdown_channel,
};
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, MissedTickBehavior};

pub use self::inventory::{Inventory, InventoryError, Refusal, Reservation};

use self::charging::ChargingCycle;
use self::replies::ReplyCache;
use crate::config::{ConfigError, StationConfig};
use crate::vehicle::Vehicle;

#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
}

/// Point-in-time view of a station, published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSnapshot {
    pub address: Address,
    pub vehicles: Vec<Vehicle>,
    pub earnings: u64,
    pub known_stations: Vec<Address>,
}

impl StationSnapshot {
    pub fn vehicle(&self, name: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.name() == name)
    }
}

/// State shared by the message loop and the charging cycle.
#[derive(Debug)]
pub(crate) struct StationState {
    pub(crate) inventory: Inventory,
    pub(crate) known_stations: Vec<Address>,
}

impl StationState {
    fn snapshot(&self, address: &Address) -> StationSnapshot {
        StationSnapshot {
            address: address.clone(),
            vehicles: self.inventory.vehicles().to_vec(),
            earnings: self.inventory.earnings(),
            known_stations: self.known_stations.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Publisher {
    address: Address,
    tx: Arc<watch::Sender<StationSnapshot>>,
}

impl Publisher {
    pub(crate) fn publish(&self, state: &StationState) {
        self.tx.send_replace(state.snapshot(&self.address));
    }
}

/// A handle to a running station for observation and shutdown.
#[derive(Debug, Clone)]
pub struct StationHandle {
    address: Address,
    snapshot_rx: watch::Receiver<StationSnapshot>,
    shutdown: ShutdownTrigger,
}

impl StationHandle {
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the latest published snapshot.
    pub fn snapshot(&self) -> StationSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Waits until a published snapshot satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&StationSnapshot) -> bool,
    ) -> Result<StationSnapshot, watch::error::RecvError> {
        let mut rx = self.snapshot_rx.clone();
        let snapshot = rx.wait_for(|s| predicate(s)).await?;
        Ok(snapshot.clone())
    }

    /// Initiates a graceful shutdown. Queued requests are served first.
    pub fn shutdown_graceful(&self) {
        self.shutdown.graceful();
    }

    /// Initiates an immediate shutdown. Queued requests are dropped.
    pub fn shutdown_immediate(&self) {
        self.shutdown.immediate();
    }
}

/// Resolves to the station's final snapshot.
pub type StationTask = ActorTask<StationSnapshot, Infallible>;

pub struct Station<T> {
    address: Address,
    config: StationConfig,
    state: Arc<Mutex<StationState>>,
    publisher: Publisher,
    replies: ReplyCache,
    transport: T,
    registered: bool,
}

impl<T: Transport> Station<T> {
    /// Spawns a station answering on `mailbox`, whose address becomes the
    /// station's identity.
    pub fn spawn(
        config: StationConfig,
        mailbox: Mailbox,
        transport: T,
    ) -> Result<(StationHandle, StationTask), StationError> {
        config.validate()?;
        let address = mailbox.address().clone();
        let state = StationState {
            inventory: Inventory::new(config.fleet.iter().cloned())?,
            known_stations: Vec::new(),
        };

        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot(&address));
        let (shutdown, signal) = shutdown_channel();

        let station = Station {
            address: address.clone(),
            replies: ReplyCache::new(config.reply_cache),
            config,
            state: Arc::new(Mutex::new(state)),
            publisher: Publisher {
                address: address.clone(),
                tx: Arc::new(snapshot_tx),
            },
            transport,
            registered: false,
        };
        let task = ActorTask::spawn(station.run(mailbox, signal));

        Ok((
            StationHandle {
                address,
                snapshot_rx,
                shutdown,
            },
            task,
        ))
    }

    async fn run(
        mut self,
        mut mailbox: Mailbox,
        mut shutdown: ShutdownSignal,
    ) -> Result<StationSnapshot, Infallible> {
        tracing::info!(
            station = %self.address,
            vehicles = self.config.fleet.len(),
            "station started"
        );

        let charging = ChargingCycle {
            address: self.address.clone(),
            state: Arc::clone(&self.state),
            publisher: self.publisher.clone(),
            period: self.config.charge_period(),
            duration: self.config.charge_duration(),
            reservation_ttl: self.config.reservation_ttl,
        }
        .spawn(shutdown.clone());

        let mut register = tokio::time::interval(self.config.register_interval);
        register.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                mode = shutdown.requested() => {
                    if mode == ShutdownMode::Graceful {
                        while let Some(envelope) = mailbox.try_recv() {
                            self.handle(envelope).await;
                        }
                    }
                    break;
                }
                envelope = mailbox.recv() => {
                    let Some(envelope) = envelope else { break };
                    self.handle(envelope).await;
                }
                _ = register.tick(), if !self.registered => self.register(),
            }
        }

        charging.abort();
        tracing::info!(station = %self.address, "station stopped");
        let snapshot = self.state.lock().await.snapshot(&self.address);
        Ok(snapshot)
    }

    fn register(&self) {
        let registry = self.config.registry();
        tracing::debug!(station = %self.address, %registry, "registering");
        self.deliver(Envelope::inform(
            self.address.clone(),
            registry,
            &Message::RegisterStation,
        ));
    }

    fn deliver(&self, envelope: Envelope) {
        let to = envelope.to.clone();
        let kind = envelope.kind;
        if let Err(error) = self.transport.send(envelope) {
            tracing::warn!(station = %self.address, %to, %kind, %error, "reply not delivered");
        }
    }

    async fn handle(&mut self, envelope: Envelope) {
        if !Template::inform().matches(&envelope) {
            tracing::debug!(
                station = %self.address,
                from = %envelope.sender,
                performative = %envelope.performative,
                "ignoring envelope"
            );
            return;
        }

        let message = match envelope.message() {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(
                    station = %self.address,
                    from = %envelope.sender,
                    kind = %envelope.kind,
                    %error,
                    "dropping malformed message"
                );
                return;
            }
        };

        if let Some(cached) = self.replies.get(&envelope) {
            tracing::debug!(
                station = %self.address,
                from = %envelope.sender,
                thread = ?envelope.thread,
                "answering repeated request from cache"
            );
            self.deliver(cached.clone());
            return;
        }

        let shared = Arc::clone(&self.state);
        let reply = {
            let mut state = shared.lock().await;
            let reply = match message {
                Message::UpdateStationData(members) => {
                    self.registered = members.contains(&self.address);
                    tracing::info!(station = %self.address, members = members.len(), "membership updated");
                    state.known_stations = members;
                    None
                }
                Message::ReserveVehicle { vehicle } => Some(self.reserve(&mut state, &vehicle)),
                Message::CollectVehicle { vehicle, days } => {
                    self.collect(&mut state, &vehicle, days)
                }
                Message::ReturnVehicle {
                    vehicle,
                    charge_left,
                } => self.take_back(&mut state, &vehicle, charge_left),
                other => {
                    tracing::warn!(
                        station = %self.address,
                        from = %envelope.sender,
                        kind = %other.kind(),
                        "unexpected message"
                    );
                    None
                }
            };
            self.publisher.publish(&state);
            reply
        };

        if let Some(reply) = reply {
            let reply = envelope.reply(&reply);
            self.replies.insert(&envelope, reply.clone());
            self.deliver(reply);
        }
    }

    fn reserve(&self, state: &mut StationState, vehicle: &str) -> Message {
        match state.inventory.reserve(vehicle, Instant::now()) {
            Reservation::Confirmed => {
                tracing::info!(station = %self.address, vehicle, "vehicle reserved");
                Message::VehicleReserved {
                    station: self.address.clone(),
                }
            }
            Reservation::Unavailable(refusal) => {
                let alternative = next_station(&state.known_stations, &self.address);
                tracing::info!(
                    station = %self.address,
                    vehicle,
                    ?refusal,
                    redirect = ?alternative.as_ref().map(Address::as_str),
                    "vehicle unavailable"
                );
                match alternative {
                    Some(station) => Message::OtherStation { station },
                    None => Message::NoOtherStations,
                }
            }
        }
    }

    fn collect(&self, state: &mut StationState, vehicle: &str, days: u32) -> Option<Message> {
        match state.inventory.collect(vehicle, days) {
            Ok(earnings) => {
                tracing::info!(station = %self.address, vehicle, days, earnings, "vehicle collected");
                Some(Message::VehicleCollected { earnings })
            }
            Err(error) => {
                tracing::warn!(station = %self.address, %error, "collection refused");
                None
            }
        }
    }

    fn take_back(&self, state: &mut StationState, vehicle: &str, charge_left: f64) -> Option<Message> {
        match state.inventory.return_vehicle(vehicle, charge_left) {
            Ok(charge_level) => {
                tracing::info!(station = %self.address, vehicle, charge_level, "vehicle returned");
                Some(Message::VehicleReturned {
                    vehicle: vehicle.to_owned(),
                })
            }
            Err(error) => {
                tracing::warn!(station = %self.address, %error, "return refused");
                None
            }
        }
    }
}

/// The member following `me` in the membership ring, skipping `me`.
fn next_station(members: &[Address], me: &Address) -> Option<Address> {
    let start = members
        .iter()
        .position(|m| m == me)
        .map_or(0, |i| i + 1);
    members[start..]
        .iter()
        .chain(&members[..start])
        .find(|m| *m != me)
        .cloned()
}
