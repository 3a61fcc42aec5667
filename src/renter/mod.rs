//! Renter: drives one rental session through its lifecycle.
//!
//! ```text
//! Reserve --vehicleReserved--> Collect --vehicleCollected--> Use
//! Reserve --otherStation--> Reserve (new target)
//! Reserve --noOtherStations--> Terminated
//! Use --time for charge and drive--> Charge --> Use
//! Use --otherwise--> Return --vehicleReturned--> Returned
//! ```
//!
//! Every request waits a bounded time for its reply and is re-sent, on the
//! same thread, a bounded number of times before the session terminates.

mod session;

use std::convert::Infallible;

use rental_hub_core::{
    ActorTask, Address, Envelope, Kind, Mailbox, Malformed, Message, RentalError, Template,
    Transition, Transport,
};
use tokio::sync::watch;
use tokio::time::Instant;

pub use self::session::{Outcome, RentalSession, UNITS_PER_DAY};

use crate::config::{ConfigError, RenterConfig};
use crate::vehicle::{VehicleSpec, find_spec};

/// States of the rental lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenterState {
    Reserve,
    Collect,
    Use,
    Charge,
    Return,
    /// The vehicle was returned; the session succeeded.
    Returned,
    /// The session was abandoned.
    Terminated,
}

impl RenterState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenterState::Returned | RenterState::Terminated)
    }
}

/// A handle to a running renter for state observation.
#[derive(Debug, Clone)]
pub struct RenterHandle {
    state_rx: watch::Receiver<RenterState>,
}

impl RenterHandle {
    /// Returns the current state of the session.
    pub fn current_state(&self) -> RenterState {
        *self.state_rx.borrow()
    }

    /// Waits for the session to reach the specified state.
    pub async fn wait_for_state(
        &self,
        target: RenterState,
    ) -> Result<(), watch::error::RecvError> {
        let mut rx = self.state_rx.clone();
        while *rx.borrow_and_update() != target {
            rx.changed().await?;
        }
        Ok(())
    }
}

/// Resolves to the finished session.
pub type RenterTask = ActorTask<RentalSession, Infallible>;

pub struct Renter<T> {
    address: Address,
    config: RenterConfig,
    session: RentalSession,
    mailbox: Mailbox,
    transport: T,
    state_tx: watch::Sender<RenterState>,
    next_thread: u64,
}

impl<T: Transport> Renter<T> {
    /// Spawns a renter on `mailbox` and starts the session right away.
    ///
    /// Conversation threads start at a random base, so a later session under
    /// the same address never reuses a thread of an earlier one.
    pub fn spawn(
        config: RenterConfig,
        mailbox: Mailbox,
        transport: T,
    ) -> Result<(RenterHandle, RenterTask), ConfigError> {
        config.validate()?;
        let session = RentalSession::new(config.station.clone(), &config.vehicle, config.days);
        let (state_tx, state_rx) = watch::channel(RenterState::Reserve);

        let renter = Renter {
            address: mailbox.address().clone(),
            config,
            session,
            mailbox,
            transport,
            state_tx,
            next_thread: rand::random(),
        };
        let task = ActorTask::spawn(renter.run());

        Ok((RenterHandle { state_rx }, task))
    }

    async fn run(mut self) -> Result<RentalSession, Infallible> {
        tracing::info!(
            renter = %self.address,
            station = %self.session.target_station,
            vehicle = %self.session.vehicle,
            days = self.session.total_days,
            "rental started"
        );

        let spec = match self.vehicle_spec() {
            Ok(spec) => spec,
            Err(error) => {
                let transition = self.terminate(error);
                self.enter(transition.into_state());
                return Ok(self.session);
            }
        };

        while !self.session.state.is_terminal() {
            let transition = match self.session.state {
                RenterState::Reserve => self.reserve().await,
                RenterState::Collect => self.collect().await,
                RenterState::Use => self.use_vehicle(&spec).await,
                RenterState::Charge => self.charge(&spec).await,
                RenterState::Return => self.return_vehicle().await,
                RenterState::Returned | RenterState::Terminated => break,
            };
            self.enter(transition.into_state());
        }

        tracing::info!(
            renter = %self.address,
            state = ?self.session.state,
            outcome = ?self.session.outcome,
            "rental finished"
        );
        Ok(self.session)
    }

    fn vehicle_spec(&self) -> Result<VehicleSpec, RentalError> {
        find_spec(&self.config.catalogue, &self.session.vehicle)
            .cloned()
            .ok_or_else(|| RentalError::UnknownVehicle(self.session.vehicle.clone()))
    }

    fn enter(&mut self, state: RenterState) {
        tracing::debug!(renter = %self.address, from = ?self.session.state, to = ?state, "transition");
        self.session.enter(state);
        self.state_tx.send_replace(state);
    }

    fn terminate(&mut self, error: RentalError) -> Transition<RenterState> {
        tracing::warn!(renter = %self.address, %error, "terminating rental");
        self.session.outcome = Some(Outcome::Terminated(error));
        Transition::to(RenterState::Terminated)
    }

    async fn reserve(&mut self) -> Transition<RenterState> {
        let station = self.session.target_station.clone();
        if !self.session.visited.contains(&station) {
            self.session.visited.push(station.clone());
        }

        let request = Message::ReserveVehicle {
            vehicle: self.session.vehicle.clone(),
        };
        let expected = [Kind::VehicleReserved, Kind::OtherStation, Kind::NoOtherStations];

        match self.request(&station, &request, &expected).await {
            Ok(Message::VehicleReserved { station: confirmed }) => {
                tracing::info!(
                    renter = %self.address,
                    vehicle = %self.session.vehicle,
                    station = %confirmed,
                    "vehicle reserved"
                );
                self.session.target_station = confirmed;
                Transition::to(RenterState::Collect)
            }
            Ok(Message::OtherStation { station: other }) => {
                if self.session.visited.contains(&other)
                    || self.session.redirects >= self.config.max_redirects
                {
                    return self.terminate(RentalError::NoStationsAvailable {
                        vehicle: self.session.vehicle.clone(),
                    });
                }
                tracing::info!(renter = %self.address, from = %station, to = %other, "redirected");
                self.session.redirects += 1;
                self.session.target_station = other;
                Transition::to(RenterState::Reserve)
            }
            Ok(Message::NoOtherStations) => self.terminate(RentalError::NoStationsAvailable {
                vehicle: self.session.vehicle.clone(),
            }),
            Ok(other) => self.terminate(Malformed::UnexpectedKind(other.kind()).into()),
            Err(error) => self.terminate(error),
        }
    }

    async fn collect(&mut self) -> Transition<RenterState> {
        let station = self.session.target_station.clone();
        let request = Message::CollectVehicle {
            vehicle: self.session.vehicle.clone(),
            days: self.session.total_days,
        };

        match self.request(&station, &request, &[Kind::VehicleCollected]).await {
            Ok(Message::VehicleCollected { earnings }) => {
                tracing::info!(renter = %self.address, %station, earnings, "vehicle collected and paid");
                self.session.station_earnings = Some(earnings);
                Transition::to(RenterState::Use)
            }
            Ok(other) => self.terminate(Malformed::UnexpectedKind(other.kind()).into()),
            Err(error) => self.terminate(error),
        }
    }

    async fn use_vehicle(&mut self, spec: &VehicleSpec) -> Transition<RenterState> {
        let spent = self.session.drive(spec);
        self.pass_time(spent).await;
        tracing::info!(
            renter = %self.address,
            remaining = self.session.remaining_time,
            "vehicle fully discharged"
        );

        if self.session.can_charge_and_drive(spec) {
            Transition::to(RenterState::Charge)
        } else {
            Transition::to(RenterState::Return)
        }
    }

    async fn charge(&mut self, spec: &VehicleSpec) -> Transition<RenterState> {
        let spent = self.session.recharge(spec);
        self.pass_time(spent).await;
        tracing::info!(
            renter = %self.address,
            remaining = self.session.remaining_time,
            "vehicle charged to full"
        );
        Transition::to(RenterState::Use)
    }

    async fn return_vehicle(&mut self) -> Transition<RenterState> {
        let station = self.session.target_station.clone();
        let charge_left = self.session.battery;
        let request = Message::ReturnVehicle {
            vehicle: self.session.vehicle.clone(),
            charge_left,
        };

        match self.request(&station, &request, &[Kind::VehicleReturned]).await {
            Ok(Message::VehicleReturned { vehicle }) => {
                tracing::info!(renter = %self.address, %station, %vehicle, charge_left, "vehicle returned");
                self.session.returned_charge = Some(charge_left);
                self.session.outcome = Some(Outcome::Returned);
                Transition::to(RenterState::Returned)
            }
            Ok(other) => self.terminate(Malformed::UnexpectedKind(other.kind()).into()),
            Err(error) => self.terminate(error),
        }
    }

    /// Lets `units` of simulated time pass.
    async fn pass_time(&self, units: f64) {
        if units <= 0.0 || self.config.time_unit.is_zero() {
            return;
        }
        tokio::time::sleep(self.config.time_unit.mul_f64(units)).await;
    }

    /// Sends `message` to `to` and waits for a reply of one of the `expected`
    /// kinds, re-sending on the same thread after every timeout.
    async fn request(
        &mut self,
        to: &Address,
        message: &Message,
        expected: &[Kind],
    ) -> Result<Message, RentalError> {
        self.next_thread = self.next_thread.wrapping_add(1);
        let thread = self.next_thread;
        let envelope = Envelope::inform(self.address.clone(), to.clone(), message).with_thread(thread);

        for attempt in 1..=self.config.max_attempts {
            tracing::debug!(renter = %self.address, %to, kind = %envelope.kind, thread, attempt, "sending request");
            match self.transport.send(envelope.clone()) {
                Ok(()) => {
                    if let Some(reply) = self.await_reply(thread, expected).await {
                        return Ok(reply);
                    }
                    let error = RentalError::Timeout { peer: to.clone() };
                    tracing::warn!(renter = %self.address, attempt, %error, "request timed out");
                }
                Err(error) => {
                    tracing::warn!(renter = %self.address, attempt, %error, "request not delivered");
                    // Back off as long as a reply would have taken.
                    tokio::time::sleep(self.config.reply_timeout).await;
                }
            }
        }

        Err(RentalError::RetriesExhausted {
            peer: to.clone(),
            attempts: self.config.max_attempts,
        })
    }

    /// Waits up to the reply timeout for an expected reply on `thread`. Other
    /// envelopes are dropped without extending the deadline.
    async fn await_reply(&mut self, thread: u64, expected: &[Kind]) -> Option<Message> {
        let deadline = Instant::now() + self.config.reply_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let envelope = self.mailbox.receive(remaining).await?;

            if !Template::inform().matches(&envelope) || envelope.thread != Some(thread) {
                tracing::debug!(
                    renter = %self.address,
                    from = %envelope.sender,
                    kind = %envelope.kind,
                    thread = ?envelope.thread,
                    "dropping stray envelope"
                );
                continue;
            }

            match envelope.message() {
                Ok(message) if expected.contains(&message.kind()) => return Some(message),
                Ok(message) => {
                    tracing::warn!(renter = %self.address, kind = %message.kind(), "dropping unexpected reply");
                }
                Err(error) => {
                    tracing::warn!(renter = %self.address, from = %envelope.sender, %error, "dropping malformed reply");
                }
            }
        }
    }
}
