use rental_hub_core::{Address, RentalError};

use super::RenterState;
use crate::vehicle::VehicleSpec;

/// Time units granted per rented day.
pub const UNITS_PER_DAY: f64 = 100.0;

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The vehicle was handed back and acknowledged.
    Returned,
    /// The session was abandoned.
    Terminated(RentalError),
}

/// Renter-side record of one rental, from reservation to return.
#[derive(Debug, Clone, PartialEq)]
pub struct RentalSession {
    /// Station the next request goes to.
    pub target_station: Address,
    pub vehicle: String,
    pub total_days: u32,
    /// Rental time left, in time units. Can go negative on the last drive.
    pub remaining_time: f64,
    /// Battery percentage the renter will report on return.
    pub battery: f64,
    pub state: RenterState,
    /// Every state entered, in order, starting with `Reserve`.
    pub history: Vec<RenterState>,
    /// Stations a reservation was attempted at.
    pub visited: Vec<Address>,
    pub redirects: u32,
    /// Cumulative earnings the station reported on collection.
    pub station_earnings: Option<u64>,
    /// Charge percentage sent with the return.
    pub returned_charge: Option<f64>,
    pub outcome: Option<Outcome>,
}

impl RentalSession {
    pub fn new(station: Address, vehicle: &str, days: u32) -> Self {
        Self {
            target_station: station,
            vehicle: vehicle.to_owned(),
            total_days: days,
            remaining_time: f64::from(days) * UNITS_PER_DAY,
            battery: 100.0,
            state: RenterState::Reserve,
            history: vec![RenterState::Reserve],
            visited: Vec::new(),
            redirects: 0,
            station_earnings: None,
            returned_charge: None,
            outcome: None,
        }
    }

    pub(crate) fn enter(&mut self, state: RenterState) {
        self.state = state;
        self.history.push(state);
    }

    /// Drives a full charge down to empty. Returns the time units spent.
    pub fn drive(&mut self, spec: &VehicleSpec) -> f64 {
        let usage = spec.usage_time();
        self.remaining_time -= usage;
        self.battery = 0.0;
        usage
    }

    /// Charges back to full. Returns the time units spent.
    pub fn recharge(&mut self, spec: &VehicleSpec) -> f64 {
        let charge = spec.charge_time();
        self.remaining_time -= charge;
        self.battery = 100.0;
        charge
    }

    /// Whether the rental leaves time for another charge and full drive.
    pub fn can_charge_and_drive(&self, spec: &VehicleSpec) -> bool {
        self.remaining_time >= spec.usage_time() + spec.charge_time()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Some(Outcome::Returned)
    }
}
