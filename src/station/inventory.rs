//! Vehicle stock and earnings of a single station.
//!
//! `Inventory` is plain data: the station serializes access to it, so every
//! method here is one atomic step of the protocol.

use std::collections::HashSet;
use std::time::Duration;

use tokio::time::Instant;

use crate::vehicle::{FULL_CHARGE, Status, Vehicle, VehicleSpec};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("vehicle {0} is listed more than once")]
    DuplicateVehicle(String),
    #[error("vehicle {0} is not stocked here")]
    NotStocked(String),
}

/// Why a reservation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    Reserved,
    Charging,
    NotStocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Confirmed,
    Unavailable(Refusal),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    vehicles: Vec<Vehicle>,
    earnings: u64,
}

impl Inventory {
    pub fn new(fleet: impl IntoIterator<Item = VehicleSpec>) -> Result<Self, InventoryError> {
        let mut names = HashSet::new();
        let mut vehicles = Vec::new();
        for spec in fleet {
            if !names.insert(spec.name.clone()) {
                return Err(InventoryError::DuplicateVehicle(spec.name));
            }
            vehicles.push(Vehicle::new(spec));
        }
        Ok(Self {
            vehicles,
            earnings: 0,
        })
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn vehicle(&self, name: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.name() == name)
    }

    pub fn earnings(&self) -> u64 {
        self.earnings
    }

    fn vehicle_mut(&mut self, name: &str) -> Result<&mut Vehicle, InventoryError> {
        self.vehicles
            .iter_mut()
            .find(|v| v.name() == name)
            .ok_or_else(|| InventoryError::NotStocked(name.to_owned()))
    }

    /// Reserves `name` if it is available.
    pub fn reserve(&mut self, name: &str, now: Instant) -> Reservation {
        let Ok(vehicle) = self.vehicle_mut(name) else {
            return Reservation::Unavailable(Refusal::NotStocked);
        };
        match vehicle.status {
            Status::Available => {
                vehicle.status = Status::Reserved;
                vehicle.reserved_at = Some(now);
                Reservation::Confirmed
            }
            Status::Reserved => Reservation::Unavailable(Refusal::Reserved),
            Status::Charging => Reservation::Unavailable(Refusal::Charging),
        }
    }

    /// Takes payment for `days` of rent and returns the new cumulative
    /// earnings. The vehicle keeps its status; its reservation no longer
    /// expires.
    pub fn collect(&mut self, name: &str, days: u32) -> Result<u64, InventoryError> {
        let vehicle = self.vehicle_mut(name)?;
        vehicle.reserved_at = None;
        let fee = u64::from(days).saturating_mul(vehicle.spec.price_per_day);
        self.earnings = self.earnings.saturating_add(fee);
        Ok(self.earnings)
    }

    /// Takes a vehicle back with `charge_left` percent of battery and queues it
    /// for charging. Returns the recorded charge level.
    pub fn return_vehicle(&mut self, name: &str, charge_left: f64) -> Result<u8, InventoryError> {
        let vehicle = self.vehicle_mut(name)?;
        let level = charge_left.round().clamp(0.0, f64::from(FULL_CHARGE)) as u8;
        vehicle.charge_level = level;
        vehicle.status = Status::Charging;
        vehicle.reserved_at = None;
        Ok(level)
    }

    /// Whether a charging cycle has anything to do.
    pub fn needs_charging(&self) -> bool {
        self.vehicles.iter().any(Vehicle::needs_charging)
    }

    /// Charges every eligible vehicle to full at once and makes it available.
    /// Returns the names of the vehicles that were charged.
    pub fn charge_all(&mut self) -> Vec<String> {
        self.vehicles
            .iter_mut()
            .filter(|v| v.needs_charging())
            .map(|v| {
                v.charge_level = FULL_CHARGE;
                v.status = Status::Available;
                v.spec.name.clone()
            })
            .collect()
    }

    /// Releases reservations that were not collected within `ttl`.
    pub fn expire_reservations(&mut self, now: Instant, ttl: Duration) -> Vec<String> {
        self.vehicles
            .iter_mut()
            .filter(|v| {
                v.status == Status::Reserved
                    && v.reserved_at.is_some_and(|at| now.saturating_duration_since(at) >= ttl)
            })
            .map(|v| {
                v.status = Status::Available;
                v.reserved_at = None;
                v.spec.name.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::{Category, standard_fleet};

    fn inventory() -> Inventory {
        Inventory::new(standard_fleet()).unwrap()
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut fleet = standard_fleet();
        fleet.push(VehicleSpec::new("trek", Category::Bike, 1, 1, 1));
        assert_eq!(
            Inventory::new(fleet),
            Err(InventoryError::DuplicateVehicle("trek".into()))
        );
    }

    #[test]
    fn reserves_only_available_vehicles() {
        let mut inventory = inventory();
        let now = Instant::now();

        assert_eq!(inventory.reserve("mazda", now), Reservation::Confirmed);
        assert_eq!(inventory.vehicle("mazda").unwrap().status, Status::Reserved);
        assert_eq!(
            inventory.reserve("mazda", now),
            Reservation::Unavailable(Refusal::Reserved)
        );
        assert_eq!(
            inventory.reserve("tesla", now),
            Reservation::Unavailable(Refusal::NotStocked)
        );

        inventory.return_vehicle("trek", 80.0).unwrap();
        assert_eq!(
            inventory.reserve("trek", now),
            Reservation::Unavailable(Refusal::Charging)
        );
    }

    #[test]
    fn collection_accumulates_earnings() {
        let mut inventory = inventory();
        assert_eq!(inventory.collect("mazda", 2), Ok(24));
        assert_eq!(inventory.collect("mazda", 1), Ok(36));
        assert_eq!(inventory.collect("mazda", 0), Ok(36));
        assert_eq!(inventory.earnings(), 36);
        assert_eq!(inventory.vehicle("mazda").unwrap().status, Status::Available);
        assert!(inventory.collect("tesla", 1).is_err());
    }

    #[test]
    fn return_rounds_and_clears_reservation() {
        let mut inventory = inventory();
        inventory.reserve("trek", Instant::now());

        assert_eq!(inventory.return_vehicle("trek", 57.4), Ok(57));
        let trek = inventory.vehicle("trek").unwrap();
        assert_eq!(trek.charge_level, 57);
        assert_eq!(trek.status, Status::Charging);
        assert_eq!(trek.reserved_at, None);

        assert_eq!(inventory.return_vehicle("ktm", 140.0), Ok(100));
        assert_eq!(inventory.return_vehicle("greyp", -3.0), Ok(0));
    }

    #[test]
    fn charging_converges_to_full() {
        let mut inventory = inventory();
        assert!(!inventory.needs_charging());
        assert!(inventory.charge_all().is_empty());

        inventory.return_vehicle("nissan", 40.0).unwrap();
        inventory.reserve("mazda", Instant::now());
        assert!(inventory.needs_charging());

        assert_eq!(inventory.charge_all(), vec!["nissan".to_string()]);
        assert!(inventory.vehicles().iter().all(|v| v.charge_level == FULL_CHARGE));
        assert!(inventory.vehicles().iter().all(|v| v.status != Status::Charging));
        assert_eq!(inventory.vehicle("mazda").unwrap().status, Status::Reserved);
        assert!(!inventory.needs_charging());
    }

    #[test]
    fn expires_only_stale_uncollected_reservations() {
        let mut inventory = inventory();
        let start = Instant::now();
        let ttl = Duration::from_secs(30);

        inventory.reserve("mazda", start);
        inventory.reserve("ktm", start);
        inventory.collect("ktm", 1).unwrap();
        inventory.reserve("trek", start + Duration::from_secs(20));

        let expired = inventory.expire_reservations(start + ttl, ttl);
        assert_eq!(expired, vec!["mazda".to_string()]);
        assert!(inventory.vehicle("mazda").unwrap().is_available());
        assert_eq!(inventory.vehicle("ktm").unwrap().status, Status::Reserved);
        assert_eq!(inventory.vehicle("trek").unwrap().status, Status::Reserved);
    }
}
