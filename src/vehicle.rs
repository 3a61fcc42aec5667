//! Vehicles, their static specs and the standard fleet.

use serde::Deserialize;
use tokio::time::Instant;

/// Charge level of a fully charged vehicle, in percent.
pub const FULL_CHARGE: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Car,
    Bike,
}

/// Static description of a vehicle model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VehicleSpec {
    pub name: String,
    pub category: Category,
    /// Distance covered on a full charge.
    pub max_range: u32,
    /// Charging effort; a tenth of it is the charge time in time units.
    pub charge_duration: u32,
    pub price_per_day: u64,
}

impl VehicleSpec {
    pub fn new(
        name: &str,
        category: Category,
        max_range: u32,
        charge_duration: u32,
        price_per_day: u64,
    ) -> Self {
        Self {
            name: name.to_owned(),
            category,
            max_range,
            charge_duration,
            price_per_day,
        }
    }

    /// Time units it takes to drive a full charge down to empty.
    pub fn usage_time(&self) -> f64 {
        f64::from(self.max_range) / 10.0
    }

    /// Time units it takes the renter to recharge on the road.
    pub fn charge_time(&self) -> f64 {
        f64::from(self.charge_duration) / 10.0
    }
}

/// Fleet every station starts with: three cars and three bikes.
pub fn standard_fleet() -> Vec<VehicleSpec> {
    vec![
        VehicleSpec::new("nissan", Category::Car, 300, 100, 15),
        VehicleSpec::new("mazda", Category::Car, 250, 50, 12),
        VehicleSpec::new("mercedes", Category::Car, 400, 150, 20),
        VehicleSpec::new("trek", Category::Bike, 100, 50, 5),
        VehicleSpec::new("greyp", Category::Bike, 150, 30, 7),
        VehicleSpec::new("ktm", Category::Bike, 200, 20, 10),
    ]
}

/// Looks a model up by name.
pub fn find_spec<'a>(catalogue: &'a [VehicleSpec], name: &str) -> Option<&'a VehicleSpec> {
    catalogue.iter().find(|spec| spec.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Available,
    /// Held for a renter; never charged while in this state.
    Reserved,
    /// Returned and waiting for the station's charging cycle.
    Charging,
}

/// A vehicle held by a station.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub spec: VehicleSpec,
    pub charge_level: u8,
    pub status: Status,
    /// Start of an uncollected reservation.
    pub reserved_at: Option<Instant>,
}

impl Vehicle {
    pub fn new(spec: VehicleSpec) -> Self {
        Self {
            spec,
            charge_level: FULL_CHARGE,
            status: Status::Available,
            reserved_at: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn is_available(&self) -> bool {
        self.status == Status::Available
    }

    /// Whether the next charging cycle will pick this vehicle up.
    pub fn needs_charging(&self) -> bool {
        self.status != Status::Reserved
            && (self.charge_level < FULL_CHARGE || self.status == Status::Charging)
    }
}
