//! # rental-hub
//!
//! Tokio actors for a vehicle-rental marketplace. Three kinds of roles talk
//! only through asynchronous, timeout-bounded messages:
//!
//! - a [`Registry`] tracking which stations exist and broadcasting the
//!   membership whenever it changes,
//! - [`Station`]s owning a vehicle inventory, serving reservations and running
//!   a background charging cycle,
//! - [`Renter`]s driving one rental session from reservation to return.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rental_hub::{
//!     Registry, RegistryConfig, Renter, RenterConfig, Station, StationConfig, Switchboard,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let board = Switchboard::new();
//!
//! let registry = RegistryConfig::default();
//! let (_registry, _) = Registry::spawn(&registry, board.open(registry.address.clone()), board.clone());
//!
//! let station = StationConfig::new("station1@rec.foi.hr");
//! let (_station, _) = Station::spawn(station.clone(), board.open(station.address.clone()), board.clone())?;
//!
//! let renter = RenterConfig::new("station1@rec.foi.hr", "mercedes", 2);
//! let (_handle, task) = Renter::spawn(renter.clone(), board.open(renter.address.clone()), board.clone())?;
//! let session = task.await?;
//! assert!(session.is_success());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod registry;
pub mod renter;
pub mod station;
pub mod vehicle;

#[doc(inline)]
pub use rental_hub_core::*;

pub use crate::config::{ConfigError, MarketConfig, RegistryConfig, RenterConfig, StationConfig};
pub use crate::registry::{Membership, Registry, RegistryHandle, RegistryTask};
pub use crate::renter::{Outcome, RentalSession, Renter, RenterHandle, RenterState, RenterTask};
pub use crate::station::{Station, StationError, StationHandle, StationSnapshot, StationTask};
pub use crate::vehicle::{Category, Status, Vehicle, VehicleSpec};
