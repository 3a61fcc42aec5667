//! Typed message bodies and their wire encoding.

use crate::address::Address;
use crate::ontology::{Kind, UnknownTag};

/// Decoded content of an envelope, one variant per [`Kind`].
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Station asks the registry to record the sender as a member.
    RegisterStation,
    /// Registry publishes the full, ordered membership.
    UpdateStationData(Vec<Address>),
    ReserveVehicle { vehicle: String },
    /// Reservation confirmed; `station` is where the renter must collect.
    VehicleReserved { station: Address },
    /// Renter pays `days` in advance and takes the vehicle.
    CollectVehicle { vehicle: String, days: u32 },
    /// Acknowledges a collection with the station's cumulative earnings.
    VehicleCollected { earnings: u64 },
    /// Renter hands the vehicle back with `charge_left` percent of battery.
    ReturnVehicle { vehicle: String, charge_left: f64 },
    VehicleReturned { vehicle: String },
    /// The vehicle is not available here; try `station` instead.
    OtherStation { station: Address },
    /// The vehicle is not available here and no alternative is known.
    NoOtherStations,
}

/// Reasons an envelope cannot be turned into a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Malformed {
    #[error(transparent)]
    UnknownTag(#[from] UnknownTag),
    #[error("{kind} body is missing the {field}")]
    MissingField { kind: Kind, field: &'static str },
    #[error("invalid rental days \"{0}\"")]
    InvalidDays(String),
    #[error("invalid charge level \"{0}\"")]
    InvalidCharge(String),
    #[error("invalid earnings \"{0}\"")]
    InvalidEarnings(String),
    #[error("unexpected {0} message")]
    UnexpectedKind(Kind),
}

impl Message {
    pub fn kind(&self) -> Kind {
        match self {
            Message::RegisterStation => Kind::RegisterStation,
            Message::UpdateStationData(_) => Kind::UpdateStationData,
            Message::ReserveVehicle { .. } => Kind::ReserveVehicle,
            Message::VehicleReserved { .. } => Kind::VehicleReserved,
            Message::CollectVehicle { .. } => Kind::CollectVehicle,
            Message::VehicleCollected { .. } => Kind::VehicleCollected,
            Message::ReturnVehicle { .. } => Kind::ReturnVehicle,
            Message::VehicleReturned { .. } => Kind::VehicleReturned,
            Message::OtherStation { .. } => Kind::OtherStation,
            Message::NoOtherStations => Kind::NoOtherStations,
        }
    }

    pub fn encode_body(&self) -> String {
        match self {
            Message::RegisterStation | Message::NoOtherStations => String::new(),
            Message::UpdateStationData(members) => members
                .iter()
                .map(Address::as_str)
                .collect::<Vec<_>>()
                .join(","),
            Message::ReserveVehicle { vehicle } | Message::VehicleReturned { vehicle } => {
                vehicle.clone()
            }
            Message::VehicleReserved { station } | Message::OtherStation { station } => {
                station.to_string()
            }
            Message::CollectVehicle { vehicle, days } => format!("{vehicle},{days}"),
            Message::VehicleCollected { earnings } => earnings.to_string(),
            Message::ReturnVehicle {
                vehicle,
                charge_left,
            } => format!("{vehicle},{charge_left}"),
        }
    }

    pub fn decode(kind: Kind, body: &str) -> Result<Self, Malformed> {
        let body = body.trim();
        let message = match kind {
            // The body of a registration carries nothing the registry needs.
            Kind::RegisterStation => Message::RegisterStation,
            Kind::NoOtherStations => Message::NoOtherStations,
            Kind::UpdateStationData => Message::UpdateStationData(
                body.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(Address::new)
                    .collect(),
            ),
            Kind::ReserveVehicle => Message::ReserveVehicle {
                vehicle: required(kind, body, "vehicle name")?.to_owned(),
            },
            Kind::VehicleReturned => Message::VehicleReturned {
                vehicle: required(kind, body, "vehicle name")?.to_owned(),
            },
            Kind::VehicleReserved => Message::VehicleReserved {
                station: Address::new(required(kind, body, "station address")?),
            },
            Kind::OtherStation => Message::OtherStation {
                station: Address::new(required(kind, body, "station address")?),
            },
            Kind::CollectVehicle => {
                let (vehicle, days) = pair(kind, body, "rental days")?;
                let days = days
                    .parse::<u32>()
                    .map_err(|_| Malformed::InvalidDays(days.to_owned()))?;
                Message::CollectVehicle {
                    vehicle: vehicle.to_owned(),
                    days,
                }
            }
            Kind::VehicleCollected => {
                let raw = required(kind, body, "earnings")?;
                let earnings = raw
                    .parse::<u64>()
                    .map_err(|_| Malformed::InvalidEarnings(raw.to_owned()))?;
                Message::VehicleCollected { earnings }
            }
            Kind::ReturnVehicle => {
                let (vehicle, charge) = pair(kind, body, "charge level")?;
                let charge_left = charge
                    .parse::<f64>()
                    .ok()
                    .filter(|c| c.is_finite())
                    .ok_or_else(|| Malformed::InvalidCharge(charge.to_owned()))?;
                Message::ReturnVehicle {
                    vehicle: vehicle.to_owned(),
                    charge_left,
                }
            }
        };
        Ok(message)
    }
}

fn required<'a>(kind: Kind, body: &'a str, field: &'static str) -> Result<&'a str, Malformed> {
    if body.is_empty() {
        Err(Malformed::MissingField { kind, field })
    } else {
        Ok(body)
    }
}

/// Splits `"<vehicleName>,<value>"`.
fn pair<'a>(kind: Kind, body: &'a str, field: &'static str) -> Result<(&'a str, &'a str), Malformed> {
    let (vehicle, value) = body.split_once(',').ok_or(Malformed::MissingField { kind, field })?;
    let vehicle = required(kind, vehicle.trim(), "vehicle name")?;
    let value = required(kind, value.trim(), field)?;
    Ok((vehicle, value))
}
