//! Closed wire vocabularies: message kinds and performatives.

use std::fmt;
use std::str::FromStr;

use rental_hub_macros::Ontology;

/// Ontology tag discriminating what an envelope's body means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ontology)]
pub enum Kind {
    RegisterStation,
    UpdateStationData,
    ReserveVehicle,
    VehicleReserved,
    CollectVehicle,
    VehicleCollected,
    ReturnVehicle,
    VehicleReturned,
    OtherStation,
    NoOtherStations,
}

impl Kind {
    /// Whether this kind is a reply a renter waits for, as opposed to a request.
    pub const fn is_reply(&self) -> bool {
        matches!(
            self,
            Kind::VehicleReserved
                | Kind::VehicleCollected
                | Kind::VehicleReturned
                | Kind::OtherStation
                | Kind::NoOtherStations
        )
    }
}

/// Communicative act of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ontology)]
#[ontology(rename_all = "lowercase")]
pub enum Performative {
    Inform,
    Request,
    Refuse,
    Failure,
}

/// A wire tag that is not part of the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {vocabulary} tag \"{tag}\"")]
pub struct UnknownTag {
    pub vocabulary: &'static str,
    pub tag: String,
}

impl FromStr for Kind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::from_tag(s).ok_or_else(|| UnknownTag {
            vocabulary: "ontology",
            tag: s.to_owned(),
        })
    }
}

impl FromStr for Performative {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Performative::from_tag(s).ok_or_else(|| UnknownTag {
            vocabulary: "performative",
            tag: s.to_owned(),
        })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_use_wire_tags() {
        let tags: Vec<_> = Kind::ALL.iter().map(Kind::tag).collect();
        assert_eq!(
            tags,
            [
                "registerStation",
                "updateStationData",
                "reserveVehicle",
                "vehicleReserved",
                "collectVehicle",
                "vehicleCollected",
                "returnVehicle",
                "vehicleReturned",
                "otherStation",
                "noOtherStations",
            ]
        );
    }

    #[test]
    fn parses_known_tags_only() {
        assert_eq!("vehicleReturned".parse::<Kind>(), Ok(Kind::VehicleReturned));
        assert_eq!("inform".parse::<Performative>(), Ok(Performative::Inform));

        let err = "myOntology".parse::<Kind>().unwrap_err();
        assert_eq!(err.tag, "myOntology");
        assert!("Inform".parse::<Performative>().is_err());
    }

    #[test]
    fn classifies_replies() {
        assert!(Kind::VehicleReserved.is_reply());
        assert!(Kind::NoOtherStations.is_reply());
        assert!(!Kind::ReserveVehicle.is_reply());
        assert!(!Kind::UpdateStationData.is_reply());
    }
}
