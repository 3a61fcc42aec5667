use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

/// Identifier of an agent on the transport, usually `localpart@domain`.
///
/// Cheap to clone; the underlying string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub struct Address(Arc<str>);

impl Address {
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(Arc::from(address.as_ref().trim()))
    }

    /// Joins a local part and a domain into `localpart@domain`.
    pub fn with_domain(localpart: &str, domain: &str) -> Self {
        Self::new(format!("{}@{}", localpart.trim(), domain.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn localpart(&self) -> &str {
        match self.0.split_once('@') {
            Some((local, _)) => local,
            None => &self.0,
        }
    }

    pub fn domain(&self) -> Option<&str> {
        self.0.split_once('@').map(|(_, domain)| domain)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_jid_parts() {
        let address = Address::with_domain("station1", "rec.foi.hr");
        assert_eq!(address.as_str(), "station1@rec.foi.hr");
        assert_eq!(address.localpart(), "station1");
        assert_eq!(address.domain(), Some("rec.foi.hr"));

        let bare = Address::new(" central ");
        assert_eq!(bare.localpart(), "central");
        assert_eq!(bare.domain(), None);
    }
}
