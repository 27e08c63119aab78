use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Retailers with a store-locator scraper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retailer {
    Verizon,
    Att,
    Target,
    Tmobile,
    Walmart,
    Bestbuy,
}

impl Retailer {
    pub const ALL: [Retailer; 6] = [
        Retailer::Verizon,
        Retailer::Att,
        Retailer::Target,
        Retailer::Tmobile,
        Retailer::Walmart,
        Retailer::Bestbuy,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Retailer::Verizon => "verizon",
            Retailer::Att => "att",
            Retailer::Target => "target",
            Retailer::Tmobile => "tmobile",
            Retailer::Walmart => "walmart",
            Retailer::Bestbuy => "bestbuy",
        }
    }

    /// Comma-separated list of every retailer name, for error messages.
    #[must_use]
    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|r| r.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Retailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Retailer {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownRetailer {
                name: s.to_string(),
                available: Self::available(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_round_trips_every_retailer() {
        for retailer in Retailer::ALL {
            assert_eq!(retailer.as_str().parse::<Retailer>().unwrap(), retailer);
        }
    }

    #[test]
    fn from_str_ignores_case_and_whitespace() {
        assert_eq!(" Walmart ".parse::<Retailer>().unwrap(), Retailer::Walmart);
    }

    #[test]
    fn unknown_retailer_lists_available_names() {
        let err = "costco".parse::<Retailer>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown retailer: costco"));
        assert!(msg.contains("verizon, att, target, tmobile, walmart, bestbuy"));
    }

    #[test]
    fn display_matches_registry_key() {
        assert_eq!(Retailer::Tmobile.to_string(), "tmobile");
    }
}
