use serde::{Deserialize, Serialize};

use crate::error::TaggerError;

/// Deployment region of the scan platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "SNYK-US-01")]
    Us01,
    #[serde(rename = "SNYK-US-02")]
    Us02,
    #[serde(rename = "SNYK-EU-01")]
    Eu01,
    #[serde(rename = "SNYK-AU-01")]
    Au01,
}

impl Default for Region {
    fn default() -> Self {
        Region::Us01
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Region::Us01 => write!(f, "SNYK-US-01"),
            Region::Us02 => write!(f, "SNYK-US-02"),
            Region::Eu01 => write!(f, "SNYK-EU-01"),
            Region::Au01 => write!(f, "SNYK-AU-01"),
        }
    }
}

impl std::str::FromStr for Region {
    type Err = TaggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SNYK-US-01" => Ok(Region::Us01),
            "SNYK-US-02" => Ok(Region::Us02),
            "SNYK-EU-01" => Ok(Region::Eu01),
            "SNYK-AU-01" => Ok(Region::Au01),
            _ => Err(TaggerError::UnknownRegion {
                region: s.to_string(),
            }),
        }
    }
}

impl Region {
    /// Base API URL for this region.
    pub fn base_url(&self) -> &'static str {
        match self {
            Region::Us01 => "https://api.snyk.io",
            Region::Us02 => "https://api.us.snyk.io",
            Region::Eu01 => "https://api.eu.snyk.io",
            Region::Au01 => "https://api.au.snyk.io",
        }
    }

    pub fn all() -> [Region; 4] {
        [Region::Us01, Region::Us02, Region::Eu01, Region::Au01]
    }
}
