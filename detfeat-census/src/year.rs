//! Census years and inclusion criteria.

use detfeat_core::{Grain, InputError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Decennial census years with prepared geographies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CensusYear {
    #[serde(rename = "2010")]
    Y2010,
    #[serde(rename = "2020")]
    Y2020,
}

impl CensusYear {
    pub fn as_u16(self) -> u16 {
        match self {
            CensusYear::Y2010 => 2010,
            CensusYear::Y2020 => 2020,
        }
    }
}

impl TryFrom<u16> for CensusYear {
    type Error = InputError;

    fn try_from(year: u16) -> Result<Self, InputError> {
        match year {
            2010 => Ok(CensusYear::Y2010),
            2020 => Ok(CensusYear::Y2020),
            other => Err(InputError::UnsupportedYear(other)),
        }
    }
}

impl fmt::Display for CensusYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Rule deciding whether a geography counts as inside the city.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InclusionCriteria {
    /// Geography touches the city boundary polygon.
    Intersects,
    /// Geography lies completely within the city boundary polygon.
    Within,
}

impl FromStr for InclusionCriteria {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, InputError> {
        match s {
            "intersects" => Ok(InclusionCriteria::Intersects),
            "within" => Ok(InclusionCriteria::Within),
            other => Err(InputError::UnknownCriteria(other.to_string())),
        }
    }
}

/// The resolution and rule used to decide membership in the city.
///
/// The criteria is evaluated against the boundary polygon at `grain`
/// resolution: a block can be kept because its whole tract touches the
/// city even if the block itself does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Inclusion {
    pub grain: Grain,
    pub criteria: InclusionCriteria,
}

impl Default for Inclusion {
    fn default() -> Self {
        Self {
            grain: Grain::Block,
            criteria: InclusionCriteria::Intersects,
        }
    }
}

impl Inclusion {
    pub fn new(grain: Grain, criteria: InclusionCriteria) -> Self {
        Self { grain, criteria }
    }
}
