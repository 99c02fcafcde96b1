//! Grains of the census geographic hierarchy.

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Level of the census hierarchy at which an identifier is expressed.
///
/// Variant order follows digit width, so derived ordering means
/// `a < b` ⇔ `a` is coarser than `b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grain {
    /// Census tract, 11 digits.
    Tract,
    /// Block group, 12 digits.
    BlockGroup,
    /// Census block, 15 digits.
    Block,
}

impl Grain {
    /// All grains, coarsest first.
    pub const ALL: [Grain; 3] = [Grain::Tract, Grain::BlockGroup, Grain::Block];

    /// Digit width of identifiers at this grain.
    pub const fn digits(self) -> u32 {
        match self {
            Grain::Tract => 11,
            Grain::BlockGroup => 12,
            Grain::Block => 15,
        }
    }

    /// True when `self` carries strictly more digits than `other`.
    pub fn is_finer_than(self, other: Grain) -> bool {
        self.digits() > other.digits()
    }

    /// True when `self` carries no more digits than `other`, i.e. an
    /// identifier at `other` can be truncated to `self`.
    pub fn is_coarser_or_equal(self, other: Grain) -> bool {
        self.digits() <= other.digits()
    }

    /// Name used by the source datasets and configuration.
    pub fn name(self) -> &'static str {
        match self {
            Grain::Tract => "tract",
            Grain::BlockGroup => "block group",
            Grain::Block => "block",
        }
    }
}

impl fmt::Display for Grain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Grain {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, InputError> {
        match s {
            "block" => Ok(Grain::Block),
            "block group" | "block_group" => Ok(Grain::BlockGroup),
            "tract" => Ok(Grain::Tract),
            other => Err(InputError::UnknownGrain(other.to_string())),
        }
    }
}
