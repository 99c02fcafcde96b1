//! Fixed-width census geographic identifiers.
//!
//! An identifier is stored numerically with its grain; `Display` re-pads
//! to the grain's digit width. State codes are nonzero in this domain
//! (Michigan is `26`), so the numeric form never loses leading digits —
//! an assumption of the data, not a property of the encoding, and the
//! width checks below enforce it.

use crate::error::{GrainError, InputError};
use crate::grain::Grain;
use std::fmt;

const fn pow10(n: u32) -> u64 {
    10u64.pow(n)
}

/// A census geographic identifier at a known grain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeoId {
    value: u64,
    grain: Grain,
}

impl GeoId {
    /// Wrap a numeric identifier, checking that its digit count matches
    /// the grain width.
    pub fn new(value: u64, grain: Grain) -> Result<Self, InputError> {
        let width = grain.digits();
        if value < pow10(width - 1) || value >= pow10(width) {
            return Err(InputError::IdWidth { value, grain });
        }
        Ok(Self { value, grain })
    }

    /// Parse a fixed-width digit string at the given grain.
    pub fn parse(s: &str, grain: Grain) -> Result<Self, InputError> {
        let malformed = || InputError::MalformedId {
            id: s.to_string(),
            grain,
        };
        if s.len() != grain.digits() as usize || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        let value: u64 = s.parse().map_err(|_| malformed())?;
        Self::new(value, grain)
    }

    /// Convert a float-typed identifier column value.
    ///
    /// Sources that round-trip identifiers through floating point (CSV
    /// readers inferring numeric columns) deliver values like
    /// `261635172001001.0`. Block-width values stay below 2^53, so the
    /// round trip is exact.
    pub fn from_f64(x: f64, grain: Grain) -> Result<Self, InputError> {
        let as_int = x.round();
        if !x.is_finite() || x <= 0.0 || (x - as_int).abs() > f64::EPSILON * x.abs() {
            return Err(InputError::MalformedId {
                id: x.to_string(),
                grain,
            });
        }
        Self::new(as_int as u64, grain)
    }

    /// The numeric form.
    pub fn value(self) -> u64 {
        self.value
    }

    /// The grain this identifier names a geography at.
    pub fn grain(self) -> Grain {
        self.grain
    }

    /// Convert to a coarser or equal grain by truncating trailing digits.
    ///
    /// Truncation is deterministic and total; it loses the trailing
    /// digits. A finer target is rejected: the children of a coarse
    /// identifier are only knowable from a finer geography set.
    pub fn to_grain(self, target: Grain) -> Result<GeoId, GrainError> {
        if target.is_finer_than(self.grain) {
            return Err(GrainError::RefineWithoutJoin {
                from: self.grain,
                to: target,
            });
        }
        let divisor = pow10(self.grain.digits() - target.digits());
        Ok(GeoId {
            value: self.value / divisor,
            grain: target,
        })
    }

    /// True when truncating `self` yields `coarse`.
    pub fn rolls_up_to(self, coarse: GeoId) -> bool {
        self.to_grain(coarse.grain).map_or(false, |g| g == coarse)
    }
}

impl fmt::Display for GeoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0width$}",
            self.value,
            width = self.grain.digits() as usize
        )
    }
}

impl fmt::Debug for GeoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeoId({} @ {})", self, self.grain)
    }
}

/// Normalize a possibly-ragged identifier string to the grain's storage
/// width by right-padding with zeros, then parse it.
///
/// Ragged inputs occur when identifiers round-tripped through a float
/// representation that dropped trailing zeros. Padding restores the
/// storage width of a value that already names a geography at this grain;
/// it is not grain refinement. Returns the identifier and whether padding
/// was needed, so callers can surface a data-quality diagnostic.
pub fn standardize_id(raw: &str, grain: Grain) -> Result<(GeoId, bool), InputError> {
    let width = grain.digits() as usize;
    if raw.len() > width || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::MalformedId {
            id: raw.to_string(),
            grain,
        });
    }
    if raw.len() == width {
        return Ok((GeoId::parse(raw, grain)?, false));
    }
    let mut padded = String::with_capacity(width);
    padded.push_str(raw);
    while padded.len() < width {
        padded.push('0');
    }
    Ok((GeoId::parse(&padded, grain)?, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_A: &str = "261635172001001";
    const BLOCK_B: &str = "261635172004027";

    #[test]
    fn test_parse_and_display_round_trip() {
        let id = GeoId::parse(BLOCK_A, Grain::Block).unwrap();
        assert_eq!(id.to_string(), BLOCK_A);
        assert_eq!(id.value(), 261_635_172_001_001);
        assert_eq!(id.grain(), Grain::Block);
    }

    #[test]
    fn test_parse_rejects_wrong_width() {
        // 12 digits offered at block grain
        let err = GeoId::parse("261635172001", Grain::Block).unwrap_err();
        assert!(matches!(err, InputError::MalformedId { .. }));

        // 15 digits offered at tract grain
        let err = GeoId::parse(BLOCK_A, Grain::Tract).unwrap_err();
        assert!(matches!(err, InputError::MalformedId { .. }));

        assert!(GeoId::parse("26163517200a001", Grain::Block).is_err());
    }

    #[test]
    fn test_numeric_round_trip() {
        let id = GeoId::parse(BLOCK_A, Grain::Block).unwrap();
        let back = GeoId::new(id.value(), Grain::Block).unwrap();
        assert_eq!(id, back);

        let from_float = GeoId::from_f64(261_635_172_001_001.0, Grain::Block).unwrap();
        assert_eq!(from_float, id);
    }

    #[test]
    fn test_truncation_drops_trailing_digits() {
        let block = GeoId::parse(BLOCK_A, Grain::Block).unwrap();
        let tract = block.to_grain(Grain::Tract).unwrap();
        assert_eq!(tract.to_string(), "26163517200");

        let group = block.to_grain(Grain::BlockGroup).unwrap();
        assert_eq!(group.to_string(), "261635172001");

        // Same grain is the identity.
        assert_eq!(block.to_grain(Grain::Block).unwrap(), block);
    }

    #[test]
    fn test_truncation_consistent_across_siblings() {
        // Two blocks sharing the leading 11 digits land in the same tract.
        let a = GeoId::parse(BLOCK_A, Grain::Block).unwrap();
        let b = GeoId::parse(BLOCK_B, Grain::Block).unwrap();
        assert_eq!(
            a.to_grain(Grain::Tract).unwrap(),
            b.to_grain(Grain::Tract).unwrap()
        );
        assert!(a.rolls_up_to(a.to_grain(Grain::Tract).unwrap()));
        assert!(b.rolls_up_to(a.to_grain(Grain::Tract).unwrap()));
    }

    #[test]
    fn test_refinement_requires_join() {
        let tract = GeoId::parse("26163517200", Grain::Tract).unwrap();
        let err = tract.to_grain(Grain::Block).unwrap_err();
        assert_eq!(
            err,
            GrainError::RefineWithoutJoin {
                from: Grain::Tract,
                to: Grain::Block,
            }
        );
    }

    #[test]
    fn test_standardize_pads_storage_width() {
        // A block id whose trailing zeros were dropped by a float round trip.
        let (id, padded) = standardize_id("261635172001", Grain::Block).unwrap();
        assert!(padded);
        assert_eq!(id.to_string(), "261635172001000");

        let (id, padded) = standardize_id(BLOCK_A, Grain::Block).unwrap();
        assert!(!padded);
        assert_eq!(id.to_string(), BLOCK_A);

        // Longer than the grain width is malformed, not truncated.
        assert!(standardize_id("2616351720010011", Grain::Block).is_err());
    }
}
