//! Boundary modes and distance metrics for neighbour queries.

use crate::error::SpaceError;
use std::fmt;
use std::str::FromStr;

/// How a neighbour query treats the edges of the field.
///
/// # Examples
///
/// ```
/// use tessel_space::BoundaryMode;
///
/// assert_eq!(BoundaryMode::Bounded.resolve_axis(-1, 10), None);
/// assert_eq!(BoundaryMode::Unbounded.resolve_axis(-1, 10), Some(-1));
/// assert_eq!(BoundaryMode::Toroidal.resolve_axis(-1, 10), Some(9));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundaryMode {
    /// Points outside `[0, extent)` are dropped.
    Bounded,
    /// No clipping; the extent is ignored.
    Unbounded,
    /// Coordinates wrap modulo the extent (periodic field).
    Toroidal,
}

impl BoundaryMode {
    /// Stable numeric code, used where modes cross a language or wire
    /// boundary.
    pub const fn code(self) -> u8 {
        match self {
            Self::Bounded => 0,
            Self::Unbounded => 1,
            Self::Toroidal => 2,
        }
    }

    /// Map a coordinate on one axis through this boundary.
    ///
    /// Returns `None` when the point does not exist under this mode.
    pub fn resolve_axis(self, val: i32, len: u32) -> Option<i32> {
        let n = len as i32;
        if val >= 0 && val < n {
            return Some(val);
        }
        match self {
            Self::Bounded => None,
            Self::Unbounded => Some(val),
            Self::Toroidal => Some(val.rem_euclid(n)),
        }
    }
}

impl TryFrom<u8> for BoundaryMode {
    type Error = SpaceError;

    fn try_from(code: u8) -> Result<Self, SpaceError> {
        match code {
            0 => Ok(Self::Bounded),
            1 => Ok(Self::Unbounded),
            2 => Ok(Self::Toroidal),
            other => Err(SpaceError::InvalidArgument {
                reason: format!("unknown boundary mode code {other}"),
            }),
        }
    }
}

impl FromStr for BoundaryMode {
    type Err = SpaceError;

    fn from_str(s: &str) -> Result<Self, SpaceError> {
        match s.to_ascii_lowercase().as_str() {
            "bounded" => Ok(Self::Bounded),
            "unbounded" => Ok(Self::Unbounded),
            "toroidal" => Ok(Self::Toroidal),
            _ => Err(SpaceError::InvalidArgument {
                reason: format!("unknown boundary mode '{s}'"),
            }),
        }
    }
}

impl fmt::Display for BoundaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bounded => "bounded",
            Self::Unbounded => "unbounded",
            Self::Toroidal => "toroidal",
        })
    }
}

/// Distance metric for neighbourhoods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Maximum per-axis distance (square/cube neighbourhoods).
    Chebyshev,
    /// Sum of per-axis distances (diamond neighbourhoods).
    Manhattan,
}

impl Metric {
    /// Distance between two points under this metric and boundary mode.
    ///
    /// Toroidal distances take the shorter way round each axis. Points
    /// of different dimensionality compare over their common prefix.
    pub fn distance(self, a: &[i32], b: &[i32], extent: &[u32], mode: BoundaryMode) -> u32 {
        let per_axis = a.iter().zip(b).zip(extent).map(|((&x, &y), &len)| {
            let diff = (x - y).unsigned_abs();
            match mode {
                BoundaryMode::Toroidal => {
                    let diff = diff % len;
                    diff.min(len - diff)
                }
                BoundaryMode::Bounded | BoundaryMode::Unbounded => diff,
            }
        });
        match self {
            Self::Chebyshev => per_axis.max().unwrap_or(0),
            Self::Manhattan => per_axis.sum(),
        }
    }
}

impl FromStr for Metric {
    type Err = SpaceError;

    fn from_str(s: &str) -> Result<Self, SpaceError> {
        match s.to_ascii_lowercase().as_str() {
            "chebyshev" | "max" => Ok(Self::Chebyshev),
            "manhattan" | "taxicab" => Ok(Self::Manhattan),
            _ => Err(SpaceError::InvalidArgument {
                reason: format!("unknown metric '{s}'"),
            }),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Chebyshev => "chebyshev",
            Self::Manhattan => "manhattan",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_codes_round_trip() {
        for mode in [
            BoundaryMode::Bounded,
            BoundaryMode::Unbounded,
            BoundaryMode::Toroidal,
        ] {
            assert_eq!(BoundaryMode::try_from(mode.code()), Ok(mode));
            assert_eq!(mode.to_string().parse::<BoundaryMode>(), Ok(mode));
        }
    }

    #[test]
    fn unknown_mode_is_invalid_argument() {
        assert!(matches!(
            BoundaryMode::try_from(7),
            Err(SpaceError::InvalidArgument { .. })
        ));
        assert!(matches!(
            "mobius".parse::<BoundaryMode>(),
            Err(SpaceError::InvalidArgument { .. })
        ));
        assert!("euclid".parse::<Metric>().is_err());
    }

    #[test]
    fn toroidal_distance_takes_short_way() {
        let ext = [10, 10];
        assert_eq!(
            Metric::Chebyshev.distance(&[0, 0], &[9, 9], &ext, BoundaryMode::Toroidal),
            1
        );
        assert_eq!(
            Metric::Manhattan.distance(&[0, 0], &[9, 9], &ext, BoundaryMode::Toroidal),
            2
        );
        assert_eq!(
            Metric::Manhattan.distance(&[0, 0], &[9, 9], &ext, BoundaryMode::Bounded),
            18
        );
    }
}
