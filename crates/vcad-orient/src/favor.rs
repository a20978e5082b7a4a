//! Favored side preference.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OrientError;
use crate::Vec3;

/// A direction whose aligned faces get their area scaled before the
/// candidate search.
///
/// A weight above 1 biases the search toward putting faces with this normal
/// on the bed; a weight below 1 penalizes it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FavoredSide {
    /// Unit normal of the favored side.
    pub direction: Vec3,
    /// Area multiplier for aligned faces.
    pub weight: f64,
}

impl FavoredSide {
    /// Create a favored side, normalizing `direction`.
    pub fn new(direction: Vec3, weight: f64) -> Result<Self, OrientError> {
        let norm = direction.norm();
        if !norm.is_finite() || norm <= f64::EPSILON {
            return Err(OrientError::InvalidFavoredSide(format!(
                "direction {direction:?} has no length"
            )));
        }
        if !weight.is_finite() || weight <= 0.0 {
            return Err(OrientError::InvalidFavoredSide(format!(
                "weight {weight} must be positive"
            )));
        }
        Ok(Self {
            direction: direction / norm,
            weight,
        })
    }

    /// Whether a unit face normal is close enough to this side to be weighted.
    pub fn aligns_with(&self, normal: &Vec3, angle_scale: f64) -> bool {
        (normal - self.direction).norm_squared() < angle_scale
    }
}

impl FromStr for FavoredSide {
    type Err = OrientError;

    /// Parse `"[[x,y,z],weight]"`. Any separators are accepted; the first four
    /// numbers are the direction and the weight.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unparseable = || OrientError::InvalidFavoredSide(format!("could not parse {s:?}"));
        let numbers = scan_numbers(s).ok_or_else(unparseable)?;
        match numbers.as_slice() {
            [x, y, z, weight, ..] => Self::new(Vec3::new(*x, *y, *z), *weight),
            _ => Err(unparseable()),
        }
    }
}

impl fmt::Display for FavoredSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[[{},{},{}],{}]",
            self.direction.x, self.direction.y, self.direction.z, self.weight
        )
    }
}

/// Extract every decimal number (optionally signed) from `s`.
fn scan_numbers(s: &str) -> Option<Vec<f64>> {
    let mut numbers = Vec::new();
    let mut token = String::new();

    for c in s.chars().chain(std::iter::once(' ')) {
        let continues = c.is_ascii_digit() || c == '.' || (c == '-' && token.is_empty());
        if continues {
            token.push(c);
            continue;
        }
        if !token.is_empty() && token != "-" {
            numbers.push(token.parse::<f64>().ok()?);
        }
        token.clear();
        if c == '-' {
            token.push(c);
        }
    }

    Some(numbers)
}
