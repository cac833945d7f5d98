// src/model/options.rs

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Default Cartesian tolerance in Å.
pub const DEFAULT_DISTANCE_TOLERANCE: f64 = 0.05;
/// Default angle tolerance in degrees.
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 0.25;

/// (distance in length units, angle in degrees), fixed for one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    pub distance: f64,
    pub angle: f64,
}

impl Tolerance {
    pub fn new(distance: f64, angle: f64) -> Result<Self, InputError> {
        let tol = Self { distance, angle };
        tol.validate()?;
        Ok(tol)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        // NaN fails both comparisons and is rejected here too
        if !(self.distance > 0.0 && self.angle > 0.0)
            || !self.distance.is_finite()
            || !self.angle.is_finite()
        {
            return Err(InputError::NonPositiveTolerance {
                distance: self.distance,
                angle: self.angle,
            });
        }
        Ok(())
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE_TOLERANCE,
            angle: DEFAULT_ANGLE_TOLERANCE,
        }
    }
}

/// Whether a mirror image of a structure counts as the same crystal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Chirality {
    /// Handedness-inverting transforms are tried as well.
    #[default]
    AllowMirror,
    /// Only proper (handedness-preserving) transforms are tried.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompareOptions {
    pub tolerance: Tolerance,
    pub chirality: Chirality,
    /// Evaluate candidates on the rayon pool.
    pub parallel: bool,
}

impl CompareOptions {
    pub fn with_tolerance(distance: f64, angle: f64) -> Self {
        Self {
            tolerance: Tolerance { distance, angle },
            ..Self::default()
        }
    }
}
