// src/error.rs

use thiserror::Error;

/// Rejections raised before any reduction or search work starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("atom count mismatch: structure 1 has {first} atoms, structure 2 has {second}")]
    AtomCountMismatch { first: usize, second: usize },

    #[error("shape mismatch: {types} species labels but {positions} positions")]
    ShapeMismatch { types: usize, positions: usize },

    #[error("{what} has {found} values, expected {expected}")]
    BufferLength {
        what: &'static str,
        found: usize,
        expected: usize,
    },

    #[error("tolerances must be strictly positive (distance {distance}, angle {angle})")]
    NonPositiveTolerance { distance: f64, angle: f64 },

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    #[error("structure has no atoms")]
    EmptyStructure,

    #[error("species label {0} does not fit in a 32-bit integer")]
    SpeciesOutOfRange(i64),

    #[error("degenerate lattice (volume {volume:e})")]
    DegenerateLattice { volume: f64 },
}

/// Everything a comparison call can fail with.
///
/// A structural mismatch is not an error: it is `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompareError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// Internal failure of the lattice reduction. Well-formed finite input never hits this.
    #[error("lattice reduction did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },
}

impl CompareError {
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, CompareError::InvalidInput(_))
    }
}
