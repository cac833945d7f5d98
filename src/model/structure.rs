// src/model/structure.rs

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::utils::linalg::{self, LatticeRows};

/// One periodic structure: lattice rows, species labels and fractional positions.
///
/// Positions are wrapped into [0, 1) when the structure is built.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Structure {
    // Lattice vectors: [a_vec, b_vec, c_vec]
    pub lattice: LatticeRows,
    pub types: Vec<i32>,
    pub positions: Vec<[f64; 3]>,
}

impl Structure {
    pub fn new(
        lattice: LatticeRows,
        types: Vec<i32>,
        positions: Vec<[f64; 3]>,
    ) -> Result<Self, InputError> {
        if types.len() != positions.len() {
            return Err(InputError::ShapeMismatch {
                types: types.len(),
                positions: positions.len(),
            });
        }
        if types.is_empty() {
            return Err(InputError::EmptyStructure);
        }
        if lattice.iter().flatten().any(|x| !x.is_finite()) {
            return Err(InputError::NonFinite("lattice"));
        }
        if positions.iter().flatten().any(|x| !x.is_finite()) {
            return Err(InputError::NonFinite("positions"));
        }

        let positions = positions
            .into_iter()
            .map(|p| p.map(linalg::wrap_fractional))
            .collect();

        Ok(Self {
            lattice,
            types,
            positions,
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn position(&self, index: usize) -> Vector3<f64> {
        Vector3::from(self.positions[index])
    }

    /// Species label -> number of atoms carrying it.
    pub fn composition(&self) -> BTreeMap<i32, usize> {
        let mut counts = BTreeMap::new();
        for &t in &self.types {
            *counts.entry(t).or_insert(0) += 1;
        }
        counts
    }

    /// Signed cell volume (negative for a left-handed basis).
    pub fn volume(&self) -> f64 {
        linalg::lattice_matrix(&self.lattice).determinant()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBIC: LatticeRows = [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]];

    #[test]
    fn positions_are_wrapped() {
        let s = Structure::new(CUBIC, vec![1, 1], vec![[1.25, -0.5, 0.0], [0.999, 2.0, -3.0]])
            .unwrap();
        assert!((s.positions[0][0] - 0.25).abs() < 1e-12);
        assert!((s.positions[0][1] - 0.5).abs() < 1e-12);
        assert!((s.positions[1][0] - 0.999).abs() < 1e-12);
        assert_eq!(s.positions[1][1], 0.0);
        assert_eq!(s.positions[1][2], 0.0);
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = Structure::new(CUBIC, vec![1, 2], vec![[0.0; 3]]).unwrap_err();
        assert_eq!(
            err,
            InputError::ShapeMismatch {
                types: 2,
                positions: 1
            }
        );
    }

    #[test]
    fn empty_and_non_finite_are_rejected() {
        assert_eq!(
            Structure::new(CUBIC, vec![], vec![]).unwrap_err(),
            InputError::EmptyStructure
        );
        assert_eq!(
            Structure::new(CUBIC, vec![1], vec![[f64::NAN, 0.0, 0.0]]).unwrap_err(),
            InputError::NonFinite("positions")
        );
    }

    #[test]
    fn composition_counts_species() {
        let s = Structure::new(CUBIC, vec![8, 14, 8], vec![[0.0; 3], [0.5; 3], [0.25; 3]]).unwrap();
        let comp = s.composition();
        assert_eq!(comp.get(&8), Some(&2));
        assert_eq!(comp.get(&14), Some(&1));
        assert!((s.volume() - 64.0).abs() < 1e-10);
    }
}
