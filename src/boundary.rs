// src/boundary.rs
//
// Entry point for host bindings that hand over flat numeric buffers
// (lattices as 9 row-major values, positions as 3*N values, wide integer
// species labels). Everything is copied into owned, validated values before
// the comparison runs.

use crate::error::{CompareError, InputError};
use crate::model::{CompareOptions, Structure, Tolerance};
use crate::physics::compare_structures;
use crate::utils::linalg::LatticeRows;

fn lattice_from_flat(buf: &[f64], what: &'static str) -> Result<LatticeRows, InputError> {
    if buf.len() != 9 {
        return Err(InputError::BufferLength {
            what,
            found: buf.len(),
            expected: 9,
        });
    }
    let mut lattice = [[0.0; 3]; 3];
    for (row, chunk) in lattice.iter_mut().zip(buf.chunks_exact(3)) {
        row.copy_from_slice(chunk);
    }
    Ok(lattice)
}

fn positions_from_flat(
    buf: &[f64],
    num_atoms: usize,
    what: &'static str,
) -> Result<Vec<[f64; 3]>, InputError> {
    if buf.len() != 3 * num_atoms {
        return Err(InputError::BufferLength {
            what,
            found: buf.len(),
            expected: 3 * num_atoms,
        });
    }
    Ok(buf.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect())
}

/// Narrows wide species labels to the 32-bit labels the core works with.
fn narrow_types(types: &[i64]) -> Result<Vec<i32>, InputError> {
    types
        .iter()
        .map(|&t| i32::try_from(t).map_err(|_| InputError::SpeciesOutOfRange(t)))
        .collect()
}

fn structure_from_flat(
    lattice: &[f64],
    types: &[i64],
    positions: &[f64],
    which: usize,
) -> Result<Structure, InputError> {
    let (lattice_name, positions_name) = if which == 1 {
        ("lattice1", "positions1")
    } else {
        ("lattice2", "positions2")
    };
    let lattice = lattice_from_flat(lattice, lattice_name)?;
    let positions = positions_from_flat(positions, types.len(), positions_name)?;
    Structure::new(lattice, narrow_types(types)?, positions)
}

/// Compares two structures supplied as flat row-major buffers.
#[allow(clippy::too_many_arguments)]
pub fn compare_raw(
    lattice1: &[f64],
    types1: &[i64],
    positions1: &[f64],
    lattice2: &[f64],
    types2: &[i64],
    positions2: &[f64],
    distance_tolerance: f64,
    angle_tolerance: f64,
) -> Result<bool, CompareError> {
    if types1.len() != types2.len() {
        return Err(InputError::AtomCountMismatch {
            first: types1.len(),
            second: types2.len(),
        }
        .into());
    }
    let tolerance = Tolerance::new(distance_tolerance, angle_tolerance)?;
    let structure1 = structure_from_flat(lattice1, types1, positions1, 1)?;
    let structure2 = structure_from_flat(lattice2, types2, positions2, 2)?;

    let options = CompareOptions {
        tolerance,
        ..CompareOptions::default()
    };
    compare_structures(&structure1, &structure2, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBIC: [f64; 9] = [4.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 4.0];

    #[test]
    fn flat_buffers_compare() {
        let ok = compare_raw(
            &CUBIC,
            &[1, 2],
            &[0.0, 0.0, 0.0, 0.5, 0.5, 0.5],
            &CUBIC,
            &[2, 1],
            &[0.25, 0.25, 0.25, 0.75, 0.75, 0.75],
            1e-3,
            1e-3,
        )
        .unwrap();
        assert!(ok);
    }

    #[test]
    fn wrong_buffer_lengths() {
        let err = compare_raw(&CUBIC[..8], &[1], &[0.0; 3], &CUBIC, &[1], &[0.0; 3], 1e-3, 1e-3)
            .unwrap_err();
        assert_eq!(
            err,
            CompareError::InvalidInput(InputError::BufferLength {
                what: "lattice1",
                found: 8,
                expected: 9
            })
        );

        let err = compare_raw(&CUBIC, &[1], &[0.0; 3], &CUBIC, &[1], &[0.0; 4], 1e-3, 1e-3)
            .unwrap_err();
        assert!(matches!(
            err,
            CompareError::InvalidInput(InputError::BufferLength {
                what: "positions2",
                ..
            })
        ));
    }

    #[test]
    fn wide_labels_are_narrowed() {
        assert_eq!(narrow_types(&[1, -7, 118]).unwrap(), vec![1, -7, 118]);
        assert_eq!(
            narrow_types(&[1, i64::MAX]).unwrap_err(),
            InputError::SpeciesOutOfRange(i64::MAX)
        );
    }

    #[test]
    fn count_mismatch_before_anything_else() {
        let err = compare_raw(&CUBIC, &[1, 1], &[0.0; 6], &CUBIC, &[1, 1, 1], &[0.0; 9], 1e-3, 1e-3)
            .unwrap_err();
        assert!(matches!(
            err,
            CompareError::InvalidInput(InputError::AtomCountMismatch { first: 2, second: 3 })
        ));
    }
}
