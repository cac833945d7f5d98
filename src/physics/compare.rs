// src/physics/compare.rs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::{debug, info};
use rayon::prelude::*;

use crate::error::{CompareError, InputError};
use crate::model::{CompareOptions, Structure, Tolerance};
use crate::physics::enumerate::{CandidateTransform, CandidateTransforms};
use crate::physics::matcher::AtomMatcher;
use crate::physics::metric::compare_metrics;
use crate::physics::reduction::{check_lattice, niggli_reduce};
use crate::utils::linalg::LatticeRows;

/// Stages of one comparison call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Init,
    LatticesReduced,
    MetricsCompared,
    Searching,
    Found,
    Exhausted,
    Done,
}

/// Outcome of a comparison plus what the search did to get there.
#[derive(Debug, Clone)]
pub struct ComparisonReport {
    pub equivalent: bool,
    /// State the call was in right before `Done`: `MetricsCompared` when the
    /// cells were incompatible, otherwise `Found` or `Exhausted`.
    pub exit_state: SearchState,
    pub lattice_candidates: usize,
    pub transforms_tried: usize,
    pub matching_transform: Option<CandidateTransform>,
}

fn advance(state: &mut SearchState, next: SearchState) {
    debug!("{:?} -> {:?}", state, next);
    *state = next;
}

/// Compares two structures given as plain arrays.
///
/// Lattices are row-major (row i = basis vector i), positions are fractional.
/// Returns `Ok(false)` for a genuine mismatch and `Err` for rejected input or an
/// internal failure.
#[allow(clippy::too_many_arguments)]
pub fn compare(
    lattice1: &LatticeRows,
    types1: &[i32],
    positions1: &[[f64; 3]],
    lattice2: &LatticeRows,
    types2: &[i32],
    positions2: &[[f64; 3]],
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
    let structure1 = Structure::new(*lattice1, types1.to_vec(), positions1.to_vec())?;
    let structure2 = Structure::new(*lattice2, types2.to_vec(), positions2.to_vec())?;

    let options = CompareOptions {
        tolerance,
        ..CompareOptions::default()
    };
    compare_structures(&structure1, &structure2, &options)
}

pub fn compare_structures(
    structure1: &Structure,
    structure2: &Structure,
    options: &CompareOptions,
) -> Result<bool, CompareError> {
    compare_with_report(structure1, structure2, options).map(|report| report.equivalent)
}

fn validate(
    structure1: &Structure,
    structure2: &Structure,
    options: &CompareOptions,
) -> Result<(), InputError> {
    for s in [structure1, structure2] {
        if s.types.len() != s.positions.len() {
            return Err(InputError::ShapeMismatch {
                types: s.types.len(),
                positions: s.positions.len(),
            });
        }
    }
    if structure1.len() != structure2.len() {
        return Err(InputError::AtomCountMismatch {
            first: structure1.len(),
            second: structure2.len(),
        });
    }
    if structure1.is_empty() {
        return Err(InputError::EmptyStructure);
    }
    options.tolerance.validate()?;
    check_lattice(&structure1.lattice)?;
    check_lattice(&structure2.lattice)?;
    Ok(())
}

pub fn compare_with_report(
    structure1: &Structure,
    structure2: &Structure,
    options: &CompareOptions,
) -> Result<ComparisonReport, CompareError> {
    let mut state = SearchState::Init;
    validate(structure1, structure2, options)?;

    let reduced1 = niggli_reduce(&structure1.lattice)?;
    let reduced2 = niggli_reduce(&structure2.lattice)?;
    advance(&mut state, SearchState::LatticesReduced);

    let tolerance = options.tolerance;
    let metric = compare_metrics(&reduced1, &reduced2, &tolerance, options.chirality);
    advance(&mut state, SearchState::MetricsCompared);

    if !metric.compatible {
        advance(&mut state, SearchState::Done);
        info!("Lattices are incompatible: structures are not equivalent");
        return Ok(ComparisonReport {
            equivalent: false,
            exit_state: SearchState::MetricsCompared,
            lattice_candidates: 0,
            transforms_tried: 0,
            matching_transform: None,
        });
    }

    advance(&mut state, SearchState::Searching);

    let mut hit = None;
    let tried = AtomicUsize::new(0);

    if structure1.composition() != structure2.composition() {
        debug!("Species compositions differ, skipping search");
    } else {
        let mut transforms = CandidateTransforms::new(
            structure1,
            structure2,
            &reduced1,
            &reduced2,
            &metric.candidates,
        );
        debug!("Searching up to {} candidate transforms", transforms.len_hint());

        let matcher = AtomMatcher::new(structure1, structure2, &reduced2, tolerance.distance);
        let found = AtomicBool::new(false);
        let check = |candidate: &CandidateTransform| {
            tried.fetch_add(1, Ordering::Relaxed);
            let ok = matcher.matches(candidate, &found);
            if ok {
                found.store(true, Ordering::Relaxed);
            }
            ok
        };

        hit = if options.parallel {
            transforms.par_bridge().find_any(|c| check(c))
        } else {
            transforms.find(|c| check(c))
        };
    }

    let transforms_tried = tried.into_inner();
    let exit_state = if hit.is_some() {
        SearchState::Found
    } else {
        SearchState::Exhausted
    };
    advance(&mut state, exit_state);
    advance(&mut state, SearchState::Done);

    match &hit {
        Some(t) => info!(
            "Structures are equivalent after {} transforms (improper: {})",
            transforms_tried, t.improper
        ),
        None => info!(
            "No transform out of {} tried maps the structures onto each other",
            transforms_tried
        ),
    }

    Ok(ComparisonReport {
        equivalent: hit.is_some(),
        exit_state,
        lattice_candidates: metric.candidates.len(),
        transforms_tried,
        matching_transform: hit,
    })
}
