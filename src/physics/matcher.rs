// src/physics/matcher.rs

use std::sync::atomic::{AtomicBool, Ordering};

use log::trace;
use nalgebra::{Matrix3, Vector3};

use crate::model::Structure;
use crate::physics::enumerate::CandidateTransform;
use crate::physics::reduction::ReducedLattice;
use crate::utils::linalg;

/// Decides, per candidate transform, whether structure 1 maps onto structure 2.
///
/// Distances are measured in structure 2's lattice. The fractional difference
/// is expressed in the reduced basis of lattice 2 and the 27 neighbouring
/// images are searched, which yields the true minimum-image distance for a
/// reduced cell.
pub struct AtomMatcher<'a> {
    structure1: &'a Structure,
    structure2: &'a Structure,
    /// structure-2 fractional -> reduced-2 fractional
    to_reduced: Matrix3<f64>,
    /// reduced-2 fractional -> Cartesian
    reduced_basis_t: Matrix3<f64>,
    tolerance: f64,
}

impl<'a> AtomMatcher<'a> {
    pub fn new(
        structure1: &'a Structure,
        structure2: &'a Structure,
        reduced2: &ReducedLattice,
        tolerance: f64,
    ) -> Self {
        Self {
            structure1,
            structure2,
            to_reduced: linalg::to_real(&reduced2.inverse_transform()).transpose(),
            reduced_basis_t: reduced2.basis.transpose(),
            tolerance,
        }
    }

    /// Minimum-image Cartesian distance between two structure-2 fractional points.
    pub fn periodic_distance(&self, p: &Vector3<f64>, q: &Vector3<f64>) -> f64 {
        let delta = linalg::nearest_image_delta(self.to_reduced * (p - q));

        let mut best = f64::MAX;
        for i in -1..=1 {
            for j in -1..=1 {
                for k in -1..=1 {
                    let image = delta + Vector3::new(i as f64, j as f64, k as f64);
                    best = best.min((self.reduced_basis_t * image).norm());
                }
            }
        }
        best
    }

    /// True if every atom of structure 1, mapped through `candidate`, can be
    /// paired with a distinct atom of structure 2 of equal species within the
    /// distance tolerance.
    ///
    /// Returns false early once `found` is raised by another worker.
    pub fn matches(&self, candidate: &CandidateTransform, found: &AtomicBool) -> bool {
        if found.load(Ordering::Relaxed) {
            return false;
        }

        let n1 = self.structure1.len();
        let n2 = self.structure2.len();
        let mut partners: Vec<Vec<usize>> = Vec::with_capacity(n1);

        for i in 0..n1 {
            if found.load(Ordering::Relaxed) {
                return false;
            }

            let species = self.structure1.types[i];
            let mapped = candidate.apply(&self.structure1.position(i));

            let eligible: Vec<usize> = (0..n2)
                .filter(|&j| self.structure2.types[j] == species)
                .filter(|&j| {
                    self.periodic_distance(&mapped, &self.structure2.position(j)) <= self.tolerance
                })
                .collect();

            if eligible.is_empty() {
                trace!("Atom {} (species {}) has no partner", i, species);
                return false;
            }
            partners.push(eligible);
        }

        perfect_matching(&partners, n2, found)
    }
}

/// Kuhn's augmenting-path matching; true if every left vertex gets a distinct right vertex.
fn perfect_matching(partners: &[Vec<usize>], n_right: usize, found: &AtomicBool) -> bool {
    let mut owner: Vec<Option<usize>> = vec![None; n_right];

    for left in 0..partners.len() {
        if found.load(Ordering::Relaxed) {
            return false;
        }
        let mut visited = vec![false; n_right];
        if !augment(left, partners, &mut owner, &mut visited) {
            trace!("Matching failed at atom {}", left);
            return false;
        }
    }
    true
}

fn augment(
    left: usize,
    partners: &[Vec<usize>],
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &right in &partners[left] {
        if visited[right] {
            continue;
        }
        visited[right] = true;

        let free = match owner[right] {
            None => true,
            Some(other) => augment(other, partners, owner, visited),
        };
        if free {
            owner[right] = Some(left);
            return true;
        }
    }
    false
}
