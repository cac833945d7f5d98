// src/physics/enumerate.rs
//
// Candidate (W, t) generation.
//
// The linear part W comes from the lattice candidates: with reduced bases
// R1 = M1 * L1 and P * R2 = P * M2 * L2 describing the same cell up to an
// orthogonal map, structure-1 fractional coordinates go to structure-2
// fractional coordinates through W = (M1^-1 * P * M2)^T.
//
// The origin is not fixed by the lattice. Instead of searching translations
// continuously, one anchor atom of structure 1 is pinned onto every atom of
// the same species in structure 2 in turn. The anchor is the first atom of the
// least frequent species, which keeps the trial set as small as possible; any
// valid mapping must send the anchor onto one of those atoms, so the reduction
// is exact up to the positional tolerance.

use std::collections::BTreeMap;

use log::debug;
use nalgebra::{Matrix3, Vector3};

use crate::model::Structure;
use crate::physics::metric::LatticeCandidate;
use crate::physics::reduction::ReducedLattice;
use crate::utils::linalg;

/// Two translations closer than this (per fractional component, modulo 1) are the same trial.
const TRANSLATION_EPS: f64 = 1e-8;

/// A proposed map `frac2 = rotation * frac1 + translation (mod 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateTransform {
    pub rotation: Matrix3<i32>,
    pub translation: Vector3<f64>,
    pub improper: bool,
}

impl CandidateTransform {
    pub fn apply(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        linalg::wrap_vector(linalg::to_real(&self.rotation) * frac + self.translation)
    }
}

/// Integer maps from structure-1 to structure-2 fractional coordinates, one per lattice candidate.
pub fn linear_maps(
    reduced1: &ReducedLattice,
    reduced2: &ReducedLattice,
    candidates: &[LatticeCandidate],
) -> Vec<(Matrix3<i32>, bool)> {
    let inv1 = reduced1.inverse_transform();
    candidates
        .iter()
        .map(|c| ((inv1 * c.transform * reduced2.transform).transpose(), c.improper))
        .collect()
}

/// Index of the first atom of the least frequent species (earliest species on ties).
pub fn anchor_atom(structure: &Structure) -> usize {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &t in &structure.types {
        *counts.entry(t).or_insert(0) += 1;
    }

    let mut best = 0;
    for (idx, t) in structure.types.iter().enumerate() {
        let first = structure.types.iter().position(|x| x == t) == Some(idx);
        if first && counts[t] < counts[&structure.types[best]] {
            best = idx;
        }
    }
    best
}

/// Lazy, single-pass sequence of candidate transforms.
///
/// Iterates the linear maps in order and, for each, the anchor targets in
/// structure-2 order, skipping translations already produced for that map.
pub struct CandidateTransforms {
    maps: Vec<(Matrix3<i32>, bool)>,
    anchor: Vector3<f64>,
    targets: Vec<Vector3<f64>>,
    map_index: usize,
    target_index: usize,
    emitted: Vec<Vector3<f64>>,
}

impl CandidateTransforms {
    pub fn new(
        structure1: &Structure,
        structure2: &Structure,
        reduced1: &ReducedLattice,
        reduced2: &ReducedLattice,
        candidates: &[LatticeCandidate],
    ) -> Self {
        let anchor_idx = anchor_atom(structure1);
        let anchor_type = structure1.types[anchor_idx];
        let targets: Vec<Vector3<f64>> = structure2
            .types
            .iter()
            .enumerate()
            .filter(|&(_, &t)| t == anchor_type)
            .map(|(j, _)| structure2.position(j))
            .collect();

        debug!(
            "Anchor atom {} (species {}), {} translation targets per linear map",
            anchor_idx,
            anchor_type,
            targets.len()
        );

        Self {
            maps: linear_maps(reduced1, reduced2, candidates),
            anchor: structure1.position(anchor_idx),
            targets,
            map_index: 0,
            target_index: 0,
            emitted: Vec::new(),
        }
    }

    /// Upper bound on the number of transforms this sequence yields.
    pub fn len_hint(&self) -> usize {
        self.maps.len() * self.targets.len()
    }

    fn already_emitted(&self, t: &Vector3<f64>) -> bool {
        self.emitted.iter().any(|e| {
            linalg::nearest_image_delta(e - t)
                .iter()
                .all(|d| d.abs() < TRANSLATION_EPS)
        })
    }
}

impl Iterator for CandidateTransforms {
    type Item = CandidateTransform;

    fn next(&mut self) -> Option<CandidateTransform> {
        while self.map_index < self.maps.len() {
            let (rotation, improper) = self.maps[self.map_index];

            while self.target_index < self.targets.len() {
                let target = self.targets[self.target_index];
                self.target_index += 1;

                let mapped = linalg::to_real(&rotation) * self.anchor;
                let translation = linalg::wrap_vector(target - mapped);
                if self.already_emitted(&translation) {
                    continue;
                }
                self.emitted.push(translation);

                return Some(CandidateTransform {
                    rotation,
                    translation,
                    improper,
                });
            }

            self.map_index += 1;
            self.target_index = 0;
            self.emitted.clear();
        }
        None
    }
}
