// src/physics/metric.rs

use log::{debug, trace};
use nalgebra::{Matrix3, Vector3};

use crate::model::{Chirality, Tolerance};
use crate::physics::reduction::ReducedLattice;
use crate::utils::linalg;

/// One way of re-expressing reduced basis 2 so that it matches reduced basis 1.
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeCandidate {
    /// Integer matrix P, rows are the new vectors in terms of reduced basis 2.
    pub transform: Matrix3<i32>,
    /// The Cartesian map between the two cells inverts handedness.
    pub improper: bool,
}

#[derive(Clone, Debug)]
pub struct MetricMatch {
    pub compatible: bool,
    pub candidates: Vec<LatticeCandidate>,
}

impl MetricMatch {
    fn incompatible() -> Self {
        Self {
            compatible: false,
            candidates: Vec::new(),
        }
    }
}

/// A lattice vector of reduced basis 2 with coefficients in {-1, 0, 1}.
struct ShortVector {
    coeffs: [i32; 3],
    cart: Vector3<f64>,
}

/// Compares two reduced cells and collects every basis of lattice 2 whose
/// lengths and angles agree with reduced basis 1.
///
/// Lengths are compared absolutely against `tolerance.distance`, angles
/// absolutely in degrees against `tolerance.angle`.
///
/// The candidate bases are combinations of reduced basis 2 with coefficients in
/// {-1, 0, 1}. That covers all axis permutations and sign changes, and also the
/// shears that appear when a cell close to a reduction boundary was reduced to a
/// different but equally short basis.
pub fn compare_metrics(
    reduced1: &ReducedLattice,
    reduced2: &ReducedLattice,
    tolerance: &Tolerance,
    chirality: Chirality,
) -> MetricMatch {
    // Reduced lengths are the successive minima of the lattice, so they must
    // agree pairwise before any basis search makes sense.
    for i in 0..3 {
        if (reduced1.lengths[i] - reduced2.lengths[i]).abs() > tolerance.distance {
            debug!(
                "Cell lengths differ: {:?} vs {:?}",
                reduced1.lengths, reduced2.lengths
            );
            return MetricMatch::incompatible();
        }
    }

    let short_vectors = short_vectors(reduced2);
    let by_length: Vec<Vec<&ShortVector>> = (0..3)
        .map(|i| {
            short_vectors
                .iter()
                .filter(|v| (v.cart.norm() - reduced1.lengths[i]).abs() <= tolerance.distance)
                .collect()
        })
        .collect();

    let [alpha, beta, gamma] = reduced1.angles;
    let handedness = reduced1.volume().signum() * reduced2.volume().signum();
    let angle_ok = |u: &Vector3<f64>, v: &Vector3<f64>, target: f64| {
        (linalg::angle_between(u, v) - target).abs() <= tolerance.angle
    };

    let mut candidates = Vec::new();
    let mut dropped_mirrors = 0usize;

    for va in &by_length[0] {
        for vb in &by_length[1] {
            if !angle_ok(&va.cart, &vb.cart, gamma) {
                continue;
            }
            for vc in &by_length[2] {
                if !angle_ok(&vb.cart, &vc.cart, alpha) || !angle_ok(&va.cart, &vc.cart, beta) {
                    continue;
                }

                let transform = Matrix3::from_rows(&[
                    row(va.coeffs).transpose(),
                    row(vb.coeffs).transpose(),
                    row(vc.coeffs).transpose(),
                ]);
                let det = linalg::int_determinant(&transform);
                if det.abs() != 1 {
                    continue;
                }

                let improper = (det as f64) * handedness < 0.0;
                if improper && chirality == Chirality::Strict {
                    dropped_mirrors += 1;
                    continue;
                }

                trace!("Lattice candidate {:?} (improper: {})", transform, improper);
                candidates.push(LatticeCandidate {
                    transform,
                    improper,
                });
            }
        }
    }

    debug!(
        "Metric comparison: {} candidate bases ({} mirror bases dropped)",
        candidates.len(),
        dropped_mirrors
    );

    MetricMatch {
        compatible: !candidates.is_empty(),
        candidates,
    }
}

fn row(coeffs: [i32; 3]) -> Vector3<i32> {
    Vector3::new(coeffs[0], coeffs[1], coeffs[2])
}

fn short_vectors(reduced: &ReducedLattice) -> Vec<ShortVector> {
    let mut out = Vec::with_capacity(26);
    for i in -1..=1 {
        for j in -1..=1 {
            for k in -1..=1 {
                if i == 0 && j == 0 && k == 0 {
                    continue;
                }
                let cart = reduced.vector(0) * i as f64
                    + reduced.vector(1) * j as f64
                    + reduced.vector(2) * k as f64;
                out.push(ShortVector {
                    coeffs: [i, j, k],
                    cart,
                });
            }
        }
    }
    out
}
