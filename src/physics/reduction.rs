// src/physics/reduction.rs
//
// Niggli reduction following the epsilon-stabilised Krivy-Gruber steps
// (Grosse-Kunstleve, Sauter & Adams, Acta Cryst. A60 (2004) 1-6).
// Every step is a unimodular change of basis; the product of all steps is kept
// so callers can move fractional coordinates between the two bases.

use log::{debug, error};
use nalgebra::{Matrix3, Vector3};

use crate::error::{CompareError, InputError};
use crate::utils::linalg::{self, LatticeRows};

const MAX_LOOPS: usize = 100;
/// Relative epsilon for metric comparisons, scaled by V^(2/3).
const REDUCTION_EPS: f64 = 1e-5;
/// |det| below this fraction of (longest vector)^3 counts as zero volume.
const DEGENERATE_EPS: f64 = 1e-10;

/// A lattice after Niggli reduction.
#[derive(Clone, Debug)]
pub struct ReducedLattice {
    /// Reduced basis vectors as rows.
    pub basis: Matrix3<f64>,
    /// Integer matrix M with `basis = M * original_rows`, det(M) = +1.
    pub transform: Matrix3<i32>,
    /// (a, b, c)
    pub lengths: [f64; 3],
    /// (alpha, beta, gamma) in degrees
    pub angles: [f64; 3],
}

impl ReducedLattice {
    pub fn vector(&self, i: usize) -> Vector3<f64> {
        self.basis.row(i).transpose()
    }

    /// Signed volume; same sign as the input lattice.
    pub fn volume(&self) -> f64 {
        self.basis.determinant()
    }

    pub fn metric_tensor(&self) -> Matrix3<f64> {
        self.basis * self.basis.transpose()
    }

    pub fn inverse_transform(&self) -> Matrix3<i32> {
        linalg::unimodular_inverse(&self.transform)
    }

    /// Converts fractional coordinates of the original basis into the reduced basis.
    pub fn to_reduced_fractional(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        linalg::to_real(&self.inverse_transform()).transpose() * frac
    }
}

/// Rejects lattices with (near-)zero volume. Returns the signed volume otherwise.
pub fn check_lattice(lattice: &LatticeRows) -> Result<f64, InputError> {
    let m = linalg::lattice_matrix(lattice);
    let volume = m.determinant();
    let longest = (0..3).map(|i| m.row(i).norm()).fold(0.0, f64::max);

    if !volume.is_finite() || longest == 0.0 || volume.abs() <= DEGENERATE_EPS * longest.powi(3) {
        return Err(InputError::DegenerateLattice { volume });
    }
    Ok(volume)
}

pub fn niggli_reduce(lattice: &LatticeRows) -> Result<ReducedLattice, CompareError> {
    reduce_within(lattice, MAX_LOOPS)
}

fn reduce_within(lattice: &LatticeRows, max_loops: usize) -> Result<ReducedLattice, CompareError> {
    let volume = check_lattice(lattice)?;
    let eps = REDUCTION_EPS * volume.abs().powf(2.0 / 3.0);

    let mut state = NiggliState::new(linalg::lattice_matrix(lattice), eps);

    for iteration in 0..max_loops {
        state.step1();
        if state.step2() {
            continue;
        }
        state.step3();
        state.step4();
        if state.step5() || state.step6() || state.step7() || state.step8() {
            continue;
        }

        debug!("Niggli reduction converged after {} iterations", iteration + 1);
        return Ok(state.finish());
    }

    error!(
        "Niggli reduction did not converge within {} iterations (volume {:e})",
        max_loops, volume
    );
    Err(CompareError::NonConvergence {
        iterations: max_loops,
    })
}

/// Working state: current basis rows, accumulated transform and the metric
/// parameters A = a.a, B = b.b, C = c.c, xi = 2 b.c, eta = 2 a.c, zeta = 2 a.b.
struct NiggliState {
    basis: Matrix3<f64>,
    tmat: Matrix3<i32>,
    eps: f64,
    a: f64,
    b: f64,
    c: f64,
    xi: f64,
    eta: f64,
    zeta: f64,
    // eps-signs of xi, eta, zeta
    l: i32,
    m: i32,
    n: i32,
}

impl NiggliState {
    fn new(basis: Matrix3<f64>, eps: f64) -> Self {
        let mut state = Self {
            basis,
            tmat: Matrix3::identity(),
            eps,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            xi: 0.0,
            eta: 0.0,
            zeta: 0.0,
            l: 0,
            m: 0,
            n: 0,
        };
        state.refresh();
        state
    }

    fn refresh(&mut self) {
        let g = self.basis * self.basis.transpose();
        self.a = g[(0, 0)];
        self.b = g[(1, 1)];
        self.c = g[(2, 2)];
        self.xi = 2.0 * g[(1, 2)];
        self.eta = 2.0 * g[(0, 2)];
        self.zeta = 2.0 * g[(0, 1)];
        self.l = self.sign(self.xi);
        self.m = self.sign(self.eta);
        self.n = self.sign(self.zeta);
    }

    fn sign(&self, x: f64) -> i32 {
        if x < -self.eps {
            -1
        } else if x > self.eps {
            1
        } else {
            0
        }
    }

    /// Multiple of a basis vector to subtract so that the projection `2 u.v`
    /// drops to at most `|u|^2`. Never zero once a step decided to act.
    fn shear(two_dot: f64, norm2: f64) -> i32 {
        let k = (two_dot / (2.0 * norm2)).round() as i32;
        if k != 0 {
            k
        } else if two_dot > 0.0 {
            1
        } else {
            -1
        }
    }

    /// Applies `new_rows = op * rows`.
    fn apply(&mut self, op: Matrix3<i32>) {
        self.basis = linalg::to_real(&op) * self.basis;
        self.tmat = op * self.tmat;
        self.refresh();
    }

    // A1: order A <= B
    fn step1(&mut self) -> bool {
        let eps = self.eps;
        if self.a > self.b + eps
            || (!((self.a - self.b).abs() > eps) && self.xi.abs() > self.eta.abs() + eps)
        {
            self.apply(Matrix3::new(0, -1, 0, -1, 0, 0, 0, 0, -1));
            return true;
        }
        false
    }

    // A2: order B <= C
    fn step2(&mut self) -> bool {
        let eps = self.eps;
        if self.b > self.c + eps
            || (!((self.b - self.c).abs() > eps) && self.eta.abs() > self.zeta.abs() + eps)
        {
            self.apply(Matrix3::new(-1, 0, 0, 0, 0, -1, 0, -1, 0));
            return true;
        }
        false
    }

    // A3: all-acute cell, make xi, eta, zeta positive
    fn step3(&mut self) -> bool {
        if self.l * self.m * self.n != 1 {
            return false;
        }
        let i = if self.l == -1 { -1 } else { 1 };
        let j = if self.m == -1 { -1 } else { 1 };
        let k = if self.n == -1 { -1 } else { 1 };
        self.apply(Matrix3::from_diagonal(&Vector3::new(i, j, k)));
        true
    }

    // A4: all-obtuse cell, make xi, eta, zeta non-positive keeping det = +1
    fn step4(&mut self) -> bool {
        let lmn = self.l * self.m * self.n;
        if lmn != 0 && lmn != -1 {
            return false;
        }

        let mut signs = [1, 1, 1];
        let mut free = None;
        for (idx, s) in [self.l, self.m, self.n].into_iter().enumerate() {
            if s == 1 {
                signs[idx] = -1;
            } else if s == 0 {
                free = Some(idx);
            }
        }
        if signs[0] * signs[1] * signs[2] == -1 {
            match free {
                Some(idx) => signs[idx] = -1,
                None => return false,
            }
        }

        self.apply(Matrix3::from_diagonal(&Vector3::new(
            signs[0], signs[1], signs[2],
        )));
        true
    }

    // A5: c' = c - k b
    fn step5(&mut self) -> bool {
        let eps = self.eps;
        if self.xi.abs() > self.b + eps
            || (!((self.b - self.xi).abs() > eps) && 2.0 * self.eta < self.zeta - eps)
            || (!((self.b + self.xi).abs() > eps) && self.zeta < -eps)
        {
            let k = Self::shear(self.xi, self.b);
            self.apply(Matrix3::new(1, 0, 0, 0, 1, 0, 0, -k, 1));
            return true;
        }
        false
    }

    // A6: c' = c - k a
    fn step6(&mut self) -> bool {
        let eps = self.eps;
        if self.eta.abs() > self.a + eps
            || (!((self.a - self.eta).abs() > eps) && 2.0 * self.xi < self.zeta - eps)
            || (!((self.a + self.eta).abs() > eps) && self.zeta < -eps)
        {
            let k = Self::shear(self.eta, self.a);
            self.apply(Matrix3::new(1, 0, 0, 0, 1, 0, -k, 0, 1));
            return true;
        }
        false
    }

    // A7: b' = b - k a
    fn step7(&mut self) -> bool {
        let eps = self.eps;
        if self.zeta.abs() > self.a + eps
            || (!((self.a - self.zeta).abs() > eps) && 2.0 * self.xi < self.eta - eps)
            || (!((self.a + self.zeta).abs() > eps) && self.eta < -eps)
        {
            let k = Self::shear(self.zeta, self.a);
            self.apply(Matrix3::new(1, 0, 0, -k, 1, 0, 0, 0, 1));
            return true;
        }
        false
    }

    // A8: c' = c + a + b
    fn step8(&mut self) -> bool {
        let eps = self.eps;
        let sum = self.xi + self.eta + self.zeta + self.a + self.b;
        if sum < -eps || (!(sum.abs() > eps) && 2.0 * (self.a + self.eta) + self.zeta > eps) {
            self.apply(Matrix3::new(1, 0, 0, 0, 1, 0, 1, 1, 1));
            return true;
        }
        false
    }

    fn finish(self) -> ReducedLattice {
        let va: Vector3<f64> = self.basis.row(0).transpose();
        let vb: Vector3<f64> = self.basis.row(1).transpose();
        let vc: Vector3<f64> = self.basis.row(2).transpose();

        ReducedLattice {
            lengths: [va.norm(), vb.norm(), vc.norm()],
            angles: [
                linalg::angle_between(&vb, &vc),
                linalg::angle_between(&va, &vc),
                linalg::angle_between(&va, &vb),
            ],
            basis: self.basis,
            transform: self.tmat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_reduced_conditions(r: &ReducedLattice) {
        let g = r.metric_tensor();
        let tol = 1e-6 * g[(2, 2)];
        // A <= B <= C
        assert!(g[(0, 0)] <= g[(1, 1)] + tol);
        assert!(g[(1, 1)] <= g[(2, 2)] + tol);
        // |2 b.c| <= B, |2 a.c| <= A, |2 a.b| <= A
        assert!((2.0 * g[(1, 2)]).abs() <= g[(1, 1)] + tol);
        assert!((2.0 * g[(0, 2)]).abs() <= g[(0, 0)] + tol);
        assert!((2.0 * g[(0, 1)]).abs() <= g[(0, 0)] + tol);
    }

    fn reproduces_basis(r: &ReducedLattice, lattice: &LatticeRows) {
        let rebuilt = linalg::to_real(&r.transform) * linalg::lattice_matrix(lattice);
        assert!((rebuilt - r.basis).norm() < 1e-9);
        assert_eq!(linalg::int_determinant(&r.transform), 1);
    }

    #[test]
    fn cubic_is_already_reduced() {
        let lattice = [[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]];
        let r = niggli_reduce(&lattice).unwrap();
        for i in 0..3 {
            assert!((r.lengths[i] - 4.0).abs() < 1e-12);
            assert!((r.angles[i] - 90.0).abs() < 1e-9);
        }
        assert!((r.volume() - 64.0).abs() < 1e-9);
        reproduces_basis(&r, &lattice);
    }

    #[test]
    fn sheared_cubic_reduces_back() {
        // a, a + b, a + b + c of a 3 Å cube
        let lattice = [[3.0, 0.0, 0.0], [3.0, 3.0, 0.0], [3.0, 3.0, 3.0]];
        let r = niggli_reduce(&lattice).unwrap();
        for i in 0..3 {
            assert!((r.lengths[i] - 3.0).abs() < 1e-9);
            assert!((r.angles[i] - 90.0).abs() < 1e-7);
        }
        assert_reduced_conditions(&r);
        reproduces_basis(&r, &lattice);
    }

    #[test]
    fn fcc_primitive_cell() {
        // Conventional a = 4: primitive vectors of length 4/sqrt(2), 60 degrees apart
        let lattice = [[0.0, 2.0, 2.0], [2.0, 0.0, 2.0], [2.0, 2.0, 0.0]];
        let r = niggli_reduce(&lattice).unwrap();
        let expected = 8.0_f64.sqrt();
        for i in 0..3 {
            assert!((r.lengths[i] - expected).abs() < 1e-9);
            assert!((r.angles[i] - 60.0).abs() < 1e-7);
        }
        reproduces_basis(&r, &lattice);
    }

    #[test]
    fn long_skewed_triclinic() {
        let lattice = [[5.0, 0.0, 0.0], [12.0, 4.5, 0.0], [-7.0, 9.1, 6.2]];
        let r = niggli_reduce(&lattice).unwrap();
        assert_reduced_conditions(&r);
        reproduces_basis(&r, &lattice);

        let v_in = linalg::lattice_matrix(&lattice).determinant();
        assert!((r.volume() - v_in).abs() < 1e-8 * v_in.abs());
    }

    #[test]
    fn left_handed_input_keeps_handedness() {
        let lattice = [[0.0, 3.0, 0.0], [3.0, 0.0, 0.0], [1.0, 1.0, 5.0]];
        let r = niggli_reduce(&lattice).unwrap();
        assert!(r.volume() < 0.0);
        reproduces_basis(&r, &lattice);
    }

    #[test]
    fn large_shear_reduces_in_few_steps() {
        // a, 400 a + b, c of a 3 Å cube; one basis vector at a time would need 400 passes
        let lattice = [[3.0, 0.0, 0.0], [1200.0, 3.0, 0.0], [0.0, 0.0, 3.0]];
        let r = reduce_within(&lattice, 10).unwrap();
        for i in 0..3 {
            assert!((r.lengths[i] - 3.0).abs() < 1e-9);
            assert!((r.angles[i] - 90.0).abs() < 1e-7);
        }
        assert_reduced_conditions(&r);
        reproduces_basis(&r, &lattice);

        let mixed = [[3.0, 0.0, 0.0], [-750.0, 3.0, 0.0], [297.0, 2103.0, 3.0]];
        let r = niggli_reduce(&mixed).unwrap();
        assert_reduced_conditions(&r);
        reproduces_basis(&r, &mixed);
        assert!((r.volume() - 27.0).abs() < 1e-6);
    }

    #[test]
    fn exhausted_loop_budget_is_not_a_rejection() {
        let lattice = [[3.0, 0.0, 0.0], [3.0, 3.0, 0.0], [3.0, 3.0, 3.0]];
        let err = reduce_within(&lattice, 1).unwrap_err();
        assert_eq!(err, CompareError::NonConvergence { iterations: 1 });
        assert!(!err.is_invalid_input());

        assert!(reduce_within(&lattice, MAX_LOOPS).is_ok());
    }

    #[test]
    fn degenerate_lattice_is_rejected() {
        let lattice = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
        let err = niggli_reduce(&lattice).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(matches!(
            err,
            CompareError::InvalidInput(InputError::DegenerateLattice { .. })
        ));
    }

    #[test]
    fn reduced_fractional_coordinates() {
        let lattice = [[3.0, 0.0, 0.0], [3.0, 3.0, 0.0], [3.0, 3.0, 3.0]];
        let r = niggli_reduce(&lattice).unwrap();
        let frac = Vector3::new(0.1, 0.2, 0.3);
        let cart = linalg::lattice_matrix(&lattice).transpose() * frac;
        let reduced = r.to_reduced_fractional(&frac);
        let cart_back = r.basis.transpose() * reduced;
        assert!((cart - cart_back).norm() < 1e-10);
    }
}
