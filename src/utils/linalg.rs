// src/utils/linalg.rs

use nalgebra::{Matrix3, Vector3};

/// Lattice vectors as rows: [[ax, ay, az], [bx, by, bz], [cx, cy, cz]]
pub type LatticeRows = [[f64; 3]; 3];

/// Builds the row matrix of a lattice (row i = basis vector i).
pub fn lattice_matrix(lattice: &LatticeRows) -> Matrix3<f64> {
    Matrix3::from_row_slice(&[
        lattice[0][0],
        lattice[0][1],
        lattice[0][2],
        lattice[1][0],
        lattice[1][1],
        lattice[1][2],
        lattice[2][0],
        lattice[2][1],
        lattice[2][2],
    ])
}

pub fn lattice_rows(m: &Matrix3<f64>) -> LatticeRows {
    [
        [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
        [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
    ]
}

/// Convert Cartesian coordinates to fractional using lattice matrix
///
/// Returns None if the lattice is singular.
///
/// # Formula
/// ```text
/// Fractional = (Lattice^T)^-1 × Cartesian
/// ```
pub fn cart_to_frac(cart: [f64; 3], lattice: &LatticeRows) -> Option<[f64; 3]> {
    let inv_lat = lattice_matrix(lattice).transpose().try_inverse()?;
    let frac_vec = inv_lat * Vector3::from(cart);

    Some([frac_vec.x, frac_vec.y, frac_vec.z])
}

/// Wraps one fractional coordinate into [0, 1), snapping values within 1e-12 of
/// either boundary to exactly 0.
pub fn wrap_fractional(x: f64) -> f64 {
    let mut wrapped = x - x.floor();
    if wrapped >= 1.0 {
        wrapped -= 1.0;
    }
    if wrapped < 0.0 {
        wrapped += 1.0;
    }
    if wrapped.abs() < 1.0e-12 || (1.0 - wrapped).abs() < 1.0e-12 {
        0.0
    } else {
        wrapped
    }
}

pub fn wrap_vector(v: Vector3<f64>) -> Vector3<f64> {
    v.map(wrap_fractional)
}

/// Difference of two fractional vectors folded into [-0.5, 0.5].
pub fn nearest_image_delta(v: Vector3<f64>) -> Vector3<f64> {
    v.map(|x| x - x.round())
}

pub fn int_determinant(m: &Matrix3<i32>) -> i32 {
    m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
        - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
        + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
}

/// Inverse of an integer matrix with determinant ±1 (adjugate times determinant).
pub fn unimodular_inverse(m: &Matrix3<i32>) -> Matrix3<i32> {
    let det = int_determinant(m);
    debug_assert!(det.abs() == 1, "matrix is not unimodular (det = {})", det);

    let cof = |r0: usize, r1: usize, c0: usize, c1: usize| {
        m[(r0, c0)] * m[(r1, c1)] - m[(r0, c1)] * m[(r1, c0)]
    };

    let adj = Matrix3::new(
        cof(1, 2, 1, 2),
        -cof(0, 2, 1, 2),
        cof(0, 1, 1, 2),
        -cof(1, 2, 0, 2),
        cof(0, 2, 0, 2),
        -cof(0, 1, 0, 2),
        cof(1, 2, 0, 1),
        -cof(0, 2, 0, 1),
        cof(0, 1, 0, 1),
    );

    adj * det
}

pub fn to_real(m: &Matrix3<i32>) -> Matrix3<f64> {
    m.map(|x| x as f64)
}

/// Angle between two vectors in degrees. The cosine is clamped so the result
/// always lies in [0, 180].
pub fn angle_between(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    let denom = u.norm() * v.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (u.dot(v) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_to_frac() {
        // Non-orthogonal lattice
        let lattice = [[4.0, 0.0, 0.0], [2.0, 3.46, 0.0], [0.0, 0.0, 5.0]];

        // 0.5 a + 0.5 b + 0.2 c
        let frac = cart_to_frac([3.0, 1.73, 1.0], &lattice).unwrap();

        for (got, want) in frac.iter().zip([0.5, 0.5, 0.2]) {
            assert!((got - want).abs() < 1e-10);
        }
    }

    #[test]
    fn test_singular_lattice() {
        let lattice = [[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(cart_to_frac([1.0, 1.0, 1.0], &lattice).is_none());
    }

    #[test]
    fn test_wrap_fractional() {
        assert_eq!(wrap_fractional(1.0), 0.0);
        assert_eq!(wrap_fractional(-1.0e-14), 0.0);
        assert!((wrap_fractional(-0.25) - 0.75).abs() < 1e-12);
        assert!((wrap_fractional(2.4) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_unimodular_inverse() {
        let m = Matrix3::new(1, 1, 0, 0, 1, 0, 1, 1, 1);
        let inv = unimodular_inverse(&m);
        assert_eq!(m * inv, Matrix3::identity());

        let flip = Matrix3::new(0, 1, 0, 1, 0, 0, 0, 0, 1);
        assert_eq!(int_determinant(&flip), -1);
        assert_eq!(flip * unimodular_inverse(&flip), Matrix3::identity());
    }

    #[test]
    fn test_angle_between() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 2.0, 0.0);
        let d = Vector3::new(-1.0, 1.0e-17, 0.0);
        assert!((angle_between(&x, &y) - 90.0).abs() < 1e-12);
        assert!((angle_between(&x, &d) - 180.0).abs() < 1e-6);
    }
}
