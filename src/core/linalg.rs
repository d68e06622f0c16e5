//! Small dense linear algebra used by the polynomial fits and geometry solvers
//!
//! Matrices are `ndarray` arrays. Routines with an `_inplace` suffix mutate
//! their argument; the others return a new array and leave the input alone.

use crate::types::{ComplexMatrix, RealMatrix, SarError, SarResult, Window};
use ndarray::{Array1, Array2, LinalgScalar};
use num_traits::Float;

/// Solve a 2x2 system with Cramer's rule.
///
/// A singular system is not detected: the result is non-finite.
pub fn solve22(a: &[[f64; 2]; 2], rhs: &[f64; 2]) -> [f64; 2] {
    let det = a[0][0] * a[1][1] - a[0][1] * a[1][0];
    [
        (rhs[0] * a[1][1] - a[0][1] * rhs[1]) / det,
        (a[0][0] * rhs[1] - rhs[0] * a[1][0]) / det,
    ]
}

/// Solve a 3x3 system with Cramer's rule.
///
/// Used for the corner-geometry systems of the orbit solvers; callers guard
/// against singular configurations.
pub fn solve33(a: &[[f64; 3]; 3], rhs: &[f64; 3]) -> [f64; 3] {
    let det3 = |m: &[[f64; 3]; 3]| {
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };

    let det = det3(a);
    let mut result = [0.0; 3];
    for (col, value) in result.iter_mut().enumerate() {
        let mut replaced = *a;
        for row in 0..3 {
            replaced[row][col] = rhs[row];
        }
        *value = det3(&replaced) / det;
    }
    result
}

fn require_square<T>(a: &Array2<T>, what: &str) -> SarResult<usize> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(SarError::DimensionMismatch(format!(
            "{} requires a square matrix, got {}x{}",
            what, rows, cols
        )));
    }
    Ok(rows)
}

/// Cholesky factorisation `A = L·Lᵗ` of a symmetric positive-definite matrix.
///
/// The lower triangle (diagonal included) is overwritten with `L`, the strict
/// upper triangle keeps the input values. Only the upper triangle of the input
/// is read.
pub fn chol_inplace(a: &mut RealMatrix) -> SarResult<()> {
    let n = require_square(a, "chol_inplace")?;

    for i in 0..n {
        for j in i..n {
            let mut sum = a[[i, j]];
            for k in (0..i).rev() {
                sum -= a[[i, k]] * a[[j, k]];
            }
            if i == j {
                if sum <= 0.0 {
                    log::error!("chol: matrix is not positive definite (pivot {} at row {})", sum, i);
                    return Err(SarError::NotPositiveDefinite { row: i, pivot: sum });
                }
                a[[i, i]] = sum.sqrt();
            } else {
                a[[j, i]] = sum / a[[i, i]];
            }
        }
    }
    Ok(())
}

/// Turn a Cholesky factor (as left by [`chol_inplace`]) into the lower
/// triangle of the inverse of the original matrix.
///
/// First `L` is inverted in place, then `A⁻¹ = L⁻ᵗ·L⁻¹` is accumulated into
/// the lower triangle. The upper triangle is left untouched; see
/// [`arrange_cholesky_inplace`].
pub fn invert_chol_inplace(f: &mut RealMatrix) -> SarResult<()> {
    let n = require_square(f, "invert_chol_inplace")?;

    // L⁻¹, column by column
    for i in 0..n {
        f[[i, i]] = 1.0 / f[[i, i]];
        for j in (i + 1)..n {
            let mut sum = 0.0;
            for k in i..j {
                sum -= f[[j, k]] * f[[k, i]];
            }
            f[[j, i]] = sum / f[[j, j]];
        }
    }

    // L⁻ᵗ·L⁻¹, lower triangle only
    for i in 0..n {
        for j in i..n {
            let mut sum = 0.0;
            for k in j..n {
                sum += f[[k, i]] * f[[k, j]];
            }
            f[[j, i]] = sum;
        }
    }
    Ok(())
}

/// Mirror the lower triangle into the upper triangle.
pub fn arrange_cholesky_inplace(m: &mut RealMatrix) -> SarResult<()> {
    let n = require_square(m, "arrange_cholesky_inplace")?;
    for i in 0..n {
        for j in (i + 1)..n {
            m[[i, j]] = m[[j, i]];
        }
    }
    Ok(())
}

/// Invert a symmetric positive-definite matrix in place via Cholesky.
pub fn invert_inplace(a: &mut RealMatrix) -> SarResult<()> {
    chol_inplace(a)?;
    invert_chol_inplace(a)?;
    arrange_cholesky_inplace(a)
}

/// Inverse of a symmetric positive-definite matrix via Cholesky.
pub fn invert(a: &RealMatrix) -> SarResult<RealMatrix> {
    let mut inverse = a.clone();
    invert_inplace(&mut inverse)?;
    Ok(inverse)
}

/// `Aᵗ·B`.
///
/// Complex input is transposed, never conjugated.
pub fn mat_t_x_mat<T: LinalgScalar>(a: &Array2<T>, b: &Array2<T>) -> SarResult<Array2<T>> {
    if a.nrows() != b.nrows() {
        return Err(SarError::DimensionMismatch(format!(
            "mat_t_x_mat: {}x{} and {}x{} do not share a row count",
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols()
        )));
    }
    Ok(a.t().dot(b))
}

/// `A^n` by repeated multiplication, `n >= 1`.
pub fn matrix_power<T: LinalgScalar>(a: &Array2<T>, n: u32) -> SarResult<Array2<T>> {
    require_square(a, "matrix_power")?;
    if n == 0 {
        return Err(SarError::InvalidArgument(
            "matrix_power: exponent must be at least 1".to_string(),
        ));
    }

    let mut result = a.to_owned();
    for _ in 1..n {
        result = result.dot(a);
    }
    Ok(result)
}

fn require_same_shape<A, B>(a: &Array2<A>, b: &Array2<B>, what: &str) -> SarResult<()> {
    if a.dim() != b.dim() {
        return Err(SarError::DimensionMismatch(format!(
            "{}: shapes {:?} and {:?} differ",
            what,
            a.dim(),
            b.dim()
        )));
    }
    Ok(())
}

/// Elementwise complex product
pub fn dotmult(a: &ComplexMatrix, b: &ComplexMatrix) -> SarResult<ComplexMatrix> {
    require_same_shape(a, b, "dotmult")?;
    Ok(a * b)
}

/// Elementwise complex product, stored in `a`
pub fn dotmult_inplace(a: &mut ComplexMatrix, b: &ComplexMatrix) -> SarResult<()> {
    require_same_shape(a, b, "dotmult_inplace")?;
    a.zip_mut_with(b, |x, &y| *x *= y);
    Ok(())
}

/// Elementwise absolute value
pub fn abs_matrix<F: Float>(a: &Array2<F>) -> Array2<F> {
    a.mapv(F::abs)
}

/// Reverse the column order
pub fn fliplr_inplace<T>(a: &mut Array2<T>) {
    let cols = a.ncols();
    for row in 0..a.nrows() {
        for col in 0..cols / 2 {
            a.swap([row, col], [row, cols - 1 - col]);
        }
    }
}

fn wrapped_shift(len: usize, n: isize) -> SarResult<usize> {
    if n.unsigned_abs() >= len.max(1) {
        return Err(SarError::InvalidArgument(format!(
            "wshift: shift {} out of range for vector of length {}",
            n, len
        )));
    }
    Ok(if n < 0 { (n + len as isize) as usize } else { n as usize })
}

/// Circular shift of a vector; a positive `n` shifts to the left, so element
/// `n` ends up at index 0.
pub fn wshift_inplace<T: Clone>(v: &mut Array1<T>, n: isize) -> SarResult<()> {
    let shift = wrapped_shift(v.len(), n)?;
    if shift == 0 {
        return Ok(());
    }
    let mut buffer = v.to_vec();
    buffer.rotate_left(shift);
    v.assign(&Array1::from(buffer));
    Ok(())
}

/// Circular shift of a vector, see [`wshift_inplace`]
pub fn wshift<T: Clone>(v: &Array1<T>, n: isize) -> SarResult<Array1<T>> {
    let mut shifted = v.clone();
    wshift_inplace(&mut shifted, n)?;
    Ok(shifted)
}

fn check_window_in<T>(m: &Array2<T>, win: &Window, what: &str) -> SarResult<()> {
    let fits = win.linelo() >= 0
        && win.pixlo() >= 0
        && (win.linehi() as usize) < m.nrows()
        && (win.pixhi() as usize) < m.ncols();
    if !fits {
        return Err(SarError::DimensionMismatch(format!(
            "{} window {} exceeds {}x{} matrix",
            what,
            win,
            m.nrows(),
            m.ncols()
        )));
    }
    Ok(())
}

/// Copy the block `in_win` of `input` into the block `out_win` of `out`.
///
/// Both windows must have the same extent and lie inside their matrices.
pub fn setdata<T: Clone>(
    out: &mut Array2<T>,
    out_win: &Window,
    input: &Array2<T>,
    in_win: &Window,
) -> SarResult<()> {
    if !out_win.same_extent(in_win) {
        return Err(SarError::DimensionMismatch(format!(
            "setdata: window {} and {} differ in extent",
            out_win, in_win
        )));
    }
    check_window_in(out, out_win, "output")?;
    check_window_in(input, in_win, "input")?;

    let (out_l0, out_p0) = (out_win.linelo() as usize, out_win.pixlo() as usize);
    let (in_l0, in_p0) = (in_win.linelo() as usize, in_win.pixlo() as usize);
    for l in 0..in_win.lines() {
        for p in 0..in_win.pixels() {
            out[[out_l0 + l, out_p0 + p]] = input[[in_l0 + l, in_p0 + p]].clone();
        }
    }
    Ok(())
}

/// Copy the block `in_win` of `input` into the top-left corner of `out`
pub fn setdata_origin<T: Clone>(
    out: &mut Array2<T>,
    input: &Array2<T>,
    in_win: &Window,
) -> SarResult<()> {
    let out_win = Window::new(0, in_win.lines() as i64 - 1, 0, in_win.pixels() as i64 - 1)?;
    setdata(out, &out_win, input, in_win)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use num_complex::Complex64;

    fn pascal3() -> RealMatrix {
        array![[1.0, 1.0, 1.0], [1.0, 2.0, 3.0], [1.0, 3.0, 6.0]]
    }

    #[test]
    fn test_solve22() {
        let x = solve22(&[[1.0, 1.0], [1.0, 2.0]], &[3.0, 1.0]);
        assert_abs_diff_eq!(x[0], 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(x[1], -2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve33() {
        let a = [[1.0, 1.0, 1.0], [1.0, 2.0, 3.0], [1.0, 3.0, 6.0]];
        let x = solve33(&a, &[3.0, 1.0, 4.0]);
        assert_abs_diff_eq!(x[0], 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(x[1], -12.0, epsilon = 1e-6);
        assert_abs_diff_eq!(x[2], 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_solve22_singular_is_not_finite() {
        let x = solve22(&[[1.0, 2.0], [2.0, 4.0]], &[1.0, 1.0]);
        assert!(!x[0].is_finite());
    }

    #[test]
    fn test_chol_factor_of_pascal() {
        let mut a = pascal3();
        chol_inplace(&mut a).unwrap();
        let expected_lower = array![[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 2.0, 1.0]];
        for i in 0..3 {
            for j in 0..=i {
                assert_abs_diff_eq!(a[[i, j]], expected_lower[[i, j]], epsilon = 1e-12);
            }
        }
        // upper triangle is left as it was
        assert_eq!(a[[1, 2]], 3.0);
    }

    #[test]
    fn test_invert_pascal() {
        let inverse = invert(&pascal3()).unwrap();
        let expected = array![[3.0, -3.0, 1.0], [-3.0, 5.0, -2.0], [1.0, -2.0, 1.0]];
        for (got, want) in inverse.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_invert_spd_gives_identity() {
        let a = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let inverse = invert(&a).unwrap();
        let product = a.dot(&inverse);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(product[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_chol_rejects_bad_input() {
        let mut not_square = RealMatrix::zeros((2, 3));
        assert!(matches!(
            chol_inplace(&mut not_square),
            Err(SarError::DimensionMismatch(_))
        ));

        let mut indefinite = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(matches!(
            chol_inplace(&mut indefinite),
            Err(SarError::NotPositiveDefinite { row: 1, .. })
        ));
    }

    #[test]
    fn test_mat_t_x_mat_does_not_conjugate() {
        let a = array![[Complex64::new(0.0, 1.0)], [Complex64::new(1.0, 0.0)]];
        let product = mat_t_x_mat(&a, &a).unwrap();
        // i*i + 1*1 = 0, whereas the Hermitian product would give 2
        assert_abs_diff_eq!(product[[0, 0]].re, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(product[[0, 0]].im, 0.0, epsilon = 1e-15);

        let r = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let rtr = mat_t_x_mat(&r, &r).unwrap();
        assert_eq!(rtr, array![[35.0, 44.0], [44.0, 56.0]]);
        assert!(mat_t_x_mat(&r, &RealMatrix::zeros((2, 2))).is_err());
    }

    #[test]
    fn test_matrix_power() {
        let a = array![[1.0, 1.0], [0.0, 1.0]];
        assert_eq!(matrix_power(&a, 1).unwrap(), a);
        assert_eq!(matrix_power(&a, 4).unwrap(), array![[1.0, 4.0], [0.0, 1.0]]);
        assert!(matrix_power(&a, 0).is_err());
    }

    #[test]
    fn test_dotmult() {
        let a = array![[Complex64::new(1.0, 1.0), Complex64::new(0.0, 2.0)]];
        let b = array![[Complex64::new(1.0, -1.0), Complex64::new(0.0, 1.0)]];
        let c = dotmult(&a, &b).unwrap();
        assert_eq!(c[[0, 0]], Complex64::new(2.0, 0.0));
        assert_eq!(c[[0, 1]], Complex64::new(-2.0, 0.0));

        let mut inplace = a.clone();
        dotmult_inplace(&mut inplace, &b).unwrap();
        assert_eq!(inplace, c);
        assert!(dotmult(&a, &ComplexMatrix::zeros((2, 2))).is_err());
    }

    #[test]
    fn test_abs_and_fliplr() {
        assert_eq!(abs_matrix(&array![[-1.5, 2.0]]), array![[1.5, 2.0]]);

        let mut m = array![[1, 2, 3], [4, 5, 6]];
        fliplr_inplace(&mut m);
        assert_eq!(m, array![[3, 2, 1], [6, 5, 4]]);
    }

    #[test]
    fn test_wshift() {
        let v = array![0, 1, 2, 3, 4];
        assert_eq!(wshift(&v, 2).unwrap(), array![2, 3, 4, 0, 1]);
        assert_eq!(wshift(&v, -1).unwrap(), array![4, 0, 1, 2, 3]);
        assert_eq!(wshift(&v, 0).unwrap(), v);
        assert!(wshift(&v, 5).is_err());

        let mut w = v.clone();
        wshift_inplace(&mut w, 3).unwrap();
        wshift_inplace(&mut w, -3).unwrap();
        assert_eq!(w, v);
    }

    #[test]
    fn test_setdata_copies_block() {
        let input = Array2::from_shape_fn((4, 5), |(l, p)| (10 * l + p) as f64);
        let mut out = RealMatrix::zeros((3, 3));
        let in_win = Window::new(1, 2, 2, 4).unwrap();
        let out_win = Window::new(1, 2, 0, 2).unwrap();
        setdata(&mut out, &out_win, &input, &in_win).unwrap();

        assert_eq!(out.row(0).to_vec(), vec![0.0, 0.0, 0.0]);
        assert_eq!(out.row(1).to_vec(), vec![12.0, 13.0, 14.0]);
        assert_eq!(out.row(2).to_vec(), vec![22.0, 23.0, 24.0]);
    }

    #[test]
    fn test_setdata_complex_and_origin() {
        let input = Array2::from_shape_fn((3, 3), |(l, p)| Complex64::new(l as f64, p as f64));
        let mut out = ComplexMatrix::zeros((2, 2));
        setdata_origin(&mut out, &input, &Window::new(1, 2, 1, 2).unwrap()).unwrap();
        assert_eq!(out[[0, 0]], Complex64::new(1.0, 1.0));
        assert_eq!(out[[1, 1]], Complex64::new(2.0, 2.0));
    }

    #[test]
    fn test_setdata_rejects_mismatch() {
        let input = RealMatrix::zeros((4, 4));
        let mut out = RealMatrix::zeros((4, 4));
        let a = Window::new(0, 1, 0, 1).unwrap();
        let b = Window::new(0, 2, 0, 1).unwrap();
        assert!(matches!(
            setdata(&mut out, &a, &input, &b),
            Err(SarError::DimensionMismatch(_))
        ));

        let outside = Window::new(3, 4, 0, 1).unwrap();
        assert!(setdata(&mut out, &a, &input, &outside).is_err());
    }
}
