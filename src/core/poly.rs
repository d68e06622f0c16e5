//! Polynomial models for orbit, baseline and co-registration offsets
//!
//! 1D coefficient vectors are lowest order first (`c0 + c1·x + c2·x² + ...`).
//! Bivariate coefficients enumerate the terms of total degree `l = 0..=d`
//! as `x^(l-k)·y^k` for `k = 0..=l`, i.e. `1, x, y, x², xy, y², x³, ...`.

use crate::core::linalg::{invert, mat_t_x_mat};
use crate::types::{RealMatrix, RealVector, SarError, SarResult, Window};
use ndarray::Array2;

/// Deviation of `N·N⁻¹` from identity above which a fit is flagged unstable
const MAX_INVERSION_DEVIATION: f64 = 1e-6;

/// Residual above which a fit is reported as a poor approximation
const MAX_FIT_RESIDUAL: f64 = 0.02;

/// Number of coefficients of a bivariate polynomial of total degree `degree`
pub fn number_of_coefficients(degree: usize) -> usize {
    (degree + 1) * (degree + 2) / 2
}

/// Total degree of a bivariate polynomial with `num_coefficients` terms
pub fn degree_from_coefficients(num_coefficients: usize) -> SarResult<usize> {
    let discriminant = num_coefficients
        .checked_mul(8)
        .and_then(|v| v.checked_add(1))
        .ok_or_else(|| {
            SarError::InvalidArgument(format!(
                "{} coefficients exceed any representable polynomial degree",
                num_coefficients
            ))
        })?;
    let root = (discriminant as f64).sqrt() as usize;
    let degree = ((root.saturating_sub(1)) / 2).saturating_sub(1);
    if num_coefficients == 0 || number_of_coefficients(degree) != num_coefficients {
        return Err(SarError::InvalidArgument(format!(
            "{} is not the coefficient count of a bivariate polynomial",
            num_coefficients
        )));
    }
    Ok(degree)
}

/// Map `x` from `[min, max]` onto `[-2, 2]`
pub fn normalize2(x: f64, min: f64, max: f64) -> f64 {
    (x - 0.5 * (min + max)) / (0.25 * (max - min))
}

/// Centre a time axis on its middle sample and scale it down by ten.
///
/// This is the normalisation used for orbit state-vector times.
pub fn normalize(t: &RealVector) -> SarResult<RealVector> {
    if t.is_empty() {
        return Err(SarError::InvalidArgument(
            "Cannot normalize an empty time axis".to_string(),
        ));
    }
    let centre = t[t.len() / 2];
    Ok(t.mapv(|v| (v - centre) / 10.0))
}

fn check_fit_input(x: &RealVector, y: &RealVector, num_coefficients: usize) -> SarResult<()> {
    if x.len() != y.len() {
        return Err(SarError::DimensionMismatch(format!(
            "polyfit: require same size vectors ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if num_coefficients == 0 {
        return Err(SarError::InvalidArgument(
            "polyfit: at least one coefficient is required".to_string(),
        ));
    }
    if x.len() < num_coefficients {
        return Err(SarError::InvalidArgument(format!(
            "polyfit: {} points cannot determine {} coefficients",
            x.len(),
            num_coefficients
        )));
    }
    Ok(())
}

/// Solve the normal equations of a design matrix with the Cholesky inverse
/// and report the conditioning and residuals of the fit.
fn solve_least_squares(design: &RealMatrix, observations: &RealVector, what: &str) -> SarResult<RealVector> {
    let n = design.ncols();
    let normal = mat_t_x_mat(design, design)?;
    let rhs = design.t().dot(observations);
    let normal_inverse = invert(&normal)?;
    let coefficients = normal_inverse.dot(&rhs);

    let deviation = (normal.dot(&normal_inverse) - Array2::<f64>::eye(n))
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    log::debug!("{}: max(abs(N*inv(N)-I)) = {}", what, deviation);
    if deviation > MAX_INVERSION_DEVIATION {
        log::warn!("{}: max(abs(N*inv(N)-I)) = {}, fit is unstable", what, deviation);
    }

    let residual = (observations - &design.dot(&coefficients))
        .iter()
        .fold(0.0f64, |acc, v| acc.max(v.abs()));
    if residual > MAX_FIT_RESIDUAL {
        log::warn!("{}: max approximation error at data points {}", what, residual);
    } else {
        log::debug!("{}: max approximation error at data points {}", what, residual);
    }

    Ok(coefficients)
}

/// Least-squares fit of `y ≈ Σ c_i·x^i` for `i < num_coefficients`.
///
/// Coefficients are returned in the domain of `x`, lowest order first.
pub fn poly_fit(x: &RealVector, y: &RealVector, num_coefficients: usize) -> SarResult<RealVector> {
    check_fit_input(x, y, num_coefficients)?;
    log::debug!(
        "polyfit: {} coefficients from {} data points",
        num_coefficients,
        x.len()
    );

    let design = Array2::from_shape_fn((x.len(), num_coefficients), |(i, j)| x[i].powi(j as i32));
    solve_least_squares(&design, y, "polyfit")
}

/// Least-squares fit on `normalize2(x, min(x), max(x))`.
///
/// The coefficients stay in the normalised domain: query points must be
/// normalised with the same bounds before evaluation.
pub fn poly_fit_normalized(x: &RealVector, y: &RealVector, num_coefficients: usize) -> SarResult<RealVector> {
    check_fit_input(x, y, num_coefficients)?;
    let min = x.iter().copied().fold(f64::INFINITY, f64::min);
    let max = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return Err(SarError::InvalidArgument(
            "polyfit: cannot normalize a constant abscissa".to_string(),
        ));
    }
    let normalized = x.mapv(|v| normalize2(v, min, max));
    poly_fit(&normalized, y, num_coefficients)
}

/// Least-squares fit of a bivariate polynomial `z ≈ p(x, y)` of total
/// degree `degree`, coefficients in the triangular term order.
pub fn poly_fit_2d(x: &RealVector, y: &RealVector, z: &RealVector, degree: usize) -> SarResult<RealVector> {
    if x.len() != y.len() {
        return Err(SarError::DimensionMismatch(format!(
            "polyfit2d: require same size vectors ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    let num_coefficients = number_of_coefficients(degree);
    check_fit_input(x, z, num_coefficients)?;

    let mut design = RealMatrix::zeros((x.len(), num_coefficients));
    for (i, mut row) in design.rows_mut().into_iter().enumerate() {
        let terms = bivariate_terms(x[i], y[i], degree);
        row.assign(&RealVector::from(terms));
    }
    solve_least_squares(&design, z, "polyfit2d")
}

/// Horner evaluation of a 1D polynomial, lowest order coefficient first
pub fn poly_val_1d(x: f64, coeffs: &[f64]) -> f64 {
    coeffs.iter().rev().fold(0.0, |sum, c| sum * x + c)
}

fn powers(v: f64, degree: usize) -> Vec<f64> {
    let mut p = Vec::with_capacity(degree + 1);
    let mut acc = 1.0;
    for _ in 0..=degree {
        p.push(acc);
        acc *= v;
    }
    p
}

/// Values of every bivariate term at `(x, y)`, in coefficient order
fn bivariate_terms(x: f64, y: f64, degree: usize) -> Vec<f64> {
    let (xp, yp) = (powers(x, degree), powers(y, degree));
    let mut terms = Vec::with_capacity(number_of_coefficients(degree));
    for l in 0..=degree {
        for k in 0..=l {
            terms.push(xp[l - k] * yp[k]);
        }
    }
    terms
}

fn sum_terms(xp: &[f64], yp: &[f64], coeffs: &[f64], degree: usize) -> f64 {
    let mut sum = 0.0;
    let mut index = 0;
    for l in 0..=degree {
        for k in 0..=l {
            sum += coeffs[index] * xp[l - k] * yp[k];
            index += 1;
        }
    }
    sum
}

fn check_coefficients(coeffs: &[f64], degree: usize) -> SarResult<()> {
    let required = number_of_coefficients(degree);
    if coeffs.len() < required {
        return Err(SarError::DimensionMismatch(format!(
            "polyval: degree {} needs {} coefficients, got {}",
            degree,
            required,
            coeffs.len()
        )));
    }
    Ok(())
}

/// Evaluate a bivariate polynomial of total degree `degree` at `(x, y)`
pub fn polyval(x: f64, y: f64, coeffs: &[f64], degree: usize) -> SarResult<f64> {
    check_coefficients(coeffs, degree)?;
    Ok(sum_terms(&powers(x, degree), &powers(y, degree), coeffs, degree))
}

/// Evaluate a bivariate polynomial on the grid `xs × ys`.
///
/// Element `(i, j)` is `polyval(xs[i], ys[j], ...)`, bit for bit.
pub fn polyval_grid(xs: &[f64], ys: &[f64], coeffs: &[f64], degree: usize) -> SarResult<RealMatrix> {
    check_coefficients(coeffs, degree)?;

    let x_powers: Vec<Vec<f64>> = xs.iter().map(|&x| powers(x, degree)).collect();
    let y_powers: Vec<Vec<f64>> = ys.iter().map(|&y| powers(y, degree)).collect();
    Ok(Array2::from_shape_fn((xs.len(), ys.len()), |(i, j)| {
        sum_terms(&x_powers[i], &y_powers[j], coeffs, degree)
    }))
}

/// Half-up rounding
fn round_half_up(v: f32) -> f32 {
    (v + 0.5).floor()
}

/// Spread `num_points` (line, pixel) positions evenly over `window`.
///
/// The window is cut into a near-square lattice whose line count follows the
/// window aspect ratio, rounded half-up; pixel positions are stepped uniformly over the
/// lattice rows laid end to end. Single precision keeps the positions
/// identical to the established co-registration grids.
pub fn distribute_points(num_points: usize, window: &Window) -> Vec<[i64; 2]> {
    if num_points == 0 {
        return Vec::new();
    }
    if num_points == 1 {
        return vec![[
            window.linelo() + window.lines() as i64 / 2,
            window.pixlo() + window.pixels() as i64 / 2,
        ]];
    }

    let lines = window.lines() as f32;
    let pixels = window.pixels() as f32;
    let n = num_points as f32;

    // windows in pixel direction, then line direction
    let windows_pixel = (n / (lines / pixels)).sqrt();
    let windows_line = (n / windows_pixel).max(windows_pixel);

    let windows_line = (round_half_up(windows_line) as i64).max(1);
    let delta_line = if windows_line > 1 {
        (lines - 1.0) / (windows_line - 1) as f32
    } else {
        0.0
    };
    let total_pixels = pixels * windows_line as f32;
    let delta_pixel = (total_pixels - 1.0) / (n - 1.0);

    let mut points = Vec::with_capacity(num_points);
    let mut p = -delta_pixel;
    let mut line_count = 0i64;
    for _ in 0..num_points {
        p += delta_pixel;
        while round_half_up(p) >= pixels {
            p -= pixels;
            line_count += 1;
        }
        let l = line_count as f32 * delta_line;
        points.push([
            window.linelo() + round_half_up(l) as i64,
            window.pixlo() + round_half_up(p) as i64,
        ]);
    }

    log::debug!("Distributed {} points over window {}", num_points, window);
    points
}
