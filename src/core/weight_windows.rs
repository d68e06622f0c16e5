//! Apodization windows for range/azimuth spectral filtering

use crate::types::{RealVector, SarError, SarResult};
use ndarray::{Array, Dimension};
use std::f64::consts::PI;

/// Coefficient of the classical Hamming window
pub const HAMMING_COEFFICIENT: f64 = 0.46;

/// Unit rectangle: 1 where `|x| <= 1`, 0 elsewhere
pub fn rect<D: Dimension>(axis: &Array<f64, D>) -> Array<f64, D> {
    axis.mapv(|x| if x.abs() <= 1.0 { 1.0 } else { 0.0 })
}

fn check_spectral_params<D: Dimension>(axis: &Array<f64, D>, br: f64, fs: f64, alpha: f64) -> SarResult<()> {
    if !(0.0..=1.0).contains(&alpha) {
        return Err(SarError::InvalidArgument(format!(
            "Hamming roll-off alpha must lie in [0, 1], got {}",
            alpha
        )));
    }
    if br <= 0.0 {
        return Err(SarError::InvalidArgument(format!(
            "Hamming bandwidth must be positive, got {}",
            br
        )));
    }
    if axis.iter().any(|f| f.abs() > fs / 2.0) {
        log::warn!("Frequency axis exceeds the sampled band [-{}, {}]", fs / 2.0, fs / 2.0);
    }
    Ok(())
}

/// Raised-cosine spectral weighting over bandwidth `br` sampled at `fs`.
///
/// Flat (1) for `|f| <= br/2·(1-alpha)`, a cosine taper of width `alpha·br`
/// across the band edge and 0 beyond `br/2·(1+alpha)`.
///
/// `alpha` is a roll-off here: 0 is a rectangle, 1 the widest taper. This is
/// not the generalized Hamming `alpha + (1-alpha)·cos(2πf/br)` of range
/// filtering, where `alpha = 1` means no weighting and 0.75 is customary.
pub fn hamming<D: Dimension>(axis: &Array<f64, D>, br: f64, fs: f64, alpha: f64) -> SarResult<Array<f64, D>> {
    check_spectral_params(axis, br, fs, alpha)?;

    let pass = 0.5 * br * (1.0 - alpha);
    let stop = 0.5 * br * (1.0 + alpha);
    let taper = alpha * br;

    Ok(axis.mapv(|f| {
        let f = f.abs();
        if f <= pass {
            1.0
        } else if f <= stop {
            0.5 * (1.0 + (PI * (f - pass) / taper).cos())
        } else {
            0.0
        }
    }))
}

/// Classical `n`-point Hamming window, `w[k] = (1-a) - a·cos(2πk/(n-1))`
pub fn hamming_window(n: usize) -> RealVector {
    if n == 1 {
        return RealVector::from_elem(1, 1.0);
    }
    let a = HAMMING_COEFFICIENT;
    let denominator = (n - 1) as f64;
    RealVector::from_shape_fn(n, |k| (1.0 - a) - a * (2.0 * PI * k as f64 / denominator).cos())
}

/// Elementwise reciprocal of a weighting window; zeros stay zero
pub fn inverse_hamming_window<D: Dimension>(window: &Array<f64, D>) -> Array<f64, D> {
    window.mapv(|w| if w == 0.0 { 0.0 } else { 1.0 / w })
}

/// Reciprocal of [`hamming`], used to undo an applied weighting
pub fn inverse_hamming<D: Dimension>(axis: &Array<f64, D>, br: f64, fs: f64, alpha: f64) -> SarResult<Array<f64, D>> {
    Ok(inverse_hamming_window(&hamming(axis, br, fs, alpha)?))
}
