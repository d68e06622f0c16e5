//! Interferometric signal processing on complex SAR tiles
//!
//! Spectral oversampling for co-registration, interferogram formation,
//! coherence estimation and the usual detected products.

use crate::core::spectral::{fft_inplace, invfft_inplace, FftDim};
use crate::types::{ComplexMatrix, RealMatrix, SarComplex, SarError, SarResult};
use ndarray::{Array2, Axis, Slice};
use num_traits::Zero;
use std::ops::MulAssign;

fn require_same_shape(master: &ComplexMatrix, slave: &ComplexMatrix, what: &str) -> SarResult<()> {
    if master.dim() != slave.dim() {
        return Err(SarError::DimensionMismatch(format!(
            "{}: master {:?} and slave {:?} differ in shape",
            what,
            master.dim(),
            slave.dim()
        )));
    }
    Ok(())
}

/// Insert zeros in the middle of a spectrum along `axis`.
///
/// Positive frequencies stay at the start, negative frequencies move to the
/// end of the longer axis. For even lengths the Nyquist bin is shared by both
/// halves with half its weight each.
fn zero_pad_spectrum<T>(spectrum: &Array2<T>, axis: Axis, factor: usize) -> Array2<T>
where
    T: Clone + Zero + MulAssign<f64>,
{
    let n = spectrum.len_of(axis);
    let n_out = n * factor;
    let half = n / 2;
    let even = n % 2 == 0;

    let mut shape = spectrum.raw_dim();
    shape[axis.index()] = n_out;
    let mut padded = Array2::<T>::zeros(shape);

    // bins 0..=half, Nyquist included for even lengths
    let low = half + 1;
    let high = if even { half } else { n - low };
    padded
        .slice_axis_mut(axis, Slice::from(0..low))
        .assign(&spectrum.slice_axis(axis, Slice::from(0..low)));
    padded
        .slice_axis_mut(axis, Slice::from(n_out - high..n_out))
        .assign(&spectrum.slice_axis(axis, Slice::from(n - high..n)));

    if even && n > 1 {
        for index in [half, n_out - half] {
            padded
                .index_axis_mut(axis, index)
                .mapv_inplace(|mut v| {
                    v *= 0.5;
                    v
                });
        }
    }
    padded
}

/// Oversample a complex tile by spectral zero padding.
///
/// The spectrum is zero-padded around its centre along every axis with a
/// factor above one, transformed back, and rescaled by `fac_az·fac_rg` so
/// amplitudes are preserved. The output has shape
/// `(rows·fac_az, cols·fac_rg)` and passes through the input samples at
/// every `(fac_az·i, fac_rg·j)`.
pub fn oversample(cplx: &ComplexMatrix, fac_az: usize, fac_rg: usize) -> SarResult<ComplexMatrix> {
    if fac_az == 0 || fac_rg == 0 {
        return Err(SarError::InvalidArgument(format!(
            "Oversampling factors must be positive, got {}x{}",
            fac_az, fac_rg
        )));
    }
    if cplx.is_empty() {
        return Err(SarError::InvalidArgument(
            "Cannot oversample an empty matrix".to_string(),
        ));
    }
    if fac_az == 1 && fac_rg == 1 {
        return Ok(cplx.clone());
    }

    log::debug!(
        "Oversampling {}x{} tile by {}x{}",
        cplx.nrows(),
        cplx.ncols(),
        fac_az,
        fac_rg
    );

    let steps = [(FftDim::Azimuth, Axis(0), fac_az), (FftDim::Range, Axis(1), fac_rg)];

    let mut data = cplx.clone();
    for &(dim, axis, factor) in &steps {
        if factor > 1 {
            fft_inplace(&mut data, dim);
            data = zero_pad_spectrum(&data, axis, factor);
            invfft_inplace(&mut data, dim);
        }
    }

    let scale = (fac_az * fac_rg) as f64;
    data.mapv_inplace(|v| v * scale);
    Ok(data)
}

/// Complex interferogram `master·conj(slave)`
pub fn compute_ifg(master: &ComplexMatrix, slave: &ComplexMatrix) -> SarResult<ComplexMatrix> {
    require_same_shape(master, slave, "compute_ifg")?;
    let mut ifg = master.clone();
    ifg.zip_mut_with(slave, |m, s| *m *= s.conj());
    Ok(ifg)
}

/// Interferogram of both inputs after oversampling by `ovs_az x ovs_rg`
pub fn compute_ifg_oversampled(
    master: &ComplexMatrix,
    slave: &ComplexMatrix,
    ovs_az: usize,
    ovs_rg: usize,
) -> SarResult<ComplexMatrix> {
    require_same_shape(master, slave, "compute_ifg_oversampled")?;
    let master_ovs = oversample(master, ovs_az, ovs_rg)?;
    let slave_ovs = oversample(slave, ovs_az, ovs_rg)?;
    compute_ifg(&master_ovs, &slave_ovs)
}

/// `|Σ m·s*| / sqrt(Σ|m|²·Σ|s|²)` limited to [0, 1]; zero power gives 0
fn normalized_coherence(cross: SarComplex, power_master: f64, power_slave: f64) -> f64 {
    let denominator = (power_master * power_slave).sqrt();
    if denominator > 0.0 {
        (cross.norm() / denominator).min(1.0)
    } else {
        0.0
    }
}

fn coherence_output_shape(
    rows: usize,
    cols: usize,
    win_az: usize,
    win_rg: usize,
) -> SarResult<(usize, usize)> {
    if win_az == 0 || win_rg == 0 {
        return Err(SarError::InvalidArgument(format!(
            "Coherence window must be positive, got {}x{}",
            win_az, win_rg
        )));
    }
    let shape = (rows / win_az, cols / win_rg);
    if shape.0 == 0 || shape.1 == 0 {
        return Err(SarError::Processing(format!(
            "Coherence window {}x{} too large for {}x{} input",
            win_az, win_rg, rows, cols
        )));
    }
    Ok(shape)
}

/// Coherence over disjoint `win_az x win_rg` blocks.
///
/// Cross product and both powers are accumulated sample by sample inside
/// each block. Output shape is `(rows / win_az, cols / win_rg)`.
pub fn coherence(
    master: &ComplexMatrix,
    slave: &ComplexMatrix,
    win_az: usize,
    win_rg: usize,
) -> SarResult<RealMatrix> {
    require_same_shape(master, slave, "coherence")?;
    let (out_rows, out_cols) = coherence_output_shape(master.nrows(), master.ncols(), win_az, win_rg)?;

    let mut result = RealMatrix::zeros((out_rows, out_cols));
    for i in 0..out_rows {
        for j in 0..out_cols {
            let mut cross = SarComplex::new(0.0, 0.0);
            let mut power_master = 0.0;
            let mut power_slave = 0.0;
            for l in i * win_az..(i + 1) * win_az {
                for p in j * win_rg..(j + 1) * win_rg {
                    let m = master[[l, p]];
                    let s = slave[[l, p]];
                    cross += m * s.conj();
                    power_master += m.norm_sqr();
                    power_slave += s.norm_sqr();
                }
            }
            result[[i, j]] = normalized_coherence(cross, power_master, power_slave);
        }
    }
    Ok(result)
}

/// Interferogram and packed powers of a master/slave pair.
///
/// Returns `(master·conj(slave), |slave|² + j·|master|²)`, the layout
/// consumed by [`moving_window_coherence`].
pub fn coherence_products(
    master: &ComplexMatrix,
    slave: &ComplexMatrix,
) -> SarResult<(ComplexMatrix, ComplexMatrix)> {
    let ifg = compute_ifg(master, slave)?;
    let mut norms = ComplexMatrix::zeros(master.raw_dim());
    ndarray::Zip::from(&mut norms)
        .and(master)
        .and(slave)
        .for_each(|n, m, s| *n = SarComplex::new(s.norm_sqr(), m.norm_sqr()));
    Ok((ifg, norms))
}

/// Coherence over disjoint blocks, estimated from precomputed products.
///
/// The interferogram and power arrays are formed first, then each block is
/// reduced column by column. Same output shape as [`coherence`]; the
/// different summation order makes the two numerically distinct.
pub fn coherence2(
    master: &ComplexMatrix,
    slave: &ComplexMatrix,
    win_az: usize,
    win_rg: usize,
) -> SarResult<RealMatrix> {
    require_same_shape(master, slave, "coherence2")?;
    let (out_rows, out_cols) = coherence_output_shape(master.nrows(), master.ncols(), win_az, win_rg)?;
    let (ifg, norms) = coherence_products(master, slave)?;

    let used_cols = out_cols * win_rg;
    let mut column_ifg = vec![SarComplex::new(0.0, 0.0); used_cols];
    let mut column_norms = vec![SarComplex::new(0.0, 0.0); used_cols];
    let mut result = RealMatrix::zeros((out_rows, out_cols));

    for i in 0..out_rows {
        for p in 0..used_cols {
            column_ifg[p] = SarComplex::new(0.0, 0.0);
            column_norms[p] = SarComplex::new(0.0, 0.0);
            for l in i * win_az..(i + 1) * win_az {
                column_ifg[p] += ifg[[l, p]];
                column_norms[p] += norms[[l, p]];
            }
        }
        for j in 0..out_cols {
            let block = j * win_rg..(j + 1) * win_rg;
            let cross: SarComplex = column_ifg[block.clone()].iter().sum();
            let power: SarComplex = column_norms[block].iter().sum();
            result[[i, j]] = normalized_coherence(cross, power.im, power.re);
        }
    }
    Ok(result)
}

/// Sliding-window coherence over precomputed products.
///
/// `ifg` and `norms` are laid out as returned by [`coherence_products`].
/// Every output sample covers the `win_az x win_rg` window starting at the
/// same position, so the output has shape
/// `(rows - win_az + 1, cols - win_rg + 1)`. Tiles extended by
/// `(win - 1) / 2` samples on each side therefore yield one value per
/// original sample.
pub fn moving_window_coherence(
    ifg: &ComplexMatrix,
    norms: &ComplexMatrix,
    win_az: usize,
    win_rg: usize,
) -> SarResult<RealMatrix> {
    require_same_shape(ifg, norms, "moving_window_coherence")?;
    let (rows, cols) = ifg.dim();
    if win_az == 0 || win_rg == 0 || win_az > rows || win_rg > cols {
        return Err(SarError::InvalidArgument(format!(
            "Coherence window {}x{} does not fit a {}x{} tile",
            win_az, win_rg, rows, cols
        )));
    }

    let out_rows = rows - win_az + 1;
    let out_cols = cols - win_rg + 1;
    let mut column_ifg = vec![SarComplex::new(0.0, 0.0); cols];
    let mut column_norms = vec![SarComplex::new(0.0, 0.0); cols];
    let mut result = RealMatrix::zeros((out_rows, out_cols));

    for i in 0..out_rows {
        for p in 0..cols {
            let lines = Slice::from(i..i + win_az);
            column_ifg[p] = ifg.column(p).slice_axis(Axis(0), lines).sum();
            column_norms[p] = norms.column(p).slice_axis(Axis(0), lines).sum();
        }
        for j in 0..out_cols {
            let cross: SarComplex = column_ifg[j..j + win_rg].iter().sum();
            let power: SarComplex = column_norms[j..j + win_rg].iter().sum();
            result[[i, j]] = normalized_coherence(cross, power.im, power.re);
        }
    }
    Ok(result)
}

/// Coherence of two detected (real-valued) sample sets
pub fn real_coherence(master: &[f64], slave: &[f64]) -> SarResult<f64> {
    if master.len() != slave.len() {
        return Err(SarError::DimensionMismatch(format!(
            "real_coherence: {} master and {} slave samples",
            master.len(),
            slave.len()
        )));
    }
    let (mut cross, mut power_master, mut power_slave) = (0.0, 0.0, 0.0);
    for (&m, &s) in master.iter().zip(slave) {
        cross += m * s;
        power_master += m * m;
        power_slave += s * s;
    }
    Ok(normalized_coherence(
        SarComplex::new(cross, 0.0),
        power_master,
        power_slave,
    ))
}

/// Elementwise `re² + im²`
pub fn intensity(cplx: &ComplexMatrix) -> RealMatrix {
    cplx.mapv(|z| z.norm_sqr())
}

/// Elementwise `sqrt(re² + im²)`
pub fn magnitude(cplx: &ComplexMatrix) -> RealMatrix {
    cplx.mapv(|z| z.norm())
}

/// Elementwise phase in (-π, π]
pub fn phase(cplx: &ComplexMatrix) -> RealMatrix {
    cplx.mapv(|z| z.arg())
}
