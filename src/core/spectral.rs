//! Complex FFTs over vectors and matrices, plus spectrum shifting
//!
//! Transforms are backed by `rustfft`, which handles any length (mixed radix
//! for composite sizes, Rader/Bluestein otherwise). The forward transform is
//! unscaled; the inverse transform divides by the transform length so that
//! `invfft(fft(x)) == x`.

use crate::types::{ComplexMatrix, ComplexVector, SarComplex, SarError, SarResult};
use ndarray::{Array1, Array2, Axis};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Matrix dimension a 1D transform runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FftDim {
    /// Dimension 1: every column is transformed (along lines)
    Azimuth,
    /// Dimension 2: every row is transformed (along pixels)
    Range,
}

impl FftDim {
    fn axis(self) -> Axis {
        match self {
            FftDim::Azimuth => Axis(0),
            FftDim::Range => Axis(1),
        }
    }
}

impl TryFrom<usize> for FftDim {
    type Error = SarError;

    fn try_from(dimension: usize) -> SarResult<Self> {
        match dimension {
            1 => Ok(FftDim::Azimuth),
            2 => Ok(FftDim::Range),
            other => Err(SarError::InvalidArgument(format!(
                "FFT dimension must be 1 or 2, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

fn plan(len: usize, direction: Direction) -> Arc<dyn Fft<f64>> {
    let mut planner = FftPlanner::new();
    match direction {
        Direction::Forward => planner.plan_fft_forward(len),
        Direction::Inverse => planner.plan_fft_inverse(len),
    }
}

/// Run one planned transform over a contiguous buffer, scaling inverse output
fn process(fft: &dyn Fft<f64>, buffer: &mut [SarComplex], scratch: &mut [SarComplex], direction: Direction) {
    fft.process_with_scratch(buffer, scratch);
    if direction == Direction::Inverse {
        let scale = 1.0 / buffer.len() as f64;
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }
}

fn transform_vector(vector: &mut ComplexVector, fft_length: usize, direction: Direction) -> SarResult<()> {
    if vector.len() != fft_length {
        return Err(SarError::DimensionMismatch(format!(
            "FFT length {} does not match vector length {}",
            fft_length,
            vector.len()
        )));
    }
    if fft_length == 0 {
        return Ok(());
    }

    let fft = plan(fft_length, direction);
    let mut scratch = vec![SarComplex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    match vector.as_slice_mut() {
        Some(buffer) => process(fft.as_ref(), buffer, &mut scratch, direction),
        None => {
            let mut buffer = vector.to_vec();
            process(fft.as_ref(), &mut buffer, &mut scratch, direction);
            vector.assign(&Array1::from(buffer));
        }
    }
    Ok(())
}

fn transform_matrix(matrix: &mut ComplexMatrix, dim: FftDim, direction: Direction) {
    let axis = dim.axis();
    let len = matrix.len_of(axis);
    if len == 0 || matrix.is_empty() {
        return;
    }

    let fft = plan(len, direction);
    let mut scratch = vec![SarComplex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
    let mut buffer = vec![SarComplex::new(0.0, 0.0); len];
    for mut lane in matrix.lanes_mut(axis) {
        for (dst, src) in buffer.iter_mut().zip(lane.iter()) {
            *dst = *src;
        }
        process(fft.as_ref(), &mut buffer, &mut scratch, direction);
        for (dst, src) in lane.iter_mut().zip(buffer.iter()) {
            *dst = *src;
        }
    }
}

/// Forward 1D FFT in place; `fft_length` must equal the vector length
pub fn fft1d_inplace(vector: &mut ComplexVector, fft_length: usize) -> SarResult<()> {
    transform_vector(vector, fft_length, Direction::Forward)
}

/// Inverse 1D FFT in place, scaled by `1/fft_length`
pub fn invfft1d_inplace(vector: &mut ComplexVector, fft_length: usize) -> SarResult<()> {
    transform_vector(vector, fft_length, Direction::Inverse)
}

/// Forward 1D FFT
pub fn fft1d(vector: &ComplexVector, fft_length: usize) -> SarResult<ComplexVector> {
    let mut spectrum = vector.clone();
    fft1d_inplace(&mut spectrum, fft_length)?;
    Ok(spectrum)
}

/// Inverse 1D FFT
pub fn invfft1d(vector: &ComplexVector, fft_length: usize) -> SarResult<ComplexVector> {
    let mut signal = vector.clone();
    invfft1d_inplace(&mut signal, fft_length)?;
    Ok(signal)
}

/// Forward 1D FFT of every column (`Azimuth`) or row (`Range`), in place
pub fn fft_inplace(matrix: &mut ComplexMatrix, dim: FftDim) {
    transform_matrix(matrix, dim, Direction::Forward);
}

/// Inverse 1D FFT of every column (`Azimuth`) or row (`Range`), in place
pub fn invfft_inplace(matrix: &mut ComplexMatrix, dim: FftDim) {
    transform_matrix(matrix, dim, Direction::Inverse);
}

pub fn fft(matrix: &ComplexMatrix, dim: FftDim) -> ComplexMatrix {
    let mut spectrum = matrix.clone();
    fft_inplace(&mut spectrum, dim);
    spectrum
}

pub fn invfft(matrix: &ComplexMatrix, dim: FftDim) -> ComplexMatrix {
    let mut signal = matrix.clone();
    invfft_inplace(&mut signal, dim);
    signal
}

/// 2D FFT in place: dimension 1 first, then dimension 2
pub fn fft2d_inplace(matrix: &mut ComplexMatrix) {
    fft_inplace(matrix, FftDim::Azimuth);
    fft_inplace(matrix, FftDim::Range);
}

/// Inverse 2D FFT in place, same dimension order as [`fft2d_inplace`]
pub fn invfft2d_inplace(matrix: &mut ComplexMatrix) {
    invfft_inplace(matrix, FftDim::Azimuth);
    invfft_inplace(matrix, FftDim::Range);
}

pub fn fft2d(matrix: &ComplexMatrix) -> ComplexMatrix {
    let mut spectrum = matrix.clone();
    fft2d_inplace(&mut spectrum);
    spectrum
}

pub fn invfft2d(matrix: &ComplexMatrix) -> ComplexMatrix {
    let mut signal = matrix.clone();
    invfft2d_inplace(&mut signal);
    signal
}

fn rotate_vector<T: Clone>(vector: &mut Array1<T>, right: bool) {
    let len = vector.len();
    let half = len / 2;
    if half == 0 {
        return;
    }
    let mut buffer = vector.to_vec();
    if right {
        buffer.rotate_right(half);
    } else {
        buffer.rotate_left(half);
    }
    vector.assign(&Array1::from(buffer));
}

fn rotate_matrix<T: Clone>(matrix: &mut Array2<T>, right: bool) {
    for axis in [Axis(0), Axis(1)] {
        for mut lane in matrix.lanes_mut(axis) {
            let mut owned = lane.to_owned();
            rotate_vector(&mut owned, right);
            lane.assign(&owned);
        }
    }
}

/// Move the zero-frequency bin to the centre: rotate right by `len / 2`
pub fn fftshift_inplace<T: Clone>(vector: &mut Array1<T>) {
    rotate_vector(vector, true);
}

/// Undo [`fftshift_inplace`]: rotate left by `len / 2`
pub fn ifftshift_inplace<T: Clone>(vector: &mut Array1<T>) {
    rotate_vector(vector, false);
}

pub fn fftshift<T: Clone>(vector: &Array1<T>) -> Array1<T> {
    let mut shifted = vector.clone();
    fftshift_inplace(&mut shifted);
    shifted
}

pub fn ifftshift<T: Clone>(vector: &Array1<T>) -> Array1<T> {
    let mut shifted = vector.clone();
    ifftshift_inplace(&mut shifted);
    shifted
}

/// Centre the zero-frequency bin of a 2D spectrum (both axes)
pub fn fftshift2d_inplace<T: Clone>(matrix: &mut Array2<T>) {
    rotate_matrix(matrix, true);
}

pub fn ifftshift2d_inplace<T: Clone>(matrix: &mut Array2<T>) {
    rotate_matrix(matrix, false);
}

pub fn fftshift2d<T: Clone>(matrix: &Array2<T>) -> Array2<T> {
    let mut shifted = matrix.clone();
    fftshift2d_inplace(&mut shifted);
    shifted
}

pub fn ifftshift2d<T: Clone>(matrix: &Array2<T>) -> Array2<T> {
    let mut shifted = matrix.clone();
    ifftshift2d_inplace(&mut shifted);
    shifted
}
