use crate::types::{ComplexMatrix, RealMatrix, SarComplex, SarError, SarResult};
use serde::{Deserialize, Serialize};

/// Multilooking parameters for speckle and phase-noise reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultilookParams {
    /// Number of looks in range direction
    pub range_looks: usize,
    /// Number of looks in azimuth direction
    pub azimuth_looks: usize,
}

impl Default for MultilookParams {
    fn default() -> Self {
        Self {
            range_looks: 4,
            azimuth_looks: 1,
        }
    }
}

/// Boxcar average of a complex matrix over disjoint `fac_az x fac_rg` blocks.
///
/// The output has `rows / fac_az` lines and `cols / fac_rg` pixels; trailing
/// partial blocks are dropped.
pub fn multilook(cplx: &ComplexMatrix, fac_az: usize, fac_rg: usize) -> SarResult<ComplexMatrix> {
    if fac_az == 0 || fac_rg == 0 {
        return Err(SarError::InvalidArgument(format!(
            "Multilook factors must be positive, got {}x{}",
            fac_az, fac_rg
        )));
    }
    if fac_az == 1 && fac_rg == 1 {
        return Ok(cplx.clone());
    }

    let (rows, cols) = cplx.dim();
    let out_rows = rows / fac_az;
    let out_cols = cols / fac_rg;
    if out_rows == 0 || out_cols == 0 {
        return Err(SarError::Processing(format!(
            "Multilook factors {}x{} too large for {}x{} input",
            fac_az, fac_rg, rows, cols
        )));
    }

    log::debug!(
        "Multilooking {}x{} by {}x{} -> {}x{}",
        rows,
        cols,
        fac_az,
        fac_rg,
        out_rows,
        out_cols
    );

    let looks = (fac_az * fac_rg) as f64;
    let mut output = ComplexMatrix::zeros((out_rows, out_cols));
    for out_row in 0..out_rows {
        for out_col in 0..out_cols {
            let mut sum = SarComplex::new(0.0, 0.0);
            for az in 0..fac_az {
                for rg in 0..fac_rg {
                    sum += cplx[[out_row * fac_az + az, out_col * fac_rg + rg]];
                }
            }
            output[[out_row, out_col]] = sum / looks;
        }
    }
    Ok(output)
}

/// Multilook processor that also tracks the output pixel spacing
pub struct MultilookProcessor {
    params: MultilookParams,
}

impl MultilookProcessor {
    /// Create a new multilook processor
    pub fn new(params: MultilookParams) -> Self {
        Self { params }
    }

    /// Create processor with standard parameters
    pub fn standard() -> Self {
        Self::new(MultilookParams::default())
    }

    /// Apply multilooking to complex data
    ///
    /// # Arguments
    /// * `data` - complex samples (interferogram or SLC)
    /// * `range_spacing` - Original range pixel spacing in meters
    /// * `azimuth_spacing` - Original azimuth pixel spacing in meters
    ///
    /// # Returns
    /// * Multilooked data and new (range, azimuth) pixel spacings
    pub fn apply_multilook(
        &self,
        data: &ComplexMatrix,
        range_spacing: f64,
        azimuth_spacing: f64,
    ) -> SarResult<(ComplexMatrix, f64, f64)> {
        log::info!(
            "Applying multilook: {}x{} looks to {}x{} image",
            self.params.azimuth_looks,
            self.params.range_looks,
            data.nrows(),
            data.ncols()
        );

        let output = multilook(data, self.params.azimuth_looks, self.params.range_looks)?;

        let new_range_spacing = range_spacing * (self.params.range_looks as f64);
        let new_azimuth_spacing = azimuth_spacing * (self.params.azimuth_looks as f64);

        log::info!(
            "Multilooking complete: pixel spacing {}m x {}m -> {}m x {}m",
            range_spacing,
            azimuth_spacing,
            new_range_spacing,
            new_azimuth_spacing
        );

        Ok((output, new_range_spacing, new_azimuth_spacing))
    }

    /// Calculate equivalent number of looks (ENL) estimate of intensity data
    pub fn estimate_enl(&self, intensity: &RealMatrix) -> f64 {
        let mean = intensity.mean().unwrap_or(0.0);
        let variance = intensity.mapv(|x| (x - mean).powi(2)).mean().unwrap_or(0.0);

        if variance > 1e-10 {
            mean * mean / variance
        } else {
            f64::MAX
        }
    }

    /// Get the theoretical number of looks
    pub fn theoretical_looks(&self) -> usize {
        self.params.range_looks * self.params.azimuth_looks
    }
}
