//! Linear gridding of scattered samples onto a regular radar tile
//!
//! DEM points radar-coded into (line, pixel) positions are irregular. They are
//! Delaunay-triangulated and each triangle is rasterised onto the output grid
//! with planar interpolation of the sample values.

use crate::types::{RealMatrix, SarError, SarResult, Window};
use serde::{Deserialize, Serialize};
use spade::{DelaunayTriangulation, HasPosition, Point2, Triangulation};
use std::collections::HashSet;

/// Value marking missing samples and uncovered output cells
pub const DEFAULT_NODATA: f64 = -9999.0;

/// Barycentric slack for cells lying on a triangle edge
const EDGE_TOLERANCE: f64 = 1e-9;

/// Gridding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridDataParams {
    /// Scale applied to pixel coordinates before triangulation, normally
    /// range spacing over azimuth spacing so triangles are built in ground
    /// geometry
    pub line_to_pixel_ratio: f64,
    /// Output decimation along lines
    pub ml_line: usize,
    /// Output decimation along pixels
    pub ml_pixel: usize,
    /// Sentinel for invalid inputs and empty output cells
    pub nodata_value: f64,
    /// Shift of the output cell origin, in input coordinates
    pub offset: f64,
}

impl Default for GridDataParams {
    fn default() -> Self {
        Self {
            line_to_pixel_ratio: 1.0,
            ml_line: 1,
            ml_pixel: 1,
            nodata_value: DEFAULT_NODATA,
            offset: 0.0,
        }
    }
}

/// Triangulation vertex tagged with the sample it came from
#[derive(Debug, Clone, Copy)]
struct SampleVertex {
    position: Point2<f64>,
    sample: usize,
}

impl HasPosition for SampleVertex {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Delaunay triangulation of `points`.
///
/// Returns sample index triples into `points`. Of several samples at the
/// same position only the first takes part; fewer than three distinct or
/// only collinear points give no triangles.
fn triangulate(points: &[[f64; 2]]) -> SarResult<Vec<[usize; 3]>> {
    let mut seen = HashSet::with_capacity(points.len());
    let vertices: Vec<SampleVertex> = points
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            // +0.0 folds -0.0 onto 0.0
            seen.insert(((p[0] + 0.0).to_bits(), (p[1] + 0.0).to_bits()))
        })
        .map(|(sample, p)| SampleVertex {
            position: Point2::new(p[0], p[1]),
            sample,
        })
        .collect();

    if vertices.len() < 3 {
        return Ok(Vec::new());
    }
    if vertices.len() < points.len() {
        log::debug!("Dropped {} duplicate sample positions", points.len() - vertices.len());
    }

    let triangulation = DelaunayTriangulation::<SampleVertex>::bulk_load(vertices)
        .map_err(|e| SarError::Processing(format!("Delaunay triangulation failed: {}", e)))?;

    Ok(triangulation
        .inner_faces()
        .map(|face| face.vertices().map(|v| v.data().sample))
        .collect())
}

fn is_valid(value: f64, nodata_value: f64) -> bool {
    value.is_finite() && value != nodata_value
}

/// Grid several value buffers over one triangulation.
///
/// `line_buf` and `pixel_buf` give the output-grid position of each source
/// sample, every entry of `value_bufs` a quantity to interpolate. A sample
/// takes part only if its coordinates and all its values are valid (finite
/// and not `nodata_value`). Output cell `(r, c)` sits at line
/// `linelo + offset + r·ml_line` and pixel `pixlo + offset + c·ml_pixel`;
/// cells outside the convex hull of the samples keep `nodata_value`.
pub fn grid_data_linear_multi(
    line_buf: &RealMatrix,
    pixel_buf: &RealMatrix,
    value_bufs: &[&RealMatrix],
    tile_window: &Window,
    params: &GridDataParams,
) -> SarResult<Vec<RealMatrix>> {
    if line_buf.dim() != pixel_buf.dim() || value_bufs.iter().any(|v| v.dim() != line_buf.dim()) {
        return Err(SarError::DimensionMismatch(format!(
            "Gridding buffers must share one shape, line buffer is {:?}",
            line_buf.dim()
        )));
    }
    if params.ml_line == 0 || params.ml_pixel == 0 {
        return Err(SarError::InvalidArgument(format!(
            "Gridding multilook factors must be positive, got {}x{}",
            params.ml_line, params.ml_pixel
        )));
    }
    if !(params.line_to_pixel_ratio > 0.0 && params.line_to_pixel_ratio.is_finite()) {
        return Err(SarError::InvalidArgument(format!(
            "Line to pixel ratio must be positive, got {}",
            params.line_to_pixel_ratio
        )));
    }

    let out_rows = tile_window.lines() / params.ml_line;
    let out_cols = tile_window.pixels() / params.ml_pixel;
    let mut outputs = vec![RealMatrix::from_elem((out_rows, out_cols), params.nodata_value); value_bufs.len()];
    if out_rows == 0 || out_cols == 0 || value_bufs.is_empty() {
        return Ok(outputs);
    }

    let nodata = params.nodata_value;
    let mut coords: Vec<[f64; 2]> = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); value_bufs.len()];
    for ((idx, &line), &pixel) in line_buf.indexed_iter().zip(pixel_buf.iter()) {
        if !is_valid(line, nodata) || !is_valid(pixel, nodata) {
            continue;
        }
        if value_bufs.iter().any(|v| !is_valid(v[idx], nodata)) {
            continue;
        }
        coords.push([line, pixel]);
        for (store, buf) in values.iter_mut().zip(value_bufs) {
            store.push(buf[idx]);
        }
    }

    if coords.len() < 3 {
        log::warn!(
            "Only {} valid samples for tile {}, output left at nodata",
            coords.len(),
            tile_window
        );
        return Ok(outputs);
    }

    let ratio = params.line_to_pixel_ratio;
    let scaled: Vec<[f64; 2]> = coords.iter().map(|c| [c[0], c[1] * ratio]).collect();
    let triangles = triangulate(&scaled)?;
    log::debug!(
        "Triangulated {} samples into {} triangles for tile {}",
        coords.len(),
        triangles.len(),
        tile_window
    );

    let line0 = tile_window.linelo() as f64 + params.offset;
    let pixel0 = tile_window.pixlo() as f64 + params.offset;
    let ml_line = params.ml_line as f64;
    let ml_pixel = params.ml_pixel as f64;

    for vertices in &triangles {
        let [a, b, c] = vertices.map(|v| coords[v]);

        // planar interpolation is affine invariant, so unscaled coordinates do
        let det = (b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1]);
        if det.abs() < f64::EPSILON {
            continue;
        }

        let line_min = a[0].min(b[0]).min(c[0]);
        let line_max = a[0].max(b[0]).max(c[0]);
        let pixel_min = a[1].min(b[1]).min(c[1]);
        let pixel_max = a[1].max(b[1]).max(c[1]);

        let Some((r_lo, r_hi)) = cell_range(line_min, line_max, line0, ml_line, out_rows) else {
            continue;
        };
        let Some((c_lo, c_hi)) = cell_range(pixel_min, pixel_max, pixel0, ml_pixel, out_cols) else {
            continue;
        };

        for r in r_lo..=r_hi {
            let line = line0 + r as f64 * ml_line;
            for col in c_lo..=c_hi {
                let pixel = pixel0 + col as f64 * ml_pixel;

                let wa = ((b[0] - line) * (c[1] - pixel) - (c[0] - line) * (b[1] - pixel)) / det;
                let wb = ((c[0] - line) * (a[1] - pixel) - (a[0] - line) * (c[1] - pixel)) / det;
                let wc = 1.0 - wa - wb;
                if wa < -EDGE_TOLERANCE || wb < -EDGE_TOLERANCE || wc < -EDGE_TOLERANCE {
                    continue;
                }

                for (output, store) in outputs.iter_mut().zip(&values) {
                    let [za, zb, zc] = vertices.map(|v| store[v]);
                    output[[r, col]] = wa * za + wb * zb + wc * zc;
                }
            }
        }
    }

    Ok(outputs)
}

/// Output indices whose cell coordinate lies in `[min, max]`, clipped to `0..count`
fn cell_range(min: f64, max: f64, origin: f64, step: f64, count: usize) -> Option<(usize, usize)> {
    let lo = ((min - origin) / step - EDGE_TOLERANCE).ceil().max(0.0);
    let hi = ((max - origin) / step + EDGE_TOLERANCE).floor();
    if hi < 0.0 || lo > hi || lo >= count as f64 {
        return None;
    }
    Some((lo as usize, (hi as usize).min(count - 1)))
}

/// Grid one value buffer, see [`grid_data_linear_multi`]
pub fn grid_data_linear(
    line_buf: &RealMatrix,
    pixel_buf: &RealMatrix,
    value_buf: &RealMatrix,
    tile_window: &Window,
    params: &GridDataParams,
) -> SarResult<RealMatrix> {
    let mut outputs = grid_data_linear_multi(line_buf, pixel_buf, &[value_buf], tile_window, params)?;
    outputs
        .pop()
        .ok_or_else(|| SarError::Processing("Gridding produced no output".to_string()))
}
