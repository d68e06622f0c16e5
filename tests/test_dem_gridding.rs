use approx::assert_abs_diff_eq;
use insar_core::core::grid_data::{grid_data_linear, grid_data_linear_multi, DEFAULT_NODATA};
use insar_core::{GridDataParams, RealMatrix, Window};
use ndarray::Array2;

/// Radar-coded DEM posts: a rotated, sheared lattice over the tile
fn radar_coded_posts(n: usize) -> (RealMatrix, RealMatrix) {
    let lines = Array2::from_shape_fn((n, n), |(i, j)| -20.0 + 3.1 * i as f64 + 0.4 * j as f64);
    let pixels = Array2::from_shape_fn((n, n), |(i, j)| -25.0 + 5.3 * j as f64 - 0.6 * i as f64);
    (lines, pixels)
}

fn terrain(line: f64, pixel: f64) -> f64 {
    850.0 + 1.2 * line - 0.35 * pixel
}

#[test]
fn test_grid_planar_terrain() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (lines, pixels) = radar_coded_posts(40);
    let heights = Array2::from_shape_fn(lines.dim(), |idx| terrain(lines[idx], pixels[idx]));

    let window = Window::new(0, 49, 0, 99).expect("Invalid window");
    let params = GridDataParams {
        line_to_pixel_ratio: 5.0,
        ..GridDataParams::default()
    };
    let dem = grid_data_linear(&lines, &pixels, &heights, &window, &params).expect("Gridding failed");

    assert_eq!(dem.dim(), (50, 100));
    for ((r, c), v) in dem.indexed_iter() {
        assert_abs_diff_eq!(*v, terrain(r as f64, c as f64), epsilon = 1e-6);
    }
}

#[test]
fn test_grid_partial_coverage_keeps_nodata() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (lines, pixels) = radar_coded_posts(12);
    let heights = Array2::from_shape_fn(lines.dim(), |idx| terrain(lines[idx], pixels[idx]));

    // tile reaches past the last DEM posts
    let window = Window::new(0, 39, 0, 79).expect("Invalid window");
    let dem = grid_data_linear(&lines, &pixels, &heights, &window, &GridDataParams::default())
        .expect("Gridding failed");

    let covered = dem.iter().filter(|&&v| v != DEFAULT_NODATA).count();
    let empty = dem.len() - covered;
    println!("Covered cells: {}, empty cells: {}", covered, empty);
    assert!(covered > 0);
    assert!(empty > 0);
    assert_eq!(dem[[39, 79]], DEFAULT_NODATA);
    assert_abs_diff_eq!(dem[[0, 0]], terrain(0.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_grid_multilooked_phase_and_height() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (lines, pixels) = radar_coded_posts(40);
    let heights = Array2::from_shape_fn(lines.dim(), |idx| terrain(lines[idx], pixels[idx]));
    let phase = Array2::from_shape_fn(lines.dim(), |idx| 0.01 * lines[idx] + 0.02 * pixels[idx]);

    let window = Window::new(5, 44, 10, 89).expect("Invalid window");
    let params = GridDataParams {
        line_to_pixel_ratio: 5.0,
        ml_line: 4,
        ml_pixel: 8,
        nodata_value: f64::NAN,
        offset: 0.0,
    };
    let grids = grid_data_linear_multi(&lines, &pixels, &[&phase, &heights], &window, &params)
        .expect("Gridding failed");

    assert_eq!(grids.len(), 2);
    assert_eq!(grids[0].dim(), (10, 10));
    for ((r, c), v) in grids[0].indexed_iter() {
        let line = 5.0 + 4.0 * r as f64;
        let pixel = 10.0 + 8.0 * c as f64;
        assert_abs_diff_eq!(*v, 0.01 * line + 0.02 * pixel, epsilon = 1e-9);
        assert_abs_diff_eq!(grids[1][[r, c]], terrain(line, pixel), epsilon = 1e-6);
    }
}

/// Lattice whose cells are skewed once pixels are scaled by 0.1:
/// node (i, j) sits at line `i - 0.5·j`, pixel `2·i + 10·j`
fn skewed_lattice(n: usize) -> (RealMatrix, RealMatrix) {
    let lines = Array2::from_shape_fn((n, n), |(i, j)| i as f64 - 0.5 * j as f64);
    let pixels = Array2::from_shape_fn((n, n), |(i, j)| 2.0 * i as f64 + 10.0 * j as f64);
    (lines, pixels)
}

fn saddle(line: f64, pixel: f64) -> f64 {
    line * pixel
}

/// Linear interpolation of `saddle` on the lattice cell holding (line, pixel),
/// split along the (i, j)-(i+1, j+1) diagonal or the other one
fn lattice_interpolation(line: f64, pixel: f64, main_diagonal: bool) -> f64 {
    let scaled = 0.1 * pixel;
    let i = (line + 0.5 * scaled) / 1.1;
    let j = (scaled - 0.2 * line) / 1.1;
    let (i0, j0) = (i.floor(), j.floor());
    let (fs, ft) = (i - i0, j - j0);
    let node = |di: f64, dj: f64| {
        let (ni, nj) = (i0 + di, j0 + dj);
        saddle(ni - 0.5 * nj, 2.0 * ni + 10.0 * nj)
    };
    if main_diagonal {
        if fs >= ft {
            (1.0 - fs) * node(0.0, 0.0) + (fs - ft) * node(1.0, 0.0) + ft * node(1.0, 1.0)
        } else {
            (1.0 - ft) * node(0.0, 0.0) + (ft - fs) * node(0.0, 1.0) + fs * node(1.0, 1.0)
        }
    } else if fs + ft <= 1.0 {
        (1.0 - fs - ft) * node(0.0, 0.0) + fs * node(1.0, 0.0) + ft * node(0.0, 1.0)
    } else {
        (fs + ft - 1.0) * node(1.0, 1.0) + (1.0 - ft) * node(1.0, 0.0) + (1.0 - fs) * node(0.0, 1.0)
    }
}

#[test]
fn test_grid_curved_surface_follows_delaunay_diagonals() {
    let _ = env_logger::builder().is_test(true).try_init();

    let (lines, pixels) = skewed_lattice(21);
    let heights = Array2::from_shape_fn(lines.dim(), |idx| saddle(lines[idx], pixels[idx]));

    // with pixels scaled by 0.1 the (i, j)-(i+1, j+1) diagonal is the short one
    let window = Window::new(2, 8, 60, 149).expect("Invalid window");
    let params = GridDataParams {
        line_to_pixel_ratio: 0.1,
        ml_line: 1,
        ml_pixel: 3,
        offset: 0.25,
        ..GridDataParams::default()
    };
    let dem = grid_data_linear(&lines, &pixels, &heights, &window, &params).expect("Gridding failed");
    assert_eq!(dem.dim(), (7, 30));

    let mut max_diagonal_gap: f64 = 0.0;
    for ((r, c), v) in dem.indexed_iter() {
        let line = 2.25 + r as f64;
        let pixel = 60.25 + 3.0 * c as f64;
        let expected = lattice_interpolation(line, pixel, true);
        assert_abs_diff_eq!(*v, expected, epsilon = 1e-6);

        let other = lattice_interpolation(line, pixel, false);
        max_diagonal_gap = max_diagonal_gap.max((expected - other).abs());
    }
    println!("Largest gap between the two diagonal choices: {:.3}", max_diagonal_gap);
    assert!(max_diagonal_gap > 0.5);
}

#[test]
fn test_grid_full_dem_buffer() {
    let _ = env_logger::builder().is_test(true).try_init();

    // one DEM buffer of a burst-sized tile, posts slightly irregular
    let jitter = |i: usize, j: usize| 0.3 * ((7 * i + 13 * j) as f64).sin();
    let lines = Array2::from_shape_fn((250, 250), |(i, j)| -5.0 + 2.1 * i as f64 + jitter(i, j));
    let pixels = Array2::from_shape_fn((250, 250), |(i, j)| -5.0 + 4.1 * j as f64 + jitter(j, i));
    let heights = Array2::from_shape_fn(lines.dim(), |idx| terrain(lines[idx], pixels[idx]));

    let window = Window::new(0, 499, 0, 999).expect("Invalid window");
    let params = GridDataParams {
        line_to_pixel_ratio: 0.2,
        ml_line: 2,
        ml_pixel: 4,
        ..GridDataParams::default()
    };
    let start = std::time::Instant::now();
    let dem = grid_data_linear(&lines, &pixels, &heights, &window, &params).expect("Gridding failed");
    println!("Gridded {} samples in {:.3} s", lines.len(), start.elapsed().as_secs_f64());

    assert_eq!(dem.dim(), (250, 250));
    for ((r, c), v) in dem.indexed_iter() {
        assert_abs_diff_eq!(*v, terrain(2.0 * r as f64, 4.0 * c as f64), epsilon = 1e-6);
    }
}
