//! Core InSAR numerical kernels

pub mod grid_data;
pub mod linalg;
pub mod multilook;
pub mod poly;
pub mod sar_utils;
pub mod spectral;
pub mod weight_windows;

// Re-export main types
pub use grid_data::{grid_data_linear, grid_data_linear_multi, GridDataParams};
pub use multilook::{multilook, MultilookParams, MultilookProcessor};
pub use spectral::FftDim;
