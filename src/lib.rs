//! insar-core: numerical kernels for interferometric SAR processing
//!
//! This library provides the matrix-level building blocks of an InSAR
//! chain: small linear algebra, FFTs along azimuth and range, apodization
//! windows, polynomial fitting, multilooking, interferogram and coherence
//! estimation, oversampling and gridding of radar-coded DEM samples.
//!
//! Everything works on caller-owned `ndarray` matrices. Operations come in
//! pairs where useful: `*_inplace` mutates its receiver, the plain form
//! returns a new value.

pub mod core;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    ComplexMatrix, ComplexVector, RealMatrix, RealVector, SarComplex, SarError, SarResult, Window,
};

pub use core::{FftDim, GridDataParams, MultilookParams, MultilookProcessor};
