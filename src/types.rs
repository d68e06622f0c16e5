use ndarray::{Array1, Array2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Complex-valued SAR sample (I + jQ)
pub type SarComplex = Complex64;

/// 2D real matrix (line x pixel)
pub type RealMatrix = Array2<f64>;

/// 2D complex matrix (line x pixel)
pub type ComplexMatrix = Array2<SarComplex>;

/// Real vector (polynomial coefficients, frequency axes, ...)
pub type RealVector = Array1<f64>;

/// Complex vector
pub type ComplexVector = Array1<SarComplex>;

/// Inclusive integer rectangle over a raster.
///
/// "line" is the row (azimuth) axis, "pixel" the column (range) axis.
/// Coordinates may be negative so tiles extended past the image border
/// can still be addressed; indexing a matrix with such a window fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct Window {
    linelo: i64,
    linehi: i64,
    pixlo: i64,
    pixhi: i64,
}

/// Unchecked serialized form, validated through [`Window::new`]
#[derive(Deserialize)]
struct WindowBounds {
    linelo: i64,
    linehi: i64,
    pixlo: i64,
    pixhi: i64,
}

impl TryFrom<WindowBounds> for Window {
    type Error = SarError;

    fn try_from(bounds: WindowBounds) -> SarResult<Self> {
        Window::new(bounds.linelo, bounds.linehi, bounds.pixlo, bounds.pixhi)
    }
}

impl Window {
    /// Create a window, rejecting inverted bounds
    pub fn new(linelo: i64, linehi: i64, pixlo: i64, pixhi: i64) -> SarResult<Self> {
        if linelo > linehi || pixlo > pixhi {
            return Err(SarError::InvalidArgument(format!(
                "Inverted window bounds: lines [{}, {}], pixels [{}, {}]",
                linelo, linehi, pixlo, pixhi
            )));
        }
        Ok(Self {
            linelo,
            linehi,
            pixlo,
            pixhi,
        })
    }

    /// Window covering a whole `rows x cols` matrix
    pub fn from_shape(rows: usize, cols: usize) -> SarResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(SarError::InvalidArgument(format!(
                "Cannot build a window over an empty {}x{} matrix",
                rows, cols
            )));
        }
        Self::new(0, rows as i64 - 1, 0, cols as i64 - 1)
    }

    pub fn linelo(&self) -> i64 {
        self.linelo
    }

    pub fn linehi(&self) -> i64 {
        self.linehi
    }

    pub fn pixlo(&self) -> i64 {
        self.pixlo
    }

    pub fn pixhi(&self) -> i64 {
        self.pixhi
    }

    /// Number of lines covered
    pub fn lines(&self) -> usize {
        (self.linehi - self.linelo + 1) as usize
    }

    /// Number of pixels covered
    pub fn pixels(&self) -> usize {
        (self.pixhi - self.pixlo + 1) as usize
    }

    /// Whether both windows span the same extent
    pub fn same_extent(&self, other: &Window) -> bool {
        self.lines() == other.lines() && self.pixels() == other.pixels()
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}:{}, {}:{}]",
            self.linelo, self.linehi, self.pixlo, self.pixhi
        )
    }
}

/// Error types for InSAR kernels
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Matrix is not positive definite (pivot {pivot} at row {row})")]
    NotPositiveDefinite { row: usize, pivot: f64 },

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Result type for InSAR operations
pub type SarResult<T> = Result<T, SarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_extent() {
        let win = Window::new(10, 19, -2, 5).unwrap();
        assert_eq!(win.lines(), 10);
        assert_eq!(win.pixels(), 8);
        assert!(win.same_extent(&Window::new(0, 9, 0, 7).unwrap()));
        assert_eq!(win.to_string(), "[10:19, -2:5]");
    }

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(matches!(
            Window::new(5, 4, 0, 0),
            Err(SarError::InvalidArgument(_))
        ));
        assert!(Window::new(0, 0, 3, 2).is_err());
        assert!(Window::from_shape(0, 3).is_err());
    }

    #[test]
    fn test_window_serde_round_trip() {
        let win = Window::new(-4, 12, 0, 255).unwrap();
        let json = serde_json::to_string(&win).unwrap();
        assert_eq!(json, r#"{"linelo":-4,"linehi":12,"pixlo":0,"pixhi":255}"#);
        assert_eq!(serde_json::from_str::<Window>(&json).unwrap(), win);
    }

    #[test]
    fn test_window_deserialize_rejects_inverted_bounds() {
        let inverted = r#"{"linelo":5,"linehi":4,"pixlo":0,"pixhi":9}"#;
        let err = serde_json::from_str::<Window>(inverted).unwrap_err();
        assert!(err.to_string().contains("Inverted window bounds"), "{}", err);

        let inverted_pixels = r#"{"linelo":0,"linehi":4,"pixlo":3,"pixhi":1}"#;
        assert!(serde_json::from_str::<Window>(inverted_pixels).is_err());
    }
}
