/// An error type for calibration operations.
#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    /// No image produced a valid target detection.
    #[error("No valid target detections; cannot calibrate")]
    NoDetections,

    /// No image pair produced detections in both views.
    #[error("No image pair with detections in both views; cannot stereo calibrate")]
    NoPairs,

    /// An image does not match the size the operation was set up for.
    #[error("Operation set up for {expected_width}x{expected_height} images, got {width}x{height}")]
    SizeMismatch {
        /// Width the operation expects.
        expected_width: usize,
        /// Height the operation expects.
        expected_height: usize,
        /// Width of the offending image.
        width: usize,
        /// Height of the offending image.
        height: usize,
    },

    /// The point configuration does not constrain the estimate.
    #[error("Degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// The nonlinear solver failed to converge.
    #[error("Solver did not converge")]
    SolverDiverged,

    /// A YAML document does not match the expected schema.
    #[error("Invalid calibration file: {0}")]
    InvalidFile(String),

    /// YAML (de)serialization failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// File system failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Error from image container operations.
    #[error(transparent)]
    Image(#[from] camkit_image::ImageError),

    /// Error from target detection.
    #[error(transparent)]
    Target(#[from] camkit_targets::TargetError),
}
