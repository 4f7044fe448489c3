#![deny(missing_docs)]
//! Calibration target descriptors and finders.
//!
//! A target finder locates a known physical calibration pattern in a
//! grayscale image and pairs the detected 2-D feature positions with the
//! pattern's ideal 3-D object points. Detection of the raw features is
//! delegated: chessboard corners to the `chess-corners` crate, circle blobs
//! to `camkit-imgproc`, and fiducial tags to any [`TagDetector`]
//! implementation supplied by the caller.

mod chessboard;
mod circles;
mod detection;
mod grid;
mod tags;

pub use chessboard::ChessboardFinder;
pub use circles::{CircleGridFinder, CircleGridKind};
pub use detection::{Detection, TargetFinder};
pub use grid::order_grid;
pub use tags::{TagBoard, TagBoardFinder, TagDetection, TagDetector, TagFamily};

/// An error type for target construction and detection.
#[derive(thiserror::Error, Debug)]
pub enum TargetError {
    /// The pattern dimensions are degenerate.
    #[error("Invalid pattern size ({0}x{1})")]
    InvalidPatternSize(usize, usize),

    /// The physical scale must be positive.
    #[error("Invalid marker scale: {0}")]
    InvalidScale(f64),

    /// Unknown tag family name.
    #[error("Unknown tag family: {0}")]
    UnknownTagFamily(String),

    /// Object and image point counts disagree.
    #[error("Correspondence length mismatch: {0} image points vs {1} object points")]
    LengthMismatch(usize, usize),

    /// Error from the image crate adapter.
    #[error("Failed to adapt image buffer")]
    ImageAdapter,

    /// Error bubbled up from an injected tag detector.
    #[error("Tag detector failed: {0}")]
    Detector(String),

    /// Error from image container operations.
    #[error(transparent)]
    Image(#[from] camkit_image::ImageError),

    /// Error bubbled up from the chessboard corner detector.
    #[error(transparent)]
    Chess(#[from] chess_corners::ChessError),
}
