#![deny(missing_docs)]
//! Image codecs, capture and frame streaming.

/// Error types for I/O operations.
pub mod error;

/// Serialize and compress images with PNG or JPEG.
pub mod compression;

/// JPEG image encoding and decoding.
pub mod jpeg;

/// PNG image encoding and decoding.
pub mod png;

/// High-level image reading and directory loading.
pub mod functional;

/// Threaded last-frame-wins camera capture.
pub mod capture;

/// Fixed-period loop timing.
pub mod rate;

/// UDP frame streaming with a length-prefixed JPEG wire format.
pub mod udp;

/// Video file output (feature-gated).
///
/// Requires the `gstreamer` feature flag and system GStreamer libraries.
#[cfg(feature = "gstreamer")]
pub mod video;

pub use error::IoError;
