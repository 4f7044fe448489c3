#![deny(missing_docs)]
//! Image processing operations for the camkit camera toolkit.

/// Color space conversions.
pub mod color;

/// Drawing primitives for overlays.
pub mod draw;

/// Interpolation kernels and generic remapping.
pub mod interpolation;

/// Connected-component blob extraction.
pub mod blobs;

/// Image resizing.
pub mod resize;

/// Sharpness / blur metrics.
pub mod sharpness;

/// Binary thresholding.
pub mod threshold;

pub(crate) mod parallel;
