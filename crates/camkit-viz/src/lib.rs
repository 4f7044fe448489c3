#![deny(missing_docs)]
//! Calibration visualization helpers.
//!
//! Everything renders into plain RGB images; displaying or saving them is
//! left to the caller.

mod coverage;
mod distortion;
mod mosaic;
mod overlay;
mod stereo;

pub use coverage::coverage;
pub use distortion::{distortion_field, render_distortion_field, DistortionField};
pub use mosaic::mosaic;
pub use overlay::{draw_corners, draw_tag};
pub use stereo::{epipolar_pair, stereo_overlay};
