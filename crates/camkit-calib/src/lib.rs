#![deny(missing_docs)]
//! Mono and stereo camera calibration.
//!
//! This crate orchestrates calibration: it accumulates target detections,
//! builds initial parameter guesses, hands the nonlinear refinement to the
//! `levenberg-marquardt` crate and packages the results into [`Camera`] /
//! [`StereoCamera`] objects with YAML persistence, undistortion and
//! reprojection diagnostics.

mod camera;
mod distortion;
mod epipolar;
mod error;
mod linear;
mod mono;
mod optim;
mod reproject;
mod stereo;
mod undistort;

/// Synthetic planar scenes for tests and examples.
pub mod synthetic;

/// Known sensor presets and field-of-view helpers.
pub mod sensors;

pub use camera::{fov, Camera, StereoCamera};
pub use distortion::{project_points, DistortionCoefficients};
pub use epipolar::{essential_from_pose, fundamental_from_pose, skew_symmetric};
pub use error::CalibError;
pub use linear::{homography_dlt, pose_from_homography};
pub use mono::{CalibFlags, CalibrationReport, MonoCalibrator};
pub use optim::SolveOptions;
pub use reproject::{compute_reprojection_errors, ReprojectionErrors};
pub use stereo::{intersect_by_ids, StereoCalibrator, StereoFlags, StereoReport};
pub use undistort::Undistorter;
