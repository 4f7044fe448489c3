#![deny(missing_docs)]
//! Camera calibration toolkit: target detection, mono/stereo calibration,
//! undistortion, capture and streaming utilities, and visualization.

#[doc(inline)]
pub use camkit_image as image;

#[doc(inline)]
pub use camkit_imgproc as imgproc;

#[doc(inline)]
pub use camkit_targets as targets;

#[doc(inline)]
pub use camkit_calib as calib;

#[doc(inline)]
pub use camkit_io as io;

#[doc(inline)]
pub use camkit_viz as viz;
