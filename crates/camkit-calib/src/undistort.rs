use camkit_image::{Image, ImageSize};
use camkit_imgproc::interpolation::{meshgrid_from_fn, remap, InterpolationMode};
use nalgebra::Matrix3;

use crate::camera::Camera;
use crate::distortion::DistortionCoefficients;
use crate::error::CalibError;

/// Applies lens undistortion through precomputed remap tables.
///
/// The tables are built once for the camera's calibrated image size and the
/// configured alpha, and reused across frames. Passing a different alpha to
/// [`Undistorter::undistort`] rebuilds the tables and the optimal new camera
/// matrix before remapping.
///
/// The maps are each the size of the image in f32, so this trades memory
/// for per-frame speed.
pub struct Undistorter {
    k: Matrix3<f64>,
    dist: DistortionCoefficients,
    size: ImageSize,
    alpha: f64,
    new_k: Matrix3<f64>,
    map_x: Image<f32, 1>,
    map_y: Image<f32, 1>,
}

impl Undistorter {
    /// Set up undistortion for a calibrated camera with alpha 0 (all
    /// remapped pixels are valid, edges may be cropped).
    pub fn new(camera: &Camera) -> Result<Self, CalibError> {
        Self::with_alpha(camera, 0.0)
    }

    /// Set up undistortion with an explicit alpha in `[0, 1]`.
    ///
    /// * alpha 0: undistorted image with the minimum of unwanted pixels
    ///   (pixels at corners/edges may be cropped away).
    /// * alpha 1: all source pixels are retained, with black filler where
    ///   the corrected image has no data.
    pub fn with_alpha(camera: &Camera, alpha: f64) -> Result<Self, CalibError> {
        let size = ImageSize {
            width: camera.width,
            height: camera.height,
        };
        let new_k = optimal_new_camera_matrix(&camera.k, &camera.dist, size, alpha);
        let (map_x, map_y) = build_maps(&camera.k, &camera.dist, &new_k, size)?;

        Ok(Self {
            k: camera.k,
            dist: camera.dist,
            size,
            alpha,
            new_k,
            map_x,
            map_y,
        })
    }

    /// The alpha the current tables were built for.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// The optimal new camera matrix for the current alpha.
    pub fn new_camera_matrix(&self) -> &Matrix3<f64> {
        &self.new_k
    }

    /// The current remap tables.
    pub fn maps(&self) -> (&Image<f32, 1>, &Image<f32, 1>) {
        (&self.map_x, &self.map_y)
    }

    /// Undistort an image.
    ///
    /// A `Some(alpha)` differing from the current configuration triggers
    /// regeneration of the remap tables before the image is resampled.
    ///
    /// # Errors
    ///
    /// The image must match the size the undistorter was set up for.
    pub fn undistort<const C: usize>(
        &mut self,
        image: &Image<u8, C>,
        alpha: Option<f64>,
    ) -> Result<Image<u8, C>, CalibError> {
        if image.size() != self.size {
            return Err(CalibError::SizeMismatch {
                expected_width: self.size.width,
                expected_height: self.size.height,
                width: image.width(),
                height: image.height(),
            });
        }

        if let Some(alpha) = alpha {
            if alpha != self.alpha {
                self.alpha = alpha;
                self.new_k = optimal_new_camera_matrix(&self.k, &self.dist, self.size, alpha);
                let (map_x, map_y) = build_maps(&self.k, &self.dist, &self.new_k, self.size)?;
                self.map_x = map_x;
                self.map_y = map_y;
            }
        }

        let src = image.cast::<f32>()?;
        let mut dst = Image::<f32, C>::from_size_val(self.size, 0.0)?;
        remap(
            &src,
            &mut dst,
            &self.map_x,
            &self.map_y,
            InterpolationMode::Bilinear,
        )?;

        let data = dst
            .as_slice()
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        Ok(Image::new(self.size, data)?)
    }
}

/// Build the inverse-distortion maps: for every destination pixel under the
/// new camera matrix, the distorted source position under the original one.
fn build_maps(
    k: &Matrix3<f64>,
    dist: &DistortionCoefficients,
    new_k: &Matrix3<f64>,
    size: ImageSize,
) -> Result<(Image<f32, 1>, Image<f32, 1>), CalibError> {
    let (fx, fy) = (k[(0, 0)], k[(1, 1)]);
    let (cx, cy) = (k[(0, 2)], k[(1, 2)]);
    let (nfx, nfy) = (new_k[(0, 0)], new_k[(1, 1)]);
    let (ncx, ncy) = (new_k[(0, 2)], new_k[(1, 2)]);

    let maps = meshgrid_from_fn(size.width, size.height, |u, v| {
        let x = (u as f64 - ncx) / nfx;
        let y = (v as f64 - ncy) / nfy;
        let (xd, yd) = dist.distort(x, y);
        Ok(((fx * xd + cx) as f32, (fy * yd + cy) as f32))
    })?;

    Ok(maps)
}

/// Derive a new camera matrix trading cropped pixels against black filler.
///
/// Border pixels are pushed through the inverse distortion; the bounding
/// rectangle of all of them (alpha 1) is blended against the largest
/// all-valid rectangle (alpha 0).
fn optimal_new_camera_matrix(
    k: &Matrix3<f64>,
    dist: &DistortionCoefficients,
    size: ImageSize,
    alpha: f64,
) -> Matrix3<f64> {
    let alpha = alpha.clamp(0.0, 1.0);
    let (fx, fy) = (k[(0, 0)], k[(1, 1)]);
    let (cx, cy) = (k[(0, 2)], k[(1, 2)]);
    let (w, h) = (size.width as f64, size.height as f64);

    const SAMPLES: usize = 16;

    // undistorted normalized coordinates of the image border, per edge
    let mut top = Vec::with_capacity(SAMPLES);
    let mut bottom = Vec::with_capacity(SAMPLES);
    let mut left = Vec::with_capacity(SAMPLES);
    let mut right = Vec::with_capacity(SAMPLES);

    for i in 0..SAMPLES {
        let s = i as f64 / (SAMPLES - 1) as f64;

        let undist = |u: f64, v: f64| {
            let xd = (u - cx) / fx;
            let yd = (v - cy) / fy;
            dist.undistort(xd, yd)
        };

        top.push(undist(s * (w - 1.0), 0.0));
        bottom.push(undist(s * (w - 1.0), h - 1.0));
        left.push(undist(0.0, s * (h - 1.0)));
        right.push(undist(w - 1.0, s * (h - 1.0)));
    }

    let fold = |pts: &[(f64, f64)], pick: fn(&(f64, f64)) -> f64, max: bool| {
        pts.iter().map(pick).fold(
            if max { f64::NEG_INFINITY } else { f64::INFINITY },
            |acc, v| if max { acc.max(v) } else { acc.min(v) },
        )
    };

    let all: Vec<(f64, f64)> = top
        .iter()
        .chain(&bottom)
        .chain(&left)
        .chain(&right)
        .copied()
        .collect();

    // outer rectangle: every source pixel lands inside (alpha 1)
    let outer_x0 = fold(&all, |p| p.0, false);
    let outer_x1 = fold(&all, |p| p.0, true);
    let outer_y0 = fold(&all, |p| p.1, false);
    let outer_y1 = fold(&all, |p| p.1, true);

    // inner rectangle: no invalid pixels inside (alpha 0)
    let inner_x0 = fold(&left, |p| p.0, true);
    let inner_x1 = fold(&right, |p| p.0, false);
    let inner_y0 = fold(&top, |p| p.1, true);
    let inner_y1 = fold(&bottom, |p| p.1, false);

    let x0 = inner_x0 * (1.0 - alpha) + outer_x0 * alpha;
    let x1 = inner_x1 * (1.0 - alpha) + outer_x1 * alpha;
    let y0 = inner_y0 * (1.0 - alpha) + outer_y0 * alpha;
    let y1 = inner_y1 * (1.0 - alpha) + outer_y1 * alpha;

    let nfx = (w - 1.0) / (x1 - x0);
    let nfy = (h - 1.0) / (y1 - y0);

    Matrix3::new(nfx, 0.0, -x0 * nfx, 0.0, nfy, -y0 * nfy, 0.0, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn camera() -> Camera {
        Camera::new(
            Matrix3::new(300.0, 0.0, 160.0, 0.0, 300.0, 120.0, 0.0, 0.0, 1.0),
            DistortionCoefficients::from_slice(&[-0.25, 0.05, 0.0, 0.0, 0.0]),
            320,
            240,
        )
    }

    #[test]
    fn zero_distortion_keeps_image() -> Result<(), CalibError> {
        let cam = Camera::new(
            Matrix3::new(300.0, 0.0, 160.0, 0.0, 300.0, 120.0, 0.0, 0.0, 1.0),
            DistortionCoefficients::default(),
            320,
            240,
        );
        let mut und = Undistorter::new(&cam)?;

        let img = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 320,
                height: 240,
            },
            77,
        )?;
        let out = und.undistort(&img, None)?;
        assert_eq!(out.as_slice(), img.as_slice());
        Ok(())
    }

    #[test]
    fn size_mismatch_rejected() -> Result<(), CalibError> {
        let mut und = Undistorter::new(&camera())?;
        let img = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 64,
                height: 64,
            },
            0,
        )?;
        assert!(matches!(
            und.undistort(&img, None),
            Err(CalibError::SizeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn alpha_change_regenerates_maps() -> Result<(), CalibError> {
        let cam = camera();
        let mut und = Undistorter::new(&cam)?;
        let img = Image::<u8, 3>::from_size_val(
            ImageSize {
                width: 320,
                height: 240,
            },
            10,
        )?;

        let map_before = und.maps().0.clone();
        let k_before = *und.new_camera_matrix();

        let _ = und.undistort(&img, Some(1.0))?;
        assert_eq!(und.alpha(), 1.0);
        assert_ne!(und.maps().0.as_slice(), map_before.as_slice());
        assert_ne!(*und.new_camera_matrix(), k_before);

        // same alpha again: tables are reused untouched
        let map_alpha1 = und.maps().0.clone();
        let _ = und.undistort(&img, Some(1.0))?;
        assert_eq!(und.maps().0.as_slice(), map_alpha1.as_slice());
        Ok(())
    }

    #[test]
    fn alpha_zero_matrix_zooms_in_relative_to_alpha_one() -> Result<(), CalibError> {
        let cam = camera();
        let und0 = Undistorter::with_alpha(&cam, 0.0)?;
        let und1 = Undistorter::with_alpha(&cam, 1.0)?;
        // barrel distortion: retaining every source pixel needs a wider view,
        // hence a smaller focal length
        assert!(und1.new_camera_matrix()[(0, 0)] < und0.new_camera_matrix()[(0, 0)]);
        Ok(())
    }

    #[test]
    fn undistorted_center_is_stable() -> Result<(), CalibError> {
        let cam = camera();
        let und = Undistorter::new(&cam)?;
        let (map_x, map_y) = und.maps();
        // distortion vanishes at the principal point; the map there points
        // near the principal point of the source
        let cx = cam.k[(0, 2)];
        let cy = cam.k[(1, 2)];
        let nk = und.new_camera_matrix();
        let u = nk[(0, 2)].round() as usize;
        let v = nk[(1, 2)].round() as usize;
        let sx = map_x.get_pixel(u, v, 0)? as f64;
        let sy = map_y.get_pixel(u, v, 0)? as f64;
        assert_relative_eq!(sx, cx, epsilon = 2.0);
        assert_relative_eq!(sy, cy, epsilon = 2.0);
        Ok(())
    }
}
