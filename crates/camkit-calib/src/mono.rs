use camkit_image::{Image, ImageSize};
use camkit_imgproc::color::gray_from_rgb_u8;
use camkit_targets::{Detection, TargetFinder};
use nalgebra::{DVector, Matrix3, Vector3};

use crate::distortion::{project_points, DistortionCoefficients};
use crate::error::CalibError;
use crate::linear::{homography_dlt, pose_from_homography};
use crate::optim::{solve_lm, ResidualFn, SolveOptions};
use crate::Camera;

/// Flags controlling which intrinsic parameters stay fixed during
/// refinement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibFlags {
    /// Keep the principal point at the image center.
    pub fix_principal_point: bool,
    /// Force the tangential coefficients p1, p2 to zero.
    pub zero_tangential: bool,
    /// Force the third radial coefficient k3 to zero.
    pub fix_k3: bool,
}

/// Diagnostics produced alongside a calibrated [`Camera`].
#[derive(Debug, Clone)]
pub struct CalibrationReport {
    /// Global RMS reprojection error in pixels.
    pub rms: f64,
    /// RMS reprojection error per accepted view.
    pub per_view_rms: Vec<f64>,
    /// Rodrigues rotation per accepted view.
    pub rvecs: Vec<Vector3<f64>>,
    /// Translation per accepted view.
    pub tvecs: Vec<Vector3<f64>>,
    /// The correspondences each accepted view contributed.
    pub detections: Vec<Detection>,
    /// Input indices of the accepted views.
    pub used_images: Vec<usize>,
    /// Input indices where the target was not found.
    pub bad_images: Vec<usize>,
}

/// Mono camera calibrator.
///
/// Accumulates target detections over an image set, builds the initial
/// intrinsic guess from the image size and refines all parameters with the
/// external Levenberg-Marquardt solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonoCalibrator {
    flags: CalibFlags,
    opts: SolveOptions,
}

impl MonoCalibrator {
    /// Create a calibrator with default flags and solver options.
    pub fn new() -> Self {
        Self {
            flags: CalibFlags::default(),
            opts: SolveOptions::default(),
        }
    }

    /// Set the calibration flags.
    pub fn with_flags(mut self, flags: CalibFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the solver options.
    pub fn with_solve_options(mut self, opts: SolveOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Calibrate from grayscale images.
    ///
    /// Images where the target is not found (or that do not match the size
    /// of the first image) are recorded in the report and excluded;
    /// calibration fails only when nothing at all is detected.
    pub fn calibrate<F: TargetFinder>(
        &self,
        images: &[Image<u8, 1>],
        finder: &F,
    ) -> Result<(Camera, CalibrationReport), CalibError> {
        let Some(first) = images.first() else {
            return Err(CalibError::NoDetections);
        };
        let size = first.size();

        let mut accepted = Vec::new();
        let mut bad_images = Vec::new();

        for (idx, gray) in images.iter().enumerate() {
            if gray.size() != size {
                log::warn!(
                    "image[{}] is {}x{}, expected {}x{}; skipping",
                    idx,
                    gray.width(),
                    gray.height(),
                    size.width,
                    size.height
                );
                bad_images.push(idx);
                continue;
            }

            match finder.find(gray)? {
                Some(det) => accepted.push((idx, det)),
                None => bad_images.push(idx),
            }
        }

        if !bad_images.is_empty() {
            log::warn!("could not find markers in images: {:?}", bad_images);
        }

        self.calibrate_indexed(accepted, bad_images, size)
    }

    /// Calibrate from RGB images, converting to grayscale internally.
    pub fn calibrate_rgb<F: TargetFinder>(
        &self,
        images: &[Image<u8, 3>],
        finder: &F,
    ) -> Result<(Camera, CalibrationReport), CalibError> {
        let grays = images
            .iter()
            .map(|img| {
                let mut gray = Image::<u8, 1>::from_size_val(img.size(), 0)?;
                gray_from_rgb_u8(img, &mut gray)?;
                Ok(gray)
            })
            .collect::<Result<Vec<_>, CalibError>>()?;
        self.calibrate(&grays, finder)
    }

    /// Calibrate directly from pre-collected correspondences.
    pub fn calibrate_detections(
        &self,
        detections: Vec<Detection>,
        image_size: ImageSize,
    ) -> Result<(Camera, CalibrationReport), CalibError> {
        let indexed = detections.into_iter().enumerate().collect();
        self.calibrate_indexed(indexed, Vec::new(), image_size)
    }

    fn calibrate_indexed(
        &self,
        detections: Vec<(usize, Detection)>,
        mut bad_images: Vec<usize>,
        image_size: ImageSize,
    ) -> Result<(Camera, CalibrationReport), CalibError> {
        // drop frames that cannot constrain a homography
        let mut views = Vec::with_capacity(detections.len());
        for (idx, det) in detections {
            if det.len() < 4 {
                log::warn!(
                    "image[{}] has only {} correspondences; skipping",
                    idx,
                    det.len()
                );
                bad_images.push(idx);
                continue;
            }
            views.push((idx, det));
        }

        if views.is_empty() {
            return Err(CalibError::NoDetections);
        }

        let (w, h) = (image_size.width as f64, image_size.height as f64);

        // focal length heuristic from the image width, principal point at
        // the image center
        let f = 0.8 * w;
        let (cx, cy) = (w / 2.0, h / 2.0);
        let k0 = Matrix3::new(f, 0.0, cx, 0.0, f, cy, 0.0, 0.0, 1.0);

        let mut used_images = Vec::with_capacity(views.len());
        let mut dets = Vec::with_capacity(views.len());
        let mut poses = Vec::with_capacity(views.len());

        for (idx, det) in views {
            let hom = match homography_dlt(&det.object_points, &det.image_points) {
                Ok(h) => h,
                Err(err) => {
                    log::warn!("image[{}] rejected: {}", idx, err);
                    bad_images.push(idx);
                    continue;
                }
            };
            let pose = match pose_from_homography(&hom, &k0) {
                Ok(p) => p,
                Err(err) => {
                    log::warn!("image[{}] rejected: {}", idx, err);
                    bad_images.push(idx);
                    continue;
                }
            };
            used_images.push(idx);
            dets.push(det);
            poses.push(pose);
        }

        if dets.is_empty() {
            return Err(CalibError::NoDetections);
        }

        let problem = MonoProblem {
            detections: &dets,
            flags: self.flags,
            init_cx: cx,
            init_cy: cy,
        };

        let x0 = problem.pack(&k0, &DistortionCoefficients::default(), &poses);
        let (x, converged) = solve_lm(&problem, x0, &self.opts);
        if !converged {
            log::warn!("mono calibration solver stopped before convergence");
        }

        let (k, dist, poses) = problem.unpack(&x);

        let residuals = problem.residuals(&x);
        let (rms, per_view_rms) = split_rms(&residuals, &dets);

        log::info!("mono calibration RMS: {:.3}px over {} views", rms, dets.len());

        let camera = Camera::new(k, dist, image_size.width, image_size.height);
        let (rvecs, tvecs) = poses.into_iter().unzip();

        let report = CalibrationReport {
            rms,
            per_view_rms,
            rvecs,
            tvecs,
            detections: dets,
            used_images,
            bad_images,
        };

        Ok((camera, report))
    }
}

/// Global and per-view RMS from a stacked residual vector.
fn split_rms(residuals: &DVector<f64>, detections: &[Detection]) -> (f64, Vec<f64>) {
    let mut per_view = Vec::with_capacity(detections.len());
    let mut offset = 0usize;
    let mut total = 0.0;
    let mut total_points = 0usize;

    for det in detections {
        let n = det.len();
        let view = residuals.rows(offset, 2 * n);
        let sq = view.norm_squared();
        per_view.push((sq / n as f64).sqrt());
        total += sq;
        total_points += n;
        offset += 2 * n;
    }

    ((total / total_points as f64).sqrt(), per_view)
}

struct MonoProblem<'a> {
    detections: &'a [Detection],
    flags: CalibFlags,
    init_cx: f64,
    init_cy: f64,
}

impl MonoProblem<'_> {
    fn pack(
        &self,
        k: &Matrix3<f64>,
        dist: &DistortionCoefficients,
        poses: &[(Vector3<f64>, Vector3<f64>)],
    ) -> DVector<f64> {
        let mut p = Vec::new();
        p.push(k[(0, 0)]);
        p.push(k[(1, 1)]);
        if !self.flags.fix_principal_point {
            p.push(k[(0, 2)]);
            p.push(k[(1, 2)]);
        }
        p.push(dist.k1);
        p.push(dist.k2);
        if !self.flags.zero_tangential {
            p.push(dist.p1);
            p.push(dist.p2);
        }
        if !self.flags.fix_k3 {
            p.push(dist.k3);
        }
        for (rvec, tvec) in poses {
            p.extend_from_slice(&[rvec.x, rvec.y, rvec.z, tvec.x, tvec.y, tvec.z]);
        }
        DVector::from_vec(p)
    }

    #[allow(clippy::type_complexity)]
    fn unpack(
        &self,
        p: &DVector<f64>,
    ) -> (
        Matrix3<f64>,
        DistortionCoefficients,
        Vec<(Vector3<f64>, Vector3<f64>)>,
    ) {
        let mut i = 0usize;
        let next = |i: &mut usize| {
            let v = p[*i];
            *i += 1;
            v
        };

        let fx = next(&mut i);
        let fy = next(&mut i);
        let (cx, cy) = if self.flags.fix_principal_point {
            (self.init_cx, self.init_cy)
        } else {
            (next(&mut i), next(&mut i))
        };

        let k1 = next(&mut i);
        let k2 = next(&mut i);
        let (p1, p2) = if self.flags.zero_tangential {
            (0.0, 0.0)
        } else {
            (next(&mut i), next(&mut i))
        };
        let k3 = if self.flags.fix_k3 {
            0.0
        } else {
            next(&mut i)
        };

        let k = Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);
        let dist = DistortionCoefficients { k1, k2, p1, p2, k3 };

        let mut poses = Vec::with_capacity(self.detections.len());
        for _ in 0..self.detections.len() {
            let rvec = Vector3::new(next(&mut i), next(&mut i), next(&mut i));
            let tvec = Vector3::new(next(&mut i), next(&mut i), next(&mut i));
            poses.push((rvec, tvec));
        }

        (k, dist, poses)
    }
}

impl ResidualFn for MonoProblem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let (k, dist, poses) = self.unpack(params);

        let total: usize = self.detections.iter().map(|d| d.len()).sum();
        let mut r = DVector::<f64>::zeros(2 * total);

        let mut offset = 0usize;
        for (det, (rvec, tvec)) in self.detections.iter().zip(poses.iter()) {
            let projected = project_points(&det.object_points, rvec, tvec, &k, &dist);
            for (proj, obs) in projected.iter().zip(det.image_points.iter()) {
                r[offset] = proj.x - obs.x;
                r[offset + 1] = proj.y - obs.y;
                offset += 2;
            }
        }

        r
    }
}
