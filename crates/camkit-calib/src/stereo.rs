use std::collections::BTreeMap;

use camkit_image::{Image, ImageSize};
use camkit_targets::{Detection, TargetFinder};
use nalgebra::{DVector, Matrix3, Rotation3, Vector3};

use crate::distortion::{project_points, DistortionCoefficients};
use crate::epipolar::{essential_from_pose, fundamental_from_pose};
use crate::error::CalibError;
use crate::mono::{CalibrationReport, MonoCalibrator};
use crate::optim::{solve_lm, ResidualFn, SolveOptions};
use crate::StereoCamera;

/// Flags controlling the stereo refinement stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StereoFlags {
    /// Keep the per-camera intrinsics exactly as mono calibration produced
    /// them and only refine the relative pose. When false, the intrinsics
    /// are treated as initial guesses and refined jointly.
    pub fix_intrinsic: bool,
}

impl Default for StereoFlags {
    fn default() -> Self {
        Self {
            fix_intrinsic: true,
        }
    }
}

/// Diagnostics produced alongside a calibrated [`StereoCamera`].
#[derive(Debug, Clone)]
pub struct StereoReport {
    /// Global RMS reprojection error over both views, in pixels.
    pub rms: f64,
    /// Mono calibration report for the left camera.
    pub left: CalibrationReport,
    /// Mono calibration report for the right camera.
    pub right: CalibrationReport,
    /// Input indices of the image pairs used for the stereo stage.
    pub pair_images: Vec<usize>,
    /// Total number of point correspondences matched across both views.
    pub matched_points: usize,
}

/// Keep only the correspondences visible in both views of an image pair.
///
/// Targets that carry marker IDs are intersected per ID (a marker seen by
/// one camera only is rejected). ID-less targets match when both views hold
/// the complete pattern, so equal-length detections pass through unchanged
/// and anything else is treated as not matched.
///
/// Returns the filtered left/right detections and the number of rejected
/// markers, or `None` when the pair shares nothing.
pub fn intersect_by_ids(
    left: &Detection,
    right: &Detection,
) -> Result<Option<(Detection, Detection, usize)>, CalibError> {
    match (&left.ids, &right.ids) {
        (None, None) => {
            if left.len() == right.len() && !left.is_empty() {
                Ok(Some((left.clone(), right.clone(), 0)))
            } else {
                Ok(None)
            }
        }
        (Some(lids), Some(rids)) => {
            let group = |ids: &[u32]| {
                let mut map: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
                for (i, &id) in ids.iter().enumerate() {
                    map.entry(id).or_default().push(i);
                }
                map
            };
            let lmap = group(lids);
            let rmap = group(rids);

            let mut l_img = Vec::new();
            let mut l_obj = Vec::new();
            let mut r_img = Vec::new();
            let mut r_obj = Vec::new();
            let mut kept_ids = Vec::new();
            let mut rejected = 0usize;

            for (id, lidx) in &lmap {
                match rmap.get(id) {
                    Some(ridx) if ridx.len() == lidx.len() => {
                        for (&li, &ri) in lidx.iter().zip(ridx.iter()) {
                            l_img.push(left.image_points[li]);
                            l_obj.push(left.object_points[li]);
                            r_img.push(right.image_points[ri]);
                            r_obj.push(right.object_points[ri]);
                            kept_ids.push(*id);
                        }
                    }
                    _ => rejected += 1,
                }
            }
            rejected += rmap.keys().filter(|id| !lmap.contains_key(id)).count();

            if kept_ids.is_empty() {
                return Ok(None);
            }

            let left = Detection::new(l_img, l_obj, Some(kept_ids.clone()))?;
            let right = Detection::new(r_img, r_obj, Some(kept_ids))?;
            Ok(Some((left, right, rejected)))
        }
        // one side carries IDs and the other does not; treat as unmatched
        _ => Ok(None),
    }
}

/// Stereo camera calibrator.
///
/// Runs mono calibration independently per camera, matches detections
/// between the views of each image pair and refines the relative pose (and
/// optionally the intrinsics) with the external solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct StereoCalibrator {
    flags: StereoFlags,
    mono: MonoCalibrator,
    opts: SolveOptions,
}

impl StereoCalibrator {
    /// Create a calibrator with default flags and solver options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stereo flags.
    pub fn with_flags(mut self, flags: StereoFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the mono calibrator used for the per-camera stage.
    pub fn with_mono(mut self, mono: MonoCalibrator) -> Self {
        self.mono = mono;
        self
    }

    /// Set the solver options for the stereo refinement.
    pub fn with_solve_options(mut self, opts: SolveOptions) -> Self {
        self.opts = opts;
        self
    }

    /// Calibrate from paired grayscale image sets.
    ///
    /// `left_images[i]` and `right_images[i]` must show the same instant.
    pub fn calibrate<F: TargetFinder>(
        &self,
        left_images: &[Image<u8, 1>],
        right_images: &[Image<u8, 1>],
        finder: &F,
    ) -> Result<(StereoCamera, StereoReport), CalibError> {
        if left_images.len() != right_images.len() {
            log::warn!(
                "left/right image counts differ ({} vs {}); using the common prefix",
                left_images.len(),
                right_images.len()
            );
        }
        let n = left_images.len().min(right_images.len());

        let run_side = |images: &[Image<u8, 1>]| -> Result<Vec<Option<Detection>>, CalibError> {
            let mut dets = Vec::with_capacity(n);
            for img in images.iter().take(n) {
                dets.push(finder.find(img)?);
            }
            Ok(dets)
        };

        let left_dets = run_side(left_images)?;
        let right_dets = run_side(right_images)?;

        let size = left_images
            .first()
            .map(|img| img.size())
            .ok_or(CalibError::NoPairs)?;

        self.calibrate_detections(left_dets, right_dets, size)
    }

    /// Calibrate directly from per-image detection results.
    pub fn calibrate_detections(
        &self,
        left_dets: Vec<Option<Detection>>,
        right_dets: Vec<Option<Detection>>,
        image_size: ImageSize,
    ) -> Result<(StereoCamera, StereoReport), CalibError> {
        // per-camera mono calibration over everything each camera saw
        let (cam_l, rep_l) = self.mono_side(&left_dets, image_size, "left")?;
        let (cam_r, rep_r) = self.mono_side(&right_dets, image_size, "right")?;

        // pose index per original image, per side
        let pose_index = |rep: &CalibrationReport, dets: &[Option<Detection>]| {
            let found: Vec<usize> = dets
                .iter()
                .enumerate()
                .filter_map(|(i, d)| d.as_ref().map(|_| i))
                .collect();
            rep.used_images
                .iter()
                .enumerate()
                .map(|(pose, &view)| (found[view], pose))
                .collect::<BTreeMap<usize, usize>>()
        };
        let l_poses = pose_index(&rep_l, &left_dets);
        let r_poses = pose_index(&rep_r, &right_dets);

        // match markers between views, pair by image index
        let mut pairs = Vec::new();
        let mut pair_images = Vec::new();
        let mut matched_points = 0usize;

        log::info!("removing markers not seen in both frames");
        for i in 0..left_dets.len().min(right_dets.len()) {
            let (Some(dl), Some(dr)) = (&left_dets[i], &right_dets[i]) else {
                continue;
            };
            let (Some(&pl), Some(&pr)) = (l_poses.get(&i), r_poses.get(&i)) else {
                continue;
            };

            let Some((ml, mr, rejected)) = intersect_by_ids(dl, dr)? else {
                log::warn!("image pair {}: no markers seen in both frames", i);
                continue;
            };
            if rejected > 0 {
                log::info!(
                    "image pair {}: rejected {} markers not seen in both frames",
                    i,
                    rejected
                );
            }
            if ml.len() < 4 {
                log::warn!("image pair {}: only {} shared markers; skipping", i, ml.len());
                continue;
            }

            matched_points += ml.len();
            pair_images.push(i);
            pairs.push(PairView {
                left: ml,
                right: mr,
                left_pose: (rep_l.rvecs[pl], rep_l.tvecs[pl]),
                right_pose: (rep_r.rvecs[pr], rep_r.tvecs[pr]),
            });
        }

        if pairs.is_empty() {
            return Err(CalibError::NoPairs);
        }
        log::info!("total markers found in both cameras: {}", matched_points);

        // initial relative pose averaged over the per-view extrinsics
        let (r0, t0) = average_relative_pose(&pairs)?;

        let problem = StereoProblem {
            pairs: &pairs,
            flags: self.flags,
            k1: cam_l.k,
            d1: cam_l.dist,
            k2: cam_r.k,
            d2: cam_r.dist,
        };

        let x0 = problem.pack(&r0, &t0);
        let (x, converged) = solve_lm(&problem, x0, &self.opts);
        if !converged {
            log::warn!("stereo refinement stopped before convergence");
        }

        let state = problem.unpack(&x);
        let residuals = problem.residuals(&x);
        let rms = (residuals.norm_squared() / (2.0 * matched_points as f64)).sqrt();
        log::info!("stereo calibration RMS: {:.3}px over {} pairs", rms, pairs.len());

        let r = *Rotation3::from_scaled_axis(state.rvec_rel).matrix();
        let t = state.tvec_rel;

        let e = essential_from_pose(&r, &t);
        let f = fundamental_from_pose(&state.k1, &state.k2, &r, &t, true)?;

        let stereo = StereoCamera {
            k1: state.k1,
            d1: state.d1,
            k2: state.k2,
            d2: state.d2,
            r,
            t,
            f,
            e,
            width: image_size.width,
            height: image_size.height,
        };

        let report = StereoReport {
            rms,
            left: rep_l,
            right: rep_r,
            pair_images,
            matched_points,
        };

        Ok((stereo, report))
    }

    fn mono_side(
        &self,
        dets: &[Option<Detection>],
        image_size: ImageSize,
        side: &str,
    ) -> Result<(crate::Camera, CalibrationReport), CalibError> {
        let found: Vec<Detection> = dets.iter().flatten().cloned().collect();
        let missing: Vec<usize> = dets
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.is_none().then_some(i))
            .collect();
        if !missing.is_empty() {
            log::warn!("{} camera: no markers in images {:?}", side, missing);
        }
        self.mono.calibrate_detections(found, image_size)
    }
}

struct PairView {
    left: Detection,
    right: Detection,
    left_pose: (Vector3<f64>, Vector3<f64>),
    right_pose: (Vector3<f64>, Vector3<f64>),
}

/// Chordal average of the per-view relative rotations and translations.
fn average_relative_pose(pairs: &[PairView]) -> Result<(Matrix3<f64>, Vector3<f64>), CalibError> {
    let mut m = Matrix3::<f64>::zeros();
    for pair in pairs {
        let rl = Rotation3::from_scaled_axis(pair.left_pose.0);
        let rr = Rotation3::from_scaled_axis(pair.right_pose.0);
        m += rr.matrix() * rl.matrix().transpose();
    }

    let svd = m.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| CalibError::DegenerateGeometry("SVD failed".into()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| CalibError::DegenerateGeometry("SVD failed".into()))?;
    let mut r = u * v_t;
    if r.determinant() < 0.0 {
        let flip = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        r = u * flip * v_t;
    }

    let mut t = Vector3::zeros();
    for pair in pairs {
        t += pair.right_pose.1 - r * pair.left_pose.1;
    }
    t /= pairs.len() as f64;

    Ok((r, t))
}

struct StereoState {
    rvec_rel: Vector3<f64>,
    tvec_rel: Vector3<f64>,
    k1: Matrix3<f64>,
    d1: DistortionCoefficients,
    k2: Matrix3<f64>,
    d2: DistortionCoefficients,
    left_poses: Vec<(Vector3<f64>, Vector3<f64>)>,
}

struct StereoProblem<'a> {
    pairs: &'a [PairView],
    flags: StereoFlags,
    k1: Matrix3<f64>,
    d1: DistortionCoefficients,
    k2: Matrix3<f64>,
    d2: DistortionCoefficients,
}

impl StereoProblem<'_> {
    fn pack(&self, r0: &Matrix3<f64>, t0: &Vector3<f64>) -> DVector<f64> {
        let rvec = Rotation3::from_matrix_unchecked(*r0).scaled_axis();

        let mut p = vec![rvec.x, rvec.y, rvec.z, t0.x, t0.y, t0.z];

        if !self.flags.fix_intrinsic {
            for (k, d) in [(&self.k1, &self.d1), (&self.k2, &self.d2)] {
                p.extend_from_slice(&[k[(0, 0)], k[(1, 1)], k[(0, 2)], k[(1, 2)]]);
                p.extend_from_slice(&d.to_array());
            }
        }

        for pair in self.pairs {
            let (rvec, tvec) = pair.left_pose;
            p.extend_from_slice(&[rvec.x, rvec.y, rvec.z, tvec.x, tvec.y, tvec.z]);
        }

        DVector::from_vec(p)
    }

    fn unpack(&self, p: &DVector<f64>) -> StereoState {
        let mut i = 0usize;
        let next = |i: &mut usize| {
            let v = p[*i];
            *i += 1;
            v
        };

        let rvec_rel = Vector3::new(next(&mut i), next(&mut i), next(&mut i));
        let tvec_rel = Vector3::new(next(&mut i), next(&mut i), next(&mut i));

        let (k1, d1, k2, d2) = if self.flags.fix_intrinsic {
            (self.k1, self.d1, self.k2, self.d2)
        } else {
            let read_cam = |i: &mut usize| {
                let fx = next(i);
                let fy = next(i);
                let cx = next(i);
                let cy = next(i);
                let d = DistortionCoefficients::from_slice(&[
                    next(i),
                    next(i),
                    next(i),
                    next(i),
                    next(i),
                ]);
                (
                    Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0),
                    d,
                )
            };
            let (k1, d1) = read_cam(&mut i);
            let (k2, d2) = read_cam(&mut i);
            (k1, d1, k2, d2)
        };

        let mut left_poses = Vec::with_capacity(self.pairs.len());
        for _ in 0..self.pairs.len() {
            let rvec = Vector3::new(next(&mut i), next(&mut i), next(&mut i));
            let tvec = Vector3::new(next(&mut i), next(&mut i), next(&mut i));
            left_poses.push((rvec, tvec));
        }

        StereoState {
            rvec_rel,
            tvec_rel,
            k1,
            d1,
            k2,
            d2,
            left_poses,
        }
    }
}

impl ResidualFn for StereoProblem<'_> {
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64> {
        let state = self.unpack(params);
        let r_rel = Rotation3::from_scaled_axis(state.rvec_rel);

        let total: usize = self.pairs.iter().map(|p| p.left.len()).sum();
        let mut r = DVector::<f64>::zeros(4 * total);

        let mut offset = 0usize;
        for (pair, (rvec_l, tvec_l)) in self.pairs.iter().zip(state.left_poses.iter()) {
            let proj_l = project_points(
                &pair.left.object_points,
                rvec_l,
                tvec_l,
                &state.k1,
                &state.d1,
            );

            // compose the right pose from the left pose and the relative one
            let rot_l = Rotation3::from_scaled_axis(*rvec_l);
            let rvec_r = (r_rel * rot_l).scaled_axis();
            let tvec_r = r_rel * tvec_l + state.tvec_rel;

            let proj_r = project_points(
                &pair.right.object_points,
                &rvec_r,
                &tvec_r,
                &state.k2,
                &state.d2,
            );

            for ((pl, ol), (pr, or)) in proj_l
                .iter()
                .zip(pair.left.image_points.iter())
                .zip(proj_r.iter().zip(pair.right.image_points.iter()))
            {
                r[offset] = pl.x - ol.x;
                r[offset + 1] = pl.y - ol.y;
                r[offset + 2] = pr.x - or.x;
                r[offset + 3] = pr.y - or.y;
                offset += 4;
            }
        }

        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Point3};

    fn tagged(ids: &[u32], base: f64) -> Detection {
        let mut img = Vec::new();
        let mut obj = Vec::new();
        let mut per_point_ids = Vec::new();
        for &id in ids {
            for c in 0..4u32 {
                img.push(Point2::new(base + id as f64 * 10.0 + c as f64, base));
                obj.push(Point3::new(id as f64, c as f64, 0.0));
                per_point_ids.push(id);
            }
        }
        Detection::new(img, obj, Some(per_point_ids)).unwrap()
    }

    #[test]
    fn intersection_keeps_shared_ids_only() -> Result<(), CalibError> {
        let left = tagged(&[0, 1, 2, 5], 0.0);
        let right = tagged(&[1, 2, 3], 100.0);

        let (ml, mr, rejected) = intersect_by_ids(&left, &right)?.expect("overlap exists");
        assert_eq!(ml.len(), 8); // ids 1 and 2, four corners each
        assert_eq!(mr.len(), 8);
        assert_eq!(ml.ids.as_ref().unwrap(), &[1, 1, 1, 1, 2, 2, 2, 2]);
        // ids 0 and 5 only left, id 3 only right
        assert_eq!(rejected, 3);

        // object points agree on matched markers
        assert_eq!(ml.object_points, mr.object_points);
        Ok(())
    }

    #[test]
    fn disjoint_ids_do_not_match() -> Result<(), CalibError> {
        let left = tagged(&[0, 1], 0.0);
        let right = tagged(&[2, 3], 0.0);
        assert!(intersect_by_ids(&left, &right)?.is_none());
        Ok(())
    }

    #[test]
    fn idless_requires_equal_lengths() -> Result<(), CalibError> {
        let mk = |n: usize| {
            Detection::new(
                (0..n).map(|i| Point2::new(i as f64, 0.0)).collect(),
                (0..n).map(|i| Point3::new(i as f64, 0.0, 0.0)).collect(),
                None,
            )
            .unwrap()
        };
        assert!(intersect_by_ids(&mk(6), &mk(6))?.is_some());
        assert!(intersect_by_ids(&mk(6), &mk(5))?.is_none());
        Ok(())
    }
}
