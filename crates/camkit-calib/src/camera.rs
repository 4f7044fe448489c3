use std::path::Path;

use nalgebra::{Matrix3, Matrix3x4, Vector3};
use serde::{Deserialize, Serialize};

use crate::distortion::DistortionCoefficients;
use crate::error::CalibError;

/// Diagonal field of view helper.
///
/// Returns the field of view in degrees for an image extent `w` and focal
/// length `f` in the same unit (both pixels, or both millimeters).
pub fn fov(w: f64, f: f64) -> f64 {
    2.0 * (w / (2.0 * f)).atan().to_degrees()
}

/// A calibrated monocular camera.
///
/// Holds the intrinsic matrix, lens distortion and the image size the
/// calibration is valid for. Constructed by mono calibration and treated as
/// immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// 3x3 intrinsic matrix.
    pub k: Matrix3<f64>,
    /// Lens distortion coefficients.
    pub dist: DistortionCoefficients,
    /// Calibrated image width in pixels.
    pub width: usize,
    /// Calibrated image height in pixels.
    pub height: usize,
}

impl Camera {
    /// Create a camera from its calibration results.
    pub fn new(
        k: Matrix3<f64>,
        dist: DistortionCoefficients,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            k,
            dist,
            width,
            height,
        }
    }

    /// Projection matrix `K [I | 0]`.
    pub fn projection_matrix(&self) -> Matrix3x4<f64> {
        let mut p = Matrix3x4::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.k);
        p
    }

    /// Horizontal field of view in degrees.
    pub fn fov_horizontal(&self) -> f64 {
        fov(self.width as f64, self.k[(0, 0)])
    }

    /// Vertical field of view in degrees.
    pub fn fov_vertical(&self) -> f64 {
        fov(self.height as f64, self.k[(1, 1)])
    }

    /// Serialize to the YAML document format (`K`, `d`, `h`, `w`).
    pub fn to_yaml(&self) -> Result<String, CalibError> {
        Ok(serde_yaml::to_string(&CameraFile::from(self))?)
    }

    /// Parse a camera from its YAML document format.
    pub fn from_yaml(doc: &str) -> Result<Self, CalibError> {
        let file: CameraFile = serde_yaml::from_str(doc)?;
        file.try_into()
    }

    /// Write the camera to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Read a camera from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

impl std::fmt::Display for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Camera[{}x{}]----------------------", self.width, self.height)?;
        writeln!(
            f,
            "  focalLength(x,y): {:.1} {:.1} px",
            self.k[(0, 0)],
            self.k[(1, 1)]
        )?;
        writeln!(
            f,
            "  principalPoint(x,y): {:.1} {:.1} px",
            self.k[(0, 2)],
            self.k[(1, 2)]
        )?;
        writeln!(f, "  distortionCoeffs: {:?}", self.dist.to_array())
    }
}

/// A calibrated stereo camera pair.
///
/// Two intrinsic/distortion pairs plus the pose of the right camera relative
/// to the left and the epipolar geometry matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoCamera {
    /// Left camera intrinsic matrix.
    pub k1: Matrix3<f64>,
    /// Left camera distortion.
    pub d1: DistortionCoefficients,
    /// Right camera intrinsic matrix.
    pub k2: Matrix3<f64>,
    /// Right camera distortion.
    pub d2: DistortionCoefficients,
    /// Rotation from the left to the right camera frame.
    pub r: Matrix3<f64>,
    /// Translation from the left to the right camera frame.
    pub t: Vector3<f64>,
    /// Fundamental matrix.
    pub f: Matrix3<f64>,
    /// Essential matrix.
    pub e: Matrix3<f64>,
    /// Calibrated image width in pixels.
    pub width: usize,
    /// Calibrated image height in pixels.
    pub height: usize,
}

impl StereoCamera {
    /// The left camera as a standalone [`Camera`].
    pub fn left(&self) -> Camera {
        Camera::new(self.k1, self.d1, self.width, self.height)
    }

    /// The right camera as a standalone [`Camera`].
    pub fn right(&self) -> Camera {
        Camera::new(self.k2, self.d2, self.width, self.height)
    }

    /// Left projection matrix `K1 [I | 0]`.
    pub fn projection_matrix_left(&self) -> Matrix3x4<f64> {
        self.left().projection_matrix()
    }

    /// Right projection matrix `K2 [R | T]`.
    pub fn projection_matrix_right(&self) -> Matrix3x4<f64> {
        let mut rt = Matrix3x4::zeros();
        rt.fixed_view_mut::<3, 3>(0, 0).copy_from(&self.r);
        rt.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.t);
        self.k2 * rt
    }

    /// Serialize to the YAML document format
    /// (`K1, d1, K2, d2, R, T, F, E, h, w`).
    pub fn to_yaml(&self) -> Result<String, CalibError> {
        Ok(serde_yaml::to_string(&StereoCameraFile::from(self))?)
    }

    /// Parse a stereo camera from its YAML document format.
    pub fn from_yaml(doc: &str) -> Result<Self, CalibError> {
        let file: StereoCameraFile = serde_yaml::from_str(doc)?;
        file.try_into()
    }

    /// Write the stereo camera to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Read a stereo camera from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }
}

impl std::fmt::Display for StereoCamera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Camera 1 --------------------------")?;
        write!(f, "{}", self.left())?;
        writeln!(f, "Camera 2 --------------------------")?;
        write!(f, "{}", self.right())?;
        writeln!(f, "Extrinsic Camera Parameters -------")?;
        writeln!(f, "  Translation: {:?}", [self.t.x, self.t.y, self.t.z])?;
        writeln!(f, "  Rotation:\n{}", self.r)?;
        writeln!(f, "  Essential Matrix:\n{}", self.e)?;
        writeln!(f, "  Fundamental Matrix:\n{}", self.f)
    }
}

// file schemas: matrices as nested number lists under fixed keys

fn matrix_to_rows(m: &Matrix3<f64>) -> Vec<Vec<f64>> {
    (0..3)
        .map(|r| (0..3).map(|c| m[(r, c)]).collect())
        .collect()
}

fn matrix_from_rows(rows: &[Vec<f64>], key: &str) -> Result<Matrix3<f64>, CalibError> {
    if rows.len() != 3 || rows.iter().any(|r| r.len() != 3) {
        return Err(CalibError::InvalidFile(format!("{} must be 3x3", key)));
    }
    Ok(Matrix3::new(
        rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
        rows[2][1], rows[2][2],
    ))
}

#[derive(Serialize, Deserialize)]
struct CameraFile {
    #[serde(rename = "K")]
    k: Vec<Vec<f64>>,
    d: Vec<f64>,
    h: usize,
    w: usize,
}

impl From<&Camera> for CameraFile {
    fn from(cam: &Camera) -> Self {
        Self {
            k: matrix_to_rows(&cam.k),
            d: cam.dist.to_array().to_vec(),
            h: cam.height,
            w: cam.width,
        }
    }
}

impl TryFrom<CameraFile> for Camera {
    type Error = CalibError;

    fn try_from(file: CameraFile) -> Result<Self, Self::Error> {
        Ok(Camera::new(
            matrix_from_rows(&file.k, "K")?,
            DistortionCoefficients::from_slice(&file.d),
            file.w,
            file.h,
        ))
    }
}

#[derive(Serialize, Deserialize)]
struct StereoCameraFile {
    #[serde(rename = "K1")]
    k1: Vec<Vec<f64>>,
    d1: Vec<f64>,
    #[serde(rename = "K2")]
    k2: Vec<Vec<f64>>,
    d2: Vec<f64>,
    #[serde(rename = "R")]
    r: Vec<Vec<f64>>,
    #[serde(rename = "T")]
    t: Vec<f64>,
    #[serde(rename = "F")]
    f: Vec<Vec<f64>>,
    #[serde(rename = "E")]
    e: Vec<Vec<f64>>,
    h: usize,
    w: usize,
}

impl From<&StereoCamera> for StereoCameraFile {
    fn from(cam: &StereoCamera) -> Self {
        Self {
            k1: matrix_to_rows(&cam.k1),
            d1: cam.d1.to_array().to_vec(),
            k2: matrix_to_rows(&cam.k2),
            d2: cam.d2.to_array().to_vec(),
            r: matrix_to_rows(&cam.r),
            t: vec![cam.t.x, cam.t.y, cam.t.z],
            f: matrix_to_rows(&cam.f),
            e: matrix_to_rows(&cam.e),
            h: cam.height,
            w: cam.width,
        }
    }
}

impl TryFrom<StereoCameraFile> for StereoCamera {
    type Error = CalibError;

    fn try_from(file: StereoCameraFile) -> Result<Self, Self::Error> {
        if file.t.len() != 3 {
            return Err(CalibError::InvalidFile("T must have 3 entries".into()));
        }
        Ok(StereoCamera {
            k1: matrix_from_rows(&file.k1, "K1")?,
            d1: DistortionCoefficients::from_slice(&file.d1),
            k2: matrix_from_rows(&file.k2, "K2")?,
            d2: DistortionCoefficients::from_slice(&file.d2),
            r: matrix_from_rows(&file.r, "R")?,
            t: Vector3::new(file.t[0], file.t[1], file.t[2]),
            f: matrix_from_rows(&file.f, "F")?,
            e: matrix_from_rows(&file.e, "E")?,
            width: file.w,
            height: file.h,
        })
    }
}
