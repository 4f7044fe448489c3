//! Data sheets for a few commonly calibrated camera sensors.

/// Static description of a camera sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorPreset {
    /// Sensor model name.
    pub name: &'static str,
    /// Active sensor area (width, height) in millimeters.
    pub area_mm: (f64, f64),
    /// Native resolution (width, height) in pixels.
    pub resolution: (usize, usize),
    /// Lens focal length in millimeters, when the module has a fixed lens.
    pub focal_length_mm: Option<f64>,
}

impl SensorPreset {
    /// Field of view (horizontal, vertical) in degrees, when the focal
    /// length is known.
    pub fn fov(&self) -> Option<(f64, f64)> {
        self.focal_length_mm.map(|f| {
            (
                crate::fov(self.area_mm.0, f),
                crate::fov(self.area_mm.1, f),
            )
        })
    }
}

/// Raspberry Pi camera module v2 (Sony IMX219).
pub const RPI_V2: SensorPreset = SensorPreset {
    name: "Sony IMX219",
    area_mm: (3.68, 2.76),
    resolution: (3280, 2464),
    focal_length_mm: Some(3.04),
};

/// Raspberry Pi HQ camera (Sony IMX477); the lens is interchangeable.
pub const RPI_HQ: SensorPreset = SensorPreset {
    name: "Sony IMX477",
    area_mm: (6.287, 4.712),
    resolution: (4056, 3040),
    focal_length_mm: None,
};

/// eYs3D EX8029 stereo module (OV9714).
pub const EX8029: SensorPreset = SensorPreset {
    name: "OV9714",
    area_mm: (3.936, 2.460),
    resolution: (1296, 812),
    focal_length_mm: Some(3.11),
};
