mod gray;
mod hsv;
mod rgb;

pub use gray::{gray_from_rgb, gray_from_rgb_u8, rgb_from_gray};
pub use hsv::hsv_from_rgb;
pub use rgb::{bgr_from_rgb, rgb_from_bgr};

/// Color space of a captured or converted frame.
///
/// The numeric values match the legacy wire/config encoding where formats
/// were communicated as bit flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorSpace {
    /// Blue-green-red channel order.
    Bgr = 1,
    /// Red-green-blue channel order.
    Rgb = 2,
    /// Hue-saturation-value.
    Hsv = 4,
    /// Single-channel luminance.
    Gray = 8,
}

impl ColorSpace {
    /// Parse a colorspace from its numeric flag value.
    ///
    /// Unknown values are rejected rather than silently defaulted.
    pub fn from_flag(value: u8) -> Option<Self> {
        match value {
            1 => Some(ColorSpace::Bgr),
            2 => Some(ColorSpace::Rgb),
            4 => Some(ColorSpace::Hsv),
            8 => Some(ColorSpace::Gray),
            _ => None,
        }
    }
}

impl std::fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ColorSpace::Bgr => "BGR",
            ColorSpace::Rgb => "RGB",
            ColorSpace::Hsv => "HSV",
            ColorSpace::Gray => "GRAY",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colorspace_from_flag() {
        assert_eq!(ColorSpace::from_flag(2), Some(ColorSpace::Rgb));
        assert_eq!(ColorSpace::from_flag(8), Some(ColorSpace::Gray));
        assert_eq!(ColorSpace::from_flag(3), None);
        assert_eq!(ColorSpace::from_flag(0), None);
    }
}
