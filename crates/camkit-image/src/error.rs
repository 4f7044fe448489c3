/// An error type for image construction and access.
#[derive(thiserror::Error, Debug)]
pub enum ImageError {
    /// Error when the pixel data length does not match the image shape.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images that must agree in size do not.
    #[error("Invalid image size ({0}x{1}), expected ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when a channel index is out of bounds.
    #[error("Channel index ({0}) out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when a pixel coordinate is out of bounds.
    #[error("Pixel coordinate ({0}, {1}) out of bounds ({2}x{3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when casting pixel data to another type fails.
    #[error("Failed to cast image data")]
    CastError,
}
