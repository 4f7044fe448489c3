/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error manipulating the file system.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error decoding a JPEG image.
    #[error("Error with Jpeg decoding. {0}")]
    JpegDecodingError(#[from] zune_jpeg::errors::DecodeErrors),

    /// Error encoding a JPEG image.
    #[error("Error with Jpeg encoding. {0}")]
    JpegEncodingError(#[from] jpeg_encoder::EncodingError),

    /// Error encoding a PNG image.
    #[error("Failed to encode the png image. {0}")]
    PngEncodingError(String),

    /// Error decoding a PNG image.
    #[error("Failed to decode the png image. {0}")]
    PngDecodeError(String),

    /// Error creating the image container.
    #[error("Failed to create image. {0}")]
    ImageCreationError(#[from] camkit_image::ImageError),

    /// Error decoding an image through the image crate.
    #[error("Failed to decode the image. {0}")]
    ImageDecodeError(#[from] image::ImageError),

    /// Unsupported compression format string.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Channel count with no codec mapping.
    #[error("Unsupported channel count: {0}")]
    InvalidChannels(usize),

    /// Unknown colorspace flag for capture.
    #[error("Unknown color format: {0}")]
    InvalidColorSpace(u8),

    /// A frame payload exceeds the UDP datagram limit.
    #[error("Image exceeds UDP message size ({limit}): {size}")]
    PayloadTooLarge {
        /// Encoded frame size in bytes.
        size: usize,
        /// Maximum datagram payload size.
        limit: usize,
    },

    /// The capture source reported an unrecoverable failure.
    #[error("Capture failed: {0}")]
    CaptureError(String),
}
