use crate::error::ImageError;

/// Image size in pixels.
///
/// # Examples
///
/// ```
/// use camkit_image::ImageSize;
///
/// let image_size = ImageSize {
///     width: 10,
///     height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Represents an image with interleaved pixel data in row-major (H, W, C) order.
///
/// The container is a plain `Vec` so that codecs and pixel loops can operate
/// on the raw slice without an intermediate tensor layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const C: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const C: usize> Image<T, C>
where
    T: Copy,
{
    /// Create a new image from pixel data.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match `width * height * C`,
    /// an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use camkit_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::new(
    ///     ImageSize {
    ///         width: 10,
    ///         height: 20,
    ///     },
    ///     vec![0u8; 10 * 20 * 3],
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        if data.len() != size.width * size.height * C {
            return Err(ImageError::InvalidChannelShape(
                data.len(),
                size.width * size.height * C,
            ));
        }

        Ok(Self { size, data })
    }

    /// Create a new image filled with a constant value.
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError> {
        let data = vec![val; size.width * size.height * C];
        Image::new(size, data)
    }

    /// The size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// The width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// The height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// The number of rows (alias for height).
    pub fn rows(&self) -> usize {
        self.size.height
    }

    /// The number of columns (alias for width).
    pub fn cols(&self) -> usize {
        self.size.width
    }

    /// The number of channels.
    pub fn num_channels(&self) -> usize {
        C
    }

    /// The pixel data as a flat slice in (H, W, C) order.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// The pixel data as a mutable flat slice in (H, W, C) order.
    pub fn as_slice_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the image and return the underlying pixel data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Get a pixel value with bounds checking.
    ///
    /// # Errors
    ///
    /// If the coordinate or channel is out of bounds, an error is returned.
    pub fn get_pixel(&self, x: usize, y: usize, ch: usize) -> Result<T, ImageError> {
        if ch >= C {
            return Err(ImageError::ChannelIndexOutOfBounds(ch, C));
        }
        if x >= self.size.width || y >= self.size.height {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.size.width,
                self.size.height,
            ));
        }
        Ok(self.data[(y * self.size.width + x) * C + ch])
    }

    /// Set a pixel value with bounds checking.
    ///
    /// # Errors
    ///
    /// If the coordinate or channel is out of bounds, an error is returned.
    pub fn set_pixel(&mut self, x: usize, y: usize, ch: usize, val: T) -> Result<(), ImageError> {
        if ch >= C {
            return Err(ImageError::ChannelIndexOutOfBounds(ch, C));
        }
        if x >= self.size.width || y >= self.size.height {
            return Err(ImageError::PixelIndexOutOfBounds(
                x,
                y,
                self.size.width,
                self.size.height,
            ));
        }
        self.data[(y * self.size.width + x) * C + ch] = val;
        Ok(())
    }

    /// Get a pixel slice (all channels) without bounds checking.
    ///
    /// The caller must guarantee `x < width` and `y < height`.
    pub fn pixel_unchecked(&self, x: usize, y: usize) -> &[T] {
        let start = (y * self.size.width + x) * C;
        &self.data[start..start + C]
    }

    /// Cast the pixel data of the image to a different type.
    ///
    /// # Errors
    ///
    /// If any value cannot be represented in the target type, an error is
    /// returned.
    pub fn cast<U>(&self) -> Result<Image<U, C>, ImageError>
    where
        U: num_traits::NumCast + Copy,
        T: num_traits::NumCast,
    {
        let casted = self
            .data
            .iter()
            .map(|&x| U::from(x).ok_or(ImageError::CastError))
            .collect::<Result<Vec<U>, ImageError>>()?;

        Image::new(self.size, casted)
    }

    /// Extract a single channel as a one-channel image.
    ///
    /// # Errors
    ///
    /// If the channel index is out of bounds, an error is returned.
    pub fn channel(&self, channel: usize) -> Result<Image<T, 1>, ImageError> {
        if channel >= C {
            return Err(ImageError::ChannelIndexOutOfBounds(channel, C));
        }

        let channel_data = self
            .data
            .iter()
            .skip(channel)
            .step_by(C)
            .copied()
            .collect::<Vec<T>>();

        Image::new(self.size, channel_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_new_checks_shape() {
        let size = ImageSize {
            width: 4,
            height: 3,
        };
        assert!(Image::<u8, 1>::new(size, vec![0u8; 12]).is_ok());
        assert!(Image::<u8, 1>::new(size, vec![0u8; 11]).is_err());
        assert!(Image::<u8, 3>::new(size, vec![0u8; 36]).is_ok());
    }

    #[test]
    fn image_pixel_access() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 2,
        };
        let mut img = Image::<u8, 1>::from_size_val(size, 0)?;
        img.set_pixel(1, 0, 0, 7)?;
        assert_eq!(img.get_pixel(1, 0, 0)?, 7);
        assert_eq!(img.get_pixel(0, 1, 0)?, 0);
        assert!(img.get_pixel(2, 0, 0).is_err());
        Ok(())
    }

    #[test]
    fn image_channel_extract() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let img = Image::<u8, 3>::new(size, vec![1, 2, 3, 4, 5, 6])?;
        let g = img.channel(1)?;
        assert_eq!(g.as_slice(), &[2, 5]);
        assert!(img.channel(3).is_err());
        Ok(())
    }

    #[test]
    fn image_cast_roundtrip() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 1,
        };
        let img = Image::<u8, 1>::new(size, vec![10, 250])?;
        let f = img.cast::<f32>()?;
        assert_eq!(f.as_slice(), &[10.0, 250.0]);
        let back = f.cast::<u8>()?;
        assert_eq!(back.as_slice(), img.as_slice());
        Ok(())
    }
}
