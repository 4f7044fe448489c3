use camkit_image::Image;

/// A connected component extracted from a binary image.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Centroid of the component in pixel coordinates.
    pub centroid: (f64, f64),
    /// Number of foreground pixels in the component.
    pub area: usize,
    /// Bounding box as (min_x, min_y, max_x, max_y).
    pub bbox: (usize, usize, usize, usize),
}

impl Blob {
    /// Width of the bounding box in pixels.
    pub fn width(&self) -> usize {
        self.bbox.2 - self.bbox.0 + 1
    }

    /// Height of the bounding box in pixels.
    pub fn height(&self) -> usize {
        self.bbox.3 - self.bbox.1 + 1
    }
}

/// Extract 4-connected foreground components from a binary image.
///
/// Any non-zero pixel counts as foreground. Components with fewer than
/// `min_area` pixels are discarded.
pub fn find_blobs(binary: &Image<u8, 1>, min_area: usize) -> Vec<Blob> {
    let (cols, rows) = (binary.cols(), binary.rows());
    let data = binary.as_slice();

    let mut visited = vec![false; cols * rows];
    let mut blobs = Vec::new();
    let mut stack = Vec::new();

    for start in 0..cols * rows {
        if visited[start] || data[start] == 0 {
            continue;
        }

        let mut area = 0usize;
        let mut sum_x = 0f64;
        let mut sum_y = 0f64;
        let (mut min_x, mut min_y) = (usize::MAX, usize::MAX);
        let (mut max_x, mut max_y) = (0usize, 0usize);

        stack.push(start);
        visited[start] = true;

        while let Some(idx) = stack.pop() {
            let x = idx % cols;
            let y = idx / cols;

            area += 1;
            sum_x += x as f64;
            sum_y += y as f64;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);

            let mut push = |nidx: usize| {
                if !visited[nidx] && data[nidx] != 0 {
                    visited[nidx] = true;
                    stack.push(nidx);
                }
            };

            if x > 0 {
                push(idx - 1);
            }
            if x + 1 < cols {
                push(idx + 1);
            }
            if y > 0 {
                push(idx - cols);
            }
            if y + 1 < rows {
                push(idx + cols);
            }
        }

        if area >= min_area {
            blobs.push(Blob {
                centroid: (sum_x / area as f64, sum_y / area as f64),
                area,
                bbox: (min_x, min_y, max_x, max_y),
            });
        }
    }

    blobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::{ImageError, ImageSize};

    #[test]
    fn finds_two_separate_blobs() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 6,
            height: 3,
        };
        #[rustfmt::skip]
        let data = vec![
            255, 255, 0, 0, 255, 0,
            255, 255, 0, 0, 255, 0,
            0,   0,   0, 0, 0,   0,
        ];
        let img = Image::<u8, 1>::new(size, data)?;
        let mut blobs = find_blobs(&img, 1);
        blobs.sort_by(|a, b| a.area.cmp(&b.area).reverse());

        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].area, 4);
        assert_eq!(blobs[0].centroid, (0.5, 0.5));
        assert_eq!(blobs[1].area, 2);
        assert_eq!(blobs[1].centroid, (4.0, 0.5));
        Ok(())
    }

    #[test]
    fn min_area_filters_noise() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 4,
            height: 1,
        };
        let img = Image::<u8, 1>::new(size, vec![255, 0, 255, 255])?;
        let blobs = find_blobs(&img, 2);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 2);
        Ok(())
    }
}
