use camkit_image::Image;
use camkit_imgproc::blobs::find_blobs;
use camkit_imgproc::threshold::{mean_intensity, threshold_binary_inverse};
use nalgebra::{Point2, Point3};

use crate::{order_grid, Detection, TargetError, TargetFinder};

/// Layout of a circle grid target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircleGridKind {
    /// Regular rows-by-columns lattice.
    Symmetric,
    /// Every other row offset by half the column pitch (OpenCV-style
    /// asymmetric grid).
    Asymmetric,
}

/// Finder for a printed circle grid target.
///
/// Dark circles on a light background are segmented with an inverse
/// threshold at the image mean, blob centroids become the feature points and
/// are ordered into the expected grid.
pub struct CircleGridFinder {
    rows: usize,
    cols: usize,
    spacing: f64,
    kind: CircleGridKind,
    min_blob_area: usize,
}

impl CircleGridFinder {
    /// Create a finder for a `rows x cols` grid with the given physical
    /// center-to-center spacing.
    pub fn new(
        rows: usize,
        cols: usize,
        spacing: f64,
        kind: CircleGridKind,
    ) -> Result<Self, TargetError> {
        if rows < 2 || cols < 2 {
            return Err(TargetError::InvalidPatternSize(rows, cols));
        }
        if spacing <= 0.0 {
            return Err(TargetError::InvalidScale(spacing));
        }
        Ok(Self {
            rows,
            cols,
            spacing,
            kind,
            min_blob_area: 9,
        })
    }

    /// Minimum blob area in pixels; smaller components are treated as noise.
    pub fn with_min_blob_area(mut self, min_blob_area: usize) -> Self {
        self.min_blob_area = min_blob_area;
        self
    }
}

impl TargetFinder for CircleGridFinder {
    fn kind(&self) -> &'static str {
        match self.kind {
            CircleGridKind::Symmetric => "CircleGrid",
            CircleGridKind::Asymmetric => "AsymmetricCircleGrid",
        }
    }

    fn object_points(&self) -> Vec<Point3<f64>> {
        let mut pts = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                let x = match self.kind {
                    CircleGridKind::Symmetric => c as f64 * self.spacing,
                    CircleGridKind::Asymmetric => {
                        (2.0 * c as f64 + (r % 2) as f64) * self.spacing
                    }
                };
                pts.push(Point3::new(x, r as f64 * self.spacing, 0.0));
            }
        }
        pts
    }

    fn find(&self, gray: &Image<u8, 1>) -> Result<Option<Detection>, TargetError> {
        let mut binary = Image::<u8, 1>::from_size_val(gray.size(), 0)?;
        let thresh = mean_intensity(gray) as u8;
        threshold_binary_inverse(gray, &mut binary, thresh, 255)?;

        let mut blobs = find_blobs(&binary, self.min_blob_area);

        let expected = self.rows * self.cols;
        if blobs.len() < expected {
            log::debug!(
                "circle grid: {} blobs detected, {} required",
                blobs.len(),
                expected
            );
            return Ok(None);
        }

        // circles on the same target print at the same size; keep the
        // components closest to the median area
        blobs.sort_by(|a, b| a.area.cmp(&b.area));
        let median = blobs[blobs.len() / 2].area as f64;
        blobs.retain(|b| {
            let a = b.area as f64;
            a >= median / 4.0 && a <= median * 4.0
        });

        if blobs.len() != expected {
            // too many similar-sized components, keep the largest
            if blobs.len() > expected {
                blobs.sort_by(|a, b| b.area.cmp(&a.area));
                blobs.truncate(expected);
            } else {
                return Ok(None);
            }
        }

        let positions: Vec<(f64, f64)> = blobs.iter().map(|b| b.centroid).collect();
        let Some(ordered) = order_grid(&positions, self.rows, self.cols) else {
            return Ok(None);
        };

        let image_points = ordered
            .iter()
            .map(|&(x, y)| Point2::new(x, y))
            .collect::<Vec<_>>();

        Ok(Some(Detection::new(
            image_points,
            self.object_points(),
            None,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;
    use camkit_imgproc::draw::draw_filled_circle;

    fn render_grid(rows: usize, cols: usize, step: i64, radius: i64) -> Image<u8, 1> {
        let size = ImageSize {
            width: (cols as i64 * step + 2 * step) as usize,
            height: (rows as i64 * step + 2 * step) as usize,
        };
        let mut img = Image::<u8, 1>::from_size_val(size, 255).unwrap();
        for r in 0..rows {
            for c in 0..cols {
                draw_filled_circle(
                    &mut img,
                    (step + c as i64 * step, step + r as i64 * step),
                    radius,
                    [0],
                );
            }
        }
        img
    }

    #[test]
    fn finds_symmetric_grid() -> Result<(), TargetError> {
        let finder = CircleGridFinder::new(4, 5, 0.03, CircleGridKind::Symmetric)?;
        let img = render_grid(4, 5, 20, 4);

        let det = finder.find(&img)?.expect("grid should be found");
        assert_eq!(det.len(), 20);
        assert!(det.ids.is_none());

        // first point is the top-left circle center
        let p0 = det.image_points[0];
        assert!((p0.x - 20.0).abs() < 1.0);
        assert!((p0.y - 20.0).abs() < 1.0);
        Ok(())
    }

    #[test]
    fn blank_image_finds_nothing() -> Result<(), TargetError> {
        let finder = CircleGridFinder::new(4, 5, 0.03, CircleGridKind::Symmetric)?;
        let img = Image::<u8, 1>::from_size_val(
            ImageSize {
                width: 100,
                height: 100,
            },
            255,
        )?;
        assert!(finder.find(&img)?.is_none());
        Ok(())
    }

    #[test]
    fn asymmetric_object_points_staggered() -> Result<(), TargetError> {
        let finder = CircleGridFinder::new(3, 2, 1.0, CircleGridKind::Asymmetric)?;
        let pts = finder.object_points();
        assert_eq!(pts[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(pts[1], Point3::new(2.0, 0.0, 0.0));
        // odd row offset by one spacing
        assert_eq!(pts[2], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(pts[3], Point3::new(3.0, 1.0, 0.0));
        Ok(())
    }
}
