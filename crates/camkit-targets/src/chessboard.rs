use camkit_image::Image;
use chess_corners::{find_chess_corners_image, ChessConfig, ThresholdMode};
use nalgebra::{Point2, Point3};

use crate::{order_grid, Detection, TargetError, TargetFinder};

/// Finder for a plain chessboard calibration target.
///
/// Corner detection is delegated to the `chess-corners` crate; this type
/// only selects the strongest corners and orders them into the expected
/// inner-corner grid.
pub struct ChessboardFinder {
    rows: usize,
    cols: usize,
    square_size: f64,
    config: ChessConfig,
}

impl ChessboardFinder {
    /// Create a finder for a board with `rows x cols` inner corners and the
    /// given physical square side (e.g. 0.02 for 2 cm squares, making the
    /// calibrated translations come out in meters).
    pub fn new(rows: usize, cols: usize, square_size: f64) -> Result<Self, TargetError> {
        if rows < 2 || cols < 2 {
            return Err(TargetError::InvalidPatternSize(rows, cols));
        }
        if square_size <= 0.0 {
            return Err(TargetError::InvalidScale(square_size));
        }

        let mut config = ChessConfig::single_scale();
        config.threshold_mode = ThresholdMode::Relative;
        config.threshold_value = 0.2;
        config.nms_radius = 2;

        Ok(Self {
            rows,
            cols,
            square_size,
            config,
        })
    }

    /// Replace the corner detector configuration.
    pub fn with_config(mut self, config: ChessConfig) -> Self {
        self.config = config;
        self
    }
}

impl TargetFinder for ChessboardFinder {
    fn kind(&self) -> &'static str {
        "Chessboard"
    }

    fn object_points(&self) -> Vec<Point3<f64>> {
        let mut pts = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                pts.push(Point3::new(
                    c as f64 * self.square_size,
                    r as f64 * self.square_size,
                    0.0,
                ));
            }
        }
        pts
    }

    fn find(&self, gray: &Image<u8, 1>) -> Result<Option<Detection>, TargetError> {
        let buffer = image::GrayImage::from_raw(
            gray.width() as u32,
            gray.height() as u32,
            gray.as_slice().to_vec(),
        )
        .ok_or(TargetError::ImageAdapter)?;

        let mut corners = find_chess_corners_image(&buffer, &self.config)?;

        let expected = self.rows * self.cols;
        if corners.len() < expected {
            log::debug!(
                "chessboard: {} corners detected, {} required",
                corners.len(),
                expected
            );
            return Ok(None);
        }

        // keep the strongest responses, drop spurious corners
        corners.sort_by(|a, b| b.response.total_cmp(&a.response));
        corners.truncate(expected);

        let positions: Vec<(f64, f64)> = corners
            .iter()
            .map(|c| (c.x as f64, c.y as f64))
            .collect();

        let Some(ordered) = order_grid(&positions, self.rows, self.cols) else {
            log::debug!("chessboard: corners do not assemble into a {}x{} grid",
                self.rows, self.cols);
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
