use std::collections::BTreeMap;
use std::str::FromStr;

use camkit_image::Image;
use nalgebra::{Point2, Point3};

use crate::{Detection, TargetError, TargetFinder};

/// Fiducial marker families supported by board descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFamily {
    /// AprilTag 16h5.
    Tag16h5,
    /// AprilTag 25h9.
    Tag25h9,
    /// AprilTag 36h11.
    Tag36h11,
    /// AprilTag Standard 41h12.
    TagStandard41h12,
}

impl FromStr for TagFamily {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag16h5" => Ok(TagFamily::Tag16h5),
            "tag25h9" => Ok(TagFamily::Tag25h9),
            "tag36h11" => Ok(TagFamily::Tag36h11),
            "tagStandard41h12" => Ok(TagFamily::TagStandard41h12),
            other => Err(TargetError::UnknownTagFamily(other.to_string())),
        }
    }
}

/// A single marker reported by a tag detector.
#[derive(Debug, Clone, PartialEq)]
pub struct TagDetection {
    /// Decoded marker ID.
    pub id: u32,
    /// Corner positions in pixels: lower-left first, counter-clockwise.
    pub corners: [(f64, f64); 4],
    /// Detector confidence; higher is better.
    pub decision_margin: f64,
}

impl TagDetection {
    /// Length of the shortest tag edge in pixels.
    pub fn min_side(&self) -> f64 {
        let mut min = f64::INFINITY;
        for i in 0..4 {
            let (x0, y0) = self.corners[i];
            let (x1, y1) = self.corners[(i + 1) % 4];
            min = min.min(((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt());
        }
        min
    }
}

/// A marker detector that can be plugged into a [`TagBoardFinder`].
///
/// The detection machinery itself lives outside this crate; any AprilTag or
/// ArUco implementation can be adapted by implementing this trait.
pub trait TagDetector {
    /// Detect markers in a grayscale image.
    fn detect(&self, gray: &Image<u8, 1>) -> Result<Vec<TagDetection>, TargetError>;
}

/// Number of marker-width units a tag occupies in the board layout.
const TAG_UNITS: f64 = 8.0;

/// Physical description of a grid of fiducial tags.
///
/// Tags are laid out on a `rows x cols` lattice. Each tag spans 8 layout
/// units; `spacing_units` empty units separate neighboring tags (and pad the
/// border), mirroring common printed tag-board generators. IDs run row-major
/// from zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TagBoard {
    /// Number of tag rows.
    pub rows: usize,
    /// Number of tag columns.
    pub cols: usize,
    /// Physical tag side length (e.g. meters).
    pub tag_size: f64,
    /// Gap between tags in layout units.
    pub spacing_units: f64,
    /// Marker family printed on the board.
    pub family: TagFamily,
}

impl TagBoard {
    /// Create a board description.
    pub fn new(
        rows: usize,
        cols: usize,
        tag_size: f64,
        family: TagFamily,
    ) -> Result<Self, TargetError> {
        if rows == 0 || cols == 0 {
            return Err(TargetError::InvalidPatternSize(rows, cols));
        }
        if tag_size <= 0.0 {
            return Err(TargetError::InvalidScale(tag_size));
        }
        Ok(Self {
            rows,
            cols,
            tag_size,
            spacing_units: 2.0,
            family,
        })
    }

    /// Override the inter-tag gap, in layout units.
    pub fn with_spacing_units(mut self, spacing_units: f64) -> Self {
        self.spacing_units = spacing_units;
        self
    }

    /// Ideal 3-D corner positions for every tag on the board, keyed by ID.
    ///
    /// Corner order matches [`TagDetection::corners`]: lower-left first,
    /// counter-clockwise. Coordinates are in physical units
    /// (`tag_size / 8` per layout unit), z = 0.
    pub fn ideal_corners(&self) -> BTreeMap<u32, [Point3<f64>; 4]> {
        let pitch = TAG_UNITS + self.spacing_units;
        let scale = self.tag_size / TAG_UNITS;

        let mut layout = BTreeMap::new();
        for i in 0..self.rows {
            for j in 0..self.cols {
                let id = (i * self.cols + j) as u32;
                let top = i as f64 * pitch + self.spacing_units;
                let left = j as f64 * pitch + self.spacing_units;
                let bottom = top + TAG_UNITS;
                let right = left + TAG_UNITS;

                layout.insert(
                    id,
                    [
                        Point3::new(left * scale, bottom * scale, 0.0),
                        Point3::new(right * scale, bottom * scale, 0.0),
                        Point3::new(right * scale, top * scale, 0.0),
                        Point3::new(left * scale, top * scale, 0.0),
                    ],
                );
            }
        }
        layout
    }
}

/// Finder for a tag board target, generic over the injected detector.
pub struct TagBoardFinder<D> {
    board: TagBoard,
    detector: D,
    min_decision_margin: f64,
    min_side_px: f64,
}

impl<D: TagDetector> TagBoardFinder<D> {
    /// Create a finder for the given board and detector.
    pub fn new(board: TagBoard, detector: D) -> Self {
        Self {
            board,
            detector,
            min_decision_margin: 20.0,
            min_side_px: 4.0,
        }
    }

    /// Reject detections below this decision margin.
    pub fn with_min_decision_margin(mut self, margin: f64) -> Self {
        self.min_decision_margin = margin;
        self
    }

    /// Reject detections whose shortest edge is below this pixel length.
    pub fn with_min_side_px(mut self, side: f64) -> Self {
        self.min_side_px = side;
        self
    }
}

impl<D: TagDetector> TargetFinder for TagBoardFinder<D> {
    fn kind(&self) -> &'static str {
        "TagBoard"
    }

    fn object_points(&self) -> Vec<Point3<f64>> {
        self.board
            .ideal_corners()
            .values()
            .flat_map(|corners| corners.iter().copied())
            .collect()
    }

    fn find(&self, gray: &Image<u8, 1>) -> Result<Option<Detection>, TargetError> {
        let detections = self.detector.detect(gray)?;
        let layout = self.board.ideal_corners();

        let mut accepted: Vec<&TagDetection> = Vec::new();
        let mut rejected = 0usize;
        for det in &detections {
            if det.decision_margin < self.min_decision_margin
                || det.min_side() < self.min_side_px
            {
                rejected += 1;
                continue;
            }
            if !layout.contains_key(&det.id) {
                log::warn!("tag id {} not part of the board layout", det.id);
                rejected += 1;
                continue;
            }
            accepted.push(det);
        }

        if rejected > 0 {
            log::debug!(
                "tag board: rejected {} of {} detections",
                rejected,
                detections.len()
            );
        }

        if accepted.is_empty() {
            return Ok(None);
        }

        accepted.sort_by_key(|d| d.id);

        let mut image_points = Vec::with_capacity(accepted.len() * 4);
        let mut object_points = Vec::with_capacity(accepted.len() * 4);
        let mut ids = Vec::with_capacity(accepted.len() * 4);

        for det in accepted {
            let ideal = &layout[&det.id];
            for (corner, obj) in det.corners.iter().zip(ideal.iter()) {
                image_points.push(Point2::new(corner.0, corner.1));
                object_points.push(*obj);
                ids.push(det.id);
            }
        }

        Ok(Some(Detection::new(
            image_points,
            object_points,
            Some(ids),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camkit_image::ImageSize;

    /// Detector stub replaying a scripted detection list.
    struct Scripted(Vec<TagDetection>);

    impl TagDetector for Scripted {
        fn detect(&self, _gray: &Image<u8, 1>) -> Result<Vec<TagDetection>, TargetError> {
            Ok(self.0.clone())
        }
    }

    fn tag(id: u32, x: f64, y: f64, side: f64, margin: f64) -> TagDetection {
        TagDetection {
            id,
            corners: [
                (x, y + side),
                (x + side, y + side),
                (x + side, y),
                (x, y),
            ],
            decision_margin: margin,
        }
    }

    fn gray() -> Image<u8, 1> {
        Image::from_size_val(
            ImageSize {
                width: 64,
                height: 64,
            },
            0,
        )
        .unwrap()
    }

    #[test]
    fn family_parse_rejects_unknown() {
        assert!(TagFamily::from_str("tag36h11").is_ok());
        assert!(matches!(
            TagFamily::from_str("tag99h1"),
            Err(TargetError::UnknownTagFamily(_))
        ));
    }

    #[test]
    fn layout_scales_with_tag_size() -> Result<(), TargetError> {
        let board = TagBoard::new(2, 3, 0.08, TagFamily::Tag36h11)?;
        let layout = board.ideal_corners();
        assert_eq!(layout.len(), 6);

        // tag 0 upper-left corner sits one gap in from the board origin
        let scale = 0.08 / 8.0;
        let ul = layout[&0][3];
        assert!((ul.x - 2.0 * scale).abs() < 1e-12);
        assert!((ul.y - 2.0 * scale).abs() < 1e-12);

        // tag edges span exactly tag_size
        let ll = layout[&0][0];
        assert!((ll.y - ul.y - 0.08).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn filters_margin_size_and_unknown_ids() -> Result<(), TargetError> {
        let board = TagBoard::new(2, 2, 0.08, TagFamily::Tag36h11)?;
        let finder = TagBoardFinder::new(
            board,
            Scripted(vec![
                tag(0, 10.0, 10.0, 12.0, 80.0),
                tag(1, 30.0, 10.0, 12.0, 5.0),   // low margin
                tag(2, 10.0, 30.0, 1.0, 80.0),   // too small
                tag(99, 30.0, 30.0, 12.0, 80.0), // not on the board
            ]),
        );

        let det = finder.find(&gray())?.expect("one tag survives");
        assert_eq!(det.len(), 4);
        assert_eq!(det.ids.as_deref(), Some(&[0u32, 0, 0, 0][..]));
        Ok(())
    }

    #[test]
    fn all_rejected_is_not_found() -> Result<(), TargetError> {
        let board = TagBoard::new(1, 1, 0.08, TagFamily::Tag36h11)?;
        let finder = TagBoardFinder::new(board, Scripted(vec![tag(0, 5.0, 5.0, 10.0, 1.0)]));
        assert!(finder.find(&gray())?.is_none());
        Ok(())
    }

    #[test]
    fn detections_sorted_by_id() -> Result<(), TargetError> {
        let board = TagBoard::new(1, 3, 0.08, TagFamily::Tag36h11)?;
        let finder = TagBoardFinder::new(
            board,
            Scripted(vec![
                tag(2, 50.0, 10.0, 10.0, 80.0),
                tag(0, 10.0, 10.0, 10.0, 80.0),
            ]),
        );
        let det = finder.find(&gray())?.unwrap();
        let ids = det.ids.unwrap();
        assert_eq!(&ids[..4], &[0, 0, 0, 0]);
        assert_eq!(&ids[4..], &[2, 2, 2, 2]);
        Ok(())
    }
}
