use super::geometry::{Point, Rect};

/// One detected face, expressed in the upright coordinate space of the image
/// the detector was given.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRegion {
    pub bounds: Rect,
    pub landmarks: Vec<Point>,
    pub tracking_id: Option<i32>,
}

impl FaceRegion {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            landmarks: Vec::new(),
            tracking_id: None,
        }
    }
}

/// The faces found in a single frame.
///
/// Consumed once by the compositor and then discarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Faces(Vec<FaceRegion>);

impl Faces {
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FaceRegion> {
        self.0.iter()
    }
}

impl From<Vec<FaceRegion>> for Faces {
    fn from(regions: Vec<FaceRegion>) -> Self {
        Self(regions)
    }
}

impl FromIterator<FaceRegion> for Faces {
    fn from_iter<I: IntoIterator<Item = FaceRegion>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Faces {
    type Item = &'a FaceRegion;
    type IntoIter = std::slice::Iter<'a, FaceRegion>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
