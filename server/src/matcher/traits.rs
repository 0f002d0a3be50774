use image::Rgb;

use crate::vision::Contour;

/// Which algorithm flagged a contour; decides the overlay colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRole {
    MomentMatch,
    DistanceMatch,
}

impl MatchRole {
    pub fn color(&self) -> Rgb<u8> {
        match self {
            MatchRole::MomentMatch => Rgb([255, 0, 0]),
            MatchRole::DistanceMatch => Rgb([145, 0, 0]),
        }
    }
}

/// A frame contour that resembles at least one reference contour.
#[derive(Debug, Clone, PartialEq)]
pub struct ContourMatch {
    /// Index into the frame contour set.
    pub index: usize,
    /// Simplified outline to draw.
    pub outline: Contour,
    pub role: MatchRole,
}

/// Contour-by-contour shape comparison against a reference set.
///
/// Every frame contour is tested against the reference contours in order and
/// reported at most once, on the first reference it resembles.
pub trait ShapeMatcher: Send + Sync {
    fn find_matches(&self, frame: &[Contour], reference: &[Contour]) -> Vec<ContourMatch>;

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}
