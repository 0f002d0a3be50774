use tracing::debug;

use super::traits::{ContourMatch, MatchRole, ShapeMatcher};
use crate::vision::{Contour, HuMoments};

/// Hu invariants at or below this magnitude carry no usable log value.
const HU_EPSILON: f64 = 1.0e-5;

/// Shape-distance matcher: a frame contour matches when its log-Hu distance
/// to any reference contour is strictly below `comp_factor`.
pub struct ShapeDistanceMatcher {
    comp_factor: f64,
}

impl ShapeDistanceMatcher {
    pub const DEFAULT_COMP_FACTOR: f64 = 0.1;

    pub fn new(comp_factor: f64) -> Self {
        Self { comp_factor }
    }
}

impl Default for ShapeDistanceMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COMP_FACTOR)
    }
}

/// Sum over the Hu invariants of `|1/mR - 1/mF|`, with `m = sign(h) * log10|h|`.
///
/// Elements where either descriptor is within `1e-5` of zero are left out.
/// Always pass the frame contour first and the reference second.
pub fn shape_distance(frame: &HuMoments, reference: &HuMoments) -> f64 {
    frame
        .0
        .iter()
        .zip(reference.0.iter())
        .filter(|(f, r)| f.abs() > HU_EPSILON && r.abs() > HU_EPSILON)
        .map(|(f, r)| {
            let mf = f.signum() * f.abs().log10();
            let mr = r.signum() * r.abs().log10();
            (-1.0 / mf + 1.0 / mr).abs()
        })
        .sum()
}

/// Strict less-than: a distance equal to `comp_factor` is not a match.
pub fn below_factor(distance: f64, comp_factor: f64) -> bool {
    distance < comp_factor
}

impl ShapeMatcher for ShapeDistanceMatcher {
    fn find_matches(&self, frame: &[Contour], reference: &[Contour]) -> Vec<ContourMatch> {
        let reference_hu: Vec<HuMoments> = reference
            .iter()
            .filter_map(Contour::approximate)
            .filter_map(|outline| HuMoments::of_contour(&outline))
            .collect();

        if reference_hu.is_empty() {
            debug!(frame_contours = frame.len(), "no usable reference contours");
            return Vec::new();
        }

        let mut matches = Vec::new();
        for (index, contour) in frame.iter().enumerate() {
            let Some(outline) = contour.approximate() else {
                continue;
            };
            let Some(hu) = HuMoments::of_contour(&outline) else {
                continue;
            };
            if reference_hu
                .iter()
                .any(|reference| below_factor(shape_distance(&hu, reference), self.comp_factor))
            {
                matches.push(ContourMatch {
                    index,
                    outline,
                    role: MatchRole::DistanceMatch,
                });
            }
        }

        debug!(
            frame_contours = frame.len(),
            reference_contours = reference_hu.len(),
            matched = matches.len(),
            comp_factor = self.comp_factor,
            "shape-distance comparison"
        );
        matches
    }

    fn name(&self) -> &str {
        "shape_distance"
    }
}
