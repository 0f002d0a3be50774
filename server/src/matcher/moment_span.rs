use tracing::debug;

use super::traits::{ContourMatch, MatchRole, ShapeMatcher};
use crate::vision::{Contour, HuMoments};

/// Moment-span matcher.
///
/// Compares only the largest element of each contour's Hu descriptor: a frame
/// contour matches when `max(reference) - max(frame)` lies strictly inside
/// `(-span, span)`. The full seven-element distance proved too strict for
/// webcam-grade input; keep the single-element comparison as is.
pub struct MomentSpanMatcher {
    span: f64,
}

impl MomentSpanMatcher {
    pub const DEFAULT_SPAN: f64 = 0.028;

    pub fn new(span: f64) -> Self {
        Self { span }
    }
}

impl Default for MomentSpanMatcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SPAN)
    }
}

/// Strict on both sides: a difference of exactly `±span` is not a match.
pub fn within_span(delta: f64, span: f64) -> bool {
    -span < delta && delta < span
}

impl ShapeMatcher for MomentSpanMatcher {
    fn find_matches(&self, frame: &[Contour], reference: &[Contour]) -> Vec<ContourMatch> {
        let reference_peaks: Vec<f64> = reference
            .iter()
            .filter_map(Contour::approximate)
            .filter_map(|outline| HuMoments::of_contour(&outline))
            .map(|hu| hu.max_element())
            .collect();

        if reference_peaks.is_empty() {
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
            let peak = hu.max_element();
            if reference_peaks
                .iter()
                .any(|&reference_peak| within_span(reference_peak - peak, self.span))
            {
                matches.push(ContourMatch {
                    index,
                    outline,
                    role: MatchRole::MomentMatch,
                });
            }
        }

        debug!(
            frame_contours = frame.len(),
            reference_contours = reference_peaks.len(),
            matched = matches.len(),
            span = self.span,
            "moment-span comparison"
        );
        matches
    }

    fn name(&self) -> &str {
        "moment_span"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imageproc::point::Point;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Contour {
        Contour::new(vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ])
    }

    fn triangle(x: i32, y: i32, side: i32) -> Contour {
        Contour::new(vec![
            Point::new(x, y),
            Point::new(x + side, y),
            Point::new(x, y + side),
        ])
    }

    #[test]
    fn span_boundaries_are_exclusive() {
        let span = MomentSpanMatcher::DEFAULT_SPAN;
        assert!(!within_span(span, span));
        assert!(!within_span(-span, span));
        assert!(within_span(0.0, span));
        assert!(within_span(span * 0.99, span));
        assert!(within_span(-span * 0.99, span));
    }

    #[test]
    fn same_shape_at_other_scale_matches() {
        let matcher = MomentSpanMatcher::default();
        let matches = matcher.find_matches(&[rect(10, 10, 40, 40)], &[rect(0, 0, 90, 90)]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 0);
        assert_eq!(matches[0].role, MatchRole::MomentMatch);
    }

    #[test]
    fn elongated_bar_does_not_match_square() {
        let matcher = MomentSpanMatcher::default();
        let matches = matcher.find_matches(&[rect(0, 0, 120, 30)], &[rect(0, 0, 60, 60)]);
        assert!(matches.is_empty());
    }

    #[test]
    fn square_does_not_match_triangle() {
        // Peaks 1/6 and 2/9 are about 0.056 apart, twice the default span.
        let matcher = MomentSpanMatcher::default();
        assert!(matcher
            .find_matches(&[rect(0, 0, 60, 60)], &[triangle(0, 0, 60)])
            .is_empty());
        let matches = matcher.find_matches(&[triangle(10, 10, 20)], &[triangle(0, 0, 60)]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].outline.len(), 3);
    }

    #[test]
    fn matched_square_keeps_four_corners() {
        let matcher = MomentSpanMatcher::default();
        let matches = matcher.find_matches(&[rect(0, 0, 40, 40)], &[rect(0, 0, 60, 60)]);
        assert_eq!(matches[0].outline, rect(0, 0, 40, 40));
    }

    #[test]
    fn first_matching_reference_reports_once() {
        let matcher = MomentSpanMatcher::default();
        let reference = [rect(0, 0, 10, 10), rect(50, 50, 20, 20)];
        let matches = matcher.find_matches(&[rect(5, 5, 30, 30)], &reference);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn empty_reference_never_matches() {
        let matcher = MomentSpanMatcher::default();
        assert!(matcher.find_matches(&[rect(0, 0, 10, 10)], &[]).is_empty());
    }

    #[test]
    fn degenerate_contours_are_skipped() {
        let matcher = MomentSpanMatcher::default();
        let line = Contour::new(vec![Point::new(0, 0), Point::new(9, 0), Point::new(18, 0)]);
        let matches = matcher.find_matches(&[line, rect(0, 0, 8, 8)], &[rect(0, 0, 16, 16)]);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].index, 1);
    }
}
