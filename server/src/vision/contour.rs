use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::separable_filter_equal;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology::close;
use imageproc::point::Point;

/// 3-tap binomial kernel: a 3x3 Gaussian with the default sigma for that size.
/// `canny` smooths again internally (sigma 1.4), so edges see both blurs.
const BLUR_KERNEL: [f32; 3] = [0.25, 0.5, 0.25];
/// Hysteresis thresholds tuned for low-quality webcam sensors.
const CANNY_LOW: f32 = 70.0;
const CANNY_HIGH: f32 = 250.0;
/// Chebyshev radius of the closing element (radius 3 = 7x7 square).
const CLOSE_RADIUS: u8 = 3;
/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
pub const APPROX_PERIMETER_RATIO: f64 = 0.001;

/// Closed boundary of one connected region, as ordered pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closed perimeter length.
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        arc_length(&self.points, true)
    }

    /// Douglas-Peucker approximation within `0.001 * perimeter`.
    ///
    /// Returns `None` for degenerate boundaries (fewer than three distinct
    /// vertices, or no perimeter), which matching skips.
    pub fn approximate(&self) -> Option<Contour> {
        let outline = Contour::new(dedup_closed(self.points.clone()));
        if outline.len() < 3 {
            return None;
        }
        let perimeter = outline.perimeter();
        if !(perimeter > 0.0) {
            return None;
        }
        // Passed as an open path: imageproc's closed mode expects the first
        // point repeated at the end and pops it, which would cost a vertex here.
        let approx =
            approximate_polygon_dp(&outline.points, APPROX_PERIMETER_RATIO * perimeter, false);
        let mut points = dedup_closed(approx);
        if points.len() < 3 {
            return None;
        }
        points.shrink_to_fit();
        Some(Contour::new(points))
    }
}

/// Run the fixed extraction pipeline on a colour or grayscale image.
///
/// grayscale -> 3x3 blur -> Canny(70, 250) -> 7x7 closing -> outermost
/// boundaries, each compressed to its direction-change points.
pub fn extract(image: &DynamicImage) -> Vec<Contour> {
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }
    match image {
        DynamicImage::ImageLuma8(gray) => extract_gray(gray),
        other => extract_gray(&other.to_luma8()),
    }
}

pub fn extract_gray(gray: &GrayImage) -> Vec<Contour> {
    if gray.width() == 0 || gray.height() == 0 {
        return Vec::new();
    }
    let blurred = separable_filter_equal(gray, &BLUR_KERNEL);
    let edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
    let closed = close(&edges, Norm::LInf, CLOSE_RADIUS);

    find_contours::<i32>(&closed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| Contour::new(compress_chain(&dedup_closed(c.points))))
        .filter(|c| !c.is_empty())
        .collect()
}

/// Keep only the points where the boundary changes direction, collapsing
/// straight horizontal, vertical and diagonal runs to their end points.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |a: Point<i32>, b: Point<i32>| ((b.x - a.x).signum(), (b.y - a.y).signum());
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            step(prev, cur) != step(cur, next)
        })
        .map(|i| points[i])
        .collect()
}

/// Drop consecutive duplicates and a closing point that repeats the first.
fn dedup_closed(mut points: Vec<Point<i32>>) -> Vec<Point<i32>> {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}
