use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use shape_stream_common::frame::{encode_jpeg, Frame, FrameError};
use tracing::debug;

use crate::matcher::ShapeMatcher;
use crate::vision::contour::{extract, extract_gray, Contour};

/// Pixel offsets stamped for every outline segment (2px wide stroke).
const STROKE_OFFSETS: [(f32, f32); 3] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)];

/// Extraction + matching + overlay for one live frame against one template.
pub struct AnnotationPipeline {
    matcher: Box<dyn ShapeMatcher>,
    jpeg_quality: u8,
}

/// A live frame with matched outlines drawn on a private copy.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub image: RgbImage,
    pub frame_contours: usize,
    pub reference_contours: usize,
    pub matched: usize,
}

/// An annotated frame ready to be sent.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub jpeg: Vec<u8>,
    pub seq: u64,
    pub matched: usize,
}

impl AnnotationPipeline {
    pub fn new(matcher: Box<dyn ShapeMatcher>, jpeg_quality: u8) -> Self {
        Self {
            matcher,
            jpeg_quality,
        }
    }

    pub fn matcher_name(&self) -> &str {
        self.matcher.name()
    }

    /// Never fails: featureless frames come back as an unmodified copy.
    pub fn annotate(&self, live: &Frame, reference: &GrayImage) -> Annotation {
        let frame_contours = extract(&live.image);
        let reference_contours = extract_gray(reference);
        let matches = self
            .matcher
            .find_matches(&frame_contours, &reference_contours);

        let mut image = live.image.to_rgb8();
        for m in &matches {
            draw_outline(&mut image, &m.outline, m.role.color());
        }

        let annotation = Annotation {
            image,
            frame_contours: frame_contours.len(),
            reference_contours: reference_contours.len(),
            matched: matches.len(),
        };
        debug!(
            seq = live.seq,
            matcher = self.matcher.name(),
            frame_contours = annotation.frame_contours,
            reference_contours = annotation.reference_contours,
            matched = annotation.matched,
            "annotated frame"
        );
        annotation
    }

    /// Annotate and JPEG-encode. The error is the encode step's.
    pub fn render(&self, live: &Frame, reference: &GrayImage) -> Result<RenderedFrame, FrameError> {
        let annotation = self.annotate(live, reference);
        let jpeg = encode_jpeg(&DynamicImage::ImageRgb8(annotation.image), self.jpeg_quality)?;
        Ok(RenderedFrame {
            jpeg,
            seq: live.seq,
            matched: annotation.matched,
        })
    }
}

/// Stroke a closed outline onto the canvas. Segments are clipped at the edges.
pub fn draw_outline(canvas: &mut RgbImage, outline: &Contour, color: Rgb<u8>) {
    let points = &outline.points;
    for (i, start) in points.iter().enumerate() {
        let end = points[(i + 1) % points.len()];
        for (dx, dy) in STROKE_OFFSETS {
            draw_line_segment_mut(
                canvas,
                (start.x as f32 + dx, start.y as f32 + dy),
                (end.x as f32 + dx, end.y as f32 + dy),
                color,
            );
        }
    }
}
