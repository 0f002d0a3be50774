use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

/// A decoded camera frame with arrival metadata.
///
/// Pixel data is never modified in place once a frame has been handed to
/// another stage; stages that draw on it work on their own copy.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    /// Wall-clock arrival time (Unix millis).
    pub captured_at_ms: i64,
    /// Per-process arrival order.
    pub seq: u64,
}

impl Frame {
    pub fn new(image: DynamicImage, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            image,
            captured_at_ms,
            seq,
        }
    }

    /// Decode an encoded image payload (JPEG, PNG, ...) into a colour frame.
    pub fn decode(data: &[u8], captured_at_ms: i64, seq: u64) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        let decoded = image::load_from_memory(data).map_err(FrameError::Decode)?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(FrameError::ZeroSized);
        }
        let image = DynamicImage::ImageRgb8(decoded.to_rgb8());
        Ok(Self::new(image, captured_at_ms, seq))
    }

    /// JPEG-encode the frame as RGB8. Grayscale frames are expanded to three channels.
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, FrameError> {
        encode_jpeg(&self.image, quality)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn is_grayscale(&self) -> bool {
        matches!(
            self.image,
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_)
        )
    }
}

/// JPEG-encode any image as RGB8.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, FrameError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(FrameError::ZeroSized);
    }
    let rgb = image.to_rgb8();
    let mut buf = Vec::with_capacity(64 * 1024);
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&rgb).map_err(FrameError::Encode)?;
    Ok(buf)
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is empty")]
    Empty,
    #[error("frame has zero width or height")]
    ZeroSized,
    #[error("failed to decode frame: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode frame: {0}")]
    Encode(image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn sample_jpeg() -> Vec<u8> {
        let img = RgbImage::from_pixel(32, 24, Rgb([200, 40, 40]));
        encode_jpeg(&DynamicImage::ImageRgb8(img), 90).unwrap()
    }

    #[test]
    fn decode_produces_colour_frame() {
        let frame = Frame::decode(&sample_jpeg(), 1708300000000, 3).unwrap();
        assert_eq!(frame.width(), 32);
        assert_eq!(frame.height(), 24);
        assert_eq!(frame.seq, 3);
        assert!(!frame.is_grayscale());
        assert!(matches!(frame.image, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn decode_rejects_empty_payload() {
        assert!(matches!(Frame::decode(&[], 0, 0), Err(FrameError::Empty)));
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = Frame::decode(b"definitely not an image", 0, 0);
        assert!(matches!(result, Err(FrameError::Decode(_))));
    }

    #[test]
    fn grayscale_frames_encode_as_jpeg() {
        let gray = GrayImage::from_pixel(16, 16, Luma([128]));
        let frame = Frame::new(DynamicImage::ImageLuma8(gray), 0, 0);
        assert!(frame.is_grayscale());
        let jpeg = frame.encode_jpeg(80).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
