use std::convert::Infallible;
use std::sync::Arc;

use async_stream::stream;
use bytes::Bytes;
use futures_util::Stream;
use shape_stream_common::frame::{Frame, FrameError};
use shape_stream_common::mjpeg::encode_part;
use tracing::{debug, error, info, warn};

use crate::annotate::{AnnotationPipeline, RenderedFrame};
use crate::slot::FrameSlot;
use crate::template::ReferenceTemplate;

/// Turns the frames arriving in a [`FrameSlot`] into an endless sequence of
/// annotated multipart JPEG parts, one sequence per outbound connection.
pub struct StreamProducer {
    slot: FrameSlot,
    template: Arc<ReferenceTemplate>,
    pipeline: AnnotationPipeline,
}

impl StreamProducer {
    pub fn new(slot: FrameSlot, template: Arc<ReferenceTemplate>, pipeline: AnnotationPipeline) -> Self {
        Self {
            slot,
            template,
            pipeline,
        }
    }

    pub fn matcher_name(&self) -> &str {
        self.pipeline.matcher_name()
    }

    /// Annotate one frame against the current template. CPU-bound and may
    /// touch the disk; run it on the blocking pool.
    pub fn render(&self, frame: &Frame) -> Result<RenderedFrame, FrameError> {
        let reference = self.template.current();
        self.pipeline.render(frame, &reference)
    }

    /// Lazy, unbounded part sequence. Suspends while no new frame is
    /// available and skips frames whose encoding fails. It never ends on its
    /// own; dropping it (the client disconnecting) is the only way out.
    pub fn stream(self: Arc<Self>) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        let mut reader = self.slot.subscribe();
        stream! {
            info!("stream consumer attached");
            while let Some(frame) = reader.next_frame().await {
                let producer = Arc::clone(&self);
                let seq = frame.seq;
                // Only the Arc is held here; processing runs outside the slot lock.
                match tokio::task::spawn_blocking(move || producer.render(&frame)).await {
                    Ok(Ok(rendered)) => {
                        debug!(seq = rendered.seq, matched = rendered.matched, bytes = rendered.jpeg.len(), "emitting frame");
                        yield Ok::<Bytes, Infallible>(encode_part(&rendered.jpeg));
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, seq, "failed to encode annotated frame, skipping");
                    }
                    Err(e) => {
                        error!(error = %e, seq, "annotation task failed");
                    }
                }
            }
            info!("frame slot closed, ending stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::ShapeDistanceMatcher;
    use futures_util::StreamExt;
    use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
    use shape_stream_common::mjpeg::MultipartParser;
    use std::time::Duration;

    fn producer(slot: &FrameSlot) -> Arc<StreamProducer> {
        let template = Arc::new(ReferenceTemplate::from_image(GrayImage::from_pixel(
            64,
            64,
            Luma([0]),
        )));
        let pipeline = AnnotationPipeline::new(Box::new(ShapeDistanceMatcher::default()), 80);
        Arc::new(StreamProducer::new(slot.clone(), template, pipeline))
    }

    fn frame(seq: u64, width: u32) -> Frame {
        let img = RgbImage::from_pixel(width, 48, Rgb([40, 40, 40]));
        Frame::new(DynamicImage::ImageRgb8(img), 0, seq)
    }

    fn decode_part(part: &Bytes) -> image::DynamicImage {
        let mut parser = MultipartParser::new();
        let mut jpegs = parser.push(part);
        jpegs.extend(parser.push(b"--frame\r\n"));
        assert_eq!(jpegs.len(), 1);
        image::load_from_memory(&jpegs[0]).unwrap()
    }

    #[tokio::test]
    async fn emits_nothing_until_a_frame_arrives() {
        let slot = FrameSlot::new();
        let stream = producer(&slot).stream();
        tokio::pin!(stream);
        let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err());
    }

    #[tokio::test]
    async fn emits_one_part_per_new_frame() {
        let slot = FrameSlot::new();
        let stream = producer(&slot).stream();
        tokio::pin!(stream);

        slot.set(frame(1, 64));
        let part = tokio::time::timeout(Duration::from_secs(10), stream.next())
            .await
            .expect("no part emitted")
            .unwrap()
            .unwrap();
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(b"\r\n"));
        assert_eq!(decode_part(&part).width(), 64);

        slot.set(frame(2, 96));
        let part = tokio::time::timeout(Duration::from_secs(10), stream.next())
            .await
            .expect("no part emitted")
            .unwrap()
            .unwrap();
        assert_eq!(decode_part(&part).width(), 96);
    }
}
