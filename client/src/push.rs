use std::time::Duration;

use shape_stream_common::frame::{encode_jpeg, FrameError};
use tracing::{debug, warn};

use crate::ClientError;

/// Mirror a JPEG horizontally and re-encode it. With `mirror` off the bytes
/// are passed through untouched.
pub fn prepare_frame(jpeg: Vec<u8>, mirror: bool, quality: u8) -> Result<Vec<u8>, FrameError> {
    if !mirror {
        return Ok(jpeg);
    }
    let image = image::load_from_memory(&jpeg)
        .map_err(FrameError::Decode)?
        .fliph();
    encode_jpeg(&image, quality)
}

/// POSTs frames to the annotation server.
pub struct FramePusher {
    client: reqwest::Client,
    url: String,
    mirror: bool,
    quality: u8,
}

impl FramePusher {
    pub fn new(url: &str, mirror: bool, quality: u8) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(ClientError::HttpConnect)?;
        Ok(Self {
            client,
            url: url.to_string(),
            mirror,
            quality,
        })
    }

    /// Prepare and send one frame. Failures are logged, never propagated:
    /// the capture loop keeps going whether or not the server is reachable.
    pub async fn push(&self, jpeg: Vec<u8>, seq: u64) {
        let (mirror, quality) = (self.mirror, self.quality);
        let prepared =
            match tokio::task::spawn_blocking(move || prepare_frame(jpeg, mirror, quality)).await {
                Ok(Ok(p)) => p,
                Ok(Err(e)) => {
                    warn!(error = %e, seq, "failed to prepare frame, skipping");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, seq, "frame preparation task failed");
                    return;
                }
            };

        if let Err(e) = self.send(prepared, seq).await {
            warn!(error = %e, seq, url = self.url, "server unreachable");
        }
    }

    async fn send(&self, body: Vec<u8>, seq: u64) -> Result<(), ClientError> {
        let bytes = body.len();
        let response = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(body)
            .send()
            .await
            .map_err(ClientError::Push)?;
        if !response.status().is_success() {
            return Err(ClientError::HttpStatus(response.status().as_u16()));
        }
        debug!(seq, bytes, "frame pushed");
        Ok(())
    }
}
