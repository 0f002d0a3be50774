use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use shape_stream_common::mjpeg::MultipartParser;
use tracing::{debug, error, info, warn};

use crate::push::FramePusher;
use crate::ClientError;

/// Delay between reconnect attempts: doubles on every failure up to a ceiling
/// and starts over after a stream that ended cleanly.
#[derive(Debug)]
struct Backoff {
    next: Duration,
}

impl Backoff {
    const FLOOR: Duration = Duration::from_secs(2);
    const CEILING: Duration = Duration::from_secs(30);

    fn new() -> Self {
        Self { next: Self::FLOOR }
    }

    fn reset(&mut self) {
        self.next = Self::FLOOR;
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (delay * 2).min(Self::CEILING);
        delay
    }
}

/// Pull the camera's MJPEG stream and push every frame to the server,
/// reconnecting forever.
pub async fn run_mjpeg_source(stream_url: &str, pusher: &FramePusher) {
    let http = match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
    {
        Ok(http) => http,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            return;
        }
    };
    let seq = AtomicU64::new(0);
    let mut backoff = Backoff::new();

    loop {
        info!(url = stream_url, "opening MJPEG source");
        match relay_parts(&http, stream_url, pusher, &seq).await {
            Ok(frames) => {
                info!(frames, "MJPEG source closed the stream");
                backoff.reset();
            }
            Err(e) => error!(error = %e, "MJPEG source failed"),
        }
        let delay = backoff.next_delay();
        info!(?delay, "reconnecting to MJPEG source");
        tokio::time::sleep(delay).await;
    }
}

/// Forward every part of one source connection; returns how many were sent.
async fn relay_parts(
    http: &reqwest::Client,
    url: &str,
    pusher: &FramePusher,
    seq: &AtomicU64,
) -> Result<u64, ClientError> {
    let response = http.get(url).send().await.map_err(ClientError::HttpConnect)?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::HttpStatus(status.as_u16()));
    }
    info!(%status, "MJPEG source connected");

    let mut body = response.bytes_stream();
    let mut parser = MultipartParser::new();
    let mut frames = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(ClientError::HttpStream)?;
        for jpeg in parser.push(&chunk) {
            let n = seq.fetch_add(1, Ordering::Relaxed);
            debug!(seq = n, bytes = jpeg.len(), "captured frame");
            pusher.push(jpeg, n).await;
            frames += 1;
        }
    }

    Ok(frames)
}

/// Polling fallback: periodically fetch single JPEG frames.
pub async fn run_polling_source(frame_url: &str, pusher: &FramePusher, interval: Duration) {
    let client = reqwest::Client::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut seq: u64 = 0;

    loop {
        ticker.tick().await;

        match client.get(frame_url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.bytes().await {
                Ok(jpeg) => {
                    pusher.push(jpeg.to_vec(), seq).await;
                    seq += 1;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read camera frame body");
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "non-success response from camera");
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch camera frame");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_ceiling() {
        let mut backoff = Backoff::new();
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn backoff_reset_starts_over() {
        let mut backoff = Backoff::new();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }
}
