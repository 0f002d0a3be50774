use bytes::{Buf, BufMut, Bytes, BytesMut};

macro_rules! boundary {
    () => {
        "frame"
    };
}

/// Multipart boundary token used on every MJPEG stream.
pub const BOUNDARY: &str = boundary!();

/// `Content-Type` of the whole multipart response.
pub const CONTENT_TYPE: &str = concat!("multipart/x-mixed-replace; boundary=", boundary!());

const DELIMITER: &[u8] = concat!("--", boundary!(), "\r\n").as_bytes();
const PART_HEADER: &[u8] = b"Content-Type: image/jpeg\r\n\r\n";
const BLANK_LINE: &[u8] = b"\r\n\r\n";

/// Wrap one JPEG in its multipart envelope:
/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg>\r\n`.
pub fn encode_part(jpeg: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(DELIMITER.len() + PART_HEADER.len() + jpeg.len() + 2);
    buf.put_slice(DELIMITER);
    buf.put_slice(PART_HEADER);
    buf.put_slice(jpeg);
    buf.put_slice(b"\r\n");
    buf.freeze()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Noise before the first delimiter.
    Preamble,
    /// Part headers, up to the blank line.
    Headers,
    /// Part body. The first `scanned` bytes hold no delimiter.
    Body { scanned: usize },
}

/// Incremental parser for `multipart/x-mixed-replace; boundary=frame` bodies.
///
/// A part is only emitted once the delimiter that follows it has arrived, so
/// the last part of a stream stays buffered until the next one starts.
pub struct MultipartParser {
    pending: BytesMut,
    phase: Phase,
}

impl Default for MultipartParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartParser {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(256 * 1024),
            phase: Phase::Preamble,
        }
    }

    /// Feed one chunk of the response body and return every part completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(chunk);
        let mut parts = Vec::new();
        while self.advance(&mut parts) {}
        parts
    }

    /// Move through at most one phase. `false` means more input is needed.
    fn advance(&mut self, parts: &mut Vec<Vec<u8>>) -> bool {
        match self.phase {
            Phase::Preamble => {
                let Some(at) = find(&self.pending, DELIMITER) else {
                    // A delimiter may straddle two chunks.
                    let stale = self.pending.len().saturating_sub(DELIMITER.len());
                    self.pending.advance(stale);
                    return false;
                };
                self.pending.advance(at + DELIMITER.len());
                self.phase = Phase::Headers;
            }
            Phase::Headers => {
                let Some(at) = find(&self.pending, BLANK_LINE) else {
                    return false;
                };
                self.pending.advance(at + BLANK_LINE.len());
                self.phase = Phase::Body { scanned: 0 };
            }
            Phase::Body { scanned } => {
                let Some(offset) = find(&self.pending[scanned..], DELIMITER) else {
                    let scanned = self.pending.len().saturating_sub(DELIMITER.len() - 1);
                    self.phase = Phase::Body { scanned };
                    return false;
                };
                let body = self.pending.split_to(scanned + offset);
                self.pending.advance(DELIMITER.len());
                let jpeg = body.strip_suffix(b"\r\n").unwrap_or(&body[..]);
                if !jpeg.is_empty() {
                    parts.push(jpeg.to_vec());
                }
                self.phase = Phase::Headers;
            }
        }
        true
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
