use std::sync::Arc;

use shape_stream_common::frame::Frame;
use tokio::sync::watch;

/// Single-slot, latest-wins hand-off between ingestion and streaming.
///
/// `set` replaces the held frame without queueing; an unread frame is
/// dropped when a newer one arrives. Frames are shared as `Arc`s, so the
/// internal lock is only held long enough to swap or clone a pointer and a
/// reader can never observe a half-written frame.
#[derive(Clone)]
pub struct FrameSlot {
    tx: Arc<watch::Sender<Option<Arc<Frame>>>>,
}

impl Default for FrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSlot {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace whatever frame is held. Never blocks on readers.
    pub fn set(&self, frame: Frame) {
        self.tx.send_replace(Some(Arc::new(frame)));
    }

    /// The current frame, if any. Does not consume it.
    pub fn try_snapshot(&self) -> Option<Arc<Frame>> {
        self.tx.borrow().clone()
    }

    /// A reader that is woken for every new frame.
    pub fn subscribe(&self) -> SlotReader {
        SlotReader {
            rx: self.tx.subscribe(),
            primed: false,
        }
    }
}

/// Per-stream view of a [`FrameSlot`].
pub struct SlotReader {
    rx: watch::Receiver<Option<Arc<Frame>>>,
    primed: bool,
}

impl SlotReader {
    /// Wait for a frame newer than the last one returned.
    ///
    /// The first call returns the held frame straight away if there is one.
    /// Frames set while the caller was busy collapse into the latest. Returns
    /// `None` once every [`FrameSlot`] handle has been dropped.
    pub async fn next_frame(&mut self) -> Option<Arc<Frame>> {
        if !self.primed {
            self.primed = true;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
        loop {
            self.rx.changed().await.ok()?;
            if let Some(frame) = self.rx.borrow_and_update().clone() {
                return Some(frame);
            }
        }
    }
}
