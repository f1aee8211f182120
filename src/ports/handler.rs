//! Frame callback port
//!
//! The synchronizer owns its handler, so any state a closure captures lives
//! exactly as long as the synchronizer and is handed back by
//! `FrameSync::into_handler`.

use crate::domain::ReceivedFrame;

/// Receives exactly one call per completed or aborted frame attempt
pub trait FrameHandler {
    fn on_frame(&mut self, frame: ReceivedFrame);
}

impl<F> FrameHandler for F
where
    F: FnMut(ReceivedFrame),
{
    fn on_frame(&mut self, frame: ReceivedFrame) {
        self(frame)
    }
}

/// Handler that keeps every frame it is given
#[derive(Debug, Default)]
pub struct FrameCollector {
    pub frames: Vec<ReceivedFrame>,
}

impl FrameCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn take(&mut self) -> Vec<ReceivedFrame> {
        std::mem::take(&mut self.frames)
    }
}

impl FrameHandler for FrameCollector {
    fn on_frame(&mut self, frame: ReceivedFrame) {
        self.frames.push(frame);
    }
}
