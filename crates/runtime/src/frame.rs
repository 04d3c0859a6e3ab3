//! Nexting stack frames
//!
//! A frame is the return point of one in-flight invocation. The invoker
//! blocks on the receiving half of the frame's channel; whoever removes
//! the frame from the stack settles it with exactly one signal.

use cringe_core::Label;
use may::sync::mpsc::{Receiver, Sender, channel};
use std::time::Instant;

/// How a frame left the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignal {
    /// The invoker continues after its invoke
    Resumed,
    /// The invoker must unwind: it was forgotten or the run ended
    Dropped,
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub(crate) id: u64,
    pub(crate) label: Label,
    pub(crate) created: Instant,
    signal: Sender<FrameSignal>,
}

impl Frame {
    pub(crate) fn new(id: u64, label: Label) -> (Self, Receiver<FrameSignal>) {
        let (signal, waiter) = channel();
        let frame = Frame {
            id,
            label,
            created: Instant::now(),
            signal,
        };
        (frame, waiter)
    }

    /// Wake the invoker. Consumes the frame so it is settled once.
    pub(crate) fn settle(self, outcome: FrameSignal) {
        // A closed receiver means the invoker is already gone
        let _ = self.signal.send(outcome);
    }
}

/// Frame as seen from outside the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub id: u64,
    pub label: Label,
    pub age_ms: u128,
}

impl From<&Frame> for FrameInfo {
    fn from(frame: &Frame) -> Self {
        FrameInfo {
            id: frame.id,
            label: frame.label,
            age_ms: frame.created.elapsed().as_millis(),
        }
    }
}
