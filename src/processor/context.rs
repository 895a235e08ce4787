use std::sync::Arc;

use crate::{
    foundation::{core::Fps, error::PlayoutResult},
    frame::{
        buffer::{Frame, FrameDesc},
        mix::TransitionKind,
    },
};

/// The processing context producers use to create, blend and composite frames.
///
/// One processor is shared by every producer on a channel. Implementations own their internal
/// locking; every method must be callable concurrently from the render path and must not block
/// for unbounded time.
pub trait FrameProcessor: Send + Sync {
    /// Format of the frames this processor creates.
    fn desc(&self) -> FrameDesc;

    /// Channel frame rate.
    fn fps(&self) -> Fps;

    /// A fully transparent frame of [`FrameProcessor::desc`], recycled when possible.
    fn create_frame(&self) -> Frame;

    /// Hand a frame's buffer back for reuse. The default drops it.
    fn recycle(&self, _frame: Frame) {}

    /// Source-over composite `layers` bottom to top into one frame.
    ///
    /// An empty list yields a transparent frame.
    fn composite(&self, layers: Vec<Frame>) -> PlayoutResult<Frame>;

    /// Blend `from` into `to` at progress `t` in `0..=1`.
    fn mix(&self, from: Frame, to: Frame, kind: &TransitionKind, t: f32) -> PlayoutResult<Frame>;

    /// Diagnostic label.
    fn label(&self) -> String {
        "frame processor".to_string()
    }
}

/// Shared handle to a [`FrameProcessor`].
pub type SharedProcessor = Arc<dyn FrameProcessor>;
