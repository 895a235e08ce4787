use crate::{
    foundation::error::PlayoutResult,
    frame::buffer::Rendered,
    processor::context::SharedProcessor,
    producer::handle::SharedProducer,
};

/// Label returned by producers that do not override [`FrameProducer::label`].
pub const UNKNOWN_PRODUCER_LABEL: &str = "unknown frame producer";

/// A source of frames that a channel pulls from at a fixed cadence.
///
/// Lifecycle: a producer is initialized exactly once with the channel's processing context, then
/// rendered any number of times until it returns [`Rendered::EndOfStream`]. After that it is
/// exhausted and is never rendered again, though it still answers
/// [`FrameProducer::following_producer`] and [`FrameProducer::label`].
///
/// Producers are not used directly by pipelines. They are wrapped in a
/// [`crate::ProducerHandle`], which enforces the lifecycle and shares the producer between a
/// layer's active slot and another producer's following slot.
///
/// # Non-blocking render
///
/// [`FrameProducer::render_frame`] runs on the channel's worker pool, in parallel with other
/// layers. It must not do blocking IO, wait on locks that can stall for unbounded time, or decode
/// synchronously. Work that is not inherently fast belongs on the producer's own schedule (see
/// [`crate::PrefetchProducer`]); render only hands out ready data.
pub trait FrameProducer: Send {
    /// Record the processing context and prepare to create frames.
    ///
    /// Called exactly once, before the first [`FrameProducer::render_frame`]. Missing resources
    /// must be reported here as [`crate::PlayoutError::Initialization`] rather than deferred to
    /// render. Producers that create frames keep a clone of `processor`.
    fn initialize(&mut self, processor: &SharedProcessor) -> PlayoutResult<()>;

    /// Produce the next frame in stream order, or [`Rendered::EndOfStream`].
    ///
    /// Transient failures should be covered with a placeholder frame instead of ending the
    /// stream.
    fn render_frame(&mut self) -> Rendered;

    /// The producer that replaces this one once it reaches end of stream.
    fn following_producer(&self) -> Option<SharedProducer> {
        None
    }

    /// Told which producer played before this one, right after a pipeline swaps this one in.
    ///
    /// A producer may borrow the leader's state, blend out of it, or release it once it has
    /// fully taken over. The default ignores it.
    fn set_leading_producer(&mut self, _leading: &SharedProducer) {}

    /// Human-readable diagnostic label. Must be side-effect free and valid before initialize.
    fn label(&self) -> String {
        UNKNOWN_PRODUCER_LABEL.to_string()
    }
}
