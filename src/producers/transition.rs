use std::sync::Arc;

use crate::{
    foundation::error::PlayoutResult,
    frame::{
        buffer::{Frame, Rendered},
        mix::TransitionKind,
    },
    processor::context::SharedProcessor,
    producer::{
        frame_producer::FrameProducer,
        handle::{ProducerState, SharedProducer},
    },
};

/// Blends from the producer that played before it into a destination producer.
///
/// The source is whatever producer the pipeline reports through
/// [`FrameProducer::set_leading_producer`]. For `duration` frames both sides are rendered and
/// mixed; the transition then ends its stream and designates the destination as its following
/// producer, so the destination keeps playing without a gap. With no leading producer the
/// destination is mixed in from transparent.
///
/// Unlike most producers this one renders, and therefore advances, its leading producer. The
/// leader is released as soon as the transition completes.
pub struct TransitionProducer {
    kind: TransitionKind,
    duration: u64,
    position: u64,
    dest: SharedProducer,
    source: Option<SharedProducer>,
    processor: Option<SharedProcessor>,
}

impl TransitionProducer {
    /// Transition into `dest` over `duration` frames.
    pub fn new(dest: SharedProducer, kind: TransitionKind, duration: u64) -> Self {
        Self {
            kind,
            duration,
            position: 0,
            dest,
            source: None,
            processor: None,
        }
    }

    fn render_side(processor: &SharedProcessor, side: &SharedProducer) -> Frame {
        if side.state() != ProducerState::Active {
            return processor.create_frame();
        }
        match side.render_frame() {
            Ok(Rendered::Frame(frame)) => frame,
            Ok(Rendered::EndOfStream) => processor.create_frame(),
            Err(err) => {
                tracing::warn!(producer = %side.id(), error = %err, "transition input failed, using placeholder");
                processor.create_frame()
            }
        }
    }
}

impl FrameProducer for TransitionProducer {
    fn initialize(&mut self, processor: &SharedProcessor) -> PlayoutResult<()> {
        if self.dest.state() == ProducerState::Uninitialized {
            self.dest.initialize(processor)?;
        }
        self.processor = Some(Arc::clone(processor));
        Ok(())
    }

    fn render_frame(&mut self) -> Rendered {
        if self.position >= self.duration {
            self.source = None;
            return Rendered::EndOfStream;
        }
        let Some(processor) = &self.processor else {
            tracing::error!("transition rendered before initialize");
            return Rendered::EndOfStream;
        };

        self.position += 1;
        let t = self.position as f32 / self.duration as f32;

        let to = Self::render_side(processor, &self.dest);
        let from = match &self.source {
            Some(source) => Self::render_side(processor, source),
            None => processor.create_frame(),
        };

        match processor.mix(from, to, &self.kind, t) {
            Ok(frame) => Rendered::Frame(frame),
            Err(err) => {
                tracing::warn!(error = %err, "transition mix failed, using placeholder");
                Rendered::Frame(processor.create_frame())
            }
        }
    }

    fn following_producer(&self) -> Option<SharedProducer> {
        if self.dest.state().is_terminal() {
            return self.dest.following_producer();
        }
        Some(Arc::clone(&self.dest))
    }

    fn set_leading_producer(&mut self, leading: &SharedProducer) {
        self.source = Some(Arc::clone(leading));
    }

    fn label(&self) -> String {
        format!(
            "transition {:?} [{}/{}] -> {}",
            self.kind,
            self.position,
            self.duration,
            self.dest.label()
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/producers/transition.rs"]
mod tests;
