use std::fmt;

use crate::{
    foundation::error::{PlayoutError, PlayoutResult},
    frame::buffer::{Frame, Rendered},
    processor::context::SharedProcessor,
    producer::{
        chain::walk_chain,
        handle::{ProducerState, SharedProducer},
    },
};

/// Snapshot of a layer for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerStatus {
    /// Layer index within its channel.
    pub index: i32,
    /// Label and state of the playing producer.
    pub active: Option<(String, ProducerState)>,
    /// Label of the producer waiting in the background slot.
    pub background: Option<String>,
    /// Whether the last frame is being held.
    pub paused: bool,
    /// Frames rendered by producers on this layer.
    pub frames_rendered: u64,
    /// End-of-stream handoffs performed.
    pub swaps: u64,
}

impl fmt::Display for LayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {}: ", self.index)?;
        match &self.active {
            Some((label, state)) => write!(f, "{label} ({state})")?,
            None => f.write_str("empty")?,
        }
        if self.paused {
            f.write_str(" [paused]")?;
        }
        if let Some(bg) = &self.background {
            write!(f, ", next: {bg}")?;
        }
        write!(
            f,
            ", {} frames, {} swaps",
            self.frames_rendered, self.swaps
        )
    }
}

/// One playback slot of a channel.
///
/// A layer plays its active producer and, when that producer ends its stream, swaps in the
/// producer it designates as following within the same tick. A producer is never rendered again
/// after it returned end of stream.
pub struct Layer {
    index: i32,
    processor: SharedProcessor,
    max_swaps_per_tick: u32,
    active: Option<SharedProducer>,
    background: Option<SharedProducer>,
    paused: bool,
    last_frame: Option<Frame>,
    frames_rendered: u64,
    swaps: u64,
}

impl Layer {
    pub(crate) fn new(index: i32, processor: SharedProcessor, max_swaps_per_tick: u32) -> Self {
        Self {
            index,
            processor,
            max_swaps_per_tick: max_swaps_per_tick.max(1),
            active: None,
            background: None,
            paused: false,
            last_frame: None,
            frames_rendered: 0,
            swaps: 0,
        }
    }

    /// Layer index within its channel.
    pub fn index(&self) -> i32 {
        self.index
    }

    /// Initialize `producer` and its following chain, then cue it.
    ///
    /// With `play_now` it replaces the active producer at once; otherwise it waits in the
    /// background slot for [`Layer::play`]. On error nothing is cued.
    #[tracing::instrument(skip_all, fields(layer = self.index, producer = %producer.id()))]
    pub fn load(&mut self, producer: SharedProducer, play_now: bool) -> PlayoutResult<()> {
        for p in walk_chain(&producer)? {
            match p.state() {
                ProducerState::Uninitialized => p.initialize(&self.processor)?,
                ProducerState::Active => {}
                state => {
                    return Err(PlayoutError::validation(format!(
                        "cannot load {} ({}): producer {} is {state}",
                        producer.id(),
                        producer.label(),
                        p.id()
                    )));
                }
            }
        }
        tracing::debug!(label = %producer.label(), play_now, "producer loaded");

        self.background = Some(producer);
        if play_now {
            self.play()?;
        }
        Ok(())
    }

    /// Move the background producer to the active slot, telling it what played before.
    ///
    /// With nothing in the background this resumes a paused layer.
    pub fn play(&mut self) -> PlayoutResult<()> {
        let Some(next) = self.background.take() else {
            self.paused = false;
            return Ok(());
        };
        if let Some(previous) = &self.active
            && let Err(err) = next.set_leading_producer(previous)
        {
            self.background = Some(next);
            return Err(err);
        }
        tracing::debug!(layer = self.index, producer = %next.id(), "playing");
        self.active = Some(next);
        self.paused = false;
        Ok(())
    }

    /// Hold the last frame without invoking the producer.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continue rendering after [`Layer::pause`].
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Empty the active slot.
    pub fn stop(&mut self) {
        self.active = None;
        self.last_frame = None;
        self.paused = false;
    }

    /// Empty both slots.
    pub fn clear(&mut self) {
        self.stop();
        self.background = None;
    }

    /// Whether the layer has nothing to render or cue.
    pub fn is_empty(&self) -> bool {
        self.active.is_none() && self.background.is_none()
    }

    /// Render this tick's frame. `Ok(None)` means the layer contributes nothing.
    ///
    /// Errors are contract violations; when the fault lies with a successor the slot is emptied.
    pub fn render(&mut self) -> PlayoutResult<Option<Frame>> {
        if self.paused {
            return Ok(self.last_frame.clone());
        }

        let mut hops = 0u32;
        loop {
            let Some(active) = self.active.clone() else {
                self.last_frame = None;
                return Ok(None);
            };
            if hops > self.max_swaps_per_tick {
                tracing::warn!(
                    layer = self.index,
                    hops,
                    "swap limit reached, layer is empty for this tick"
                );
                return Ok(None);
            }

            match active.render_frame()? {
                Rendered::Frame(frame) => {
                    self.frames_rendered += 1;
                    self.last_frame = Some(frame.clone());
                    return Ok(Some(frame));
                }
                Rendered::EndOfStream => match active.following_producer() {
                    None => {
                        tracing::debug!(
                            layer = self.index,
                            producer = %active.id(),
                            "end of stream, layer empty"
                        );
                        self.stop();
                        return Ok(None);
                    }
                    Some(next) => {
                        self.hand_over(active, next)?;
                        hops += 1;
                    }
                },
            }
        }
    }

    fn hand_over(&mut self, previous: SharedProducer, next: SharedProducer) -> PlayoutResult<()> {
        let prepared = match next.state() {
            ProducerState::Active => Ok(()),
            ProducerState::Uninitialized => next.initialize(&self.processor),
            state => Err(PlayoutError::contract(format!(
                "following producer {} of {} is {state}",
                next.id(),
                previous.id()
            ))),
        }
        .and_then(|()| next.set_leading_producer(&previous));

        if let Err(err) = prepared {
            tracing::error!(
                layer = self.index,
                from = %previous.id(),
                to = %next.id(),
                error = %err,
                "handoff failed, layer emptied"
            );
            self.stop();
            return Err(err);
        }

        tracing::debug!(
            layer = self.index,
            from = %previous.id(),
            to = %next.id(),
            label = %next.label(),
            "swapped to following producer"
        );
        self.active = Some(next);
        self.swaps += 1;
        Ok(())
    }

    /// Diagnostic snapshot.
    pub fn status(&self) -> LayerStatus {
        LayerStatus {
            index: self.index,
            active: self.active.as_ref().map(|p| (p.label(), p.state())),
            background: self.background.as_ref().map(|p| p.label()),
            paused: self.paused,
            frames_rendered: self.frames_rendered,
            swaps: self.swaps,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/layer.rs"]
mod tests;
