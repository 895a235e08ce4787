use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::{
    foundation::{
        core::FrameIndex,
        error::{PlayoutError, PlayoutResult},
    },
    frame::buffer::{Frame, FrameDesc},
    pipeline::{
        config::ChannelConfig,
        layer::{Layer, LayerStatus},
    },
    processor::{context::SharedProcessor, cpu::CpuFrameProcessor},
    producer::handle::SharedProducer,
};

/// A set of layers rendered once per tick and composited into one output frame.
///
/// Each tick renders every layer in parallel on the channel's thread pool. A layer is borrowed
/// by exactly one task, so a producer reachable from a single layer never sees overlapping
/// renders. Layer frames are composited bottom to top in ascending layer index.
pub struct Channel {
    config: ChannelConfig,
    processor: SharedProcessor,
    pool: rayon::ThreadPool,
    layers: BTreeMap<i32, Layer>,
    frame_index: FrameIndex,
}

impl Channel {
    /// Channel backed by a [`CpuFrameProcessor`] built from `config`.
    pub fn new(config: ChannelConfig) -> PlayoutResult<Self> {
        config.validate()?;
        let processor = CpuFrameProcessor::shared(config.canvas, config.fps, config.pool)?;
        Self::with_processor(config, processor)
    }

    /// Channel using an existing processing context, which must match `config`'s format.
    pub fn with_processor(config: ChannelConfig, processor: SharedProcessor) -> PlayoutResult<Self> {
        config.validate()?;
        let want = FrameDesc::rgba8_premul(config.canvas);
        if processor.desc() != want || processor.fps() != config.fps {
            return Err(PlayoutError::validation(format!(
                "processor '{}' does not match channel {}x{}@{}/{}",
                processor.label(),
                config.canvas.width,
                config.canvas.height,
                config.fps.num,
                config.fps.den
            )));
        }
        let pool = build_thread_pool(config.threads)?;
        Ok(Self {
            config,
            processor,
            pool,
            layers: BTreeMap::new(),
            frame_index: FrameIndex(0),
        })
    }

    /// Channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Shared processing context handed to every producer on this channel.
    pub fn processor(&self) -> &SharedProcessor {
        &self.processor
    }

    /// Index of the next frame [`Channel::tick`] will produce.
    pub fn frame_index(&self) -> FrameIndex {
        self.frame_index
    }

    fn layer_mut(&mut self, index: i32) -> &mut Layer {
        let processor = &self.processor;
        let max_swaps = self.config.max_swaps_per_tick;
        self.layers
            .entry(index)
            .or_insert_with(|| Layer::new(index, processor.clone(), max_swaps))
    }

    /// Load `producer` on layer `index`, creating the layer if needed.
    pub fn load(
        &mut self,
        index: i32,
        producer: SharedProducer,
        play_now: bool,
    ) -> PlayoutResult<()> {
        self.layer_mut(index).load(producer, play_now)
    }

    /// See [`Layer::play`].
    pub fn play(&mut self, index: i32) -> PlayoutResult<()> {
        self.layer_mut(index).play()
    }

    /// See [`Layer::pause`].
    pub fn pause(&mut self, index: i32) {
        if let Some(layer) = self.layers.get_mut(&index) {
            layer.pause();
        }
    }

    /// See [`Layer::resume`].
    pub fn resume(&mut self, index: i32) {
        if let Some(layer) = self.layers.get_mut(&index) {
            layer.resume();
        }
    }

    /// See [`Layer::stop`].
    pub fn stop(&mut self, index: i32) {
        if let Some(layer) = self.layers.get_mut(&index) {
            layer.stop();
        }
    }

    /// Remove layer `index` and everything cued on it.
    pub fn clear(&mut self, index: i32) {
        self.layers.remove(&index);
    }

    /// Remove every layer.
    pub fn clear_all(&mut self) {
        self.layers.clear();
    }

    /// Render every layer and composite the result.
    ///
    /// A layer that reports an error is logged and left out of this frame; the others still
    /// render.
    #[tracing::instrument(skip_all, fields(frame = self.frame_index.0))]
    pub fn tick(&mut self) -> PlayoutResult<Frame> {
        let layers = &mut self.layers;
        let mut rendered: Vec<(i32, PlayoutResult<Option<Frame>>)> = self.pool.install(|| {
            layers
                .par_iter_mut()
                .map(|(index, layer)| (*index, layer.render()))
                .collect()
        });
        rendered.sort_by_key(|(index, _)| *index);

        let mut frames = Vec::with_capacity(rendered.len());
        for (index, result) in rendered {
            match result {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(layer = index, error = %err, "layer render failed");
                }
            }
        }

        let out = self.processor.composite(frames)?;
        self.frame_index = self.frame_index.next();
        Ok(out)
    }

    /// Status of layer `index`, if it exists.
    pub fn layer_status(&self, index: i32) -> Option<LayerStatus> {
        self.layers.get(&index).map(Layer::status)
    }

    /// Status of every layer in ascending index order.
    pub fn statuses(&self) -> Vec<LayerStatus> {
        self.layers.values().map(Layer::status).collect()
    }
}

fn build_thread_pool(threads: Option<usize>) -> PlayoutResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(PlayoutError::validation(
            "channel 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("playout-layer-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PlayoutError::initialization(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/channel.rs"]
mod tests;
