use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;

use crate::{
    foundation::error::{PlayoutError, PlayoutResult},
    frame::buffer::{Frame, FrameDesc, Rendered},
    processor::context::SharedProcessor,
    producer::frame_producer::FrameProducer,
};

/// A still image decoded once at initialize and repeated for its duration.
///
/// All file IO and decoding happens in [`FrameProducer::initialize`]; render only copies the
/// prepared pixels into a fresh frame. Images that do not match the channel size are resized to
/// fill it.
pub struct ImageProducer {
    path: PathBuf,
    duration: Option<u64>,
    rendered: u64,
    still: Option<Frame>,
    processor: Option<SharedProcessor>,
}

impl ImageProducer {
    /// Endless frames of the image at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            duration: None,
            rendered: 0,
            still: None,
            processor: None,
        }
    }

    /// End the stream after `frames` frames.
    pub fn with_duration(mut self, frames: u64) -> Self {
        self.duration = Some(frames);
        self
    }
}

impl FrameProducer for ImageProducer {
    #[tracing::instrument(skip_all, fields(path = %self.path.display()))]
    fn initialize(&mut self, processor: &SharedProcessor) -> PlayoutResult<()> {
        let still = load_still(&self.path, processor.desc())
            .map_err(|e| PlayoutError::initialization(format!("{e:#}")))?;
        self.still = Some(still);
        self.processor = Some(Arc::clone(processor));
        Ok(())
    }

    fn render_frame(&mut self) -> Rendered {
        if self.duration.is_some_and(|d| self.rendered >= d) {
            return Rendered::EndOfStream;
        }
        let (Some(processor), Some(still)) = (&self.processor, &self.still) else {
            tracing::error!(path = %self.path.display(), "image producer rendered before initialize");
            return Rendered::EndOfStream;
        };
        let mut frame = processor.create_frame();
        frame.data_mut().copy_from_slice(still.data());
        self.rendered += 1;
        Rendered::Frame(frame)
    }

    fn label(&self) -> String {
        format!("image {}", self.path.display())
    }
}

fn load_still(path: &Path, desc: FrameDesc) -> anyhow::Result<Frame> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("decode image '{}'", path.display()))?;
    let mut rgba = decoded.to_rgba8();
    if rgba.dimensions() != (desc.width, desc.height) {
        rgba = image::imageops::resize(
            &rgba,
            desc.width,
            desc.height,
            image::imageops::FilterType::Triangle,
        );
    }

    let mut data = rgba.into_raw();
    premultiply_rgba8_in_place(&mut data);
    Ok(Frame::from_rgba8_premul(desc, data)?)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = ((px[0] as u16 * a + 127) / 255) as u8;
        px[1] = ((px[1] as u16 * a + 127) / 255) as u8;
        px[2] = ((px[2] as u16 * a + 127) / 255) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/producers/still.rs"]
mod tests;
