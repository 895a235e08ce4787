use std::sync::Arc;

use crate::{
    foundation::{
        core::Rgba8Premul,
        error::{PlayoutError, PlayoutResult},
    },
    frame::buffer::Rendered,
    processor::context::SharedProcessor,
    producer::frame_producer::FrameProducer,
};

/// Solid color frames, endless or for a fixed number of frames.
pub struct ColorProducer {
    color: Rgba8Premul,
    duration: Option<u64>,
    rendered: u64,
    processor: Option<SharedProcessor>,
}

impl ColorProducer {
    /// Endless frames of `color`.
    pub fn new(color: Rgba8Premul) -> Self {
        Self {
            color,
            duration: None,
            rendered: 0,
            processor: None,
        }
    }

    /// Parse `color` with [`parse_color`].
    pub fn from_str_color(color: &str) -> PlayoutResult<Self> {
        Ok(Self::new(parse_color(color)?))
    }

    /// End the stream after `frames` frames.
    pub fn with_duration(mut self, frames: u64) -> Self {
        self.duration = Some(frames);
        self
    }
}

impl FrameProducer for ColorProducer {
    fn initialize(&mut self, processor: &SharedProcessor) -> PlayoutResult<()> {
        self.processor = Some(Arc::clone(processor));
        Ok(())
    }

    fn render_frame(&mut self) -> Rendered {
        if self.duration.is_some_and(|d| self.rendered >= d) {
            return Rendered::EndOfStream;
        }
        let Some(processor) = &self.processor else {
            tracing::error!("color producer rendered before initialize");
            return Rendered::EndOfStream;
        };
        let mut frame = processor.create_frame();
        frame.fill(self.color);
        self.rendered += 1;
        Rendered::Frame(frame)
    }

    fn label(&self) -> String {
        let [r, g, b, a] = self.color.to_array();
        match self.duration {
            Some(d) => format!("color #{r:02x}{g:02x}{b:02x}{a:02x} [{}/{d}]", self.rendered),
            None => format!("color #{r:02x}{g:02x}{b:02x}{a:02x}"),
        }
    }
}

/// Parse `#rrggbb`, `#rrggbbaa` (straight alpha) or one of `transparent`, `black`, `white`.
pub fn parse_color(s: &str) -> PlayoutResult<Rgba8Premul> {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "transparent" => return Ok(Rgba8Premul::transparent()),
        "black" => return Ok(Rgba8Premul::from_straight_rgba(0, 0, 0, 255)),
        "white" => return Ok(Rgba8Premul::from_straight_rgba(255, 255, 255, 255)),
        _ => {}
    }

    let hex = s
        .strip_prefix('#')
        .ok_or_else(|| PlayoutError::validation(format!("color '{s}' must start with '#'")))?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(PlayoutError::validation(format!(
            "color '{s}' must be #rrggbb or #rrggbbaa"
        )));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| PlayoutError::validation(format!("color '{s}' has invalid hex digits")))
    };
    let a = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba8Premul::from_straight_rgba(
        channel(0)?,
        channel(2)?,
        channel(4)?,
        a,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/producers/color.rs"]
mod tests;
