use crate::foundation::{
    core::{Canvas, Rgba8Premul},
    error::{PlayoutError, PlayoutResult},
};

/// Pixel layout of a [`Frame`] buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PixelFormat {
    /// Premultiplied RGBA, 8 bits per channel.
    Rgba8Premul,
}

impl PixelFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8Premul => 4,
        }
    }
}

/// Size and format of a frame buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameDesc {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub format: PixelFormat,
}

impl FrameDesc {
    /// Premultiplied RGBA8 frames covering `canvas`.
    pub fn rgba8_premul(canvas: Canvas) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            format: PixelFormat::Rgba8Premul,
        }
    }

    /// Buffer length in bytes.
    pub fn byte_len(self) -> usize {
        (self.width as usize)
            .saturating_mul(self.height as usize)
            .saturating_mul(self.format.bytes_per_pixel())
    }

    /// Raster size.
    pub fn canvas(self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }
}

/// A rendered frame as tightly packed, row-major, premultiplied RGBA8 pixels.
///
/// Whoever receives a frame owns it. Producers keep no reference to frames they return; a
/// pipeline may hand buffers back to its [`crate::FrameProcessor`] with
/// [`crate::FrameProcessor::recycle`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    desc: FrameDesc,
    data: Vec<u8>,
}

impl Frame {
    /// A fully transparent frame.
    pub fn new(desc: FrameDesc) -> Self {
        Self {
            desc,
            data: vec![0; desc.byte_len()],
        }
    }

    /// Wrap an existing premultiplied RGBA8 buffer.
    pub fn from_rgba8_premul(desc: FrameDesc, data: Vec<u8>) -> PlayoutResult<Self> {
        if data.len() != desc.byte_len() {
            return Err(PlayoutError::validation(format!(
                "frame buffer is {} bytes, {}x{} needs {}",
                data.len(),
                desc.width,
                desc.height,
                desc.byte_len()
            )));
        }
        Ok(Self { desc, data })
    }

    /// Size and format.
    pub fn desc(&self) -> FrameDesc {
        self.desc
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Raw pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw pixel bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Give up the pixel buffer.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// The premultiplied pixel at `(x, y)`, if in bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.desc.width || y >= self.desc.height {
            return None;
        }
        let idx = ((y as usize) * (self.desc.width as usize) + (x as usize)) * 4;
        let px = self.data.get(idx..idx + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Overwrite every pixel with `color`.
    pub fn fill(&mut self, color: Rgba8Premul) {
        let px = color.to_array();
        for d in self.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
    }

    /// Whether every pixel has zero alpha.
    pub fn is_transparent(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }
}

/// Result of a single render call: a frame, or the end-of-stream sentinel.
#[derive(Debug)]
#[must_use]
pub enum Rendered {
    /// The next frame of the stream.
    Frame(Frame),
    /// No further frames are available from this producer.
    EndOfStream,
}

impl Rendered {
    /// Whether this is the end-of-stream sentinel.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// The frame, unless this is the end-of-stream sentinel.
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            Self::Frame(f) => Some(f),
            Self::EndOfStream => None,
        }
    }
}

impl From<Frame> for Rendered {
    fn from(frame: Frame) -> Self {
        Self::Frame(frame)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/buffer.rs"]
mod tests;
