use std::sync::{Arc, Mutex};

use crate::{
    foundation::{
        core::{Canvas, Fps},
        error::{PlayoutError, PlayoutResult},
    },
    frame::{
        buffer::{Frame, FrameDesc},
        composite::over_in_place,
        mix::{TransitionKind, mix_into},
    },
    processor::{
        buffer_pool::{BufferPool, BufferPoolOpts, BufferPoolStats},
        context::{FrameProcessor, SharedProcessor},
    },
};

/// CPU implementation of [`FrameProcessor`] backed by a bounded buffer pool.
pub struct CpuFrameProcessor {
    desc: FrameDesc,
    fps: Fps,
    pool: Mutex<BufferPool>,
}

impl CpuFrameProcessor {
    /// Build a processor producing premultiplied RGBA8 frames of `canvas`.
    pub fn new(canvas: Canvas, fps: Fps, pool: BufferPoolOpts) -> PlayoutResult<Self> {
        let canvas = canvas.validate()?;
        let fps = Fps::new(fps.num, fps.den)?;
        Ok(Self {
            desc: FrameDesc::rgba8_premul(canvas),
            fps,
            pool: Mutex::new(BufferPool::new(pool)),
        })
    }

    /// Same as [`CpuFrameProcessor::new`], already wrapped for sharing.
    pub fn shared(canvas: Canvas, fps: Fps, pool: BufferPoolOpts) -> PlayoutResult<SharedProcessor> {
        Ok(Arc::new(Self::new(canvas, fps, pool)?))
    }

    /// Snapshot of the pool counters.
    pub fn pool_stats(&self) -> BufferPoolStats {
        match self.pool.lock() {
            Ok(pool) => pool.stats(),
            Err(poisoned) => poisoned.into_inner().stats(),
        }
    }

    fn check_desc(&self, frame: &Frame, what: &str) -> PlayoutResult<()> {
        if frame.desc() != self.desc {
            return Err(PlayoutError::render(format!(
                "{what} frame is {}x{}, channel is {}x{}",
                frame.width(),
                frame.height(),
                self.desc.width,
                self.desc.height
            )));
        }
        Ok(())
    }
}

impl FrameProcessor for CpuFrameProcessor {
    fn desc(&self) -> FrameDesc {
        self.desc
    }

    fn fps(&self) -> Fps {
        self.fps
    }

    fn create_frame(&self) -> Frame {
        let buf = match self.pool.lock() {
            Ok(mut pool) => pool.borrow(self.desc),
            Err(_) => vec![0; self.desc.byte_len()],
        };
        Frame::from_rgba8_premul(self.desc, buf).unwrap_or_else(|_| Frame::new(self.desc))
    }

    fn recycle(&self, frame: Frame) {
        if frame.desc() != self.desc {
            return;
        }
        if let Ok(mut pool) = self.pool.lock() {
            pool.release(self.desc, frame.into_data());
        }
    }

    fn composite(&self, layers: Vec<Frame>) -> PlayoutResult<Frame> {
        let mut layers = layers.into_iter();
        let Some(mut out) = layers.next() else {
            return Ok(self.create_frame());
        };
        self.check_desc(&out, "layer")?;
        for layer in layers {
            self.check_desc(&layer, "layer")?;
            over_in_place(out.data_mut(), layer.data(), 1.0)?;
            self.recycle(layer);
        }
        Ok(out)
    }

    fn mix(&self, from: Frame, to: Frame, kind: &TransitionKind, t: f32) -> PlayoutResult<Frame> {
        self.check_desc(&from, "transition source")?;
        self.check_desc(&to, "transition destination")?;
        let mut out = self.create_frame();
        mix_into(&mut out, &from, &to, kind, t)?;
        self.recycle(from);
        self.recycle(to);
        Ok(out)
    }

    fn label(&self) -> String {
        format!(
            "cpu frame processor {}x{}@{}/{}",
            self.desc.width, self.desc.height, self.fps.num, self.fps.den
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/processor/cpu.rs"]
mod tests;
