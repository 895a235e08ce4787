use std::path::Path;

use crate::{
    foundation::{
        core::{Canvas, Fps},
        error::{PlayoutError, PlayoutResult},
    },
    processor::buffer_pool::BufferPoolOpts,
};

const DEFAULT_MAX_SWAPS_PER_TICK: u32 = 8;

fn default_max_swaps_per_tick() -> u32 {
    DEFAULT_MAX_SWAPS_PER_TICK
}

/// Channel format and scheduling knobs.
///
/// ```json
/// { "canvas": { "width": 1920, "height": 1080 }, "fps": { "num": 25, "den": 1 } }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelConfig {
    /// Output size.
    pub canvas: Canvas,
    /// Tick rate.
    pub fps: Fps,
    /// Render threads for the channel's layer pool; `None` lets rayon decide.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Frame buffer recycling limits.
    #[serde(default)]
    pub pool: BufferPoolOpts,
    /// Upper bound on end-of-stream handoffs a single layer may perform in one tick.
    #[serde(default = "default_max_swaps_per_tick")]
    pub max_swaps_per_tick: u32,
}

impl ChannelConfig {
    /// Default knobs for `canvas` at `fps`.
    pub fn new(canvas: Canvas, fps: Fps) -> Self {
        Self {
            canvas,
            fps,
            threads: None,
            pool: BufferPoolOpts::default(),
            max_swaps_per_tick: DEFAULT_MAX_SWAPS_PER_TICK,
        }
    }

    /// Reject configurations no channel can run with.
    pub fn validate(&self) -> PlayoutResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps.num, self.fps.den)?;
        if self.threads == Some(0) {
            return Err(PlayoutError::validation(
                "channel 'threads' must be >= 1 when set",
            ));
        }
        if self.max_swaps_per_tick == 0 {
            return Err(PlayoutError::validation(
                "channel 'max_swaps_per_tick' must be >= 1",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(s: &str) -> PlayoutResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| PlayoutError::serde(format!("channel config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> PlayoutResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            PlayoutError::validation(format!("read channel config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&s)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/config.rs"]
mod tests;
