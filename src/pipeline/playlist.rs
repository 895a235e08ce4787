use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use crate::{
    foundation::error::{PlayoutError, PlayoutResult},
    frame::mix::parse_transition_kind_params,
    pipeline::{channel::Channel, config::ChannelConfig},
    producer::handle::{ProducerHandle, SharedProducer},
    producers::{
        color::ColorProducer, still::ImageProducer, transition::TransitionProducer,
    },
};

/// One entry of a layer's running order.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum PlaylistItem {
    /// Solid color; endless when `frames` is omitted.
    Color {
        /// `#rrggbb`, `#rrggbbaa` or a color name.
        color: String,
        /// Length in frames.
        #[serde(default)]
        frames: Option<u64>,
    },
    /// Still image scaled to the canvas; endless when `frames` is omitted.
    Image {
        /// Image file, relative to the playlist file when not absolute.
        path: PathBuf,
        /// Length in frames.
        #[serde(default)]
        frames: Option<u64>,
    },
    /// Transition from the previous item into the next one.
    Transition {
        /// `cut`, `crossfade`/`mix` or `wipe`.
        kind: String,
        /// Kind-specific parameters.
        #[serde(default)]
        params: serde_json::Value,
        /// Length in frames.
        frames: u64,
    },
}

/// Running order of one layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerPlan {
    /// Layer index; higher indices composite on top.
    pub index: i32,
    /// Items played back to back.
    pub items: Vec<PlaylistItem>,
}

/// A channel configuration plus the running order of each layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Playlist {
    /// Channel format.
    pub channel: ChannelConfig,
    /// Layers to load.
    #[serde(default)]
    pub layers: Vec<LayerPlan>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Playlist {
    /// Parse and validate a JSON document. Relative paths resolve against the working directory.
    pub fn from_json_str(s: &str) -> PlayoutResult<Self> {
        let playlist: Self =
            serde_json::from_str(s).map_err(|e| PlayoutError::serde(format!("playlist: {e}")))?;
        playlist.validate()?;
        Ok(playlist)
    }

    /// Read a playlist file. Relative paths resolve against the file's directory.
    pub fn from_path(path: impl AsRef<Path>) -> PlayoutResult<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            PlayoutError::validation(format!("read playlist '{}': {e}", path.display()))
        })?;
        let mut playlist = Self::from_json_str(&s)?;
        playlist.base_dir = path.parent().map(Path::to_path_buf);
        Ok(playlist)
    }

    /// Check the channel configuration and layer structure.
    pub fn validate(&self) -> PlayoutResult<()> {
        self.channel.validate()?;
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.index) {
                return Err(PlayoutError::validation(format!(
                    "layer {} is listed more than once",
                    layer.index
                )));
            }
            if matches!(layer.items.last(), Some(PlaylistItem::Transition { .. })) {
                return Err(PlayoutError::validation(format!(
                    "layer {}: a transition needs an item to transition into",
                    layer.index
                )));
            }
            for item in &layer.items {
                if let PlaylistItem::Transition { kind, params, .. } = item {
                    parse_transition_kind_params(kind, params)?;
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    fn build_item(&self, item: &PlaylistItem) -> PlayoutResult<SharedProducer> {
        Ok(match item {
            PlaylistItem::Color { color, frames } => {
                let p = ColorProducer::from_str_color(color)?;
                ProducerHandle::new(match frames {
                    Some(n) => p.with_duration(*n),
                    None => p,
                })
            }
            PlaylistItem::Image { path, frames } => {
                let p = ImageProducer::new(self.resolve(path));
                ProducerHandle::new(match frames {
                    Some(n) => p.with_duration(*n),
                    None => p,
                })
            }
            PlaylistItem::Transition { .. } => {
                return Err(PlayoutError::validation(
                    "transition items wrap the item after them",
                ));
            }
        })
    }

    /// Turn a layer's items into a chain of producers and return its head.
    ///
    /// Each item is chained to the next; a transition takes the item after it as its
    /// destination. Producers are not initialized here.
    pub fn build_layer_chain(&self, layer: &LayerPlan) -> PlayoutResult<Option<SharedProducer>> {
        let mut head: Option<SharedProducer> = None;
        for item in layer.items.iter().rev() {
            let producer = match item {
                PlaylistItem::Transition { kind, params, frames } => {
                    let Some(dest) = head.take() else {
                        return Err(PlayoutError::validation(format!(
                            "layer {}: a transition needs an item to transition into",
                            layer.index
                        )));
                    };
                    let kind = parse_transition_kind_params(kind, params)?;
                    ProducerHandle::new(TransitionProducer::new(dest, kind, *frames))
                }
                other => {
                    let producer = self.build_item(other)?;
                    if let Some(next) = &head {
                        producer.chain(next)?;
                    }
                    producer
                }
            };
            head = Some(producer);
        }
        Ok(head)
    }

    /// Build a channel and start every layer's chain.
    #[tracing::instrument(skip_all, fields(layers = self.layers.len()))]
    pub fn build_channel(&self) -> PlayoutResult<Channel> {
        let mut channel = Channel::new(self.channel.clone())?;
        for layer in &self.layers {
            if let Some(head) = self.build_layer_chain(layer)? {
                channel.load(layer.index, head, true)?;
            }
        }
        Ok(channel)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/playlist.rs"]
mod tests;
