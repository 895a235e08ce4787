//! Frame producer abstraction and gapless layer pipeline for real-time playout.
//!
//! A *producer* yields one video frame per channel tick. Producers are handed a shared processing
//! context at initialization, render without blocking, and may name a following producer that a
//! layer swaps in, within the same tick, once they reach end of stream.
//!
//! # Pieces
//!
//! 1. **Producers**: [`FrameProducer`] implementations, wrapped in a [`ProducerHandle`] that
//!    enforces the lifecycle (initialize once, render until end of stream, never after).
//! 2. **Processing context**: [`FrameProcessor`] creates, mixes and composites frames;
//!    [`CpuFrameProcessor`] recycles buffers through a bounded pool.
//! 3. **Pipeline**: a [`Layer`] plays one producer chain; a [`Channel`] renders all layers in
//!    parallel each tick and composites them in index order.
//! 4. **Playlists**: [`Playlist`] loads a channel and its running orders from JSON.
//!
//! The key constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **No IO on the render path**: file decoding happens in `initialize`; blocking sources go
//!   through [`PrefetchProducer`].
//! - **Premultiplied RGBA8** end-to-end.
//! - **Contract violations are errors**: misuse of a producer is logged and returned as
//!   [`PlayoutError::ContractViolation`], never silently absorbed.
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod foundation;
mod frame;
mod pipeline;
mod processor;
mod producer;
mod producers;

pub use foundation::core::{Canvas, Fps, FrameIndex, Rgba8Premul};
pub use foundation::error::{PlayoutError, PlayoutResult};
pub use frame::buffer::{Frame, FrameDesc, PixelFormat, Rendered};
pub use frame::composite::WipeDir;
pub use frame::mix::{TransitionKind, parse_transition_kind_params};
pub use pipeline::channel::Channel;
pub use pipeline::config::ChannelConfig;
pub use pipeline::layer::{Layer, LayerStatus};
pub use pipeline::playlist::{LayerPlan, Playlist, PlaylistItem};
pub use processor::buffer_pool::{BufferPoolOpts, BufferPoolStats};
pub use processor::context::{FrameProcessor, SharedProcessor};
pub use processor::cpu::CpuFrameProcessor;
pub use producer::chain::walk_chain;
pub use producer::frame_producer::{FrameProducer, UNKNOWN_PRODUCER_LABEL};
pub use producer::handle::{ProducerHandle, ProducerId, ProducerState, SharedProducer};
pub use producers::color::{ColorProducer, parse_color};
pub use producers::prefetch::{FrameSource, PrefetchProducer, PrefetchStats};
pub use producers::still::ImageProducer;
pub use producers::transition::TransitionProducer;
