use std::{
    fmt,
    sync::{
        Arc, Mutex, MutexGuard, OnceLock,
        atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering},
    },
};

use crate::{
    foundation::error::{PlayoutError, PlayoutResult},
    frame::buffer::Rendered,
    processor::context::SharedProcessor,
    producer::{chain::walk_chain, frame_producer::FrameProducer},
};

static NEXT_PRODUCER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`ProducerHandle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProducerId(u64);

impl ProducerId {
    fn next() -> Self {
        Self(NEXT_PRODUCER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProducerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a producer instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ProducerState {
    /// Constructed, not yet given a processing context.
    Uninitialized = 0,
    /// `initialize` is running.
    Initializing = 1,
    /// Ready to render.
    Active = 2,
    /// Returned end of stream. Terminal.
    Exhausted = 3,
    /// `initialize` returned an error. Terminal; the instance should be discarded.
    Failed = 4,
}

impl ProducerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            2 => Self::Active,
            3 => Self::Exhausted,
            _ => Self::Failed,
        }
    }

    /// Whether no further rendering can ever happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Failed)
    }
}

impl fmt::Display for ProducerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Active => "active",
            Self::Exhausted => "exhausted",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Shared ownership of a producer.
///
/// The same producer may sit in a layer's active slot and in another producer's following slot
/// at once; it lives until the last holder drops it.
pub type SharedProducer = Arc<ProducerHandle>;

/// Lifecycle-enforcing wrapper around a boxed [`FrameProducer`].
///
/// Every contract violation (render before initialize, render after end of stream, double
/// initialize, overlapping renders, repeated `set_leading_producer`) is logged and returned as
/// [`PlayoutError::ContractViolation`] without touching the wrapped producer.
///
/// The wrapped producer sits behind a mutex that render holds only for the duration of one
/// non-blocking render call. Overlapping renders are detected with an atomic flag and rejected
/// instead of waiting on that mutex.
pub struct ProducerHandle {
    id: ProducerId,
    state: AtomicU8,
    rendering: AtomicBool,
    leading_set: AtomicBool,
    following: OnceLock<SharedProducer>,
    inner: Mutex<Box<dyn FrameProducer>>,
}

impl ProducerHandle {
    /// Wrap `producer` for sharing.
    pub fn new<P: FrameProducer + 'static>(producer: P) -> SharedProducer {
        Self::from_box(Box::new(producer))
    }

    /// Wrap an already boxed producer for sharing.
    pub fn from_box(producer: Box<dyn FrameProducer>) -> SharedProducer {
        Arc::new(Self {
            id: ProducerId::next(),
            state: AtomicU8::new(ProducerState::Uninitialized as u8),
            rendering: AtomicBool::new(false),
            leading_set: AtomicBool::new(false),
            following: OnceLock::new(),
            inner: Mutex::new(producer),
        })
    }

    /// Identity of this instance.
    pub fn id(&self) -> ProducerId {
        self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProducerState {
        ProducerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Initialize the producer with the channel's processing context.
    ///
    /// On error the producer moves to [`ProducerState::Failed`] and must be discarded.
    #[tracing::instrument(skip_all, fields(producer = %self.id))]
    pub fn initialize(&self, processor: &SharedProcessor) -> PlayoutResult<()> {
        if let Err(found) = self.state.compare_exchange(
            ProducerState::Uninitialized as u8,
            ProducerState::Initializing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(self.violation(format!(
                "initialize called while {}",
                ProducerState::from_u8(found)
            )));
        }

        let result = self
            .lock_inner()
            .and_then(|mut producer| producer.initialize(processor));
        match result {
            Ok(()) => {
                self.state
                    .store(ProducerState::Active as u8, Ordering::Release);
                tracing::debug!("producer initialized");
                Ok(())
            }
            Err(err) => {
                self.state
                    .store(ProducerState::Failed as u8, Ordering::Release);
                tracing::warn!(error = %err, "producer initialization failed");
                Err(err)
            }
        }
    }

    /// Render the next frame, or the end-of-stream sentinel.
    ///
    /// Returning [`Rendered::EndOfStream`] moves the producer to [`ProducerState::Exhausted`].
    pub fn render_frame(&self) -> PlayoutResult<Rendered> {
        if self.rendering.swap(true, Ordering::AcqRel) {
            return Err(self.violation("overlapping render_frame calls on one producer"));
        }
        let _in_flight = InFlight(&self.rendering);

        match self.state() {
            ProducerState::Active => {}
            ProducerState::Uninitialized | ProducerState::Initializing => {
                return Err(self.violation("render_frame called before initialize"));
            }
            ProducerState::Exhausted => {
                return Err(self.violation("render_frame called after end of stream"));
            }
            ProducerState::Failed => {
                return Err(self.violation("render_frame called after failed initialize"));
            }
        }

        let rendered = self.lock_inner()?.render_frame();
        if rendered.is_end_of_stream() {
            self.state
                .store(ProducerState::Exhausted as u8, Ordering::Release);
            tracing::debug!(producer = %self.id, "end of stream");
        }
        Ok(rendered)
    }

    /// The producer to swap in once this one reaches end of stream.
    ///
    /// The wrapped producer's own designation wins; otherwise the link published with
    /// [`ProducerHandle::chain`] is returned.
    pub fn following_producer(&self) -> Option<SharedProducer> {
        if let Some(next) = self.inner_following() {
            return Some(next);
        }
        self.following.get().cloned()
    }

    /// Publish `next` as the following producer of a producer that does not designate one.
    ///
    /// The link is published once and may be read from any thread afterwards. Links to itself,
    /// links that would close a cycle, and a second publication are rejected.
    pub fn chain(&self, next: &SharedProducer) -> PlayoutResult<()> {
        if next.id == self.id {
            return Err(PlayoutError::validation(format!(
                "producer {} cannot follow itself",
                self.id
            )));
        }
        if self.inner_following().is_some() {
            return Err(PlayoutError::validation(format!(
                "producer {} already designates its following producer",
                self.id
            )));
        }
        if walk_chain(next)?.iter().any(|p| p.id == self.id) {
            return Err(PlayoutError::validation(format!(
                "chaining {} after {} would create a cycle",
                next.id, self.id
            )));
        }
        self.following
            .set(Arc::clone(next))
            .map_err(|_| self.violation("following producer already published"))
    }

    /// Tell this producer which producer played before it. At most once, before end of stream.
    pub fn set_leading_producer(&self, leading: &SharedProducer) -> PlayoutResult<()> {
        if leading.id == self.id {
            return Err(self.violation("producer cannot lead itself"));
        }
        if self.state().is_terminal() {
            return Err(self.violation(format!(
                "set_leading_producer called while {}",
                self.state()
            )));
        }
        if self.leading_set.swap(true, Ordering::AcqRel) {
            return Err(self.violation("set_leading_producer called more than once"));
        }
        self.lock_inner()?.set_leading_producer(leading);
        Ok(())
    }

    /// Diagnostic label of the wrapped producer. Valid in every state.
    pub fn label(&self) -> String {
        match self.inner.lock() {
            Ok(producer) => producer.label(),
            Err(poisoned) => poisoned.into_inner().label(),
        }
    }

    fn inner_following(&self) -> Option<SharedProducer> {
        match self.inner.lock() {
            Ok(producer) => producer.following_producer(),
            Err(poisoned) => poisoned.into_inner().following_producer(),
        }
    }

    fn lock_inner(&self) -> PlayoutResult<MutexGuard<'_, Box<dyn FrameProducer>>> {
        self.inner
            .lock()
            .map_err(|_| self.violation("producer poisoned by a panic in an earlier call"))
    }

    fn violation(&self, msg: impl Into<String>) -> PlayoutError {
        let msg = msg.into();
        tracing::error!(producer = %self.id, "{msg}");
        PlayoutError::contract(format!("producer {}: {msg}", self.id))
    }
}

impl fmt::Display for ProducerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl fmt::Debug for ProducerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/producer/handle.rs"]
mod tests;
