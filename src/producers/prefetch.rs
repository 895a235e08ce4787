use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::{
    foundation::error::{PlayoutError, PlayoutResult},
    frame::buffer::{Frame, FrameDesc, Rendered},
    processor::context::SharedProcessor,
    producer::frame_producer::FrameProducer,
};

const MAX_CONSECUTIVE_FAILURES: u32 = 8;
const PREROLL_TIMEOUT: Duration = Duration::from_secs(2);

/// A frame source that is allowed to block: file decoders, capture devices, network pulls.
///
/// Wrap it in a [`PrefetchProducer`] to use it on the render path.
pub trait FrameSource: Send + 'static {
    /// Prepare to deliver frames of `desc`. Runs synchronously inside producer initialization.
    fn open(&mut self, desc: FrameDesc) -> PlayoutResult<()>;

    /// Produce the next frame, or `None` once the source is finished.
    fn next_frame(&mut self, processor: &SharedProcessor) -> PlayoutResult<Option<Frame>>;

    /// Diagnostic label.
    fn label(&self) -> String;
}

/// Counters shared between a [`PrefetchProducer`] and whoever wants to observe it.
#[derive(Clone, Debug, Default)]
pub struct PrefetchStats {
    inner: Arc<PrefetchCounters>,
}

#[derive(Debug, Default)]
struct PrefetchCounters {
    delivered: AtomicU64,
    underruns: AtomicU64,
}

impl PrefetchStats {
    /// Frames handed to the render path from the queue.
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    /// Renders that found the queue empty.
    pub fn underruns(&self) -> u64 {
        self.inner.underruns.load(Ordering::Relaxed)
    }
}

enum Prefetched {
    Frame(Frame),
    EndOfStream,
    Failed(String),
}

/// Runs a blocking [`FrameSource`] on its own thread and serves its frames without blocking.
///
/// The worker keeps up to `depth` frames queued. When the queue is empty at render time the last
/// delivered frame is repeated (a transparent frame before the first one) and the underrun counter
/// is incremented. Dropping the producer signals the worker to stop; it is never joined.
pub struct PrefetchProducer<S: FrameSource> {
    source: Option<S>,
    source_label: String,
    depth: usize,
    rx: Option<Receiver<Prefetched>>,
    pending: Option<Prefetched>,
    last: Option<Frame>,
    stop: Arc<AtomicBool>,
    stats: PrefetchStats,
    processor: Option<SharedProcessor>,
}

impl<S: FrameSource> PrefetchProducer<S> {
    /// Prefetch up to `depth` frames ahead of the render path. A depth of zero is raised to one.
    pub fn new(source: S, depth: usize) -> Self {
        let source_label = source.label();
        Self {
            source: Some(source),
            source_label,
            depth: depth.max(1),
            rx: None,
            pending: None,
            last: None,
            stop: Arc::new(AtomicBool::new(false)),
            stats: PrefetchStats::default(),
            processor: None,
        }
    }

    /// Observer for delivery and underrun counters.
    pub fn stats(&self) -> PrefetchStats {
        self.stats.clone()
    }

    fn deliver(&mut self, msg: Prefetched) -> Rendered {
        match msg {
            Prefetched::Frame(frame) => {
                self.stats.inner.delivered.fetch_add(1, Ordering::Relaxed);
                self.last = Some(frame.clone());
                Rendered::Frame(frame)
            }
            Prefetched::EndOfStream => {
                self.release();
                Rendered::EndOfStream
            }
            Prefetched::Failed(err) => {
                tracing::error!(source = %self.source_label, error = %err, "prefetch source gave up");
                self.release();
                Rendered::EndOfStream
            }
        }
    }

    fn underrun(&mut self) -> Rendered {
        let n = self.stats.inner.underruns.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::warn!(source = %self.source_label, underruns = n, "prefetch underrun");
        match (&self.last, &self.processor) {
            (Some(last), _) => Rendered::Frame(last.clone()),
            (None, Some(processor)) => Rendered::Frame(processor.create_frame()),
            (None, None) => Rendered::EndOfStream,
        }
    }

    fn release(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.rx = None;
        self.last = None;
    }
}

impl<S: FrameSource> FrameProducer for PrefetchProducer<S> {
    #[tracing::instrument(skip_all, fields(source = %self.source_label, depth = self.depth))]
    fn initialize(&mut self, processor: &SharedProcessor) -> PlayoutResult<()> {
        let Some(mut source) = self.source.take() else {
            return Err(PlayoutError::initialization(
                "prefetch source already handed to a worker",
            ));
        };
        source.open(processor.desc())?;

        let (tx, rx) = crossbeam_channel::bounded::<Prefetched>(self.depth);
        let stop = Arc::clone(&self.stop);
        let worker_processor = Arc::clone(processor);
        std::thread::Builder::new()
            .name("playout-prefetch".to_string())
            .spawn(move || run_prefetch_worker(source, worker_processor, tx, stop))
            .map_err(|e| {
                PlayoutError::initialization(format!("spawn prefetch worker: {e}"))
            })?;

        match rx.recv_timeout(PREROLL_TIMEOUT) {
            Ok(Prefetched::Failed(err)) => {
                self.stop.store(true, Ordering::Release);
                return Err(PlayoutError::initialization(format!(
                    "prefetch source failed during preroll: {err}"
                )));
            }
            Ok(msg) => self.pending = Some(msg),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("no frame prefetched before preroll timeout");
            }
            Err(RecvTimeoutError::Disconnected) => {
                self.pending = Some(Prefetched::EndOfStream);
            }
        }

        self.rx = Some(rx);
        self.processor = Some(Arc::clone(processor));
        Ok(())
    }

    fn render_frame(&mut self) -> Rendered {
        if let Some(msg) = self.pending.take() {
            return self.deliver(msg);
        }
        let Some(rx) = &self.rx else {
            return Rendered::EndOfStream;
        };
        match rx.try_recv() {
            Ok(msg) => self.deliver(msg),
            Err(TryRecvError::Empty) => self.underrun(),
            Err(TryRecvError::Disconnected) => {
                self.release();
                Rendered::EndOfStream
            }
        }
    }

    fn label(&self) -> String {
        format!("prefetch {} [depth {}]", self.source_label, self.depth)
    }
}

impl<S: FrameSource> Drop for PrefetchProducer<S> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn run_prefetch_worker<S: FrameSource>(
    mut source: S,
    processor: SharedProcessor,
    tx: Sender<Prefetched>,
    stop: Arc<AtomicBool>,
) {
    let desc = processor.desc();
    let mut failures = 0u32;
    while !stop.load(Ordering::Acquire) {
        let msg = match source.next_frame(&processor) {
            Ok(Some(frame)) if frame.desc() == desc => {
                failures = 0;
                Prefetched::Frame(frame)
            }
            Ok(Some(frame)) => {
                failures += 1;
                tracing::warn!(
                    got = ?frame.desc(),
                    want = ?desc,
                    "prefetch source produced a frame of the wrong format"
                );
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    Prefetched::Failed("repeated frames of the wrong format".to_string())
                } else {
                    continue;
                }
            }
            Ok(None) => Prefetched::EndOfStream,
            Err(err) => {
                failures += 1;
                tracing::warn!(error = %err, failures, "prefetch source failed");
                if failures >= MAX_CONSECUTIVE_FAILURES {
                    Prefetched::Failed(err.to_string())
                } else {
                    continue;
                }
            }
        };
        let last = !matches!(msg, Prefetched::Frame(_));
        if tx.send(msg).is_err() || last {
            break;
        }
    }
    tracing::debug!(source = %source.label(), "prefetch worker stopped");
}

#[cfg(test)]
#[path = "../../tests/unit/producers/prefetch.rs"]
mod tests;
