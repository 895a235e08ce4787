use std::{
    sync::{Mutex, mpsc},
    time::Instant,
};

use super::*;
use crate::{
    foundation::core::{Canvas, Fps, Rgba8Premul},
    processor::{buffer_pool::BufferPoolOpts, cpu::CpuFrameProcessor},
    producer::handle::{ProducerHandle, ProducerState},
};

fn processor() -> SharedProcessor {
    CpuFrameProcessor::shared(
        Canvas {
            width: 2,
            height: 1,
        },
        Fps::new(25, 1).unwrap(),
        BufferPoolOpts::default(),
    )
    .unwrap()
}

fn red_frame(processor: &SharedProcessor, r: u8) -> Frame {
    let mut frame = processor.create_frame();
    frame.fill(Rgba8Premul::from_straight_rgba(r, 0, 0, 255));
    frame
}

fn red_of(rendered: Rendered) -> u8 {
    rendered.into_frame().expect("frame").pixel(0, 0).unwrap()[0]
}

/// Render until a queued frame (not an underrun repeat) or end of stream comes out.
fn next_delivered<S: FrameSource>(p: &mut PrefetchProducer<S>) -> Rendered {
    let deadline = Instant::now() + Duration::from_secs(5);
    let before = p.stats().delivered();
    loop {
        let rendered = p.render_frame();
        if rendered.is_end_of_stream() || p.stats().delivered() > before {
            return rendered;
        }
        assert!(Instant::now() < deadline, "prefetch worker made no progress");
        std::thread::sleep(Duration::from_millis(1));
    }
}

struct Counting {
    next: u8,
    end: u8,
}

impl FrameSource for Counting {
    fn open(&mut self, _desc: FrameDesc) -> PlayoutResult<()> {
        Ok(())
    }

    fn next_frame(&mut self, processor: &SharedProcessor) -> PlayoutResult<Option<Frame>> {
        if self.next >= self.end {
            return Ok(None);
        }
        let frame = red_frame(processor, self.next);
        self.next += 1;
        Ok(Some(frame))
    }

    fn label(&self) -> String {
        format!("counting {}..{}", self.next, self.end)
    }
}

/// Blocks until the test feeds a value; ends when the feeding side is dropped.
struct Gated {
    gate: Mutex<mpsc::Receiver<u8>>,
    dropped: Arc<AtomicBool>,
}

impl FrameSource for Gated {
    fn open(&mut self, _desc: FrameDesc) -> PlayoutResult<()> {
        Ok(())
    }

    fn next_frame(&mut self, processor: &SharedProcessor) -> PlayoutResult<Option<Frame>> {
        let gate = self.gate.lock().unwrap();
        Ok(gate.recv().ok().map(|r| red_frame(processor, r)))
    }

    fn label(&self) -> String {
        "gated".to_string()
    }
}

impl Drop for Gated {
    fn drop(&mut self) {
        self.dropped.store(true, Ordering::Release);
    }
}

fn gated() -> (Gated, mpsc::Sender<u8>, Arc<AtomicBool>) {
    let (tx, rx) = mpsc::channel();
    let dropped = Arc::new(AtomicBool::new(false));
    (
        Gated {
            gate: Mutex::new(rx),
            dropped: Arc::clone(&dropped),
        },
        tx,
        dropped,
    )
}

struct Broken {
    fail_open: bool,
}

impl FrameSource for Broken {
    fn open(&mut self, _desc: FrameDesc) -> PlayoutResult<()> {
        if self.fail_open {
            return Err(PlayoutError::initialization("device busy"));
        }
        Ok(())
    }

    fn next_frame(&mut self, _processor: &SharedProcessor) -> PlayoutResult<Option<Frame>> {
        Err(PlayoutError::render("decode error"))
    }

    fn label(&self) -> String {
        "broken".to_string()
    }
}

#[test]
fn delivers_frames_in_source_order_then_end_of_stream() {
    let mut p = PrefetchProducer::new(Counting { next: 0, end: 5 }, 2);
    p.initialize(&processor()).unwrap();

    let got: Vec<u8> = (0..5).map(|_| red_of(next_delivered(&mut p))).collect();
    assert_eq!(got, vec![0, 1, 2, 3, 4]);
    assert!(next_delivered(&mut p).is_end_of_stream());
    assert_eq!(p.stats().delivered(), 5);
}

#[test]
fn underrun_repeats_last_delivered_frame() {
    let (source, feed, _dropped) = gated();
    feed.send(7).unwrap();
    let mut p = PrefetchProducer::new(source, 4);
    p.initialize(&processor()).unwrap();

    assert_eq!(red_of(p.render_frame()), 7);
    assert_eq!(p.stats().underruns(), 0);

    assert_eq!(red_of(p.render_frame()), 7);
    assert_eq!(p.stats().underruns(), 1);
    assert_eq!(p.stats().delivered(), 1);

    feed.send(9).unwrap();
    assert_eq!(red_of(next_delivered(&mut p)), 9);

    drop(feed);
    assert!(next_delivered(&mut p).is_end_of_stream());
}

#[test]
fn open_failure_is_an_initialization_error() {
    let p = ProducerHandle::new(PrefetchProducer::new(Broken { fail_open: true }, 2));
    let err = p.initialize(&processor()).unwrap_err();
    assert!(matches!(err, PlayoutError::Initialization(_)));
    assert_eq!(p.state(), ProducerState::Failed);
}

#[test]
fn source_failing_through_preroll_fails_initialize() {
    let p = ProducerHandle::new(PrefetchProducer::new(Broken { fail_open: false }, 2));
    let err = p.initialize(&processor()).unwrap_err();
    assert!(err.to_string().contains("decode error"));
    assert_eq!(p.state(), ProducerState::Failed);
}

#[test]
fn dropping_producer_releases_the_worker() {
    let (source, feed, dropped) = gated();
    feed.send(1).unwrap();
    let mut p = PrefetchProducer::new(source, 1);
    p.initialize(&processor()).unwrap();
    drop(p);

    // The worker is parked in the gate; one more value lets it observe the shutdown.
    let _ = feed.send(2);
    let _ = feed.send(3);
    let deadline = Instant::now() + Duration::from_secs(5);
    while !dropped.load(Ordering::Acquire) {
        assert!(Instant::now() < deadline, "worker kept its source alive");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn label_names_source_and_depth() {
    let p = PrefetchProducer::new(Counting { next: 0, end: 3 }, 0);
    assert_eq!(p.label(), "prefetch counting 0..3 [depth 1]");
}
