use std::sync::{Arc, Mutex};

use super::*;
use crate::{
    foundation::core::{Canvas, Fps, Rgba8Premul},
    processor::{buffer_pool::BufferPoolOpts, cpu::CpuFrameProcessor},
    producer::{
        frame_producer::FrameProducer,
        handle::{ProducerHandle, ProducerId},
    },
    producers::color::ColorProducer,
};

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];

fn processor() -> SharedProcessor {
    CpuFrameProcessor::shared(
        Canvas {
            width: 2,
            height: 2,
        },
        Fps::new(25, 1).unwrap(),
        BufferPoolOpts::default(),
    )
    .unwrap()
}

fn layer() -> Layer {
    Layer::new(10, processor(), 8)
}

fn color(rgba: [u8; 4], frames: Option<u64>) -> SharedProducer {
    let p = ColorProducer::new(Rgba8Premul::from_straight_rgba(
        rgba[0], rgba[1], rgba[2], rgba[3],
    ));
    ProducerHandle::new(match frames {
        Some(n) => p.with_duration(n),
        None => p,
    })
}

fn top_left(frame: Option<Frame>) -> Option<[u8; 4]> {
    frame.and_then(|f| f.pixel(0, 0))
}

#[derive(Default)]
struct Log {
    renders: usize,
    leading: Option<ProducerId>,
}

/// Fills `rgba` for `frames` frames, records what it was told, panics if rendered after its end.
struct Tracked {
    rgba: [u8; 4],
    frames: usize,
    done: bool,
    fail_init: bool,
    processor: Option<SharedProcessor>,
    log: Arc<Mutex<Log>>,
}

fn tracked(rgba: [u8; 4], frames: usize) -> (SharedProducer, Arc<Mutex<Log>>) {
    let log = Arc::new(Mutex::new(Log::default()));
    let p = ProducerHandle::new(Tracked {
        rgba,
        frames,
        done: false,
        fail_init: false,
        processor: None,
        log: Arc::clone(&log),
    });
    (p, log)
}

impl FrameProducer for Tracked {
    fn initialize(&mut self, processor: &SharedProcessor) -> PlayoutResult<()> {
        if self.fail_init {
            return Err(PlayoutError::initialization("cannot open clip"));
        }
        self.processor = Some(Arc::clone(processor));
        Ok(())
    }

    fn render_frame(&mut self) -> Rendered {
        assert!(!self.done, "rendered again after end of stream");
        let mut log = self.log.lock().unwrap();
        log.renders += 1;
        if log.renders > self.frames {
            self.done = true;
            return Rendered::EndOfStream;
        }
        let [r, g, b, a] = self.rgba;
        let mut frame = self.processor.as_ref().unwrap().create_frame();
        frame.fill(Rgba8Premul::from_straight_rgba(r, g, b, a));
        Rendered::Frame(frame)
    }

    fn set_leading_producer(&mut self, leading: &SharedProducer) {
        self.log.lock().unwrap().leading = Some(leading.id());
    }

    fn label(&self) -> String {
        format!("tracked {:?}", self.rgba)
    }
}

#[test]
fn end_of_stream_without_following_empties_the_slot() {
    let mut l = layer();
    l.load(color(RED, Some(1)), true).unwrap();
    assert_eq!(top_left(l.render().unwrap()), Some(RED));
    assert_eq!(l.render().unwrap(), None);
    assert!(l.is_empty());
    assert_eq!(l.render().unwrap(), None);
}

#[test]
fn handoff_renders_successor_in_the_same_tick() {
    let (a, a_log) = tracked(RED, 2);
    let (b, b_log) = tracked(GREEN, 100);
    a.chain(&b).unwrap();

    let mut l = layer();
    l.load(Arc::clone(&a), true).unwrap();
    assert_eq!(b.state(), ProducerState::Active);

    let colors: Vec<_> = (0..4).map(|_| top_left(l.render().unwrap())).collect();
    assert_eq!(colors, vec![Some(RED), Some(RED), Some(GREEN), Some(GREEN)]);

    assert_eq!(a_log.lock().unwrap().renders, 3);
    assert_eq!(a.state(), ProducerState::Exhausted);
    assert_eq!(b_log.lock().unwrap().leading, Some(a.id()));
    assert_eq!(b_log.lock().unwrap().renders, 2);
    assert_eq!(l.status().swaps, 1);
}

#[test]
fn successor_chained_after_load_is_initialized_at_handoff() {
    let a = color(RED, Some(1));
    let mut l = layer();
    l.load(Arc::clone(&a), true).unwrap();

    let b = color(GREEN, None);
    a.chain(&b).unwrap();
    assert_eq!(b.state(), ProducerState::Uninitialized);

    assert_eq!(top_left(l.render().unwrap()), Some(RED));
    assert_eq!(top_left(l.render().unwrap()), Some(GREEN));
    assert_eq!(b.state(), ProducerState::Active);
}

#[test]
fn exhausted_successor_is_rejected_and_slot_emptied() {
    let proc_ = processor();
    let b = color(GREEN, Some(0));
    b.initialize(&proc_).unwrap();
    assert!(b.render_frame().unwrap().is_end_of_stream());

    let a = color(RED, Some(1));
    a.chain(&b).unwrap();
    let mut l = layer();
    l.load(a, true).unwrap_err();
}

#[test]
fn successor_exhausted_after_load_is_rejected_at_handoff() {
    let a = color(RED, Some(1));
    let b = color(GREEN, Some(0));
    a.chain(&b).unwrap();
    let mut l = layer();
    l.load(a, true).unwrap();

    assert!(b.render_frame().unwrap().is_end_of_stream());

    assert_eq!(top_left(l.render().unwrap()), Some(RED));
    let err = l.render().unwrap_err();
    assert!(err.is_contract_violation());
    assert!(l.is_empty());
}

#[test]
fn pause_holds_last_frame_without_rendering() {
    let (a, log) = tracked(RED, 100);
    let mut l = layer();
    l.load(a, true).unwrap();
    l.render().unwrap();
    l.pause();
    for _ in 0..3 {
        assert_eq!(top_left(l.render().unwrap()), Some(RED));
    }
    assert_eq!(log.lock().unwrap().renders, 1);
    assert!(l.status().paused);

    l.resume();
    l.render().unwrap();
    assert_eq!(log.lock().unwrap().renders, 2);
}

#[test]
fn play_cues_background_and_reports_previous_producer() {
    let a = color(RED, None);
    let (b, b_log) = tracked(GREEN, 100);
    let mut l = layer();
    l.load(Arc::clone(&a), true).unwrap();
    l.load(b, false).unwrap();

    assert_eq!(top_left(l.render().unwrap()), Some(RED));
    assert!(l.status().background.is_some());

    l.play().unwrap();
    assert_eq!(b_log.lock().unwrap().leading, Some(a.id()));
    assert_eq!(top_left(l.render().unwrap()), Some(GREEN));
    assert!(l.status().background.is_none());
}

#[test]
fn failed_initialize_cues_nothing() {
    let log = Arc::new(Mutex::new(Log::default()));
    let p = ProducerHandle::new(Tracked {
        rgba: RED,
        frames: 1,
        done: false,
        fail_init: true,
        processor: None,
        log,
    });
    let mut l = layer();
    let err = l.load(Arc::clone(&p), true).unwrap_err();
    assert!(matches!(err, PlayoutError::Initialization(_)));
    assert_eq!(p.state(), ProducerState::Failed);
    assert!(l.is_empty());
}

#[test]
fn swap_limit_defers_remaining_handoffs_to_next_tick() {
    let z1 = color(RED, Some(0));
    let z2 = color(RED, Some(0));
    let z3 = color(RED, Some(0));
    let c = color(GREEN, None);
    z1.chain(&z2).unwrap();
    z2.chain(&z3).unwrap();
    z3.chain(&c).unwrap();

    let mut l = Layer::new(0, processor(), 1);
    l.load(z1, true).unwrap();
    assert_eq!(l.render().unwrap(), None);
    assert_eq!(top_left(l.render().unwrap()), Some(GREEN));
    assert_eq!(l.status().swaps, 3);
}

#[test]
fn stop_and_clear() {
    let mut l = layer();
    l.load(color(RED, None), true).unwrap();
    l.load(color(GREEN, None), false).unwrap();
    l.stop();
    assert_eq!(l.render().unwrap(), None);
    assert!(!l.is_empty());
    l.clear();
    assert!(l.is_empty());
}

#[test]
fn status_summarizes_layer() {
    let mut l = layer();
    l.load(color(RED, None), true).unwrap();
    l.render().unwrap();
    let s = l.status();
    assert_eq!(s.index, 10);
    assert_eq!(s.frames_rendered, 1);
    assert_eq!(
        s.to_string(),
        "layer 10: color #ff0000ff (active), 1 frames, 0 swaps"
    );
}
