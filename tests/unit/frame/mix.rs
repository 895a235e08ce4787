use super::*;
use crate::foundation::core::Rgba8Premul;
use crate::frame::buffer::{FrameDesc, PixelFormat};

fn solid(w: u32, h: u32, c: Rgba8Premul) -> Frame {
    let mut f = Frame::new(FrameDesc {
        width: w,
        height: h,
        format: PixelFormat::Rgba8Premul,
    });
    f.fill(c);
    f
}

#[test]
fn parse_accepts_known_kinds_case_insensitively() {
    let null = serde_json::Value::Null;
    assert_eq!(
        parse_transition_kind_params(" Cut ", &null).unwrap(),
        TransitionKind::Cut
    );
    assert_eq!(
        parse_transition_kind_params("MIX", &null).unwrap(),
        TransitionKind::Crossfade
    );
    assert_eq!(
        parse_transition_kind_params("wipe", &null).unwrap(),
        TransitionKind::Wipe {
            dir: WipeDir::LeftToRight,
            soft_edge: 0.0
        }
    );
}

#[test]
fn parse_wipe_params_and_clamps_soft_edge() {
    let params = serde_json::json!({ "dir": "ttb", "soft_edge": 3.0 });
    assert_eq!(
        parse_transition_kind_params("wipe", &params).unwrap(),
        TransitionKind::Wipe {
            dir: WipeDir::TopToBottom,
            soft_edge: 1.0
        }
    );
}

#[test]
fn parse_rejects_unknown_input() {
    let null = serde_json::Value::Null;
    assert!(parse_transition_kind_params("", &null).is_err());
    assert!(parse_transition_kind_params("spin", &null).is_err());
    assert!(parse_transition_kind_params("wipe", &serde_json::json!({ "dir": "diag" })).is_err());
    assert!(parse_transition_kind_params("wipe", &serde_json::json!([1, 2])).is_err());
}

#[test]
fn mix_crossfade_endpoints() {
    let red = Rgba8Premul::from_straight_rgba(255, 0, 0, 255);
    let blue = Rgba8Premul::from_straight_rgba(0, 0, 255, 255);
    let a = solid(2, 2, red);
    let b = solid(2, 2, blue);

    let mut out = Frame::new(a.desc());
    mix_into(&mut out, &a, &b, &TransitionKind::Crossfade, 0.0).unwrap();
    assert_eq!(out, a);

    let mut out = Frame::new(a.desc());
    mix_into(&mut out, &a, &b, &TransitionKind::Crossfade, 1.0).unwrap();
    assert_eq!(out, b);
}

#[test]
fn mix_cut_shows_incoming_immediately() {
    let a = solid(2, 1, Rgba8Premul::from_straight_rgba(255, 0, 0, 255));
    let b = solid(2, 1, Rgba8Premul::from_straight_rgba(0, 255, 0, 255));
    let mut out = Frame::new(a.desc());
    mix_into(&mut out, &a, &b, &TransitionKind::Cut, 0.1).unwrap();
    assert_eq!(out, b);
}

#[test]
fn mix_rejects_mismatched_inputs() {
    let a = solid(2, 2, Rgba8Premul::transparent());
    let b = solid(3, 2, Rgba8Premul::transparent());
    let mut out = Frame::new(a.desc());
    assert!(mix_into(&mut out, &a, &b, &TransitionKind::Crossfade, 0.5).is_err());
}
