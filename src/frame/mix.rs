use crate::{
    foundation::error::{PlayoutError, PlayoutResult},
    frame::{
        buffer::Frame,
        composite::{WipeDir, WipeParams, crossfade_over_in_place, wipe_over_in_place},
    },
};

/// How a transition blends the outgoing frame into the incoming one.
#[derive(Clone, Debug, PartialEq)]
pub enum TransitionKind {
    /// Show the incoming frame immediately.
    Cut,
    /// Linear opacity blend.
    Crossfade,
    /// Sweep the incoming frame across the outgoing one.
    Wipe {
        /// Sweep direction.
        dir: WipeDir,
        /// Width of the blended edge as a fraction of the sweep axis, `0..=1`.
        soft_edge: f32,
    },
}

/// Parse a transition kind name plus optional JSON parameters.
///
/// Accepted kinds are `cut`, `crossfade` (alias `mix`) and `wipe`. `wipe` takes an optional
/// object with `dir` and `soft_edge`.
pub fn parse_transition_kind_params(
    kind: &str,
    params: &serde_json::Value,
) -> PlayoutResult<TransitionKind> {
    let kind = kind.trim().to_ascii_lowercase();
    if kind.is_empty() {
        return Err(PlayoutError::validation("transition kind must be non-empty"));
    }

    match kind.as_str() {
        "cut" => Ok(TransitionKind::Cut),
        "crossfade" | "mix" => Ok(TransitionKind::Crossfade),
        "wipe" => {
            let params = if params.is_null() {
                None
            } else {
                Some(
                    params
                        .as_object()
                        .ok_or_else(|| PlayoutError::validation("wipe params must be an object"))?,
                )
            };

            let dir = match params.and_then(|p| p.get("dir")).and_then(|v| v.as_str()) {
                None => WipeDir::LeftToRight,
                Some(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "left_to_right" | "lefttoright" | "ltr" => WipeDir::LeftToRight,
                    "right_to_left" | "righttoleft" | "rtl" => WipeDir::RightToLeft,
                    "top_to_bottom" | "toptobottom" | "ttb" => WipeDir::TopToBottom,
                    "bottom_to_top" | "bottomtotop" | "btt" => WipeDir::BottomToTop,
                    other => {
                        return Err(PlayoutError::validation(format!(
                            "unknown wipe.dir '{other}'"
                        )));
                    }
                },
            };

            let soft_edge = match params
                .and_then(|p| p.get("soft_edge"))
                .and_then(|v| v.as_f64())
            {
                None => 0.0,
                Some(v) => {
                    let f = v as f32;
                    if !f.is_finite() {
                        return Err(PlayoutError::validation(
                            "wipe.soft_edge must be finite when set",
                        ));
                    }
                    f.clamp(0.0, 1.0)
                }
            };

            Ok(TransitionKind::Wipe { dir, soft_edge })
        }
        _ => Err(PlayoutError::validation(format!(
            "unknown transition kind '{kind}'"
        ))),
    }
}

/// Blend `from` into `to` at progress `t` (`0` = all `from`, `1` = all `to`), over `out`.
pub(crate) fn mix_into(
    out: &mut Frame,
    from: &Frame,
    to: &Frame,
    kind: &TransitionKind,
    t: f32,
) -> PlayoutResult<()> {
    if from.desc() != out.desc() || to.desc() != out.desc() {
        return Err(PlayoutError::render(
            "transition inputs must match the output frame format",
        ));
    }
    let desc = out.desc();
    match kind {
        TransitionKind::Cut => crossfade_over_in_place(out.data_mut(), from.data(), to.data(), 1.0),
        TransitionKind::Crossfade => {
            crossfade_over_in_place(out.data_mut(), from.data(), to.data(), t)
        }
        TransitionKind::Wipe { dir, soft_edge } => wipe_over_in_place(
            out.data_mut(),
            from.data(),
            to.data(),
            WipeParams {
                width: desc.width,
                height: desc.height,
                t,
                dir: *dir,
                soft_edge: *soft_edge,
            },
        ),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/mix.rs"]
mod tests;
