//! Banner and scroll transition effects from the event's effect field

use log::debug;

use crate::pipeline::scan::strtol;
use crate::pipeline::state::{EventType, RenderState, ScrollDirection, TagContext};

/// Numbers following each `;` in the effect string, at most four
fn effect_values(effect: &str) -> Vec<i64> {
    effect
        .split(';')
        .skip(1)
        .take(4)
        .map(|part| strtol(part, 10).map_or(0, |(v, _)| v))
        .collect()
}

/// Configure scrolling from `Banner;delay[;lefttoright]`,
/// `Scroll up;y1;y2;delay` or `Scroll down;y1;y2;delay`
pub fn apply_transition_effects(state: &mut RenderState, ctx: &TagContext<'_>) {
    let effect = ctx.event.effect.as_str();
    if effect.is_empty() {
        return;
    }
    let v = effect_values(effect);
    let elapsed = ctx.event_time();

    if effect.starts_with("Banner;") {
        if v.is_empty() {
            debug!("Error parsing effect: {effect}");
            return;
        }
        state.scroll_direction = if v.len() >= 2 && v[1] == 0 {
            ScrollDirection::RightToLeft
        } else {
            ScrollDirection::LeftToRight
        };
        let delay = if v[0] == 0 { 1 } else { v[0] };
        state.scroll_shift = (elapsed / delay) as f64;
        state.evt_type = EventType::HScroll;
        return;
    }

    let direction = if effect.starts_with("Scroll up;") {
        ScrollDirection::BottomToTop
    } else if effect.starts_with("Scroll down;") {
        ScrollDirection::TopToBottom
    } else {
        debug!("Unknown transition effect: {effect}");
        return;
    };
    if v.len() < 3 {
        debug!("Error parsing effect: {effect}");
        return;
    }
    state.scroll_direction = direction;
    let delay = if v[2] == 0 { 1 } else { v[2] };
    state.scroll_shift = (elapsed / delay) as f64;

    let y0 = v[0].min(v[1]);
    let mut y1 = v[0].max(v[1]);
    if y1 == 0 {
        y1 = i64::from(ctx.play_res.1);
    }
    state.clip_y0 = y0 as f64;
    state.clip_y1 = y1 as f64;
    state.clip.y_min = state.clip_y0;
    state.clip.y_max = state.clip_y1;
    state.evt_type = EventType::VScroll;
    state.detect_collisions = false;
}
