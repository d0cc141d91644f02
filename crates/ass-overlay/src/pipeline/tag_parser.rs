//! Override tag interpreter
//!
//! Parses the `{\tag...}` blocks embedded in event text and applies each
//! tag to a [`RenderState`]. Parsing is byte oriented: every delimiter is
//! ASCII so slicing between delimiters always lands on a char boundary.
//! Malformed tags never fail; the scanner skips to the next `\` and carries
//! on.

use std::sync::Arc;

use log::{debug, trace};

use crate::pipeline::drawing::Drawing;
use crate::pipeline::scan::{strtod, strtol};
use crate::pipeline::state::{
    change_alpha, change_color, ClipMode, EventType, Karaoke, RenderState, TagContext, VectorClip,
};
use crate::track::{Alignment, WrapStyle};
use crate::utils::math::{lerp, DBBox, DVector};

const MAX_BE: i32 = 127;
const MAX_BLUR: f64 = 100.0;

/// Scanning position over event text
struct Cursor<'s> {
    text: &'s str,
    pos: usize,
}

impl<'s> Cursor<'s> {
    fn new(text: &'s str, pos: usize) -> Self {
        Self { text, pos }
    }

    fn peek(&self) -> u8 {
        self.text.as_bytes().get(self.pos).copied().unwrap_or(0)
    }

    fn rest(&self) -> &'s str {
        self.text.get(self.pos..).unwrap_or("")
    }

    fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Consume `c` when present
    fn eat(&mut self, c: u8) -> bool {
        if self.peek() == c {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Advance to `c`, a closing brace or the end of the text
    fn skip_to(&mut self, c: u8) {
        while !self.at_end() && self.peek() != c && self.peek() != b'}' {
            self.pos += 1;
        }
    }

    /// Consume `name` when the text continues with it
    fn tag(&mut self, name: &str) -> bool {
        if self.rest().starts_with(name) {
            self.pos += name.len();
            true
        } else {
            false
        }
    }

    fn number(&mut self) -> Option<f64> {
        let (value, len) = strtod(self.rest())?;
        self.pos += len;
        Some(value)
    }

    fn int(&mut self) -> Option<i32> {
        self.number().map(|v| v.round() as i32)
    }

    fn long(&mut self) -> Option<i64> {
        let (value, len) = strtol(self.rest(), 10)?;
        self.pos += len;
        Some(value)
    }

    fn color(&mut self) -> Option<u32> {
        let (color, len) = parse_color(self.rest());
        self.pos += len;
        color
    }
}

/// Parse an `&HAABBGGRR&` color.
///
/// Returns the color as `0xRRGGBBAA` (or `None` when no hex digits were
/// found) together with the number of bytes consumed. The ampersands and
/// the `H` prefix are consumed even when the digits are missing.
pub fn parse_color(s: &str) -> (Option<u32>, usize) {
    let bytes = s.as_bytes();
    let mut pos = 0;
    if bytes.first() == Some(&b'&') {
        pos += 1;
    }
    if matches!(bytes.get(pos), Some(b'H' | b'h')) {
        pos += 1;
    }
    let value = match strtol(&s[pos..], 16) {
        Some((value, len)) => {
            pos += len;
            Some((value as u32).swap_bytes())
        }
        None => None,
    };
    if bytes.get(pos) == Some(&b'&') {
        pos += 1;
    }
    (value, pos)
}

/// Parse an `&HAA&` alpha value, returning its low byte
pub fn parse_alpha(s: &str) -> Option<u8> {
    // the byte swap moves the written low byte into the top byte
    parse_color(s).0.map(|color| (color >> 24) as u8)
}

/// Piecewise-linear fade between three alpha levels over `t1..t4`
pub fn interpolate_alpha(now: i64, t1: i64, t2: i64, t3: i64, t4: i64, a1: i64, a2: i64, a3: i64) -> u32 {
    let mix = |from: i64, to: i64, k: f64| (from as f64 * (1.0 - k) + to as f64 * k) as i64;
    let alpha = if now <= t1 {
        a1
    } else if now >= t4 {
        a3
    } else if now < t2 {
        mix(a1, a2, (now - t1) as f64 / (t2 - t1) as f64)
    } else if now > t3 {
        mix(a2, a3, (now - t3) as f64 / (t4 - t3) as f64)
    } else {
        a2
    };
    alpha.clamp(0, 255) as u32
}

/// Parse one override tag starting at `pos` and apply it with weight `pwr`.
///
/// Returns the position after the tag. `nested` is set while inside `\t`.
pub fn parse_tag(
    state: &mut RenderState,
    ctx: &TagContext<'_>,
    text: &str,
    pos: usize,
    pwr: f64,
    nested: bool,
) -> usize {
    let mut cur = Cursor::new(text, pos);
    cur.skip_to(b'\\');
    if !cur.eat(b'\\') {
        return cur.pos;
    }
    if cur.peek() == b'}' || cur.at_end() {
        return cur.pos;
    }
    // `None` means an argument delimiter was missing; the tag is dropped
    // at that point and scanning resumes from the cursor
    let _ = apply_tag(state, ctx, &mut cur, pwr, nested);
    cur.pos
}

fn apply_tag(
    state: &mut RenderState,
    ctx: &TagContext<'_>,
    cur: &mut Cursor<'_>,
    pwr: f64,
    nested: bool,
) -> Option<()> {
    let style = state.current_style(ctx)?;

    if cur.tag("xbord") {
        let val = cur.number().map_or(-1.0, |v| lerp(state.border_x, v, pwr).max(0.0));
        state.change_border(ctx, val, state.border_y);
    } else if cur.tag("ybord") {
        let val = cur.number().map_or(-1.0, |v| lerp(state.border_y, v, pwr).max(0.0));
        state.change_border(ctx, state.border_x, val);
    } else if cur.tag("xshad") {
        state.shadow_x = cur.number().map_or(0.0, |v| lerp(state.shadow_x, v, pwr));
    } else if cur.tag("yshad") {
        state.shadow_y = cur.number().map_or(0.0, |v| lerp(state.shadow_y, v, pwr));
    } else if cur.tag("fax") {
        state.fax = cur.number().map_or(0.0, |v| lerp(state.fax, v, pwr));
    } else if cur.tag("fay") {
        state.fay = cur.number().map_or(0.0, |v| lerp(state.fay, v, pwr));
    } else if cur.tag("iclip") {
        let start = cur.pos;
        match parse_clip_rect(cur) {
            Some(rect) => {
                blend_clip(state, rect, pwr);
                state.clip_mode = ClipMode::Inverse;
            }
            None if state.clip_drawing.is_none() => {
                cur.pos = start;
                parse_vector_clip(state, ctx, cur, true);
            }
            None => state.clip_mode = ClipMode::Normal,
        }
    } else if cur.tag("blur") {
        state.blur = cur
            .number()
            .map_or(0.0, |v| lerp(state.blur, v, pwr).clamp(0.0, MAX_BLUR));
    } else if cur.tag("fscx") {
        state.scale_x = cur
            .number()
            .map_or(style.scale_x, |v| lerp(state.scale_x, v / 100.0, pwr));
    } else if cur.tag("fscy") {
        state.scale_y = cur
            .number()
            .map_or(style.scale_y, |v| lerp(state.scale_y, v / 100.0, pwr));
    } else if cur.tag("fsp") {
        state.hspacing = cur
            .number()
            .map_or(style.spacing, |v| lerp(state.hspacing, v, pwr));
    } else if cur.tag("fs") {
        let size = match cur.number() {
            Some(v) if v > 0.0 => lerp(state.font_size, v, pwr),
            _ => style.font_size,
        };
        if size != state.font_size {
            state.font_size = size;
            state.font_dirty = true;
        }
    } else if cur.tag("bord") {
        let (x, y) = match cur.number() {
            Some(v) if state.border_x == state.border_y => {
                let v = lerp(state.border_x, v, pwr).max(0.0);
                (v, v)
            }
            Some(v) => (v.max(0.0), v.max(0.0)),
            None => (-1.0, -1.0),
        };
        state.change_border(ctx, x, y);
    } else if cur.tag("move") {
        parse_move(state, ctx, cur)?;
    } else if cur.tag("frx") {
        state.frx = cur.number().map_or(0.0, |v| lerp(state.frx, v.to_radians(), pwr));
    } else if cur.tag("fry") {
        state.fry = cur.number().map_or(0.0, |v| lerp(state.fry, v.to_radians(), pwr));
    } else if cur.tag("frz") || cur.tag("fr") {
        state.frz = cur
            .number()
            .map_or(style.angle.to_radians(), |v| lerp(state.frz, v.to_radians(), pwr));
    } else if cur.tag("fn") {
        let start = cur.pos;
        cur.skip_to(b'\\');
        let family = cur.text[start..cur.pos].trim();
        state.family = if family.is_empty() || family == "0" {
            style.font_name.clone()
        } else {
            family.to_string()
        };
        state.font_dirty = true;
    } else if cur.tag("alpha") {
        match cur.color() {
            Some(val) => {
                let alpha = val >> 24;
                for c in state.c.iter_mut() {
                    change_alpha(c, alpha, pwr);
                }
            }
            None => {
                let defaults = [
                    style.primary_colour,
                    style.secondary_colour,
                    style.outline_colour,
                    style.back_colour,
                ];
                for (c, default) in state.c.iter_mut().zip(defaults) {
                    change_alpha(c, default, pwr);
                }
            }
        }
    } else if cur.tag("an") {
        state.alignment = cur
            .int()
            .and_then(Alignment::from_numpad)
            .unwrap_or(style.alignment);
    } else if cur.tag("a") {
        state.alignment = cur
            .int()
            .and_then(Alignment::from_legacy)
            .unwrap_or(style.alignment);
    } else if cur.tag("pos") {
        if !cur.eat(b'(') {
            return None;
        }
        let x = cur.number().unwrap_or(0.0);
        if !cur.eat(b',') {
            return None;
        }
        let y = cur.number().unwrap_or(0.0);
        if !cur.eat(b')') {
            return None;
        }
        if state.evt_type == EventType::Positioned {
            trace!("ignoring repeated \\pos");
        } else {
            state.evt_type = EventType::Positioned;
            state.detect_collisions = false;
            state.pos = DVector::new(x, y);
        }
    } else if cur.tag("fad") {
        cur.eat(b'e');
        parse_fade(state, ctx, cur)?;
    } else if cur.tag("org") {
        if !cur.eat(b'(') {
            return None;
        }
        let x = cur.int().unwrap_or(0);
        if !cur.eat(b',') {
            return None;
        }
        let y = cur.int().unwrap_or(0);
        if !cur.eat(b')') {
            return None;
        }
        if !state.have_origin {
            state.org = DVector::new(f64::from(x), f64::from(y));
            state.have_origin = true;
            state.detect_collisions = false;
        }
    } else if cur.tag("t") {
        parse_transition(state, ctx, cur, pwr, nested)?;
    } else if cur.tag("clip") {
        let start = cur.pos;
        match parse_clip_rect(cur) {
            Some(rect) => {
                blend_clip(state, rect, pwr);
                state.clip_mode = ClipMode::Normal;
            }
            None if state.clip_drawing.is_none() => {
                cur.pos = start;
                parse_vector_clip(state, ctx, cur, false);
            }
            None => {
                let (w, h) = ctx.play_res;
                state.clip = DBBox::new(0.0, 0.0, f64::from(w), f64::from(h));
            }
        }
    } else if cur.tag("c") {
        let val = cur.color().unwrap_or(style.primary_colour);
        change_color(&mut state.c[0], val, pwr);
    } else if matches!(cur.peek(), b'1'..=b'4')
        && matches!(cur.text.as_bytes().get(cur.pos + 1), Some(b'c' | b'a'))
    {
        let index = usize::from(cur.peek() - b'1');
        let cmd = cur.text.as_bytes()[cur.pos + 1];
        cur.pos += 2;
        let default = [
            style.primary_colour,
            style.secondary_colour,
            style.outline_colour,
            style.back_colour,
        ][index];
        let parsed = cur.color();
        if cmd == b'c' {
            change_color(&mut state.c[index], parsed.unwrap_or(default), pwr);
        } else {
            change_alpha(&mut state.c[index], parsed.map_or(default, |v| v >> 24), pwr);
        }
    } else if cur.tag("r") {
        let start = cur.pos;
        cur.skip_to(b'\\');
        let name = cur.text[start..cur.pos].trim();
        let event_style = ctx.event.style.min(ctx.track.styles.len().saturating_sub(1));
        state.style = if name.is_empty() {
            event_style
        } else {
            ctx.track.style_by_name(name).unwrap_or_else(|| {
                debug!("\\r: unknown style {name:?}, using the event style");
                event_style
            })
        };
        state.reset(ctx);
    } else if cur.tag("be") {
        state.be = cur.number().map_or(0, |v| {
            (lerp(f64::from(state.be), v, pwr).round() as i32).clamp(0, MAX_BE)
        });
    } else if cur.tag("b") {
        match cur.int() {
            Some(b) if pwr >= 0.5 => state.bold = b,
            Some(_) => {}
            None => state.bold = style.bold,
        }
        state.font_dirty = true;
    } else if cur.tag("i") {
        match cur.int() {
            Some(i) if pwr >= 0.5 => state.italic = i,
            Some(_) => {}
            None => state.italic = style.italic,
        }
        state.font_dirty = true;
    } else if cur.tag("kf") || cur.tag("K") {
        start_karaoke(state, cur, Karaoke::Fill);
    } else if cur.tag("ko") {
        start_karaoke(state, cur, Karaoke::Outline);
    } else if cur.tag("k") {
        start_karaoke(state, cur, Karaoke::Instant);
    } else if cur.tag("shad") {
        let val = match cur.number() {
            Some(v) if state.shadow_x == state.shadow_y => lerp(state.shadow_x, v, pwr),
            Some(v) => v,
            None => 0.0,
        }
        .max(0.0);
        state.shadow_x = val;
        state.shadow_y = val;
    } else if cur.tag("s") {
        state.flags.strike_out = cur.int().is_some_and(|v| v != 0);
        state.font_dirty = true;
    } else if cur.tag("u") {
        state.flags.underline = cur.int().is_some_and(|v| v != 0);
        state.font_dirty = true;
    } else if cur.tag("pbo") {
        state.pbo = cur.number().unwrap_or(0.0);
    } else if cur.tag("p") {
        let val = cur.int().unwrap_or(0).max(0);
        if val != 0 {
            state.drawing_scale = val;
        }
        state.drawing_mode = val != 0;
    } else if cur.tag("q") {
        state.wrap_style = cur
            .int()
            .map_or(ctx.track.wrap_style, WrapStyle::from_value);
    }
    Some(())
}

/// Four clip coordinates, each separated by an optional comma
fn parse_clip_rect(cur: &mut Cursor<'_>) -> Option<[f64; 4]> {
    cur.eat(b'(');
    let mut rect = [0.0; 4];
    let mut ok = true;
    for (i, value) in rect.iter_mut().enumerate() {
        match cur.int() {
            Some(v) => *value = f64::from(v),
            None => ok = false,
        }
        if i < 3 {
            cur.eat(b',');
        }
    }
    cur.eat(b')');
    ok.then_some(rect)
}

fn blend_clip(state: &mut RenderState, [x0, y0, x1, y1]: [f64; 4], pwr: f64) {
    state.clip.x_min = lerp(state.clip.x_min, x0, pwr);
    state.clip.y_min = lerp(state.clip.y_min, y0, pwr);
    state.clip.x_max = lerp(state.clip.x_max, x1, pwr);
    state.clip.y_max = lerp(state.clip.y_max, y1, pwr);
}

/// `\clip([scale,]path)`: the path is kept in script coordinates and
/// rasterized later as a mask
fn parse_vector_clip(state: &mut RenderState, ctx: &TagContext<'_>, cur: &mut Cursor<'_>, inverse: bool) {
    cur.eat(b'(');
    let scale = cur.int().unwrap_or(1);
    cur.eat(b',');
    let start = cur.pos;
    while !cur.at_end() && cur.peek() != b')' && cur.peek() != b'}' {
        cur.pos += 1;
    }
    let path = &cur.text[start..cur.pos];
    cur.eat(b')');

    let mut drawing = Drawing::from_text(path, scale);
    drawing.scale_x = ctx.font_scale_x * ctx.font_scale;
    drawing.scale_y = ctx.font_scale;
    trace!("vector clip {path:?} (inverse: {inverse})");
    state.clip_drawing = Some(VectorClip {
        drawing: Arc::new(drawing),
        inverse,
    });
}

fn parse_move(state: &mut RenderState, ctx: &TagContext<'_>, cur: &mut Cursor<'_>) -> Option<()> {
    if !cur.eat(b'(') {
        return None;
    }
    let x1 = cur.number().unwrap_or(0.0);
    if !cur.eat(b',') {
        return None;
    }
    let y1 = cur.number().unwrap_or(0.0);
    if !cur.eat(b',') {
        return None;
    }
    let x2 = cur.number().unwrap_or(0.0);
    if !cur.eat(b',') {
        return None;
    }
    let y2 = cur.number().unwrap_or(0.0);
    let (t1, t2) = if cur.eat(b',') {
        let t1 = cur.long().unwrap_or(0);
        if !cur.eat(b',') {
            return None;
        }
        (t1, cur.long().unwrap_or(0))
    } else {
        (0, ctx.event.duration)
    };
    if !cur.eat(b')') {
        return None;
    }

    let t = ctx.event_time();
    let k = if t < t1 {
        0.0
    } else if t > t2 || t2 <= t1 {
        1.0
    } else {
        (t - t1) as f64 / (t2 - t1) as f64
    };
    if state.evt_type != EventType::Positioned {
        state.evt_type = EventType::Positioned;
        state.detect_collisions = false;
        state.pos = DVector::new(lerp(x1, x2, k), lerp(y1, y2, k));
    }
    Some(())
}

fn parse_fade(state: &mut RenderState, ctx: &TagContext<'_>, cur: &mut Cursor<'_>) -> Option<()> {
    if !cur.eat(b'(') {
        return None;
    }
    let a1 = cur.long().unwrap_or(0);
    if !cur.eat(b',') {
        return None;
    }
    let a2 = cur.long().unwrap_or(0);
    let (t1, t2, t3, t4, a1, a2, a3) = if cur.peek() == b')' {
        // two arguments: fade-in and fade-out durations
        let t4 = ctx.event.duration;
        (0, a1, t4 - a2, t4, 0xFF, 0, 0xFF)
    } else {
        let mut rest = [0i64; 5];
        for value in rest.iter_mut() {
            if !cur.eat(b',') {
                return None;
            }
            *value = cur.long().unwrap_or(0);
        }
        let [a3, t1, t2, t3, t4] = rest;
        (t1, t2, t3, t4, a1, a2, a3)
    };
    if !cur.eat(b')') {
        return None;
    }
    state.fade = interpolate_alpha(ctx.event_time(), t1, t2, t3, t4, a1, a2, a3);
    Some(())
}

/// `\t([t1,t2,][accel,]tags)`
fn parse_transition(
    state: &mut RenderState,
    ctx: &TagContext<'_>,
    cur: &mut Cursor<'_>,
    pwr: f64,
    nested: bool,
) -> Option<()> {
    if !cur.eat(b'(') {
        return None;
    }
    let mut values = [0.0; 3];
    let mut count = 0;
    while count < 3 {
        if cur.peek() == b'\\' {
            break;
        }
        values[count] = cur.number().unwrap_or(0.0);
        count += 1;
        if !cur.eat(b',') {
            return None;
        }
    }
    let (t1, mut t2, accel) = match count {
        3 => (values[0], values[1], values[2]),
        2 => (values[0], values[1], 1.0),
        1 => (0.0, 0.0, values[0]),
        _ => (0.0, 0.0, 1.0),
    };
    state.detect_collisions = false;
    if t2 == 0.0 {
        t2 = ctx.event.duration as f64;
    }
    let t = ctx.event_time() as f64;
    let k = if nested {
        // a `\t` inside a `\t` keeps the enclosing weight
        pwr
    } else if t <= t1 {
        0.0
    } else if t >= t2 {
        1.0
    } else {
        ((t - t1) / (t2 - t1)).powf(accel.max(0.0))
    };
    while cur.peek() == b'\\' {
        let next = parse_tag(state, ctx, cur.text, cur.pos, k, true);
        if next == cur.pos {
            break;
        }
        cur.pos = next;
    }
    cur.skip_to(b')');
    if !cur.eat(b')') {
        return None;
    }
    Some(())
}

fn start_karaoke(state: &mut RenderState, cur: &mut Cursor<'_>, effect: Karaoke) {
    let val = cur.int().unwrap_or(100);
    state.effect_type = effect;
    if state.effect_timing != 0 {
        state.effect_skip_timing += state.effect_timing;
    }
    state.effect_timing = i64::from(val) * 10;
}

/// Apply the override blocks starting at `*pos` and move past them
pub fn apply_overrides(state: &mut RenderState, ctx: &TagContext<'_>, text: &str, pos: &mut usize) {
    let bytes = text.as_bytes();
    if bytes.get(*pos) == Some(&b'{') {
        *pos += 1;
        loop {
            let next = parse_tag(state, ctx, text, *pos, 1.0, false);
            *pos = if next == *pos && next < text.len() && bytes[next] != b'}' && bytes[next] != b'\\' {
                next + text.get(next..).and_then(|r| r.chars().next()).map_or(1, char::len_utf8)
            } else {
                next
            };
            match bytes.get(*pos) {
                Some(b'}') => {
                    *pos += 1;
                    if bytes.get(*pos) == Some(&b'{') {
                        *pos += 1;
                        continue;
                    }
                    break;
                }
                Some(b'\\') => {}
                Some(_) => trace!("unable to parse override at byte {}", *pos),
                None => break,
            }
        }
    }
}

/// Next character of the event text at `*pos`, applying any override
/// blocks that precede it. Returns `None` at the end of the text.
///
/// A tab reads as a space, `\N` as a hard break, `\n` as a hard break under
/// [`WrapStyle::None`] and a space otherwise, `\h` as a space.
pub fn next_char(state: &mut RenderState, ctx: &TagContext<'_>, text: &str, pos: &mut usize) -> Option<char> {
    apply_overrides(state, ctx, text, pos);
    let rest = text.get(*pos..)?;
    let mut chars = rest.chars();
    let ch = chars.next()?;
    if ch == '\t' {
        *pos += 1;
        return Some(' ');
    }
    if ch == '\\' {
        match rest.as_bytes().get(1) {
            Some(b'N') => {
                *pos += 2;
                return Some('\n');
            }
            Some(b'n') => {
                *pos += 2;
                return Some(if state.wrap_style == WrapStyle::None { '\n' } else { ' ' });
            }
            Some(b'h') => {
                *pos += 2;
                return Some(' ');
            }
            _ => {}
        }
    }
    *pos += ch.len_utf8();
    Some(ch)
}
