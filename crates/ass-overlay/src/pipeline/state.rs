//! Per-event render state mutated by override tags

use std::sync::Arc;

use crate::pipeline::drawing::Drawing;
use crate::track::{Alignment, BorderStyle, Event, Style, Track, WrapStyle};
use crate::utils::math::{DBBox, DVector};

/// How an event is placed on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventType {
    /// Placed by alignment and margins
    #[default]
    Normal,
    /// Horizontal banner scroll
    HScroll,
    /// Vertical scroll
    VScroll,
    /// Placed by `\pos` or `\move`
    Positioned,
}

/// Scroll direction for transition effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollDirection {
    /// Banner moving right
    #[default]
    LeftToRight,
    /// Banner moving left
    RightToLeft,
    /// Text moving down
    TopToBottom,
    /// Text moving up
    BottomToTop,
}

/// Karaoke effect of a syllable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Karaoke {
    /// No karaoke
    #[default]
    None,
    /// `\k`: switch from secondary to primary color at the start time
    Instant,
    /// `\kf` / `\K`: sweep the fill from left to right
    Fill,
    /// `\ko`: like `\k` but the border appears only when reached
    Outline,
}

/// Rectangle clip mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipMode {
    /// Keep what lies inside the rectangle
    #[default]
    Normal,
    /// Keep what lies outside the rectangle
    Inverse,
}

/// Vector clip mask
#[derive(Debug, Clone, PartialEq)]
pub struct VectorClip {
    /// Mask shape in script coordinates
    pub drawing: Arc<Drawing>,
    /// Subtract the mask instead of multiplying by it
    pub inverse: bool,
}

/// Text decorations forwarded to the glyph provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decoration {
    /// Underline
    pub underline: bool,
    /// Strike-out
    pub strike_out: bool,
}

/// Inputs the tag parser reads but never changes
#[derive(Debug, Clone, Copy)]
pub struct TagContext<'a> {
    /// Track being rendered
    pub track: &'a Track,
    /// Event being rendered
    pub event: &'a Event,
    /// Frame timestamp in milliseconds
    pub now: i64,
    /// Effective script resolution
    pub play_res: (i32, i32),
    /// Script-to-pixel font scale
    pub font_scale: f64,
    /// Horizontal stretch from aspect correction
    pub font_scale_x: f64,
}

impl<'a> TagContext<'a> {
    /// Event time relative to the event start
    pub fn event_time(&self) -> i64 {
        self.now - self.event.start
    }
}

/// Style context of the event being rendered
#[derive(Debug, Clone)]
pub struct RenderState {
    /// Index of the style in effect (changed by `\r<name>`)
    pub style: usize,
    /// Placement class
    pub evt_type: EventType,
    /// Font family
    pub family: String,
    /// Treat the family as a matching pattern
    pub treat_family_as_pattern: bool,
    /// Weight: 0, 1 (bold) or explicit weight
    pub bold: i32,
    /// Italic: 0, 1 or explicit slant
    pub italic: i32,
    /// Font size in script units
    pub font_size: f64,
    /// Set when the font needs to be resolved again
    pub font_dirty: bool,
    /// Decorations
    pub flags: Decoration,
    /// Primary, secondary, outline and back colors (`0xRRGGBBAA`)
    pub c: [u32; 4],
    /// Border width x
    pub border_x: f64,
    /// Border width y
    pub border_y: f64,
    /// Border mode
    pub border_style: BorderStyle,
    /// Shadow offset x
    pub shadow_x: f64,
    /// Shadow offset y
    pub shadow_y: f64,
    /// Horizontal scale
    pub scale_x: f64,
    /// Vertical scale
    pub scale_y: f64,
    /// Extra letter spacing in script units
    pub hspacing: f64,
    /// Box blur passes
    pub be: i32,
    /// Gaussian blur radius
    pub blur: f64,
    /// X rotation in radians
    pub frx: f64,
    /// Y rotation in radians
    pub fry: f64,
    /// Z rotation in radians
    pub frz: f64,
    /// Horizontal shear
    pub fax: f64,
    /// Vertical shear
    pub fay: f64,
    /// Alignment
    pub alignment: Alignment,
    /// Wrapping mode
    pub wrap_style: WrapStyle,
    /// Explicit position in script units
    pub pos: DVector,
    /// Rotation origin in script units
    pub org: DVector,
    /// Whether `\org` was given
    pub have_origin: bool,
    /// Scroll direction of transition effects
    pub scroll_direction: ScrollDirection,
    /// Scroll distance in script units
    pub scroll_shift: f64,
    /// Vertical scroll band top
    pub clip_y0: f64,
    /// Vertical scroll band bottom
    pub clip_y1: f64,
    /// Clip rectangle in script units
    pub clip: DBBox,
    /// Rectangle clip mode
    pub clip_mode: ClipMode,
    /// Vector clip, if any
    pub clip_drawing: Option<VectorClip>,
    /// Whether collision detection applies to this event
    pub detect_collisions: bool,
    /// Fade transparency multiplied into every color
    pub fade: u32,
    /// Whether text is collected as a drawing (`\p` non-zero)
    pub drawing_mode: bool,
    /// Last non-zero `\p` level
    pub drawing_scale: i32,
    /// `\pbo` baseline offset
    pub pbo: f64,
    /// Karaoke effect of the current syllable
    pub effect_type: Karaoke,
    /// Duration of the current syllable in milliseconds
    pub effect_timing: i64,
    /// Accumulated duration of earlier syllables
    pub effect_skip_timing: i64,
}

impl RenderState {
    /// Full initialization for an event: style fields plus placement,
    /// clip and karaoke state, then the event's transition effect
    pub fn new(ctx: &TagContext<'_>) -> Self {
        let style_index = ctx.event.style.min(ctx.track.styles.len().saturating_sub(1));
        let (play_res_x, play_res_y) = ctx.play_res;
        let mut state = Self {
            style: style_index,
            evt_type: EventType::Normal,
            family: String::new(),
            treat_family_as_pattern: false,
            bold: 0,
            italic: 0,
            font_size: 0.0,
            font_dirty: true,
            flags: Decoration::default(),
            c: [0; 4],
            border_x: 0.0,
            border_y: 0.0,
            border_style: BorderStyle::Outline,
            shadow_x: 0.0,
            shadow_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            hspacing: 0.0,
            be: 0,
            blur: 0.0,
            frx: 0.0,
            fry: 0.0,
            frz: 0.0,
            fax: 0.0,
            fay: 0.0,
            alignment: Alignment::default(),
            wrap_style: ctx.track.wrap_style,
            pos: DVector::default(),
            org: DVector::default(),
            have_origin: false,
            scroll_direction: ScrollDirection::default(),
            scroll_shift: 0.0,
            clip_y0: 0.0,
            clip_y1: 0.0,
            clip: DBBox::new(0.0, 0.0, f64::from(play_res_x), f64::from(play_res_y)),
            clip_mode: ClipMode::Normal,
            clip_drawing: None,
            detect_collisions: true,
            fade: 0,
            drawing_mode: false,
            drawing_scale: 1,
            pbo: 0.0,
            effect_type: Karaoke::None,
            effect_timing: 0,
            effect_skip_timing: 0,
        };
        state.reset(ctx);
        if let Some(style) = state.current_style(ctx) {
            state.alignment = style.alignment;
        }
        crate::pipeline::transition::apply_transition_effects(&mut state, ctx);
        state
    }

    /// Style currently in effect
    pub fn current_style<'t>(&self, ctx: &TagContext<'t>) -> Option<&'t Style> {
        ctx.track.styles.get(self.style)
    }

    /// Reinitialize the style-derived fields (`\r`). Position, origin,
    /// clip, fade and karaoke state are left alone.
    pub fn reset(&mut self, ctx: &TagContext<'_>) {
        let Some(style) = self.current_style(ctx) else {
            return;
        };
        self.c = [
            style.primary_colour,
            style.secondary_colour,
            style.outline_colour,
            style.back_colour,
        ];
        self.flags = Decoration {
            underline: style.underline,
            strike_out: style.strike_out,
        };
        self.font_size = style.font_size;
        self.family = style.font_name.clone();
        self.treat_family_as_pattern = style.treat_fontname_as_pattern;
        self.bold = style.bold;
        self.italic = style.italic;
        self.font_dirty = true;

        self.border_style = style.border_style;
        self.border_x = style.outline;
        self.border_y = style.outline;
        self.scale_x = style.scale_x;
        self.scale_y = style.scale_y;
        self.hspacing = style.spacing;
        self.be = 0;
        self.blur = 0.0;
        self.shadow_x = style.shadow;
        self.shadow_y = style.shadow;
        self.frx = 0.0;
        self.fry = 0.0;
        self.frz = style.angle.to_radians();
        self.fax = 0.0;
        self.fay = 0.0;
        self.wrap_style = ctx.track.wrap_style;
    }

    /// Set border widths; negative values restore the style's outline
    pub fn change_border(&mut self, ctx: &TagContext<'_>, border_x: f64, border_y: f64) {
        let outline = self.current_style(ctx).map_or(0.0, |s| s.outline);
        self.border_x = if border_x < 0.0 { outline } else { border_x };
        self.border_y = if border_y < 0.0 { outline } else { border_y };
    }

    /// Font size in pixels, clamped to `1..=2 * frame_height`
    pub fn pixel_font_size(&self, font_scale: f64, frame_height: i32) -> f64 {
        (self.font_size * font_scale).clamp(1.0, f64::from(frame_height.max(1)) * 2.0)
    }
}

/// Blend the RGB part of `new` into `var` with weight `pwr`, keeping alpha
pub fn change_color(var: &mut u32, new: u32, pwr: f64) {
    let blend = |shift: u32| -> u32 {
        let old = f64::from((*var >> shift) & 0xFF);
        let new = f64::from((new >> shift) & 0xFF);
        ((old * (1.0 - pwr) + new * pwr) as u32 & 0xFF) << shift
    };
    *var = blend(24) | blend(16) | blend(8) | (*var & 0xFF);
}

/// Blend the alpha byte of `var` towards `new` with weight `pwr`
pub fn change_alpha(var: &mut u32, new: u32, pwr: f64) {
    let old = f64::from(*var & 0xFF);
    let alpha = (old * (1.0 - pwr) + f64::from(new & 0xFF) * pwr) as u32;
    *var = (*var & 0xFFFF_FF00) | (alpha & 0xFF);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Track {
        let mut track = Track::new(640, 480);
        track.styles.push(Style {
            angle: 90.0,
            outline: 3.0,
            ..Style::default()
        });
        track.events.push(Event::new(0, 1000, "x"));
        track
    }

    fn ctx(track: &Track) -> TagContext<'_> {
        TagContext {
            track,
            event: &track.events[0],
            now: 0,
            play_res: track.play_res(),
            font_scale: 1.0,
            font_scale_x: 1.0,
        }
    }

    #[test]
    fn test_new_state_from_style() {
        let track = track();
        let state = RenderState::new(&ctx(&track));
        assert_eq!(state.border_x, 3.0);
        assert!((state.frz - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert_eq!(state.clip, DBBox::new(0.0, 0.0, 640.0, 480.0));
        assert!(state.detect_collisions);
        assert_eq!(state.c[0], 0xFFFF_FF00);
    }

    #[test]
    fn test_reset_keeps_position() {
        let track = track();
        let ctx = ctx(&track);
        let mut state = RenderState::new(&ctx);
        state.pos = DVector::new(10.0, 20.0);
        state.evt_type = EventType::Positioned;
        state.border_x = 9.0;
        state.reset(&ctx);
        assert_eq!(state.border_x, 3.0);
        assert_eq!(state.pos, DVector::new(10.0, 20.0));
        assert_eq!(state.evt_type, EventType::Positioned);
    }

    #[test]
    fn test_change_color_keeps_alpha() {
        let mut c = 0x0000_0080;
        change_color(&mut c, 0xFF00_0000, 0.5);
        assert_eq!(c, 0x7F00_0080);
    }

    #[test]
    fn test_change_alpha_keeps_color() {
        let mut c = 0x1122_3300;
        change_alpha(&mut c, 0xFF, 1.0);
        assert_eq!(c, 0x1122_33FF);
    }

    #[test]
    fn test_change_border_negative_restores_style() {
        let track = track();
        let ctx = ctx(&track);
        let mut state = RenderState::new(&ctx);
        state.change_border(&ctx, -1.0, 5.0);
        assert_eq!((state.border_x, state.border_y), (3.0, 5.0));
    }
}
