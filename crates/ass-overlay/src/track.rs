//! Script-level data model consumed by the renderer
//!
//! The track is produced by an external script parser and handed to the
//! renderer read-only. The only renderer-owned data inside it is each
//! event's sticky [`Placement`], used by collision resolution.

use std::cell::Cell;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Line wrapping mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WrapStyle {
    /// Smart wrapping, lines evenly balanced (upper line wider)
    #[default]
    Smart,
    /// End-of-line wrapping, no balancing
    EndOfLine,
    /// No word wrapping, `\n` and `\N` both break
    None,
    /// Smart wrapping with the lower line wider
    SmartLower,
}

impl WrapStyle {
    /// Map a numeric `WrapStyle` value, unknown values fall back to smart
    pub fn from_value(value: i32) -> Self {
        match value {
            1 => Self::EndOfLine,
            2 => Self::None,
            3 => Self::SmartLower,
            _ => Self::Smart,
        }
    }
}

/// Border rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BorderStyle {
    /// Stroked outline plus drop shadow
    #[default]
    Outline,
    /// Opaque box behind each glyph
    OpaqueBox,
}

impl BorderStyle {
    /// Map a numeric `BorderStyle` value
    pub fn from_value(value: i32) -> Self {
        if value == 3 {
            Self::OpaqueBox
        } else {
            Self::Outline
        }
    }
}

/// Horizontal alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HAlign {
    /// Left aligned
    Left,
    /// Centered
    Center,
    /// Right aligned
    Right,
}

/// Vertical alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VAlign {
    /// Bottom (subtitle) placement
    Sub,
    /// Top placement
    Top,
    /// Middle placement
    Center,
}

/// Text alignment, stored as horizontal and vertical parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alignment {
    /// Horizontal part
    pub h: HAlign,
    /// Vertical part
    pub v: VAlign,
}

impl Default for Alignment {
    fn default() -> Self {
        Self {
            h: HAlign::Center,
            v: VAlign::Sub,
        }
    }
}

impl Alignment {
    /// Parse numpad alignment (`\an`, ASS `Alignment` field): 1..=9
    pub fn from_numpad(value: i32) -> Option<Self> {
        if !(1..=9).contains(&value) {
            return None;
        }
        let h = match (value - 1) % 3 {
            0 => HAlign::Left,
            1 => HAlign::Center,
            _ => HAlign::Right,
        };
        let v = match (value - 1) / 3 {
            0 => VAlign::Sub,
            1 => VAlign::Center,
            _ => VAlign::Top,
        };
        Some(Self { h, v })
    }

    /// Parse legacy SSA alignment (`\a`): low two bits horizontal,
    /// bit 2 top, bit 3 middle
    pub fn from_legacy(value: i32) -> Option<Self> {
        let h = match value & 3 {
            1 => HAlign::Left,
            2 => HAlign::Center,
            3 => HAlign::Right,
            _ => return None,
        };
        let v = match value & 12 {
            0 => VAlign::Sub,
            4 => VAlign::Top,
            8 => VAlign::Center,
            _ => return None,
        };
        Some(Self { h, v })
    }

    /// Numpad value of this alignment
    pub fn to_numpad(self) -> i32 {
        let h = match self.h {
            HAlign::Left => 1,
            HAlign::Center => 2,
            HAlign::Right => 3,
        };
        let v = match self.v {
            VAlign::Sub => 0,
            VAlign::Center => 3,
            VAlign::Top => 6,
        };
        h + v
    }
}

/// Named style definition
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Style {
    /// Style name
    pub name: String,
    /// Font family (a leading `@` selects vertical layout)
    pub font_name: String,
    /// Font size in script units
    pub font_size: f64,
    /// Primary fill color, `0xRRGGBBAA`, alpha 0 is opaque
    pub primary_colour: u32,
    /// Secondary (karaoke) color
    pub secondary_colour: u32,
    /// Border color
    pub outline_colour: u32,
    /// Shadow color
    pub back_colour: u32,
    /// Bold flag (0, 1 or -1) or explicit weight
    pub bold: i32,
    /// Italic flag
    pub italic: i32,
    /// Underline decoration
    pub underline: bool,
    /// Strike-out decoration
    pub strike_out: bool,
    /// Horizontal scale, 1.0 = 100%
    pub scale_x: f64,
    /// Vertical scale, 1.0 = 100%
    pub scale_y: f64,
    /// Extra letter spacing in script units
    pub spacing: f64,
    /// Z rotation in degrees
    pub angle: f64,
    /// Border mode
    pub border_style: BorderStyle,
    /// Border width
    pub outline: f64,
    /// Shadow depth
    pub shadow: f64,
    /// Alignment
    pub alignment: Alignment,
    /// Left margin
    pub margin_l: i32,
    /// Right margin
    pub margin_r: i32,
    /// Vertical margin
    pub margin_v: i32,
    /// Treat the font name as a matching pattern rather than a family
    pub treat_fontname_as_pattern: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            font_name: "Arial".to_string(),
            font_size: 18.0,
            primary_colour: 0xFFFF_FF00,
            secondary_colour: 0x00FF_FF00,
            outline_colour: 0x0000_0000,
            back_colour: 0x0000_0080,
            bold: 0,
            italic: 0,
            underline: false,
            strike_out: false,
            scale_x: 1.0,
            scale_y: 1.0,
            spacing: 0.0,
            angle: 0.0,
            border_style: BorderStyle::Outline,
            outline: 2.0,
            shadow: 3.0,
            alignment: Alignment::default(),
            margin_l: 20,
            margin_r: 20,
            margin_v: 20,
            treat_fontname_as_pattern: false,
        }
    }
}

/// Renderer-owned sticky placement of an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placement {
    /// Top of the event in frame pixels
    pub top: i32,
    /// Height, 0 when the event is not fixed
    pub height: i32,
    /// Left edge
    pub left: i32,
    /// Width
    pub width: i32,
    /// Render generation the placement belongs to
    pub generation: u64,
}

/// Timed subtitle line
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Start time in milliseconds
    pub start: i64,
    /// Duration in milliseconds
    pub duration: i64,
    /// Position in the source file, ties broken by it
    pub read_order: i32,
    /// Render layer
    pub layer: i32,
    /// Index into [`Track::styles`]
    pub style: usize,
    /// Speaker name
    pub name: String,
    /// Left margin override, 0 uses the style's
    pub margin_l: i32,
    /// Right margin override
    pub margin_r: i32,
    /// Vertical margin override
    pub margin_v: i32,
    /// Transition effect (`Banner;...`, `Scroll up;...`)
    pub effect: String,
    /// Text with override blocks
    pub text: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    placement: Cell<Placement>,
}

impl Default for Event {
    fn default() -> Self {
        Self {
            start: 0,
            duration: 0,
            read_order: 0,
            layer: 0,
            style: 0,
            name: String::new(),
            margin_l: 0,
            margin_r: 0,
            margin_v: 0,
            effect: String::new(),
            text: String::new(),
            placement: Cell::new(Placement::default()),
        }
    }
}

impl Event {
    /// Create an event with the given timing and text
    pub fn new(start: i64, duration: i64, text: impl Into<String>) -> Self {
        Self {
            start,
            duration,
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether the event is visible at `now`
    pub fn is_active(&self, now: i64) -> bool {
        self.start <= now && now < self.start + self.duration
    }

    /// Sticky placement for the given render generation, reset when stale
    pub fn placement(&self, generation: u64) -> Placement {
        let current = self.placement.get();
        if current.generation == generation {
            current
        } else {
            let fresh = Placement {
                generation,
                ..Placement::default()
            };
            self.placement.set(fresh);
            fresh
        }
    }

    /// Store a new sticky placement
    pub fn set_placement(&self, placement: Placement) {
        self.placement.set(placement);
    }
}

/// Subtitle track: styles, events and script-wide settings
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Track {
    /// Script resolution width, 0 when unspecified
    pub play_res_x: i32,
    /// Script resolution height, 0 when unspecified
    pub play_res_y: i32,
    /// Default wrapping mode
    pub wrap_style: WrapStyle,
    /// Scale borders and shadows with the video
    pub scaled_border_and_shadow: bool,
    /// Apply font kerning
    pub kerning: bool,
    /// Styles
    pub styles: Vec<Style>,
    /// Events
    pub events: Vec<Event>,
}

impl Track {
    /// Create an empty track with the given script resolution
    pub fn new(play_res_x: i32, play_res_y: i32) -> Self {
        Self {
            play_res_x,
            play_res_y,
            ..Self::default()
        }
    }

    /// Script resolution with unspecified dimensions derived from the other
    pub fn play_res(&self) -> (i32, i32) {
        match (self.play_res_x > 0, self.play_res_y > 0) {
            (true, true) => (self.play_res_x, self.play_res_y),
            (false, false) => (384, 288),
            (true, false) if self.play_res_x == 1280 => (1280, 1024),
            (true, false) => (self.play_res_x, self.play_res_x * 3 / 4),
            (false, true) if self.play_res_y == 1024 => (1280, 1024),
            (false, true) => (self.play_res_y * 4 / 3, self.play_res_y),
        }
    }

    /// Find a style by name, case-insensitively, preferring the last match
    pub fn style_by_name(&self, name: &str) -> Option<usize> {
        let name = name.trim_start_matches('*');
        self.styles
            .iter()
            .rposition(|style| style.name.eq_ignore_ascii_case(name))
    }
}
