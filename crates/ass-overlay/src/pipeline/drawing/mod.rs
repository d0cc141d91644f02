//! Drawing command processing module
//!
//! Parses the `\p` vector language (`m n l b q s p c` opcodes) into a 26.6
//! outline. Coordinates are script units scaled by `2^(1-p)` and the
//! drawing's own scale factors.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::pipeline::scan::strtod;
use crate::raster::outline::{Outline, PointTag};
use crate::utils::math::{double_to_d6, DVector, Vector};
use crate::utils::RenderError;

/// Drawing token types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawCommand {
    /// Move to position, closing the current contour (m command)
    MoveTo,
    /// Move without closing (n command)
    MoveToNoClose,
    /// Line to position (l command)
    LineTo,
    /// Cubic Bezier curve, three points (b command)
    BezierTo,
    /// Quadratic curve, two points (q command)
    ConicTo,
    /// Uniform B-spline (s command, p extends it)
    Spline,
}

/// One command applied to one point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawToken {
    /// Command this point belongs to
    pub command: DrawCommand,
    /// Point in script units
    pub point: DVector,
}

/// Tokenize drawing text, one token per coordinate pair.
///
/// A coordinate pair is attached to the most recent command letter. `c`
/// closes an open B-spline by repeating its first three points.
pub fn tokenize_drawing_commands(text: &str) -> Vec<DrawToken> {
    let mut tokens: Vec<DrawToken> = Vec::new();
    let mut command: Option<DrawCommand> = None;
    let mut point = DVector::default();
    let mut is_set = 0;
    let mut spline_start: Option<usize> = None;
    let bytes = text.as_bytes();
    let mut p = 0;

    while p < bytes.len() {
        let ch = bytes[p];
        if ch == b'c' && spline_start.is_some() {
            if let Some(start) = spline_start.take() {
                if is_spline_run(&tokens, start + 1, 2) {
                    for k in 0..3 {
                        let point = tokens[start + k].point;
                        tokens.push(DrawToken {
                            command: DrawCommand::Spline,
                            point,
                        });
                    }
                }
            }
        } else if is_set == 0 {
            if let Some((value, used)) = strtod(&text[p..]) {
                point.x = value;
                is_set = 1;
                p += used;
                continue;
            }
        } else if is_set == 1 {
            if let Some((value, used)) = strtod(&text[p..]) {
                point.y = value;
                is_set = 2;
                p += used;
                push_token(&mut tokens, &mut command, &mut spline_start, &mut is_set, point);
                continue;
            }
        }

        if let Some(next) = is_command(ch) {
            command = Some(next);
        }
        push_token(&mut tokens, &mut command, &mut spline_start, &mut is_set, point);
        p += 1;
    }
    tokens
}

fn push_token(
    tokens: &mut Vec<DrawToken>,
    command: &mut Option<DrawCommand>,
    spline_start: &mut Option<usize>,
    is_set: &mut i32,
    point: DVector,
) {
    let Some(cmd) = *command else { return };
    if *is_set != 2 {
        return;
    }
    tokens.push(DrawToken {
        command: cmd,
        point,
    });
    if cmd == DrawCommand::Spline && spline_start.is_none() && tokens.len() >= 2 {
        *spline_start = Some(tokens.len() - 2);
    }
    *is_set = 0;
}

/// Map a command letter to its command; `p` (extend spline) is accepted
/// but does not change the current command
fn is_command(ch: u8) -> Option<DrawCommand> {
    match ch {
        b'm' => Some(DrawCommand::MoveTo),
        b'n' => Some(DrawCommand::MoveToNoClose),
        b'l' => Some(DrawCommand::LineTo),
        b'b' => Some(DrawCommand::BezierTo),
        b'q' => Some(DrawCommand::ConicTo),
        b's' => Some(DrawCommand::Spline),
        _ => None,
    }
}

fn is_spline_run(tokens: &[DrawToken], from: usize, count: usize) -> bool {
    has_run(tokens, from, count, DrawCommand::Spline)
}

fn has_run(tokens: &[DrawToken], from: usize, count: usize, command: DrawCommand) -> bool {
    from + count <= tokens.len() && tokens[from..from + count].iter().all(|t| t.command == command)
}

/// Convert four consecutive control points into one cubic segment.
///
/// For B-splines the uniform basis is converted to Bezier control points;
/// Bezier input passes through unchanged.
pub fn spline_to_bezier(p: [Vector; 4], spline: bool) -> [Vector; 4] {
    if !spline {
        return p;
    }
    let f = |a: i32, b: i32, c: i32| -> i32 {
        ((f64::from(a) + 4.0 * f64::from(b) + f64::from(c)) / 6.0).round() as i32
    };
    let third = |a: i32, b: i32| -> i32 { ((2.0 * f64::from(a) + f64::from(b)) / 3.0).round() as i32 };
    [
        Vector::new(f(p[0].x, p[1].x, p[2].x), f(p[0].y, p[1].y, p[2].y)),
        Vector::new(third(p[1].x, p[2].x), third(p[1].y, p[2].y)),
        Vector::new(third(p[2].x, p[1].x), third(p[2].y, p[1].y)),
        Vector::new(f(p[1].x, p[2].x, p[3].x), f(p[1].y, p[2].y, p[3].y)),
    ]
}

/// Outline produced from a drawing together with its metrics (26.6)
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingOutline {
    /// Shape
    pub outline: Outline,
    /// Horizontal advance (width of the control box)
    pub advance: i32,
    /// Ascender
    pub asc: i32,
    /// Descender
    pub desc: i32,
}

/// Drawing text accumulated from an event together with its scale
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    text: String,
    /// `\p` level, coordinates are divided by `2^(scale-1)`
    pub scale: i32,
    /// Horizontal scale applied on top
    pub scale_x: f64,
    /// Vertical scale applied on top
    pub scale_y: f64,
    /// Baseline offset (`\pbo`) in script units
    pub pbo: f64,
}

impl Drawing {
    /// Create an empty drawing at the given `\p` level
    pub fn new(scale: i32) -> Self {
        Self {
            text: String::new(),
            scale: scale.max(1),
            scale_x: 1.0,
            scale_y: 1.0,
            pbo: 0.0,
        }
    }

    /// Create a drawing from complete text
    pub fn from_text(text: &str, scale: i32) -> Self {
        let mut drawing = Self::new(scale);
        drawing.text.push_str(text);
        drawing
    }

    /// Append one character of drawing text
    pub fn push(&mut self, ch: char) {
        self.text.push(ch);
    }

    /// Drawing text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether no text was collected
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Content identity of the drawing text
    pub fn key(&self) -> DrawingKey {
        DrawingKey::new(&self.text)
    }

    fn point_scale(&self) -> (f64, f64) {
        let unit = 64.0 / f64::from(1u32 << (self.scale - 1).clamp(0, 30));
        (self.scale_x * unit, self.scale_y * unit)
    }

    /// Build the outline. Glyph drawings are lifted onto the baseline;
    /// `raw` keeps script coordinates (used by vector clips).
    pub fn build(&self, raw: bool) -> Result<DrawingOutline, RenderError> {
        let tokens = tokenize_drawing_commands(&self.text);
        if tokens.is_empty() {
            return Err(RenderError::DrawingError(format!(
                "no drawable commands in {:?}",
                self.text
            )));
        }
        let (sx, sy) = self.point_scale();
        let pts: Vec<Vector> = tokens
            .iter()
            .map(|t| Vector::new((t.point.x * sx) as i32, (-t.point.y * sy) as i32))
            .collect();

        let mut outline = Outline::new();
        let mut pen = Vector::default();
        let mut started = false;
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i].command {
                DrawCommand::MoveTo => {
                    pen = pts[i];
                    if started {
                        outline.close_contour();
                        started = false;
                    }
                    i += 1;
                }
                DrawCommand::MoveToNoClose => {
                    pen = pts[i];
                    i += 1;
                }
                DrawCommand::LineTo => {
                    if !started {
                        outline.add_point(pen, PointTag::On);
                    }
                    outline.add_point(pts[i], PointTag::On);
                    started = true;
                    i += 1;
                }
                DrawCommand::BezierTo if i > 0 && has_run(&tokens, i, 3, DrawCommand::BezierTo) => {
                    add_curve(&mut outline, [pts[i - 1], pts[i], pts[i + 1], pts[i + 2]], false, started);
                    started = true;
                    i += 3;
                }
                DrawCommand::ConicTo if i > 0 && has_run(&tokens, i, 2, DrawCommand::ConicTo) => {
                    if !started {
                        outline.add_point(pts[i - 1], PointTag::On);
                    }
                    outline.add_point(pts[i], PointTag::Conic);
                    outline.add_point(pts[i + 1], PointTag::On);
                    started = true;
                    i += 2;
                }
                DrawCommand::Spline if i > 0 && has_run(&tokens, i, 3, DrawCommand::Spline) => {
                    add_curve(&mut outline, [pts[i - 1], pts[i], pts[i + 1], pts[i + 2]], true, started);
                    started = true;
                    i += 1;
                }
                _ => i += 1,
            }
        }
        outline.close_contour();

        if raw {
            return Ok(DrawingOutline {
                outline,
                advance: 0,
                asc: 0,
                desc: 0,
            });
        }

        let cbox = outline.cbox();
        let desc = double_to_d6(-self.pbo * self.scale_y);
        let asc = cbox.height() + desc;
        outline.translate(0, asc);
        Ok(DrawingOutline {
            outline,
            advance: cbox.width(),
            asc,
            desc,
        })
    }
}

fn add_curve(outline: &mut Outline, points: [Vector; 4], spline: bool, started: bool) {
    let p = spline_to_bezier(points, spline);
    if !started {
        outline.add_point(p[0], PointTag::On);
    }
    outline.add_point(p[1], PointTag::Cubic);
    outline.add_point(p[2], PointTag::Cubic);
    outline.add_point(p[3], PointTag::On);
}

/// Hashable identity of drawing text; equality compares the text itself
#[derive(Debug, Clone)]
pub struct DrawingKey {
    hash: u64,
    text: Arc<str>,
}

impl DrawingKey {
    /// Create a key for the given text
    pub fn new(text: &str) -> Self {
        let mut hasher = ahash::AHasher::default();
        text.hash(&mut hasher);
        Self {
            hash: hasher.finish(),
            text: Arc::from(text),
        }
    }
}

impl PartialEq for DrawingKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.text == other.text
    }
}

impl Eq for DrawingKey {}

impl Hash for DrawingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}
