//! Glyph clusters, line wrapping and line metrics
//!
//! Positions are 26.6 with y growing downwards across lines. Outlines
//! attached to clusters stay in font space (y up) until rasterization.

pub mod alignment;
pub mod transform;

use std::sync::Arc;

use smallvec::SmallVec;

use crate::cache::{OutlineEntry, OutlineKey};
use crate::font::{FaceId, FontHandle};
use crate::pipeline::drawing::Drawing;
use crate::pipeline::state::{Decoration, Karaoke};
use crate::raster::GlyphBitmaps;
use crate::track::{BorderStyle, WrapStyle};
use crate::utils::math::{d6_to_double, d6_to_int, double_to_d6, BBox, DBBox, Vector};

pub use alignment::{align_lines, get_base_point};
pub use transform::transform_3d;

/// Initial glyph capacity of a [`TextInfo`]
pub const INITIAL_GLYPHS: usize = 1024;
/// Initial line capacity of a [`TextInfo`]
pub const INITIAL_LINES: usize = 64;

/// Kind of line break starting at a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreak {
    /// Not a line start
    #[default]
    None,
    /// Break inserted by wrapping
    Soft,
    /// Break forced by `\N` or a newline
    Hard,
}

/// One shaped glyph of a cluster
#[derive(Debug, Clone, Default)]
pub struct GlyphPart {
    /// Face the glyph comes from, `None` for drawings and missing glyphs
    pub face: Option<FaceId>,
    /// Glyph index in the face
    pub glyph_index: u32,
    /// Shaping offset from the pen
    pub offset: Vector,
    /// Pen advance of this glyph
    pub advance: Vector,
    /// Position after layout
    pub pos: Vector,
    /// Key of the outline cache entry
    pub outline_key: Option<OutlineKey>,
    /// Outline and border
    pub outline: Option<Arc<OutlineEntry>>,
    /// Rasterized fill, border and shadow
    pub bitmaps: Option<Arc<GlyphBitmaps>>,
}

/// A grapheme cluster with the render state captured when it was read
#[derive(Debug, Clone)]
pub struct GlyphInfo {
    /// Source character (U+FFFC for drawings)
    pub symbol: char,
    /// Excluded from width and painting
    pub skip: bool,
    /// Break before this cluster
    pub linebreak: LineBreak,
    /// Drawing rendered in place of a glyph
    pub drawing: Option<Drawing>,
    /// Font the cluster was read with
    pub font: Option<FontHandle>,
    /// Font size in pixels
    pub font_size: f64,
    /// Shape run this cluster belongs to
    pub shape_run_id: usize,
    /// Bidi embedding level
    pub level: u8,
    /// Advances come from a shaping engine rather than the outlines
    pub shaped: bool,
    /// First glyph of the cluster
    pub glyph: GlyphPart,
    /// Further glyphs produced by shaping
    pub siblings: SmallVec<[GlyphPart; 2]>,
    /// Pen position of the cluster
    pub pos: Vector,
    /// Advance of the whole cluster
    pub cluster_advance: Vector,
    /// Control box of the first glyph
    pub bbox: BBox,
    /// Ascender (26.6)
    pub asc: i32,
    /// Descender (26.6)
    pub desc: i32,
    /// Fill, karaoke, border and shadow colors
    pub c: [u32; 4],
    /// Karaoke effect of the word
    pub effect_type: Karaoke,
    /// Syllable duration in milliseconds
    pub effect_timing: i64,
    /// Accumulated duration of skipped syllables
    pub effect_skip_timing: i64,
    /// Karaoke split in pixels relative to `pos.x`, set by
    /// [`TextInfo::process_karaoke_effects`]
    pub karaoke_split: i32,
    /// Box blur passes
    pub be: i32,
    /// Gaussian blur radius
    pub blur: f64,
    /// Shadow x
    pub shadow_x: f64,
    /// Shadow y
    pub shadow_y: f64,
    /// X rotation
    pub frx: f64,
    /// Y rotation
    pub fry: f64,
    /// Z rotation
    pub frz: f64,
    /// Horizontal shear
    pub fax: f64,
    /// Vertical shear
    pub fay: f64,
    /// Horizontal scale
    pub scale_x: f64,
    /// Vertical scale
    pub scale_y: f64,
    /// Border x in pixels
    pub border_x: f64,
    /// Border y in pixels
    pub border_y: f64,
    /// Border mode
    pub border_style: BorderStyle,
    /// Letter spacing in script units
    pub hspacing: f64,
    /// Font weight
    pub weight: u16,
    /// Italic
    pub italic: bool,
    /// Underline and strike-out
    pub decoration: Decoration,
    /// Rotated for vertical layout
    pub rotate_vertical: bool,
}

impl GlyphInfo {
    /// Cluster for `symbol` with neutral state
    pub fn new(symbol: char) -> Self {
        Self {
            symbol,
            skip: false,
            linebreak: LineBreak::None,
            drawing: None,
            font: None,
            font_size: 0.0,
            shape_run_id: 0,
            level: 0,
            shaped: false,
            glyph: GlyphPart::default(),
            siblings: SmallVec::new(),
            pos: Vector::default(),
            cluster_advance: Vector::default(),
            bbox: BBox::default(),
            asc: 0,
            desc: 0,
            c: [0; 4],
            effect_type: Karaoke::None,
            effect_timing: 0,
            effect_skip_timing: 0,
            karaoke_split: 0,
            be: 0,
            blur: 0.0,
            shadow_x: 0.0,
            shadow_y: 0.0,
            frx: 0.0,
            fry: 0.0,
            frz: 0.0,
            fax: 0.0,
            fay: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            border_x: 0.0,
            border_y: 0.0,
            border_style: BorderStyle::Outline,
            hspacing: 0.0,
            weight: 400,
            italic: false,
            decoration: Decoration::default(),
            rotate_vertical: false,
        }
    }

    /// The first glyph followed by its siblings
    pub fn parts(&self) -> impl Iterator<Item = &GlyphPart> {
        std::iter::once(&self.glyph).chain(self.siblings.iter())
    }

    /// Mutable access to all glyphs of the cluster
    pub fn parts_mut(&mut self) -> impl Iterator<Item = &mut GlyphPart> {
        std::iter::once(&mut self.glyph).chain(self.siblings.iter_mut())
    }

    /// Place the cluster with its pen at `pen`; glyphs follow each other
    /// by their own advances, shifted by their shaping offsets
    pub fn place(&mut self, pen: Vector, with_offsets: bool) {
        let mut cluster_pen = pen;
        for part in self.parts_mut() {
            part.pos = if with_offsets {
                Vector::new(cluster_pen.x + part.offset.x, cluster_pen.y + part.offset.y)
            } else {
                cluster_pen
            };
            cluster_pen.x += part.advance.x;
            cluster_pen.y += part.advance.y;
        }
        self.pos = self.glyph.pos;
    }

    /// Move the cluster horizontally
    pub fn shift_x(&mut self, dx: i32) {
        for part in self.parts_mut() {
            part.pos.x += dx;
        }
        self.pos.x += dx;
    }

    /// Whether rotation or shear applies
    pub fn is_transformed(&self) -> bool {
        self.frx != 0.0 || self.fry != 0.0 || self.frz != 0.0 || self.fax != 0.0 || self.fay != 0.0
    }

    fn is_whitespace(&self) -> bool {
        (self.symbol == ' ' || self.symbol == '\n') && self.linebreak == LineBreak::None
    }

    fn left_edge(&self) -> i32 {
        self.bbox.x_min + self.pos.x
    }

    fn right_edge(&self) -> i32 {
        self.bbox.x_max + self.pos.x
    }
}

/// Line of laid out text
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Line {
    /// Index of the first cluster
    pub offset: usize,
    /// Number of clusters
    pub len: usize,
    /// Ascender in pixels
    pub asc: f64,
    /// Descender in pixels
    pub desc: f64,
}

/// Clusters and lines of one event
#[derive(Debug, Clone)]
pub struct TextInfo {
    /// Clusters in logical order
    pub glyphs: Vec<GlyphInfo>,
    /// Lines
    pub lines: Vec<Line>,
    /// Total height in pixels
    pub height: f64,
}

impl Default for TextInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl TextInfo {
    /// Empty text with the initial capacities
    pub fn new() -> Self {
        Self {
            glyphs: Vec::with_capacity(INITIAL_GLYPHS),
            lines: Vec::with_capacity(INITIAL_LINES),
            height: 0.0,
        }
    }

    /// Reset for the next event, keeping the allocations
    pub fn clear(&mut self) {
        self.glyphs.clear();
        self.lines.clear();
        self.height = 0.0;
    }

    /// Append a cluster, doubling the capacity when full
    pub fn push(&mut self, glyph: GlyphInfo) {
        if self.glyphs.len() == self.glyphs.capacity() {
            self.glyphs.reserve(self.glyphs.capacity().max(INITIAL_GLYPHS));
        }
        self.glyphs.push(glyph);
    }

    /// Number of clusters
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Whether there are no clusters
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Lay clusters out on one line in logical order (before wrapping)
    pub fn layout_preliminary(&mut self) {
        let mut pen = Vector::default();
        for glyph in &mut self.glyphs {
            glyph.place(pen, false);
            pen.x += glyph.cluster_advance.x;
            pen.y += glyph.cluster_advance.y;
        }
    }

    /// Rebuild [`TextInfo::lines`] from the line break markers
    pub fn rebuild_lines(&mut self) {
        self.lines.clear();
        let mut start = 0;
        for i in 1..self.glyphs.len() {
            if self.glyphs[i].linebreak != LineBreak::None {
                self.push_line(start, i - start);
                start = i;
            }
        }
        self.push_line(start, self.glyphs.len() - start);
    }

    fn push_line(&mut self, offset: usize, len: usize) {
        if self.lines.len() == self.lines.capacity() {
            self.lines.reserve(self.lines.capacity().max(INITIAL_LINES));
        }
        self.lines.push(Line {
            offset,
            len,
            asc: 0.0,
            desc: 0.0,
        });
    }

    /// Per-line ascender and descender maxima and the total height.
    /// Newline clusters count towards the maxima; an empty line takes half
    /// the metrics of the last visible cluster before it.
    pub fn measure_text(&mut self, line_spacing: f64) {
        self.height = 0.0;
        let mut last: Option<usize> = None;
        for (n, line) in self.lines.iter_mut().enumerate() {
            let mut max_asc = 0.0f64;
            let mut max_desc = 0.0f64;
            let mut empty = true;
            for i in line.offset..line.offset + line.len {
                let glyph = &self.glyphs[i];
                max_asc = max_asc.max(d6_to_double(glyph.asc));
                max_desc = max_desc.max(d6_to_double(glyph.desc));
                if glyph.symbol != '\n' && glyph.symbol != '\0' {
                    empty = false;
                    last = Some(i);
                }
            }
            let is_last_line = line.offset + line.len >= self.glyphs.len();
            if empty && n > 0 && !is_last_line {
                if let Some(last) = last {
                    max_asc = d6_to_double(self.glyphs[last].asc) / 2.0;
                    max_desc = d6_to_double(self.glyphs[last].desc) / 2.0;
                }
            }
            line.asc = max_asc;
            line.desc = max_desc;
            self.height += max_asc + max_desc;
        }
        self.height += self.lines.len().saturating_sub(1) as f64 * line_spacing;
    }

    /// Mark leading and trailing whitespace of the event and whitespace
    /// around every line break as skipped
    pub fn trim_whitespace(&mut self) {
        let glyphs = &mut self.glyphs;
        let len = glyphs.len();
        if len == 0 {
            return;
        }

        let mut i = len - 1;
        while i > 0 && glyphs[i].is_whitespace() {
            glyphs[i].skip = true;
            i -= 1;
        }

        let mut i = 0;
        while i < len && glyphs[i].is_whitespace() {
            glyphs[i].skip = true;
            i += 1;
        }

        let mut i = 0;
        while i < len {
            if glyphs[i].linebreak != LineBreak::None {
                let mut j = i.saturating_sub(1);
                while j > 0 && glyphs[j].is_whitespace() {
                    glyphs[j].skip = true;
                    j -= 1;
                }
                if glyphs[i].symbol == ' ' {
                    glyphs[i].skip = true;
                    let mut j = i + 1;
                    while j < len && glyphs[j].is_whitespace() {
                        glyphs[j].skip = true;
                        j += 1;
                    }
                    i = j;
                    continue;
                }
            }
            i += 1;
        }
    }

    /// Start indices of every line, from the break markers
    fn line_starts(&self) -> Vec<usize> {
        let mut starts = vec![0];
        starts.extend(
            self.glyphs
                .iter()
                .enumerate()
                .skip(1)
                .filter(|(_, g)| g.linebreak != LineBreak::None)
                .map(|(i, _)| i),
        );
        starts
    }

    /// Width of clusters `a..=b` from the left edge of `a` to the right
    /// edge of `b`, in pixels
    fn span_width(&self, a: usize, b: usize) -> f64 {
        d6_to_double(self.glyphs[b].right_edge() - self.glyphs[a].left_edge())
    }

    /// Pixel width of every line as seen by the wrapper
    pub fn line_widths(&self) -> Vec<f64> {
        let starts = self.line_starts();
        starts
            .iter()
            .enumerate()
            .map(|(k, &start)| {
                let end = starts.get(k + 1).map_or(self.glyphs.len(), |&s| s) - 1;
                self.span_width(start, end)
            })
            .collect()
    }

    /// Insert soft breaks so that lines fit `max_width` pixels, balance
    /// adjacent lines, then compute line metrics and trim whitespace
    pub fn wrap_lines_smart(&mut self, max_width: f64, wrap_style: WrapStyle, line_spacing: f64) {
        if self.glyphs.is_empty() {
            self.lines.clear();
            self.height = 0.0;
            return;
        }
        self.wrap_greedy(max_width, wrap_style);
        if wrap_style != WrapStyle::EndOfLine {
            self.balance_lines(wrap_style);
        }
        self.rebuild_lines();
        self.measure_text(line_spacing);
        self.trim_whitespace();
    }

    fn wrap_greedy(&mut self, max_width: f64, wrap_style: WrapStyle) {
        let mut line_start = 0;
        let mut last_space: Option<usize> = None;
        let mut overflow = false;
        for i in 0..self.glyphs.len() {
            let cur = &self.glyphs[i];
            let len = d6_to_double(cur.right_edge() - self.glyphs[line_start].left_edge());
            let mut brk: Option<(usize, LineBreak)> = None;
            if cur.symbol == '\n' {
                brk = Some((i, LineBreak::Hard));
            } else if cur.symbol == ' ' {
                if overflow && i > line_start {
                    brk = Some((i, LineBreak::Soft));
                } else {
                    last_space = Some(i);
                }
            } else if len >= max_width && wrap_style != WrapStyle::None {
                match last_space {
                    Some(space) => brk = Some((space, LineBreak::Soft)),
                    None => overflow = true,
                }
            }

            if let Some((break_at, kind)) = brk {
                let lead = break_at + 1;
                if lead < self.glyphs.len() && self.glyphs[lead].symbol != '\n' || kind == LineBreak::Hard {
                    if lead < self.glyphs.len() {
                        self.glyphs[lead].linebreak = kind;
                        line_start = lead;
                    }
                    last_space = None;
                    overflow = false;
                }
            }
        }
    }

    /// Move the last word of a line to the next line while that reduces
    /// the difference of their widths, never letting the largest
    /// difference between adjacent lines grow
    fn balance_lines(&mut self, wrap_style: WrapStyle) {
        loop {
            let starts = self.line_starts();
            let widths = self.line_widths();
            let max_diff = widths
                .windows(2)
                .map(|w| (w[0] - w[1]).abs())
                .fold(0.0f64, f64::max);
            let mut moved = false;

            for k in 0..starts.len().saturating_sub(1) {
                let s1 = starts[k];
                let s2 = starts[k + 1];
                if self.glyphs[s2].linebreak != LineBreak::Soft {
                    continue;
                }
                let s3_end = starts.get(k + 2).map_or(self.glyphs.len(), |&s| s) - 1;

                let mut w = s2 - 1;
                while w > s1 && self.glyphs[w].symbol == ' ' {
                    w -= 1;
                }
                while w > s1 && self.glyphs[w].symbol != ' ' {
                    w -= 1;
                }
                let mut e1 = w;
                while e1 > s1 && self.glyphs[e1].symbol == ' ' {
                    e1 -= 1;
                }
                if self.glyphs[w].symbol == ' ' {
                    w += 1;
                }
                if w <= s1 || w >= s2 || e1 >= w {
                    continue;
                }

                let l1 = widths[k];
                let l2 = widths[k + 1];
                let l1_new = self.span_width(s1, e1);
                let l2_new = self.span_width(w, s3_end);
                let diff_new = (l1_new - l2_new).abs();
                let improves = diff_new < (l1 - l2).abs();
                let lower_wider = wrap_style == WrapStyle::SmartLower
                    && l1 > l2
                    && l1_new <= l2_new
                    && diff_new <= max_diff;
                let neighbors_ok = (k == 0 || (widths[k - 1] - l1_new).abs() <= max_diff)
                    && (k + 2 >= widths.len() || (l2_new - widths[k + 2]).abs() <= max_diff);

                if (improves || lower_wider) && neighbors_ok {
                    self.glyphs[w].linebreak = LineBreak::Soft;
                    self.glyphs[s2].linebreak = LineBreak::None;
                    moved = true;
                    break;
                }
            }
            if !moved {
                break;
            }
        }
    }

    /// Resolve karaoke words: each glyph gets the x of the color split
    /// relative to its own position. `now` is the event time in ms.
    pub fn process_karaoke_effects(&mut self, now: i64) {
        let mut timing = 0i64;
        let mut word_start: Option<usize> = None;
        let len = self.glyphs.len();
        for i in 0..=len {
            if i < len && self.glyphs[i].effect_type == Karaoke::None {
                continue;
            }
            if let Some(s1) = word_start {
                let effect = self.glyphs[s1].effect_type;
                let tm_start = timing + self.glyphs[s1].effect_skip_timing;
                let tm_end = tm_start + self.glyphs[s1].effect_timing;
                timing = tm_end;

                let mut x_start = i32::MAX;
                let mut x_end = i32::MIN;
                for glyph in &self.glyphs[s1..i] {
                    x_start = x_start.min(d6_to_int(glyph.bbox.x_min + glyph.pos.x));
                    x_end = x_end.max(d6_to_int(glyph.bbox.x_max + glyph.pos.x));
                }

                let dt = (now - tm_start) as f64;
                let x = match effect {
                    Karaoke::Fill if tm_end > tm_start => {
                        x_start + (f64::from(x_end - x_start) * dt / (tm_end - tm_start) as f64) as i32
                    }
                    _ if dt > 0.0 => x_end + 1,
                    _ => x_start,
                };

                for glyph in &mut self.glyphs[s1..i] {
                    glyph.effect_type = effect;
                    glyph.karaoke_split = x - d6_to_int(glyph.pos.x);
                }
            }
            word_start = Some(i);
        }
    }

    /// Lay lines out in visual order: every line starts at x = 0 and the
    /// pen drops by the previous descender, the next ascender and the line
    /// spacing. `order` maps visual to logical indices.
    pub fn reposition(&mut self, order: &[usize], line_spacing: f64) {
        let mut pen = Vector::default();
        let mut lineno = 0;
        let mut last_pen_x = 0;
        let mut last_fay = 0.0;
        for (i, &idx) in order.iter().enumerate() {
            let (fay, scale_x, scale_y) = {
                let g = &self.glyphs[idx];
                (g.fay, g.scale_x, g.scale_y)
            };
            let tilt = if scale_x != 0.0 { last_fay / scale_x * scale_y } else { 0.0 };
            if self.glyphs[i].linebreak != LineBreak::None && i > 0 {
                pen.y -= (tilt * f64::from(pen.x - last_pen_x)) as i32;
                pen.x = 0;
                last_pen_x = 0;
                let prev_desc = self.lines.get(lineno).map_or(0.0, |l| l.desc);
                let next_asc = self.lines.get(lineno + 1).map_or(0.0, |l| l.asc);
                pen.y += double_to_d6(prev_desc) + double_to_d6(next_asc) + double_to_d6(line_spacing);
                lineno += 1;
            } else if last_fay != fay {
                pen.y -= (tilt * f64::from(pen.x - last_pen_x)) as i32;
                last_pen_x = pen.x;
            }
            last_fay = fay;

            let glyph = &mut self.glyphs[idx];
            if glyph.skip {
                continue;
            }
            glyph.place(pen, true);
            pen.x += glyph.cluster_advance.x;
            pen.y += glyph.cluster_advance.y;
        }
    }

    /// Bounding box of the laid out text in pixels; vertically from the
    /// first line's ascender to the total height
    pub fn compute_string_bbox(&self) -> DBBox {
        let (Some(first), Some(line)) = (self.glyphs.first(), self.lines.first()) else {
            return DBBox::default();
        };
        let y0 = d6_to_double(first.pos.y);
        let mut bbox = DBBox::new(f64::MAX, -line.asc + y0, f64::MIN, self.height - line.asc + y0);
        for glyph in self.glyphs.iter().filter(|g| !g.skip) {
            let s = d6_to_double(glyph.pos.x);
            let e = s + d6_to_double(glyph.cluster_advance.x);
            bbox.x_min = bbox.x_min.min(s);
            bbox.x_max = bbox.x_max.max(e);
        }
        if bbox.x_min > bbox.x_max {
            bbox.x_min = 0.0;
            bbox.x_max = 0.0;
        }
        bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Box clusters: `x` is a 10 px wide glyph, space is 5 px
    fn text(s: &str) -> TextInfo {
        let mut info = TextInfo::new();
        for ch in s.chars() {
            let mut glyph = GlyphInfo::new(ch);
            let adv = match ch {
                ' ' => 5 * 64,
                '\n' => 0,
                _ => 10 * 64,
            };
            glyph.cluster_advance = Vector::new(adv, 0);
            glyph.glyph.advance = glyph.cluster_advance;
            if ch != ' ' && ch != '\n' {
                glyph.bbox = BBox::new(0, 0, adv, 640);
            }
            glyph.asc = 8 * 64;
            glyph.desc = 2 * 64;
            info.push(glyph);
        }
        info.layout_preliminary();
        info
    }

    fn line_strings(info: &TextInfo) -> Vec<String> {
        info.lines
            .iter()
            .map(|l| {
                info.glyphs[l.offset..l.offset + l.len]
                    .iter()
                    .filter(|g| !g.skip)
                    .map(|g| g.symbol)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_rebuild_lines_from_markers() {
        let mut info = TextInfo::new();
        for (n, symbol) in "abcde".chars().enumerate() {
            let mut glyph = GlyphInfo::new(symbol);
            glyph.linebreak = match n {
                0 | 2 => LineBreak::Hard,
                4 => LineBreak::Soft,
                _ => LineBreak::None,
            };
            info.push(glyph);
        }
        info.rebuild_lines();
        let spans: Vec<(usize, usize)> = info.lines.iter().map(|l| (l.offset, l.len)).collect();
        assert_eq!(spans, vec![(0, 2), (2, 2), (4, 1)]);
    }

    #[test]
    fn test_hard_break_splits_lines() {
        let mut info = text("ab\ncd");
        info.wrap_lines_smart(1000.0, WrapStyle::Smart, 0.0);
        assert_eq!(line_strings(&info), vec!["ab", "cd"]);
        assert_eq!(info.glyphs[3].linebreak, LineBreak::Hard);
        assert!(info.glyphs[2].skip);
        assert_eq!(info.height, 20.0);
    }

    #[test]
    fn test_greedy_breaks_at_last_space() {
        let mut info = text("xxxx xxxx x");
        info.wrap_lines_smart(90.0, WrapStyle::EndOfLine, 0.0);
        assert_eq!(line_strings(&info), vec!["xxxx xxxx", "x"]);
    }

    #[test]
    fn test_smart_wrap_balances_lines() {
        let mut info = text("xxxx xxxx x");
        info.wrap_lines_smart(90.0, WrapStyle::Smart, 0.0);
        assert_eq!(line_strings(&info), vec!["xxxx", "xxxx x"]);
    }

    #[test]
    fn test_no_wrap_keeps_single_line() {
        let mut info = text("xxx xxx xxx");
        info.wrap_lines_smart(20.0, WrapStyle::None, 0.0);
        assert_eq!(info.lines.len(), 1);
    }

    #[test]
    fn test_long_word_stays_whole() {
        let mut info = text("xxxxxxxxxx xx");
        info.wrap_lines_smart(40.0, WrapStyle::EndOfLine, 0.0);
        assert_eq!(line_strings(&info), vec!["xxxxxxxxxx", "xx"]);
    }

    #[test]
    fn test_trim_leading_and_trailing() {
        let mut info = text("  xx  ");
        info.wrap_lines_smart(1000.0, WrapStyle::Smart, 0.0);
        let skipped: Vec<bool> = info.glyphs.iter().map(|g| g.skip).collect();
        assert_eq!(skipped, vec![true, true, false, false, true, true]);
    }

    #[test]
    fn test_empty_line_uses_half_metrics() {
        let mut info = text("x\n\nx");
        info.wrap_lines_smart(1000.0, WrapStyle::Smart, 0.0);
        assert_eq!(info.lines.len(), 3);
        assert_eq!(info.lines[1].asc, 4.0);
        assert_eq!(info.lines[1].desc, 1.0);
        assert_eq!(info.height, 25.0);
    }

    #[test]
    fn test_line_spacing_added_between_lines() {
        let mut info = text("x\nx");
        info.wrap_lines_smart(1000.0, WrapStyle::Smart, 3.0);
        assert_eq!(info.height, 23.0);
    }

    #[test]
    fn test_reposition_starts_lines_at_zero() {
        let mut info = text("ab\ncd");
        info.wrap_lines_smart(1000.0, WrapStyle::Smart, 0.0);
        let order: Vec<usize> = (0..info.len()).collect();
        info.reposition(&order, 0.0);
        assert_eq!(info.glyphs[3].pos, Vector::new(0, 10 * 64));
        assert_eq!(info.glyphs[4].pos, Vector::new(640, 10 * 64));
        let bbox = info.compute_string_bbox();
        assert_eq!(bbox, DBBox::new(0.0, -8.0, 20.0, 12.0));
    }

    #[test]
    fn test_karaoke_split_positions() {
        let mut info = text("ab cd");
        for (i, g) in info.glyphs.iter_mut().enumerate() {
            if i == 0 {
                g.effect_type = Karaoke::Instant;
                g.effect_timing = 300;
            } else if i == 3 {
                g.effect_type = Karaoke::Fill;
                g.effect_timing = 500;
            }
        }
        info.process_karaoke_effects(550);
        assert_eq!(info.glyphs[0].karaoke_split, 21);
        // second word spans x = 25..45 and is half way through
        assert_eq!(info.glyphs[3].karaoke_split, 35 - 25);
        assert_eq!(info.glyphs[4].karaoke_split, 35 - 35);
    }

    fn words() -> impl Strategy<Value = String> {
        prop::collection::vec(1usize..8, 1..12).prop_map(|lens| {
            lens.iter().map(|&n| "x".repeat(n)).collect::<Vec<_>>().join(" ")
        })
    }

    proptest! {
        #[test]
        fn prop_lines_fit_width(s in words(), width in 30.0f64..200.0) {
            let mut info = text(&s);
            info.wrap_lines_smart(width, WrapStyle::Smart, 0.0);
            for line in line_strings(&info) {
                let w = line.chars().map(|c| if c == ' ' { 5.0 } else { 10.0 }).sum::<f64>();
                prop_assert!(w <= width || !line.contains(' '), "{line:?} wider than {width}");
            }
        }

        #[test]
        fn prop_balancing_never_widens_differences(s in words(), width in 30.0f64..200.0) {
            let max_diff = |info: &TextInfo| {
                info.line_widths()
                    .windows(2)
                    .map(|w| (w[0] - w[1]).abs())
                    .fold(0.0f64, f64::max)
            };
            let mut greedy = text(&s);
            greedy.wrap_greedy(width, WrapStyle::Smart);
            let mut balanced = greedy.clone();
            balanced.balance_lines(WrapStyle::Smart);
            prop_assert!(max_diff(&balanced) <= max_diff(&greedy));
        }
    }
}
