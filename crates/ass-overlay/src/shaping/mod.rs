//! Bidi levels, shape runs and glyph lookup
//!
//! The simple shaper maps every code point to one glyph after Arabic
//! joining and mirroring. With a [`ShapingEngine`] installed, runs sharing
//! face, size and level are shaped as a whole; extra glyphs of a cluster
//! become its siblings.

pub mod arabic;

use std::fmt;

use log::debug;
use rustybuzz::ttf_parser::Tag;
use rustybuzz::{Direction, Feature, UnicodeBuffer};
use unicode_bidi::{BidiInfo, Level};

use crate::cache::FontCache;
use crate::font::{units_scale, FaceData, FaceId, GlyphProvider};
use crate::layout::{GlyphInfo, GlyphPart, TextInfo};
use crate::utils::math::Vector;

/// Shaping quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapingLevel {
    /// One glyph per code point, joining and mirroring only
    #[default]
    Simple,
    /// Full OpenType shaping through a [`ShapingEngine`]
    Complex,
}

/// A run of text handed to a shaping engine
#[derive(Debug, Clone)]
pub struct ShapeRequest<'a> {
    /// Face of the run
    pub face: FaceId,
    /// Font data of the face
    pub data: &'a FaceData,
    /// Run text in logical order
    pub text: &'a str,
    /// Right-to-left run
    pub rtl: bool,
    /// Font size in pixels
    pub size: f64,
    /// Horizontal scale applied to advances and offsets
    pub scale_x: f64,
    /// Vertical scale
    pub scale_y: f64,
    /// Apply kerning
    pub kerning: bool,
}

/// One glyph returned by a shaping engine. Metrics are 26.6 pixels with y
/// pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapedGlyph {
    /// Glyph index in the face
    pub glyph_id: u32,
    /// Byte offset in [`ShapeRequest::text`] of the source character
    pub cluster: usize,
    /// Horizontal advance
    pub x_advance: i32,
    /// Vertical advance
    pub y_advance: i32,
    /// Horizontal offset from the pen
    pub x_offset: i32,
    /// Vertical offset from the pen
    pub y_offset: i32,
}

/// External complex text shaper
pub trait ShapingEngine {
    /// Shape a run; glyphs come back in visual order. `None` makes the run
    /// fall back to simple shaping.
    fn shape(&mut self, request: &ShapeRequest<'_>) -> Option<Vec<ShapedGlyph>>;
}

/// OpenType shaping with rustybuzz
#[derive(Debug, Default, Clone, Copy)]
pub struct RustybuzzShaper;

impl RustybuzzShaper {
    /// Create the shaper
    pub fn new() -> Self {
        Self
    }
}

impl ShapingEngine for RustybuzzShaper {
    fn shape(&mut self, request: &ShapeRequest<'_>) -> Option<Vec<ShapedGlyph>> {
        let bytes = request.data.bytes();
        let face = rustybuzz::Face::from_slice(bytes, request.data.index)?;
        let metrics = ttf_parser::Face::parse(bytes, request.data.index).ok()?;
        let scale = units_scale(&metrics, request.size) * 64.0;
        let sx = scale * request.scale_x;
        let sy = scale * request.scale_y;

        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(request.text);
        buffer.set_direction(if request.rtl {
            Direction::RightToLeft
        } else {
            Direction::LeftToRight
        });
        buffer.guess_segment_properties();

        let mut features = Vec::new();
        if !request.kerning {
            features.push(Feature::new(Tag::from_bytes(b"kern"), 0, ..));
        }
        let output = rustybuzz::shape(&face, &features, buffer);

        let glyphs = output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, pos)| ShapedGlyph {
                glyph_id: info.glyph_id,
                cluster: info.cluster as usize,
                x_advance: (f64::from(pos.x_advance) * sx).round() as i32,
                y_advance: (f64::from(pos.y_advance) * sy).round() as i32,
                x_offset: (f64::from(pos.x_offset) * sx).round() as i32,
                y_offset: (f64::from(pos.y_offset) * sy).round() as i32,
            })
            .collect();
        Some(glyphs)
    }
}

/// Object replacement character standing in for drawings
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Characters that take no space and get no glyph in simple shaping
fn is_ignorable(ch: char) -> bool {
    matches!(
        ch as u32,
        0x200B..=0x200F | 0x202A..=0x202E | 0x2060..=0x2064 | 0x2066..=0x2069 | 0xFEFF
    )
}

/// Splits text into runs and resolves glyphs, optionally through a
/// shaping engine
pub struct Shaper {
    engine: Option<Box<dyn ShapingEngine>>,
}

impl fmt::Debug for Shaper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shaper").field("level", &self.level()).finish()
    }
}

impl Default for Shaper {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Shaper {
    /// Shaper using `engine`, or simple shaping without one
    pub fn new(engine: Option<Box<dyn ShapingEngine>>) -> Self {
        Self { engine }
    }

    /// Replace the shaping engine
    pub fn set_engine(&mut self, engine: Option<Box<dyn ShapingEngine>>) {
        self.engine = engine;
    }

    /// Shaping quality in effect
    pub fn level(&self) -> ShapingLevel {
        if self.engine.is_some() {
            ShapingLevel::Complex
        } else {
            ShapingLevel::Simple
        }
    }

    /// Assign levels, faces, glyph indices and shape runs to every cluster
    pub fn shape(
        &mut self,
        text_info: &mut TextInfo,
        fonts: &mut FontCache,
        provider: &mut dyn GlyphProvider,
        kerning: bool,
    ) {
        let glyphs = &mut text_info.glyphs;
        compute_levels(glyphs);
        resolve_glyphs(glyphs, fonts, provider, self.engine.is_none());
        let runs = assign_runs(glyphs);

        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        for (start, end) in runs {
            let first = &glyphs[start];
            let Some(face) = first.glyph.face else {
                continue;
            };
            if first.drawing.is_some() {
                continue;
            }
            let Some(data) = provider.face_data(face) else {
                continue;
            };
            shape_run(&mut **engine, &mut glyphs[start..end], face, &data, kerning);
        }
    }
}

/// Bidi embedding level of every cluster. Hard breaks end paragraphs and
/// the base direction is left-to-right.
pub fn compute_levels(glyphs: &mut [GlyphInfo]) {
    let mut text = String::with_capacity(glyphs.len());
    let mut offsets = Vec::with_capacity(glyphs.len());
    for glyph in glyphs.iter() {
        offsets.push(text.len());
        text.push(if glyph.drawing.is_some() {
            OBJECT_REPLACEMENT
        } else {
            glyph.symbol
        });
    }
    let bidi = BidiInfo::new(&text, Some(Level::ltr()));
    for (glyph, &offset) in glyphs.iter_mut().zip(&offsets) {
        glyph.level = bidi.levels.get(offset).map_or(0, |l| l.number());
    }
}

fn resolve_glyphs(
    glyphs: &mut [GlyphInfo],
    fonts: &mut FontCache,
    provider: &mut dyn GlyphProvider,
    simple: bool,
) {
    let symbols: Vec<char> = glyphs.iter().map(|g| g.symbol).collect();
    let joined = if simple {
        arabic::shape_joining(&symbols)
    } else {
        symbols
    };

    for (i, glyph) in glyphs.iter_mut().enumerate() {
        glyph.glyph.face = None;
        glyph.glyph.glyph_index = 0;
        if glyph.drawing.is_some() || glyph.symbol == '\n' {
            continue;
        }
        if simple && is_ignorable(glyph.symbol) {
            glyph.skip = true;
            continue;
        }
        let Some(font) = glyph.font.and_then(|h| fonts.get_mut(h)) else {
            continue;
        };
        let mut lookup = joined[i];
        if simple && glyph.level % 2 == 1 {
            lookup = arabic::mirror(lookup);
        }
        let mut found = font.glyph_for(provider, lookup);
        if found.is_none() && lookup != glyph.symbol {
            found = font.glyph_for(provider, glyph.symbol);
        }
        match found {
            Some((face, index)) => {
                glyph.glyph.face = Some(face);
                glyph.glyph.glyph_index = index;
            }
            None => debug!("no glyph for U+{:04X}", glyph.symbol as u32),
        }
    }
}

/// Give every cluster a run id; returns the run ranges. Runs break on
/// font, size, face, level, drawings and hard breaks.
pub fn assign_runs(glyphs: &mut [GlyphInfo]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 0..glyphs.len() {
        if i > 0 && starts_run(&glyphs[i - 1], &glyphs[i]) {
            runs.push((start, i));
            start = i;
        }
        glyphs[i].shape_run_id = runs.len();
    }
    if !glyphs.is_empty() {
        runs.push((start, glyphs.len()));
    }
    runs
}

fn starts_run(prev: &GlyphInfo, cur: &GlyphInfo) -> bool {
    prev.font != cur.font
        || prev.font_size != cur.font_size
        || prev.glyph.face != cur.glyph.face
        || prev.level != cur.level
        || prev.drawing.is_some()
        || cur.drawing.is_some()
        || prev.symbol == '\n'
        || cur.symbol == '\n'
        || prev.scale_x != cur.scale_x
        || prev.scale_y != cur.scale_y
}

fn shape_run(
    engine: &mut dyn ShapingEngine,
    run: &mut [GlyphInfo],
    face: FaceId,
    data: &FaceData,
    kerning: bool,
) {
    let mut text = String::with_capacity(run.len());
    let mut byte_to_cluster = Vec::with_capacity(run.len());
    for (i, glyph) in run.iter().enumerate() {
        for _ in 0..glyph.symbol.len_utf8() {
            byte_to_cluster.push(i);
        }
        text.push(glyph.symbol);
    }
    let request = ShapeRequest {
        face,
        data,
        text: &text,
        rtl: run[0].level % 2 == 1,
        size: run[0].font_size,
        scale_x: run[0].scale_x,
        scale_y: run[0].scale_y,
        kerning,
    };
    let Some(shaped) = engine.shape(&request) else {
        debug!("shaping engine declined a run of {} clusters", run.len());
        return;
    };

    let mut assigned = vec![false; run.len()];
    for glyph in run.iter_mut() {
        glyph.siblings.clear();
    }
    for sg in shaped {
        let Some(&index) = byte_to_cluster.get(sg.cluster) else {
            continue;
        };
        let part = GlyphPart {
            face: Some(face),
            glyph_index: sg.glyph_id,
            offset: Vector::new(sg.x_offset, -sg.y_offset),
            advance: Vector::new(sg.x_advance, -sg.y_advance),
            ..GlyphPart::default()
        };
        let cluster = &mut run[index];
        if assigned[index] {
            cluster.siblings.push(part);
        } else {
            cluster.glyph = part;
            cluster.shaped = true;
            assigned[index] = true;
        }
    }
    for (glyph, assigned) in run.iter_mut().zip(assigned) {
        if !assigned {
            glyph.skip = true;
            glyph.glyph.advance = Vector::default();
        }
    }
}

/// Visual order of all clusters, line by line: element `k` is the logical
/// index of the cluster shown at visual position `k`. Trailing whitespace
/// of each line takes the base level.
pub fn visual_order(text_info: &TextInfo) -> Vec<usize> {
    let mut order = Vec::with_capacity(text_info.glyphs.len());
    for line in &text_info.lines {
        let glyphs = &text_info.glyphs[line.offset..line.offset + line.len];
        let mut levels: Vec<Level> = glyphs
            .iter()
            .map(|g| Level::new(g.level).unwrap_or_else(|_| Level::ltr()))
            .collect();
        for (level, glyph) in levels.iter_mut().zip(glyphs).rev() {
            if glyph.symbol != ' ' && glyph.symbol != '\n' && !glyph.skip {
                break;
            }
            *level = Level::ltr();
        }
        order.extend(
            BidiInfo::reorder_visual(&levels)
                .into_iter()
                .map(|i| line.offset + i),
        );
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{FontDesc, GlyphOutline, GlyphRequest};
    use crate::layout::LineBreak;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    /// Covers ASCII, Hebrew and Arabic including presentation forms; glyph
    /// index equals the code point
    struct CodepointFaces;

    impl GlyphProvider for CodepointFaces {
        fn resolve(&mut self, _desc: &FontDesc, _codepoint: Option<char>) -> Option<FaceId> {
            Some(FaceId(0))
        }

        fn glyph_index(&self, _face: FaceId, codepoint: char) -> Option<u32> {
            let cp = codepoint as u32;
            let covered = codepoint.is_ascii_graphic()
                || codepoint == ' '
                || (0x05D0..=0x05EA).contains(&cp)
                || (0x0621..=0x064A).contains(&cp)
                || (0xFE80..=0xFEFC).contains(&cp);
            covered.then_some(cp)
        }

        fn get_glyph(&self, _face: FaceId, _glyph: u32, _request: &GlyphRequest) -> Option<GlyphOutline> {
            None
        }

        fn get_kerning(&self, _face: FaceId, _left: u32, _right: u32, _size: f64) -> Vector {
            Vector::default()
        }

        fn get_ascent_descent(&self, _face: FaceId, _size: f64) -> (i32, i32) {
            (0, 0)
        }

        fn face_data(&self, _face: FaceId) -> Option<FaceData> {
            Some(FaceData {
                data: Arc::new(Vec::<u8>::new()),
                index: 0,
            })
        }
    }

    fn text(s: &str, fonts: &mut FontCache, provider: &mut dyn GlyphProvider) -> TextInfo {
        let handle = fonts.get_or_insert(FontDesc::new("Test", 0, 0, false), provider);
        let mut info = TextInfo::new();
        for ch in s.chars() {
            let mut glyph = GlyphInfo::new(ch);
            glyph.font = Some(handle);
            glyph.font_size = 20.0;
            info.push(glyph);
        }
        info
    }

    fn shape(s: &str, shaper: &mut Shaper) -> TextInfo {
        let mut fonts = FontCache::default();
        let mut provider = CodepointFaces;
        let mut info = text(s, &mut fonts, &mut provider);
        shaper.shape(&mut info, &mut fonts, &mut provider, true);
        info
    }

    #[test]
    fn test_levels_and_visual_order() {
        let mut info = shape("ab \u{05D0}\u{05D1}", &mut Shaper::default());
        let levels: Vec<u8> = info.glyphs.iter().map(|g| g.level).collect();
        assert_eq!(levels, vec![0, 0, 0, 1, 1]);
        info.rebuild_lines();
        assert_eq!(visual_order(&info), vec![0, 1, 2, 4, 3]);
    }

    #[test]
    fn test_paragraph_levels_reset_at_hard_break() {
        let mut info = shape("\u{05D0}\u{05D1}\nab", &mut Shaper::default());
        assert_eq!(info.glyphs[4].level, 0);
        info.glyphs[3].linebreak = LineBreak::Hard;
        info.rebuild_lines();
        let order = visual_order(&info);
        assert_eq!(&order[3..], &[3, 4]);
    }

    #[test]
    fn test_runs_break_on_level_and_newline() {
        let info = shape("ab\u{05D0}\ncd", &mut Shaper::default());
        let ids: Vec<usize> = info.glyphs.iter().map(|g| g.shape_run_id).collect();
        assert_eq!(ids, vec![0, 0, 1, 2, 3, 3]);
    }

    #[test]
    fn test_simple_shaping_joins_and_mirrors() {
        let info = shape("\u{0628}\u{0628}", &mut Shaper::default());
        assert_eq!(info.glyphs[0].glyph.glyph_index, 0xFE91);
        assert_eq!(info.glyphs[1].glyph.glyph_index, 0xFE90);

        let info = shape("\u{05D0}(\u{05D1}", &mut Shaper::default());
        assert_eq!(info.glyphs[1].level, 1);
        assert_eq!(info.glyphs[1].glyph.glyph_index, ')' as u32);
    }

    #[test]
    fn test_ignorable_and_missing() {
        let info = shape("a\u{200B}\u{4E00}", &mut Shaper::default());
        assert!(info.glyphs[1].skip);
        assert_eq!(info.glyphs[2].glyph.face, None);
        assert!(!info.glyphs[2].skip);
    }

    /// Decomposes `a` into two glyphs and ligates `fi`
    struct SplitAndLigate;

    impl ShapingEngine for SplitAndLigate {
        fn shape(&mut self, request: &ShapeRequest<'_>) -> Option<Vec<ShapedGlyph>> {
            let mut out = Vec::new();
            let mut skip_next = false;
            for (offset, ch) in request.text.char_indices() {
                if skip_next {
                    skip_next = false;
                    continue;
                }
                let glyph = |id: u32| ShapedGlyph {
                    glyph_id: id,
                    cluster: offset,
                    x_advance: 640,
                    y_advance: 0,
                    x_offset: 0,
                    y_offset: 0,
                };
                match ch {
                    'a' => {
                        out.push(glyph(1));
                        out.push(glyph(2));
                    }
                    'f' if request.text[offset..].starts_with("fi") => {
                        out.push(glyph(3));
                        skip_next = true;
                    }
                    _ => out.push(glyph(ch as u32)),
                }
            }
            Some(out)
        }
    }

    #[test]
    fn test_complex_shaping_siblings_and_ligatures() {
        let mut shaper = Shaper::new(Some(Box::new(SplitAndLigate)));
        assert_eq!(shaper.level(), ShapingLevel::Complex);
        let info = shape("afi", &mut shaper);
        assert!(info.glyphs.iter().take(2).all(|g| g.shaped));
        assert_eq!(info.glyphs[0].glyph.glyph_index, 1);
        assert_eq!(info.glyphs[0].siblings.len(), 1);
        assert_eq!(info.glyphs[0].siblings[0].glyph_index, 2);
        assert_eq!(info.glyphs[1].glyph.glyph_index, 3);
        assert!(info.glyphs[2].skip);
    }
}
