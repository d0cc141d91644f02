//! Font selection and the glyph provider seam
//!
//! The renderer never opens font files itself. It asks a [`GlyphProvider`]
//! to resolve a [`FontDesc`] to faces, map codepoints to glyph indices and
//! return scaled outlines. [`FontDbProvider`] is the bundled implementation.

mod fontdb_provider;

pub use fontdb_provider::FontDbProvider;

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::pipeline::state::Decoration;
use crate::raster::outline::Outline;
use crate::renderer::settings::Hinting;
use crate::utils::math::{BBox, Vector};

/// Codepoints from this value up are rotated in vertical (`@family`) fonts
pub const VERTICAL_LOWER_BOUND: u32 = 0x02F1;

/// Face handle issued by a glyph provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaceId(pub u32);

/// Font request derived from the render state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FontDesc {
    /// Family name without the vertical `@` prefix
    pub family: String,
    /// CSS weight, 100..=900
    pub weight: u16,
    /// Italic requested
    pub italic: bool,
    /// Match the family as a pattern instead of an exact name
    pub treat_family_as_pattern: bool,
    /// Vertical layout requested with a leading `@`
    pub vertical: bool,
}

impl FontDesc {
    /// Build a request from style values: `bold` is 0, 1, -1 or a weight,
    /// `italic` is 0 or non-zero
    pub fn new(family: &str, bold: i32, italic: i32, treat_family_as_pattern: bool) -> Self {
        let (family, vertical) = match family.strip_prefix('@') {
            Some(rest) => (rest, true),
            None => (family, false),
        };
        Self {
            family: family.to_string(),
            weight: weight_from_bold(bold),
            italic: italic != 0,
            treat_family_as_pattern,
            vertical,
        }
    }
}

/// Map an ASS bold value to a CSS weight
pub fn weight_from_bold(bold: i32) -> u16 {
    match bold {
        1 | -1 => 700,
        b if b >= 100 => b.clamp(100, 900) as u16,
        _ => 400,
    }
}

/// Parameters of a glyph outline request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphRequest {
    /// Font size in pixels
    pub size: f64,
    /// Horizontal scale applied to the outline and advance
    pub scale_x: f64,
    /// Vertical scale
    pub scale_y: f64,
    /// Hinting mode
    pub hinting: Hinting,
    /// Underline and strike-out
    pub decoration: Decoration,
    /// Requested weight; heavier than the face gets synthetic emboldening
    pub weight: u16,
    /// Requested italic; an upright face gets synthetic oblique
    pub italic: bool,
    /// Rotate the glyph 90° for vertical layout
    pub rotate_vertical: bool,
}

/// Scaled glyph outline returned by a provider (26.6, y up)
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphOutline {
    /// Contours
    pub outline: Outline,
    /// Pen advance
    pub advance: Vector,
    /// Control box of the outline
    pub bbox: BBox,
}

/// Raw font bytes of a face, handed to shaping engines
#[derive(Clone)]
pub struct FaceData {
    /// Font file contents
    pub data: Arc<dyn AsRef<[u8]> + Send + Sync>,
    /// Face index inside a collection
    pub index: u32,
}

impl FaceData {
    /// Font file bytes
    pub fn bytes(&self) -> &[u8] {
        (*self.data).as_ref()
    }
}

impl fmt::Debug for FaceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceData")
            .field("len", &self.bytes().len())
            .field("index", &self.index)
            .finish()
    }
}

/// Font matching and glyph outline source
pub trait GlyphProvider {
    /// Find a face for `desc`, optionally one that covers `codepoint`
    fn resolve(&mut self, desc: &FontDesc, codepoint: Option<char>) -> Option<FaceId>;

    /// Glyph index of `codepoint` in `face`
    fn glyph_index(&self, face: FaceId, codepoint: char) -> Option<u32>;

    /// Scaled outline of a glyph
    fn get_glyph(&self, face: FaceId, glyph: u32, request: &GlyphRequest) -> Option<GlyphOutline>;

    /// Kerning between two glyphs at `size` pixels (26.6)
    fn get_kerning(&self, face: FaceId, left: u32, right: u32, size: f64) -> Vector;

    /// Ascender and descender at `size` pixels (26.6, both positive)
    fn get_ascent_descent(&self, face: FaceId, size: f64) -> (i32, i32);

    /// Raw font data for shaping engines
    fn face_data(&self, face: FaceId) -> Option<FaceData>;

    /// Font and family used when a request matches nothing
    fn set_defaults(&mut self, _default_font: Option<&str>, _default_family: Option<&str>) {}
}

/// Index of a resolved font in the font cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontHandle(pub(crate) usize);

/// A font request with every face resolved for it so far. The first face
/// is the primary match; later faces are per-codepoint fallbacks.
#[derive(Debug, Clone)]
pub struct Font {
    /// Request this font was resolved from
    pub desc: FontDesc,
    /// Resolved faces in lookup order
    pub faces: Vec<FaceId>,
}

impl Font {
    /// Resolve the primary face of `desc`
    pub fn new(desc: FontDesc, provider: &mut dyn GlyphProvider) -> Self {
        let faces = provider.resolve(&desc, None).into_iter().collect();
        Self { desc, faces }
    }

    /// Face and glyph index for `ch`, asking the provider for a fallback
    /// face when no known face covers it
    pub fn glyph_for(&mut self, provider: &mut dyn GlyphProvider, ch: char) -> Option<(FaceId, u32)> {
        for &face in &self.faces {
            if let Some(glyph) = provider.glyph_index(face, ch) {
                return Some((face, glyph));
            }
        }
        let face = provider.resolve(&self.desc, Some(ch))?;
        let glyph = provider.glyph_index(face, ch)?;
        if !self.faces.contains(&face) {
            self.faces.push(face);
        }
        Some((face, glyph))
    }

    /// Primary face, if any
    pub fn primary(&self) -> Option<FaceId> {
        self.faces.first().copied()
    }
}

/// Pixels per font unit for a face rendered at `size` pixels.
///
/// The size maps to the Windows ascent plus descent when the OS/2 table
/// has them, otherwise to the hhea ascent plus descent.
pub fn units_scale(face: &ttf_parser::Face<'_>, size: f64) -> f64 {
    let hhea = i32::from(face.ascender()) - i32::from(face.descender());
    let os2 = face.tables().os2.map(|os2| {
        i32::from(os2.windows_ascender()) + i32::from(os2.windows_descender()).abs()
    });
    let height = match os2 {
        Some(h) if h > 0 => h,
        _ if hhea > 0 => hhea,
        _ => i32::from(face.units_per_em()),
    };
    size / f64::from(height.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_mapping() {
        assert_eq!(weight_from_bold(0), 400);
        assert_eq!(weight_from_bold(1), 700);
        assert_eq!(weight_from_bold(-1), 700);
        assert_eq!(weight_from_bold(2), 400);
        assert_eq!(weight_from_bold(300), 300);
        assert_eq!(weight_from_bold(1000), 900);
    }

    #[test]
    fn test_vertical_family() {
        let desc = FontDesc::new("@MS Gothic", 0, 1, false);
        assert!(desc.vertical);
        assert!(desc.italic);
        assert_eq!(desc.family, "MS Gothic");
        assert!(!FontDesc::new("Arial", 0, 0, false).vertical);
    }

    struct OneFace;

    impl GlyphProvider for OneFace {
        fn resolve(&mut self, _desc: &FontDesc, codepoint: Option<char>) -> Option<FaceId> {
            match codepoint {
                Some('あ') => Some(FaceId(1)),
                Some(_) => None,
                None => Some(FaceId(0)),
            }
        }

        fn glyph_index(&self, face: FaceId, codepoint: char) -> Option<u32> {
            match (face.0, codepoint) {
                (0, c) if c.is_ascii() => Some(c as u32),
                (1, 'あ') => Some(7),
                _ => None,
            }
        }

        fn get_glyph(&self, _: FaceId, _: u32, _: &GlyphRequest) -> Option<GlyphOutline> {
            None
        }

        fn get_kerning(&self, _: FaceId, _: u32, _: u32, _: f64) -> Vector {
            Vector::default()
        }

        fn get_ascent_descent(&self, _: FaceId, _: f64) -> (i32, i32) {
            (0, 0)
        }

        fn face_data(&self, _: FaceId) -> Option<FaceData> {
            None
        }
    }

    #[test]
    fn test_font_fallback_faces() {
        let mut provider = OneFace;
        let mut font = Font::new(FontDesc::new("Any", 0, 0, false), &mut provider);
        assert_eq!(font.glyph_for(&mut provider, 'A'), Some((FaceId(0), 65)));
        assert_eq!(font.glyph_for(&mut provider, 'あ'), Some((FaceId(1), 7)));
        assert_eq!(font.faces, vec![FaceId(0), FaceId(1)]);
        assert_eq!(font.glyph_for(&mut provider, 'ß'), None);
        assert_eq!(font.faces.len(), 2);
    }
}
