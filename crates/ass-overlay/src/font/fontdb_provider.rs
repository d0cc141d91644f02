//! Glyph provider backed by `fontdb` for matching and `ttf-parser` for
//! outlines and metrics

use std::sync::Arc;

use ahash::AHashMap;
use ttf_parser::{Face, GlyphId, OutlineBuilder};

use super::{units_scale, FaceData, FaceId, FontDesc, GlyphOutline, GlyphProvider, GlyphRequest};
use crate::raster::outline::{Orientation, Outline, PointTag};
use crate::utils::math::{double_to_d6, BBox, Vector};
use crate::utils::RenderError;

/// Slant of synthetic italics
const OBLIQUE_SHEAR: f64 = 0.2126;

#[derive(Clone)]
struct LoadedFace {
    data: Arc<dyn AsRef<[u8]> + Send + Sync>,
    index: u32,
    weight: u16,
    italic: bool,
}

/// Font provider over a `fontdb` database
pub struct FontDbProvider {
    db: fontdb::Database,
    faces: Vec<LoadedFace>,
    loaded: AHashMap<fontdb::ID, FaceId>,
    default_font: Option<fontdb::ID>,
    default_family: Option<String>,
}

impl std::fmt::Debug for FontDbProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontDbProvider")
            .field("database_faces", &self.db.len())
            .field("loaded_faces", &self.faces.len())
            .field("default_family", &self.default_family)
            .finish()
    }
}

impl Default for FontDbProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FontDbProvider {
    /// Create a provider; with the `system-fonts` feature the installed
    /// system fonts are loaded
    pub fn new() -> Self {
        #[allow(unused_mut)]
        let mut db = fontdb::Database::new();
        #[cfg(feature = "system-fonts")]
        db.load_system_fonts();
        log::debug!("font database holds {} faces", db.len());
        Self::from_database(db)
    }

    /// Create a provider over an existing database
    pub fn from_database(db: fontdb::Database) -> Self {
        Self {
            db,
            faces: Vec::new(),
            loaded: AHashMap::new(),
            default_font: None,
            default_family: None,
        }
    }

    /// Register a font from memory (embedded or attached fonts)
    pub fn add_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
    }

    /// Register a font file
    pub fn add_font_file(&mut self, path: impl AsRef<std::path::Path>) -> Result<(), RenderError> {
        self.db
            .load_font_file(path.as_ref())
            .map_err(|e| RenderError::FontError(format!("Failed to load font file: {e}")))
    }

    /// Underlying database
    pub fn database(&self) -> &fontdb::Database {
        &self.db
    }

    fn query(&self, desc: &FontDesc) -> Option<fontdb::ID> {
        let style = if desc.italic {
            fontdb::Style::Italic
        } else {
            fontdb::Style::Normal
        };
        if desc.treat_family_as_pattern {
            let pattern = desc.family.to_lowercase();
            let found = self.db.faces().find(|info| {
                info.families
                    .iter()
                    .any(|(name, _)| name.to_lowercase().contains(&pattern))
            });
            if let Some(info) = found {
                return Some(info.id);
            }
        }

        let mut families = vec![fontdb::Family::Name(&desc.family)];
        if let Some(default) = self.default_family.as_deref() {
            families.push(fontdb::Family::Name(default));
        }
        families.push(fontdb::Family::SansSerif);
        let query = fontdb::Query {
            families: &families,
            weight: fontdb::Weight(desc.weight),
            stretch: fontdb::Stretch::Normal,
            style,
        };
        self.db
            .query(&query)
            .or(self.default_font)
            .or_else(|| self.db.faces().next().map(|info| info.id))
    }

    fn covers(&self, id: fontdb::ID, codepoint: char) -> bool {
        self.db
            .with_face_data(id, |data, index| {
                Face::parse(data, index)
                    .ok()
                    .and_then(|face| face.glyph_index(codepoint))
                    .is_some()
            })
            .unwrap_or(false)
    }

    fn load(&mut self, id: fontdb::ID) -> Option<FaceId> {
        if let Some(&face) = self.loaded.get(&id) {
            return Some(face);
        }
        let (source, index) = self.db.face_source(id)?;
        let data: Arc<dyn AsRef<[u8]> + Send + Sync> = match source {
            fontdb::Source::Binary(data) => data,
            fontdb::Source::File(path) => match std::fs::read(&path) {
                Ok(bytes) => Arc::new(bytes),
                Err(e) => {
                    log::warn!("failed to read font file {}: {e}", path.display());
                    return None;
                }
            },
            fontdb::Source::SharedFile(_, data) => data,
        };
        let info = self.db.face(id)?;
        let face = FaceId(self.faces.len() as u32);
        self.faces.push(LoadedFace {
            data,
            index,
            weight: info.weight.0,
            italic: info.style != fontdb::Style::Normal,
        });
        self.loaded.insert(id, face);
        Some(face)
    }

    fn with_face<T>(&self, face: FaceId, f: impl FnOnce(&Face<'_>, &LoadedFace) -> Option<T>) -> Option<T> {
        let loaded = self.faces.get(face.0 as usize)?;
        let parsed = Face::parse((*loaded.data).as_ref(), loaded.index).ok()?;
        f(&parsed, loaded)
    }
}

impl GlyphProvider for FontDbProvider {
    fn resolve(&mut self, desc: &FontDesc, codepoint: Option<char>) -> Option<FaceId> {
        let primary = self.query(desc)?;
        let Some(ch) = codepoint else {
            return self.load(primary);
        };
        if self.covers(primary, ch) {
            return self.load(primary);
        }
        let fallback = self
            .db
            .faces()
            .map(|info| info.id)
            .find(|&id| self.covers(id, ch));
        match fallback {
            Some(id) => {
                log::debug!("fallback face for U+{:04X} in family {}", ch as u32, desc.family);
                self.load(id)
            }
            None => {
                log::debug!("no face covers U+{:04X}", ch as u32);
                None
            }
        }
    }

    fn glyph_index(&self, face: FaceId, codepoint: char) -> Option<u32> {
        self.with_face(face, |parsed, _| parsed.glyph_index(codepoint).map(|g| u32::from(g.0)))
    }

    fn get_glyph(&self, face: FaceId, glyph: u32, request: &GlyphRequest) -> Option<GlyphOutline> {
        self.with_face(face, |parsed, loaded| {
            let gid = GlyphId(u16::try_from(glyph).ok()?);
            let scale = units_scale(parsed, request.size);
            let sx = scale * request.scale_x * 64.0;
            let sy = scale * request.scale_y * 64.0;

            let mut builder = OutlineCollector {
                outline: Outline::new(),
                sx,
                sy,
            };
            // Glyphs without contours (spaces) still have an advance
            let _ = parsed.outline_glyph(gid, &mut builder);
            let mut outline = builder.outline;
            outline.close_contour();

            let mut advance = Vector::new(
                (f64::from(parsed.glyph_hor_advance(gid).unwrap_or(0)) * sx).round() as i32,
                0,
            );

            if request.italic && !loaded.italic {
                outline.transform(1.0, OBLIQUE_SHEAR, 0.0, 1.0);
            }
            if request.weight > 400 && loaded.weight < 600 {
                let strength = double_to_d6(f64::from(parsed.units_per_em()) * scale) / 64;
                outline.embolden(strength, strength);
                advance.x += strength;
            }

            if request.rotate_vertical {
                let (_, desc) = ascent_descent(parsed, request.size);
                let vert_advance = parsed
                    .glyph_ver_advance(gid)
                    .map_or_else(|| double_to_d6(request.size), |adv| (f64::from(adv) * sy) as i32);
                outline.translate(0, -desc);
                outline.transform(0.0, -1.0, 1.0, 0.0);
                outline.translate(vert_advance, desc);
                advance = Vector::new(vert_advance, 0);
            }

            let bbox = outline.cbox();
            if request.decoration.underline || request.decoration.strike_out {
                add_decorations(parsed, request, scale, advance.x, bbox, &mut outline);
            }

            Some(GlyphOutline {
                bbox: outline.cbox(),
                outline,
                advance,
            })
        })
    }

    fn get_kerning(&self, face: FaceId, left: u32, right: u32, size: f64) -> Vector {
        self.with_face(face, |parsed, _| {
            let left = GlyphId(u16::try_from(left).ok()?);
            let right = GlyphId(u16::try_from(right).ok()?);
            let kern = parsed.tables().kern?;
            let value = kern
                .subtables
                .into_iter()
                .filter(|st| st.horizontal && !st.variable)
                .find_map(|st| st.glyphs_kerning(left, right))?;
            let scale = units_scale(parsed, size);
            Some(Vector::new(double_to_d6(f64::from(value) * scale), 0))
        })
        .unwrap_or_default()
    }

    fn get_ascent_descent(&self, face: FaceId, size: f64) -> (i32, i32) {
        self.with_face(face, |parsed, _| Some(ascent_descent(parsed, size)))
            .unwrap_or((double_to_d6(size * 0.8), double_to_d6(size * 0.2)))
    }

    fn face_data(&self, face: FaceId) -> Option<FaceData> {
        let loaded = self.faces.get(face.0 as usize)?;
        Some(FaceData {
            data: Arc::clone(&loaded.data),
            index: loaded.index,
        })
    }

    fn set_defaults(&mut self, default_font: Option<&str>, default_family: Option<&str>) {
        self.default_family = default_family.map(str::to_string);
        self.default_font = default_font.and_then(|name| {
            let before = self.db.len();
            if let Err(e) = self.db.load_font_file(name) {
                log::warn!("failed to load default font {name}: {e}");
                return None;
            }
            self.db.faces().nth(before).map(|info| info.id)
        });
    }
}

fn ascent_descent(face: &Face<'_>, size: f64) -> (i32, i32) {
    let scale = units_scale(face, size) * 64.0;
    let (asc, desc) = match face.tables().os2 {
        Some(os2) => (
            i32::from(os2.windows_ascender()),
            i32::from(os2.windows_descender()).abs(),
        ),
        None => (i32::from(face.ascender()), -i32::from(face.descender())),
    };
    (
        (f64::from(asc) * scale) as i32,
        (f64::from(desc) * scale) as i32,
    )
}

fn add_decorations(
    face: &Face<'_>,
    request: &GlyphRequest,
    scale: f64,
    advance: i32,
    bbox: BBox,
    outline: &mut Outline,
) {
    let y_scale = scale * request.scale_y * 64.0;
    let left = bbox.x_min.min(0);
    let right = advance + 32;
    let clockwise = outline.orientation() == Orientation::Clockwise;

    let mut rect = |center: f64, thickness: f64| {
        let half = (thickness / 2.0).max(32.0);
        let top = (center + half) as i32;
        let bottom = (center - half) as i32;
        let mut corners = [
            Vector::new(left, top),
            Vector::new(right, top),
            Vector::new(right, bottom),
            Vector::new(left, bottom),
        ];
        if !clockwise {
            corners.reverse();
        }
        for corner in corners {
            outline.add_point(corner, PointTag::On);
        }
        outline.close_contour();
    };

    let em = f64::from(face.units_per_em());
    if request.decoration.underline {
        let metrics = face.underline_metrics();
        let pos = metrics.map_or(-em * 0.1, |m| f64::from(m.position));
        let thickness = metrics.map_or(em / 20.0, |m| f64::from(m.thickness));
        rect(pos * y_scale, thickness * y_scale);
    }
    if request.decoration.strike_out {
        let metrics = face.strikeout_metrics();
        let pos = metrics.map_or(em * 0.25, |m| f64::from(m.position));
        let thickness = metrics.map_or(em / 20.0, |m| f64::from(m.thickness));
        rect(pos * y_scale, thickness * y_scale);
    }
}

struct OutlineCollector {
    outline: Outline,
    sx: f64,
    sy: f64,
}

impl OutlineCollector {
    fn point(&self, x: f32, y: f32) -> Vector {
        Vector::new(
            (f64::from(x) * self.sx).round() as i32,
            (f64::from(y) * self.sy).round() as i32,
        )
    }
}

impl OutlineBuilder for OutlineCollector {
    fn move_to(&mut self, x: f32, y: f32) {
        self.outline.close_contour();
        let p = self.point(x, y);
        self.outline.add_point(p, PointTag::On);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let p = self.point(x, y);
        self.outline.add_point(p, PointTag::On);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let c = self.point(x1, y1);
        let p = self.point(x, y);
        self.outline.add_point(c, PointTag::Conic);
        self.outline.add_point(p, PointTag::On);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let c1 = self.point(x1, y1);
        let c2 = self.point(x2, y2);
        let p = self.point(x, y);
        self.outline.add_point(c1, PointTag::Cubic);
        self.outline.add_point(c2, PointTag::Cubic);
        self.outline.add_point(p, PointTag::On);
    }

    fn close(&mut self) {
        self.outline.close_contour();
    }
}
