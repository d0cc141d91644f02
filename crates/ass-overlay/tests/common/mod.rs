//! Shared fixtures: a glyph provider whose glyphs are plain boxes, so
//! rendered positions can be computed by hand

#![allow(dead_code)]

use ass_overlay::font::{FaceData, FaceId, FontDesc, GlyphOutline, GlyphProvider, GlyphRequest};
use ass_overlay::raster::{Outline, PointTag};
use ass_overlay::utils::math::{double_to_d6, BBox, Vector};
use ass_overlay::{Image, Renderer, Style, Track};

/// Every printable glyph is a box from 10% to 40% of the font size wide
/// and 70% tall, with an advance of half the font size. Ascender and
/// descender are 80% and 20% of the size.
#[derive(Debug, Default)]
pub struct BoxGlyphs;

impl GlyphProvider for BoxGlyphs {
    fn resolve(&mut self, _desc: &FontDesc, _codepoint: Option<char>) -> Option<FaceId> {
        Some(FaceId(0))
    }

    fn glyph_index(&self, _face: FaceId, codepoint: char) -> Option<u32> {
        (!codepoint.is_control()).then_some(codepoint as u32)
    }

    fn get_glyph(&self, _face: FaceId, glyph: u32, request: &GlyphRequest) -> Option<GlyphOutline> {
        let sx = request.size * request.scale_x;
        let sy = request.size * request.scale_y;
        let mut outline = Outline::new();
        if glyph != u32::from(' ') {
            let (x0, x1) = (double_to_d6(sx * 0.1), double_to_d6(sx * 0.4));
            let top = double_to_d6(sy * 0.7);
            for (x, y) in [(x0, 0), (x0, top), (x1, top), (x1, 0)] {
                outline.add_point(Vector::new(x, y), PointTag::On);
            }
            outline.close_contour();
        }
        let bbox = if outline.is_empty() { BBox::default() } else { outline.cbox() };
        Some(GlyphOutline {
            outline,
            advance: Vector::new(double_to_d6(sx * 0.5), 0),
            bbox,
        })
    }

    fn get_kerning(&self, _face: FaceId, _left: u32, _right: u32, _size: f64) -> Vector {
        Vector::default()
    }

    fn get_ascent_descent(&self, _face: FaceId, size: f64) -> (i32, i32) {
        (double_to_d6(size * 0.8), double_to_d6(size * 0.2))
    }

    fn face_data(&self, _face: FaceId) -> Option<FaceData> {
        None
    }
}

/// Install the test logger
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Renderer over [`BoxGlyphs`] with a `width` by `height` frame
pub fn renderer(width: i32, height: i32) -> Renderer {
    init_logging();
    let mut renderer = Renderer::new(Box::new(BoxGlyphs)).expect("renderer");
    renderer.set_frame_size(width, height);
    renderer
}

/// Style with a 20 px font, no border, no shadow and no margins
pub fn plain_style() -> Style {
    Style {
        font_size: 20.0,
        outline: 0.0,
        shadow: 0.0,
        margin_l: 0,
        margin_r: 0,
        margin_v: 0,
        ..Style::default()
    }
}

/// 384x288 track with [`plain_style`]
pub fn track() -> Track {
    let mut track = Track::new(384, 288);
    track.styles.push(plain_style());
    track
}

/// Frame rectangle `(x0, y0, x1, y1)` covered by `images`
pub fn union(images: &[Image]) -> (i32, i32, i32, i32) {
    images.iter().fold((i32::MAX, i32::MAX, i32::MIN, i32::MIN), |(x0, y0, x1, y1), i| {
        (x0.min(i.dst_x), y0.min(i.dst_y), x1.max(i.dst_x + i.w), y1.max(i.dst_y + i.h))
    })
}
