//! Rendering of a single event into positioned images
//!
//! The event text is read cluster by cluster with the render state captured
//! for each one, shaped, laid out, placed on the frame and rasterized. The
//! result still has to go through collision resolution.

use std::sync::Arc;

use log::debug;

use crate::cache::{
    BitmapKey, ClipMaskKey, DrawingOutlineKey, GlyphBitmapKey, GlyphOutlineKey, OutlineEntry, OutlineKey,
    RenderCache,
};
use crate::collision::{EventImages, ShiftDirection};
use crate::compositor::{blend_vector_clip, render_text, ClipRect, GlyphPaint, PaintArea};
use crate::font::{weight_from_bold, FontDesc, FontHandle, GlyphProvider, GlyphRequest, VERTICAL_LOWER_BOUND};
use crate::layout::transform::Transform3d;
use crate::layout::{align_lines, get_base_point, transform_3d, GlyphInfo, TextInfo};
use crate::pipeline::drawing::Drawing;
use crate::pipeline::state::{change_alpha, EventType, RenderState, ScrollDirection, TagContext, VectorClip};
use crate::pipeline::tag_parser::{apply_overrides, next_char};
use crate::raster::outline::Outline;
use crate::raster::{glyph_to_bitmap, outline_to_bitmap, GlyphBitmaps};
use crate::renderer::settings::{FrameGeometry, Settings};
use crate::shaping::{visual_order, Shaper, OBJECT_REPLACEMENT};
use crate::track::{Event, Track, VAlign, WrapStyle};
use crate::utils::math::{d6_to_double, double_to_d16, double_to_d6, int_to_d6, mult_alpha, DBBox, Vector};
use crate::utils::RenderError;

/// Bits of a 26.6 position below the pixel
const SUBPIXEL_MASK: i32 = 63;
/// Subpixel positions are rounded down to 1/8 pixel
const SUBPIXEL_ACCURACY: i32 = 7;

/// Everything one event render borrows from the renderer
pub(crate) struct EventContext<'a> {
    pub settings: &'a Settings,
    pub geometry: &'a FrameGeometry,
    pub track: &'a Track,
    pub now: i64,
    pub provider: &'a mut dyn GlyphProvider,
    pub shaper: &'a mut Shaper,
    pub cache: &'a mut RenderCache,
    pub text_info: &'a mut TextInfo,
}

/// Frame position of the first line's baseline, before aspect correction
#[derive(Debug, Clone, Copy)]
struct Device {
    x: f64,
    y: f64,
}

/// Render event `index` of the track at `ctx.now`
pub(crate) fn render_event(ctx: EventContext<'_>, index: usize) -> Result<EventImages, RenderError> {
    let EventContext {
        settings,
        geometry,
        track,
        now,
        provider,
        shaper,
        cache,
        text_info,
    } = ctx;

    let event = track
        .events
        .get(index)
        .ok_or_else(|| RenderError::InvalidInput(format!("no event at index {index}")))?;
    if event.style >= track.styles.len() {
        return Err(RenderError::StyleOutOfRange {
            index: event.style,
            count: track.styles.len(),
        });
    }
    if event.text.is_empty() {
        return Err(RenderError::EmptyEvent);
    }

    let tag_ctx = TagContext {
        track,
        event,
        now,
        play_res: (geometry.play_res_x, geometry.play_res_y),
        font_scale: geometry.font_scale,
        font_scale_x: geometry.font_scale_x,
    };
    let mut state = RenderState::new(&tag_ctx);

    text_info.clear();
    collect_glyphs(&mut state, &tag_ctx, geometry, cache, provider, text_info);
    if text_info.is_empty() {
        return Err(RenderError::NoGlyphs);
    }

    shaper.shape(text_info, &mut cache.fonts, provider, track.kerning);
    load_outlines(text_info, settings, cache, provider);
    apply_spacing(text_info, &*provider, track.kerning, geometry.font_scale);

    let (margin_l, margin_r, margin_v) = margins(track, event, state.style);
    text_info.layout_preliminary();
    text_info.process_karaoke_effects(now - event.start);

    let hscroll = state.evt_type == EventType::HScroll;
    let max_width = if hscroll {
        f64::MAX
    } else {
        geometry.x2scr(f64::from(geometry.play_res_x - margin_r)) - geometry.x2scr(f64::from(margin_l))
    };
    let wrap_style = if hscroll { WrapStyle::None } else { state.wrap_style };
    text_info.wrap_lines_smart(max_width, wrap_style, settings.line_spacing);
    let order = visual_order(text_info);
    text_info.reposition(&order, settings.line_spacing);
    if !hscroll {
        align_lines(text_info, max_width, state.alignment.h);
    }
    let bbox = text_info.compute_string_bbox();

    let device = place(&state, geometry, text_info, &bbox, margin_l, margin_v);
    let clip = map_clip(&state, geometry);
    let center = rotation_center(&state, geometry, device, &bbox);

    let paints = rasterize(text_info, geometry, cache, device, center);
    let area = PaintArea {
        width: geometry.width,
        height: geometry.height,
        clip,
        mode: state.clip_mode,
    };
    let mut images = render_text(&paints, &area, cache);
    if let Some(vector_clip) = &state.clip_drawing {
        apply_vector_clip(&mut images, vector_clip, settings, cache);
    }

    let font_scale_x = geometry.font_scale_x;
    let first_asc = text_info.lines.first().map_or(0.0, |l| l.asc);
    Ok(EventImages {
        event: index,
        layer: event.layer,
        read_order: event.read_order,
        top: (device.y - first_asc) as i32,
        height: text_info.height as i32,
        left: ((device.x + bbox.x_min) * font_scale_x + 0.5) as i32,
        width: (bbox.width() * font_scale_x + 0.5) as i32,
        detect_collisions: state.detect_collisions,
        shift_direction: if state.alignment.v == VAlign::Top {
            ShiftDirection::Down
        } else {
            ShiftDirection::Up
        },
        images,
    })
}

/// Event margins with zero values taken from the style in effect
fn margins(track: &Track, event: &Event, style: usize) -> (i32, i32, i32) {
    let style = &track.styles[style.min(track.styles.len() - 1)];
    let pick = |own: i32, fallback: i32| if own != 0 { own } else { fallback };
    (
        pick(event.margin_l, style.margin_l),
        pick(event.margin_r, style.margin_r),
        pick(event.margin_v, style.margin_v),
    )
}

/// Read the event text into clusters. Drawing text up to the next override
/// block becomes a single cluster.
fn collect_glyphs(
    state: &mut RenderState,
    ctx: &TagContext<'_>,
    geometry: &FrameGeometry,
    cache: &mut RenderCache,
    provider: &mut dyn GlyphProvider,
    text_info: &mut TextInfo,
) {
    let text = ctx.event.text.as_str();
    let mut pos = 0;
    let mut font: Option<FontHandle> = None;

    loop {
        apply_overrides(state, ctx, text, &mut pos);
        let (symbol, drawing) = if state.drawing_mode {
            let Some(rest) = text.get(pos..).filter(|r| !r.is_empty()) else {
                break;
            };
            let len = rest.find('{').unwrap_or(rest.len());
            if len == 0 {
                break;
            }
            let mut drawing = Drawing::from_text(&rest[..len], state.drawing_scale);
            drawing.scale_x = state.scale_x * geometry.font_scale;
            drawing.scale_y = state.scale_y * geometry.font_scale;
            drawing.pbo = state.pbo;
            pos += len;
            (OBJECT_REPLACEMENT, Some(drawing))
        } else {
            match next_char(state, ctx, text, &mut pos) {
                Some(ch) => (ch, None),
                None => break,
            }
        };

        if state.font_dirty || font.is_none() {
            let desc = FontDesc::new(&state.family, state.bold, state.italic, state.treat_family_as_pattern);
            font = Some(cache.fonts.get_or_insert(desc, provider));
            state.font_dirty = false;
        }
        let vertical = font
            .and_then(|h| cache.fonts.get(h))
            .is_some_and(|f| f.desc.vertical);

        let mut glyph = GlyphInfo::new(symbol);
        glyph.drawing = drawing;
        glyph.font = font;
        glyph.font_size = state.pixel_font_size(geometry.font_scale, geometry.height);
        glyph.c = state.c.map(|c| {
            let mut c = c;
            let a = mult_alpha(c & 0xFF, state.fade);
            change_alpha(&mut c, a, 1.0);
            c
        });
        glyph.effect_type = state.effect_type;
        glyph.effect_timing = state.effect_timing;
        glyph.effect_skip_timing = state.effect_skip_timing;
        glyph.be = state.be;
        glyph.blur = state.blur;
        glyph.shadow_x = state.shadow_x;
        glyph.shadow_y = state.shadow_y;
        glyph.frx = state.frx;
        glyph.fry = state.fry;
        glyph.frz = state.frz;
        glyph.fax = state.fax;
        glyph.fay = state.fay;
        glyph.scale_x = state.scale_x;
        glyph.scale_y = state.scale_y;
        glyph.border_x = state.border_x * geometry.border_scale;
        glyph.border_y = state.border_y * geometry.border_scale;
        glyph.border_style = state.border_style;
        glyph.hspacing = state.hspacing;
        glyph.weight = weight_from_bold(state.bold);
        glyph.italic = state.italic != 0;
        glyph.decoration = state.flags;
        glyph.rotate_vertical = vertical && symbol as u32 >= VERTICAL_LOWER_BOUND;
        text_info.push(glyph);

        state.effect_type = Default::default();
        state.effect_timing = 0;
        state.effect_skip_timing = 0;
    }
}

/// Fetch outlines for every glyph part, filling in advances, control boxes
/// and line metrics. Clusters without an outline keep zero width and take
/// their metrics from the primary face of their font.
fn load_outlines(
    text_info: &mut TextInfo,
    settings: &Settings,
    cache: &mut RenderCache,
    provider: &mut dyn GlyphProvider,
) {
    for glyph in &mut text_info.glyphs {
        let border_x = double_to_d6(glyph.border_x);
        let border_y = double_to_d6(glyph.border_y);

        if let Some(drawing) = &glyph.drawing {
            let key = OutlineKey::Drawing(DrawingOutlineKey {
                drawing: drawing.key(),
                scale: drawing.scale,
                scale_x: double_to_d16(drawing.scale_x),
                scale_y: double_to_d16(drawing.scale_y),
                pbo: double_to_d6(drawing.pbo),
                border_x,
                border_y,
                border_style: glyph.border_style,
            });
            let entry = match cache.get_outline(&key) {
                Some(entry) => Some(entry),
                None => match drawing.build(false) {
                    Ok(d) => Some(cache.store_outline(
                        key.clone(),
                        OutlineEntry::new(
                            d.outline,
                            Vector::new(d.advance, 0),
                            d.asc,
                            d.desc,
                            glyph.border_style,
                            border_x,
                            border_y,
                        ),
                    )),
                    Err(err) => {
                        debug!("skipping drawing: {err}");
                        None
                    }
                },
            };
            attach(glyph, 0, key, entry);
            continue;
        }

        let request = GlyphRequest {
            size: glyph.font_size,
            scale_x: glyph.scale_x,
            scale_y: glyph.scale_y,
            hinting: settings.hinting,
            decoration: glyph.decoration,
            weight: glyph.weight,
            italic: glyph.italic,
            rotate_vertical: glyph.rotate_vertical,
        };
        let scale_y = glyph.scale_y;
        let font_size = glyph.font_size;
        let count = 1 + glyph.siblings.len();
        for n in 0..count {
            let part = if n == 0 { &glyph.glyph } else { &glyph.siblings[n - 1] };
            let Some(face) = part.face else {
                continue;
            };
            let key = OutlineKey::Glyph(GlyphOutlineKey {
                face,
                glyph: part.glyph_index,
                size: double_to_d6(font_size),
                weight: glyph.weight,
                italic: glyph.italic,
                scale_x: double_to_d16(glyph.scale_x),
                scale_y: double_to_d16(scale_y),
                border_x,
                border_y,
                decoration: glyph.decoration,
                border_style: glyph.border_style,
                hinting: settings.hinting,
                vertical: glyph.rotate_vertical,
            });
            let entry = match cache.get_outline(&key) {
                Some(entry) => Some(entry),
                None => provider.get_glyph(face, part.glyph_index, &request).map(|go| {
                    let (asc, desc) = provider.get_ascent_descent(face, font_size);
                    let entry = OutlineEntry::new(
                        go.outline,
                        go.advance,
                        (f64::from(asc) * scale_y) as i32,
                        (f64::from(desc) * scale_y) as i32,
                        glyph.border_style,
                        border_x,
                        border_y,
                    );
                    cache.store_outline(key.clone(), entry)
                }),
            };
            if entry.is_none() {
                debug!("no outline for glyph {} of U+{:04X}", part.glyph_index, glyph.symbol as u32);
            }
            attach(glyph, n, key, entry);
        }

        if glyph.glyph.outline.is_none() {
            let primary = glyph
                .font
                .and_then(|h| cache.fonts.get(h))
                .and_then(|f| f.primary());
            if let Some(face) = primary {
                let (asc, desc) = provider.get_ascent_descent(face, font_size);
                glyph.asc = (f64::from(asc) * scale_y) as i32;
                glyph.desc = (f64::from(desc) * scale_y) as i32;
            }
        }
    }
}

/// Store outline `entry` on part `n` of a cluster and derive the cluster
/// metrics from its parts
fn attach(glyph: &mut GlyphInfo, n: usize, key: OutlineKey, entry: Option<Arc<OutlineEntry>>) {
    let shaped = glyph.shaped;
    let part = if n == 0 {
        &mut glyph.glyph
    } else {
        &mut glyph.siblings[n - 1]
    };
    part.outline_key = Some(key);
    if let Some(entry) = &entry {
        if !shaped {
            part.advance = entry.advance;
        }
    }
    part.outline = entry;

    if n == 0 {
        if let Some(entry) = &glyph.glyph.outline {
            glyph.bbox = entry.bbox;
            glyph.asc = entry.asc;
            glyph.desc = entry.desc;
        }
    }
    glyph.cluster_advance = glyph.parts().fold(Vector::default(), |acc, p| {
        Vector::new(acc.x + p.advance.x, acc.y + p.advance.y)
    });
}

/// Kerning, italic correction, letter spacing and vertical shear drift,
/// folded into the cluster advances
fn apply_spacing(text_info: &mut TextInfo, provider: &dyn GlyphProvider, kerning: bool, font_scale: f64) {
    let glyphs = &mut text_info.glyphs;
    for i in 0..glyphs.len() {
        if i > 0 {
            let (prev, cur) = glyphs.split_at_mut(i);
            let prev_glyph = &mut prev[i - 1];
            let cur = &cur[0];

            if kerning && !prev_glyph.shaped && !cur.shaped && prev_glyph.drawing.is_none() && cur.drawing.is_none() {
                if let (Some(a), Some(b)) = (prev_glyph.glyph.face, cur.glyph.face) {
                    if a == b {
                        let delta = provider.get_kerning(a, prev_glyph.glyph.glyph_index, cur.glyph.glyph_index, cur.font_size);
                        prev_glyph.cluster_advance.x += (f64::from(delta.x) * cur.scale_x) as i32;
                        prev_glyph.cluster_advance.y += (f64::from(delta.y) * cur.scale_y) as i32;
                    }
                }
            }

            if prev_glyph.italic && !cur.italic {
                let mut back = i - 1;
                while back > 0 && prev[back].bbox.width() == 0 && prev[back].italic {
                    back -= 1;
                }
                let og = &prev[back];
                if og.bbox.x_max > og.cluster_advance.x {
                    let extra = (f64::from(og.bbox.y_max) * 0.375) as i32;
                    prev[i - 1].cluster_advance.x += extra;
                }
            }
        }

        let glyph = &mut glyphs[i];
        if glyph.symbol == '\n' {
            continue;
        }
        let advance_x = glyph.cluster_advance.x;
        glyph.cluster_advance.x += double_to_d6(glyph.hspacing * font_scale * glyph.scale_x);
        if glyph.fay != 0.0 && glyph.scale_x != 0.0 {
            glyph.cluster_advance.y += (glyph.fay / glyph.scale_x * glyph.scale_y * f64::from(advance_x)) as i32;
        }
    }
}

/// Frame position of the text block
fn place(
    state: &RenderState,
    geometry: &FrameGeometry,
    text_info: &TextInfo,
    bbox: &DBBox,
    margin_l: i32,
    margin_v: i32,
) -> Device {
    let first_asc = text_info.lines.first().map_or(0.0, |l| l.asc);
    let play_res_x = f64::from(geometry.play_res_x);
    let play_res_y = f64::from(geometry.play_res_y);

    let x = match (state.evt_type, state.scroll_direction) {
        (EventType::HScroll, ScrollDirection::RightToLeft) => geometry.x2scr(play_res_x - state.scroll_shift),
        (EventType::HScroll, ScrollDirection::LeftToRight) => {
            geometry.x2scr(state.scroll_shift) - bbox.width()
        }
        _ => geometry.x2scr(f64::from(margin_l)),
    };

    let y = match (state.evt_type, state.scroll_direction) {
        (EventType::VScroll, ScrollDirection::TopToBottom) => {
            geometry.y2scr(state.clip_y0 + state.scroll_shift) - bbox.height()
        }
        (EventType::VScroll, ScrollDirection::BottomToTop) => geometry.y2scr(state.clip_y1 - state.scroll_shift),
        _ => match state.alignment.v {
            VAlign::Top => geometry.y2scr_top(f64::from(margin_v)) + first_asc,
            VAlign::Center => geometry.y2scr(play_res_y / 2.0) - (bbox.y_max + bbox.y_min) / 2.0,
            VAlign::Sub => {
                geometry.y2scr_sub(play_res_y - f64::from(margin_v)) - text_info.height + first_asc
            }
        },
    };

    if state.evt_type == EventType::Positioned {
        let base = get_base_point(bbox, state.alignment);
        return Device {
            x: geometry.x2scr_pos(state.pos.x) - base.x,
            y: geometry.y2scr_pos(state.pos.y) - base.y,
        };
    }
    Device { x, y }
}

/// Clip rectangle in frame pixels; the vertical mapping of text placed by
/// margins depends on its alignment
fn map_clip(state: &RenderState, geometry: &FrameGeometry) -> ClipRect {
    let c = &state.clip;
    let (x0, x1, y0, y1) = if state.evt_type == EventType::Positioned {
        (
            geometry.x2scr_pos_scaled(c.x_min),
            geometry.x2scr_pos_scaled(c.x_max),
            geometry.y2scr_pos(c.y_min),
            geometry.y2scr_pos(c.y_max),
        )
    } else {
        let map_y = |y: f64| match state.alignment.v {
            VAlign::Top => geometry.y2scr_top(y),
            VAlign::Center => geometry.y2scr(y),
            VAlign::Sub => geometry.y2scr_sub(y),
        };
        (
            geometry.x2scr_scaled(c.x_min),
            geometry.x2scr_scaled(c.x_max),
            map_y(c.y_min),
            map_y(c.y_max),
        )
    };
    ClipRect::new(x0 as i32, y0 as i32, x1 as i32, y1 as i32)
}

/// Rotation center: the `\org` point, or the alignment anchor of the text
fn rotation_center(state: &RenderState, geometry: &FrameGeometry, device: Device, bbox: &DBBox) -> Device {
    if state.have_origin {
        Device {
            x: geometry.x2scr(state.org.x),
            y: geometry.y2scr(state.org.y),
        }
    } else {
        let base = get_base_point(bbox, state.alignment);
        Device {
            x: device.x + base.x,
            y: device.y + base.y,
        }
    }
}

/// Rasterize every visible glyph part and describe how to paint it
fn rasterize(
    text_info: &TextInfo,
    geometry: &FrameGeometry,
    cache: &mut RenderCache,
    device: Device,
    center: Device,
) -> Vec<GlyphPaint> {
    let font_scale_x = geometry.font_scale_x;
    let device_x = device.x * font_scale_x;
    let device_y = device.y;
    let dst_x = device_x as i32;
    let dst_y = device_y as i32;
    let mut paints = Vec::with_capacity(text_info.len());

    for glyph in text_info.glyphs.iter().filter(|g| !g.skip && g.symbol != '\n') {
        let transform = Transform3d {
            frx: glyph.frx,
            fry: glyph.fry,
            frz: glyph.frz,
            fax: glyph.fax * glyph.scale_x,
            fay: glyph.fay * glyph.scale_y,
        };

        let shadow_x = glyph.shadow_x * geometry.border_scale;
        let shadow_y = glyph.shadow_y * geometry.border_scale;
        let shadow_offset = Vector::new(
            double_to_d6(shadow_x - shadow_x.trunc()),
            double_to_d6(shadow_y - shadow_y.trunc()),
        );

        for part in glyph.parts() {
            let (Some(entry), Some(outline_key)) = (&part.outline, &part.outline_key) else {
                continue;
            };
            let shift = if transform.is_identity() {
                Vector::default()
            } else {
                Vector::new(
                    part.pos.x + double_to_d6(device.x - center.x),
                    -(part.pos.y + double_to_d6(device.y - center.y)),
                )
            };
            let pos_x = (f64::from(part.pos.x) * font_scale_x) as i32;
            let advance = Vector::new(
                double_to_d6(device_x - device_x.trunc() + d6_to_double(pos_x & SUBPIXEL_MASK)) & !SUBPIXEL_ACCURACY,
                double_to_d6(device_y - device_y.trunc() + d6_to_double(part.pos.y & SUBPIXEL_MASK))
                    & !SUBPIXEL_ACCURACY,
            );

            let key = BitmapKey::Glyph(GlyphBitmapKey {
                outline: outline_key.clone(),
                frx: double_to_d16(glyph.frx),
                fry: double_to_d16(glyph.fry),
                frz: double_to_d16(glyph.frz),
                fax: double_to_d16(glyph.fax),
                fay: double_to_d16(glyph.fay),
                be: glyph.be,
                blur: double_to_d16(glyph.blur),
                shadow_offset,
                advance,
                shift,
            });
            let bitmaps = match cache.get_bitmaps(&key) {
                Some(bitmaps) => bitmaps,
                None => {
                    let mut fill = entry.outline.clone();
                    let mut border = entry.border.clone();
                    {
                        let mut layers: Vec<&mut Outline> =
                            std::iter::once(&mut fill).chain(border.iter_mut()).collect();
                        transform_3d(shift, &mut layers, transform, geometry.font_scale, glyph.asc);
                        for layer in layers {
                            if font_scale_x != 1.0 {
                                layer.transform(font_scale_x, 0.0, 0.0, 1.0);
                            }
                            layer.translate(advance.x, -advance.y);
                        }
                    }
                    match glyph_to_bitmap(
                        &fill,
                        &border,
                        glyph.be,
                        glyph.blur * geometry.border_scale,
                        shadow_offset,
                        glyph.border_style,
                    ) {
                        Ok(bitmaps) => cache.store_bitmaps(key, bitmaps),
                        Err(err) => {
                            debug!("glyph U+{:04X} left blank: {err}", glyph.symbol as u32);
                            continue;
                        }
                    }
                }
            };

            let pen = Vector::new(dst_x + (pos_x >> 6), dst_y + (part.pos.y >> 6));
            let offset_x = (part.pos.x - glyph.pos.x) >> 6;
            let invisible_fill = entry.border.is_empty() && glyph.c[0] & 0xFF == 0xFF;
            paints.push(GlyphPaint {
                bitmaps,
                pen,
                shadow_pen: Vector::new(pen.x + shadow_x as i32, pen.y + shadow_y as i32),
                has_shadow: (shadow_x != 0.0 || shadow_y != 0.0) && !invisible_fill,
                c: glyph.c,
                effect: glyph.effect_type,
                split: glyph.karaoke_split - offset_x,
                right: entry.bbox.x_max >> 6,
            });
        }
    }
    paints
}

/// Rasterize the vector clip, cached by its drawing, and blend it into the
/// images
fn apply_vector_clip(
    images: &mut Vec<crate::compositor::Image>,
    clip: &VectorClip,
    settings: &Settings,
    cache: &mut RenderCache,
) {
    let drawing = &clip.drawing;
    let origin = Vector::new(settings.left_margin, settings.top_margin);
    let mask_key = ClipMaskKey {
        drawing: drawing.key(),
        scale: drawing.scale,
        scale_x: double_to_d16(drawing.scale_x),
        scale_y: double_to_d16(drawing.scale_y),
        origin,
    };
    let key = BitmapKey::Clip(mask_key.clone());
    let mask = match cache.get_bitmaps(&key) {
        Some(mask) => mask,
        None => {
            let outline = drawing.build(true).and_then(|mut d| {
                d.outline.translate(int_to_d6(origin.x), -int_to_d6(origin.y));
                outline_to_bitmap(&[&d.outline], 0)
            });
            match outline {
                Ok(bitmap) => cache.store_bitmaps(
                    key,
                    GlyphBitmaps {
                        fill: Some(Arc::new(bitmap)),
                        ..GlyphBitmaps::default()
                    },
                ),
                Err(err) => {
                    debug!("ignoring vector clip: {err}");
                    return;
                }
            }
        }
    };
    if let Some(mask) = &mask.fill {
        blend_vector_clip(images, mask, &mask_key, clip.inverse, cache);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LineBreak;
    use crate::track::{Alignment, HAlign, Style};
    use pretty_assertions::assert_eq;

    fn track() -> Track {
        let mut track = Track::new(384, 288);
        track.styles.push(Style {
            margin_l: 10,
            margin_r: 20,
            margin_v: 30,
            ..Style::default()
        });
        track
    }

    #[test]
    fn test_margins_fall_back_to_style() {
        let track = track();
        let mut event = Event::new(0, 1000, "x");
        event.margin_r = 5;
        assert_eq!(margins(&track, &event, 0), (10, 5, 30));
    }

    #[test]
    fn test_spacing_adds_letter_spacing_and_kerning() {
        struct Kerned;
        impl GlyphProvider for Kerned {
            fn resolve(&mut self, _: &FontDesc, _: Option<char>) -> Option<crate::font::FaceId> {
                None
            }
            fn glyph_index(&self, _: crate::font::FaceId, _: char) -> Option<u32> {
                None
            }
            fn get_glyph(&self, _: crate::font::FaceId, _: u32, _: &GlyphRequest) -> Option<crate::font::GlyphOutline> {
                None
            }
            fn get_kerning(&self, _: crate::font::FaceId, _: u32, _: u32, _: f64) -> Vector {
                Vector::new(-64, 0)
            }
            fn get_ascent_descent(&self, _: crate::font::FaceId, _: f64) -> (i32, i32) {
                (0, 0)
            }
            fn face_data(&self, _: crate::font::FaceId) -> Option<crate::font::FaceData> {
                None
            }
        }

        let mut info = TextInfo::new();
        for ch in ['A', 'V'] {
            let mut glyph = GlyphInfo::new(ch);
            glyph.glyph.face = Some(crate::font::FaceId(0));
            glyph.cluster_advance = Vector::new(640, 0);
            glyph.hspacing = 1.0;
            info.push(glyph);
        }
        apply_spacing(&mut info, &Kerned, true, 2.0);
        assert_eq!(info.glyphs[0].cluster_advance.x, 640 - 64 + 128);
        assert_eq!(info.glyphs[1].cluster_advance.x, 640 + 128);

        let mut plain = info.clone();
        plain.glyphs.iter_mut().for_each(|g| g.cluster_advance = Vector::new(640, 0));
        apply_spacing(&mut plain, &Kerned, false, 2.0);
        assert_eq!(plain.glyphs[0].cluster_advance.x, 640 + 128);
    }

    #[test]
    fn test_italic_to_upright_gets_room() {
        let mut info = TextInfo::new();
        let mut italic = GlyphInfo::new('f');
        italic.italic = true;
        italic.cluster_advance = Vector::new(320, 0);
        italic.bbox = crate::utils::math::BBox::new(0, 0, 400, 640);
        info.push(italic);
        info.push(GlyphInfo::new('x'));
        apply_spacing(&mut info, &NoKerning, false, 1.0);
        assert_eq!(info.glyphs[0].cluster_advance.x, 320 + 240);
    }

    struct NoKerning;
    impl GlyphProvider for NoKerning {
        fn resolve(&mut self, _: &FontDesc, _: Option<char>) -> Option<crate::font::FaceId> {
            None
        }
        fn glyph_index(&self, _: crate::font::FaceId, _: char) -> Option<u32> {
            None
        }
        fn get_glyph(&self, _: crate::font::FaceId, _: u32, _: &GlyphRequest) -> Option<crate::font::GlyphOutline> {
            None
        }
        fn get_kerning(&self, _: crate::font::FaceId, _: u32, _: u32, _: f64) -> Vector {
            Vector::default()
        }
        fn get_ascent_descent(&self, _: crate::font::FaceId, _: f64) -> (i32, i32) {
            (0, 0)
        }
        fn face_data(&self, _: crate::font::FaceId) -> Option<crate::font::FaceData> {
            None
        }
    }

    fn geometry(track: &Track) -> FrameGeometry {
        let settings = Settings {
            frame_width: 384,
            frame_height: 288,
            ..Settings::default()
        };
        FrameGeometry::new(&settings, track)
    }

    fn laid_out(height: f64, asc: f64) -> TextInfo {
        let mut info = TextInfo::new();
        let mut glyph = GlyphInfo::new('x');
        glyph.linebreak = LineBreak::None;
        info.push(glyph);
        info.rebuild_lines();
        info.lines[0].asc = asc;
        info.lines[0].desc = height - asc;
        info.height = height;
        info
    }

    #[test]
    fn test_bottom_aligned_sits_on_margin() {
        let track = track();
        let geometry = geometry(&track);
        let event = Event::new(0, 1000, "x");
        let ctx = TagContext {
            track: &track,
            event: &event,
            now: 0,
            play_res: (384, 288),
            font_scale: 1.0,
            font_scale_x: 1.0,
        };
        let state = RenderState::new(&ctx);
        let info = laid_out(20.0, 16.0);
        let bbox = DBBox::new(0.0, -16.0, 100.0, 4.0);
        let device = place(&state, &geometry, &info, &bbox, 10, 30);
        assert_eq!(device.x, 10.0);
        // baseline: 288 - 30 - 20 + 16
        assert_eq!(device.y, 254.0);
    }

    #[test]
    fn test_positioned_uses_anchor() {
        let track = track();
        let geometry = geometry(&track);
        let event = Event::new(0, 1000, "x");
        let ctx = TagContext {
            track: &track,
            event: &event,
            now: 0,
            play_res: (384, 288),
            font_scale: 1.0,
            font_scale_x: 1.0,
        };
        let mut state = RenderState::new(&ctx);
        state.evt_type = EventType::Positioned;
        state.pos = crate::utils::math::DVector::new(100.0, 50.0);
        state.alignment = Alignment {
            h: HAlign::Center,
            v: VAlign::Center,
        };
        let info = laid_out(20.0, 16.0);
        let bbox = DBBox::new(0.0, -16.0, 40.0, 4.0);
        let device = place(&state, &geometry, &info, &bbox, 0, 0);
        assert_eq!((device.x, device.y), (80.0, 56.0));
        let clip = map_clip(&state, &geometry);
        assert_eq!(clip, ClipRect::new(0, 0, 384, 288));
    }
}
