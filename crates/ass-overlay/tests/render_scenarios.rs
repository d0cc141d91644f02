mod common;

use ass_overlay::{ChangeKind, Event, Frame};
use common::{renderer, track, union};
use pretty_assertions::assert_eq;

const PRIMARY: u32 = 0xFFFF_FF00;
const SECONDARY: u32 = 0x00FF_FF00;

#[test]
fn test_centered_text_sits_at_frame_center() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(0, 5000, r"{\an5}Hello"));

    let images = renderer.render_frame(&track, 1000);
    assert_eq!(images.len(), 5);

    // glyph boxes cover 70% of the 80% + 20% line box, so the vertical
    // center of the ink sits one pixel above the line box center
    let (x0, y0, x1, y1) = union(&images);
    assert!(((x0 + x1) / 2 - 192).abs() <= 1, "x {x0}..{x1}");
    assert!(((y0 + y1) / 2 - 144).abs() <= 1, "y {y0}..{y1}");
    assert_eq!((y0, y1), (136, 150));
}

#[test]
fn test_same_frame_twice_is_unchanged() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(0, 5000, r"{\bord2\shad1}Some text"));

    let (first, change) = renderer.render_frame_with_change(&track, 1000);
    assert_eq!(change, ChangeKind::Changed);
    let (second, change) = renderer.render_frame_with_change(&track, 1000);
    assert_eq!(change, ChangeKind::Unchanged);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert!(a.same_pixels(b));
        assert_eq!((a.dst_x, a.dst_y, a.color), (b.dst_x, b.dst_y, b.color));
    }
}

#[test]
fn test_vector_clipped_frame_twice_is_unchanged() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track
        .events
        .push(Event::new(0, 5000, r"{\clip(m 0 0 l 384 0 384 288 0 288)}Some text"));
    track
        .events
        .push(Event::new(0, 5000, r"{\an8\iclip(m 0 0 l 192 0 192 288 0 288)}Other text"));

    let (first, change) = renderer.render_frame_with_change(&track, 1000);
    assert_eq!(change, ChangeKind::Changed);
    assert!(!first.is_empty());
    let (second, change) = renderer.render_frame_with_change(&track, 1000);
    assert_eq!(change, ChangeKind::Unchanged);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert!(a.same_pixels(b));
    }
}

#[test]
fn test_moving_text_reports_move() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(0, 1000, r"{\move(100,100,200,100)}A"));

    renderer.render_frame(&track, 0);
    let (_, change) = renderer.render_frame_with_change(&track, 500);
    assert_eq!(change, ChangeKind::Moved);
}

#[test]
fn test_empty_frame_after_text_is_a_change() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(0, 1000, "A"));

    renderer.render_frame(&track, 0);
    let (images, change) = renderer.render_frame_with_change(&track, 2000);
    assert!(images.is_empty());
    assert_eq!(change, ChangeKind::Changed);
}

#[test]
fn test_karaoke_second_word_uses_own_duration() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(0, 5000, r"{\kf30}AB{\kf50}CD"));

    // 100 ms into the second word: 20% of its 16 px span
    let images = renderer.render_frame(&track, 400);
    let colors: Vec<u32> = images.iter().map(|i| i.color).collect();
    assert_eq!(colors, vec![PRIMARY, PRIMARY, PRIMARY, SECONDARY, SECONDARY]);
    assert_eq!((images[2].w, images[3].w), (3, 3));
    assert_eq!(images[2].dst_x + 3, images[3].dst_x);

    // a shorter first word moves the start, not the sweep speed
    let mut short = track.clone();
    short.events[0] = Event::new(0, 5000, r"{\kf10}AB{\kf50}CD");
    let images = renderer.render_frame(&short, 200);
    let widths: Vec<i32> = images.iter().map(|i| i.w).collect();
    assert_eq!(widths, vec![6, 6, 3, 3, 6]);
}

#[test]
fn test_karaoke_instant_switches_whole_words() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(0, 5000, r"{\k30}AB{\k50}CD"));

    let colors = |images: Vec<ass_overlay::Image>| images.iter().map(|i| i.color).collect::<Vec<_>>();
    assert_eq!(
        colors(renderer.render_frame(&track, 100)),
        vec![PRIMARY, PRIMARY, SECONDARY, SECONDARY]
    );
    assert_eq!(colors(renderer.render_frame(&track, 400)), vec![PRIMARY; 4]);
}

#[test]
fn test_overlapping_borders_do_not_add_up() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    // glyphs 6 px apart with 2 px borders: borders share columns 6..10
    track
        .events
        .push(Event::new(0, 5000, r"{\an7\fsp-4\bord2\1a&HFF&\3a&H80&}AA"));

    let images = renderer.render_frame(&track, 0);
    let frame = Frame::from_images(&images, 384, 288, 0);
    let single = frame.pixel(3, 1).expect("pixel")[3];
    let shared = frame.pixel(7, 1).expect("pixel")[3];
    assert!(single > 0);
    assert!(shared <= single, "overlap alpha {shared} above single layer {single}");
}

#[test]
fn test_rect_clip_cuts_images() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track
        .events
        .push(Event::new(0, 5000, r"{\an7\pos(0,0)\clip(0,0,5,288)}AA"));

    let images = renderer.render_frame(&track, 0);
    assert_eq!(images.len(), 1);
    assert_eq!((images[0].dst_x, images[0].w), (2, 3));
}

#[test]
fn test_inverse_clip_keeps_outside() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track
        .events
        .push(Event::new(0, 5000, r"{\an7\pos(0,0)\iclip(0,0,5,288)}A"));

    let images = renderer.render_frame(&track, 0);
    let (x0, _, x1, _) = union(&images);
    assert_eq!((x0, x1), (5, 8));
}

#[test]
fn test_drawing_renders_its_shape() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track
        .events
        .push(Event::new(0, 5000, r"{\an7\pos(10,20)\p1}m 0 0 l 30 0 30 10 0 10{\p0}"));

    let images = renderer.render_frame(&track, 0);
    assert_eq!(union(&images), (10, 20, 40, 30));
}

#[test]
fn test_fade_is_multiplied_into_colors() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(0, 5000, r"{\fad(1000,0)\1a&H00&}A"));

    // halfway through the fade-in: 255 -> 127, applied over an opaque fill
    let images = renderer.render_frame(&track, 500);
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].color, 0xFFFF_FF7F);

    let images = renderer.render_frame(&track, 2000);
    assert_eq!(images[0].color, PRIMARY);
}

#[test]
fn test_events_outside_their_time_are_skipped() {
    let mut renderer = renderer(384, 288);
    let mut track = track();
    track.events.push(Event::new(1000, 1000, "A"));
    assert!(renderer.render_frame(&track, 999).is_empty());
    assert_eq!(renderer.render_frame(&track, 1000).len(), 1);
    assert!(renderer.render_frame(&track, 2000).is_empty());
}
