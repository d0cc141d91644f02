//! Collision avoidance for events placed by alignment and margins
//!
//! Events keep the position they were given on the first frame they were
//! placed (their sticky [`Placement`]) for as long as the render generation
//! and their height stay the same. New events are fitted around the fixed
//! ones by shifting them vertically.

use crate::compositor::Image;
use crate::track::{Placement, Track};

/// Direction a colliding event moves in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftDirection {
    /// Towards the bottom of the frame
    Down,
    /// Towards the top of the frame
    #[default]
    Up,
}

/// Images of one event with the box the collision pass works on
#[derive(Debug, Clone, Default)]
pub struct EventImages {
    /// Index of the event in the track
    pub event: usize,
    /// Render layer
    pub layer: i32,
    /// Read order of the event
    pub read_order: i32,
    /// Top of the text box in frame pixels
    pub top: i32,
    /// Height of the text box
    pub height: i32,
    /// Left edge of the text box
    pub left: i32,
    /// Width of the text box
    pub width: i32,
    /// Takes part in collision avoidance
    pub detect_collisions: bool,
    /// Where to move when colliding
    pub shift_direction: ShiftDirection,
    /// Shadow, border and fill images
    pub images: Vec<Image>,
}

/// Vertical range `[a, b)` and horizontal range `[ha, hb)` occupied by an
/// event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Top
    pub a: i32,
    /// Bottom
    pub b: i32,
    /// Left
    pub ha: i32,
    /// Right
    pub hb: i32,
}

impl Segment {
    fn of_placement(p: &Placement) -> Self {
        Self {
            a: p.top,
            b: p.top + p.height,
            ha: p.left,
            hb: p.left + p.width,
        }
    }

    fn of_event(ei: &EventImages) -> Self {
        Self {
            a: ei.top,
            b: ei.top + ei.height,
            ha: ei.left,
            hb: ei.left + ei.width,
        }
    }

    /// Whether both ranges intersect
    pub fn overlaps(&self, other: &Segment) -> bool {
        !(self.a >= other.b || other.a >= self.b || self.ha >= other.hb || other.ha >= self.hb)
    }

    fn overlaps_shifted(&self, shift: i32, other: &Segment) -> bool {
        !(self.b + shift <= other.a
            || self.a + shift >= other.b
            || self.hb <= other.ha
            || self.ha >= other.hb)
    }
}

/// Shift `s` clear of the fixed segments in direction `dir`, add it to
/// `fixed` (kept sorted by top) and return the shift
pub fn fit_segment(s: &Segment, fixed: &mut Vec<Segment>, dir: ShiftDirection) -> i32 {
    let mut shift = 0;
    match dir {
        ShiftDirection::Down => {
            for f in fixed.iter() {
                if s.overlaps_shifted(shift, f) {
                    shift = f.b - s.a;
                }
            }
        }
        ShiftDirection::Up => {
            for f in fixed.iter().rev() {
                if s.overlaps_shifted(shift, f) {
                    shift = f.a - s.b;
                }
            }
        }
    }
    fixed.push(Segment {
        a: s.a + shift,
        b: s.b + shift,
        ..*s
    });
    fixed.sort_by_key(|seg| seg.a);
    shift
}

/// Move every image of an event vertically, cropping what leaves the
/// frame
pub fn shift_event(ei: &mut EventImages, shift: i32, frame_height: i32) {
    for image in &mut ei.images {
        image.dst_y += shift;
        if image.dst_y < 0 {
            let clip = -image.dst_y;
            image.h -= clip;
            image.offset += (clip * image.stride) as usize;
            image.dst_y = 0;
        }
        if image.dst_y + image.h >= frame_height {
            image.h -= image.dst_y + image.h - frame_height;
        }
        if image.h <= 0 {
            image.h = 0;
            image.dst_y = 0;
        }
    }
    ei.top += shift;
}

/// Resolve collisions between the events of one layer.
///
/// Events whose sticky placement is current are moved back to it unless
/// their height changed or they overlap an event fixed before them; all
/// other participating events are fitted around the fixed ones and become
/// fixed themselves.
pub fn fix_collisions(events: &mut [EventImages], track: &Track, frame_height: i32, generation: u64) {
    let mut used: Vec<Segment> = Vec::with_capacity(events.len());

    for ei in events.iter_mut().filter(|ei| ei.detect_collisions) {
        let Some(event) = track.events.get(ei.event) else {
            continue;
        };
        let placement = event.placement(generation);
        if placement.height <= 0 {
            continue;
        }
        let segment = Segment::of_placement(&placement);
        let stale = if placement.height != ei.height {
            log::debug!("event {} changed height, placing it again", ei.event);
            true
        } else {
            used.iter().any(|u| segment.overlaps(u))
        };
        if stale {
            event.set_placement(Placement {
                generation,
                ..Placement::default()
            });
            continue;
        }
        used.push(segment);
        shift_event(ei, placement.top - ei.top, frame_height);
    }
    used.sort_by_key(|seg| seg.a);

    for ei in events.iter_mut().filter(|ei| ei.detect_collisions) {
        let Some(event) = track.events.get(ei.event) else {
            continue;
        };
        if event.placement(generation).height != 0 {
            continue;
        }
        let shift = fit_segment(&Segment::of_event(ei), &mut used, ei.shift_direction);
        if shift != 0 {
            shift_event(ei, shift, frame_height);
        }
        event.set_placement(Placement {
            top: ei.top,
            height: ei.height,
            left: ei.left,
            width: ei.width,
            generation,
        });
    }
}
