//! Frame assembly: layer ordering, collision passes and change detection

use crate::collision::{fix_collisions, EventImages};
use crate::compositor::Image;
use crate::track::Track;

/// How a frame's images differ from the previous frame's
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ChangeKind {
    /// Identical images
    Unchanged = 0,
    /// Same images at different positions
    Moved = 1,
    /// Content changed
    Changed = 2,
}

impl From<ChangeKind> for i32 {
    fn from(kind: ChangeKind) -> Self {
        kind as i32
    }
}

/// Order rendered events by layer then read order, resolve collisions in
/// each layer and concatenate their images
pub(crate) fn assemble(mut events: Vec<EventImages>, track: &Track, frame_height: i32, generation: u64) -> Vec<Image> {
    events.sort_by_key(|ei| (ei.layer, ei.read_order));

    let mut start = 0;
    while start < events.len() {
        let layer = events[start].layer;
        let end = events[start..]
            .iter()
            .position(|ei| ei.layer != layer)
            .map_or(events.len(), |n| start + n);
        fix_collisions(&mut events[start..end], track, frame_height, generation);
        start = end;
    }

    events.into_iter().flat_map(|ei| ei.images).collect()
}

/// Compare a frame's images with the previous frame's
pub fn detect_change(prev: Option<&[Image]>, images: &[Image]) -> ChangeKind {
    let Some(prev) = prev else {
        return if images.is_empty() {
            ChangeKind::Unchanged
        } else {
            ChangeKind::Changed
        };
    };
    if prev.len() != images.len() {
        return ChangeKind::Changed;
    }

    let mut kind = ChangeKind::Unchanged;
    for (a, b) in prev.iter().zip(images) {
        if a.w != b.w || a.h != b.h || a.stride != b.stride || a.color != b.color || !a.same_pixels(b) {
            return ChangeKind::Changed;
        }
        if a.dst_x != b.dst_x || a.dst_y != b.dst_y {
            kind = ChangeKind::Moved;
        }
    }
    kind
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Bitmap;
    use crate::track::Event;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn image(bitmap: &Arc<Bitmap>, x: i32, y: i32, color: u32) -> Image {
        Image {
            bitmap: Arc::clone(bitmap),
            offset: 0,
            w: bitmap.w,
            h: bitmap.h,
            stride: bitmap.stride,
            color,
            dst_x: x,
            dst_y: y,
        }
    }

    #[test]
    fn test_first_frame() {
        let bitmap = Arc::new(Bitmap::new(0, 0, 4, 4));
        assert_eq!(detect_change(None, &[]), ChangeKind::Unchanged);
        assert_eq!(detect_change(None, &[image(&bitmap, 0, 0, 0)]), ChangeKind::Changed);
    }

    #[test]
    fn test_same_images_are_unchanged() {
        let bitmap = Arc::new(Bitmap::new(0, 0, 4, 4));
        let prev = vec![image(&bitmap, 1, 2, 0xFF)];
        let next = vec![image(&bitmap, 1, 2, 0xFF)];
        assert_eq!(detect_change(Some(&prev), &next), ChangeKind::Unchanged);
        assert_eq!(i32::from(ChangeKind::Unchanged), 0);
    }

    #[test]
    fn test_moved_and_changed() {
        let bitmap = Arc::new(Bitmap::new(0, 0, 4, 4));
        let prev = vec![image(&bitmap, 1, 2, 0xFF)];
        assert_eq!(detect_change(Some(&prev), &[image(&bitmap, 3, 2, 0xFF)]), ChangeKind::Moved);
        assert_eq!(detect_change(Some(&prev), &[image(&bitmap, 1, 2, 0)]), ChangeKind::Changed);
        assert_eq!(detect_change(Some(&prev), &[]), ChangeKind::Changed);

        let other = Arc::new(Bitmap::new(0, 0, 4, 4));
        assert_eq!(detect_change(Some(&prev), &[image(&other, 1, 2, 0xFF)]), ChangeKind::Changed);
    }

    #[test]
    fn test_assemble_orders_by_layer_and_read_order() {
        let mut track = Track::new(384, 288);
        track.events = (0..3).map(|_| Event::new(0, 1000, "x")).collect();
        let bitmap = Arc::new(Bitmap::new(0, 0, 4, 4));
        let events = [(0, 1, 0), (1, 0, 5), (2, 0, 1)]
            .into_iter()
            .map(|(event, layer, read_order)| EventImages {
                event,
                layer,
                read_order,
                images: vec![image(&bitmap, event as i32, 0, 0)],
                ..EventImages::default()
            })
            .collect();
        let images = assemble(events, &track, 288, 1);
        let order: Vec<i32> = images.iter().map(|i| i.dst_x).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }
}
