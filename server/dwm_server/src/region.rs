//! Bounded sets of rectangles used for damage tracking.

use dwm_api_types::rect::Rect;

/// Capacity bound; past it the region degrades to one bounding box.
pub const MAX_REGION_RECTS: usize = 128;

/// A screen area modeled as disjoint-ish rectangles. Adding merges with any
/// overlapping member, so members never overlap each other; overflowing the
/// bound coalesces everything into a single enclosing box.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: heapless::Vec<Rect, MAX_REGION_RECTS>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn add(&mut self, rect: &Rect) {
        if rect.area() == 0 || rect.has_negative_dims() {
            return;
        }

        let mut merged = *rect;
        let mut i = 0;
        while i < self.rects.len() {
            if self.rects[i].overlaps(&merged) {
                merged.expand_to_contain(&self.rects[i]);
                self.rects.swap_remove(i);
                // The grown rect may now overlap earlier members; restart.
                i = 0;
            } else {
                i += 1;
            }
        }

        if self.rects.push(merged).is_err() {
            let mut bounds = merged;
            for r in &self.rects {
                bounds.expand_to_contain(r);
            }
            self.rects.clear();
            let _ = self.rects.push(bounds);
        }
    }

    /// Removes `rect` from the region, splitting each member into up to four
    /// remainder rectangles.
    pub fn subtract(&mut self, rect: &Rect) {
        let mut result = Region::new();
        for member in &self.rects {
            for part in member.subtract(rect).rects() {
                result.add(part);
            }
        }
        *self = result;
    }

    /// The part of this region inside `clip`, as a new region.
    pub fn intersect(&self, clip: &Rect) -> Region {
        let mut out = Region::new();
        for member in &self.rects {
            let piece = member.intersection(clip);
            if piece.area() > 0 {
                out.add(&piece);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwm_api_types::point::Point;

    fn covers(region: &Region, point: Point) -> bool {
        region.rects().iter().any(|r| r.contains_point(point))
    }

    fn covered_cells(region: &Region, bounds: Rect) -> Vec<(i32, i32)> {
        let mut out = Vec::new();
        for y in bounds.top..bounds.bottom {
            for x in bounds.left..bounds.right {
                if covers(region, Point::new(x, y)) {
                    out.push((x, y));
                }
            }
        }
        out
    }

    #[test]
    fn add_merges_overlapping_rects() {
        let mut region = Region::new();
        region.add(&Rect::new(0, 0, 10, 10));
        region.add(&Rect::new(5, 5, 15, 15));
        assert_eq!(region.rects(), &[Rect::new(0, 0, 15, 15)]);
    }

    #[test]
    fn add_keeps_disjoint_rects_separate() {
        let mut region = Region::new();
        region.add(&Rect::new(0, 0, 10, 10));
        region.add(&Rect::new(20, 20, 30, 30));
        assert_eq!(region.rects().len(), 2);
    }

    #[test]
    fn add_ignores_empty_rects() {
        let mut region = Region::new();
        region.add(&Rect::new(5, 5, 5, 9));
        assert!(region.is_empty());
    }

    #[test]
    fn union_of_added_rects_is_preserved() {
        let bounds = Rect::new(0, 0, 40, 40);
        let added = [
            Rect::new(0, 0, 10, 10),
            Rect::new(8, 2, 18, 12),
            Rect::new(30, 30, 40, 40),
            Rect::new(1, 20, 4, 24),
            Rect::new(2, 21, 9, 26),
        ];

        let mut region = Region::new();
        for r in &added {
            region.add(r);
        }

        for y in bounds.top..bounds.bottom {
            for x in bounds.left..bounds.right {
                let p = Point::new(x, y);
                let expected = added.iter().any(|r| r.contains_point(p));
                assert_eq!(covers(&region, p), expected, "at {p:?}");
            }
        }

        // Members stay pairwise disjoint.
        let rects = region.rects();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(b));
            }
        }
    }

    #[test]
    fn overflow_coalesces_to_bounding_box() {
        let mut region = Region::new();
        for i in 0..(MAX_REGION_RECTS as i32 + 10) {
            region.add(&Rect::from_dim(i * 3, 0, 2, 2));
        }
        assert_eq!(region.rects().len(), 1);
        let bounds = region.rects()[0];
        assert!(bounds.contains(&Rect::from_dim(0, 0, 2, 2)));
        assert!(bounds.contains(&Rect::from_dim((MAX_REGION_RECTS as i32 + 9) * 3, 0, 2, 2)));
    }

    #[test]
    fn subtract_removes_exactly_the_rect() {
        let bounds = Rect::new(0, 0, 30, 30);
        let mut region = Region::new();
        region.add(&Rect::new(0, 0, 20, 20));
        region.add(&Rect::new(22, 0, 28, 6));

        let cut = Rect::new(5, 5, 25, 25);
        region.subtract(&cut);

        for y in bounds.top..bounds.bottom {
            for x in bounds.left..bounds.right {
                let p = Point::new(x, y);
                let in_original = Rect::new(0, 0, 20, 20).contains_point(p)
                    || Rect::new(22, 0, 28, 6).contains_point(p);
                let expected = in_original && !cut.contains_point(p);
                assert_eq!(covers(&region, p), expected, "at {p:?}");
            }
        }
    }

    #[test]
    fn intersect_clips_to_rect() {
        let mut region = Region::new();
        region.add(&Rect::new(0, 0, 10, 10));
        region.add(&Rect::new(20, 0, 30, 10));

        let clipped = region.intersect(&Rect::new(5, 0, 25, 10));
        let cells = covered_cells(&clipped, Rect::new(0, 0, 40, 10));
        assert!(cells.contains(&(5, 0)));
        assert!(cells.contains(&(24, 9)));
        assert!(!cells.contains(&(4, 0)));
        assert!(!cells.contains(&(25, 0)));
        assert!(!cells.contains(&(15, 5)));
    }
}
