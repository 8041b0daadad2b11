//! Active-page tracking for a card's horizontal media carousel.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarouselState {
    page_count: usize,
    active_index: usize,
}

impl CarouselState {
    pub fn new(page_count: usize) -> Self {
        Self {
            page_count,
            active_index: 0,
        }
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Applies one horizontal scroll observation. Returns true only when the
    /// snapped page actually changed, so callers can skip a render otherwise.
    pub fn on_scroll(&mut self, offset_x: f64, page_width: f64) -> bool {
        if self.page_count == 0 || !offset_x.is_finite() || !page_width.is_finite() {
            return false;
        }
        if page_width <= 0.0 {
            return false;
        }
        let raw = (offset_x / page_width).round();
        let index = if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.last_index())
        };
        self.set_active(index)
    }

    /// Keyboard/programmatic paging. Clamped like scroll input.
    pub fn step(&mut self, delta: i64) -> bool {
        if self.page_count == 0 {
            return false;
        }
        let target = (self.active_index as i64)
            .saturating_add(delta)
            .clamp(0, self.last_index() as i64);
        self.set_active(target as usize)
    }

    pub fn set_page_count(&mut self, page_count: usize) -> bool {
        self.page_count = page_count;
        let clamped = self.active_index.min(self.last_index());
        self.set_active(clamped)
    }

    pub fn snap_offset(&self, page_width: f64) -> f64 {
        self.active_index as f64 * page_width.max(0.0)
    }

    /// One entry per page, true for the active one.
    pub fn indicator(&self) -> Vec<bool> {
        (0..self.page_count)
            .map(|index| index == self.active_index)
            .collect()
    }

    pub fn label(&self) -> String {
        if self.page_count == 0 {
            return String::new();
        }
        format!("{}/{}", self.active_index + 1, self.page_count)
    }

    fn last_index(&self) -> usize {
        self.page_count.saturating_sub(1)
    }

    fn set_active(&mut self, index: usize) -> bool {
        if index == self.active_index {
            return false;
        }
        self.active_index = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_to_nearest_page() {
        let mut carousel = CarouselState::new(3);
        assert!(carousel.on_scroll(390.0, 400.0));
        assert_eq!(carousel.active_index(), 1);
        assert!(carousel.on_scroll(610.0, 400.0));
        assert_eq!(carousel.active_index(), 2);
    }

    #[test]
    fn partial_drag_below_midpoint_does_not_page() {
        let mut carousel = CarouselState::new(4);
        for offset in [0.0, 50.0, 120.0, 199.0, 150.0, 10.0] {
            assert!(!carousel.on_scroll(offset, 400.0));
            assert_eq!(carousel.active_index(), 0);
        }
    }

    #[test]
    fn writes_only_on_change() {
        let mut carousel = CarouselState::new(2);
        assert!(carousel.on_scroll(400.0, 400.0));
        assert!(!carousel.on_scroll(401.0, 400.0));
        assert!(!carousel.on_scroll(420.0, 400.0));
        assert_eq!(carousel.active_index(), 1);
    }

    #[test]
    fn clamps_out_of_range_offsets() {
        let mut carousel = CarouselState::new(3);
        carousel.on_scroll(10_000.0, 400.0);
        assert_eq!(carousel.active_index(), 2);
        carousel.on_scroll(-500.0, 400.0);
        assert_eq!(carousel.active_index(), 0);
    }

    #[test]
    fn ignores_bad_measurements() {
        let mut carousel = CarouselState::new(3);
        carousel.on_scroll(400.0, 400.0);
        assert!(!carousel.on_scroll(800.0, 0.0));
        assert!(!carousel.on_scroll(f64::NAN, 400.0));
        assert!(!carousel.on_scroll(800.0, f64::INFINITY));
        assert_eq!(carousel.active_index(), 1);
    }

    #[test]
    fn last_write_wins() {
        let mut carousel = CarouselState::new(5);
        for offset in [800.0, 1200.0, 400.0] {
            carousel.on_scroll(offset, 400.0);
        }
        assert_eq!(carousel.active_index(), 1);
    }

    #[test]
    fn index_stays_in_range_for_arbitrary_sequences() {
        let mut carousel = CarouselState::new(4);
        let mut offset = -300.0;
        while offset < 2500.0 {
            carousel.on_scroll(offset, 333.0);
            assert!(carousel.active_index() < carousel.page_count());
            offset += 37.5;
        }
    }

    #[test]
    fn empty_carousel_stays_at_zero() {
        let mut carousel = CarouselState::new(0);
        assert!(!carousel.on_scroll(900.0, 300.0));
        assert!(!carousel.step(1));
        assert_eq!(carousel.active_index(), 0);
        assert_eq!(carousel.label(), "");
    }

    #[test]
    fn step_and_indicator() {
        let mut carousel = CarouselState::new(3);
        assert!(carousel.step(1));
        assert!(carousel.step(5));
        assert!(!carousel.step(1));
        assert_eq!(carousel.indicator(), vec![false, false, true]);
        assert_eq!(carousel.label(), "3/3");
        assert_eq!(carousel.snap_offset(100.0), 200.0);
        assert!(carousel.set_page_count(2));
        assert_eq!(carousel.active_index(), 1);
    }
}
