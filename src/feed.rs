use std::collections::HashMap;

use crate::card::LayoutObserver;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardLayout {
    pub offset_y: f64,
    pub height: f64,
}

impl CardLayout {
    /// Share of the card's own height that falls inside the viewport.
    pub fn visible_fraction(&self, scroll_y: f64, viewport_height: f64) -> f64 {
        if self.height <= 0.0 || viewport_height <= 0.0 {
            return 0.0;
        }
        let top = self.offset_y.max(scroll_y);
        let bottom = (self.offset_y + self.height).min(scroll_y + viewport_height);
        ((bottom - top).max(0.0) / self.height).min(1.0)
    }
}

/// Geometry reported by cards, used by the feed to decide which single card
/// is visible enough to play.
#[derive(Debug, Default, Clone)]
pub struct LayoutRegistry {
    layouts: HashMap<String, CardLayout>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// The one card that should be treated as visible, if any clears the
    /// threshold. Ties go to the card nearer the top of the feed.
    pub fn most_visible(
        &self,
        scroll_y: f64,
        viewport_height: f64,
        threshold: f64,
    ) -> Option<&str> {
        let mut best: Option<(&str, f64, f64)> = None;
        for (id, layout) in &self.layouts {
            let fraction = layout.visible_fraction(scroll_y, viewport_height);
            if fraction <= 0.0 || fraction < threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_id, best_fraction, best_offset)) => {
                    fraction > best_fraction
                        || (fraction == best_fraction
                            && (layout.offset_y < best_offset
                                || (layout.offset_y == best_offset && id.as_str() < best_id)))
                }
            };
            if better {
                best = Some((id.as_str(), fraction, layout.offset_y));
            }
        }
        best.map(|(id, _, _)| id)
    }
}

impl LayoutObserver for LayoutRegistry {
    fn on_layout(&mut self, post_id: &str, offset_y: f64, height: f64) {
        self.layouts
            .insert(post_id.to_string(), CardLayout { offset_y, height });
    }
}
