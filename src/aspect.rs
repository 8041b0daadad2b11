use std::collections::HashMap;

pub const DEFAULT_RATIO: f64 = 1.0;

/// Measured width/height ratios for one card's pages.
///
/// Until a page reports its first successful load the box is sized square,
/// then corrected once; entries live as long as the card does.
#[derive(Debug, Clone, Default)]
pub struct AspectRatioCache {
    ratios: HashMap<String, f64>,
}

impl AspectRatioCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false (and keeps the previous value) for measurements that
    /// would collapse the box.
    pub fn record_ratio(&mut self, key: &str, width: f64, height: f64) -> bool {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return false;
        }
        let ratio = width / height;
        if !ratio.is_finite() || ratio <= 0.0 {
            return false;
        }
        self.ratios.insert(key.to_string(), ratio);
        true
    }

    pub fn ratio(&self, key: &str) -> f64 {
        self.ratios.get(key).copied().unwrap_or(DEFAULT_RATIO)
    }

    pub fn is_measured(&self, key: &str) -> bool {
        self.ratios.contains_key(key)
    }

    pub fn height_for(&self, key: &str, width: f64) -> f64 {
        width / self.ratio(key)
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}
