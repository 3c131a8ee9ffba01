//! Carousel focus model.
//!
//! Maps a scroll offset onto a continuous per-item focus factor. The factor
//! is advisory: it drives presentation only and never gates interaction.

use crate::config::CarouselConfig;
use crate::entry::Entry;
use crate::error::LayoutError;
use serde::Serialize;

/// Bound on the magnitude of a focus factor
pub const FOCUS_FACTOR_LIMIT: f64 = 2.0;

/// Factor magnitude below which a card renders as fully focused
const FOCUSED_THRESHOLD: f64 = 0.2;

/// Horizontal geometry of the carousel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarouselLayout {
    item_width: f64,
    gap: f64,
}

impl CarouselLayout {
    pub fn new(item_width: f64, gap: f64) -> Result<Self, LayoutError> {
        if !item_width.is_finite() || item_width <= 0.0 {
            return Err(LayoutError::InvalidItemWidth(item_width));
        }
        if !gap.is_finite() || gap < 0.0 {
            return Err(LayoutError::InvalidGap(gap));
        }

        Ok(Self { item_width, gap })
    }

    /// Layout for a viewport of the given width in pixels
    pub fn from_viewport(viewport_width: f64, config: &CarouselConfig) -> Result<Self, LayoutError> {
        Self::new(viewport_width * config.item_width_ratio, config.gap_px)
    }

    pub fn item_width(&self) -> f64 {
        self.item_width
    }

    pub fn gap(&self) -> f64 {
        self.gap
    }

    /// Distance between the starts of two adjacent items
    pub fn stride(&self) -> f64 {
        self.item_width + self.gap
    }

    /// Scroll offset at which the item at `index` is centered
    pub fn layout_offset(&self, index: usize) -> f64 {
        index as f64 * self.stride()
    }

    /// Signed, normalized distance of `index` from the viewport center,
    /// clamped to [-2, 2]. Positive once the item has scrolled past center.
    pub fn focus_factor(&self, index: usize, scroll: f64) -> f64 {
        let raw = (scroll - self.layout_offset(index)) / self.item_width;
        raw.clamp(-FOCUS_FACTOR_LIMIT, FOCUS_FACTOR_LIMIT)
    }

    /// Focus factor of every entry, in list order
    pub fn focus_factors(&self, entries: &[Entry], scroll: f64) -> Vec<ItemFocus> {
        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| ItemFocus {
                id: entry.id().to_string(),
                index,
                factor: self.focus_factor(index, scroll),
            })
            .collect()
    }

    /// Index of the item closest to center, `None` for an empty list
    pub fn nearest_index(&self, scroll: f64, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }

        let position = (scroll / self.stride()).round();
        if position.is_nan() || position <= 0.0 {
            Some(0)
        } else {
            Some((position as usize).min(len - 1))
        }
    }

    /// Scroll offset that snaps the item at `index` to center
    pub fn snap_offset(&self, index: usize) -> f64 {
        self.layout_offset(index)
    }
}

/// Focus of one item at a given scroll offset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemFocus {
    pub id: String,
    pub index: usize,
    pub factor: f64,
}

impl ItemFocus {
    pub fn is_centered(&self) -> bool {
        self.factor == 0.0
    }

    /// Paint order, higher is on top
    pub fn stacking_order(&self) -> i32 {
        (10.0 - self.factor.abs()).round() as i32
    }
}

/// Visual treatment of a carousel card
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CardStyle {
    pub scale: f64,
    pub blur_px: f64,
    pub opacity: f64,
    pub z_index: i32,
}

impl CardStyle {
    /// Style for a card at `factor`. Hover takes precedence over focus.
    pub fn for_focus(factor: f64, hovered: bool) -> Self {
        if hovered {
            return Self {
                scale: 1.15,
                blur_px: 0.0,
                opacity: 1.0,
                z_index: 50,
            };
        }

        let distance = factor.abs().min(FOCUS_FACTOR_LIMIT);
        if distance < FOCUSED_THRESHOLD {
            return Self {
                scale: 1.0,
                blur_px: 0.0,
                opacity: 1.0,
                z_index: 20,
            };
        }

        Self {
            scale: 1.0 - 0.15 * distance,
            blur_px: 3.0 * distance,
            opacity: 1.0 - 0.5 * distance,
            z_index: 1,
        }
    }
}
