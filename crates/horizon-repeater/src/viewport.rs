//! Visible window and realization window tracking.
//!
//! The host reports the part of the container that is on screen (in the
//! container's own coordinates). Layouts realize everything that intersects
//! the realization window, which is the visible window grown by half the
//! cache length on each side of each axis.

use horizon_repeater_core::{Rect, Size};

use crate::config::RepeaterConfig;

#[derive(Debug, Clone)]
pub struct ViewportManager {
    visible_window: Option<Rect>,
    horizontal_cache_length: f32,
    vertical_cache_length: f32,
    layout_extent: Rect,
    is_virtualizing: bool,
}

impl Default for ViewportManager {
    fn default() -> Self {
        Self::new(&RepeaterConfig::default())
    }
}

impl ViewportManager {
    pub fn new(config: &RepeaterConfig) -> Self {
        Self {
            visible_window: None,
            horizontal_cache_length: config.horizontal_cache_length,
            vertical_cache_length: config.vertical_cache_length,
            layout_extent: Rect::ZERO,
            is_virtualizing: true,
        }
    }

    pub fn apply_config(&mut self, config: &RepeaterConfig) {
        self.horizontal_cache_length = config.horizontal_cache_length;
        self.vertical_cache_length = config.vertical_cache_length;
    }

    /// Set the on-screen part of the container. Returns `true` if it changed.
    pub fn set_visible_window(&mut self, window: Rect) -> bool {
        if self.visible_window == Some(window) {
            return false;
        }
        self.visible_window = Some(window);
        true
    }

    /// Forget the visible window; everything is considered visible again.
    pub fn reset_visible_window(&mut self) {
        self.visible_window = None;
    }

    /// The visible window, or an unbounded rect before the host reported one.
    #[inline]
    pub fn visible_rect(&self) -> Rect {
        match self.visible_window {
            Some(window) if self.is_virtualizing => window,
            _ => Rect::INFINITE,
        }
    }

    /// The visible window grown by the cache buffer.
    ///
    /// An infinite dimension gets no buffer.
    pub fn realization_rect(&self) -> Rect {
        let visible = self.visible_rect();
        if visible == Rect::INFINITE {
            return visible;
        }
        let buffer_x = cache_buffer(visible.width(), self.horizontal_cache_length);
        let buffer_y = cache_buffer(visible.height(), self.vertical_cache_length);
        Rect::new(
            visible.left() - buffer_x,
            visible.top() - buffer_y,
            visible.width() + buffer_x * 2.0,
            visible.height() + buffer_y * 2.0,
        )
    }

    /// A new layout is attached; non-virtualizing layouts see everything.
    pub fn on_layout_changed(&mut self, is_virtualizing: bool) {
        self.is_virtualizing = is_virtualizing;
    }

    #[inline]
    pub fn layout_extent(&self) -> Rect {
        self.layout_extent
    }

    pub fn set_layout_extent(&mut self, extent: Rect) {
        self.layout_extent = extent;
    }

    /// Size of the content, ignoring a negative origin.
    pub fn extent_size(&self) -> Size {
        self.layout_extent.size
    }
}

fn cache_buffer(length: f32, cache_length: f32) -> f32 {
    if length.is_finite() {
        length * cache_length / 2.0
    } else {
        0.0
    }
}
