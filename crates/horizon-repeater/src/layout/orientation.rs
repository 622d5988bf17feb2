//! Orientation enums and major/minor axis helpers.
//!
//! Layout algorithms are written once in terms of a *major* axis (the
//! scrolling direction, along which lines stack) and a *minor* axis (the
//! direction items flow within a line). [`AxisMapper`] translates between
//! that vocabulary and concrete x/y coordinates.

use std::str::FromStr;

use horizon_repeater_core::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

use crate::error::RepeaterError;

/// Direction in which items are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    #[default]
    Vertical,
}

impl FromStr for Orientation {
    type Err = RepeaterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "horizontal" => Ok(Self::Horizontal),
            "vertical" => Ok(Self::Vertical),
            _ => Err(RepeaterError::unknown_option("Orientation", s)),
        }
    }
}

/// Direction in which content scrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScrollOrientation {
    #[default]
    Vertical,
    Horizontal,
}

impl ScrollOrientation {
    /// The scroll direction of a stack that lays items out along `orientation`.
    pub fn along(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Vertical => Self::Vertical,
            Orientation::Horizontal => Self::Horizontal,
        }
    }

    /// The scroll direction of a grid whose lines flow along `orientation`.
    pub fn across(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Horizontal => Self::Vertical,
            Orientation::Vertical => Self::Horizontal,
        }
    }
}

/// Maps major/minor coordinates onto x/y for a scroll orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisMapper {
    scroll: ScrollOrientation,
}

impl AxisMapper {
    pub fn new(scroll: ScrollOrientation) -> Self {
        Self { scroll }
    }

    #[inline]
    pub fn scroll_orientation(&self) -> ScrollOrientation {
        self.scroll
    }

    #[inline]
    fn vertical(&self) -> bool {
        self.scroll == ScrollOrientation::Vertical
    }

    /// Extent of a size along the scrolling direction.
    #[inline]
    pub fn major(&self, size: Size) -> f32 {
        if self.vertical() { size.height } else { size.width }
    }

    /// Extent of a size across the scrolling direction.
    #[inline]
    pub fn minor(&self, size: Size) -> f32 {
        if self.vertical() { size.width } else { size.height }
    }

    #[inline]
    pub fn major_size(&self, rect: Rect) -> f32 {
        self.major(rect.size)
    }

    #[inline]
    pub fn minor_size(&self, rect: Rect) -> f32 {
        self.minor(rect.size)
    }

    #[inline]
    pub fn major_start(&self, rect: Rect) -> f32 {
        if self.vertical() { rect.origin.y } else { rect.origin.x }
    }

    #[inline]
    pub fn minor_start(&self, rect: Rect) -> f32 {
        if self.vertical() { rect.origin.x } else { rect.origin.y }
    }

    #[inline]
    pub fn major_end(&self, rect: Rect) -> f32 {
        if self.vertical() { rect.bottom() } else { rect.right() }
    }

    #[inline]
    pub fn minor_end(&self, rect: Rect) -> f32 {
        if self.vertical() { rect.right() } else { rect.bottom() }
    }

    pub fn set_major_size(&self, rect: &mut Rect, value: f32) {
        if self.vertical() {
            rect.size.height = value;
        } else {
            rect.size.width = value;
        }
    }

    pub fn set_minor_size(&self, rect: &mut Rect, value: f32) {
        if self.vertical() {
            rect.size.width = value;
        } else {
            rect.size.height = value;
        }
    }

    pub fn set_major_start(&self, rect: &mut Rect, value: f32) {
        if self.vertical() {
            rect.origin.y = value;
        } else {
            rect.origin.x = value;
        }
    }

    pub fn set_minor_start(&self, rect: &mut Rect, value: f32) {
        if self.vertical() {
            rect.origin.x = value;
        } else {
            rect.origin.y = value;
        }
    }

    pub fn minor_major_rect(&self, minor: f32, major: f32, minor_size: f32, major_size: f32) -> Rect {
        if self.vertical() {
            Rect::new(minor, major, minor_size, major_size)
        } else {
            Rect::new(major, minor, major_size, minor_size)
        }
    }

    pub fn minor_major_point(&self, minor: f32, major: f32) -> Point {
        if self.vertical() {
            Point::new(minor, major)
        } else {
            Point::new(major, minor)
        }
    }

    pub fn minor_major_size(&self, minor: f32, major: f32) -> Size {
        if self.vertical() {
            Size::new(minor, major)
        } else {
            Size::new(major, minor)
        }
    }
}
