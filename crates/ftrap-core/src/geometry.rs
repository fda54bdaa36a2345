#![forbid(unsafe_code)]

//! Geometric primitives.

/// A layout box in CSS pixels, as returned by `getBoundingClientRect`.
///
/// The origin is the top-left of the viewport. `x`/`y` may be negative for
/// boxes scrolled out of view; sizes never are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: i32,
    /// Top edge (inclusive).
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Rect {
    /// Create a new rectangle.
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Check if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Grow the rectangle by `amount` on every side.
    ///
    /// Negative amounts shrink it; the size saturates at zero.
    pub fn outset(&self, amount: i32) -> Rect {
        let grow = |len: u32| -> u32 {
            let grown = i64::from(len) + 2 * i64::from(amount);
            grown.clamp(0, i64::from(u32::MAX)) as u32
        };
        Rect {
            x: self.x.saturating_sub(amount),
            y: self.y.saturating_sub(amount),
            width: grow(self.width),
            height: grow(self.height),
        }
    }
}
