//! Geometry primitives in points.
//!
//! The coordinate space is the text container's: `x` grows to the right, `y` grows
//! downward, and the origin is the top-left corner of the first line fragment.

/// A point in text-container coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal position.
    pub x: f32,
    /// Vertical position (grows downward).
    pub y: f32,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    /// Width in points.
    pub width: f32,
    /// Height in points.
    pub height: f32,
}

impl Size {
    /// Create a size.
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Top-left corner.
    pub origin: Point,
    /// Extent.
    pub size: Size,
}

impl Rect {
    /// Create a rectangle from origin and extent.
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Point::new(x, y),
            size: Size::new(width, height),
        }
    }

    /// Zero rectangle.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Left edge.
    pub fn min_x(&self) -> f32 {
        self.origin.x
    }

    /// Top edge.
    pub fn min_y(&self) -> f32 {
        self.origin.y
    }

    /// Right edge.
    pub fn max_x(&self) -> f32 {
        self.origin.x + self.size.width
    }

    /// Bottom edge.
    pub fn max_y(&self) -> f32 {
        self.origin.y + self.size.height
    }

    /// Horizontal center.
    pub fn mid_x(&self) -> f32 {
        self.origin.x + self.size.width / 2.0
    }

    /// Vertical center.
    pub fn mid_y(&self) -> f32 {
        self.origin.y + self.size.height / 2.0
    }

    /// `true` if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.size.width <= 0.0 || self.size.height <= 0.0
    }

    /// Half-open containment test (`min <= p < max` on both axes).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.min_x()
            && point.x < self.max_x()
            && point.y >= self.min_y()
            && point.y < self.max_y()
    }

    /// `true` if `y` lies within `[min_y, max_y]`.
    pub fn contains_y(&self, y: f32) -> bool {
        self.min_y() <= y && y <= self.max_y()
    }

    /// Smallest rectangle containing both rectangles.
    ///
    /// An empty-sized operand still contributes its origin, which matches how line
    /// fragments of empty paragraphs are merged.
    pub fn union(&self, other: &Rect) -> Rect {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    /// Move the rectangle by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(
            self.origin.x + dx,
            self.origin.y + dy,
            self.size.width,
            self.size.height,
        )
    }

    /// Shrink the rectangle by `dx` on the left and right and `dy` on top and bottom.
    pub fn inset(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(
            self.origin.x + dx,
            self.origin.y + dy,
            (self.size.width - 2.0 * dx).max(0.0),
            (self.size.height - 2.0 * dy).max(0.0),
        )
    }

    /// A rectangle of `size` centered inside `self`.
    pub fn centered(&self, size: Size) -> Rect {
        Rect::new(
            self.mid_x() - size.width / 2.0,
            self.mid_y() - size.height / 2.0,
            size.width,
            size.height,
        )
    }
}
