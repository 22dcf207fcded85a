use std::fmt;

/// A rectangle stored as origin plus extent.
///
/// `left/top/right/bottom` are derived; setting `right` or `bottom` changes
/// the extent and keeps the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from edges.
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn set_right(&mut self, right: f32) {
        self.width = right - self.x;
    }

    pub fn set_bottom(&mut self, bottom: f32) {
        self.height = bottom - self.y;
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rect({}, {}, {}, {})", self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

impl<T> Size<T> {
    pub fn new(width: T, height: T) -> Self {
        Size { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Pos<T> {
    pub x: T,
    pub y: T,
}

impl<T> Pos<T> {
    pub fn new(x: T, y: T) -> Self {
        Pos { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_edges() {
        let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.right(), 110.0);
        assert_eq!(rect.bottom(), 70.0);
        assert_eq!(Rect::from_ltrb(10.0, 20.0, 110.0, 70.0), rect);
    }

    #[test]
    fn test_set_right_keeps_origin() {
        let mut rect = Rect::new(5.0, 5.0, 10.0, 10.0);
        rect.set_right(30.0);
        rect.set_bottom(8.0);

        assert_eq!(rect.left(), 5.0);
        assert_eq!(rect.width, 25.0);
        assert_eq!(rect.height, 3.0);
    }

    #[test]
    fn test_contains_is_half_open() {
        let rect = Rect::new(0.0, 0.0, 4.0, 4.0);
        assert!(rect.contains(0.0, 3.9));
        assert!(!rect.contains(4.0, 1.0));
        assert!(Rect::new(0.0, 0.0, 0.0, 3.0).is_empty());
    }
}
