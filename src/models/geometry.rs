use serde::{Deserialize, Serialize};

/// Axis-aligned box in page coordinates. `x1 >= x0` and `y1 >= y0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Returns `None` for inverted boxes.
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Option<Self> {
        if x1 < x0 || y1 < y0 {
            return None;
        }
        Some(Self { x0, y0, x1, y1 })
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Edges are inclusive: boxes that only share an edge intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.x1 < other.x0 || self.x0 > other.x1 || self.y1 < other.y0 || self.y0 > other.y1)
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        if !self.intersects(other) {
            return 0.0;
        }

        let ix0 = self.x0.max(other.x0);
        let iy0 = self.y0.max(other.y0);
        let ix1 = self.x1.min(other.x1);
        let iy1 = self.y1.min(other.y1);

        (ix1 - ix0) * (iy1 - iy0)
    }

    /// Fraction of this box covered by `viewport`, 0 for degenerate boxes.
    pub fn visibility_fraction(&self, viewport: &BoundingBox) -> f64 {
        let area = self.area();
        if area == 0.0 {
            return 0.0;
        }
        self.intersection_area(viewport) / area
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BoundingBox {
        BoundingBox { x0, y0, x1, y1 }
    }

    #[test]
    fn contained_box_is_fully_visible() {
        let outer = bbox(0.0, 0.0, 100.0, 100.0);
        let inner = bbox(25.0, 25.0, 75.0, 75.0);

        assert!(inner.intersects(&outer));
        assert!(outer.intersects(&inner));
        assert_eq!(inner.visibility_fraction(&outer), 1.0);
    }

    #[test]
    fn disjoint_boxes_have_no_overlap() {
        let a = bbox(0.0, 0.0, 50.0, 50.0);
        let b = bbox(100.0, 100.0, 150.0, 150.0);

        assert!(!a.intersects(&b));
        assert_eq!(a.intersection_area(&b), 0.0);
        assert_eq!(a.visibility_fraction(&b), 0.0);
    }

    #[test]
    fn partial_overlap_fraction() {
        let a = bbox(0.0, 0.0, 100.0, 100.0);
        let b = bbox(50.0, 50.0, 150.0, 150.0);

        assert!(a.intersects(&b));
        assert!((a.visibility_fraction(&b) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn shared_edge_counts_as_intersecting() {
        let a = bbox(0.0, 0.0, 50.0, 50.0);
        let b = bbox(50.0, 0.0, 100.0, 50.0);

        assert!(a.intersects(&b));
        assert_eq!(a.intersection_area(&b), 0.0);
    }

    #[test]
    fn zero_area_box_is_never_visible() {
        let line = bbox(10.0, 10.0, 10.0, 60.0);
        let viewport = bbox(0.0, 0.0, 100.0, 100.0);

        assert_eq!(line.area(), 0.0);
        assert_eq!(line.visibility_fraction(&viewport), 0.0);
    }

    #[test]
    fn checked_constructor_rejects_inverted_boxes() {
        assert!(BoundingBox::new(10.0, 0.0, 5.0, 10.0).is_none());
        assert!(BoundingBox::new(0.0, 10.0, 5.0, 0.0).is_none());

        let ok = BoundingBox::new(0.0, 0.0, 20.0, 10.0).unwrap();
        assert_eq!(ok.width(), 20.0);
        assert_eq!(ok.height(), 10.0);
        assert_eq!(ok.center_x(), 10.0);
        assert_eq!(ok.center_y(), 5.0);
    }
}
