use ndarray::Array2;

use crate::error::{FitError, Result};

/// Width/height of a box whose center is shared with every other box.
///
/// Both sides are finite and strictly positive, so the IoU of any two boxes
/// is well defined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorBox {
    w: f64,
    h: f64,
}

impl AnchorBox {
    pub fn new(w: f64, h: f64) -> Result<Self> {
        if is_positive(w) && is_positive(h) {
            Ok(Self { w, h })
        } else {
            Err(FitError::invalid(format!("box sides must be finite and > 0 (w={w}, h={h})")))
        }
    }

    /// Box of side `scale` stretched by `aspect`: `w = scale * aspect`, `h = scale / aspect`.
    pub fn from_scale_aspect(scale: f64, aspect: f64) -> Result<Self> {
        Self::new(scale * aspect, scale / aspect)
    }

    pub fn width(&self) -> f64 {
        self.w
    }

    pub fn height(&self) -> f64 {
        self.h
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    /// IoU of two center-aligned boxes; they overlap in exactly min(w) x min(h).
    pub fn iou(&self, other: &AnchorBox) -> f64 {
        let inter = self.w.min(other.w) * self.h.min(other.h);
        inter / (self.area() + other.area() - inter)
    }
}

pub(crate) fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// `a.len() x b.len()` matrix with entry `(i, j) = IoU(a[i], b[j])`.
pub fn pairwise_iou(a: &[AnchorBox], b: &[AnchorBox]) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i].iou(&b[j]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(w: f64, h: f64) -> AnchorBox {
        AnchorBox::new(w, h).unwrap()
    }

    #[test]
    fn rejects_degenerate_sides() {
        assert!(AnchorBox::new(0.0, 1.0).is_err());
        assert!(AnchorBox::new(1.0, -2.0).is_err());
        assert!(AnchorBox::new(f64::NAN, 1.0).is_err());
        assert!(AnchorBox::new(f64::INFINITY, 1.0).is_err());
        assert!(AnchorBox::from_scale_aspect(1.0, 0.0).is_err());
    }

    #[test]
    fn self_iou_is_one() {
        let x = b(0.3, 1.7);
        assert!((x.iou(&x) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn contained_box_gives_area_ratio() {
        let outer = b(4.0, 3.0);
        let inner = b(2.0, 1.5);
        assert!((outer.iou(&inner) - inner.area() / outer.area()).abs() < 1e-12);
        assert!((inner.iou(&outer) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn crossing_boxes() {
        // 2x1 over 1x2: overlap 1x1, union 2 + 2 - 1
        assert!((b(2.0, 1.0).iou(&b(1.0, 2.0)) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn scale_aspect_keeps_area() {
        let x = AnchorBox::from_scale_aspect(2.0, 1.5).unwrap();
        assert!((x.width() - 3.0).abs() < 1e-12);
        assert!((x.height() - 2.0 / 1.5).abs() < 1e-12);
        assert!((x.area() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn matrix_shape_and_entries() {
        let a = [b(2.0, 2.0), b(1.0, 1.0)];
        let m = pairwise_iou(&a, &[b(1.0, 1.0), b(2.0, 1.0), b(0.5, 0.5)]);
        assert_eq!(m.dim(), (2, 3));
        assert!((m[[0, 0]] - 0.25).abs() < 1e-12);
        assert!((m[[1, 0]] - 1.0).abs() < 1e-12);
        assert!((m[[0, 1]] - 0.5).abs() < 1e-12);
        assert!((m[[1, 2]] - 0.25).abs() < 1e-12);
    }
}
