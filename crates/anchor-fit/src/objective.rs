use ndarray::Axis;

use crate::error::{FitError, Result};
use crate::geometry::{pairwise_iou, AnchorBox};
use crate::tiers::{candidates, check_multiplier, check_scales, Layout};

/// Mean best-match IoU of an empirical box set against generated anchors.
///
/// Holds the empirical boxes by reference so the optimizer can score many
/// aspect vectors without copying them.
#[derive(Debug, Clone)]
pub struct AverageIou<'a> {
    boxes: &'a [AnchorBox],
    scales: Vec<f64>,
    multiplier: f64,
    layout: Layout,
}

impl<'a> AverageIou<'a> {
    pub fn new(boxes: &'a [AnchorBox], scales: Vec<f64>) -> Result<Self> {
        if boxes.is_empty() {
            return Err(FitError::invalid("empirical box set is empty"));
        }
        check_scales(&scales)?;
        Ok(Self { boxes, scales, multiplier: 1.0, layout: Layout::Paired })
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Result<Self> {
        check_multiplier(multiplier)?;
        self.multiplier = multiplier;
        Ok(self)
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn candidates(&self, aspects: &[f64]) -> Result<Vec<AnchorBox>> {
        candidates(self.layout, &self.scales, aspects, self.multiplier)
    }

    /// Each empirical box is credited with its best candidate; returns the mean, in `[0, 1]`.
    pub fn score(&self, aspects: &[f64]) -> Result<f64> {
        let cands = self.candidates(aspects)?;
        let ious = pairwise_iou(&cands, self.boxes);
        let best = ious.fold_axis(Axis(0), 0.0f64, |m, &v| m.max(v));
        best.mean().ok_or_else(|| FitError::invalid("empirical box set is empty"))
    }
}

/// One-shot paired-layout objective.
pub fn average_iou(aspects: &[f64], scales: &[f64], multiplier: f64, boxes: &[AnchorBox]) -> Result<f64> {
    AverageIou::new(boxes, scales.to_vec())?.with_multiplier(multiplier)?.score(aspects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxes(v: &[(f64, f64)]) -> Vec<AnchorBox> {
        v.iter().map(|&(w, h)| AnchorBox::new(w, h).unwrap()).collect()
    }

    #[test]
    fn two_tier_exact_match() {
        let emp = boxes(&[(1.0, 1.0)]);
        let obj = AverageIou::new(&emp, vec![2.0, 1.0]).unwrap();
        let c = obj.candidates(&[1.0, 1.0]).unwrap();
        assert_eq!(c, boxes(&[(2.0, 2.0), (1.0, 1.0)]));
        assert!((c[0].iou(&emp[0]) - 0.25).abs() < 1e-12);
        assert!((obj.score(&[1.0, 1.0]).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_candidate_is_plain_mean() {
        let emp = boxes(&[(1.0, 1.0), (2.0, 0.5), (0.5, 0.5), (3.0, 3.0)]);
        let got = average_iou(&[1.5], &[1.0], 1.0, &emp).unwrap();
        let cand = AnchorBox::from_scale_aspect(1.0, 1.5).unwrap();
        let want = emp.iter().map(|b| cand.iou(b)).sum::<f64>() / emp.len() as f64;
        assert!((got - want).abs() < 1e-12);
    }

    #[test]
    fn best_match_per_box() {
        let emp = boxes(&[(1.0, 1.0), (2.0, 2.0)]);
        // candidates (1,1) and (4,4): box (2,2) scores max(0.25, 0.25)
        let got = average_iou(&[1.0, 1.0], &[1.0, 4.0], 1.0, &emp).unwrap();
        assert!((got - 0.625).abs() < 1e-12);
    }

    #[test]
    fn repeated_scoring_is_identical() {
        let emp = boxes(&[(0.7, 1.3), (2.0, 0.4), (1.1, 1.0)]);
        let obj = AverageIou::new(&emp, vec![1.0, 0.5, 2.0]).unwrap();
        let a = obj.score(&[0.8, 1.2, 1.0]).unwrap();
        let b = obj.score(&[0.8, 1.2, 1.0]).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn length_mismatch_is_invalid_input() {
        let emp = boxes(&[(1.0, 1.0)]);
        let obj = AverageIou::new(&emp, vec![2.0, 1.0]).unwrap();
        assert!(matches!(obj.score(&[]), Err(FitError::InvalidInput(_))));
        assert!(matches!(obj.score(&[1.0]), Err(FitError::InvalidInput(_))));
        assert!(matches!(obj.score(&[1.0, 1.0, 1.0]), Err(FitError::InvalidInput(_))));
    }

    #[test]
    fn cross_layout_ignores_tier_count() {
        let emp = boxes(&[(1.0, 1.0)]);
        let obj = AverageIou::new(&emp, vec![2.0, 1.0, 0.5]).unwrap().with_layout(Layout::Cross);
        assert!((obj.score(&[1.0]).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(obj.candidates(&[1.0, 2.0]).unwrap().len(), 6);
    }

    #[test]
    fn rejects_empty_boxes_and_bad_multiplier() {
        assert!(AverageIou::new(&[], vec![1.0]).is_err());
        let emp = boxes(&[(1.0, 1.0)]);
        assert!(AverageIou::new(&emp, vec![1.0]).unwrap().with_multiplier(-1.0).is_err());
        assert!(AverageIou::new(&emp, vec![]).is_err());
    }
}
