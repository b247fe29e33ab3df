use serde::Deserialize;

use crate::error::{FitError, Result};
use crate::geometry::{is_positive, AnchorBox};

/// How aspect ratios are spread over the reference scale tiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Aspect `i` belongs to scale tier `i`; both lists have the same length.
    #[default]
    Paired,
    /// Every aspect is applied at every tier.
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorTier {
    pub scale: f64,
    pub aspect: f64,
}

impl AnchorTier {
    pub fn anchor(&self) -> Result<AnchorBox> {
        AnchorBox::from_scale_aspect(self.scale, self.aspect)
    }
}

/// Zip scales with aspects, failing instead of truncating on a length mismatch.
pub fn pair_tiers(scales: &[f64], aspects: &[f64]) -> Result<Vec<AnchorTier>> {
    if scales.len() != aspects.len() {
        return Err(FitError::invalid(format!(
            "{} aspect ratios for {} scale tiers",
            aspects.len(),
            scales.len()
        )));
    }
    Ok(scales
        .iter()
        .zip(aspects)
        .map(|(&scale, &aspect)| AnchorTier { scale, aspect })
        .collect())
}

pub fn check_scales(scales: &[f64]) -> Result<()> {
    if scales.is_empty() {
        return Err(FitError::invalid("scale list is empty"));
    }
    if let Some(s) = scales.iter().find(|s| !is_positive(**s)) {
        return Err(FitError::invalid(format!("scale {s} is not finite and > 0")));
    }
    Ok(())
}

pub fn check_aspects(aspects: &[f64]) -> Result<()> {
    if aspects.is_empty() {
        return Err(FitError::invalid("aspect ratio vector is empty"));
    }
    if let Some(a) = aspects.iter().find(|a| !is_positive(**a)) {
        return Err(FitError::invalid(format!("aspect ratio {a} is not finite and > 0")));
    }
    Ok(())
}

pub fn check_multiplier(multiplier: f64) -> Result<()> {
    if !is_positive(multiplier) {
        return Err(FitError::invalid(format!("scale multiplier {multiplier} is not finite and > 0")));
    }
    Ok(())
}

/// Candidate anchors for `aspects` over `scales`, every scale multiplied by `multiplier`.
pub fn candidates(layout: Layout, scales: &[f64], aspects: &[f64], multiplier: f64) -> Result<Vec<AnchorBox>> {
    check_scales(scales)?;
    check_aspects(aspects)?;
    check_multiplier(multiplier)?;

    let tiers = match layout {
        Layout::Paired => pair_tiers(scales, aspects)?,
        Layout::Cross => aspects
            .iter()
            .flat_map(|&aspect| scales.iter().map(move |&scale| AnchorTier { scale, aspect }))
            .collect(),
    };

    tiers
        .into_iter()
        .map(|t| AnchorTier { scale: t.scale * multiplier, ..t }.anchor())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_builds_one_box_per_tier() {
        let c = candidates(Layout::Paired, &[2.0, 1.0], &[1.0, 1.0], 1.0).unwrap();
        assert_eq!(c, vec![AnchorBox::new(2.0, 2.0).unwrap(), AnchorBox::new(1.0, 1.0).unwrap()]);
    }

    #[test]
    fn paired_rejects_length_mismatch() {
        let err = candidates(Layout::Paired, &[2.0, 1.0], &[1.0], 1.0).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
        let err = candidates(Layout::Paired, &[2.0, 1.0], &[], 1.0).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));
        assert!(pair_tiers(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn cross_applies_every_aspect_to_every_scale() {
        let c = candidates(Layout::Cross, &[4.0, 1.0, 0.5], &[2.0, 0.5], 1.0).unwrap();
        assert_eq!(c.len(), 6);
        assert!((c[0].width() - 8.0).abs() < 1e-12);
        assert!((c[0].height() - 2.0).abs() < 1e-12);
        assert!((c[5].width() - 0.25).abs() < 1e-12);
        assert!((c[5].height() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn multiplier_scales_sides() {
        let c = candidates(Layout::Paired, &[0.5], &[2.0], 3.0).unwrap();
        assert!((c[0].width() - 3.0).abs() < 1e-12);
        assert!((c[0].height() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_values() {
        assert!(candidates(Layout::Paired, &[1.0], &[-1.0], 1.0).is_err());
        assert!(candidates(Layout::Paired, &[0.0], &[1.0], 1.0).is_err());
        assert!(candidates(Layout::Paired, &[1.0], &[1.0], 0.0).is_err());
        assert!(candidates(Layout::Cross, &[], &[1.0], 1.0).is_err());
    }
}
