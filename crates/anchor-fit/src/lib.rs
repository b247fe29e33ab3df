//! Anchor aspect-ratio fitting.
//!
//! Scores a set of anchor shapes by the mean best-match IoU they reach on a
//! dump of measured ground-truth boxes and searches for the aspect ratios
//! that maximize it.

pub mod dump;
pub mod error;
pub mod fit;
pub mod geometry;
pub mod objective;
pub mod tiers;

pub use anchor_simplex::{NelderMead, Termination};
pub use dump::{load_boxes, BoxDump, DumpFormat, LoadOptions};
pub use error::{FitError, Result};
pub use fit::{fit_aspects, spread_guess, sweep, Fit};
pub use geometry::{pairwise_iou, AnchorBox};
pub use objective::{average_iou, AverageIou};
pub use tiers::{candidates, pair_tiers, AnchorTier, Layout};

pub const DEFAULT_DUMP_PATH: &str = "weights/bboxes.pkl";

/// Prediction-head feature map sizes; tier `i` has scale `1 / size`.
pub const DEFAULT_CONV_SIZES: [u32; 6] = [35, 19, 10, 5, 3, 2];

/// Best three ratios found with the shared-ratio layout.
pub const SEED_ASPECTS: [f64; 3] = [0.55789698, 1.31440645, 0.84627934];

pub fn scales_from_conv_sizes(sizes: &[u32]) -> Vec<f64> {
    sizes.iter().map(|&s| 1.0 / s as f64).collect()
}

pub fn default_scales() -> Vec<f64> {
    scales_from_conv_sizes(&DEFAULT_CONV_SIZES)
}

/// Start vector for `tiers` scale tiers: the seed ratios as-is for the cross
/// layout, repeated to length `tiers` for the paired one.
pub fn default_initial_guess(layout: Layout, tiers: usize) -> Vec<f64> {
    match layout {
        Layout::Cross => SEED_ASPECTS.to_vec(),
        Layout::Paired => SEED_ASPECTS.iter().copied().cycle().take(tiers).collect(),
    }
}
