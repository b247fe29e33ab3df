use anchor_simplex::{NelderMead, Termination};
use tracing::info;

use crate::error::Result;
use crate::objective::AverageIou;
use crate::tiers::{check_aspects, Layout};

#[derive(Debug, Clone)]
pub struct Fit {
    pub aspects: Vec<f64>,
    pub avg_iou: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

/// Maximize the average IoU over aspect ratios with a simplex search.
///
/// The search variable is `ln(aspect)`, so every point the simplex visits maps
/// to strictly positive ratios. Points whose anchors overflow score as NaN,
/// which the simplex ranks last.
pub fn fit_aspects(objective: &AverageIou<'_>, initial: &[f64], search: &NelderMead) -> Result<Fit> {
    check_aspects(initial)?;
    let start_iou = objective.score(initial)?;
    info!(
        ratios = initial.len(),
        layout = ?objective.layout(),
        start_iou,
        "fitting aspect ratios"
    );

    let theta0: Vec<f64> = initial.iter().map(|a| a.ln()).collect();
    let cost = |theta: &[f64]| {
        let aspects: Vec<f64> = theta.iter().map(|t| t.exp()).collect();
        objective.score(&aspects).map(|v| -v).unwrap_or(f64::NAN)
    };
    let min = search.minimize(cost, &theta0)?;

    let aspects: Vec<f64> = min.x.iter().map(|t| t.exp()).collect();
    let avg_iou = objective.score(&aspects)?;
    info!(avg_iou, iterations = min.iterations, "fit done");

    Ok(Fit {
        aspects,
        avg_iou,
        iterations: min.iterations,
        evaluations: min.evaluations,
        termination: min.termination,
    })
}

/// `count` ratios spread evenly in log-space over `[0.5, 2]`, at cell centers.
pub fn spread_guess(count: usize) -> Vec<f64> {
    let (lo, hi) = (0.5f64.ln(), 2.0f64.ln());
    (0..count)
        .map(|i| (lo + (i as f64 + 0.5) / count as f64 * (hi - lo)).exp())
        .collect()
}

/// Fit 1..=`max_ratios` ratios shared across all scale tiers.
pub fn sweep(objective: &AverageIou<'_>, max_ratios: usize, search: &NelderMead) -> Result<Vec<Fit>> {
    let cross = objective.clone().with_layout(Layout::Cross);
    (1..=max_ratios)
        .map(|k| fit_aspects(&cross, &spread_guess(k), search))
        .collect()
}
