use anyhow::{Context, Result};
use tracing::warn;

use anchor_fit::tiers::{check_aspects, check_multiplier, check_scales as check_scale_list, pair_tiers};
use anchor_fit::{BoxDump, Layout};

pub fn check_scales(scales: &[f64], multiplier: f64) -> Result<()> {
    check_scale_list(scales).context("anchors.scales / anchors.conv_sizes")?;
    check_multiplier(multiplier).context("anchors.scale_multiplier")?;
    Ok(())
}

pub fn check_guess(layout: Layout, guess: &[f64], scales: &[f64]) -> Result<()> {
    check_aspects(guess).context("search.initial_guess")?;
    if layout == Layout::Paired {
        pair_tiers(scales, guess).context("search.initial_guess must have one ratio per paired tier")?;
    }
    Ok(())
}

pub fn check_search(xatol: f64, fatol: f64, max_iter: Option<usize>, max_evals: Option<usize>) -> Result<()> {
    anyhow::ensure!(xatol >= 0.0 && fatol >= 0.0, "search tolerances must be >= 0");
    anyhow::ensure!(max_iter != Some(0) && max_evals != Some(0), "search limits must be > 0");
    Ok(())
}

pub fn check_dump(dump: &BoxDump) -> Result<()> {
    anyhow::ensure!(!dump.boxes.is_empty(), "dump has no usable boxes");
    if dump.skipped * 10 > dump.records {
        warn!(skipped = dump.skipped, records = dump.records, "more than 10% of dump records are degenerate");
    }
    Ok(())
}
