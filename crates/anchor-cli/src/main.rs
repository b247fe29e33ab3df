use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use anchor_fit::{
    default_initial_guess, fit_aspects, load_boxes, scales_from_conv_sizes, sweep, AnchorBox, AverageIou, BoxDump,
    DumpFormat, Layout, LoadOptions, NelderMead, DEFAULT_CONV_SIZES, DEFAULT_DUMP_PATH,
};

mod doctor;

#[derive(Debug, Parser)]
#[command(name = "anchorfit", version, about = "Fit anchor aspect ratios to measured ground-truth box shapes")]
struct Cli {
    /// TOML config; compiled-in defaults are used when absent.
    #[arg(long)]
    config: Option<String>,

    /// Box dump to read (overrides dump.path).
    #[arg(long)]
    dump: Option<String>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fit the aspect ratios (default).
    Optimize,
    /// Print the average IoU reached by a fixed set of aspect ratios.
    Eval {
        #[arg(long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
        aspects: Vec<f64>,
    },
    /// Fit 1..=N ratios shared by every scale tier.
    Sweep {
        #[arg(long, default_value_t = 5)]
        max_ratios: usize,
    },
    /// Check config and dump without fitting.
    Doctor,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    dump: DumpCfg,
    anchors: AnchorsCfg,
    search: SearchCfg,
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct DumpCfg {
    path: String,
    format: DumpFormat,
    skip_degenerate: bool,
}

impl Default for DumpCfg {
    fn default() -> Self {
        Self { path: DEFAULT_DUMP_PATH.to_string(), format: DumpFormat::Auto, skip_degenerate: false }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct AnchorsCfg {
    layout: Layout,
    conv_sizes: Vec<u32>,
    /// Explicit scales win over conv_sizes.
    scales: Option<Vec<f64>>,
    scale_multiplier: f64,
}

impl Default for AnchorsCfg {
    fn default() -> Self {
        Self { layout: Layout::Paired, conv_sizes: DEFAULT_CONV_SIZES.to_vec(), scales: None, scale_multiplier: 1.0 }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct SearchCfg {
    initial_guess: Option<Vec<f64>>,
    xatol: f64,
    fatol: f64,
    max_iter: Option<usize>,
    max_evals: Option<usize>,
}

impl Default for SearchCfg {
    fn default() -> Self {
        let nm = NelderMead::default();
        Self { initial_guess: None, xatol: nm.xatol, fatol: nm.fatol, max_iter: None, max_evals: None }
    }
}

impl Config {
    fn scales(&self) -> Vec<f64> {
        match &self.anchors.scales {
            Some(s) => s.clone(),
            None => scales_from_conv_sizes(&self.anchors.conv_sizes),
        }
    }

    fn initial_guess(&self) -> Vec<f64> {
        self.search
            .initial_guess
            .clone()
            .unwrap_or_else(|| default_initial_guess(self.anchors.layout, self.scales().len()))
    }

    fn nelder_mead(&self) -> NelderMead {
        NelderMead {
            xatol: self.search.xatol,
            fatol: self.search.fatol,
            max_iter: self.search.max_iter,
            max_evals: self.search.max_evals,
            ..NelderMead::default()
        }
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions { format: self.dump.format, skip_degenerate: self.dump.skip_degenerate }
    }
}

fn load_config(path: &str) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {path}"))?;
    toml::from_str(&s).context("parse config toml")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut cfg = match &cli.config {
        Some(p) => load_config(p)?,
        None => Config::default(),
    };
    if let Some(d) = cli.dump {
        cfg.dump.path = d;
    }

    match cli.cmd.unwrap_or(Command::Optimize) {
        Command::Optimize => optimize(&cfg),
        Command::Eval { aspects } => eval(&cfg, &aspects),
        Command::Sweep { max_ratios } => sweep_cmd(&cfg, max_ratios),
        Command::Doctor => doctor(&cfg),
    }
}

fn load_dump(cfg: &Config) -> Result<BoxDump> {
    load_boxes(&cfg.dump.path, &cfg.load_options()).with_context(|| format!("load box dump {}", cfg.dump.path))
}

fn objective<'a>(cfg: &Config, boxes: &'a [AnchorBox]) -> Result<AverageIou<'a>> {
    Ok(AverageIou::new(boxes, cfg.scales())?
        .with_multiplier(cfg.anchors.scale_multiplier)?
        .with_layout(cfg.anchors.layout))
}

fn optimize(cfg: &Config) -> Result<()> {
    let dump = load_dump(cfg)?;
    let obj = objective(cfg, &dump.boxes)?;
    let fit = fit_aspects(&obj, &cfg.initial_guess(), &cfg.nelder_mead()).context("fit aspect ratios")?;
    if !fit.termination.is_converged() {
        warn!(termination = ?fit.termination, "search stopped before converging");
    }

    println!("Optimization Result: {}", fmt_ratios(&fit.aspects));
    println!("Avg IoU: {:.4}", fit.avg_iou);
    Ok(())
}

fn eval(cfg: &Config, aspects: &[f64]) -> Result<()> {
    let dump = load_dump(cfg)?;
    let obj = objective(cfg, &dump.boxes)?;
    let v = obj.score(aspects).context("score aspect ratios")?;
    println!("Avg IoU: {:.4}", v);
    Ok(())
}

fn sweep_cmd(cfg: &Config, max_ratios: usize) -> Result<()> {
    anyhow::ensure!(max_ratios >= 1, "--max-ratios must be >= 1");
    let dump = load_dump(cfg)?;
    let obj = objective(cfg, &dump.boxes)?;
    for fit in sweep(&obj, max_ratios, &cfg.nelder_mead())? {
        println!("mIoU = {:.4}  {}", fit.avg_iou, fmt_ratios(&fit.aspects));
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");
    let scales = cfg.scales();
    doctor::check_scales(&scales, cfg.anchors.scale_multiplier)?;
    doctor::check_guess(cfg.anchors.layout, &cfg.initial_guess(), &scales)?;
    doctor::check_search(cfg.search.xatol, cfg.search.fatol, cfg.search.max_iter, cfg.search.max_evals)?;

    let dump = load_dump(cfg)?;
    doctor::check_dump(&dump)?;

    let obj = objective(cfg, &dump.boxes)?;
    let start = obj.score(&cfg.initial_guess())?;
    info!(boxes = dump.boxes.len(), start_iou = start, "doctor: OK");
    Ok(())
}

fn fmt_ratios(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|a| format!("{:.8}", a)).collect();
    format!("[{}]", parts.join(" "))
}
