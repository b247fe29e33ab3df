//! Derivative-free minimization with the Nelder-Mead downhill simplex.
//!
//! The defaults follow the widely used reference behavior: a start simplex
//! built by nudging each coordinate by 5%, reflection/expansion/contraction/
//! shrink coefficients of 1, 2, 0.5, 0.5, and a stop once both the simplex
//! spread and the spread of its values fall under `1e-4`, or after `200 * n`
//! iterations / evaluations.

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, PartialEq)]
pub enum SimplexError {
    #[error("start point is empty")]
    EmptyStart,
    #[error("start point has a non-finite coordinate at index {0}")]
    NonFiniteStart(usize),
    #[error("invalid option: {0}")]
    InvalidOption(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Simplex and value spread both under tolerance.
    Converged,
    MaxIterations,
    MaxEvaluations,
}

impl Termination {
    pub fn is_converged(self) -> bool {
        self == Termination::Converged
    }
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
pub struct NelderMead {
    pub xatol: f64,
    pub fatol: f64,
    /// `None` means `200 * n`.
    pub max_iter: Option<usize>,
    /// `None` means `200 * n`.
    pub max_evals: Option<usize>,
    /// Relative nudge of non-zero coordinates when building the start simplex.
    pub nonzero_delta: f64,
    /// Absolute nudge used for zero coordinates.
    pub zero_delta: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            xatol: 1e-4,
            fatol: 1e-4,
            max_iter: None,
            max_evals: None,
            nonzero_delta: 0.05,
            zero_delta: 0.00025,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerances(mut self, xatol: f64, fatol: f64) -> Self {
        self.xatol = xatol;
        self.fatol = fatol;
        self
    }

    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.max_iter = Some(n);
        self
    }

    pub fn with_max_evals(mut self, n: usize) -> Self {
        self.max_evals = Some(n);
        self
    }

    fn validate(&self) -> Result<(), SimplexError> {
        if self.xatol.is_nan() || self.xatol < 0.0 {
            return Err(SimplexError::InvalidOption("xatol must be >= 0"));
        }
        if self.fatol.is_nan() || self.fatol < 0.0 {
            return Err(SimplexError::InvalidOption("fatol must be >= 0"));
        }
        if !(self.nonzero_delta.is_finite() && self.nonzero_delta != 0.0) {
            return Err(SimplexError::InvalidOption("nonzero_delta must be finite and non-zero"));
        }
        if !(self.zero_delta.is_finite() && self.zero_delta != 0.0) {
            return Err(SimplexError::InvalidOption("zero_delta must be finite and non-zero"));
        }
        if self.max_iter == Some(0) || self.max_evals == Some(0) {
            return Err(SimplexError::InvalidOption("iteration/evaluation limits must be > 0"));
        }
        Ok(())
    }

    /// Minimize `cost` starting from `x0`. NaN costs rank as +inf.
    pub fn minimize<F>(&self, mut cost: F, x0: &[f64]) -> Result<Minimum, SimplexError>
    where
        F: FnMut(&[f64]) -> f64,
    {
        self.validate()?;
        let n = x0.len();
        if n == 0 {
            return Err(SimplexError::EmptyStart);
        }
        if let Some(i) = x0.iter().position(|v| !v.is_finite()) {
            return Err(SimplexError::NonFiniteStart(i));
        }

        let max_iter = self.max_iter.unwrap_or(200 * n);
        let max_evals = self.max_evals.unwrap_or(200 * n);

        let mut f = Counted { cost: &mut cost, calls: 0 };

        let mut sim: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        sim.push(x0.to_vec());
        for k in 0..n {
            let mut y = x0.to_vec();
            if y[k] != 0.0 {
                y[k] *= 1.0 + self.nonzero_delta;
            } else {
                y[k] = self.zero_delta;
            }
            sim.push(y);
        }
        let mut fsim: Vec<f64> = sim.iter().map(|x| f.eval(x)).collect();
        sort_simplex(&mut sim, &mut fsim);

        let mut iterations = 1usize;
        while f.calls < max_evals && iterations < max_iter {
            if self.spread_ok(&sim, &fsim) {
                break;
            }

            let worst = n;
            let xbar = centroid(&sim[..worst]);

            let xr = affine(&xbar, &sim[worst], 1.0 + REFLECT, -REFLECT);
            let fxr = f.eval(&xr);
            let mut shrink = false;

            if fxr < fsim[0] {
                let xe = affine(&xbar, &sim[worst], 1.0 + REFLECT * EXPAND, -REFLECT * EXPAND);
                let fxe = f.eval(&xe);
                if fxe < fxr {
                    sim[worst] = xe;
                    fsim[worst] = fxe;
                } else {
                    sim[worst] = xr;
                    fsim[worst] = fxr;
                }
            } else if fxr < fsim[worst - 1] {
                sim[worst] = xr;
                fsim[worst] = fxr;
            } else if fxr < fsim[worst] {
                // outside contraction
                let xc = affine(&xbar, &sim[worst], 1.0 + CONTRACT * REFLECT, -CONTRACT * REFLECT);
                let fxc = f.eval(&xc);
                if fxc <= fxr {
                    sim[worst] = xc;
                    fsim[worst] = fxc;
                } else {
                    shrink = true;
                }
            } else {
                // inside contraction
                let xcc = affine(&xbar, &sim[worst], 1.0 - CONTRACT, CONTRACT);
                let fxcc = f.eval(&xcc);
                if fxcc < fsim[worst] {
                    sim[worst] = xcc;
                    fsim[worst] = fxcc;
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = sim[0].clone();
                for j in 1..=n {
                    sim[j] = affine(&best, &sim[j], 1.0 - SHRINK, SHRINK);
                    fsim[j] = f.eval(&sim[j]);
                }
            }

            sort_simplex(&mut sim, &mut fsim);
            iterations += 1;

            if iterations % 50 == 0 {
                debug!(iterations, evaluations = f.calls, best = fsim[0], "simplex progress");
            }
        }

        let evaluations = f.calls;
        let termination = if evaluations >= max_evals {
            Termination::MaxEvaluations
        } else if iterations >= max_iter {
            Termination::MaxIterations
        } else {
            Termination::Converged
        };
        info!(?termination, iterations, evaluations, value = fsim[0], "simplex finished");

        Ok(Minimum {
            x: sim.swap_remove(0),
            value: fsim[0],
            iterations,
            evaluations,
            termination,
        })
    }

    fn spread_ok(&self, sim: &[Vec<f64>], fsim: &[f64]) -> bool {
        let best = &sim[0];
        let x_spread = sim[1..]
            .iter()
            .flat_map(|v| v.iter().zip(best).map(|(a, b)| (a - b).abs()))
            .fold(0.0f64, f64::max);
        let f_spread = fsim[1..].iter().map(|f| (f - fsim[0]).abs()).fold(0.0f64, f64::max);
        x_spread <= self.xatol && f_spread <= self.fatol
    }
}

struct Counted<'a, F> {
    cost: &'a mut F,
    calls: usize,
}

impl<F: FnMut(&[f64]) -> f64> Counted<'_, F> {
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.calls += 1;
        let v = (self.cost)(x);
        if v.is_nan() { f64::INFINITY } else { v }
    }
}

// a*x + b*y
fn affine(x: &[f64], y: &[f64], a: f64, b: f64) -> Vec<f64> {
    x.iter().zip(y).map(|(xi, yi)| a * xi + b * yi).collect()
}

fn centroid(points: &[Vec<f64>]) -> Vec<f64> {
    let n = points.len() as f64;
    let mut c = vec![0.0; points[0].len()];
    for p in points {
        for (ci, pi) in c.iter_mut().zip(p) {
            *ci += pi;
        }
    }
    c.iter_mut().for_each(|ci| *ci /= n);
    c
}

// Stable sort by value so ties keep their simplex order.
fn sort_simplex(sim: &mut Vec<Vec<f64>>, fsim: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..fsim.len()).collect();
    order.sort_by(|&a, &b| fsim[a].total_cmp(&fsim[b]));
    *sim = order.iter().map(|&i| sim[i].clone()).collect();
    *fsim = order.iter().map(|&i| fsim[i]).collect();
}
