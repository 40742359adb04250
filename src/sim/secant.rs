//! Secant root finding over an expensive, monotone-ish objective.
//!
//! The routine drives an `evaluate(x)` callback until the observed metric
//! lands within `tolerance` of `target`, the caller's continue-condition
//! goes false, the metric stops moving, or the trial budget runs out.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Why a secant search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Metric landed within tolerance of the target.
    Converged,
    /// The caller's continue-condition went false.
    ConditionMet,
    /// Metric did not move between the last two trials; the stalled trial
    /// was discarded.
    Stalled,
    /// Trial budget exhausted before any other stop condition held.
    TrialLimit,
}

impl Termination {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::ConditionMet => "condition_met",
            Self::Stalled => "stalled",
            Self::TrialLimit => "trial_limit",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecantSettings {
    pub target: f64,
    pub tolerance: f64,
    /// Step from the first point to the second, before a slope exists.
    pub bootstrap_step: f64,
    /// Upper bound on evaluations, at least 2.
    pub max_trials: usize,
}

/// What the search needs to know about an evaluated trial.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub x: f64,
    pub metric: f64,
    pub keep_going: bool,
}

/// Ordered trials plus the reason the search stopped.
#[derive(Debug, Clone)]
pub struct SecantOutcome<P> {
    pub trials: Vec<P>,
    pub termination: Termination,
    /// The trial dropped on a stall, kept for logging.
    pub discarded: Option<P>,
}

impl<P> SecantOutcome<P> {
    /// The accepted trial: the last one retained.
    pub fn accepted(&self) -> Option<&P> {
        self.trials.last()
    }
}

/// Next abscissa by secant extrapolation through `(x0, m0)` and `(x1, m1)`.
/// Returns `None` when the two metrics are equal.
///
/// ```
/// use res_storage_sim::sim::secant::secant_step;
///
/// // Line m = 2x, aiming for m = 10.
/// assert_eq!(secant_step(1.0, 2.0, 2.0, 4.0, 10.0), Some(5.0));
/// assert_eq!(secant_step(1.0, 3.0, 2.0, 3.0, 10.0), None);
/// ```
pub fn secant_step(x0: f64, m0: f64, x1: f64, m1: f64, target: f64) -> Option<f64> {
    let dm = m1 - m0;
    if dm == 0.0 {
        return None;
    }
    Some(x1 + (x1 - x0) / dm * (target - m1))
}

/// Runs the search from `x0`.
///
/// # Arguments
///
/// * `settings` - Target, tolerance, bootstrap step and trial budget
/// * `x0` - First abscissa to evaluate
/// * `evaluate` - Produces a trial for an abscissa
/// * `read` - Reads abscissa, metric and continue-condition from a trial
///
/// # Errors
///
/// Propagates `evaluate` errors. Returns
/// [`SimError::NegativeCapacityProjection`] when the secant projects below
/// zero and [`SimError::DivisionUndefined`] when it projects a non-finite value.
pub fn solve<P>(
    settings: &SecantSettings,
    x0: f64,
    mut evaluate: impl FnMut(f64) -> Result<P>,
    read: impl Fn(&P) -> Reading,
) -> Result<SecantOutcome<P>> {
    let max_trials = settings.max_trials.max(2);
    let mut trials: Vec<P> = Vec::new();
    let mut x = x0;

    loop {
        trials.push(evaluate(x)?);
        let n = trials.len();
        let last = read(&trials[n - 1]);

        if !last.keep_going {
            return Ok(SecantOutcome {
                trials,
                termination: Termination::ConditionMet,
                discarded: None,
            });
        }
        if (settings.target - last.metric).abs() <= settings.tolerance {
            return Ok(SecantOutcome {
                trials,
                termination: Termination::Converged,
                discarded: None,
            });
        }
        if n >= max_trials {
            return Ok(SecantOutcome {
                trials,
                termination: Termination::TrialLimit,
                discarded: None,
            });
        }
        if n < 2 {
            x = last.x + settings.bootstrap_step;
            continue;
        }

        let prev = read(&trials[n - 2]);
        let Some(next) = secant_step(prev.x, prev.metric, last.x, last.metric, settings.target)
        else {
            let discarded = trials.pop();
            return Ok(SecantOutcome {
                trials,
                termination: Termination::Stalled,
                discarded,
            });
        };
        if !next.is_finite() {
            return Err(SimError::DivisionUndefined {
                metric: "secant slope",
            });
        }
        if next < 0.0 {
            return Err(SimError::NegativeCapacityProjection {
                capacity_mwh: next,
                trial: n - 1,
            });
        }
        x = next;
    }
}
