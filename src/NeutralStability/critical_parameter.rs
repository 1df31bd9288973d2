//! # Critical activation energy by bisection
//!
//! ## Purpose
//! For a fixed heat release `q` the fundamental mode is stable (negative growth rate) at
//! small activation energy and unstable at large. The neutral-stability value θ* where
//! the growth rate changes sign is located by bisection over a bracket
//! `[theta_lower, theta_upper]`, asking a `StabilityOracle` for the growth rate at both
//! ends of the current bracket in every iteration.
//!
//! ## Update rules
//! With effective rates `g_a` (lower) and `g_b` (upper):
//! - `g_a < 0 < g_b`: the endpoint with the larger |g| is replaced by the midpoint;
//! - `g_a > 0, g_b > 0`: the lower bound has moved past θ*. The lower history is
//!   rewound to its most recent stable observation θ_s and the bracket becomes
//!   `[(θ_s + a)/2, a]`;
//! - `g_a < 0, g_b < 0`: symmetric, with the most recent unstable observation θ_u of the
//!   upper history: `[b, (b + θ_u)/2]`;
//! - anything else (a zero rate) is an error.
//!
//! ## Non-Obvious Features
//! - Indefinite oracle answers get an effective sign. Failures of the perturbation
//!   analysis or of the steady state count as unstable, other failures count as
//!   stable at the lower bound and unstable at the upper. Their magnitude is infinite,
//!   so such an endpoint is always the one replaced. Every substitution is logged.
//! - Solvers sometimes report a spurious unstable mode at the initial lower bound; with
//!   `distrust_unstable_lower_bound` a positive rate there is taken as stable.
//! - Oracle answers are memoised per θ: every activation energy is computed once.
//! - Termination: by default both endpoint rates must be resolved and below
//!   `growth_rate_tol` (`TerminationRule::BothEndpoints`); `AnyEndpoint` stops as soon
//!   as one of them is.

use super::neutral_stability_error::NeutralStabilityError;
use super::stability_oracle::{ModeEstimate, OracleFailure, StabilityOracle};
use log::{info, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationRule {
    BothEndpoints,
    AnyEndpoint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BisectionConfig {
    pub growth_rate_tol: f64,
    pub max_iterations: usize,
    /// the bracket is collapsed when |a - b| <= collapse_atol + collapse_rtol·|b|
    pub collapse_rtol: f64,
    pub collapse_atol: f64,
    pub distrust_unstable_lower_bound: bool,
    pub termination: TerminationRule,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            growth_rate_tol: 1e-3,
            max_iterations: 100,
            collapse_rtol: 1e-10,
            collapse_atol: 1e-8,
            distrust_unstable_lower_bound: true,
            termination: TerminationRule::BothEndpoints,
        }
    }
}

impl BisectionConfig {
    pub fn new(growth_rate_tol: f64, max_iterations: usize) -> Self {
        Self {
            growth_rate_tol,
            max_iterations,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), NeutralStabilityError> {
        if !(self.growth_rate_tol > 0.0) {
            return Err(NeutralStabilityError::InvalidConfiguration(
                "growth_rate_tol must be positive".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(NeutralStabilityError::InvalidConfiguration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.collapse_rtol >= 0.0 && self.collapse_atol >= 0.0) {
            return Err(NeutralStabilityError::InvalidConfiguration(
                "collapse tolerances must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Recognised keys: `growth_rate_tol`, `max_iterations`, `collapse_rtol`,
    /// `collapse_atol`, `distrust_unstable_lower_bound` (0/1), `any_endpoint` (0/1).
    pub fn from_hashmap(map: &HashMap<String, f64>) -> Result<Self, NeutralStabilityError> {
        let mut config = Self::default();
        if let Some(tol) = map.get("growth_rate_tol") {
            config.growth_rate_tol = *tol;
        }
        if let Some(n) = map.get("max_iterations") {
            if !(n.is_finite() && *n >= 0.0 && n.fract() == 0.0) {
                return Err(NeutralStabilityError::InvalidConfiguration(format!(
                    "max_iterations must be a non-negative integer, got {}",
                    n
                )));
            }
            config.max_iterations = *n as usize;
        }
        if let Some(rtol) = map.get("collapse_rtol") {
            config.collapse_rtol = *rtol;
        }
        if let Some(atol) = map.get("collapse_atol") {
            config.collapse_atol = *atol;
        }
        if let Some(flag) = map.get("distrust_unstable_lower_bound") {
            config.distrust_unstable_lower_bound = *flag != 0.0;
        }
        if let Some(flag) = map.get("any_endpoint") {
            config.termination = if *flag != 0.0 {
                TerminationRule::AnyEndpoint
            } else {
                TerminationRule::BothEndpoints
            };
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: f64,
    pub upper: f64,
}

impl Bracket {
    pub fn new(lower: f64, upper: f64) -> Result<Self, NeutralStabilityError> {
        if !(lower < upper) {
            return Err(NeutralStabilityError::BracketInverted { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.lower + self.upper)
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn is_collapsed(&self, rtol: f64, atol: f64) -> bool {
        (self.lower - self.upper).abs() <= atol + rtol * self.upper.abs()
    }
}

/// One oracle answer as used by the search.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub theta: f64,
    pub estimate: ModeEstimate,
    /// signed rate driving the bracket update; ±∞ for indefinite estimates
    pub effective_rate: f64,
}

/// Observations of both bounds, oldest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BracketHistory {
    pub lower: Vec<Observation>,
    pub upper: Vec<Observation>,
}

impl BracketHistory {
    /// Drops lower-bound observations newer than the most recent stable one and returns it.
    pub fn rewind_lower_to_stable(&mut self) -> Option<&Observation> {
        let keep = self.lower.iter().rposition(|o| o.effective_rate < 0.0)?;
        self.lower.truncate(keep + 1);
        self.lower.last()
    }

    /// Drops upper-bound observations newer than the most recent unstable one and returns it.
    pub fn rewind_upper_to_unstable(&mut self) -> Option<&Observation> {
        let keep = self.upper.iter().rposition(|o| o.effective_rate > 0.0)?;
        self.upper.truncate(keep + 1);
        self.upper.last()
    }
}

/// Neutral-stability point (θ*, growth rate, frequency) of one heat release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalPoint {
    pub theta: f64,
    pub growth_rate: f64,
    pub frequency: f64,
}

#[derive(Debug, Clone)]
pub struct CriticalSearchResult {
    pub q: f64,
    pub critical: CriticalPoint,
    pub iterations: usize,
    pub final_bracket: Bracket,
    pub history: BracketHistory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

pub struct CriticalParameterSearch<O: StabilityOracle> {
    oracle: O,
    pub config: BisectionConfig,
    cache: HashMap<(u64, u64), ModeEstimate>,
}

impl<O: StabilityOracle> CriticalParameterSearch<O> {
    pub fn new(oracle: O, config: BisectionConfig) -> Result<Self, NeutralStabilityError> {
        config.validate()?;
        Ok(Self {
            oracle,
            config,
            cache: HashMap::new(),
        })
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Number of distinct (q, θ) the oracle has been asked about.
    pub fn oracle_calls(&self) -> usize {
        self.cache.len()
    }

    fn query(&mut self, q: f64, theta: f64) -> ModeEstimate {
        let key = (q.to_bits(), theta.to_bits());
        if let Some(estimate) = self.cache.get(&key) {
            return estimate.clone();
        }
        let estimate = self.oracle.fundamental_mode(q, theta);
        self.cache.insert(key, estimate.clone());
        estimate
    }

    fn observe(&mut self, q: f64, theta: f64, side: Side, initial_lower: bool) -> Observation {
        let estimate = self.query(q, theta);
        let effective_rate = match &estimate {
            ModeEstimate::Resolved { growth_rate, .. } => {
                if side == Side::Lower
                    && initial_lower
                    && *growth_rate > 0.0
                    && self.config.distrust_unstable_lower_bound
                {
                    warn!(
                        "q = {}: unstable mode ({:+e}) at the initial lower bound theta = {} taken as stable",
                        q, growth_rate, theta
                    );
                    f64::NEG_INFINITY
                } else {
                    *growth_rate
                }
            }
            ModeEstimate::Indefinite { failure } => {
                let unstable = match failure {
                    OracleFailure::PerturbationFailure(_) | OracleFailure::SteadyStateFailure(_) => {
                        true
                    }
                    OracleFailure::Other(_) => side == Side::Upper,
                };
                let rate = if unstable {
                    f64::INFINITY
                } else {
                    f64::NEG_INFINITY
                };
                warn!(
                    "q = {}, theta = {}: indefinite growth rate ({}), treated as {}",
                    q,
                    theta,
                    failure,
                    if unstable { "unstable" } else { "stable" }
                );
                rate
            }
        };
        Observation {
            theta,
            estimate,
            effective_rate,
        }
    }

    fn is_converged(&self, a: &Observation, b: &Observation) -> bool {
        let tol = self.config.growth_rate_tol;
        let small = |o: &Observation| o.estimate.is_resolved() && o.effective_rate.abs() < tol;
        match self.config.termination {
            TerminationRule::BothEndpoints => small(a) && small(b),
            TerminationRule::AnyEndpoint => small(a) || small(b),
        }
    }

    /// Runs the bisection for heat release `q` on `[theta_lower, theta_upper]`.
    pub fn find_critical_theta(
        &mut self,
        q: f64,
        theta_lower: f64,
        theta_upper: f64,
    ) -> Result<CriticalSearchResult, NeutralStabilityError> {
        let mut bracket = Bracket::new(theta_lower, theta_upper).map_err(|_| {
            NeutralStabilityError::InvalidConfiguration(format!(
                "theta_lower = {} must be smaller than theta_upper = {}",
                theta_lower, theta_upper
            ))
        })?;
        let mut history = BracketHistory::default();
        info!("q = {}: searching critical theta in [{}, {}]", q, theta_lower, theta_upper);

        for iteration in 1..=self.config.max_iterations {
            if bracket.is_collapsed(self.config.collapse_rtol, self.config.collapse_atol) {
                return Err(NeutralStabilityError::BracketCollapsed {
                    lower: bracket.lower,
                    upper: bracket.upper,
                });
            }
            let a = self.observe(q, bracket.lower, Side::Lower, bracket.lower == theta_lower);
            let b = self.observe(q, bracket.upper, Side::Upper, false);
            info!(
                "q = {}, iteration {}: theta_a = {:.16e}, theta_b = {:.16e}, rate_a = {:+e}, rate_b = {:+e}",
                q, iteration, a.theta, b.theta, a.effective_rate, b.effective_rate
            );
            history.lower.push(a.clone());
            history.upper.push(b.clone());

            if self.is_converged(&a, &b) {
                let best = if a.effective_rate.abs() < b.effective_rate.abs() {
                    &a
                } else {
                    &b
                };
                let critical = CriticalPoint {
                    theta: best.theta,
                    growth_rate: best.effective_rate,
                    frequency: best.estimate.frequency().unwrap_or(f64::NAN),
                };
                info!(
                    "q = {}: critical theta = {:.16e}, rate = {:+e}, frequency = {:e}",
                    q, critical.theta, critical.growth_rate, critical.frequency
                );
                return Ok(CriticalSearchResult {
                    q,
                    critical,
                    iterations: iteration,
                    final_bracket: bracket,
                    history,
                });
            }

            let (g_a, g_b) = (a.effective_rate, b.effective_rate);
            let (lower, upper) = if g_a < 0.0 && g_b > 0.0 {
                let mid = bracket.midpoint();
                if g_a.abs() > g_b.abs() {
                    (mid, bracket.upper)
                } else {
                    (bracket.lower, mid)
                }
            } else if g_a > 0.0 && g_b > 0.0 {
                let stable = history.rewind_lower_to_stable().ok_or(
                    NeutralStabilityError::HistoryExhausted {
                        side: "lower",
                        wanted: "stable",
                    },
                )?;
                (0.5 * (stable.theta + a.theta), a.theta)
            } else if g_a < 0.0 && g_b < 0.0 {
                let unstable = history.rewind_upper_to_unstable().ok_or(
                    NeutralStabilityError::HistoryExhausted {
                        side: "upper",
                        wanted: "unstable",
                    },
                )?;
                (b.theta, 0.5 * (b.theta + unstable.theta))
            } else {
                return Err(NeutralStabilityError::UnhandledSignCombination {
                    lower_rate: g_a,
                    upper_rate: g_b,
                });
            };
            bracket = Bracket::new(lower, upper)?;
        }
        Err(NeutralStabilityError::IterationLimit {
            max_iterations: self.config.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(theta: f64, rate: f64) -> Observation {
        Observation {
            theta,
            estimate: ModeEstimate::resolved(rate, 0.0),
            effective_rate: rate,
        }
    }

    #[test]
    fn test_bracket() {
        assert!(Bracket::new(1.0, 1.0).is_err());
        assert!(Bracket::new(2.0, 1.0).is_err());
        let b = Bracket::new(1.0, 3.0).unwrap();
        assert_eq!(b.midpoint(), 2.0);
        assert_eq!(b.width(), 2.0);
        assert!(!b.is_collapsed(1e-10, 1e-8));
        assert!(Bracket::new(1.0, 1.0 + 1e-9).unwrap().is_collapsed(1e-10, 1e-8));
    }

    #[test]
    fn test_history_rewind() {
        let mut history = BracketHistory::default();
        history.lower = vec![
            resolved(0.2, -1.0),
            resolved(0.8, -0.5),
            resolved(1.1, 0.3),
            resolved(1.3, 0.1),
        ];
        let stable = history.rewind_lower_to_stable().unwrap().theta;
        assert_eq!(stable, 0.8);
        assert_eq!(history.lower.len(), 2);

        history.upper = vec![resolved(5.0, 2.0), resolved(3.0, -0.1)];
        assert_eq!(history.rewind_upper_to_unstable().unwrap().theta, 5.0);
        assert_eq!(history.upper.len(), 1);

        history.lower = vec![resolved(1.0, 0.1)];
        assert!(history.rewind_lower_to_stable().is_none());
        // nothing is dropped when no compatible observation exists
        assert_eq!(history.lower.len(), 1);
    }

    #[test]
    fn test_config() {
        assert!(BisectionConfig::default().validate().is_ok());
        assert!(BisectionConfig::new(0.0, 10).validate().is_err());
        let map = HashMap::from([
            ("growth_rate_tol".to_string(), 1e-4),
            ("any_endpoint".to_string(), 1.0),
        ]);
        let config = BisectionConfig::from_hashmap(&map).unwrap();
        assert_eq!(config.growth_rate_tol, 1e-4);
        assert_eq!(config.termination, TerminationRule::AnyEndpoint);
        let map = HashMap::from([("max_iterations".to_string(), 0.5)]);
        assert!(BisectionConfig::from_hashmap(&map).is_err());
    }

    #[test]
    fn test_invalid_initial_bracket() {
        let mut search = CriticalParameterSearch::new(
            |_q: f64, theta: f64| ModeEstimate::resolved(theta - 1.0, 0.0),
            BisectionConfig::default(),
        )
        .unwrap();
        assert!(matches!(
            search.find_critical_theta(4.0, 2.0, 1.0),
            Err(NeutralStabilityError::InvalidConfiguration(_))
        ));
    }
}
