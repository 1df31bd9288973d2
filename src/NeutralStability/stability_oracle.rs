//! # Stability oracles
//!
//! The bisection over the activation energy only needs one thing from the physics: the
//! growth rate and frequency of the fundamental mode at `(q, theta)`. Anything that can
//! answer that question is a `StabilityOracle`:
//!
//! - **`EigenvalueOracle`**: the normal-mode solver of this crate, seeded with a guess and
//!   continued from the previous converged eigenvalue;
//! - any closure `FnMut(f64, f64) -> ModeEstimate` (synthetic oracles in tests, fits of
//!   linearized simulations computed elsewhere).
//!
//! An oracle never fails with an error. When the mode cannot be determined it returns
//! `ModeEstimate::Indefinite` tagged with the reason, and the search decides how to
//! interpret it.

use crate::NormalModes::config::{IntegratorConfig, SolverConfig};
use crate::NormalModes::eigenvalue_solver::EigenvalueSolver;
use crate::NormalModes::znd_profile::ProfileParameters;
use log::{debug, warn};
use num_complex::Complex64;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleFailure {
    /// the perturbation analysis broke down (integration failure, no usable fit)
    #[error("perturbation analysis failed: {0}")]
    PerturbationFailure(String),
    /// the steady ZND state could not be built
    #[error("steady state failed: {0}")]
    SteadyStateFailure(String),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModeEstimate {
    Resolved { growth_rate: f64, frequency: f64 },
    Indefinite { failure: OracleFailure },
}

impl ModeEstimate {
    pub fn resolved(growth_rate: f64, frequency: f64) -> Self {
        ModeEstimate::Resolved {
            growth_rate,
            frequency,
        }
    }

    pub fn indefinite(failure: OracleFailure) -> Self {
        ModeEstimate::Indefinite { failure }
    }

    pub fn growth_rate(&self) -> Option<f64> {
        match self {
            ModeEstimate::Resolved { growth_rate, .. } => Some(*growth_rate),
            ModeEstimate::Indefinite { .. } => None,
        }
    }

    pub fn frequency(&self) -> Option<f64> {
        match self {
            ModeEstimate::Resolved { frequency, .. } => Some(*frequency),
            ModeEstimate::Indefinite { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ModeEstimate::Resolved { .. })
    }
}

pub trait StabilityOracle {
    fn fundamental_mode(&mut self, q: f64, theta: f64) -> ModeEstimate;
}

impl<F> StabilityOracle for F
where
    F: FnMut(f64, f64) -> ModeEstimate,
{
    fn fundamental_mode(&mut self, q: f64, theta: f64) -> ModeEstimate {
        self(q, theta)
    }
}

/// Fundamental mode from the shooting solver.
#[derive(Debug, Clone)]
pub struct EigenvalueOracle {
    /// guess for the next query; replaced by every converged eigenvalue
    pub seed: Complex64,
    pub tau: f64,
    pub integrator: IntegratorConfig,
    pub solver: SolverConfig,
    /// keep the initial seed instead of continuing from the last eigenvalue
    pub fixed_seed: bool,
}

impl EigenvalueOracle {
    pub fn new(seed: Complex64, tau: f64) -> Self {
        Self {
            seed,
            tau,
            integrator: IntegratorConfig::default(),
            solver: SolverConfig::default(),
            fixed_seed: false,
        }
    }

    fn estimate(&self, q: f64, theta: f64) -> ModeEstimate {
        let params = match ProfileParameters::new(q, theta, self.tau) {
            Ok(params) => params,
            Err(e) => {
                return ModeEstimate::indefinite(OracleFailure::SteadyStateFailure(e.to_string()));
            }
        };
        let outcome = EigenvalueSolver::new(params, self.integrator.clone(), self.solver.clone())
            .and_then(|solver| solver.solve(self.seed));
        match outcome {
            Ok(result) if result.success => {
                ModeEstimate::resolved(result.growth_rate(), result.frequency())
            }
            Ok(result) => ModeEstimate::indefinite(OracleFailure::Other(format!(
                "eigenvalue solver did not converge from {}: {}",
                self.seed, result.message
            ))),
            Err(e) if e.is_integration_failure() => {
                ModeEstimate::indefinite(OracleFailure::PerturbationFailure(e.to_string()))
            }
            Err(e) => ModeEstimate::indefinite(OracleFailure::Other(e.to_string())),
        }
    }
}

impl StabilityOracle for EigenvalueOracle {
    fn fundamental_mode(&mut self, q: f64, theta: f64) -> ModeEstimate {
        let estimate = self.estimate(q, theta);
        match &estimate {
            ModeEstimate::Resolved {
                growth_rate,
                frequency,
            } => {
                debug!(
                    "q = {}, theta = {}: growth rate {:+e}, frequency {:e}",
                    q, theta, growth_rate, frequency
                );
                if !self.fixed_seed {
                    self.seed = Complex64::new(*growth_rate, *frequency);
                }
            }
            ModeEstimate::Indefinite { failure } => {
                warn!("q = {}, theta = {}: {}", q, theta, failure);
            }
        }
        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_is_an_oracle() {
        let mut calls = 0;
        let mut oracle = |_q: f64, theta: f64| {
            calls += 1;
            ModeEstimate::resolved(theta - 1.0, 0.5)
        };
        assert_eq!(
            oracle.fundamental_mode(4.0, 1.5).growth_rate(),
            Some(0.5)
        );
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_estimate_accessors() {
        let e = ModeEstimate::indefinite(OracleFailure::Other("x".to_string()));
        assert!(!e.is_resolved());
        assert_eq!(e.growth_rate(), None);
        assert_eq!(e.frequency(), None);
    }

    #[test]
    fn test_eigenvalue_oracle_continues_seed() {
        let mut oracle = EigenvalueOracle::new(Complex64::new(0.0290, 0.8700), 1e-4);
        let estimate = oracle.fundamental_mode(4.0, 0.95);
        let rate = estimate.growth_rate().unwrap();
        assert!((rate - 0.0290929).abs() < 1e-4);
        assert_eq!(oracle.seed.re, rate);
    }

    #[test]
    fn test_eigenvalue_oracle_failures_are_tagged() {
        let mut oracle = EigenvalueOracle::new(Complex64::new(0.0290, 0.8700), 1e-4);
        assert!(matches!(
            oracle.fundamental_mode(-1.0, 0.95),
            ModeEstimate::Indefinite {
                failure: OracleFailure::SteadyStateFailure(_)
            }
        ));
        oracle.integrator.max_steps = 5;
        assert!(matches!(
            oracle.fundamental_mode(4.0, 0.95),
            ModeEstimate::Indefinite {
                failure: OracleFailure::PerturbationFailure(_)
            }
        ));
        // failures leave the seed untouched
        assert_eq!(oracle.seed, Complex64::new(0.0290, 0.8700));
    }
}
