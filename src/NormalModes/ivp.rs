//! # λ-integrations through RustedSciThe
//!
//! Every ODE of the crate (perturbation equations, λ → x map, rate-constant integral)
//! is written as a symbolic system `dy/dλ = f(λ, y)` of `Expr`s and handed to
//! `UniversalODESolver`. This module builds the solver from an `IntegratorConfig`,
//! reads back the recorded points and turns an incomplete run into an error:
//!
//! - the last point does not reach `t_end` -> `StepSizeUnderflow` (the solution ran
//!   into a singularity or the solver gave up);
//! - more than `max_steps` recorded steps -> `StepBudgetExhausted`;
//! - a NaN or infinite component -> `NonFiniteState`.

use super::config::IntegratorConfig;
use super::normal_modes_error::{IntegrationFailure, NormalModesError};
use RustedSciThe::numerical::ODE_api2::{SolverParam, UniversalODESolver};
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::debug;
use nalgebra::DVector;
use std::collections::HashMap;

/// Recorded points of one integration: `y[i]` is the state at `t[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IvpSolution {
    pub t: Vec<f64>,
    pub y: Vec<Vec<f64>>,
}

impl IvpSolution {
    pub fn steps(&self) -> usize {
        self.t.len().saturating_sub(1)
    }

    /// One component along the whole run.
    pub fn component(&self, i: usize) -> Vec<f64> {
        self.y.iter().map(|y| y[i]).collect()
    }
}

#[derive(Debug, Clone)]
pub struct IvpRunner {
    pub config: IntegratorConfig,
}

impl IvpRunner {
    pub fn new(config: IntegratorConfig) -> Result<Self, NormalModesError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Parameter map in the layout `UniversalODESolver::set_parameters` expects; every
    /// method picks the keys it knows.
    pub fn solver_params(&self, span: f64) -> HashMap<String, SolverParam> {
        let config = &self.config;
        HashMap::from([
            (
                "step_size".to_owned(),
                SolverParam::Float(config.first_step.unwrap_or(span * 1e-3)),
            ),
            ("tolerance".to_owned(), SolverParam::Float(config.rtol)),
            (
                "max_iterations".to_owned(),
                SolverParam::Int(config.max_steps as _),
            ),
            ("rtol".to_owned(), SolverParam::Float(config.rtol)),
            ("atol".to_owned(), SolverParam::Float(config.atol)),
            (
                "max_step".to_owned(),
                SolverParam::Float(config.max_step.unwrap_or(span)),
            ),
            (
                "first_step".to_owned(),
                SolverParam::OptionalFloat(config.first_step),
            ),
            ("vectorized".to_owned(), SolverParam::Bool(false)),
            ("jac_sparsity".to_owned(), SolverParam::OptionalMatrix(None)),
            ("parallel".to_owned(), SolverParam::Bool(false)),
        ])
    }

    /// Integrates `unknowns' = equations` in `arg` from `t0` to `t_end > t0`.
    pub fn solve(
        &self,
        equations: Vec<Expr>,
        unknowns: &[&str],
        arg: &str,
        t0: f64,
        y0: Vec<f64>,
        t_end: f64,
    ) -> Result<IvpSolution, NormalModesError> {
        let n = unknowns.len();
        if equations.len() != n || y0.len() != n {
            return Err(NormalModesError::InvalidParameter(format!(
                "{} equations, {} unknowns and {} initial values",
                equations.len(),
                n,
                y0.len()
            )));
        }
        if !(t_end > t0) {
            return Err(NormalModesError::InvalidParameter(format!(
                "empty integration range [{}, {}]",
                t0, t_end
            )));
        }
        let mut ode = UniversalODESolver::new(
            equations,
            unknowns.iter().map(|s| s.to_string()).collect(),
            arg.to_owned(),
            self.config.method.solver_type(),
            t0,
            DVector::from_vec(y0),
            t_end,
        );
        ode.set_parameters(self.solver_params(t_end - t0));
        ode.initialize();
        ode.solve();

        let (t, y) = ode.get_result();
        let (Some(t), Some(y)) = (t, y) else {
            return Err(IntegrationFailure::StepSizeUnderflow {
                step: 0.0,
                lambda: t0,
            }
            .into());
        };
        let t: Vec<f64> = t.iter().copied().collect();
        // rows are time points unless the matrix comes transposed
        let by_rows = y.nrows() == t.len();
        if !by_rows && y.ncols() != t.len() {
            return Err(NormalModesError::InvalidParameter(format!(
                "solver returned {} points but a {}x{} solution",
                t.len(),
                y.nrows(),
                y.ncols()
            )));
        }
        let states: Vec<Vec<f64>> = (0..t.len())
            .map(|i| {
                (0..n)
                    .map(|j| if by_rows { y[(i, j)] } else { y[(j, i)] })
                    .collect()
            })
            .collect();
        self.check(IvpSolution { t, y: states }, t0, t_end)
    }

    fn check(
        &self,
        mut solution: IvpSolution,
        t0: f64,
        t_end: f64,
    ) -> Result<IvpSolution, NormalModesError> {
        let (Some(&last), Some(&before)) = (
            solution.t.last(),
            solution.t.iter().rev().nth(1).or(solution.t.first()),
        ) else {
            return Err(IntegrationFailure::StepSizeUnderflow {
                step: 0.0,
                lambda: t0,
            }
            .into());
        };
        if let Some(i) = solution
            .y
            .iter()
            .position(|y| y.iter().any(|v| !v.is_finite()))
        {
            return Err(IntegrationFailure::NonFiniteState {
                lambda: solution.t[i],
            }
            .into());
        }
        if solution.steps() > self.config.max_steps {
            return Err(IntegrationFailure::StepBudgetExhausted {
                max_steps: self.config.max_steps,
                lambda: last,
            }
            .into());
        }
        let slack = 1e-9 * (t_end - t0);
        if last < t_end - slack {
            return Err(IntegrationFailure::StepSizeUnderflow {
                step: last - before,
                lambda: last,
            }
            .into());
        }
        // the end point is reported exactly
        if let Some(t) = solution.t.last_mut() {
            *t = t_end;
        }
        debug!(
            "{:?}: {} steps from {} to {}",
            self.config.method,
            solution.steps(),
            t0,
            t_end
        );
        Ok(solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exponential_decay() {
        // y' = -2y, y(0) = 1
        let runner = IvpRunner::new(IntegratorConfig::default()).unwrap();
        let y = Expr::Var("y".to_owned());
        let solution = runner
            .solve(vec![Expr::Const(-2.0) * y], &["y"], "t", 0.0, vec![1.0], 1.0)
            .unwrap();
        assert_eq!(solution.t[0], 0.0);
        assert_eq!(*solution.t.last().unwrap(), 1.0);
        assert!(solution.t.windows(2).all(|w| w[1] > w[0]));
        let end = *solution.component(0).last().unwrap();
        assert_relative_eq!(end, (-2.0f64).exp(), max_relative = 1e-4);
    }

    #[test]
    fn test_step_budget() {
        let mut config = IntegratorConfig::default();
        config.max_steps = 2;
        let runner = IvpRunner::new(config).unwrap();
        let y = Expr::Var("y".to_owned());
        let err = runner
            .solve(vec![Expr::Const(-50.0) * y], &["y"], "t", 0.0, vec![1.0], 10.0)
            .unwrap_err();
        assert!(matches!(
            err,
            NormalModesError::Integration(IntegrationFailure::StepBudgetExhausted { .. })
        ));
    }

    #[test]
    fn test_mismatched_system() {
        let runner = IvpRunner::new(IntegratorConfig::default()).unwrap();
        let y = Expr::Var("y".to_owned());
        assert!(runner.solve(vec![y.clone()], &["y", "z"], "t", 0.0, vec![1.0], 1.0).is_err());
        assert!(runner.solve(vec![y], &["y"], "t", 1.0, vec![1.0], 1.0).is_err());
    }
}
