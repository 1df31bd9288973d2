//! # Normal-mode eigenvalues by shooting
//!
//! ## Purpose
//! Finds complex eigenvalues α of the linearized reactive Burgers equation: the
//! perturbation equations are integrated from the shock for a trial α and α is adjusted
//! by the hybrid root finder until the boundedness residual H(α) vanishes.
//!
//! ## Main Structures
//! - **`EigenvalueGuess`**: starting point, either a complex number or a 2-element slice
//!   `[growth rate, frequency]`.
//! - **`EigenvalueSolver`**: profile parameters plus integrator and root-finder settings.
//! - **`EigenvalueResult`**: converged α, diagnostics of the root finder, the
//!   eigenfunction at α and the steady profile at its λ samples.
//!
//! ## Non-Obvious Features
//! - Non-convergence is not an error. `success = false` is returned together with the
//!   last iterate and a logged warning; callers must check the flag.
//! - If the integration fails at the guess itself the failure is returned as an error,
//!   while failures at trial points only shrink the trust region of the root finder.
//!
//! ## Usage
//! ```rust, ignore
//! let solver = EigenvalueSolver::from_parameters(4.0, 0.95, 1e-4)?;
//! let result = solver.solve(Complex64::new(0.029, 0.87))?;
//! assert!(result.success);
//! ```

use super::boundedness::BoundednessResidual;
use super::config::{IntegratorConfig, SolverConfig};
use super::hybrid_solver::HybridSolver;
use super::linearized_problem::{Eigenfunction, PerturbationIntegrator};
use super::normal_modes_error::NormalModesError;
use super::znd_profile::{ProfileParameters, SteadyState};
use log::{info, warn};
use nalgebra::Vector2;
use num_complex::Complex64;

#[derive(Debug, Clone, PartialEq)]
pub enum EigenvalueGuess {
    Complex(Complex64),
    Vector(Vec<f64>),
}

impl From<Complex64> for EigenvalueGuess {
    fn from(alpha: Complex64) -> Self {
        EigenvalueGuess::Complex(alpha)
    }
}

impl From<[f64; 2]> for EigenvalueGuess {
    fn from(v: [f64; 2]) -> Self {
        EigenvalueGuess::Vector(v.to_vec())
    }
}

impl From<&[f64]> for EigenvalueGuess {
    fn from(v: &[f64]) -> Self {
        EigenvalueGuess::Vector(v.to_vec())
    }
}

impl From<Vec<f64>> for EigenvalueGuess {
    fn from(v: Vec<f64>) -> Self {
        EigenvalueGuess::Vector(v)
    }
}

impl EigenvalueGuess {
    pub fn to_complex(&self) -> Result<Complex64, NormalModesError> {
        let alpha = match self {
            EigenvalueGuess::Complex(alpha) => *alpha,
            EigenvalueGuess::Vector(v) => match v.as_slice() {
                [re, im] => Complex64::new(*re, *im),
                _ => {
                    return Err(NormalModesError::InvalidGuess(format!(
                        "expected [growth rate, frequency], got {} components",
                        v.len()
                    )));
                }
            },
        };
        if !(alpha.re.is_finite() && alpha.im.is_finite()) {
            return Err(NormalModesError::InvalidGuess(format!(
                "guess {} is not finite",
                alpha
            )));
        }
        Ok(alpha)
    }
}

#[derive(Debug, Clone)]
pub struct EigenvalueResult {
    pub eigenvalue: Complex64,
    pub success: bool,
    pub message: String,
    pub iterations: usize,
    pub evaluations: usize,
    /// |H| at `eigenvalue`
    pub residual_norm: f64,
    pub eigenfunction: Eigenfunction,
    /// steady profile at the λ samples of the eigenfunction
    pub znd: Vec<SteadyState>,
}

impl EigenvalueResult {
    pub fn growth_rate(&self) -> f64 {
        self.eigenvalue.re
    }

    pub fn frequency(&self) -> f64 {
        self.eigenvalue.im
    }
}

#[derive(Debug, Clone)]
pub struct EigenvalueSolver {
    residual: BoundednessResidual,
    solver: HybridSolver,
}

impl EigenvalueSolver {
    pub fn new(
        params: ProfileParameters,
        integrator_config: IntegratorConfig,
        solver_config: SolverConfig,
    ) -> Result<Self, NormalModesError> {
        let integrator = PerturbationIntegrator::new(integrator_config)?;
        Ok(Self {
            residual: BoundednessResidual::new(params, integrator),
            solver: HybridSolver::new(solver_config)?,
        })
    }

    /// Default integrator and root-finder settings.
    pub fn from_parameters(q: f64, theta: f64, tau: f64) -> Result<Self, NormalModesError> {
        Self::new(
            ProfileParameters::new(q, theta, tau)?,
            IntegratorConfig::default(),
            SolverConfig::default(),
        )
    }

    pub fn params(&self) -> &ProfileParameters {
        &self.residual.params
    }

    pub fn residual_map(&self) -> &BoundednessResidual {
        &self.residual
    }

    pub fn solver_config(&self) -> &SolverConfig {
        &self.solver.config
    }

    pub fn solve<G: Into<EigenvalueGuess>>(
        &self,
        guess: G,
    ) -> Result<EigenvalueResult, NormalModesError> {
        let alpha0 = guess.into().to_complex()?;
        let report = self.solver.solve(
            |x: &Vector2<f64>| self.residual.residual(x),
            Vector2::new(alpha0.re, alpha0.im),
        )?;
        let alpha = Complex64::new(report.x[0], report.x[1]);
        if report.success {
            info!(
                "q = {}, theta = {}: eigenvalue {:.8} + {:.8}i (|H| = {:e}, {} evaluations)",
                self.params().q,
                self.params().theta,
                alpha.re,
                alpha.im,
                report.residual_norm(),
                report.evaluations
            );
        } else {
            warn!(
                "q = {}, theta = {}: no eigenvalue found from guess {}: {}",
                self.params().q,
                self.params().theta,
                alpha0,
                report.message
            );
        }

        let evaluation = self.residual.evaluate(alpha)?;
        let znd = self
            .params()
            .znd_profile(evaluation.eigenfunction.lambda())?;
        Ok(EigenvalueResult {
            eigenvalue: alpha,
            success: report.success,
            message: report.message,
            iterations: report.iterations,
            evaluations: report.evaluations,
            residual_norm: evaluation.h.norm(),
            eigenfunction: evaluation.eigenfunction,
            znd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_shapes() {
        let z = Complex64::new(0.1, 0.5);
        assert_eq!(EigenvalueGuess::from(z).to_complex().unwrap(), z);
        assert_eq!(EigenvalueGuess::from([0.1, 0.5]).to_complex().unwrap(), z);
        let three: &[f64] = &[0.1, 0.5, 0.7];
        assert!(matches!(
            EigenvalueGuess::from(three).to_complex(),
            Err(NormalModesError::InvalidGuess(_))
        ));
        assert!(EigenvalueGuess::from(Vec::<f64>::new()).to_complex().is_err());
        assert!(
            EigenvalueGuess::from([f64::NAN, 0.5])
                .to_complex()
                .is_err()
        );
    }

    #[test]
    fn test_invalid_guess_is_rejected_before_integration() {
        let solver = EigenvalueSolver::from_parameters(4.0, 0.95, 1e-4).unwrap();
        assert!(matches!(
            solver.solve(vec![0.03]),
            Err(NormalModesError::InvalidGuess(_))
        ));
    }
}
