//! Boundedness condition at the end of the reaction zone.
//!
//! A perturbation stays bounded as λ → 1 only if
//! `H(α) = α (u u' + σ λ') - σ ω_λ λ' = 0` at the end point, so eigenvalues are the
//! roots of the map α ↦ (Re H, Im H). Evaluating it costs one integration of the
//! perturbation equations; integration failures are returned as errors.

use super::linearized_problem::{Eigenfunction, EigenfunctionSample, PerturbationIntegrator};
use super::normal_modes_error::NormalModesError;
use super::znd_profile::{ProfileParameters, SteadyState};
use nalgebra::Vector2;
use num_complex::Complex64;

/// H at a terminal sample.
pub fn boundedness_residual(
    params: &ProfileParameters,
    state: &SteadyState,
    sample: &EigenfunctionSample,
    alpha: Complex64,
) -> Complex64 {
    alpha * (state.u * sample.u_prime + params.sigma * sample.lambda_prime)
        - params.sigma * state.domega_dlambda * sample.lambda_prime
}

/// Residual together with the integration it came from.
#[derive(Debug, Clone)]
pub struct ResidualEvaluation {
    pub alpha: Complex64,
    pub h: Complex64,
    pub eigenfunction: Eigenfunction,
    pub terminal_state: SteadyState,
}

impl ResidualEvaluation {
    pub fn residual(&self) -> Vector2<f64> {
        Vector2::new(self.h.re, self.h.im)
    }
}

#[derive(Debug, Clone)]
pub struct BoundednessResidual {
    pub params: ProfileParameters,
    integrator: PerturbationIntegrator,
}

impl BoundednessResidual {
    pub fn new(params: ProfileParameters, integrator: PerturbationIntegrator) -> Self {
        Self { params, integrator }
    }

    pub fn integrator(&self) -> &PerturbationIntegrator {
        &self.integrator
    }

    pub fn evaluate(&self, alpha: Complex64) -> Result<ResidualEvaluation, NormalModesError> {
        let eigenfunction = self.integrator.integrate(&self.params, alpha)?;
        let sample = eigenfunction
            .terminal()
            .ok_or(NormalModesError::DomainViolation {
                lambda: self.params.lambda_end(),
            })?;
        let terminal_state = SteadyState::evaluate(&self.params, sample.lambda)?;
        let h = boundedness_residual(&self.params, &terminal_state, &sample, alpha);
        Ok(ResidualEvaluation {
            alpha,
            h,
            eigenfunction,
            terminal_state,
        })
    }

    /// (Re H, Im H) at `alpha = x[0] + i x[1]`.
    pub fn residual(&self, x: &Vector2<f64>) -> Result<Vector2<f64>, NormalModesError> {
        Ok(self.evaluate(Complex64::new(x[0], x[1]))?.residual())
    }

    pub fn magnitude(&self, alpha: Complex64) -> Result<f64, NormalModesError> {
        Ok(self.evaluate(alpha)?.h.norm())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NormalModes::config::IntegratorConfig;

    fn residual_map() -> BoundednessResidual {
        let params = ProfileParameters::new(4.0, 0.95, 1e-4).unwrap();
        let integrator = PerturbationIntegrator::new(IntegratorConfig::default()).unwrap();
        BoundednessResidual::new(params, integrator)
    }

    #[test]
    fn test_residual_components() {
        let map = residual_map();
        let alpha = Complex64::new(0.0290, 0.8700);
        let eval = map.evaluate(alpha).unwrap();
        let r = map.residual(&Vector2::new(0.0290, 0.8700)).unwrap();
        assert_eq!(r, eval.residual());
        assert_eq!(map.magnitude(alpha).unwrap(), eval.h.norm());
        assert!(eval.terminal_state.lambda == map.params.lambda_end());
        // the guess is close to, but not at, an eigenvalue
        assert!(eval.h.norm() > 1.0 && eval.h.norm() < 20.0);
    }

    #[test]
    fn test_residual_formula() {
        let params = ProfileParameters::new(4.0, 0.95, 1e-4).unwrap();
        let state = params.steady_state(0.5).unwrap();
        let sample = EigenfunctionSample {
            lambda: 0.5,
            u_prime: Complex64::new(1.0, 0.0),
            lambda_prime: Complex64::new(0.0, 0.0),
        };
        let alpha = Complex64::new(0.5, 1.0);
        assert_eq!(
            boundedness_residual(&params, &state, &sample, alpha),
            alpha * state.u
        );
    }
}
