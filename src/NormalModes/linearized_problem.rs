//! # Linearized perturbation equations along the ZND profile
//!
//! A normal mode `(u', λ') exp(αt)` of the reactive Burgers equation linearized about the
//! steady profile satisfies, written with λ as the independent variable,
//!
//! ```text
//! dy/dλ = (-d/ω) · A⁻¹ · ( -(α I + C) y + α b ),     y = (u', λ')
//! A⁻¹ = 1/(d² - u d) · [[-d, -σ], [0, u - d]]
//! C   = [[u_x, 0], [-ω_u, -ω_λ]],   b = (u_x, λ_x)
//! ```
//!
//! with the shock conditions `u'(0) = 2α`, `λ'(0) = 0`. The complex pair is written as
//! four real symbolic equations in `[Re u', Im u', Re λ', Im λ']`, integrated from the
//! shock to `1 - tau` by RustedSciThe's `UniversalODESolver`, and every recorded step is
//! kept as a sample of the eigenfunction.

use super::config::IntegratorConfig;
use super::ivp::IvpRunner;
use super::normal_modes_error::NormalModesError;
use super::znd_profile::{LambdaToXConverter, ProfileParameters, SteadyState};
use RustedSciThe::symbolic::symbolic_engine::Expr;
use nalgebra::{Matrix2, Vector2};
use num_complex::Complex64;

/// independent variable of the perturbation equations
pub const LAMBDA: &str = "lambda";
/// real unknowns `[Re u', Im u', Re λ', Im λ']`
pub const UNKNOWNS: [&str; 4] = ["u_re", "u_im", "l_re", "l_im"];

/// Right-hand side of the perturbation equations for one trial eigenvalue.
#[derive(Debug, Clone, Copy)]
pub struct PerturbationProblem<'a> {
    pub params: &'a ProfileParameters,
    pub alpha: Complex64,
}

impl<'a> PerturbationProblem<'a> {
    pub fn new(params: &'a ProfileParameters, alpha: Complex64) -> Self {
        Self { params, alpha }
    }

    /// Shock conditions u' = 2α, λ' = 0.
    pub fn initial_state(&self) -> [f64; 4] {
        [2.0 * self.alpha.re, 2.0 * self.alpha.im, 0.0, 0.0]
    }

    pub fn derivative(
        &self,
        state: &SteadyState,
        y: &Vector2<Complex64>,
    ) -> Vector2<Complex64> {
        let ProfileParameters { d, sigma, .. } = *self.params;
        let alpha = self.alpha;
        let det = d * d - state.u * d;
        let a_inv = Matrix2::new(-d, -sigma, 0.0, state.u - d) / det;
        let c = Matrix2::new(
            state.du_dx,
            0.0,
            -state.domega_du,
            -state.domega_dlambda,
        );
        let b = Vector2::new(state.du_dx, state.dlambda_dx);

        let operator = (Matrix2::<f64>::identity().map(Complex64::from) * alpha)
            + c.map(Complex64::from);
        let forcing = b.map(|v| alpha * v);
        let rhs = -(operator * y) + forcing;
        (a_inv.map(Complex64::from) * rhs) * Complex64::from(-d / state.omega)
    }

    /// The same right-hand side as four real expressions of `LAMBDA` and `UNKNOWNS`.
    pub fn equations(&self) -> Vec<Expr> {
        let ProfileParameters { d, sigma, .. } = *self.params;
        let s = self.params.symbolic_state(LAMBDA);
        let [u_re, u_im, l_re, l_im] = UNKNOWNS.map(|name| Expr::Var(name.to_owned()));
        let (a_re, a_im) = (Expr::Const(self.alpha.re), Expr::Const(self.alpha.im));

        // v = -(αI + C) y + α b, component by component
        let v0_re = -(a_re.clone() * u_re.clone() - a_im.clone() * u_im.clone()
            + s.du_dx.clone() * u_re.clone())
            + a_re.clone() * s.du_dx.clone();
        let v0_im = -(a_re.clone() * u_im.clone()
            + a_im.clone() * u_re.clone()
            + s.du_dx.clone() * u_im.clone())
            + a_im.clone() * s.du_dx.clone();
        let v1_re = -(a_re.clone() * l_re.clone()
            - a_im.clone() * l_im.clone()
            - s.domega_du.clone() * u_re
            - s.domega_dlambda.clone() * l_re.clone())
            + a_re.clone() * s.dlambda_dx.clone();
        let v1_im = -(a_re * l_im.clone() + a_im.clone() * l_re
            - s.domega_du.clone() * u_im
            - s.domega_dlambda.clone() * l_im)
            + a_im * s.dlambda_dx.clone();

        // (-d/ω) A⁻¹ v
        let det = Expr::Const(d * d) - s.u.clone() * Expr::Const(d);
        let scale = -Expr::Const(d) / (s.omega.clone() * det);
        let row0 =
            |v0: Expr, v1: Expr| scale.clone() * (Expr::Const(-d) * v0 - Expr::Const(sigma) * v1);
        let row1 = |v1: Expr| scale.clone() * ((s.u.clone() - Expr::Const(d)) * v1);
        vec![
            row0(v0_re, v1_re.clone()),
            row0(v0_im, v1_im.clone()),
            row1(v1_re),
            row1(v1_im),
        ]
    }
}

/// One sample of the perturbation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EigenfunctionSample {
    pub lambda: f64,
    pub u_prime: Complex64,
    pub lambda_prime: Complex64,
}

/// Perturbation samples of one integration, read-only once built.
#[derive(Debug, Clone)]
pub struct Eigenfunction {
    alpha: Complex64,
    lambda: Vec<f64>,
    u_prime: Vec<Complex64>,
    lambda_prime: Vec<Complex64>,
}

impl Eigenfunction {
    pub fn alpha(&self) -> Complex64 {
        self.alpha
    }

    pub fn len(&self) -> usize {
        self.lambda.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lambda.is_empty()
    }

    pub fn lambda(&self) -> &[f64] {
        &self.lambda
    }

    pub fn u_prime(&self) -> &[Complex64] {
        &self.u_prime
    }

    pub fn lambda_prime(&self) -> &[Complex64] {
        &self.lambda_prime
    }

    pub fn u_prime_re(&self) -> Vec<f64> {
        self.u_prime.iter().map(|z| z.re).collect()
    }

    pub fn u_prime_im(&self) -> Vec<f64> {
        self.u_prime.iter().map(|z| z.im).collect()
    }

    pub fn lambda_prime_re(&self) -> Vec<f64> {
        self.lambda_prime.iter().map(|z| z.re).collect()
    }

    pub fn lambda_prime_im(&self) -> Vec<f64> {
        self.lambda_prime.iter().map(|z| z.im).collect()
    }

    /// Number of integration steps behind the samples.
    pub fn steps(&self) -> usize {
        self.len().saturating_sub(1)
    }

    pub fn sample(&self, i: usize) -> Option<EigenfunctionSample> {
        Some(EigenfunctionSample {
            lambda: *self.lambda.get(i)?,
            u_prime: *self.u_prime.get(i)?,
            lambda_prime: *self.lambda_prime.get(i)?,
        })
    }

    /// Sample at λ = 1 - tau.
    pub fn terminal(&self) -> Option<EigenfunctionSample> {
        self.sample(self.len().checked_sub(1)?)
    }

    /// Physical coordinate of every sample (x = 0 at the shock, negative downstream).
    pub fn x(
        &self,
        params: &ProfileParameters,
        converter: &LambdaToXConverter,
    ) -> Result<Vec<f64>, NormalModesError> {
        converter.convert(params, &self.lambda)
    }
}

/// Integrates the perturbation equations from the shock to `1 - tau`.
#[derive(Debug, Clone)]
pub struct PerturbationIntegrator {
    runner: IvpRunner,
}

impl PerturbationIntegrator {
    pub fn new(config: IntegratorConfig) -> Result<Self, NormalModesError> {
        Ok(Self {
            runner: IvpRunner::new(config)?,
        })
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.runner.config
    }

    pub fn integrate(
        &self,
        params: &ProfileParameters,
        alpha: Complex64,
    ) -> Result<Eigenfunction, NormalModesError> {
        if !(alpha.re.is_finite() && alpha.im.is_finite()) {
            return Err(NormalModesError::InvalidGuess(format!(
                "trial eigenvalue {} is not finite",
                alpha
            )));
        }
        let problem = PerturbationProblem::new(params, alpha);
        let solution = self.runner.solve(
            problem.equations(),
            &UNKNOWNS,
            LAMBDA,
            0.0,
            problem.initial_state().to_vec(),
            params.lambda_end(),
        )?;
        let u_prime = solution
            .y
            .iter()
            .map(|y| Complex64::new(y[0], y[1]))
            .collect();
        let lambda_prime = solution
            .y
            .iter()
            .map(|y| Complex64::new(y[2], y[3]))
            .collect();
        Ok(Eigenfunction {
            alpha,
            lambda: solution.t,
            u_prime,
            lambda_prime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> ProfileParameters {
        ProfileParameters::new(4.0, 0.95, 1e-4).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let p = params();
        let problem = PerturbationProblem::new(&p, Complex64::new(0.03, 0.87));
        assert_eq!(problem.initial_state(), [0.06, 1.74, 0.0, 0.0]);
    }

    #[test]
    fn test_rhs_matches_component_form() {
        let p = params();
        let alpha = Complex64::new(0.03, 0.87);
        let problem = PerturbationProblem::new(&p, alpha);
        let s = p.steady_state(0.3).unwrap();
        let (pu, pl) = (Complex64::new(0.2, -0.1), Complex64::new(-0.05, 0.4));
        let dy = problem.derivative(&s, &Vector2::new(pu, pl));

        let det = p.d * p.d - s.u * p.d;
        let v0 = -(alpha * pu + s.du_dx * pu) + alpha * s.du_dx;
        let v1 = -(alpha * pl - s.domega_du * pu - s.domega_dlambda * pl) + alpha * s.dlambda_dx;
        let c = -p.d / s.omega;
        let t0 = c * (-p.d * v0 - p.sigma * v1) / det;
        let t1 = c * ((s.u - p.d) * v1) / det;
        assert_relative_eq!(dy[0].re, t0.re, max_relative = 1e-12);
        assert_relative_eq!(dy[0].im, t0.im, max_relative = 1e-12);
        assert_relative_eq!(dy[1].re, t1.re, max_relative = 1e-12);
        assert_relative_eq!(dy[1].im, t1.im, max_relative = 1e-12);
    }

    #[test]
    fn test_symbolic_equations_match_derivative() {
        let p = params();
        let alpha = Complex64::new(0.03, 0.87);
        let problem = PerturbationProblem::new(&p, alpha);
        let equations = problem.equations();
        let (pu, pl) = (Complex64::new(0.2, -0.1), Complex64::new(-0.05, 0.4));
        let mut vars = vec![LAMBDA];
        vars.extend(UNKNOWNS);
        for lambda in [0.0, 0.3, 0.95] {
            let s = p.steady_state(lambda).unwrap();
            let dy = problem.derivative(&s, &Vector2::new(pu, pl));
            let expected = [dy[0].re, dy[0].im, dy[1].re, dy[1].im];
            for (eq, value) in equations.iter().zip(expected) {
                let f = eq.clone().lambdify_owned(vars.clone());
                let got = f(vec![lambda, pu.re, pu.im, pl.re, pl.im]);
                assert_relative_eq!(got, value, max_relative = 1e-10, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_eigenfunction_samples() {
        let p = params();
        let integrator = PerturbationIntegrator::new(IntegratorConfig::default()).unwrap();
        let ef = integrator.integrate(&p, Complex64::new(0.0290, 0.8700)).unwrap();
        assert!(ef.len() > 10);
        assert_eq!(ef.lambda()[0], 0.0);
        assert_eq!(*ef.lambda().last().unwrap(), 1.0 - 1e-4);
        assert!(ef.lambda().windows(2).all(|w| w[1] > w[0]));
        let first = ef.sample(0).unwrap();
        assert_eq!(first.u_prime, Complex64::new(0.058, 1.74));
        assert_eq!(first.lambda_prime, Complex64::new(0.0, 0.0));
        assert_eq!(ef.terminal().unwrap().lambda, 1.0 - 1e-4);
        assert_eq!(ef.u_prime_re().len(), ef.len());
        assert_eq!(ef.steps() + 1, ef.len());
    }

    #[test]
    fn test_step_budget_failure() {
        let p = params();
        let mut config = IntegratorConfig::default();
        config.max_steps = 5;
        let integrator = PerturbationIntegrator::new(config).unwrap();
        let err = integrator
            .integrate(&p, Complex64::new(0.0290, 0.8700))
            .unwrap_err();
        assert!(err.is_integration_failure());
    }
}
