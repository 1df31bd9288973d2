//! # Steady ZND profile of the reactive Burgers equation
//!
//! ## Purpose
//! Base state of the Fickett model `u_t + (u²/2 + qλ/2)_x = 0`, `λ_t = ω` written in the
//! frame of the shock and parametrised by the reaction progress λ ∈ [0, 1). Everything
//! the linearized problem needs (velocity, reaction rate and their derivatives) is an
//! explicit function of λ, so no ODE has to be solved for the base state.
//!
//! ## Main Structures
//! - **`ProfileParameters`**: heat release `q`, activation energy `theta`, truncation `tau`
//!   and the derived constants `d = √q` (detonation speed), `sigma = q/2` and the rate
//!   normalisation `k`. `k` is fixed by requiring the half-reaction point to sit at
//!   `x = -1`, i.e. `k = ∫₀^½ d / ((1-λ) exp(θ(√q·u + qλ))) dλ`, obtained by integrating
//!   `dk/dλ` with RustedSciThe's BDF solver at tight tolerances.
//! - **`SteadyState`**: the profile at one λ. Immutable, recomputed on demand.
//! - **`SymbolicState`**: the same profile as `Expr`s of a λ variable, the building block
//!   of every symbolic ODE handed to the solver.
//! - **`LambdaToXConverter`**: maps λ samples to the physical coordinate x by integrating
//!   `dx/dλ = -d/ω` (x = 0 at the first sample) and interpolating the recorded points
//!   with cubic Hermite polynomials built from the exact slope.
//!
//! ## Non-Obvious Features
//! - ω → 0 as λ → 1 which makes every λ-parametrised ODE singular at full reaction;
//!   integrations stop at `1 - tau`.
//! - `du_dx` is the spatial gradient of the base velocity; together with
//!   `dlambda_dx = -ω/d` it forms the forcing of the perturbation equations.

use super::config::IntegratorConfig;
use super::ivp::IvpRunner;
use super::normal_modes_error::NormalModesError;
use RustedSciThe::symbolic::symbolic_engine::Expr;
use log::debug;

/// tolerances of the rate-constant integral
fn rate_constant_config() -> IntegratorConfig {
    IntegratorConfig::new(1e-10, 1e-14, 100000)
}

/// u and exp(θ(√q·u + qλ) - shift) as expressions of `lambda`
fn symbolic_velocity_and_exponent(q: f64, theta: f64, shift: f64, lambda: &Expr) -> (Expr, Expr) {
    let d = q.sqrt();
    let u = Expr::Const(d)
        + Expr::Pow(
            Box::new(Expr::Const(d * d) - Expr::Const(q) * lambda.clone()),
            Box::new(Expr::Const(0.5)),
        );
    let exponent = Expr::Exp(Box::new(
        Expr::Const(theta) * (Expr::Const(q.sqrt()) * u.clone() + Expr::Const(q) * lambda.clone())
            - Expr::Const(shift),
    ));
    (u, exponent)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileParameters {
    /// heat release
    pub q: f64,
    /// activation energy
    pub theta: f64,
    /// integrations stop at λ = 1 - tau
    pub tau: f64,
    /// detonation speed √q
    pub d: f64,
    /// q/2
    pub sigma: f64,
    /// rate constant
    pub k: f64,
}

impl ProfileParameters {
    pub fn new(q: f64, theta: f64, tau: f64) -> Result<Self, NormalModesError> {
        if !(q.is_finite() && q > 0.0) {
            return Err(NormalModesError::InvalidParameter(format!(
                "heat release must be positive, got q = {}",
                q
            )));
        }
        if !(theta.is_finite() && theta >= 0.0) {
            return Err(NormalModesError::InvalidParameter(format!(
                "activation energy must be non-negative, got theta = {}",
                theta
            )));
        }
        if !(tau > 0.0 && tau < 1.0) {
            return Err(NormalModesError::InvalidParameter(format!(
                "truncation tolerance must lie in (0, 1), got tau = {}",
                tau
            )));
        }
        let d = q.sqrt();
        let lambda = Expr::Var("lambda".to_owned());
        // the exponent is 2θq at the shock; integrating the scaled integrand keeps it O(1)
        let shift = 2.0 * theta * q;
        let (_, exponent) = symbolic_velocity_and_exponent(q, theta, shift, &lambda);
        let integrand = Expr::Const(1.0) / ((Expr::Const(1.0) - lambda) * exponent);
        let solution = IvpRunner::new(rate_constant_config())?
            .solve(vec![integrand], &["k"], "lambda", 0.0, vec![0.0], 0.5)
            .map_err(|e| {
                NormalModesError::InvalidParameter(format!(
                    "rate constant integral failed (q = {}, theta = {}): {}",
                    q, theta, e
                ))
            })?;
        let scaled = solution.component(0).last().copied().unwrap_or(f64::NAN);
        let k = d * (-shift).exp() * scaled;
        if !(k.is_finite() && k > 0.0) {
            return Err(NormalModesError::InvalidParameter(format!(
                "rate constant k = {} is not positive (q = {}, theta = {})",
                k, q, theta
            )));
        }
        debug!(
            "ZND parameters: q = {}, theta = {}, k = {:e} ({} steps)",
            q,
            theta,
            k,
            solution.steps()
        );
        Ok(Self {
            q,
            theta,
            tau,
            d,
            sigma: q / 2.0,
            k,
        })
    }

    /// End of the integration range, 1 - tau.
    pub fn lambda_end(&self) -> f64 {
        1.0 - self.tau
    }

    pub fn steady_state(&self, lambda: f64) -> Result<SteadyState, NormalModesError> {
        SteadyState::evaluate(self, lambda)
    }

    /// Profile at a batch of λ samples.
    pub fn znd_profile(&self, lambdas: &[f64]) -> Result<Vec<SteadyState>, NormalModesError> {
        lambdas.iter().map(|l| SteadyState::evaluate(self, *l)).collect()
    }

    /// Steady profile as expressions of the variable `lambda`.
    pub fn symbolic_state(&self, lambda: &str) -> SymbolicState {
        let Self {
            q, theta, d, k, ..
        } = *self;
        let l = Expr::Var(lambda.to_owned());
        let (u, exponent) = symbolic_velocity_and_exponent(q, theta, 0.0, &l);
        let omega = Expr::Const(k) * (Expr::Const(1.0) - l.clone()) * exponent.clone();
        let du_dx = Expr::Const(q * k / (2.0 * d * d))
            * Expr::Pow(
                Box::new(Expr::Const(1.0) - l.clone()),
                Box::new(Expr::Const(0.5)),
            )
            * exponent.clone();
        SymbolicState {
            dlambda_dx: -omega.clone() / Expr::Const(d),
            domega_du: Expr::Const(theta * q.sqrt()) * omega.clone(),
            domega_dlambda: Expr::Const(k)
                * exponent.clone()
                * (Expr::Const(theta * q) * (Expr::Const(1.0) - l) - Expr::Const(1.0)),
            u,
            exponent,
            omega,
            du_dx,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteadyState {
    pub lambda: f64,
    pub u: f64,
    pub omega: f64,
    pub exponent: f64,
    pub du_dx: f64,
    pub dlambda_dx: f64,
    pub domega_du: f64,
    pub domega_dlambda: f64,
}

impl SteadyState {
    pub fn evaluate(params: &ProfileParameters, lambda: f64) -> Result<Self, NormalModesError> {
        if !(lambda >= 0.0 && lambda < 1.0) {
            return Err(NormalModesError::DomainViolation { lambda });
        }
        let ProfileParameters {
            q, theta, d, k, ..
        } = *params;
        let sqrt_q = q.sqrt();
        let u = d + (d * d - q * lambda).sqrt();
        let exponent = (theta * (sqrt_q * u + q * lambda)).exp();
        let omega = k * (1.0 - lambda) * exponent;
        let du_dx = q * k / (2.0 * d * d) * (1.0 - lambda).sqrt() * exponent;
        let state = Self {
            lambda,
            u,
            omega,
            exponent,
            du_dx,
            dlambda_dx: -omega / d,
            domega_du: theta * sqrt_q * omega,
            domega_dlambda: k * exponent * (theta * q * (1.0 - lambda) - 1.0),
        };
        if !(state.u.is_finite() && state.omega.is_finite() && state.domega_dlambda.is_finite())
        {
            return Err(NormalModesError::DomainViolation { lambda });
        }
        Ok(state)
    }
}

/// Fields of `SteadyState` as expressions of λ.
#[derive(Debug, Clone)]
pub struct SymbolicState {
    pub u: Expr,
    pub exponent: Expr,
    pub omega: Expr,
    pub du_dx: Expr,
    pub dlambda_dx: Expr,
    pub domega_du: Expr,
    pub domega_dlambda: Expr,
}

/// Converts reaction-progress samples to the physical coordinate behind the shock.
#[derive(Debug, Clone)]
pub struct LambdaToXConverter {
    runner: IvpRunner,
}

impl LambdaToXConverter {
    pub fn new(config: IntegratorConfig) -> Result<Self, NormalModesError> {
        Ok(Self {
            runner: IvpRunner::new(config)?,
        })
    }

    /// `lambdas` must be non-decreasing and inside [0, 1); x = 0 at `lambdas[0]`.
    pub fn convert(
        &self,
        params: &ProfileParameters,
        lambdas: &[f64],
    ) -> Result<Vec<f64>, NormalModesError> {
        let (Some(&first), Some(&last)) = (lambdas.first(), lambdas.last()) else {
            return Ok(Vec::new());
        };
        if lambdas.windows(2).any(|w| !(w[1] >= w[0])) {
            return Err(NormalModesError::InvalidParameter(
                "lambda samples must be non-decreasing".to_string(),
            ));
        }
        for &l in [first, last].iter() {
            if !(l >= 0.0 && l < 1.0) {
                return Err(NormalModesError::DomainViolation { lambda: l });
            }
        }
        if last == first {
            return Ok(vec![0.0; lambdas.len()]);
        }
        let state = params.symbolic_state("lambda");
        let slope = -Expr::Const(params.d) / state.omega;
        let solution = self
            .runner
            .solve(vec![slope], &["x"], "lambda", first, vec![0.0], last)?;
        let nodes = solution.t;
        let x = solution.y.iter().map(|y| y[0]).collect::<Vec<f64>>();
        let dx = nodes
            .iter()
            .map(|&l| Ok(-params.d / SteadyState::evaluate(params, l)?.omega))
            .collect::<Result<Vec<f64>, NormalModesError>>()?;

        let mut out = Vec::with_capacity(lambdas.len());
        let mut i = 0;
        for &l in lambdas {
            while i + 2 < nodes.len() && nodes[i + 1] < l {
                i += 1;
            }
            out.push(hermite(
                (nodes[i], nodes[i + 1]),
                (x[i], x[i + 1]),
                (dx[i], dx[i + 1]),
                l,
            ));
        }
        Ok(out)
    }
}

/// Cubic Hermite interpolation on [l0, l1] from values and slopes at both ends.
fn hermite(nodes: (f64, f64), values: (f64, f64), slopes: (f64, f64), l: f64) -> f64 {
    let h = nodes.1 - nodes.0;
    let s = (l - nodes.0) / h;
    let h00 = (1.0 + 2.0 * s) * (1.0 - s) * (1.0 - s);
    let h10 = s * (1.0 - s) * (1.0 - s);
    let h01 = s * s * (3.0 - 2.0 * s);
    let h11 = s * s * (s - 1.0);
    h00 * values.0 + h10 * h * slopes.0 + h01 * values.1 + h11 * h * slopes.1
}
