//! # Derivative-free hybrid root finder for two equations
//!
//! Powell's hybrid method in the form popularised by MINPACK's `hybrd`, specialised to
//! `F: R² → R²`:
//!
//! - the Jacobian is approximated by forward differences once, then kept current with
//!   Broyden rank-one updates after every trial step;
//! - the step is a dogleg between the Gauss–Newton step and the Cauchy (steepest
//!   descent) point inside a trust region;
//! - the trust region grows after good steps and shrinks after poor ones (ratio of
//!   actual to predicted reduction of ‖F‖²);
//! - two consecutive poor steps trigger a fresh finite-difference Jacobian.
//!
//! A trial point where `F` cannot be evaluated is treated as a rejected step, so the
//! trust region contracts away from regions where the residual is undefined. A refresh
//! whose finite-difference points cannot be evaluated is abandoned: the Broyden
//! Jacobian is kept and the trust region halved. Only failures at the starting point
//! (the first evaluation and the first Jacobian) are returned as errors. Running out of
//! evaluations or a collapsed trust region is not an error: the report carries
//! `success = false`.

use super::config::SolverConfig;
use super::normal_modes_error::NormalModesError;
use log::{debug, warn};
use nalgebra::{Matrix2, Vector2};

const ACCEPT_RATIO: f64 = 1e-4;
const POOR_RATIO: f64 = 0.1;
const GOOD_RATIO: f64 = 0.5;
const SLOW_STEPS_BEFORE_REFRESH: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct HybridReport {
    pub x: Vector2<f64>,
    pub fx: Vector2<f64>,
    pub success: bool,
    pub message: String,
    /// accepted steps
    pub iterations: usize,
    /// calls of F, including those spent on finite differences
    pub evaluations: usize,
    pub jacobian_refreshes: usize,
}

impl HybridReport {
    pub fn residual_norm(&self) -> f64 {
        self.fx.norm()
    }
}

#[derive(Debug, Clone)]
pub struct HybridSolver {
    pub config: SolverConfig,
}

/// Dogleg step for the model `F + J p` with trust radius `delta`.
fn dogleg(jac: &Matrix2<f64>, fx: &Vector2<f64>, delta: f64) -> Vector2<f64> {
    let gradient = jac.transpose() * fx;
    let g_norm = gradient.norm();
    let newton = jac.try_inverse().map(|inv| -(inv * fx));
    if let Some(p) = newton {
        if p.iter().all(|v| v.is_finite()) && p.norm() <= delta {
            return p;
        }
    }
    if g_norm == 0.0 {
        return Vector2::zeros();
    }
    let jg = jac * gradient;
    let jg_sq = jg.norm_squared();
    let cauchy = if jg_sq > 0.0 {
        -(g_norm * g_norm / jg_sq) * gradient
    } else {
        -(delta / g_norm) * gradient
    };
    let cauchy_norm = cauchy.norm();
    match newton {
        Some(p) if p.iter().all(|v| v.is_finite()) && cauchy_norm < delta => {
            // walk from the Cauchy point towards the Newton point up to the boundary
            let dir = p - cauchy;
            let a = dir.norm_squared();
            let b = 2.0 * cauchy.dot(&dir);
            let c = cauchy_norm * cauchy_norm - delta * delta;
            let tau = if a > 0.0 {
                (-b + (b * b - 4.0 * a * c).max(0.0).sqrt()) / (2.0 * a)
            } else {
                0.0
            };
            cauchy + tau.clamp(0.0, 1.0) * dir
        }
        _ => {
            if cauchy_norm <= delta {
                cauchy
            } else {
                -(delta / g_norm) * gradient
            }
        }
    }
}

impl HybridSolver {
    pub fn new(config: SolverConfig) -> Result<Self, NormalModesError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Forward differences; `evaluations` counts every call, the failed one included.
    fn jacobian<F, E>(
        &self,
        f: &mut F,
        x: &Vector2<f64>,
        fx: &Vector2<f64>,
        evaluations: &mut usize,
    ) -> Result<Matrix2<f64>, E>
    where
        F: FnMut(&Vector2<f64>) -> Result<Vector2<f64>, E>,
    {
        let mut jac = Matrix2::zeros();
        for j in 0..2 {
            let h = self.config.fd_step * x[j].abs().max(1.0);
            let mut shifted = *x;
            shifted[j] += h;
            *evaluations += 1;
            let column = (f(&shifted)? - fx) / h;
            jac.set_column(j, &column);
        }
        Ok(jac)
    }

    pub fn solve<F, E>(&self, mut f: F, x0: Vector2<f64>) -> Result<HybridReport, E>
    where
        F: FnMut(&Vector2<f64>) -> Result<Vector2<f64>, E>,
    {
        let config = &self.config;
        let mut x = x0;
        let mut fx = f(&x)?;
        let mut report = HybridReport {
            x,
            fx,
            success: false,
            message: String::new(),
            iterations: 0,
            evaluations: 1,
            jacobian_refreshes: 0,
        };
        if fx.norm() < config.tolerance {
            report.success = true;
            report.message = "initial guess already satisfies the tolerance".to_string();
            return Ok(report);
        }

        let mut jac = self.jacobian(&mut f, &x, &fx, &mut report.evaluations)?;
        let x_norm = x.norm();
        let mut delta = if x_norm > 0.0 {
            config.initial_radius_factor * x_norm
        } else {
            config.initial_radius_factor
        };
        let mut slow_steps = 0usize;

        loop {
            if report.evaluations >= config.max_evaluations {
                report.message = format!(
                    "evaluation budget of {} exhausted, |F| = {:e}",
                    config.max_evaluations,
                    fx.norm()
                );
                break;
            }
            if delta <= f64::EPSILON * x.norm().max(1.0) {
                report.message = format!("trust region collapsed, |F| = {:e}", fx.norm());
                break;
            }

            let step = dogleg(&jac, &fx, delta);
            let step_norm = step.norm();
            if step_norm == 0.0 {
                report.message = "zero step: the Jacobian model predicts no progress".to_string();
                break;
            }
            let x_trial = x + step;
            report.evaluations += 1;
            let f_trial = match f(&x_trial) {
                Ok(v) if v.iter().all(|c| c.is_finite()) => v,
                _ => {
                    debug!("residual undefined at {:?}, shrinking trust region", x_trial);
                    delta = 0.25 * step_norm;
                    slow_steps += 1;
                    continue;
                }
            };

            let f_norm_sq = fx.norm_squared();
            let actual = 1.0 - f_trial.norm_squared() / f_norm_sq;
            let predicted = 1.0 - (fx + jac * step).norm_squared() / f_norm_sq;
            let ratio = if predicted > 0.0 { actual / predicted } else { -1.0 };

            if ratio < POOR_RATIO {
                delta = 0.5 * step_norm.min(delta);
                slow_steps += 1;
            } else {
                slow_steps = 0;
                if ratio >= GOOD_RATIO {
                    delta = delta.max(2.0 * step_norm);
                }
            }

            // Broyden update with the information of the trial step
            let mismatch = f_trial - fx - jac * step;
            jac += mismatch * step.transpose() / step.norm_squared();

            if ratio > ACCEPT_RATIO {
                x = x_trial;
                fx = f_trial;
                report.iterations += 1;
                if fx.norm() < config.tolerance {
                    report.success = true;
                    report.message = format!(
                        "converged after {} iterations, |F| = {:e}",
                        report.iterations,
                        fx.norm()
                    );
                    break;
                }
            }

            if slow_steps >= SLOW_STEPS_BEFORE_REFRESH
                && report.evaluations + 2 <= config.max_evaluations
            {
                slow_steps = 0;
                match self.jacobian(&mut f, &x, &fx, &mut report.evaluations) {
                    Ok(fresh) => {
                        jac = fresh;
                        report.jacobian_refreshes += 1;
                    }
                    Err(_) => {
                        debug!("Jacobian refresh failed near {:?}, keeping Broyden update", x);
                        delta *= 0.5;
                    }
                }
            }
        }

        report.x = x;
        report.fx = fx;
        if !report.success {
            warn!("hybrid solver did not converge: {}", report.message);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::convert::Infallible;

    fn solver() -> HybridSolver {
        HybridSolver::new(SolverConfig::new(1e-10, 200)).unwrap()
    }

    #[test]
    fn test_linear_system() {
        let report = solver()
            .solve(
                |x: &Vector2<f64>| -> Result<_, Infallible> {
                    Ok(Vector2::new(2.0 * x[0] + x[1] - 3.0, x[0] - x[1]))
                },
                Vector2::new(10.0, -4.0),
            )
            .unwrap();
        assert!(report.success);
        assert_relative_eq!(report.x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(report.x[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_rosenbrock_system() {
        // F = (10 (y - x²), 1 - x), root (1, 1)
        let report = solver()
            .solve(
                |x: &Vector2<f64>| -> Result<_, Infallible> {
                    Ok(Vector2::new(10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]))
                },
                Vector2::new(-1.2, 1.0),
            )
            .unwrap();
        assert!(report.success, "{}", report.message);
        assert_relative_eq!(report.x[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(report.x[1], 1.0, epsilon = 1e-6);
        assert!(report.residual_norm() < 1e-10);
    }

    #[test]
    fn test_complex_square_root() {
        // z² = 2i as a real system; root 1 + i from the nearby guess
        let report = solver()
            .solve(
                |x: &Vector2<f64>| -> Result<_, Infallible> {
                    Ok(Vector2::new(x[0] * x[0] - x[1] * x[1], 2.0 * x[0] * x[1] - 2.0))
                },
                Vector2::new(0.8, 1.3),
            )
            .unwrap();
        assert!(report.success);
        assert_relative_eq!(report.x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(report.x[1], 1.0, epsilon = 1e-8);
    }

    #[test]
    fn test_root_at_start_is_returned_unchanged() {
        let report = solver()
            .solve(
                |x: &Vector2<f64>| -> Result<_, Infallible> { Ok(*x) },
                Vector2::new(0.0, 0.0),
            )
            .unwrap();
        assert!(report.success);
        assert_eq!(report.evaluations, 1);
        assert_eq!(report.iterations, 0);
    }

    #[test]
    fn test_no_root_is_not_an_error() {
        let report = HybridSolver::new(SolverConfig::new(1e-10, 40))
            .unwrap()
            .solve(
                |x: &Vector2<f64>| -> Result<_, Infallible> {
                    Ok(Vector2::new(x[0] * x[0] + 1.0, x[1]))
                },
                Vector2::new(0.5, 0.5),
            )
            .unwrap();
        assert!(!report.success);
        assert!(report.evaluations <= 40);
    }

    #[test]
    fn test_failing_trial_points_shrink_the_region() {
        // undefined for x < 0; the first Newton step from x = 3 lands at x = -2.5
        let report = solver()
            .solve(
                |x: &Vector2<f64>| -> Result<_, String> {
                    if x[0] < 0.0 {
                        return Err("outside".to_string());
                    }
                    Ok(Vector2::new((x[0] - 1.0).atan(), x[1]))
                },
                Vector2::new(3.0, 0.0),
            )
            .unwrap();
        assert!(report.success);
        assert_relative_eq!(report.x[0], 1.0, epsilon = 1e-6);

        let err = solver().solve(
            |_x: &Vector2<f64>| -> Result<Vector2<f64>, String> { Err("nowhere".to_string()) },
            Vector2::new(1.0, 1.0),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_failed_jacobian_refresh_keeps_solving() {
        // calls 1-3: start and first Jacobian; 4, 5: undefined trial points;
        // 6: a spurious value that makes the step poor and forces a refresh;
        // 7: the first finite-difference point of that refresh is undefined
        let mut calls = 0usize;
        let report = solver()
            .solve(
                |x: &Vector2<f64>| -> Result<_, String> {
                    calls += 1;
                    match calls {
                        4 | 5 | 7 => Err(format!("undefined at call {}", calls)),
                        6 => Ok(Vector2::new(100.0, 100.0)),
                        _ => Ok(Vector2::new(x[0] - 1.0, x[1] - 2.0)),
                    }
                },
                Vector2::new(3.0, 5.0),
            )
            .unwrap();
        assert!(report.success, "{}", report.message);
        assert_relative_eq!(report.x[0], 1.0, epsilon = 1e-8);
        assert_relative_eq!(report.x[1], 2.0, epsilon = 1e-8);
        assert!(calls > 7);
        assert_eq!(report.evaluations, calls);
    }

    #[test]
    fn test_evaluations_count_every_call() {
        let mut calls = 0usize;
        let report = solver()
            .solve(
                |x: &Vector2<f64>| -> Result<_, Infallible> {
                    calls += 1;
                    Ok(Vector2::new(x[0] * x[0] - x[1] * x[1], 2.0 * x[0] * x[1] - 2.0))
                },
                Vector2::new(0.8, 1.3),
            )
            .unwrap();
        assert!(report.success);
        assert_eq!(report.evaluations, calls);
    }
}
