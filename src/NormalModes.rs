//! # Normal Modes of ZND Detonations in the Reactive Burgers Equation
//!
//! Linear stability analysis of the steady traveling detonation of the Fickett model
//!
//! ```text
//! u_t + (u²/2 + qλ/2)_x = 0,       λ_t = ω(u, λ) = k (1 - λ) exp(θ(√q·u + qλ))
//! ```
//!
//! by the shooting method of Lee & Stewart adapted to the reactive Burgers equation.
//!
//! ## Mathematical Model
//!
//! | Symbol | Description |
//! |--------|-------------|
//! | `q` | heat release |
//! | `θ` | activation energy |
//! | `d = √q` | detonation speed (Chapman–Jouguet) |
//! | `σ = q/2` | half heat release |
//! | `k` | rate constant: half-reaction point at x = -1 |
//! | `λ` | reaction progress, 0 at the shock, 1 at full reaction |
//! | `α` | complex eigenvalue, Re α growth rate, Im α angular frequency |
//! | `τ` | truncation: the λ-integrations stop at 1 - τ |
//!
//! Perturbations `(u', λ') exp(αt)` of the steady state obey a linear system in λ with
//! shock conditions `u' = 2α`, `λ' = 0`. The mode is admissible only if it stays bounded
//! at the end of the reaction zone, which gives the complex residual
//!
//! ```text
//! H(α) = α (u u' + σ λ') - σ ω_λ λ'     at λ = 1 - τ
//! ```
//!
//! whose roots are the eigenvalues.
//!
//! ## Numerical Solution
//!
//! - the base state is explicit in λ and is also available as symbolic `Expr`s
//! - every λ-integration (the rate constant `k`, the λ → x map and the perturbation
//!   equations) goes through RustedSciThe's `UniversalODESolver` (BDF by default)
//! - H(α) = 0 is solved by a Powell-hybrid (dogleg + Broyden) root finder
//! - carpets of |H| on a grid of α, scanned in parallel, locate several roots at once
//!
//! ## Example
//! ```rust, ignore
//! use ZNDStab::NormalModes::eigenvalue_solver::EigenvalueSolver;
//! use num_complex::Complex64;
//! let solver = EigenvalueSolver::from_parameters(4.0, 0.95, 1e-4).unwrap();
//! let result = solver.solve(Complex64::new(0.0290, 0.8700)).unwrap();
//! println!("alpha = {}", result.eigenvalue); // ≈ 0.02909 + 0.87041i
//! ```

/// boundedness residual H(α) at the end of the reaction zone
pub mod boundedness;
/// carpets of |H| over a grid of trial eigenvalues, their minima and persistence
pub mod carpet;
/// integrator and root-finder settings
pub mod config;
/// eigenvalues by shooting: guess, solver, result
pub mod eigenvalue_solver;
/// derivative-free hybrid root finder for two equations
pub mod hybrid_solver;
/// symbolic initial value problems solved by RustedSciThe
pub mod ivp;
/// linearized perturbation equations and eigenfunctions
pub mod linearized_problem;
pub mod normal_modes_error;
/// steady ZND profile, rate constant and λ → x map
pub mod znd_profile;
mod normal_modes_tests;
