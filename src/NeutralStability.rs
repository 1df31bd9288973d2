//! # Neutral Stability Boundary
//!
//! For every heat release `q` the fundamental mode of the ZND detonation changes from
//! stable to unstable at a critical activation energy θ*(q). This module finds θ* by
//! bisection over θ with a pluggable stability oracle, runs independent searches for many
//! q in parallel and stores the results as small `key=value` records collected into one
//! table.
//!
//! ## Example
//! ```rust, ignore
//! use ZNDStab::NeutralStability::critical_parameter::{BisectionConfig, CriticalParameterSearch};
//! use ZNDStab::NeutralStability::stability_oracle::EigenvalueOracle;
//! use num_complex::Complex64;
//! let oracle = EigenvalueOracle::new(Complex64::new(0.03, 0.87), 1e-4);
//! let mut search = CriticalParameterSearch::new(oracle, BisectionConfig::default()).unwrap();
//! let result = search.find_critical_theta(4.0, 0.5, 1.5).unwrap();
//! println!("theta* = {}", result.critical.theta);
//! ```

/// bisection over the activation energy: configuration, bracket, history, result
pub mod critical_parameter;
pub mod neutral_stability_error;
/// result.txt records, sweep output directories and the collected table
pub mod results_io;
/// growth rate providers: the shooting solver or any closure
pub mod stability_oracle;
/// parallel searches over several heat releases
pub mod sweep;
