//! Error types of the steady-state and normal-mode machinery.
//!
//! Non-convergence of the eigenvalue solver is NOT an error: it is reported through
//! the `success` flag of the result. Everything here is a hard failure of one call.

use thiserror::Error;

/// Reasons why the perturbation ODE could not be integrated up to `1 - tau`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationFailure {
    #[error("step budget of {max_steps} steps exhausted at lambda = {lambda}")]
    StepBudgetExhausted { max_steps: usize, lambda: f64 },
    #[error("step size {step:e} too small at lambda = {lambda} (singularity reached?)")]
    StepSizeUnderflow { step: f64, lambda: f64 },
    #[error("non-finite state at lambda = {lambda}")]
    NonFiniteState { lambda: f64 },
}

#[derive(Debug, Error)]
pub enum NormalModesError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Domain violation: lambda = {lambda} is outside [0, 1)")]
    DomainViolation { lambda: f64 },
    #[error("Integration failure: {0}")]
    Integration(#[from] IntegrationFailure),
    #[error("Invalid eigenvalue guess: {0}")]
    InvalidGuess(String),
    #[error("Invalid carpet: {0}")]
    InvalidCarpet(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl NormalModesError {
    /// true for failures of the integration step itself (including a profile
    /// evaluation that left the domain mid-integration)
    pub fn is_integration_failure(&self) -> bool {
        matches!(
            self,
            NormalModesError::Integration(_) | NormalModesError::DomainViolation { .. }
        )
    }
}
