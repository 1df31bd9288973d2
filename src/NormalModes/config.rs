//! # Normal-mode solver settings
//!
//! Two small configuration structs with defaults, validation and construction from a
//! `HashMap<String, f64>` (handy when settings come from a task file):
//!
//! - **`IntegratorConfig`**: method, tolerances and step limits handed to RustedSciThe's
//!   `UniversalODESolver` for every λ-integration (perturbation equations, λ → x map,
//!   rate constant). Defaults: BDF, `rtol = 1e-6`, `atol = 1e-12`, 5000 steps.
//! - **`SolverConfig`**: settings of the hybrid root finder acting on the boundedness
//!   residual (`tolerance` is a bound on the residual norm).

use super::normal_modes_error::NormalModesError;
use RustedSciThe::numerical::ODE_api2::SolverType;
use RustedSciThe::numerical::Radau::Radau_main::RadauOrder;
use std::collections::HashMap;

/// Integration methods of `UniversalODESolver` used for the λ-integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    /// variable-order BDF (orders 1 to 5)
    Bdf,
    /// implicit Radau IIA of order 7
    Radau,
    /// explicit Runge–Kutta–Fehlberg 4(5)
    Rk45,
}

impl IntegrationMethod {
    pub fn solver_type(&self) -> SolverType {
        match self {
            IntegrationMethod::Bdf => SolverType::BDF,
            IntegrationMethod::Radau => SolverType::Radau(RadauOrder::Order7),
            IntegrationMethod::Rk45 => SolverType::NonStiff("RK45".to_owned()),
        }
    }

    /// 0 = BDF, 1 = Radau, 2 = RK45 (numeric codes of task files)
    pub fn from_code(code: f64) -> Result<Self, NormalModesError> {
        match code {
            c if c == 0.0 => Ok(IntegrationMethod::Bdf),
            c if c == 1.0 => Ok(IntegrationMethod::Radau),
            c if c == 2.0 => Ok(IntegrationMethod::Rk45),
            _ => Err(NormalModesError::InvalidParameter(format!(
                "unknown integration method code {}",
                code
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegratorConfig {
    pub method: IntegrationMethod,
    /// relative tolerance of the local error test
    pub rtol: f64,
    /// absolute tolerance of the local error test
    pub atol: f64,
    /// maximum number of recorded steps
    pub max_steps: usize,
    /// initial step; estimated automatically when `None`
    pub first_step: Option<f64>,
    /// upper bound on the step; the whole interval when `None`
    pub max_step: Option<f64>,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Bdf,
            rtol: 1e-6,
            atol: 1e-12,
            max_steps: 5000,
            first_step: None,
            max_step: None,
        }
    }
}

impl IntegratorConfig {
    pub fn new(rtol: f64, atol: f64, max_steps: usize) -> Self {
        Self {
            rtol,
            atol,
            max_steps,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), NormalModesError> {
        if !(self.rtol > 0.0) {
            return Err(NormalModesError::InvalidParameter(
                "rtol must be positive".to_string(),
            ));
        }
        if !(self.atol >= 0.0) {
            return Err(NormalModesError::InvalidParameter(
                "atol must be non-negative".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(NormalModesError::InvalidParameter(
                "max_steps must be at least 1".to_string(),
            ));
        }
        if let Some(h) = self.first_step {
            if !(h > 0.0) {
                return Err(NormalModesError::InvalidParameter(
                    "first_step must be positive".to_string(),
                ));
            }
        }
        if let Some(h) = self.max_step {
            if !(h > 0.0) {
                return Err(NormalModesError::InvalidParameter(
                    "max_step must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Missing keys keep their default values. Recognised keys: `method`, `rtol`, `atol`,
    /// `max_steps`, `first_step`, `max_step`.
    pub fn from_hashmap(map: &HashMap<String, f64>) -> Result<Self, NormalModesError> {
        let mut config = Self::default();
        if let Some(code) = map.get("method") {
            config.method = IntegrationMethod::from_code(*code)?;
        }
        if let Some(rtol) = map.get("rtol") {
            config.rtol = *rtol;
        }
        if let Some(atol) = map.get("atol") {
            config.atol = *atol;
        }
        if let Some(max_steps) = map.get("max_steps") {
            config.max_steps = count_from_f64("max_steps", *max_steps)?;
        }
        config.first_step = map.get("first_step").copied();
        config.max_step = map.get("max_step").copied();
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// convergence threshold on the Euclidean norm of the residual (Re H, Im H)
    pub tolerance: f64,
    /// budget of residual evaluations (each one is a full integration)
    pub max_evaluations: usize,
    /// relative forward-difference step for the Jacobian
    pub fd_step: f64,
    /// initial trust radius is `factor * |x0|` (or `factor` when x0 = 0)
    pub initial_radius_factor: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_evaluations: 200,
            fd_step: 1e-7,
            initial_radius_factor: 100.0,
        }
    }
}

impl SolverConfig {
    pub fn new(tolerance: f64, max_evaluations: usize) -> Self {
        Self {
            tolerance,
            max_evaluations,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), NormalModesError> {
        if !(self.tolerance > 0.0) {
            return Err(NormalModesError::InvalidParameter(
                "solver tolerance must be positive".to_string(),
            ));
        }
        if self.max_evaluations < 3 {
            return Err(NormalModesError::InvalidParameter(
                "max_evaluations must allow at least one Jacobian (3 evaluations)".to_string(),
            ));
        }
        if !(self.fd_step > 0.0) || !(self.initial_radius_factor > 0.0) {
            return Err(NormalModesError::InvalidParameter(
                "fd_step and initial_radius_factor must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Recognised keys: `tolerance`, `max_evaluations`, `fd_step`, `initial_radius_factor`.
    pub fn from_hashmap(map: &HashMap<String, f64>) -> Result<Self, NormalModesError> {
        let mut config = Self::default();
        if let Some(tolerance) = map.get("tolerance") {
            config.tolerance = *tolerance;
        }
        if let Some(n) = map.get("max_evaluations") {
            config.max_evaluations = count_from_f64("max_evaluations", *n)?;
        }
        if let Some(fd_step) = map.get("fd_step") {
            config.fd_step = *fd_step;
        }
        if let Some(factor) = map.get("initial_radius_factor") {
            config.initial_radius_factor = *factor;
        }
        config.validate()?;
        Ok(config)
    }
}

fn count_from_f64(name: &str, value: f64) -> Result<usize, NormalModesError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(NormalModesError::InvalidParameter(format!(
            "{} must be a non-negative integer, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(IntegratorConfig::default().validate().is_ok());
        assert!(SolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_from_hashmap() {
        let map = HashMap::from([
            ("rtol".to_string(), 1e-8),
            ("max_steps".to_string(), 20000.0),
        ]);
        let config = IntegratorConfig::from_hashmap(&map).unwrap();
        assert_eq!(config.rtol, 1e-8);
        assert_eq!(config.atol, 1e-12);
        assert_eq!(config.max_steps, 20000);

        assert_eq!(config.method, IntegrationMethod::Bdf);

        let map = HashMap::from([("max_steps".to_string(), 2.5)]);
        assert!(IntegratorConfig::from_hashmap(&map).is_err());

        let map = HashMap::from([("method".to_string(), 2.0)]);
        let config = IntegratorConfig::from_hashmap(&map).unwrap();
        assert_eq!(config.method, IntegrationMethod::Rk45);
        assert!(matches!(config.method.solver_type(), SolverType::NonStiff(_)));
        let map = HashMap::from([("method".to_string(), 7.0)]);
        assert!(IntegratorConfig::from_hashmap(&map).is_err());

        let map = HashMap::from([("tolerance".to_string(), -1.0)]);
        assert!(SolverConfig::from_hashmap(&map).is_err());
    }
}
