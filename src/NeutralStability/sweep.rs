//! Independent critical-parameter searches for several heat releases.
//!
//! Every q gets its own oracle (built by `make_oracle`) and its own search; searches run
//! in parallel and a failing search only fills its own slot with the error.

use super::critical_parameter::{BisectionConfig, CriticalParameterSearch, CriticalSearchResult};
use super::neutral_stability_error::NeutralStabilityError;
use super::stability_oracle::StabilityOracle;
use crate::Utils::parallel::parallel_map;
use log::{error, info};
use prettytable::{Table, row};

#[derive(Debug)]
pub struct SweepOutcome {
    pub q: f64,
    pub result: Result<CriticalSearchResult, NeutralStabilityError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepSettings {
    pub theta_lower: f64,
    pub theta_upper: f64,
    pub bisection: BisectionConfig,
    /// worker threads; the global rayon pool when `None`
    pub threads: Option<usize>,
}

impl SweepSettings {
    pub fn new(theta_lower: f64, theta_upper: f64) -> Self {
        Self {
            theta_lower,
            theta_upper,
            bisection: BisectionConfig::default(),
            threads: None,
        }
    }
}

pub fn sweep_critical_parameters<O, M>(
    q_values: &[f64],
    settings: &SweepSettings,
    make_oracle: M,
) -> Result<Vec<SweepOutcome>, NeutralStabilityError>
where
    O: StabilityOracle,
    M: Fn(f64) -> O + Sync + Send,
{
    settings.bisection.validate()?;
    let outcomes = parallel_map(q_values, settings.threads, |q| {
        let result = CriticalParameterSearch::new(make_oracle(*q), settings.bisection.clone())
            .and_then(|mut search| {
                search.find_critical_theta(*q, settings.theta_lower, settings.theta_upper)
            });
        match &result {
            Ok(r) => info!(
                "q = {}: theta* = {} after {} iterations",
                q, r.critical.theta, r.iterations
            ),
            Err(e) => error!("q = {}: {}", q, e),
        }
        SweepOutcome { q: *q, result }
    })?;
    Ok(outcomes)
}

/// Summary of a sweep, one row per q.
pub fn sweep_table(outcomes: &[SweepOutcome]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["q", "theta*", "growth rate", "frequency", "iterations / error"]);
    for outcome in outcomes {
        match &outcome.result {
            Ok(r) => {
                table.add_row(row![
                    format!("{:.4}", outcome.q),
                    format!("{:.6}", r.critical.theta),
                    format!("{:+.3e}", r.critical.growth_rate),
                    format!("{:.6}", r.critical.frequency),
                    r.iterations.to_string()
                ]);
            }
            Err(e) => {
                table.add_row(row![format!("{:.4}", outcome.q), "-", "-", "-", e.to_string()]);
            }
        }
    }
    table
}
