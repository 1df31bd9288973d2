//! Errors of the neutral-stability search. Every variant is fatal for the search of one
//! heat release only; sweeps over several values keep going.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NeutralStabilityError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("bracket [{lower}, {upper}] collapsed to numerical identity, cannot resolve further")]
    BracketCollapsed { lower: f64, upper: f64 },
    #[error("bracket update produced lower = {lower} >= upper = {upper}")]
    BracketInverted { lower: f64, upper: f64 },
    #[error("unhandled growth rate signs: lower = {lower_rate}, upper = {upper_rate}")]
    UnhandledSignCombination { lower_rate: f64, upper_rate: f64 },
    #[error("no {wanted} observation left in the history of the {side} bound")]
    HistoryExhausted {
        side: &'static str,
        wanted: &'static str,
    },
    #[error("no critical value after {max_iterations} iterations")]
    IterationLimit { max_iterations: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
