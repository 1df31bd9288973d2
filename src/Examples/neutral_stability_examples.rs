use crate::NeutralStability::critical_parameter::{BisectionConfig, CriticalParameterSearch};
use crate::NeutralStability::results_io::{
    TABLE_FILE, collect_neutral_stability_table, neutral_stability_table,
    write_neutral_stability_table, write_sweep_results,
};
use crate::NeutralStability::stability_oracle::{EigenvalueOracle, ModeEstimate};
use crate::NeutralStability::sweep::{SweepSettings, sweep_critical_parameters, sweep_table};
use num_complex::Complex64;
use std::path::Path;

pub fn neutral_stability_examples(task: usize) {
    //
    match task {
        0 => {
            // BISECTION with a synthetic oracle: growth rate θ - 1.234
            let oracle = |_q: f64, theta: f64| ModeEstimate::resolved(theta - 1.234, 0.5);
            let mut search = CriticalParameterSearch::new(oracle, BisectionConfig::default()).unwrap();
            let result = search.find_critical_theta(4.0, 0.2, 5.0).unwrap();
            println!(
                "theta* = {}, rate = {:e} after {} iterations, {} oracle calls",
                result.critical.theta,
                result.critical.growth_rate,
                result.iterations,
                search.oracle_calls()
            );
        }
        1 => {
            // CRITICAL ACTIVATION ENERGY of q = 4 with the shooting solver
            let oracle = EigenvalueOracle::new(Complex64::new(0.0290, 0.8700), 1e-4);
            let mut search = CriticalParameterSearch::new(oracle, BisectionConfig::default()).unwrap();
            let result = search.find_critical_theta(4.0, 0.5, 1.0).unwrap();
            println!(
                "q = 4: theta* = {}, frequency = {}",
                result.critical.theta, result.critical.frequency
            );
        }
        2 => {
            // SWEEP over heat releases, results stored per q and collected into one table
            let q_values = [2.0, 3.0, 4.0, 5.0];
            let mut settings = SweepSettings::new(0.5, 1.5);
            settings.threads = Some(4);
            let outcomes = sweep_critical_parameters(&q_values, &settings, |_q| {
                EigenvalueOracle::new(Complex64::new(0.0290, 0.8700), 1e-4)
            })
            .unwrap();
            sweep_table(&outcomes).printstd();

            let out_dir = Path::new("neutral_stability");
            write_sweep_results(out_dir, &outcomes).unwrap();
            let rows = collect_neutral_stability_table(out_dir).unwrap();
            write_neutral_stability_table(&out_dir.join(TABLE_FILE), &rows).unwrap();
            neutral_stability_table(&rows).printstd();
        }
        _ => println!("no such task: {}", task),
    }
}
