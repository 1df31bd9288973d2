use crate::NormalModes::carpet::{CarpetAnalyzer, CarpetScanner, linspace};
use crate::NormalModes::config::IntegratorConfig;
use crate::NormalModes::eigenvalue_solver::EigenvalueSolver;
use crate::NormalModes::znd_profile::{LambdaToXConverter, ProfileParameters};
use num_complex::Complex64;
use prettytable::{Table, row};

pub fn normal_modes_examples(task: usize) {
    //
    match task {
        0 => {
            // STEADY ZND PROFILE: rate constant and the profile at a few λ
            let params = ProfileParameters::new(4.0, 0.95, 1e-4).unwrap();
            println!("d = {}, sigma = {}, k = {:e}", params.d, params.sigma, params.k);
            let lambdas = linspace(0.0, 0.99, 12);
            let profile = params.znd_profile(&lambdas).unwrap();
            let converter = LambdaToXConverter::new(IntegratorConfig::default()).unwrap();
            let x = converter.convert(&params, &lambdas).unwrap();
            let mut table = Table::new();
            table.add_row(row!["x", "lambda", "u", "omega"]);
            for (state, x) in profile.iter().zip(x.iter()) {
                table.add_row(row![
                    format!("{:.4}", x),
                    format!("{:.4}", state.lambda),
                    format!("{:.6}", state.u),
                    format!("{:.6e}", state.omega)
                ]);
            }
            table.printstd();
        }
        1 => {
            // FUNDAMENTAL MODE for q = 4, θ = 0.95 (slightly unstable)
            let solver = EigenvalueSolver::from_parameters(4.0, 0.95, 1e-4).unwrap();
            let result = solver.solve(Complex64::new(0.0290, 0.8700)).unwrap();
            println!(
                "alpha = {}, |H| = {:e}, {} iterations, {} evaluations: {}",
                result.eigenvalue,
                result.residual_norm,
                result.iterations,
                result.evaluations,
                result.message
            );
            let terminal = result.eigenfunction.terminal().unwrap();
            println!(
                "at lambda = {}: u' = {}, lambda' = {}",
                terminal.lambda, terminal.u_prime, terminal.lambda_prime
            );
        }
        2 => {
            // CARPET of |H| around the fundamental mode, minima refined by the solver
            let solver = EigenvalueSolver::from_parameters(4.0, 0.95, 1e-4).unwrap();
            let re = linspace(0.02, 0.04, 11);
            let im = linspace(0.80, 0.94, 15);
            let carpet = CarpetScanner::new(solver.residual_map())
                .scan(&re, &im)
                .unwrap();
            let analyzer = CarpetAnalyzer;
            let minima = analyzer.find_minima(&carpet);
            analyzer.print_minima(&minima);
            for (candidate, refined) in analyzer.refine(&solver, &minima) {
                match refined {
                    Ok(r) => println!("{} -> {} ({})", candidate.alpha(), r.eigenvalue, r.message),
                    Err(e) => println!("{} -> {}", candidate.alpha(), e),
                }
            }
            carpet.save_json("carpet.json", &minima).unwrap();
        }
        _ => println!("no such task: {}", task),
    }
}
