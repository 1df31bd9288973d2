#[cfg(test)]
mod tests {
    use crate::NormalModes::carpet::{CarpetAnalyzer, CarpetScanner, linspace};
    use crate::NormalModes::config::{IntegratorConfig, SolverConfig};
    use crate::NormalModes::eigenvalue_solver::EigenvalueSolver;
    use crate::NormalModes::normal_modes_error::NormalModesError;
    use crate::NormalModes::znd_profile::{LambdaToXConverter, ProfileParameters};
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use num_complex::Complex64;

    const TAU: f64 = 1e-4;

    fn solver() -> EigenvalueSolver {
        EigenvalueSolver::from_parameters(4.0, 0.95, TAU).unwrap()
    }

    #[test]
    fn test_fundamental_mode_q4_theta095() {
        let solver = solver();
        let result = solver.solve(Complex64::new(0.0290, 0.8700)).unwrap();
        assert!(result.success, "{}", result.message);
        assert_relative_eq!(result.growth_rate(), 0.0290929, max_relative = 1e-3);
        assert_relative_eq!(result.frequency(), 0.8704127, max_relative = 1e-3);

        let ef = &result.eigenfunction;
        assert!(!ef.is_empty());
        assert_eq!(ef.lambda()[0], 0.0);
        assert_eq!(*ef.lambda().last().unwrap(), 1.0 - TAU);
        assert!(ef.lambda().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(result.znd.len(), ef.len());
        assert_eq!(result.znd[0].lambda, 0.0);
    }

    #[test]
    fn test_residual_vanishes_at_converged_root() {
        let solver = solver();
        let result = solver.solve([0.0290, 0.8700]).unwrap();
        assert!(result.success);
        let alpha = result.eigenvalue;
        let r = solver
            .residual_map()
            .residual(&Vector2::new(alpha.re, alpha.im))
            .unwrap();
        assert!(r.norm() < solver.solver_config().tolerance);
        assert_relative_eq!(r.norm(), result.residual_norm, max_relative = 1e-12);
    }

    #[test]
    fn test_converged_root_is_a_fixed_point() {
        let solver = solver();
        let first = solver.solve(Complex64::new(0.0290, 0.8700)).unwrap();
        assert!(first.success);
        let second = solver.solve(first.eigenvalue).unwrap();
        assert!(second.success);
        assert_eq!(second.iterations, 0);
        assert_relative_eq!(second.eigenvalue.re, first.eigenvalue.re, epsilon = 1e-9);
        assert_relative_eq!(second.eigenvalue.im, first.eigenvalue.im, epsilon = 1e-9);
    }

    #[test]
    fn test_integration_failure_is_an_error() {
        let params = ProfileParameters::new(4.0, 0.95, TAU).unwrap();
        let mut integrator = IntegratorConfig::default();
        integrator.max_steps = 5;
        let solver = EigenvalueSolver::new(params, integrator, SolverConfig::default()).unwrap();
        let err = solver.solve(Complex64::new(0.0290, 0.8700)).unwrap_err();
        assert!(err.is_integration_failure());
        assert!(matches!(err, NormalModesError::Integration(_)));
    }

    #[test]
    fn test_carpet_minima_match_solver_roots() {
        let solver = solver();
        let re = linspace(0.02, 0.04, 11);
        let im = linspace(0.80, 0.94, 15);
        let carpet = CarpetScanner::new(solver.residual_map())
            .with_threads(2)
            .scan(&re, &im)
            .unwrap();
        assert_eq!(carpet.shape(), (11, 15));
        assert_eq!(carpet.failed_cells(), 0);

        let analyzer = CarpetAnalyzer;
        let minima = analyzer.find_minima(&carpet);
        assert!(!minima.is_empty());
        analyzer.print_minima(&minima);
        let (d_re, d_im) = carpet.spacing();
        for (candidate, refined) in analyzer.refine(&solver, &minima) {
            let refined = refined.unwrap();
            assert!(refined.success);
            assert!((candidate.alpha_re - refined.eigenvalue.re).abs() <= d_re);
            assert!((candidate.alpha_im - refined.eigenvalue.im).abs() <= d_im);
        }
    }

    #[test]
    fn test_eigenfunction_in_physical_coordinate() {
        let solver = solver();
        let result = solver.solve(Complex64::new(0.0290, 0.8700)).unwrap();
        let converter = LambdaToXConverter::new(IntegratorConfig::default()).unwrap();
        let x = result
            .eigenfunction
            .x(solver.params(), &converter)
            .unwrap();
        assert_eq!(x.len(), result.eigenfunction.len());
        assert_eq!(x[0], 0.0);
        assert!(x.windows(2).all(|w| w[1] < w[0]));
    }
}
