//! # Residual carpets
//!
//! ## Purpose
//! Before running the root finder it is useful to look at |H(α)| on a rectangular grid of
//! trial eigenvalues: eigenvalues show up as deep pits of the "carpet". The scanner
//! evaluates the grid, the analyzer extracts 2D local minima as seeds for the solver.
//!
//! ## Main Structures
//! - **`Carpet`**: grids of growth rates `alpha_re` and frequencies `alpha_im` (both
//!   strictly increasing) and the matrix `h[(i, j)] = |H(alpha_re[i] + i·alpha_im[j])|`.
//!   Cells whose integration failed hold NaN.
//! - **`CarpetScanner`**: evaluates a carpet row by row in parallel (rayon).
//! - **`CarpetAnalyzer`**: 2D minima, the `log(1 + |H|)` view used for plots and tables,
//!   refinement of minima with the eigenvalue solver.
//! - **`RootCandidate`**: one minimum.
//!
//! ## Persistence
//! JSON with the fields `ALPHA_RE`, `ALPHA_IM` and `H` (`len(ALPHA_RE)` rows of
//! `len(ALPHA_IM)` values, `null` for failed cells) plus an optional list of `roots`.

use super::boundedness::BoundednessResidual;
use super::eigenvalue_solver::{EigenvalueResult, EigenvalueSolver};
use super::normal_modes_error::NormalModesError;
use crate::Utils::parallel::parallel_map;
use log::{info, warn};
use nalgebra::DMatrix;
use num_complex::Complex64;
use prettytable::{Table, row};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// `n` evenly spaced points from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

fn check_grid(name: &str, grid: &[f64]) -> Result<(), NormalModesError> {
    if grid.is_empty() {
        return Err(NormalModesError::InvalidCarpet(format!("{} grid is empty", name)));
    }
    if grid.iter().any(|v| !v.is_finite()) || grid.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(NormalModesError::InvalidCarpet(format!(
            "{} grid must be finite and strictly increasing",
            name
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Carpet {
    alpha_re: Vec<f64>,
    alpha_im: Vec<f64>,
    h: DMatrix<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RootCandidate {
    pub alpha_re: f64,
    pub alpha_im: f64,
    /// |H| at the minimum
    pub h: f64,
    pub i: usize,
    pub j: usize,
}

impl RootCandidate {
    pub fn alpha(&self) -> Complex64 {
        Complex64::new(self.alpha_re, self.alpha_im)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CarpetFile {
    #[serde(rename = "ALPHA_RE")]
    alpha_re: Vec<f64>,
    #[serde(rename = "ALPHA_IM")]
    alpha_im: Vec<f64>,
    #[serde(rename = "H")]
    h: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    roots: Vec<RootCandidate>,
}

impl Carpet {
    pub fn new(
        alpha_re: Vec<f64>,
        alpha_im: Vec<f64>,
        h: DMatrix<f64>,
    ) -> Result<Self, NormalModesError> {
        check_grid("ALPHA_RE", &alpha_re)?;
        check_grid("ALPHA_IM", &alpha_im)?;
        if h.shape() != (alpha_re.len(), alpha_im.len()) {
            return Err(NormalModesError::InvalidCarpet(format!(
                "magnitude array is {:?}, grids require ({}, {})",
                h.shape(),
                alpha_re.len(),
                alpha_im.len()
            )));
        }
        Ok(Self {
            alpha_re,
            alpha_im,
            h,
        })
    }

    pub fn alpha_re(&self) -> &[f64] {
        &self.alpha_re
    }

    pub fn alpha_im(&self) -> &[f64] {
        &self.alpha_im
    }

    pub fn magnitudes(&self) -> &DMatrix<f64> {
        &self.h
    }

    pub fn shape(&self) -> (usize, usize) {
        self.h.shape()
    }

    pub fn failed_cells(&self) -> usize {
        self.h.iter().filter(|v| v.is_nan()).count()
    }

    /// Smallest grid spacing along (α_re, α_im); zero for a single-point axis.
    pub fn spacing(&self) -> (f64, f64) {
        let step = |g: &[f64]| {
            g.windows(2)
                .map(|w| w[1] - w[0])
                .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |a| a.min(s))))
                .unwrap_or(0.0)
        };
        (step(&self.alpha_re), step(&self.alpha_im))
    }

    pub fn to_json_string(&self, roots: &[RootCandidate]) -> Result<String, NormalModesError> {
        Ok(serde_json::to_string_pretty(&self.to_file(roots))?)
    }

    pub fn from_json_str(s: &str) -> Result<(Self, Vec<RootCandidate>), NormalModesError> {
        Self::from_file(serde_json::from_str(s)?)
    }

    pub fn save_json<P: AsRef<Path>>(
        &self,
        path: P,
        roots: &[RootCandidate],
    ) -> Result<(), NormalModesError> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, &self.to_file(roots))?;
        info!("carpet saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Self, Vec<RootCandidate>), NormalModesError> {
        let reader = BufReader::new(File::open(path)?);
        Self::from_file(serde_json::from_reader(reader)?)
    }

    fn to_file(&self, roots: &[RootCandidate]) -> CarpetFile {
        let h = self
            .h
            .row_iter()
            .map(|row| {
                row.iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect()
            })
            .collect();
        CarpetFile {
            alpha_re: self.alpha_re.clone(),
            alpha_im: self.alpha_im.clone(),
            h,
            roots: roots.to_vec(),
        }
    }

    fn from_file(file: CarpetFile) -> Result<(Self, Vec<RootCandidate>), NormalModesError> {
        let (n, m) = (file.alpha_re.len(), file.alpha_im.len());
        if file.h.len() != n || file.h.iter().any(|row| row.len() != m) {
            return Err(NormalModesError::InvalidCarpet(format!(
                "H must have {} rows of {} values",
                n, m
            )));
        }
        let h = DMatrix::from_fn(n, m, |i, j| file.h[i][j].unwrap_or(f64::NAN));
        Ok((Self::new(file.alpha_re, file.alpha_im, h)?, file.roots))
    }
}

/// Evaluates |H| over a grid of trial eigenvalues.
#[derive(Debug, Clone)]
pub struct CarpetScanner<'a> {
    residual: &'a BoundednessResidual,
    /// worker threads; the global rayon pool when `None`
    pub threads: Option<usize>,
}

impl<'a> CarpetScanner<'a> {
    pub fn new(residual: &'a BoundednessResidual) -> Self {
        Self {
            residual,
            threads: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    fn cell(&self, alpha: Complex64) -> f64 {
        match self.residual.magnitude(alpha) {
            Ok(h) => h,
            Err(e) => {
                warn!("carpet cell {} failed: {}", alpha, e);
                f64::NAN
            }
        }
    }

    pub fn scan(&self, alpha_re: &[f64], alpha_im: &[f64]) -> Result<Carpet, NormalModesError> {
        check_grid("ALPHA_RE", alpha_re)?;
        check_grid("ALPHA_IM", alpha_im)?;
        let rows = parallel_map(alpha_re, self.threads, |re| {
            alpha_im
                .iter()
                .map(|im| self.cell(Complex64::new(*re, *im)))
                .collect::<Vec<f64>>()
        })?;
        let h = DMatrix::from_fn(alpha_re.len(), alpha_im.len(), |i, j| rows[i][j]);
        let carpet = Carpet::new(alpha_re.to_vec(), alpha_im.to_vec(), h)?;
        info!(
            "carpet {}x{} for q = {}, theta = {}: {} failed cells",
            alpha_re.len(),
            alpha_im.len(),
            self.residual.params.q,
            self.residual.params.theta,
            carpet.failed_cells()
        );
        Ok(carpet)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CarpetAnalyzer;

impl CarpetAnalyzer {
    /// Interior cells strictly below all four axis neighbours (NaN neighbours count as +∞).
    pub fn find_minima(&self, carpet: &Carpet) -> Vec<RootCandidate> {
        let h = &carpet.h;
        let (n, m) = h.shape();
        let value = |i: usize, j: usize| {
            let v = h[(i, j)];
            if v.is_nan() { f64::INFINITY } else { v }
        };
        let mut minima = Vec::new();
        for i in 1..n.saturating_sub(1) {
            for j in 1..m.saturating_sub(1) {
                let v = h[(i, j)];
                if v.is_nan() {
                    continue;
                }
                let min_along_re = v < value(i - 1, j) && v < value(i + 1, j);
                let min_along_im = v < value(i, j - 1) && v < value(i, j + 1);
                if min_along_re && min_along_im {
                    minima.push(RootCandidate {
                        alpha_re: carpet.alpha_re[i],
                        alpha_im: carpet.alpha_im[j],
                        h: v,
                        i,
                        j,
                    });
                }
            }
        }
        minima
    }

    /// `log(1 + |H|)`, the scale carpets are usually looked at in.
    pub fn log_magnitude(&self, carpet: &Carpet) -> DMatrix<f64> {
        carpet.h.map(|v| v.ln_1p())
    }

    pub fn minima_table(&self, minima: &[RootCandidate]) -> Table {
        let mut table = Table::new();
        table.add_row(row!["alpha_re", "alpha_im", "log(1+|H|)"]);
        for m in minima {
            table.add_row(row![
                format!("{:.6}", m.alpha_re),
                format!("{:.6}", m.alpha_im),
                format!("{:.4}", m.h.ln_1p())
            ]);
        }
        table
    }

    pub fn print_minima(&self, minima: &[RootCandidate]) {
        if minima.is_empty() {
            println!("No minima found");
            return;
        }
        self.minima_table(minima).printstd();
    }

    /// Runs the eigenvalue solver from every candidate.
    pub fn refine(
        &self,
        solver: &EigenvalueSolver,
        minima: &[RootCandidate],
    ) -> Vec<(RootCandidate, Result<EigenvalueResult, NormalModesError>)> {
        minima
            .iter()
            .map(|m| (*m, solver.solve(m.alpha())))
            .collect()
    }
}
