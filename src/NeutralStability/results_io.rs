//! # Result files of neutral-stability sweeps
//!
//! Layout of an output directory:
//!
//! ```text
//! <out_dir>/q=4.0000000000000000e+00/result.txt    theta=..., growth_rate=..., frequency=...
//! <out_dir>/q=9.0000000000000000e+00/error.txt     message of a failed search
//! <out_dir>/results.txt                            table collected from all result.txt
//! ```
//!
//! `result.txt` holds one `key=value` pair per line in the order theta, growth_rate,
//! frequency. Numbers are written in scientific notation with 16 digits and a two-digit
//! exponent; the growth rate carries an explicit sign. `results.txt` starts with `#`
//! comment lines followed by whitespace-separated columns q, theta, frequency.

use super::critical_parameter::CriticalPoint;
use super::neutral_stability_error::NeutralStabilityError;
use super::sweep::SweepOutcome;
use log::{info, warn};
use prettytable::{Table, row};
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULT_FILE: &str = "result.txt";
pub const ERROR_FILE: &str = "error.txt";
pub const TABLE_FILE: &str = "results.txt";

/// `x` as `d.ddd…e±XX` with `precision` digits after the point.
pub fn format_scientific(x: f64, precision: usize, signed: bool) -> String {
    if !x.is_finite() {
        return format!("{}", x);
    }
    let s = format!("{:.*e}", precision, x);
    let (mantissa, exponent) = match s.split_once('e') {
        Some(parts) => parts,
        None => return s,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if signed && !mantissa.starts_with('-') { "+" } else { "" };
    let exp_sign = if exponent < 0 { '-' } else { '+' };
    format!("{}{}e{}{:02}", sign, mantissa, exp_sign, exponent.abs())
}

impl CriticalPoint {
    pub fn to_key_value(&self) -> String {
        format!(
            "theta={}\ngrowth_rate={}\nfrequency={}\n",
            format_scientific(self.theta, 16, false),
            format_scientific(self.growth_rate, 16, true),
            format_scientific(self.frequency, 16, false)
        )
    }

    pub fn from_key_value(text: &str) -> Result<Self, NeutralStabilityError> {
        let (mut theta, mut growth_rate, mut frequency) = (None, None, None);
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let (key, value) = line.split_once('=').ok_or_else(|| {
                NeutralStabilityError::Parse(format!("expected key=value, got '{}'", line))
            })?;
            let value: f64 = value.trim().parse().map_err(|_| {
                NeutralStabilityError::Parse(format!("invalid number in '{}'", line))
            })?;
            match key.trim() {
                "theta" => theta = Some(value),
                "growth_rate" => growth_rate = Some(value),
                "frequency" => frequency = Some(value),
                other => {
                    return Err(NeutralStabilityError::Parse(format!("unknown key '{}'", other)));
                }
            }
        }
        let missing = |name: &str| NeutralStabilityError::Parse(format!("missing key '{}'", name));
        Ok(Self {
            theta: theta.ok_or_else(|| missing("theta"))?,
            growth_rate: growth_rate.ok_or_else(|| missing("growth_rate"))?,
            frequency: frequency.ok_or_else(|| missing("frequency"))?,
        })
    }

    pub fn write_result_file(&self, dir: &Path) -> Result<PathBuf, NeutralStabilityError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(RESULT_FILE);
        fs::write(&path, self.to_key_value())?;
        Ok(path)
    }

    pub fn read_result_file(path: &Path) -> Result<Self, NeutralStabilityError> {
        Self::from_key_value(&fs::read_to_string(path)?)
    }
}

/// Directory name of one heat release, `q=<q>`.
pub fn q_dir_name(q: f64) -> String {
    format!("q={}", format_scientific(q, 16, false))
}

/// Writes `result.txt` or `error.txt` for every outcome, removing a stale file of the
/// other kind. Returns the number of successful searches.
pub fn write_sweep_results(
    out_dir: &Path,
    outcomes: &[SweepOutcome],
) -> Result<usize, NeutralStabilityError> {
    let mut written = 0;
    for outcome in outcomes {
        let dir = out_dir.join(q_dir_name(outcome.q));
        fs::create_dir_all(&dir)?;
        match &outcome.result {
            Ok(result) => {
                result.critical.write_result_file(&dir)?;
                let stale = dir.join(ERROR_FILE);
                if stale.exists() {
                    fs::remove_file(stale)?;
                }
                written += 1;
            }
            Err(e) => {
                fs::write(dir.join(ERROR_FILE), format!("{}\n", e))?;
                let stale = dir.join(RESULT_FILE);
                if stale.exists() {
                    fs::remove_file(stale)?;
                }
            }
        }
    }
    info!(
        "{} of {} results written to {}",
        written,
        outcomes.len(),
        out_dir.display()
    );
    Ok(written)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeutralStabilityRow {
    pub q: f64,
    pub theta: f64,
    pub frequency: f64,
}

/// Gathers `q=*/result.txt` under `out_dir`, sorted by q. Directories without a result
/// are skipped with a warning.
pub fn collect_neutral_stability_table(
    out_dir: &Path,
) -> Result<Vec<NeutralStabilityRow>, NeutralStabilityError> {
    let mut rows = Vec::new();
    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(q) = name.strip_prefix("q=") else {
            continue;
        };
        let q: f64 = q
            .trim()
            .parse()
            .map_err(|_| NeutralStabilityError::Parse(format!("bad directory name '{}'", name)))?;
        let result_file = entry.path().join(RESULT_FILE);
        if !result_file.is_file() {
            warn!("no {} for q = {}, skipped", RESULT_FILE, q);
            continue;
        }
        let point = CriticalPoint::read_result_file(&result_file)?;
        rows.push(NeutralStabilityRow {
            q,
            theta: point.theta,
            frequency: point.frequency,
        });
    }
    rows.sort_by(|a, b| a.q.total_cmp(&b.q));
    Ok(rows)
}

pub fn write_neutral_stability_table(
    path: &Path,
    rows: &[NeutralStabilityRow],
) -> Result<(), NeutralStabilityError> {
    let mut text = String::from(
        "# Neutral stability data\n# Columns: heat release, activation energy, frequency\n",
    );
    for r in rows {
        text.push_str(&format!(
            "{} {} {}\n",
            format_scientific(r.q, 18, false),
            format_scientific(r.theta, 18, false),
            format_scientific(r.frequency, 18, false)
        ));
    }
    fs::write(path, text)?;
    Ok(())
}

pub fn read_neutral_stability_table(
    path: &Path,
) -> Result<Vec<NeutralStabilityRow>, NeutralStabilityError> {
    let text = fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|_| NeutralStabilityError::Parse(format!("bad row '{}'", line)))?;
        match values.as_slice() {
            [q, theta, frequency] => rows.push(NeutralStabilityRow {
                q: *q,
                theta: *theta,
                frequency: *frequency,
            }),
            _ => {
                return Err(NeutralStabilityError::Parse(format!(
                    "expected 3 columns, got '{}'",
                    line
                )));
            }
        }
    }
    Ok(rows)
}

pub fn neutral_stability_table(rows: &[NeutralStabilityRow]) -> Table {
    let mut table = Table::new();
    table.add_row(row!["i", "q", "theta_crit", "alpha_im"]);
    for (i, r) in rows.iter().enumerate() {
        table.add_row(row![
            (i + 1).to_string(),
            format!("{:.2}", r.q),
            format!("{:.3}", r.theta),
            format!("{:.3}", r.frequency)
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scientific_format() {
        assert_eq!(format_scientific(0.81, 16, false), "8.1000000000000005e-01");
        assert_eq!(format_scientific(4.0, 16, false), "4.0000000000000000e+00");
        assert_eq!(format_scientific(1.5e-3, 3, true), "+1.500e-03");
        assert_eq!(format_scientific(-2.5e12, 2, true), "-2.50e+12");
        assert_eq!(q_dir_name(16.0), "q=1.6000000000000000e+01");
    }

    #[test]
    fn test_key_value_record() {
        let point = CriticalPoint {
            theta: 1.2335937499999998,
            growth_rate: -0.40625,
            frequency: 0.5,
        };
        let text = point.to_key_value();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "theta=1.2335937499999998e+00");
        assert_eq!(lines[1], "growth_rate=-4.0625000000000000e-01");
        assert_eq!(lines[2], "frequency=5.0000000000000000e-01");
        let parsed = CriticalPoint::from_key_value(&text).unwrap();
        assert_eq!(parsed, point);

        // 17 significant digits bring back a rate that has no short decimal form
        let point = CriticalPoint {
            growth_rate: -4.0625e-4,
            ..point
        };
        let parsed = CriticalPoint::from_key_value(&point.to_key_value()).unwrap();
        assert_eq!(parsed.growth_rate, -4.0625e-4);

        assert!(CriticalPoint::from_key_value("theta=1.0\nfrequency=0.5\n").is_err());
        assert!(CriticalPoint::from_key_value("theta=abc\n").is_err());
        assert!(CriticalPoint::from_key_value("theta 1.0\n").is_err());
    }
}
