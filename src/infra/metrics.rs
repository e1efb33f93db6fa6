// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per pass over the training data to
// `{output_dir}/metrics.csv`:
//
//   pass,global_step,train_loss,learning_rate
//   1,32,5.912043,0.000049
//   2,64,4.107731,0.000032
//   ...
//
// train_loss is the mean of the summed three-head loss over
// the batches of that pass. The file is appended across runs;
// the header is only written when the file is new.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const METRICS_FILE: &str = "metrics.csv";
const HEADER: &str       = "pass,global_step,train_loss,learning_rate";

/// One row of metrics for a single pass over the training data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassMetrics {
    /// Pass number, starting at 1
    pub pass:          usize,
    /// Global step reached at the end of the pass
    pub global_step:   usize,
    pub train_loss:    f64,
    /// Learning rate used for the last step of the pass
    pub learning_rate: f64,
}

impl PassMetrics {
    pub fn new(pass: usize, global_step: usize, train_loss: f64, learning_rate: f64) -> Self {
        Self { pass, global_step, train_loss, learning_rate }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let csv_path = dir.join(METRICS_FILE);

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &PassMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)?;

        writeln!(
            f,
            "{},{},{:.6},{:.8}",
            m.pass, m.global_step, m.train_loss, m.learning_rate,
        )?;

        tracing::debug!(
            "Logged pass {} metrics: step={}, train_loss={:.4}",
            m.pass, m.global_step, m.train_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_once_and_rows_appended() {
        let dir = std::env::temp_dir().join(format!("metrics_{}", std::process::id()));
        fs::remove_dir_all(&dir).ok();

        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&PassMetrics::new(1, 4, 2.5, 0.00005)).unwrap();

        // Re-opening must not write a second header
        let logger = MetricsLogger::new(&dir).unwrap();
        logger.log(&PassMetrics::new(2, 8, 1.25, 0.0)).unwrap();

        let content = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec![
            HEADER,
            "1,4,2.500000,0.00005000",
            "2,8,1.250000,0.00000000",
        ]);

        fs::remove_dir_all(&dir).ok();
    }
}
