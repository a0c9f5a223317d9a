// ============================================================
// Layer 4 — Training Summaries
// ============================================================
// Records the scalar summaries of every training step (the
// summed loss and the accuracy metric) to a CSV file.
//
// Output file: <dir>/summary.csv
//
// Example CSV output:
//   step,loss,accuracy
//   1,12.408130,0.041667
//   2,12.113902,0.062500
//   ...

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// One row of the summary log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    /// Optimiser step, starting at 1
    pub step: usize,

    /// Σ over the batch of the per-example losses
    pub loss: f64,

    /// Range: [0.0, 1.0]
    pub accuracy: f64,
}

impl StepSummary {
    pub fn new(step: usize, loss: f64, accuracy: f64) -> Self {
        Self { step, loss, accuracy }
    }
}

/// Appends step summaries to a CSV file.
#[derive(Debug, Clone)]
pub struct SummaryWriter {
    csv_path: PathBuf,
}

impl SummaryWriter {
    /// Creates `dir` if needed. The header is written only when the
    /// file is new, so reruns append to the same log.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create summary directory '{}'", dir.display()))?;

        let csv_path = dir.join("summary.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "step,loss,accuracy")?;
            tracing::debug!("Created summary CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, s: &StepSummary) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(f, "{},{:.6},{:.6}", s.step, s.loss, s.accuracy)?;
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

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("seq2seq_attn_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_writes_header_and_rows() {
        let dir = scratch_dir("rows");
        let writer = SummaryWriter::new(&dir).unwrap();
        writer.log(&StepSummary::new(1, 2.5, 0.25)).unwrap();
        writer.log(&StepSummary::new(2, 2.0, 0.5)).unwrap();

        let text = fs::read_to_string(writer.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["step,loss,accuracy", "1,2.500000,0.250000", "2,2.000000,0.500000"]);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_reopen_appends_without_second_header() {
        let dir = scratch_dir("reopen");
        SummaryWriter::new(&dir).unwrap().log(&StepSummary::new(1, 1.0, 0.0)).unwrap();
        let writer = SummaryWriter::new(&dir).unwrap();
        writer.log(&StepSummary::new(2, 0.5, 1.0)).unwrap();

        let text = fs::read_to_string(writer.csv_path()).unwrap();
        assert_eq!(text.matches("step,loss,accuracy").count(), 1);
        assert_eq!(text.lines().count(), 3);
        fs::remove_dir_all(&dir).unwrap();
    }
}
