//! Artifact writer.
//!
//! Writes the annotated data, the rule table and every audit table to an
//! output directory, followed by a JSON manifest listing what was written.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::audit::{Artifact, AuditReport, ScreeningCounts, SummaryLine, Warning};
use crate::dataset::Dataset;
use crate::rules::RuleTable;

pub const MANIFEST_FILE: &str = "screening_manifest.json";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Record of one screening run's output.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub tool: &'static str,
    pub version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub rules: usize,
    pub counts: ScreeningCounts,
    /// Rows in `screened_data.csv`; fewer than `counts.n_rows` when
    /// excluded rows were dropped
    pub rows_written: usize,
    pub artifacts: Vec<&'static str>,
}

/// Write the dataset as CSV: header row, missing cells empty.
pub fn write_dataset_csv<W: Write>(dataset: &Dataset, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(dataset.column_names())?;
    for row in 0..dataset.n_rows() {
        wtr.write_record(dataset.columns().iter().map(|c| c.values[row].to_string()))?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write the rule table as CSV.
pub fn write_rules_csv<W: Write>(rules: &RuleTable, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rules.is_empty() {
        wtr.write_record([
            "rule_id",
            "category",
            "description",
            "fields_used",
            "predicate",
            "action",
            "order",
            "assign_value",
        ])?;
    }
    for rule in rules {
        wtr.serialize(rule)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Serialize rows with a header; the header is written even for no rows.
fn write_rows_csv<W: Write, T: Serialize>(
    rows: &[T],
    header: &[&str],
    writer: W,
) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(header)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn write_warnings_csv<W: Write>(warnings: &[Warning], writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["id", "severity", "message", "artifact", "pointer"])?;
    for w in warnings {
        wtr.write_record([
            w.id,
            w.severity.as_str(),
            w.message(),
            w.evidence.artifact.file_name(),
            w.evidence.pointer.as_str(),
        ])?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn write_summary_txt<W: Write>(lines: &[SummaryLine], mut writer: W) -> io::Result<()> {
    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()
}

/// Writes every artifact of a run into one directory.
pub struct ArtifactWriter {
    out_dir: PathBuf,
}

impl ArtifactWriter {
    /// Create the writer, creating `out_dir` if needed.
    pub fn new(out_dir: impl AsRef<Path>) -> Result<Self, ExportError> {
        let out_dir = out_dir.as_ref().to_path_buf();
        fs::create_dir_all(&out_dir).map_err(|source| ExportError::Io {
            path: out_dir.display().to_string(),
            source,
        })?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn create(&self, name: &str) -> Result<File, ExportError> {
        let path = self.out_dir.join(name);
        debug!(path = %path.display(), "Writing artifact");
        File::create(&path).map_err(|source| ExportError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn write_artifact(
        &self,
        artifact: Artifact,
        data: &Dataset,
        rules: &RuleTable,
        report: &AuditReport,
    ) -> Result<(), ExportError> {
        let file = self.create(artifact.file_name())?;
        match artifact {
            Artifact::ScreenedData => write_dataset_csv(data, file),
            Artifact::ScreeningRules => write_rules_csv(rules, file),
            Artifact::ConsortFlow => write_rows_csv(
                &report.flow,
                &["step", "kind", "rule_id", "description", "n_affected", "n_remaining"],
                file,
            ),
            Artifact::ConsortByReason => write_rows_csv(
                &report.by_reason,
                &["rule_id", "description", "n_excluded"],
                file,
            ),
            Artifact::ScreeningOverlap => write_rows_csv(
                &report.overlap,
                &["rule_a", "action_a", "rule_b", "action_b", "n_a", "n_b", "n_both"],
                file,
            ),
            Artifact::ScreeningSummary => {
                write_summary_txt(&report.summary, file).map_err(|source| ExportError::Io {
                    path: artifact.file_name().to_string(),
                    source,
                })
            }
            Artifact::ScreeningWarnings => write_warnings_csv(&report.warnings, file),
            Artifact::DecisionRegistry => write_rows_csv(
                &report.registry,
                &["decision", "value", "source", "note"],
                file,
            ),
        }
    }

    /// Write all artifacts and the manifest.
    ///
    /// `data` is written as given: the screened dataset, or its
    /// `drop_excluded` copy.
    pub fn write_all(
        &self,
        data: &Dataset,
        rules: &RuleTable,
        report: &AuditReport,
    ) -> Result<Manifest, ExportError> {
        for artifact in Artifact::ALL {
            self.write_artifact(artifact, data, rules, report)?;
        }

        let manifest = Manifest {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now(),
            rules: rules.len(),
            counts: report.counts,
            rows_written: data.n_rows(),
            artifacts: Artifact::ALL.iter().map(|a| a.file_name()).collect(),
        };
        let file = self.create(MANIFEST_FILE)?;
        serde_json::to_writer_pretty(file, &manifest)?;

        info!(
            out_dir = %self.out_dir.display(),
            artifacts = manifest.artifacts.len() + 1,
            "Wrote screening artifacts"
        );
        Ok(manifest)
    }
}
