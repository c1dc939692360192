//! # Run Report
//!
//! Renders an [`OperationOutput`] for the host environment:
//!
//! - `rotated-resources=<id,id>` appended to the output file (`GITHUB_OUTPUT`)
//! - inspection table appended as Markdown to the summary file
//!   (`GITHUB_STEP_SUMMARY`)
//! - one `<id>.csr.pem` per CSR handed out, plus `csr.txt` holding the last
//!   one, in the artifact directory

use crate::constants::ROTATED_RESOURCES_OUTPUT;
use crate::operation::{CsrArtifact, OperationOutput};
use crate::rotation::InspectionResult;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

const INSPECTION_HEADING: &str = "Secrets Inspection";
const CSR_TEXT_FILE: &str = "csr.txt";

/// Where each part of the report goes; unset parts are not written
#[derive(Debug, Clone, Default)]
pub struct ReportTargets {
    pub output_file: Option<PathBuf>,
    pub summary_file: Option<PathBuf>,
    pub artifact_dir: Option<PathBuf>,
}

/// Write every part of `output` that has a target
///
/// # Errors
/// Returns an error if any of the files cannot be written
pub fn write_report(output: &OperationOutput, targets: &ReportTargets) -> Result<()> {
    if let Some(path) = &targets.output_file {
        append(path, &rotated_resources_line(&output.rotated_resources))?;
    }

    if let Some(path) = &targets.summary_file {
        if !output.inspection.is_empty() {
            append(path, &render_inspection_summary(&output.inspection))?;
        }
    }

    if !output.csr_artifacts.is_empty() {
        let dir = targets
            .artifact_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        write_csr_artifacts(&dir, &output.csr_artifacts)?;
    }

    Ok(())
}

/// `rotated-resources=a,b` output line
#[must_use]
pub fn rotated_resources_line(rotated: &[String]) -> String {
    format!("{ROTATED_RESOURCES_OUTPUT}={}\n", rotated.join(","))
}

/// Markdown table of inspection results, in the given order
#[must_use]
pub fn render_inspection_summary(results: &[InspectionResult]) -> String {
    let mut markdown = format!("## {INSPECTION_HEADING}\n\n");

    let _ = writeln!(markdown, "| {} |", InspectionResult::COLUMNS.join(" | "));
    let _ = writeln!(
        markdown,
        "|{}",
        " --- |".repeat(InspectionResult::COLUMNS.len())
    );

    for result in results {
        let cells: Vec<String> = result.to_row().iter().map(|cell| escape_cell(cell)).collect();
        let _ = writeln!(markdown, "| {} |", cells.join(" | "));
    }

    markdown.push('\n');
    markdown
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

/// Save each CSR as `<id>.csr.pem` and the last one as `csr.txt`
///
/// # Errors
/// Returns an error if the directory or a file cannot be written
pub fn write_csr_artifacts(dir: &Path, artifacts: &[CsrArtifact]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create artifact directory {}", dir.display()))?;

    let mut written = Vec::with_capacity(artifacts.len() + 1);
    for artifact in artifacts {
        let path = dir.join(format!("{}.csr.pem", artifact.resource));
        std::fs::write(&path, &artifact.csr)
            .with_context(|| format!("Failed to write CSR {}", path.display()))?;
        info!(resource = %artifact.resource, path = %path.display(), "Saved CSR");
        written.push(path);
    }

    if let Some(last) = artifacts.last() {
        let path = dir.join(CSR_TEXT_FILE);
        std::fs::write(&path, &last.csr)
            .with_context(|| format!("Failed to write CSR {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

fn append(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}
