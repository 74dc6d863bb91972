//! Report output to stdout or a file.

use crate::config::OutputFormat;
use crate::report::ReportDocument;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes one report per cycle, flushing after each so a tailing reader
/// sees complete reports
pub struct ReportWriter {
    writer: Box<dyn Write + Send>,
    format: OutputFormat,
    reports_written: u64,
}

impl ReportWriter {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::from_writer(std::io::stdout(), format)
    }

    /// Create (or truncate) the report file at `path`
    pub fn create<P: AsRef<Path>>(path: P, format: OutputFormat) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path.as_ref())
            .with_context(|| format!("Failed to create report file {}", path.as_ref().display()))?;
        Ok(Self::from_writer(BufWriter::new(file), format))
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W, format: OutputFormat) -> Self {
        Self {
            writer: Box::new(writer),
            format,
            reports_written: 0,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Append a text report
    pub fn write_lines(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            writeln!(self.writer, "{}", line)?;
        }
        self.finish_report()
    }

    /// Append a report as a single JSON line
    pub fn write_document(&mut self, document: &ReportDocument) -> Result<()> {
        let json = serde_json::to_string(document)?;
        writeln!(self.writer, "{}", json)?;
        self.finish_report()
    }

    pub fn reports_written(&self) -> u64 {
        self.reports_written
    }

    fn finish_report(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.reports_written += 1;
        Ok(())
    }
}

impl Drop for ReportWriter {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn text_reports_are_appended_line_by_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        let mut writer = ReportWriter::create(&path, OutputFormat::Text).unwrap();
        writer.write_lines(&["---".into(), "disk: sda usage: 1.0%".into()]).unwrap();
        writer.write_lines(&["---".into()]).unwrap();
        assert_eq!(writer.reports_written(), 2);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "---\ndisk: sda usage: 1.0%\n---\n");
    }

    #[test]
    fn documents_are_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.jsonl");

        let mut writer = ReportWriter::create(&path, OutputFormat::Json).unwrap();
        let doc = ReportDocument {
            timestamp: Utc::now(),
            disks: None,
            interfaces: Some(vec![]),
            cgroups: None,
        };
        writer.write_document(&doc).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert!(value["disks"].is_null());
        assert_eq!(value["interfaces"], serde_json::json!([]));
    }
}
