//! Crop report writer.
//!
//! One [`CropRecord`] per processed file, written either as a single JSON
//! array or as JSON Lines. JSONL records are written as they arrive; the
//! JSON array is assembled on [`ReportWriter::finish`].

use std::io::{self, Write};
use std::str::FromStr;

use crate::types::CropRecord;

/// Report format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// One JSON array
    #[default]
    Json,
    /// One JSON object per line
    JsonLines,
}

impl FromStr for ReportFormat {
    type Err = String;

    /// Parse format from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(Self::JsonLines),
            other => Err(format!("unknown report format {other:?} (expected json or jsonl)")),
        }
    }
}

/// Writes crop records to any `Write`.
pub struct ReportWriter<W: Write> {
    writer: W,
    format: ReportFormat,
    pending: Vec<CropRecord>,
    records_written: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer,
            format,
            pending: Vec::new(),
            records_written: 0,
        }
    }

    /// Add one record.
    pub fn push(&mut self, record: CropRecord) -> io::Result<()> {
        match self.format {
            ReportFormat::JsonLines => {
                serde_json::to_writer(&mut self.writer, &record).map_err(io::Error::other)?;
                writeln!(self.writer)?;
                self.records_written += 1;
            }
            ReportFormat::Json => self.pending.push(record),
        }
        Ok(())
    }

    /// Write anything still buffered, flush, and return the writer.
    pub fn finish(mut self) -> io::Result<W> {
        if self.format == ReportFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, &self.pending)
                .map_err(io::Error::other)?;
            writeln!(self.writer)?;
            self.records_written += self.pending.len();
            self.pending.clear();
        }
        self.writer.flush()?;
        tracing::debug!("Wrote {} report record(s)", self.records_written);
        Ok(self.writer)
    }

    /// Records already written out (JSONL) or buffered (JSON).
    pub fn len(&self) -> usize {
        self.records_written + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
