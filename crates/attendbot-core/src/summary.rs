//! Clock-out summaries and the exporter boundary.
//!
//! A summary is emitted exactly once per clock-out and is immutable
//! from then on. The external exporter (spreadsheet writer in the
//! original deployment) receives it through the [`SummarySink`] port;
//! the core additionally keeps an append-only in-memory day log so the
//! scheduled report hook can render "today" without the exporter.

use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::session::{fmt_clock, fmt_hms, UserId};

/// Finalized attendance record for one user's workday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub user_id: UserId,
    pub display_name: String,
    pub date: NaiveDate,
    pub clock_in_at: DateTime<FixedOffset>,
    pub clock_out_at: DateTime<FixedOffset>,
    pub restroom_count: u32,
    pub restroom_seconds: i64,
    pub smoking_count: u32,
    pub smoking_seconds: i64,
    pub worked_seconds: i64,
    pub rest_used_seconds: i64,
    pub rest_remaining_seconds: i64,
}

impl AttendanceSummary {
    /// One human-readable report line.
    pub fn render_line(&self) -> String {
        format!(
            "{} | in {} out {} | worked {} | rest {} (restroom {}x {}, smoking {}x {}) | remaining {}",
            self.display_name,
            fmt_clock(self.clock_in_at),
            fmt_clock(self.clock_out_at),
            fmt_hms(Duration::seconds(self.worked_seconds)),
            fmt_hms(Duration::seconds(self.rest_used_seconds)),
            self.restroom_count,
            fmt_hms(Duration::seconds(self.restroom_seconds)),
            self.smoking_count,
            fmt_hms(Duration::seconds(self.smoking_seconds)),
            fmt_hms(Duration::seconds(self.rest_remaining_seconds)),
        )
    }
}

/// Where finalized summaries go. Implemented by the external exporter;
/// sink failures are logged by the manager and never fail the command.
pub trait SummarySink: Send {
    fn record(&mut self, summary: &AttendanceSummary) -> Result<(), StorageError>;
}

/// Discards every summary. Useful for tests and embedders that only
/// consume the in-memory day log.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SummarySink for NullSink {
    fn record(&mut self, _summary: &AttendanceSummary) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Appends each summary as one JSON line. A minimal local exporter
/// standing in for the spreadsheet writer.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SummarySink for JsonlSink {
    fn record(&mut self, summary: &AttendanceSummary) -> Result<(), StorageError> {
        let json = serde_json::to_string(summary).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| StorageError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        writeln!(file, "{json}").map_err(|source| StorageError::WriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

/// Append-only log of the summaries emitted since the process started.
#[derive(Debug, Default)]
pub struct SummaryLog {
    entries: Vec<AttendanceSummary>,
}

impl SummaryLog {
    pub fn push(&mut self, summary: AttendanceSummary) {
        self.entries.push(summary);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_date(&self, date: NaiveDate) -> impl Iterator<Item = &AttendanceSummary> {
        self.entries.iter().filter(move |s| s.date == date)
    }

    /// Formatted report for the given date, one line per clock-out.
    pub fn render_report(&self, date: NaiveDate) -> String {
        let mut lines = vec![format!("Attendance report {date}")];
        let mut any = false;
        for summary in self.for_date(date) {
            any = true;
            lines.push(summary.render_line());
        }
        if !any {
            lines.push("no clock-outs recorded".to_string());
        }
        lines.join("\n")
    }
}
