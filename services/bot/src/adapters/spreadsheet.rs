//! services/bot/src/adapters/spreadsheet.rs
//!
//! Posts attendance rows to per-member spreadsheet webhooks.
//! Implements the `AttendanceExport` port; members without a webhook are skipped.

use async_trait::async_trait;
use attendance_core::{AttendanceExport, AttendanceRecord, AttendanceStatus, PortError, PortResult};
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// An adapter that implements the `AttendanceExport` port with JSON webhooks.
#[derive(Clone)]
pub struct SpreadsheetExport {
    client: reqwest::Client,
    webhooks: HashMap<String, String>,
    offset: FixedOffset,
}

impl SpreadsheetExport {
    /// Creates a new `SpreadsheetExport`. `webhooks` maps display names to URLs.
    pub fn new(client: reqwest::Client, webhooks: HashMap<String, String>, offset: FixedOffset) -> Self {
        Self {
            client,
            webhooks,
            offset,
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
struct SheetRow {
    date: String,
    status: AttendanceStatus,
    clock_in: String,
    clock_out: String,
    work_duration: String,
}

fn sheet_row(record: &AttendanceRecord, offset: FixedOffset) -> SheetRow {
    let clock = |at: Option<DateTime<Utc>>| {
        at.map(|at| at.with_timezone(&offset).format("%H:%M:%S").to_string())
            .unwrap_or_default()
    };
    // The row is dated by the event it records.
    let dated_by = match record.status {
        AttendanceStatus::ClockIn => record.clock_in,
        AttendanceStatus::ClockOut => record.clock_out,
    }
    .unwrap_or_else(Utc::now);

    SheetRow {
        date: dated_by.with_timezone(&offset).format("%Y-%m-%d").to_string(),
        status: record.status,
        clock_in: clock(record.clock_in),
        clock_out: clock(record.clock_out),
        work_duration: record.work_duration.clone(),
    }
}

#[async_trait]
impl AttendanceExport for SpreadsheetExport {
    async fn record(&self, record: &AttendanceRecord) -> PortResult<()> {
        let Some(url) = self.webhooks.get(&record.display_name) else {
            debug!(display_name = %record.display_name, "No spreadsheet webhook configured");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .json(&sheet_row(record, self.offset))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PortError::Rejected(format!("webhook answered {}", status)));
        }
        info!(display_name = %record.display_name, %status, "Attendance row exported");
        Ok(())
    }
}
