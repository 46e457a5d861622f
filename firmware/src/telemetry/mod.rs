//! Telemetry recorder and logging helpers.
//!
//! Wraps the `controller-core` event log so every record written from a
//! tick report or a button edge is mirrored to defmt on target and to stdout
//! on host builds.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use controller_core::clock::Millis;
use controller_core::controller::EdgeOutcome;
use controller_core::coordinator::TickReport;
use controller_core::display::DisplayError;
use controller_core::state::Effect;
use controller_core::telemetry::{
    EventId, EventLog, TelemetryEventKind, TelemetryPayload, TelemetryRecord,
};

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 128;

/// Records controller events into a fixed-size ring and logs each one.
pub struct TelemetryRecorder {
    log: EventLog<TELEMETRY_RING_CAPACITY>,
}

impl TelemetryRecorder {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            log: EventLog::new(),
        }
    }

    /// Read access to the recorded history.
    #[must_use]
    pub fn log(&self) -> &EventLog<TELEMETRY_RING_CAPACITY> {
        &self.log
    }

    /// Records the outcome of a button edge.
    pub fn record_edge(&mut self, outcome: &EdgeOutcome, timestamp: Millis) -> Option<EventId> {
        let id = self.log.record_edge(outcome, timestamp)?;
        self.emit_latest(1);
        Some(id)
    }

    /// Records the noteworthy parts of a tick and logs countdown steps.
    pub fn record_tick(&mut self, report: &TickReport, timestamp: Millis) -> usize {
        if let Some(Effect::CountdownDecremented(seconds_left)) = report.countdown {
            emit_countdown(seconds_left, timestamp.as_u32());
        }

        let written = self.log.record_tick(report, timestamp);
        self.emit_latest(written);
        written
    }

    /// Records a frame the panel failed to draw.
    pub fn record_display_fault(&mut self, error: DisplayError, timestamp: Millis) -> EventId {
        let id = self.log.record(
            TelemetryEventKind::DisplaySkipped,
            TelemetryPayload::Display(error),
            timestamp,
        );
        self.emit_latest(1);
        id
    }

    fn emit_latest(&self, count: usize) {
        let skip = self.log.len().saturating_sub(count);
        for record in self.log.oldest_first().skip(skip) {
            emit_record(record);
        }
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "none")]
fn emit_record(record: &TelemetryRecord) {
    defmt::info!(
        "telemetry [{=u16:#06x}] {}",
        record.event.to_raw(),
        defmt::Display2Format(record)
    );
}

#[cfg(not(target_os = "none"))]
fn emit_record(record: &TelemetryRecord) {
    println!("telemetry [{:#06x}] {record}", record.event.to_raw());
}

#[cfg(target_os = "none")]
fn emit_countdown(seconds_left: u16, timestamp_ms: u32) {
    defmt::debug!("telemetry countdown {}s left t={}ms", seconds_left, timestamp_ms);
}

#[cfg(not(target_os = "none"))]
fn emit_countdown(seconds_left: u16, timestamp_ms: u32) {
    println!("telemetry countdown {seconds_left}s left t={timestamp_ms}ms");
}
