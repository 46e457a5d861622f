//! Telemetry event catalog and the in-memory event log shared by firmware and
//! host targets.
//!
//! Event kinds serialize to compact numeric codes so they can be shipped over
//! a diagnostics channel or a defmt log line without carrying strings. The
//! [`EventLog`] keeps the most recent records in a fixed-size ring and knows
//! how to translate [`EdgeOutcome`]s and [`TickReport`]s into records.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::clock::Millis;
use crate::config::CountdownPreset;
use crate::controller::EdgeOutcome;
use crate::coordinator::{RefreshOutcome, TickReport};
use crate::debounce::InputLine;
use crate::display::DisplayError;
use crate::mode::Mode;
use crate::state::Effect;

/// Monotonic identifier assigned to each record (wraps on overflow).
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const EVENT_LOG_CAPACITY: usize = 64;

/// Discriminated telemetry events shared across all controller targets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    PowerOn,
    PowerOff,
    CountdownStarted(CountdownPreset),
    CountdownExpired,
    ModeChanged(Mode),
    EdgeRejected(InputLine),
    TriggerIgnored(InputLine),
    DisplaySkipped,
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::PowerOn => f.write_str("power-on"),
            TelemetryEventKind::PowerOff => f.write_str("power-off"),
            TelemetryEventKind::CountdownStarted(preset) => {
                write!(f, "countdown-started {}s", preset.seconds())
            }
            TelemetryEventKind::CountdownExpired => f.write_str("countdown-expired"),
            TelemetryEventKind::ModeChanged(mode) => write!(f, "mode-changed {mode}"),
            TelemetryEventKind::EdgeRejected(line) => write!(f, "edge-rejected {line}"),
            TelemetryEventKind::TriggerIgnored(line) => write!(f, "trigger-ignored {line}"),
            TelemetryEventKind::DisplaySkipped => f.write_str("display-skipped"),
        }
    }
}

impl TelemetryEventKind {
    const POWER_ON_CODE: u16 = 0x0001;
    const POWER_OFF_CODE: u16 = 0x0002;
    const COUNTDOWN_EXPIRED_CODE: u16 = 0x0003;
    const DISPLAY_SKIPPED_CODE: u16 = 0x0004;
    const COUNTDOWN_STARTED_BASE: u16 = 0x0010;
    const MODE_CHANGED_BASE: u16 = 0x0014;
    const EDGE_REJECTED_BASE: u16 = 0x0018;
    const TRIGGER_IGNORED_BASE: u16 = 0x001C;

    /// Encodes the event into a compact transport-friendly discriminant.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
    pub const fn to_raw(self) -> u16 {
        match self {
            TelemetryEventKind::PowerOn => Self::POWER_ON_CODE,
            TelemetryEventKind::PowerOff => Self::POWER_OFF_CODE,
            TelemetryEventKind::CountdownStarted(preset) => {
                Self::COUNTDOWN_STARTED_BASE + preset_index(preset)
            }
            TelemetryEventKind::CountdownExpired => Self::COUNTDOWN_EXPIRED_CODE,
            TelemetryEventKind::ModeChanged(mode) => Self::MODE_CHANGED_BASE + mode.level() as u16,
            TelemetryEventKind::EdgeRejected(line) => {
                Self::EDGE_REJECTED_BASE + line.as_index() as u16
            }
            TelemetryEventKind::TriggerIgnored(line) => {
                Self::TRIGGER_IGNORED_BASE + line.as_index() as u16
            }
            TelemetryEventKind::DisplaySkipped => Self::DISPLAY_SKIPPED_CODE,
        }
    }
}

/// Extra metadata attached to a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    /// No additional metadata accompanies the event.
    None,
    /// Time since the previous accepted edge on the same line.
    Edge { elapsed_ms: u32 },
    /// Previous mode and the sample that produced the new one.
    Mode { from: Mode, sample: u16 },
    /// Transport failure that caused a refresh to be skipped.
    Display(DisplayError),
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Millis,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} @{} {}", self.id, self.timestamp, self.event)?;
        match self.details {
            TelemetryPayload::None => Ok(()),
            TelemetryPayload::Edge { elapsed_ms } => write!(f, " ({elapsed_ms}ms)"),
            TelemetryPayload::Mode { from, sample } => {
                write!(f, " (from {from}, sample {sample})")
            }
            TelemetryPayload::Display(error) => write!(f, " ({error})"),
        }
    }
}

/// Fixed-capacity ring of recent telemetry records.
pub struct EventLog<const CAPACITY: usize = EVENT_LOG_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> EventLog<CAPACITY> {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        details: TelemetryPayload,
        timestamp: Millis,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details,
        });

        id
    }

    /// Records the observable result of a button edge.
    ///
    /// Accepted edges that changed nothing worth reporting (there are none
    /// today, but the mapping is total) return `None`.
    pub fn record_edge(&mut self, outcome: &EdgeOutcome, timestamp: Millis) -> Option<EventId> {
        let (event, details) = match *outcome {
            EdgeOutcome::Rejected(bounce) => (
                TelemetryEventKind::EdgeRejected(bounce.line),
                TelemetryPayload::Edge {
                    elapsed_ms: bounce.elapsed_ms,
                },
            ),
            EdgeOutcome::Applied { line, effect, .. } => {
                let event = match effect {
                    Effect::PoweredOn => TelemetryEventKind::PowerOn,
                    Effect::ForceOutputsOff => TelemetryEventKind::PowerOff,
                    Effect::CountdownStarted(_) => {
                        TelemetryEventKind::CountdownStarted(line.countdown_preset()?)
                    }
                    Effect::Ignored(_) => TelemetryEventKind::TriggerIgnored(line),
                    _ => return None,
                };
                (event, TelemetryPayload::None)
            }
        };
        Some(self.record(event, details, timestamp))
    }

    /// Records the noteworthy parts of a tick and returns how many records
    /// were written.
    pub fn record_tick(&mut self, report: &TickReport, timestamp: Millis) -> usize {
        let mut written = 0;

        if let Effect::ModeChanged { from, to } = report.derivation {
            self.record(
                TelemetryEventKind::ModeChanged(to),
                TelemetryPayload::Mode {
                    from,
                    sample: report.sample,
                },
                timestamp,
            );
            written += 1;
        }

        if let Some(RefreshOutcome {
            result: Err(error), ..
        }) = report.refresh
        {
            self.record(
                TelemetryEventKind::DisplaySkipped,
                TelemetryPayload::Display(error),
                timestamp,
            );
            written += 1;
        }

        if report.countdown == Some(Effect::CountdownExpired) {
            self.record(
                TelemetryEventKind::CountdownExpired,
                TelemetryPayload::None,
                timestamp,
            );
            written += 1;
        }

        written
    }
}

impl<const CAPACITY: usize> Default for EventLog<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

const fn preset_index(preset: CountdownPreset) -> u16 {
    match preset {
        CountdownPreset::Ten => 0,
        CountdownPreset::Twenty => 1,
        CountdownPreset::Thirty => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::OutputCommand;
    use crate::debounce::Bounce;
    use crate::display::StatusView;
    use crate::state::{IgnoreReason, SystemState};

    fn quiet_tick() -> TickReport {
        TickReport {
            tick: 1,
            sample: 0,
            derivation: Effect::None,
            output: OutputCommand::OFF,
            refresh: None,
            countdown: None,
            state: SystemState::BOOT,
        }
    }

    #[test]
    fn event_codes_are_unique() {
        let mut fixtures: heapless::Vec<TelemetryEventKind, 24> = heapless::Vec::new();
        for kind in [
            TelemetryEventKind::PowerOn,
            TelemetryEventKind::PowerOff,
            TelemetryEventKind::CountdownExpired,
            TelemetryEventKind::DisplaySkipped,
        ] {
            fixtures.push(kind).unwrap();
        }
        for preset in CountdownPreset::ALL {
            fixtures
                .push(TelemetryEventKind::CountdownStarted(preset))
                .unwrap();
        }
        for mode in [Mode::Off, Mode::Low, Mode::Medium, Mode::High] {
            fixtures.push(TelemetryEventKind::ModeChanged(mode)).unwrap();
        }
        for line in InputLine::ALL {
            fixtures.push(TelemetryEventKind::EdgeRejected(line)).unwrap();
            fixtures
                .push(TelemetryEventKind::TriggerIgnored(line))
                .unwrap();
        }

        for (index, kind) in fixtures.iter().enumerate() {
            for other in &fixtures[index + 1..] {
                assert_ne!(kind.to_raw(), other.to_raw(), "{kind} vs {other}");
            }
        }
        assert_eq!(
            TelemetryEventKind::CountdownStarted(CountdownPreset::Twenty).to_raw(),
            0x0011
        );
        assert_eq!(
            TelemetryEventKind::EdgeRejected(InputLine::PowerToggle).to_raw(),
            0x0018
        );
    }

    #[test]
    fn edge_outcomes_map_to_events() {
        let mut log = EventLog::<8>::new();

        log.record_edge(
            &EdgeOutcome::Rejected(Bounce {
                line: InputLine::Countdown20,
                elapsed_ms: 12,
            }),
            Millis::new(5),
        );
        let record = log.latest().copied().unwrap();
        assert_eq!(
            record.event,
            TelemetryEventKind::EdgeRejected(InputLine::Countdown20)
        );
        assert_eq!(record.details, TelemetryPayload::Edge { elapsed_ms: 12 });

        log.record_edge(
            &EdgeOutcome::Applied {
                line: InputLine::Countdown30,
                effect: Effect::CountdownStarted(30),
                state: SystemState::BOOT,
            },
            Millis::new(9),
        );
        assert_eq!(
            log.latest().map(|r| r.event),
            Some(TelemetryEventKind::CountdownStarted(CountdownPreset::Thirty))
        );

        log.record_edge(
            &EdgeOutcome::Applied {
                line: InputLine::Countdown10,
                effect: Effect::Ignored(IgnoreReason::PoweredOff),
                state: SystemState::BOOT,
            },
            Millis::new(11),
        );
        assert_eq!(
            log.latest().map(|r| r.event),
            Some(TelemetryEventKind::TriggerIgnored(InputLine::Countdown10))
        );
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn tick_reports_record_only_noteworthy_parts() {
        let mut log = EventLog::<8>::new();
        assert_eq!(log.record_tick(&quiet_tick(), Millis::new(100)), 0);
        assert!(log.is_empty());

        let busy = TickReport {
            sample: 3_100,
            derivation: Effect::ModeChanged {
                from: Mode::Low,
                to: Mode::High,
            },
            refresh: Some(RefreshOutcome {
                view: StatusView::Ready { mode: Mode::High },
                result: Err(DisplayError::Nack),
            }),
            countdown: Some(Effect::CountdownExpired),
            ..quiet_tick()
        };
        assert_eq!(log.record_tick(&busy, Millis::new(200)), 3);

        let events: heapless::Vec<TelemetryEventKind, 3> =
            log.oldest_first().map(|record| record.event).collect();
        assert_eq!(
            events.as_slice(),
            &[
                TelemetryEventKind::ModeChanged(Mode::High),
                TelemetryEventKind::DisplaySkipped,
                TelemetryEventKind::CountdownExpired,
            ]
        );
    }

    #[test]
    fn ring_keeps_most_recent_records() {
        let mut log = EventLog::<4>::new();
        for at in 0..6 {
            log.record(
                TelemetryEventKind::PowerOn,
                TelemetryPayload::None,
                Millis::new(at),
            );
        }

        assert_eq!(log.len(), 4);
        let ids: heapless::Vec<EventId, 4> = log.oldest_first().map(|record| record.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4, 5]);
    }

    #[test]
    fn records_render_with_details() {
        let mut log = EventLog::<2>::new();
        log.record(
            TelemetryEventKind::ModeChanged(Mode::Medium),
            TelemetryPayload::Mode {
                from: Mode::Low,
                sample: 1_400,
            },
            Millis::new(300),
        );

        let mut rendered: heapless::String<64> = heapless::String::new();
        core::fmt::Write::write_fmt(&mut rendered, format_args!("{}", log.latest().unwrap()))
            .unwrap();
        assert_eq!(rendered, "#0 @300ms mode-changed 2 (from 1, sample 1400)");
    }
}
