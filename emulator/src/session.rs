use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use controller_core::actuation::{
    ActuatorDriver, Indicator, IndicatorDriver, OutputCommand, OutputStage,
};
use controller_core::clock::{ManualClock, Millis, MonotonicClock};
use controller_core::config::{SAMPLE_MAX, SPLASH_DURATION, TICK_PERIOD_MS};
use controller_core::controller::{Controller, EdgeOutcome};
use controller_core::coordinator::{AnalogSampler, TickCoordinator, TickReport};
use controller_core::debounce::InputLine;
use controller_core::display::{DisplayError, StatusDisplay, StatusScreen, StatusView};
use controller_core::mode::{Mode, derive_mode};
use controller_core::state::{Effect, IgnoreReason};
use controller_core::telemetry::EventLog;
use winnow::ascii::{Caseless, alpha1, dec_uint, space0, space1};
use winnow::combinator::{alt, eof, opt, preceded, terminated};
use winnow::prelude::*;

/// Upper bound for a single `tick` command so a typo cannot stall the REPL.
const MAX_TICKS_PER_COMMAND: u32 = 10_000;

/// Same bound for `advance`, expressed in simulated milliseconds.
const MAX_ADVANCE_MS: u32 = MAX_TICKS_PER_COMMAND * TICK_PERIOD_MS;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "press",
        "press <power|t10|t20|t30>  - falling edge on a button line",
    ),
    (
        "adc",
        "adc <0-4095>               - set the analog input level",
    ),
    (
        "tick",
        "tick [count]               - run one or more 100ms ticks",
    ),
    (
        "advance",
        "advance <n>[ms|s]          - let simulated time pass",
    ),
    (
        "status",
        "status                     - show controller state",
    ),
    (
        "log",
        "log                        - dump the event log",
    ),
    (
        "display",
        "display <ok|fail>          - make the status panel healthy or faulty",
    ),
    (
        "help",
        "help [topic]               - show help for a command",
    ),
    (
        "exit",
        "exit                       - leave the emulator",
    ),
];

/// One parsed REPL line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    Press(InputLine),
    Adc(u16),
    Tick(u32),
    Advance(u32),
    Status,
    Log,
    Display { healthy: bool },
    Help(Option<&'a str>),
}

/// Parses a REPL line; the error carries the 1-based column of the failure.
pub fn parse_command(line: &str) -> Result<Command<'_>, usize> {
    command.parse(line).map_err(|err| err.offset() + 1)
}

fn command<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    terminated(
        preceded(
            space0,
            alt((
                press, adc, tick, advance, status, log, display, help,
            )),
        ),
        (space0, eof),
    )
    .parse_next(input)
}

fn press<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    preceded((Caseless("press"), space1), input_line)
        .map(Command::Press)
        .parse_next(input)
}

fn input_line(input: &mut &str) -> ModalResult<InputLine> {
    alt((
        Caseless("power").value(InputLine::PowerToggle),
        Caseless("t10").value(InputLine::Countdown10),
        Caseless("t20").value(InputLine::Countdown20),
        Caseless("t30").value(InputLine::Countdown30),
    ))
    .parse_next(input)
}

fn adc<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    preceded((Caseless("adc"), space1), dec_uint)
        .verify(|level: &u16| *level <= SAMPLE_MAX)
        .map(Command::Adc)
        .parse_next(input)
}

fn tick<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    preceded(Caseless("tick"), opt(preceded(space1, dec_uint)))
        .verify(|count: &Option<u32>| count.is_none_or(|n| (1..=MAX_TICKS_PER_COMMAND).contains(&n)))
        .map(|count| Command::Tick(count.unwrap_or(1)))
        .parse_next(input)
}

fn advance<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    preceded((Caseless("advance"), space1), duration_ms)
        .verify(|ms: &u32| *ms <= MAX_ADVANCE_MS)
        .map(Command::Advance)
        .parse_next(input)
}

fn duration_ms(input: &mut &str) -> ModalResult<u32> {
    (
        dec_uint::<_, u32, _>,
        opt(alt((Caseless("ms").value(1_u32), Caseless("s").value(1_000_u32)))),
    )
        .map(|(value, scale)| value.saturating_mul(scale.unwrap_or(1)))
        .parse_next(input)
}

fn status<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    Caseless("status").value(Command::Status).parse_next(input)
}

fn log<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    Caseless("log").value(Command::Log).parse_next(input)
}

fn display<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    preceded(
        (Caseless("display"), space1),
        alt((Caseless("ok").value(true), Caseless("fail").value(false))),
    )
    .map(|healthy| Command::Display { healthy })
    .parse_next(input)
}

fn help<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    preceded(Caseless("help"), opt(preceded(space1, alpha1)))
        .map(Command::Help)
        .parse_next(input)
}

/// Latches the analog level when a conversion starts; the session delivers
/// the result after the tick, the way the conversion-complete interrupt does.
#[derive(Default)]
struct HostSampler {
    input: u16,
    pending: Option<u16>,
}

impl AnalogSampler for HostSampler {
    fn start_sample(&mut self) {
        self.pending = Some(self.input);
    }
}

#[derive(Default)]
struct HostActuator {
    duty_percent: u8,
}

impl ActuatorDriver for HostActuator {
    fn set_duty(&mut self, percent: u8) {
        self.duty_percent = percent;
    }
}

#[derive(Default)]
struct HostIndicators {
    lit: Option<Indicator>,
}

impl IndicatorDriver for HostIndicators {
    fn set_indicator(&mut self, indicator: Option<Indicator>) {
        self.lit = indicator;
    }
}

/// Renders frames into a queue the session prints from.
struct HostDisplay {
    healthy: bool,
    queued: Vec<StatusScreen>,
}

impl HostDisplay {
    fn new() -> Self {
        Self {
            healthy: true,
            queued: Vec::new(),
        }
    }

    fn present(&mut self, screen: StatusScreen) -> Result<(), DisplayError> {
        if !self.healthy {
            return Err(DisplayError::Nack);
        }
        self.queued.push(screen);
        Ok(())
    }
}

impl StatusDisplay for HostDisplay {
    fn show_splash(&mut self) -> Result<(), DisplayError> {
        self.present(StatusScreen::splash())
    }

    fn show_ready(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.present(StatusScreen::render(StatusView::Ready { mode }))
    }

    fn show_stopped(&mut self) -> Result<(), DisplayError> {
        self.present(StatusScreen::render(StatusView::Stopped))
    }

    fn show_unbounded(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.present(StatusScreen::render(StatusView::Unbounded { mode }))
    }

    fn show_countdown(&mut self, mode: Mode, seconds_left: u16) -> Result<(), DisplayError> {
        self.present(StatusScreen::render(StatusView::Countdown {
            mode,
            seconds_left,
        }))
    }
}

pub struct Session {
    controller: Controller,
    coordinator: TickCoordinator,
    sampler: HostSampler,
    outputs: OutputStage<HostActuator, HostIndicators>,
    display: HostDisplay,
    clock: ManualClock,
    since_tick: u32,
    events: EventLog,
    last_output: Option<OutputCommand>,
    last_frame: Option<StatusScreen>,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    /// Creates a session; when `transcript` is set every exchange is also
    /// appended to that file.
    pub fn new(transcript: Option<&Path>) -> io::Result<Self> {
        let transcript = transcript.map(TranscriptLogger::new).transpose()?;

        Ok(Self {
            controller: Controller::new(),
            coordinator: TickCoordinator::new(),
            sampler: HostSampler::default(),
            outputs: OutputStage::new(HostActuator::default(), HostIndicators::default()),
            display: HostDisplay::new(),
            clock: ManualClock::starting_at(Millis::ZERO),
            since_tick: 0,
            events: EventLog::new(),
            last_output: None,
            last_frame: None,
            transcript,
        })
    }

    /// Shows the splash screen and lets the splash interval pass; the tick
    /// only starts afterwards.
    pub fn boot(&mut self) -> io::Result<Vec<String>> {
        let mut lines = Vec::new();
        match self.display.show_splash() {
            Ok(()) => self.drain_frames(&mut lines),
            Err(error) => lines.push(format!("splash skipped: {error}")),
        }

        let splash_ms = u32::try_from(SPLASH_DURATION.as_millis()).unwrap_or(u32::MAX);
        self.clock.advance(splash_ms);
        lines.push(format!(
            "boot complete at {} state={}",
            self.clock.now(),
            self.controller.snapshot().operating_state
        ));

        self.record_output(&lines)?;
        Ok(lines)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(self.clock.now(), TranscriptRole::Host, trimmed)?;
        }

        let mut lines = Vec::new();
        match parse_command(trimmed) {
            Ok(command) => self.execute(command, &mut lines),
            Err(column) => lines.push(format!("ERR syntax at column {column}")),
        }

        self.record_output(&lines)?;
        Ok(lines)
    }

    fn execute(&mut self, command: Command<'_>, lines: &mut Vec<String>) {
        match command {
            Command::Press(line) => self.press(line, lines),
            Command::Adc(level) => {
                self.sampler.input = level;
                lines.push(format!(
                    "OK adc {level} (mode {} after next conversion)",
                    derive_mode(level)
                ));
            }
            Command::Tick(count) => {
                for _ in 0..count {
                    self.advance(TICK_PERIOD_MS - self.since_tick, lines);
                }
            }
            Command::Advance(millis) => {
                self.advance(millis, lines);
                lines.push(format!("OK now {}", self.clock.now()));
            }
            Command::Status => lines.push(self.describe_status()),
            Command::Log => {
                if self.events.is_empty() {
                    lines.push("event log empty".to_string());
                }
                for record in self.events.oldest_first() {
                    lines.push(record.to_string());
                }
            }
            Command::Display { healthy } => {
                self.display.healthy = healthy;
                lines.push(format!(
                    "OK display {}",
                    if healthy { "healthy" } else { "faulty" }
                ));
            }
            Command::Help(topic) => help_lines(topic, lines),
        }
    }

    fn press(&mut self, line: InputLine, lines: &mut Vec<String>) {
        let now = self.clock.now();
        let outcome = self.controller.handle_edge(line, now, &mut self.outputs);
        self.events.record_edge(&outcome, now);

        let message = match outcome {
            EdgeOutcome::Rejected(bounce) => format!("BOUNCE {bounce}"),
            EdgeOutcome::Applied { effect, .. } => match effect {
                Effect::PoweredOn => format!("OK {line} -> powered on"),
                Effect::ForceOutputsOff => format!("OK {line} -> powered off, outputs forced off"),
                Effect::CountdownStarted(seconds) => {
                    format!("OK {line} -> countdown {seconds}s")
                }
                Effect::Ignored(IgnoreReason::PoweredOff) => {
                    format!("IGNORED {line} (powered off)")
                }
                other => format!("OK {line} -> {other:?}"),
            },
        };
        lines.push(message);
        self.note_output_change(lines);
    }

    fn advance(&mut self, millis: u32, lines: &mut Vec<String>) {
        let mut remaining = millis;
        while remaining > 0 {
            let until_tick = TICK_PERIOD_MS - self.since_tick;
            if remaining >= until_tick {
                self.clock.advance(until_tick);
                remaining -= until_tick;
                self.since_tick = 0;
                self.run_tick(lines);
            } else {
                self.clock.advance(remaining);
                self.since_tick += remaining;
                remaining = 0;
            }
        }
    }

    fn run_tick(&mut self, lines: &mut Vec<String>) {
        let report = self.coordinator.on_tick(
            &self.controller,
            &mut self.sampler,
            &mut self.outputs,
            &mut self.display,
        );
        if let Some(sample) = self.sampler.pending.take() {
            self.controller.record_sample(sample);
        }

        let now = self.clock.now();
        self.events.record_tick(&report, now);
        self.describe_tick(&report, now, lines);
    }

    fn describe_tick(&mut self, report: &TickReport, now: Millis, lines: &mut Vec<String>) {
        if let Effect::ModeChanged { from, to } = report.derivation {
            lines.push(format!("[{now}] mode {from} -> {to} (sample {})", report.sample));
        }

        self.note_output_change(lines);

        if let Some(refresh) = report.refresh {
            match refresh.result {
                Ok(()) => self.drain_frames(lines),
                Err(error) => lines.push(format!("[{now}] display refresh skipped: {error}")),
            }
        }

        match report.countdown {
            Some(Effect::CountdownDecremented(seconds)) => {
                lines.push(format!("[{now}] countdown {seconds}s left"));
            }
            Some(Effect::CountdownExpired) => {
                lines.push(format!("[{now}] countdown expired, ready"));
            }
            _ => {}
        }
    }

    fn note_output_change(&mut self, lines: &mut Vec<String>) {
        let current = self.outputs.last_applied();
        if current.is_some() && current != self.last_output {
            lines.push(format!(
                "[{}] outputs duty={}% led={}",
                self.clock.now(),
                self.outputs.actuator().duty_percent,
                indicator_label(self.outputs.indicators().lit)
            ));
            self.last_output = current;
        }
    }

    fn drain_frames(&mut self, lines: &mut Vec<String>) {
        for screen in std::mem::take(&mut self.display.queued) {
            if self.last_frame.as_ref() == Some(&screen) {
                continue;
            }
            lines.extend(frame_lines(&screen));
            self.last_frame = Some(screen);
        }
    }

    fn describe_status(&self) -> String {
        let state = self.controller.snapshot();
        let mut line = format!(
            "state={} mode={} power={} override={}",
            state.operating_state,
            state.mode,
            if state.power_active { "on" } else { "off" },
            if state.manual_override_pending {
                "pending"
            } else {
                "none"
            },
        );
        if state.countdown_seconds > 0 {
            let _ = write!(line, " countdown={}s", state.countdown_seconds);
        }
        let _ = write!(
            line,
            " sample={} duty={}% led={} now={}",
            self.controller.latest_sample(),
            self.outputs.actuator().duty_percent,
            indicator_label(self.outputs.indicators().lit),
            self.clock.now()
        );
        line
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(self.clock.now(), TranscriptRole::Emulator, line)?;
            }
        }
        Ok(())
    }
}

fn help_lines(topic: Option<&str>, lines: &mut Vec<String>) {
    match topic {
        Some(target) => {
            if let Some((_, detail)) = HELP_TOPICS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(target))
            {
                lines.push((*detail).to_string());
            } else {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        }
        None => {
            lines.push("Available commands:".to_string());
            for (_, detail) in HELP_TOPICS {
                lines.push(format!("  {detail}"));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn indicator_label(indicator: Option<Indicator>) -> &'static str {
    match indicator {
        None => "none",
        Some(Indicator::Led1) => "LED1",
        Some(Indicator::Led2) => "LED2",
        Some(Indicator::Led3) => "LED3",
    }
}

fn frame_lines(screen: &StatusScreen) -> Vec<String> {
    let border = format!("+{}+", "-".repeat(controller_core::display::STATUS_LINE_CAPACITY));
    let mut lines = vec![border.clone()];
    for text in screen.lines() {
        lines.push(format!(
            "|{text:<width$}|",
            width = controller_core::display::STATUS_LINE_CAPACITY
        ));
    }
    lines.push(border);
    lines
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Intensity controller emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are simulated milliseconds since power-up"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, at: Millis, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>7} ms] {} {}",
            at.as_u32(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
