//! Status display surface.
//!
//! The coordinator decides *what* to show through [`StatusView`]; drivers
//! implement [`StatusDisplay`] to decide *how*. [`StatusScreen`] renders the
//! text layout used on the SSD1306 panel so firmware and emulator agree on
//! the exact strings.

use core::fmt::{self, Write};

use heapless::String;

use crate::mode::Mode;
use crate::state::{OperatingState, SystemState};

/// Maximum characters on one rendered line.
pub const STATUS_LINE_CAPACITY: usize = 21;

/// Title line shown above every status frame.
pub const STATUS_TITLE: &str = "DEVICE STATUS";

/// Text shown while the splash screen is up.
pub const SPLASH_TEXT: &str = "SYSTEM READY";

/// Failure reported by a display transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DisplayError {
    /// The bus did not complete the transfer in time.
    Timeout,
    /// The panel did not acknowledge its address or a data byte.
    Nack,
    /// Any other bus fault (arbitration loss, bus error).
    Bus,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DisplayError::Timeout => "transfer timed out",
            DisplayError::Nack => "panel did not acknowledge",
            DisplayError::Bus => "bus fault",
        };
        f.write_str(label)
    }
}

/// What the status display should currently show.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StatusView {
    Ready { mode: Mode },
    Stopped,
    Unbounded { mode: Mode },
    Countdown { mode: Mode, seconds_left: u16 },
}

impl StatusView {
    /// Selects the view for `state`.
    #[must_use]
    pub const fn for_state(state: &SystemState) -> Self {
        match state.operating_state {
            OperatingState::Ready => StatusView::Ready { mode: state.mode },
            OperatingState::Stopped => StatusView::Stopped,
            OperatingState::Unbounded => StatusView::Unbounded { mode: state.mode },
            OperatingState::CountingDown => StatusView::Countdown {
                mode: state.mode,
                seconds_left: state.countdown_seconds,
            },
        }
    }
}

/// Status display driver.
///
/// Every call is a full-frame redraw. A failed redraw is not retried by the
/// caller; the next scheduled refresh draws the then-current view.
pub trait StatusDisplay {
    /// Shows the boot splash.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, if any.
    fn show_splash(&mut self) -> Result<(), DisplayError>;

    /// Shows the idle "ready" frame after a countdown finished.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, if any.
    fn show_ready(&mut self, mode: Mode) -> Result<(), DisplayError>;

    /// Shows the powered-off frame.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, if any.
    fn show_stopped(&mut self) -> Result<(), DisplayError>;

    /// Shows continuous operation at `mode`.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, if any.
    fn show_unbounded(&mut self, mode: Mode) -> Result<(), DisplayError>;

    /// Shows a running countdown.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, if any.
    fn show_countdown(&mut self, mode: Mode, seconds_left: u16) -> Result<(), DisplayError>;

    /// Dispatches `view` to the matching `show_*` method.
    ///
    /// # Errors
    ///
    /// Returns the transport failure, if any.
    fn show(&mut self, view: StatusView) -> Result<(), DisplayError> {
        match view {
            StatusView::Ready { mode } => self.show_ready(mode),
            StatusView::Stopped => self.show_stopped(),
            StatusView::Unbounded { mode } => self.show_unbounded(mode),
            StatusView::Countdown { mode, seconds_left } => {
                self.show_countdown(mode, seconds_left)
            }
        }
    }
}

/// One rendered line of status text.
pub type StatusLine = String<STATUS_LINE_CAPACITY>;

/// Rendered text for one display frame: a title plus up to two body lines.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusScreen {
    pub title: StatusLine,
    pub primary: StatusLine,
    pub secondary: StatusLine,
}

impl StatusScreen {
    /// Renders the frame for `view`.
    #[must_use]
    pub fn render(view: StatusView) -> Self {
        let mut screen = Self::titled(STATUS_TITLE);
        match view {
            StatusView::Ready { mode } => {
                screen.primary = mode_line(mode);
                screen.secondary = line("READY");
            }
            StatusView::Stopped => {
                screen.primary = line("MODE 0");
                screen.secondary = line("STOPPED");
            }
            StatusView::Unbounded { mode } => {
                screen.primary = mode_line(mode);
                screen.secondary = line("CONTINUOUS");
            }
            StatusView::Countdown { mode, seconds_left } => {
                screen.primary = mode_line(mode);
                if seconds_left > 0 {
                    let _ = write!(screen.secondary, "TIME {seconds_left}s");
                } else {
                    screen.secondary = line("READY");
                }
            }
        }
        screen
    }

    /// Renders the boot splash frame.
    #[must_use]
    pub fn splash() -> Self {
        let mut screen = Self::titled("");
        screen.primary = line(SPLASH_TEXT);
        screen
    }

    /// Iterates over the three lines, top to bottom.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        [
            self.title.as_str(),
            self.primary.as_str(),
            self.secondary.as_str(),
        ]
        .into_iter()
    }

    fn titled(title: &str) -> Self {
        Self {
            title: line(title),
            primary: String::new(),
            secondary: String::new(),
        }
    }
}

fn line(text: &str) -> StatusLine {
    let mut rendered = String::new();
    for ch in text.chars() {
        if rendered.push(ch).is_err() {
            break;
        }
    }
    rendered
}

fn mode_line(mode: Mode) -> StatusLine {
    let mut rendered = String::new();
    let _ = write!(rendered, "MODE {}", mode.level());
    rendered
}
