//! SSD1306 status panel on I2C1.
//!
//! The tick never touches the bus. It posts a [`Frame`] through
//! [`FrameRequests`]; the display task owns the [`StatusPanel`] and draws the
//! most recent frame, so a slow or failing transfer only delays the panel.

use controller_core::display::{DisplayError, StatusDisplay, StatusScreen, StatusView};
use controller_core::mode::Mode;
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

/// Vertical distance between the title and each body line, in pixels.
const LINE_PITCH: i32 = 20;

/// Horizontal anchor for centred lines on the 128 px wide panel.
const CENTER_X: i32 = 64;

/// Frame queued for the display task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Frame {
    Splash,
    Status(StatusView),
}

impl Frame {
    fn screen(self) -> StatusScreen {
        match self {
            Frame::Splash => StatusScreen::splash(),
            Frame::Status(view) => StatusScreen::render(view),
        }
    }
}

/// Latest-value mailbox between the tick and the display task.
pub type FrameSignal = Signal<CriticalSectionRawMutex, Frame>;

type Panel<'d> = Ssd1306<
    I2CInterface<I2c<'d, Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// Buffered SSD1306 driver that draws [`StatusScreen`] text.
pub struct StatusPanel<'d> {
    display: Panel<'d>,
    style: MonoTextStyle<'static, BinaryColor>,
    layout: TextStyle,
}

impl<'d> StatusPanel<'d> {
    pub fn new(i2c: I2c<'d, Blocking>) -> Self {
        let display = Ssd1306::new(
            I2CDisplayInterface::new(i2c),
            DisplaySize128x64,
            DisplayRotation::Rotate0,
        )
        .into_buffered_graphics_mode();

        Self {
            display,
            style: MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
            layout: TextStyleBuilder::new()
                .alignment(Alignment::Center)
                .baseline(Baseline::Top)
                .build(),
        }
    }

    /// Sends the panel initialisation sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Bus`] when the panel does not respond.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.display.init().map_err(bus_fault)
    }

    /// Redraws the whole panel with `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayError::Bus`] when the transfer fails.
    pub fn draw(&mut self, frame: Frame) -> Result<(), DisplayError> {
        let screen = frame.screen();
        self.display.clear_buffer();
        let mut y = 0;
        for line in screen.lines() {
            Text::with_text_style(line, Point::new(CENTER_X, y), self.style, self.layout)
                .draw(&mut self.display)
                .map_err(bus_fault)?;
            y += LINE_PITCH;
        }
        self.display.flush().map_err(bus_fault)
    }
}

impl StatusDisplay for StatusPanel<'_> {
    fn show_splash(&mut self) -> Result<(), DisplayError> {
        self.draw(Frame::Splash)
    }

    fn show_ready(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.draw(Frame::Status(StatusView::Ready { mode }))
    }

    fn show_stopped(&mut self) -> Result<(), DisplayError> {
        self.draw(Frame::Status(StatusView::Stopped))
    }

    fn show_unbounded(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.draw(Frame::Status(StatusView::Unbounded { mode }))
    }

    fn show_countdown(&mut self, mode: Mode, seconds_left: u16) -> Result<(), DisplayError> {
        self.draw(Frame::Status(StatusView::Countdown { mode, seconds_left }))
    }
}

/// Display seam for the tick: hands frames to the display task.
///
/// Posting never fails; transfer faults are recorded by the display task.
pub struct FrameRequests {
    signal: &'static FrameSignal,
}

impl FrameRequests {
    pub const fn new(signal: &'static FrameSignal) -> Self {
        Self { signal }
    }

    fn post(&mut self, frame: Frame) {
        self.signal.signal(frame);
    }
}

impl StatusDisplay for FrameRequests {
    fn show_splash(&mut self) -> Result<(), DisplayError> {
        self.post(Frame::Splash);
        Ok(())
    }

    fn show_ready(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.post(Frame::Status(StatusView::Ready { mode }));
        Ok(())
    }

    fn show_stopped(&mut self) -> Result<(), DisplayError> {
        self.post(Frame::Status(StatusView::Stopped));
        Ok(())
    }

    fn show_unbounded(&mut self, mode: Mode) -> Result<(), DisplayError> {
        self.post(Frame::Status(StatusView::Unbounded { mode }));
        Ok(())
    }

    fn show_countdown(&mut self, mode: Mode, seconds_left: u16) -> Result<(), DisplayError> {
        self.post(Frame::Status(StatusView::Countdown { mode, seconds_left }));
        Ok(())
    }
}

fn bus_fault<E>(_: E) -> DisplayError {
    DisplayError::Bus
}
