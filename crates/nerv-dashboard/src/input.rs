use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::Result;

use crate::config::PinConfig;

/// The four keys on the side of the Inky Impression, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardAction {
    PreviousPage,
    Refresh,
    NextPage,
    PageAction,
}

impl Button {
    pub const ALL: [Self; 4] = [Self::A, Self::B, Self::C, Self::D];

    pub const fn action(self) -> DashboardAction {
        match self {
            Self::A => DashboardAction::PreviousPage,
            Self::B => DashboardAction::Refresh,
            Self::C => DashboardAction::NextPage,
            Self::D => DashboardAction::PageAction,
        }
    }

    pub fn pin(self, pins: &PinConfig) -> u32 {
        match self {
            Self::A => pins.button_a,
            Self::B => pins.button_b,
            Self::C => pins.button_c,
            Self::D => pins.button_d,
        }
    }
}

/// Something the refresh loop can wait on between updates.
pub trait ButtonSource {
    /// Blocks for at most `timeout`, returning the first press seen.
    fn try_read_timeout(&mut self, timeout: Duration) -> Result<Option<Button>>;
}

/// One button input. The buttons short the line to ground, so a pressed
/// button reads low.
pub trait ButtonLine {
    fn is_pressed(&self) -> Result<bool>;
}

/// Debounced set of button lines. A line that reads pressed when the pad is
/// built, or stays pressed past the release timeout, is treated as stuck and
/// dropped so it cannot hold up the refresh loop.
pub struct ButtonPad<L> {
    buttons: Vec<(Button, L)>,
    debounce: Duration,
    release_timeout: Duration,
    last_press: Option<Instant>,
}

impl<L: ButtonLine> ButtonPad<L> {
    pub const RELEASE_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn from_lines(lines: Vec<(Button, L)>, debounce: Duration) -> Self {
        let buttons = lines
            .into_iter()
            .filter(|(kind, line)| match line.is_pressed() {
                Ok(false) => true,
                Ok(true) => {
                    tracing::warn!(button = ?kind, "Button reads pressed at startup; ignoring it (missing pull-up?)");
                    false
                }
                Err(err) => {
                    tracing::warn!(button = ?kind, error = %format!("{err:#}"), "Button line unreadable; ignoring it");
                    false
                }
            })
            .collect();
        Self {
            buttons,
            debounce,
            release_timeout: Self::RELEASE_TIMEOUT,
            last_press: None,
        }
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }

    pub fn len(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
    }

    fn wait_for_release(&mut self, kind: Button) -> Result<()> {
        let Some(pos) = self.buttons.iter().position(|(k, _)| *k == kind) else {
            return Ok(());
        };
        let start = Instant::now();
        while self.buttons[pos].1.is_pressed()? {
            if start.elapsed() >= self.release_timeout {
                tracing::warn!(
                    button = ?kind,
                    held_ms = start.elapsed().as_millis() as u64,
                    "Button never released; ignoring it"
                );
                self.buttons.remove(pos);
                return Ok(());
            }
            thread::sleep(Duration::from_millis(10));
        }
        Ok(())
    }

    fn poll(&mut self) -> Result<Option<Button>> {
        for (kind, line) in &self.buttons {
            if line.is_pressed()? {
                if let Some(last) = self.last_press {
                    if last.elapsed() < self.debounce {
                        return Ok(None);
                    }
                }
                self.last_press = Some(Instant::now());
                return Ok(Some(*kind));
            }
        }
        Ok(None)
    }
}

impl<L: ButtonLine> ButtonSource for ButtonPad<L> {
    fn try_read_timeout(&mut self, timeout: Duration) -> Result<Option<Button>> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Some(kind) = self.poll()? {
                self.wait_for_release(kind)?;
                return Ok(Some(kind));
            }
            thread::sleep(Duration::from_millis(10));
        }
        Ok(None)
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::*;
    use anyhow::{anyhow, Context};
    use linux_embedded_hal::gpio_cdev::{Chip, LineHandle, LineRequestFlags};

    /// A character-device GPIO line. The request carries no bias, so the
    /// pull-ups come from the firmware (`gpio=5,6,16,24=pu` in config.txt).
    pub struct GpioLine(LineHandle);

    impl ButtonLine for GpioLine {
        fn is_pressed(&self) -> Result<bool> {
            Ok(self.0.get_value()? == 0)
        }
    }

    /// Opens the first GPIO chip from `pins.gpio_chips` that exists.
    pub fn open_pad(pins: &PinConfig) -> Result<ButtonPad<GpioLine>> {
        let mut chip = open_first_chip(pins)?;
        let mut lines = Vec::with_capacity(Button::ALL.len());
        for kind in Button::ALL {
            let pin = kind.pin(pins);
            let handle = chip
                .get_line(pin)
                .with_context(|| format!("requesting GPIO line {}", pin))?
                .request(LineRequestFlags::INPUT, 1, "nerv-dashboard")
                .with_context(|| format!("configuring GPIO line {}", pin))?;
            lines.push((kind, GpioLine(handle)));
        }
        tracing::info!(
            chip = %chip.path().display(),
            a = pins.button_a,
            b = pins.button_b,
            c = pins.button_c,
            d = pins.button_d,
            "Buttons ready"
        );
        Ok(ButtonPad::from_lines(lines, Duration::from_millis(pins.debounce_ms)))
    }

    fn open_first_chip(pins: &PinConfig) -> Result<Chip> {
        let mut last_err = None;
        for path in &pins.gpio_chips {
            match Chip::new(path) {
                Ok(chip) => return Ok(chip),
                Err(err) => {
                    tracing::debug!(chip = %path.display(), error = %err, "GPIO chip unavailable");
                    last_err = Some(err);
                }
            }
        }
        match last_err {
            Some(err) => Err(err).context("no usable GPIO chip"),
            None => Err(anyhow!("no GPIO chips configured")),
        }
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::*;
    use anyhow::bail;

    /// No GPIO off Linux; this type has no values.
    pub enum GpioLine {}

    impl ButtonLine for GpioLine {
        fn is_pressed(&self) -> Result<bool> {
            match *self {}
        }
    }

    pub fn open_pad(_: &PinConfig) -> Result<ButtonPad<GpioLine>> {
        bail!("GPIO buttons are only supported on Linux")
    }
}

pub use platform::GpioLine;

pub type GpioButtons = ButtonPad<GpioLine>;

/// Opens the button pad, or returns `None` (logged) when no GPIO is available
/// or every line is stuck.
pub fn open_buttons(pins: &PinConfig) -> Option<GpioButtons> {
    match platform::open_pad(pins) {
        Ok(pad) if pad.is_empty() => {
            tracing::warn!("Buttons disabled: no usable lines");
            None
        }
        Ok(pad) => Some(pad),
        Err(err) => {
            tracing::info!(error = %format!("{err:#}"), "Buttons disabled");
            None
        }
    }
}
