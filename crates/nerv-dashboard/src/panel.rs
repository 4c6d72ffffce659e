//! Frame output: the UC8159 e-paper controller on the Inky Impression, or a
//! PNG file for development away from the hardware.

use std::path::{Path, PathBuf};

use anyhow::Result;
use nerv_logging::targets::T_PANEL;

use crate::config::{DisplayBackend, DisplayConfig};
use crate::frame::Frame;

pub trait Panel {
    fn name(&self) -> &'static str;
    fn show(&mut self, frame: &Frame) -> Result<()>;
}

pub struct PreviewPanel {
    path: PathBuf,
}

impl PreviewPanel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Panel for PreviewPanel {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn show(&mut self, frame: &Frame) -> Result<()> {
        frame.save_png(&self.path)?;
        tracing::info!(target: T_PANEL, path = %self.path.display(), "Preview written");
        Ok(())
    }
}

/// Picks the panel for `display`. `preview` forces PNG output; an Inky panel
/// that fails to open falls back to PNG output at the configured path.
pub fn open_panel(display: &DisplayConfig, root: &Path, preview: Option<PathBuf>) -> Box<dyn Panel> {
    if let Some(path) = preview {
        return Box::new(PreviewPanel::new(path));
    }
    let preview_path = display.preview_path_in(root);
    match display.backend {
        DisplayBackend::Preview => Box::new(PreviewPanel::new(preview_path)),
        DisplayBackend::Inky => match open_inky(display) {
            Ok(panel) => panel,
            Err(err) => {
                tracing::warn!(
                    target: T_PANEL,
                    error = %format!("{err:#}"),
                    path = %preview_path.display(),
                    "Inky panel unavailable; writing previews instead"
                );
                Box::new(PreviewPanel::new(preview_path))
            }
        },
    }
}

#[cfg(target_os = "linux")]
fn open_inky(display: &DisplayConfig) -> Result<Box<dyn Panel>> {
    Ok(Box::new(inky::InkyPanel::new(display.width, display.height)?))
}

#[cfg(not(target_os = "linux"))]
fn open_inky(_: &DisplayConfig) -> Result<Box<dyn Panel>> {
    anyhow::bail!("the Inky panel needs Linux spidev and GPIO")
}

#[cfg(target_os = "linux")]
mod inky {
    use std::time::{Duration, Instant};

    use anyhow::{anyhow, Context, Result};
    use embedded_hal::delay::DelayNs;
    use embedded_hal::digital::{InputPin, OutputPin};
    use embedded_hal::spi::SpiDevice;
    use linux_embedded_hal::{
        gpio_cdev::{Chip, LineRequestFlags},
        spidev::{SpiModeFlags, SpidevOptions},
        CdevPin, Delay, SpidevDevice,
    };
    use nerv_logging::targets::T_PANEL;

    use super::Panel;
    use crate::frame::Frame;

    const SPI_PATH: &str = "/dev/spidev0.0";
    const GPIO_CHIPS: [&str; 2] = ["/dev/gpiochip4", "/dev/gpiochip0"];
    const DC_PIN: u32 = 22;
    const RESET_PIN: u32 = 27;
    const BUSY_PIN: u32 = 17;
    const SPI_SPEED_HZ: u32 = 3_000_000;
    const SPI_CHUNK: usize = 4096;
    const BUSY_TIMEOUT: Duration = Duration::from_secs(40);

    mod cmd {
        pub const PSR: u8 = 0x00;
        pub const PWR: u8 = 0x01;
        pub const POF: u8 = 0x02;
        pub const PFS: u8 = 0x03;
        pub const PON: u8 = 0x04;
        pub const BTST: u8 = 0x06;
        pub const DTM1: u8 = 0x10;
        pub const DRF: u8 = 0x12;
        pub const PLL: u8 = 0x30;
        pub const TSE: u8 = 0x40;
        pub const CDI: u8 = 0x50;
        pub const TCON: u8 = 0x60;
        pub const TRES: u8 = 0x61;
        pub const PWS: u8 = 0xE3;
    }

    pub struct InkyPanel {
        spi: SpidevDevice,
        dc: CdevPin,
        reset: CdevPin,
        busy: CdevPin,
        delay: Delay,
        width: u32,
        height: u32,
    }

    impl InkyPanel {
        pub fn new(width: u32, height: u32) -> Result<Self> {
            let mut spi = SpidevDevice::open(SPI_PATH).context("opening SPI device")?;
            let options = SpidevOptions::new()
                .bits_per_word(8)
                .max_speed_hz(SPI_SPEED_HZ)
                .mode(SpiModeFlags::SPI_MODE_0)
                .build();
            spi.configure(&options).context("configuring SPI")?;

            let mut chip = GPIO_CHIPS
                .iter()
                .find_map(|path| Chip::new(path).ok())
                .ok_or_else(|| anyhow!("no GPIO chip available for the panel"))?;

            let dc_handle = chip
                .get_line(DC_PIN)
                .context("getting DC line")?
                .request(LineRequestFlags::OUTPUT, 0, "nerv-inky-dc")
                .context("requesting DC line")?;
            let dc = CdevPin::new(dc_handle).context("creating DC pin")?;

            let reset_handle = chip
                .get_line(RESET_PIN)
                .context("getting RESET line")?
                .request(LineRequestFlags::OUTPUT, 1, "nerv-inky-reset")
                .context("requesting RESET line")?;
            let reset = CdevPin::new(reset_handle).context("creating RESET pin")?;

            let busy_handle = chip
                .get_line(BUSY_PIN)
                .context("getting BUSY line")?
                .request(LineRequestFlags::INPUT, 0, "nerv-inky-busy")
                .context("requesting BUSY line")?;
            let busy = CdevPin::new(busy_handle).context("creating BUSY pin")?;

            tracing::info!(target: T_PANEL, width, height, spi = SPI_PATH, "Inky panel opened");
            Ok(Self {
                spi,
                dc,
                reset,
                busy,
                delay: Delay {},
                width,
                height,
            })
        }

        fn reset(&mut self) -> Result<()> {
            self.reset
                .set_low()
                .map_err(|e| anyhow!("RESET low: {e:?}"))?;
            self.delay.delay_ms(100);
            self.reset
                .set_high()
                .map_err(|e| anyhow!("RESET high: {e:?}"))?;
            self.delay.delay_ms(100);
            self.busy_wait()
        }

        /// BUSY is held low while the controller works.
        fn busy_wait(&mut self) -> Result<()> {
            let start = Instant::now();
            while self
                .busy
                .is_low()
                .map_err(|e| anyhow!("reading BUSY: {e:?}"))?
            {
                if start.elapsed() > BUSY_TIMEOUT {
                    tracing::warn!(target: T_PANEL, timeout_s = BUSY_TIMEOUT.as_secs(), "Panel busy wait timed out");
                    return Ok(());
                }
                self.delay.delay_ms(10);
            }
            Ok(())
        }

        fn command(&mut self, command: u8, data: &[u8]) -> Result<()> {
            self.dc.set_low().map_err(|e| anyhow!("DC low: {e:?}"))?;
            self.spi
                .write(&[command])
                .map_err(|e| anyhow!("SPI command {command:#04x}: {e:?}"))?;
            if !data.is_empty() {
                self.dc.set_high().map_err(|e| anyhow!("DC high: {e:?}"))?;
                for chunk in data.chunks(SPI_CHUNK) {
                    self.spi
                        .write(chunk)
                        .map_err(|e| anyhow!("SPI data for {command:#04x}: {e:?}"))?;
                }
            }
            Ok(())
        }

        fn setup(&mut self) -> Result<()> {
            self.reset()?;
            let (w, h) = (self.width, self.height);
            self.command(cmd::TRES, &[(w >> 8) as u8, w as u8, (h >> 8) as u8, h as u8])?;
            self.command(cmd::PSR, &[0xEF, 0x08])?;
            self.command(cmd::PWR, &[0x37, 0x00, 0x23, 0x23])?;
            self.command(cmd::PFS, &[0x00])?;
            self.command(cmd::BTST, &[0xC7, 0xC7, 0x1D])?;
            self.command(cmd::PLL, &[0x3C])?;
            self.command(cmd::TSE, &[0x00])?;
            self.command(cmd::CDI, &[0x37])?;
            self.command(cmd::TCON, &[0x22])?;
            self.command(cmd::PWS, &[0xAA])?;
            self.delay.delay_ms(100);
            self.command(cmd::CDI, &[0x37])
        }
    }

    impl Panel for InkyPanel {
        fn name(&self) -> &'static str {
            "inky"
        }

        fn show(&mut self, frame: &Frame) -> Result<()> {
            let buffer = frame.to_panel_buffer();
            let started = Instant::now();
            self.setup()?;
            self.command(cmd::DTM1, &buffer)?;
            self.command(cmd::PON, &[])?;
            self.busy_wait()?;
            self.command(cmd::DRF, &[])?;
            self.busy_wait()?;
            self.command(cmd::POF, &[])?;
            self.busy_wait()?;
            tracing::info!(
                target: T_PANEL,
                bytes = buffer.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Panel refreshed"
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::InkColor;
    use tempfile::TempDir;

    #[test]
    fn preview_panel_writes_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("frame.png");
        let mut panel = PreviewPanel::new(&path);
        panel.show(&Frame::new(600, 448, InkColor::Black)).unwrap();
        let written = image::open(&path).unwrap();
        assert_eq!((written.width(), written.height()), (600, 448));
    }

    #[test]
    fn explicit_preview_overrides_backend() {
        let dir = TempDir::new().unwrap();
        let display = DisplayConfig::default();
        let panel = open_panel(&display, dir.path(), Some(dir.path().join("x.png")));
        assert_eq!(panel.name(), "preview");
    }

    #[test]
    fn preview_backend_uses_configured_path() {
        let dir = TempDir::new().unwrap();
        let display = DisplayConfig {
            backend: DisplayBackend::Preview,
            ..DisplayConfig::default()
        };
        let mut panel = open_panel(&display, dir.path(), None);
        panel.show(&Frame::new(600, 448, InkColor::White)).unwrap();
        assert!(dir.path().join("preview").join("frame.png").exists());
    }
}
