use embedded_graphics::prelude::Size;
use embedded_hal::{digital::OutputPin as _, spi::Mode};
use embedded_hal_async::delay::DelayNs as _;

use crate::{
    buffer::{plane_length, Color, TriColorBuffer},
    comms::{BusyPolicy, BusyWait as _, CommandDataSend as _},
    log::{debug, warn_log},
    EpdHw,
};

/// The width of the display (landscape orientation).
pub const DISPLAY_WIDTH: u16 = 296;
/// The height of the display (landscape orientation).
pub const DISPLAY_HEIGHT: u16 = 152;
/// The length in bytes of each plane of [Epd2in66Buffer].
pub const PLANE_LENGTH: usize =
    plane_length(Size::new(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32));
/// The buffer type used by [Epd2in66].
pub type Epd2in66Buffer = TriColorBuffer<PLANE_LENGTH>;

/// The controller accepts up to 10MHz.
pub const MAX_SPI_HZ: u32 = 10_000_000;
/// A conservative clock that leaves plenty of margin on long wires.
pub const RECOMMENDED_SPI_HZ: u32 = 800_000;
/// Clock idles low and data is captured on the first (rising) edge. Data is sent MSB first.
pub const RECOMMENDED_SPI_MODE: Mode = embedded_hal::spi::MODE_0;

/// Sent with [Command::SoftReset] during initialisation.
const SOFT_RESET_DATA: u8 = 0x0E;
/// Sent with [Command::ActivateTemperature] to apply [Command::InputTemperature].
const ACTIVATE_TEMPERATURE_DATA: u8 = 0x02;
/// Sent with [Command::PanelSettings] alongside the temperature, per the datasheet.
const PANEL_SETTINGS_DATA: [u8; 2] = [0xCF, 0x89];

/// Delays (in ms) for the hardware reset pulse. The datasheet mandates this exact timing; the
/// panel may not respond if it's changed.
const RESET_DELAYS_MS: [u32; 4] = [5, 5, 10, 5];
const SOFT_RESET_DELAY_MS: u32 = 5;
const FRAME_SETTLE_DELAY_MS: u32 = 50;
const POWER_ON_DELAY_MS: u32 = 5;
const REFRESH_DELAY_MS: u32 = 5;

/// Low-level commands for the Epd2in66. You probably want to use the other methods exposed on
/// [Epd2in66] for most operations, but can send commands directly with [Epd2in66::send] for
/// low-level control or experimentation.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Resets the controller's registers. Sent with `0x0E`.
    SoftReset,
    /// Writes the current panel temperature, which changes the waveform used for refreshes.
    InputTemperature,
    /// Applies the temperature written with [Command::InputTemperature].
    ActivateTemperature,
    /// Panel configuration. Shares its register with [Command::SoftReset]; the controller tells
    /// them apart by the data that follows.
    PanelSettings,
    /// Writes the black plane.
    BlackFrame,
    /// Writes the red plane.
    ColorFrame,
    /// Turns on the DC/DC converter.
    PowerOn,
    /// Drives the particles to show the written frames. Requires [Command::PowerOn].
    DisplayRefresh,
    /// Turns off the DC/DC converter.
    PowerOff,
}

impl Command {
    /// Returns the register address for this command.
    pub fn register(&self) -> u8 {
        match self {
            Command::SoftReset => 0x00,
            Command::InputTemperature => 0xE5,
            Command::ActivateTemperature => 0xE0,
            Command::PanelSettings => 0x00,
            Command::BlackFrame => 0x10,
            Command::ColorFrame => 0x13,
            Command::PowerOn => 0x04,
            Command::DisplayRefresh => 0x12,
            Command::PowerOff => 0x02,
        }
    }
}

/// Controls Pervasive Displays' iTC 2.66" black/white/red e-paper panel.
///
/// The driver owns the frame buffer: draw into it with [Epd2in66::set_pixel],
/// [Epd2in66::fill_buffer], or any `embedded-graphics` drawable via [Epd2in66::buffer_mut], then
/// send it with [Epd2in66::display_buffer].
///
/// [Epd2in66::init] must be called before anything is sent to the display.
pub struct Epd2in66<HW>
where
    HW: EpdHw,
{
    hw: HW,
    buffer: Epd2in66Buffer,
    busy_policy: BusyPolicy,
    initialised: bool,
}

impl<HW> Epd2in66<HW>
where
    HW: EpdHw,
{
    /// Creates the driver, with an all-white frame buffer. This doesn't touch the hardware.
    pub fn new(hw: HW) -> Self {
        Epd2in66 {
            hw,
            buffer: Epd2in66Buffer::new(Size::new(DISPLAY_WIDTH as u32, DISPLAY_HEIGHT as u32)),
            busy_policy: BusyPolicy::default(),
            initialised: false,
        }
    }

    /// Sets how long to wait for the display while refreshing. Defaults to
    /// [BusyPolicy::Unbounded].
    pub fn with_busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.busy_policy = policy;
        self
    }

    pub fn set_busy_policy(&mut self, policy: BusyPolicy) {
        self.busy_policy = policy;
    }

    pub fn busy_policy(&self) -> BusyPolicy {
        self.busy_policy
    }

    pub fn width(&self) -> u32 {
        DISPLAY_WIDTH as u32
    }

    pub fn height(&self) -> u32 {
        DISPLAY_HEIGHT as u32
    }

    pub fn buffer(&self) -> &Epd2in66Buffer {
        &self.buffer
    }

    /// Mutable access to the frame buffer, e.g. for drawing with `embedded-graphics`.
    pub fn buffer_mut(&mut self) -> &mut Epd2in66Buffer {
        &mut self.buffer
    }

    /// Releases the hardware.
    pub fn release(self) -> HW {
        self.hw
    }

    /// Sets a pixel in the frame buffer. Pixels outside the display are ignored.
    pub fn set_pixel(&mut self, x: u16, y: u16, color: Color) {
        self.buffer.set_pixel(x, y, color);
    }

    /// Sets a pixel in the frame buffer by its linear index (`x + y * width`). Indices outside
    /// the display are ignored.
    pub fn set_pixel_at(&mut self, index: usize, color: Color) {
        self.buffer.set_pixel_at(index, color);
    }

    /// Sets every pixel in the frame buffer to `color`.
    pub fn fill_buffer(&mut self, color: Color) {
        self.buffer.fill(color);
    }

    /// Initialise the display. This must be called once before any other operations.
    ///
    /// The SPI bus and pins must already be configured; see [RECOMMENDED_SPI_HZ] and
    /// [RECOMMENDED_SPI_MODE].
    pub async fn init(&mut self) -> Result<(), HW::Error> {
        debug!("Initialising display");
        self.reset().await?;

        self.send(Command::SoftReset, &[SOFT_RESET_DATA]).await?;
        self.hw.delay().delay_ms(SOFT_RESET_DELAY_MS).await;

        self.initialised = true;
        Ok(())
    }

    /// Hardware reset the display using the pulse timing from the datasheet.
    async fn reset(&mut self) -> Result<(), HW::Error> {
        debug!("Resetting EPD");
        let [before, high, low, after] = RESET_DELAYS_MS;
        self.hw.delay().delay_ms(before).await;
        self.hw.reset().set_high()?;
        self.hw.delay().delay_ms(high).await;
        self.hw.reset().set_low()?;
        self.hw.delay().delay_ms(low).await;
        self.hw.reset().set_high()?;
        self.hw.delay().delay_ms(after).await;
        Ok(())
    }

    /// Sets the operating temperature of the display, which it uses to pick refresh timings.
    ///
    /// The value is forwarded verbatim; the controller interprets it.
    pub async fn set_temperature(&mut self, temperature: u8) -> Result<(), HW::Error> {
        self.warn_if_uninitialised();
        debug!("Setting temperature to {}", temperature);

        self.send(Command::InputTemperature, &[temperature]).await?;
        self.send(Command::ActivateTemperature, &[ACTIVATE_TEMPERATURE_DATA])
            .await?;
        self.send(Command::PanelSettings, &PANEL_SETTINGS_DATA)
            .await
    }

    /// Writes the entire frame buffer to the display and refreshes it.
    ///
    /// With [BusyPolicy::Unbounded] this waits as long as the display stays busy.
    ///
    /// Afterwards the controller is held in reset, so [Epd2in66::init] must be called again before
    /// the next operation.
    pub async fn display_buffer(&mut self) -> Result<(), HW::Error> {
        self.warn_if_uninitialised();
        debug!("Writing frame buffer");

        self.hw.write_command(Command::BlackFrame.register()).await?;
        for byte in self.buffer.black_plane() {
            self.hw.write_raw(*byte).await?;
        }

        self.hw.write_command(Command::ColorFrame.register()).await?;
        for byte in self.buffer.red_plane() {
            self.hw.write_raw(*byte).await?;
        }

        self.hw.delay().delay_ms(FRAME_SETTLE_DELAY_MS).await;

        debug!("Refreshing display");
        self.send(Command::PowerOn, &[]).await?;
        self.hw.delay().delay_ms(POWER_ON_DELAY_MS).await;
        self.hw.wait_until_ready(self.busy_policy).await?;

        self.send(Command::DisplayRefresh, &[]).await?;
        self.hw.delay().delay_ms(REFRESH_DELAY_MS).await;
        self.hw.wait_until_ready(self.busy_policy).await?;

        self.send(Command::PowerOff, &[]).await?;
        self.hw.wait_until_ready(self.busy_policy).await?;

        // Held in reset until the next init.
        self.hw.reset().set_low()?;
        self.initialised = false;
        Ok(())
    }

    /// Clears the frame buffer to white and displays it.
    ///
    /// Like [Epd2in66::display_buffer], this needs a fresh [Epd2in66::init] if the display was
    /// refreshed since the last one.
    pub async fn clear(&mut self) -> Result<(), HW::Error> {
        self.fill_buffer(Color::White);
        self.display_buffer().await
    }

    /// Send the following command and data to the display. Each data byte is sent in its own
    /// chip select frame.
    pub async fn send(&mut self, command: Command, data: &[u8]) -> Result<(), HW::Error> {
        self.hw.send(command.register(), data).await
    }

    fn warn_if_uninitialised(&self) {
        if !self.initialised {
            warn_log!("EPD used before init; the display may not respond");
        }
    }
}
