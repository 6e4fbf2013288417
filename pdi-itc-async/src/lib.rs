//! This crate provides an `async`/`await` driver for Pervasive Displays' iTC 2.66" e-paper panel,
//! a 296x152 display that can show black and red on a white background.
//!
//! It is built on top of `embedded-hal-async` and `embedded-graphics`, making it compatible with a
//! wide range of embedded platforms.
//!
//! ## Overview
//!
//! - [`EpdHw`]: This trait abstracts over the hardware needed to control the panel: the SPI bus,
//!   GPIO pins (for Chip Select, Data/Command, Reset, and Busy signals), and a delay timer. You
//!   need to implement this trait for your chosen peripherals. This trades off some set up code
//!   (implementing this trait), for simple type signatures with only one generic parameter.
//! - [`epd2in66::Epd2in66`]: the display driver. It owns the frame buffer, runs the controller's
//!   reset and temperature sequences, and transmits the frame buffer to the panel.
//! - [`buffer`]: the two-plane [`buffer::TriColorBuffer`] and its [`buffer::Color`] type. The
//!   buffer implements `embedded-graphics::DrawTarget`, so anything `embedded-graphics` can draw
//!   can be drawn onto the panel.
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut epd = Epd2in66::new(hw);
//! epd.init().await?;
//! epd.set_temperature(22).await?;
//!
//! epd.fill_buffer(Color::White);
//! Circle::new(Point::new(20, 20), 60)
//!     .into_styled(PrimitiveStyle::with_fill(Color::Red))
//!     .draw(epd.buffer_mut())?;
//! epd.set_pixel(0, 0, Color::Black);
//!
//! epd.display_buffer().await?;
//! ```
#![no_std]

#[cfg(test)]
extern crate std;

use core::error::Error as CoreError;

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin, PinState};
use embedded_hal_async::{
    delay::DelayNs,
    digital::Wait,
    spi::{ErrorType as SpiErrorType, SpiBus},
};
use thiserror::Error as ThisError;

pub mod buffer;
pub mod epd2in66;

mod comms;
mod log;
#[cfg(test)]
mod testing;

pub use comms::BusyPolicy;

/// Errors raised by the driver itself, as opposed to the underlying hardware.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum Error {
    /// The busy pin did not signal ready within the [BusyPolicy::Bounded] timeout.
    #[error("display stayed busy for longer than {timeout_ms}ms")]
    BusyTimeout { timeout_ms: u32 },
}

/// Provides access to the hardware needed to control the EPD.
///
/// The driver frames every byte with the chip select pin itself, so [EpdHw::Spi] is the raw
/// [SpiBus] rather than a `SpiDevice`. Configure the bus with
/// [epd2in66::RECOMMENDED_SPI_HZ] and [epd2in66::RECOMMENDED_SPI_MODE] before handing it over.
///
/// ```rust,ignore
/// use core::convert::Infallible;
///
/// use embassy_rp::gpio::{Input, Output};
/// use embassy_rp::peripherals::SPI0;
/// use embassy_rp::spi::{self, Spi};
/// use embassy_time::Delay;
/// use pdi_itc_async::EpdHw;
/// use thiserror::Error as ThisError;
///
/// /// Define an error type that can convert from the SPI, GPIO and driver errors.
/// #[derive(Debug, ThisError)]
/// enum Error {
///     #[error("SPI error: {0:?}")]
///     Spi(spi::Error),
///     #[error("EPD error: {0}")]
///     Epd(#[from] pdi_itc_async::Error),
/// }
///
/// impl From<Infallible> for Error {
///     fn from(_: Infallible) -> Self {
///         // GPIO errors are infallible, i.e. they can't occur, so this should be unreachable.
///         unreachable!()
///     }
/// }
///
/// impl From<spi::Error> for Error {
///     fn from(e: spi::Error) -> Self {
///         Error::Spi(e)
///     }
/// }
///
/// struct RpEpdHw<'a> {
///     spi: Spi<'a, SPI0, spi::Async>,
///     cs: Output<'a>,
///     dc: Output<'a>,
///     reset: Output<'a>,
///     busy: Input<'a>,
///     delay: Delay,
/// }
///
/// impl<'a> EpdHw for RpEpdHw<'a> {
///     type Spi = Spi<'a, SPI0, spi::Async>;
///     type Cs = Output<'a>;
///     type Dc = Output<'a>;
///     type Reset = Output<'a>;
///     type Busy = Input<'a>;
///     type Delay = Delay;
///     type Error = Error;
///
///     fn spi(&mut self) -> &mut Self::Spi {
///         &mut self.spi
///     }
///
///     fn cs(&mut self) -> &mut Self::Cs {
///         &mut self.cs
///     }
///
///     fn dc(&mut self) -> &mut Self::Dc {
///         &mut self.dc
///     }
///
///     fn reset(&mut self) -> &mut Self::Reset {
///         &mut self.reset
///     }
///
///     fn busy(&mut self) -> &mut Self::Busy {
///         &mut self.busy
///     }
///
///     fn delay(&mut self) -> &mut Self::Delay {
///         &mut self.delay
///     }
/// }
/// ```
pub trait EpdHw {
    type Spi: SpiBus;
    type Cs: OutputPin;
    type Dc: OutputPin;
    type Reset: OutputPin;
    type Busy: InputPin + Wait;
    type Delay: DelayNs;
    type Error: CoreError
        + From<<Self::Spi as SpiErrorType>::Error>
        + From<<Self::Cs as PinErrorType>::Error>
        + From<<Self::Dc as PinErrorType>::Error>
        + From<<Self::Reset as PinErrorType>::Error>
        + From<<Self::Busy as PinErrorType>::Error>
        + From<Error>;

    fn spi(&mut self) -> &mut Self::Spi;
    fn cs(&mut self) -> &mut Self::Cs;
    fn dc(&mut self) -> &mut Self::Dc;
    fn reset(&mut self) -> &mut Self::Reset;
    fn busy(&mut self) -> &mut Self::Busy;
    fn delay(&mut self) -> &mut Self::Delay;

    /// Indicates which state of the busy pin means the controller is ready for the next command.
    ///
    /// The iTC controller drives busy high once it's done. This is user-configurable, rather than
    /// enforced by the display driver, to allow for inverted wiring.
    fn ready_when(&self) -> PinState {
        PinState::High
    }
}
