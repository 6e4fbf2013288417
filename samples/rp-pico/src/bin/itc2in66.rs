//! Draws a test pattern on the iTC 2.66" black/white/red display using a Raspberry Pi Pico board.

#![no_std]
#![no_main]

use core::convert::Infallible;

use defmt::{expect, info};
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals;
use embassy_rp::spi::{self, Spi};
use embassy_time::{Delay, Timer};
use embedded_graphics::{
    prelude::{Point, Primitive, Size},
    primitives::{Circle, PrimitiveStyle, Rectangle},
    Drawable,
};
use pdi_itc_async::{
    buffer::Color,
    epd2in66::{self, Epd2in66},
    BusyPolicy, EpdHw,
};
use thiserror::Error as ThisError;
use {defmt_rtt as _, panic_probe as _};

assign_resources::assign_resources! {
    spi_hw: SpiP {
        spi: SPI0,
        clk: PIN_2,
        tx: PIN_3,
        rx: PIN_4,
        dma_tx: DMA_CH0,
        dma_rx: DMA_CH1,
    },
    epd_hw: DisplayP {
        cs: PIN_5,
        dc: PIN_6,
        reset: PIN_7,
        busy: PIN_8,
    },
}

/// Room temperature, in degrees Celsius.
const TEMPERATURE: u8 = 22;

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let resources = split_resources!(p);
    let mut config = spi::Config::default();
    config.frequency = epd2in66::RECOMMENDED_SPI_HZ;
    // SPI mode 0.
    config.phase = spi::Phase::CaptureOnFirstTransition;
    config.polarity = spi::Polarity::IdleLow;

    let spi = Spi::new(
        resources.spi_hw.spi,
        resources.spi_hw.clk,
        resources.spi_hw.tx,
        resources.spi_hw.rx,
        resources.spi_hw.dma_tx,
        resources.spi_hw.dma_rx,
        config,
    );
    let mut epd = Epd2in66::new(DisplayHw::new(spi, resources.epd_hw)).with_busy_policy(
        BusyPolicy::Bounded {
            timeout_ms: 30_000,
            poll_interval_ms: 10,
        },
    );

    info!("Initializing EPD");
    expect!(epd.init().await, "Failed to initialize EPD");
    expect!(
        epd.set_temperature(TEMPERATURE).await,
        "Failed to set EPD temperature"
    );

    info!("Drawing test pattern");
    epd.fill_buffer(Color::White);
    let buffer = epd.buffer_mut();
    Rectangle::new(Point::new(8, 8), Size::new(280, 136))
        .into_styled(PrimitiveStyle::with_stroke(Color::Black, 4))
        .draw(buffer)
        .unwrap();
    Circle::new(Point::new(98, 26), 100)
        .into_styled(PrimitiveStyle::with_fill(Color::Red))
        .draw(buffer)
        .unwrap();
    for x in 0..epd.width() as u16 {
        epd.set_pixel(x, 0, Color::Red);
    }

    info!("Displaying buffer");
    expect!(epd.display_buffer().await, "Failed to display buffer");
    Timer::after_secs(5).await;

    info!("Clearing EPD");
    expect!(epd.init().await, "Failed to re-initialize EPD");
    expect!(epd.clear().await, "Failed to clear EPD");
    info!("Done");
}

struct DisplayHw<'a> {
    spi: Spi<'a, peripherals::SPI0, spi::Async>,
    cs: Output<'a>,
    dc: Output<'a>,
    reset: Output<'a>,
    busy: Input<'a>,
    delay: Delay,
}

impl<'a> DisplayHw<'a> {
    fn new(spi: Spi<'a, peripherals::SPI0, spi::Async>, p: DisplayP) -> Self {
        let cs = Output::new(p.cs, Level::High);
        let dc = Output::new(p.dc, Level::High);
        let reset = Output::new(p.reset, Level::High);
        let busy = Input::new(p.busy, Pull::Down);

        Self {
            spi,
            cs,
            dc,
            reset,
            busy,
            delay: Delay,
        }
    }
}

impl<'a> EpdHw for DisplayHw<'a> {
    type Spi = Spi<'a, peripherals::SPI0, spi::Async>;

    type Cs = Output<'a>;

    type Dc = Output<'a>;

    type Reset = Output<'a>;

    type Busy = Input<'a>;

    type Delay = embassy_time::Delay;

    type Error = Error;

    fn spi(&mut self) -> &mut Self::Spi {
        &mut self.spi
    }

    fn cs(&mut self) -> &mut Self::Cs {
        &mut self.cs
    }

    fn dc(&mut self) -> &mut Self::Dc {
        &mut self.dc
    }

    fn reset(&mut self) -> &mut Self::Reset {
        &mut self.reset
    }

    fn busy(&mut self) -> &mut Self::Busy {
        &mut self.busy
    }

    fn delay(&mut self) -> &mut Self::Delay {
        &mut self.delay
    }
}

#[derive(Debug, ThisError, defmt::Format)]
enum Error {
    #[error("Spi error: {0:?}")]
    SpiError(spi::Error),
    #[error("EPD error: {0}")]
    EpdError(pdi_itc_async::Error),
}

impl From<Infallible> for Error {
    fn from(_: Infallible) -> Self {
        unreachable!()
    }
}

impl From<spi::Error> for Error {
    fn from(e: spi::Error) -> Self {
        Error::SpiError(e)
    }
}

impl From<pdi_itc_async::Error> for Error {
    fn from(e: pdi_itc_async::Error) -> Self {
        Error::EpdError(e)
    }
}
