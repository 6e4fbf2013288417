use embedded_hal::digital::{InputPin as _, OutputPin as _, PinState};
use embedded_hal_async::{delay::DelayNs as _, digital::Wait as _, spi::SpiBus as _};

use crate::{log::trace, EpdHw, Error};

/// Controls how long to wait for the display to finish an operation.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyPolicy {
    /// Wait on the busy pin for as long as it takes. This is what the datasheet expects, but it
    /// will hang forever if the display never becomes ready (e.g. it's disconnected).
    #[default]
    Unbounded,
    /// Poll the busy pin every `poll_interval_ms`, failing with [Error::BusyTimeout] if the
    /// display is still busy after `timeout_ms`.
    Bounded { timeout_ms: u32, poll_interval_ms: u32 },
}

/// Provides "wait" support for hardware with a busy state.
pub(crate) trait BusyWait: EpdHw {
    /// Waits until the display reports that it is ready, according to the given policy.
    async fn wait_until_ready(&mut self, policy: BusyPolicy) -> Result<(), Self::Error>;
}

/// Provides byte-framed <command> then <data> style communications.
///
/// Every byte is sent in its own chip select frame, as the controller expects.
pub(crate) trait CommandDataSend: EpdHw {
    /// Writes a single data byte.
    async fn write_raw(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Writes a single command byte, leaving the Data/Command pin in data mode afterwards.
    async fn write_command(&mut self, command: u8) -> Result<(), Self::Error>;

    /// Writes a command followed by its data bytes, in order.
    async fn send(&mut self, command: u8, data: &[u8]) -> Result<(), Self::Error>;
}

fn is_ready<HW: EpdHw>(hw: &mut HW) -> Result<bool, HW::Error> {
    let ready_when = hw.ready_when();
    let busy = hw.busy();
    let ready = match ready_when {
        PinState::High => busy.is_high()?,
        PinState::Low => busy.is_low()?,
    };
    Ok(ready)
}

impl<HW: EpdHw> BusyWait for HW {
    async fn wait_until_ready(&mut self, policy: BusyPolicy) -> Result<(), HW::Error> {
        match policy {
            BusyPolicy::Unbounded => {
                if !is_ready(self)? {
                    trace!("Waiting for busy EPD");
                    match self.ready_when() {
                        PinState::High => self.busy().wait_for_high().await?,
                        PinState::Low => self.busy().wait_for_low().await?,
                    }
                }
            }
            BusyPolicy::Bounded {
                timeout_ms,
                poll_interval_ms,
            } => {
                let poll_interval_ms = poll_interval_ms.max(1);
                let mut waited_ms: u32 = 0;
                while !is_ready(self)? {
                    if waited_ms >= timeout_ms {
                        return Err(Error::BusyTimeout { timeout_ms }.into());
                    }
                    trace!("Waiting for busy EPD ({}ms so far)", waited_ms);
                    self.delay().delay_ms(poll_interval_ms).await;
                    waited_ms = waited_ms.saturating_add(poll_interval_ms);
                }
            }
        }
        Ok(())
    }
}

impl<HW: EpdHw> CommandDataSend for HW {
    async fn write_raw(&mut self, byte: u8) -> Result<(), HW::Error> {
        self.cs().set_low()?;
        self.spi().write(&[byte]).await?;
        // The transfer must finish before the frame is closed.
        self.spi().flush().await?;
        self.cs().set_high()?;
        Ok(())
    }

    async fn write_command(&mut self, command: u8) -> Result<(), HW::Error> {
        trace!("Sending EPD command: {:?}", command);
        self.dc().set_low()?;
        self.write_raw(command).await?;
        self.dc().set_high()?;
        Ok(())
    }

    async fn send(&mut self, command: u8, data: &[u8]) -> Result<(), HW::Error> {
        self.write_command(command).await?;
        for byte in data {
            self.write_raw(*byte).await?;
        }
        Ok(())
    }
}
