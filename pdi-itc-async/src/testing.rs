//! A recording [EpdHw] implementation for host tests.
//!
//! Every pin change, SPI byte and delay is appended to a shared [Timeline], so tests can assert on
//! the exact sequence the controller would see.

use std::{cell::RefCell, collections::VecDeque, convert::Infallible, rc::Rc, vec::Vec};

use embedded_hal::digital::{ErrorType as PinErrorType, InputPin, OutputPin, PinState};
use embedded_hal_async::{
    delay::DelayNs,
    digital::Wait,
    spi::{ErrorType as SpiErrorType, SpiBus},
};
use thiserror::Error as ThisError;

use crate::{EpdHw, Error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    Cs(bool),
    Dc(bool),
    Reset(bool),
    Write(u8),
    Flush,
    DelayMs(u32),
    DelayNs(u32),
    BusyRead,
    /// Waited for the busy pin to reach the given level.
    BusyWait(bool),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Timeline(Rc<RefCell<Vec<Event>>>);

impl Timeline {
    fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// The bytes written over SPI, in order.
    pub(crate) fn written(&self) -> Vec<u8> {
        self.0
            .borrow()
            .iter()
            .filter_map(|event| match event {
                Event::Write(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }

    /// The command bytes, i.e. bytes written while Data/Command was low.
    pub(crate) fn commands(&self) -> Vec<u8> {
        let mut dc_high = true;
        let mut commands = Vec::new();
        for event in self.0.borrow().iter() {
            match event {
                Event::Dc(level) => dc_high = *level,
                Event::Write(byte) if !dc_high => commands.push(*byte),
                _ => {}
            }
        }
        commands
    }

    /// Every event except SPI framing, which is mostly noise when checking ordering.
    pub(crate) fn without_framing(&self) -> Vec<Event> {
        self.0
            .borrow()
            .iter()
            .copied()
            .filter(|event| !matches!(event, Event::Cs(_) | Event::Dc(_) | Event::Flush))
            .collect()
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub(crate) enum FakeError {
    #[error(transparent)]
    Epd(#[from] Error),
}

impl From<Infallible> for FakeError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}

#[derive(Debug, Clone, Copy)]
enum Line {
    Cs,
    Dc,
    Reset,
}

pub(crate) struct FakeOutput {
    line: Line,
    timeline: Timeline,
}

impl FakeOutput {
    fn record(&self, level: bool) {
        let event = match self.line {
            Line::Cs => Event::Cs(level),
            Line::Dc => Event::Dc(level),
            Line::Reset => Event::Reset(level),
        };
        self.timeline.push(event);
    }
}

impl PinErrorType for FakeOutput {
    type Error = Infallible;
}

impl OutputPin for FakeOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.record(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.record(true);
        Ok(())
    }
}

/// A busy pin that reads the queued levels in order, then reads high (ready) forever.
pub(crate) struct FakeBusy {
    levels: VecDeque<bool>,
    timeline: Timeline,
}

impl FakeBusy {
    pub(crate) fn push_levels(&mut self, levels: &[bool]) {
        self.levels.extend(levels.iter().copied());
    }

    fn read(&mut self) -> bool {
        self.timeline.push(Event::BusyRead);
        self.levels.pop_front().unwrap_or(true)
    }

    fn wait_for(&mut self, level: bool) {
        self.timeline.push(Event::BusyWait(level));
        self.levels.clear();
    }
}

impl PinErrorType for FakeBusy {
    type Error = Infallible;
}

impl InputPin for FakeBusy {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.read())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.read())
    }
}

impl Wait for FakeBusy {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        self.wait_for(true);
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        self.wait_for(false);
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for(true);
        Ok(())
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        self.wait_for(false);
        Ok(())
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        let level = !self.levels.front().copied().unwrap_or(true);
        self.wait_for(level);
        Ok(())
    }
}

pub(crate) struct FakeSpi {
    timeline: Timeline,
}

impl SpiErrorType for FakeSpi {
    type Error = Infallible;
}

impl SpiBus for FakeSpi {
    async fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        words.fill(0);
        Ok(())
    }

    async fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        for word in words {
            self.timeline.push(Event::Write(*word));
        }
        Ok(())
    }

    async fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write).await?;
        read.fill(0);
        Ok(())
    }

    async fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.write(words).await?;
        words.fill(0);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.timeline.push(Event::Flush);
        Ok(())
    }
}

pub(crate) struct FakeDelay {
    timeline: Timeline,
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.timeline.push(Event::DelayNs(ns));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.timeline.push(Event::DelayMs(ms));
    }
}

pub(crate) struct FakeHw {
    pub(crate) spi: FakeSpi,
    pub(crate) cs: FakeOutput,
    pub(crate) dc: FakeOutput,
    pub(crate) reset: FakeOutput,
    pub(crate) busy: FakeBusy,
    pub(crate) delay: FakeDelay,
    pub(crate) ready_when: PinState,
}

impl FakeHw {
    pub(crate) fn new() -> (Self, Timeline) {
        let timeline = Timeline::default();
        let output = |line| FakeOutput {
            line,
            timeline: timeline.clone(),
        };
        let hw = FakeHw {
            spi: FakeSpi {
                timeline: timeline.clone(),
            },
            cs: output(Line::Cs),
            dc: output(Line::Dc),
            reset: output(Line::Reset),
            busy: FakeBusy {
                levels: VecDeque::new(),
                timeline: timeline.clone(),
            },
            delay: FakeDelay {
                timeline: timeline.clone(),
            },
            ready_when: PinState::High,
        };
        (hw, timeline)
    }
}

impl EpdHw for FakeHw {
    type Spi = FakeSpi;
    type Cs = FakeOutput;
    type Dc = FakeOutput;
    type Reset = FakeOutput;
    type Busy = FakeBusy;
    type Delay = FakeDelay;
    type Error = FakeError;

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

    fn ready_when(&self) -> PinState {
        self.ready_when
    }
}
