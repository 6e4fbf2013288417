use core::convert::Infallible;

use embedded_graphics::{
    pixelcolor::{raw::RawU2, PixelColor},
    prelude::{Dimensions, DrawTarget, Point, Size},
    primitives::{PointsIter, Rectangle},
    Pixel,
};

use crate::log::{debug_assert_eq, trace};

/// A pixel colour on a black/white/red panel.
///
/// The values are load-bearing: bit 0 selects the black plane and bit 1 selects the red plane.
/// White sets neither, which is what both planes read as when cleared.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    White = 0b00,
    Black = 0b01,
    Red = 0b10,
}

impl Color {
    /// The raw two-bit encoding of this colour.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// The bit to store in the black plane (0 or 1).
    pub const fn black_bit(self) -> u8 {
        self.bits() & 0b01
    }

    /// The bit to store in the red plane (0 or 1).
    pub const fn red_bit(self) -> u8 {
        (self.bits() & 0b10) >> 1
    }

    /// Decodes a pixel from its two plane bits. Red wins if both are set.
    pub const fn from_plane_bits(black: bool, red: bool) -> Self {
        match (black, red) {
            (_, true) => Color::Red,
            (true, false) => Color::Black,
            (false, false) => Color::White,
        }
    }
}

impl PixelColor for Color {
    type Raw = RawU2;
}

/// Computes the length of each plane of a [TriColorBuffer] with the given dimensions.
pub const fn plane_length(size: Size) -> usize {
    (size.width as usize / 8) * size.height as usize
}

/// A frame buffer made of two bit-planes, one for black pixels and one for red pixels.
///
/// Each byte holds 8 horizontally adjacent pixels, with the leftmost pixel in the least significant
/// bit. A given pixel lives at the same byte and bit in both planes.
pub struct TriColorBuffer<const L: usize> {
    size: Size,
    bytes_per_row: usize,
    black: [u8; L],
    red: [u8; L],
}

impl<const L: usize> TriColorBuffer<L> {
    /// Creates a new [TriColorBuffer] with all pixels set to [Color::White].
    ///
    /// The dimensions must match the plane length `L`, and the width must be a multiple of 8.
    ///
    /// ```
    /// use embedded_graphics::prelude::Size;
    /// use pdi_itc_async::buffer::{plane_length, TriColorBuffer};
    ///
    /// const DIMENSIONS: Size = Size::new(16, 8);
    /// let buffer = TriColorBuffer::<{ plane_length(DIMENSIONS) }>::new(DIMENSIONS);
    /// assert_eq!(buffer.black_plane().len(), 16);
    /// ```
    pub fn new(dimensions: Size) -> Self {
        debug_assert_eq!(
            dimensions.width % 8,
            0,
            "Width must be a multiple of 8 for binary packing."
        );
        debug_assert_eq!(
            plane_length(dimensions),
            L,
            "Plane length must match given dimensions"
        );
        Self {
            bytes_per_row: dimensions.width as usize / 8,
            size: dimensions,
            black: [0; L],
            red: [0; L],
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// The packed black plane.
    pub fn black_plane(&self) -> &[u8] {
        &self.black
    }

    /// The packed red plane.
    pub fn red_plane(&self) -> &[u8] {
        &self.red
    }

    /// Returns the index of the byte holding `(x, y)` in either plane, or `None` if it's outside
    /// the buffer.
    pub fn byte_index(&self, x: u16, y: u16) -> Option<usize> {
        if u32::from(x) >= self.size.width || u32::from(y) >= self.size.height {
            return None;
        }
        Some(usize::from(x) / 8 + usize::from(y) * self.bytes_per_row)
    }

    /// Sets a single pixel. Pixels outside the buffer are ignored.
    pub fn set_pixel(&mut self, x: u16, y: u16, color: Color) {
        let Some(index) = self.byte_index(x, y) else {
            trace!("Ignoring out-of-bounds pixel ({}, {})", x, y);
            return;
        };
        let shift = x % 8;

        self.black[index] &= !(1u8 << shift);
        self.black[index] |= color.black_bit() << shift;

        self.red[index] &= !(1u8 << shift);
        self.red[index] |= color.red_bit() << shift;
    }

    /// Sets the pixel at linear position `index`, counting left to right then top to bottom.
    /// Indices past the last pixel are ignored.
    pub fn set_pixel_at(&mut self, index: usize, color: Color) {
        let width = self.size.width as usize;
        let (x, y) = (index % width, index / width);
        match (u16::try_from(x), u16::try_from(y)) {
            (Ok(x), Ok(y)) => self.set_pixel(x, y, color),
            _ => {
                trace!("Ignoring out-of-bounds pixel index {}", index);
            }
        }
    }

    /// Reads back a single pixel, or `None` if it's outside the buffer.
    pub fn pixel(&self, x: u16, y: u16) -> Option<Color> {
        let index = self.byte_index(x, y)?;
        let mask = 1u8 << (x % 8);
        Some(Color::from_plane_bits(
            self.black[index] & mask != 0,
            self.red[index] & mask != 0,
        ))
    }

    /// Sets every pixel to `color`.
    ///
    /// Each plane byte is written as `0xFF` or `0x00`, so all eight pixels in it take the colour,
    /// rather than only the lowest bit being set.
    pub fn fill(&mut self, color: Color) {
        self.black.fill(broadcast(color.black_bit()));
        self.red.fill(broadcast(color.red_bit()));
    }
}

/// Repeats a single bit across a whole byte.
const fn broadcast(bit: u8) -> u8 {
    if bit == 0 {
        0x00
    } else {
        0xFF
    }
}

impl<const L: usize> Dimensions for TriColorBuffer<L> {
    fn bounding_box(&self) -> Rectangle {
        Rectangle::new(Point::zero(), self.size)
    }
}

impl<const L: usize> DrawTarget for TriColorBuffer<L> {
    type Color = Color;

    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels.into_iter() {
            // Negative or oversized coordinates can't be represented, so they're out of bounds.
            if let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) {
                self.set_pixel(x, y, color);
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let bounds = self.bounding_box();
        let drawable_area = bounds.intersection(area);
        if drawable_area == bounds {
            self.fill(color);
            return Ok(());
        }
        self.draw_iter(
            drawable_area
                .points()
                .map(|point| Pixel(point, color)),
        )
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}
