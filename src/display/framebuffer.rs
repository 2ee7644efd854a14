/*
 *  display/framebuffer.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Page-packed monochrome frame buffer in the panel's native layout
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// A runtime-sized 1 bpp framebuffer for embedded-graphics.
///
/// Bytes are laid out the way SSD1306-class controllers expect them:
/// eight vertical pixels per byte, `page * width + x`, LSB at the top.
/// The slice returned by [`as_bytes`](Self::as_bytes) can go straight
/// onto the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedFrameBuffer {
    buf: Vec<u8>,
    w: usize,
    h: usize,
}

impl PagedFrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![0; w * h.div_ceil(8)], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Raw page bytes, ready for transmission
    pub fn as_bytes(&self) -> &[u8] { &self.buf }

    /// Blank every pixel
    pub fn clear_all(&mut self) {
        self.buf.fill(0);
    }

    /// Overwrite this buffer with the contents of `other`
    pub fn copy_from(&mut self, other: &PagedFrameBuffer) {
        self.buf.clone_from(&other.buf);
        self.w = other.w;
        self.h = other.h;
    }

    /// Read back one pixel; out of range reads as off
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        match self.locate(x, y) {
            Some((i, mask)) => self.buf[i] & mask != 0,
            None => false,
        }
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, on: bool) {
        if let Some((i, mask)) = self.locate(x, y) {
            if on {
                self.buf[i] |= mask;
            } else {
                self.buf[i] &= !mask;
            }
        }
    }

    /// Number of lit pixels
    pub fn count_on(&self) -> usize {
        self.buf.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// Map (x,y) to (byte index, bit mask); None if out of bounds
    #[inline]
    fn locate(&self, x: usize, y: usize) -> Option<(usize, u8)> {
        if x < self.w && y < self.h {
            Some(((y / 8) * self.w + x, 1 << (y % 8)))
        } else {
            None
        }
    }
}

impl OriginDimensions for PagedFrameBuffer {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for PagedFrameBuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if p.x >= 0 && p.y >= 0 {
                self.set_pixel(p.x as usize, p.y as usize, c.is_on());
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        // fast path for the bar rectangles
        let area = area.intersection(&self.bounding_box());
        let Some(bottom_right) = area.bottom_right() else { return Ok(()) };
        let (x0, y0) = (area.top_left.x as usize, area.top_left.y as usize);
        let (x1, y1) = (bottom_right.x as usize, bottom_right.y as usize);
        for y in y0..=y1 {
            let row = (y / 8) * self.w;
            let mask = 1u8 << (y % 8);
            for byte in &mut self.buf[row + x0..=row + x1] {
                if color.is_on() { *byte |= mask } else { *byte &= !mask }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.buf.fill(if color.is_on() { 0xFF } else { 0x00 });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{Line, PrimitiveStyle};

    #[test]
    fn test_page_layout() {
        let mut fb = PagedFrameBuffer::new(128, 64);
        assert_eq!(fb.as_bytes().len(), 1024);

        fb.set_pixel(3, 0, true);
        fb.set_pixel(3, 9, true);
        fb.set_pixel(127, 63, true);

        assert_eq!(fb.as_bytes()[3], 0b0000_0001);
        assert_eq!(fb.as_bytes()[128 + 3], 0b0000_0010);
        assert_eq!(fb.as_bytes()[7 * 128 + 127], 0b1000_0000);
        assert_eq!(fb.count_on(), 3);
    }

    #[test]
    fn test_fill_solid_matches_pixels() {
        let mut fast = PagedFrameBuffer::new(128, 64);
        Rectangle::new(Point::new(6, 40), Size::new(5, 24))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(&mut fast)
            .unwrap();

        let mut slow = PagedFrameBuffer::new(128, 64);
        for y in 40..64 {
            for x in 6..11 {
                slow.set_pixel(x, y, true);
            }
        }
        assert_eq!(fast, slow);
        assert_eq!(fast.count_on(), 5 * 24);
    }

    #[test]
    fn test_fill_solid_clips() {
        let mut fb = PagedFrameBuffer::new(16, 8);
        fb.fill_solid(&Rectangle::new(Point::new(-4, -4), Size::new(8, 8)), BinaryColor::On)
            .unwrap();
        assert_eq!(fb.count_on(), 16);
        fb.fill_solid(&Rectangle::new(Point::new(100, 100), Size::new(8, 8)), BinaryColor::On)
            .unwrap();
        assert_eq!(fb.count_on(), 16);
    }

    #[test]
    fn test_copy_is_detached() {
        let mut live = PagedFrameBuffer::new(128, 64);
        Line::new(Point::new(0, 0), Point::new(10, 10))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut live)
            .unwrap();

        let mut shadow = PagedFrameBuffer::new(128, 64);
        shadow.copy_from(&live);
        assert_eq!(shadow, live);

        live.clear_all();
        assert_eq!(live.count_on(), 0);
        assert_eq!(shadow.count_on(), 11);
        assert!(shadow.pixel(0, 0));
    }
}
