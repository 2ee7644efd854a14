/*
 *  display/traits.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display bus abstraction - the presenter only ever transmits whole frames
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

use crate::display::error::DisplayError;

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Maximum recommended frame rate
    pub max_fps: u32,

    /// Whether the display supports brightness control
    pub supports_brightness: bool,
}

impl DisplayCapabilities {
    /// Size in bytes of one full page-packed 1 bpp frame
    pub fn frame_len(&self) -> usize {
        (self.width * self.height / 8) as usize
    }
}

/// Minimal hardware abstraction - all display drivers must implement this trait
///
/// The pipeline never draws through the driver. It renders into its own
/// page-packed frame buffers and hands complete frames to `write_buffer`.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Set display brightness (0-255)
    ///
    /// Returns an error if the display doesn't support brightness control.
    fn set_brightness(&mut self, _value: u8) -> Result<(), DisplayError> {
        Err(DisplayError::UnsupportedOperation)
    }

    /// Transmit a full frame
    ///
    /// `buffer` is in SSD1306 page order: byte `page * width + x`, bit `y % 8`.
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError>;

    /// The pipeline has gone idle and no frames are streaming
    fn on_idle(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }

    /// Clear the display to blank/off state
    fn clear(&mut self) -> Result<(), DisplayError> {
        let blank = vec![0u8; self.capabilities().frame_len()];
        self.write_buffer(&blank)
    }
}
