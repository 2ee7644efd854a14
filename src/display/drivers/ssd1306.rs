/*
 *  display/drivers/ssd1306.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1306 OLED display driver implementation
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

use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::{BasicMode, DisplayConfig as _},
    prelude::*,
    size::DisplaySize128x64,
    I2CDisplayInterface,
    Ssd1306,
};

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

use log::info;

type Panel = Ssd1306<I2CInterface<I2cdev>, DisplaySize128x64, BasicMode>;

/// SSD1306 display driver wrapper
///
/// Runs the controller in basic mode: the pipeline keeps its own page-packed
/// buffers, so frames are pushed to the panel as-is instead of being redrawn
/// pixel by pixel into the crate's buffered mode.
pub struct Ssd1306Driver {
    /// The underlying ssd1306 driver
    display: Panel,

    /// Display capabilities
    capabilities: DisplayCapabilities,

    /// Bus address, for error context
    address: u8,
}

impl Ssd1306Driver {
    /// Create a new SSD1306 driver using I2C
    ///
    /// # Arguments
    ///
    /// * `i2c_bus_path` - Path to I2C device (e.g., "/dev/i2c-1")
    /// * `address` - I2C address (typically 0x3C or 0x3D)
    /// * `config` - Display configuration
    pub fn new_i2c(
        i2c_bus_path: &str,
        address: u8,
        config: &DisplayConfig,
    ) -> Result<Self, DisplayError> {
        info!("Initializing SSD1306 on {} at address 0x{:02X}", i2c_bus_path, address);

        let width = config.width.unwrap_or(128);
        let height = config.height.unwrap_or(64);
        if (width, height) != (128, 64) {
            return Err(DisplayError::InvalidConfiguration(
                format!("Unsupported SSD1306 size: {}x{}", width, height)
            ));
        }

        let i2c = I2cdev::new(i2c_bus_path)
            .map_err(|e| DisplayError::BusOpen { bus: i2c_bus_path.to_string(), reason: e.to_string() })?;

        let rotation = match config.rotate_deg.unwrap_or(0) {
            0 => DisplayRotation::Rotate0,
            180 => DisplayRotation::Rotate180,
            other => return Err(DisplayError::InvalidConfiguration(
                format!("Unsupported SSD1306 rotation: {}", other)
            )),
        };

        let interface = I2CDisplayInterface::new_custom_address(i2c, address);
        let display = Ssd1306::new(interface, DisplaySize128x64, rotation);

        let mut driver = Self {
            display,
            capabilities: DisplayCapabilities {
                width: 128,
                height: 64,
                max_fps: 30, // I2C is slower
                supports_brightness: true,
            },
            address,
        };

        driver.init()?;

        if let Some(brightness) = config.brightness {
            driver.set_brightness(brightness)?;
        }

        info!("SSD1306 initialized successfully ({}x{})", width, height);

        Ok(driver)
    }
}

impl DisplayDriver for Ssd1306Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let address = self.address;
        self.display.init()
            .map_err(|e| DisplayError::PanelInit { address, reason: format!("{:?}", e) })
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        let brightness = match value {
            0..=63 => Brightness::DIMMEST,
            64..=127 => Brightness::DIM,
            128..=191 => Brightness::NORMAL,
            _ => Brightness::BRIGHTEST,
        };
        self.display.set_brightness(brightness)?;
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected_size = self.capabilities.frame_len();

        if buffer.len() != expected_size {
            return Err(DisplayError::BufferSizeMismatch {
                expected: expected_size,
                actual: buffer.len(),
            });
        }

        // buffer is already in controller page order
        self.display.set_draw_area((0, 0), (128, 64))?;
        self.display.draw(buffer)?;
        Ok(())
    }
}
