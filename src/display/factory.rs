/*
 *  display/factory.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display driver factory - builds the configured panel driver
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

use crate::config::{DisplayConfig, DriverKind};
use crate::display::drivers::mock::MockDriver;
use crate::display::error::DisplayFactoryError;
use crate::display::traits::DisplayDriver;
use log::info;

#[cfg(feature = "driver-ssd1306")]
use crate::config::BusConfig;
#[cfg(feature = "driver-ssd1306")]
use crate::display::drivers::ssd1306::Ssd1306Driver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Create a display driver from configuration
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let config = DisplayConfig {
    ///     driver: Some(DriverKind::Ssd1306),
    ///     bus: Some(BusConfig::I2c {
    ///         bus: "/dev/i2c-1".to_string(),
    ///         address: 0x3C,
    ///         speed_hz: None,
    ///     }),
    ///     ..Default::default()
    /// };
    ///
    /// let driver = DisplayDriverFactory::create_from_config(&config)?;
    /// ```
    pub fn create_from_config(
        config: &DisplayConfig
    ) -> Result<BoxedDriver, DisplayFactoryError> {
        let driver_kind = config.driver.as_ref()
            .ok_or(DisplayFactoryError::NoDriverSpecified)?;

        match driver_kind {
            DriverKind::Mock => {
                info!("Using in-memory display");
                let mut driver = MockDriver::new(config)?;
                driver.init()?;
                Ok(Box::new(driver))
            }

            #[cfg(feature = "driver-ssd1306")]
            DriverKind::Ssd1306 => {
                let bus_config = config.bus.as_ref()
                    .ok_or(DisplayFactoryError::NoBusConfiguration)?;
                match bus_config {
                    BusConfig::I2c { bus, address, .. } => {
                        Ok(Box::new(Ssd1306Driver::new_i2c(bus, *address, config)?))
                    }
                }
            }

            #[cfg(not(feature = "driver-ssd1306"))]
            DriverKind::Ssd1306 => Err(DisplayFactoryError::ConfigError(
                "SSD1306 driver not enabled. Enable with --features driver-ssd1306".to_string()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_driver_specified() {
        let config = DisplayConfig::default();
        assert!(matches!(
            DisplayDriverFactory::create_from_config(&config),
            Err(DisplayFactoryError::NoDriverSpecified)
        ));
    }

    #[test]
    fn test_mock_driver_from_config() {
        let config = DisplayConfig {
            driver: Some(DriverKind::Mock),
            ..Default::default()
        };
        let driver = DisplayDriverFactory::create_from_config(&config).unwrap();
        assert_eq!(driver.dimensions(), (128, 64));
    }

    #[cfg(not(feature = "driver-ssd1306"))]
    #[test]
    fn test_ssd1306_requires_feature() {
        let config = DisplayConfig {
            driver: Some(DriverKind::Ssd1306),
            ..Default::default()
        };
        assert!(matches!(
            DisplayDriverFactory::create_from_config(&config),
            Err(DisplayFactoryError::ConfigError(_))
        ));
    }
}
