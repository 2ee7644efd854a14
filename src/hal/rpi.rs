/*
 *  hal/rpi.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raspberry Pi peripherals - MCP3208 ADC, hardware PWM, GPIO LEDs/buttons
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

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};
use rppal::pwm::{Channel, Polarity, Pwm};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::config::PinConfig;
use crate::control::{ButtonDebouncer, Operation};
use crate::hal::{DutyOutput, HalError, Indicator, SampleSource};

const ADC_CLOCK_HZ: u32 = 1_000_000;

/// MCP3208 12-bit SPI ADC, single-ended
pub struct Mcp3208 {
    spi: Spi,
    channel: u8,
}

impl Mcp3208 {
    pub fn new(pins: &PinConfig) -> Result<Self, HalError> {
        let bus = match pins.adc_spi_bus() {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            other => return Err(HalError::Sensor(format!("no SPI bus {}", other))),
        };
        let slave = match pins.adc_slave_select() {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => return Err(HalError::Sensor(format!("no slave select {}", other))),
        };
        let spi = Spi::new(bus, slave, ADC_CLOCK_HZ, Mode::Mode0)
            .map_err(|e| HalError::Sensor(format!("SPI open: {}", e)))?;
        info!("MCP3208 on {:?}/{:?} channel {}", bus, slave, pins.adc_channel());
        Ok(Self { spi, channel: pins.adc_channel() & 0x07 })
    }

    /// start bit, single-ended, channel; result lands in the low 12 bits
    fn command(channel: u8) -> [u8; 3] {
        [0x06 | (channel >> 2), (channel & 0x03) << 6, 0x00]
    }

    fn decode(rx: &[u8; 3]) -> u16 {
        (((rx[1] & 0x0F) as u16) << 8) | rx[2] as u16
    }
}

impl SampleSource for Mcp3208 {
    fn read_sample(&mut self) -> Result<u16, HalError> {
        let tx = Self::command(self.channel);
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| HalError::Sensor(format!("SPI transfer: {}", e)))?;
        Ok(Self::decode(&rx))
    }
}

/// Hardware PWM channel driving the speaker filter
pub struct PwmActuator {
    pwm: Pwm,
}

impl PwmActuator {
    pub fn new(pins: &PinConfig) -> Result<Self, HalError> {
        let channel = match pins.pwm_channel() {
            0 => Channel::Pwm0,
            _ => Channel::Pwm1,
        };
        let pwm = Pwm::with_frequency(channel, pins.pwm_frequency_hz(), 0.0, Polarity::Normal, true)
            .map_err(|e| HalError::Actuator(format!("PWM open: {}", e)))?;
        info!("PWM {:?} at {} Hz", channel, pins.pwm_frequency_hz());
        Ok(Self { pwm })
    }
}

impl DutyOutput for PwmActuator {
    fn set_duty_level(&mut self, duty: u8) -> Result<(), HalError> {
        self.pwm
            .set_duty_cycle(duty as f64 / u8::MAX as f64)
            .map_err(|e| HalError::Actuator(format!("PWM duty: {}", e)))
    }
}

/// GPIO output LED
pub struct GpioLed {
    pin: OutputPin,
}

impl Indicator for GpioLed {
    fn set(&mut self, on: bool) -> Result<(), HalError> {
        if on { self.pin.set_high() } else { self.pin.set_low() }
        Ok(())
    }
}

fn open_gpio() -> Result<Gpio, HalError> {
    Gpio::new().map_err(|e| HalError::Input(format!("GPIO open: {}", e)))
}

impl GpioLed {
    pub fn new(bcm: u8) -> Result<Self, HalError> {
        let pin = open_gpio()?
            .get(bcm)
            .map_err(|e| HalError::Indicator(format!("GPIO {}: {}", bcm, e)))?
            .into_output_low();
        Ok(Self { pin })
    }
}

/// Both buttons, pulled up, falling edge routed into the debouncer.
/// Interrupts stay armed while this lives.
pub struct Buttons {
    _pins: Vec<InputPin>,
}

impl Buttons {
    pub fn arm(pins: &PinConfig, debouncer: Arc<ButtonDebouncer>) -> Result<Self, HalError> {
        let gpio = open_gpio()?;
        let wiring = [
            (pins.record_button(), Operation::Record),
            (pins.play_button(), Operation::Play),
        ];
        let mut armed = Vec::with_capacity(wiring.len());
        for (bcm, source) in wiring {
            let mut pin = gpio
                .get(bcm)
                .map_err(|e| HalError::Input(format!("GPIO {}: {}", bcm, e)))?
                .into_input_pullup();
            let debouncer = Arc::clone(&debouncer);
            pin.set_async_interrupt(Trigger::FallingEdge, move |_level| {
                if !debouncer.on_edge(source, Instant::now()) {
                    debug!("GPIO {} edge debounced", bcm);
                }
            })
            .map_err(|e| HalError::Input(format!("GPIO {} interrupt: {}", bcm, e)))?;
            armed.push(pin);
        }
        info!("buttons armed: record GPIO {}, play GPIO {}", pins.record_button(), pins.play_button());
        Ok(Self { _pins: armed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcp3208_command_bytes() {
        assert_eq!(Mcp3208::command(0), [0x06, 0x00, 0x00]);
        assert_eq!(Mcp3208::command(5), [0x07, 0x40, 0x00]);
        assert_eq!(Mcp3208::command(7), [0x07, 0xC0, 0x00]);
    }

    #[test]
    fn test_mcp3208_decode_masks_high_nibble() {
        assert_eq!(Mcp3208::decode(&[0xFF, 0xFF, 0xFF]), 4095);
        assert_eq!(Mcp3208::decode(&[0x00, 0x08, 0x00]), 2048);
        assert_eq!(Mcp3208::decode(&[0x00, 0x00, 0x01]), 1);
    }
}
