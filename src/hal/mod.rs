/*
 *  hal/mod.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Peripheral boundary - sensor, actuator, indicators
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

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use thiserror::Error;

pub mod emulated;

#[cfg(feature = "hardware")]
pub mod rpi;

/// Peripheral failure. The pipeline has no recovery path for any of these.
#[derive(Debug, Error)]
pub enum HalError {
    #[error("sensor read failed: {0}")]
    Sensor(String),
    #[error("actuator write failed: {0}")]
    Actuator(String),
    #[error("indicator write failed: {0}")]
    Indicator(String),
    #[error("input setup failed: {0}")]
    Input(String),
}

/// Wide (12-bit) analog reading, fast and blocking
pub trait SampleSource: Send {
    fn read_sample(&mut self) -> Result<u16, HalError>;
}

/// Pulse-width output, 0..=255 duty scale. Callers clamp.
pub trait DutyOutput: Send {
    fn set_duty_level(&mut self, duty: u8) -> Result<(), HalError>;
}

/// Status LED
pub trait Indicator: Send {
    fn set(&mut self, on: bool) -> Result<(), HalError>;
}

/// Any `embedded-hal` output pin as an indicator
pub struct PinIndicator<P> {
    pin: P,
}

impl<P: OutputPin> PinIndicator<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin + Send> Indicator for PinIndicator<P> {
    fn set(&mut self, on: bool) -> Result<(), HalError> {
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        result.map_err(|e| HalError::Indicator(format!("{:?}", e)))
    }
}

/// Any `embedded-hal` PWM channel as the actuator, duty as a fraction of 255
pub struct PwmDuty<P> {
    pwm: P,
}

impl<P: SetDutyCycle> PwmDuty<P> {
    pub fn new(pwm: P) -> Self {
        Self { pwm }
    }

    pub fn into_inner(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle + Send> DutyOutput for PwmDuty<P> {
    fn set_duty_level(&mut self, duty: u8) -> Result<(), HalError> {
        self.pwm
            .set_duty_cycle_fraction(duty as u16, u8::MAX as u16)
            .map_err(|e| HalError::Actuator(format!("{:?}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType as PinErrorType;
    use embedded_hal::pwm::ErrorType as PwmErrorType;

    #[derive(Default)]
    struct FakePin {
        high: bool,
        writes: usize,
    }

    impl PinErrorType for FakePin {
        type Error = Infallible;
    }

    impl OutputPin for FakePin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            self.writes += 1;
            Ok(())
        }
    }

    struct FakePwm {
        max: u16,
        duty: u16,
    }

    impl PwmErrorType for FakePwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for FakePwm {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    #[test]
    fn test_pin_indicator_follows_state() {
        let mut led = PinIndicator::new(FakePin::default());
        led.set(true).unwrap();
        led.set(false).unwrap();
        led.set(true).unwrap();
        let pin = led.into_inner();
        assert!(pin.high);
        assert_eq!(pin.writes, 3);
    }

    #[test]
    fn test_pwm_duty_scales_to_channel() {
        let mut pwm = PwmDuty::new(FakePwm { max: 1000, duty: 0 });

        pwm.set_duty_level(255).unwrap();
        assert_eq!(pwm.pwm.duty, 1000);

        pwm.set_duty_level(0).unwrap();
        assert_eq!(pwm.pwm.duty, 0);

        // 30/255 of 1000, rounded down
        pwm.set_duty_level(30).unwrap();
        assert_eq!(pwm.into_inner().duty, 117);
    }
}
