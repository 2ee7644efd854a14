/*
 *  hal/emulated.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Host-side stand-ins for the ADC, PWM, LEDs and buttons
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
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::pwm::{ErrorType as PwmErrorType, SetDutyCycle};
use log::{debug, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::{EmulatedConfig, Waveform};
use crate::constants::{ADC_BITS, SAMPLE_RATE_HZ};
use crate::control::{ButtonDebouncer, Operation};
use crate::hal::{HalError, PinIndicator, PwmDuty, SampleSource};

const ADC_MAX: u16 = (1 << ADC_BITS) - 1;

/// Synthetic sensor producing 12-bit readings
pub struct SignalGenerator {
    waveform: Waveform,
    level: u16,
    phase: f32,
    step: f32,
    rng: StdRng,
}

impl SignalGenerator {
    pub fn new(waveform: Waveform, frequency_hz: f32, level: u16) -> Self {
        Self {
            waveform,
            level: level.min(ADC_MAX),
            phase: 0.0,
            step: TAU * frequency_hz / SAMPLE_RATE_HZ as f32,
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn from_config(config: &EmulatedConfig) -> Self {
        Self::new(config.waveform(), config.frequency_hz(), config.level())
    }

    /// Fixed level, every reading identical
    pub fn constant(level: u16) -> Self {
        Self::new(Waveform::Constant, 1.0, level)
    }

    /// Reproducible noise
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl SampleSource for SignalGenerator {
    fn read_sample(&mut self) -> Result<u16, HalError> {
        let reading = match self.waveform {
            Waveform::Constant => self.level,
            Waveform::Noise => self.rng.random_range(0..=self.level),
            Waveform::Sine => {
                let half = self.level as f32 / 2.0;
                let value = half + half * self.phase.sin();
                self.phase = (self.phase + self.step) % TAU;
                value.round() as u16
            }
        };
        Ok(reading.min(ADC_MAX))
    }
}

/// Every duty value the actuator was asked for, in order
pub type DutyHistory = Arc<Mutex<Vec<u8>>>;

/// PWM channel that only remembers. Its duty scale is 0..=255, so behind
/// `PwmDuty` every recorded value is exactly the requested level.
///
/// A long-running process should use `untracked`: the history keeps every
/// value until someone clears it.
pub struct DutyLog {
    history: Option<DutyHistory>,
    level: u8,
}

impl DutyLog {
    /// Keeps every duty value in a shared history
    pub fn new() -> Self {
        Self { history: Some(DutyHistory::default()), level: 0 }
    }

    /// Holds only the current level, traces each change
    pub fn untracked() -> Self {
        Self { history: None, level: 0 }
    }

    /// Shared history; empty and detached for an untracked log
    pub fn history(&self) -> DutyHistory {
        self.history.clone().unwrap_or_default()
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Ready to hand to the pipeline
    pub fn into_actuator(self) -> PwmDuty<Self> {
        PwmDuty::new(self)
    }
}

impl Default for DutyLog {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmErrorType for DutyLog {
    type Error = Infallible;
}

impl SetDutyCycle for DutyLog {
    fn max_duty_cycle(&self) -> u16 {
        u8::MAX as u16
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        let level = duty.min(u8::MAX as u16) as u8;
        match &self.history {
            Some(history) => history.lock().unwrap_or_else(PoisonError::into_inner).push(level),
            None if level != self.level => trace!("pwm duty {}", level),
            None => {}
        }
        self.level = level;
        Ok(())
    }
}

/// Output pin that logs its transitions
pub struct LogPin {
    name: &'static str,
    lit: Arc<AtomicBool>,
}

impl LogPin {
    pub fn new(name: &'static str) -> Self {
        Self { name, lit: Arc::new(AtomicBool::new(false)) }
    }

    /// Shared view of the pin level
    pub fn probe(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.lit)
    }

    pub fn into_indicator(self) -> PinIndicator<Self> {
        PinIndicator::new(self)
    }

    fn drive(&mut self, on: bool) {
        if self.lit.swap(on, Ordering::AcqRel) != on {
            info!("{} LED {}", self.name, if on { "on" } else { "off" });
        }
    }
}

impl PinErrorType for LogPin {
    type Error = Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

/// Keyboard stand-in for the two buttons.
///
/// Each line on stdin is one falling edge: `r` record, `p` play. Returns on
/// `q`. On end of input the buttons simply go quiet.
pub async fn keyboard_buttons(debouncer: Arc<ButtonDebouncer>) -> Result<(), HalError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("keyboard buttons: r = record, p = play, q = quit");

    loop {
        let line = lines
            .next_line()
            .await
            .map_err(|e| HalError::Input(format!("stdin: {}", e)))?;
        let Some(line) = line else {
            debug!("stdin closed, keyboard buttons disabled");
            return std::future::pending().await;
        };
        let source = match line.trim() {
            "r" | "R" => Operation::Record,
            "p" | "P" => Operation::Play,
            "q" | "Q" => return Ok(()),
            "" => continue,
            other => {
                warn!("unknown key {:?}", other);
                continue;
            }
        };
        if !debouncer.on_edge(source, Instant::now()) {
            debug!("{:?} edge debounced", source);
        }
    }
}
