/*
 *  playback.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Playback pass - one recorded sample per tick onto the PWM
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

use log::error;

use crate::clock::{TickControl, TickHandler};
use crate::constants::{DUTY_MAX, DUTY_MIN};
use crate::control::CompletionSignal;
use crate::deck::Deck;
use crate::hal::HalError;
use crate::vumeter::BarUpdate;

/// Actuator-safe duty for a stored sample
pub fn duty_for(sample: u8) -> u8 {
    sample.clamp(DUTY_MIN, DUTY_MAX)
}

/// One replayed sample. The bar follows `sample`, the actuator got `duty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackTick {
    pub sample: u8,
    pub duty: u8,
    /// read cursor after the fetch
    pub cursor: usize,
    pub bar: BarUpdate,
}

pub struct PlaybackEngine {
    deck: Deck,
    done: Arc<CompletionSignal>,
    fault: Option<HalError>,
}

impl PlaybackEngine {
    /// Arm a playback pass over the last completed recording
    pub fn new(mut deck: Deck, done: Arc<CompletionSignal>) -> Self {
        deck.ring.begin_playback();
        deck.meter.reset();
        done.reset();
        Self { deck, done, fault: None }
    }

    /// Fetch, drive the actuator, redraw one bar.
    /// `None` once the recording is drained.
    pub fn step(&mut self) -> Result<Option<PlaybackTick>, HalError> {
        let Some((sample, cursor)) = self.deck.ring.pop() else {
            return Ok(None);
        };
        let duty = duty_for(sample);
        self.deck.actuator.set_duty_level(duty)?;
        let bar = self.deck.meter.update(cursor, sample);
        Ok(Some(PlaybackTick { sample, duty, cursor, bar }))
    }

    /// One clock tick, and the sample it replayed if any
    fn advance(&mut self) -> (TickControl, Option<PlaybackTick>) {
        match self.step() {
            Ok(Some(tick)) if tick.cursor < self.deck.ring.recorded_len() => {
                (TickControl::Continue, Some(tick))
            }
            Ok(tick) => {
                self.finish();
                (TickControl::Stop, tick)
            }
            Err(e) => {
                error!("playback halted at sample {}: {}", self.deck.ring.read_cursor(), e);
                self.fault = Some(e);
                self.finish();
                (TickControl::Stop, None)
            }
        }
    }

    fn finish(&mut self) {
        self.done.signal();
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn into_parts(self) -> (Deck, Option<HalError>) {
        (self.deck, self.fault)
    }
}

impl TickHandler for PlaybackEngine {
    fn on_tick(&mut self) -> TickControl {
        self.advance().0
    }
}
