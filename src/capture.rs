/*
 *  capture.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Record pass - one sensor reading per tick into the ring
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
use crate::constants::QUANTIZE_SHIFT;
use crate::control::CompletionSignal;
use crate::deck::Deck;
use crate::hal::HalError;
use crate::vumeter::BarUpdate;

/// 12-bit reading down to an 8-bit amplitude
pub fn quantize(raw: u16) -> u8 {
    (raw >> QUANTIZE_SHIFT).min(u8::MAX as u16) as u8
}

/// One stored sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTick {
    pub sample: u8,
    /// write cursor after the store
    pub cursor: usize,
    pub bar: BarUpdate,
}

pub struct CaptureEngine {
    deck: Deck,
    done: Arc<CompletionSignal>,
    fault: Option<HalError>,
}

impl CaptureEngine {
    /// Arm a record pass: cursor to zero, meter blanked
    pub fn new(mut deck: Deck, done: Arc<CompletionSignal>) -> Self {
        deck.ring.begin_capture();
        deck.meter.reset();
        done.reset();
        Self { deck, done, fault: None }
    }

    /// Read, quantize, store, redraw one bar.
    /// `None` once the ring is full.
    pub fn step(&mut self) -> Result<Option<CaptureTick>, HalError> {
        if self.deck.ring.is_full() {
            return Ok(None);
        }
        let sample = quantize(self.deck.sensor.read_sample()?);
        let Some(cursor) = self.deck.ring.push(sample) else {
            return Ok(None);
        };
        let bar = self.deck.meter.update(cursor, sample);
        Ok(Some(CaptureTick { sample, cursor, bar }))
    }

    fn finish(&mut self) {
        self.deck.ring.finish_capture();
        self.done.signal();
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Hand the deck back, with the peripheral fault if one stopped the pass
    pub fn into_parts(self) -> (Deck, Option<HalError>) {
        (self.deck, self.fault)
    }
}

impl TickHandler for CaptureEngine {
    fn on_tick(&mut self) -> TickControl {
        match self.step() {
            Ok(Some(tick)) if tick.cursor < self.deck.ring.capacity() => TickControl::Continue,
            // stored the last sample, or nothing left to store
            Ok(_) => {
                self.finish();
                TickControl::Stop
            }
            Err(e) => {
                error!("capture halted at sample {}: {}", self.deck.ring.write_cursor(), e);
                self.fault = Some(e);
                self.finish();
                TickControl::Stop
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BAR_AREA_HEIGHT, BAR_COUNT, NUM_SAMPLES};
    use crate::deck::testing::{deck, FailingSensor, ScriptedSensor};
    use crate::hal::emulated::SignalGenerator;

    fn run_to_completion(engine: &mut CaptureEngine) -> usize {
        let mut ticks = 0;
        loop {
            ticks += 1;
            if engine.on_tick() == TickControl::Stop {
                return ticks;
            }
        }
    }

    #[test]
    fn test_quantize_range() {
        assert_eq!(quantize(0), 0);
        assert_eq!(quantize(15), 0);
        assert_eq!(quantize(16), 1);
        assert_eq!(quantize(4095), 255);
        // wider than 12 bits still lands in range
        assert_eq!(quantize(u16::MAX), 255);
    }

    #[test]
    fn test_completes_on_nth_tick() {
        let (deck, _, _) = deck(NUM_SAMPLES, SignalGenerator::constant(1000));
        let done = Arc::new(CompletionSignal::new());
        let mut engine = CaptureEngine::new(deck, Arc::clone(&done));

        for tick in 1..NUM_SAMPLES {
            assert_eq!(engine.on_tick(), TickControl::Continue, "stopped early at {}", tick);
            assert!(!done.is_signaled());
        }
        assert_eq!(engine.on_tick(), TickControl::Stop);
        assert!(done.is_signaled());

        let (deck, fault) = engine.into_parts();
        assert!(fault.is_none());
        assert_eq!(deck.ring.write_cursor(), NUM_SAMPLES);
        assert_eq!(deck.ring.recorded_len(), NUM_SAMPLES);
    }

    #[test]
    fn test_tick_on_full_ring_signals_without_storing() {
        let (mut deck, _, _) = deck(4, SignalGenerator::constant(0));
        let done = Arc::new(CompletionSignal::new());
        for _ in 0..4 {
            deck.ring.push(9);
        }
        let mut engine = CaptureEngine::new(deck, Arc::clone(&done));
        // begin_capture rewound the cursor
        assert_eq!(engine.deck().ring.write_cursor(), 0);
        assert_eq!(run_to_completion(&mut engine), 4);

        assert_eq!(engine.step().unwrap(), None);
        assert_eq!(engine.on_tick(), TickControl::Stop);
        assert_eq!(engine.deck().ring.write_cursor(), 4);
    }

    #[test]
    fn test_zero_input_scenario() {
        let (deck, surface, _) = deck(240, SignalGenerator::constant(0));
        let mut engine = CaptureEngine::new(deck, Arc::new(CompletionSignal::new()));

        while let Some(tick) = engine.step().unwrap() {
            assert_eq!(tick.sample, 0);
            assert_eq!(tick.bar.height, 0);
        }
        assert_eq!(engine.on_tick(), TickControl::Stop);
        let (deck, _) = engine.into_parts();
        assert_eq!(deck.ring.recording().len(), 240);
        assert!(deck.ring.recording().iter().all(|s| *s == 0));
        // only the baseline row of each bar is lit
        surface.draw(|live| assert_eq!(live.count_on(), BAR_COUNT * 5));
    }

    #[test]
    fn test_full_scale_scenario() {
        let (deck, _, _) = deck(240, SignalGenerator::constant(4095));
        let mut engine = CaptureEngine::new(deck, Arc::new(CompletionSignal::new()));

        while let Some(tick) = engine.step().unwrap() {
            assert_eq!(tick.sample, 255);
            assert_eq!(tick.bar.height, BAR_AREA_HEIGHT - 1);
        }
        engine.on_tick();
        let (deck, _) = engine.into_parts();
        assert_eq!(deck.ring.recording().len(), 240);
        assert!(deck.ring.recording().iter().all(|s| *s == 255));
    }

    #[test]
    fn test_bar_index_follows_write_cursor() {
        let (deck, surface, _) = deck(100, ScriptedSensor::new(vec![4095; 100]));
        let mut engine = CaptureEngine::new(deck, Arc::new(CompletionSignal::new()));
        // reset flagged the blank frame
        assert!(surface.is_ready());

        for cursor in 1..=24usize {
            let tick = engine.step().unwrap().unwrap();
            assert_eq!(tick.cursor, cursor);
            assert_eq!(tick.bar.index, cursor % BAR_COUNT);
            assert_eq!(tick.bar.sweep_complete, cursor % BAR_COUNT == BAR_COUNT - 1);
        }
    }

    #[test]
    fn test_sensor_fault_stops_pass() {
        let (deck, _, _) = deck(100, FailingSensor { fail_at: 10, reads: 0 });
        let done = Arc::new(CompletionSignal::new());
        let mut engine = CaptureEngine::new(deck, Arc::clone(&done));

        assert_eq!(run_to_completion(&mut engine), 10);
        assert!(done.is_signaled());
        let (deck, fault) = engine.into_parts();
        assert!(matches!(fault, Some(HalError::Sensor(_))));
        assert_eq!(deck.ring.recorded_len(), 9);
    }
}
