/*
 *  deck.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Everything an engine owns while it runs
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

use crate::display::presenter::FrameSurface;
use crate::hal::{DutyOutput, SampleSource};
use crate::ring::RingBuffer;
use crate::vumeter::VuMeter;

/// Ring buffer, meter, sensor and actuator.
///
/// Moved into whichever engine is active and handed back when it stops, so
/// two engines can never hold it at once.
pub struct Deck {
    pub ring: RingBuffer,
    pub meter: VuMeter,
    pub sensor: Box<dyn SampleSource>,
    pub actuator: Box<dyn DutyOutput>,
}

impl Deck {
    pub fn new(
        capacity: usize,
        surface: Arc<FrameSurface>,
        sensor: Box<dyn SampleSource>,
        actuator: Box<dyn DutyOutput>,
    ) -> Self {
        Self {
            ring: RingBuffer::new(capacity),
            meter: VuMeter::new(surface),
            sensor,
            actuator,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
    use crate::hal::emulated::{DutyHistory, DutyLog};
    use crate::hal::HalError;

    /// Replays a fixed list of readings, then repeats the last one
    pub struct ScriptedSensor {
        readings: Vec<u16>,
        next: usize,
    }

    impl ScriptedSensor {
        pub fn new(readings: Vec<u16>) -> Self {
            Self { readings, next: 0 }
        }
    }

    impl SampleSource for ScriptedSensor {
        fn read_sample(&mut self) -> Result<u16, HalError> {
            let i = self.next.min(self.readings.len().saturating_sub(1));
            self.next += 1;
            Ok(self.readings.get(i).copied().unwrap_or(0))
        }
    }

    /// Fails on the given read
    pub struct FailingSensor {
        pub fail_at: usize,
        pub reads: usize,
    }

    impl SampleSource for FailingSensor {
        fn read_sample(&mut self) -> Result<u16, HalError> {
            self.reads += 1;
            if self.reads >= self.fail_at {
                Err(HalError::Sensor("bus stuck".into()))
            } else {
                Ok(2048)
            }
        }
    }

    pub fn deck(capacity: usize, sensor: impl SampleSource + 'static) -> (Deck, Arc<FrameSurface>, DutyHistory) {
        let surface = Arc::new(FrameSurface::new(DISPLAY_WIDTH, DISPLAY_HEIGHT));
        let log = DutyLog::new();
        let history = log.history();
        let deck = Deck::new(
            capacity,
            Arc::clone(&surface),
            Box::new(sensor),
            Box::new(log.into_actuator()),
        );
        (deck, surface, history)
    }
}
