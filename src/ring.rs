/*
 *  ring.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bounded sample store shared (one at a time) by the capture and
 *  playback engines
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

/// Fixed-capacity sample store with independent write and read cursors.
///
/// A record pass fills it from the start, a playback pass drains it from the
/// start. Neither cursor wraps: reaching the bound ends the pass. The contents
/// survive between passes, so playback always replays the last completed
/// recording.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    store: Vec<u8>,
    write: usize,
    read: usize,
    /// Length of the last completed recording.
    recorded: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { store: vec![0; capacity], write: 0, read: 0, recorded: 0 }
    }

    pub fn capacity(&self) -> usize { self.store.len() }
    pub fn write_cursor(&self) -> usize { self.write }
    pub fn read_cursor(&self) -> usize { self.read }

    /// Number of samples a playback pass will replay.
    pub fn recorded_len(&self) -> usize { self.recorded }

    pub fn is_full(&self) -> bool { self.write >= self.store.len() }

    /// True once the read cursor has caught up with the last recording.
    pub fn is_drained(&self) -> bool { self.read >= self.recorded }

    /// Start a record pass. The previous recording is forgotten.
    pub fn begin_capture(&mut self) {
        self.write = 0;
        self.recorded = 0;
    }

    /// Append one sample, returning the advanced write cursor.
    /// Returns `None` when the store is already full.
    pub fn push(&mut self, sample: u8) -> Option<usize> {
        let slot = self.store.get_mut(self.write)?;
        *slot = sample;
        self.write += 1;
        Some(self.write)
    }

    /// Close the record pass; everything written so far becomes playable.
    pub fn finish_capture(&mut self) {
        self.recorded = self.write;
    }

    /// Start a playback pass from the first recorded sample.
    pub fn begin_playback(&mut self) {
        self.read = 0;
    }

    /// Take the next recorded sample together with the advanced read cursor.
    pub fn pop(&mut self) -> Option<(u8, usize)> {
        if self.is_drained() {
            return None;
        }
        let sample = self.store[self.read];
        self.read += 1;
        Some((sample, self.read))
    }

    /// The last completed recording.
    pub fn recording(&self) -> &[u8] {
        &self.store[..self.recorded]
    }
}
