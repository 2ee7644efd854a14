/*
 *  vumeter.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  12 bar amplitude meter, one bar per tick
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

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use crate::constants::{
    BAR_AREA_HEIGHT, BAR_AREA_WIDTH, BAR_COUNT, BAR_GAP, BAR_WIDTH, DISPLAY_HEIGHT, DISPLAY_WIDTH,
};
use crate::display::presenter::FrameSurface;

/// Pixel height of the bar for an 8-bit sample, 0..=BAR_AREA_HEIGHT-1
pub fn bar_height(sample: u8) -> u32 {
    (BAR_AREA_HEIGHT - 1) * sample as u32 / 255
}

/// Bar refreshed when the cursor has just advanced to `cursor`
pub fn bar_index(cursor: usize) -> usize {
    cursor % BAR_COUNT
}

/// Where the bars sit on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarGeometry {
    /// left edge of bar 0, centres the bar area
    pub x0: u32,
    pub bar_width: u32,
    pub bar_gap: u32,
    /// bottom row every bar grows up from
    pub baseline: u32,
    /// topmost row a bar may occupy
    pub top: u32,
}

impl Default for BarGeometry {
    fn default() -> Self {
        Self {
            x0: (DISPLAY_WIDTH - BAR_AREA_WIDTH) / 2,
            bar_width: BAR_WIDTH,
            bar_gap: BAR_GAP,
            baseline: DISPLAY_HEIGHT - 1,
            top: DISPLAY_HEIGHT - BAR_AREA_HEIGHT,
        }
    }
}

impl BarGeometry {
    pub fn bar_x(&self, index: usize) -> u32 {
        self.x0 + index as u32 * (self.bar_width + self.bar_gap)
    }

    /// Full column a bar can occupy
    pub fn column(&self, index: usize) -> Rectangle {
        Rectangle::new(
            Point::new(self.bar_x(index) as i32, self.top as i32),
            Size::new(self.bar_width, self.baseline + 1 - self.top),
        )
    }

    /// Lit part of a bar; height 0 still lights the baseline row
    pub fn bar(&self, index: usize, height: u32) -> Rectangle {
        Rectangle::new(
            Point::new(self.bar_x(index) as i32, (self.baseline - height) as i32),
            Size::new(self.bar_width, height + 1),
        )
    }
}

/// What one tick did to the meter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarUpdate {
    pub index: usize,
    pub height: u32,
    /// last bar of the cycle refreshed, frame is renderable
    pub sweep_complete: bool,
}

/// Bar state plus the drawing of it into the shared live buffer
pub struct VuMeter {
    surface: Arc<FrameSurface>,
    geometry: BarGeometry,
    heights: [u32; BAR_COUNT],
}

impl VuMeter {
    pub fn new(surface: Arc<FrameSurface>) -> Self {
        Self { surface, geometry: BarGeometry::default(), heights: [0; BAR_COUNT] }
    }

    pub fn geometry(&self) -> &BarGeometry {
        &self.geometry
    }

    pub fn heights(&self) -> &[u32; BAR_COUNT] {
        &self.heights
    }

    /// Start of an operation: blank panel, bars at rest, push the blank frame
    pub fn reset(&mut self) {
        self.heights = [0; BAR_COUNT];
        self.surface.draw(|live| live.clear_all());
        self.surface.mark_ready();
    }

    /// Redraw the bar selected by `cursor` for `sample`. O(1), tick safe.
    pub fn update(&mut self, cursor: usize, sample: u8) -> BarUpdate {
        let index = bar_index(cursor);
        let height = bar_height(sample);
        self.heights[index] = height;

        let geometry = self.geometry;
        self.surface.draw(|live| {
            // the live buffer is infallible
            let _ = live.fill_solid(&geometry.column(index), BinaryColor::Off);
            let _ = live.fill_solid(&geometry.bar(index, height), BinaryColor::On);
        });

        let sweep_complete = index == BAR_COUNT - 1;
        if sweep_complete {
            self.surface.mark_ready();
        }
        BarUpdate { index, height, sweep_complete }
    }
}
