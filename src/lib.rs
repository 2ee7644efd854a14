/*
 *  lib.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  16 kHz record/replay pipeline with a 12 bar OLED meter
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

pub mod capture;
pub mod clock;
pub mod config;
pub mod constants;
pub mod control;
pub mod deck;
pub mod display;
pub mod hal;
pub mod pipeline;
pub mod playback;
pub mod ring;
pub mod vumeter;

pub use control::{ButtonDebouncer, Operation, OperationState, RequestSlot};
pub use pipeline::{Peripherals, Pipeline, PipelineError, PipelineSettings};
