/*
 *  display/presenter.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Double buffered, non-blocking frame flush
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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use embedded_graphics::mono_font::{ascii::FONT_6X10, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use log::debug;

use crate::display::error::DisplayError;
use crate::display::factory::BoxedDriver;
use crate::display::framebuffer::PagedFrameBuffer;

/// The live bitmap and its "frame renderable" flag.
///
/// This is the only display state touched from the tick context. Ticks
/// draw into the live buffer under the lock and raise the flag; the main
/// loop lowers the flag and copies the buffer out under the same lock.
#[derive(Debug)]
pub struct FrameSurface {
    live: Mutex<PagedFrameBuffer>,
    ready: AtomicBool,
}

impl FrameSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            live: Mutex::new(PagedFrameBuffer::new(width, height)),
            ready: AtomicBool::new(false),
        }
    }

    /// Mutate the live buffer. Keep `f` short, ticks call this.
    pub fn draw<R>(&self, f: impl FnOnce(&mut PagedFrameBuffer) -> R) -> R {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut live)
    }

    /// Flag the live buffer as worth transmitting
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn take_ready(&self) -> bool {
        self.ready.swap(false, Ordering::AcqRel)
    }

    fn snapshot_into(&self, shadow: &mut PagedFrameBuffer) {
        let live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        shadow.copy_from(&live);
    }
}

/// Owns the panel and the shadow buffer; the only caller of `write_buffer`.
pub struct DisplayPresenter {
    surface: Arc<FrameSurface>,
    shadow: PagedFrameBuffer,
    driver: BoxedDriver,
    frames_sent: u64,
}

impl DisplayPresenter {
    pub fn new(driver: BoxedDriver) -> Self {
        let (width, height) = driver.dimensions();
        Self {
            surface: Arc::new(FrameSurface::new(width, height)),
            shadow: PagedFrameBuffer::new(width, height),
            driver,
            frames_sent: 0,
        }
    }

    /// Handle for the tick context
    pub fn surface(&self) -> Arc<FrameSurface> {
        Arc::clone(&self.surface)
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// How often the main loop should poll `flush_if_ready`
    pub fn flush_period(&self) -> Duration {
        let fps = self.driver.capabilities().max_fps.max(1);
        Duration::from_micros(1_000_000 / fps as u64)
    }

    /// Transmit the live bitmap if a frame has been flagged.
    ///
    /// The live buffer is copied into the shadow under the surface lock and
    /// the shadow is what goes out on the bus, so ticks can keep drawing
    /// while the transfer runs. The flag is lowered before the copy: a sweep
    /// that completes during the transfer raises it again and is not lost.
    pub fn flush_if_ready(&mut self) -> Result<bool, DisplayError> {
        if !self.surface.take_ready() {
            return Ok(false);
        }
        self.surface.snapshot_into(&mut self.shadow);
        self.driver.write_buffer(self.shadow.as_bytes())?;
        self.frames_sent += 1;
        Ok(true)
    }

    /// Replace the live bitmap with a few lines of text and push it out
    pub fn show_splash(&mut self, lines: &[&str]) -> Result<(), DisplayError> {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        self.surface.draw(|live| {
            live.clear_all();
            for (row, line) in lines.iter().enumerate() {
                let x = if row == 0 { 8 } else { 0 };
                // infallible target
                let _ = Text::with_baseline(line, Point::new(x, row as i32 * 10), style, Baseline::Top)
                    .draw(&mut *live);
            }
        });
        debug!("splash: {:?}", lines);
        self.surface.mark_ready();
        self.flush_if_ready()?;
        self.driver.on_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockDriver;
    use crate::display::traits::DisplayDriver;

    fn presenter() -> (DisplayPresenter, MockDriver) {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();
        driver.init().unwrap();
        let probe = driver.clone();
        (DisplayPresenter::new(Box::new(driver)), probe)
    }

    #[test]
    fn test_flush_noop_when_not_ready() {
        let (mut presenter, probe) = presenter();
        assert!(!presenter.flush_if_ready().unwrap());
        assert_eq!(probe.state().lock().unwrap().frames_written, 0);
    }

    #[test]
    fn test_flush_sends_snapshot_once() {
        let (mut presenter, probe) = presenter();
        let surface = presenter.surface();

        surface.draw(|live| live.set_pixel(5, 5, true));
        surface.mark_ready();

        assert!(presenter.flush_if_ready().unwrap());
        assert!(!surface.is_ready());
        assert!(!presenter.flush_if_ready().unwrap());

        assert_eq!(presenter.frames_sent(), 1);
        assert_eq!(probe.state().lock().unwrap().frames_written, 1);
        assert!(probe.last_frame_pixel(5, 5));
    }

    #[test]
    fn test_live_mutation_after_copy_not_transmitted() {
        let (mut presenter, probe) = presenter();
        let surface = presenter.surface();

        surface.draw(|live| live.set_pixel(1, 1, true));
        surface.mark_ready();
        presenter.flush_if_ready().unwrap();

        // next tick scribbles on the live buffer
        surface.draw(|live| live.set_pixel(2, 2, true));

        assert!(probe.last_frame_pixel(1, 1));
        assert!(!probe.last_frame_pixel(2, 2));
        assert_eq!(probe.last_frame().unwrap().len(), 1024);
    }

    #[test]
    fn test_flushed_frames_are_whole() {
        let (mut presenter, probe) = presenter();
        let surface = presenter.surface();

        // each draw flips the entire frame
        let writer = std::thread::spawn(move || {
            for i in 0..5000 {
                let color = if i % 2 == 0 { BinaryColor::On } else { BinaryColor::Off };
                surface.draw(|live| {
                    let _ = live.clear(color);
                });
                surface.mark_ready();
            }
        });

        while !writer.is_finished() {
            if presenter.flush_if_ready().unwrap() {
                let frame = probe.last_frame().unwrap();
                assert!(frame.iter().all(|b| *b == frame[0]), "torn frame");
                assert!(frame[0] == 0x00 || frame[0] == 0xFF);
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn test_splash_transmits_text() {
        let (mut presenter, probe) = presenter();
        presenter.show_splash(&["AUDIO SYNTH !", "PRESS A TO REC"]).unwrap();

        let frame = probe.last_frame().unwrap();
        assert!(frame.iter().any(|b| *b != 0));
        assert_eq!(presenter.frames_sent(), 1);
    }

    #[test]
    fn test_flush_period_from_max_fps() {
        let (presenter, _) = presenter();
        // mock panel advertises 60 fps
        assert_eq!(presenter.flush_period(), Duration::from_micros(16_666));
    }
}
