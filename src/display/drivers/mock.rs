/*
 *  display/drivers/mock.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory display driver - emulated backend and tests
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

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::debug;

use crate::config::DisplayConfig;
use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};

/// Streaming frames reach the PBM file at most this often
const PBM_DUMP_INTERVAL: Duration = Duration::from_secs(1);

/// Mock display driver
///
/// Simulates a panel without hardware. Every transmitted frame is kept so
/// tests (and the emulated backend) can look at what would have been shown.
/// Clones share the same state, keep one as a probe before boxing the driver.
#[derive(Debug, Clone)]
pub struct MockDriver {
    /// Display capabilities
    capabilities: DisplayCapabilities,

    /// Shared state for inspection
    state: Arc<Mutex<MockDriverState>>,

    /// Write the last frame here as PBM after every transmit
    pbm_path: Option<PathBuf>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Last brightness value set
    pub last_brightness: Option<u8>,

    /// Number of frames transmitted
    pub frames_written: usize,

    /// Total bytes written via write_buffer
    pub bytes_written: usize,

    /// Most recent frame, page packed
    pub last_frame: Option<Vec<u8>>,

    /// Simulate failures (for error testing)
    pub simulate_write_failure: bool,

    /// Number of PBM files written
    pub frames_dumped: usize,

    /// When the PBM file was last written
    last_dump: Option<Instant>,

    /// A transmitted frame has not reached the PBM file yet
    dump_pending: bool,
}

impl MockDriver {
    /// Create a new mock driver from the display section of the config
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let width = config.width.unwrap_or(DISPLAY_WIDTH);
        let height = config.height.unwrap_or(DISPLAY_HEIGHT);

        if height % 8 != 0 {
            return Err(DisplayError::InvalidConfiguration(
                format!("panel height {} is not a whole number of pages", height)
            ));
        }

        let capabilities = DisplayCapabilities {
            width,
            height,
            max_fps: 60,
            supports_brightness: true,
        };

        Ok(Self {
            capabilities,
            state: Arc::new(Mutex::new(MockDriverState::default())),
            pbm_path: config.pbm_dump.clone(),
        })
    }

    /// Create a mock driver with specific dimensions
    pub fn new_with_size(width: u32, height: u32) -> Result<Self, DisplayError> {
        let config = DisplayConfig {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        };
        Self::new(&config)
    }

    /// Get reference to state for inspection
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockDriverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the last transmitted frame
    pub fn last_frame(&self) -> Option<Vec<u8>> {
        self.lock().last_frame.clone()
    }

    /// Pixel of the last transmitted frame; false if nothing was sent yet
    pub fn last_frame_pixel(&self, x: u32, y: u32) -> bool {
        let width = self.capabilities.width;
        if x >= width || y >= self.capabilities.height {
            return false;
        }
        self.lock()
            .last_frame
            .as_ref()
            .and_then(|frame| frame.get(((y / 8) * width + x) as usize))
            .is_some_and(|byte| byte & (1 << (y % 8)) != 0)
    }

    /// Write the last frame out if the dump is enabled and the frame is
    /// newer than the file; `force` ignores the throttle
    fn dump_last_frame(&self, force: bool) -> Result<(), DisplayError> {
        let Some(path) = &self.pbm_path else {
            return Ok(());
        };
        let frame = {
            let mut state = self.lock();
            let due = state.last_dump.is_none_or(|at| at.elapsed() >= PBM_DUMP_INTERVAL);
            if !state.dump_pending || !(force || due) {
                return Ok(());
            }
            state.dump_pending = false;
            state.last_dump = Some(Instant::now());
            state.frames_dumped += 1;
            state.last_frame.clone()
        }; // Release lock before touching the filesystem

        if let Some(frame) = frame {
            let (width, height) = (self.capabilities.width, self.capabilities.height);
            write_pbm(&frame, width, height, path)
                .map_err(|source| DisplayError::PbmDump { path: path.clone(), source })?;
            debug!("frame dumped to {}", path.display());
        }
        Ok(())
    }
}

/// Save a page-packed frame to a PBM file (for visual debugging)
fn write_pbm(frame: &[u8], width: u32, height: u32, path: &Path) -> io::Result<()> {
    if frame.len() != (width * height / 8) as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} bytes is not a {}x{} frame", frame.len(), width, height),
        ));
    }
    let mut file = BufWriter::new(File::create(path)?);

    // PBM header
    writeln!(file, "P1")?;
    writeln!(file, "{} {}", width, height)?;

    // Pixel data
    for y in 0..height {
        let row: Vec<&str> = (0..width)
            .map(|x| {
                let byte = frame[((y / 8) * width + x) as usize];
                if byte & (1 << (y % 8)) != 0 { "1" } else { "0" }
            })
            .collect();
        writeln!(file, "{}", row.join(" "))?;
    }

    file.flush()
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();
        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.lock().last_brightness = Some(value);
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected_size = self.capabilities.frame_len();

        if buffer.len() != expected_size {
            return Err(DisplayError::BufferSizeMismatch {
                expected: expected_size,
                actual: buffer.len(),
            });
        }

        {
            let mut state = self.lock();
            if state.simulate_write_failure {
                return Err(DisplayError::WriteRefused);
            }
            state.frames_written += 1;
            state.bytes_written += buffer.len();
            state.last_frame = Some(buffer.to_vec());
            state.dump_pending = true;
        }

        self.dump_last_frame(false)
    }

    fn on_idle(&mut self) -> Result<(), DisplayError> {
        self.dump_last_frame(true)
    }
}
