//! Fixed constants for the sample pipeline, the VU meter layout and the panel.
//!
//! Rate and duration are deliberately not configurable.

use std::time::Duration;

/// Capture/playback rate in Hz.
pub const SAMPLE_RATE_HZ: u32 = 16_000;
/// Length of one recording in seconds.
pub const DURATION_SEC: u32 = 10;
/// Ring capacity: one full recording.
pub const NUM_SAMPLES: usize = (SAMPLE_RATE_HZ * DURATION_SEC) as usize;
/// Period between sample ticks (62.5 µs at 16 kHz).
pub const TICK_PERIOD: Duration = Duration::from_nanos(1_000_000_000 / SAMPLE_RATE_HZ as u64);

/// ADC readings are 12 bit wide.
pub const ADC_BITS: u32 = 12;
/// Right shift that brings a wide reading down to 8 bits.
pub const QUANTIZE_SHIFT: u32 = ADC_BITS - 8;

/// Lowest duty level ever sent to the buzzer.
pub const DUTY_MIN: u8 = 30;
/// Highest duty level ever sent to the buzzer.
pub const DUTY_MAX: u8 = 220;

/// Two edges on one button closer than this collapse into one request.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

/// The total width of the OLED display in pixels.
pub const DISPLAY_WIDTH: u32 = 128;
/// The total height of the OLED display in pixels.
pub const DISPLAY_HEIGHT: u32 = 64;

/// Number of VU bars.
pub const BAR_COUNT: usize = 12;
/// Width of a single bar in pixels.
pub const BAR_WIDTH: u32 = 5;
/// Horizontal gap between bars.
pub const BAR_GAP: u32 = 5;
/// Total width occupied by the bars (115 px).
pub const BAR_AREA_WIDTH: u32 = (BAR_WIDTH + BAR_GAP) * BAR_COUNT as u32 - BAR_GAP;
/// Height of the bar area; bars grow up from the bottom row.
pub const BAR_AREA_HEIGHT: u32 = 64;

/// Default SSD1306 I2C address.
pub const OLED_I2C_ADDRESS: u8 = 0x3C;
