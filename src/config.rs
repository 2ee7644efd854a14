/*
 *  config.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  YAML configuration layered under CLI overrides
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

use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, OLED_I2C_ADDRESS};

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
///
/// Sample rate and record duration are fixed and deliberately absent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// General options
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub backend: Option<Backend>,
    /// display-specific geometry & behavior
    pub display: Option<DisplayConfig>,
    /// GPIO / SPI / PWM wiring for the hardware backend
    pub pins: Option<PinConfig>,
    /// signal generator for the emulated backend
    pub emulated: Option<EmulatedConfig>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Signal generator, duty log, keyboard buttons, in-memory display
    #[default]
    Emulated,
    /// Raspberry Pi: MCP3208, hardware PWM, GPIO, SSD1306
    Hardware,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub rotate_deg: Option<u16>,
    pub brightness: Option<u8>,     // 0-255
    pub driver: Option<DriverKind>,
    pub bus: Option<BusConfig>,
    /// in-memory display only: write each transmitted frame here as PBM
    pub pbm_dump: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String,        // e.g. "/dev/i2c-1"
        address: u8,        // e.g. 0x3C (I2C addresses are 7-bit, stored in u8)
        speed_hz: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Ssd1306,
    Mock,
}

/// BCM pin numbers and peripheral channels. Unset fields take the defaults
/// of the reference wiring.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PinConfig {
    pub record_button: Option<u8>,
    pub play_button: Option<u8>,
    pub record_led: Option<u8>,
    pub play_led: Option<u8>,
    pub pwm_channel: Option<u8>,
    pub pwm_frequency_hz: Option<f64>,
    pub adc_spi_bus: Option<u8>,
    pub adc_slave_select: Option<u8>,
    pub adc_channel: Option<u8>,
}

impl PinConfig {
    pub fn record_button(&self) -> u8 { self.record_button.unwrap_or(5) }
    pub fn play_button(&self) -> u8 { self.play_button.unwrap_or(6) }
    pub fn record_led(&self) -> u8 { self.record_led.unwrap_or(13) }
    pub fn play_led(&self) -> u8 { self.play_led.unwrap_or(11) }
    pub fn pwm_channel(&self) -> u8 { self.pwm_channel.unwrap_or(0) }
    // well above the audio band so the RC filter smooths it out
    pub fn pwm_frequency_hz(&self) -> f64 { self.pwm_frequency_hz.unwrap_or(62_500.0) }
    pub fn adc_spi_bus(&self) -> u8 { self.adc_spi_bus.unwrap_or(0) }
    pub fn adc_slave_select(&self) -> u8 { self.adc_slave_select.unwrap_or(0) }
    pub fn adc_channel(&self) -> u8 { self.adc_channel.unwrap_or(0) }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Constant,
    Noise,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EmulatedConfig {
    pub waveform: Option<Waveform>,
    /// sine frequency
    pub frequency_hz: Option<f32>,
    /// constant level, or sine/noise peak, as a 12-bit reading
    pub level: Option<u16>,
    /// read r/p/q from stdin
    pub keyboard: Option<bool>,
}

impl EmulatedConfig {
    pub fn waveform(&self) -> Waveform { self.waveform.unwrap_or_default() }
    pub fn frequency_hz(&self) -> f32 { self.frequency_hz.unwrap_or(440.0) }
    pub fn level(&self) -> u16 { self.level.unwrap_or(4095) }
    pub fn keyboard(&self) -> bool { self.keyboard.unwrap_or(true) }
}

impl Config {
    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or_default()
    }

    pub fn pins(&self) -> PinConfig {
        self.pins.clone().unwrap_or_default()
    }

    pub fn emulated(&self) -> EmulatedConfig {
        self.emulated.clone().unwrap_or_default()
    }

    /// Display section with the backend's defaults filled in
    pub fn effective_display(&self) -> DisplayConfig {
        let mut display = self.display.clone().unwrap_or_default();
        if display.driver.is_none() {
            display.driver = Some(match self.backend() {
                Backend::Emulated => DriverKind::Mock,
                Backend::Hardware => DriverKind::Ssd1306,
            });
        }
        if display.driver == Some(DriverKind::Ssd1306) && display.bus.is_none() {
            display.bus = Some(BusConfig::I2c {
                bus: "/dev/i2c-1".to_string(),
                address: OLED_I2C_ADDRESS,
                speed_hz: None,
            });
        }
        display.width.get_or_insert(DISPLAY_WIDTH);
        display.height.get_or_insert(DISPLAY_HEIGHT);
        display
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "audiosynth", version, about = "Record, replay, watch the bars", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Shorthand for --log-level debug
    #[arg(long, short = 'v', action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,
    #[arg(long)]
    pub i2c_bus: Option<String>,
    #[arg(long, value_parser = parse_address)]
    pub i2c_address: Option<u8>,
    #[arg(long)]
    pub display_rotate_deg: Option<u16>,
    #[arg(long)]
    pub display_brightness: Option<u8>,
    /// in-memory display: dump each transmitted frame as PBM
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub pbm_dump: Option<PathBuf>,
    #[arg(long, value_enum)]
    pub waveform: Option<Waveform>,
    #[arg(long)]
    pub frequency_hz: Option<f32>,
    #[arg(long)]
    pub level: Option<u16>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid I2C address {s:?}: {e}"))
}

/// Public entry point: parse CLI, read YAML, merge, validate.
///
/// Returns the parsed CLI too, `main` acts on `--dump-config`.
pub fn load() -> Result<(Config, Cli), ConfigError> {
    let cli = Cli::parse();
    let cfg = resolve(&cli)?;
    Ok((cfg, cli))
}

/// Defaults, then YAML (explicit path or search), then CLI, then validate.
pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    validate(&cfg)?;
    Ok(cfg)
}

/// Pretty YAML of effective config
pub fn dump(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/audiosynth/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/audiosynth/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/audiosynth.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["audiosynth.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.backend.is_some()        { dst.backend = src.backend; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    match (&mut dst.pins, src.pins) {
        (None, Some(c)) => dst.pins = Some(c),
        (Some(d), Some(s)) => merge_pins(d, s),
        _ => {}
    }
    match (&mut dst.emulated, src.emulated) {
        (None, Some(c)) => dst.emulated = Some(c),
        (Some(d), Some(s)) => merge_emulated(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()       { dst.width = src.width; }
    if src.height.is_some()      { dst.height = src.height; }
    if src.rotate_deg.is_some()  { dst.rotate_deg = src.rotate_deg; }
    if src.brightness.is_some()  { dst.brightness = src.brightness; }
    if src.driver.is_some()      { dst.driver = src.driver; }
    if src.bus.is_some()         { dst.bus = src.bus; }
    if src.pbm_dump.is_some()    { dst.pbm_dump = src.pbm_dump; }
}

fn merge_pins(dst: &mut PinConfig, src: PinConfig) {
    if src.record_button.is_some()    { dst.record_button = src.record_button; }
    if src.play_button.is_some()      { dst.play_button = src.play_button; }
    if src.record_led.is_some()       { dst.record_led = src.record_led; }
    if src.play_led.is_some()         { dst.play_led = src.play_led; }
    if src.pwm_channel.is_some()      { dst.pwm_channel = src.pwm_channel; }
    if src.pwm_frequency_hz.is_some() { dst.pwm_frequency_hz = src.pwm_frequency_hz; }
    if src.adc_spi_bus.is_some()      { dst.adc_spi_bus = src.adc_spi_bus; }
    if src.adc_slave_select.is_some() { dst.adc_slave_select = src.adc_slave_select; }
    if src.adc_channel.is_some()      { dst.adc_channel = src.adc_channel; }
}

fn merge_emulated(dst: &mut EmulatedConfig, src: EmulatedConfig) {
    if src.waveform.is_some()     { dst.waveform = src.waveform; }
    if src.frequency_hz.is_some() { dst.frequency_hz = src.frequency_hz; }
    if src.level.is_some()        { dst.level = src.level; }
    if src.keyboard.is_some()     { dst.keyboard = src.keyboard; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                     { cfg.log_level = Some("debug".to_string()); }
    if cli.backend.is_some()         { cfg.backend = cli.backend; }

    let any_display = cli.i2c_bus.is_some()
        || cli.i2c_address.is_some()
        || cli.display_rotate_deg.is_some()
        || cli.display_brightness.is_some()
        || cli.pbm_dump.is_some();
    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.display_rotate_deg.is_some()  { display.rotate_deg = cli.display_rotate_deg; }
        if cli.display_brightness.is_some()  { display.brightness = cli.display_brightness; }
        if cli.pbm_dump.is_some()            { display.pbm_dump = cli.pbm_dump.clone(); }
        if cli.i2c_bus.is_some() || cli.i2c_address.is_some() {
            let (mut bus, mut address) = ("/dev/i2c-1".to_string(), OLED_I2C_ADDRESS);
            if let Some(BusConfig::I2c { bus: b, address: a, .. }) = display.bus.as_ref() {
                bus = b.clone();
                address = *a;
            }
            display.bus = Some(BusConfig::I2c {
                bus: cli.i2c_bus.clone().unwrap_or(bus),
                address: cli.i2c_address.unwrap_or(address),
                speed_hz: None,
            });
        }
    }

    let any_emulated = cli.waveform.is_some() || cli.frequency_hz.is_some() || cli.level.is_some();
    if any_emulated && cfg.emulated.is_none() {
        cfg.emulated = Some(EmulatedConfig::default());
    }
    if let Some(emulated) = cfg.emulated.as_mut() {
        if cli.waveform.is_some()     { emulated.waveform = cli.waveform; }
        if cli.frequency_hz.is_some() { emulated.frequency_hz = cli.frequency_hz; }
        if cli.level.is_some()        { emulated.level = cli.level; }
    }
}

/// Invariants: panel geometry, wiring ranges, generator bounds
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(display) = cfg.display.as_ref() {
        // the meter is laid out for one panel size only
        let size = (
            display.width.unwrap_or(DISPLAY_WIDTH),
            display.height.unwrap_or(DISPLAY_HEIGHT),
        );
        if size != (DISPLAY_WIDTH, DISPLAY_HEIGHT) {
            return Err(ConfigError::Validation(format!(
                "display must be {}x{}, got {}x{}",
                DISPLAY_WIDTH, DISPLAY_HEIGHT, size.0, size.1
            )));
        }
        if let Some(rot) = display.rotate_deg {
            match rot {
                0 | 180 => {},
                _ => return Err(ConfigError::Validation("display rotate_deg must be 0|180".into()))
            }
        }
        if let Some(BusConfig::I2c { address, .. }) = display.bus.as_ref() {
            if !(0x03..=0x77).contains(address) {
                return Err(ConfigError::Validation(format!(
                    "I2C address 0x{:02X} outside 0x03..=0x77", address
                )));
            }
        }
    }

    if let Some(pins) = cfg.pins.as_ref() {
        let gpio = [pins.record_button(), pins.play_button(), pins.record_led(), pins.play_led()];
        if let Some(p) = gpio.iter().find(|p| **p > 27) {
            return Err(ConfigError::Validation(format!("GPIO {} is not a BCM header pin", p)));
        }
        for (i, a) in gpio.iter().enumerate() {
            if gpio[i + 1..].contains(a) {
                return Err(ConfigError::Validation(format!("GPIO {} assigned twice", a)));
            }
        }
        if pins.pwm_channel() > 1 {
            return Err(ConfigError::Validation("pwm_channel must be 0|1".into()));
        }
        if pins.pwm_frequency_hz() <= 0.0 {
            return Err(ConfigError::Validation("pwm_frequency_hz must be > 0".into()));
        }
        if pins.adc_channel() > 7 {
            return Err(ConfigError::Validation("adc_channel must be 0..=7".into()));
        }
    }

    if let Some(emulated) = cfg.emulated.as_ref() {
        if emulated.level() > 4095 {
            return Err(ConfigError::Validation("emulated level must be a 12-bit reading".into()));
        }
        if emulated.frequency_hz() <= 0.0 {
            return Err(ConfigError::Validation("emulated frequency_hz must be > 0".into()));
        }
    }
    Ok(())
}
