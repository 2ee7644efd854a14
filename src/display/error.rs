/*
 *  display/error.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error types for the display path
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

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Unified error type for all display operations
#[derive(Debug)]
pub enum DisplayError {
    /// The I2C character device could not be opened
    BusOpen { bus: String, reason: String },

    /// Panel did not accept the init sequence
    PanelInit { address: u8, reason: String },

    /// Invalid configuration
    InvalidConfiguration(String),

    /// Unsupported operation for this display
    UnsupportedOperation,

    /// Transmitted bitmap does not match the panel
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Command or data transfer to the panel failed
    Transfer(display_interface::DisplayError),

    /// Frame could not be written out as PBM
    PbmDump { path: PathBuf, source: io::Error },

    /// Transmit refused by the in-memory panel
    WriteRefused,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::BusOpen { bus, reason } =>
                write!(f, "cannot open {}: {}", bus, reason),
            DisplayError::PanelInit { address, reason } =>
                write!(f, "panel at 0x{:02X} did not initialize: {}", address, reason),
            DisplayError::InvalidConfiguration(msg) =>
                write!(f, "Invalid configuration: {}", msg),
            DisplayError::UnsupportedOperation =>
                write!(f, "Operation not supported by this display"),
            DisplayError::BufferSizeMismatch { expected, actual } =>
                write!(f, "Buffer size mismatch: expected {} bytes, got {}", expected, actual),
            DisplayError::Transfer(err) =>
                write!(f, "panel transfer failed: {:?}", err),
            DisplayError::PbmDump { path, source } =>
                write!(f, "PBM dump to {} failed: {}", path.display(), source),
            DisplayError::WriteRefused =>
                write!(f, "in-memory panel refused the frame"),
        }
    }
}

impl Error for DisplayError {
    // display_interface::DisplayError doesn't implement std::error::Error
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayError::PbmDump { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(err: display_interface::DisplayError) -> Self {
        DisplayError::Transfer(err)
    }
}

/// Factory error types
#[derive(Debug)]
pub enum DisplayFactoryError {
    /// No driver specified in configuration
    NoDriverSpecified,

    /// No bus configuration specified
    NoBusConfiguration,

    /// Display driver initialization failed
    DriverInitFailed(DisplayError),

    /// Configuration validation error
    ConfigError(String),
}

impl fmt::Display for DisplayFactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayFactoryError::NoDriverSpecified =>
                write!(f, "No display driver specified in configuration"),
            DisplayFactoryError::NoBusConfiguration =>
                write!(f, "No bus configuration specified"),
            DisplayFactoryError::DriverInitFailed(err) =>
                write!(f, "Driver initialization failed: {}", err),
            DisplayFactoryError::ConfigError(msg) =>
                write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for DisplayFactoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DisplayFactoryError::DriverInitFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DisplayError> for DisplayFactoryError {
    fn from(err: DisplayError) -> Self {
        DisplayFactoryError::DriverInitFailed(err)
    }
}
