/*
 *  main.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
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

use anyhow::{Context, Result};
use env_logger::Env;
use log::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use audiosynth::config::{self, Backend, Config};
use audiosynth::constants::{DEBOUNCE_WINDOW, DURATION_SEC, SAMPLE_RATE_HZ};
use audiosynth::control::{ButtonDebouncer, RequestSlot};
use audiosynth::display::{DisplayDriverFactory, DisplayPresenter};
use audiosynth::hal::emulated::{self, DutyLog, LogPin, SignalGenerator};
use audiosynth::pipeline::{Peripherals, Pipeline, PipelineSettings};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
///
/// Process shutdown only. A running operation is not cancelled, the whole
/// program goes away.
#[cfg(unix)]
async fn signal_handler() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

/// Emulated peripherals; the keyboard stands in for the buttons
fn emulated_peripherals(cfg: &Config) -> Peripherals {
    let generator = cfg.emulated();
    info!(
        "emulated sensor: {:?}, {} Hz, level {}",
        generator.waveform(), generator.frequency_hz(), generator.level()
    );
    Peripherals {
        sensor: Box::new(SignalGenerator::from_config(&generator)),
        actuator: Box::new(DutyLog::untracked().into_actuator()),
        record_led: Box::new(LogPin::new("record").into_indicator()),
        play_led: Box::new(LogPin::new("play").into_indicator()),
    }
}

#[cfg(feature = "hardware")]
fn hardware_peripherals(cfg: &Config) -> Result<Peripherals> {
    use audiosynth::hal::rpi::{GpioLed, Mcp3208, PwmActuator};
    let pins = cfg.pins();
    Ok(Peripherals {
        sensor: Box::new(Mcp3208::new(&pins)?),
        actuator: Box::new(PwmActuator::new(&pins)?),
        record_led: Box::new(GpioLed::new(pins.record_led())?),
        play_led: Box::new(GpioLed::new(pins.play_led())?),
    })
}

#[cfg(not(feature = "hardware"))]
fn hardware_peripherals(_cfg: &Config) -> Result<Peripherals> {
    anyhow::bail!("hardware backend not enabled. Enable with --features hardware")
}

#[tokio::main]
async fn main() -> Result<()> {
    let (cfg, cli) = config::load().context("configuration")?;

    if cli.dump_config {
        println!("{}", config::dump(&cfg)?);
        return Ok(());
    }

    // Initialize the logger with the appropriate level
    let level = cfg.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("This {} records, replays and shows the bars", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    info!("{} s at {} Hz per recording", DURATION_SEC, SAMPLE_RATE_HZ);

    let backend = cfg.backend();
    let display_cfg = cfg.effective_display();
    let driver = DisplayDriverFactory::create_from_config(&display_cfg)
        .context("display initialization")?;
    let presenter = DisplayPresenter::new(driver);

    let peripherals = match backend {
        Backend::Emulated => emulated_peripherals(&cfg),
        Backend::Hardware => hardware_peripherals(&cfg)?,
    };

    let requests = Arc::new(RequestSlot::new());
    let debouncer = Arc::new(ButtonDebouncer::new(Arc::clone(&requests), DEBOUNCE_WINDOW));

    let mut pipeline = Pipeline::new(PipelineSettings::default(), presenter, peripherals, requests)?;
    pipeline.show_idle_banner()?;

    // buttons: GPIO interrupts on hardware, stdin lines when emulated
    #[cfg(feature = "hardware")]
    let _buttons = match backend {
        Backend::Hardware => Some(audiosynth::hal::rpi::Buttons::arm(&cfg.pins(), Arc::clone(&debouncer))?),
        Backend::Emulated => None,
    };
    let keyboard = backend == Backend::Emulated && cfg.emulated().keyboard();
    let keys = async {
        if keyboard {
            emulated::keyboard_buttons(Arc::clone(&debouncer)).await
        } else {
            std::future::pending().await
        }
    };

    tokio::select! {
        result = pipeline.run() => {
            if let Err(e) = &result {
                error!("halted: {}", e);
            }
            result?;
        }
        result = keys => {
            result?;
            info!("quit requested");
        }
        _ = signal_handler() => {
            // The signal_handler function logs the received signal.
        }
    }

    info!("{} stopped", env!("CARGO_PKG_NAME"));
    Ok(())
}
