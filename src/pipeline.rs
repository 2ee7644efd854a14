/*
 *  pipeline.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Main loop - dispatch one operation at a time, keep the panel fed
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
use std::time::Duration;

use log::{debug, info};
use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};

use crate::capture::CaptureEngine;
use crate::clock::{ClockError, ClockHandle, SampleClock, TickHandler};
use crate::constants::{NUM_SAMPLES, SAMPLE_RATE_HZ, TICK_PERIOD};
use crate::control::{CompletionSignal, Operation, OperationState, RequestSlot, StateMachine, StateWatch};
use crate::deck::Deck;
use crate::display::error::DisplayError;
use crate::display::presenter::DisplayPresenter;
use crate::hal::{DutyOutput, HalError, Indicator, SampleSource};
use crate::playback::PlaybackEngine;

/// Idle banner
pub const IDLE_BANNER: [&str; 2] = ["AUDIO SYNTH !", "PRESS A TO REC"];

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("peripheral fault: {0}")]
    Hal(#[from] HalError),
    #[error("display: {0}")]
    Display(#[from] DisplayError),
    #[error("sample clock: {0}")]
    Clock(#[from] ClockError),
    #[error("sample deck lost to an earlier failure")]
    DeckLost,
}

/// Ring size and tick period. Fixed in the binary; tests shrink them.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub capacity: usize,
    pub tick_period: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self { capacity: NUM_SAMPLES, tick_period: TICK_PERIOD }
    }
}

/// Everything outside the display the pipeline drives
pub struct Peripherals {
    pub sensor: Box<dyn SampleSource>,
    pub actuator: Box<dyn DutyOutput>,
    pub record_led: Box<dyn Indicator>,
    pub play_led: Box<dyn Indicator>,
}

pub struct Pipeline {
    machine: StateMachine,
    presenter: DisplayPresenter,
    clock: SampleClock,
    record_led: Box<dyn Indicator>,
    play_led: Box<dyn Indicator>,
    // None only while an engine holds it
    deck: Option<Deck>,
    done: Arc<CompletionSignal>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        presenter: DisplayPresenter,
        peripherals: Peripherals,
        requests: Arc<RequestSlot>,
    ) -> Result<Self, PipelineError> {
        let Peripherals { sensor, actuator, mut record_led, mut play_led } = peripherals;
        record_led.set(false)?;
        play_led.set(false)?;

        let deck = Deck::new(settings.capacity, presenter.surface(), sensor, actuator);
        info!(
            "pipeline: {} samples at {} Hz, tick {:?}",
            settings.capacity, SAMPLE_RATE_HZ, settings.tick_period
        );

        Ok(Self {
            machine: StateMachine::new(requests),
            presenter,
            clock: SampleClock::new(settings.tick_period)?,
            record_led,
            play_led,
            deck: Some(deck),
            done: Arc::new(CompletionSignal::new()),
        })
    }

    pub fn state(&self) -> OperationState {
        self.machine.state()
    }

    pub fn watch(&self) -> StateWatch {
        self.machine.watch()
    }

    pub fn presenter(&self) -> &DisplayPresenter {
        &self.presenter
    }

    /// The sample deck, between operations
    pub fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    /// Draw and transmit the idle banner
    pub fn show_idle_banner(&mut self) -> Result<(), PipelineError> {
        self.presenter.show_splash(&IDLE_BANNER)?;
        Ok(())
    }

    /// One main loop iteration: flush, then run the pending operation, if
    /// any, to completion.
    pub async fn service(&mut self) -> Result<Option<Operation>, PipelineError> {
        self.presenter.flush_if_ready()?;

        let Some(op) = self.machine.poll() else {
            return Ok(None);
        };
        let result = self.run_operation(op).await;
        self.machine.complete();
        result?;

        self.show_idle_banner()?;
        Ok(Some(op))
    }

    /// Serve requests forever. Returns only on a fatal error.
    pub async fn run(&mut self) -> Result<(), PipelineError> {
        let requests = self.machine.requests();
        let mut idle = time::interval(self.presenter.flush_period());
        idle.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            if self.service().await?.is_some() {
                continue;
            }
            tokio::select! {
                _ = requests.wait() => {}
                _ = idle.tick() => {}
            }
        }
    }

    fn indicator(&mut self, op: Operation) -> &mut dyn Indicator {
        match op {
            Operation::Record => self.record_led.as_mut(),
            Operation::Play => self.play_led.as_mut(),
        }
    }

    async fn run_operation(&mut self, op: Operation) -> Result<(), PipelineError> {
        if self.deck.is_none() {
            return Err(PipelineError::DeckLost);
        }
        self.indicator(op).set(true)?;
        let deck = self.deck.take().ok_or(PipelineError::DeckLost)?;

        let (parts, driven) = match op {
            Operation::Record => {
                info!("recording {} samples", deck.ring.capacity());
                let handle = self.clock.start(CaptureEngine::new(deck, Arc::clone(&self.done)));
                let (engine, driven) = self.drive(handle).await;
                (engine.map(CaptureEngine::into_parts), driven)
            }
            Operation::Play => {
                info!("playing {} samples", deck.ring.recorded_len());
                let handle = self.clock.start(PlaybackEngine::new(deck, Arc::clone(&self.done)));
                let (engine, driven) = self.drive(handle).await;
                (engine.map(PlaybackEngine::into_parts), driven)
            }
        };

        // the deck goes back before any error leaves this function
        let mut fault = None;
        if let Some((deck, engine_fault)) = parts {
            if driven.is_ok() && engine_fault.is_none() {
                match op {
                    Operation::Record => info!("recording ready ({} samples)", deck.ring.recorded_len()),
                    Operation::Play => info!("playback done ({} samples)", deck.ring.read_cursor()),
                }
            }
            self.deck = Some(deck);
            fault = engine_fault;
        }
        let led = self.indicator(op).set(false);

        driven?;
        if let Some(fault) = fault {
            return Err(fault.into());
        }
        led?;
        Ok(())
    }

    /// Block this loop iteration until the engine signals completion,
    /// flushing whenever a sweep has made a frame renderable.
    ///
    /// The handler comes back whenever its clock task could be joined, even
    /// when the pass ended on an error.
    async fn drive<H: TickHandler>(
        &mut self,
        handle: ClockHandle<H>,
    ) -> (Option<H>, Result<(), PipelineError>) {
        let done = Arc::clone(&self.done);
        let mut flush = time::interval(self.presenter.flush_period());
        flush.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = done.wait() => break,
                _ = flush.tick() => {
                    if let Err(e) = self.presenter.flush_if_ready() {
                        return (handle.stop().await.ok(), Err(e.into()));
                    }
                }
            }
        }

        match handle.stop().await {
            Ok(handler) => {
                // last sweep of the pass
                let flushed = self.presenter.flush_if_ready().map(|_| ()).map_err(PipelineError::from);
                debug!("{} frames sent so far", self.presenter.frames_sent());
                (Some(handler), flushed)
            }
            Err(e) => (None, Err(e.into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockDriver;
    use crate::display::traits::DisplayDriver;
    use crate::hal::emulated::{DutyHistory, DutyLog, LogPin, SignalGenerator};
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Rig {
        pipeline: Pipeline,
        requests: Arc<RequestSlot>,
        probe: MockDriver,
        history: DutyHistory,
        record_led: Arc<AtomicBool>,
        play_led: Arc<AtomicBool>,
        play_led_fault: Arc<AtomicBool>,
    }

    /// Play LED that refuses to light while `fail` is set
    struct FlakyLed {
        inner: Box<dyn Indicator>,
        fail: Arc<AtomicBool>,
    }

    impl Indicator for FlakyLed {
        fn set(&mut self, on: bool) -> Result<(), HalError> {
            if on && self.fail.load(Ordering::Acquire) {
                return Err(HalError::Indicator("play LED stuck".into()));
            }
            self.inner.set(on)
        }
    }

    fn rig(capacity: usize, level: u16) -> Rig {
        let mut driver = MockDriver::new_with_size(128, 64).unwrap();
        driver.init().unwrap();
        let probe = driver.clone();

        let log = DutyLog::new();
        let history = log.history();
        let (record_pin, play_pin) = (LogPin::new("record"), LogPin::new("play"));
        let (record_led, play_led) = (record_pin.probe(), play_pin.probe());

        let play_led_fault = Arc::new(AtomicBool::new(false));
        let flaky = FlakyLed {
            inner: Box::new(play_pin.into_indicator()),
            fail: Arc::clone(&play_led_fault),
        };

        let requests = Arc::new(RequestSlot::new());
        let pipeline = Pipeline::new(
            PipelineSettings { capacity, tick_period: TICK_PERIOD },
            DisplayPresenter::new(Box::new(driver)),
            Peripherals {
                sensor: Box::new(SignalGenerator::constant(level)),
                actuator: Box::new(log.into_actuator()),
                record_led: Box::new(record_pin.into_indicator()),
                play_led: Box::new(flaky),
            },
            Arc::clone(&requests),
        )
        .unwrap();

        Rig { pipeline, requests, probe, history, record_led, play_led, play_led_fault }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_service_is_noop() {
        let mut rig = rig(48, 0);
        assert_eq!(rig.pipeline.service().await.unwrap(), None);
        assert_eq!(rig.pipeline.state(), OperationState::Idle);
        assert_eq!(rig.probe.state().lock().unwrap().frames_written, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_then_play() {
        let mut rig = rig(480, 4095);

        rig.requests.publish(Operation::Record);
        assert_eq!(rig.pipeline.service().await.unwrap(), Some(Operation::Record));
        assert_eq!(rig.pipeline.state(), OperationState::Idle);
        let deck = rig.pipeline.deck().unwrap();
        assert_eq!(deck.ring.recorded_len(), 480);
        assert!(deck.ring.recording().iter().all(|s| *s == 255));
        assert!(!rig.record_led.load(Ordering::Acquire));

        rig.requests.publish(Operation::Play);
        assert_eq!(rig.pipeline.service().await.unwrap(), Some(Operation::Play));
        let duties = rig.history.lock().unwrap().clone();
        assert_eq!(duties.len(), 480);
        assert!(duties.iter().all(|d| *d == 220));
        assert!(!rig.play_led.load(Ordering::Acquire));

        // blank frame, at least one sweep, idle banner
        assert!(rig.pipeline.presenter().frames_sent() >= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_led_lit_during_operation() {
        let mut rig = rig(16_000, 2048);
        let watch = rig.pipeline.watch();
        let record_led = Arc::clone(&rig.record_led);

        rig.requests.publish(Operation::Record);
        let observer = async {
            while watch.get() != OperationState::Recording {
                tokio::task::yield_now().await;
            }
            assert!(record_led.load(Ordering::Acquire));
        };
        let (served, ()) = tokio::join!(rig.pipeline.service(), observer);
        assert_eq!(served.unwrap(), Some(Operation::Record));
        assert!(!rig.record_led.load(Ordering::Acquire));
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_without_recording_completes() {
        let mut rig = rig(48, 0);
        rig.requests.publish(Operation::Play);
        assert_eq!(rig.pipeline.service().await.unwrap(), Some(Operation::Play));
        assert!(rig.history.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_fault_is_fatal() {
        let mut rig = rig(48, 4095);
        rig.probe.state().lock().unwrap().simulate_write_failure = true;
        rig.requests.publish(Operation::Record);
        assert!(matches!(rig.pipeline.service().await, Err(PipelineError::Display(_))));
        assert_eq!(rig.pipeline.state(), OperationState::Idle);
        assert!(!rig.record_led.load(Ordering::Acquire));

        // the deck survives the fault and serves the next request
        assert!(rig.pipeline.deck().is_some());
        rig.probe.state().lock().unwrap().simulate_write_failure = false;
        rig.requests.publish(Operation::Record);
        assert_eq!(rig.pipeline.service().await.unwrap(), Some(Operation::Record));
        assert_eq!(rig.pipeline.deck().unwrap().ring.recorded_len(), 48);
    }

    #[tokio::test(start_paused = true)]
    async fn test_indicator_fault_keeps_recording() {
        let mut rig = rig(48, 4095);
        rig.requests.publish(Operation::Record);
        assert_eq!(rig.pipeline.service().await.unwrap(), Some(Operation::Record));

        rig.play_led_fault.store(true, Ordering::Release);
        rig.requests.publish(Operation::Play);
        assert!(matches!(
            rig.pipeline.service().await,
            Err(PipelineError::Hal(HalError::Indicator(_)))
        ));
        assert_eq!(rig.pipeline.state(), OperationState::Idle);
        assert!(rig.history.lock().unwrap().is_empty());

        let deck = rig.pipeline.deck().unwrap();
        assert_eq!(deck.ring.recorded_len(), 48);

        rig.play_led_fault.store(false, Ordering::Release);
        rig.requests.publish(Operation::Play);
        assert_eq!(rig.pipeline.service().await.unwrap(), Some(Operation::Play));
        assert_eq!(rig.history.lock().unwrap().len(), 48);
        assert!(!rig.play_led.load(Ordering::Acquire));
    }
}
