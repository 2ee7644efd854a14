/*
 *  clock.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sample clock - fixed period ticks on a tokio task
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

use std::time::Duration;

use log::debug;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

#[derive(Debug, Error)]
pub enum ClockError {
    #[error("tick period must be non-zero")]
    ZeroPeriod,
    #[error("clock task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Returned by every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Work done once per period. Must not block.
pub trait TickHandler: Send + 'static {
    fn on_tick(&mut self) -> TickControl;
}

/// Periodic ticker, restartable once per operation.
///
/// Host timers are coarser than a 16 kHz period, so late ticks are delivered
/// back to back and the average rate holds.
#[derive(Debug, Clone, Copy)]
pub struct SampleClock {
    period: Duration,
}

impl SampleClock {
    pub fn new(period: Duration) -> Result<Self, ClockError> {
        if period.is_zero() {
            return Err(ClockError::ZeroPeriod);
        }
        Ok(Self { period })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick `handler` once per period until it returns `Stop` or the handle
    /// stops it. Must be called inside a tokio runtime.
    pub fn start<H: TickHandler>(&self, mut handler: H) -> ClockHandle<H> {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let period = self.period;

        let join = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            let mut ticks: u64 = 0;

            loop {
                tokio::select! {
                    biased;

                    // stop request, or the handle went away
                    _ = &mut stop_rx => {
                        debug!("sample clock stopped after {} ticks", ticks);
                        break;
                    }

                    _ = interval.tick() => {
                        ticks += 1;
                        if handler.on_tick() == TickControl::Stop {
                            debug!("sample clock finished after {} ticks", ticks);
                            break;
                        }
                    }
                }
            }
            handler
        });

        ClockHandle { stop_tx, join }
    }
}

/// A running clock. Dropping it closes the stop channel, which stops the
/// clock as well.
pub struct ClockHandle<H> {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<H>,
}

impl<H> ClockHandle<H> {
    /// The handler returned `Stop`, or the clock was stopped
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop ticking and hand the handler back
    pub async fn stop(self) -> Result<H, ClockError> {
        // receiver is gone if the handler already stopped on its own
        let _ = self.stop_tx.send(());
        Ok(self.join.await?)
    }
}
