/*
 *  control.rs
 *
 *  AudioSynth - record, replay, watch the bars
 *  (c) 2020-26 Stuart Hunter
 *
 *  Buttons, requests and the run-to-completion state machine
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

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::Notify;

/// What a button asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Record,
    Play,
}

impl Operation {
    fn code(self) -> u8 {
        match self {
            Operation::Record => 1,
            Operation::Play => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Operation::Record),
            2 => Some(Operation::Play),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self.code() as usize - 1
    }

    /// State entered when this operation is dispatched
    pub fn state(self) -> OperationState {
        match self {
            Operation::Record => OperationState::Recording,
            Operation::Play => OperationState::Playing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    Idle,
    Recording,
    Playing,
}

impl OperationState {
    fn code(self) -> u8 {
        match self {
            OperationState::Idle => 0,
            OperationState::Recording => 1,
            OperationState::Playing => 2,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            1 => OperationState::Recording,
            2 => OperationState::Playing,
            _ => OperationState::Idle,
        }
    }
}

const NO_REQUEST: u8 = 0;

/// One latched request, last write wins.
///
/// Written from the input context, taken by the main loop.
#[derive(Debug, Default)]
pub struct RequestSlot {
    pending: AtomicU8,
    notify: Notify,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latch `op`, replacing anything not yet taken
    pub fn publish(&self, op: Operation) {
        let replaced = self.pending.swap(op.code(), Ordering::AcqRel);
        if let Some(previous) = Operation::from_code(replaced) {
            debug!("pending {:?} request replaced by {:?}", previous, op);
        }
        self.notify.notify_one();
    }

    pub fn peek(&self) -> Option<Operation> {
        Operation::from_code(self.pending.load(Ordering::Acquire))
    }

    pub fn take(&self) -> Option<Operation> {
        Operation::from_code(self.pending.swap(NO_REQUEST, Ordering::AcqRel))
    }

    /// Resolve once something is latched. Does not take it.
    pub async fn wait(&self) {
        while self.peek().is_none() {
            self.notify.notified().await;
        }
    }
}

/// Per-source edge filter.
///
/// Timestamps are microseconds since `anchor`, offset by one so zero can
/// mean "never accepted".
#[derive(Debug)]
pub struct ButtonDebouncer {
    requests: Arc<RequestSlot>,
    window: Duration,
    anchor: Instant,
    last_accepted: [AtomicU64; 2],
}

impl ButtonDebouncer {
    pub fn new(requests: Arc<RequestSlot>, window: Duration) -> Self {
        Self {
            requests,
            window,
            anchor: Instant::now(),
            last_accepted: [AtomicU64::new(0), AtomicU64::new(0)],
        }
    }

    /// Accept the edge iff at least `window` has passed since the last
    /// accepted edge from the same source; an accepted edge publishes a
    /// request for `source`.
    pub fn on_edge(&self, source: Operation, now: Instant) -> bool {
        let stamp = now.saturating_duration_since(self.anchor).as_micros() as u64 + 1;
        let window = self.window.as_micros() as u64;
        let cell = &self.last_accepted[source.slot()];

        let mut previous = cell.load(Ordering::Acquire);
        loop {
            if previous != 0 && stamp.saturating_sub(previous) < window {
                return false;
            }
            match cell.compare_exchange_weak(previous, stamp, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => break,
                Err(actual) => previous = actual,
            }
        }

        debug!("{:?} edge accepted", source);
        self.requests.publish(source);
        true
    }
}

/// Read-only view of the current state for observers outside the main loop
#[derive(Debug, Clone)]
pub struct StateWatch {
    cell: Arc<AtomicU8>,
}

impl StateWatch {
    pub fn get(&self) -> OperationState {
        OperationState::from_code(self.cell.load(Ordering::Acquire))
    }
}

/// Run-to-completion scheduler. Owned by the main loop.
#[derive(Debug)]
pub struct StateMachine {
    requests: Arc<RequestSlot>,
    state: Arc<AtomicU8>,
}

impl StateMachine {
    pub fn new(requests: Arc<RequestSlot>) -> Self {
        Self {
            requests,
            state: Arc::new(AtomicU8::new(OperationState::Idle.code())),
        }
    }

    pub fn state(&self) -> OperationState {
        OperationState::from_code(self.state.load(Ordering::Acquire))
    }

    pub fn watch(&self) -> StateWatch {
        StateWatch { cell: Arc::clone(&self.state) }
    }

    pub fn requests(&self) -> Arc<RequestSlot> {
        Arc::clone(&self.requests)
    }

    fn enter(&self, state: OperationState) {
        self.state.store(state.code(), Ordering::Release);
    }

    /// Dispatch the latched request, only from Idle.
    ///
    /// While an operation is active the request stays latched and this is
    /// a no-op.
    pub fn poll(&mut self) -> Option<Operation> {
        if self.state() != OperationState::Idle {
            return None;
        }
        let op = self.requests.take()?;
        self.enter(op.state());
        info!("{:?} -> {:?}", OperationState::Idle, op.state());
        Some(op)
    }

    /// The active engine finished
    pub fn complete(&mut self) {
        let finished = self.state();
        if finished != OperationState::Idle {
            self.enter(OperationState::Idle);
            info!("{:?} -> {:?}", finished, OperationState::Idle);
        }
    }
}

/// Set once by the tick context, awaited by the main loop
#[derive(Debug, Default)]
pub struct CompletionSignal {
    done: AtomicBool,
    notify: Notify,
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        self.done.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn is_signaled(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        self.done.store(false, Ordering::Release);
    }

    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // register before the check so a signal in between is not missed
            notified.as_mut().enable();
            if self.is_signaled() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEBOUNCE_WINDOW;

    fn debouncer() -> (ButtonDebouncer, Arc<RequestSlot>) {
        let slot = Arc::new(RequestSlot::new());
        (ButtonDebouncer::new(Arc::clone(&slot), DEBOUNCE_WINDOW), slot)
    }

    #[test]
    fn test_debounce_collapses_close_edges() {
        let (debouncer, slot) = debouncer();
        let t0 = Instant::now();

        assert!(debouncer.on_edge(Operation::Record, t0));
        assert!(!debouncer.on_edge(Operation::Record, t0 + Duration::from_millis(50)));
        assert!(!debouncer.on_edge(Operation::Record, t0 + Duration::from_millis(199)));
        assert_eq!(slot.take(), Some(Operation::Record));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn test_debounce_accepts_spaced_edges() {
        let (debouncer, slot) = debouncer();
        let t0 = Instant::now();

        assert!(debouncer.on_edge(Operation::Play, t0));
        assert_eq!(slot.take(), Some(Operation::Play));
        assert!(debouncer.on_edge(Operation::Play, t0 + Duration::from_millis(250)));
        assert_eq!(slot.take(), Some(Operation::Play));
    }

    #[test]
    fn test_debounce_window_is_inclusive() {
        let (debouncer, _) = debouncer();
        let t0 = Instant::now();
        assert!(debouncer.on_edge(Operation::Play, t0));
        assert!(debouncer.on_edge(Operation::Play, t0 + DEBOUNCE_WINDOW));
    }

    #[test]
    fn test_debounce_is_per_source() {
        let (debouncer, slot) = debouncer();
        let t0 = Instant::now();

        assert!(debouncer.on_edge(Operation::Record, t0));
        assert!(debouncer.on_edge(Operation::Play, t0 + Duration::from_millis(10)));
        assert_eq!(slot.take(), Some(Operation::Play));
    }

    #[test]
    fn test_request_slot_last_write_wins() {
        let slot = RequestSlot::new();
        slot.publish(Operation::Record);
        slot.publish(Operation::Play);
        assert_eq!(slot.peek(), Some(Operation::Play));
        assert_eq!(slot.take(), Some(Operation::Play));
        assert_eq!(slot.peek(), None);
    }

    #[test]
    fn test_idle_poll_without_request_is_noop() {
        let mut machine = StateMachine::new(Arc::new(RequestSlot::new()));
        assert_eq!(machine.poll(), None);
        machine.complete();
        assert_eq!(machine.state(), OperationState::Idle);
    }

    #[test]
    fn test_non_preemption() {
        let slot = Arc::new(RequestSlot::new());
        let mut machine = StateMachine::new(Arc::clone(&slot));
        let watch = machine.watch();

        slot.publish(Operation::Play);
        assert_eq!(machine.poll(), Some(Operation::Play));
        assert_eq!(watch.get(), OperationState::Playing);

        // record edge while playing
        slot.publish(Operation::Record);
        for _ in 0..3 {
            assert_eq!(machine.poll(), None);
            assert_eq!(machine.state(), OperationState::Playing);
        }
        assert_eq!(slot.peek(), Some(Operation::Record));

        machine.complete();
        assert_eq!(machine.state(), OperationState::Idle);
        assert_eq!(machine.poll(), Some(Operation::Record));
        assert_eq!(watch.get(), OperationState::Recording);
    }

    #[test]
    fn test_latest_request_during_operation_runs_next() {
        let slot = Arc::new(RequestSlot::new());
        let mut machine = StateMachine::new(Arc::clone(&slot));

        slot.publish(Operation::Record);
        machine.poll();
        slot.publish(Operation::Record);
        slot.publish(Operation::Play);
        machine.complete();

        assert_eq!(machine.poll(), Some(Operation::Play));
        machine.complete();
        assert_eq!(machine.poll(), None);
    }

    #[tokio::test]
    async fn test_completion_signal_wakes_waiter() {
        let done = Arc::new(CompletionSignal::new());
        let signaller = Arc::clone(&done);

        let waiter = tokio::spawn(async move { done.wait().await });
        tokio::task::yield_now().await;
        signaller.signal();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter not woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_completion_signal_already_set() {
        let done = CompletionSignal::new();
        done.signal();
        done.wait().await;
        done.reset();
        assert!(!done.is_signaled());
    }

    #[tokio::test]
    async fn test_request_slot_wait() {
        let slot = Arc::new(RequestSlot::new());
        let publisher = Arc::clone(&slot);
        tokio::spawn(async move { publisher.publish(Operation::Record) });

        tokio::time::timeout(Duration::from_secs(1), slot.wait())
            .await
            .expect("request not seen");
        assert_eq!(slot.take(), Some(Operation::Record));
    }
}
