//! Listener registration and off-thread delivery.
//!
//! The capture worker never calls user code directly. Per-chunk telemetry
//! goes through a bounded channel and may be dropped when listeners fall
//! behind. State changes travel on their own queue, are never dropped, and
//! are delivered ahead of any queued telemetry.

use super::RecorderState;
use crate::lock_or_recover;
use crossbeam_channel::{bounded, select, unbounded, Receiver, SendTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub type AmplitudeListener = Box<dyn FnMut(i32) + Send>;
pub type RawChunkListener = Box<dyn FnMut(&[u8]) + Send>;
pub type ElapsedListener = Box<dyn FnMut(u64) + Send>;
pub type StateListener = Box<dyn FnMut(RecorderState) + Send>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecorderEvent {
    State(RecorderState),
    RawChunk(Vec<u8>),
    Amplitude(i32),
    ElapsedMillis(u64),
}

/// One optional observer per event kind. Registering again replaces it.
#[derive(Default)]
pub(crate) struct Listeners {
    pub(crate) amplitude: Option<AmplitudeListener>,
    pub(crate) raw_chunk: Option<RawChunkListener>,
    pub(crate) elapsed_millis: Option<ElapsedListener>,
    pub(crate) elapsed_seconds: Option<ElapsedListener>,
    pub(crate) state: Option<StateListener>,
}

/// Run the listener for `event` without holding the lock during the call,
/// so a listener may register listeners on the same session.
fn deliver(listeners: &Mutex<Listeners>, event: RecorderEvent) {
    match event {
        RecorderEvent::State(state) => call(listeners, |l| &mut l.state, |f| f(state)),
        RecorderEvent::RawChunk(bytes) => {
            call(listeners, |l| &mut l.raw_chunk, |f| f(bytes.as_slice()))
        }
        RecorderEvent::Amplitude(level) => call(listeners, |l| &mut l.amplitude, |f| f(level)),
        RecorderEvent::ElapsedMillis(millis) => {
            call(listeners, |l| &mut l.elapsed_millis, |f| f(millis));
            call(listeners, |l| &mut l.elapsed_seconds, |f| f(millis / 1000));
        }
    }
}

fn call<L>(
    listeners: &Mutex<Listeners>,
    slot: fn(&mut Listeners) -> &mut Option<L>,
    invoke: impl FnOnce(&mut L),
) {
    let taken = slot(&mut lock_or_recover(listeners, "event dispatcher")).take();
    let Some(mut listener) = taken else {
        return;
    };
    invoke(&mut listener);
    let mut guard = lock_or_recover(listeners, "event dispatcher");
    let entry = slot(&mut guard);
    // A listener registered during the call replaces this one.
    if entry.is_none() {
        *entry = Some(listener);
    }
}

/// Worker-side handle of the event channel.
///
/// Every telemetry send made after [`EventSender::arm`] shares one deadline,
/// so the events for a single chunk together wait at most one chunk's
/// duration. Events that miss the deadline are dropped and counted. State
/// changes are queued without a bound.
#[derive(Clone)]
pub(crate) struct EventSender {
    tx: Sender<RecorderEvent>,
    state_tx: Sender<RecorderState>,
    dropped: Arc<AtomicUsize>,
    origin: Instant,
    deadline_us: Arc<AtomicU64>,
}

impl EventSender {
    pub(crate) fn arm(&self, budget: Duration) {
        let deadline = self.origin.elapsed().saturating_add(budget);
        let micros = u64::try_from(deadline.as_micros()).unwrap_or(u64::MAX);
        self.deadline_us.store(micros, Ordering::Relaxed);
    }

    pub(crate) fn emit(&self, event: RecorderEvent) {
        if let RecorderEvent::State(state) = event {
            let _ = self.state_tx.send(state);
            return;
        }
        let deadline =
            self.origin + Duration::from_micros(self.deadline_us.load(Ordering::Relaxed));
        let wait = deadline.saturating_duration_since(Instant::now());
        match self.tx.send_timeout(event, wait) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::warn!(?event, dropped, "listener dispatch behind; event dropped");
            }
            Err(SendTimeoutError::Disconnected(_)) => {}
        }
    }

    pub(crate) fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Dispatcher side of the event queues.
pub(crate) struct EventReceiver {
    telemetry: Receiver<RecorderEvent>,
    states: Receiver<RecorderState>,
}

impl EventReceiver {
    /// Next event, pending state changes first. `None` once every sender is
    /// gone and both queues are drained.
    fn recv(&self) -> Option<RecorderEvent> {
        if let Ok(state) = self.states.try_recv() {
            return Some(RecorderEvent::State(state));
        }
        select! {
            recv(self.states) -> state => match state {
                Ok(state) => Some(RecorderEvent::State(state)),
                Err(_) => self.telemetry.recv().ok(),
            },
            recv(self.telemetry) -> event => match event {
                Ok(event) => Some(event),
                Err(_) => self.states.recv().ok().map(RecorderEvent::State),
            },
        }
    }
}

/// Create the channel pair. `capacity` bounds the number of queued
/// telemetry events.
pub(crate) fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    let (tx, telemetry) = bounded(capacity.max(1));
    let (state_tx, states) = unbounded();
    let sender = EventSender {
        tx,
        state_tx,
        dropped: Arc::new(AtomicUsize::new(0)),
        origin: Instant::now(),
        deadline_us: Arc::new(AtomicU64::new(0)),
    };
    (sender, EventReceiver { telemetry, states })
}

/// Deliver events until every [`EventSender`] is gone and the queues drain.
pub(crate) fn spawn_dispatcher(
    rx: EventReceiver,
    listeners: Arc<Mutex<Listeners>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Some(event) = rx.recv() {
            deliver(&listeners, event);
        }
    })
}
