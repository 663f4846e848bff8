//! Timer-based one-shot event scheduler.
//!
//! Events are registered with a fire time and executed the first time the
//! schedule is polled at or past that time. Fired events are removed, so
//! each event runs at most once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single scheduled action.
pub struct Event {
    /// Time at or after which the action fires.
    pub at: f64,
    /// Action to run when the event fires.
    pub action: Box<dyn FnMut() + Send>,
    /// Optional note logged when the event fires.
    pub note: Option<String>,
}

/// An ordered collection of one-shot timed events.
#[derive(Default)]
pub struct EventSchedule {
    events: Vec<Event>,
}

impl EventSchedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action to fire once `t >= at`.
    pub fn push(&mut self, at: f64, action: impl FnMut() + Send + 'static) {
        self.events.push(Event {
            at,
            action: Box::new(action),
            note: None,
        });
    }

    /// Registers an action with a note that is logged when it fires.
    pub fn push_with_note(
        &mut self,
        at: f64,
        note: impl Into<String>,
        action: impl FnMut() + Send + 'static,
    ) {
        self.events.push(Event {
            at,
            action: Box::new(action),
            note: Some(note.into()),
        });
    }

    /// Number of events still waiting to fire.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Runs every event whose fire time has arrived and removes it.
    ///
    /// Returns the number of events fired.
    pub fn fire_due(&mut self, t: f64) -> usize {
        let mut fired = 0usize;
        let mut idx = 0usize;
        while idx < self.events.len() {
            if t >= self.events[idx].at {
                let mut event = self.events.remove(idx);
                (event.action)();
                if let Some(note) = &event.note {
                    tracing::info!(at = event.at, note = %note, "event fired");
                }
                fired += 1;
            } else {
                idx += 1;
            }
        }
        fired
    }
}

/// Sets the shared flag observed by its paired [`Listener`].
#[derive(Clone)]
pub struct Trigger(Arc<AtomicBool>);

impl Trigger {
    /// Marks the pair as fired.
    pub fn fire(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Observes whether its paired [`Trigger`] has fired.
#[derive(Clone)]
pub struct Listener(Arc<AtomicBool>);

impl Listener {
    /// Whether the paired trigger has fired.
    pub fn fired(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Creates a connected trigger/listener pair around a shared flag.
pub fn listener_pair() -> (Trigger, Listener) {
    let flag = Arc::new(AtomicBool::new(false));
    (Trigger(Arc::clone(&flag)), Listener(flag))
}
