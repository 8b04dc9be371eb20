//! Process-wide ledger of acquired and released resources.
//!
//! Every `ClientContext` and every opened output sink is recorded here on acquisition and on
//! release, so one can check after a run that nothing was left open.
//!

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Resource {
    Context,
    Sink,
}

static CONTEXT_ACQUIRED: AtomicUsize = AtomicUsize::new(0);
static CONTEXT_RELEASED: AtomicUsize = AtomicUsize::new(0);
static SINK_ACQUIRED: AtomicUsize = AtomicUsize::new(0);
static SINK_RELEASED: AtomicUsize = AtomicUsize::new(0);

/// Snapshot of the counters.
///
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Ledger {
    pub contexts_acquired: usize,
    pub contexts_released: usize,
    pub sinks_acquired: usize,
    pub sinks_released: usize,
}

impl Ledger {
    /// Resources currently held.
    ///
    pub fn outstanding(&self) -> usize {
        self.contexts_acquired.saturating_sub(self.contexts_released)
            + self.sinks_acquired.saturating_sub(self.sinks_released)
    }
}

fn counters(r: Resource) -> (&'static AtomicUsize, &'static AtomicUsize) {
    match r {
        Resource::Context => (&CONTEXT_ACQUIRED, &CONTEXT_RELEASED),
        Resource::Sink => (&SINK_ACQUIRED, &SINK_RELEASED),
    }
}

pub(crate) fn acquire(r: Resource) {
    let n = counters(r).0.fetch_add(1, Ordering::SeqCst);
    trace!("acquire {r:?} (#{})", n + 1);
}

pub(crate) fn release(r: Resource) {
    let n = counters(r).1.fetch_add(1, Ordering::SeqCst);
    trace!("release {r:?} (#{})", n + 1);
}

pub fn ledger() -> Ledger {
    Ledger {
        contexts_acquired: CONTEXT_ACQUIRED.load(Ordering::SeqCst),
        contexts_released: CONTEXT_RELEASED.load(Ordering::SeqCst),
        sinks_acquired: SINK_ACQUIRED.load(Ordering::SeqCst),
        sinks_released: SINK_RELEASED.load(Ordering::SeqCst),
    }
}
