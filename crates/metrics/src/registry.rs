//! Metric registries
//!
//! [`Registry`] aggregates every handle it has handed out and produces a
//! serialisable [`Snapshot`]. [`Noop`] hands out fresh disconnected
//! handles, so instrumented code runs unchanged in tests.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use crate::{Counter, Gauge, Metrics, Timer, TimerSummary};

#[derive(Debug, Default)]
struct Handles {
    counters: HashMap<String, Counter>,
    gauges: HashMap<String, Gauge>,
    timers: HashMap<String, Timer>,
}

/// In-memory metrics registry.
///
/// Handles for the same path share one cell; lookups take a write lock
/// only on first resolution, and components resolve their handles once at
/// construction.
#[derive(Debug, Default)]
pub struct Registry {
    handles: RwLock<Handles>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time view of every registered metric, ordered by path.
    pub fn snapshot(&self) -> Snapshot {
        let handles = self.handles.read();
        Snapshot {
            counters: handles
                .counters
                .iter()
                .map(|(path, c)| (path.clone(), c.get()))
                .collect(),
            gauges: handles
                .gauges
                .iter()
                .map(|(path, g)| (path.clone(), g.get()))
                .collect(),
            timers: handles
                .timers
                .iter()
                .map(|(path, t)| (path.clone(), t.summary()))
                .collect(),
        }
    }
}

impl Metrics for Registry {
    fn counter(&self, path: &str) -> Counter {
        if let Some(counter) = self.handles.read().counters.get(path) {
            return counter.clone();
        }
        self.handles
            .write()
            .counters
            .entry(path.to_owned())
            .or_default()
            .clone()
    }

    fn gauge(&self, path: &str) -> Gauge {
        if let Some(gauge) = self.handles.read().gauges.get(path) {
            return gauge.clone();
        }
        self.handles
            .write()
            .gauges
            .entry(path.to_owned())
            .or_default()
            .clone()
    }

    fn timer(&self, path: &str) -> Timer {
        if let Some(timer) = self.handles.read().timers.get(path) {
            return timer.clone();
        }
        self.handles
            .write()
            .timers
            .entry(path.to_owned())
            .or_default()
            .clone()
    }
}

/// Serialisable view of a [`Registry`].
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Snapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, i64>,
    pub timers: BTreeMap<String, TimerSummary>,
}

/// Metrics provider whose handles are not aggregated anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

impl Metrics for Noop {
    fn counter(&self, _path: &str) -> Counter {
        Counter::new()
    }

    fn gauge(&self, _path: &str) -> Gauge {
        Gauge::new()
    }

    fn timer(&self, _path: &str) -> Timer {
        Timer::new()
    }
}
