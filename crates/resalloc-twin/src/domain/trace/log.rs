//! Event Log - Bounded Structured Recorder
//!
//! Every recorded event is also forwarded to `tracing` at debug level, so a
//! subscriber sees the full trace even when the in-memory log is disabled or
//! full.

use super::event::SimEvent;
use serde::{Deserialize, Serialize};

/// Default in-memory capacity
pub const DEFAULT_MAX_EVENTS: usize = 100_000;

/// Recorder configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    /// Keep events in memory
    pub enabled: bool,
    /// In-memory capacity; later events are counted as dropped
    pub max_events: usize,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

/// Ordered in-memory event stream
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    config: EventLogConfig,
    events: Vec<SimEvent>,
    dropped: usize,
}

impl EventLog {
    /// Create a recorder with `config`
    pub fn new(config: EventLogConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            dropped: 0,
        }
    }

    /// Recorder that only forwards to `tracing`
    pub fn disabled() -> Self {
        Self::new(EventLogConfig {
            enabled: false,
            max_events: 0,
        })
    }

    /// Record one event
    pub fn record(&mut self, event: SimEvent) {
        tracing::debug!(cycle = event.cycle, task = ?event.task, "{event}");

        if !self.config.enabled {
            return;
        }
        if self.events.len() >= self.config.max_events {
            self.dropped += 1;
            return;
        }
        self.events.push(event);
    }

    /// Recorded events in order
    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Events past capacity that were not kept
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of kept events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// No kept events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Kept events concerning `task`
    pub fn for_task(
        &self,
        task: crate::domain::TaskId,
    ) -> impl Iterator<Item = &SimEvent> + '_ {
        self.events.iter().filter(move |e| e.task == Some(task))
    }

    /// Consume the log
    pub fn into_events(self) -> Vec<SimEvent> {
        self.events
    }
}
