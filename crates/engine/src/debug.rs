//! Debug Log Ring — a bounded FIFO of per-node execution events, kept in
//! memory for inspection via the API while a flow is being developed.
//! Writes are a no-op unless debug logging is enabled, so a production
//! deployment that never turns it on pays no allocation cost per node.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 50;

/// A single recorded event for one node during one execution.
#[derive(Debug, Clone, Serialize)]
pub struct DebugLogEntry {
    pub timestamp: DateTime<Utc>,
    pub flow_id: Uuid,
    pub node_id: String,
    pub node_name: String,
    pub event: DebugEvent,
    pub details: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DebugEvent {
    Start,
    InputResolved,
    End,
    Error,
    Info,
}

/// Bounded ring buffer of the most recent debug log entries across all
/// flows and executions in this process.
pub struct DebugLog {
    enabled: std::sync::atomic::AtomicBool,
    entries: Mutex<VecDeque<DebugLogEntry>>,
    capacity: usize,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            enabled: std::sync::atomic::AtomicBool::new(false),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn log(
        &self,
        flow_id: Uuid,
        node_id: impl Into<String>,
        node_name: impl Into<String>,
        event: DebugEvent,
        details: Value,
    ) {
        if !self.is_enabled() {
            return;
        }

        let entry = DebugLogEntry {
            timestamp: Utc::now(),
            flow_id,
            node_id: node_id.into(),
            node_name: node_name.into(),
            event,
            details,
        };

        tracing::debug!(
            flow_id = %entry.flow_id,
            node_id = %entry.node_id,
            event = ?entry.event,
            "{}",
            entry.node_name
        );

        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Most recent entries first.
    pub fn recent(&self) -> Vec<DebugLogEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().cloned().collect()
    }

    /// Entries strictly after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> Vec<DebugLogEntry> {
        let entries = self.entries.lock().unwrap();
        entries.iter().filter(|e| e.timestamp > since).cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_logger_records_nothing() {
        let log = DebugLog::default();
        log.log(Uuid::new_v4(), "n1", "Node", DebugEvent::Start, Value::Null);
        assert!(log.recent().is_empty());
    }

    #[test]
    fn enabled_logger_records_and_bounds_entries() {
        let log = DebugLog::new(2);
        log.set_enabled(true);
        let flow_id = Uuid::new_v4();
        log.log(flow_id, "n1", "One", DebugEvent::Start, Value::Null);
        log.log(flow_id, "n2", "Two", DebugEvent::Start, Value::Null);
        log.log(flow_id, "n3", "Three", DebugEvent::Start, Value::Null);

        let recent = log.recent();
        assert_eq!(recent.len(), 2);
        // Most recent first.
        assert_eq!(recent[0].node_id, "n3");
        assert_eq!(recent[1].node_id, "n2");
    }

    #[test]
    fn clear_empties_the_ring() {
        let log = DebugLog::new(5);
        log.set_enabled(true);
        log.log(Uuid::new_v4(), "n1", "One", DebugEvent::Start, Value::Null);
        log.clear();
        assert!(log.recent().is_empty());
    }
}
