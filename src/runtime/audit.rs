//! Runtime lifecycle audit hooks.
//!
//! Records carry a stage identifier plus structured details so callers can
//! log, buffer or assert on the runtime's progression without touching the
//! reconcile loop itself.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::SystemTime;

use serde_json::Value;

/// Lifecycle checkpoints emitted by `Runtime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeAuditStage {
    /// A new runtime instance was constructed.
    RuntimeConstructed,
    /// A widget render function was registered.
    WidgetRegistered,
    /// A reconcile pass finished and its mutations are in the host tree.
    ReconcileCommitted,
    /// A post-render callback was queued.
    CallbackScheduled,
    /// A post-render callback ran after layout was flushed.
    CallbackRan,
    /// A host event finished bubbling.
    EventDispatched,
    /// A handler-requested widget re-render was applied.
    WidgetRerendered,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct RuntimeAuditEvent {
    pub timestamp: SystemTime,
    pub stage: RuntimeAuditStage,
    pub details: Vec<(String, Value)>,
}

impl RuntimeAuditEvent {
    fn new(stage: RuntimeAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Builder helper to append fields ergonomically.
pub struct RuntimeAuditEventBuilder {
    event: RuntimeAuditEvent,
}

impl RuntimeAuditEventBuilder {
    pub fn new(stage: RuntimeAuditStage) -> Self {
        Self {
            event: RuntimeAuditEvent::new(stage),
        }
    }

    pub fn detail(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> RuntimeAuditEvent {
        self.event
    }
}

/// Implemented by any audit sink.
pub trait RuntimeAudit {
    fn record(&self, event: RuntimeAuditEvent);
}

/// No-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullRuntimeAudit;

impl RuntimeAudit for NullRuntimeAudit {
    fn record(&self, _event: RuntimeAuditEvent) {}
}

/// Buffers audit events in memory; clones share the buffer.
#[derive(Debug, Default, Clone)]
pub struct RecordingAudit {
    events: Rc<RefCell<Vec<RuntimeAuditEvent>>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RuntimeAuditEvent> {
        self.events.borrow().clone()
    }

    pub fn stages(&self) -> Vec<RuntimeAuditStage> {
        self.events.borrow().iter().map(|event| event.stage).collect()
    }
}

impl RuntimeAudit for RecordingAudit {
    fn record(&self, event: RuntimeAuditEvent) {
        self.events.borrow_mut().push(event);
    }
}
