use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::logging::Logger;
use crate::metrics::ReconcileMetrics;
use crate::registry::{Diagnostic, ErrorSink};

pub const DIAGNOSTICS_TARGET: &str = "direct::diagnostics";

/// Default [`ErrorSink`]: writes each diagnostic as a `Warn` record naming
/// the widget and the offending model.
#[derive(Debug)]
pub struct LogErrorSink {
    logger: Logger,
    target: String,
}

impl LogErrorSink {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            target: DIAGNOSTICS_TARGET.to_string(),
        }
    }

    pub fn stderr() -> Self {
        Self::new(Logger::stderr())
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }
}

impl ErrorSink for LogErrorSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let _ = self.logger.log_event(diagnostic.to_log_event(&self.target));
    }
}

/// Keeps every diagnostic in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct CollectingErrorSink {
    diagnostics: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.diagnostics.borrow_mut().clear();
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic.clone());
    }
}

/// Periodically emits reconcile metric snapshots through a logger.
pub struct MetricsReporter {
    logger: Logger,
    metrics: Arc<Mutex<ReconcileMetrics>>,
    target: String,
    interval: Duration,
    last_emit: Option<Instant>,
    started_at: Instant,
}

impl MetricsReporter {
    pub fn new(logger: Logger, metrics: Arc<Mutex<ReconcileMetrics>>) -> Self {
        Self {
            logger,
            metrics,
            target: "direct::metrics".to_string(),
            interval: Duration::from_secs(5),
            last_emit: None,
            started_at: Instant::now(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Emit a snapshot unless one went out less than `interval` ago.
    /// A zero interval disables periodic snapshots.
    pub fn maybe_emit(&mut self) -> bool {
        if self.interval.is_zero() {
            return false;
        }

        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.duration_since(last) < self.interval {
                return false;
            }
        }
        self.last_emit = Some(now);
        self.emit_at(now)
    }

    /// Emit a snapshot now, regardless of the interval.
    pub fn flush(&mut self) -> bool {
        let now = Instant::now();
        self.last_emit = Some(now);
        self.emit_at(now)
    }

    fn emit_at(&self, now: Instant) -> bool {
        let uptime = now.duration_since(self.started_at);
        match self.metrics.lock() {
            Ok(guard) => {
                let event = guard.snapshot(uptime).to_log_event(&self.target);
                self.logger.log_event(event).is_ok()
            }
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for MetricsReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsReporter")
            .field("target", &self.target)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
