use crate::logging::{LogEvent, LogFields, LogLevel};
use serde_json::json;
use std::time::Duration;

/// Per-pass tallies accumulated by the reconciler.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub nodes_created: u64,
    pub nodes_reused: u64,
    pub nodes_replaced: u64,
    pub nodes_removed: u64,
    pub text_updates: u64,
    pub attribute_sets: u64,
    pub attribute_removals: u64,
    pub property_sets: u64,
    pub property_clears: u64,
    pub listener_attaches: u64,
    pub listener_detaches: u64,
    pub child_moves: u64,
    pub widgets_resolved: u64,
    pub diagnostics: u64,
}

impl PassStats {
    /// Attribute, property and listener changes.
    pub fn decorations(&self) -> u64 {
        self.attribute_sets
            + self.attribute_removals
            + self.property_sets
            + self.property_clears
            + self.listener_attaches
            + self.listener_detaches
    }
}

#[derive(Debug, Default, Clone)]
pub struct ReconcileMetrics {
    passes: u64,
    dispatches: u64,
    callbacks: u64,
    totals: PassStats,
}

impl ReconcileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self, stats: &PassStats) {
        self.passes = self.passes.saturating_add(1);
        let t = &mut self.totals;
        t.nodes_created = t.nodes_created.saturating_add(stats.nodes_created);
        t.nodes_reused = t.nodes_reused.saturating_add(stats.nodes_reused);
        t.nodes_replaced = t.nodes_replaced.saturating_add(stats.nodes_replaced);
        t.nodes_removed = t.nodes_removed.saturating_add(stats.nodes_removed);
        t.text_updates = t.text_updates.saturating_add(stats.text_updates);
        t.attribute_sets = t.attribute_sets.saturating_add(stats.attribute_sets);
        t.attribute_removals = t.attribute_removals.saturating_add(stats.attribute_removals);
        t.property_sets = t.property_sets.saturating_add(stats.property_sets);
        t.property_clears = t.property_clears.saturating_add(stats.property_clears);
        t.listener_attaches = t.listener_attaches.saturating_add(stats.listener_attaches);
        t.listener_detaches = t.listener_detaches.saturating_add(stats.listener_detaches);
        t.child_moves = t.child_moves.saturating_add(stats.child_moves);
        t.widgets_resolved = t.widgets_resolved.saturating_add(stats.widgets_resolved);
        t.diagnostics = t.diagnostics.saturating_add(stats.diagnostics);
    }

    pub fn record_dispatch(&mut self) {
        self.dispatches = self.dispatches.saturating_add(1);
    }

    pub fn record_callback(&mut self) {
        self.callbacks = self.callbacks.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            passes: self.passes,
            dispatches: self.dispatches,
            callbacks: self.callbacks,
            totals: self.totals,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub passes: u64,
    pub dispatches: u64,
    pub callbacks: u64,
    pub totals: PassStats,
}

impl MetricSnapshot {
    pub fn mutations(&self) -> u64 {
        self.totals.decorations()
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(
            LogLevel::Info,
            target.to_string(),
            "reconcile_metrics".to_string(),
            self.as_fields(),
        )
    }

    pub fn as_fields(&self) -> LogFields {
        let t = &self.totals;
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("passes".to_string(), json!(self.passes));
        map.insert("dispatches".to_string(), json!(self.dispatches));
        map.insert("callbacks".to_string(), json!(self.callbacks));
        map.insert("nodes_created".to_string(), json!(t.nodes_created));
        map.insert("nodes_reused".to_string(), json!(t.nodes_reused));
        map.insert("nodes_replaced".to_string(), json!(t.nodes_replaced));
        map.insert("nodes_removed".to_string(), json!(t.nodes_removed));
        map.insert("text_updates".to_string(), json!(t.text_updates));
        map.insert("decorations".to_string(), json!(t.decorations()));
        map.insert("child_moves".to_string(), json!(t.child_moves));
        map.insert("widgets_resolved".to_string(), json!(t.widgets_resolved));
        map.insert("diagnostics".to_string(), json!(t.diagnostics));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_accumulate_into_snapshot() {
        let mut metrics = ReconcileMetrics::new();
        let stats = PassStats {
            nodes_created: 2,
            attribute_sets: 3,
            listener_attaches: 1,
            ..PassStats::default()
        };
        metrics.record_pass(&stats);
        metrics.record_pass(&PassStats::default());
        metrics.record_dispatch();

        let snapshot = metrics.snapshot(Duration::from_millis(40));
        assert_eq!(snapshot.passes, 2);
        assert_eq!(snapshot.dispatches, 1);
        assert_eq!(snapshot.mutations(), 4);

        let event = snapshot.to_log_event("direct::metrics");
        assert_eq!(event.fields["nodes_created"], json!(2));
        assert_eq!(event.fields["uptime_ms"], json!(40));
    }
}
