use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use super::diff::{AttributePatch, ListenerPatch, PropertyPatch, diff_maps};
use crate::error::{HostResult, Result};
use crate::host::{HostTree, NodeId, NodeKind};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::{PassStats, ReconcileMetrics};
use crate::registry::{Diagnostic, ErrorSink, WidgetRegistry};
use crate::runtime::diagnostics::LogErrorSink;
use crate::spec::{ElementSpec, Spec, WidgetModel};

/// Nesting limit for widgets resolving to widgets.
pub const DEFAULT_MAX_WIDGET_DEPTH: usize = 64;

const LOG_TARGET: &str = "direct::reconcile";

/// Diffs specs against host nodes and patches only what changed.
///
/// The reconciler owns the last-applied spec of every element it touched,
/// keyed by node identity, so host trees never carry engine state.
pub struct Reconciler {
    registry: WidgetRegistry,
    applied: HashMap<NodeId, Rc<ElementSpec>>,
    error_sink: Rc<dyn ErrorSink>,
    logger: Option<Logger>,
    metrics: Option<Arc<Mutex<ReconcileMetrics>>>,
    max_widget_depth: usize,
    last_pass: PassStats,
}

impl Reconciler {
    pub fn new(registry: WidgetRegistry) -> Self {
        Self {
            registry,
            applied: HashMap::new(),
            error_sink: Rc::new(LogErrorSink::stderr()),
            logger: None,
            metrics: None,
            max_widget_depth: DEFAULT_MAX_WIDGET_DEPTH,
            last_pass: PassStats::default(),
        }
    }

    pub fn with_error_sink(mut self, sink: Rc<dyn ErrorSink>) -> Self {
        self.error_sink = sink;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Mutex<ReconcileMetrics>>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_max_widget_depth(mut self, depth: usize) -> Self {
        self.max_widget_depth = depth;
        self
    }

    pub fn registry_mut(&mut self) -> &mut WidgetRegistry {
        &mut self.registry
    }

    /// Last spec applied to `node`, if the node was ever reconciled.
    pub fn applied_spec(&self, node: NodeId) -> Option<&Rc<ElementSpec>> {
        self.applied.get(&node)
    }

    pub fn tracked_nodes(&self) -> usize {
        self.applied.len()
    }

    /// Tallies of the most recent pass.
    pub fn last_pass(&self) -> PassStats {
        self.last_pass
    }

    /// Render `spec` into the slot held by `existing` and return the node
    /// that now represents it. A replaced `existing` keeps its position in
    /// its parent.
    pub fn reconcile<H>(&mut self, host: &mut H, spec: &Spec, existing: Option<NodeId>) -> Result<NodeId>
    where
        H: HostTree + ?Sized,
    {
        let mut pass = Pass {
            host,
            registry: &self.registry,
            applied: &mut self.applied,
            error_sink: self.error_sink.as_ref(),
            max_widget_depth: self.max_widget_depth,
            depth: 0,
            stats: PassStats::default(),
        };
        let node = pass.slot(spec, existing)?;
        let stats = pass.stats;

        self.last_pass = stats;
        if let Some(metrics) = self.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_pass(&stats);
            }
        }
        if let Some(logger) = self.logger.as_ref() {
            let event = event_with_fields(
                LogLevel::Debug,
                LOG_TARGET,
                "pass_committed",
                [
                    json_kv("spec", json!(spec.describe())),
                    json_kv("node", json!(node.raw())),
                    json_kv("created", json!(stats.nodes_created)),
                    json_kv("reused", json!(stats.nodes_reused)),
                    json_kv("removed", json!(stats.nodes_removed)),
                    json_kv("decorations", json!(stats.decorations())),
                ],
            );
            let _ = logger.log_event(event);
        }
        Ok(node)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("registry", &self.registry)
            .field("tracked_nodes", &self.applied.len())
            .field("max_widget_depth", &self.max_widget_depth)
            .finish_non_exhaustive()
    }
}

/// State of a single synchronous pass.
struct Pass<'a, H: ?Sized> {
    host: &'a mut H,
    registry: &'a WidgetRegistry,
    applied: &'a mut HashMap<NodeId, Rc<ElementSpec>>,
    error_sink: &'a dyn ErrorSink,
    max_widget_depth: usize,
    depth: usize,
    stats: PassStats,
}

impl<H> Pass<'_, H>
where
    H: HostTree + ?Sized,
{
    fn slot(&mut self, spec: &Spec, existing: Option<NodeId>) -> HostResult<NodeId> {
        match spec {
            Spec::Empty => self.text("", existing),
            Spec::Text(value) => self.text(value, existing),
            Spec::Widget(model) => self.widget(model, existing),
            Spec::Element(element) => self.element(element, existing),
            Spec::Malformed(value) => {
                self.report(&Diagnostic::malformed(value));
                self.text(&stringify(value), existing)
            }
        }
    }

    fn widget(&mut self, model: &Rc<WidgetModel>, existing: Option<NodeId>) -> HostResult<NodeId> {
        if self.depth >= self.max_widget_depth {
            self.report(&Diagnostic::depth_exceeded(model, self.max_widget_depth));
            let node = self.text("", existing)?;
            model.bind(node);
            return Ok(node);
        }

        let Some(render) = self.registry.resolve(model.widget()) else {
            self.report(&Diagnostic::unresolved(model));
            let node = self.text("", existing)?;
            model.bind(node);
            return Ok(node);
        };

        let resolved = render(model);
        self.depth += 1;
        let result = self.slot(&resolved, existing);
        self.depth -= 1;

        let node = result?;
        model.bind(node);
        self.stats.widgets_resolved += 1;
        Ok(node)
    }

    fn element(&mut self, spec: &Rc<ElementSpec>, existing: Option<NodeId>) -> HostResult<NodeId> {
        let node = match existing {
            Some(node) if self.reusable(node, spec)? => {
                self.stats.nodes_reused += 1;
                node
            }
            _ => {
                let node = self
                    .host
                    .create_element(&spec.name, spec.namespace.as_deref())?;
                self.stats.nodes_created += 1;
                self.take_slot(existing, node)?;
                node
            }
        };

        let previous = self.applied.get(&node).cloned();
        let previous = previous.as_deref();

        diff_maps(
            previous.map(|p| &p.attributes),
            &spec.attributes,
            &mut AttributePatch {
                host: &mut *self.host,
                node,
                stats: &mut self.stats,
            },
        )?;
        self.children(node, &spec.children)?;
        diff_maps(
            previous.map(|p| &p.properties),
            &spec.properties,
            &mut PropertyPatch {
                host: &mut *self.host,
                node,
                stats: &mut self.stats,
            },
        )?;
        diff_maps(
            previous.map(|p| &p.events),
            &spec.events,
            &mut ListenerPatch {
                host: &mut *self.host,
                node,
                stats: &mut self.stats,
            },
        )?;

        self.applied.insert(node, Rc::clone(spec));
        Ok(node)
    }

    fn reusable(&self, node: NodeId, spec: &ElementSpec) -> HostResult<bool> {
        if self.host.kind(node)? != NodeKind::Element {
            return Ok(false);
        }
        Ok(self.host.tag_name(node)?.eq_ignore_ascii_case(&spec.name)
            && self.host.namespace(node)? == spec.namespace.as_deref())
    }

    /// Positional children diff: spec `i` against host child `i`.
    fn children(&mut self, parent: NodeId, specs: &[Spec]) -> HostResult<()> {
        let mut current = self.host.children(parent)?;

        for (index, spec) in specs.iter().enumerate() {
            let existing = current.get(index).copied();
            let child = self.slot(spec, existing)?;
            if Some(child) == existing {
                continue;
            }

            current = self.host.children(parent)?;
            let occupant = current.get(index).copied();
            if occupant != Some(child) {
                self.host.insert_before(parent, child, occupant)?;
                self.stats.child_moves += 1;
                current = self.host.children(parent)?;
            }
        }

        if current.len() > specs.len() {
            for stale in current.split_off(specs.len()) {
                self.host.remove_child(parent, stale)?;
                self.stats.nodes_removed += 1;
                self.forget(stale)?;
            }
        }
        Ok(())
    }

    fn text(&mut self, value: &str, existing: Option<NodeId>) -> HostResult<NodeId> {
        if let Some(node) = existing {
            if self.host.kind(node)? == NodeKind::Text {
                if self.host.text(node)? != value {
                    self.host.set_text(node, value)?;
                    self.stats.text_updates += 1;
                }
                self.stats.nodes_reused += 1;
                return Ok(node);
            }
        }

        let node = self.host.create_text(value)?;
        self.stats.nodes_created += 1;
        self.take_slot(existing, node)?;
        Ok(node)
    }

    /// Put `node` where `previous` sits in its parent, if it has one, and
    /// drop what was memoized for `previous`.
    fn take_slot(&mut self, previous: Option<NodeId>, node: NodeId) -> HostResult<()> {
        let Some(previous) = previous else {
            return Ok(());
        };
        if let Some(parent) = self.host.parent(previous)? {
            self.host.replace_child(parent, node, previous)?;
            self.stats.nodes_replaced += 1;
        }
        self.forget(previous)
    }

    /// Drop memo entries for a subtree that left the tree.
    fn forget(&mut self, root: NodeId) -> HostResult<()> {
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if self.applied.remove(&node).is_some() {
                stack.extend(self.host.children(node)?);
            }
        }
        Ok(())
    }

    fn report(&mut self, diagnostic: &Diagnostic) {
        self.stats.diagnostics += 1;
        self.error_sink.report(diagnostic);
    }
}

/// Best-effort text for a malformed spec.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
