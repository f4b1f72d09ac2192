use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::json;

use crate::events::{EventContext, HostEvent};
use crate::host::{HostTree, NodeId, ancestors};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::{MetricSnapshot, ReconcileMetrics};
use crate::reconcile::{DEFAULT_MAX_WIDGET_DEPTH, Reconciler};
use crate::registry::{ErrorSink, WidgetRegistry};
use crate::spec::{Spec, WidgetModel};
use crate::Result;

pub mod audit;
pub mod diagnostics;

use audit::{NullRuntimeAudit, RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage};
use diagnostics::{LogErrorSink, MetricsReporter};

const LOG_TARGET: &str = "direct::runtime";

/// Configuration knobs applied when a [`Runtime`] is built.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Optional structured logger used by the runtime and reconciler.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with the reconciler.
    pub metrics: Option<Arc<Mutex<ReconcileMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    /// Limit on widgets resolving to widgets within one pass.
    pub max_widget_depth: usize,
    /// Receives diagnostics; defaults to a log-backed sink.
    pub error_sink: Option<Rc<dyn ErrorSink>>,
    /// Lifecycle audit hook; defaults to [`NullRuntimeAudit`].
    pub audit: Option<Rc<dyn RuntimeAudit>>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(5),
            metrics_target: "direct::metrics".to_string(),
            max_widget_depth: DEFAULT_MAX_WIDGET_DEPTH,
            error_sink: None,
            audit: None,
        }
    }
}

impl RuntimeConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(ReconcileMetrics::new())));
        }
    }

    /// Disable metrics collection and prevent further snapshots.
    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<ReconcileMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// One-shot notification run after a reconcile, once layout is flushed.
pub type RenderCallback = Box<dyn FnOnce(&dyn HostTree, NodeId)>;

/// Scripted inputs for [`Runtime::run_scripted`].
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    Dispatch { target: NodeId, name: String },
    Rerender(Rc<WidgetModel>),
}

impl RuntimeEvent {
    pub fn dispatch(target: NodeId, name: impl Into<String>) -> Self {
        Self::Dispatch {
            target,
            name: name.into(),
        }
    }
}

/// Summary of one bubbling dispatch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub handlers_run: usize,
    pub default_prevented: bool,
    pub rerenders: usize,
}

enum Task {
    Callback { callback: RenderCallback, node: NodeId },
    Dispatch(HostEvent),
}

/// Owns a host tree, the reconciler and a FIFO queue of deferred work.
pub struct Runtime<H: HostTree> {
    host: H,
    reconciler: Reconciler,
    tasks: VecDeque<Task>,
    config: RuntimeConfig,
    audit: Rc<dyn RuntimeAudit>,
    reporter: Option<MetricsReporter>,
    started_at: Instant,
}

impl<H: HostTree> Runtime<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, RuntimeConfig::default())
    }

    pub fn with_config(host: H, mut config: RuntimeConfig) -> Self {
        if config.logger.is_some() && !config.metrics_interval.is_zero() {
            config.enable_metrics();
        }

        let error_sink: Rc<dyn ErrorSink> = match (&config.error_sink, &config.logger) {
            (Some(sink), _) => Rc::clone(sink),
            (None, Some(logger)) => Rc::new(LogErrorSink::new(logger.clone())),
            (None, None) => Rc::new(LogErrorSink::stderr()),
        };

        let mut reconciler = Reconciler::new(WidgetRegistry::new())
            .with_error_sink(error_sink)
            .with_max_widget_depth(config.max_widget_depth);
        if let Some(logger) = config.logger.as_ref() {
            reconciler = reconciler.with_logger(logger.clone());
        }
        if let Some(metrics) = config.metrics_handle() {
            reconciler = reconciler.with_metrics(metrics);
        }

        let reporter = match (config.logger.as_ref(), config.metrics_handle()) {
            (Some(logger), Some(metrics)) => Some(
                MetricsReporter::new(logger.clone(), metrics)
                    .with_interval(config.metrics_interval)
                    .with_target(config.metrics_target.clone()),
            ),
            _ => None,
        };

        let audit: Rc<dyn RuntimeAudit> = match config.audit.as_ref() {
            Some(audit) => Rc::clone(audit),
            None => Rc::new(NullRuntimeAudit),
        };

        let runtime = Self {
            host,
            reconciler,
            tasks: VecDeque::new(),
            config,
            audit,
            reporter,
            started_at: Instant::now(),
        };
        runtime.record_audit(RuntimeAuditStage::RuntimeConstructed, |event| {
            event.detail("max_widget_depth", json!(runtime.config.max_widget_depth));
        });
        runtime.log_runtime_event(LogLevel::Info, "runtime_started", std::iter::empty());
        runtime
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn register_widget<F>(&mut self, name: impl Into<String>, render: F)
    where
        F: Fn(&Rc<WidgetModel>) -> Spec + 'static,
    {
        let name = name.into();
        let replaced = self
            .reconciler
            .registry_mut()
            .register(name.clone(), render)
            .is_some();
        self.record_audit(RuntimeAuditStage::WidgetRegistered, |event| {
            event
                .detail("widget", json!(name))
                .detail("replaced", json!(replaced));
        });
    }

    /// Render `spec` into `node` (or a fresh node) and return the node that
    /// now represents it. `on_done` runs on a later turn, after layout.
    pub fn reconcile(
        &mut self,
        spec: &Spec,
        node: Option<NodeId>,
        on_done: Option<RenderCallback>,
    ) -> Result<NodeId> {
        let rendered = self.reconciler.reconcile(&mut self.host, spec, node)?;
        let stats = self.reconciler.last_pass();
        self.record_audit(RuntimeAuditStage::ReconcileCommitted, |event| {
            event
                .detail("node", json!(rendered.raw()))
                .detail("created", json!(stats.nodes_created))
                .detail("decorations", json!(stats.decorations()));
        });

        if let Some(callback) = on_done {
            self.tasks.push_back(Task::Callback {
                callback,
                node: rendered,
            });
            self.record_audit(RuntimeAuditStage::CallbackScheduled, |event| {
                event.detail("node", json!(rendered.raw()));
            });
        }

        self.maybe_emit_metrics();
        Ok(rendered)
    }

    /// Re-render a widget against the node it last rendered into.
    pub fn render_widget(&mut self, model: &Rc<WidgetModel>) -> Result<NodeId> {
        let previous = model.node();
        let node = self.reconcile(&Spec::Widget(Rc::clone(model)), previous, None)?;
        self.record_audit(RuntimeAuditStage::WidgetRerendered, |event| {
            event
                .detail("widget", json!(model.widget()))
                .detail("node", json!(node.raw()))
                .detail("replaced", json!(previous.is_some_and(|p| p != node)));
        });
        Ok(node)
    }

    /// Deliver `name` to `target` and bubble through its ancestors.
    pub fn dispatch(&mut self, target: NodeId, name: &str) -> Result<DispatchOutcome> {
        let event = HostEvent::new(name, target);
        let mut path = vec![target];
        path.extend(ancestors(&self.host, target)?);

        let mut outcome = DispatchOutcome::default();
        for current in path {
            let handlers = self.host.listeners(current, &event.name)?;
            let mut stopped = false;
            for handler in handlers {
                let result = {
                    let mut ctx = EventContext::new(&event, current, &mut self.host);
                    handler.call(&mut ctx);
                    ctx.into_outcome()
                };
                outcome.handlers_run += 1;
                outcome.default_prevented |= result.default_prevented;
                stopped |= result.propagation_stopped;
                for model in result.rerenders {
                    self.render_widget(&model)?;
                    outcome.rerenders += 1;
                }
            }
            if stopped {
                break;
            }
        }

        self.record_dispatch_metric();
        self.log_runtime_event(
            LogLevel::Debug,
            "event_dispatched",
            [
                json_kv("event", json!(event.name)),
                json_kv("target", json!(target.raw())),
                json_kv("handlers", json!(outcome.handlers_run)),
                json_kv("rerenders", json!(outcome.rerenders)),
            ],
        );
        self.record_audit(RuntimeAuditStage::EventDispatched, |audit| {
            audit
                .detail("event", json!(event.name))
                .detail("handlers", json!(outcome.handlers_run))
                .detail("default_prevented", json!(outcome.default_prevented));
        });
        self.maybe_emit_metrics();
        Ok(outcome)
    }

    /// Defer a dispatch to a later turn.
    pub fn queue_event(&mut self, target: NodeId, name: impl Into<String>) {
        self.tasks.push_back(Task::Dispatch(HostEvent::new(name, target)));
    }

    /// Run the oldest queued task. Returns `false` when the queue was empty.
    pub fn turn(&mut self) -> Result<bool> {
        let Some(task) = self.tasks.pop_front() else {
            return Ok(false);
        };
        match task {
            Task::Callback { callback, node } => {
                self.host.flush_layout()?;
                callback(&self.host, node);
                self.record_callback_metric();
                self.record_audit(RuntimeAuditStage::CallbackRan, |event| {
                    event.detail("node", json!(node.raw()));
                });
            }
            Task::Dispatch(event) => {
                self.dispatch(event.target, &event.name)?;
            }
        }
        Ok(true)
    }

    /// Drain the task queue, including tasks queued while draining.
    pub fn run_until_idle(&mut self) -> Result<usize> {
        let mut ran = 0;
        while self.turn()? {
            ran += 1;
        }
        Ok(ran)
    }

    /// Feed `events` in order, draining the queue before and after each.
    pub fn run_scripted<I>(&mut self, events: I) -> Result<Vec<DispatchOutcome>>
    where
        I: IntoIterator<Item = RuntimeEvent>,
    {
        self.run_until_idle()?;
        let mut outcomes = Vec::new();
        for event in events {
            match event {
                RuntimeEvent::Dispatch { target, name } => {
                    outcomes.push(self.dispatch(target, &name)?);
                }
                RuntimeEvent::Rerender(model) => {
                    self.render_widget(&model)?;
                }
            }
            self.run_until_idle()?;
        }
        self.flush_metrics();
        Ok(outcomes)
    }

    pub fn metrics_snapshot(&self) -> Option<MetricSnapshot> {
        let metrics = self.config.metrics.as_ref()?;
        let guard = metrics.lock().ok()?;
        Some(guard.snapshot(self.started_at.elapsed()))
    }

    /// Emit a metrics snapshot now, if metrics and a logger are configured.
    pub fn flush_metrics(&mut self) {
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.flush();
        }
    }

    fn maybe_emit_metrics(&mut self) {
        if let Some(reporter) = self.reporter.as_mut() {
            reporter.maybe_emit();
        }
    }

    fn record_dispatch_metric(&self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_dispatch();
            }
        }
    }

    fn record_callback_metric(&self) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_callback();
            }
        }
    }

    fn record_audit(
        &self,
        stage: RuntimeAuditStage,
        details: impl FnOnce(&mut RuntimeAuditEventBuilder),
    ) {
        let mut builder = RuntimeAuditEventBuilder::new(stage);
        details(&mut builder);
        self.audit.record(builder.finish());
    }

    fn log_runtime_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, LOG_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::Value;

    use super::audit::RecordingAudit;
    use super::diagnostics::CollectingErrorSink;
    use super::*;
    use crate::events::Handler;
    use crate::host::{MemoryTree, find_first_by_tag, text_content};
    use crate::logging::MemorySink;

    fn quiet_config() -> (RuntimeConfig, CollectingErrorSink) {
        let sink = CollectingErrorSink::new();
        let config = RuntimeConfig {
            error_sink: Some(Rc::new(sink.clone())),
            ..RuntimeConfig::default()
        };
        (config, sink)
    }

    fn todo_runtime() -> (Runtime<MemoryTree>, Rc<WidgetModel>) {
        let (config, _) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        runtime.register_widget("TodoList", |model| {
            let add = {
                let model = Rc::clone(model);
                Handler::new(move |ctx| {
                    let Some(root) = model.node() else { return };
                    let Ok(Some(input)) = find_first_by_tag(ctx.host(), root, "input") else {
                        return;
                    };
                    let Ok(Value::String(draft)) = ctx.host().property(input, "value") else {
                        return;
                    };
                    model.update(|fields| {
                        if let Some(Value::Array(items)) = fields.get_mut("items") {
                            items.push(Value::String(draft));
                        }
                    });
                    model.set("draft", "");
                    ctx.rerender(&model);
                })
            };
            let items = match model.value("items") {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            Spec::element("div")
                .child(
                    Spec::element("ul").children(
                        items
                            .iter()
                            .map(|item| Spec::element("li").child(item.as_str().unwrap_or(""))),
                    ),
                )
                .child(Spec::element("input").prop("value", model.value("draft")))
                .child(Spec::element("button").on("click", add).child("Add"))
                .build()
        });
        let model = Spec::widget("TodoList")
            .field("items", json!([]))
            .field("draft", "")
            .into_model();
        (runtime, model)
    }

    #[test]
    fn todo_flow_adds_items_through_dispatch() {
        let (mut runtime, model) = todo_runtime();
        let root = runtime.render_widget(&model).unwrap();
        let input = find_first_by_tag(runtime.host(), root, "input").unwrap().unwrap();
        let button = find_first_by_tag(runtime.host(), root, "button").unwrap().unwrap();

        runtime
            .host_mut()
            .set_property(input, "value", json!("milk"))
            .unwrap();
        let outcome = runtime.dispatch(button, "click").unwrap();
        assert_eq!(outcome.handlers_run, 1);
        assert_eq!(outcome.rerenders, 1);

        let ul = find_first_by_tag(runtime.host(), root, "ul").unwrap().unwrap();
        assert_eq!(runtime.host().children(ul).unwrap().len(), 1);
        assert_eq!(text_content(runtime.host(), ul).unwrap(), "milk");
        assert_eq!(model.value("draft"), json!(""));
        assert_eq!(model.node(), Some(root));
    }

    fn todo_app() -> (Runtime<MemoryTree>, Rc<WidgetModel>) {
        let (config, _) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        let app = Spec::widget("TodoApp")
            .field("header", "Todo App")
            .field(
                "data",
                json!([
                    {"title": "Create repo", "done": true},
                    {"title": "Submit code", "done": true},
                    {"title": "Add LICENSE", "done": false},
                    {"title": "Add README", "done": false},
                ]),
            )
            .into_model();

        runtime.register_widget("TodoApp", |model| {
            Spec::element("div")
                .child(Spec::element("h1").child(model.value("header").as_str().unwrap_or("")))
                .child(Spec::widget("Form").field("tasks", model.value("data")))
                .build()
        });
        let store = Rc::clone(&app);
        runtime.register_widget("Form", move |model| {
            let submit = {
                let store = Rc::clone(&store);
                let model = Rc::clone(model);
                Handler::new(move |ctx| {
                    ctx.prevent_default();
                    let form = ctx.current_target();
                    let Ok(Some(input)) = find_first_by_tag(ctx.host(), form, "input") else {
                        return;
                    };
                    let Ok(Value::String(title)) = ctx.host().property(input, "value") else {
                        return;
                    };
                    store.update(|fields| {
                        if let Some(Value::Array(tasks)) = fields.get_mut("data") {
                            tasks.push(json!({"title": title, "done": false}));
                        }
                    });
                    model.set("tasks", store.value("data"));
                    ctx.rerender(&model);
                })
            };
            Spec::element("form")
                .on("submit", submit)
                .child(Spec::element("input"))
                .child(Spec::widget("TaskList").field("tasks", model.value("tasks")))
                .build()
        });
        runtime.register_widget("TaskList", |model| {
            let tasks = match model.value("tasks") {
                Value::Array(tasks) => tasks,
                _ => Vec::new(),
            };
            Spec::element("ol")
                .children(tasks.into_iter().enumerate().map(|(index, task)| {
                    Spec::widget("Task").field("index", index).field("data", task)
                }))
                .build()
        });
        let store = Rc::clone(&app);
        runtime.register_widget("Task", move |model| {
            let task = model.value("data");
            let click = {
                let store = Rc::clone(&store);
                let model = Rc::clone(model);
                Handler::new(move |ctx| {
                    let index = model.value("index").as_u64().unwrap_or(0) as usize;
                    let done = !model.value("data")["done"].as_bool().unwrap_or(false);
                    model.update(|fields| {
                        if let Some(Value::Object(task)) = fields.get_mut("data") {
                            task.insert("done".into(), Value::Bool(done));
                        }
                    });
                    store.update(|fields| {
                        let task = fields.get_mut("data").and_then(|tasks| tasks.get_mut(index));
                        if let Some(Value::Object(task)) = task {
                            task.insert("done".into(), Value::Bool(done));
                        }
                    });
                    ctx.rerender(&model);
                })
            };
            let done = task["done"].as_bool().unwrap_or(false);
            Spec::element("li")
                .attr("class", if done { "done" } else { "" })
                .on("click", click)
                .child(task["title"].as_str().unwrap_or(""))
                .build()
        });
        (runtime, app)
    }

    fn done_count(app: &WidgetModel) -> usize {
        match app.value("data") {
            Value::Array(tasks) => tasks
                .iter()
                .filter(|task| task["done"].as_bool().unwrap_or(false))
                .count(),
            _ => 0,
        }
    }

    #[test]
    fn todo_app_submit_and_toggle_flow_through_models() {
        let (mut runtime, app) = todo_app();
        let root = runtime.render_widget(&app).unwrap();
        let form = find_first_by_tag(runtime.host(), root, "form").unwrap().unwrap();
        let input = find_first_by_tag(runtime.host(), root, "input").unwrap().unwrap();
        let list = find_first_by_tag(runtime.host(), root, "ol").unwrap().unwrap();
        assert_eq!(runtime.host().children(list).unwrap().len(), 4);

        runtime
            .host_mut()
            .set_property(input, "value", json!("Write tests"))
            .unwrap();
        let outcome = runtime.dispatch(form, "submit").unwrap();
        assert!(outcome.default_prevented);
        assert_eq!(outcome.rerenders, 1);
        let items = runtime.host().children(list).unwrap();
        assert_eq!(items.len(), 5);
        assert_eq!(text_content(runtime.host(), items[4]).unwrap(), "Write tests");

        let third = items[2];
        let outcome = runtime.dispatch(third, "click").unwrap();
        assert_eq!(outcome.rerenders, 1);
        assert_eq!(runtime.host().children(list).unwrap()[2], third);
        assert_eq!(
            runtime.host().attribute(third, "class").unwrap(),
            Some("done")
        );
        assert_eq!(done_count(&app), 3);

        // A later submit re-renders the form from the app model, so the toggle survives.
        runtime
            .host_mut()
            .set_property(input, "value", json!("Ship it"))
            .unwrap();
        runtime.dispatch(form, "submit").unwrap();
        let items = runtime.host().children(list).unwrap();
        assert_eq!(items.len(), 6);
        assert_eq!(
            runtime.host().attribute(items[2], "class").unwrap(),
            Some("done")
        );
        assert_eq!(done_count(&app), 3);
    }

    #[test]
    fn table_widget_rerenders_into_same_node() {
        let (config, _) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        runtime.register_widget("Table", |model| {
            let rows = match model.value("data") {
                Value::Array(rows) => rows,
                _ => Vec::new(),
            };
            Spec::element("table")
                .child(Spec::element("tbody").children(
                    rows.into_iter().map(|row| Spec::widget("TableRow").field("data", row)),
                ))
                .build()
        });
        runtime.register_widget("TableRow", |model| {
            let cells = match model.value("data") {
                Value::Array(cells) => cells,
                _ => Vec::new(),
            };
            Spec::element("tr")
                .children(cells.iter().map(|cell| Spec::element("td").child(cell.to_string())))
                .build()
        });
        let table = |size: usize| {
            let rows: Vec<Value> = (0..size).map(|row| json!(vec![row; size])).collect();
            Spec::widget("Table").field("data", rows).build()
        };

        let root = runtime.reconcile(&table(3), None, None).unwrap();
        let tbody = runtime.host().children(root).unwrap()[0];
        let first_row = runtime.host().children(tbody).unwrap()[0];
        for size in [2, 5] {
            let node = runtime.reconcile(&table(size), Some(root), None).unwrap();
            assert_eq!(node, root);
            let rows = runtime.host().children(tbody).unwrap();
            assert_eq!(rows.len(), size);
            assert_eq!(rows[0], first_row);
            assert_eq!(runtime.host().children(rows[size - 1]).unwrap().len(), size);
        }
        assert_eq!(text_content(runtime.host(), tbody).unwrap().len(), 25);
    }

    #[test]
    fn callback_runs_after_layout_flush() {
        let (config, _) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        let seen = Rc::new(RefCell::new(None));
        let spec = Spec::element("ul").children(["a", "b"]).build();

        let recorder = Rc::clone(&seen);
        let node = runtime
            .reconcile(
                &spec,
                None,
                Some(Box::new(move |host: &dyn HostTree, node: NodeId| {
                    *recorder.borrow_mut() = host.children(node).ok().map(|c| c.len());
                })),
            )
            .unwrap();

        assert_eq!(runtime.pending_tasks(), 1);
        assert!(seen.borrow().is_none());
        assert_eq!(runtime.host().layout_flushes(), 0);

        assert!(runtime.turn().unwrap());
        assert_eq!(*seen.borrow(), Some(2));
        assert_eq!(runtime.host().layout_flushes(), 1);
        assert_eq!(runtime.host().children(node).unwrap().len(), 2);
        assert!(!runtime.turn().unwrap());
    }

    #[test]
    fn events_bubble_to_ancestors() {
        let (config, _) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        let order = Rc::new(RefCell::new(Vec::new()));
        let log = |tag: &'static str| {
            let order = Rc::clone(&order);
            Handler::new(move |ctx| order.borrow_mut().push((tag, ctx.current_target())))
        };
        let spec = Spec::element("section")
            .on("click", log("section"))
            .child(Spec::element("button").on("click", log("button")).child("go"))
            .build();
        let root = runtime.reconcile(&spec, None, None).unwrap();
        let button = runtime.host().children(root).unwrap()[0];
        let label = runtime.host().children(button).unwrap()[0];

        let outcome = runtime.dispatch(label, "click").unwrap();
        assert_eq!(outcome.handlers_run, 2);
        assert_eq!(*order.borrow(), vec![("button", button), ("section", root)]);
    }

    #[test]
    fn stop_propagation_skips_ancestors() {
        let (config, _) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        let outer_calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&outer_calls);
        let spec = Spec::element("form")
            .on("submit", Handler::new(move |_ctx| counter.set(counter.get() + 1)))
            .child(Spec::element("button").on(
                "submit",
                Handler::new(|ctx| {
                    ctx.prevent_default();
                    ctx.stop_propagation();
                }),
            ))
            .build();
        let root = runtime.reconcile(&spec, None, None).unwrap();
        let button = runtime.host().children(root).unwrap()[0];

        let outcome = runtime.dispatch(button, "submit").unwrap();
        assert!(outcome.default_prevented);
        assert_eq!(outcome.handlers_run, 1);
        assert_eq!(outer_calls.get(), 0);
    }

    #[test]
    fn queued_events_run_in_order() {
        let (config, _) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        let hits = Rc::new(RefCell::new(Vec::new()));
        let record = |name: &'static str| {
            let hits = Rc::clone(&hits);
            Handler::new(move |_ctx| hits.borrow_mut().push(name))
        };
        let spec = Spec::element("div")
            .on("first", record("first"))
            .on("second", record("second"))
            .build();
        let node = runtime.reconcile(&spec, None, None).unwrap();

        runtime.queue_event(node, "second");
        runtime.queue_event(node, "first");
        assert!(hits.borrow().is_empty());
        assert_eq!(runtime.run_until_idle().unwrap(), 2);
        assert_eq!(*hits.borrow(), vec!["second", "first"]);
    }

    #[test]
    fn scripted_run_drives_widget() {
        let (mut runtime, model) = todo_runtime();
        let root = runtime.render_widget(&model).unwrap();
        let input = find_first_by_tag(runtime.host(), root, "input").unwrap().unwrap();
        let button = find_first_by_tag(runtime.host(), root, "button").unwrap().unwrap();

        let mut outcomes = Vec::new();
        for item in ["eggs", "bread"] {
            runtime
                .host_mut()
                .set_property(input, "value", json!(item))
                .unwrap();
            outcomes.extend(
                runtime
                    .run_scripted([RuntimeEvent::dispatch(button, "click")])
                    .unwrap(),
            );
        }
        assert_eq!(outcomes.len(), 2);
        assert_eq!(model.value("items"), json!(["eggs", "bread"]));
    }

    #[test]
    fn audit_and_logging_follow_lifecycle() {
        let audit = RecordingAudit::new();
        let memory = MemorySink::new();
        let sink = CollectingErrorSink::new();
        let config = RuntimeConfig {
            logger: Some(Logger::new(memory.clone())),
            audit: Some(Rc::new(audit.clone())),
            error_sink: Some(Rc::new(sink.clone())),
            ..RuntimeConfig::default()
        };
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        runtime.register_widget("Label", |model| Spec::from(model.value("text").as_str()));

        let model = Spec::widget("Label").field("text", "hi").into_model();
        let node = runtime
            .reconcile(&Spec::from(&model), None, Some(Box::new(|_: &dyn HostTree, _: NodeId| {})))
            .unwrap();
        runtime.run_until_idle().unwrap();
        runtime.dispatch(node, "click").unwrap();

        assert_eq!(
            audit.stages(),
            vec![
                RuntimeAuditStage::RuntimeConstructed,
                RuntimeAuditStage::WidgetRegistered,
                RuntimeAuditStage::ReconcileCommitted,
                RuntimeAuditStage::CallbackScheduled,
                RuntimeAuditStage::CallbackRan,
                RuntimeAuditStage::EventDispatched,
            ]
        );
        let messages = memory.messages();
        assert!(messages.contains(&"runtime_started".to_string()));
        assert!(messages.contains(&"pass_committed".to_string()));
        assert!(messages.contains(&"event_dispatched".to_string()));

        let snapshot = runtime.metrics_snapshot().unwrap();
        assert_eq!(snapshot.passes, 1);
        assert_eq!(snapshot.callbacks, 1);
        assert_eq!(snapshot.dispatches, 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn unresolved_widget_reports_through_configured_sink() {
        let (config, sink) = quiet_config();
        let mut runtime = Runtime::with_config(MemoryTree::new(), config);
        let node = runtime
            .reconcile(&Spec::widget("Ghost").build(), None, None)
            .unwrap();
        assert_eq!(runtime.host().text(node).unwrap(), "");
        assert_eq!(sink.len(), 1);
    }
}
