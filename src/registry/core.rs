use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::{Value, json};

use crate::logging::{LogEvent, LogLevel, event_with_fields, json_kv, json_str};
use crate::spec::{Spec, WidgetModel};

/// Function turning a widget model into the spec it renders as.
pub type WidgetFn = Rc<dyn Fn(&Rc<WidgetModel>) -> Spec>;

/// Mapping from widget identifiers to their render functions.
///
/// Lookups are exact string matches. The reconciler only reads the registry.
#[derive(Default, Clone)]
pub struct WidgetRegistry {
    entries: HashMap<String, WidgetFn>,
}

impl WidgetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `render` under `name`, returning the function it replaced.
    pub fn register<F>(&mut self, name: impl Into<String>, render: F) -> Option<WidgetFn>
    where
        F: Fn(&Rc<WidgetModel>) -> Spec + 'static,
    {
        self.entries.insert(name.into(), Rc::new(render))
    }

    pub fn resolve(&self, name: &str) -> Option<WidgetFn> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetRegistry")
            .field("widgets", &self.names())
            .finish()
    }
}

/// Recoverable problems met while resolving a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    UnresolvedWidget { widget: String },
    MalformedSpec,
    WidgetDepthExceeded { widget: String, limit: usize },
}

/// A diagnostic record: what went wrong and the offending model.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub model: Value,
}

impl Diagnostic {
    pub fn unresolved(model: &WidgetModel) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedWidget {
                widget: model.widget().to_string(),
            },
            model: model.to_json(),
        }
    }

    pub fn malformed(value: &Value) -> Self {
        Self {
            kind: DiagnosticKind::MalformedSpec,
            model: value.clone(),
        }
    }

    pub fn depth_exceeded(model: &WidgetModel, limit: usize) -> Self {
        Self {
            kind: DiagnosticKind::WidgetDepthExceeded {
                widget: model.widget().to_string(),
                limit,
            },
            model: model.to_json(),
        }
    }

    pub fn message(&self) -> &'static str {
        match self.kind {
            DiagnosticKind::UnresolvedWidget { .. } => "widget_not_found",
            DiagnosticKind::MalformedSpec => "malformed_spec",
            DiagnosticKind::WidgetDepthExceeded { .. } => "widget_depth_exceeded",
        }
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        let mut fields = vec![json_kv("model", self.model.clone())];
        match &self.kind {
            DiagnosticKind::UnresolvedWidget { widget } => {
                fields.push(json_str("widget", widget.as_str()));
            }
            DiagnosticKind::MalformedSpec => {}
            DiagnosticKind::WidgetDepthExceeded { widget, limit } => {
                fields.push(json_str("widget", widget.as_str()));
                fields.push(json_kv("limit", json!(limit)));
            }
        }
        event_with_fields(LogLevel::Warn, target, self.message(), fields)
    }
}

/// Receives diagnostics. Implementations must not panic.
pub trait ErrorSink {
    fn report(&self, diagnostic: &Diagnostic);
}
