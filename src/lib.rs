//! Declarative spec-to-host-tree reconciler.
//!
//! Callers describe the tree they want as a [`Spec`] (text, elements or
//! registered widgets) and the [`Reconciler`] patches an existing host tree
//! into that shape with as few mutations as it can. The [`Runtime`] adds an
//! event loop on top: bubbling dispatch, handler-requested re-renders and
//! post-render callbacks that run once layout has been flushed.
//!
//! Hosts plug in through [`HostTree`]; [`MemoryTree`] is the in-memory
//! implementation used by the demos, benches and tests.

pub mod error;
pub mod events;
pub mod host;
pub mod logging;
pub mod metrics;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod runtime;
pub mod spec;

pub use error::{HostError, HostResult, ReconcileError, Result};
pub use events::{EventContext, Handler, HostEvent};
pub use host::{
    HostTree, MemoryTree, Mutation, NodeId, NodeKind, ancestors, find_first_by_tag, text_content,
};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, WriterSink,
};
pub use metrics::{MetricSnapshot, PassStats, ReconcileMetrics};
pub use reconcile::{DEFAULT_MAX_WIDGET_DEPTH, Reconciler};
pub use registry::{Diagnostic, DiagnosticKind, ErrorSink, WidgetFn, WidgetRegistry};
pub use render::{MarkupRenderer, RendererSettings};
pub use runtime::audit::{
    NullRuntimeAudit, RecordingAudit, RuntimeAudit, RuntimeAuditEvent, RuntimeAuditEventBuilder,
    RuntimeAuditStage,
};
pub use runtime::diagnostics::{CollectingErrorSink, LogErrorSink, MetricsReporter};
pub use runtime::{DispatchOutcome, RenderCallback, Runtime, RuntimeConfig, RuntimeEvent};
pub use spec::{
    ElementBuilder, ElementSpec, HandlerTable, Spec, WidgetBuilder, WidgetModel, format_number,
};
