//! Widget registry and the diagnostic channel for specs that fail to resolve.

mod core;

pub use core::{Diagnostic, DiagnosticKind, ErrorSink, WidgetFn, WidgetRegistry};
