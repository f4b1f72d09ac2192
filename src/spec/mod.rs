//! Spec vocabulary: the declarative description the reconciler renders.
//!
//! Specs are built either through the typed builders in `core` or parsed
//! from their JSON wire shape in `wire`.

mod core;
mod wire;

pub use core::{ElementBuilder, ElementSpec, Spec, WidgetBuilder, WidgetModel, format_number};
pub use wire::HandlerTable;
