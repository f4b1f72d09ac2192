//! Reconciliation engine.
//!
//! `core` holds the recursive resolve/patch pass, `diff` the two-map diff
//! shared by attributes, properties and listeners.

mod core;
mod diff;

pub use core::{DEFAULT_MAX_WIDGET_DEPTH, Reconciler};
