//! Error surface for the reconciler and its host adapters.
//!
//! Recoverable spec problems never show up here; they are reported as
//! [`Diagnostic`](crate::registry::Diagnostic) records instead.

mod types;

pub use types::{HostError, HostResult, ReconcileError, Result};
