//! Event handler references and the context handlers run with.
//!
//! Handlers are compared by `Rc` identity: two closures with identical bodies
//! are still distinct listeners, so a spec that builds a fresh closure on
//! every render gets its listener detached and reattached on every render.

use std::fmt;
use std::rc::Rc;

use crate::host::{HostTree, NodeId};
use crate::spec::WidgetModel;

type HandlerFn = dyn Fn(&mut EventContext<'_>);

/// Shared reference to an event listener.
#[derive(Clone)]
pub struct Handler(Rc<HandlerFn>);

impl Handler {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&mut EventContext<'_>) + 'static,
    {
        Self(Rc::new(handler))
    }

    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn call(&self, ctx: &mut EventContext<'_>) {
        (self.0)(ctx)
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// An event delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEvent {
    pub name: String,
    pub target: NodeId,
}

impl HostEvent {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }
}

/// Context passed to handlers so they can touch the host tree and request
/// re-renders without re-entering the reconciler.
pub struct EventContext<'a> {
    event: &'a HostEvent,
    current_target: NodeId,
    host: &'a mut dyn HostTree,
    rerenders: Vec<Rc<WidgetModel>>,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl<'a> EventContext<'a> {
    pub(crate) fn new(
        event: &'a HostEvent,
        current_target: NodeId,
        host: &'a mut dyn HostTree,
    ) -> Self {
        Self {
            event,
            current_target,
            host,
            rerenders: Vec::new(),
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn event(&self) -> &HostEvent {
        self.event
    }

    /// Node the event was dispatched to.
    pub fn target(&self) -> NodeId {
        self.event.target
    }

    /// Node whose listener is currently running.
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn host(&self) -> &dyn HostTree {
        &*self.host
    }

    pub fn host_mut(&mut self) -> &mut dyn HostTree {
        &mut *self.host
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    /// Skip ancestors; remaining listeners on the current node still run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Queue a re-render of `model` against its back-referenced node. The
    /// render is applied after the handler returns.
    pub fn rerender(&mut self, model: &Rc<WidgetModel>) {
        self.rerenders.push(Rc::clone(model));
    }

    pub(crate) fn into_outcome(self) -> HandlerOutcome {
        HandlerOutcome {
            rerenders: self.rerenders,
            default_prevented: self.default_prevented,
            propagation_stopped: self.propagation_stopped,
        }
    }
}

pub(crate) struct HandlerOutcome {
    pub(crate) rerenders: Vec<Rc<WidgetModel>>,
    pub(crate) default_prevented: bool,
    pub(crate) propagation_stopped: bool,
}
