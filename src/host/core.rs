use std::fmt;

use serde_json::Value;

use crate::error::HostResult;
use crate::events::Handler;

/// Opaque handle to a node owned by a host tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two node families the reconciler distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

/// Capability set the reconciler needs from a mutable element/text tree.
///
/// Every operation may fail with a [`HostError`](crate::HostError); the
/// reconciler never recovers from those and hands them back to its caller.
/// The trait is object safe so event handlers can receive `&mut dyn HostTree`.
pub trait HostTree {
    fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> HostResult<NodeId>;

    fn create_text(&mut self, value: &str) -> HostResult<NodeId>;

    fn kind(&self, node: NodeId) -> HostResult<NodeKind>;

    /// Tag name as stored by the host. Comparison against specs is
    /// ASCII case-insensitive.
    fn tag_name(&self, node: NodeId) -> HostResult<&str>;

    fn namespace(&self, node: NodeId) -> HostResult<Option<&str>>;

    fn text(&self, node: NodeId) -> HostResult<&str>;

    fn set_text(&mut self, node: NodeId, value: &str) -> HostResult<()>;

    fn attribute(&self, node: NodeId, name: &str) -> HostResult<Option<&str>>;

    fn attribute_names(&self, node: NodeId) -> HostResult<Vec<String>>;

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> HostResult<()>;

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> HostResult<()>;

    /// Read a property; unset properties read as `Value::Null`.
    fn property(&self, node: NodeId, name: &str) -> HostResult<Value>;

    fn set_property(&mut self, node: NodeId, name: &str, value: Value) -> HostResult<()>;

    fn add_listener(&mut self, node: NodeId, event: &str, handler: &Handler) -> HostResult<()>;

    fn remove_listener(&mut self, node: NodeId, event: &str, handler: &Handler)
    -> HostResult<()>;

    /// Listeners currently attached to `node` for `event`, in attach order.
    fn listeners(&self, node: NodeId, event: &str) -> HostResult<Vec<Handler>>;

    /// Insert `child` before `reference`, appending when `reference` is `None`.
    /// A child that already has a parent is moved.
    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> HostResult<()>;

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> HostResult<()>;

    fn parent(&self, node: NodeId) -> HostResult<Option<NodeId>>;

    /// Put `new_child` at the index `old_child` occupies and detach `old_child`.
    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> HostResult<()>;

    fn children(&self, node: NodeId) -> HostResult<Vec<NodeId>>;

    /// Force pending layout to be computed, returning a layout-dependent value.
    fn flush_layout(&mut self) -> HostResult<u64>;
}

/// Ancestors of `node`, nearest first.
pub fn ancestors<H>(host: &H, node: NodeId) -> HostResult<Vec<NodeId>>
where
    H: HostTree + ?Sized,
{
    let mut out = Vec::new();
    let mut cursor = host.parent(node)?;
    while let Some(id) = cursor {
        out.push(id);
        cursor = host.parent(id)?;
    }
    Ok(out)
}

/// First element (pre-order, `root` included) whose tag matches `tag`.
pub fn find_first_by_tag<H>(host: &H, root: NodeId, tag: &str) -> HostResult<Option<NodeId>>
where
    H: HostTree + ?Sized,
{
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if host.kind(id)? == NodeKind::Element {
            if host.tag_name(id)?.eq_ignore_ascii_case(tag) {
                return Ok(Some(id));
            }
            let children = host.children(id)?;
            stack.extend(children.into_iter().rev());
        }
    }
    Ok(None)
}

/// Concatenated text of every text node under `node`.
pub fn text_content<H>(host: &H, node: NodeId) -> HostResult<String>
where
    H: HostTree + ?Sized,
{
    let mut out = String::new();
    let mut stack = vec![node];
    while let Some(id) = stack.pop() {
        match host.kind(id)? {
            NodeKind::Text => out.push_str(host.text(id)?),
            NodeKind::Element => {
                let children = host.children(id)?;
                stack.extend(children.into_iter().rev());
            }
        }
    }
    Ok(out)
}
