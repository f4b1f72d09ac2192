//! Arena-backed host tree.
//!
//! Nodes are never deallocated: detached nodes stay addressable so callers
//! holding a [`NodeId`] (for example a widget back-reference) keep a valid
//! handle. Every mutation is appended to a log that tests inspect.

use std::collections::BTreeMap;

use serde_json::Value;

use super::core::{HostTree, NodeId, NodeKind};
use crate::error::{HostError, HostResult};
use crate::events::Handler;

/// Mutations applied to a [`MemoryTree`], in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, value: String },
    SetText { node: NodeId, value: String },
    SetAttribute { node: NodeId, name: String, value: String },
    RemoveAttribute { node: NodeId, name: String },
    SetProperty { node: NodeId, name: String, value: Value },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
    InsertBefore { parent: NodeId, child: NodeId, reference: Option<NodeId> },
    RemoveChild { parent: NodeId, child: NodeId },
    ReplaceChild { parent: NodeId, new_child: NodeId, old_child: NodeId },
}

impl Mutation {
    /// True for attribute, property and listener changes.
    pub fn is_decoration(&self) -> bool {
        matches!(
            self,
            Mutation::SetAttribute { .. }
                | Mutation::RemoveAttribute { .. }
                | Mutation::SetProperty { .. }
                | Mutation::AddListener { .. }
                | Mutation::RemoveListener { .. }
        )
    }
}

#[derive(Debug)]
enum NodeData {
    Element {
        tag: String,
        namespace: Option<String>,
        attributes: BTreeMap<String, String>,
        properties: BTreeMap<String, Value>,
        listeners: Vec<(String, Handler)>,
    },
    Text(String),
}

#[derive(Debug)]
struct MemoryNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory element/text tree implementing [`HostTree`].
///
/// The arena only grows: replaced and removed subtrees keep their slots, so
/// a long-running re-render loop should either set a capacity limit or build
/// a fresh tree. Ids are `u32`, which caps the arena at `u32::MAX` nodes.
#[derive(Debug, Default)]
pub struct MemoryTree {
    nodes: Vec<MemoryNode>,
    capacity_limit: Option<usize>,
    mutations: Vec<Mutation>,
    layout_flushes: u64,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to allocate more than `limit` nodes, failing with
    /// [`HostError::CapacityExhausted`].
    pub fn with_capacity_limit(limit: usize) -> Self {
        Self {
            capacity_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }

    pub fn layout_flushes(&self) -> u64 {
        self.layout_flushes
    }

    fn allocate(&mut self, data: NodeData) -> HostResult<NodeId> {
        if let Some(limit) = self.capacity_limit {
            if self.nodes.len() >= limit {
                return Err(HostError::CapacityExhausted { limit });
            }
        }
        let id = next_id(self.nodes.len())?;
        self.nodes.push(MemoryNode {
            data,
            parent: None,
            children: Vec::new(),
        });
        Ok(id)
    }

    fn node(&self, id: NodeId) -> HostResult<&MemoryNode> {
        self.nodes
            .get(id.raw() as usize)
            .ok_or(HostError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> HostResult<&mut MemoryNode> {
        self.nodes
            .get_mut(id.raw() as usize)
            .ok_or(HostError::UnknownNode(id))
    }

    fn element_mut(
        &mut self,
        id: NodeId,
    ) -> HostResult<(
        &mut BTreeMap<String, String>,
        &mut BTreeMap<String, Value>,
        &mut Vec<(String, Handler)>,
    )> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element {
                attributes,
                properties,
                listeners,
                ..
            } => Ok((attributes, properties, listeners)),
            NodeData::Text(_) => Err(HostError::NotAnElement(id)),
        }
    }

    fn ensure_element(&self, id: NodeId) -> HostResult<()> {
        match self.node(id)?.data {
            NodeData::Element { .. } => Ok(()),
            NodeData::Text(_) => Err(HostError::NotAnElement(id)),
        }
    }

    /// `candidate` is `node` or one of its ancestors.
    fn is_inclusive_ancestor(&self, candidate: NodeId, node: NodeId) -> HostResult<bool> {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == candidate {
                return Ok(true);
            }
            cursor = self.node(id)?.parent;
        }
        Ok(false)
    }

    fn detach(&mut self, child: NodeId) -> HostResult<()> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        self.node_mut(parent)?.children.retain(|id| *id != child);
        self.node_mut(child)?.parent = None;
        Ok(())
    }

    fn element_child_count(&self, id: NodeId) -> HostResult<usize> {
        let node = self.node(id)?;
        let mut count = 0;
        for child in &node.children {
            if matches!(self.node(*child)?.data, NodeData::Element { .. }) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Selection indices only hold when the referenced option exists.
    fn normalize_property(&self, id: NodeId, name: &str, value: Value) -> HostResult<Value> {
        let is_select = match &self.node(id)?.data {
            NodeData::Element { tag, .. } => tag.eq_ignore_ascii_case("select"),
            NodeData::Text(_) => false,
        };
        if !is_select || name != "selectedIndex" {
            return Ok(value);
        }
        let options = self.element_child_count(id)? as i64;
        match value.as_i64() {
            Some(index) if index >= 0 && index < options => Ok(value),
            _ => Ok(Value::from(-1)),
        }
    }
}

impl HostTree for MemoryTree {
    fn create_element(&mut self, tag: &str, namespace: Option<&str>) -> HostResult<NodeId> {
        let node = self.allocate(NodeData::Element {
            tag: tag.to_string(),
            namespace: namespace.map(str::to_string),
            attributes: BTreeMap::new(),
            properties: BTreeMap::new(),
            listeners: Vec::new(),
        })?;
        self.mutations.push(Mutation::CreateElement {
            node,
            tag: tag.to_string(),
        });
        Ok(node)
    }

    fn create_text(&mut self, value: &str) -> HostResult<NodeId> {
        let node = self.allocate(NodeData::Text(value.to_string()))?;
        self.mutations.push(Mutation::CreateText {
            node,
            value: value.to_string(),
        });
        Ok(node)
    }

    fn kind(&self, node: NodeId) -> HostResult<NodeKind> {
        Ok(match self.node(node)?.data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        })
    }

    fn tag_name(&self, node: NodeId) -> HostResult<&str> {
        match &self.node(node)?.data {
            NodeData::Element { tag, .. } => Ok(tag),
            NodeData::Text(_) => Err(HostError::NotAnElement(node)),
        }
    }

    fn namespace(&self, node: NodeId) -> HostResult<Option<&str>> {
        match &self.node(node)?.data {
            NodeData::Element { namespace, .. } => Ok(namespace.as_deref()),
            NodeData::Text(_) => Err(HostError::NotAnElement(node)),
        }
    }

    fn text(&self, node: NodeId) -> HostResult<&str> {
        match &self.node(node)?.data {
            NodeData::Text(value) => Ok(value),
            NodeData::Element { .. } => Err(HostError::NotText(node)),
        }
    }

    fn set_text(&mut self, node: NodeId, value: &str) -> HostResult<()> {
        match &mut self.node_mut(node)?.data {
            NodeData::Text(current) => {
                *current = value.to_string();
            }
            NodeData::Element { .. } => return Err(HostError::NotText(node)),
        }
        self.mutations.push(Mutation::SetText {
            node,
            value: value.to_string(),
        });
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> HostResult<Option<&str>> {
        match &self.node(node)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes.get(name).map(String::as_str)),
            NodeData::Text(_) => Err(HostError::NotAnElement(node)),
        }
    }

    fn attribute_names(&self, node: NodeId) -> HostResult<Vec<String>> {
        match &self.node(node)?.data {
            NodeData::Element { attributes, .. } => Ok(attributes.keys().cloned().collect()),
            NodeData::Text(_) => Err(HostError::NotAnElement(node)),
        }
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> HostResult<()> {
        let (attributes, _, _) = self.element_mut(node)?;
        attributes.insert(name.to_string(), value.to_string());
        self.mutations.push(Mutation::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> HostResult<()> {
        let (attributes, _, _) = self.element_mut(node)?;
        attributes.remove(name);
        self.mutations.push(Mutation::RemoveAttribute {
            node,
            name: name.to_string(),
        });
        Ok(())
    }

    fn property(&self, node: NodeId, name: &str) -> HostResult<Value> {
        match &self.node(node)?.data {
            NodeData::Element { properties, .. } => {
                Ok(properties.get(name).cloned().unwrap_or(Value::Null))
            }
            NodeData::Text(_) => Err(HostError::NotAnElement(node)),
        }
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: Value) -> HostResult<()> {
        let value = self.normalize_property(node, name, value)?;
        let (_, properties, _) = self.element_mut(node)?;
        if value.is_null() {
            properties.remove(name);
        } else {
            properties.insert(name.to_string(), value.clone());
        }
        self.mutations.push(Mutation::SetProperty {
            node,
            name: name.to_string(),
            value,
        });
        Ok(())
    }

    fn add_listener(&mut self, node: NodeId, event: &str, handler: &Handler) -> HostResult<()> {
        let (_, _, listeners) = self.element_mut(node)?;
        // Attaching the same handler twice for one event is a no-op.
        if listeners
            .iter()
            .any(|(name, existing)| name == event && existing.ptr_eq(handler))
        {
            return Ok(());
        }
        listeners.push((event.to_string(), handler.clone()));
        self.mutations.push(Mutation::AddListener {
            node,
            event: event.to_string(),
        });
        Ok(())
    }

    fn remove_listener(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &Handler,
    ) -> HostResult<()> {
        let (_, _, listeners) = self.element_mut(node)?;
        let before = listeners.len();
        listeners.retain(|(name, existing)| !(name == event && existing.ptr_eq(handler)));
        if listeners.len() != before {
            self.mutations.push(Mutation::RemoveListener {
                node,
                event: event.to_string(),
            });
        }
        Ok(())
    }

    fn listeners(&self, node: NodeId, event: &str) -> HostResult<Vec<Handler>> {
        match &self.node(node)?.data {
            NodeData::Element { listeners, .. } => Ok(listeners
                .iter()
                .filter(|(name, _)| name == event)
                .map(|(_, handler)| handler.clone())
                .collect()),
            NodeData::Text(_) => Ok(Vec::new()),
        }
    }

    fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> HostResult<()> {
        self.ensure_element(parent)?;
        self.node(child)?;
        if reference == Some(child) {
            return Ok(());
        }
        if self.is_inclusive_ancestor(child, parent)? {
            return Err(HostError::HierarchyCycle { parent, child });
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(HostError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }

        self.detach(child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let index = reference
            .and_then(|r| siblings.iter().position(|id| *id == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.node_mut(child)?.parent = Some(parent);
        self.mutations.push(Mutation::InsertBefore {
            parent,
            child,
            reference,
        });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> HostResult<()> {
        if self.node(child)?.parent != Some(parent) {
            return Err(HostError::NotAChild { parent, child });
        }
        self.detach(child)?;
        self.mutations.push(Mutation::RemoveChild { parent, child });
        Ok(())
    }

    fn parent(&self, node: NodeId) -> HostResult<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> HostResult<()> {
        if self.node(old_child)?.parent != Some(parent) {
            return Err(HostError::NotAChild {
                parent,
                child: old_child,
            });
        }
        if new_child == old_child {
            return Ok(());
        }
        if self.is_inclusive_ancestor(new_child, parent)? {
            return Err(HostError::HierarchyCycle {
                parent,
                child: new_child,
            });
        }

        self.detach(new_child)?;
        let siblings = &mut self.node_mut(parent)?.children;
        let Some(index) = siblings.iter().position(|id| *id == old_child) else {
            return Err(HostError::NotAChild {
                parent,
                child: old_child,
            });
        };
        siblings[index] = new_child;
        self.node_mut(new_child)?.parent = Some(parent);
        self.node_mut(old_child)?.parent = None;
        self.mutations.push(Mutation::ReplaceChild {
            parent,
            new_child,
            old_child,
        });
        Ok(())
    }

    fn children(&self, node: NodeId) -> HostResult<Vec<NodeId>> {
        Ok(self.node(node)?.children.clone())
    }

    fn flush_layout(&mut self) -> HostResult<u64> {
        self.layout_flushes += 1;
        Ok(self.layout_flushes)
    }
}

fn next_id(len: usize) -> HostResult<NodeId> {
    u32::try_from(len)
        .map(NodeId::from_raw)
        .map_err(|_| HostError::CapacityExhausted {
            limit: u32::MAX as usize,
        })
}
