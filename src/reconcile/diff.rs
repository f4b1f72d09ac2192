use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::HostResult;
use crate::events::Handler;
use crate::host::{HostTree, NodeId};
use crate::metrics::PassStats;

/// Apply/remove primitives for one family of keyed decorations.
pub(crate) trait MapPatch<V> {
    fn same(&self, previous: &V, next: &V) -> bool;

    /// Values that count as "not set" in a map.
    fn is_unset(&self, _value: &V) -> bool {
        false
    }

    fn remove(&mut self, key: &str, previous: &V) -> HostResult<()>;

    fn apply(&mut self, key: &str, previous: Option<&V>, next: &V) -> HostResult<()>;
}

/// Diff `previous` against `next`: keys that disappeared are removed, keys
/// whose value changed are applied. Unchanged keys are not touched.
pub(crate) fn diff_maps<V, P>(
    previous: Option<&BTreeMap<String, V>>,
    next: &BTreeMap<String, V>,
    patch: &mut P,
) -> HostResult<()>
where
    P: MapPatch<V>,
{
    if let Some(previous) = previous {
        for (key, old) in previous {
            if patch.is_unset(old) {
                continue;
            }
            let gone = next.get(key).is_none_or(|value| patch.is_unset(value));
            if gone {
                patch.remove(key, old)?;
            }
        }
    }

    for (key, value) in next {
        if patch.is_unset(value) {
            continue;
        }
        let old = previous
            .and_then(|previous| previous.get(key))
            .filter(|old| !patch.is_unset(old));
        match old {
            Some(old) if patch.same(old, value) => {}
            _ => patch.apply(key, old, value)?,
        }
    }
    Ok(())
}

pub(crate) struct AttributePatch<'a, H: ?Sized> {
    pub(crate) host: &'a mut H,
    pub(crate) node: NodeId,
    pub(crate) stats: &'a mut PassStats,
}

impl<H> MapPatch<String> for AttributePatch<'_, H>
where
    H: HostTree + ?Sized,
{
    fn same(&self, previous: &String, next: &String) -> bool {
        previous == next
    }

    fn remove(&mut self, key: &str, _previous: &String) -> HostResult<()> {
        self.host.remove_attribute(self.node, key)?;
        self.stats.attribute_removals += 1;
        Ok(())
    }

    fn apply(&mut self, key: &str, _previous: Option<&String>, next: &String) -> HostResult<()> {
        self.host.set_attribute(self.node, key, next)?;
        self.stats.attribute_sets += 1;
        Ok(())
    }
}

pub(crate) struct PropertyPatch<'a, H: ?Sized> {
    pub(crate) host: &'a mut H,
    pub(crate) node: NodeId,
    pub(crate) stats: &'a mut PassStats,
}

impl<H> MapPatch<Value> for PropertyPatch<'_, H>
where
    H: HostTree + ?Sized,
{
    fn same(&self, previous: &Value, next: &Value) -> bool {
        previous == next
    }

    fn is_unset(&self, value: &Value) -> bool {
        value.is_null()
    }

    fn remove(&mut self, key: &str, _previous: &Value) -> HostResult<()> {
        self.host.set_property(self.node, key, Value::Null)?;
        self.stats.property_clears += 1;
        Ok(())
    }

    fn apply(&mut self, key: &str, _previous: Option<&Value>, next: &Value) -> HostResult<()> {
        self.host.set_property(self.node, key, next.clone())?;
        self.stats.property_sets += 1;
        Ok(())
    }
}

pub(crate) struct ListenerPatch<'a, H: ?Sized> {
    pub(crate) host: &'a mut H,
    pub(crate) node: NodeId,
    pub(crate) stats: &'a mut PassStats,
}

impl<H> MapPatch<Handler> for ListenerPatch<'_, H>
where
    H: HostTree + ?Sized,
{
    fn same(&self, previous: &Handler, next: &Handler) -> bool {
        previous.ptr_eq(next)
    }

    fn remove(&mut self, key: &str, previous: &Handler) -> HostResult<()> {
        self.host.remove_listener(self.node, key, previous)?;
        self.stats.listener_detaches += 1;
        Ok(())
    }

    fn apply(&mut self, key: &str, previous: Option<&Handler>, next: &Handler) -> HostResult<()> {
        if let Some(previous) = previous {
            self.remove(key, previous)?;
        }
        self.host.add_listener(self.node, key, next)?;
        self.stats.listener_attaches += 1;
        Ok(())
    }
}
