//! JSON wire shape for specs.
//!
//! ```text
//! name?        string               element tag
//! namespace?   string               alias: xmlns
//! attributes?  {name: string}       alias: attrs
//! properties?  {name: any}          alias: props
//! events?      {event: handler}     handler names resolved via HandlerTable
//! nodes?       spec | [spec] | primitive
//! widget?      string               widget identifier, other keys become fields
//! ```

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde_json::{Map, Value};

use super::core::{ElementSpec, Spec, WidgetModel, format_number};
use crate::events::Handler;

/// Named handlers that wire specs can reference from their `events` map.
#[derive(Debug, Default, Clone)]
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        self.handlers.insert(name.into(), handler)
    }

    pub fn with(mut self, name: impl Into<String>, handler: Handler) -> Self {
        self.insert(name, handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }
}

impl Spec {
    /// Parse a wire value. Values that match no variant cleanly become
    /// [`Spec::Malformed`] and degrade at render time.
    pub fn from_json(value: &Value) -> Spec {
        parse(value, &HandlerTable::default())
    }

    pub fn from_json_with(value: &Value, handlers: &HandlerTable) -> Spec {
        parse(value, handlers)
    }
}

fn parse(value: &Value, handlers: &HandlerTable) -> Spec {
    match value {
        Value::Null => Spec::Empty,
        Value::Bool(flag) => Spec::Text(flag.to_string()),
        Value::Number(_) | Value::String(_) => Spec::Text(scalar_text(value)),
        Value::Array(_) => Spec::Text(value.to_string()),
        Value::Object(map) => parse_object(value, map, handlers),
    }
}

fn parse_object(raw: &Value, map: &Map<String, Value>, handlers: &HandlerTable) -> Spec {
    match map.get("widget") {
        None | Some(Value::Null) => {}
        Some(Value::String(id)) if id.is_empty() => {}
        Some(id @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => {
            let mut fields = map.clone();
            fields.remove("widget");
            return Spec::Widget(WidgetModel::with_fields(scalar_text(id), fields));
        }
        Some(_) => return Spec::Malformed(raw.clone()),
    }

    match map.get("name") {
        None | Some(Value::Null) => Spec::Text(raw.to_string()),
        Some(Value::String(name)) if name.is_empty() => Spec::Malformed(raw.clone()),
        Some(Value::String(name)) => match parse_element(name, map, handlers) {
            Some(element) => Spec::Element(Rc::new(element)),
            None => Spec::Malformed(raw.clone()),
        },
        Some(_) => Spec::Malformed(raw.clone()),
    }
}

fn parse_element(
    name: &str,
    map: &Map<String, Value>,
    handlers: &HandlerTable,
) -> Option<ElementSpec> {
    let mut element = ElementSpec::new(name);

    match field(map, "namespace", "xmlns") {
        None | Some(Value::Null) => {}
        Some(Value::String(ns)) => element.namespace = Some(ns.clone()),
        Some(_) => return None,
    }

    if let Some(attributes) = object_field(map, "attributes", "attrs")? {
        element.attributes = attributes
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), scalar_text(value)))
            .collect();
    }

    if let Some(properties) = object_field(map, "properties", "props")? {
        element.properties = properties
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect::<BTreeMap<_, _>>();
    }

    if let Some(events) = object_field(map, "events", "events")? {
        for (event, reference) in events {
            let handler = reference.as_str().and_then(|name| handlers.get(name))?;
            element.events.insert(event.clone(), handler.clone());
        }
    }

    element.children = children(map.get("nodes"), handlers);
    Some(element)
}

/// Children normalize to a sequence: absent → empty, single → one element.
fn children(nodes: Option<&Value>, handlers: &HandlerTable) -> Vec<Spec> {
    match nodes {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(|item| parse(item, handlers)).collect(),
        Some(single) => vec![parse(single, handlers)],
    }
}

fn field<'a>(map: &'a Map<String, Value>, key: &str, alias: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| map.get(alias))
}

/// `Some(None)` when absent, `None` when present but not an object.
fn object_field<'a>(
    map: &'a Map<String, Value>,
    key: &str,
    alias: &str,
) -> Option<Option<&'a Map<String, Value>>> {
    match field(map, key, alias) {
        None | Some(Value::Null) => Some(None),
        Some(Value::Object(inner)) => Some(Some(inner)),
        Some(_) => None,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                int.to_string()
            } else if let Some(uint) = number.as_u64() {
                uint.to_string()
            } else {
                format_number(number.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_nested_element() {
        let spec = Spec::from_json(&json!({
            "name": "div",
            "attrs": {"class": "static", "data-n": 3, "gone": null},
            "nodes": {"name": "p", "nodes": ["text ", {"name": "br"}, 7]},
        }));
        let Spec::Element(div) = spec else {
            panic!("expected element");
        };
        assert_eq!(div.attributes.len(), 2);
        assert_eq!(div.attributes["data-n"], "3");
        assert_eq!(div.children.len(), 1);
        let Spec::Element(p) = &div.children[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(p.children.len(), 3);
        assert!(matches!(&p.children[2], Spec::Text(t) if t == "7"));
    }

    #[test]
    fn widget_fields_exclude_identifier() {
        let spec = Spec::from_json(&json!({"widget": "Counter", "count": 5}));
        let Spec::Widget(model) = spec else {
            panic!("expected widget");
        };
        assert_eq!(model.widget(), "Counter");
        assert_eq!(model.value("count"), json!(5));
        assert!(model.get("widget").is_none());
    }

    #[test]
    fn widget_wins_over_name() {
        let spec = Spec::from_json(&json!({"widget": "Row", "name": "div"}));
        assert!(matches!(spec, Spec::Widget(_)));
    }

    #[test]
    fn empty_widget_name_falls_through_to_element() {
        let spec = Spec::from_json(&json!({"widget": "", "name": "div"}));
        let Spec::Element(div) = spec else {
            panic!("expected element");
        };
        assert_eq!(div.name, "div");
        assert!(matches!(
            Spec::from_json(&json!({"widget": "", "title": "x"})),
            Spec::Text(_)
        ));
    }

    #[test]
    fn empty_tag_is_malformed() {
        assert!(matches!(
            Spec::from_json(&json!({"name": ""})),
            Spec::Malformed(_)
        ));
    }

    #[test]
    fn non_string_tag_is_malformed() {
        assert!(matches!(
            Spec::from_json(&json!({"name": 42})),
            Spec::Malformed(_)
        ));
        assert!(matches!(
            Spec::from_json(&json!({"name": "div", "attributes": "x"})),
            Spec::Malformed(_)
        ));
    }

    #[test]
    fn events_resolve_through_handler_table() {
        let handlers = HandlerTable::new().with("toggle", Handler::new(|_ctx| {}));
        let ok = Spec::from_json_with(
            &json!({"name": "li", "events": {"click": "toggle"}}),
            &handlers,
        );
        let Spec::Element(li) = ok else {
            panic!("expected element");
        };
        assert!(li.events["click"].ptr_eq(handlers.get("toggle").unwrap()));

        let unknown = Spec::from_json_with(
            &json!({"name": "li", "events": {"click": "missing"}}),
            &handlers,
        );
        assert!(matches!(unknown, Spec::Malformed(_)));
    }

    #[test]
    fn plain_objects_and_scalars_become_text() {
        assert!(matches!(Spec::from_json(&json!(null)), Spec::Empty));
        assert!(matches!(Spec::from_json(&json!(1.5)), Spec::Text(ref t) if t == "1.5"));
        assert!(
            matches!(Spec::from_json(&json!({"title": "x"})), Spec::Text(ref t) if t == r#"{"title":"x"}"#)
        );
    }
}
