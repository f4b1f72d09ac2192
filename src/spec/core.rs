use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::{Map, Value};

use crate::events::Handler;
use crate::host::NodeId;

/// Declarative description of a UI subtree.
#[derive(Debug, Clone, Default)]
pub enum Spec {
    /// Absent spec; renders as an empty text node.
    #[default]
    Empty,
    /// Primitive value already coerced to text.
    Text(String),
    Element(Rc<ElementSpec>),
    Widget(Rc<WidgetModel>),
    /// Wire value matching no variant cleanly. Rendered as text plus a
    /// diagnostic.
    Malformed(Value),
}

impl Spec {
    pub fn text(value: impl Into<String>) -> Self {
        Spec::Text(value.into())
    }

    pub fn element(name: impl Into<String>) -> ElementBuilder {
        ElementBuilder::new(name)
    }

    pub fn widget(name: impl Into<String>) -> WidgetBuilder {
        WidgetBuilder::new(name)
    }

    /// Short label used in logs.
    pub fn describe(&self) -> &'static str {
        match self {
            Spec::Empty => "empty",
            Spec::Text(_) => "text",
            Spec::Element(_) => "element",
            Spec::Widget(_) => "widget",
            Spec::Malformed(_) => "malformed",
        }
    }
}

impl From<&str> for Spec {
    fn from(value: &str) -> Self {
        Spec::Text(value.to_string())
    }
}

impl From<String> for Spec {
    fn from(value: String) -> Self {
        Spec::Text(value)
    }
}

impl From<&String> for Spec {
    fn from(value: &String) -> Self {
        Spec::Text(value.clone())
    }
}

impl From<bool> for Spec {
    fn from(value: bool) -> Self {
        Spec::Text(value.to_string())
    }
}

impl From<f64> for Spec {
    fn from(value: f64) -> Self {
        Spec::Text(format_number(value))
    }
}

macro_rules! integer_specs {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Spec {
                fn from(value: $ty) -> Self {
                    Spec::Text(value.to_string())
                }
            }
        )*
    };
}

integer_specs!(i32, i64, u32, u64, usize);

impl<T: Into<Spec>> From<Option<T>> for Spec {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Spec::Empty)
    }
}

impl From<Rc<ElementSpec>> for Spec {
    fn from(value: Rc<ElementSpec>) -> Self {
        Spec::Element(value)
    }
}

impl From<ElementSpec> for Spec {
    fn from(value: ElementSpec) -> Self {
        Spec::Element(Rc::new(value))
    }
}

impl From<Rc<WidgetModel>> for Spec {
    fn from(value: Rc<WidgetModel>) -> Self {
        Spec::Widget(value)
    }
}

impl From<&Rc<WidgetModel>> for Spec {
    fn from(value: &Rc<WidgetModel>) -> Self {
        Spec::Widget(Rc::clone(value))
    }
}

/// Text form of a number: integral values drop the fraction, infinities and
/// NaN use their conventional names.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Element description: tag, optional namespace, decorations and children.
#[derive(Debug, Default)]
pub struct ElementSpec {
    pub name: String,
    pub namespace: Option<String>,
    pub attributes: BTreeMap<String, String>,
    /// `Value::Null` entries are treated as absent.
    pub properties: BTreeMap<String, Value>,
    pub events: BTreeMap<String, Handler>,
    pub children: Vec<Spec>,
}

impl ElementSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Fluent construction of element specs.
#[derive(Debug)]
pub struct ElementBuilder {
    spec: ElementSpec,
}

impl ElementBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            spec: ElementSpec::new(name),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.spec.namespace = Some(namespace.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.spec.attributes.insert(name.into(), value.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.spec.properties.insert(name.into(), value.into());
        self
    }

    pub fn on(mut self, event: impl Into<String>, handler: Handler) -> Self {
        self.spec.events.insert(event.into(), handler);
        self
    }

    pub fn child(mut self, child: impl Into<Spec>) -> Self {
        self.spec.children.push(child.into());
        self
    }

    pub fn children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Spec>,
    {
        self.spec.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn into_element(self) -> Rc<ElementSpec> {
        Rc::new(self.spec)
    }

    pub fn build(self) -> Spec {
        Spec::Element(self.into_element())
    }
}

impl From<ElementBuilder> for Spec {
    fn from(value: ElementBuilder) -> Self {
        value.build()
    }
}

/// Model object handed to a widget function.
///
/// After the widget renders, the model remembers the host node it produced so
/// event handlers can re-render the same subtree with the same model.
#[derive(Debug)]
pub struct WidgetModel {
    widget: String,
    fields: RefCell<Map<String, Value>>,
    node: Cell<Option<NodeId>>,
}

impl WidgetModel {
    pub fn new(widget: impl Into<String>) -> Rc<Self> {
        Self::with_fields(widget, Map::new())
    }

    pub fn with_fields(widget: impl Into<String>, fields: Map<String, Value>) -> Rc<Self> {
        Rc::new(Self {
            widget: widget.into(),
            fields: RefCell::new(fields),
            node: Cell::new(None),
        })
    }

    pub fn widget(&self) -> &str {
        &self.widget
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.fields.borrow().get(key).cloned()
    }

    /// Field value, `Value::Null` when missing.
    pub fn value(&self, key: &str) -> Value {
        self.get(key).unwrap_or(Value::Null)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.borrow_mut().insert(key.into(), value.into());
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut self.fields.borrow_mut())
    }

    pub fn fields(&self) -> Ref<'_, Map<String, Value>> {
        self.fields.borrow()
    }

    /// Host node produced by the most recent render of this model.
    pub fn node(&self) -> Option<NodeId> {
        self.node.get()
    }

    pub(crate) fn bind(&self, node: NodeId) {
        self.node.set(Some(node));
    }

    /// Wire form: the identifier under `widget` plus every field.
    pub fn to_json(&self) -> Value {
        let mut map = self.fields.borrow().clone();
        map.insert("widget".to_string(), Value::String(self.widget.clone()));
        Value::Object(map)
    }
}

/// Fluent construction of widget specs.
#[derive(Debug)]
pub struct WidgetBuilder {
    widget: String,
    fields: Map<String, Value>,
}

impl WidgetBuilder {
    pub fn new(widget: impl Into<String>) -> Self {
        Self {
            widget: widget.into(),
            fields: Map::new(),
        }
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn into_model(self) -> Rc<WidgetModel> {
        WidgetModel::with_fields(self.widget, self.fields)
    }

    pub fn build(self) -> Spec {
        Spec::Widget(self.into_model())
    }
}

impl From<WidgetBuilder> for Spec {
    fn from(value: WidgetBuilder) -> Self {
        value.build()
    }
}
