use std::io::Write;

use crate::error::Result;
use crate::host::{HostTree, NodeId, NodeKind};

/// Elements that never carry children or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Renderer parameters.
#[derive(Debug, Clone, Default)]
pub struct RendererSettings {
    /// Spaces per nesting level. `None` renders everything on one line.
    pub indent: Option<usize>,
}

/// Serializes a host subtree to HTML-like markup.
///
/// Attributes are emitted in host order, text and attribute values are
/// escaped, and an element whose namespace differs from its parent's gets an
/// `xmlns` attribute. Properties and listeners are not part of the markup.
#[derive(Debug, Clone, Default)]
pub struct MarkupRenderer {
    settings: RendererSettings,
}

impl MarkupRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn with_default() -> Self {
        Self::new(RendererSettings::default())
    }

    pub fn pretty(indent: usize) -> Self {
        Self::new(RendererSettings {
            indent: Some(indent),
        })
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    pub fn render<H>(&self, writer: &mut impl Write, host: &H, root: NodeId) -> Result<()>
    where
        H: HostTree + ?Sized,
    {
        self.render_node(writer, host, root, None, 0)?;
        if self.settings.indent.is_some() {
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn render_to_string<H>(&self, host: &H, root: NodeId) -> Result<String>
    where
        H: HostTree + ?Sized,
    {
        let mut buffer = Vec::new();
        self.render(&mut buffer, host, root)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn render_node<H>(
        &self,
        writer: &mut impl Write,
        host: &H,
        node: NodeId,
        parent_namespace: Option<&str>,
        depth: usize,
    ) -> Result<()>
    where
        H: HostTree + ?Sized,
    {
        if depth > 0 {
            self.write_break(writer, depth)?;
        }
        if host.kind(node)? == NodeKind::Text {
            write!(writer, "{}", escape_text(host.text(node)?))?;
            return Ok(());
        }

        let tag = host.tag_name(node)?;
        let namespace = host.namespace(node)?;
        write!(writer, "<{tag}")?;
        if let Some(ns) = namespace.filter(|ns| Some(*ns) != parent_namespace) {
            write!(writer, " xmlns=\"{}\"", escape_attribute(ns))?;
        }
        for name in host.attribute_names(node)? {
            let value = host.attribute(node, &name)?.unwrap_or_default();
            write!(writer, " {name}=\"{}\"", escape_attribute(value))?;
        }
        write!(writer, ">")?;

        if VOID_ELEMENTS.iter().any(|void| tag.eq_ignore_ascii_case(void)) {
            return Ok(());
        }

        let children = host.children(node)?;
        for child in &children {
            self.render_node(writer, host, *child, namespace, depth + 1)?;
        }
        if !children.is_empty() {
            self.write_break(writer, depth)?;
        }
        write!(writer, "</{tag}>")?;
        Ok(())
    }

    /// Newline plus indentation in pretty mode; nothing otherwise.
    fn write_break(&self, writer: &mut impl Write, depth: usize) -> Result<()> {
        if let Some(width) = self.settings.indent {
            write!(writer, "\n{:indent$}", "", indent = width * depth)?;
        }
        Ok(())
    }
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryTree;

    fn sample(tree: &mut MemoryTree) -> NodeId {
        let list = tree.create_element("ul", None).unwrap();
        tree.set_attribute(list, "class", "todo \"main\"").unwrap();
        for label in ["milk & eggs", "<bread>"] {
            let item = tree.create_element("li", None).unwrap();
            let text = tree.create_text(label).unwrap();
            tree.insert_before(item, text, None).unwrap();
            tree.insert_before(list, item, None).unwrap();
        }
        list
    }

    #[test]
    fn renders_compact_markup_with_escaping() {
        let mut tree = MemoryTree::new();
        let list = sample(&mut tree);
        let markup = MarkupRenderer::with_default()
            .render_to_string(&tree, list)
            .unwrap();
        assert_eq!(
            markup,
            "<ul class=\"todo &quot;main&quot;\"><li>milk &amp; eggs</li><li>&lt;bread&gt;</li></ul>"
        );
    }

    #[test]
    fn pretty_output_indents_children() {
        let mut tree = MemoryTree::new();
        let list = sample(&mut tree);
        let markup = MarkupRenderer::pretty(2).render_to_string(&tree, list).unwrap();
        let expected = "<ul class=\"todo &quot;main&quot;\">\n  <li>\n    milk &amp; eggs\n  </li>\n  <li>\n    &lt;bread&gt;\n  </li>\n</ul>\n";
        assert_eq!(markup, expected);
    }

    #[test]
    fn void_elements_and_namespaces() {
        let mut tree = MemoryTree::new();
        let svg_ns = "http://www.w3.org/2000/svg";
        let root = tree.create_element("div", None).unwrap();
        let input = tree.create_element("input", None).unwrap();
        let svg = tree.create_element("svg", Some(svg_ns)).unwrap();
        let circle = tree.create_element("circle", Some(svg_ns)).unwrap();
        tree.insert_before(svg, circle, None).unwrap();
        tree.insert_before(root, input, None).unwrap();
        tree.insert_before(root, svg, None).unwrap();

        let markup = MarkupRenderer::with_default()
            .render_to_string(&tree, root)
            .unwrap();
        assert_eq!(
            markup,
            format!("<div><input><svg xmlns=\"{svg_ns}\"><circle></circle></svg></div>")
        );
    }
}
