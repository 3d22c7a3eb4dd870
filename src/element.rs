//! Minimal mutable WXS element tree
//!
//! Owned representation of the WXS elements this crate reads and mutates:
//! Directory/Component/File subtrees and the registry-entry elements nested
//! inside them. Parsed from `roxmltree` nodes and written back out with a
//! small escaped writer. Element and attribute names are local names; the
//! WiX namespace belongs to the enclosing document, not to spliced children.

use serde::{Deserialize, Serialize};

/// A single WXS element with ordered attributes and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WxsElement {
    /// Local element name (e.g. "Component", "RegistryValue")
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<WxsElement>,
    /// Direct text content, if any
    pub text: Option<String>,
}

impl WxsElement {
    /// Create an empty element
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Add an attribute (builder style)
    pub fn with_attr<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Add a child element (builder style)
    pub fn with_child(mut self, child: WxsElement) -> Self {
        self.children.push(child);
        self
    }

    /// Get an attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value
    pub fn set_attr<V: Into<String>>(&mut self, name: &str, value: V) {
        let value = value.into();
        if let Some(entry) = self.attributes.iter_mut().find(|(k, _)| k == name) {
            entry.1 = value;
        } else {
            self.attributes.push((name.to_string(), value));
        }
    }

    /// Convert a parsed node (and its descendants) into an owned element
    pub fn from_node(node: roxmltree::Node) -> Self {
        let mut element = Self::new(node.tag_name().name());

        for attr in node.attributes() {
            element
                .attributes
                .push((attr.name().to_string(), attr.value().to_string()));
        }

        let mut text = String::new();
        for child in node.children() {
            if child.is_element() {
                element.children.push(Self::from_node(child));
            } else if child.is_text() {
                text.push_str(child.text().unwrap_or(""));
            }
        }

        let text = text.trim();
        if !text.is_empty() {
            element.text = Some(text.to_string());
        }

        element
    }

    /// Find the first element with the given name, in document order
    /// (the element itself is considered first)
    pub fn find_first(&self, name: &str) -> Option<&WxsElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_first(name))
    }

    /// Mutable variant of [`find_first`](Self::find_first)
    pub fn find_first_mut(&mut self, name: &str) -> Option<&mut WxsElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_first_mut(name))
    }

    /// Detach and return the first direct child with the given name
    pub fn take_child(&mut self, name: &str) -> Option<WxsElement> {
        let idx = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(idx))
    }

    /// Rewrite identifiers throughout the subtree.
    ///
    /// Every occurrence of each `(old, new)` pair is replaced in attribute
    /// values and text content, including occurrences embedded in longer
    /// values such as `[#fil…]` file references inside registry values.
    /// Each pair is applied once per value; unrelated values are untouched.
    pub fn rewrite_ids(&mut self, renames: &[(String, String)]) {
        for (_, value) in &mut self.attributes {
            for (old, new) in renames {
                if value.contains(old.as_str()) {
                    *value = value.replace(old.as_str(), new);
                }
            }
        }
        if let Some(text) = &mut self.text {
            for (old, new) in renames {
                if text.contains(old.as_str()) {
                    *text = text.replace(old.as_str(), new);
                }
            }
        }
        for child in &mut self.children {
            child.rewrite_ids(renames);
        }
    }

    /// Count of direct child elements
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Serialize the subtree as indented WXS text
    pub fn to_wxs(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        out.push_str(&pad);
        out.push('<');
        out.push_str(&self.name);

        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }

        if self.children.is_empty() && self.text.is_none() {
            out.push_str(" />\n");
            return;
        }

        out.push_str(">\n");

        if let Some(text) = &self.text {
            out.push_str(&"  ".repeat(indent + 1));
            out.push_str(&escape_text(text));
            out.push('\n');
        }

        for child in &self.children {
            child.write(out, indent + 1);
        }

        out.push_str(&pad);
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

/// Escape special characters in attribute values
fn escape_attr(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape special characters in text content
fn escape_text(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }
    result
}
