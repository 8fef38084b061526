//! Minimal owned XML element tree used for page content.
//!
//! Element names are stored without the `one:` prefix; [`Element::write_xml`]
//! adds it back when serializing and [`parse`] strips it when reading.

use crate::errors::{AppResult, JournalError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

pub const NAMESPACE_PREFIX: &str = "one";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_cdata(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::CData(text.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| name == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|element| element.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children.iter_mut().find_map(|node| match node {
            Node::Element(element) if element.name == name => Some(element),
            _ => None,
        })
    }

    pub fn child_index(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, Node::Element(element) if element.name == name))
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn first_child_node(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn insert(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    pub fn remove_children_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, Node::Element(element) if element.name == name));
        before - self.children.len()
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Text of the first CDATA or text child.
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            Node::CData(text) | Node::Text(text) => Some(text.as_str()),
            Node::Element(_) => None,
        })
    }

    /// Replaces the first text-bearing child, or appends a CDATA node.
    pub fn set_cdata(&mut self, text: impl Into<String>) {
        let text = text.into();
        for node in self.children.iter_mut() {
            if matches!(node, Node::CData(_) | Node::Text(_)) {
                *node = Node::CData(text);
                return;
            }
        }
        self.children.push(Node::CData(text));
    }

    /// Child-index path to the last descendant element named `name`, in
    /// document order.
    pub fn path_to_last(&self, name: &str) -> Option<Vec<usize>> {
        let mut found = None;
        let mut path = Vec::new();
        collect_last(self, name, &mut path, &mut found);
        found
    }

    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for index in path {
            current = match current.children.get_mut(*index) {
                Some(Node::Element(element)) => element,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn descendants_named<'a>(&'a self, name: &'a str) -> Vec<&'a Element> {
        let mut out = Vec::new();
        collect_named(self, name, &mut out);
        out
    }

    pub fn write_xml(&self, out: &mut String) {
        out.push('<');
        push_qualified(out, &self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_xml(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');
        for node in &self.children {
            match node {
                Node::Element(element) => element.write_xml(out),
                Node::Text(text) => out.push_str(&escape_xml(text)),
                Node::CData(text) => {
                    out.push_str("<![CDATA[");
                    out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
                    out.push_str("]]>");
                }
            }
        }
        out.push_str("</");
        push_qualified(out, &self.name);
        out.push('>');
    }
}

/// Parses store XML into an element tree. Namespace declarations are dropped,
/// whitespace between elements is ignored and adjacent CDATA sections merge.
pub fn parse(raw: &str) -> AppResult<Element> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut open: Vec<Element> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => open.push(open_element(&start)?),
            Event::Empty(start) => {
                let element = open_element(&start)?;
                close_element(&mut open, &mut root, element)?;
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| JournalError::Malformed("unexpected closing tag".to_string()))?;
                close_element(&mut open, &mut root, element)?;
            }
            Event::Text(text) => {
                let value = text.unescape().map_err(malformed)?;
                if let Some(parent) = open.last_mut() {
                    parent.children.push(Node::Text(value.into_owned()));
                }
            }
            Event::CData(cdata) => {
                let value = String::from_utf8(cdata.into_inner().into_owned()).map_err(malformed)?;
                if let Some(parent) = open.last_mut() {
                    match parent.children.last_mut() {
                        Some(Node::CData(previous)) => previous.push_str(&value),
                        _ => parent.children.push(Node::CData(value)),
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(JournalError::Malformed(format!(
            "element one:{} is never closed",
            unclosed.name
        )));
    }
    root.ok_or_else(|| JournalError::Malformed("document has no root element".to_string()))
}

fn open_element(start: &BytesStart<'_>) -> AppResult<Element> {
    let local_name = start.local_name();
    let name = std::str::from_utf8(local_name.as_ref()).map_err(malformed)?;
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(malformed)?;
        let key = std::str::from_utf8(attribute.key.as_ref()).map_err(malformed)?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let value = attribute.unescape_value().map_err(malformed)?;
        element.set_attr(key, value.into_owned());
    }
    Ok(element)
}

fn close_element(open: &mut [Element], root: &mut Option<Element>, element: Element) -> AppResult<()> {
    match open.last_mut() {
        Some(parent) => parent.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(JournalError::Malformed(format!(
                "second root element one:{}",
                element.name
            )))
        }
    }
    Ok(())
}

fn malformed(error: impl std::fmt::Display) -> JournalError {
    JournalError::Malformed(error.to_string())
}

fn collect_last(element: &Element, name: &str, path: &mut Vec<usize>, found: &mut Option<Vec<usize>>) {
    for (index, node) in element.children.iter().enumerate() {
        if let Node::Element(child) = node {
            path.push(index);
            if child.name == name {
                *found = Some(path.clone());
            }
            collect_last(child, name, path, found);
            path.pop();
        }
    }
}

fn collect_named<'a>(element: &'a Element, name: &str, out: &mut Vec<&'a Element>) {
    for child in element.elements() {
        if child.name == name {
            out.push(child);
        }
        collect_named(child, name, out);
    }
}

fn push_qualified(out: &mut String, name: &str) {
    out.push_str(NAMESPACE_PREFIX);
    out.push(':');
    out.push_str(name);
}

pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
