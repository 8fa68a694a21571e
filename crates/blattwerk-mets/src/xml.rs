// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Small owned XML document model on top of quick-xml events.
//
// METS enrichment mutates the document and writes it back, so a tree is
// required rather than a streaming pass. Element and attribute names are
// kept exactly as written (including namespace prefixes); lookups compare
// against the local part so differently-prefixed documents still resolve.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use blattwerk_core::error::{BlattwerkError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written in the source, e.g. `mets:div`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute lookup by qualified or local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name || local_part(key) == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attributes.iter_mut().find(|(key, _)| *key == name) {
            slot.1 = value;
        } else {
            self.attributes.push((name, value));
        }
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// First direct child element with the given local name.
    pub fn first(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|element| element.is(local))
    }

    pub fn first_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|element| element.is(local))
    }

    /// All direct child elements with the given local name.
    pub fn all(&self, local: &str) -> Vec<&XmlElement> {
        self.elements().filter(|element| element.is(local)).collect()
    }

    /// Depth-first list of all descendant elements (self excluded).
    pub fn descendants(&self) -> Vec<&XmlElement> {
        let mut out = Vec::new();
        for element in self.elements() {
            out.push(element);
            out.extend(element.descendants());
        }
        out
    }

    /// Concatenated, whitespace-normalised text of this element and its
    /// descendants.
    pub fn text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        collect_text(self, &mut parts);
        parts.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(XmlNode::Text(text.into()));
    }

    pub fn insert_element_first(&mut self, element: XmlElement) {
        self.children.insert(0, XmlNode::Element(element));
    }
}

fn local_part(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

fn collect_text(element: &XmlElement, out: &mut Vec<String>) {
    for node in &element.children {
        match node {
            XmlNode::Text(text) => out.push(text.clone()),
            XmlNode::Element(child) => collect_text(child, out),
        }
    }
}

/// Parse an XML document into its root element.
pub fn parse(input: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| BlattwerkError::Parse(format!("malformed XML: {err}")))?;
        match event {
            Event::Start(start) => {
                stack.push(element_from(&start)?);
            }
            Event::Empty(start) => {
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| BlattwerkError::Parse("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let value = text
                    .unescape()
                    .map_err(|err| BlattwerkError::Parse(format!("bad text content: {err}")))?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    if let Some(top) = stack.last_mut() {
                        top.push_text(trimmed);
                    }
                }
            }
            Event::CData(data) => {
                let value = String::from_utf8_lossy(data.as_ref()).into_owned();
                if let Some(top) = stack.last_mut() {
                    top.push_text(value);
                }
            }
            Event::Eof => break,
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(BlattwerkError::Parse("unclosed element".into()));
    }
    root.ok_or_else(|| BlattwerkError::Parse("document has no root element".into()))
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|err| BlattwerkError::Parse(format!("bad attribute: {err}")))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| BlattwerkError::Parse(format!("bad attribute value: {err}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.push_element(element);
            Ok(())
        }
        None => {
            if root.is_some() {
                return Err(BlattwerkError::Parse("multiple root elements".into()));
            }
            *root = Some(element);
            Ok(())
        }
    }
}

/// Serialise a document with declaration and two-space indentation.
pub fn to_string_pretty(root: &XmlElement) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|err| BlattwerkError::MetsWrite(err.to_string()))?;
    write_element(&mut writer, root)?;
    String::from_utf8(writer.into_inner())
        .map_err(|err| BlattwerkError::MetsWrite(format!("non-UTF8 output: {err}")))
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    if element.children.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|err| BlattwerkError::MetsWrite(err.to_string()))?;
        return Ok(());
    }
    writer
        .write_event(Event::Start(start))
        .map_err(|err| BlattwerkError::MetsWrite(err.to_string()))?;
    for node in &element.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(|err| BlattwerkError::MetsWrite(err.to_string()))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(|err| BlattwerkError::MetsWrite(err.to_string()))?;
    Ok(())
}
