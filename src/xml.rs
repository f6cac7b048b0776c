//! Element tree over `quick-xml` events.
//!
//! Attribute and element names are kept fully qualified (`android:name`)
//! and attribute order is preserved, so a manifest read and written back
//! only changes in whitespace.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message} (at byte {position})")]
pub struct XmlError {
    pub position: u64,
    pub message: String,
}

impl XmlError {
    fn new(position: u64, message: impl ToString) -> Self {
        XmlError {
            position,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    /// `<?target data?>`, stored without the delimiters
    ProcessingInstruction(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Sets an attribute, returning whether the element changed.
    pub fn set_attr(&mut self, name: &str, value: &str) -> bool {
        if self.attr(name) == Some(value) {
            return false;
        }
        self.attributes.insert(name.to_string(), value.to_string());
        true
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |el| el.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    /// Concatenated character data of the direct children.
    pub fn text(&self) -> Option<String> {
        let mut text = None::<String>;
        for node in &self.children {
            if let Node::Text(t) | Node::CData(t) = node {
                text.get_or_insert_with(String::new).push_str(t);
            }
        }
        text
    }

    /// Follows child indices (into `children`) down from this element.
    pub fn element_at(&self, path: &[usize]) -> Option<&Element> {
        let mut current = self;
        for &index in path {
            match current.children.get(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }

    pub fn element_at_mut(&mut self, path: &[usize]) -> Option<&mut Element> {
        let mut current = self;
        for &index in path {
            match current.children.get_mut(index) {
                Some(Node::Element(el)) => current = el,
                _ => return None,
            }
        }
        Some(current)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub version: String,
    pub encoding: Option<String>,
    pub standalone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub declaration: Option<Declaration>,
    pub doctype: Option<String>,
    /// Comments and processing instructions ahead of the root element.
    pub prolog: Vec<Node>,
    pub root: Element,
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn start_element(start: &BytesStart<'_>, position: u64) -> Result<Element, XmlError> {
    let mut el = Element::new(lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::new(position, e))?;
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::new(position, e))?
            .into_owned();
        el.attributes.insert(lossy(attr.key.as_ref()), value);
    }
    Ok(el)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    el: Element,
    position: u64,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(el));
        return Ok(());
    }
    if root.is_some() {
        return Err(XmlError::new(position, "multiple root elements"));
    }
    *root = Some(el);
    Ok(())
}

pub fn parse(source: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut declaration = None;
    let mut doctype = None;
    let mut prolog = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(XmlError::new(position, e)),
        };
        match event {
            Event::Decl(decl) => {
                let version = decl.version().map_err(|e| XmlError::new(position, e))?;
                let encoding = match decl.encoding() {
                    Some(enc) => Some(lossy(&enc.map_err(|e| XmlError::new(position, e))?)),
                    None => None,
                };
                let standalone = match decl.standalone() {
                    Some(sa) => Some(lossy(&sa.map_err(|e| XmlError::new(position, e))?)),
                    None => None,
                };
                declaration = Some(Declaration {
                    version: lossy(&version),
                    encoding,
                    standalone,
                });
            }
            Event::DocType(text) => doctype = Some(lossy(&text.into_inner())),
            Event::Start(start) => stack.push(start_element(&start, position)?),
            Event::Empty(start) => {
                let el = start_element(&start, position)?;
                attach(&mut stack, &mut root, el, position)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| XmlError::new(position, "unexpected closing tag"))?;
                attach(&mut stack, &mut root, el, position)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlError::new(position, e))?
                    .into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Text(text));
                }
            }
            Event::CData(data) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::CData(lossy(&data.into_inner())));
                }
            }
            Event::Comment(text) => {
                let comment = lossy(&text.into_inner());
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Comment(comment));
                } else if root.is_none() {
                    prolog.push(Node::Comment(comment));
                }
            }
            Event::PI(pi) => {
                let instruction = Node::ProcessingInstruction(lossy(&pi));
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(instruction);
                } else if root.is_none() {
                    prolog.push(instruction);
                }
            }
            Event::Eof => break,
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::new(
            source.len() as u64,
            format!("unclosed element <{}>", stack[stack.len() - 1].name),
        ));
    }
    let root = root.ok_or_else(|| XmlError::new(0, "no root element"))?;
    Ok(Document {
        declaration,
        doctype,
        prolog,
        root,
    })
}

impl Document {
    /// Serializes with `indent` spaces per nesting level.
    pub fn write(&self, indent: usize) -> String {
        let mut out = String::new();
        if let Some(decl) = &self.declaration {
            out.push_str(&format!("<?xml version=\"{}\"", decl.version));
            if let Some(encoding) = &decl.encoding {
                out.push_str(&format!(" encoding=\"{encoding}\""));
            }
            if let Some(standalone) = &decl.standalone {
                out.push_str(&format!(" standalone=\"{standalone}\""));
            }
            out.push_str("?>\n");
        }
        if let Some(doctype) = &self.doctype {
            out.push_str(&format!("<!DOCTYPE {doctype}>\n"));
        }
        for node in &self.prolog {
            write_markup(&mut out, node);
            out.push('\n');
        }
        write_element(&mut out, &self.root, 0, indent);
        out.push('\n');
        out
    }
}

fn write_element(out: &mut String, el: &Element, depth: usize, indent: usize) {
    let pad = " ".repeat(depth * indent);
    out.push_str(&pad);
    out.push('<');
    out.push_str(&el.name);
    for (name, value) in &el.attributes {
        out.push_str(&format!(" {}=\"{}\"", name, escape(value.as_str())));
    }

    if el.children.is_empty() {
        out.push_str(" />");
        return;
    }

    let text_only = el
        .children
        .iter()
        .all(|node| matches!(node, Node::Text(_) | Node::CData(_)));
    out.push('>');
    if text_only {
        for node in &el.children {
            write_character_data(out, node);
        }
    } else {
        let inner_pad = " ".repeat((depth + 1) * indent);
        out.push('\n');
        for node in &el.children {
            match node {
                Node::Element(child) => write_element(out, child, depth + 1, indent),
                Node::Comment(_) | Node::ProcessingInstruction(_) => {
                    out.push_str(&inner_pad);
                    write_markup(out, node);
                }
                data => {
                    out.push_str(&inner_pad);
                    write_character_data(out, data);
                }
            }
            out.push('\n');
        }
        out.push_str(&pad);
    }
    out.push_str(&format!("</{}>", el.name));
}

fn write_markup(out: &mut String, node: &Node) {
    match node {
        Node::Comment(comment) => out.push_str(&format!("<!--{comment}-->")),
        Node::ProcessingInstruction(pi) => out.push_str(&format!("<?{pi}?>")),
        _ => {}
    }
}

fn write_character_data(out: &mut String, node: &Node) {
    match node {
        Node::Text(text) => out.push_str(&escape(text.as_str())),
        Node::CData(data) => out.push_str(&format!("<![CDATA[{data}]]>")),
        _ => {}
    }
}
