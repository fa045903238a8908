//! Minimal element tree over quick-xml events.
//!
//! Carrier responses are small, so they are read fully into a tree of
//! [`Element`]s before any field is looked at. Building the tree doubles as the
//! well-formedness check: unbalanced tags, a missing root, more than one root
//! or stray text around the root are all rejected.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Errors raised while reading a response document.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("XML processing error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    #[error("cannot decode document text: {0}")]
    Encoding(String),

    #[error("invalid escape sequence: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("unknown entity reference: &{0};")]
    UnknownEntity(String),

    #[error("document has no root element")]
    MissingRoot,

    #[error("unexpected content outside the root element: {0}")]
    UnexpectedContent(String),

    #[error("unexpected end of document inside <{0}>")]
    UnclosedElement(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    children: Vec<Node>,
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    /// First child element with the given name.
    pub fn child<'a>(&'a self, name: &str) -> Option<&'a Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Follows a chain of child names, e.g. `["sender", "doorcode"]`.
    pub fn path(&self, names: &[&str]) -> Option<&Element> {
        names
            .iter()
            .try_fold(self, |current, name| current.child(name))
    }

    /// Text directly inside this element, ignoring nested elements.
    pub fn own_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// All text of this element and its descendants, in document order.
    pub fn full_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Trimmed text of a child element, `None` when the child is absent.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name).map(|e| e.full_text().trim().to_string())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }
}

/// Parses a complete document and returns its root element.
///
/// Names and text are decoded with the encoding named in the XML declaration,
/// UTF-8 when there is none.
pub fn parse_document(xml: &[u8]) -> Result<Element, XmlError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event()?;
        let decoder = reader.decoder();
        let decode = |bytes: &[u8]| -> Result<String, XmlError> {
            decoder
                .decode(bytes)
                .map(|text| text.into_owned())
                .map_err(|e| XmlError::Encoding(e.to_string()))
        };

        match event {
            Event::Start(e) => {
                let name = decode(e.name().as_ref())?;
                if root.is_some() {
                    return Err(XmlError::UnexpectedContent(format!("<{}>", name)));
                }
                stack.push(Element::new(name));
            }
            Event::Empty(e) => {
                let name = decode(e.name().as_ref())?;
                attach(&mut stack, &mut root, Element::new(name))?;
            }
            Event::End(_) => {
                // quick-xml has already matched the end name against the open tag
                let Some(finished) = stack.pop() else {
                    return Err(XmlError::UnexpectedContent("end tag".to_string()));
                };
                attach(&mut stack, &mut root, finished)?;
            }
            Event::Text(e) => {
                let raw = decode(&e)?;
                let text = quick_xml::escape::unescape(&raw)?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(e) => {
                let text = decode(&e)?;
                push_text(&mut stack, &text)?;
            }
            Event::GeneralRef(e) => {
                let entity = decode(&e)?;
                let resolved = resolve_entity(&entity)?;
                push_text(&mut stack, &resolved)?;
            }
            Event::Eof => break,
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::UnclosedElement(open.name.clone()));
    }
    root.ok_or(XmlError::MissingRoot)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => return Err(XmlError::UnexpectedContent(format!("<{}>", element.name))),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(current) => current.push_text(text),
        None if text.trim().is_empty() => {}
        None => return Err(XmlError::UnexpectedContent(text.trim().to_string())),
    }
    Ok(())
}

fn resolve_entity(entity: &str) -> Result<String, XmlError> {
    if let Some(code) = entity.strip_prefix('#') {
        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        return value
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| XmlError::UnknownEntity(entity.to_string()));
    }

    quick_xml::escape::resolve_predefined_entity(entity)
        .map(str::to_string)
        .ok_or_else(|| XmlError::UnknownEntity(entity.to_string()))
}
