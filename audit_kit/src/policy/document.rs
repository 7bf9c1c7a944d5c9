//! Policy document tree
//!
//! Bus configuration files are parsed with `roxmltree` and copied into a small
//! owned tree. Element tags are stored qualified (`{uri}local` when the
//! element is namespaced) and matched on their local name only, so
//! `<ns:policy>` and `<policy>` are treated the same.
//!
//! Nesting depth is checked with a flat scan before `roxmltree` runs, and the
//! owned tree is built without recursion, so a hostile file fails on its own
//! instead of exhausting the stack.

use thiserror::Error;

/// Deepest element nesting accepted in a policy document
pub const MAX_NESTING_DEPTH: usize = 1024;

/// Errors from parsing a policy document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Not well-formed XML
    #[error(transparent)]
    Xml(#[from] roxmltree::Error),

    /// Elements nested deeper than [`MAX_NESTING_DEPTH`]
    #[error("nesting too deep")]
    TooDeep,

    /// Markup inside a DOCTYPE internal subset literal (entity expansion)
    #[error("markup inside DOCTYPE entity declarations is not supported")]
    EntityMarkup,
}

/// A single element of a policy document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyElement {
    /// Qualified tag name (`policy`, `{urn:x}policy`, or `ns:policy`)
    pub tag: String,

    /// Attributes in document order, names qualified like tags
    pub attributes: Vec<(String, String)>,

    /// Child elements in document order
    pub children: Vec<PolicyElement>,
}

impl PolicyElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    #[cfg(test)]
    pub fn with_child(mut self, child: PolicyElement) -> Self {
        self.children.push(child);
        self
    }

    /// Tag name without any namespace qualifier
    pub fn local_name(&self) -> &str {
        local_name(&self.tag)
    }

    /// Value of the unqualified attribute `name`
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// This element and all elements below it, depth-first in document order
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }
}

/// Pre-order iterator over an element subtree (the root included)
pub struct Descendants<'a> {
    stack: Vec<&'a PolicyElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a PolicyElement;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.children.iter().rev());
        Some(element)
    }
}

/// Strip a namespace qualifier from a tag name
///
/// Handles Clark notation (`{uri}local`) and prefixed names (`ns:local`).
pub fn local_name(tag: &str) -> &str {
    if let Some((_, local)) = tag.split_once('}') {
        return local;
    }
    match tag.split_once(':') {
        Some((_, local)) => local,
        None => tag,
    }
}

/// A parsed policy document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    pub root: PolicyElement,
}

impl PolicyDocument {
    /// Parse XML text into a document
    ///
    /// DOCTYPE declarations are accepted since bus configuration files carry
    /// one.
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        check_nesting(text, MAX_NESTING_DEPTH)?;

        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, options)?;

        Ok(Self {
            root: convert_tree(xml.root_element()),
        })
    }

    #[cfg(test)]
    pub fn from_root(root: PolicyElement) -> Self {
        Self { root }
    }

    /// Every element of the document, depth-first in document order
    pub fn elements(&self) -> Descendants<'_> {
        self.root.descendants()
    }
}

/// Copy the element tree below `root`, depth-first with an explicit stack
fn convert_tree(root: roxmltree::Node<'_, '_>) -> PolicyElement {
    let mut ancestors = Vec::new();
    let mut element = convert_element(root);
    let mut children = root.children();

    loop {
        if let Some(child) = children.find(|node| node.is_element()) {
            ancestors.push((element, children));
            element = convert_element(child);
            children = child.children();
            continue;
        }

        match ancestors.pop() {
            Some((mut parent, rest)) => {
                parent.children.push(element);
                element = parent;
                children = rest;
            }
            None => return element,
        }
    }
}

/// Tag and attributes of `node`, without children
fn convert_element(node: roxmltree::Node<'_, '_>) -> PolicyElement {
    let tag_name = node.tag_name();
    let attributes = node
        .attributes()
        .map(|attr| (qualify(attr.namespace(), attr.name()), attr.value().to_string()))
        .collect();

    PolicyElement {
        tag: qualify(tag_name.namespace(), tag_name.name()),
        attributes,
        children: Vec::new(),
    }
}

fn qualify(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(uri) => format!("{{{}}}{}", uri, name),
        None => name.to_string(),
    }
}

/// Fail if elements nest deeper than `limit`
///
/// A flat byte scan over the markup. Comments, CDATA sections, processing
/// instructions and declarations are skipped, and quoted attribute values may
/// hold `>`. Well-formedness is left to the parser.
fn check_nesting(text: &str, limit: usize) -> Result<(), DocumentError> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut pos = 0;

    while let Some(start) = find_byte(bytes, pos, b'<') {
        let rest = bytes.get(start..).unwrap_or_default();
        pos = if rest.starts_with(b"<!--") {
            skip_past(bytes, start + 4, b"-->")
        } else if rest.starts_with(b"<![CDATA[") {
            skip_past(bytes, start + 9, b"]]>")
        } else if rest.starts_with(b"<?") {
            skip_past(bytes, start + 2, b"?>")
        } else if rest.starts_with(b"<!") {
            skip_declaration(bytes, start + 2)?
        } else if rest.starts_with(b"</") {
            depth = depth.saturating_sub(1);
            skip_tag(bytes, start + 2).0
        } else {
            if depth + 1 > limit {
                return Err(DocumentError::TooDeep);
            }
            let (end, self_closing) = skip_tag(bytes, start + 1);
            if !self_closing {
                depth += 1;
            }
            end
        };
    }

    Ok(())
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&byte| byte == needle)
        .map(|offset| from + offset)
}

/// Index just past the next `terminator` at or after `from`, or the end
fn skip_past(bytes: &[u8], from: usize, terminator: &[u8]) -> usize {
    bytes
        .get(from..)
        .and_then(|rest| {
            rest.windows(terminator.len())
                .position(|window| window == terminator)
        })
        .map_or(bytes.len(), |offset| from + offset + terminator.len())
}

/// Index just past the tag's closing `>`, and whether it ended with `/>`
fn skip_tag(bytes: &[u8], from: usize) -> (usize, bool) {
    let mut quote = None;
    let mut previous = 0u8;

    for (index, &byte) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(open) if byte == open => quote = None,
            Some(_) => {}
            None if byte == b'"' || byte == b'\'' => quote = Some(byte),
            None if byte == b'>' => return (index + 1, previous == b'/'),
            None => {}
        }
        previous = byte;
    }

    (bytes.len(), false)
}

/// Index just past a `<!...>` declaration, including a `[...]` internal subset
///
/// Entity values in the internal subset expand into the document, so a quoted
/// literal there must not carry markup the depth scan cannot see.
fn skip_declaration(bytes: &[u8], from: usize) -> Result<usize, DocumentError> {
    let mut quote = None;
    let mut brackets = 0usize;
    let mut index = from;

    while let Some(&byte) = bytes.get(index) {
        match quote {
            Some(open) if byte == open => quote = None,
            Some(_) if byte == b'<' && brackets > 0 => return Err(DocumentError::EntityMarkup),
            Some(_) => {}
            None => match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'[' => brackets += 1,
                b']' => brackets = brackets.saturating_sub(1),
                b'<' if bytes.get(index..).is_some_and(|rest| rest.starts_with(b"<!--")) => {
                    index = skip_past(bytes, index + 4, b"-->");
                    continue;
                }
                b'>' if brackets == 0 => return Ok(index + 1),
                _ => {}
            },
        }
        index += 1;
    }

    Ok(bytes.len())
}
