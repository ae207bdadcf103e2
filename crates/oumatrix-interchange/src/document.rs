//! A small XML element tree with a writer and a parser.
//!
//! Covers what interchange documents use: elements, attributes, text,
//! CDATA sections, comments and the usual entity references. Namespaces,
//! DTDs and processing instructions beyond the prolog are not supported.

use std::fmt;

use crate::error::InterchangeError;

/// A node inside an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
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

    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
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

    /// First child element called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Concatenated text content of this element (not of its descendants).
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Text of the `<text>` child of the child element `name`.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|e| e.child("text").map(Element::text).unwrap_or_default())
    }

    /// Serialize with two-space indentation.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, 0);
        out
    }

    fn write(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push_str(&format!(" {name}=\"{}\"", escape(value)));
        }

        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');

        if self.children.iter().all(|n| matches!(n, Node::Text(_))) {
            out.push_str(&escape(&self.text()));
        } else {
            out.push('\n');
            for node in &self.children {
                match node {
                    Node::Element(e) => e.write(out, depth + 1),
                    Node::Text(t) => {
                        out.push_str(&"  ".repeat(depth + 1));
                        out.push_str(&escape(t));
                        out.push('\n');
                    }
                }
            }
            out.push_str(&indent);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

/// Escape text for use in content or a double-quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Resolve entity and character references.
pub fn unescape(text: &str) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated reference '&{}'", truncate(after)))?;
        let entity = &after[..semi];
        let resolved = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    return Err(format!("unknown entity '&{entity};'"));
                };
                code.and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid character reference '&{entity};'"))?
            }
        };
        out.push(resolved);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(10) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Deepest element nesting the reader accepts.
pub const MAX_DEPTH: usize = 256;

/// Parse a document and return its root element.
pub fn parse_document(input: &str) -> Result<Element, InterchangeError> {
    let mut reader = Reader { input, pos: 0 };
    reader.skip_misc()?;
    if reader.at_end() {
        return Err(reader.error("document is empty"));
    }
    let root = reader.element(1)?;
    reader.skip_misc()?;
    if !reader.at_end() {
        return Err(reader.error("content after the root element"));
    }
    Ok(root)
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn error(&self, reason: impl Into<String>) -> InterchangeError {
        InterchangeError::Malformed {
            line: self.input[..self.pos].matches('\n').count() + 1,
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Advance past the next occurrence of `end`.
    fn skip_past(&mut self, end: &str, what: &str) -> Result<(), InterchangeError> {
        match self.rest().find(end) {
            Some(i) => {
                self.pos += i + end.len();
                Ok(())
            }
            None => Err(self.error(format!("unterminated {what}"))),
        }
    }

    fn expect(&mut self, s: &str) -> Result<(), InterchangeError> {
        if self.starts_with(s) {
            self.pos += s.len();
            Ok(())
        } else {
            Err(self.error(format!("expected '{s}'")))
        }
    }

    /// Skip whitespace, the prolog, comments and doctype declarations.
    fn skip_misc(&mut self) -> Result<(), InterchangeError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("<?") {
                self.skip_past("?>", "processing instruction")?;
            } else if self.starts_with("<!--") {
                self.skip_past("-->", "comment")?;
            } else if self.starts_with("<!DOCTYPE") {
                self.skip_past(">", "doctype")?;
            } else {
                return Ok(());
            }
        }
    }

    fn name(&mut self) -> Result<&'a str, InterchangeError> {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.')))
            .map_or(rest.len(), |(i, _)| i);
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        self.pos += end;
        Ok(&rest[..end])
    }

    fn element(&mut self, depth: usize) -> Result<Element, InterchangeError> {
        if depth > MAX_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        self.expect("<")?;
        let mut element = Element::new(self.name()?);

        loop {
            self.skip_whitespace();
            if self.starts_with("/>") {
                self.pos += 2;
                return Ok(element);
            }
            if self.starts_with(">") {
                self.pos += 1;
                break;
            }
            if self.at_end() {
                return Err(self.error(format!("unterminated <{}> tag", element.name)));
            }
            let (name, value) = self.attribute()?;
            if element.attr(&name).is_some() {
                return Err(self.error(format!("duplicate attribute '{name}'")));
            }
            element.attributes.push((name, value));
        }

        loop {
            if self.starts_with("</") {
                self.pos += 2;
                let close = self.name()?;
                if close != element.name {
                    return Err(self.error(format!(
                        "</{close}> does not close <{}>",
                        element.name
                    )));
                }
                self.skip_whitespace();
                self.expect(">")?;
                // Whitespace between child elements is layout, not content.
                if element.elements().next().is_some() {
                    element
                        .children
                        .retain(|node| !matches!(node, Node::Text(t) if t.trim().is_empty()));
                }
                return Ok(element);
            } else if self.starts_with("<![CDATA[") {
                self.pos += "<![CDATA[".len();
                let rest = self.rest();
                let end = rest
                    .find("]]>")
                    .ok_or_else(|| self.error("unterminated CDATA section"))?;
                element.children.push(Node::Text(rest[..end].to_string()));
                self.pos += end + 3;
            } else if self.starts_with("<!--") {
                self.skip_past("-->", "comment")?;
            } else if self.starts_with("<") {
                let child = self.element(depth + 1)?;
                element.push(child);
            } else if self.at_end() {
                return Err(self.error(format!("<{}> is never closed", element.name)));
            } else {
                let rest = self.rest();
                let end = rest.find('<').unwrap_or(rest.len());
                let raw = &rest[..end];
                let text = unescape(raw).map_err(|reason| self.error(reason))?;
                self.pos += end;
                element.children.push(Node::Text(text));
            }
        }
    }

    fn attribute(&mut self) -> Result<(String, String), InterchangeError> {
        let name = self.name()?.to_string();
        self.skip_whitespace();
        self.expect("=")?;
        self.skip_whitespace();
        let quote = match self.rest().chars().next() {
            Some(q @ ('"' | '\'')) => q,
            _ => return Err(self.error(format!("value of attribute '{name}' is not quoted"))),
        };
        self.pos += 1;
        let rest = self.rest();
        let end = rest
            .find(quote)
            .ok_or_else(|| self.error(format!("unterminated value of attribute '{name}'")))?;
        let raw = &rest[..end];
        if raw.contains('<') {
            return Err(self.error(format!("'<' in value of attribute '{name}'")));
        }
        let value = unescape(raw).map_err(|reason| self.error(reason))?;
        self.pos += end + 1;
        Ok((name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn writes_nested_elements() {
        let doc = Element::new("row")
            .with_attr("key", "0")
            .with_child(Element::new("name").with_child(Element::new("text").with_text("A & B")))
            .with_child(Element::new("empty"));
        assert_eq!(
            doc.to_xml(),
            "<row key=\"0\">\n  <name>\n    <text>A &amp; B</text>\n  </name>\n  <empty/>\n</row>\n"
        );
    }

    #[test]
    fn parses_prolog_comments_and_attributes() {
        let root = parse_document(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- header -->\n<quiz>\n  <question type='oumatrix'><inputtype>single</inputtype></question>\n</quiz>\n",
        )
        .unwrap();
        assert_eq!(root.name, "quiz");
        let question = root.child("question").unwrap();
        assert_eq!(question.attr("type"), Some("oumatrix"));
        assert_eq!(question.child("inputtype").unwrap().text(), "single");
    }

    #[test]
    fn resolves_references_and_cdata() {
        let root =
            parse_document("<t>&lt;p&gt; &#65;&#x42; &apos;x&quot; <![CDATA[<b>raw & bold</b>]]></t>")
                .unwrap();
        assert_eq!(root.text(), "<p> AB 'x\" <b>raw & bold</b>");
    }

    #[test]
    fn child_text_reads_nested_text_element() {
        let root = parse_document("<row><name><text>Row 1</text></name><blank/></row>").unwrap();
        assert_eq!(root.child_text("name").as_deref(), Some("Row 1"));
        assert_eq!(root.child_text("blank").as_deref(), Some(""));
        assert_eq!(root.child_text("missing"), None);
    }

    #[test]
    fn whitespace_only_text_is_kept() {
        let root = parse_document("<row>\n  <text> </text>\n  <name>\n  </name>\n</row>").unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.child("text").unwrap().text(), " ");
        assert_eq!(root.child_text("text"), Some(String::new()));
    }

    #[test]
    fn deep_nesting_is_rejected() {
        let open = "<a>".repeat(10_000);
        match parse_document(&open) {
            Err(InterchangeError::Malformed { line, reason }) => {
                assert_eq!(line, 1);
                assert_eq!(reason, "nesting too deep");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let nested = format!("{}{}", "<a>".repeat(MAX_DEPTH), "</a>".repeat(MAX_DEPTH));
        assert!(parse_document(&nested).is_ok());
        let deeper = format!("{}{}", "<a>".repeat(MAX_DEPTH + 1), "</a>".repeat(MAX_DEPTH + 1));
        assert!(parse_document(&deeper).is_err());
    }

    #[test]
    fn malformed_documents_report_line() {
        let err = parse_document("<a>\n<b>\n</a>").unwrap_err();
        match err {
            InterchangeError::Malformed { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("does not close <b>"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }

        for bad in [
            "",
            "<a",
            "<a>",
            "<a x=1/>",
            "<a x=\"1\" x=\"2\"/>",
            "<a>&bogus;</a>",
            "<a>&#xZZ;</a>",
            "<a/><b/>",
            "<a><![CDATA[open</a>",
        ] {
            assert!(
                matches!(parse_document(bad), Err(InterchangeError::Malformed { .. })),
                "accepted {bad:?}"
            );
        }
    }

    proptest! {
        #[test]
        fn written_text_reads_back(text in "[^\\x00-\\x08\\x0b\\x0c\\x0e-\\x1f]{0,40}") {
            let doc = Element::new("text").with_text(text.clone()).with_attr("v", text.clone());
            let back = parse_document(&doc.to_xml()).unwrap();
            prop_assert_eq!(back.attr("v"), Some(text.as_str()));
            prop_assert_eq!(back.text(), text);
        }
    }
}
