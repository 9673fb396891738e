//! Markup parsing and programmatic construction.
//!
//! Accepts the HTML subset component layouts are written in: elements with
//! quoted, unquoted or boolean attributes, self-closing and void tags, text
//! with the common entities, comments and doctypes (both skipped). Tag and
//! attribute names are lowercased.

use crate::error::MarkupError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
}

/// An element description, either parsed or built by hand:
///
/// ```rust
/// use trellis_dom::MarkupElement;
///
/// let card = MarkupElement::new("section")
///     .attr("class", "card")
///     .child(MarkupElement::new("h2").attr("data-ref", "title"))
///     .child(MarkupElement::new("div").attr("data-slot", "body"));
/// assert_eq!(card.children.len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkupElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn child(mut self, child: MarkupElement) -> Self {
        self.children.push(MarkupNode::Element(child));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(MarkupNode::Text(text.into()));
        self
    }

    pub fn with_children(mut self, children: Vec<MarkupNode>) -> Self {
        self.children = children;
        self
    }
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "br", "col", "hr", "img", "input", "link", "meta", "source", "wbr",
];

pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Parse `src` into its top-level nodes.
pub fn parse(src: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    let mut parser = Parser { src, pos: 0 };
    let mut open: Vec<MarkupElement> = Vec::new();
    let mut top: Vec<MarkupNode> = Vec::new();

    while parser.pos < src.len() {
        if parser.rest().starts_with("<!--") {
            parser.skip_comment()?;
        } else if parser.rest().starts_with("</") {
            let at = parser.pos;
            let name = parser.closing_tag()?;
            let Some(element) = open.pop() else {
                return Err(MarkupError::UnmatchedClose { found: name, at });
            };
            if element.tag != name {
                return Err(MarkupError::Mismatched {
                    expected: element.tag,
                    found: name,
                    at,
                });
            }
            push_node(&mut open, &mut top, MarkupNode::Element(element));
        } else if parser.rest().starts_with("<!") {
            parser.skip_declaration()?;
        } else if parser.at_open_tag() {
            let (element, self_closing) = parser.open_tag()?;
            if self_closing || is_void(&element.tag) {
                push_node(&mut open, &mut top, MarkupNode::Element(element));
            } else {
                open.push(element);
            }
        } else {
            let text = parser.text();
            if !text.is_empty() {
                push_node(&mut open, &mut top, MarkupNode::Text(text));
            }
        }
    }

    match open.pop() {
        Some(element) => Err(MarkupError::Unclosed(element.tag)),
        None => Ok(top),
    }
}

fn push_node(open: &mut [MarkupElement], top: &mut Vec<MarkupNode>, node: MarkupNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top.push(node),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn at_open_tag(&self) -> bool {
        let bytes = self.rest().as_bytes();
        bytes.len() > 1 && bytes[0] == b'<' && bytes[1].is_ascii_alphabetic()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_comment(&mut self) -> Result<(), MarkupError> {
        let body = self.pos + 4;
        match self.src[body..].find("-->") {
            Some(end) => {
                self.pos = body + end + 3;
                Ok(())
            }
            None => Err(MarkupError::UnexpectedEof(self.src.len())),
        }
    }

    fn skip_declaration(&mut self) -> Result<(), MarkupError> {
        match self.rest().find('>') {
            Some(end) => {
                self.pos += end + 1;
                Ok(())
            }
            None => Err(MarkupError::UnexpectedEof(self.src.len())),
        }
    }

    fn name(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
        {
            self.pos += 1;
        }
        self.src[start..self.pos].to_ascii_lowercase()
    }

    fn closing_tag(&mut self) -> Result<String, MarkupError> {
        let at = self.pos;
        self.pos += 2;
        let name = self.name();
        if name.is_empty() {
            return Err(MarkupError::MalformedTag(at));
        }
        self.skip_ws();
        match self.peek() {
            Some(b'>') => {
                self.pos += 1;
                Ok(name)
            }
            Some(_) => Err(MarkupError::MalformedTag(at)),
            None => Err(MarkupError::UnexpectedEof(self.pos)),
        }
    }

    fn open_tag(&mut self) -> Result<(MarkupElement, bool), MarkupError> {
        let at = self.pos;
        self.pos += 1;
        let mut element = MarkupElement::new(self.name());

        loop {
            self.skip_ws();
            if self.rest().starts_with("/>") {
                self.pos += 2;
                return Ok((element, true));
            }
            match self.peek() {
                None => return Err(MarkupError::UnexpectedEof(self.pos)),
                Some(b'>') => {
                    self.pos += 1;
                    return Ok((element, false));
                }
                Some(_) => {}
            }

            let start = self.pos;
            while self
                .peek()
                .is_some_and(|b| !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/'))
            {
                self.pos += 1;
            }
            if start == self.pos {
                return Err(MarkupError::MalformedTag(at));
            }
            let name = self.src[start..self.pos].to_ascii_lowercase();

            self.skip_ws();
            let value = if self.peek() == Some(b'=') {
                self.pos += 1;
                self.skip_ws();
                self.attr_value()?
            } else {
                String::new()
            };
            element.attrs.push((name, value));
        }
    }

    fn attr_value(&mut self) -> Result<String, MarkupError> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let start = self.pos + 1;
                let end = self.src[start..]
                    .find(quote as char)
                    .ok_or(MarkupError::UnexpectedEof(self.src.len()))?;
                self.pos = start + end + 1;
                Ok(decode_entities(&self.src[start..start + end]))
            }
            Some(_) => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|b| !b.is_ascii_whitespace() && b != b'>')
                {
                    self.pos += 1;
                }
                Ok(decode_entities(&self.src[start..self.pos]))
            }
            None => Err(MarkupError::UnexpectedEof(self.pos)),
        }
    }

    /// Text up to the next tag, comment or declaration. A `<` that starts
    /// none of those is kept as text.
    fn text(&mut self) -> String {
        let start = self.pos;
        let bytes = self.src.as_bytes();
        let mut end = start + 1;
        while end < bytes.len() {
            if bytes[end] == b'<'
                && bytes
                    .get(end + 1)
                    .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'/' | b'!'))
            {
                break;
            }
            end += 1;
        }
        // `end` only ever stops on an ASCII byte or the end of input, so it is
        // a char boundary.
        self.pos = end;
        decode_entities(&self.src[start..end])
    }
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|d| d.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, semi + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

pub(crate) fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &MarkupNode) -> &MarkupElement {
        match node {
            MarkupNode::Element(el) => el,
            MarkupNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let nodes = parse(
            r#"<div class="card" data-ref=root hidden><span title='x &amp; y'>Hi</span></div>"#,
        )
        .unwrap();
        assert_eq!(nodes.len(), 1);
        let div = element(&nodes[0]);
        assert_eq!(div.tag, "div");
        assert_eq!(
            div.attrs,
            vec![
                ("class".to_string(), "card".to_string()),
                ("data-ref".to_string(), "root".to_string()),
                ("hidden".to_string(), String::new()),
            ]
        );
        let span = element(&div.children[0]);
        assert_eq!(span.attrs[0].1, "x & y");
        assert_eq!(span.children, vec![MarkupNode::Text("Hi".into())]);
    }

    #[test]
    fn void_and_self_closing_tags_do_not_open() {
        let nodes = parse("<p>a<br>b<img src=x.png/><span/></p>").unwrap();
        let p = element(&nodes[0]);
        let tags: Vec<_> = p
            .children
            .iter()
            .filter_map(|n| match n {
                MarkupNode::Element(e) => Some(e.tag.as_str()),
                MarkupNode::Text(_) => None,
            })
            .collect();
        assert_eq!(tags, vec!["br", "img", "span"]);
    }

    #[test]
    fn comments_doctype_and_whitespace() {
        let nodes = parse("<!doctype html>\n<!-- note -->\n<main></main>\n").unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0], MarkupNode::Text("\n".into()));
        assert_eq!(element(&nodes[2]).tag, "main");
    }

    #[test]
    fn lone_angle_bracket_is_text() {
        let nodes = parse("<p>1 < 2</p>").unwrap();
        assert_eq!(
            element(&nodes[0]).children,
            vec![MarkupNode::Text("1 < 2".into())]
        );
    }

    #[test]
    fn numeric_entities_decode() {
        assert_eq!(decode_entities("&#65;&#x42;&unknown;&"), "AB&unknown;&");
    }

    #[test]
    fn reports_structural_errors() {
        assert_eq!(
            parse("<div><span></div>"),
            Err(MarkupError::Mismatched {
                expected: "span".into(),
                found: "div".into(),
                at: 11,
            })
        );
        assert_eq!(
            parse("</div>"),
            Err(MarkupError::UnmatchedClose {
                found: "div".into(),
                at: 0,
            })
        );
        assert_eq!(parse("<div>"), Err(MarkupError::Unclosed("div".into())));
        assert_eq!(parse("<div class=\"x"), Err(MarkupError::UnexpectedEof(13)));
        assert_eq!(parse("<div =x></div>"), Err(MarkupError::MalformedTag(0)));
    }

    #[test]
    fn builder_matches_parsed_markup() {
        let built = MarkupElement::new("UL")
            .attr("data-slot", "items")
            .child(MarkupElement::new("li").text("one"));
        let parsed = parse(r#"<ul data-slot="items"><li>one</li></ul>"#).unwrap();
        assert_eq!(parsed, vec![MarkupNode::Element(built)]);
    }
}
