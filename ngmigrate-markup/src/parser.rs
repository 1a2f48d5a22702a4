//! Template parser.
//!
//! Produces a tree of elements, text, comments and ICU expansion forms with
//! byte offsets into the input. Interpolations (`{{ }}`) stay text. Control
//! flow blocks (`@if { }`) are not recognised and stay text as well.

use ngmigrate_types::Span;
use thiserror::Error;
use tracing::debug;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarkupError {
    #[error("unterminated comment starting at byte {offset}")]
    UnterminatedComment { offset: usize },

    #[error("unterminated tag starting at byte {offset}")]
    UnterminatedTag { offset: usize },

    #[error("unterminated attribute value starting at byte {offset}")]
    UnterminatedQuote { offset: usize },

    #[error("invalid attribute at byte {offset}")]
    InvalidAttribute { offset: usize },

    #[error("unexpected closing tag </{name}> at byte {offset}")]
    UnexpectedClosingTag { name: String, offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    Text(Span),
    Comment(Span),
    Expansion(Expansion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<Attribute>,
    pub children: Vec<MarkupNode>,
    /// Whole element. Equal to `start_tag` for void and self-closing
    /// elements; an implicitly closed element ends where its parent's
    /// closing tag (or the input) starts.
    pub span: Span,
    pub start_tag: Span,
    pub name_span: Span,
    pub end_tag: Option<Span>,
    pub end_name_span: Option<Span>,
    pub self_closing: bool,
}

impl Element {
    /// `<br>`, `<input>` and friends, which never take children.
    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS
            .iter()
            .any(|void| void.eq_ignore_ascii_case(&self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Raw value text between the quotes, entities left as written.
    pub value: String,
    /// Name through the closing quote of the value.
    pub span: Span,
    pub value_span: Option<Span>,
}

/// `{switch, type, case {..} case {..}}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub switch_value: String,
    pub kind: String,
    pub cases: Vec<ExpansionCase>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionCase {
    pub value: String,
    pub children: Vec<MarkupNode>,
    pub span: Span,
}

/// Parse `markup` into root nodes, yielding an empty tree on any error.
///
/// An empty result means "nothing to migrate", never "failure".
pub fn parse_markup(markup: &str) -> Vec<MarkupNode> {
    match try_parse_markup(markup) {
        Ok(nodes) => nodes,
        Err(err) => {
            debug!(error = %err, "template did not parse; leaving it untouched");
            Vec::new()
        }
    }
}

pub fn try_parse_markup(markup: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    let mut parser = Parser {
        src: markup,
        bytes: markup.as_bytes(),
        pos: 0,
        open: Vec::new(),
        icu_depth: 0,
    };
    let (nodes, stop) = parser.parse_nodes()?;
    match stop {
        Stop::Eof => Ok(nodes),
        Stop::Close | Stop::CaseEnd => Err(parser.stray_close()),
    }
}

/// One step of a depth-first walk.
#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    Element(&'a Element),
    /// An attribute together with the element that carries it.
    Attribute {
        attr: &'a Attribute,
        host: &'a Element,
    },
}

/// Visit every element and attribute, parents before children, including
/// those nested in expansion cases.
pub fn visit_all<'a>(nodes: &'a [MarkupNode], f: &mut impl FnMut(Visit<'a>)) {
    for node in nodes {
        match node {
            MarkupNode::Element(el) => {
                f(Visit::Element(el));
                for attr in &el.attrs {
                    f(Visit::Attribute { attr, host: el });
                }
                visit_all(&el.children, f);
            }
            MarkupNode::Expansion(exp) => {
                for case in &exp.cases {
                    visit_all(&case.children, f);
                }
            }
            MarkupNode::Text(_) | MarkupNode::Comment(_) => {}
        }
    }
}

enum Stop {
    Eof,
    /// Positioned at `</`; the caller decides whose tag it is.
    Close,
    /// Positioned at the `}` ending an expansion case.
    CaseEnd,
}

struct CloseTag {
    name: String,
    span: Span,
    name_span: Span,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    open: Vec<String>,
    icu_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn at(&self, s: &str) -> bool {
        self.bytes[self.pos..].starts_with(s.as_bytes())
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn find_from(&self, from: usize, needle: &str) -> Option<usize> {
        self.src.get(from..)?.find(needle).map(|i| from + i)
    }

    fn read_while(&mut self, keep: impl Fn(u8) -> bool) -> Span {
        let start = self.pos;
        while self.peek().is_some_and(&keep) {
            self.pos += 1;
        }
        Span::new(start, self.pos)
    }

    fn text(&self, span: Span) -> String {
        self.src[span.start..span.end].to_string()
    }

    fn stray_close(&self) -> MarkupError {
        let name = self
            .peek_close_tag()
            .map(|t| t.name)
            .unwrap_or_else(|_| "}".to_string());
        MarkupError::UnexpectedClosingTag {
            name,
            offset: self.pos,
        }
    }

    fn parse_nodes(&mut self) -> Result<(Vec<MarkupNode>, Stop), MarkupError> {
        let mut nodes = Vec::new();
        let mut text_start: Option<usize> = None;

        macro_rules! flush_text {
            () => {
                if let Some(start) = text_start.take() {
                    nodes.push(MarkupNode::Text(Span::new(start, self.pos)));
                }
            };
        }

        loop {
            let Some(b) = self.peek() else {
                flush_text!();
                return Ok((nodes, Stop::Eof));
            };

            match b {
                b'<' if self.at("<!--") => {
                    flush_text!();
                    let start = self.pos;
                    let end = self
                        .find_from(start + 4, "-->")
                        .ok_or(MarkupError::UnterminatedComment { offset: start })?;
                    self.pos = end + 3;
                    nodes.push(MarkupNode::Comment(Span::new(start, self.pos)));
                }
                b'<' if self.at("<!") || self.at("<?") => {
                    flush_text!();
                    let start = self.pos;
                    let end = self
                        .find_from(start, ">")
                        .ok_or(MarkupError::UnterminatedTag { offset: start })?;
                    self.pos = end + 1;
                    nodes.push(MarkupNode::Comment(Span::new(start, self.pos)));
                }
                b'<' if self.peek_at(1) == Some(b'/') => {
                    flush_text!();
                    return Ok((nodes, Stop::Close));
                }
                b'<' if self.peek_at(1).is_some_and(|c| c.is_ascii_alphabetic()) => {
                    flush_text!();
                    let element = self.parse_element()?;
                    nodes.push(MarkupNode::Element(element));
                }
                b'{' if self.at("{{") => {
                    text_start.get_or_insert(self.pos);
                    self.pos = self
                        .find_from(self.pos + 2, "}}")
                        .map_or(self.bytes.len(), |end| end + 2);
                }
                b'{' => {
                    let start = self.pos;
                    match self.try_parse_expansion()? {
                        Some(expansion) => {
                            if let Some(t) = text_start.take() {
                                nodes.push(MarkupNode::Text(Span::new(t, start)));
                            }
                            nodes.push(MarkupNode::Expansion(expansion));
                        }
                        None => {
                            text_start.get_or_insert(start);
                            self.pos = start + 1;
                        }
                    }
                }
                b'}' if self.icu_depth > 0 => {
                    flush_text!();
                    return Ok((nodes, Stop::CaseEnd));
                }
                _ => {
                    text_start.get_or_insert(self.pos);
                    self.pos += 1;
                    // Jump to the next byte that can start markup.
                    while self
                        .peek()
                        .is_some_and(|c| !matches!(c, b'<' | b'{' | b'}'))
                    {
                        self.pos += 1;
                    }
                }
            }
        }
    }

    fn parse_element(&mut self) -> Result<Element, MarkupError> {
        let start = self.pos;
        self.pos += 1;
        let name_span = self.read_while(|b| !b.is_ascii_whitespace() && b != b'>' && b != b'/');
        let name = self.text(name_span);

        let mut attrs = Vec::new();
        let self_closing = loop {
            self.skip_ws();
            match self.peek() {
                None => return Err(MarkupError::UnterminatedTag { offset: start }),
                Some(b'>') => {
                    self.pos += 1;
                    break false;
                }
                Some(b'/') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    break true;
                }
                Some(b'/') => self.pos += 1,
                Some(_) => attrs.push(self.parse_attribute()?),
            }
        };
        let start_tag = Span::new(start, self.pos);

        let mut element = Element {
            name,
            attrs,
            children: Vec::new(),
            span: start_tag,
            start_tag,
            name_span,
            end_tag: None,
            end_name_span: None,
            self_closing,
        };

        if self_closing || element.is_void() {
            return Ok(element);
        }

        let lower = element.name.to_ascii_lowercase();

        if RAW_TEXT_ELEMENTS.contains(&lower.as_str()) {
            let needle = format!("</{lower}");
            let body_start = self.pos;
            let close = self.src[body_start..]
                .to_ascii_lowercase()
                .find(&needle)
                .map(|i| body_start + i)
                .ok_or(MarkupError::UnterminatedTag { offset: start })?;
            if close > body_start {
                element.children.push(MarkupNode::Text(Span::new(body_start, close)));
            }
            self.pos = close;
            let tag = self.peek_close_tag()?;
            self.close_element(&mut element, tag);
            return Ok(element);
        }

        self.open.push(element.name.clone());
        let result = self.parse_nodes();
        self.open.pop();
        let (children, stop) = result?;
        element.children = children;

        if let Stop::Close = stop {
            let tag = self.peek_close_tag()?;
            if tag.name.eq_ignore_ascii_case(&element.name) {
                self.close_element(&mut element, tag);
            } else if !self
                .open
                .iter()
                .any(|open| open.eq_ignore_ascii_case(&tag.name))
            {
                return Err(MarkupError::UnexpectedClosingTag {
                    name: tag.name,
                    offset: tag.span.start,
                });
            }
            // Otherwise the tag closes an ancestor and this element stays
            // implicitly closed.
        }
        if element.end_tag.is_none() {
            element.span = Span::new(start, self.pos);
        }

        Ok(element)
    }

    fn close_element(&mut self, element: &mut Element, tag: CloseTag) {
        self.pos = tag.span.end;
        element.span = Span::new(element.start_tag.start, tag.span.end);
        element.end_tag = Some(tag.span);
        element.end_name_span = Some(tag.name_span);
    }

    /// Read the `</name>` at the cursor without consuming it.
    fn peek_close_tag(&self) -> Result<CloseTag, MarkupError> {
        let start = self.pos;
        let mut pos = start + 2;
        let name_start = pos;
        while self
            .bytes
            .get(pos)
            .is_some_and(|b| !b.is_ascii_whitespace() && *b != b'>')
        {
            pos += 1;
        }
        let name_span = Span::new(name_start, pos);
        while self.bytes.get(pos).is_some_and(|b| b.is_ascii_whitespace()) {
            pos += 1;
        }
        if self.bytes.get(pos) != Some(&b'>') {
            return Err(MarkupError::UnterminatedTag { offset: start });
        }
        Ok(CloseTag {
            name: self.text(name_span),
            span: Span::new(start, pos + 1),
            name_span,
        })
    }

    fn parse_attribute(&mut self) -> Result<Attribute, MarkupError> {
        let start = self.pos;
        let name_span = self.read_while(|b| {
            !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/' | b'"' | b'\'')
        });
        if name_span.is_empty() {
            return Err(MarkupError::InvalidAttribute { offset: start });
        }

        let after_name = self.pos;
        self.skip_ws();
        if self.peek() != Some(b'=') {
            self.pos = after_name;
            return Ok(Attribute {
                name: self.text(name_span),
                value: String::new(),
                span: name_span,
                value_span: None,
            });
        }
        self.pos += 1;
        self.skip_ws();

        let value_span = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => {
                let open = self.pos;
                let close = self
                    .bytes
                    .get(open + 1..)
                    .and_then(|rest| rest.iter().position(|b| *b == quote))
                    .map(|i| open + 1 + i)
                    .ok_or(MarkupError::UnterminatedQuote { offset: open })?;
                self.pos = close + 1;
                Span::new(open + 1, close)
            }
            Some(_) => {
                let value_start = self.pos;
                while let Some(b) = self.peek() {
                    // `/>` ends the tag even right after an unquoted value.
                    let self_close = b == b'/' && self.peek_at(1) == Some(b'>');
                    if b.is_ascii_whitespace() || b == b'>' || self_close {
                        break;
                    }
                    self.pos += 1;
                }
                Span::new(value_start, self.pos)
            }
            None => return Err(MarkupError::UnterminatedTag { offset: start }),
        };

        Ok(Attribute {
            name: self.text(name_span),
            value: self.text(value_span),
            span: Span::new(start, self.pos),
            value_span: Some(value_span),
        })
    }

    /// Parse an ICU expansion at `{`. A brace that does not open a well-formed
    /// `{switch, type, cases}` form rewinds and is treated as text.
    fn try_parse_expansion(&mut self) -> Result<Option<Expansion>, MarkupError> {
        let start = self.pos;
        self.pos += 1;

        let Some(switch_span) = self.read_icu_header_part() else {
            self.pos = start;
            return Ok(None);
        };
        let Some(kind_span) = self.read_icu_header_part() else {
            self.pos = start;
            return Ok(None);
        };
        let kind = self.text(kind_span).trim().to_string();
        if kind.is_empty() || !kind.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.pos = start;
            return Ok(None);
        }

        let mut cases = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => {
                    self.pos = start;
                    return Ok(None);
                }
                Some(_) => {}
            }

            let case_start = self.pos;
            let value_span = self.read_while(|b| !b.is_ascii_whitespace() && b != b'{' && b != b'}');
            self.skip_ws();
            if value_span.is_empty() || self.peek() != Some(b'{') {
                self.pos = start;
                return Ok(None);
            }
            self.pos += 1;

            self.icu_depth += 1;
            let result = self.parse_nodes();
            self.icu_depth -= 1;
            let (children, stop) = result?;
            match stop {
                Stop::CaseEnd => self.pos += 1,
                Stop::Eof => {
                    self.pos = start;
                    return Ok(None);
                }
                Stop::Close => return Err(self.stray_close()),
            }

            cases.push(ExpansionCase {
                value: self.text(value_span),
                children,
                span: Span::new(case_start, self.pos),
            });
        }

        Ok(Some(Expansion {
            switch_value: self.text(switch_span).trim().to_string(),
            kind,
            cases,
            span: Span::new(start, self.pos),
        }))
    }

    /// Text up to the next `,`, consuming the comma. Rejects anything that
    /// looks like markup or nested braces.
    fn read_icu_header_part(&mut self) -> Option<Span> {
        let span = self.read_while(|b| !matches!(b, b',' | b'{' | b'}' | b'<'));
        if self.peek() != Some(b',') || self.text(span).trim().is_empty() {
            return None;
        }
        self.pos += 1;
        Some(span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn only_element(nodes: &[MarkupNode]) -> &Element {
        let els: Vec<&Element> = nodes
            .iter()
            .filter_map(|n| match n {
                MarkupNode::Element(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(els.len(), 1, "expected one element in {nodes:?}");
        els[0]
    }

    #[test]
    fn element_spans_cover_tags() {
        let src = r#"<a uiSref="home" class='x'>Home</a>"#;
        let nodes = try_parse_markup(src).unwrap();
        let a = only_element(&nodes);
        assert_eq!(a.name, "a");
        assert_eq!(a.span, Span::new(0, src.len()));
        assert_eq!(a.start_tag.slice(src), Some(r#"<a uiSref="home" class='x'>"#));
        assert_eq!(a.end_tag.and_then(|s| s.slice(src)), Some("</a>"));
        assert_eq!(a.attrs.len(), 2);
        assert_eq!(a.attrs[0].span.slice(src), Some(r#"uiSref="home""#));
        assert_eq!(a.attrs[0].value, "home");
        assert_eq!(a.attrs[1].value, "x");
    }

    #[test]
    fn bare_attribute_has_empty_value() {
        let src = "<div ui-view></div>";
        let nodes = try_parse_markup(src).unwrap();
        let div = only_element(&nodes);
        assert_eq!(div.attrs[0].name, "ui-view");
        assert_eq!(div.attrs[0].value, "");
        assert_eq!(div.attrs[0].value_span, None);
        assert_eq!(div.attrs[0].span.slice(src), Some("ui-view"));
    }

    #[test]
    fn angular_binding_syntax_is_attribute_names() {
        let src = r#"<button (click)="go()" [disabled]="x" *ngIf="y" #ref></button>"#;
        let nodes = try_parse_markup(src).unwrap();
        let names: Vec<&str> = only_element(&nodes)
            .attrs
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["(click)", "[disabled]", "*ngIf", "#ref"]);
    }

    #[test]
    fn void_and_self_closing_elements_have_no_children() {
        let src = "<p><br><img src=a.png/><x-y /></p>";
        let nodes = try_parse_markup(src).unwrap();
        let p = only_element(&nodes);
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.end_tag.and_then(|s| s.slice(src)), Some("</p>"));
    }

    #[test]
    fn interpolation_stays_text() {
        let src = "<i>{{ a ? '}' : b }}</i>";
        let nodes = try_parse_markup(src).unwrap();
        let i = only_element(&nodes);
        assert_eq!(i.children, vec![MarkupNode::Text(Span::new(3, src.len() - 4))]);
    }

    #[test]
    fn icu_expansion_is_parsed_with_nested_elements() {
        let src = "{count, plural, =0 {none} other {<b uiSref=\"a\">{{count}}</b>}}";
        let nodes = try_parse_markup(src).unwrap();
        let MarkupNode::Expansion(exp) = &nodes[0] else {
            panic!("expected expansion, got {nodes:?}");
        };
        assert_eq!(exp.switch_value, "count");
        assert_eq!(exp.kind, "plural");
        assert_eq!(exp.cases.len(), 2);
        assert_eq!(exp.span, Span::new(0, src.len()));

        let mut attrs = Vec::new();
        visit_all(&nodes, &mut |v| {
            if let Visit::Attribute { attr, host } = v {
                attrs.push((host.name.clone(), attr.name.clone()));
            }
        });
        assert_eq!(attrs, vec![("b".to_string(), "uiSref".to_string())]);
    }

    #[test]
    fn block_syntax_is_opaque_text() {
        let src = "@if (x) { <span>a</span> } @else { b }";
        let nodes = try_parse_markup(src).unwrap();
        assert!(matches!(nodes[0], MarkupNode::Text(_)));
        let elements = nodes
            .iter()
            .filter(|n| matches!(n, MarkupNode::Element(_)))
            .count();
        assert_eq!(elements, 1);
    }

    #[test]
    fn closing_an_ancestor_implicitly_closes_children() {
        let src = "<ul><li>a<li>b</ul>";
        let nodes = try_parse_markup(src).unwrap();
        let ul = only_element(&nodes);
        assert_eq!(ul.span, Span::new(0, src.len()));
        let MarkupNode::Element(li) = &ul.children[0] else {
            panic!("expected li");
        };
        assert_eq!(li.end_tag, None);
        assert_eq!(li.span, Span::new(4, src.len() - "</ul>".len()));
    }

    #[test]
    fn unquoted_value_stops_before_self_close() {
        let src = "<div ui-view=main/><a href=/x/y>b</a>";
        let nodes = try_parse_markup(src).unwrap();
        let MarkupNode::Element(div) = &nodes[0] else {
            panic!("expected div, got {nodes:?}");
        };
        assert!(div.self_closing);
        assert_eq!(div.attrs[0].value, "main");
        let MarkupNode::Element(a) = &nodes[1] else {
            panic!("expected a, got {nodes:?}");
        };
        assert_eq!(a.attrs[0].value, "/x/y");
    }

    #[test]
    fn void_element_span_is_its_start_tag() {
        let src = "<input ui-view=\"x\"><p>a</p>";
        let nodes = try_parse_markup(src).unwrap();
        let MarkupNode::Element(input) = &nodes[0] else {
            panic!("expected input, got {nodes:?}");
        };
        assert!(input.is_void());
        assert_eq!(input.span, input.start_tag);
    }

    #[test]
    fn script_body_is_raw_text() {
        let src = "<script>if (a < b) { x('</div>') }</script>";
        let nodes = try_parse_markup(src).unwrap();
        let script = only_element(&nodes);
        assert!(script.end_tag.is_some());
    }

    #[test]
    fn errors_yield_empty_tree() {
        for bad in [
            "</div>",
            "<div></span>",
            "<!-- never closed",
            r#"<a href="oops>"#,
            "<div class=",
        ] {
            assert!(try_parse_markup(bad).is_err(), "{bad} should not parse");
            assert!(parse_markup(bad).is_empty());
        }
    }

    #[test]
    fn lone_braces_are_text() {
        let src = "<p>a { b } c</p>";
        let nodes = try_parse_markup(src).unwrap();
        let p = only_element(&nodes);
        assert_eq!(p.children.len(), 1);
    }

    #[test]
    fn multibyte_text_keeps_boundaries() {
        let src = "<p>héllo ✔</p><a uiSref=\"é\">x</a>";
        let nodes = try_parse_markup(src).unwrap();
        assert_eq!(nodes.len(), 2);
        let MarkupNode::Element(a) = &nodes[1] else {
            panic!("expected a");
        };
        assert_eq!(a.attrs[0].value, "é");
    }
}
