//! Legacy HTML decoding and tree construction.
//!
//! The parser is forgiving rather than conforming. It writes elements, text
//! and raw-text content straight into a [`Document`] and folds unclosed
//! elements up to the nearest matching end tag. That is enough structure for
//! the bridge to find images, anchors and the head of a migrated static page.

use lb_dom::Document;
use lb_dom::NodeId;
use std::borrow::Cow;
use url::Url;

mod decode;
mod store;

pub use decode::decode_document_bytes;
pub use store::DocumentStore;
pub use store::FsDocumentStore;
pub use store::MemoryDocumentStore;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Content runs to the matching end tag without being parsed as markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "title", "textarea"];

/// Raw-text elements whose content still has character references decoded.
const ESCAPABLE_RAW_TEXT_ELEMENTS: &[&str] = &["title", "textarea"];

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
    ("euro", '\u{20ac}'),
    ("laquo", '\u{ab}'),
    ("raquo", '\u{bb}'),
    ("middot", '\u{b7}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("hellip", '\u{2026}'),
];

/// Builds embedded documents from legacy markup.
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    pub fn parse(&self, input: &str, url: Url) -> Document {
        let mut document = Document::new(url);
        TreeBuilder {
            rest: input,
            document: &mut document,
            open: Vec::new(),
        }
        .run();
        // Construction is not a structural change an observer should see.
        document.take_records();
        log::trace!(
            target: "lb::html",
            "built {} nodes for {}",
            document.node_count(),
            document.url()
        );
        document
    }

    /// Decodes raw bytes (honouring a byte-order mark or `<meta charset>`)
    /// and parses them.
    pub fn parse_bytes(&self, bytes: &[u8], url: Url) -> Document {
        let source = decode_document_bytes(bytes);
        self.parse(&source, url)
    }
}

struct TreeBuilder<'s, 'd> {
    rest: &'s str,
    document: &'d mut Document,
    /// Open elements, innermost last.
    open: Vec<(NodeId, String)>,
}

impl TreeBuilder<'_, '_> {
    fn run(mut self) {
        while !self.rest.is_empty() {
            let rest = self.rest;
            if let Some(comment) = rest.strip_prefix("<!--") {
                self.rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            } else if rest.starts_with("</") {
                if !self.end_tag() {
                    self.text();
                }
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                self.rest = rest.find('>').map_or("", |end| &rest[end + 1..]);
            } else if rest.starts_with('<') {
                if !self.start_tag() {
                    self.text();
                }
            } else {
                self.text();
            }
        }
    }

    fn parent(&self) -> NodeId {
        self.open.last().map_or(Document::ROOT, |(node, _)| *node)
    }

    /// Consumes up to the next `<`. A `<` that did not open a tag is kept.
    fn text(&mut self) {
        let rest = self.rest;
        let first = rest.chars().next().map_or(0, char::len_utf8);
        let end = rest[first..].find('<').map_or(rest.len(), |at| first + at);
        let (text, rest) = rest.split_at(end);
        self.rest = rest;

        if self.open.is_empty() && text.trim().is_empty() {
            return;
        }
        let parent = self.parent();
        let node = self.document.create_text(decode_entities(text));
        self.document.append_child(parent, node);
    }

    fn end_tag(&mut self) -> bool {
        let rest = self.rest;
        let after = rest[2..].trim_start();
        let name_len = tag_name_len(after);
        if name_len == 0 {
            return false;
        }
        let Some(close) = after[name_len..].find('>') else {
            return false;
        };

        let name = after[..name_len].to_ascii_lowercase();
        self.rest = &after[name_len + close + 1..];
        if let Some(depth) = self.open.iter().rposition(|(_, open)| *open == name) {
            self.open.truncate(depth);
        }
        true
    }

    fn start_tag(&mut self) -> bool {
        let rest = self.rest;
        let after = &rest[1..];
        let name_len = tag_name_len(after);
        if name_len == 0 {
            return false;
        }
        let name = after[..name_len].to_ascii_lowercase();

        let mut cursor = &after[name_len..];
        let mut attributes: Vec<(String, String)> = Vec::new();
        let mut self_closing = false;
        loop {
            cursor = cursor.trim_start();
            let Some(first) = cursor.chars().next() else {
                return false;
            };
            if first == '>' {
                cursor = &cursor[1..];
                break;
            }
            if first == '/' {
                self_closing = true;
                cursor = &cursor[1..];
                continue;
            }

            let attr_len = cursor
                .find(|ch: char| ch.is_ascii_whitespace() || matches!(ch, '>' | '/' | '=' | '"' | '\''))
                .unwrap_or(cursor.len());
            if attr_len == 0 {
                cursor = &cursor[first.len_utf8()..];
                continue;
            }
            self_closing = false;

            let attr = cursor[..attr_len].to_ascii_lowercase();
            let (value, remaining) = attribute_value(&cursor[attr_len..]);
            cursor = remaining;
            // First occurrence wins.
            if !attributes.iter().any(|(existing, _)| *existing == attr) {
                attributes.push((attr, decode_entities(value).into_owned()));
            }
        }
        self.rest = cursor;

        let node = self.document.create_element(&name);
        for (attr, value) in &attributes {
            self.document.set_attribute(node, attr, value);
        }
        let parent = self.parent();
        self.document.append_child(parent, node);

        if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
            return true;
        }
        if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
            self.raw_text(node, &name);
        } else {
            self.open.push((node, name));
        }
        true
    }

    fn raw_text(&mut self, element: NodeId, name: &str) {
        let (content, rest) = split_at_end_tag(self.rest, name);
        self.rest = rest;
        if content.is_empty() {
            return;
        }

        let content = if ESCAPABLE_RAW_TEXT_ELEMENTS.contains(&name) {
            decode_entities(content)
        } else {
            Cow::Borrowed(content)
        };
        let node = self.document.create_text(content.into_owned());
        self.document.append_child(element, node);
    }
}

fn tag_name_len(input: &str) -> usize {
    input
        .find(|ch: char| !(ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | ':')))
        .unwrap_or(input.len())
}

/// Splits `input` (everything after an attribute name) into the value and
/// the remainder of the tag. Attributes without `=` have an empty value.
fn attribute_value(input: &str) -> (&str, &str) {
    let Some(value) = input.trim_start().strip_prefix('=') else {
        return ("", input);
    };
    let value = value.trim_start();

    for quote in ['"', '\''] {
        if let Some(quoted) = value.strip_prefix(quote) {
            return match quoted.find(quote) {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            };
        }
    }

    let end = value
        .find(|ch: char| ch.is_ascii_whitespace() || ch == '>')
        .unwrap_or(value.len());
    value.split_at(end)
}

/// Splits raw-text content from what follows its end tag, matched
/// case-insensitively. Unterminated content runs to the end of the input.
fn split_at_end_tag<'s>(source: &'s str, name: &str) -> (&'s str, &'s str) {
    // ASCII lowercasing keeps byte offsets aligned with `source`.
    let lowered = source.to_ascii_lowercase();
    let needle = format!("</{name}");

    let mut from = 0;
    while let Some(found) = lowered[from..].find(&needle) {
        let start = from + found;
        let after = lowered[start + needle.len()..].trim_start_matches(|ch: char| ch.is_ascii_whitespace());
        if after.starts_with('>') {
            let resume = lowered.len() - after.len() + 1;
            return (&source[..start], &source[resume..]);
        }
        from = start + needle.len();
    }

    (source, "")
}

fn decode_entities(input: &str) -> Cow<'_, str> {
    if !input.contains('&') {
        return Cow::Borrowed(input);
    }

    let mut decoded = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let reference = after
            .split_once(';')
            .and_then(|(entity, tail)| Some((entity_char(entity)?, tail)));
        match reference {
            Some((ch, tail)) => {
                decoded.push(ch);
                rest = tail;
            }
            None => {
                decoded.push('&');
                rest = after;
            }
        }
    }
    decoded.push_str(rest);
    Cow::Owned(decoded)
}

fn entity_char(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code);
    }

    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == entity)
        .map(|(_, ch)| *ch)
}
