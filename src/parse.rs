//! Markup parser for RT templates.
//!
//! A hand-written scanner that keeps tag and attribute names exactly as
//! written (components are case-sensitive), understands `{expression}`
//! interpolations anywhere braces may appear, and reports failures with the
//! line/column of the offending span.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::collections::HashMap;

use crate::error::{
    CompileError, CompileResult, ERR_MALFORMED_ATTRIBUTE, ERR_MISMATCHED_CLOSE,
    ERR_UNCLOSED_ELEMENT, ERR_UNTERMINATED_COMMENT, ERR_UNTERMINATED_EXPRESSION,
    ERR_UNTERMINATED_TAG,
};
use crate::expression::{find_balanced_brace_end, split_interpolations};
use crate::ir::{
    AttributeIR, CommentNode, ElementNode, SourceLocation, TemplateNode, TextNode, TextPart,
};
use crate::support::{is_raw_text_tag, is_void_element};

// ═══════════════════════════════════════════════════════════════════════════════
// ENTITIES
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref ENTITY_RE: Regex = Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z][a-zA-Z0-9]*);").unwrap();
    static ref NAMED_ENTITIES: HashMap<&'static str, char> = [
        ("nbsp", '\u{a0}'),
        ("amp", '&'),
        ("lt", '<'),
        ("gt", '>'),
        ("quot", '"'),
        ("apos", '\''),
        ("copy", '\u{a9}'),
        ("reg", '\u{ae}'),
        ("trade", '\u{2122}'),
        ("hellip", '\u{2026}'),
        ("mdash", '\u{2014}'),
        ("ndash", '\u{2013}'),
        ("lsquo", '\u{2018}'),
        ("rsquo", '\u{2019}'),
        ("ldquo", '\u{201c}'),
        ("rdquo", '\u{201d}'),
        ("laquo", '\u{ab}'),
        ("raquo", '\u{bb}'),
        ("middot", '\u{b7}'),
        ("bull", '\u{2022}'),
        ("times", '\u{d7}'),
        ("divide", '\u{f7}'),
        ("deg", '\u{b0}'),
        ("plusmn", '\u{b1}'),
        ("sect", '\u{a7}'),
        ("para", '\u{b6}'),
        ("cent", '\u{a2}'),
        ("pound", '\u{a3}'),
        ("euro", '\u{20ac}'),
        ("yen", '\u{a5}'),
        ("shy", '\u{ad}'),
    ]
    .into_iter()
    .collect();
}

/// Decode named and numeric character references. Unknown names are kept.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                NAMED_ENTITIES.get(body).copied()
            };
            decoded
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

struct MarkupParser<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '$')
}

/// `<` that opens an element, close tag, comment or declaration.
fn starts_markup(rest: &str) -> bool {
    let mut chars = rest.chars();
    if chars.next() != Some('<') {
        return false;
    }
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?' | '_' | '$'))
}

fn is_attribute_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '<' | '"' | '\'')
}

impl<'a> MarkupParser<'a> {
    fn new(source: &'a str) -> Self {
        MarkupParser {
            source,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    /// Move to byte offset `target`, keeping line/column in sync.
    fn advance_to(&mut self, target: usize) {
        for c in self.source[self.pos..target].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.pos = target;
    }

    fn bump(&mut self, bytes: usize) {
        self.advance_to(self.pos + bytes);
    }

    fn skip_whitespace(&mut self) {
        let len = self.rest().len() - self.rest().trim_start().len();
        self.bump(len);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        let len = self
            .rest()
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest().len());
        self.bump(len);
        &self.source[start..self.pos]
    }

    fn at_markup(&self) -> bool {
        starts_markup(self.rest())
    }

    fn parse_nodes(&mut self, parent: Option<(&str, SourceLocation)>) -> CompileResult<Vec<TemplateNode>> {
        let mut nodes = Vec::new();

        loop {
            if self.at_eof() {
                return match parent {
                    Some((tag, location)) => Err(CompileError::parse(
                        ERR_UNCLOSED_ELEMENT,
                        format!("Element <{}> is never closed.", tag),
                        location,
                    )),
                    None => Ok(nodes),
                };
            }

            if self.rest().starts_with("<!--") {
                nodes.push(self.parse_comment()?);
            } else if self.rest().starts_with("</") {
                let location = self.location();
                let name = self.parse_close_tag()?;
                match parent {
                    Some((tag, _)) if tag == name => return Ok(nodes),
                    _ if is_void_element(&name) => {}
                    Some((tag, _)) => {
                        return Err(CompileError::parse(
                            ERR_MISMATCHED_CLOSE,
                            format!("Expected </{}> but found </{}>.", tag, name),
                            location,
                        ))
                    }
                    None => {
                        return Err(CompileError::parse(
                            ERR_MISMATCHED_CLOSE,
                            format!("Unexpected closing tag </{}>.", name),
                            location,
                        ))
                    }
                }
            } else if self.rest().starts_with("<!") || self.rest().starts_with("<?") {
                self.skip_declaration()?;
            } else if self.at_markup() {
                nodes.push(TemplateNode::Element(self.parse_element()?));
            } else {
                nodes.push(TemplateNode::Text(self.parse_text()?));
            }
        }
    }

    fn parse_comment(&mut self) -> CompileResult<TemplateNode> {
        let location = self.location();
        let body_start = self.pos + 4;
        let end = self.source[body_start..].find("-->").ok_or_else(|| {
            CompileError::parse(ERR_UNTERMINATED_COMMENT, "Comment is never closed.", location)
        })?;
        let value = self.source[body_start..body_start + end].to_string();
        self.advance_to(body_start + end + 3);
        Ok(TemplateNode::Comment(CommentNode { value, location }))
    }

    fn skip_declaration(&mut self) -> CompileResult<()> {
        let location = self.location();
        let end = self.rest().find('>').ok_or_else(|| {
            CompileError::parse(ERR_UNTERMINATED_TAG, "Declaration is never closed.", location)
        })?;
        self.bump(end + 1);
        Ok(())
    }

    fn parse_close_tag(&mut self) -> CompileResult<String> {
        let location = self.location();
        self.bump(2);
        let name = self.take_while(is_tag_name_char).to_string();
        self.skip_whitespace();
        if self.peek() != Some('>') {
            return Err(CompileError::parse(
                ERR_UNTERMINATED_TAG,
                format!("Closing tag </{}> is never terminated.", name),
                location,
            ));
        }
        self.bump(1);
        Ok(name)
    }

    fn parse_element(&mut self) -> CompileResult<ElementNode> {
        let location = self.location();
        self.bump(1);
        let tag = self.take_while(is_tag_name_char).to_string();
        let mut attributes: Vec<AttributeIR> = Vec::new();
        let self_closing;

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => {
                    return Err(CompileError::parse(
                        ERR_UNTERMINATED_TAG,
                        format!("Tag <{}> is never terminated.", tag),
                        location,
                    ))
                }
                Some('>') => {
                    self.bump(1);
                    self_closing = false;
                    break;
                }
                Some('/') if self.rest().starts_with("/>") => {
                    self.bump(2);
                    self_closing = true;
                    break;
                }
                Some(_) => {
                    let attribute = self.parse_attribute(&tag)?;
                    if attributes.iter().any(|a| a.name == attribute.name) {
                        return Err(CompileError::parse(
                            ERR_MALFORMED_ATTRIBUTE,
                            format!("Duplicate attribute '{}' on <{}>.", attribute.name, tag),
                            attribute.location,
                        ));
                    }
                    attributes.push(attribute);
                }
            }
        }

        let children = if self_closing || is_void_element(&tag) {
            Vec::new()
        } else if is_raw_text_tag(&tag) {
            self.parse_raw_text(&tag, location)?
        } else {
            self.parse_nodes(Some((&tag, location)))?
        };

        Ok(ElementNode {
            tag,
            attributes,
            children,
            self_closing,
            location,
        })
    }

    fn parse_attribute(&mut self, tag: &str) -> CompileResult<AttributeIR> {
        let location = self.location();
        let name = self.take_while(is_attribute_name_char).to_string();
        if name.is_empty() {
            return Err(CompileError::parse(
                ERR_MALFORMED_ATTRIBUTE,
                format!("Unexpected character in <{}> tag.", tag),
                location,
            ));
        }

        let after_name = (self.pos, self.line, self.column);
        self.skip_whitespace();
        if self.peek() != Some('=') {
            // Valueless attribute; whitespace belongs to the next token.
            self.pos = after_name.0;
            self.line = after_name.1;
            self.column = after_name.2;
            return Ok(AttributeIR {
                name,
                value: None,
                location,
            });
        }
        self.bump(1);
        self.skip_whitespace();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => self.parse_quoted_value(quote, &name)?,
            Some('{') => {
                let start = self.pos;
                let end = find_balanced_brace_end(self.source, start).ok_or_else(|| {
                    CompileError::parse(
                        ERR_UNTERMINATED_EXPRESSION,
                        format!("Expression in attribute '{}' is never closed.", name),
                        self.location(),
                    )
                })?;
                self.advance_to(end);
                self.source[start..end].to_string()
            }
            Some(_) => self
                .take_while(|c| !c.is_whitespace() && c != '>' && c != '<')
                .trim_end_matches('/')
                .to_string(),
            None => String::new(),
        };
        // An unquoted value swallowing `/` of `/>` is put back.
        if self.source[..self.pos].ends_with('/') && self.peek() == Some('>') {
            self.pos -= 1;
            self.column -= 1;
        }

        Ok(AttributeIR {
            name,
            value: Some(value),
            location,
        })
    }

    fn parse_quoted_value(&mut self, quote: char, name: &str) -> CompileResult<String> {
        let location = self.location();
        self.bump(1);
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b'{' => {
                    let end = find_balanced_brace_end(self.source, i).ok_or_else(|| {
                        CompileError::parse(
                            ERR_UNTERMINATED_EXPRESSION,
                            format!("Expression in attribute '{}' is never closed.", name),
                            SourceLocation::at(self.source, i),
                        )
                    })?;
                    i = end;
                }
                b if b == quote as u8 => {
                    let value = self.source[start..i].to_string();
                    self.advance_to(i + 1);
                    return Ok(value);
                }
                _ => i += 1,
            }
        }
        Err(CompileError::parse(
            ERR_MALFORMED_ATTRIBUTE,
            format!("Value of attribute '{}' is never closed.", name),
            location,
        ))
    }

    fn parse_raw_text(&mut self, tag: &str, location: SourceLocation) -> CompileResult<Vec<TemplateNode>> {
        let close = format!("</{}", tag);
        let end = self.rest().find(&close).ok_or_else(|| {
            CompileError::parse(
                ERR_UNCLOSED_ELEMENT,
                format!("Element <{}> is never closed.", tag),
                location,
            )
        })?;
        let text_location = self.location();
        let content = self.rest()[..end].to_string();
        self.bump(end);
        self.parse_close_tag()?;

        if content.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![TemplateNode::Text(TextNode {
            parts: vec![TextPart::Literal(content)],
            location: text_location,
        })])
    }

    fn parse_text(&mut self) -> CompileResult<TextNode> {
        let location = self.location();
        let start = self.pos;
        let bytes = self.source.as_bytes();
        let mut i = start;

        while i < bytes.len() {
            match bytes[i] {
                b'{' => {
                    i = find_balanced_brace_end(self.source, i).ok_or_else(|| {
                        CompileError::parse(
                            ERR_UNTERMINATED_EXPRESSION,
                            "Expression is never closed.",
                            SourceLocation::at(self.source, i),
                        )
                    })?;
                }
                b'<' if i > start && starts_markup(&self.source[i..]) => break,
                _ => i += 1,
            }
        }

        let raw = &self.source[start..i];
        let parts = split_interpolations(raw).map_err(|offset| {
            CompileError::parse(
                ERR_UNTERMINATED_EXPRESSION,
                "Expression is never closed.",
                SourceLocation::at(self.source, start + offset),
            )
        })?;
        self.advance_to(i);

        let parts = parts
            .into_iter()
            .map(|p| match p {
                TextPart::Literal(text) => TextPart::Literal(decode_entities(&text)),
                expr => expr,
            })
            .collect();
        Ok(TextNode { parts, location })
    }
}

/// Parse RT template source into its top-level nodes.
pub fn parse_template(source: &str, file: Option<&str>) -> CompileResult<Vec<TemplateNode>> {
    MarkupParser::new(source)
        .parse_nodes(None)
        .map_err(|e| e.in_file(file))
}
