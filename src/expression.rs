//! Host-language expression helpers.
//!
//! Expressions embedded in templates are passed through verbatim. They are
//! only parsed (with oxc) to reject syntax errors early, to recognize arrow
//! lambdas on event attributes and to spot bare `this.method` references.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use regex::Regex;
use std::collections::HashSet;

use crate::error::{
    CompileError, CompileResult, ERR_INVALID_HANDLER, ERR_MALFORMED_EXPRESSION,
};
use crate::ir::{HandlerBody, SourceLocation, TextPart};

lazy_static! {
    static ref IDENTIFIER_RE: Regex = Regex::new(r"^[A-Za-z_$][\w$]*$").unwrap();
    static ref MEMBER_PATH_RE: Regex =
        Regex::new(r"^[A-Za-z_$][\w$]*(\.[A-Za-z_$][\w$]*)*$").unwrap();
    static ref SIMPLE_EXPRESSION_RE: Regex = Regex::new(r"^[\w$.]+$").unwrap();
    static ref RESERVED_WORDS: HashSet<&'static str> = [
        "break", "case", "catch", "class", "const", "continue", "debugger", "default",
        "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for",
        "function", "if", "import", "in", "instanceof", "new", "null", "return", "super",
        "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with",
        "yield", "let", "static", "implements", "interface", "package", "private",
        "protected", "public", "await",
    ]
    .into_iter()
    .collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !RESERVED_WORDS.contains(name)
}

/// `Foo`, `Foo.Bar` or `this.props.Row`.
pub fn is_member_path(name: &str) -> bool {
    MEMBER_PATH_RE.is_match(name)
}

// ═══════════════════════════════════════════════════════════════════════════════
// BRACE SCANNING
// ═══════════════════════════════════════════════════════════════════════════════

/// Find the byte index just past the `}` matching the `{` at `start_index`.
/// String and template literals are skipped so braces inside them don't count.
pub fn find_balanced_brace_end(text: &str, start_index: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = start_index;
    let mut in_string: Option<u8> = None;
    let mut in_template_literal = false;
    let mut template_brace_depth = 0usize;

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if in_template_literal {
            if c == b'`' && template_brace_depth == 0 {
                in_template_literal = false;
            } else if c == b'$' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
                template_brace_depth += 1;
                i += 2;
                continue;
            } else if c == b'}' && template_brace_depth > 0 {
                template_brace_depth -= 1;
            }
            i += 1;
            continue;
        }

        match c {
            b'"' | b'\'' => in_string = Some(c),
            b'`' => in_template_literal = true,
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Split text into literal and `{expression}` parts. On an unbalanced `{`
/// returns the byte offset of that brace.
pub fn split_interpolations(text: &str) -> Result<Vec<TextPart>, usize> {
    let mut parts = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;
    let bytes = text.as_bytes();

    while i < bytes.len() {
        if bytes[i] == b'{' {
            let end = find_balanced_brace_end(text, i).ok_or(i)?;
            if literal_start < i {
                parts.push(TextPart::Literal(text[literal_start..i].to_string()));
            }
            parts.push(TextPart::Expression(text[i + 1..end - 1].to_string()));
            i = end;
            literal_start = end;
            continue;
        }
        i += 1;
    }
    if literal_start < text.len() {
        parts.push(TextPart::Literal(text[literal_start..].to_string()));
    }
    Ok(parts)
}

/// Split on `separator` outside brackets and string literals.
pub fn split_top_level(code: &str, separator: char) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for c in code.chars() {
        if let Some(quote) = in_string {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ if c == separator && depth == 0 => {
                pieces.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    pieces.push(current);
    pieces
}

// ═══════════════════════════════════════════════════════════════════════════════
// OXC CHECKS
// ═══════════════════════════════════════════════════════════════════════════════

fn source_type() -> SourceType {
    SourceType::default()
        .with_typescript(true)
        .with_module(true)
        .with_jsx(true)
}

/// Reject empty or syntactically invalid expressions.
pub fn validate_expression(code: &str, location: SourceLocation) -> CompileResult<()> {
    if code.trim().is_empty() {
        return Err(CompileError::parse(
            ERR_MALFORMED_EXPRESSION,
            "Empty expression.",
            location,
        ));
    }
    let allocator = Allocator::default();
    match Parser::new(&allocator, code, source_type()).parse_expression() {
        Ok(_) => Ok(()),
        Err(errors) => {
            let detail = errors
                .first()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "syntax error".to_string());
            Err(CompileError::parse(
                ERR_MALFORMED_EXPRESSION,
                format!("Invalid expression syntax: {}", detail),
                location,
            )
            .with_context(code.to_string()))
        }
    }
}

/// True for `this.name` (optionally parenthesized), the only shape autobind rewrites.
pub fn is_method_reference(code: &str) -> bool {
    let allocator = Allocator::default();
    match Parser::new(&allocator, code, source_type()).parse_expression() {
        Ok(expr) => match expr.without_parentheses() {
            Expression::StaticMemberExpression(member) => {
                matches!(member.object.without_parentheses(), Expression::ThisExpression(_))
            }
            _ => false,
        },
        Err(_) => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerLambda {
    pub params: Vec<String>,
    pub body: HandlerBody,
}

/// Parse an event attribute written as `(a, b) => body`.
pub fn parse_handler_lambda(code: &str, location: SourceLocation) -> CompileResult<HandlerLambda> {
    let allocator = Allocator::default();
    let expr = Parser::new(&allocator, code, source_type())
        .parse_expression()
        .map_err(|_| {
            CompileError::resolution(
                ERR_INVALID_HANDLER,
                format!("'{}' is not a valid event handler.", code.trim()),
                location,
            )
        })?;

    let arrow = match expr.without_parentheses() {
        Expression::ArrowFunctionExpression(arrow) if !arrow.r#async => arrow,
        _ => {
            return Err(CompileError::resolution(
                ERR_INVALID_HANDLER,
                format!(
                    "Event handler '{}' must be a synchronous arrow function.",
                    code.trim()
                ),
                location,
            ))
        }
    };

    let span = arrow.params.span;
    let raw_params = code[span.start as usize..span.end as usize].trim();
    let raw_params = raw_params
        .strip_prefix('(')
        .and_then(|p| p.strip_suffix(')'))
        .unwrap_or(raw_params);
    let params = split_top_level(raw_params, ',')
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    let body = match arrow.get_expression() {
        Some(body_expr) if arrow.expression => {
            let span = body_expr.span();
            HandlerBody::Expression(code[span.start as usize..span.end as usize].to_string())
        }
        _ => {
            let span = arrow.body.span;
            let block = code[span.start as usize..span.end as usize].trim();
            let inner = block
                .strip_prefix('{')
                .and_then(|b| b.strip_suffix('}'))
                .unwrap_or(block);
            HandlerBody::Block(inner.trim().to_string())
        }
    };

    Ok(HandlerLambda { params, body })
}

// ═══════════════════════════════════════════════════════════════════════════════
// EMISSION HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Quote a string as a double-quoted JS literal.
pub fn quote_js(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{a0}' | '\u{2028}' | '\u{2029}' => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Parenthesize an expression unless it is a plain identifier or member path.
pub fn wrap_expression(code: &str) -> String {
    let trimmed = code.trim();
    if SIMPLE_EXPRESSION_RE.is_match(trimmed) {
        trimmed.to_string()
    } else {
        format!("({})", trimmed)
    }
}

/// Build the code for an attribute value: a lone expression is embedded as-is,
/// literals are quoted, and mixed values are concatenated with `+`.
///
/// Two leading expressions get a `"" + ` prefix so `{1}{2}` stays `"12"`.
pub fn concat_parts(parts: &[TextPart]) -> String {
    match parts {
        [] => "\"\"".to_string(),
        [TextPart::Expression(code)] => code.trim().to_string(),
        [TextPart::Literal(text)] => quote_js(text),
        _ => {
            let joined = parts
                .iter()
                .map(|p| match p {
                    TextPart::Literal(text) => quote_js(text),
                    TextPart::Expression(code) => wrap_expression(code),
                })
                .collect::<Vec<_>>()
                .join(" + ");
            match parts {
                [TextPart::Expression(_), TextPart::Expression(_), ..] => format!("\"\" + {}", joined),
                _ => joined,
            }
        }
    }
}
