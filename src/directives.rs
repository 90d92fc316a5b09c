//! Directive recognition.
//!
//! Reserved `rt-*` attributes and tags form a closed set, resolved through two
//! dispatch tables. Everything here is per element and stateless; the resolver
//! decides how the recognized directives nest.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

use crate::error::{
    CompileError, CompileResult, DirectiveWarning, ERR_DUPLICATE_DIRECTIVE, ERR_INVALID_REPEAT,
    ERR_INVALID_SCOPE, WARN_UNKNOWN_DIRECTIVE,
};
use crate::expression::{is_valid_identifier, split_top_level, validate_expression};
use crate::ir::{AttributeIR, ElementNode, ScopeAlias, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Conditional,
    Iteration,
    ScopeBinding,
    ClassSet,
    PropsSpread,
    Stateless,
    Preserve,
}

/// Reserved tags that are not rendered as elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagDirective {
    Require,
    Import,
    PropTrigger,
    Virtual,
}

lazy_static! {
    static ref ATTRIBUTE_DIRECTIVES: HashMap<&'static str, DirectiveKind> = [
        ("rt-if", DirectiveKind::Conditional),
        ("rt-repeat", DirectiveKind::Iteration),
        ("rt-scope", DirectiveKind::ScopeBinding),
        ("rt-class", DirectiveKind::ClassSet),
        ("rt-props", DirectiveKind::PropsSpread),
        ("rt-stateless", DirectiveKind::Stateless),
        ("rt-pre", DirectiveKind::Preserve),
    ]
    .into_iter()
    .collect();

    static ref TAG_DIRECTIVES: HashMap<&'static str, TagDirective> = [
        ("rt-require", TagDirective::Require),
        ("rt-import", TagDirective::Import),
        ("rt-template", TagDirective::PropTrigger),
        ("rt-virtual", TagDirective::Virtual),
    ]
    .into_iter()
    .collect();

    static ref REPEAT_RE: Regex = Regex::new(
        r"(?s)^\s*([A-Za-z_$][\w$]*)\s*(?:,\s*([A-Za-z_$][\w$]*)\s*)?\s+in\s+(.+?)\s*$"
    )
    .unwrap();

    static ref SCOPE_ALIAS_RE: Regex =
        Regex::new(r"(?s)^\s*(.+)\s+as\s+([A-Za-z_$][\w$]*)\s*$").unwrap();
}

impl DirectiveKind {
    pub fn from_attribute(name: &str) -> Option<Self> {
        ATTRIBUTE_DIRECTIVES.get(name).copied()
    }
}

impl TagDirective {
    pub fn from_tag(tag: &str) -> Option<Self> {
        TAG_DIRECTIVES.get(tag).copied()
    }
}

/// A directive attribute's raw value and position.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveValue {
    pub value: String,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatDirective {
    pub item: String,
    pub index: String,
    pub collection: String,
}

/// The directives found on one element, plus the attributes left to render.
#[derive(Debug, Default)]
pub struct ElementDirectives<'a> {
    pub condition: Option<DirectiveValue>,
    pub repeat: Option<DirectiveValue>,
    pub scope: Option<DirectiveValue>,
    pub class_set: Option<DirectiveValue>,
    pub props: Option<DirectiveValue>,
    pub stateless: Option<SourceLocation>,
    pub preserve: bool,
    pub plain: Vec<&'a AttributeIR>,
}

impl ElementDirectives<'_> {
    /// Names of the directives present, for diagnostics.
    pub fn present(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.condition.is_some() {
            names.push("rt-if");
        }
        if self.repeat.is_some() {
            names.push("rt-repeat");
        }
        if self.scope.is_some() {
            names.push("rt-scope");
        }
        if self.class_set.is_some() {
            names.push("rt-class");
        }
        if self.props.is_some() {
            names.push("rt-props");
        }
        if self.stateless.is_some() {
            names.push("rt-stateless");
        }
        if self.preserve {
            names.push("rt-pre");
        }
        names
    }
}

/// Split an element's attributes into directives and plain attributes.
/// Unknown `rt-*` names are warned about and kept as plain attributes.
pub fn collect<'a>(
    element: &'a ElementNode,
    warnings: &mut Vec<DirectiveWarning>,
) -> CompileResult<ElementDirectives<'a>> {
    let mut found = ElementDirectives::default();

    for attr in &element.attributes {
        let Some(kind) = DirectiveKind::from_attribute(&attr.name) else {
            if attr.name.starts_with("rt-") {
                let warning = DirectiveWarning::new(
                    WARN_UNKNOWN_DIRECTIVE,
                    &attr.name,
                    format!("Unknown directive '{}' is passed through as an attribute.", attr.name),
                    attr.location,
                );
                warn!(attribute = %attr.name, line = attr.location.line, "unknown directive");
                warnings.push(warning);
            }
            found.plain.push(attr);
            continue;
        };

        let value = DirectiveValue {
            value: attr.value.clone().unwrap_or_default(),
            location: attr.location,
        };
        let slot = match kind {
            DirectiveKind::Conditional => &mut found.condition,
            DirectiveKind::Iteration => &mut found.repeat,
            DirectiveKind::ScopeBinding => &mut found.scope,
            DirectiveKind::ClassSet => &mut found.class_set,
            DirectiveKind::PropsSpread => &mut found.props,
            DirectiveKind::Stateless => {
                found.stateless = Some(attr.location);
                continue;
            }
            DirectiveKind::Preserve => {
                found.preserve = true;
                continue;
            }
        };
        if slot.is_some() {
            return Err(CompileError::resolution(
                ERR_DUPLICATE_DIRECTIVE,
                format!("Directive '{}' appears more than once on <{}>.", attr.name, element.tag),
                attr.location,
            ));
        }
        *slot = Some(value);
    }

    Ok(found)
}

/// A directive value that must be a non-empty host expression.
pub fn expression_value(directive: &DirectiveValue) -> CompileResult<String> {
    let code = directive.value.trim();
    validate_expression(code, directive.location)?;
    Ok(code.to_string())
}

/// Parse `item in collection` or `item, index in collection`.
/// The index name defaults to `<item>Index`.
pub fn parse_repeat(directive: &DirectiveValue) -> CompileResult<RepeatDirective> {
    let invalid = |detail: &str| {
        CompileError::resolution(
            ERR_INVALID_REPEAT,
            format!("Invalid rt-repeat '{}': {}", directive.value.trim(), detail),
            directive.location,
        )
    };

    let caps = REPEAT_RE
        .captures(&directive.value)
        .ok_or_else(|| invalid("expected 'item in collection'"))?;
    let item = caps[1].to_string();
    let index = caps
        .get(2)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| format!("{}Index", item));

    for name in [&item, &index] {
        if !is_valid_identifier(name) {
            return Err(invalid(&format!("'{}' is not a valid variable name", name)));
        }
    }
    if item == index {
        return Err(invalid("item and index must have different names"));
    }

    let collection = caps[3].trim().to_string();
    validate_expression(&collection, directive.location)?;

    Ok(RepeatDirective {
        item,
        index,
        collection,
    })
}

/// Parse `expr as alias; expr2 as alias2`.
pub fn parse_scope(directive: &DirectiveValue) -> CompileResult<Vec<ScopeAlias>> {
    let mut aliases: Vec<ScopeAlias> = Vec::new();

    for piece in split_top_level(&directive.value, ';') {
        if piece.trim().is_empty() {
            continue;
        }
        let caps = SCOPE_ALIAS_RE.captures(&piece).ok_or_else(|| {
            CompileError::resolution(
                ERR_INVALID_SCOPE,
                format!("Invalid rt-scope entry '{}', expected 'expression as name'.", piece.trim()),
                directive.location,
            )
        })?;
        let alias = caps[2].to_string();
        if !is_valid_identifier(&alias) {
            return Err(CompileError::resolution(
                ERR_INVALID_SCOPE,
                format!("'{}' is not a valid rt-scope alias.", alias),
                directive.location,
            ));
        }
        if aliases.iter().any(|a| a.alias == alias) {
            return Err(CompileError::resolution(
                ERR_INVALID_SCOPE,
                format!("rt-scope declares '{}' twice.", alias),
                directive.location,
            ));
        }
        let value = caps[1].trim().to_string();
        validate_expression(&value, directive.location)?;
        aliases.push(ScopeAlias { alias, value });
    }

    if aliases.is_empty() {
        return Err(CompileError::resolution(
            ERR_INVALID_SCOPE,
            "rt-scope declares no aliases.",
            directive.location,
        ));
    }
    Ok(aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_template;
    use crate::ir::TemplateNode;

    fn directive(value: &str) -> DirectiveValue {
        DirectiveValue {
            value: value.to_string(),
            location: SourceLocation::default(),
        }
    }

    fn element(src: &str) -> ElementNode {
        match parse_template(src, None).unwrap().remove(0) {
            TemplateNode::Element(el) => el,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_dispatch_tables() {
        assert_eq!(DirectiveKind::from_attribute("rt-if"), Some(DirectiveKind::Conditional));
        assert_eq!(DirectiveKind::from_attribute("rt-iff"), None);
        assert_eq!(TagDirective::from_tag("rt-template"), Some(TagDirective::PropTrigger));
        assert_eq!(TagDirective::from_tag("div"), None);
    }

    #[test]
    fn test_collect_splits_directives_and_warns_unknown() {
        let el = element(r#"<li rt-repeat="x in xs" rt-if="x.ok" rt-foo="1" class="a"/>"#);
        let mut warnings = Vec::new();
        let found = collect(&el, &mut warnings).unwrap();
        assert_eq!(found.present(), vec!["rt-if", "rt-repeat"]);
        assert_eq!(found.plain.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].attribute, "rt-foo");
        assert_eq!(warnings[0].code(), WARN_UNKNOWN_DIRECTIVE);
    }

    #[test]
    fn test_collect_rejects_duplicate_directive() {
        let mut el = element(r#"<li rt-if="a"/>"#);
        el.attributes.push(el.attributes[0].clone());
        let err = collect(&el, &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), ERR_DUPLICATE_DIRECTIVE);
    }

    #[test]
    fn test_parse_repeat_default_index() {
        let r = parse_repeat(&directive("item in this.props.items")).unwrap();
        assert_eq!(r.item, "item");
        assert_eq!(r.index, "itemIndex");
        assert_eq!(r.collection, "this.props.items");
    }

    #[test]
    fn test_parse_repeat_explicit_index() {
        let r = parse_repeat(&directive("row, i in rows.filter(r => r.visible)")).unwrap();
        assert_eq!((r.item.as_str(), r.index.as_str()), ("row", "i"));
        assert_eq!(r.collection, "rows.filter(r => r.visible)");
    }

    #[test]
    fn test_parse_repeat_errors() {
        assert_eq!(parse_repeat(&directive("items")).unwrap_err().code(), ERR_INVALID_REPEAT);
        assert_eq!(parse_repeat(&directive("class in xs")).unwrap_err().code(), ERR_INVALID_REPEAT);
    }

    #[test]
    fn test_parse_scope_multiple_aliases() {
        let aliases = parse_scope(&directive("this.props.user as user; user.name as name;")).unwrap();
        assert_eq!(
            aliases,
            vec![
                ScopeAlias { alias: "user".into(), value: "this.props.user".into() },
                ScopeAlias { alias: "name".into(), value: "user.name".into() },
            ]
        );
    }

    #[test]
    fn test_parse_scope_errors() {
        assert_eq!(parse_scope(&directive("user")).unwrap_err().code(), ERR_INVALID_SCOPE);
        assert_eq!(parse_scope(&directive("a as x; b as x")).unwrap_err().code(), ERR_INVALID_SCOPE);
        assert_eq!(parse_scope(&directive(" ; ")).unwrap_err().code(), ERR_INVALID_SCOPE);
    }
}
