//! Directive resolution: structural tree → render tree.
//!
//! Per element the directives nest as Iteration → ScopeBinding → Conditional →
//! element, so `rt-scope` values may use the loop variables and `rt-if` may use
//! both. Imports are hoisted into one table from wherever they appear.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{trace, warn};

use crate::directives::{self, ElementDirectives, TagDirective};
use crate::error::{
    CompileError, CompileResult, DirectiveWarning, ERR_INVALID_HANDLER, ERR_INVALID_IMPORT,
    ERR_INVALID_TEMPLATE, ERR_INVALID_VIRTUAL, ERR_MALFORMED_ATTRIBUTE, ERR_MULTIPLE_ROOTS,
    ERR_NO_ROOT, ERR_UNTERMINATED_EXPRESSION, WARN_MISPLACED_DIRECTIVE, WARN_UNEMITTED_IMPORT,
};
use crate::expression::{
    concat_parts, find_balanced_brace_end, is_method_reference, is_valid_identifier,
    parse_handler_lambda, quote_js, split_interpolations, split_top_level, validate_expression,
    wrap_expression,
};
use crate::ir::{
    AttributeIR, ConditionalNode, Dependency, ElementNode, HandlerFn, ImportBinding, ImportTable,
    IterationNode, PropTemplate, PropValue, RenderElement, RenderNode, RenderProp, RenderTree,
    ScopeBindingNode, SourceLocation, TemplateNode, TextNode, TextPart,
};
use crate::options::CompileOptions;
use crate::parse::decode_entities;
use crate::prop_templates::{self, TemplateCandidate};
use crate::scope::{FrameKind, ScopeStack};
use crate::support::web_prop_name;
use crate::target::TargetProfile;

lazy_static! {
    static ref EVENT_ATTRIBUTE_RE: Regex = Regex::new(r"^on[A-Z]").unwrap();
    static ref DASH_LETTER_RE: Regex = Regex::new(r"-([a-z])").unwrap();
    static ref VENDOR_PREFIX_RE: Regex = Regex::new(r"^-(webkit|moz|ms|o)-").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"^-?(\d+\.?\d*|\.\d+)$").unwrap();
}

/// The resolved tree plus the warnings collected on the way.
#[derive(Debug)]
pub struct Resolution {
    pub tree: RenderTree,
    pub warnings: Vec<DirectiveWarning>,
}

pub fn resolve(
    nodes: &[TemplateNode],
    options: &CompileOptions,
    profile: &TargetProfile,
) -> CompileResult<Resolution> {
    let mut resolver = Resolver::new(options, profile);
    for dep in profile.runtime_dependencies() {
        resolver.imports.declare(dep, SourceLocation::default())?;
    }
    let tree = resolver.resolve_document(nodes)?;
    Ok(Resolution {
        tree,
        warnings: resolver.warnings,
    })
}

struct Resolver<'o> {
    options: &'o CompileOptions,
    profile: &'o TargetProfile,
    scopes: ScopeStack,
    imports: ImportTable,
    prop_templates: Vec<PropTemplate>,
    warnings: Vec<DirectiveWarning>,
}

impl<'o> Resolver<'o> {
    fn new(options: &'o CompileOptions, profile: &'o TargetProfile) -> Self {
        Resolver {
            options,
            profile,
            scopes: ScopeStack::new(),
            imports: ImportTable::new(),
            prop_templates: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, warning: DirectiveWarning) {
        warn!(code = %warning.code(), attribute = %warning.attribute, "{}", warning.diagnostic.message);
        self.warnings.push(warning);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DOCUMENT
    // ═══════════════════════════════════════════════════════════════════════════

    fn resolve_document(&mut self, nodes: &[TemplateNode]) -> CompileResult<RenderTree> {
        let mut module_comments = Vec::new();
        let mut roots: Vec<&ElementNode> = Vec::new();

        for node in nodes {
            match node {
                TemplateNode::Comment(c) => module_comments.push(c.value.clone()),
                TemplateNode::Text(t) if t.is_blank() => {}
                TemplateNode::Text(t) => {
                    return Err(CompileError::resolution(
                        ERR_MULTIPLE_ROOTS,
                        "Text is not allowed outside the root element.",
                        t.location,
                    ))
                }
                TemplateNode::Element(el) => match TagDirective::from_tag(&el.tag) {
                    Some(TagDirective::Require) | Some(TagDirective::Import) => {
                        self.declare_import(el)?
                    }
                    _ => roots.push(el),
                },
            }
        }

        let root = match roots.as_slice() {
            [] => {
                return Err(CompileError::resolution(
                    ERR_NO_ROOT,
                    "Template has no root element.",
                    SourceLocation::default(),
                ))
            }
            [root] => *root,
            [_, second, ..] => {
                return Err(CompileError::resolution(
                    ERR_MULTIPLE_ROOTS,
                    format!("Template has more than one root element; found <{}>.", second.tag),
                    second.location,
                ))
            }
        };

        let stateless = root.has_attribute("rt-stateless");
        let root_node = self.resolve_element(root, true)?.ok_or_else(|| {
            CompileError::resolution(ERR_NO_ROOT, "Template has no root element.", root.location)
        })?;

        Ok(RenderTree {
            root: root_node,
            imports: std::mem::take(&mut self.imports),
            prop_templates: std::mem::take(&mut self.prop_templates),
            module_comments,
            stateless,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // IMPORTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn declare_import(&mut self, el: &ElementNode) -> CompileResult<()> {
        let required = |name: &str| -> CompileResult<String> {
            el.attribute_value(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| {
                    CompileError::resolution(
                        ERR_INVALID_IMPORT,
                        format!("<{}> requires a '{}' attribute.", el.tag, name),
                        el.location,
                    )
                })
        };

        let dep = if el.tag == "rt-require" {
            let source = required("dependency")?;
            let local = required("as")?;
            Dependency::new(&local, &source, ImportBinding::Module)
        } else {
            let name = required("name")?;
            let source = required("from")?;
            let binding = match name.as_str() {
                "*" => ImportBinding::Namespace,
                "default" => ImportBinding::Default,
                member if is_valid_identifier(member) => ImportBinding::Named(member.to_string()),
                other => {
                    return Err(CompileError::resolution(
                        ERR_INVALID_IMPORT,
                        format!("'{}' is not a valid import name.", other),
                        el.location,
                    ))
                }
            };
            let local = match (&binding, el.attribute_value("as").map(str::trim)) {
                (_, Some(alias)) if !alias.is_empty() => alias.to_string(),
                (ImportBinding::Named(member), _) => member.clone(),
                _ => required("as")?,
            };
            Dependency::new(&local, &source, binding)
        };

        if !is_valid_identifier(&dep.local) {
            return Err(CompileError::resolution(
                ERR_INVALID_IMPORT,
                format!("'{}' is not a valid import alias.", dep.local),
                el.location,
            ));
        }

        let added = self.imports.declare(dep, el.location)?;
        if added && !self.options.modules.emits_imports() {
            self.warn(DirectiveWarning::new(
                WARN_UNEMITTED_IMPORT,
                &el.tag,
                format!(
                    "<{}> is not emitted by the '{}' module format.",
                    el.tag, self.options.modules
                ),
                el.location,
            ));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ELEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn resolve_element(&mut self, el: &ElementNode, is_root: bool) -> CompileResult<Option<RenderNode>> {
        let is_virtual = match TagDirective::from_tag(&el.tag) {
            Some(TagDirective::Require) | Some(TagDirective::Import) => {
                self.declare_import(el)?;
                return Ok(None);
            }
            Some(TagDirective::PropTrigger) => {
                return Err(CompileError::resolution(
                    ERR_INVALID_TEMPLATE,
                    "<rt-template> must be a direct child of the element receiving the prop.",
                    el.location,
                ))
            }
            Some(TagDirective::Virtual) => true,
            None => false,
        };

        let mut found = directives::collect(el, &mut self.warnings)?;
        trace!(tag = %el.tag, directives = ?found.present(), "resolve element");
        if !is_root {
            if let Some(location) = found.stateless.take() {
                self.warn(DirectiveWarning::new(
                    WARN_MISPLACED_DIRECTIVE,
                    "rt-stateless",
                    "rt-stateless only applies to the root element.",
                    location,
                ));
            }
        }
        if is_virtual {
            check_virtual(el, &found)?;
        }

        let repeat = found.repeat.as_ref().map(directives::parse_repeat).transpose()?;
        let iteration_outer = match &repeat {
            Some(r) => {
                let bound = [r.item.clone(), r.index.clone()];
                let outer = self.outer_excluding(&bound);
                self.scopes.push(FrameKind::Iteration, bound.to_vec());
                Some(outer)
            }
            None => None,
        };

        let aliases = found.scope.as_ref().map(directives::parse_scope).transpose()?;
        let scope_outer = match &aliases {
            Some(aliases) => {
                let bound: Vec<String> = aliases.iter().map(|a| a.alias.clone()).collect();
                let outer = self.outer_excluding(&bound);
                self.scopes.push(FrameKind::Scope, bound);
                Some(outer)
            }
            None => None,
        };

        let test = found.condition.as_ref().map(directives::expression_value).transpose()?;

        let mut node = if is_virtual {
            RenderNode::Virtual(self.resolve_children(el.children.iter())?)
        } else {
            RenderNode::Element(self.build_element(el, &found)?)
        };

        if let Some(test) = test {
            node = RenderNode::Conditional(ConditionalNode {
                test,
                body: Box::new(node),
            });
        }
        if let (Some(bindings), Some(outer)) = (aliases, scope_outer) {
            self.scopes.pop();
            node = RenderNode::ScopeBinding(ScopeBindingNode {
                bindings,
                outer,
                body: Box::new(node),
            });
        }
        if let (Some(r), Some(outer)) = (repeat, iteration_outer) {
            self.scopes.pop();
            node = RenderNode::Iteration(IterationNode {
                collection: r.collection,
                item: r.item,
                index: r.index,
                outer,
                body: Box::new(node),
            });
        }
        Ok(Some(node))
    }

    fn outer_excluding(&self, bound: &[String]) -> Vec<String> {
        self.scopes
            .visible()
            .into_iter()
            .filter(|n| !bound.contains(n))
            .collect()
    }

    fn build_element(&mut self, el: &ElementNode, found: &ElementDirectives<'_>) -> CompileResult<RenderElement> {
        let tag = self.profile.classify_tag(&el.tag, el.location)?;
        let extracted = prop_templates::extract(el, self.options, &mut self.warnings)?;

        let mut props: Vec<RenderProp> = Vec::new();
        for attr in &found.plain {
            let key = if self.profile.is_native() {
                attr.name.clone()
            } else {
                web_prop_name(&attr.name).to_string()
            };
            if props.iter().any(|p| p.key == key) {
                return Err(CompileError::parse(
                    ERR_MALFORMED_ATTRIBUTE,
                    format!("Attribute '{}' sets '{}' more than once.", attr.name, key),
                    attr.location,
                ));
            }
            let value = self.attribute_value(attr, &key)?;
            props.push(RenderProp { key, value });
        }

        if let Some(class_set) = &found.class_set {
            let raw = class_set.value.trim();
            let object = if raw.starts_with('{') {
                raw.to_string()
            } else {
                format!("{{{}}}", raw)
            };
            validate_expression(&object, class_set.location)?;
            let classes = format!("_.keys(_.pick({}, _.identity)).join(\" \")", object);
            let class_key = if self.profile.is_native() { "class" } else { "className" };
            match props.iter_mut().find(|p| p.key == class_key) {
                Some(RenderProp {
                    value: PropValue::Code(existing),
                    ..
                }) => {
                    let base = if is_quoted_literal(existing) {
                        existing.clone()
                    } else {
                        wrap_expression(existing)
                    };
                    *existing = format!("{} + \" \" + {}", base, classes);
                }
                _ => props.push(RenderProp {
                    key: class_key.to_string(),
                    value: PropValue::Code(classes),
                }),
            }
        }

        let spread = found
            .props
            .as_ref()
            .map(directives::expression_value)
            .transpose()?;

        for candidate in extracted.templates {
            let prop = candidate.prop.clone();
            let index = self.lift_template(&el.tag, candidate)?;
            props.push(RenderProp {
                key: prop,
                value: PropValue::Template(index),
            });
        }

        let children = self.resolve_children(extracted.remaining.into_iter())?;

        Ok(RenderElement {
            tag,
            props,
            spread,
            children,
            location: el.location,
        })
    }

    fn lift_template(&mut self, owner: &str, candidate: TemplateCandidate<'_>) -> CompileResult<usize> {
        let outer = self.outer_excluding(&candidate.arguments);
        self.scopes
            .push(FrameKind::TemplateArguments, candidate.arguments.clone());
        let body = self.resolve_element(candidate.body, false)?;
        self.scopes.pop();

        let body = body.ok_or_else(|| {
            CompileError::resolution(
                ERR_INVALID_TEMPLATE,
                format!("Template for prop '{}' renders nothing.", candidate.prop),
                candidate.location,
            )
        })?;
        self.prop_templates.push(PropTemplate {
            owner: owner.to_string(),
            prop: candidate.prop,
            arguments: candidate.arguments,
            outer,
            body,
            location: candidate.location,
        });
        Ok(self.prop_templates.len() - 1)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ATTRIBUTES
    // ═══════════════════════════════════════════════════════════════════════════

    fn attribute_value(&mut self, attr: &AttributeIR, key: &str) -> CompileResult<PropValue> {
        let Some(raw) = attr.value.as_deref() else {
            if EVENT_ATTRIBUTE_RE.is_match(&attr.name) {
                return Err(CompileError::resolution(
                    ERR_INVALID_HANDLER,
                    format!("Event attribute '{}' has no handler.", attr.name),
                    attr.location,
                ));
            }
            return Ok(PropValue::Code("true".to_string()));
        };

        if EVENT_ATTRIBUTE_RE.is_match(&attr.name) {
            return self.event_handler(attr, key, raw);
        }

        let parts = interpolated_parts(raw, attr.location)?;
        if key == "style" && !is_single_expression(&parts) {
            return style_object(raw, self.profile.is_native(), attr.location).map(PropValue::Code);
        }

        Ok(PropValue::Code(concat_parts(&parts)))
    }

    /// `{expr}` passes through; anything else must be an arrow lambda, which is
    /// lifted into a helper bound to the enclosing loop and scope variables.
    fn event_handler(&mut self, attr: &AttributeIR, key: &str, raw: &str) -> CompileResult<PropValue> {
        let trimmed = raw.trim();
        if trimmed.starts_with('{') && find_balanced_brace_end(trimmed, 0) == Some(trimmed.len()) {
            let code = trimmed[1..trimmed.len() - 1].trim();
            validate_expression(code, attr.location)?;
            let value = if self.options.autobind && is_method_reference(code) {
                format!("{}.bind(this)", code)
            } else {
                code.to_string()
            };
            return Ok(PropValue::Code(value));
        }

        let lambda = parse_handler_lambda(&decode_entities(trimmed), attr.location)?;
        let outer = self.outer_excluding(&lambda.params);
        Ok(PropValue::Handler(HandlerFn {
            event: key.to_string(),
            outer,
            params: lambda.params,
            body: lambda.body,
        }))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CHILDREN
    // ═══════════════════════════════════════════════════════════════════════════

    fn resolve_children<'n>(
        &mut self,
        children: impl Iterator<Item = &'n TemplateNode>,
    ) -> CompileResult<Vec<RenderNode>> {
        let mut out = Vec::new();
        for child in children {
            match child {
                TemplateNode::Element(el) => {
                    if let Some(node) = self.resolve_element(el, false)? {
                        out.push(node);
                    }
                }
                TemplateNode::Text(text) => out.extend(text_children(text)?),
                TemplateNode::Comment(c) => out.push(RenderNode::Comment(c.value.clone())),
            }
        }
        Ok(out)
    }
}

fn check_virtual(el: &ElementNode, found: &ElementDirectives<'_>) -> CompileResult<()> {
    let offending = found
        .plain
        .first()
        .map(|a| a.name.as_str())
        .or(found.class_set.as_ref().map(|_| "rt-class"))
        .or(found.props.as_ref().map(|_| "rt-props"))
        .or(found.stateless.map(|_| "rt-stateless"));
    match offending {
        Some(name) => Err(CompileError::resolution(
            ERR_INVALID_VIRTUAL,
            format!(
                "<rt-virtual> only accepts rt-if, rt-repeat and rt-scope; found '{}'.",
                name
            ),
            el.location,
        )),
        None => Ok(()),
    }
}

fn interpolated_parts(raw: &str, location: SourceLocation) -> CompileResult<Vec<TextPart>> {
    let parts = split_interpolations(raw).map_err(|_| {
        CompileError::parse(
            ERR_UNTERMINATED_EXPRESSION,
            "Expression in attribute is never closed.",
            location,
        )
    })?;
    parts
        .into_iter()
        .map(|part| match part {
            TextPart::Literal(text) => Ok(TextPart::Literal(decode_entities(&text))),
            TextPart::Expression(code) => {
                validate_expression(&code, location)?;
                Ok(TextPart::Expression(code))
            }
        })
        .collect()
}

fn is_quoted_literal(code: &str) -> bool {
    code.len() >= 2 && code.starts_with('"') && code.ends_with('"') && !code.contains("\" + ")
}

fn is_single_expression(parts: &[TextPart]) -> bool {
    matches!(parts, [TextPart::Expression(_)])
}

fn text_children(text: &TextNode) -> CompileResult<Vec<RenderNode>> {
    if text.is_blank() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for part in &text.parts {
        match part {
            TextPart::Literal(s) if s.is_empty() => {}
            TextPart::Literal(s) => out.push(RenderNode::Text(s.clone())),
            TextPart::Expression(code) => {
                validate_expression(code, text.location)?;
                out.push(RenderNode::Expression(code.trim().to_string()));
            }
        }
    }
    Ok(out)
}

// ═══════════════════════════════════════════════════════════════════════════════
// STYLE
// ═══════════════════════════════════════════════════════════════════════════════

/// `background-color` → `backgroundColor`, `-webkit-x` → `WebkitX`, `-ms-x` → `msX`.
pub fn camel_case_style(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let (name, capitalize) = match property.strip_prefix('-') {
        Some(rest) if rest.starts_with("ms-") => (rest, false),
        Some(rest) => (rest, true),
        None => (property, false),
    };
    let camel = DASH_LETTER_RE
        .replace_all(&name.to_ascii_lowercase(), |caps: &regex::Captures| {
            caps[1].to_ascii_uppercase()
        })
        .into_owned();
    if capitalize {
        let mut chars = camel.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => camel,
        }
    } else {
        camel
    }
}

/// Native style names carry no vendor prefix: `-webkit-flex` → `flex`.
fn native_style_name(property: &str) -> String {
    camel_case_style(&VENDOR_PREFIX_RE.replace(property, ""))
}

/// Convert an inline `style="a: b; c: {expr}"` string into an object literal.
/// Native objects use unprefixed names and numeric values where the literal is a number.
fn style_object(raw: &str, native: bool, location: SourceLocation) -> CompileResult<String> {
    let mut entries = Vec::new();
    for declaration in split_top_level(raw, ';') {
        if declaration.trim().is_empty() {
            continue;
        }
        let (property, value) = declaration.split_once(':').ok_or_else(|| {
            CompileError::parse(
                ERR_MALFORMED_ATTRIBUTE,
                format!("Invalid style declaration '{}'.", declaration.trim()),
                location,
            )
        })?;
        let key = if native {
            native_style_name(property.trim())
        } else {
            camel_case_style(property.trim())
        };
        let key = if is_valid_identifier(&key) {
            key
        } else {
            quote_js(&key)
        };
        let parts = interpolated_parts(value.trim(), location)?;
        let value = match parts.as_slice() {
            [TextPart::Literal(text)] if native && NUMBER_RE.is_match(text) => text.clone(),
            _ => concat_parts(&parts),
        };
        entries.push(format!("{}: {}", key, value));
    }
    if entries.is_empty() {
        Ok("{}".to_string())
    } else {
        Ok(format!("{{ {} }}", entries.join(", ")))
    }
}
