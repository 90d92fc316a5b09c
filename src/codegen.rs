//! Code emission: render tree → render function and helper functions.
//!
//! Every construct that introduces bindings (iterations, scope bindings, prop
//! templates and lambda handlers) becomes a named helper function. Bindings
//! from enclosing helpers are passed explicitly through `bind`/`apply`, so
//! helpers can be hoisted to module level without closing over anything.

use crate::expression::{is_valid_identifier, quote_js, wrap_expression};
use crate::ir::{
    ConditionalNode, HandlerBody, HandlerFn, IterationNode, PropTemplate, PropValue, RenderElement,
    RenderNode, RenderTree, ScopeBindingNode,
};
use crate::target::{ElementFactory, TargetProfile};

pub const INDENT: &str = "    ";

/// The render function and the helpers it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedRender {
    /// Helper function declarations, each a complete `function name(...) {...}`.
    pub helpers: Vec<String>,
    /// The render expression returned by the render function.
    pub expression: String,
    /// Parameter list of the render function.
    pub params: &'static str,
}

impl EmittedRender {
    /// `function (...) {\n    return EXPR;\n}` with helpers optionally placed inside.
    pub fn render_function(&self, inline_helpers: bool) -> String {
        let mut out = format!("function ({}) {{\n", self.params);
        if inline_helpers {
            for helper in &self.helpers {
                out.push_str(&indent(helper, 1));
                out.push('\n');
            }
        }
        out.push_str(INDENT);
        out.push_str("return ");
        out.push_str(&self.expression);
        out.push_str(";\n}");
        out
    }
}

pub fn emit_render(tree: &RenderTree, profile: &TargetProfile) -> EmittedRender {
    let mut emitter = RenderEmitter {
        factory: profile.factory(),
        templates: &tree.prop_templates,
        helpers: Vec::new(),
        counter: 0,
    };
    let expression = emitter.node(&tree.root);
    EmittedRender {
        helpers: emitter.helpers,
        expression,
        params: if tree.stateless { "props, context" } else { "" },
    }
}

struct RenderEmitter<'t> {
    factory: &'static dyn ElementFactory,
    templates: &'t [PropTemplate],
    helpers: Vec<String>,
    counter: usize,
}

impl RenderEmitter<'_> {
    fn node(&mut self, node: &RenderNode) -> String {
        match node {
            RenderNode::Element(el) => self.element(el),
            RenderNode::Virtual(children) => format!("[{}]", self.children(children).join(", ")),
            RenderNode::Text(text) => quote_js(text),
            RenderNode::Expression(code) => wrap_expression(code),
            RenderNode::Comment(text) => block_comment(text),
            RenderNode::Conditional(cond) => self.conditional(cond),
            RenderNode::Iteration(iter) => self.iteration(iter),
            RenderNode::ScopeBinding(scope) => self.scope_binding(scope),
        }
    }

    fn next_name(&mut self, base: &str) -> String {
        self.counter += 1;
        format!("{}{}", base, self.counter)
    }

    fn helper(&mut self, name: &str, params: &[String], statements: Vec<String>, result: Option<&str>) {
        let mut out = format!("function {}({}) {{\n", name, params.join(", "));
        for statement in statements {
            out.push_str(&indent(&statement, 1));
            out.push('\n');
        }
        if let Some(result) = result {
            out.push_str(INDENT);
            out.push_str("return ");
            out.push_str(result);
            out.push_str(";\n");
        }
        out.push('}');
        self.helpers.push(out);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ELEMENTS
    // ═══════════════════════════════════════════════════════════════════════════

    fn element(&mut self, el: &RenderElement) -> String {
        let props = self.props(el);
        let children = self.children(&el.children);
        self.factory.element_call(&el.tag, &props, &children)
    }

    /// Emit children, attaching comments to a neighbouring argument.
    fn children(&mut self, children: &[RenderNode]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        for child in children {
            let code = self.node(child);
            if matches!(child, RenderNode::Comment(_)) {
                pending.push(code);
                continue;
            }
            if pending.is_empty() {
                out.push(code);
            } else {
                pending.push(code);
                out.push(pending.join(" "));
                pending.clear();
            }
        }
        if !pending.is_empty() {
            match out.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(&pending.join(" "));
                }
                None => out.push(format!("{} null", pending.join(" "))),
            }
        }
        out
    }

    fn props(&mut self, el: &RenderElement) -> String {
        let entries: Vec<String> = el
            .props
            .iter()
            .map(|prop| {
                let value = self.prop_value(&prop.value);
                format!("{}: {}", property_key(&prop.key), value)
            })
            .collect();
        let object = if entries.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", entries.join(", "))
        };
        match &el.spread {
            Some(spread) if entries.is_empty() => spread.clone(),
            Some(spread) => format!("_.assign({{}}, {}, {})", object, spread),
            None => object,
        }
    }

    fn prop_value(&mut self, value: &PropValue) -> String {
        match value {
            PropValue::Code(code) => code.clone(),
            PropValue::Handler(handler) => self.handler(handler),
            PropValue::Template(index) => {
                let templates = self.templates;
                match templates.get(*index) {
                    Some(template) => self.prop_template(template),
                    None => "undefined".to_string(),
                }
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn handler(&mut self, handler: &HandlerFn) -> String {
        let name = self.next_name(&handler.event);
        let params = concat_params(&handler.outer, &handler.params);
        match &handler.body {
            HandlerBody::Expression(expr) => self.helper(&name, &params, Vec::new(), Some(expr.trim())),
            HandlerBody::Block(block) => {
                let statements = if block.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![block.trim().to_string()]
                };
                self.helper(&name, &params, statements, None)
            }
        }
        bound_reference(&name, &handler.outer)
    }

    fn prop_template(&mut self, template: &PropTemplate) -> String {
        let name = self.next_name(&template.prop);
        let body = self.node(&template.body);
        let params = concat_params(&template.outer, &template.arguments);
        self.helper(&name, &params, Vec::new(), Some(body.as_str()));
        bound_reference(&name, &template.outer)
    }

    fn iteration(&mut self, iter: &IterationNode) -> String {
        let name = self.next_name(&format!("repeat{}", capitalize(&iter.item)));
        let body = self.node(&iter.body);
        let params = concat_params(&iter.outer, &[iter.item.clone(), iter.index.clone()]);
        self.helper(&name, &params, Vec::new(), Some(body.as_str()));
        format!(
            "_.map({}, {})",
            wrap_expression(&iter.collection),
            bound_reference(&name, &iter.outer)
        )
    }

    fn scope_binding(&mut self, scope: &ScopeBindingNode) -> String {
        let first = scope.bindings.first().map(|b| b.alias.as_str()).unwrap_or("");
        let name = self.next_name(&format!("scope{}", capitalize(first)));
        let body = self.node(&scope.body);
        let statements = scope
            .bindings
            .iter()
            .map(|b| format!("var {} = {};", b.alias, b.value))
            .collect();
        self.helper(&name, &scope.outer, statements, Some(body.as_str()));
        format!("{}.apply(this, [{}])", name, scope.outer.join(", "))
    }

    fn conditional(&mut self, cond: &ConditionalNode) -> String {
        let body = self.node(&cond.body);
        format!("({}) ? ({}) : null", cond.test, body)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEXT UTILITIES
// ═══════════════════════════════════════════════════════════════════════════════

fn concat_params(outer: &[String], own: &[String]) -> Vec<String> {
    outer.iter().chain(own.iter()).cloned().collect()
}

fn bound_reference(name: &str, outer: &[String]) -> String {
    if outer.is_empty() {
        format!("{}.bind(this)", name)
    } else {
        format!("{}.bind(this, {})", name, outer.join(", "))
    }
}

fn property_key(key: &str) -> String {
    if is_valid_identifier(key) {
        key.to_string()
    } else {
        quote_js(key)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `/* text */`, with any `*/` inside the text broken up.
pub fn block_comment(text: &str) -> String {
    format!("/*{}*/", text.replace("*/", "* /"))
}

/// Indent every non-empty line by `level` steps.
pub fn indent(text: &str, level: usize) -> String {
    let prefix = INDENT.repeat(level);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
