//! Intermediate representations.
//!
//! `TemplateNode` is the structural tree produced by the markup parser.
//! `RenderNode` is the directive-resolved tree consumed by the code emitter,
//! where conditionals, iterations and scope bindings are explicit wrappers.

use serde::{Deserialize, Serialize};

use crate::error::{CompileError, CompileResult, ERR_CONFLICTING_IMPORT};

// ═══════════════════════════════════════════════════════════════════════════════
// SOURCE POSITIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    pub offset: usize,
}

impl Default for SourceLocation {
    fn default() -> Self {
        SourceLocation {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

impl SourceLocation {
    /// Compute the 1-based line/column of a byte offset in `source`.
    pub fn at(source: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for (i, c) in source.char_indices() {
            if i >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        SourceLocation {
            line,
            column,
            offset,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STRUCTURAL TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    Element(ElementNode),
    Text(TextNode),
    Comment(CommentNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub tag: String,
    pub attributes: Vec<AttributeIR>,
    pub children: Vec<TemplateNode>,
    #[serde(default)]
    pub self_closing: bool,
    #[serde(default)]
    pub location: SourceLocation,
}

impl ElementNode {
    pub fn attribute(&self, name: &str) -> Option<&AttributeIR> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// The attribute's raw value, with valueless attributes read as "".
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).map(|a| a.value.as_deref().unwrap_or(""))
    }

    pub fn element_children(&self) -> impl Iterator<Item = &ElementNode> {
        self.children.iter().filter_map(|c| match c {
            TemplateNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// True when the only non-element children are blank text and comments.
    pub fn has_only_element_content(&self) -> bool {
        self.children.iter().all(|c| match c {
            TemplateNode::Text(t) => t.is_blank(),
            _ => true,
        })
    }
}

/// An attribute as written: `value` is the unquoted raw text, `None` when the
/// attribute has no `=value` part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeIR {
    pub name: String,
    pub value: Option<String>,
    #[serde(default)]
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TextPart {
    Literal(String),
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextNode {
    pub parts: Vec<TextPart>,
    #[serde(default)]
    pub location: SourceLocation,
}

impl TextNode {
    pub fn is_blank(&self) -> bool {
        self.parts.iter().all(|p| match p {
            TextPart::Literal(s) => s.chars().all(is_html_whitespace),
            TextPart::Expression(_) => false,
        })
    }
}

/// HTML whitespace only; U+00A0 is content.
pub fn is_html_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0c')
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    pub value: String,
    #[serde(default)]
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER TREE
// ═══════════════════════════════════════════════════════════════════════════════

/// How a tag name is turned into the first argument of an element factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
    /// A DOM tag, emitted as a string (or a legacy `React.DOM` factory).
    Html(String),
    /// A built-in native primitive, emitted under the native namespace.
    Native(String),
    /// A component reference, emitted as an identifier or member expression.
    Component(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Element(RenderElement),
    /// Children rendered as an array with no wrapping element.
    Virtual(Vec<RenderNode>),
    Text(String),
    Expression(String),
    Comment(String),
    Conditional(ConditionalNode),
    Iteration(IterationNode),
    ScopeBinding(ScopeBindingNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderElement {
    pub tag: TagRef,
    pub props: Vec<RenderProp>,
    /// `rt-props` expression merged over the generated props.
    pub spread: Option<String>,
    pub children: Vec<RenderNode>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderProp {
    pub key: String,
    pub value: PropValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// Host-language code embedded verbatim.
    Code(String),
    /// An arrow-lambda event handler lifted into a helper function.
    Handler(HandlerFn),
    /// Index into `RenderTree::prop_templates`.
    Template(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HandlerFn {
    pub event: String,
    pub outer: Vec<String>,
    pub params: Vec<String>,
    pub body: HandlerBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerBody {
    Expression(String),
    Block(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalNode {
    pub test: String,
    pub body: Box<RenderNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IterationNode {
    pub collection: String,
    pub item: String,
    pub index: String,
    /// Bindings visible outside the iteration, passed to its body function.
    pub outer: Vec<String>,
    pub body: Box<RenderNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScopeBindingNode {
    pub bindings: Vec<ScopeAlias>,
    pub outer: Vec<String>,
    pub body: Box<RenderNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeAlias {
    pub alias: String,
    pub value: String,
}

/// A child fragment lifted out of its owner and passed as a function prop.
#[derive(Debug, Clone, PartialEq)]
pub struct PropTemplate {
    pub owner: String,
    pub prop: String,
    pub arguments: Vec<String>,
    pub outer: Vec<String>,
    pub body: RenderNode,
    pub location: SourceLocation,
}

// ═══════════════════════════════════════════════════════════════════════════════
// IMPORT TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportBinding {
    /// The module's own value (`rt-require`).
    Module,
    /// `* as name`.
    Namespace,
    Default,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub local: String,
    pub source: String,
    pub binding: ImportBinding,
}

impl Dependency {
    pub fn new(local: &str, source: &str, binding: ImportBinding) -> Self {
        Dependency {
            local: local.to_string(),
            source: source.to_string(),
            binding,
        }
    }
}

/// Imports keyed by declared local name, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportTable {
    entries: Vec<Dependency>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an import. Re-declaring an identical import is a no-op and
    /// returns `false`; a different source or binding for the same local
    /// name is an error.
    pub fn declare(&mut self, dep: Dependency, location: SourceLocation) -> CompileResult<bool> {
        if let Some(existing) = self.get(&dep.local) {
            if existing == &dep {
                return Ok(false);
            }
            return Err(CompileError::resolution(
                ERR_CONFLICTING_IMPORT,
                format!(
                    "'{}' is already imported from '{}', cannot import it again from '{}'.",
                    dep.local, existing.source, dep.source
                ),
                location,
            ));
        }
        self.entries.push(dep);
        Ok(true)
    }

    pub fn get(&self, local: &str) -> Option<&Dependency> {
        self.entries.iter().find(|d| d.local == local)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Dependency> {
        self.entries.iter()
    }
}

/// Everything the emitter needs for one compile call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTree {
    pub root: RenderNode,
    pub imports: ImportTable,
    pub prop_templates: Vec<PropTemplate>,
    /// Top-level comments, passed through as module comments.
    pub module_comments: Vec<String>,
    pub stateless: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_at_offset() {
        let src = "ab\ncd\nef";
        let loc = SourceLocation::at(src, 4);
        assert_eq!((loc.line, loc.column), (2, 2));
        assert_eq!(SourceLocation::at(src, 0).line, 1);
    }

    #[test]
    fn test_import_table_dedupes_identical() {
        let mut table = ImportTable::new();
        let dep = Dependency::new("Row", "./row", ImportBinding::Module);
        assert!(table.declare(dep.clone(), SourceLocation::default()).unwrap());
        assert!(!table.declare(dep, SourceLocation::default()).unwrap());
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn test_import_table_rejects_conflicting_source() {
        let mut table = ImportTable::new();
        table
            .declare(
                Dependency::new("Row", "./row", ImportBinding::Module),
                SourceLocation::default(),
            )
            .unwrap();
        let err = table
            .declare(
                Dependency::new("Row", "./other-row", ImportBinding::Module),
                SourceLocation::default(),
            )
            .unwrap_err();
        assert_eq!(err.code(), ERR_CONFLICTING_IMPORT);
    }

    #[test]
    fn test_text_node_blank() {
        let blank = TextNode {
            parts: vec![TextPart::Literal("  \n ".into())],
            location: SourceLocation::default(),
        };
        assert!(blank.is_blank());
        let expr = TextNode {
            parts: vec![TextPart::Expression("x".into())],
            location: SourceLocation::default(),
        };
        assert!(!expr.is_blank());
        let nbsp = TextNode {
            parts: vec![TextPart::Literal("\u{a0}".into())],
            location: SourceLocation::default(),
        };
        assert!(!nbsp.is_blank());
    }
}
