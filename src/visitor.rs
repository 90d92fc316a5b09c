use lazy_static::lazy_static;
use regex::Regex;

use crate::ir::{CommentNode, ElementNode, TemplateNode, TextNode, TextPart};
use crate::support::preserves_whitespace;

/// The TemplateVisitor trait is the single traversal mechanism for parsed templates.
///
/// Implementers override `visit_*` methods to add behavior and call the
/// matching `walk_*` function to continue into children, unless pruning is intended.
pub trait TemplateVisitor {
    fn visit_nodes(&mut self, nodes: &mut Vec<TemplateNode>) {
        walk_nodes(self, nodes);
    }

    fn visit_node(&mut self, node: &mut TemplateNode) {
        walk_node(self, node);
    }

    fn visit_element(&mut self, element: &mut ElementNode) {
        walk_element(self, element);
    }

    fn visit_text(&mut self, _text: &mut TextNode) {
        // Leaf node, nothing to walk by default
    }

    fn visit_comment(&mut self, _comment: &mut CommentNode) {}
}

pub fn walk_nodes<V: TemplateVisitor + ?Sized>(visitor: &mut V, nodes: &mut Vec<TemplateNode>) {
    for node in nodes {
        visitor.visit_node(node);
    }
}

pub fn walk_node<V: TemplateVisitor + ?Sized>(visitor: &mut V, node: &mut TemplateNode) {
    match node {
        TemplateNode::Element(el) => visitor.visit_element(el),
        TemplateNode::Text(t) => visitor.visit_text(t),
        TemplateNode::Comment(c) => visitor.visit_comment(c),
    }
}

pub fn walk_element<V: TemplateVisitor + ?Sized>(visitor: &mut V, element: &mut ElementNode) {
    visitor.visit_nodes(&mut element.children);
}

// ═══════════════════════════════════════════════════════════════════════════════
// WHITESPACE NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref WHITESPACE_RUN_RE: Regex = Regex::new(r"[ \t\r\n\f]+").unwrap();
}

/// Collapses runs of HTML whitespace in literal text to a single space.
/// Content of `pre`-like elements and of anything marked `rt-pre` is left alone.
#[derive(Default)]
pub struct WhitespaceNormalizer {
    preserve_depth: usize,
}

impl WhitespaceNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(nodes: &mut Vec<TemplateNode>) {
        Self::new().visit_nodes(nodes);
    }
}

impl TemplateVisitor for WhitespaceNormalizer {
    fn visit_element(&mut self, element: &mut ElementNode) {
        let preserve = preserves_whitespace(&element.tag) || element.has_attribute("rt-pre");
        if preserve {
            self.preserve_depth += 1;
        }
        walk_element(self, element);
        if preserve {
            self.preserve_depth -= 1;
        }
    }

    fn visit_text(&mut self, text: &mut TextNode) {
        if self.preserve_depth > 0 {
            return;
        }
        for part in &mut text.parts {
            if let TextPart::Literal(s) = part {
                *s = WHITESPACE_RUN_RE.replace_all(s, " ").into_owned();
            }
        }
    }
}
