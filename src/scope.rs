//! Lexical scope tracking for `rt-repeat`, `rt-scope` and prop-template arguments.
//!
//! Generated helper functions close over nothing: every binding visible at the
//! point a helper is lifted is passed to it explicitly, in outer-to-inner order.
//! Names that no frame binds are left untouched and resolve against the
//! component instance at runtime.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Iteration,
    Scope,
    TemplateArguments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub names: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: FrameKind, names: Vec<String>) {
        for name in &names {
            if let Some(outer) = self.lookup(name) {
                trace!(name = %name, ?kind, ?outer, "binding shadows an outer binding");
            }
        }
        trace!(?kind, ?names, depth = self.frames.len() + 1, "push scope frame");
        self.frames.push(Frame { kind, names });
    }

    pub fn pop(&mut self) {
        if let Some(frame) = self.frames.pop() {
            trace!(kind = ?frame.kind, depth = self.frames.len(), "pop scope frame");
        }
    }

    /// Kind of the innermost frame binding `name`.
    pub fn lookup(&self, name: &str) -> Option<FrameKind> {
        self.frames
            .iter()
            .rev()
            .find(|f| f.names.iter().any(|n| n == name))
            .map(|f| f.kind)
    }

    /// Every bound name, outermost first, each listed once.
    pub fn visible(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for name in self.frames.iter().flat_map(|f| f.names.iter()) {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        out
    }
}
