//! # RT template compiler
//!
//! Compiles RT templates (HTML-like markup with `rt-*` directives) into render
//! functions for a React-style component runtime.
//!
//! ## Pipeline
//!
//! 1. **Parse**: source text → `TemplateNode` tree (`parse`).
//! 2. **Normalize**: optional whitespace collapsing (`visitor`).
//! 3. **Resolve**: directives, scopes, imports and prop templates → `RenderTree`
//!    (`transform`, `scope`, `directives`, `prop_templates`).
//! 4. **Emit**: render expression and helpers (`codegen`), chosen element
//!    factory (`target`), wrapped by a module dialect (`dialect`).
//!
//! Every call is self-contained. The only shared input is the read-only
//! `CompileContext`, so independent templates compile in parallel with
//! `compile_batch`.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod codegen;
mod dialect;
mod directives;
mod embedded;
pub mod error;
mod expression;
pub mod ir;
pub mod options;
mod parse;
mod prop_templates;
mod scope;
mod support;
mod target;
mod transform;
mod visitor;

#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod embedded_tests;

pub use embedded::compile_embedded;
pub use error::{CompileError, CompileResult, Diagnostic, DirectiveWarning};
pub use options::{CompileContext, CompileOptions, ModuleFormat, PropTemplateSpec, Version};
pub use parse::parse_template;

use codegen::emit_render;
use dialect::{dialect_for, ModuleParts};
use target::TargetProfile;
use visitor::WhitespaceNormalizer;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledOutput {
    pub code: String,
    pub warnings: Vec<DirectiveWarning>,
}

/// One named template of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSource {
    pub name: String,
    pub source: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

pub fn compile_template(source: &str, options: &CompileOptions) -> CompileResult<CompiledOutput> {
    compile_source(source, options)
}

/// Like `compile_template`, with the context's file name attached to every
/// diagnostic.
pub fn compile_template_in(source: &str, context: &CompileContext) -> CompileResult<CompiledOutput> {
    let file = context.file_name.as_deref();
    let output = compile_source(source, &context.options).map_err(|e| e.in_file(file))?;
    Ok(CompiledOutput {
        code: output.code,
        warnings: output
            .warnings
            .into_iter()
            .map(|w| w.in_file(file))
            .collect(),
    })
}

/// Compile independent templates in parallel. Results keep input order.
pub fn compile_batch(
    templates: &[TemplateSource],
    context: &CompileContext,
) -> Vec<CompileResult<CompiledOutput>> {
    templates
        .par_iter()
        .map(|template| {
            let scoped = CompileContext {
                options: context.options.clone(),
                file_name: Some(template.name.clone()),
            };
            compile_template_in(&template.source, &scoped)
        })
        .collect()
}

pub(crate) fn compile_source(source: &str, options: &CompileOptions) -> CompileResult<CompiledOutput> {
    options.validate()?;
    let profile = TargetProfile::from_options(options);
    debug!(
        modules = %options.modules,
        target = %profile.describe(),
        "compiling template"
    );

    let mut nodes = parse_template(source, None)?;
    if options.normalize_html_whitespace {
        WhitespaceNormalizer::run(&mut nodes);
    }

    let resolution = transform::resolve(&nodes, options, &profile)?;
    let tree = &resolution.tree;
    let render = emit_render(tree, &profile);
    let code = dialect_for(options.modules).assemble(&ModuleParts {
        name: options.name.as_deref(),
        imports: &tree.imports,
        module_comments: &tree.module_comments,
        render: &render,
    });

    debug!(
        helpers = render.helpers.len(),
        imports = tree.imports.iter().len(),
        warnings = resolution.warnings.len(),
        "template compiled"
    );
    Ok(CompiledOutput {
        code,
        warnings: resolution.warnings,
    })
}
