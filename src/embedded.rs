//! Embedded templates inside script files.
//!
//! Each `<template>...</template>` region is compiled as a bare render function
//! and spliced in place. Text outside the regions is copied byte for byte.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::error::{CompileError, CompileResult, ERR_EMBEDDED_INTERPOLATION};
use crate::expression::find_balanced_brace_end;
use crate::ir::SourceLocation;
use crate::options::{CompileContext, ModuleFormat};
use crate::{compile_source, CompiledOutput};

lazy_static! {
    static ref TEMPLATE_REGION_RE: Regex = Regex::new(r"(?s)<template>(.*?)</template>").unwrap();
}

/// Byte range of one region's template text, excluding the wrapper tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedRegion {
    pub start: usize,
    pub end: usize,
    /// Range of the whole `<template>...</template>` match.
    pub outer_start: usize,
    pub outer_end: usize,
}

pub fn find_regions(source: &str) -> Vec<EmbeddedRegion> {
    TEMPLATE_REGION_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let outer = caps.get(0)?;
            let inner = caps.get(1)?;
            Some(EmbeddedRegion {
                start: inner.start(),
                end: inner.end(),
                outer_start: outer.start(),
                outer_end: outer.end(),
            })
        })
        .collect()
}

/// Offset of the first `${` in template text or attribute literals.
/// `{...}` expressions and comments are skipped, so a template literal inside
/// an expression is allowed.
fn runtime_interpolation(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'$' if bytes.get(i + 1) == Some(&b'{') => return Some(i),
            b'{' => match find_balanced_brace_end(text, i) {
                Some(end) => i = end,
                None => return None,
            },
            b'<' if text[i..].starts_with("<!--") => match text[i..].find("-->") {
                Some(end) => i += end + 3,
                None => return None,
            },
            _ => i += 1,
        }
    }
    None
}

pub fn compile_embedded(source: &str, context: &CompileContext) -> CompileResult<CompiledOutput> {
    let mut options = context.options.clone();
    options.modules = ModuleFormat::Jsrt;
    options.name = None;
    let file = context.file_name.as_deref();

    let regions = find_regions(source);
    debug!(regions = regions.len(), file = ?file, "compiling embedded templates");

    let mut code = String::with_capacity(source.len());
    let mut warnings = Vec::new();
    let mut copied_to = 0;

    for region in regions {
        let base = SourceLocation::at(source, region.start);
        let text = &source[region.start..region.end];

        if let Some(pos) = runtime_interpolation(text) {
            let location = SourceLocation::at(source, region.start + pos);
            return Err(CompileError::parse(
                ERR_EMBEDDED_INTERPOLATION,
                "Embedded templates cannot contain runtime string interpolation.",
                location,
            )
            .in_file(file));
        }

        let compiled = compile_source(text, &options)
            .map_err(|e| e.shifted(base).in_file(file))?;
        warnings.extend(
            compiled
                .warnings
                .into_iter()
                .map(|w| w.shifted(base).in_file(file)),
        );

        code.push_str(&source[copied_to..region.outer_start]);
        code.push_str(&compiled.code);
        copied_to = region.outer_end;
    }
    code.push_str(&source[copied_to..]);

    Ok(CompiledOutput { code, warnings })
}
