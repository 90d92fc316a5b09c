//! Embedded-template splicing tests.

#[cfg(test)]
mod tests {
    use crate::embedded::{compile_embedded, find_regions};
    use crate::error::{ERR_EMBEDDED_INTERPOLATION, ERR_MISMATCHED_CLOSE, WARN_UNKNOWN_DIRECTIVE};
    use crate::options::{CompileContext, CompileOptions, ModuleFormat};
    use pretty_assertions::assert_eq;

    fn context() -> CompileContext {
        CompileContext::new(CompileOptions::default()).with_file("view.jsrt")
    }

    #[test]
    fn test_region_spans() {
        let src = "a <template><b/></template> c <template><i/></template>";
        let regions = find_regions(src);
        assert_eq!(regions.len(), 2);
        assert_eq!(&src[regions[0].start..regions[0].end], "<b/>");
        assert_eq!(&src[regions[1].outer_start..regions[1].outer_end], "<template><i/></template>");
    }

    #[test]
    fn test_surrounding_text_is_untouched() {
        let src = "'use strict';\nvar render = <template><div>{this.x}</div></template>;\nmodule.exports = render;\n";
        let out = compile_embedded(src, &context()).unwrap();
        assert_eq!(
            out.code,
            "'use strict';\nvar render = function () {\n    return React.createElement(\"div\", {}, this.x);\n};\nmodule.exports = render;\n"
        );
    }

    #[test]
    fn test_helpers_stay_inside_render_function() {
        let src = "define(function () { return <template><ul><li rt-repeat=\"x in xs\">{x}</li></ul></template>; });";
        let out = compile_embedded(src, &context()).unwrap();
        assert_eq!(
            out.code,
            "define(function () { return function () {\n    function repeatX1(x, xIndex) {\n        return React.createElement(\"li\", {}, x);\n    }\n    return React.createElement(\"ul\", {}, _.map(xs, repeatX1.bind(this)));\n}; });"
        );
    }

    #[test]
    fn test_no_regions_is_identity() {
        let src = "const a = `<div>${x}</div>`;\n";
        assert_eq!(compile_embedded(src, &context()).unwrap().code, src);
    }

    #[test]
    fn test_module_options_are_overridden() {
        let ctx = CompileContext::new(CompileOptions::default().with_modules(ModuleFormat::Amd));
        let out = compile_embedded("x = <template><span/></template>", &ctx).unwrap();
        assert_eq!(
            out.code,
            "x = function () {\n    return React.createElement(\"span\", {});\n}"
        );
    }

    #[test]
    fn test_runtime_interpolation_is_rejected() {
        let src = "a = 1;\nb = <template><div>${name}</div></template>";
        let err = compile_embedded(src, &context()).unwrap_err();
        assert_eq!(err.code(), ERR_EMBEDDED_INTERPOLATION);
        assert_eq!(err.diagnostic().line, 2);
        assert_eq!(err.diagnostic().file.as_deref(), Some("view.jsrt"));
    }

    #[test]
    fn test_template_literal_inside_expression_is_allowed() {
        let src = "x = <template><div title=\"{`a ${b}`}\"/></template>";
        let out = compile_embedded(src, &context()).unwrap();
        assert_eq!(
            out.code,
            "x = function () {\n    return React.createElement(\"div\", { title: `a ${b}` });\n}"
        );
    }

    #[test]
    fn test_runtime_interpolation_in_attribute_literal_is_rejected() {
        let src = "x = <template><div title=\"a ${b}\"/></template>";
        let err = compile_embedded(src, &context()).unwrap_err();
        assert_eq!(err.code(), ERR_EMBEDDED_INTERPOLATION);
        assert_eq!((err.diagnostic().line, err.diagnostic().column), (1, 29));
    }

    #[test]
    fn test_region_errors_abort_with_file_positions() {
        let src = "a\nb\nx = <template><div></span></template>\n<template><p/></template>";
        let err = compile_embedded(src, &context()).unwrap_err();
        let diag = err.diagnostic();
        assert_eq!(err.code(), ERR_MISMATCHED_CLOSE);
        assert_eq!((diag.line, diag.column), (3, 20));
        assert_eq!(diag.file.as_deref(), Some("view.jsrt"));
    }

    #[test]
    fn test_region_warnings_are_shifted() {
        let src = "\n\nv = <template><div rt-foo=\"1\"/></template>";
        let out = compile_embedded(src, &context()).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].code(), WARN_UNKNOWN_DIRECTIVE);
        assert_eq!(out.warnings[0].diagnostic.line, 3);
        assert_eq!(out.warnings[0].diagnostic.column, 20);
        assert!(out.code.contains("\"rt-foo\": \"1\""));
    }
}
