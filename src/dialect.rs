//! Module dialects.
//!
//! Each dialect wraps the same render function in its own import preamble and
//! export epilogue. The render expression itself never depends on the dialect.

use crate::codegen::{block_comment, indent, EmittedRender, INDENT};
use crate::expression::quote_js;
use crate::ir::{Dependency, ImportBinding, ImportTable};
use crate::options::ModuleFormat;

/// Everything a dialect needs to assemble one module.
pub struct ModuleParts<'a> {
    pub name: Option<&'a str>,
    pub imports: &'a ImportTable,
    pub module_comments: &'a [String],
    pub render: &'a EmittedRender,
}

impl ModuleParts<'_> {
    /// Comments, then the render function with helpers hoisted out of it.
    fn hoisted_body(&self) -> Vec<String> {
        let mut body: Vec<String> = self.render.helpers.clone();
        body.extend(self.module_comments.iter().map(|c| block_comment(c)));
        body
    }
}

pub trait ModuleDialect: Send + Sync {
    fn assemble(&self, parts: &ModuleParts<'_>) -> String;
}

pub fn dialect_for(format: ModuleFormat) -> &'static dyn ModuleDialect {
    match format {
        ModuleFormat::None => &GlobalDialect,
        ModuleFormat::CommonJs => &CommonJsDialect,
        ModuleFormat::Amd => &AmdDialect,
        ModuleFormat::Es6 => &Es6Dialect,
        ModuleFormat::Typescript => &TypescriptDialect,
        ModuleFormat::Jsrt => &JsrtDialect,
    }
}

fn join_lines(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMONJS
// ═══════════════════════════════════════════════════════════════════════════════

pub struct CommonJsDialect;

fn require_expression(dep: &Dependency) -> String {
    let require = format!("require({})", quote_js(&dep.source));
    match &dep.binding {
        ImportBinding::Module | ImportBinding::Namespace => require,
        ImportBinding::Default => format!("{}.default", require),
        ImportBinding::Named(member) => format!("{}.{}", require, member),
    }
}

impl ModuleDialect for CommonJsDialect {
    fn assemble(&self, parts: &ModuleParts<'_>) -> String {
        let mut lines = vec!["\"use strict\";".to_string()];
        lines.extend(
            parts
                .imports
                .iter()
                .map(|dep| format!("var {} = {};", dep.local, require_expression(dep))),
        );
        lines.extend(parts.hoisted_body());
        lines.push(format!("module.exports = {};", parts.render.render_function(false)));
        join_lines(lines)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// AMD
// ═══════════════════════════════════════════════════════════════════════════════

pub struct AmdDialect;

impl ModuleDialect for AmdDialect {
    fn assemble(&self, parts: &ModuleParts<'_>) -> String {
        let mut sources = Vec::new();
        let mut args = Vec::new();
        let mut body = vec!["\"use strict\";".to_string()];

        for (i, dep) in parts.imports.iter().enumerate() {
            sources.push(format!("{}{}", INDENT, quote_js(&dep.source)));
            match &dep.binding {
                ImportBinding::Module | ImportBinding::Namespace => args.push(dep.local.clone()),
                ImportBinding::Default => {
                    let arg = format!("${}", i);
                    body.push(format!("var {} = {}.default;", dep.local, arg));
                    args.push(arg);
                }
                ImportBinding::Named(member) => {
                    let arg = format!("${}", i);
                    body.push(format!("var {} = {}.{};", dep.local, arg, member));
                    args.push(arg);
                }
            }
        }
        body.extend(parts.hoisted_body());
        body.push(format!("return {};", parts.render.render_function(false)));

        let name = parts
            .name
            .map(|n| format!("{}, ", quote_js(n)))
            .unwrap_or_default();
        let mut out = format!(
            "define({}[\n{}\n], function ({}) {{\n",
            name,
            sources.join(",\n"),
            args.join(", ")
        );
        out.push_str(&indent(&body.join("\n"), 1));
        out.push_str("\n});\n");
        out
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ES6 / TYPESCRIPT
// ═══════════════════════════════════════════════════════════════════════════════

fn es_import(dep: &Dependency) -> String {
    let source = quote_js(&dep.source);
    match &dep.binding {
        ImportBinding::Module | ImportBinding::Namespace => {
            format!("import * as {} from {};", dep.local, source)
        }
        ImportBinding::Default => format!("import {} from {};", dep.local, source),
        ImportBinding::Named(member) if member == &dep.local => {
            format!("import {{ {} }} from {};", member, source)
        }
        ImportBinding::Named(member) => {
            format!("import {{ {} as {} }} from {};", member, dep.local, source)
        }
    }
}

pub struct Es6Dialect;

impl ModuleDialect for Es6Dialect {
    fn assemble(&self, parts: &ModuleParts<'_>) -> String {
        let mut lines: Vec<String> = parts.imports.iter().map(es_import).collect();
        lines.extend(parts.hoisted_body());
        lines.push(format!("export default {}", parts.render.render_function(false)));
        join_lines(lines)
    }
}

pub struct TypescriptDialect;

impl ModuleDialect for TypescriptDialect {
    fn assemble(&self, parts: &ModuleParts<'_>) -> String {
        let mut lines: Vec<String> = parts
            .imports
            .iter()
            .map(|dep| match dep.binding {
                ImportBinding::Module => {
                    format!("import {} = require({});", dep.local, quote_js(&dep.source))
                }
                _ => es_import(dep),
            })
            .collect();
        lines.extend(parts.hoisted_body());
        let name = parts.name.unwrap_or("render");
        lines.push(format!("var {} = {};", name, parts.render.render_function(false)));
        lines.push(format!("export = {};", name));
        join_lines(lines)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GLOBAL / EMBEDDED
// ═══════════════════════════════════════════════════════════════════════════════

/// `var name = (function () { ... })();` with dependencies read from globals.
pub struct GlobalDialect;

impl ModuleDialect for GlobalDialect {
    fn assemble(&self, parts: &ModuleParts<'_>) -> String {
        let mut body = vec!["\"use strict\";".to_string()];
        body.extend(parts.hoisted_body());
        body.push(format!("return {};", parts.render.render_function(false)));
        format!(
            "var {} = (function () {{\n{}\n}})();\n",
            parts.name.unwrap_or("template"),
            indent(&body.join("\n"), 1)
        )
    }
}

/// A bare render function expression with its helpers inside it.
pub struct JsrtDialect;

impl ModuleDialect for JsrtDialect {
    fn assemble(&self, parts: &ModuleParts<'_>) -> String {
        let mut out: String = parts
            .module_comments
            .iter()
            .map(|c| block_comment(c) + " ")
            .collect();
        out.push_str(&parts.render.render_function(true));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SourceLocation;
    use pretty_assertions::assert_eq;

    fn render() -> EmittedRender {
        EmittedRender {
            helpers: Vec::new(),
            expression: "React.createElement(\"div\", {})".to_string(),
            params: "",
        }
    }

    fn imports() -> ImportTable {
        let mut table = ImportTable::new();
        for dep in [
            Dependency::new("React", "react", ImportBinding::Module),
            Dependency::new("Row", "./row", ImportBinding::Default),
            Dependency::new("fmt", "./utils", ImportBinding::Named("format".into())),
        ] {
            table.declare(dep, SourceLocation::default()).unwrap();
        }
        table
    }

    fn assemble(format: ModuleFormat, name: Option<&str>) -> String {
        let render = render();
        let imports = imports();
        let dialect = dialect_for(format);
        dialect.assemble(&ModuleParts {
            name,
            imports: &imports,
            module_comments: &[],
            render: &render,
        })
    }

    #[test]
    fn test_commonjs() {
        assert_eq!(
            assemble(ModuleFormat::CommonJs, None),
            r#""use strict";
var React = require("react");
var Row = require("./row").default;
var fmt = require("./utils").format;
module.exports = function () {
    return React.createElement("div", {});
};
"#
        );
    }

    #[test]
    fn test_amd() {
        assert_eq!(
            assemble(ModuleFormat::Amd, Some("div")),
            r#"define("div", [
    "react",
    "./row",
    "./utils"
], function (React, $1, $2) {
    "use strict";
    var Row = $1.default;
    var fmt = $2.format;
    return function () {
        return React.createElement("div", {});
    };
});
"#
        );
    }

    #[test]
    fn test_es6() {
        assert_eq!(
            assemble(ModuleFormat::Es6, None),
            r#"import * as React from "react";
import Row from "./row";
import { format as fmt } from "./utils";
export default function () {
    return React.createElement("div", {});
}
"#
        );
    }

    #[test]
    fn test_typescript() {
        assert_eq!(
            assemble(ModuleFormat::Typescript, None),
            r#"import React = require("react");
import Row from "./row";
import { format as fmt } from "./utils";
var render = function () {
    return React.createElement("div", {});
};
export = render;
"#
        );
    }

    #[test]
    fn test_global() {
        assert_eq!(
            assemble(ModuleFormat::None, Some("div")),
            r#"var div = (function () {
    "use strict";
    return function () {
        return React.createElement("div", {});
    };
})();
"#
        );
    }

    #[test]
    fn test_jsrt() {
        assert_eq!(
            assemble(ModuleFormat::Jsrt, None),
            "function () {\n    return React.createElement(\"div\", {});\n}"
        );
    }
}
