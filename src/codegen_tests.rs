//! End-to-end output tests: template in, complete module text out.

#[cfg(test)]
mod tests {
    use crate::options::{CompileOptions, ModuleFormat, PropTemplateSpec, Version};
    use crate::{compile_template, CompiledOutput};
    use pretty_assertions::assert_eq;

    fn compile(src: &str, options: &CompileOptions) -> CompiledOutput {
        compile_template(src, options).unwrap()
    }

    fn commonjs(src: &str) -> String {
        compile(src, &CompileOptions::default()).code
    }

    const CJS_PREAMBLE: &str = "\"use strict\";\nvar React = require(\"react\");\nvar _ = require(\"lodash\");\n";

    fn cjs_module(helpers: &str, expression: &str) -> String {
        format!(
            "{}{}module.exports = function () {{\n    return {};\n}};\n",
            CJS_PREAMBLE, helpers, expression
        )
    }

    #[test]
    fn test_simple_element() {
        assert_eq!(
            commonjs("<div>hello</div>"),
            cjs_module("", "React.createElement(\"div\", {}, \"hello\")")
        );
    }

    #[test]
    fn test_attributes_and_interpolation() {
        assert_eq!(
            commonjs(r#"<label class="field {this.state.kind}" for="name" data-id="{this.props.id}">Name: {this.props.name}</label>"#),
            cjs_module(
                "",
                r#"React.createElement("label", { className: "field " + this.state.kind, htmlFor: "name", "data-id": this.props.id }, "Name: ", this.props.name)"#
            )
        );
    }

    #[test]
    fn test_repeat() {
        assert_eq!(
            commonjs(r#"<ul><li rt-repeat="item in this.props.items" key="{itemIndex}">{item.name}</li></ul>"#),
            cjs_module(
                "function repeatItem1(item, itemIndex) {\n    return React.createElement(\"li\", { key: itemIndex }, item.name);\n}\n",
                "React.createElement(\"ul\", {}, _.map(this.props.items, repeatItem1.bind(this)))"
            )
        );
    }

    #[test]
    fn test_nested_repeat_passes_outer_bindings() {
        assert_eq!(
            commonjs(r#"<ul><li rt-repeat="row in rows"><span rt-repeat="cell in row.cells">{cell}{rowIndex}</span></li></ul>"#),
            cjs_module(
                "function repeatCell2(row, rowIndex, cell, cellIndex) {\n    return React.createElement(\"span\", {}, cell, rowIndex);\n}\n\
                 function repeatRow1(row, rowIndex) {\n    return React.createElement(\"li\", {}, _.map(row.cells, repeatCell2.bind(this, row, rowIndex)));\n}\n",
                "React.createElement(\"ul\", {}, _.map(rows, repeatRow1.bind(this)))"
            )
        );
    }

    #[test]
    fn test_conditional() {
        assert_eq!(
            commonjs(r#"<div rt-if="this.props.show">x</div>"#),
            cjs_module("", "(this.props.show) ? (React.createElement(\"div\", {}, \"x\")) : null")
        );
    }

    #[test]
    fn test_scope_and_lambda_handler() {
        assert_eq!(
            commonjs(r#"<div rt-scope="this.props.user as user"><button onClick="() => this.select(user)">{user.name}</button></div>"#),
            cjs_module(
                "function onClick2(user) {\n    return this.select(user);\n}\n\
                 function scopeUser1() {\n    var user = this.props.user;\n    return React.createElement(\"div\", {}, React.createElement(\"button\", { onClick: onClick2.bind(this, user) }, user.name));\n}\n",
                "scopeUser1.apply(this, [])"
            )
        );
    }

    #[test]
    fn test_block_lambda_handler() {
        assert_eq!(
            commonjs(r#"<input onChange="(e) => { this.setState({ value: e.target.value }); }"/>"#),
            cjs_module(
                "function onChange1(e) {\n    this.setState({ value: e.target.value });\n}\n",
                "React.createElement(\"input\", { onChange: onChange1.bind(this) })"
            )
        );
    }

    #[test]
    fn test_virtual_repeat() {
        assert_eq!(
            commonjs(r#"<dl><rt-virtual rt-repeat="x in xs"><dt>{x.k}</dt><dd>{x.v}</dd></rt-virtual></dl>"#),
            cjs_module(
                "function repeatX1(x, xIndex) {\n    return [React.createElement(\"dt\", {}, x.k), React.createElement(\"dd\", {}, x.v)];\n}\n",
                "React.createElement(\"dl\", {}, _.map(xs, repeatX1.bind(this)))"
            )
        );
    }

    #[test]
    fn test_props_spread_and_class_set() {
        assert_eq!(
            commonjs(r#"<div id="main" rt-props="this.props.extra" rt-class="{active: this.state.on}"/>"#),
            cjs_module(
                "",
                r#"React.createElement("div", _.assign({}, { id: "main", className: _.keys(_.pick({active: this.state.on}, _.identity)).join(" ") }, this.props.extra))"#
            )
        );
    }

    #[test]
    fn test_style_string_becomes_object() {
        assert_eq!(
            commonjs(r#"<div style="color: red; -webkit-transition: opacity {this.ms}ms"/>"#),
            cjs_module(
                "",
                r#"React.createElement("div", { style: { color: "red", WebkitTransition: "opacity " + this.ms + "ms" } })"#
            )
        );
    }

    #[test]
    fn test_non_breaking_space() {
        assert_eq!(
            commonjs("<span>a&nbsp;b</span>"),
            cjs_module("", r#"React.createElement("span", {}, "a\u00a0b")"#)
        );
    }

    #[test]
    fn test_inline_comment() {
        assert_eq!(
            commonjs("<div><!-- note --><span/></div>"),
            cjs_module(
                "",
                "React.createElement(\"div\", {}, /* note */ React.createElement(\"span\", {}))"
            )
        );
    }

    #[test]
    fn test_stateless_root() {
        assert_eq!(
            commonjs("<div rt-stateless>{props.title}</div>"),
            format!(
                "{}module.exports = function (props, context) {{\n    return React.createElement(\"div\", {{}}, props.title);\n}};\n",
                CJS_PREAMBLE
            )
        );
    }

    #[test]
    fn test_autobind() {
        let options = CompileOptions::default().with_autobind(true);
        assert_eq!(
            compile(r#"<button onClick="{this.save}">Save</button>"#, &options).code,
            cjs_module(
                "",
                r#"React.createElement("button", { onClick: this.save.bind(this) }, "Save")"#
            )
        );
    }

    #[test]
    fn test_es6_import() {
        let options = CompileOptions::default().with_modules(ModuleFormat::Es6);
        assert_eq!(
            compile(
                r#"<rt-import name="default" from="./Card" as="Card"/><Card title="x"/>"#,
                &options
            )
            .code,
            r#"import * as React from "react";
import * as _ from "lodash";
import Card from "./Card";
export default function () {
    return React.createElement(Card, { title: "x" });
}
"#
        );
    }

    #[test]
    fn test_amd_with_module_comment() {
        let options = CompileOptions::default()
            .with_modules(ModuleFormat::Amd)
            .with_name("div");
        assert_eq!(
            compile("<!--c--><div/>", &options).code,
            r#"define("div", [
    "react",
    "lodash"
], function (React, _) {
    "use strict";
    /*c*/
    return function () {
        return React.createElement("div", {});
    };
});
"#
        );
    }

    #[test]
    fn test_legacy_dom_factories() {
        let options = CompileOptions::default().with_target_version(Version::new(0, 11, 0));
        assert_eq!(
            compile(r#"<div className="a"><span/></div>"#, &options).code,
            "\"use strict\";\nvar React = require(\"react/addons\");\nvar _ = require(\"lodash\");\n\
             module.exports = function () {\n    return React.DOM.div({ className: \"a\" }, React.DOM.span({}));\n};\n"
        );
    }

    #[test]
    fn test_native_list_view_after_split() {
        let options = CompileOptions::default().with_native(Version::new(0, 29, 0));
        assert_eq!(
            compile(
                r#"<ListView dataSource="{this.state.ds}"><Row><Text>{rowData.title}</Text></Row></ListView>"#,
                &options
            )
            .code,
            r#""use strict";
var React = require("react");
var ReactNative = require("react-native");
var _ = require("lodash");
function renderRow1(rowData, sectionID, rowID, highlightRow) {
    return React.createElement(ReactNative.Text, {}, rowData.title);
}
module.exports = function () {
    return React.createElement(ReactNative.ListView, { dataSource: this.state.ds, renderRow: renderRow1.bind(this) });
};
"#
        );
    }

    #[test]
    fn test_native_view_before_split() {
        let options = CompileOptions::default().with_native(Version::new(0, 0, 0));
        assert_eq!(
            compile("<View><Text>hi</Text></View>", &options).code,
            "\"use strict\";\nvar React = require(\"react-native\");\nvar _ = require(\"lodash\");\n\
             module.exports = function () {\n    return React.createElement(React.View, {}, React.createElement(React.Text, {}, \"hi\"));\n};\n"
        );
    }

    #[test]
    fn test_native_style_string_becomes_object() {
        let options = CompileOptions::default().with_native(Version::new(0, 29, 0));
        let code = compile(r#"<View style="flex: 1; -webkit-x: 2"/>"#, &options).code;
        assert!(code.contains(
            "React.createElement(ReactNative.View, { style: { flex: 1, x: 2 } })"
        ));
    }

    #[test]
    fn test_lone_non_breaking_space_is_kept() {
        assert_eq!(
            commonjs("<div>&nbsp;</div>"),
            cjs_module("", r#"React.createElement("div", {}, "\u00a0")"#)
        );
    }

    #[test]
    fn test_adjacent_numeric_interpolations_concatenate_as_text() {
        assert_eq!(
            commonjs(r#"<div title="{1}{2}"/>"#),
            cjs_module("", r#"React.createElement("div", { title: "" + 1 + 2 })"#)
        );
    }

    #[test]
    fn test_typescript_named_export() {
        let options = CompileOptions::default()
            .with_modules(ModuleFormat::Typescript)
            .with_name("listView");
        let code = compile("<div/>", &options).code;
        assert!(code.contains("var listView = function () {"));
        assert!(code.ends_with("export = listView;\n"));
    }

    #[test]
    fn test_explicit_template_in_repeat_scope() {
        assert_eq!(
            commonjs(
                r#"<div rt-repeat="group in groups"><Grid><rt-template prop="renderCell" arguments="cell"><b>{group.name}{cell}</b></rt-template></Grid></div>"#
            ),
            cjs_module(
                "function renderCell2(group, groupIndex, cell) {\n    return React.createElement(\"b\", {}, group.name, cell);\n}\n\
                 function repeatGroup1(group, groupIndex) {\n    return React.createElement(\"div\", {}, React.createElement(Grid, { renderCell: renderCell2.bind(this, group, groupIndex) }));\n}\n",
                "_.map(groups, repeatGroup1.bind(this))"
            )
        );
    }

    #[test]
    fn test_user_prop_template_from_options() {
        let options = CompileOptions::default().with_prop_template(
            "List",
            "Item",
            PropTemplateSpec::new("renderItem", &["item", "i"]),
        );
        let out = compile("<List><Item><li>{i}: {item}</li></Item></List>", &options);
        assert!(out.code.contains("function renderItem1(item, i) {\n    return React.createElement(\"li\", {}, i, \": \", item);\n}"));
        assert!(out.code.contains("React.createElement(List, { renderItem: renderItem1.bind(this) })"));
        assert!(out.warnings.is_empty());
    }
}
