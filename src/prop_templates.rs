//! Prop-template extraction.
//!
//! A child is lifted out of its owner's children and passed as a function prop
//! when it is either an explicit `<rt-template prop="..." arguments="...">` or a
//! child whose tag is configured for the owner in `propTemplates`. Either way
//! the trigger element wraps exactly one element, which becomes the body.

use tracing::warn;

use crate::directives::TagDirective;
use crate::error::{
    CompileError, CompileResult, DirectiveWarning, ERR_DUPLICATE_PROP_TEMPLATE,
    ERR_INVALID_TEMPLATE, WARN_MISPLACED_DIRECTIVE,
};
use crate::expression::{is_valid_identifier, split_top_level};
use crate::ir::{ElementNode, SourceLocation, TemplateNode};
use crate::options::CompileOptions;

#[derive(Debug)]
pub struct TemplateCandidate<'a> {
    pub prop: String,
    pub arguments: Vec<String>,
    pub body: &'a ElementNode,
    pub location: SourceLocation,
}

#[derive(Debug, Default)]
pub struct ExtractedTemplates<'a> {
    pub templates: Vec<TemplateCandidate<'a>>,
    /// Children that stay inline, in source order.
    pub remaining: Vec<&'a TemplateNode>,
}

/// Partition `owner`'s children into prop templates and inline children.
pub fn extract<'a>(
    owner: &'a ElementNode,
    options: &CompileOptions,
    warnings: &mut Vec<DirectiveWarning>,
) -> CompileResult<ExtractedTemplates<'a>> {
    let mut extracted = ExtractedTemplates::default();

    for child in &owner.children {
        let TemplateNode::Element(el) = child else {
            extracted.remaining.push(child);
            continue;
        };

        let candidate = if TagDirective::from_tag(&el.tag) == Some(TagDirective::PropTrigger) {
            explicit_template(el, warnings)?
        } else if let Some(spec) = options.prop_template(&owner.tag, &el.tag) {
            warn_directives_on_trigger(el, warnings);
            TemplateCandidate {
                prop: spec.prop.clone(),
                arguments: spec.arguments.clone(),
                body: single_element_body(el)?,
                location: el.location,
            }
        } else {
            extracted.remaining.push(child);
            continue;
        };

        if extracted.templates.iter().any(|t| t.prop == candidate.prop) {
            return Err(CompileError::resolution(
                ERR_DUPLICATE_PROP_TEMPLATE,
                format!(
                    "<{}> already has a template for prop '{}'.",
                    owner.tag, candidate.prop
                ),
                candidate.location,
            ));
        }
        if owner.has_attribute(&candidate.prop) {
            return Err(CompileError::resolution(
                ERR_DUPLICATE_PROP_TEMPLATE,
                format!(
                    "Template for prop '{}' collides with the '{}' attribute of <{}>.",
                    candidate.prop, candidate.prop, owner.tag
                ),
                candidate.location,
            ));
        }
        extracted.templates.push(candidate);
    }

    Ok(extracted)
}

fn explicit_template<'a>(
    el: &'a ElementNode,
    warnings: &mut Vec<DirectiveWarning>,
) -> CompileResult<TemplateCandidate<'a>> {
    let prop = el
        .attribute_value("prop")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            CompileError::resolution(
                ERR_INVALID_TEMPLATE,
                "<rt-template> requires a 'prop' attribute.",
                el.location,
            )
        })?
        .to_string();
    if !is_valid_identifier(&prop) {
        return Err(CompileError::resolution(
            ERR_INVALID_TEMPLATE,
            format!("Template prop '{}' is not a valid identifier.", prop),
            el.location,
        ));
    }

    let arguments = match el.attribute_value("arguments") {
        Some(raw) => parse_arguments(raw, el.location)?,
        None => Vec::new(),
    };

    for attr in &el.attributes {
        if attr.name != "prop" && attr.name != "arguments" {
            warn!(attribute = %attr.name, "attribute on <rt-template> is ignored");
            warnings.push(DirectiveWarning::new(
                WARN_MISPLACED_DIRECTIVE,
                &attr.name,
                format!("Attribute '{}' has no effect on <rt-template>.", attr.name),
                attr.location,
            ));
        }
    }

    Ok(TemplateCandidate {
        prop,
        arguments,
        body: single_element_body(el)?,
        location: el.location,
    })
}

fn parse_arguments(raw: &str, location: SourceLocation) -> CompileResult<Vec<String>> {
    let mut arguments = Vec::new();
    for piece in split_top_level(raw, ',') {
        let name = piece.trim();
        if name.is_empty() {
            continue;
        }
        if !is_valid_identifier(name) || arguments.iter().any(|a| a == name) {
            return Err(CompileError::resolution(
                ERR_INVALID_TEMPLATE,
                format!("Invalid template argument '{}'.", name),
                location,
            ));
        }
        arguments.push(name.to_string());
    }
    Ok(arguments)
}

fn single_element_body(trigger: &ElementNode) -> CompileResult<&ElementNode> {
    let mut elements = trigger.element_children();
    match (elements.next(), elements.next()) {
        (Some(body), None) if trigger.has_only_element_content() => Ok(body),
        _ => Err(CompileError::resolution(
            ERR_INVALID_TEMPLATE,
            format!(
                "Template <{}> must contain exactly one element.",
                trigger.tag
            ),
            trigger.location,
        )),
    }
}

fn warn_directives_on_trigger(el: &ElementNode, warnings: &mut Vec<DirectiveWarning>) {
    for attr in el.attributes.iter().filter(|a| a.name.starts_with("rt-")) {
        warn!(attribute = %attr.name, tag = %el.tag, "directive on a prop-template trigger is ignored");
        warnings.push(DirectiveWarning::new(
            WARN_MISPLACED_DIRECTIVE,
            &attr.name,
            format!(
                "Directive '{}' on template trigger <{}> is ignored; put it on the template body.",
                attr.name, el.tag
            ),
            attr.location,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::PropTemplateSpec;
    use crate::parse::parse_template;

    fn owner(src: &str) -> ElementNode {
        match parse_template(src, None).unwrap().remove(0) {
            TemplateNode::Element(el) => el,
            other => panic!("expected element, got {:?}", other),
        }
    }

    fn list_options() -> CompileOptions {
        CompileOptions::default().with_prop_template(
            "List",
            "Row",
            PropTemplateSpec::new("renderRow", &["rowData"]),
        )
    }

    #[test]
    fn test_configured_child_is_lifted() {
        let el = owner("<List><Row><div>{rowData}</div></Row><span/></List>");
        let out = extract(&el, &list_options(), &mut Vec::new()).unwrap();
        assert_eq!(out.templates.len(), 1);
        assert_eq!(out.templates[0].prop, "renderRow");
        assert_eq!(out.templates[0].arguments, vec!["rowData"]);
        assert_eq!(out.templates[0].body.tag, "div");
        assert_eq!(out.remaining.len(), 1);
    }

    #[test]
    fn test_child_under_other_owner_is_not_lifted() {
        let el = owner("<Table><Row><div/></Row></Table>");
        let out = extract(&el, &list_options(), &mut Vec::new()).unwrap();
        assert!(out.templates.is_empty());
        assert_eq!(out.remaining.len(), 1);
    }

    #[test]
    fn test_explicit_templates() {
        let el = owner(
            r#"<Grid><rt-template prop="renderCell" arguments="cell, col"><b/></rt-template><rt-template prop="renderHeader"><i/></rt-template></Grid>"#,
        );
        let out = extract(&el, &CompileOptions::default(), &mut Vec::new()).unwrap();
        let props: Vec<_> = out.templates.iter().map(|t| t.prop.as_str()).collect();
        assert_eq!(props, vec!["renderCell", "renderHeader"]);
        assert_eq!(out.templates[0].arguments, vec!["cell", "col"]);
        assert!(out.templates[1].arguments.is_empty());
    }

    #[test]
    fn test_sibling_templates_for_same_prop_fail() {
        let el = owner("<List><Row><div/></Row><Row><div/></Row></List>");
        let err = extract(&el, &list_options(), &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), ERR_DUPLICATE_PROP_TEMPLATE);
    }

    #[test]
    fn test_template_colliding_with_attribute_fails() {
        let el = owner(r#"<List renderRow="{this.row}"><Row><div/></Row></List>"#);
        let err = extract(&el, &list_options(), &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), ERR_DUPLICATE_PROP_TEMPLATE);
    }

    #[test]
    fn test_template_body_must_be_single_element() {
        let el = owner("<List><Row><div/><div/></Row></List>");
        assert_eq!(
            extract(&el, &list_options(), &mut Vec::new()).unwrap_err().code(),
            ERR_INVALID_TEMPLATE
        );
        let el = owner("<List><Row>text</Row></List>");
        assert_eq!(
            extract(&el, &list_options(), &mut Vec::new()).unwrap_err().code(),
            ERR_INVALID_TEMPLATE
        );
    }

    #[test]
    fn test_rt_template_prop_must_be_identifier() {
        let el = owner(r#"<Grid><rt-template prop="render-cell"><b/></rt-template></Grid>"#);
        assert_eq!(
            extract(&el, &CompileOptions::default(), &mut Vec::new()).unwrap_err().code(),
            ERR_INVALID_TEMPLATE
        );
    }

    #[test]
    fn test_extra_rt_template_attribute_warns() {
        let el = owner(r#"<Grid><rt-template prop="renderCell" key="k"><b/></rt-template></Grid>"#);
        let mut warnings = Vec::new();
        let out = extract(&el, &CompileOptions::default(), &mut warnings).unwrap();
        assert_eq!(out.templates.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code(), WARN_MISPLACED_DIRECTIVE);
    }

    #[test]
    fn test_rt_template_requires_prop() {
        let el = owner("<Grid><rt-template><b/></rt-template></Grid>");
        assert_eq!(
            extract(&el, &CompileOptions::default(), &mut Vec::new()).unwrap_err().code(),
            ERR_INVALID_TEMPLATE
        );
    }
}
