//! Compile options and the read-only compile context.
//!
//! Options deserialize from the same camelCase JSON object the RT tooling
//! passes around, so `{"modules": "amd", "name": "list"}` works as-is.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{CompileError, CompileResult, ERR_INVALID_OPTIONS, ERR_MISSING_NAME};
use crate::expression::is_valid_identifier;
use crate::ir::SourceLocation;

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// Global attach: `var name = (function () { ... })();`
    None,
    #[default]
    CommonJs,
    Amd,
    Es6,
    #[serde(alias = "typed")]
    Typescript,
    /// Bare render function, used for templates embedded in script files.
    Jsrt,
}

impl ModuleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::None => "none",
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::Amd => "amd",
            ModuleFormat::Es6 => "es6",
            ModuleFormat::Typescript => "typescript",
            ModuleFormat::Jsrt => "jsrt",
        }
    }

    /// Formats that cannot carry an import preamble.
    pub fn emits_imports(&self) -> bool {
        !matches!(self, ModuleFormat::None | ModuleFormat::Jsrt)
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VERSION
// ═══════════════════════════════════════════════════════════════════════════════

/// A `major.minor.patch` version. Missing components read as zero and a
/// pre-release suffix is ignored, so `"15"`, `"v0.29"` and `"0.14.0-rc1"` parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('v');
        let core = trimmed.split(['-', '+']).next().unwrap_or("");
        if core.is_empty() {
            return Err(format!("invalid version '{}'", s));
        }
        let mut parts = [0u32; 3];
        for (i, piece) in core.split('.').enumerate() {
            if i >= 3 {
                return Err(format!("invalid version '{}'", s));
            }
            parts[i] = piece
                .parse()
                .map_err(|_| format!("invalid version '{}'", s))?;
        }
        Ok(Version::new(parts[0], parts[1], parts[2]))
    }
}

impl TryFrom<String> for Version {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROP TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropTemplateSpec {
    pub prop: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl PropTemplateSpec {
    pub fn new(prop: &str, arguments: &[&str]) -> Self {
        PropTemplateSpec {
            prop: prop.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// owner component → child tag → prop spec
pub type PropTemplateTable = HashMap<String, HashMap<String, PropTemplateSpec>>;

lazy_static! {
    /// Render-prop children understood by the native list component.
    static ref NATIVE_PROP_TEMPLATES: PropTemplateTable = {
        let mut list_view = HashMap::new();
        list_view.insert(
            "Row".to_string(),
            PropTemplateSpec::new("renderRow", &["rowData", "sectionID", "rowID", "highlightRow"]),
        );
        list_view.insert("Footer".to_string(), PropTemplateSpec::new("renderFooter", &[]));
        list_view.insert("Header".to_string(), PropTemplateSpec::new("renderHeader", &[]));
        list_view.insert(
            "ScrollComponent".to_string(),
            PropTemplateSpec::new("renderScrollComponent", &["props"]),
        );
        list_view.insert(
            "SectionHeader".to_string(),
            PropTemplateSpec::new("renderSectionHeader", &["sectionData", "sectionID"]),
        );
        list_view.insert(
            "Separator".to_string(),
            PropTemplateSpec::new(
                "renderSeparator",
                &["sectionID", "rowID", "adjacentRowHighlighted"],
            ),
        );
        let mut m = HashMap::new();
        m.insert("ListView".to_string(), list_view);
        m
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE OPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    pub modules: ModuleFormat,
    pub name: Option<String>,
    pub target_version: Version,
    pub native: bool,
    pub native_target_version: Version,
    pub autobind: bool,
    pub prop_templates: PropTemplateTable,
    pub normalize_html_whitespace: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            modules: ModuleFormat::CommonJs,
            name: None,
            target_version: Version::new(0, 14, 0),
            native: false,
            native_target_version: Version::new(0, 0, 0),
            autobind: false,
            prop_templates: HashMap::new(),
            normalize_html_whitespace: false,
        }
    }
}

impl CompileOptions {
    pub fn from_json(json: &str) -> CompileResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            CompileError::resolution(
                ERR_INVALID_OPTIONS,
                format!("Invalid compile options: {}", e),
                SourceLocation::default(),
            )
        })
    }

    pub fn with_modules(mut self, modules: ModuleFormat) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_target_version(mut self, version: Version) -> Self {
        self.target_version = version;
        self
    }

    pub fn with_native(mut self, native_target_version: Version) -> Self {
        self.native = true;
        self.native_target_version = native_target_version;
        self
    }

    pub fn with_autobind(mut self, autobind: bool) -> Self {
        self.autobind = autobind;
        self
    }

    pub fn with_normalized_whitespace(mut self, normalize: bool) -> Self {
        self.normalize_html_whitespace = normalize;
        self
    }

    pub fn with_prop_template(mut self, owner: &str, child: &str, spec: PropTemplateSpec) -> Self {
        self.prop_templates
            .entry(owner.to_string())
            .or_default()
            .insert(child.to_string(), spec);
        self
    }

    /// Check option combinations that no template could satisfy.
    pub fn validate(&self) -> CompileResult<()> {
        let needs_name = matches!(self.modules, ModuleFormat::None | ModuleFormat::Amd);
        let name = self.name.as_deref().map(str::trim).unwrap_or("");
        if needs_name && name.is_empty() {
            return Err(CompileError::resolution(
                ERR_MISSING_NAME,
                format!("The '{}' module format requires a 'name' option.", self.modules),
                SourceLocation::default(),
            ));
        }
        let names_variable = self.modules == ModuleFormat::None
            || (self.modules == ModuleFormat::Typescript && self.name.is_some());
        if names_variable && !is_valid_identifier(name) {
            return Err(CompileError::resolution(
                ERR_INVALID_OPTIONS,
                format!("'{}' is not a valid variable name.", name),
                SourceLocation::default(),
            ));
        }
        for (owner, children) in &self.prop_templates {
            for (child, spec) in children {
                if !is_valid_identifier(spec.prop.trim()) {
                    return Err(CompileError::resolution(
                        ERR_INVALID_OPTIONS,
                        format!(
                            "Prop template {}.{} has invalid prop name '{}'.",
                            owner, child, spec.prop
                        ),
                        SourceLocation::default(),
                    ));
                }
                if let Some(bad) = spec.arguments.iter().find(|a| !is_valid_identifier(a)) {
                    return Err(CompileError::resolution(
                        ERR_INVALID_OPTIONS,
                        format!("Prop template {}.{} has invalid argument '{}'.", owner, child, bad),
                        SourceLocation::default(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Look up the configured prop template for `child` under `owner`.
    /// User entries win over the built-in native table.
    pub fn prop_template(&self, owner: &str, child: &str) -> Option<&PropTemplateSpec> {
        let user = self.prop_templates.get(owner).and_then(|m| m.get(child));
        if user.is_some() || !self.native {
            return user;
        }
        NATIVE_PROP_TEMPLATES.get(owner).and_then(|m| m.get(child))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILE CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only input shared by every compile call of a batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileContext {
    pub options: CompileOptions,
    pub file_name: Option<String>,
}

impl CompileContext {
    pub fn new(options: CompileOptions) -> Self {
        CompileContext {
            options,
            file_name: None,
        }
    }

    pub fn with_file(mut self, file_name: &str) -> Self {
        self.file_name = Some(file_name.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let opts = CompileOptions::default();
        assert_eq!(opts.modules, ModuleFormat::CommonJs);
        assert_eq!(opts.target_version, Version::new(0, 14, 0));
        assert!(!opts.native);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_from_json_camel_case() {
        let raw = json!({
            "modules": "typed",
            "targetVersion": "15.0.0",
            "native": true,
            "nativeTargetVersion": "0.29",
            "propTemplates": {
                "List": { "Row": { "prop": "renderRow", "arguments": ["rowData"] } }
            },
            "normalizeHtmlWhitespace": true
        });
        let opts = CompileOptions::from_json(&raw.to_string()).unwrap();
        assert_eq!(opts.modules, ModuleFormat::Typescript);
        assert_eq!(opts.target_version, Version::new(15, 0, 0));
        assert_eq!(opts.native_target_version, Version::new(0, 29, 0));
        assert!(opts.normalize_html_whitespace);
        assert_eq!(
            opts.prop_template("List", "Row"),
            Some(&PropTemplateSpec::new("renderRow", &["rowData"]))
        );
    }

    #[test]
    fn test_unknown_module_format_is_rejected() {
        let err = CompileOptions::from_json(r#"{"modules": "umd"}"#).unwrap_err();
        assert_eq!(err.code(), ERR_INVALID_OPTIONS);
    }

    #[test]
    fn test_version_parsing_and_order() {
        assert_eq!("v0.29.1".parse::<Version>(), Ok(Version::new(0, 29, 1)));
        assert_eq!("15".parse::<Version>(), Ok(Version::new(15, 0, 0)));
        assert_eq!("0.14.0-rc1".parse::<Version>(), Ok(Version::new(0, 14, 0)));
        assert!("abc".parse::<Version>().is_err());
        assert!(Version::new(0, 29, 0) > Version::new(0, 28, 9));
        assert!(Version::new(15, 0, 0) > Version::new(0, 14, 0));
    }

    #[test]
    fn test_amd_and_none_require_name() {
        let amd = CompileOptions::default().with_modules(ModuleFormat::Amd);
        assert_eq!(amd.validate().unwrap_err().code(), ERR_MISSING_NAME);
        assert!(amd.with_name("list").validate().is_ok());

        let none = CompileOptions::default()
            .with_modules(ModuleFormat::None)
            .with_name("my-list");
        assert_eq!(none.validate().unwrap_err().code(), ERR_INVALID_OPTIONS);
    }

    #[test]
    fn test_typescript_name_must_be_identifier() {
        let ts = CompileOptions::default().with_modules(ModuleFormat::Typescript);
        assert!(ts.validate().is_ok());
        assert!(ts.clone().with_name("listView").validate().is_ok());
        assert_eq!(
            ts.with_name("my-tpl").validate().unwrap_err().code(),
            ERR_INVALID_OPTIONS
        );
        let amd = CompileOptions::default()
            .with_modules(ModuleFormat::Amd)
            .with_name("views/my-list");
        assert!(amd.validate().is_ok());
    }

    #[test]
    fn test_prop_template_prop_must_be_identifier() {
        let opts = CompileOptions::default().with_prop_template(
            "Grid",
            "Cell",
            PropTemplateSpec::new("render-cell", &["cell"]),
        );
        assert_eq!(opts.validate().unwrap_err().code(), ERR_INVALID_OPTIONS);
    }

    #[test]
    fn test_native_list_view_defaults_merge_under_user_entries() {
        let opts = CompileOptions::default()
            .with_native(Version::new(0, 29, 0))
            .with_prop_template("ListView", "Row", PropTemplateSpec::new("renderItem", &["item"]));
        assert_eq!(opts.prop_template("ListView", "Row").unwrap().prop, "renderItem");
        assert_eq!(
            opts.prop_template("ListView", "SectionHeader").unwrap().arguments,
            vec!["sectionData", "sectionID"]
        );
        let web = CompileOptions::default();
        assert!(web.prop_template("ListView", "Row").is_none());
    }
}
