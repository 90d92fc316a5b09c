//! Target profiles.
//!
//! Everything that depends on web vs native mode and on the configured
//! versions is decided once per compile, in `TargetProfile::from_options`.
//! The emitter only asks the profile; it never compares versions itself.

use crate::error::{CompileError, CompileResult, ERR_INVALID_TAG};
use crate::expression::{is_member_path, quote_js};
use crate::ir::{Dependency, ImportBinding, SourceLocation, TagRef};
use crate::options::{CompileOptions, Version};
use crate::support::{is_html_tag, is_native_component};

// ═══════════════════════════════════════════════════════════════════════════════
// VERSION RANGES
// ═══════════════════════════════════════════════════════════════════════════════

/// Half-open `[from, until)` range; a missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionRange {
    pub from: Option<Version>,
    pub until: Option<Version>,
}

impl VersionRange {
    pub const fn below(version: Version) -> Self {
        VersionRange {
            from: None,
            until: Some(version),
        }
    }

    pub const fn starting_at(version: Version) -> Self {
        VersionRange {
            from: Some(version),
            until: None,
        }
    }

    pub fn contains(&self, version: Version) -> bool {
        self.from.map_or(true, |from| version >= from)
            && self.until.map_or(true, |until| version < until)
    }
}

/// Web targets before 0.12 build DOM elements through `React.DOM.<tag>` factories.
pub const LEGACY_DOM_FACTORIES: VersionRange = VersionRange::below(Version::new(0, 12, 0));
/// Web targets before 0.14 ship addons inside the main package.
pub const ADDONS_PACKAGE: VersionRange = VersionRange::below(Version::new(0, 14, 0));
/// Native targets from 0.29 split `react` from `react-native`.
pub const SPLIT_NATIVE_PACKAGE: VersionRange = VersionRange::starting_at(Version::new(0, 29, 0));

// ═══════════════════════════════════════════════════════════════════════════════
// ELEMENT FACTORIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Emits the call that constructs one element.
pub trait ElementFactory: Send + Sync {
    fn element_call(&self, tag: &TagRef, props: &str, children: &[String]) -> String;
}

fn call(callee: &str, args: Vec<String>) -> String {
    format!("{}({})", callee, args.join(", "))
}

/// `React.createElement(tag, props, ...children)`
pub struct CreateElementFactory {
    pub native_namespace: &'static str,
}

impl ElementFactory for CreateElementFactory {
    fn element_call(&self, tag: &TagRef, props: &str, children: &[String]) -> String {
        let tag_expr = match tag {
            TagRef::Html(name) => quote_js(name),
            TagRef::Native(name) => format!("{}.{}", self.native_namespace, name),
            TagRef::Component(name) => name.clone(),
        };
        let mut args = vec![tag_expr, props.to_string()];
        args.extend(children.iter().cloned());
        call("React.createElement", args)
    }
}

/// `React.DOM.tag(props, ...children)` and `Component(props, ...children)`.
pub struct LegacyDomFactory;

impl ElementFactory for LegacyDomFactory {
    fn element_call(&self, tag: &TagRef, props: &str, children: &[String]) -> String {
        let callee = match tag {
            TagRef::Html(name) if name.contains('-') => {
                format!("React.DOM[{}]", quote_js(name))
            }
            TagRef::Html(name) => format!("React.DOM.{}", name),
            TagRef::Native(name) | TagRef::Component(name) => name.clone(),
        };
        let mut args = vec![props.to_string()];
        args.extend(children.iter().cloned());
        call(&callee, args)
    }
}

static CREATE_ELEMENT: CreateElementFactory = CreateElementFactory {
    native_namespace: "React",
};
static CREATE_ELEMENT_SPLIT_NATIVE: CreateElementFactory = CreateElementFactory {
    native_namespace: "ReactNative",
};
static LEGACY_DOM: LegacyDomFactory = LegacyDomFactory;

// ═══════════════════════════════════════════════════════════════════════════════
// PROFILE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMode {
    Web,
    Native,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetProfile {
    pub mode: TargetMode,
    pub legacy_factories: bool,
    pub split_native_package: bool,
    pub react_module: &'static str,
}

impl TargetProfile {
    pub fn from_options(options: &CompileOptions) -> Self {
        if options.native {
            let split = SPLIT_NATIVE_PACKAGE.contains(options.native_target_version);
            return TargetProfile {
                mode: TargetMode::Native,
                legacy_factories: false,
                split_native_package: split,
                react_module: if split { "react" } else { "react-native" },
            };
        }
        let version = options.target_version;
        TargetProfile {
            mode: TargetMode::Web,
            legacy_factories: LEGACY_DOM_FACTORIES.contains(version),
            split_native_package: false,
            react_module: if ADDONS_PACKAGE.contains(version) {
                "react/addons"
            } else {
                "react"
            },
        }
    }

    pub fn is_native(&self) -> bool {
        self.mode == TargetMode::Native
    }

    pub fn factory(&self) -> &'static dyn ElementFactory {
        if self.legacy_factories {
            &LEGACY_DOM
        } else if self.split_native_package {
            &CREATE_ELEMENT_SPLIT_NATIVE
        } else {
            &CREATE_ELEMENT
        }
    }

    /// Decide how a tag name is referenced in generated code.
    pub fn classify_tag(&self, tag: &str, location: SourceLocation) -> CompileResult<TagRef> {
        match self.mode {
            TargetMode::Native if is_native_component(tag, self.split_native_package) => {
                return Ok(TagRef::Native(tag.to_string()))
            }
            TargetMode::Web if is_html_tag(tag) => return Ok(TagRef::Html(tag.to_string())),
            _ => {}
        }
        if is_member_path(tag) {
            Ok(TagRef::Component(tag.to_string()))
        } else {
            Err(CompileError::resolution(
                ERR_INVALID_TAG,
                format!("<{}> is neither a known element nor a valid component reference.", tag),
                location,
            ))
        }
    }

    /// Modules every generated render function depends on, in import order.
    pub fn runtime_dependencies(&self) -> Vec<Dependency> {
        let mut deps = vec![Dependency::new("React", self.react_module, ImportBinding::Module)];
        if self.split_native_package {
            deps.push(Dependency::new(
                "ReactNative",
                "react-native",
                ImportBinding::Module,
            ));
        }
        deps.push(Dependency::new("_", "lodash", ImportBinding::Module));
        deps
    }

    pub fn describe(&self) -> String {
        match self.mode {
            TargetMode::Web if self.legacy_factories => "web (legacy DOM factories)".to_string(),
            TargetMode::Web => format!("web ({})", self.react_module),
            TargetMode::Native if self.split_native_package => "native (react + react-native)".to_string(),
            TargetMode::Native => "native (react-native)".to_string(),
        }
    }
}
