//! Static tag and attribute tables for the web and native targets.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

lazy_static! {
    /// Tags the DOM factory knows; anything else that is not a custom element
    /// (`x-foo`) is emitted as a component reference.
    pub static ref HTML_TAGS: HashSet<&'static str> = [
        "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi",
        "bdo", "big", "blockquote", "body", "br", "button", "canvas", "caption", "cite",
        "code", "col", "colgroup", "data", "datalist", "dd", "del", "details", "dfn",
        "dialog", "div", "dl", "dt", "em", "embed", "fieldset", "figcaption", "figure",
        "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hgroup",
        "hr", "html", "i", "iframe", "img", "input", "ins", "kbd", "keygen", "label",
        "legend", "li", "link", "main", "map", "mark", "menu", "menuitem", "meta", "meter",
        "nav", "noscript", "object", "ol", "optgroup", "option", "output", "p", "param",
        "picture", "pre", "progress", "q", "rp", "rt", "ruby", "s", "samp", "script",
        "section", "select", "small", "source", "span", "strong", "style", "sub",
        "summary", "sup", "table", "tbody", "td", "textarea", "tfoot", "th", "thead",
        "time", "title", "tr", "track", "u", "ul", "var", "video", "wbr",
        // SVG
        "circle", "clipPath", "defs", "ellipse", "g", "image", "line", "linearGradient",
        "mask", "path", "pattern", "polygon", "polyline", "radialGradient", "rect",
        "stop", "svg", "text", "tspan",
    ]
    .into_iter()
    .collect();

    /// Elements that never have children; a stray `</br>` is ignored.
    pub static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link",
        "meta", "param", "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    /// Elements whose content is raw text up to the matching close tag.
    pub static ref RAW_TEXT_TAGS: HashSet<&'static str> =
        ["script", "style"].into_iter().collect();

    /// Elements whose text keeps its whitespace under normalization.
    pub static ref PRESERVE_WHITESPACE_TAGS: HashSet<&'static str> =
        ["pre", "textarea", "script", "style"].into_iter().collect();

    /// Native primitives available on every native target version.
    static ref NATIVE_COMPONENTS: HashSet<&'static str> = [
        "ActivityIndicatorIOS", "DatePickerIOS", "DrawerLayoutAndroid", "Image", "ListView",
        "MapView", "Modal", "Navigator", "NavigatorIOS", "PickerIOS", "ProgressBarAndroid",
        "ProgressViewIOS", "RefreshControl", "ScrollView", "SegmentedControlIOS",
        "SliderIOS", "SnapshotViewIOS", "Switch", "SwitchAndroid", "SwitchIOS", "TabBarIOS",
        "Text", "TextInput", "ToolbarAndroid", "TouchableHighlight",
        "TouchableNativeFeedback", "TouchableOpacity", "TouchableWithoutFeedback", "View",
        "ViewPagerAndroid", "WebView",
    ]
    .into_iter()
    .collect();

    /// Primitives added by the split `react` / `react-native` packages.
    static ref NATIVE_COMPONENTS_0_29: HashSet<&'static str> = [
        "ActivityIndicator", "KeyboardAvoidingView", "Picker", "Slider", "StatusBar",
    ]
    .into_iter()
    .collect();

    static ref WEB_ATTRIBUTE_NAMES: HashMap<&'static str, &'static str> =
        [("class", "className"), ("for", "htmlFor")].into_iter().collect();
}

pub fn is_html_tag(tag: &str) -> bool {
    HTML_TAGS.contains(tag) || is_custom_element(tag)
}

/// Custom elements are lowercase names containing a dash.
pub fn is_custom_element(tag: &str) -> bool {
    tag.contains('-')
        && tag
            .chars()
            .next()
            .map(|c| c.is_ascii_lowercase())
            .unwrap_or(false)
}

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(tag)
}

pub fn is_raw_text_tag(tag: &str) -> bool {
    RAW_TEXT_TAGS.contains(tag)
}

pub fn preserves_whitespace(tag: &str) -> bool {
    PRESERVE_WHITESPACE_TAGS.contains(tag)
}

/// Whether `tag` is a native primitive on a target with or without the
/// split native package.
pub fn is_native_component(tag: &str, split_package: bool) -> bool {
    NATIVE_COMPONENTS.contains(tag) || (split_package && NATIVE_COMPONENTS_0_29.contains(tag))
}

/// Map a template attribute name to the prop name the web factory expects.
pub fn web_prop_name(attribute: &str) -> &str {
    WEB_ATTRIBUTE_NAMES.get(attribute).copied().unwrap_or(attribute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_and_custom_tags() {
        assert!(is_html_tag("div"));
        assert!(is_html_tag("linearGradient"));
        assert!(is_html_tag("my-widget"));
        assert!(!is_html_tag("Button"));
        assert!(!is_html_tag("foo"));
    }

    #[test]
    fn test_native_components_by_version() {
        assert!(is_native_component("View", false));
        assert!(!is_native_component("Picker", false));
        assert!(is_native_component("Picker", true));
        assert!(!is_native_component("MyComp", true));
    }

    #[test]
    fn test_web_prop_names() {
        assert_eq!(web_prop_name("class"), "className");
        assert_eq!(web_prop_name("for"), "htmlFor");
        assert_eq!(web_prop_name("onClick"), "onClick");
    }
}
