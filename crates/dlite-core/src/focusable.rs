#![forbid(unsafe_code)]

//! Fixed focusable-element rules used by modal focus traps.
//!
//! The rule set mirrors the selector list below exactly. An element is
//! focusable when any one rule matches it.
//!
//! | Selector | Matches |
//! |----------|---------|
//! | `a[href]`, `area[href]` | links and image-map areas with a target |
//! | `input:not([disabled]):not([type="hidden"]):not([aria-hidden])` | enabled, visible inputs |
//! | `select`, `textarea`, `button` with `:not([disabled]):not([aria-hidden])` | enabled form controls |
//! | `iframe`, `object`, `embed` | embedded content |
//! | `[contenteditable]` | editable regions |
//! | `[tabindex]:not([tabindex^="-"])` | explicit non-negative tab stops |

/// Focusable selectors, in the order they are documented.
pub const FOCUSABLE_SELECTORS: &[&str] = &[
    "a[href]",
    "area[href]",
    "input:not([disabled]):not([type=\"hidden\"]):not([aria-hidden])",
    "select:not([disabled]):not([aria-hidden])",
    "textarea:not([disabled]):not([aria-hidden])",
    "button:not([disabled]):not([aria-hidden])",
    "iframe",
    "object",
    "embed",
    "[contenteditable]",
    "[tabindex]:not([tabindex^=\"-\"])",
];

/// Read-only view of an element, enough to evaluate the rules.
pub trait ElementView {
    /// Lower-case tag name.
    fn tag(&self) -> &str;
    /// Attribute value, if the attribute is present.
    fn attr(&self, name: &str) -> Option<&str>;

    fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }
}

/// Whether `element` matches any of [`FOCUSABLE_SELECTORS`].
pub fn is_focusable(element: &impl ElementView) -> bool {
    let enabled_control = || !element.has_attr("disabled") && !element.has_attr("aria-hidden");

    let by_tag = match element.tag() {
        "a" | "area" => element.has_attr("href"),
        "input" => enabled_control() && element.attr("type") != Some("hidden"),
        "select" | "textarea" | "button" => enabled_control(),
        "iframe" | "object" | "embed" => true,
        _ => false,
    };

    by_tag
        || element.has_attr("contenteditable")
        || element
            .attr("tabindex")
            .is_some_and(|value| !value.starts_with('-'))
}
