use std::collections::BTreeSet;

use crate::ir::BaseClass;

/// View-producing operations. Their backward goes through `as_strided`,
/// which cannot be traced.
pub const VIEW_FUNCTIONS: &[&str] = &[
    "alias",
    "as_strided",
    "diagonal",
    "expand",
    "narrow",
    "permute",
    "select",
    "slice",
    "squeeze",
    "t",
    "transpose",
    "unbind",
    "unfold",
    "unsqueeze",
    "view",
];

pub fn default_untraceable() -> BTreeSet<String> {
    VIEW_FUNCTIONS.iter().map(|name| name.to_string()).collect()
}

pub fn classify_base(name: &str, untraceable: &BTreeSet<String>) -> BaseClass {
    if untraceable.contains(name) {
        BaseClass::Opaque
    } else {
        BaseClass::Traceable
    }
}
