//! Minimal glob matching for member selection.

/// Match `text` against `rule`, where `rule` is either `*`, a `prefix*`,
/// a `*suffix`, or a literal name. A single wildcard position only; no
/// escaping, no regex. A `*` anywhere else is treated literally.
pub fn matches(rule: &str, text: &str) -> bool {
    if rule == "*" {
        true
    } else if let Some(prefix) = rule.strip_suffix('*') {
        text.starts_with(prefix)
    } else if let Some(suffix) = rule.strip_prefix('*') {
        text.ends_with(suffix)
    } else {
        rule == text
    }
}
