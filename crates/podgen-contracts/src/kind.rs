//! Kind selector helpers.
//!
//! A kinds entry in a resource description may be qualified: `Pod`,
//! `v1/Pod`, `apps/v1/Deployment`, or carry a subresource (`Pod/exec`,
//! `Pod.exec`). Comparisons against a kind name use the bare kind.

/// The kind name of a kind selector.
pub fn kind_name(selector: &str) -> &str {
    let segment = selector
        .split('/')
        .find(|s| s.starts_with(|c: char| c.is_ascii_uppercase()))
        .unwrap_or(selector);
    segment.split('.').next().unwrap_or(segment)
}

/// True if any selector in `kinds` names `kind`.
pub fn contains_kind(kinds: &[String], kind: &str) -> bool {
    kinds.iter().any(|selector| kind_name(selector) == kind)
}
