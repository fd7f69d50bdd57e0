// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object name normalization.

/// Turns an arbitrary proposal into an identifier: ASCII alphanumerics and
/// `_` only, never starting with a digit, never empty.
pub(crate) fn sanitize(proposed: &str) -> String {
    let mut name: String = proposed
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() {
        name.push_str("Unnamed");
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Returns `base` if free, otherwise `base` with its trailing digits replaced
/// by the first free suffix of at least three digits.
pub(crate) fn make_unique(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_owned();
    }
    let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
    (1_u64..)
        .map(|n| format!("{stem}{n:03}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| unreachable!("name suffixes exhausted"))
}
