//! Maven version ordering.

use std::cmp::Ordering;

/// Compares two Maven version strings.
///
/// Splits on `.`, `-` and digit/letter transitions. Numeric segments compare
/// numerically and rank above qualifiers; known qualifiers follow Maven's
/// `alpha < beta < milestone < rc < snapshot < release < sp` order, unknown
/// ones sort after `sp` case-insensitively. A missing segment counts as `0`
/// against numbers and as a release against qualifiers, so `1.0 == 1.0.0`
/// and `1.0-SNAPSHOT < 1.0`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = split_version(a);
    let b_parts = split_version(b);

    let max_len = a_parts.len().max(b_parts.len());
    for i in 0..max_len {
        let ap = a_parts.get(i).map_or("", String::as_str);
        let bp = b_parts.get(i).map_or("", String::as_str);

        let ord = compare_segment(ap, bp);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    Ordering::Equal
}

fn split_version(v: &str) -> Vec<String> {
    let mut parts = Vec::new();
    for token in v.split(['.', '-']).filter(|s| !s.is_empty()) {
        let mut current = String::new();
        let mut current_numeric = None;
        for c in token.chars() {
            let numeric = c.is_ascii_digit();
            if current_numeric.is_some_and(|n| n != numeric) {
                parts.push(std::mem::take(&mut current));
            }
            current_numeric = Some(numeric);
            current.push(c);
        }
        if !current.is_empty() {
            parts.push(current);
        }
    }
    parts
}

fn qualifier_rank(qualifier: &str) -> u8 {
    match qualifier.to_lowercase().as_str() {
        "alpha" | "a" => 1,
        "beta" | "b" => 2,
        "milestone" | "m" => 3,
        "rc" | "cr" => 4,
        "snapshot" => 5,
        "" | "ga" | "final" | "release" => 6,
        "sp" => 7,
        _ => 8,
    }
}

fn compare_segment(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(an), Ok(bn)) => an.cmp(&bn),
        (Ok(an), Err(_)) if b.is_empty() => an.cmp(&0),
        (Err(_), Ok(bn)) if a.is_empty() => 0.cmp(&bn),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => qualifier_rank(a)
            .cmp(&qualifier_rank(b))
            .then_with(|| a.to_lowercase().cmp(&b.to_lowercase())),
    }
}

/// Picks the greater of an optional current version and a candidate.
pub fn max_version(current: Option<&str>, candidate: &str) -> String {
    match current {
        Some(current) if compare_versions(current, candidate) == Ordering::Greater => current.to_string(),
        _ => candidate.to_string(),
    }
}
