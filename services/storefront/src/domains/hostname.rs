//! Hostname normalization and validation.
//!
//! # Purpose
//! One place for the hostname grammar every operator-supplied domain and
//! attraction slug must satisfy before it reaches the store.
//!
//! The grammar is the conventional one: dot-separated labels of
//! alphanumerics and hyphens, no label starting or ending with a hyphen,
//! labels at most 63 octets, total name at most 253 octets, and a final TLD
//! label of at least two letters.

/// Lowercase a raw hostname and strip an optional trailing dot.
///
/// `Host` headers may also carry a port; callers that resolve hosts strip it
/// with [`strip_port`] first.
pub fn normalize(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// Drop a `:port` suffix from a host identifier, if present.
pub fn strip_port(host: &str) -> &str {
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

/// Whether `domain` (already normalized) is a well-formed multi-label
/// hostname with an alphabetic TLD.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    if !labels.iter().all(|label| is_valid_label(label)) {
        return false;
    }
    // The TLD label must be at least two letters; this also rejects raw IPs.
    let tld = labels[labels.len() - 1];
    tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// Whether `label` is a valid single hostname label. Used for both domain
/// labels and attraction slugs.
pub fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > 63 {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}
