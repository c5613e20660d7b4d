//! Hostname syntax and matching utilities.
//!
//! Matching follows the web PKI profile: patterns from certificates may use
//! a wildcard only as the entire leftmost label, and a wildcard consumes
//! exactly one label. Hostname syntax is the pragmatic superset browsers
//! accept (letters, digits, `-` not label-initial, `_`), not strict
//! RFC 1034.

use std::net::IpAddr;

/// Parse a textual IP, tolerating the bracketed form used in URLs.
pub(crate) fn parse_ip_literal(host: &str) -> Option<IpAddr> {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse().ok()
}

/// Lowercase and strip a single trailing dot.
pub(crate) fn normalize_hostname(host: &str) -> String {
    let host = host.strip_suffix('.').unwrap_or(host);
    host.to_ascii_lowercase()
}

/// Whether `host` is acceptable as a reference identity given by a caller.
/// One trailing dot is tolerated; wildcards are not.
pub(crate) fn valid_hostname_input(host: &str) -> bool {
    valid_hostname(host, false)
}

/// Whether `host` is acceptable as a matching pattern taken from a
/// certificate (SAN entry or legacy CN). Wildcards are allowed as the whole
/// first label; trailing dots are not.
pub(crate) fn valid_hostname_pattern(host: &str) -> bool {
    valid_hostname(host, true)
}

fn valid_hostname(host: &str, is_pattern: bool) -> bool {
    let host = if is_pattern {
        host
    } else {
        host.strip_suffix('.').unwrap_or(host)
    };
    if host.is_empty() {
        return false;
    }

    for (i, label) in host.split('.').enumerate() {
        if label.is_empty() {
            return false;
        }
        if is_pattern && i == 0 && label == "*" {
            // A wildcard is only legal as the entire leftmost label.
            continue;
        }
        for (j, c) in label.chars().enumerate() {
            let ok = c.is_ascii_alphanumeric() || (c == '-' && j != 0) || c == '_';
            if !ok {
                return false;
            }
        }
    }
    true
}

/// Case-insensitive hostname match of `host` against `pattern`, where a
/// leading `*` label matches exactly one label.
pub(crate) fn match_hostnames(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = normalize_hostname(host);
    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    let pattern_labels: Vec<&str> = pattern.split('.').collect();
    let host_labels: Vec<&str> = host.split('.').collect();
    if pattern_labels.len() != host_labels.len() {
        return false;
    }
    pattern_labels
        .iter()
        .zip(host_labels.iter())
        .enumerate()
        .all(|(i, (p, h))| (i == 0 && *p == "*") || p == h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_validity() {
        // (host, valid as input, valid as pattern)
        let tests = [
            ("example.com", true, true),
            ("eXample123-.com", true, true),
            ("-eXample123-.com", false, false),
            ("", false, false),
            (".", false, false),
            ("example..com", false, false),
            (".example.com", false, false),
            ("example.com.", true, false),
            ("*.example.com.", false, false),
            ("*.example.com", false, true),
            ("*foo.example.com", false, false),
            ("foo.*.example.com", false, false),
            ("exa_mple.com", true, true),
            ("foo,bar", false, false),
            ("project-dev:us-central1:main", false, false),
        ];
        for (host, input, pattern) in tests {
            assert_eq!(valid_hostname_input(host), input, "input: {host:?}");
            assert_eq!(valid_hostname_pattern(host), pattern, "pattern: {host:?}");
        }
    }

    #[test]
    fn wildcard_matches_exactly_one_label() {
        assert!(match_hostnames("*.example.com", "www.example.com"));
        assert!(!match_hostnames("*.example.com", "example.com"));
        assert!(!match_hostnames("*.example.com", "a.b.example.com"));
        assert!(!match_hostnames("www.*.com", "www.example.com"));
    }

    #[test]
    fn matching_is_case_and_trailing_dot_insensitive() {
        assert!(match_hostnames("www.example.com", "WwW.ExAmPlE.CoM"));
        assert!(match_hostnames("www.example.com", "www.example.com."));
        assert!(match_hostnames("WWW.EXAMPLE.COM", "www.example.com"));
    }

    #[test]
    fn empty_sides_never_match() {
        assert!(!match_hostnames("", "example.com"));
        assert!(!match_hostnames("example.com", ""));
    }

    #[test]
    fn ip_literals() {
        assert!(parse_ip_literal("192.0.2.7").is_some());
        assert!(parse_ip_literal("[2001:db8::1]").is_some());
        assert!(parse_ip_literal("2001:db8::1").is_some());
        assert!(parse_ip_literal("www.example.com").is_none());
    }
}
