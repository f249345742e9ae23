//! Exclusion-pattern matching for `nonProxyHosts`-style settings.
//!
//! A `nonProxyHosts` value lists hosts that must bypass the proxy, e.g.
//! `localhost|127.0.0.1|*.corp.example`. Entries are separated by `|` or
//! `,`. Within an entry, `*` matches any run of characters and every other
//! character (including `.`) matches itself. Matching is case-sensitive
//! and covers the whole host, never a substring.

/// Returns true if `host` matches any entry of the exclusion `pattern`.
///
/// Empty hosts and empty patterns never match. Entries are trimmed, and
/// empty entries (from a trailing separator, say) are skipped. No pattern
/// is ever rejected: an entry that cannot line up with the host simply
/// does not match.
pub fn matches_exclusion_list(host: &str, pattern: &str) -> bool {
    if host.is_empty() || pattern.is_empty() {
        return false;
    }

    pattern
        .split(['|', ','])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .any(|entry| wildcard_match(host, entry))
}

/// Whole-string match where `*` matches zero or more characters and every
/// other character matches itself.
fn wildcard_match(host: &str, entry: &str) -> bool {
    let host: Vec<char> = host.chars().collect();
    let entry: Vec<char> = entry.chars().collect();

    // Two-pointer scan; on a mismatch, backtrack to the most recent `*`
    // and let it swallow one more host character.
    let mut h = 0;
    let mut e = 0;
    let mut star: Option<(usize, usize)> = None;

    while h < host.len() {
        if e < entry.len() && entry[e] == '*' {
            star = Some((e, h));
            e += 1;
        } else if e < entry.len() && entry[e] == host[h] {
            e += 1;
            h += 1;
        } else if let Some((star_e, star_h)) = star {
            e = star_e + 1;
            h = star_h + 1;
            star = Some((star_e, star_h + 1));
        } else {
            return false;
        }
    }

    // The host is consumed; only trailing `*`s may remain in the entry.
    entry[e..].iter().all(|&c| c == '*')
}
