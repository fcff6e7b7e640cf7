//! Canonical form of a profile's `primary_url`.
//!
//! The canonical form drops the scheme and a leading `www.`, keeps host, path
//! (without a trailing slash) and query, and cuts everything after an embedded
//! `://`. Two spellings of the same site therefore compare equal in the index.

use crate::error::{NodeIndexError, Result};

pub fn canonicalize_primary_url(raw: &str) -> Result<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid(raw));
    }

    let with_scheme = if raw.contains("http") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let (scheme, rest) = with_scheme.split_once("://").ok_or_else(|| invalid(raw))?;
    let scheme_char = |c: char| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.');
    if scheme.is_empty() || !scheme.chars().all(scheme_char) {
        return Err(invalid(raw));
    }

    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (host, remainder) = rest.split_at(authority_end);
    if host.is_empty() {
        return Err(invalid(raw));
    }
    let (path, query) = match remainder.split_once('?') {
        Some((path, query)) => (path, query),
        None => (remainder, ""),
    };

    let mut canonical = host.strip_prefix("www.").unwrap_or(host).to_string();
    if !path.is_empty() {
        canonical.push_str(path);
        if canonical.ends_with('/') {
            canonical.pop();
        }
    }
    if !query.is_empty() {
        canonical.push('?');
        canonical.push_str(query);
    }

    if let Some(position) = canonical.find("://") {
        canonical.truncate(position);
    }

    Ok(canonical)
}

fn invalid(raw: &str) -> NodeIndexError {
    NodeIndexError::validation("primary_url", format!("Invalid primary_url: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_forms() {
        let cases = [
            ("https://www.ic3.dev/path1://path2", "ic3.dev/path1"),
            ("https://www.ic3.dev/page.html#section", "ic3.dev/page.html#section"),
            ("ic3.dev/page.html", "ic3.dev/page.html"),
            ("http://ic3.dev/", "ic3.dev"),
            ("https://ic3.dev", "ic3.dev"),
            ("www.ic3.dev/a/b/", "ic3.dev/a/b"),
            ("https://ic3.dev/search?q=rust", "ic3.dev/search?q=rust"),
        ];
        for (raw, expected) in cases {
            assert_eq!(canonicalize_primary_url(raw).unwrap(), expected, "input: {raw}");
        }
    }

    #[test]
    fn test_invalid_urls() {
        assert!(canonicalize_primary_url("").is_err());
        assert!(canonicalize_primary_url("https://ic3 .dev").is_err());
        assert!(canonicalize_primary_url("https:///path").is_err());
    }
}
