//! URL joining and canonical cache keys.
//!
//! Every stored artifact lives under a canonical key: a single leading `/`,
//! no repeated slashes, no trailing slash. The key for an application's
//! document is its root, `name/version`.

/// Collapse runs of `/` into one, leaving a `scheme://` prefix intact.
pub fn collapse_slashes(path: &str) -> String {
    let (scheme, rest) = match path.find("://") {
        Some(idx) => path.split_at(idx + 3),
        None => ("", path),
    };

    let mut out = String::with_capacity(path.len());
    out.push_str(scheme);
    let mut previous_slash = false;
    for ch in rest.chars() {
        if ch == '/' {
            if previous_slash {
                continue;
            }
            previous_slash = true;
        } else {
            previous_slash = false;
        }
        out.push(ch);
    }
    out
}

/// Join `segments` onto `base` with exactly one `/` between parts.
///
/// A leading `/` on `base` is kept; empty segments are skipped; the result has
/// no trailing slash unless it is the bare root.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let rooted = base.starts_with('/');
    let mut parts: Vec<&str> = Vec::with_capacity(segments.len() + 1);

    let base = base.trim_matches('/');
    if !base.is_empty() {
        parts.push(base);
    }
    for segment in segments {
        let segment = segment.trim_matches('/');
        if !segment.is_empty() {
            parts.push(segment);
        }
    }

    let joined = collapse_slashes(&parts.join("/"));
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Canonical store key for `path`: leading `/`, single separators, no `.`
/// segments, no trailing slash.
pub fn normalize_key(path: &str) -> String {
    let segments: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

/// Key of an application's primary document: `name/version`.
pub fn app_root(name: &str, version: &str) -> String {
    join_url(name, &[version])
}

/// Origin directory holding one application version: `location/version`.
pub fn app_base(location: &str, version: &str) -> String {
    join_url(location, &[version])
}
