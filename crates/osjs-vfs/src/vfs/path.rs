//! Virtual path parsing and scheme matching.
//!
//! A virtual path is `<scheme>://<path-within-scheme>`, e.g.
//! `home:///Documents/a.txt`. Routing only ever looks at the scheme.

use serde::{Deserialize, Serialize};

/// Separator between scheme and path.
pub const SCHEME_SEPARATOR: &str = "://";

/// Split a virtual path into `(scheme, rest)`.
///
/// Returns `None` when the path has no `://`.
pub fn split_scheme(path: &str) -> Option<(&str, &str)> {
    path.split_once(SCHEME_SEPARATOR)
}

/// Path within the scheme, normalized to start with `/` and without a
/// trailing slash (except for the root itself).
///
/// `home:///docs/a.txt` -> `/docs/a.txt`, `home:///` -> `/`.
pub fn inner_path(path: &str) -> &str {
    let rest = split_scheme(path).map(|(_, rest)| rest).unwrap_or(path);
    let rest = rest.trim_end_matches('/');
    if rest.is_empty() { "/" } else { rest }
}

/// Parent of an inner path (`/a/b` -> `/a`, `/a` -> `/`).
pub fn parent(inner: &str) -> &str {
    match inner.trim_end_matches('/').rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &inner[..idx],
    }
}

/// Join a directory and a name with exactly one `/` between them.
pub fn join(dir: &str, name: &str) -> String {
    format!(
        "{}/{}",
        dir.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// Build a full virtual path from a scheme and an inner path.
pub fn virtual_path(scheme: &str, inner: &str) -> String {
    if inner.starts_with('/') {
        format!("{scheme}://{inner}")
    } else {
        format!("{scheme}:///{inner}")
    }
}

/// Derive the scheme of a runtime-added mount from its display name:
/// whitespace becomes `-`, everything is lowercased.
pub fn sanitize_scheme(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect::<String>()
        .to_lowercase()
}

/// Prefix rule routing virtual paths to a mountpoint.
///
/// Matches by exact scheme comparison, never by pattern, so scheme names
/// containing regex metacharacters cannot widen the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMatcher {
    schemes: Vec<String>,
}

impl PathMatcher {
    /// Match a single scheme (`home` matches `home://...`).
    pub fn scheme(scheme: impl Into<String>) -> Self {
        Self {
            schemes: vec![scheme.into()],
        }
    }

    /// Match any of several schemes.
    pub fn schemes<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemes: schemes.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a matcher from a prefix such as `home://` or a root such as
    /// `home:///`.
    pub fn from_prefix(prefix: &str) -> Self {
        let scheme = split_scheme(prefix).map(|(s, _)| s).unwrap_or(prefix);
        Self::scheme(scheme)
    }

    /// Schemes accepted by this matcher.
    pub fn accepted(&self) -> &[String] {
        &self.schemes
    }

    /// Test whether a virtual path belongs to this matcher.
    pub fn matches(&self, path: &str) -> bool {
        match split_scheme(path) {
            Some((scheme, _)) => self.schemes.iter().any(|s| s == scheme),
            None => false,
        }
    }
}
