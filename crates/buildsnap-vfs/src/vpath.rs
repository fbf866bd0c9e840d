//! Helpers for absolute virtual paths (`/`-separated, no drive letters).

/// Root of every store.
pub const ROOT: &str = "/";

/// Normalize `path` to an absolute form without `.`/`..` segments,
/// duplicate separators or a trailing separator.
///
/// Relative inputs are taken relative to `/`; `..` never climbs above it.
#[must_use]
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return ROOT.to_owned();
    }
    let mut out = String::with_capacity(path.len() + 1);
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Resolve `path` against `cwd` unless it is already absolute.
#[must_use]
pub fn resolve(cwd: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize(path)
    } else {
        normalize(&format!("{cwd}/{path}"))
    }
}

/// Parent directory of a normalized path; `None` for the root.
#[must_use]
pub fn parent(path: &str) -> Option<&str> {
    if path == ROOT {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some(ROOT),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Every proper ancestor of a normalized path, outermost first, excluding
/// the root.
#[must_use]
pub fn ancestors(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut current = parent(path);
    while let Some(dir) = current {
        if dir == ROOT {
            break;
        }
        out.push(dir);
        current = parent(dir);
    }
    out.reverse();
    out
}

/// Prefix shared by every direct or indirect child of `dir`.
#[must_use]
pub fn child_prefix(dir: &str) -> String {
    if dir == ROOT {
        ROOT.to_owned()
    } else {
        format!("{dir}/")
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/a//b/./c/"), "/a/b/c");
        assert_eq!(normalize("/a/b/../c"), "/a/c");
        assert_eq!(normalize("/../.."), "/");
        assert_eq!(normalize("src/a.ts"), "/src/a.ts");
    }

    #[test]
    fn test_resolve_relative_against_cwd() {
        assert_eq!(
            resolve("/home/src/workspaces/project", "src/a.ts"),
            "/home/src/workspaces/project/src/a.ts"
        );
        assert_eq!(resolve("/cwd", "/abs/x.ts"), "/abs/x.ts");
        assert_eq!(resolve("/cwd/sub", "../x.ts"), "/cwd/x.ts");
    }

    #[test]
    fn test_parent_and_ancestors() {
        assert_eq!(parent("/"), None);
        assert_eq!(parent("/a"), Some("/"));
        assert_eq!(parent("/a/b/c.ts"), Some("/a/b"));
        assert_eq!(ancestors("/a/b/c.ts"), vec!["/a", "/a/b"]);
        assert!(ancestors("/a").is_empty());
    }

    #[test]
    fn test_child_prefix() {
        assert_eq!(child_prefix("/"), "/");
        assert_eq!(child_prefix("/src"), "/src/");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_canonical(
            segments in proptest::collection::vec("([a-z]{1,3}|\\.|\\.\\.)?", 0..8)
        ) {
            let raw = segments.join("/");
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone(), "case=idempotent raw={}", raw);
            prop_assert!(once.starts_with('/'), "case=absolute raw={}", raw);
            prop_assert!(!once.contains("//"), "case=empty_segment raw={}", raw);
            prop_assert!(once == ROOT || !once.ends_with('/'), "case=trailing raw={}", raw);
            prop_assert!(
                !once.split('/').any(|s| s == "." || s == ".."),
                "case=dot_segment raw={}",
                raw
            );
            for dir in ancestors(&once) {
                prop_assert!(once.starts_with(&child_prefix(dir)), "case=ancestor dir={}", dir);
            }
        }

        #[test]
        fn prop_absolute_paths_ignore_cwd(
            cwd in "(/[a-z]{1,3}){0,3}",
            segments in proptest::collection::vec("[a-z]{1,3}|\\.\\.", 1..6)
        ) {
            let path = format!("/{}", segments.join("/"));
            prop_assert_eq!(resolve(&cwd, &path), normalize(&path), "case=absolute cwd={}", cwd);
        }
    }
}
