//! Dotted document paths (`server.limits.players`). The root is the empty path.

pub const SEPARATOR: char = '.';

/// Appends `key` to `base`.
#[must_use]
pub fn join(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_owned()
    } else {
        let mut path = String::with_capacity(base.len() + key.len() + 1);
        path.push_str(base);
        path.push(SEPARATOR);
        path.push_str(key);
        path
    }
}

pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(SEPARATOR).filter(|segment| !segment.is_empty())
}

/// `true` when `path` equals `ancestor` or lies below it.
#[must_use]
pub fn is_within(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path[ancestor.len()..].starts_with(SEPARATOR))
}

/// A usable path has no empty segments and no leading or trailing separator.
#[must_use]
pub fn is_valid(path: &str) -> bool {
    !path.is_empty() && path.split(SEPARATOR).all(|segment| !segment.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn join_skips_separator_at_root() {
        assert_eq!(join("", "port"), "port");
        assert_eq!(join("server", "port"), "server.port");
    }

    #[test]
    fn ancestry_respects_segment_boundaries() {
        assert!(is_within("server.port", "server"));
        assert!(is_within("server", "server"));
        assert!(is_within("anything", ""));
        assert!(!is_within("serverless", "server"));
        assert!(!is_within("server", "server.port"));
    }

    #[test]
    fn validity() {
        assert!(is_valid("a.b.c"));
        assert!(!is_valid(""));
        assert!(!is_valid("a..b"));
        assert!(!is_valid(".a"));
        assert!(!is_valid("a."));
    }

    proptest! {
        #[test]
        fn joined_segments_split_back(parts in prop::collection::vec("[a-zA-Z0-9_-]{1,8}", 1..6)) {
            let path = parts.iter().fold(String::new(), |acc, part| join(&acc, part));
            prop_assert!(is_valid(&path));
            prop_assert_eq!(segments(&path).collect::<Vec<_>>(), parts.iter().map(String::as_str).collect::<Vec<_>>());
            for depth in 1..=parts.len() {
                let ancestor = parts[..depth].join(".");
                prop_assert!(is_within(&path, &ancestor));
            }
        }
    }
}
