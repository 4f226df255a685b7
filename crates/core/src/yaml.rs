//! YAML text <-> [`Node`] conversion and comment placement.

use crate::naming::CommentStyle;
use crate::node::{Node, NodeMap, Scalar};
use crate::path;
use fxhash::FxHashMap;
use serde::de::Error as _;
use serde_yaml::Value as Yaml;

/// Parses document text. Blank or comment-only text is an empty mapping.
pub(crate) fn parse(text: &str) -> Result<Node, serde_yaml::Error> {
    let has_content = text.lines().any(|line| {
        let line = line.trim();
        !line.is_empty() && !line.starts_with('#')
    });
    if !has_content {
        return Ok(Node::empty_mapping());
    }

    match serde_yaml::from_str::<Yaml>(text)? {
        Yaml::Null => Ok(Node::empty_mapping()),
        root @ Yaml::Mapping(_) => Ok(from_yaml(root)),
        other => Err(serde_yaml::Error::custom(format!(
            "document root must be a mapping, found {}",
            from_yaml(other).shape()
        ))),
    }
}

fn from_yaml(value: Yaml) -> Node {
    match value {
        Yaml::Null => Node::Null,
        Yaml::Bool(value) => Node::Scalar(Scalar::Bool(value)),
        Yaml::Number(number) => Node::Scalar(number.as_i64().map_or_else(
            || match number.as_u64() {
                Some(big) => Scalar::Str(big.to_string()),
                None => Scalar::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            Scalar::Int,
        )),
        Yaml::String(value) => Node::Scalar(Scalar::Str(value)),
        Yaml::Sequence(items) => Node::Sequence(items.into_iter().map(from_yaml).collect()),
        Yaml::Mapping(map) => {
            Node::Mapping(map.into_iter().map(|(k, v)| (key_string(k), from_yaml(v))).collect())
        },
        Yaml::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn key_string(key: Yaml) -> String {
    match key {
        Yaml::String(key) => key,
        Yaml::Bool(key) => key.to_string(),
        Yaml::Number(key) => key.to_string(),
        Yaml::Null => "null".to_owned(),
        Yaml::Tagged(tagged) => key_string(tagged.value),
        other => serde_yaml::to_string(&other).map(|s| s.trim().to_owned()).unwrap_or_default(),
    }
}

fn to_yaml(node: &Node) -> Yaml {
    match node {
        Node::Null => Yaml::Null,
        Node::Scalar(Scalar::Bool(value)) => Yaml::Bool(*value),
        Node::Scalar(Scalar::Int(value)) => Yaml::Number((*value).into()),
        Node::Scalar(Scalar::Float(value)) => Yaml::Number((*value).into()),
        Node::Scalar(Scalar::Str(value)) => Yaml::String(value.clone()),
        Node::Sequence(items) => Yaml::Sequence(items.iter().map(to_yaml).collect()),
        Node::Mapping(map) => Yaml::Mapping(mapping(map)),
    }
}

fn mapping(map: &NodeMap) -> serde_yaml::Mapping {
    map.iter().map(|(key, node)| (Yaml::String(key.to_owned()), to_yaml(node))).collect()
}

/// What [`render`] decorates the body with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Decorations<'a> {
    pub(crate) header: &'a [String],
    pub(crate) comments: &'a FxHashMap<String, String>,
    pub(crate) style: CommentStyle,
}

/// Renders `root` with the header on top and field comments next to their keys.
pub(crate) fn render(root: &Node, decorations: Decorations<'_>) -> Result<String, serde_yaml::Error> {
    let mut out = String::new();
    for line in decorations.header.iter().flat_map(|h| h.lines()) {
        push_comment(&mut out, 0, line);
    }

    let empty = root.as_mapping().is_none_or(NodeMap::is_empty);
    if empty {
        return Ok(out);
    }
    if !out.is_empty() {
        out.push('\n');
    }

    let body = serde_yaml::to_string(&to_yaml(root))?;
    if decorations.comments.is_empty() {
        out.push_str(&body);
        return Ok(out);
    }
    annotate(&body, decorations, &mut out);
    Ok(out)
}

fn push_comment(out: &mut String, indent: usize, line: &str) {
    out.extend(std::iter::repeat_n(' ', indent));
    if line.is_empty() {
        out.push('#');
    } else {
        out.push_str("# ");
        out.push_str(line);
    }
    out.push('\n');
}

fn annotate(body: &str, decorations: Decorations<'_>, out: &mut String) {
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut opaque_below: Option<usize> = None;

    for line in body.lines() {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();
        let is_item = trimmed == "-" || trimmed.starts_with("- ");

        if let Some(level) = opaque_below {
            if indent > level || (indent == level && is_item) {
                out.push_str(line);
                out.push('\n');
                continue;
            }
            opaque_below = None;
        }

        if is_item {
            opaque_below = Some(indent);
            out.push_str(line);
            out.push('\n');
            continue;
        }

        let Some((key, rest)) = split_key(trimmed) else {
            out.push_str(line);
            out.push('\n');
            continue;
        };

        while stack.last().is_some_and(|(level, _)| *level >= indent) {
            stack.pop();
        }
        stack.push((indent, key));
        if !rest.trim().is_empty() {
            opaque_below = Some(indent);
        }

        let full = stack.iter().fold(String::new(), |acc, (_, key)| path::join(&acc, key));
        match decorations.comments.get(&full) {
            Some(comment) => match decorations.style {
                CommentStyle::Above => {
                    for comment_line in comment.lines() {
                        push_comment(out, indent, comment_line);
                    }
                    out.push_str(line);
                },
                CommentStyle::Inline => {
                    out.push_str(line);
                    out.push_str(" # ");
                    out.push_str(&comment.replace(['\r', '\n'], " "));
                },
            },
            None => out.push_str(line),
        }
        out.push('\n');
    }
}

/// Splits `key: rest` into the unquoted key and whatever follows the colon.
fn split_key(line: &str) -> Option<(String, &str)> {
    let (key, after) = match line.chars().next()? {
        '\'' => {
            let mut key = String::new();
            let mut chars = line.char_indices().skip(1).peekable();
            loop {
                let (index, c) = chars.next()?;
                if c == '\'' {
                    if chars.peek().is_some_and(|(_, next)| *next == '\'') {
                        chars.next();
                        key.push('\'');
                        continue;
                    }
                    break (key, &line[index + 1..]);
                }
                key.push(c);
            }
        },
        '"' => {
            let mut key = String::new();
            let mut chars = line.char_indices().skip(1);
            loop {
                let (index, c) = chars.next()?;
                match c {
                    '\\' => key.push(chars.next()?.1),
                    '"' => break (key, &line[index + 1..]),
                    other => key.push(other),
                }
            }
        },
        _ => {
            let end = line.find(": ").or_else(|| line.strip_suffix(':').map(str::len))?;
            (line[..end].to_owned(), &line[end..])
        },
    };
    let rest = after.strip_prefix(':')?;
    Some((key, rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_with(root: &Node, comments: &[(&str, &str)], style: CommentStyle) -> String {
        let comments = comments.iter().map(|(p, c)| ((*p).to_owned(), (*c).to_owned())).collect();
        render(root, Decorations { header: &[], comments: &comments, style }).unwrap()
    }

    #[test]
    fn empty_text_is_empty_mapping() {
        assert_eq!(parse("").unwrap(), Node::empty_mapping());
        assert_eq!(parse("# only a header\n\n").unwrap(), Node::empty_mapping());
    }

    #[test]
    fn non_mapping_root_is_rejected() {
        assert!(parse("- a\n- b\n").is_err());
        assert!(parse("just text").is_err());
    }

    #[test]
    fn numeric_keys_are_strings() {
        let root = parse("items:\n  0: a\n  1: b\n").unwrap();
        assert_eq!(root.lookup("items.1"), Some(&Node::Scalar(Scalar::Str("b".into()))));
    }

    #[test]
    fn scalars_keep_their_kind() {
        let root = parse("a: 1\nb: 1.5\nc: true\nd: '1'\n").unwrap();
        assert_eq!(root.lookup("a"), Some(&Node::Scalar(Scalar::Int(1))));
        assert_eq!(root.lookup("b"), Some(&Node::Scalar(Scalar::Float(1.5))));
        assert_eq!(root.lookup("c"), Some(&Node::Scalar(Scalar::Bool(true))));
        assert_eq!(root.lookup("d"), Some(&Node::Scalar(Scalar::Str("1".into()))));
    }

    #[test]
    fn render_parses_back() {
        let mut root = Node::empty_mapping();
        root.insert_at("server.port", Node::Scalar(Scalar::Int(8080)));
        root.insert_at("server.motd", Node::Scalar(Scalar::Str("two\nlines".into())));
        root.insert_at("list.0", Node::Scalar(Scalar::Str("x".into())));

        let text = render_with(&root, &[], CommentStyle::Above);
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn empty_root_renders_only_header() {
        let header = vec!["Settings".to_owned()];
        let text = render(
            &Node::empty_mapping(),
            Decorations { header: &header, comments: &FxHashMap::default(), style: CommentStyle::Above },
        )
        .unwrap();
        assert_eq!(text, "# Settings\n");
    }

    #[test]
    fn comments_above_nested_keys() {
        let mut root = Node::empty_mapping();
        root.insert_at("server.port", Node::Scalar(Scalar::Int(8080)));
        root.insert_at("port", Node::Scalar(Scalar::Int(1)));

        let text = render_with(&root, &[("server.port", "Listen port")], CommentStyle::Above);
        assert_eq!(text, "server:\n  # Listen port\n  port: 8080\nport: 1\n");
    }

    #[test]
    fn inline_comments_flatten_newlines() {
        let mut root = Node::empty_mapping();
        root.insert_at("name", Node::Scalar(Scalar::Str("bindery".into())));

        let text = render_with(&root, &[("name", "first\nsecond")], CommentStyle::Inline);
        assert_eq!(text, "name: bindery # first second\n");
    }

    #[test]
    fn quoted_keys_match_their_paths() {
        let mut root = Node::empty_mapping();
        root.insert_at("items.0", Node::Scalar(Scalar::Int(4)));

        let text = render_with(&root, &[("items.0", "first")], CommentStyle::Above);
        assert!(text.contains("# first\n"), "{text}");
        assert_eq!(parse(&text).unwrap(), root);
    }

    #[test]
    fn split_key_handles_quotes() {
        assert_eq!(split_key("'it''s': 1"), Some(("it's".to_owned(), " 1")));
        assert_eq!(split_key("\"a\\\"b\":"), Some(("a\"b".to_owned(), "")));
        assert_eq!(split_key("plain: value"), Some(("plain".to_owned(), " value")));
        assert_eq!(split_key("section:"), Some(("section".to_owned(), "")));
        assert_eq!(split_key("no colon"), None);
    }
}
