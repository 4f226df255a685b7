//! Accessor name → document key conversion, and comment placement styles.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Turns a field name into the key written to the document.
pub trait NamingStrategy: Send + Sync + Debug {
    fn format(&self, name: &str) -> String;
}

/// Built-in naming strategies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum NameStyle {
    /// `maxPlayers`
    #[default]
    CamelCase,
    /// `max_players`
    SnakeCase,
    /// `max-players`
    KebabCase,
}

impl NamingStrategy for NameStyle {
    fn format(&self, name: &str) -> String {
        let words = words(name);
        match self {
            Self::CamelCase => {
                let mut out = String::with_capacity(name.len());
                for (index, word) in words.iter().enumerate() {
                    if index == 0 {
                        out.push_str(word);
                    } else {
                        capitalize_into(&mut out, word);
                    }
                }
                out
            },
            Self::SnakeCase => words.join("_"),
            Self::KebabCase => words.join("-"),
        }
    }
}

/// Where per-field comments are rendered.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum CommentStyle {
    /// `key: value # comment`
    Inline,
    /// `# comment` on the lines before the key.
    #[default]
    Above,
}

/// Lowercase words split on `_`, `-` and case boundaries (`HTTPServer` → `http`, `server`).
fn words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (index, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[index - 1];
            let next_is_lower = chars.get(index + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize_into(out: &mut String, word: &str) {
    let mut chars = word.chars();
    if let Some(first) = chars.next() {
        out.extend(first.to_uppercase());
        out.push_str(chars.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn camel_case_from_snake() {
        assert_eq!(NameStyle::CamelCase.format("max_players"), "maxPlayers");
        assert_eq!(NameStyle::CamelCase.format("port"), "port");
        assert_eq!(NameStyle::CamelCase.format("http_server_url"), "httpServerUrl");
    }

    #[test]
    fn snake_and_kebab() {
        assert_eq!(NameStyle::SnakeCase.format("maxPlayers"), "max_players");
        assert_eq!(NameStyle::KebabCase.format("max_players"), "max-players");
        assert_eq!(NameStyle::SnakeCase.format("HTTPServer"), "http_server");
    }

    #[test]
    fn styles_parse_case_insensitively() {
        assert_eq!("snake-case".parse::<NameStyle>().ok(), Some(NameStyle::SnakeCase));
        assert_eq!("Inline".parse::<CommentStyle>().ok(), Some(CommentStyle::Inline));
        assert_eq!(NameStyle::default().to_string(), "camel-case");
    }

    proptest! {
        #[test]
        fn styles_agree_on_words(parts in prop::collection::vec("[a-z][a-z0-9]{1,6}", 1..5)) {
            let snake = parts.join("_");
            let camel = NameStyle::CamelCase.format(&snake);
            prop_assert_eq!(NameStyle::SnakeCase.format(&camel), snake.clone());
            prop_assert_eq!(NameStyle::KebabCase.format(&camel), parts.join("-"));
            prop_assert_eq!(NameStyle::CamelCase.format(&camel), camel);
        }
    }
}
