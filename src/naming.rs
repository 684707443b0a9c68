//! Naming conventions mapping a member's declared name to its wire name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NamingConvention {
    /// The declared name, unchanged.
    Identity,
    /// `first_name` -> `firstName`
    CamelCase,
    /// `first_name` -> `FirstName`
    PascalCase,
    /// `FirstName` -> `first_name`
    SnakeCase,
    /// `first_name` -> `first-name`
    KebabCase,
    LowerCase,
    UpperCase,
}

impl NamingConvention {
    pub fn apply(self, name: &str) -> String {
        match self {
            NamingConvention::Identity => name.to_string(),
            NamingConvention::LowerCase => name.to_lowercase(),
            NamingConvention::UpperCase => name.to_uppercase(),
            NamingConvention::SnakeCase => join_lower(&split_words(name), "_"),
            NamingConvention::KebabCase => join_lower(&split_words(name), "-"),
            NamingConvention::PascalCase => {
                split_words(name).iter().map(|w| capitalize(w)).collect()
            }
            NamingConvention::CamelCase => {
                let words = split_words(name);
                let mut out = String::with_capacity(name.len());
                for (i, word) in words.iter().enumerate() {
                    if i == 0 {
                        out.push_str(&word.to_lowercase());
                    } else {
                        out.push_str(&capitalize(word));
                    }
                }
                out
            }
        }
    }
}

/// Splits on `_`, `-`, spaces and case boundaries. Acronyms stay together
/// (`HTTPServer` -> `HTTP`, `Server`) and digits attach to the preceding word.
fn split_words(name: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut start: Option<usize> = None;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if let Some(s) = start.take() {
                words.push(&name[s..pos]);
            }
            continue;
        }
        let Some(s) = start else {
            start = Some(pos);
            continue;
        };
        if c.is_uppercase() {
            let prev = chars[i - 1].1;
            let next_is_lower = chars.get(i + 1).is_some_and(|&(_, n)| n.is_lowercase());
            if prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower)
            {
                words.push(&name[s..pos]);
                start = Some(pos);
            }
        }
    }
    if let Some(s) = start {
        words.push(&name[s..]);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn join_lower(words: &[&str], separator: &str) -> String {
    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}
