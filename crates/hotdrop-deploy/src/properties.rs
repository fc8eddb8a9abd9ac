//! Reader for Java `.properties` files.
//!
//! Handles `#`/`!` comments, `=`, `:` and whitespace separators, and
//! backslash line continuations. Unicode escapes are kept verbatim.

use std::collections::HashMap;

/// Parsed key/value pairs. Later keys override earlier ones.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    /// Parse properties text.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        let mut logical = String::new();

        for raw in text.lines() {
            let line = raw.trim_start();
            let is_comment = line.is_empty() || line.starts_with('#') || line.starts_with('!');
            if logical.is_empty() && is_comment {
                continue;
            }

            if ends_with_continuation(line) {
                logical.push_str(&line[..line.len() - 1]);
                continue;
            }
            logical.push_str(line);

            let (key, value) = split_entry(&logical);
            entries.insert(unescape(key), unescape(value));
            logical.clear();
        }

        if !logical.is_empty() {
            let (key, value) = split_entry(&logical);
            entries.insert(unescape(key), unescape(value));
        }

        Self { entries }
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Comma-separated list value, trimmed, with empty items removed.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Odd number of trailing backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

/// Split at the first unescaped separator.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (line[..i].trim_end(), line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => out.push_str("\\u"),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
