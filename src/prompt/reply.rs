// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Reply parser: recovers the numbered translations from a
//! model reply, falling back to the source text for any number that never
//! showed up.

use std::collections::HashMap;

use tracing::warn;

/// Parses `reply` into `n → joined, trimmed translation` for every `[n] …`
/// block found. Lines without a `[n]` prefix extend whichever block most
/// recently started; lines before any block starts are dropped.
fn parse_numbered_blocks(reply: &str) -> HashMap<usize, String> {
    let mut blocks: HashMap<usize, Vec<&str>> = HashMap::new();
    let mut current: Option<usize> = None;

    for line in reply.lines() {
        match parse_line_prefix(line) {
            Some((n, rest)) => {
                blocks.entry(n).or_default().push(rest);
                current = Some(n);
            },
            None => {
                if let Some(n) = current {
                    blocks.entry(n).or_default().push(line);
                }
            },
        }
    }

    blocks
        .into_iter()
        .map(|(n, lines)| (n, lines.join("\n").trim().to_string()))
        .collect()
}

fn parse_line_prefix(line: &str) -> Option<(usize, &str)> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix('[')?;
    let close = rest.find(']')?;
    let n: usize = rest[..close].trim().parse().ok()?;
    Some((n, rest[close + 1..].trim_start()))
}

/// Parses a model reply against the original (masked) `sources`, by 1-based
/// position. Returns `index (0-based) → final text`: the parsed translation
/// when present and non-empty, otherwise the original source text — no key
/// is ever lost.
pub fn parse_reply(reply: &str, sources: &[String]) -> HashMap<usize, String> {
    let blocks = parse_numbered_blocks(reply);
    let mut out = HashMap::with_capacity(sources.len());

    for (index, source) in sources.iter().enumerate() {
        let n = index + 1;
        match blocks.get(&n).filter(|text| !text.is_empty()) {
            Some(text) => {
                out.insert(index, text.clone());
            },
            None => {
                warn!(n, "missing translation number in reply; falling back to source text");
                out.insert(index, source.clone());
            },
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An echoing model yields source text back unchanged.
    #[test]
    fn echo_reply_round_trips_all_sources() {
        let sources = vec!["Hello".to_string(), "World".to_string(), "Again".to_string()];
        let reply = "[1] Hello\n[2] World\n[3] Again";
        let parsed = parse_reply(reply, &sources);
        assert_eq!(parsed.get(&0), Some(&"Hello".to_string()));
        assert_eq!(parsed.get(&1), Some(&"World".to_string()));
        assert_eq!(parsed.get(&2), Some(&"Again".to_string()));
    }

    /// A missing number falls back to the source text, so no key is lost.
    #[test]
    fn missing_number_falls_back_to_source() {
        let sources = vec!["Hello".to_string(), "World".to_string()];
        let reply = "[1] 你好";
        let parsed = parse_reply(reply, &sources);
        assert_eq!(parsed.get(&0), Some(&"你好".to_string()));
        assert_eq!(parsed.get(&1), Some(&"World".to_string()));
    }

    #[test]
    fn continuation_lines_join_with_newline() {
        let sources = vec!["Multi\nline".to_string()];
        let reply = "[1] First line\nSecond line";
        let parsed = parse_reply(reply, &sources);
        assert_eq!(parsed.get(&0), Some(&"First line\nSecond line".to_string()));
    }

    #[test]
    fn out_of_order_numbers_still_resolve() {
        let sources = vec!["A".to_string(), "B".to_string()];
        let reply = "[2] 乙\n[1] 甲";
        let parsed = parse_reply(reply, &sources);
        assert_eq!(parsed.get(&0), Some(&"甲".to_string()));
        assert_eq!(parsed.get(&1), Some(&"乙".to_string()));
    }
}
