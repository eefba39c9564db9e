// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Tag masking: `<…>` substrings must survive a translation
//! round-trip untouched, so they are swapped out for `{{TAG_n}}` placeholders
//! before a string ever reaches the model and restored afterward.

/// A source string with every `<…>` substring replaced by an indexed
/// placeholder, plus the mapping needed to restore them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedText {
    pub masked: String,
    /// `placeholders[n]` is the original `<…>` text for `{{TAG_n}}`.
    pub placeholders: Vec<String>,
}

/// Masks every `<…>` substring in `source`, left to right.
pub fn mask_tags(source: &str) -> MaskedText {
    let mut placeholders = Vec::new();
    let mut masked = String::with_capacity(source.len());
    let mut rest = source;

    loop {
        let Some(start) = rest.find('<') else {
            masked.push_str(rest);
            break;
        };
        let Some(end_rel) = rest[start..].find('>') else {
            masked.push_str(rest);
            break;
        };
        let end = start + end_rel + 1;

        masked.push_str(&rest[..start]);
        placeholders.push(rest[start..end].to_string());
        masked.push_str(&format!("{{{{TAG_{}}}}}", placeholders.len() - 1));

        rest = &rest[end..];
    }

    MaskedText { masked, placeholders }
}

/// Restores every `{{TAG_n}}` placeholder in `text` to its original `<…>`.
pub fn unmask_tags(text: &str, placeholders: &[String]) -> String {
    let mut out = text.to_string();
    for (index, tag) in placeholders.iter().enumerate() {
        out = out.replace(&format!("{{{{TAG_{index}}}}}"), tag);
    }
    out
}
