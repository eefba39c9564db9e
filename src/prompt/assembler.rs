// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Prompt assembly: numbered body, optional glossary block,
//! and a base instruction that is either caller-supplied or a fixed default.

use super::mask::{MaskedText, mask_tags};

/// Default base instruction used when the caller supplies no custom prompt
///: fixes the numbered input/output format, bans commentary, and
/// requires `<…>` tokens to be copied verbatim. The default translation
/// target is Simplified Chinese.
pub const DEFAULT_BASE_INSTRUCTION: &str = "You are translating game text into Simplified \
Chinese. The input is a list of numbered lines in the form \"[n] text\". Reply with exactly \
one line per input line, in the form \"[n] translation\", preserving the original numbering \
exactly and adding no commentary, explanation, or extra lines. Any token of the form <…> must \
be copied into your translation unchanged, character for character.";

/// One glossary pair (`sourceText`, `targetText` in the wire DTO).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
}

/// The assembled prompt plus the per-source tag masks needed to unmask the
/// reply once translated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledPrompt {
    pub prompt: String,
    /// `masks[i]` is the mask for `sources[i]`, numbered `i + 1` in the body.
    pub masks: Vec<MaskedText>,
}

/// Builds the three-section prompt: base instruction, optional glossary,
/// numbered tag-masked body.
pub fn assemble_prompt(
    sources: &[String],
    custom_instruction: Option<&str>,
    glossary: &[GlossaryEntry],
) -> AssembledPrompt {
    let masks: Vec<MaskedText> = sources.iter().map(|s| mask_tags(s)).collect();

    let instruction = match custom_instruction {
        Some(custom) if !custom.trim().is_empty() => custom.to_string(),
        _ => DEFAULT_BASE_INSTRUCTION.to_string(),
    };

    let mut sections = vec![instruction];

    let glossary_lines: Vec<String> = glossary
        .iter()
        .filter(|entry| !entry.source.is_empty() && !entry.target.is_empty())
        .map(|entry| format!("{} → {}", entry.source, entry.target))
        .collect();
    if !glossary_lines.is_empty() {
        let mut block = String::from("Glossary (use these exact translations):\n");
        block.push_str(&glossary_lines.join("\n"));
        sections.push(block);
    }

    let mut body = String::from("Text to translate:\n");
    for (index, mask) in masks.iter().enumerate() {
        body.push_str(&format!("[{}] {}\n", index + 1, mask.masked));
    }
    sections.push(body.trim_end().to_string());

    AssembledPrompt { prompt: sections.join("\n\n"), masks }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_body_lines_from_one() {
        let sources = vec!["Hello".to_string(), "World".to_string()];
        let assembled = assemble_prompt(&sources, None, &[]);
        assert!(assembled.prompt.contains("[1] Hello"));
        assert!(assembled.prompt.contains("[2] World"));
        assert!(assembled.prompt.contains(DEFAULT_BASE_INSTRUCTION));
    }

    #[test]
    fn custom_instruction_replaces_default() {
        let sources = vec!["Hi".to_string()];
        let assembled = assemble_prompt(&sources, Some("Translate to French."), &[]);
        assert!(assembled.prompt.contains("Translate to French."));
        assert!(!assembled.prompt.contains(DEFAULT_BASE_INSTRUCTION));
    }

    #[test]
    fn blank_custom_instruction_falls_back_to_default() {
        let sources = vec!["Hi".to_string()];
        let assembled = assemble_prompt(&sources, Some("   "), &[]);
        assert!(assembled.prompt.contains(DEFAULT_BASE_INSTRUCTION));
    }

    #[test]
    fn glossary_block_omitted_when_empty() {
        let sources = vec!["Hi".to_string()];
        let assembled = assemble_prompt(&sources, None, &[]);
        assert!(!assembled.prompt.contains("Glossary"));
    }

    #[test]
    fn glossary_skips_entries_with_empty_fields() {
        let sources = vec!["Hi".to_string()];
        let glossary = vec![
            GlossaryEntry { source: "Sword".to_string(), target: "剑".to_string() },
            GlossaryEntry { source: String::new(), target: "x".to_string() },
        ];
        let assembled = assemble_prompt(&sources, None, &glossary);
        assert!(assembled.prompt.contains("Sword → 剑"));
        assert_eq!(assembled.prompt.matches('→').count(), 1);
    }

    #[test]
    fn masks_tags_in_body() {
        let sources = vec!["Hello <PLAYER>".to_string()];
        let assembled = assemble_prompt(&sources, None, &[]);
        assert!(assembled.prompt.contains("[1] Hello {{TAG_0}}"));
        assert_eq!(assembled.masks[0].placeholders, vec!["<PLAYER>".to_string()]);
    }
}
