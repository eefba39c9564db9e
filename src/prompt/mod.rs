//! Prompt assembler and reply parser: builds the numbered,
//! tag-masked translation prompt and parses the model's numbered reply back
//! into a translation map.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod assembler;
pub mod mask;
pub mod reply;

pub use assembler::{AssembledPrompt, GlossaryEntry, assemble_prompt};
pub use reply::parse_reply;
