//! Binary codec for the ESM-family plugin container: parses the
//! record/group tree into translatable [`StringRecord`]s and rewrites it
//! with substituted payloads, preserving every other byte.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod header;
pub mod parser;
pub mod tags;
pub mod text;
pub mod writer;
mod zlib;

use serde::{Deserialize, Serialize};

/// One extracted translatable unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringRecord {
    /// `"<rec_type>:<form_id_hex8>:<sub_type>"`.
    pub record_id: String,
    /// UTF-8 decoded payload, null-terminator stripped.
    pub text: String,
}

pub use parser::parse_esm;
pub use writer::rewrite_esm;
