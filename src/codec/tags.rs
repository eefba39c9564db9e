// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Tag membership tables and `record_id` codec.
//!
//! Tags are always compared as raw 4-byte arrays — the format does not
//! guarantee NUL-termination or ASCII padding beyond what each tag defines
//! verbatim, so no string conversion happens until a `record_id` is built.

/// Subrecord tags translatable under any record tag.
pub const UNIVERSAL_TAGS: [[u8; 4]; 5] =
    [*b"FULL", *b"DESC", *b"NNAM", *b"SHRT", *b"RNAM"];

/// `(record_tag, subrecord_tag)` pairs translatable in addition to
/// [`UNIVERSAL_TAGS`]. Bit-exact
pub const PAIR_TAGS: [([u8; 4], [u8; 4]); 13] = [
    (*b"INFO", *b"NAM1"),
    (*b"QUST", *b"CNAM"),
    (*b"QUST", *b"NAM2"),
    (*b"TMLM", *b"ITXT"),
    (*b"TMLM", *b"BTXT"),
    (*b"TMLM", *b"UNAM"),
    (*b"NPC_", *b"LNAM"),
    (*b"REFR", *b"UNAM"),
    (*b"NPC_", *b"ATTX"),
    (*b"MESG", *b"ITXT"),
    (*b"PERK", *b"EPF2"),
    (*b"BOOK", *b"CNAM"),
    (*b"MGEF", *b"DNAM"),
];

/// Returns true iff `(record_tag, subrecord_tag)` is translatable.
pub fn is_translatable(record_tag: [u8; 4], subrecord_tag: [u8; 4]) -> bool {
    UNIVERSAL_TAGS.contains(&subrecord_tag)
        || PAIR_TAGS.contains(&(record_tag, subrecord_tag))
}

/// Builds the stable composite identifier `"<rec_type>:<form_id_hex8>:<sub_type>"`.
///
/// Tags that contain non-ASCII bytes are lossily rendered via
/// [`String::from_utf8_lossy`] — such input is already outside the format's
/// contract, but building an id must never panic.
pub fn build_record_id(record_tag: [u8; 4], form_id: u32, subrecord_tag: [u8; 4]) -> String {
    format!(
        "{}:{:08X}:{}",
        String::from_utf8_lossy(&record_tag),
        form_id,
        String::from_utf8_lossy(&subrecord_tag)
    )
}

/// Splits a `record_id` back into `(rec_type, form_id_hex8, sub_type)`.
///
/// split-from-left-once for `rec_type`, split-from-right-once
/// for `sub_type`, so an underscore-terminated tag like `NPC_` round-trips.
pub fn split_record_id(record_id: &str) -> Option<(&str, &str, &str)> {
    let (rec_type, rest) = record_id.split_once(':')?;
    let (form_id, sub_type) = rest.rsplit_once(':')?;
    Some((rec_type, form_id, sub_type))
}
