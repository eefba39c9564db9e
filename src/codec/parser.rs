// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Parse side of the binary codec.

use tracing::warn;
use zerocopy::TryFromBytes as _;

use super::{
    StringRecord,
    header::{GROUP_HEADER_LEN, GRUP_TAG, GroupHeader, RECORD_HEADER_LEN, RecordHeader, SUBRECORD_HEADER_LEN, SubrecordHeader},
    tags::{build_record_id, is_translatable},
    text::decode_text,
    zlib::inflate_payload,
};

/// Groups nested deeper than this are treated as malformed input; parsing
/// halts rather than recursing further.
const MAX_GROUP_DEPTH: usize = 64;

/// Walks `bytes` and returns every translatable string found.
///
/// Never panics or raises on malformed input: truncation, an
/// oversized declared length, or a zlib failure logs a warning and either
/// skips the offending record or halts the enclosing sibling sequence,
/// always returning whatever was extracted so far.
pub fn parse_esm(bytes: &[u8]) -> Vec<StringRecord> {
    let mut out = Vec::new();

    if bytes.len() < RECORD_HEADER_LEN {
        warn!("input shorter than one record header; nothing to parse");
        return out;
    }
    let Ok(header) = RecordHeader::try_ref_from_bytes(&bytes[0..RECORD_HEADER_LEN]) else {
        warn!("file header bytes do not form a valid record header");
        return out;
    };
    let header_end = RECORD_HEADER_LEN + header.data_size.get() as usize;
    if header_end > bytes.len() {
        warn!("file header declares a payload larger than the file");
        return out;
    }

    parse_region(bytes, header_end, bytes.len(), &mut out, 0);
    out
}

fn parse_region(bytes: &[u8], start: usize, end: usize, out: &mut Vec<StringRecord>, depth: usize) {
    if depth > MAX_GROUP_DEPTH {
        warn!("group nesting exceeds {MAX_GROUP_DEPTH}; halting this branch");
        return;
    }

    let mut offset = start;
    while offset < end {
        if offset + 4 > bytes.len() {
            warn!(offset, "truncated tag; halting sibling sequence");
            return;
        }
        let tag: [u8; 4] = bytes[offset..offset + 4].try_into().expect("slice of len 4");

        if tag == GRUP_TAG {
            if offset + GROUP_HEADER_LEN > bytes.len() || offset + GROUP_HEADER_LEN > end {
                warn!(offset, "truncated group header; halting sibling sequence");
                return;
            }
            let Ok(group_header) =
                GroupHeader::try_ref_from_bytes(&bytes[offset..offset + GROUP_HEADER_LEN])
            else {
                warn!(offset, "malformed group header; halting sibling sequence");
                return;
            };
            let group_size = group_header.group_size.get() as usize;
            if group_size < GROUP_HEADER_LEN || offset + group_size > bytes.len() || offset + group_size > end
            {
                warn!(offset, group_size, "group_size out of bounds; halting sibling sequence");
                return;
            }
            parse_region(bytes, offset + GROUP_HEADER_LEN, offset + group_size, out, depth + 1);
            offset += group_size;
        } else {
            if offset + RECORD_HEADER_LEN > bytes.len() || offset + RECORD_HEADER_LEN > end {
                warn!(offset, "truncated record header; halting sibling sequence");
                return;
            }
            let Ok(record_header) =
                RecordHeader::try_ref_from_bytes(&bytes[offset..offset + RECORD_HEADER_LEN])
            else {
                warn!(offset, "malformed record header; halting sibling sequence");
                return;
            };
            let data_size = record_header.data_size.get() as usize;
            let payload_start = offset + RECORD_HEADER_LEN;
            let payload_end = payload_start + data_size;
            if payload_end > bytes.len() || payload_end > end {
                warn!(offset, data_size, "record payload exceeds remaining bytes; halting sibling sequence");
                return;
            }

            let record_tag = record_header.tag;
            let form_id = record_header.form_id.get();
            let raw_payload = &bytes[payload_start..payload_end];

            if record_header.is_compressed() {
                match inflate_payload(raw_payload) {
                    Ok(inflated) => parse_subrecords(&inflated, record_tag, form_id, out),
                    Err(e) => warn!(offset, error = %e, "zlib inflate failed; skipping record"),
                }
            } else {
                parse_subrecords(raw_payload, record_tag, form_id, out);
            }

            offset = payload_end;
        }
    }
}

fn parse_subrecords(payload: &[u8], record_tag: [u8; 4], form_id: u32, out: &mut Vec<StringRecord>) {
    let mut offset = 0;
    while offset < payload.len() {
        if offset + SUBRECORD_HEADER_LEN > payload.len() {
            warn!("truncated subrecord header; skipping remainder of record");
            return;
        }
        let Ok(sub_header) =
            SubrecordHeader::try_ref_from_bytes(&payload[offset..offset + SUBRECORD_HEADER_LEN])
        else {
            warn!("malformed subrecord header; skipping remainder of record");
            return;
        };
        let size = sub_header.size.get() as usize;
        let sub_tag = sub_header.tag;
        let data_start = offset + SUBRECORD_HEADER_LEN;
        let data_end = data_start + size;
        if data_end > payload.len() {
            warn!("subrecord payload exceeds record bounds; skipping remainder of record");
            return;
        }

        if is_translatable(record_tag, sub_tag)
            && let Some(text) = decode_text(&payload[data_start..data_end])
        {
            out.push(StringRecord {
                record_id: build_record_id(record_tag, form_id, sub_tag),
                text,
            });
        }

        offset = data_end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_header(tag: &[u8; 4], data_size: u32, flags: u32, form_id: u32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_HEADER_LEN);
        bytes.extend_from_slice(tag);
        bytes.extend_from_slice(&data_size.to_le_bytes());
        bytes.extend_from_slice(&flags.to_le_bytes());
        bytes.extend_from_slice(&form_id.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // revision
        bytes.extend_from_slice(&0u16.to_le_bytes()); // version
        bytes.extend_from_slice(&0u16.to_le_bytes()); // unknown
        bytes
    }

    fn subrecord(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SUBRECORD_HEADER_LEN + payload.len());
        bytes.extend_from_slice(tag);
        bytes.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    fn group_header(label: &[u8; 4], group_size: u32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(GROUP_HEADER_LEN);
        bytes.extend_from_slice(b"GRUP");
        bytes.extend_from_slice(&group_size.to_le_bytes());
        bytes.extend_from_slice(label);
        bytes.extend_from_slice(&0u32.to_le_bytes()); // group_type
        bytes.extend_from_slice(&0u32.to_le_bytes()); // stamp
        bytes.extend_from_slice(&0u32.to_le_bytes()); // unknown
        bytes
    }

    /// A header record + GRUP("WEAP") containing one WEAP record with a
    /// FULL subrecord yields exactly one StringRecord.
    #[test]
    fn parses_single_record_group_into_one_string_record() {
        let weap_sub = subrecord(b"FULL", b"Iron Sword\0");
        let weap_record_payload = weap_sub.clone();
        let weap_record = {
            let mut r = record_header(b"WEAP", weap_record_payload.len() as u32, 0, 0x0000_0100);
            r.extend_from_slice(&weap_record_payload);
            r
        };
        let group_size = (GROUP_HEADER_LEN + weap_record.len()) as u32;
        let mut group = group_header(b"WEAP", group_size);
        group.extend_from_slice(&weap_record);

        let mut file = record_header(b"TES4", 0, 0, 0);
        file.extend_from_slice(&group);

        let records = parse_esm(&file);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, "WEAP:00000100:FULL");
        assert_eq!(records[0].text, "Iron Sword");
    }

    /// BOOK/CNAM is extracted; WEAP/CNAM is not, since CNAM is only
    /// translatable under the BOOK record tag.
    #[test]
    fn pair_tag_only_extracted_under_its_record_tag() {
        let book_sub = subrecord(b"CNAM", b"Chapter 1\0");
        let book_record = {
            let mut r = record_header(b"BOOK", book_sub.len() as u32, 0, 0x0000_0200);
            r.extend_from_slice(&book_sub);
            r
        };
        let weap_sub = subrecord(b"CNAM", b"not translatable here\0");
        let weap_record = {
            let mut r = record_header(b"WEAP", weap_sub.len() as u32, 0, 0x0000_0300);
            r.extend_from_slice(&weap_sub);
            r
        };

        let mut file = record_header(b"TES4", 0, 0, 0);
        file.extend_from_slice(&book_record);
        file.extend_from_slice(&weap_record);

        let records = parse_esm(&file);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].record_id, "BOOK:00000200:CNAM");
    }

    #[test]
    fn truncated_file_returns_partial_result_without_panicking() {
        let records = parse_esm(&[0u8; 4]);
        assert!(records.is_empty());
    }
}
