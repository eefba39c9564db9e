// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Rewrite side of the binary codec: structurally isomorphic to
//! the parser, but emits bytes bottom-up so every enclosing size field can
//! be recomputed once its contents are known.

use std::collections::HashMap;

use tracing::warn;
use zerocopy::{IntoBytes as _, TryFromBytes as _, little_endian::U16};

use super::{
    header::{
        COMPRESSED_FLAG, GROUP_HEADER_LEN, GRUP_TAG, GroupHeader, RECORD_HEADER_LEN, RecordHeader,
        SUBRECORD_HEADER_LEN, SubrecordHeader,
    },
    tags::{build_record_id, is_translatable},
    zlib::{deflate_payload, inflate_payload},
};
use crate::error::EngineError;

/// Rewrites `bytes`, substituting translations keyed by `record_id`.
///
/// With an empty `translations` map this is byte-identical to `bytes`:
/// every byte this function doesn't explicitly recompute is copied straight
/// through from the source.
pub fn rewrite_esm(
    bytes: &[u8],
    translations: &HashMap<String, String>,
) -> Result<Vec<u8>, EngineError> {
    if bytes.len() < RECORD_HEADER_LEN {
        return Ok(bytes.to_vec());
    }
    let Ok(header) = RecordHeader::try_ref_from_bytes(&bytes[0..RECORD_HEADER_LEN]) else {
        return Ok(bytes.to_vec());
    };
    let header_end = RECORD_HEADER_LEN + header.data_size.get() as usize;
    if header_end > bytes.len() {
        return Ok(bytes.to_vec());
    }

    let mut out = Vec::with_capacity(bytes.len());
    // The file header record and its subrecords are never rewritten.
    out.extend_from_slice(&bytes[0..header_end]);
    out.extend(rewrite_region(bytes, header_end, bytes.len(), translations)?);
    Ok(out)
}

fn rewrite_region(
    bytes: &[u8],
    start: usize,
    end: usize,
    translations: &HashMap<String, String>,
) -> Result<Vec<u8>, EngineError> {
    let mut out = Vec::new();
    let mut offset = start;

    while offset < end {
        if offset + 4 > bytes.len() || offset + 4 > end {
            out.extend_from_slice(&bytes[offset..end.min(bytes.len())]);
            break;
        }
        let tag: [u8; 4] = bytes[offset..offset + 4].try_into().expect("slice of len 4");

        if tag == GRUP_TAG {
            if offset + GROUP_HEADER_LEN > bytes.len() || offset + GROUP_HEADER_LEN > end {
                out.extend_from_slice(&bytes[offset..end.min(bytes.len())]);
                break;
            }
            let Ok(group_header) =
                GroupHeader::try_ref_from_bytes(&bytes[offset..offset + GROUP_HEADER_LEN])
            else {
                out.extend_from_slice(&bytes[offset..end.min(bytes.len())]);
                break;
            };
            let group_size = group_header.group_size.get() as usize;
            if group_size < GROUP_HEADER_LEN
                || offset + group_size > bytes.len()
                || offset + group_size > end
            {
                out.extend_from_slice(&bytes[offset..end.min(bytes.len())]);
                break;
            }

            let mut new_header = *group_header;
            let inner = rewrite_region(bytes, offset + GROUP_HEADER_LEN, offset + group_size, translations)?;
            let new_group_size = (GROUP_HEADER_LEN + inner.len()) as u32;
            new_header.group_size = zerocopy::little_endian::U32::new(new_group_size);
            out.extend_from_slice(new_header.as_bytes());
            out.extend_from_slice(&inner);

            offset += group_size;
        } else {
            if offset + RECORD_HEADER_LEN > bytes.len() || offset + RECORD_HEADER_LEN > end {
                out.extend_from_slice(&bytes[offset..end.min(bytes.len())]);
                break;
            }
            let Ok(record_header) =
                RecordHeader::try_ref_from_bytes(&bytes[offset..offset + RECORD_HEADER_LEN])
            else {
                out.extend_from_slice(&bytes[offset..end.min(bytes.len())]);
                break;
            };
            let data_size = record_header.data_size.get() as usize;
            let payload_start = offset + RECORD_HEADER_LEN;
            let payload_end = payload_start + data_size;
            if payload_end > bytes.len() || payload_end > end {
                out.extend_from_slice(&bytes[offset..end.min(bytes.len())]);
                break;
            }

            let record_tag = record_header.tag;
            let form_id = record_header.form_id.get();
            let raw_payload = &bytes[payload_start..payload_end];
            let compressed = record_header.is_compressed();

            let inflated_owned;
            let subrecord_source: &[u8] = if compressed {
                match inflate_payload(raw_payload) {
                    Ok(v) => {
                        inflated_owned = v;
                        &inflated_owned
                    },
                    Err(e) => {
                        warn!(offset, error = %e, "zlib inflate failed on rewrite; copying record verbatim");
                        out.extend_from_slice(&bytes[offset..payload_end]);
                        offset = payload_end;
                        continue;
                    },
                }
            } else {
                raw_payload
            };

            let new_subrecords = rewrite_subrecords(subrecord_source, record_tag, form_id, translations)?;

            let new_payload = if compressed {
                match deflate_payload(&new_subrecords) {
                    Ok(p) => p,
                    Err(e) => {
                        warn!(offset, error = %e, "zlib deflate failed on rewrite; copying record verbatim");
                        out.extend_from_slice(&bytes[offset..payload_end]);
                        offset = payload_end;
                        continue;
                    },
                }
            } else {
                new_subrecords
            };

            let mut new_header = *record_header;
            new_header.data_size = zerocopy::little_endian::U32::new(new_payload.len() as u32);
            out.extend_from_slice(new_header.as_bytes());
            out.extend_from_slice(&new_payload);

            offset = payload_end;
        }
    }

    Ok(out)
}

fn rewrite_subrecords(
    payload: &[u8],
    record_tag: [u8; 4],
    form_id: u32,
    translations: &HashMap<String, String>,
) -> Result<Vec<u8>, EngineError> {
    let mut out = Vec::with_capacity(payload.len());
    let mut offset = 0;

    while offset < payload.len() {
        if offset + SUBRECORD_HEADER_LEN > payload.len() {
            out.extend_from_slice(&payload[offset..]);
            break;
        }
        let Ok(sub_header) =
            SubrecordHeader::try_ref_from_bytes(&payload[offset..offset + SUBRECORD_HEADER_LEN])
        else {
            out.extend_from_slice(&payload[offset..]);
            break;
        };
        let size = sub_header.size.get() as usize;
        let sub_tag = sub_header.tag;
        let data_start = offset + SUBRECORD_HEADER_LEN;
        let data_end = data_start + size;
        if data_end > payload.len() {
            out.extend_from_slice(&payload[offset..]);
            break;
        }

        let translation = if is_translatable(record_tag, sub_tag) {
            let record_id = build_record_id(record_tag, form_id, sub_tag);
            translations.get(&record_id).map(|text| (record_id, text))
        } else {
            None
        };

        match translation {
            Some((record_id, text)) => {
                let mut new_payload = text.as_bytes().to_vec();
                new_payload.push(0);
                if new_payload.len() > u16::MAX as usize {
                    return Err(EngineError::PayloadTooLarge { record_id });
                }
                let new_header = SubrecordHeader {
                    tag: sub_tag,
                    size: U16::new(new_payload.len() as u16),
                };
                out.extend_from_slice(new_header.as_bytes());
                out.extend_from_slice(&new_payload);
            },
            None => {
                out.extend_from_slice(&payload[offset..data_end]);
            },
        }

        offset = data_end;
    }

    Ok(out)
}
