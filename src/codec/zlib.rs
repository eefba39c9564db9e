// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Compression helpers shared by the parser and the writer.
//!
//! Drives `flate2` over an in-memory `bufread` wrapper rather than streaming
//! through a file handle, since every record payload is already a borrowed
//! slice by the time it reaches these functions.

use std::io::{self, Read};

use flate2::{Compression, bufread::ZlibDecoder, bufread::ZlibEncoder};

/// Strips the 4-byte little-endian inflated-size prefix and zlib-inflates
/// the remainder.
pub fn inflate_payload(raw: &[u8]) -> io::Result<Vec<u8>> {
    let prefix: [u8; 4] = raw.get(0..4).and_then(|b| b.try_into().ok()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::UnexpectedEof, "compressed payload missing size prefix")
    })?;
    let expected_size = u32::from_le_bytes(prefix) as usize;
    let mut decoder = ZlibDecoder::new(&raw[4..]);
    let mut out = Vec::with_capacity(expected_size);
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Zlib-deflates `inflated` at the default compression level and prepends
/// the 4-byte little-endian inflated-size prefix the format expects.
pub fn deflate_payload(inflated: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(inflated, Compression::default());
    let mut compressed = Vec::new();
    encoder.read_to_end(&mut compressed)?;

    let mut out = Vec::with_capacity(4 + compressed.len());
    out.extend_from_slice(&(inflated.len() as u32).to_le_bytes());
    out.extend_from_slice(&compressed);
    Ok(out)
}
