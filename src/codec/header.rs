// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Wire-exact header layouts for the record/group/subrecord tree.
//!
//! All multi-byte fields are little-endian. The `zerocopy::little_endian`
//! integer wrappers give zero-copy `TryFromBytes`/`IntoBytes` access over the
//! raw header bytes without any manual byte-swapping.

use zerocopy::{
    Immutable, IntoBytes, KnownLayout, TryFromBytes, little_endian::{U16, U32},
};

/// Bit of [`RecordHeader::flags`] marking a zlib-compressed payload.
pub const COMPRESSED_FLAG: u32 = 0x0004_0000;

pub const RECORD_HEADER_LEN: usize = 24;
pub const GROUP_HEADER_LEN: usize = 24;
pub const SUBRECORD_HEADER_LEN: usize = 6;

/// 24-byte record header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RecordHeader {
    pub tag: [u8; 4],
    pub data_size: U32,
    pub flags: U32,
    pub form_id: U32,
    pub revision: U32,
    pub version: U16,
    pub unknown: U16,
}

impl RecordHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags.get() & COMPRESSED_FLAG != 0
    }
}

/// 24-byte group header.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct GroupHeader {
    pub tag: [u8; 4],
    pub group_size: U32,
    pub label: [u8; 4],
    pub group_type: U32,
    pub stamp: U32,
    pub unknown: U32,
}

/// 6-byte subrecord header, followed by `size` payload bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct SubrecordHeader {
    pub tag: [u8; 4],
    pub size: U16,
}

pub const GRUP_TAG: [u8; 4] = *b"GRUP";
