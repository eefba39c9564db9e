// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Crate-wide error taxonomy.
//!
//! Most call sites propagate with `anyhow::Result` plus `.context(..)`. The
//! variant below exists where a caller needs to match on *kind* rather than
//! just read a message: the codec's rewrite path needs a typed
//! `PayloadTooLarge` so the orchestrator can fail the task without guessing
//! from a string. The HTTP boundary and the orchestrator's I/O failures
//! don't need typed matching — they're reported as plain messages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(
        "subrecord payload for {record_id} exceeds {} bytes after translation",
        u16::MAX
    )]
    PayloadTooLarge { record_id: String },
}
