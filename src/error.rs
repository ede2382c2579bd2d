// SPDX-License-Identifier: AGPL-3.0-or-later

use std::io;

/// Error type shared by the store, lookup and aggregation layers.
///
/// Fatal conditions propagate to the driver; nothing in the library
/// terminates the process or swallows an I/O failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("record {record_id} out of range: store holds {record_count} records")]
    OffsetOutOfRange { record_id: u64, record_count: u64 },

    #[error("zone code `{0}` missing from lookup table")]
    LookupMiss(String),

    #[error("duplicate lookup key `{key}`: maps to both `{existing}` and `{incoming}`")]
    DuplicateLookupKey {
        key: String,
        existing: String,
        incoming: String,
    },

    #[error("malformed lookup entry at line {0}")]
    MalformedLookupEntry(usize),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("record id {got} breaks the dense sequence: expected {expected}")]
    IdSequence { expected: u64, got: u64 },
}

pub type Result<T> = std::result::Result<T, StoreError>;
