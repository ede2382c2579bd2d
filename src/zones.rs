// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Result, StoreError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Fine-to-coarse area code mapping for the one hierarchy level where
/// the parent cannot be derived by prefix truncation. Loaded once from
/// an auxiliary file, read-only for the lifetime of an aggregation run.
#[derive(Debug, Clone, Default)]
pub struct ZoneLookupTable {
    map: BTreeMap<String, String>,
}

impl ZoneLookupTable {
    /// Load from a keyed text file: one `fine coarse` pair per line,
    /// whitespace-delimited, blank lines skipped. A key mapped to two
    /// different parents is a data-integrity error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut table = Self::default();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut tokens = line.split_whitespace();
            let fine = tokens.next();
            let coarse = tokens.next();
            match (fine, coarse) {
                (Some(fine), Some(coarse)) => {
                    table.insert(fine.to_string(), coarse.to_string())?;
                }
                _ => return Err(StoreError::MalformedLookupEntry(line_no + 1)),
            }
        }
        Ok(table)
    }

    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = Self::default();
        for (fine, coarse) in pairs {
            table.insert(fine, coarse)?;
        }
        Ok(table)
    }

    fn insert(&mut self, fine: String, coarse: String) -> Result<()> {
        if let Some(existing) = self.map.get(&fine) {
            if *existing != coarse {
                return Err(StoreError::DuplicateLookupKey {
                    key: fine,
                    existing: existing.clone(),
                    incoming: coarse,
                });
            }
            return Ok(());
        }
        self.map.insert(fine, coarse);
        Ok(())
    }

    /// Containing coarse code for a fine code. A `None` here is a
    /// lookup miss; the aggregation engine decides whether to skip or
    /// abort — it is never folded into a group under a bogus key.
    pub fn coarse(&self, fine: &str) -> Option<&str> {
        self.map.get(fine).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
