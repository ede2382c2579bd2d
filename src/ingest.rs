// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::Result;
use crate::record::StatisticalRecord;
use crate::store::RecordStore;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Ingest one regional sub-extract into `store`, assigning ids from
/// `next_id` upward, and return the id to hand to the next extract.
/// National tables are split across regional files; threading the
/// counter through each call keeps ids dense across the whole table.
///
/// The first row is a header and is discarded. Blank lines are
/// skipped. Cell-level damage (blank or non-numeric values) is
/// recovered in the codec as 0; anything at the file level is fatal.
pub fn ingest_extract(
    store: &mut RecordStore,
    path: impl AsRef<Path>,
    mut next_id: u64,
) -> Result<u64> {
    let path = path.as_ref();
    let schema = store.schema().clone();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut lines = reader.lines();
    if let Some(header) = lines.next() {
        header?;
    }

    let first_id = next_id;
    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let tokens: Vec<&str> = line.split(',').collect();
        let record = StatisticalRecord::from_tokens(&schema, next_id, &tokens);
        store.append(&record)?;
        next_id += 1;
    }

    log::info!(
        "ingested {} records from {} into {} (ids {}..{})",
        next_id - first_id,
        path.display(),
        schema.name,
        first_id,
        next_id
    );
    Ok(next_id)
}
