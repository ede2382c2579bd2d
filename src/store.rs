// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Result, StoreError};
use crate::record::StatisticalRecord;
use crate::schema::TableSchema;
use memmap2::MmapOptions;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append-only flat file of fixed-length records, addressed by
/// `record_id * size_in_bytes`. No header, no magic, no version:
/// record `i` occupies bytes `[i*L, (i+1)*L)` and schema identity is
/// implicit in which descriptor opens the file.
///
/// Single writer, single reader per instance; concurrent external
/// access is the caller's problem to prevent.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    schema: TableSchema,
    file: File,
    count: u64,
}

impl RecordStore {
    /// Create a fresh store, truncating any existing file.
    pub fn create(path: impl AsRef<Path>, schema: TableSchema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(Self {
            path,
            schema,
            file,
            count: 0,
        })
    }

    /// Open an existing store. The file length must be a whole
    /// multiple of the schema's record length, else the descriptor
    /// does not match the file and every offset would be wrong.
    pub fn open(path: impl AsRef<Path>, schema: TableSchema) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        let record_len = schema.size_in_bytes() as u64;
        if len % record_len != 0 {
            return Err(StoreError::SchemaMismatch(format!(
                "store length {} is not a multiple of record length {}",
                len, record_len
            )));
        }
        let count = len / record_len;
        Ok(Self {
            path,
            schema,
            file,
            count,
        })
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record_count(&self) -> u64 {
        self.count
    }

    /// Append one record at its implied offset. Ids are issued by the
    /// caller as a dense sequence starting at 0; anything else breaks
    /// positional addressing and is rejected.
    pub fn append(&mut self, record: &StatisticalRecord) -> Result<()> {
        if record.record_id != self.count {
            return Err(StoreError::IdSequence {
                expected: self.count,
                got: record.record_id,
            });
        }
        let record_len = self.schema.size_in_bytes();
        let mut buf = Vec::with_capacity(record_len);
        record.encode_binary(&mut buf)?;
        // A short or long encoding would silently corrupt every
        // offset after this one.
        if buf.len() != record_len {
            return Err(StoreError::SchemaMismatch(format!(
                "record encodes to {} bytes, schema {} requires {}",
                buf.len(),
                self.schema.name,
                record_len
            )));
        }

        self.file
            .seek(SeekFrom::Start(self.count * record_len as u64))?;
        self.file.write_all(&buf)?;
        self.count += 1;
        Ok(())
    }

    /// Random read by record id: seek to `id * record_len`, decode.
    /// Ids at or past the ingested range surface as a corrupt-offset
    /// error, never as a zeroed record.
    pub fn get(&self, record_id: u64) -> Result<StatisticalRecord> {
        if record_id >= self.count {
            return Err(StoreError::OffsetOutOfRange {
                record_id,
                record_count: self.count,
            });
        }
        let record_len = self.schema.size_in_bytes() as u64;
        let mut file = &self.file;
        file.seek(SeekFrom::Start(record_id * record_len))?;
        StatisticalRecord::decode_binary(&self.schema, &mut file)
    }

    /// Sequential scan over `[start, end)` via one mapping of the
    /// file, in record-id order.
    pub fn scan_range<F>(&self, start: u64, end: u64, mut on_record: F) -> Result<()>
    where
        F: FnMut(StatisticalRecord) -> Result<()>,
    {
        if start > end || end > self.count {
            return Err(StoreError::OffsetOutOfRange {
                record_id: end,
                record_count: self.count,
            });
        }
        if start == end {
            return Ok(());
        }
        let record_len = self.schema.size_in_bytes();
        let mmap = unsafe { MmapOptions::new().map(&self.file)? };
        for id in start..end {
            let off = id as usize * record_len;
            let mut slice = &mmap[off..off + record_len];
            let record = StatisticalRecord::decode_binary(&self.schema, &mut slice)?;
            on_record(record)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
