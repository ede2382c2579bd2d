// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Result, StoreError};
use crate::schema::{TableSchema, ValueKind, ZONE_CODE_LEN};
use std::io::{Read, Write};

/// Reserved sentinel marking a field that has never been loaded.
/// Distinct from 0, which is a legitimate count.
pub const INT_UNSET: i32 = i32::MIN;
pub const FLOAT_UNSET: f64 = f64::MIN;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i32),
    Float(f64),
}

/// One statistical record: the unit of storage.
///
/// `record_id` doubles as the record's offset key in a store
/// (`offset = record_id * size_in_bytes`). The zone code is held
/// trimmed in memory and written as exactly [`ZONE_CODE_LEN`] UTF-16
/// units on disk, left-padded with spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticalRecord {
    pub record_id: u64,
    pub zone_code: String,
    pub fields: Vec<FieldValue>,
}

impl StatisticalRecord {
    /// Accumulator seed: every field 0.
    pub fn zeroed(schema: &TableSchema, record_id: u64, zone_code: &str) -> Self {
        let fill = match schema.value_kind {
            ValueKind::Int32 => FieldValue::Int(0),
            ValueKind::Float64 => FieldValue::Float(0.0),
        };
        Self {
            record_id,
            zone_code: zone_code.to_string(),
            fields: vec![fill; schema.num_fields()],
        }
    }

    /// Not-yet-loaded marker: every field the reserved sentinel.
    pub fn uninitialized(schema: &TableSchema, record_id: u64, zone_code: &str) -> Self {
        let fill = match schema.value_kind {
            ValueKind::Int32 => FieldValue::Int(INT_UNSET),
            ValueKind::Float64 => FieldValue::Float(FLOAT_UNSET),
        };
        Self {
            record_id,
            zone_code: zone_code.to_string(),
            fields: vec![fill; schema.num_fields()],
        }
    }

    pub fn is_uninitialized(&self) -> bool {
        !self.fields.is_empty()
            && self.fields.iter().all(|f| match f {
                FieldValue::Int(v) => *v == INT_UNSET,
                FieldValue::Float(v) => *v == FLOAT_UNSET,
            })
    }

    /// Decode one CSV row. Token 0 is the zone code; field `j` reads
    /// the token at its schema column index. Blank, missing or
    /// malformed numeric cells decode as 0 — source extracts contain
    /// empty cells and a partial row must still load.
    pub fn from_tokens(schema: &TableSchema, record_id: u64, tokens: &[&str]) -> Self {
        let zone_code = tokens.first().map(|t| t.trim()).unwrap_or("").to_string();
        let fields = schema
            .fields
            .iter()
            .map(|def| {
                let cell = tokens.get(def.column).map(|t| t.trim()).unwrap_or("");
                match schema.value_kind {
                    ValueKind::Int32 => FieldValue::Int(cell.parse::<i32>().unwrap_or(0)),
                    ValueKind::Float64 => FieldValue::Float(cell.parse::<f64>().unwrap_or(0.0)),
                }
            })
            .collect();
        Self {
            record_id,
            zone_code,
            fields,
        }
    }

    /// Read one fixed-length record in declared field order. The
    /// caller positions the reader; nothing here seeks.
    pub fn decode_binary(schema: &TableSchema, reader: &mut impl Read) -> Result<Self> {
        let mut id_buf = [0u8; 8];
        reader.read_exact(&mut id_buf)?;
        let record_id = u64::from_le_bytes(id_buf);

        let mut zone_buf = [0u8; 2 * ZONE_CODE_LEN];
        reader.read_exact(&mut zone_buf)?;
        let mut units = [0u16; ZONE_CODE_LEN];
        for (i, unit) in units.iter_mut().enumerate() {
            *unit = u16::from_le_bytes([zone_buf[2 * i], zone_buf[2 * i + 1]]);
        }
        let zone_code = String::from_utf16_lossy(&units).trim().to_string();

        let mut fields = Vec::with_capacity(schema.num_fields());
        for _ in 0..schema.num_fields() {
            match schema.value_kind {
                ValueKind::Int32 => {
                    let mut buf = [0u8; 4];
                    reader.read_exact(&mut buf)?;
                    fields.push(FieldValue::Int(i32::from_le_bytes(buf)));
                }
                ValueKind::Float64 => {
                    let mut buf = [0u8; 8];
                    reader.read_exact(&mut buf)?;
                    fields.push(FieldValue::Float(f64::from_le_bytes(buf)));
                }
            }
        }
        Ok(Self {
            record_id,
            zone_code,
            fields,
        })
    }

    /// Write the record in declared field order. Position-independent
    /// only if the caller has already sought to the record's offset.
    pub fn encode_binary(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.record_id.to_le_bytes())?;
        for unit in padded_zone_units(&self.zone_code) {
            writer.write_all(&unit.to_le_bytes())?;
        }
        for field in &self.fields {
            match field {
                FieldValue::Int(v) => writer.write_all(&v.to_le_bytes())?,
                FieldValue::Float(v) => writer.write_all(&v.to_le_bytes())?,
            }
        }
        Ok(())
    }

    /// Field-wise sum of `other` into `self`. Integer fields add at
    /// native 32-bit width without an overflow guard.
    pub fn accumulate(&mut self, other: &StatisticalRecord) -> Result<()> {
        if self.fields.len() != other.fields.len() {
            return Err(StoreError::SchemaMismatch(format!(
                "cannot accumulate {} fields into {}",
                other.fields.len(),
                self.fields.len()
            )));
        }
        for (dst, src) in self.fields.iter_mut().zip(other.fields.iter()) {
            match (dst, src) {
                (FieldValue::Int(a), FieldValue::Int(b)) => *a = a.wrapping_add(*b),
                (FieldValue::Float(a), FieldValue::Float(b)) => *a += *b,
                _ => {
                    return Err(StoreError::SchemaMismatch(
                        "field kind differs between records".to_string(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Re-emit the record as one comma-separated row with each value
    /// at the same source-column index the text decoder reads, so the
    /// emission round-trips through [`Self::from_tokens`] for gapped
    /// schemas as well as dense ones. Skipped columns stay blank.
    pub fn to_csv_row(&self, schema: &TableSchema) -> String {
        let mut cells = vec![String::new(); schema.max_column() + 1];
        cells[0] = self.zone_code.clone();
        for (def, field) in schema.fields.iter().zip(self.fields.iter()) {
            cells[def.column] = match field {
                FieldValue::Int(v) => v.to_string(),
                FieldValue::Float(v) => v.to_string(),
            };
        }
        cells.join(",")
    }
}

/// Header line matching [`StatisticalRecord::to_csv_row`]: field names
/// at their source-column positions, zone code at column 0.
pub fn csv_header(schema: &TableSchema) -> String {
    let mut cells = vec![String::new(); schema.max_column() + 1];
    cells[0] = "zone_code".to_string();
    for def in &schema.fields {
        cells[def.column] = def.name.to_string();
    }
    cells.join(",")
}

fn padded_zone_units(zone: &str) -> [u16; ZONE_CODE_LEN] {
    let mut units = [b' ' as u16; ZONE_CODE_LEN];
    let encoded: Vec<u16> = zone.encode_utf16().take(ZONE_CODE_LEN).collect();
    let pad = ZONE_CODE_LEN - encoded.len();
    units[pad..].copy_from_slice(&encoded);
    units
}
