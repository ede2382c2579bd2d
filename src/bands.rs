// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Result, StoreError};
use crate::record::{FieldValue, StatisticalRecord};
use crate::schema::TableSchema;

/// Age bands of the age-by-sex table, in field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBand {
    Under5,
    Age5To15,
    Age16To24,
    Age25To44,
    Age45To64,
    Age65To74,
    Age75To84,
    Age85AndOver,
}

impl AgeBand {
    pub const ALL: [AgeBand; 8] = [
        AgeBand::Under5,
        AgeBand::Age5To15,
        AgeBand::Age16To24,
        AgeBand::Age25To44,
        AgeBand::Age45To64,
        AgeBand::Age65To74,
        AgeBand::Age75To84,
        AgeBand::Age85AndOver,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBand::Under5 => "under_5",
            AgeBand::Age5To15 => "5_15",
            AgeBand::Age16To24 => "16_24",
            AgeBand::Age25To44 => "25_44",
            AgeBand::Age45To64 => "45_64",
            AgeBand::Age65To74 => "65_74",
            AgeBand::Age75To84 => "75_84",
            AgeBand::Age85AndOver => "85_over",
        }
    }
}

/// Both-sexes totals per age band for one age-by-sex record, indexed
/// by [`AgeBand`] position rather than keyed by arbitrary objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeBandTable {
    counts: [i32; AgeBand::ALL.len()],
}

impl AgeBandTable {
    /// Band totals from a `cas001` record: each band sums its male
    /// and female columns.
    pub fn from_record(schema: &TableSchema, record: &StatisticalRecord) -> Result<Self> {
        let expected = TableSchema::cas001();
        if schema.fields != expected.fields || schema.value_kind != expected.value_kind {
            return Err(StoreError::SchemaMismatch(format!(
                "age bands require the {} layout, got {}",
                expected.name, schema.name
            )));
        }
        if record.fields.len() != schema.num_fields() {
            return Err(StoreError::SchemaMismatch(format!(
                "record has {} fields, schema {} declares {}",
                record.fields.len(),
                schema.name,
                schema.num_fields()
            )));
        }
        let mut counts = [0i32; AgeBand::ALL.len()];
        for (b, count) in counts.iter_mut().enumerate() {
            let male = int_at(record, 1 + 2 * b);
            let female = int_at(record, 2 + 2 * b);
            *count = male.wrapping_add(female);
        }
        Ok(Self { counts })
    }

    pub fn count(&self, band: AgeBand) -> i32 {
        self.counts[band as usize]
    }

    pub fn total(&self) -> i32 {
        self.counts.iter().fold(0i32, |acc, c| acc.wrapping_add(*c))
    }

    pub fn totals(&self) -> impl Iterator<Item = (AgeBand, i32)> + '_ {
        AgeBand::ALL.iter().map(move |b| (*b, self.counts[*b as usize]))
    }
}

fn int_at(record: &StatisticalRecord, idx: usize) -> i32 {
    match record.fields[idx] {
        FieldValue::Int(v) => v,
        FieldValue::Float(_) => 0,
    }
}
