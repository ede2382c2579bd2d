// SPDX-License-Identifier: AGPL-3.0-or-later
//
// censtore
// Fixed-width record storage and hierarchical aggregation for census
// area statistics.

pub mod aggregate;
pub mod bands;
pub mod error;
pub mod ingest;
pub mod record;
pub mod schema;
pub mod store;
pub mod workspace;
pub mod zones;

pub use crate::aggregate::{
    aggregate_range, aggregate_zone_set, AggregationReport, Coarsening, MissPolicy,
};
pub use crate::bands::{AgeBand, AgeBandTable};
pub use crate::error::{Result, StoreError};
pub use crate::ingest::ingest_extract;
pub use crate::record::{csv_header, FieldValue, StatisticalRecord};
pub use crate::schema::{FieldDef, TableSchema, ValueKind, ZONE_CODE_LEN};
pub use crate::store::RecordStore;
pub use crate::workspace::Workspace;
pub use crate::zones::ZoneLookupTable;
