// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::error::{Result, StoreError};
use crate::record::StatisticalRecord;
use crate::store::RecordStore;
use crate::zones::ZoneLookupTable;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};

/// Rule mapping a fine area code to its containing coarse code.
#[derive(Debug, Clone, Copy)]
pub enum Coarsening<'a> {
    /// Keep the first `k` characters of the fine code.
    TruncatePrefix(usize),
    /// Translate through the auxiliary lookup table.
    ZoneLookup(&'a ZoneLookupTable),
}

impl Coarsening<'_> {
    /// `None` is a lookup miss; truncation never misses.
    fn coarse_key(&self, fine: &str) -> Option<String> {
        match self {
            Self::TruncatePrefix(k) => Some(fine.chars().take(*k).collect()),
            Self::ZoneLookup(table) => table.coarse(fine).map(|s| s.to_string()),
        }
    }
}

/// What to do when a fine code is absent from the lookup table. The
/// miss must never be folded into a group under a wrong key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissPolicy {
    /// Terminate the run on the first miss.
    Abort,
    /// Drop the record's contribution entirely and report every
    /// skipped code at the end of the run.
    SkipAndReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationReport {
    pub records_read: u64,
    pub groups_written: u64,
    /// Fine codes skipped under [`MissPolicy::SkipAndReport`], in
    /// encounter order, one entry per skipped record.
    pub skipped: Vec<String>,
}

/// Aggregate the contiguous id range `[start, end)` of `src` into
/// `dest`: group by coarse key, field-wise sum each group, then emit
/// one record per group in ascending key order as dense ids from 0.
/// The emitted record carries the coarse key as its zone code.
///
/// Any I/O failure aborts the whole run; the recovery strategy is a
/// re-run against a fresh destination store.
pub fn aggregate_range(
    src: &RecordStore,
    start: u64,
    end: u64,
    coarsening: &Coarsening<'_>,
    policy: MissPolicy,
    dest: &mut RecordStore,
) -> Result<AggregationReport> {
    if src.schema() != dest.schema() {
        return Err(StoreError::SchemaMismatch(format!(
            "source schema {} does not match destination schema {}",
            src.schema().name,
            dest.schema().name
        )));
    }

    let mut groups: BTreeMap<String, StatisticalRecord> = BTreeMap::new();
    let mut report = AggregationReport::default();

    src.scan_range(start, end, |record| {
        report.records_read += 1;
        let key = match coarsening.coarse_key(&record.zone_code) {
            Some(key) => key,
            None => match policy {
                MissPolicy::Abort => {
                    return Err(StoreError::LookupMiss(record.zone_code));
                }
                MissPolicy::SkipAndReport => {
                    report.skipped.push(record.zone_code);
                    return Ok(());
                }
            },
        };
        match groups.entry(key) {
            // The accumulator keeps the identity fields of whichever
            // record seeded it; they are replaced at emission.
            Entry::Occupied(mut group) => group.get_mut().accumulate(&record)?,
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
        Ok(())
    })?;

    for (id, (key, mut record)) in groups.into_iter().enumerate() {
        record.record_id = id as u64;
        record.zone_code = key;
        dest.append(&record)?;
        report.groups_written += 1;
    }

    if !report.skipped.is_empty() {
        log::warn!(
            "aggregation of {} skipped {} record(s) with no lookup entry",
            src.schema().name,
            report.skipped.len()
        );
    }
    log::info!(
        "aggregated {} records from {} into {} groups",
        report.records_read,
        src.schema().name,
        report.groups_written
    );
    Ok(report)
}

/// Sum every record whose zone code is in `zones` into one summary
/// record with caller-supplied identity. The store is keyed by record
/// id, not zone code, so this is a full linear scan per call — the
/// path serves infrequent custom-region queries, not the bulk
/// hierarchy rebuild.
pub fn aggregate_zone_set(
    store: &RecordStore,
    zones: &HashSet<String>,
    record_id: u64,
    zone_code: &str,
) -> Result<(StatisticalRecord, usize)> {
    let mut summary = StatisticalRecord::zeroed(store.schema(), record_id, zone_code);
    let mut matched = 0usize;
    store.scan_range(0, store.record_count(), |record| {
        if zones.contains(&record.zone_code) {
            summary.accumulate(&record)?;
            matched += 1;
        }
        Ok(())
    })?;
    Ok((summary, matched))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use crate::schema::{FieldDef, TableSchema, ValueKind};
    use std::fs;
    use std::path::PathBuf;

    fn fresh_store_path(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "censtore_agg_test_{}_{}_{}.csb",
            name,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    fn single_value_schema() -> TableSchema {
        TableSchema {
            name: "single",
            value_kind: ValueKind::Int32,
            fields: vec![FieldDef {
                name: "value",
                column: 1,
            }],
        }
    }

    fn value_record(schema: &TableSchema, id: u64, zone: &str, value: i32) -> StatisticalRecord {
        let mut record = StatisticalRecord::zeroed(schema, id, zone);
        record.fields[0] = FieldValue::Int(value);
        record
    }

    fn int_field(record: &StatisticalRecord, idx: usize) -> i32 {
        match record.fields[idx] {
            FieldValue::Int(v) => v,
            FieldValue::Float(_) => panic!("unexpected float field"),
        }
    }

    fn field_sums(store: &RecordStore) -> Vec<i64> {
        let mut sums = vec![0i64; store.schema().num_fields()];
        store
            .scan_range(0, store.record_count(), |record| {
                for (i, f) in record.fields.iter().enumerate() {
                    match f {
                        FieldValue::Int(v) => sums[i] += *v as i64,
                        FieldValue::Float(_) => panic!("unexpected float field"),
                    }
                }
                Ok(())
            })
            .unwrap();
        sums
    }

    #[test]
    fn test_truncation_groups_and_orders_output() {
        let src_path = fresh_store_path("trunc_src");
        let dest_path = fresh_store_path("trunc_dest");
        let schema = single_value_schema();

        let mut src = RecordStore::create(&src_path, schema.clone()).unwrap();
        src.append(&value_record(&schema, 0, "00AAFA0001", 10)).unwrap();
        src.append(&value_record(&schema, 1, "00AAFA0002", 20)).unwrap();
        src.append(&value_record(&schema, 2, "00AAFB0001", 30)).unwrap();

        let mut dest = RecordStore::create(&dest_path, schema.clone()).unwrap();
        let report = aggregate_range(
            &src,
            0,
            3,
            &Coarsening::TruncatePrefix(6),
            MissPolicy::SkipAndReport,
            &mut dest,
        )
        .unwrap();

        assert_eq!(report.records_read, 3);
        assert_eq!(report.groups_written, 2);
        assert!(report.skipped.is_empty());

        let first = dest.get(0).unwrap();
        assert_eq!(first.zone_code, "00AAFA");
        assert_eq!(int_field(&first, 0), 30);
        let second = dest.get(1).unwrap();
        assert_eq!(second.zone_code, "00AAFB");
        assert_eq!(int_field(&second, 0), 30);

        let _ = fs::remove_file(src_path);
        let _ = fs::remove_file(dest_path);
    }

    #[test]
    fn test_field_sums_are_conserved() {
        let src_path = fresh_store_path("conserve_src");
        let dest_path = fresh_store_path("conserve_dest");
        let schema = TableSchema::cas003();

        let mut src = RecordStore::create(&src_path, schema.clone()).unwrap();
        for i in 0..40u64 {
            let zone = format!("00AAF{}{:04}", (b'A' + (i % 5) as u8) as char, i);
            let mut record = StatisticalRecord::zeroed(&schema, i, &zone);
            for (j, f) in record.fields.iter_mut().enumerate() {
                *f = FieldValue::Int((i as i32 * 13 + j as i32 * 7) % 101);
            }
            src.append(&record).unwrap();
        }

        let mut dest = RecordStore::create(&dest_path, schema.clone()).unwrap();
        aggregate_range(
            &src,
            0,
            40,
            &Coarsening::TruncatePrefix(6),
            MissPolicy::SkipAndReport,
            &mut dest,
        )
        .unwrap();

        assert_eq!(dest.record_count(), 5);
        assert_eq!(field_sums(&src), field_sums(&dest));

        // Output zone codes ascend with record id.
        let mut zones = Vec::new();
        dest.scan_range(0, dest.record_count(), |r| {
            zones.push(r.zone_code);
            Ok(())
        })
        .unwrap();
        let mut sorted = zones.clone();
        sorted.sort();
        assert_eq!(zones, sorted);

        let _ = fs::remove_file(src_path);
        let _ = fs::remove_file(dest_path);
    }

    #[test]
    fn test_reaggregation_is_identity() {
        let src_path = fresh_store_path("idem_src");
        let mid_path = fresh_store_path("idem_mid");
        let again_path = fresh_store_path("idem_again");
        let schema = TableSchema::cas003();

        let mut src = RecordStore::create(&src_path, schema.clone()).unwrap();
        for i in 0..24u64 {
            let zone = format!("00AAF{}{:04}", (b'A' + (i % 3) as u8) as char, i);
            let mut record = StatisticalRecord::zeroed(&schema, i, &zone);
            for (j, f) in record.fields.iter_mut().enumerate() {
                *f = FieldValue::Int(i as i32 + j as i32);
            }
            src.append(&record).unwrap();
        }

        let mut mid = RecordStore::create(&mid_path, schema.clone()).unwrap();
        aggregate_range(
            &src,
            0,
            24,
            &Coarsening::TruncatePrefix(6),
            MissPolicy::SkipAndReport,
            &mut mid,
        )
        .unwrap();

        // Coarse codes are 6 characters, so the same rule is now the
        // identity grouping.
        let mut again = RecordStore::create(&again_path, schema.clone()).unwrap();
        aggregate_range(
            &mid,
            0,
            mid.record_count(),
            &Coarsening::TruncatePrefix(6),
            MissPolicy::SkipAndReport,
            &mut again,
        )
        .unwrap();

        assert_eq!(mid.record_count(), again.record_count());
        for id in 0..mid.record_count() {
            assert_eq!(mid.get(id).unwrap(), again.get(id).unwrap());
        }

        let _ = fs::remove_file(src_path);
        let _ = fs::remove_file(mid_path);
        let _ = fs::remove_file(again_path);
    }

    #[test]
    fn test_lookup_miss_skip_and_report_excludes_only_that_record() {
        let src_path = fresh_store_path("miss_src");
        let dest_path = fresh_store_path("miss_dest");
        let schema = single_value_schema();

        let mut src = RecordStore::create(&src_path, schema.clone()).unwrap();
        src.append(&value_record(&schema, 0, "00AAFA0001", 10)).unwrap();
        src.append(&value_record(&schema, 1, "00AAFA0002", 20)).unwrap();
        src.append(&value_record(&schema, 2, "00AAFB0001", 30)).unwrap();

        // No entry for 00AAFA0002.
        let table = ZoneLookupTable::from_pairs([
            ("00AAFA0001".to_string(), "00AAFA".to_string()),
            ("00AAFB0001".to_string(), "00AAFB".to_string()),
        ])
        .unwrap();

        let mut dest = RecordStore::create(&dest_path, schema.clone()).unwrap();
        let report = aggregate_range(
            &src,
            0,
            3,
            &Coarsening::ZoneLookup(&table),
            MissPolicy::SkipAndReport,
            &mut dest,
        )
        .unwrap();

        assert_eq!(report.skipped, vec!["00AAFA0002".to_string()]);
        assert_eq!(report.groups_written, 2);
        assert_eq!(int_field(&dest.get(0).unwrap(), 0), 10);
        assert_eq!(int_field(&dest.get(1).unwrap(), 0), 30);

        let _ = fs::remove_file(src_path);
        let _ = fs::remove_file(dest_path);
    }

    #[test]
    fn test_lookup_miss_abort_policy_terminates() {
        let src_path = fresh_store_path("abort_src");
        let dest_path = fresh_store_path("abort_dest");
        let schema = single_value_schema();

        let mut src = RecordStore::create(&src_path, schema.clone()).unwrap();
        src.append(&value_record(&schema, 0, "00AAFA0001", 10)).unwrap();

        let table = ZoneLookupTable::default();
        let mut dest = RecordStore::create(&dest_path, schema.clone()).unwrap();
        let err = aggregate_range(
            &src,
            0,
            1,
            &Coarsening::ZoneLookup(&table),
            MissPolicy::Abort,
            &mut dest,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::LookupMiss(code) if code == "00AAFA0001"));

        let _ = fs::remove_file(src_path);
        let _ = fs::remove_file(dest_path);
    }

    #[test]
    fn test_schema_mismatch_between_stores_is_rejected() {
        let src_path = fresh_store_path("mismatch_src");
        let dest_path = fresh_store_path("mismatch_dest");

        let src = RecordStore::create(&src_path, TableSchema::cas001()).unwrap();
        let mut dest = RecordStore::create(&dest_path, TableSchema::cas003()).unwrap();
        let err = aggregate_range(
            &src,
            0,
            0,
            &Coarsening::TruncatePrefix(6),
            MissPolicy::SkipAndReport,
            &mut dest,
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch(_)));

        let _ = fs::remove_file(src_path);
        let _ = fs::remove_file(dest_path);
    }

    #[test]
    fn test_zone_set_aggregation_scans_whole_store() {
        let path = fresh_store_path("zone_set");
        let schema = single_value_schema();
        let mut store = RecordStore::create(&path, schema.clone()).unwrap();
        store.append(&value_record(&schema, 0, "00AAFA0001", 10)).unwrap();
        store.append(&value_record(&schema, 1, "00AAFA0002", 20)).unwrap();
        store.append(&value_record(&schema, 2, "00AAFB0001", 30)).unwrap();
        store.append(&value_record(&schema, 3, "00AAFC0001", 40)).unwrap();

        let zones: HashSet<String> = ["00AAFA0001", "00AAFC0001"]
            .into_iter()
            .map(String::from)
            .collect();
        let (summary, matched) = aggregate_zone_set(&store, &zones, 0, "CUSTOM0001").unwrap();
        assert_eq!(matched, 2);
        assert_eq!(summary.zone_code, "CUSTOM0001");
        assert_eq!(int_field(&summary, 0), 50);

        let disjoint: HashSet<String> = ["99ZZZZ0001".to_string()].into_iter().collect();
        let (empty, matched) = aggregate_zone_set(&store, &disjoint, 7, "NOWHERE").unwrap();
        assert_eq!(matched, 0);
        assert_eq!(empty, StatisticalRecord::zeroed(&schema, 7, "NOWHERE"));

        let _ = fs::remove_file(path);
    }
}
