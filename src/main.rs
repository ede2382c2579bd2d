// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Thin driver over the censtore library: sequences regional extract
// ingestion, hierarchy aggregation and CSV export for one workspace.

use censtore::{
    aggregate_range, aggregate_zone_set, csv_header, ingest_extract, Coarsening, MissPolicy,
    RecordStore, TableSchema, Workspace, ZoneLookupTable,
};
use std::collections::HashSet;
use std::env;
use std::process;

fn usage() -> ! {
    eprintln!("usage:");
    eprintln!("  censtore ingest <root> <table> <level> <csv>...");
    eprintln!("  censtore aggregate <root> <table> <from-level> <to-level> (--prefix <k> | --lookup <name>) [--abort-on-miss]");
    eprintln!("  censtore region <root> <table> <level> <zone>...");
    eprintln!("  censtore export <root> <table> <level>");
    eprintln!("  censtore count <root> <table> <level>");
    process::exit(2);
}

fn schema_for(name: &str) -> TableSchema {
    TableSchema::by_name(name).unwrap_or_else(|| {
        eprintln!("unknown table `{name}` (known: cas001, cas003, cas044, geometry)");
        process::exit(2);
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }
    let result = match args[1].as_str() {
        "ingest" => run_ingest(&args[2..]),
        "aggregate" => run_aggregate(&args[2..]),
        "region" => run_region(&args[2..]),
        "export" => run_export(&args[2..]),
        "count" => run_count(&args[2..]),
        _ => usage(),
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

/// Ingest the regional sub-extracts, in the order given, into one
/// fine-level store. Extract order fixes record-id assignment, so it
/// must be the same on every re-run.
fn run_ingest(args: &[String]) -> censtore::Result<()> {
    if args.len() < 4 {
        usage();
    }
    let workspace = Workspace::new(&args[0]);
    workspace.ensure_root()?;
    let schema = schema_for(&args[1]);
    let level = &args[2];

    let mut store = RecordStore::create(workspace.store_path(schema.name, level), schema)?;
    let mut next_id = 0u64;
    for csv in &args[3..] {
        next_id = ingest_extract(&mut store, csv, next_id)?;
    }
    store.flush()?;
    log::info!("ingest complete: {} records", store.record_count());
    Ok(())
}

fn run_aggregate(args: &[String]) -> censtore::Result<()> {
    if args.len() < 6 {
        usage();
    }
    let workspace = Workspace::new(&args[0]);
    let schema = schema_for(&args[1]);
    let from_level = &args[2];
    let to_level = &args[3];

    let lookup;
    let coarsening = match args[4].as_str() {
        "--prefix" => {
            let k: usize = args[5].parse().unwrap_or_else(|_| usage());
            Coarsening::TruncatePrefix(k)
        }
        "--lookup" => {
            lookup = ZoneLookupTable::load(workspace.lookup_path(&args[5]))?;
            Coarsening::ZoneLookup(&lookup)
        }
        _ => usage(),
    };
    let policy = if args.contains(&"--abort-on-miss".to_string()) {
        MissPolicy::Abort
    } else {
        MissPolicy::SkipAndReport
    };

    let src = RecordStore::open(workspace.store_path(schema.name, from_level), schema.clone())?;
    let mut dest = RecordStore::create(workspace.store_path(schema.name, to_level), schema)?;
    let report = aggregate_range(&src, 0, src.record_count(), &coarsening, policy, &mut dest)?;
    dest.flush()?;

    for zone in &report.skipped {
        log::warn!("no lookup entry for `{zone}`; record skipped");
    }
    log::info!(
        "{from_level} -> {to_level}: {} records into {} groups ({} skipped)",
        report.records_read,
        report.groups_written,
        report.skipped.len()
    );
    Ok(())
}

fn run_region(args: &[String]) -> censtore::Result<()> {
    if args.len() < 4 {
        usage();
    }
    let workspace = Workspace::new(&args[0]);
    let schema = schema_for(&args[1]);
    let level = &args[2];
    let zones: HashSet<String> = args[3..].iter().cloned().collect();

    let store = RecordStore::open(workspace.store_path(schema.name, level), schema.clone())?;
    let (summary, matched) = aggregate_zone_set(&store, &zones, 0, "CUSTOM")?;
    log::info!("custom region matched {matched} of {} records", store.record_count());
    println!("{}", csv_header(&schema));
    println!("{}", summary.to_csv_row(&schema));
    Ok(())
}

fn run_export(args: &[String]) -> censtore::Result<()> {
    if args.len() != 3 {
        usage();
    }
    let workspace = Workspace::new(&args[0]);
    let schema = schema_for(&args[1]);

    let store = RecordStore::open(workspace.store_path(schema.name, &args[2]), schema.clone())?;
    println!("{}", csv_header(&schema));
    store.scan_range(0, store.record_count(), |record| {
        println!("{}", record.to_csv_row(&schema));
        Ok(())
    })?;
    Ok(())
}

fn run_count(args: &[String]) -> censtore::Result<()> {
    if args.len() != 3 {
        usage();
    }
    let workspace = Workspace::new(&args[0]);
    let schema = schema_for(&args[1]);
    let store = RecordStore::open(workspace.store_path(schema.name, &args[2]), schema)?;
    println!("{}", store.record_count());
    Ok(())
}
