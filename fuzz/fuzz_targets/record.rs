#![no_main]

use censtore::{StatisticalRecord, TableSchema};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for schema in [
        TableSchema::cas001(),
        TableSchema::cas003(),
        TableSchema::cas044(),
        TableSchema::geometry(),
    ] {
        let mut slice = data;
        if let Ok(record) = StatisticalRecord::decode_binary(&schema, &mut slice) {
            let mut buf = Vec::with_capacity(schema.size_in_bytes());
            let _ = record.encode_binary(&mut buf);
        }

        let text = String::from_utf8_lossy(data);
        let tokens: Vec<&str> = text.split(',').collect();
        let record = StatisticalRecord::from_tokens(&schema, 0, &tokens);
        let _ = record.to_csv_row(&schema);
    }
});
