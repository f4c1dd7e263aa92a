//! Fuzz target for `.sb3` archive reading.
//!
//! Source archives are untrusted input: opening, extracting and parsing the
//! manifest must return errors, never panic or escape the staging root.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb3_bundle::ArchiveReader;

fuzz_target!(|data: &[u8]| {
    let Ok(reader) = ArchiveReader::from_bytes(data.to_vec()) else {
        return;
    };
    if let Ok(source) = reader.extract() {
        for (path, _) in source.assets() {
            assert!(!path.starts_with('/'));
            assert!(!path.split('/').any(|part| part == ".."));
        }
        let _ = source.parse_manifest();
    }
});
