//! Fuzz target for project manifest parsing and merging.
//!
//! Any manifest that parses must merge with itself and serialize back.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb3_bundle::ProjectManifest;

fuzz_target!(|data: &[u8]| {
    let Ok(manifest) = ProjectManifest::parse(data) else {
        return;
    };
    let merged = sb3_core::merge(manifest.clone(), manifest);
    let _ = merged.to_json_pretty();
});
