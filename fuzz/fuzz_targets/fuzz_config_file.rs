//! Fuzz target for TOML config parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use sb3_core::config::MergeConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(config) = toml::from_str::<MergeConfig>(text) {
            let _ = config.validate();
        }
    }
});
