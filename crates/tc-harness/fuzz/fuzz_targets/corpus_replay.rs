#![no_main]

use libfuzzer_sys::fuzz_target;
use std::fs;
use tc_harness::{HarnessConfig, Solution, verify_corpus};

fuzz_target!(|data: &[u8]| {
    let Ok(tmp_dir) = tempfile::tempdir() else {
        return;
    };
    let config = HarnessConfig::with_corpus_root(tmp_dir.path());

    let split = data.iter().position(|&byte| byte == b'\n').unwrap_or(data.len());
    let (input, output) = data.split_at(split);
    let output = output.get(1..).unwrap_or_default();
    if fs::write(tmp_dir.path().join("tc_0.in"), input).is_err()
        || fs::write(tmp_dir.path().join("tc_0.out"), output).is_err()
    {
        return;
    }

    let candidate = Solution::new("join", |parts: Vec<String>, sep: String| parts.join(&sep));
    let _ = verify_corpus(&config, &candidate);
});
