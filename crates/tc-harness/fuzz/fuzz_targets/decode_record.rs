#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::value::RawValue;
use tc_core::{CaseValue, decode_sequence, encode_sequence};

tc_core::case_record! {
    #[derive(Debug, Clone, PartialEq)]
    struct Job {
        name: String,
        weight: Option<f64>,
        deps: Vec<u32>,
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(raws) = serde_json::from_slice::<Vec<Box<RawValue>>>(data) else {
        return;
    };
    let descs = vec![Job::describe(); raws.len()];
    let Ok(values) = decode_sequence(&raws, &descs) else {
        return;
    };

    // Anything that decodes must re-encode and decode to the same values.
    let bytes = encode_sequence(&values).expect("decoded values are encodable");
    let again: Vec<Box<RawValue>> = serde_json::from_slice(&bytes).expect("encoder emits json");
    let round = decode_sequence(&again, &descs).expect("re-decodes");
    assert_eq!(round, values);
    for value in values {
        let _ = Job::from_value(value);
    }
});
