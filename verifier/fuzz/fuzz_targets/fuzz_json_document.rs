#![no_main]

use libfuzzer_sys::fuzz_target;
use verifier::{PackageDescr, RuleDescr, Verifier};

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    let mut verifier = Verifier::new();
    let _ = verifier.add_package(&PackageDescr::new("base").with_rule(RuleDescr::new("seed")));
    let Ok(before) = verifier.data().to_json() else {
        return;
    };

    if verifier.add_json(json).is_err() {
        // A rejected document leaves no partial state behind
        if let Ok(after) = verifier.data().to_json() {
            assert_eq!(before, after);
        }
    }
});
