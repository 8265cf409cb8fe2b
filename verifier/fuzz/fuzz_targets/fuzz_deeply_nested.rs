#![no_main]

use libfuzzer_sys::fuzz_target;
use verifier::{Descr, PackageDescr, PatternDescr, RestrictionDescr, RuleDescr, Verifier};

fuzz_target!(|shape: Vec<u8>| {
    let mut verifier = Verifier::new();

    let leaf = Descr::pattern(PatternDescr::new("Leaf").with_constraints(vec![
        Descr::constraint("x", vec![RestrictionDescr::literal("==", "1")]),
    ]));
    let mut descr = leaf.clone();
    for step in shape.iter().take(200) {
        descr = match step % 5 {
            0 => Descr::and(vec![descr]),
            1 => Descr::or(vec![descr, leaf.clone()]),
            2 => Descr::not(vec![descr]),
            3 => Descr::exists(vec![descr]),
            _ => Descr::forall(vec![descr]),
        };
    }

    let package = PackageDescr::new("fuzz").with_rule(RuleDescr::new("nested").with_lhs(vec![descr]));
    let _ = verifier.add_package(&package);
});
