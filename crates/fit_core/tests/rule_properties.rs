//! Rule-coverage properties for the sizing rule
//!
//! Any change to curve or tolerance constants must keep these passing.

use fitcheck_core::{FitLabel, FitRequest, RuleEngine, RuleTable, HIP_OVERRIDE_RATIO};
use proptest::prelude::*;

const CATEGORIES: [&str; 5] = ["dresses", "tops", "bottoms", "outerwear", "swimwear"];

fn engine() -> RuleEngine {
    RuleEngine::new(RuleTable::default()).expect("built-in table is valid")
}

proptest! {
    #[test]
    fn classify_matches_threshold_rule(
        size in 0u32..=18,
        waist in 30.0f64..180.0,
        cat in 0usize..CATEGORIES.len(),
    ) {
        let engine = engine();
        let category = CATEGORIES[cat];
        let diff = waist - engine.standard_waist(size);
        let tolerance = engine.tolerance(category);
        let lock_floor = engine.table().tolerances.lock_floor;

        let expected = if diff > tolerance {
            FitLabel::Small
        } else if diff < -tolerance && size > lock_floor {
            FitLabel::Large
        } else {
            FitLabel::Fit
        };
        prop_assert_eq!(engine.classify(size, category, waist), expected);
    }

    #[test]
    fn smallest_sizes_never_large(
        size in 0u32..=1,
        waist in 0.0f64..200.0,
        cat in 0usize..CATEGORIES.len(),
    ) {
        prop_assert_ne!(engine().classify(size, CATEGORIES[cat], waist), FitLabel::Large);
    }

    #[test]
    fn hip_override_applies_whenever_waist_known(
        waist in 0.1f64..200.0,
        hips in proptest::option::of(0.0f64..300.0),
    ) {
        let request = FitRequest { waist: Some(waist), hips, ..FitRequest::default() };
        let resolved = request.resolve();
        prop_assert!((resolved.hips - waist * HIP_OVERRIDE_RATIO).abs() < 1e-9);
    }

    #[test]
    fn standard_waist_strictly_increasing(size in 0u32..100) {
        let engine = engine();
        prop_assert!(engine.standard_waist(size + 1) > engine.standard_waist(size));
    }
}

#[test]
fn reference_scenarios() {
    let engine = engine();
    let cases = [
        (3, "bottoms", 78.0, FitLabel::Fit),
        (4, "bottoms", 78.0, FitLabel::Large),
        (0, "outerwear", 67.0, FitLabel::Fit),
        (0, "bottoms", 66.0, FitLabel::Small),
        (0, "dresses", 60.0, FitLabel::Fit),
        (0, "dresses", 78.0, FitLabel::Small),
        (1, "dresses", 78.0, FitLabel::Small),
        (3, "dresses", 78.0, FitLabel::Fit),
        (4, "dresses", 78.0, FitLabel::Fit),
        (5, "dresses", 78.0, FitLabel::Large),
    ];
    for (size, category, waist, expected) in cases {
        assert_eq!(
            engine.classify(size, category, waist),
            expected,
            "size {size} {category} waist {waist}"
        );
    }
}

#[test]
fn scenario_five_hip_override() {
    let request: FitRequest =
        serde_json::from_str(r#"{"waist": 90, "hips": 50, "size": 4, "category": "bottoms"}"#)
            .unwrap();
    let resolved = request.resolve();
    assert!((resolved.hips - 126.0).abs() < 1e-9);
    assert_eq!(resolved.size, 4);
    assert_eq!(resolved.category, "bottoms");
}
