// tests/factor_arm.rs
use std::cell::RefCell;

use smallerize::mechanics::stoch;
use smallerize::{Arm, Factor, TrialDefinition};

mod common;
use common::*;

/* ──────────────────────────────────────────────────────────────────────────
Factor
────────────────────────────────────────────────────────────────────────── */

#[test]
fn factor_creation() {
    let age = factor_age();
    assert_eq!(age.name(), "Age");
    assert_eq!(age.levels(), ["10-20", "20-30", "30+"]);
    assert_eq!(age.weight(), 1.0);
}

#[test]
fn factor_needs_two_levels() {
    let err = Factor::new("Age", ["10-20"]).unwrap_err();
    assert!(err.to_string().contains("Factors must have 2 or more levels"), "{err}");
}

#[test]
fn factor_weight_must_be_positive() {
    for w in [-1.0, 0.0, f64::NAN, f64::INFINITY] {
        let err = Factor::weighted("Age", ["10-20", "20-30"], w).unwrap_err();
        assert!(err.to_string().contains("Factor weight must be a positive number"), "{err}");
    }
}

#[test]
fn factor_levels_must_be_distinct() {
    let err = Factor::new("Sex", ["Male", "Male"]).unwrap_err();
    assert!(err.to_string().contains("distinct"), "{err}");
}

#[test]
fn factor_display() {
    assert_eq!(factor_age().to_string(), "Factor(Age, levels=('10-20', '20-30', '30+'))");
}

#[test]
fn factor_with_weight_is_a_new_value() {
    let sex = factor_sex();
    let heavy = sex.with_weight(0.5).unwrap();
    assert_eq!(sex.weight(), 1.0);
    assert_eq!(heavy.weight(), 0.5);
    assert_eq!(heavy.levels(), sex.levels());
    assert!(sex.with_weight(-2.0).is_err());
}

#[test]
fn factor_random_levels() {
    let age = factor_age();
    let rng = RefCell::new(stoch::seeded(SEED));
    let single = age.get_random_level(&rng);
    assert!(age.levels().iter().any(|l| l == single));

    let multiple = age.get_random_level_multiple(200, &rng);
    assert_eq!(multiple.len(), 200);
    assert!(multiple.iter().all(|l| age.level_index(l).is_some()));
    // all three levels show up in 200 uniform draws
    for level in age.levels() {
        assert!(multiple.contains(&level.as_str()), "{level} never drawn");
    }
}

/* ──────────────────────────────────────────────────────────────────────────
Arm
────────────────────────────────────────────────────────────────────────── */

#[test]
fn arm_creation_defaults_to_ratio_one() {
    let arm = arm_one();
    assert_eq!(arm.name(), "Treat1");
    assert_eq!(arm.allocation_ratio(), 1);
}

#[test]
fn arm_display() {
    assert_eq!(arm_one().to_string(), "Arm(Treat1, allocation_ratio=1)");
}

#[test]
fn arm_other_allocation_ratio() {
    let arm = Arm::with_ratio("Treat2", 2).unwrap();
    assert_eq!(arm.allocation_ratio(), 2);
    assert_eq!(Arm::from_ratio("Treat2", 3.0).unwrap().allocation_ratio(), 3);
}

#[test]
fn arm_rejects_non_integer_ratio() {
    for r in [0.5, 1.5, 0.0, -2.0, f64::NAN] {
        let err = Arm::from_ratio("Treat1", r).unwrap_err();
        assert!(err.to_string().contains("Allocation ratio must be an integer."), "{err}");
    }
    assert!(Arm::with_ratio("Treat1", 0).is_err());
}

/* ──────────────────────────────────────────────────────────────────────────
Trial definitions validate factors and arms on the way in
────────────────────────────────────────────────────────────────────────── */

#[test]
fn definition_rejects_fractional_ratio() {
    let json = r#"{
        "factors": [{"name": "Sex", "levels": ["Male", "Female"]}],
        "arms": [{"name": "A", "allocation_ratio": 0.5}, {"name": "B"}]
    }"#;
    let err = TrialDefinition::from_json(json).unwrap_err();
    assert!(err.to_string().contains("Allocation ratio must be an integer."), "{err}");
}

#[test]
fn definition_rejects_single_level_factor() {
    let json = r#"{
        "factors": [{"name": "Sex", "levels": ["Male"]}],
        "arms": [{"name": "A"}, {"name": "B"}]
    }"#;
    let err = TrialDefinition::from_json(json).unwrap_err();
    assert!(err.to_string().contains("Factors must have 2 or more levels"), "{err}");
}
