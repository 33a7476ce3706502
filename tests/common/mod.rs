// tests/common/mod.rs
#![allow(dead_code)]

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use smallerize::{Arm, Factor, Minimizer, MinimizerConfig, Participant, participant};

pub const SEED: u64 = 20_091_975;

pub fn factor_sex() -> Factor {
    Factor::new("Sex", ["Male", "Female"]).unwrap()
}

pub fn factor_age() -> Factor {
    Factor::new("Age", ["10-20", "20-30", "30+"]).unwrap()
}

pub fn arm_one() -> Arm {
    Arm::new("Treat1")
}

pub fn arm_two() -> Arm {
    Arm::new("Treat2")
}

pub fn seeded(config: MinimizerConfig) -> MinimizerConfig {
    MinimizerConfig { seed: Some(config.seed.unwrap_or(SEED)), ..config }
}

pub fn male() -> Participant {
    participant([("Sex", "Male")])
}

/// Sex only, Treat1 vs Treat2, nobody enrolled.
pub fn simple_minimizer(config: MinimizerConfig) -> Minimizer {
    Minimizer::new(factor_sex(), vec![arm_one(), arm_two()], seeded(config)).unwrap()
}

pub fn simple_minimizer_with_arms(arms: Vec<Arm>, config: MinimizerConfig) -> Minimizer {
    Minimizer::new(factor_sex(), arms, seeded(config)).unwrap()
}

/// Sex only; three males on the first arm and one on the second.
pub fn example_3to1(arms: Option<Vec<Arm>>, config: MinimizerConfig) -> Minimizer {
    let arms = arms.unwrap_or_else(|| vec![arm_one(), arm_two()]);
    let first = arms[0].name().to_string();
    let second = arms[1].name().to_string();
    let mut m = Minimizer::new(factor_sex(), arms, seeded(config)).unwrap();
    for arm in [&first, &first, &first, &second] {
        m.add_existing_participant(&male(), arm).unwrap();
    }
    m
}

pub fn fixture(name: &str) -> BufReader<File> {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name].iter().collect();
    BufReader::new(File::open(&path).unwrap())
}

/// Age and Sex factors loaded with `male_age_participants.csv`
/// (males 10:10, age 10-20 at 6:4).
pub fn male_age_minimizer(factors: Vec<Factor>, config: MinimizerConfig) -> Minimizer {
    let mut m = Minimizer::new(factors, vec![arm_one(), arm_two()], seeded(config)).unwrap();
    m.load_history(fixture("male_age_participants.csv")).unwrap();
    m
}

/// Three factors and three arms loaded with the Pocock & Simon (1975)
/// section 3.4 counts.
pub fn example_table_one() -> Minimizer {
    let factors = vec![
        Factor::new("Factor1", ["level1", "level2"]).unwrap(),
        Factor::new("Factor2", ["level1", "level2", "level3"]).unwrap(),
        Factor::new("Factor3", ["level1", "level2"]).unwrap(),
    ];
    let arms = vec![Arm::new("Arm1"), Arm::new("Arm2"), Arm::new("Arm3")];
    let config = MinimizerConfig {
        d_imbalance_method: smallerize::ImbalanceMethod::Range,
        preferred_p: Some(2.0 / 3.0),
        ..Default::default()
    };
    let mut m = Minimizer::new(factors, arms, seeded(config)).unwrap();
    m.load_history(fixture("ps1975_table1.csv")).unwrap();
    m
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
