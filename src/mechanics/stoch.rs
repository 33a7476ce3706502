/// Stochastic mechanics: RNG construction, uniform and categorical draws, shuffles.
/// Note: uses `bevy_prng::WyRand` behind `RefCell` so read-only trial queries
/// (ranking with random tie-breaks) can still advance RNG state.
use bevy_prng::WyRand;
use rand_core::{RngCore, SeedableRng};
use std::cell::RefCell;

/// WyRand seeded from a `u64`, reproducible across runs.
#[inline]
pub fn seeded(seed: u64) -> WyRand {
    WyRand::from_seed(seed.to_le_bytes())
}

/// WyRand seeded from the operating system.
#[inline]
pub fn from_entropy() -> WyRand {
    WyRand::from_os_rng()
}

/// Uniform draw in [0, 1) with 53 bits of precision.
#[inline]
pub fn uniform01(rng: &RefCell<WyRand>) -> f64 {
    let mut r = rng.borrow_mut();
    let u = ((r.next_u64() >> 11) as f64) / ((1u64 << 53) as f64);
    drop(r);
    u
}

/// Uniform index in `0..n`. `n` must be non-zero.
#[inline]
pub fn uniform_index(rng: &RefCell<WyRand>, n: usize) -> usize {
    debug_assert!(n > 0);
    let i = (uniform01(rng) * n as f64) as usize;
    i.min(n - 1)
}

/// Categorical draw over non-negative weights (need not sum to 1).
/// Returns `None` when there is no positive mass to draw from.
pub fn categorical(rng: &RefCell<WyRand>, weights: &[f64]) -> Option<usize> {
    let total: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    if total <= 0.0 {
        return None;
    }
    let target = uniform01(rng) * total;
    let mut acc = 0.0;
    let mut last_positive = None;
    for (i, &w) in weights.iter().enumerate() {
        if !(w.is_finite() && w > 0.0) {
            continue;
        }
        acc += w;
        last_positive = Some(i);
        if target < acc {
            return Some(i);
        }
    }
    // float round-off can leave target == total
    last_positive
}

/// Fisher–Yates shuffle in place.
pub fn shuffle<T>(rng: &RefCell<WyRand>, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = uniform_index(rng, i + 1);
        items.swap(i, j);
    }
}
