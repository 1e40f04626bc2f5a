//! Deterministic test patterns.
//!
//! Seeded pseudo-random data for exercising round-trips: the same seed
//! always produces the same bytes, so a failing case can be replayed.

use rand::{RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

pub fn bytes(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill_bytes(&mut out);
    out
}

pub fn words(seed: u64, count: usize) -> Vec<u32> {
    let mut rng = Xoshiro256Plus::seed_from_u64(seed);
    (0..count).map(|_| rng.next_u32()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(bytes(7, 64), bytes(7, 64));
        assert_eq!(words(7, 16), words(7, 16));
        assert_ne!(bytes(7, 64), bytes(8, 64));
    }
}
