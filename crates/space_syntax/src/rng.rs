//! Explicit, seeded randomness ("Global mutable state"). No
//! analysis or agent ever touches a global RNG; every seeded surface
//! takes a `ReplayToken` (or an already-seeded `StdRng`) as a parameter.
//!
//! `ReplayToken` mixes a caller-supplied seed with an index (agent id,
//! release step, ...) via a SplitMix64-style finalizer so that two
//! different draws from the same seed never correlate, while the whole
//! stream stays reproducible end to end.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReplayToken {
    pub seed: u64,
    pub index: u64,
}

impl ReplayToken {
    pub fn new(seed: u64, index: u64) -> Self {
        Self { seed, index }
    }

    /// A token for the `i`-th draw from this token's stream, without
    /// disturbing the original (used to mint one sub-stream per agent
    /// from a single engine-level seed).
    pub fn derive(self, index: u64) -> Self {
        Self {
            seed: self.seed,
            index: self.index ^ index.wrapping_mul(0x9e3779b97f4a7c15),
        }
    }

    pub fn to_rng(self) -> StdRng {
        fn mix(mut x: u64) -> u64 {
            x ^= x >> 30;
            x = x.wrapping_mul(0xbf58476d1ce4e5b9);
            x ^= x >> 27;
            x = x.wrapping_mul(0x94d049bb133111eb);
            x ^ (x >> 31)
        }
        let k = mix(self.seed ^ mix(self.index.wrapping_add(0x9e3779b97f4a7c15)));
        StdRng::seed_from_u64(k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn same_token_yields_same_stream() {
        let mut a = ReplayToken::new(42, 7).to_rng();
        let mut b = ReplayToken::new(42, 7).to_rng();
        let xs: Vec<u32> = (0..8).map(|_| a.gen()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn distinct_indices_diverge() {
        let mut a = ReplayToken::new(42, 1).to_rng();
        let mut b = ReplayToken::new(42, 2).to_rng();
        let x: u64 = a.gen();
        let y: u64 = b.gen();
        assert_ne!(x, y);
    }

    #[test]
    fn derive_is_deterministic() {
        let base = ReplayToken::new(1, 0);
        assert_eq!(base.derive(5), base.derive(5));
        assert_ne!(base.derive(5), base.derive(6));
    }
}
