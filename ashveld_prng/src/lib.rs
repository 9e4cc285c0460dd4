// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Hand-rolled with zero external dependencies, chosen for portability and to
// guarantee identical output across all platforms.
//
// This crate is the single source of randomness for the whole Ashveld
// project. A recorded match is only replayable if every random decision —
// combat rolls, hazard cell selection, initiative shuffles — draws from one
// seeded stream in one fixed order, so the engine threads a `MatchRng`
// handle through every subsystem instead of reaching for `rand` or OS
// entropy.
//
// **Critical constraint: determinism.** Every method on `MatchRng` must
// produce identical output given the same prior state, regardless of
// platform, compiler version, or optimization level. The match engine is
// all-integer; this crate deliberately exposes no floating-point sampling.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG — the project's sole source of randomness.
///
/// One `MatchRng` is owned by each running match, seeded at match start and
/// never consumed outside the engine's own call graph. Two instances created
/// with the same seed produce identical output sequences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRng {
    s: [u64; 4],
}

impl MatchRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a `u32` by taking the upper 32 bits of a `u64`.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        // Rejection sampling to avoid modulo bias.
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Delegates to `range_u64` for the actual sampling.
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Generate a uniform random `i32` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_i32(&mut self, low: i32, high: i32) -> i32 {
        assert!(low < high, "range_i32: low must be less than high");
        let span = (high as i64 - low as i64) as u64;
        low.wrapping_add(self.range_u64(0, span) as i32)
    }

    /// Return `true` with probability `numerator / denominator`.
    ///
    /// All-integer Bernoulli trial: `chance(1, 4)` is a 25% roll.
    /// `numerator <= 0` always returns false; `numerator >= denominator`
    /// always returns true. Panics if `denominator <= 0`.
    pub fn chance(&mut self, numerator: i32, denominator: i32) -> bool {
        assert!(denominator > 0, "chance: denominator must be positive");
        if numerator <= 0 {
            return false;
        }
        if numerator >= denominator {
            return true;
        }
        self.range_u64(0, denominator as u64) < numerator as u64
    }

    /// Return `true` with probability `percent / 100`.
    pub fn percent(&mut self, percent: i32) -> bool {
        self.chance(percent, 100)
    }

    /// Pick a uniformly random index into a slice of the given length.
    ///
    /// Panics if `len == 0`.
    pub fn pick(&mut self, len: usize) -> usize {
        self.range_usize(0, len)
    }

    /// Shuffle a slice in place (Fisher–Yates).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.range_usize(0, i + 1);
            items.swap(i, j);
        }
    }
}

/// SplitMix64 — used only for seeding xoshiro256++ from a single `u64`.
///
/// The standard recommendation from the xoshiro authors for expanding a
/// small seed into a larger state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
