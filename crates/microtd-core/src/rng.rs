//! Deterministic PRNG for every gameplay decision that needs randomness.
//!
//! Seeding runs the 64-bit seed through SplitMix64 four times to fill a
//! 256-bit xoshiro256** state, so small or sparse seeds still start from a
//! well-mixed state. Ranges and shuffles are built on [`SimRng::next_u64`]
//! and are bit-identical across platforms.

use std::ops::Range;

/// SplitMix64 step. Used only for seed expansion.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// xoshiro256** pseudo-random number generator.
///
/// Deterministic across platforms, critical for replay and golden-seed runs.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimRng {
    state: [u64; 4],
}

impl SimRng {
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let state = [
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
        ];
        Self { state }
    }

    /// Raw 64-bit draw. Every other draw is built on this one.
    pub fn next_u64(&mut self) -> u64 {
        let s = &mut self.state;
        let result = s[1].wrapping_mul(5).rotate_left(7).wrapping_mul(9);
        let t = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= t;
        s[3] = s[3].rotate_left(45);

        result
    }

    /// Uniform integer in the half-open `range`, by modulo reduction.
    ///
    /// The modulo bias is accepted: it is tiny for the small ranges the game
    /// uses and keeps the draw count fixed at one per call. An empty range
    /// returns `range.start` without consuming state.
    pub fn gen_range(&mut self, range: Range<usize>) -> usize {
        if range.start >= range.end {
            return range.start;
        }
        let span = (range.end - range.start) as u64;
        range.start + (self.next_u64() % span) as usize
    }

    /// In-place Fisher-Yates shuffle. Consumes `len - 1` draws.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.gen_range(0..i + 1);
            items.swap(i, j);
        }
    }

    /// Raw state words, fed into the run's state hash.
    pub fn state(&self) -> [u64; 4] {
        self.state
    }
}
