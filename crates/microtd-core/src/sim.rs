//! Simulation clock, frame-to-tick accumulation, and state hashing.
//!
//! The clock only ever moves by whole ticks. Converting wall-clock frame
//! time into a tick count is the job of [`TickAccumulator`], which the
//! driving application owns; the core never sees a duration.

use std::time::Duration;

use crate::fixed::{Fixed64, Ticks};

/// Fixed simulation rate.
pub const TICKS_PER_SECOND: u32 = 60;

// ---------------------------------------------------------------------------
// Simulation clock
// ---------------------------------------------------------------------------

/// Integer tick counter with a fixed tick duration.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimulationClock {
    tick: Ticks,
}

impl SimulationClock {
    /// Create a clock at tick 0.
    pub fn new() -> Self {
        Self { tick: 0 }
    }

    /// Current tick index.
    pub fn current_tick(&self) -> Ticks {
        self.tick
    }

    /// Advance by exactly one tick.
    pub fn step(&mut self) {
        self.tick += 1;
    }

    /// Duration of one tick as a fraction of a second.
    pub fn tick_fraction() -> Fixed64 {
        Fixed64::ONE / Fixed64::from_num(TICKS_PER_SECOND)
    }

    /// Elapsed in-game time in whole milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.tick * 1000 / TICKS_PER_SECOND as u64
    }
}

// ---------------------------------------------------------------------------
// Tick accumulator
// ---------------------------------------------------------------------------

/// Converts variable frame durations into a whole number of ticks to run.
///
/// The remainder carries over between frames. If a frame would require more
/// than `max_steps` ticks (a stall, a breakpoint), the whole-tick backlog is
/// dropped instead of fast-forwarding the game; the sub-tick remainder is
/// kept. `max_steps` is at least 1.
#[derive(Debug, Clone)]
pub struct TickAccumulator {
    tick_duration: Duration,
    carry: Duration,
    max_steps: u32,
}

impl TickAccumulator {
    pub fn new(max_steps: u32) -> Self {
        Self {
            tick_duration: Duration::from_nanos(1_000_000_000 / TICKS_PER_SECOND as u64),
            carry: Duration::ZERO,
            max_steps: max_steps.max(1),
        }
    }

    /// Add one frame's elapsed time and return how many ticks to run.
    pub fn accumulate(&mut self, elapsed: Duration) -> u32 {
        self.carry = self.carry.saturating_add(elapsed);
        let tick_nanos = self.tick_duration.as_nanos();
        let carry_nanos = self.carry.as_nanos();
        let due = carry_nanos / tick_nanos;
        let remainder = carry_nanos % tick_nanos;
        // remainder < tick_nanos, which fits in u64.
        self.carry = Duration::from_nanos(remainder as u64);
        due.min(self.max_steps as u128) as u32
    }

    /// Time carried over to the next frame.
    pub fn carry(&self) -> Duration {
        self.carry
    }
}

impl Default for TickAccumulator {
    fn default() -> Self {
        Self::new(5)
    }
}

// ---------------------------------------------------------------------------
// State hash
// ---------------------------------------------------------------------------

/// Running FNV-1a digest over a run's observable state. Two runs that
/// agree here agreed on every field fed in, in the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write(&[v as u8]);
    }

    /// Length-prefixed, so `("ab", "c")` and `("a", "bc")` differ.
    pub fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.write(s.as_bytes());
    }

    pub fn write_fixed64(&mut self, v: Fixed64) {
        self.write(&v.to_bits().to_le_bytes());
    }

    pub fn finish(self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}
