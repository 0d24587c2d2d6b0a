//! Fixed-point numeric types used by the simulation.
//!
//! Every non-integer gameplay quantity (HP, damage, range, speed, path
//! progress, relic multipliers) is a [`Fixed64`]. Floats only appear at the
//! definition boundary and are converted once.

use fixed::types::I32F32;

/// Q32.32. Arithmetic is bit-identical on every target.
pub type Fixed64 = I32F32;

/// Simulation time, counted from the start of the run.
pub type Ticks = u64;

/// Multiply an integer amount by a fixed-point factor, rounding down.
///
/// Negative products clamp to zero. Amounts past `i32::MAX` saturate first.
#[inline]
pub fn scale_floor(amount: u32, factor: Fixed64) -> u32 {
    let product = Fixed64::saturating_from_num(amount).saturating_mul(factor);
    if product <= Fixed64::ZERO {
        return 0;
    }
    product.floor().to_num::<i64>().clamp(0, u32::MAX as i64) as u32
}
