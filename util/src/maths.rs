//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Map a value from one range into another, saturating at the ends of the
/// target range.
pub fn lin_map_clamped<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    let lo = target_range.0.min(target_range.1);
    let hi = target_range.0.max(target_range.1);

    lin_map(source_range, target_range, value).max(lo).min(hi)
}

/// Wrap a value into the range `[min, max)` for a continuous (e.g. angular)
/// input.
///
/// For example with a range of `[-pi, pi)` an input of `3pi/2` becomes
/// `-pi/2`.
pub fn input_modulus<T>(value: T, min: T, max: T) -> T
where
    T: Float
{
    let modulus = max - min;

    // Shift to a zero based range, wrap, then shift back
    rem_euclid(value - min, modulus) + min
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
/// 
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}
