//! Typed binary fixed-point families.
//!
//! Three conventions show up throughout the engine: Q64.64 for compact
//! general-purpose ratios, Q64.96 for sqrt prices (bounded to 160 bits),
//! and Q128.128 for maximum-precision intermediates such as fee growth.
//! The newtypes keep the conventions from being mixed up silently; all
//! multiplication and division routes through [`mul_div`] so precision is
//! only lost at the final rounding step.

use crate::error::MathError;
use crate::math::math_helpers::mul_div;
use crate::{Q128, Q96, U160_MAX};
use alloy_primitives::U256;

/// Q64.64: 64 integer bits, 64 fractional bits, backed by `u128`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Q64x64(u128);

/// Q64.96: the sqrt-price convention. Backed by `U256` but bounded to
/// 160 bits, matching the range of valid pool prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Q64x96(U256);

/// Q128.128: full-width intermediates, e.g. fee growth per unit liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Q128x128(U256);

const Q64: u128 = 1 << 64;

impl Q64x64 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(Q64);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u128 {
        self.0
    }

    pub const fn from_int(x: u64) -> Self {
        Self((x as u128) << 64)
    }

    /// Integer part, discarding the fraction.
    pub const fn truncate(self) -> u64 {
        (self.0 >> 64) as u64
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(MathError::Underflow)
    }

    pub fn mul(self, rhs: Self) -> Result<Self, MathError> {
        let wide = mul_div(U256::from(self.0), U256::from(rhs.0), U256::from(Q64))?;
        u128::try_from(wide).map(Self).map_err(|_| MathError::Overflow)
    }

    pub fn div(self, rhs: Self) -> Result<Self, MathError> {
        let wide = mul_div(U256::from(self.0), U256::from(Q64), U256::from(rhs.0))?;
        u128::try_from(wide).map(Self).map_err(|_| MathError::Overflow)
    }

    /// Floor square root: `sqrt(x)` in Q64.64. Always fits.
    pub fn sqrt(self) -> Self {
        let r = isqrt(U256::from(self.0) << 64usize);
        // isqrt(x << 64) < 2^96 for x < 2^128
        Self(r.to::<u128>())
    }

    /// `1 / x` in Q64.64. Errors on zero and when `x < 2^-64`.
    pub fn recip(self) -> Result<Self, MathError> {
        if self.0 == 0 {
            return Err(MathError::DivisionByZero);
        }
        let wide = (U256::ONE << 128usize) / U256::from(self.0);
        u128::try_from(wide).map(Self).map_err(|_| MathError::Overflow)
    }

    /// Widen into Q64.96 (exact).
    pub fn to_q64x96(self) -> Q64x96 {
        Q64x96(U256::from(self.0) << 32usize)
    }

    /// Widen into Q128.128 (exact).
    pub fn to_q128x128(self) -> Q128x128 {
        Q128x128(U256::from(self.0) << 64usize)
    }
}

impl Q64x96 {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const ONE: Self = Self(Q96);

    pub fn from_raw(raw: U256) -> Result<Self, MathError> {
        if raw > U160_MAX {
            return Err(MathError::OutOfBounds);
        }
        Ok(Self(raw))
    }

    pub const fn into_raw(self) -> U256 {
        self.0
    }

    pub fn from_int(x: u64) -> Self {
        Self(U256::from(x) << 96usize)
    }

    pub fn truncate(self) -> u64 {
        (self.0 >> 96usize).to::<u64>()
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        let sum = self.0 + rhs.0;
        if sum > U160_MAX {
            return Err(MathError::Overflow);
        }
        Ok(Self(sum))
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(MathError::Underflow)
    }

    pub fn mul(self, rhs: Self) -> Result<Self, MathError> {
        let wide = mul_div(self.0, rhs.0, Q96)?;
        if wide > U160_MAX {
            return Err(MathError::Overflow);
        }
        Ok(Self(wide))
    }

    pub fn div(self, rhs: Self) -> Result<Self, MathError> {
        let wide = mul_div(self.0, Q96, rhs.0)?;
        if wide > U160_MAX {
            return Err(MathError::Overflow);
        }
        Ok(Self(wide))
    }

    /// Floor square root in Q64.96. The 160-bit bound keeps the shifted
    /// operand inside 256 bits, so no wide path is needed.
    pub fn sqrt(self) -> Self {
        Self(isqrt(self.0 << 96usize))
    }

    pub fn recip(self) -> Result<Self, MathError> {
        if self.0.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let wide = (U256::ONE << 192usize) / self.0;
        if wide > U160_MAX {
            return Err(MathError::Overflow);
        }
        Ok(Self(wide))
    }

    /// Narrow into Q64.64, truncating 32 fractional bits; errors if the
    /// integer part exceeds 64 bits.
    pub fn to_q64x64(self) -> Result<Q64x64, MathError> {
        u128::try_from(self.0 >> 32usize)
            .map(Q64x64)
            .map_err(|_| MathError::Overflow)
    }

    /// Widen into Q128.128 (exact).
    pub fn to_q128x128(self) -> Q128x128 {
        Q128x128(self.0 << 32usize)
    }
}

impl Q128x128 {
    pub const ZERO: Self = Self(U256::ZERO);
    pub const ONE: Self = Self(Q128);

    pub const fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> U256 {
        self.0
    }

    pub fn from_int(x: u128) -> Self {
        Self(U256::from(x) << 128usize)
    }

    pub fn truncate(self) -> u128 {
        (self.0 >> 128usize).to::<u128>()
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(MathError::Underflow)
    }

    pub fn mul(self, rhs: Self) -> Result<Self, MathError> {
        mul_div(self.0, rhs.0, Q128).map(Self)
    }

    pub fn div(self, rhs: Self) -> Result<Self, MathError> {
        mul_div(self.0, Q128, rhs.0).map(Self)
    }

    /// Floor square root in Q128.128.
    ///
    /// The shifted operand `raw << 128` needs up to 384 bits, so when the
    /// high half of `raw` is non-zero the result is refined by binary search
    /// between `isqrt(raw) << 64` and the next 64-bit step, testing each
    /// candidate through the wide `mul_div` path to keep exact floor
    /// semantics.
    pub fn sqrt(self) -> Self {
        if (self.0 >> 128usize).is_zero() {
            return Self(isqrt(self.0 << 128usize));
        }

        let mut lo = isqrt(self.0) << 64usize;
        let mut hi = lo + (U256::ONE << 64usize);
        // Invariant: lo^2 <= raw << 128 < hi^2. mul_div cannot fail here:
        // mid < 2^192, so mid^2 / 2^128 < 2^256.
        while hi - lo > U256::ONE {
            let mid = (lo + hi) >> 1usize;
            let sq = match mul_div(mid, mid, Q128) {
                Ok(v) => v,
                Err(_) => {
                    hi = mid;
                    continue;
                }
            };
            let rem = mid.mul_mod(mid, Q128);
            if sq < self.0 || (sq == self.0 && rem.is_zero()) {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Self(lo)
    }

    /// `1 / x` in Q128.128, i.e. `floor(2^256 / raw)`.
    pub fn recip(self) -> Result<Self, MathError> {
        if self.0.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let (q, r) = U256::MAX.div_rem(self.0);
        // 2^256 = (2^256 - 1) + 1; bump the quotient when raw divides evenly.
        if r == self.0 - U256::ONE {
            q.checked_add(U256::ONE).map(Self).ok_or(MathError::Overflow)
        } else {
            Ok(Self(q))
        }
    }

    pub fn to_q64x64(self) -> Result<Q64x64, MathError> {
        u128::try_from(self.0 >> 64usize)
            .map(Q64x64)
            .map_err(|_| MathError::Overflow)
    }

    pub fn to_q64x96(self) -> Result<Q64x96, MathError> {
        let raw = self.0 >> 32usize;
        if raw > U160_MAX {
            return Err(MathError::Overflow);
        }
        Ok(Q64x96(raw))
    }
}

/// Floor integer square root via Newton's method. The seed `2^ceil(b/2)`
/// overestimates, so the iteration decreases monotonically to the floor.
pub(crate) fn isqrt(x: U256) -> U256 {
    if x <= U256::ONE {
        return x;
    }
    let bits = 256 - x.leading_zeros();
    let mut r = U256::ONE << ((bits + 1) / 2);
    loop {
        let next = (r + x / r) >> 1usize;
        if next >= r {
            return r;
        }
        r = next;
    }
}
