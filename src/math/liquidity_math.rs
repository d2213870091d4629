use crate::Q96;
use crate::error::{Error, MathError};
use crate::math::math_helpers::mul_div;
use crate::math::sqrt_price_math::{get_amount_0_delta_base, get_amount_1_delta_base};
use alloy_primitives::U256;

/// Applies a signed liquidity delta to an unsigned total, erroring instead
/// of wrapping. The single seam between signed position deltas and the
/// unsigned liquidity the pool tracks.
///
/// `i128::MIN` has no unsigned negation; `unsigned_abs` keeps that case
/// well-defined (it can only ever underflow, since `x <= u128::MAX / 2`).
pub fn add_delta(x: u128, y: i128) -> Result<u128, MathError> {
    if y < 0 {
        x.checked_sub(y.unsigned_abs()).ok_or(MathError::Underflow)
    } else {
        x.checked_add(y as u128).ok_or(MathError::Overflow)
    }
}

/// Liquidity purchasable with `amount_0` of token0 over `[sqrt_a, sqrt_b]`:
/// `amount0 * (sqrt_a * sqrt_b / Q96) / (sqrt_b - sqrt_a)`.
pub fn get_liquidity_for_amount_0(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    amount_0: U256,
) -> Result<u128, Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    let intermediate = mul_div(sqrt_ratio_a_x96, sqrt_ratio_b_x96, Q96)?;
    let liquidity = mul_div(amount_0, intermediate, sqrt_ratio_b_x96 - sqrt_ratio_a_x96)?;
    u128::try_from(liquidity).map_err(|_| MathError::Overflow.into())
}

/// Liquidity purchasable with `amount_1` of token1 over `[sqrt_a, sqrt_b]`:
/// `amount1 * Q96 / (sqrt_b - sqrt_a)`.
pub fn get_liquidity_for_amount_1(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    amount_1: U256,
) -> Result<u128, Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    let liquidity = mul_div(amount_1, Q96, sqrt_ratio_b_x96 - sqrt_ratio_a_x96)?;
    u128::try_from(liquidity).map_err(|_| MathError::Overflow.into())
}

/// The largest liquidity both token budgets can fund at the current price.
///
/// Below the range only token0 matters, above it only token1; inside, the
/// binding constraint is whichever side runs out first.
pub fn get_liquidity_for_amounts(
    sqrt_ratio_x96: U256,
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    amount_0: U256,
    amount_1: U256,
) -> Result<u128, Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    if sqrt_ratio_x96 <= sqrt_ratio_a_x96 {
        get_liquidity_for_amount_0(sqrt_ratio_a_x96, sqrt_ratio_b_x96, amount_0)
    } else if sqrt_ratio_x96 < sqrt_ratio_b_x96 {
        let liquidity_0 = get_liquidity_for_amount_0(sqrt_ratio_x96, sqrt_ratio_b_x96, amount_0)?;
        let liquidity_1 = get_liquidity_for_amount_1(sqrt_ratio_a_x96, sqrt_ratio_x96, amount_1)?;
        Ok(liquidity_0.min(liquidity_1))
    } else {
        get_liquidity_for_amount_1(sqrt_ratio_a_x96, sqrt_ratio_b_x96, amount_1)
    }
}

/// Token amounts represented by `liquidity` over `[sqrt_a, sqrt_b]` at the
/// current price. `round_up` is set when the pool is owed the amounts
/// (deposits) and cleared when it pays them out (withdrawals).
pub fn get_amounts_for_liquidity(
    sqrt_ratio_x96: U256,
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<(U256, U256), Error> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    if sqrt_ratio_x96 <= sqrt_ratio_a_x96 {
        let amount_0 =
            get_amount_0_delta_base(sqrt_ratio_a_x96, sqrt_ratio_b_x96, liquidity, round_up)?;
        Ok((amount_0, U256::ZERO))
    } else if sqrt_ratio_x96 < sqrt_ratio_b_x96 {
        let amount_0 =
            get_amount_0_delta_base(sqrt_ratio_x96, sqrt_ratio_b_x96, liquidity, round_up)?;
        let amount_1 =
            get_amount_1_delta_base(sqrt_ratio_a_x96, sqrt_ratio_x96, liquidity, round_up)?;
        Ok((amount_0, amount_1))
    } else {
        let amount_1 =
            get_amount_1_delta_base(sqrt_ratio_a_x96, sqrt_ratio_b_x96, liquidity, round_up)?;
        Ok((U256::ZERO, amount_1))
    }
}
