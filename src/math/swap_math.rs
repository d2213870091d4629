use crate::MAX_FEE_PIPS;
use crate::U256_E6;
use crate::error::Error;
use crate::math::math_helpers::{mul_div, mul_div_rounding_up};
use crate::math::sqrt_price_math::{
    get_amount_0_delta_base, get_amount_1_delta_base, get_next_sqrt_price_from_input,
    get_next_sqrt_price_from_output,
};
use alloy_primitives::{I256, U256};

/// Advances the price by at most one step of a swap.
///
/// Moves from `sqrt_ratio_current_x96` toward `sqrt_ratio_target_x96`
/// (the nearer of the next initialized tick boundary and the caller's
/// price limit), consuming up to `amount_remaining`: positive means exact
/// input (fee-inclusive), negative means exact output. `fee_pips` is the
/// fee in hundredths of a bip.
///
/// Returns `(sqrt_ratio_next, amount_in, amount_out, fee_amount)`. The
/// target is never overshot; with zero liquidity the price jumps straight
/// to the target and all amounts are zero.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: u128,
    amount_remaining: I256,
    fee_pips: u32,
) -> Result<(U256, U256, U256, U256), Error> {
    let zero_for_one = sqrt_ratio_current_x96 >= sqrt_ratio_target_x96;
    let exact_in = !amount_remaining.is_negative();

    let mut amount_in = U256::ZERO;
    let mut amount_out = U256::ZERO;

    let sqrt_ratio_next_x96 = if exact_in {
        let amount_remaining_less_fee = mul_div(
            amount_remaining.into_raw(),
            U256::from(MAX_FEE_PIPS - fee_pips),
            U256_E6,
        )?;
        amount_in = if zero_for_one {
            get_amount_0_delta_base(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?
        } else {
            get_amount_1_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                true,
            )?
        };
        if amount_remaining_less_fee >= amount_in {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_input(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining_less_fee,
                zero_for_one,
            )?
        }
    } else {
        amount_out = if zero_for_one {
            get_amount_1_delta_base(
                sqrt_ratio_target_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?
        } else {
            get_amount_0_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_target_x96,
                liquidity,
                false,
            )?
        };
        if amount_remaining.unsigned_abs() >= amount_out {
            sqrt_ratio_target_x96
        } else {
            get_next_sqrt_price_from_output(
                sqrt_ratio_current_x96,
                liquidity,
                amount_remaining.unsigned_abs(),
                zero_for_one,
            )?
        }
    };

    let max = sqrt_ratio_target_x96 == sqrt_ratio_next_x96;

    if zero_for_one {
        if !(max && exact_in) {
            amount_in = get_amount_0_delta_base(
                sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = get_amount_1_delta_base(
                sqrt_ratio_next_x96,
                sqrt_ratio_current_x96,
                liquidity,
                false,
            )?;
        }
    } else {
        if !(max && exact_in) {
            amount_in = get_amount_1_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_next_x96,
                liquidity,
                true,
            )?;
        }
        if !(max && !exact_in) {
            amount_out = get_amount_0_delta_base(
                sqrt_ratio_current_x96,
                sqrt_ratio_next_x96,
                liquidity,
                false,
            )?;
        }
    }

    // Exact-output never pays out more than requested.
    if !exact_in && amount_out > amount_remaining.unsigned_abs() {
        amount_out = amount_remaining.unsigned_abs();
    }

    let fee_amount = if exact_in && sqrt_ratio_next_x96 != sqrt_ratio_target_x96 {
        // Partial step: whatever the price move did not consume is the fee.
        amount_remaining.into_raw() - amount_in
    } else {
        mul_div_rounding_up(amount_in, U256::from(fee_pips), U256::from(MAX_FEE_PIPS - fee_pips))?
    };

    Ok((sqrt_ratio_next_x96, amount_in, amount_out, fee_amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::tick_math::get_sqrt_ratio_at_tick;

    const LIQUIDITY: u128 = 333850249;
    const FEE: u32 = 3000;

    fn prices() -> (U256, U256, U256) {
        (
            get_sqrt_ratio_at_tick(0).unwrap(),
            get_sqrt_ratio_at_tick(-60).unwrap(),
            get_sqrt_ratio_at_tick(60).unwrap(),
        )
    }

    #[test]
    fn exact_in_partial_step_zero_for_one() {
        let (current, target, _) = prices();
        let (next, amount_in, amount_out, fee) =
            compute_swap_step(current, target, LIQUIDITY, I256::try_from(1000).unwrap(), FEE)
                .unwrap();

        assert_eq!(next, U256::from(79227925910450593787583792970u128));
        assert_eq!(amount_in, U256::from(997u32));
        assert_eq!(amount_out, U256::from(996u32));
        assert_eq!(fee, U256::from(3u32));
        // input plus fee never exceeds what the caller offered
        assert!(amount_in + fee <= U256::from(1000u32));
        assert!(next > target && next < current);
    }

    #[test]
    fn exact_in_partial_step_one_for_zero() {
        let (current, _, target) = prices();
        let (next, amount_in, amount_out, fee) =
            compute_swap_step(current, target, LIQUIDITY, I256::try_from(1000).unwrap(), FEE)
                .unwrap();

        assert_eq!(next, U256::from(79228399118784667669872815866u128));
        assert_eq!(amount_in, U256::from(997u32));
        assert_eq!(amount_out, U256::from(996u32));
        assert_eq!(fee, U256::from(3u32));
        assert!(next < target && next > current);
    }

    #[test]
    fn exact_in_reaches_target() {
        let (current, target, _) = prices();
        let (next, amount_in, amount_out, fee) = compute_swap_step(
            current,
            target,
            LIQUIDITY,
            I256::try_from(1_000_000_000u64).unwrap(),
            FEE,
        )
        .unwrap();

        assert_eq!(next, target);
        assert_eq!(amount_in, U256::from(1003005u32));
        assert_eq!(amount_out, U256::from(999999u32));
        assert_eq!(fee, U256::from(3019u32));
    }

    #[test]
    fn exact_out_partial_step() {
        let (current, target, _) = prices();
        let (next, amount_in, amount_out, fee) =
            compute_swap_step(current, target, LIQUIDITY, I256::try_from(-500).unwrap(), FEE)
                .unwrap();

        assert_eq!(next, U256::from(79228043856029467946438200320u128));
        assert_eq!(amount_in, U256::from(501u32));
        assert_eq!(amount_out, U256::from(500u32));
        assert_eq!(fee, U256::from(2u32));
    }

    #[test]
    fn exact_out_never_overpays() {
        let (current, target, _) = prices();
        for requested in [1i64, 7, 499, 500, 100_000] {
            let (_, _, amount_out, _) = compute_swap_step(
                current,
                target,
                LIQUIDITY,
                I256::try_from(-requested).unwrap(),
                FEE,
            )
            .unwrap();
            assert!(amount_out <= U256::from(requested as u64));
        }
    }

    #[test]
    fn zero_liquidity_jumps_to_target() {
        let (current, target, _) = prices();
        let (next, amount_in, amount_out, fee) =
            compute_swap_step(current, target, 0, I256::try_from(1000).unwrap(), FEE).unwrap();

        assert_eq!(next, target);
        assert_eq!(amount_in, U256::ZERO);
        assert_eq!(amount_out, U256::ZERO);
        assert_eq!(fee, U256::ZERO);
    }

    #[test]
    fn never_overshoots_target() {
        let (current, target, _) = prices();
        for amount in [1i64, 100, 10_000, 1_000_000, i64::MAX] {
            let (next, ..) =
                compute_swap_step(current, target, LIQUIDITY, I256::try_from(amount).unwrap(), FEE)
                    .unwrap();
            assert!(next >= target);
            assert!(next <= current);
        }
    }

    #[test]
    fn zero_fee_charges_nothing_on_full_step() {
        let (current, target, _) = prices();
        let (next, amount_in, _, fee) = compute_swap_step(
            current,
            target,
            LIQUIDITY,
            I256::try_from(1_000_000_000u64).unwrap(),
            0,
        )
        .unwrap();
        assert_eq!(next, target);
        assert!(amount_in > U256::ZERO);
        assert_eq!(fee, U256::ZERO);
    }

    #[test]
    fn fee_is_entire_remainder_when_capped_by_input() {
        // amount so small the fee dominates: 1 unit in, 0.3% fee
        let (current, target, _) = prices();
        let (next, amount_in, _, fee) =
            compute_swap_step(current, target, LIQUIDITY, I256::ONE, FEE).unwrap();
        assert_eq!(amount_in + fee, U256::ONE);
        // the net input rounds to zero, so the price cannot move
        assert_eq!(next, current);
    }
}
