//! Swap state machine.
//!
//! Swaps run in two phases: [`Pool::compute_swap`] walks the stepping loop
//! against `&self`, producing a [`SwapOutcome`] that captures every state
//! transition (final price/tick/liquidity, fee-growth counters, tick
//! crossings); commit replays the outcome onto the pool. An error anywhere
//! in the computation or in a wrapper's limit check leaves the pool
//! untouched.

use crate::Q128;
use crate::error::{Error, MathError, StateError, SwapError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_bitmap::next_initialized_tick_within_one_word;
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use crate::pool::state::Pool;
use alloy_primitives::{I256, U256};
use tracing::{debug, trace};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
}

#[derive(Copy, Clone, Debug)]
pub struct SwapParams {
    /// Swap direction: `true` for token0 -> token1, `false` for token1 -> token0.
    pub zero_for_one: bool,
    /// Signed amount being swapped. Positive means exact in (fee-inclusive),
    /// negative means exact out.
    pub amount_specified: I256,
    /// Q64.96 price the swap may not move past. `None` means the relevant
    /// range bound.
    pub sqrt_price_limit_x96: Option<U256>,
}

impl SwapParams {
    pub fn new(
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Self {
        Self {
            zero_for_one,
            amount_specified,
            sqrt_price_limit_x96,
        }
    }
}

/// Signed token deltas from the pool's perspective: positive amounts flow
/// into the pool, negative amounts flow out.
#[derive(Copy, Clone, Debug)]
pub struct SwapResult {
    pub amount_0_delta: I256,
    pub amount_1_delta: I256,
    pub fees_paid: U256,
}

/// A tick boundary crossed during the computation, with the fee-growth
/// globals as of the crossing. Replayed against the tick store on commit.
#[derive(Copy, Clone, Debug)]
struct TickCrossing {
    tick: i32,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
}

/// Everything a successful swap changes, staged before commit.
struct SwapOutcome {
    result: SwapResult,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    fee_growth_global_0_x128: U256,
    fee_growth_global_1_x128: U256,
    crossings: Vec<TickCrossing>,
}

// running state of the stepping loop
struct SwapState {
    amount_specified_remaining: I256,
    amount_calculated: I256,
    sqrt_price_x96: U256,
    tick: i32,
    liquidity: u128,
    fee_growth_global_input_x128: U256,
    swap_fee: U256,
}

#[derive(Default)]
struct StepComputations {
    sqrt_price_start_x96: U256,
    tick_next: i32,
    initialized: bool,
    sqrt_price_next_x96: U256,
    amount_in: U256,
    amount_out: U256,
    fee_amount: U256,
}

impl Pool {
    /// Executes a swap, moving the price until the specified amount is
    /// consumed or the price limit is reached. Exact-input swaps that run
    /// out of liquidity fill partially; use [`Pool::swap_exact_output`] or
    /// [`Pool::swap_exact_input`] for all-or-nothing semantics.
    pub fn swap(&mut self, params: SwapParams) -> Result<SwapResult, Error> {
        let outcome = self.compute_swap(params)?;
        self.apply_swap(outcome)
    }

    /// Swaps exactly `amount_in` of the input token, requiring at least
    /// `min_amount_out` of the other token back. Returns the output amount.
    pub fn swap_exact_input(
        &mut self,
        zero_for_one: bool,
        amount_in: u128,
        min_amount_out: u128,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<u128, Error> {
        let params = SwapParams::new(
            zero_for_one,
            I256::from_raw(U256::from(amount_in)),
            sqrt_price_limit_x96,
        );
        let outcome = self.compute_swap(params)?;

        let amount_out = output_amount(&outcome.result, zero_for_one)?;
        if amount_out < min_amount_out {
            return Err(SwapError::SlippageExceeded.into());
        }

        self.apply_swap(outcome)?;
        Ok(amount_out)
    }

    /// Swaps for exactly `amount_out` of the output token, paying at most
    /// `max_amount_in` (fee included). Partial fills are rejected. Returns
    /// the input amount actually paid.
    pub fn swap_exact_output(
        &mut self,
        zero_for_one: bool,
        amount_out: u128,
        max_amount_in: u128,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<u128, Error> {
        let params = SwapParams::new(
            zero_for_one,
            -I256::from_raw(U256::from(amount_out)),
            sqrt_price_limit_x96,
        );
        let outcome = self.compute_swap(params)?;

        if output_amount(&outcome.result, zero_for_one)? != amount_out {
            return Err(SwapError::InsufficientLiquidity.into());
        }
        let amount_in = input_amount(&outcome.result, zero_for_one)?;
        if amount_in > max_amount_in {
            return Err(SwapError::SlippageExceeded.into());
        }

        self.apply_swap(outcome)?;
        Ok(amount_in)
    }

    /// The stepping loop, run against immutable pool state.
    fn compute_swap(&self, params: SwapParams) -> Result<SwapOutcome, Error> {
        let amount_specified = params.amount_specified;
        if amount_specified.is_zero() {
            return Err(SwapError::AmountSpecifiedIsZero.into());
        }
        if self.liquidity == 0 {
            return Err(StateError::LiquidityIsZero.into());
        }

        let zero_for_one = params.zero_for_one;
        let sqrt_price_limit_x96 = params.sqrt_price_limit_x96.unwrap_or(if zero_for_one {
            MIN_SQRT_RATIO + U256::ONE
        } else {
            MAX_SQRT_RATIO - U256::ONE
        });

        if zero_for_one {
            if sqrt_price_limit_x96 >= self.slot0.sqrt_price_x96
                || sqrt_price_limit_x96 < MIN_SQRT_RATIO
            {
                return Err(SwapError::SqrtPriceLimitOutOfBounds.into());
            }
        } else if sqrt_price_limit_x96 <= self.slot0.sqrt_price_x96
            || sqrt_price_limit_x96 >= MAX_SQRT_RATIO
        {
            return Err(SwapError::SqrtPriceLimitOutOfBounds.into());
        }

        let exact_input = amount_specified.is_positive();

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: I256::ZERO,
            sqrt_price_x96: self.slot0.sqrt_price_x96,
            tick: self.slot0.tick,
            liquidity: self.liquidity,
            fee_growth_global_input_x128: if zero_for_one {
                self.fee_growth_global_0_x128
            } else {
                self.fee_growth_global_1_x128
            },
            swap_fee: U256::ZERO,
        };
        let mut crossings: Vec<TickCrossing> = Vec::new();

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..StepComputations::default()
            };

            (step.tick_next, step.initialized) = next_initialized_tick_within_one_word(
                &self.bitmap,
                state.tick,
                self.tick_spacing,
                zero_for_one,
            )?;

            step.tick_next = step.tick_next.clamp(MIN_TICK, MAX_TICK);
            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            let target = if zero_for_one {
                step.sqrt_price_next_x96.max(sqrt_price_limit_x96)
            } else {
                step.sqrt_price_next_x96.min(sqrt_price_limit_x96)
            };

            (
                state.sqrt_price_x96,
                step.amount_in,
                step.amount_out,
                step.fee_amount,
            ) = compute_swap_step(
                state.sqrt_price_x96,
                target,
                state.liquidity,
                state.amount_specified_remaining,
                self.fee_pips,
            )?;

            trace!(
                tick_next = step.tick_next,
                initialized = step.initialized,
                amount_in = %step.amount_in,
                amount_out = %step.amount_out,
                fee = %step.fee_amount,
                "swap step"
            );

            if exact_input {
                state.amount_specified_remaining -=
                    I256::from_raw(step.amount_in + step.fee_amount);
                state.amount_calculated -= I256::from_raw(step.amount_out);
            } else {
                state.amount_specified_remaining += I256::from_raw(step.amount_out);
                state.amount_calculated += I256::from_raw(step.amount_in + step.fee_amount);
            }
            state.swap_fee += step.fee_amount;

            // Fees are spread over the liquidity that earned them.
            if state.liquidity > 0 {
                state.fee_growth_global_input_x128 =
                    state.fee_growth_global_input_x128.wrapping_add(mul_div(
                        step.fee_amount,
                        Q128,
                        U256::from(state.liquidity),
                    )?);
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let (fg0, fg1) = if zero_for_one {
                        (
                            state.fee_growth_global_input_x128,
                            self.fee_growth_global_1_x128,
                        )
                    } else {
                        (
                            self.fee_growth_global_0_x128,
                            state.fee_growth_global_input_x128,
                        )
                    };
                    crossings.push(TickCrossing {
                        tick: step.tick_next,
                        fee_growth_global_0_x128: fg0,
                        fee_growth_global_1_x128: fg1,
                    });

                    let mut liquidity_net = self
                        .ticks
                        .get(step.tick_next)
                        .ok_or(StateError::LiquidityIsZero)?
                        .liquidity_net;
                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }
                    state.liquidity = add_delta(state.liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        let (amount_0, amount_1) = if zero_for_one == exact_input {
            (
                amount_specified - state.amount_specified_remaining,
                state.amount_calculated,
            )
        } else {
            (
                state.amount_calculated,
                amount_specified - state.amount_specified_remaining,
            )
        };

        let (fee_growth_global_0_x128, fee_growth_global_1_x128) = if zero_for_one {
            (
                state.fee_growth_global_input_x128,
                self.fee_growth_global_1_x128,
            )
        } else {
            (
                self.fee_growth_global_0_x128,
                state.fee_growth_global_input_x128,
            )
        };

        Ok(SwapOutcome {
            result: SwapResult {
                amount_0_delta: amount_0,
                amount_1_delta: amount_1,
                fees_paid: state.swap_fee,
            },
            sqrt_price_x96: state.sqrt_price_x96,
            tick: state.tick,
            liquidity: state.liquidity,
            fee_growth_global_0_x128,
            fee_growth_global_1_x128,
            crossings,
        })
    }

    /// Commits a staged outcome. The reserve arithmetic is validated before
    /// any field is written, so a failure here also leaves the pool intact.
    fn apply_swap(&mut self, outcome: SwapOutcome) -> Result<SwapResult, Error> {
        let reserve_0 = apply_reserve_delta(self.reserve_0, outcome.result.amount_0_delta)?;
        let reserve_1 = apply_reserve_delta(self.reserve_1, outcome.result.amount_1_delta)?;

        self.reserve_0 = reserve_0;
        self.reserve_1 = reserve_1;
        self.slot0 = Slot0 {
            sqrt_price_x96: outcome.sqrt_price_x96,
            tick: outcome.tick,
        };
        self.liquidity = outcome.liquidity;
        self.fee_growth_global_0_x128 = outcome.fee_growth_global_0_x128;
        self.fee_growth_global_1_x128 = outcome.fee_growth_global_1_x128;
        for crossing in &outcome.crossings {
            self.ticks.cross(
                crossing.tick,
                crossing.fee_growth_global_0_x128,
                crossing.fee_growth_global_1_x128,
            );
        }

        debug!(
            amount_0 = %outcome.result.amount_0_delta,
            amount_1 = %outcome.result.amount_1_delta,
            fees = %outcome.result.fees_paid,
            tick = self.slot0.tick,
            crossed = outcome.crossings.len(),
            "swap committed"
        );
        Ok(outcome.result)
    }
}

fn apply_reserve_delta(reserve: u128, delta: I256) -> Result<u128, Error> {
    if delta.is_negative() {
        let out = u128::try_from(delta.unsigned_abs()).map_err(|_| MathError::Overflow)?;
        reserve
            .checked_sub(out)
            .ok_or_else(|| StateError::InsufficientReserves.into())
    } else {
        let inflow = u128::try_from(delta.into_raw()).map_err(|_| MathError::Overflow)?;
        reserve
            .checked_add(inflow)
            .ok_or_else(|| MathError::Overflow.into())
    }
}

fn output_amount(result: &SwapResult, zero_for_one: bool) -> Result<u128, Error> {
    let delta = if zero_for_one {
        result.amount_1_delta
    } else {
        result.amount_0_delta
    };
    u128::try_from(delta.unsigned_abs()).map_err(|_| MathError::Overflow.into())
}

fn input_amount(result: &SwapResult, zero_for_one: bool) -> Result<u128, Error> {
    let delta = if zero_for_one {
        result.amount_0_delta
    } else {
        result.amount_1_delta
    };
    u128::try_from(delta.into_raw()).map_err(|_| MathError::Overflow.into())
}
