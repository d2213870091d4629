//! Liquidity positions and their transferable ownership handles.

use crate::Q128;
use crate::error::{Error, PositionError, StateError};
use crate::math::liquidity_math::add_delta;
use crate::math::math_helpers::mul_div;
use alloy_primitives::{Address, U256};
use std::fmt;

/// Pool-local identifier, handed out from a monotone counter at mint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionId(pub(crate) u64);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position#{}", self.0)
    }
}

/// Accounting state of one liquidity position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionData {
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
    /// Fee growth inside the range as of the last update. Wrap-around
    /// snapshot of the pool's counters.
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    /// Fees (and withdrawn principal) claimable via collect.
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

/// Ownership record for a position. Mutating pool calls check the caller
/// against `owner`; transfer reassigns it without touching the accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionHandle {
    pub id: PositionId,
    pub owner: Address,
}

impl PositionHandle {
    pub fn authorize(&self, caller: Address) -> Result<(), PositionError> {
        if self.owner != caller {
            return Err(PositionError::NotOwner);
        }
        Ok(())
    }
}

impl PositionData {
    pub fn new(tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            tick_lower,
            tick_upper,
            liquidity: 0,
            fee_growth_inside_0_last_x128: U256::ZERO,
            fee_growth_inside_1_last_x128: U256::ZERO,
            tokens_owed_0: 0,
            tokens_owed_1: 0,
        }
    }

    /// Folds a liquidity delta and fresh fee-growth-inside snapshots into
    /// the position: fees earned since the last snapshot are credited to
    /// `tokens_owed_*`, then the snapshot advances.
    ///
    /// A zero-delta update ("poke") is only valid on a live position.
    pub fn update(
        &mut self,
        liquidity_delta: i128,
        fee_growth_inside_0_x128: U256,
        fee_growth_inside_1_x128: U256,
    ) -> Result<(), Error> {
        let liquidity_next = if liquidity_delta == 0 {
            if self.liquidity == 0 {
                return Err(StateError::LiquidityIsZero.into());
            }
            self.liquidity
        } else {
            add_delta(self.liquidity, liquidity_delta)?
        };

        let owed_0 = mul_div(
            fee_growth_inside_0_x128.wrapping_sub(self.fee_growth_inside_0_last_x128),
            U256::from(self.liquidity),
            Q128,
        )?;
        let owed_1 = mul_div(
            fee_growth_inside_1_x128.wrapping_sub(self.fee_growth_inside_1_last_x128),
            U256::from(self.liquidity),
            Q128,
        )?;

        self.liquidity = liquidity_next;
        self.fee_growth_inside_0_last_x128 = fee_growth_inside_0_x128;
        self.fee_growth_inside_1_last_x128 = fee_growth_inside_1_x128;
        // Owed counters wrap like the fee counters they derive from; stale
        // positions must collect before the truncation matters.
        self.tokens_owed_0 = self.tokens_owed_0.wrapping_add(truncate_to_u128(owed_0));
        self.tokens_owed_1 = self.tokens_owed_1.wrapping_add(truncate_to_u128(owed_1));
        Ok(())
    }
}

fn truncate_to_u128(x: U256) -> u128 {
    (x & U256::from(u128::MAX)).to::<u128>()
}
