//! In-memory concentrated-liquidity pool with the full position lifecycle.

use crate::FastMap;
use crate::error::{Error, MathError, PositionError, StateError, SwapError};
use crate::math::fixed_point::{Q64x96, Q128x128};
use crate::math::liquidity_math::{add_delta, get_amounts_for_liquidity, get_liquidity_for_amounts};
use crate::math::tick_bitmap::flip_tick;
use crate::math::tick_math::{
    MAX_TICK, MIN_TICK, get_sqrt_ratio_at_tick, get_tick_at_sqrt_ratio, max_liquidity_per_tick,
};
use crate::pool::swap::Slot0;
use crate::position::{PositionData, PositionHandle, PositionId};
use crate::tick::TickStore;
use crate::MAX_FEE_PIPS;
use alloy_primitives::{Address, U256};
use tracing::debug;

/// What a mint produced: the new position and the amounts actually owed.
#[derive(Copy, Clone, Debug)]
pub struct MintReceipt {
    pub position_id: PositionId,
    pub liquidity: u128,
    pub amount_0: u128,
    pub amount_1: u128,
}

/// A concentrated-liquidity pool over a token0/token1 pair.
///
/// All mutating operations are atomic: they validate fully before writing,
/// so an `Err` return means the pool is exactly as it was. `&mut self`
/// receivers are the concurrency story; wrap the pool in a lock if it is
/// shared.
#[derive(Debug, Clone)]
pub struct Pool {
    pub fee_pips: u32,
    pub tick_spacing: i32,
    pub(crate) slot0: Slot0,
    pub(crate) liquidity: u128,
    pub(crate) fee_growth_global_0_x128: U256,
    pub(crate) fee_growth_global_1_x128: U256,
    pub(crate) reserve_0: u128,
    pub(crate) reserve_1: u128,
    pub(crate) max_liquidity_per_tick: u128,
    pub(crate) bitmap: FastMap<i16, U256>,
    pub(crate) ticks: TickStore,
    positions: FastMap<PositionId, PositionData>,
    handles: FastMap<PositionId, PositionHandle>,
    next_position_id: u64,
}

impl Pool {
    /// Creates a pool at an initial sqrt price. The starting tick is the
    /// greatest tick at or below the price.
    pub fn new(fee_pips: u32, tick_spacing: i32, sqrt_price_x96: U256) -> Result<Self, Error> {
        if fee_pips >= MAX_FEE_PIPS {
            return Err(StateError::FeeTooHigh.into());
        }
        if tick_spacing <= 0 {
            return Err(StateError::InvalidTickSpacing.into());
        }
        let tick = get_tick_at_sqrt_ratio(sqrt_price_x96)?;

        debug!(fee_pips, tick_spacing, tick, "pool created");
        Ok(Self {
            fee_pips,
            tick_spacing,
            slot0: Slot0 {
                sqrt_price_x96,
                tick,
            },
            liquidity: 0,
            fee_growth_global_0_x128: U256::ZERO,
            fee_growth_global_1_x128: U256::ZERO,
            reserve_0: 0,
            reserve_1: 0,
            max_liquidity_per_tick: max_liquidity_per_tick(tick_spacing),
            bitmap: FastMap::default(),
            ticks: TickStore::default(),
            positions: FastMap::default(),
            handles: FastMap::default(),
            next_position_id: 0,
        })
    }

    // ------------------------------------------------------------------
    // views

    pub fn slot0(&self) -> Slot0 {
        self.slot0
    }

    /// Liquidity currently in range.
    pub fn liquidity(&self) -> u128 {
        self.liquidity
    }

    pub fn get_reserves(&self) -> (u128, u128) {
        (self.reserve_0, self.reserve_1)
    }

    pub fn fee_growth_globals(&self) -> (U256, U256) {
        (self.fee_growth_global_0_x128, self.fee_growth_global_1_x128)
    }

    pub fn get_position_data(&self, position_id: PositionId) -> Result<&PositionData, Error> {
        self.positions
            .get(&position_id)
            .ok_or_else(|| PositionError::UnknownPosition.into())
    }

    pub fn get_position_owner(&self, position_id: PositionId) -> Result<Address, Error> {
        self.handles
            .get(&position_id)
            .map(|h| h.owner)
            .ok_or_else(|| PositionError::UnknownPosition.into())
    }

    /// Spot price token1/token0 as a Q128.128 value: the square of the
    /// pool's Q64.96 sqrt price.
    pub fn spot_price(&self) -> Result<Q128x128, Error> {
        let sqrt = Q64x96::from_raw(self.slot0.sqrt_price_x96)?.to_q128x128();
        sqrt.mul(sqrt).map_err(Error::from)
    }

    // ------------------------------------------------------------------
    // position lifecycle

    /// Opens a position over `[tick_lower, tick_upper]`, funding as much
    /// liquidity as the desired amounts allow at the current price. The
    /// amounts actually owed are rounded up and checked against the
    /// caller's minimums.
    #[allow(clippy::too_many_arguments)]
    pub fn mint(
        &mut self,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
        amount_0_desired: u128,
        amount_1_desired: u128,
        amount_0_min: u128,
        amount_1_min: u128,
    ) -> Result<MintReceipt, Error> {
        self.check_ticks(tick_lower, tick_upper)?;

        let sqrt_ratio_a = get_sqrt_ratio_at_tick(tick_lower)?;
        let sqrt_ratio_b = get_sqrt_ratio_at_tick(tick_upper)?;
        let liquidity = get_liquidity_for_amounts(
            self.slot0.sqrt_price_x96,
            sqrt_ratio_a,
            sqrt_ratio_b,
            U256::from(amount_0_desired),
            U256::from(amount_1_desired),
        )?;
        if liquidity == 0 {
            return Err(StateError::LiquidityIsZero.into());
        }
        let delta = i128::try_from(liquidity).map_err(|_| MathError::Overflow)?;

        let (amount_0, amount_1) = self.validate_liquidity_change(tick_lower, tick_upper, delta)?;
        if amount_0 < amount_0_min || amount_1 < amount_1_min {
            return Err(SwapError::SlippageExceeded.into());
        }
        self.reserve_0
            .checked_add(amount_0)
            .ok_or(MathError::Overflow)?;
        self.reserve_1
            .checked_add(amount_1)
            .ok_or(MathError::Overflow)?;

        // Everything validated; commit.
        let position_id = PositionId(self.next_position_id);
        self.next_position_id += 1;
        let mut position = PositionData::new(tick_lower, tick_upper);
        self.commit_liquidity_change(&mut position, delta)?;
        self.positions.insert(position_id, position);
        self.handles.insert(
            position_id,
            PositionHandle {
                id: position_id,
                owner,
            },
        );
        self.reserve_0 += amount_0;
        self.reserve_1 += amount_1;

        debug!(
            %position_id,
            tick_lower,
            tick_upper,
            liquidity,
            amount_0,
            amount_1,
            "position minted"
        );
        Ok(MintReceipt {
            position_id,
            liquidity,
            amount_0,
            amount_1,
        })
    }

    /// Adds liquidity to an existing position, same funding rules as mint.
    /// Returns `(liquidity_added, amount_0, amount_1)`.
    #[allow(clippy::too_many_arguments)]
    pub fn increase_liquidity(
        &mut self,
        position_id: PositionId,
        caller: Address,
        amount_0_desired: u128,
        amount_1_desired: u128,
        amount_0_min: u128,
        amount_1_min: u128,
    ) -> Result<(u128, u128, u128), Error> {
        self.authorize(position_id, caller)?;
        let position = *self.get_position_data(position_id)?;

        let sqrt_ratio_a = get_sqrt_ratio_at_tick(position.tick_lower)?;
        let sqrt_ratio_b = get_sqrt_ratio_at_tick(position.tick_upper)?;
        let liquidity = get_liquidity_for_amounts(
            self.slot0.sqrt_price_x96,
            sqrt_ratio_a,
            sqrt_ratio_b,
            U256::from(amount_0_desired),
            U256::from(amount_1_desired),
        )?;
        if liquidity == 0 {
            return Err(StateError::LiquidityIsZero.into());
        }
        let delta = i128::try_from(liquidity).map_err(|_| MathError::Overflow)?;

        let (amount_0, amount_1) =
            self.validate_liquidity_change(position.tick_lower, position.tick_upper, delta)?;
        if amount_0 < amount_0_min || amount_1 < amount_1_min {
            return Err(SwapError::SlippageExceeded.into());
        }
        self.reserve_0
            .checked_add(amount_0)
            .ok_or(MathError::Overflow)?;
        self.reserve_1
            .checked_add(amount_1)
            .ok_or(MathError::Overflow)?;

        let mut position = position;
        self.commit_liquidity_change(&mut position, delta)?;
        self.positions.insert(position_id, position);
        self.reserve_0 += amount_0;
        self.reserve_1 += amount_1;

        debug!(%position_id, liquidity, amount_0, amount_1, "liquidity increased");
        Ok((liquidity, amount_0, amount_1))
    }

    /// Removes liquidity from a position. The withdrawn amounts round down
    /// and are credited to the position's tokens-owed for later collection.
    /// Returns `(amount_0, amount_1)` made collectable.
    pub fn decrease_liquidity(
        &mut self,
        position_id: PositionId,
        caller: Address,
        liquidity: u128,
        amount_0_min: u128,
        amount_1_min: u128,
    ) -> Result<(u128, u128), Error> {
        self.authorize(position_id, caller)?;
        if liquidity == 0 {
            return Err(StateError::LiquidityIsZero.into());
        }
        let position = *self.get_position_data(position_id)?;

        let delta = -i128::try_from(liquidity).map_err(|_| MathError::Overflow)?;
        let (amount_0, amount_1) =
            self.validate_liquidity_change(position.tick_lower, position.tick_upper, delta)?;
        if amount_0 < amount_0_min || amount_1 < amount_1_min {
            return Err(SwapError::SlippageExceeded.into());
        }
        add_delta(position.liquidity, delta)?;

        let mut position = position;
        self.commit_liquidity_change(&mut position, delta)?;
        position.tokens_owed_0 = position.tokens_owed_0.wrapping_add(amount_0);
        position.tokens_owed_1 = position.tokens_owed_1.wrapping_add(amount_1);
        self.positions.insert(position_id, position);

        debug!(%position_id, liquidity, amount_0, amount_1, "liquidity decreased");
        Ok((amount_0, amount_1))
    }

    /// Pays out up to `max_amount_{0,1}` of the position's owed tokens
    /// from the pool reserves. Returns what was paid.
    pub fn collect(
        &mut self,
        position_id: PositionId,
        caller: Address,
        max_amount_0: u128,
        max_amount_1: u128,
    ) -> Result<(u128, u128), Error> {
        self.authorize(position_id, caller)?;
        let mut position = *self.get_position_data(position_id)?;

        // Fold in fees accrued since the last touch.
        if position.liquidity > 0 {
            let (inside_0, inside_1) = self.ticks.fee_growth_inside(
                position.tick_lower,
                position.tick_upper,
                self.slot0.tick,
                self.fee_growth_global_0_x128,
                self.fee_growth_global_1_x128,
            );
            position.update(0, inside_0, inside_1)?;
        }

        let amount_0 = max_amount_0.min(position.tokens_owed_0);
        let amount_1 = max_amount_1.min(position.tokens_owed_1);
        let reserve_0 = self
            .reserve_0
            .checked_sub(amount_0)
            .ok_or(StateError::InsufficientReserves)?;
        let reserve_1 = self
            .reserve_1
            .checked_sub(amount_1)
            .ok_or(StateError::InsufficientReserves)?;

        position.tokens_owed_0 -= amount_0;
        position.tokens_owed_1 -= amount_1;
        self.positions.insert(position_id, position);
        self.reserve_0 = reserve_0;
        self.reserve_1 = reserve_1;

        debug!(%position_id, amount_0, amount_1, "collected");
        Ok((amount_0, amount_1))
    }

    /// Deletes an emptied position. Liquidity must have been decreased to
    /// zero and all owed tokens collected first.
    pub fn burn(&mut self, position_id: PositionId, caller: Address) -> Result<(), Error> {
        self.authorize(position_id, caller)?;
        let position = *self.get_position_data(position_id)?;
        if position.liquidity != 0 {
            return Err(PositionError::LiquidityOutstanding.into());
        }
        if position.tokens_owed_0 != 0 || position.tokens_owed_1 != 0 {
            return Err(PositionError::TokensOwedOutstanding.into());
        }

        self.positions.remove(&position_id);
        self.handles.remove(&position_id);
        debug!(%position_id, "position burned");
        Ok(())
    }

    /// Reassigns ownership of a position. Accounting is untouched.
    pub fn transfer_position(
        &mut self,
        position_id: PositionId,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), Error> {
        self.authorize(position_id, caller)?;
        let handle = self
            .handles
            .get_mut(&position_id)
            .ok_or(PositionError::UnknownPosition)?;
        handle.owner = new_owner;
        debug!(%position_id, "position transferred");
        Ok(())
    }

    // ------------------------------------------------------------------
    // internals

    fn authorize(&self, position_id: PositionId, caller: Address) -> Result<(), Error> {
        let handle = self
            .handles
            .get(&position_id)
            .ok_or(PositionError::UnknownPosition)?;
        handle.authorize(caller)?;
        Ok(())
    }

    fn check_ticks(&self, tick_lower: i32, tick_upper: i32) -> Result<(), Error> {
        if tick_lower >= tick_upper {
            return Err(StateError::TickRangeInverted.into());
        }
        if tick_lower < MIN_TICK || tick_upper > MAX_TICK {
            return Err(StateError::TickOutOfBounds.into());
        }
        if tick_lower % self.tick_spacing != 0 || tick_upper % self.tick_spacing != 0 {
            return Err(StateError::TickNotAligned.into());
        }
        Ok(())
    }

    /// Checks every way a liquidity change could fail and computes the
    /// token amounts it moves, without mutating anything.
    fn validate_liquidity_change(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(u128, u128), Error> {
        self.ticks
            .check_update(tick_lower, liquidity_delta, false, self.max_liquidity_per_tick)?;
        self.ticks
            .check_update(tick_upper, liquidity_delta, true, self.max_liquidity_per_tick)?;
        if self.in_range(tick_lower, tick_upper) {
            add_delta(self.liquidity, liquidity_delta)?;
        }

        let (amount_0, amount_1) = get_amounts_for_liquidity(
            self.slot0.sqrt_price_x96,
            get_sqrt_ratio_at_tick(tick_lower)?,
            get_sqrt_ratio_at_tick(tick_upper)?,
            liquidity_delta.unsigned_abs(),
            liquidity_delta > 0,
        )?;
        let amount_0 = u128::try_from(amount_0).map_err(|_| MathError::Overflow)?;
        let amount_1 = u128::try_from(amount_1).map_err(|_| MathError::Overflow)?;
        Ok((amount_0, amount_1))
    }

    /// Applies a pre-validated liquidity change: boundary ticks, bitmap,
    /// position fees and liquidity, and in-range pool liquidity.
    fn commit_liquidity_change(
        &mut self,
        position: &mut PositionData,
        liquidity_delta: i128,
    ) -> Result<(), Error> {
        let (tick_lower, tick_upper) = (position.tick_lower, position.tick_upper);

        let flipped_lower = self.ticks.apply_update(
            tick_lower,
            self.slot0.tick,
            liquidity_delta,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
            false,
            self.max_liquidity_per_tick,
        )?;
        let flipped_upper = self.ticks.apply_update(
            tick_upper,
            self.slot0.tick,
            liquidity_delta,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
            true,
            self.max_liquidity_per_tick,
        )?;
        if flipped_lower {
            flip_tick(&mut self.bitmap, tick_lower, self.tick_spacing)?;
        }
        if flipped_upper {
            flip_tick(&mut self.bitmap, tick_upper, self.tick_spacing)?;
        }

        let (inside_0, inside_1) = self.ticks.fee_growth_inside(
            tick_lower,
            tick_upper,
            self.slot0.tick,
            self.fee_growth_global_0_x128,
            self.fee_growth_global_1_x128,
        );
        position.update(liquidity_delta, inside_0, inside_1)?;

        if liquidity_delta < 0 {
            if flipped_lower {
                self.ticks.clear(tick_lower);
            }
            if flipped_upper {
                self.ticks.clear(tick_upper);
            }
        }

        if self.in_range(tick_lower, tick_upper) {
            self.liquidity = add_delta(self.liquidity, liquidity_delta)?;
        }
        Ok(())
    }

    fn in_range(&self, tick_lower: i32, tick_upper: i32) -> bool {
        tick_lower <= self.slot0.tick && self.slot0.tick < tick_upper
    }
}
