//! Per-tick accounting: gross/net liquidity and fee growth on the far side
//! of each initialized tick.

use crate::FastMap;
use crate::error::{Error, MathError, StateError};
use crate::math::liquidity_math::add_delta;
use alloy_primitives::U256;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickData {
    /// Total liquidity referencing this tick from either side.
    pub liquidity_gross: u128,
    /// Liquidity added when the tick is crossed left to right.
    pub liquidity_net: i128,
    /// Fee growth on the far side of this tick, relative to the current
    /// tick. Wrap-around counter; only meaningful relative to a snapshot.
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,
}

/// Sparse store of initialized ticks. The companion bitmap (owned by the
/// pool) tracks which ticks are present; entries here are created on first
/// reference and dropped via [`TickStore::clear`] when their gross
/// liquidity returns to zero.
#[derive(Debug, Clone, Default)]
pub struct TickStore {
    ticks: FastMap<i32, TickData>,
}

impl TickStore {
    pub fn get(&self, tick: i32) -> Option<&TickData> {
        self.ticks.get(&tick)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Validates a prospective update without touching the store. The pool
    /// checks both boundary ticks through this before committing either,
    /// so a rejected range change leaves no partial state behind.
    pub fn check_update(
        &self,
        tick: i32,
        liquidity_delta: i128,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<(), Error> {
        let existing = self.ticks.get(&tick).copied().unwrap_or_default();
        compute_update(&existing, liquidity_delta, upper, max_liquidity)?;
        Ok(())
    }

    /// Folds a liquidity delta into `tick`, returning whether the tick
    /// flipped between initialized and uninitialized.
    ///
    /// A tick first referenced at or below the current tick has its
    /// fee-growth-outside seeded with the global counters, so growth that
    /// predates the tick counts as "below" it. All new values are computed
    /// before anything is written; on error the entry is untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_update(
        &mut self,
        tick: i32,
        current_tick: i32,
        liquidity_delta: i128,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
        upper: bool,
        max_liquidity: u128,
    ) -> Result<bool, Error> {
        let existing = self.ticks.get(&tick).copied().unwrap_or_default();

        let (liquidity_gross_after, liquidity_net_after) =
            compute_update(&existing, liquidity_delta, upper, max_liquidity)?;

        let flipped = (liquidity_gross_after == 0) != (existing.liquidity_gross == 0);

        let data = self.ticks.entry(tick).or_default();
        if existing.liquidity_gross == 0 && tick <= current_tick {
            data.fee_growth_outside_0_x128 = fee_growth_global_0_x128;
            data.fee_growth_outside_1_x128 = fee_growth_global_1_x128;
        }
        data.liquidity_gross = liquidity_gross_after;
        data.liquidity_net = liquidity_net_after;

        Ok(flipped)
    }

    /// Transitions `tick` as the price crosses it: fee growth outside flips
    /// to the other side of the tick. Returns the liquidity net to apply in
    /// the left-to-right direction.
    pub fn cross(
        &mut self,
        tick: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> i128 {
        let data = self.ticks.entry(tick).or_default();
        data.fee_growth_outside_0_x128 =
            fee_growth_global_0_x128.wrapping_sub(data.fee_growth_outside_0_x128);
        data.fee_growth_outside_1_x128 =
            fee_growth_global_1_x128.wrapping_sub(data.fee_growth_outside_1_x128);
        data.liquidity_net
    }

    /// Drops the entry for `tick`. Called when its gross liquidity flips
    /// back to zero.
    pub fn clear(&mut self, tick: i32) {
        self.ticks.remove(&tick);
    }

    /// Fee growth accrued strictly inside `[tick_lower, tick_upper]`:
    /// global minus the growth below the lower tick and above the upper
    /// one. All subtraction wraps; only differences between snapshots are
    /// meaningful.
    pub fn fee_growth_inside(
        &self,
        tick_lower: i32,
        tick_upper: i32,
        current_tick: i32,
        fee_growth_global_0_x128: U256,
        fee_growth_global_1_x128: U256,
    ) -> (U256, U256) {
        let lower = self.ticks.get(&tick_lower).copied().unwrap_or_default();
        let upper = self.ticks.get(&tick_upper).copied().unwrap_or_default();

        let (below_0, below_1) = if current_tick >= tick_lower {
            (
                lower.fee_growth_outside_0_x128,
                lower.fee_growth_outside_1_x128,
            )
        } else {
            (
                fee_growth_global_0_x128.wrapping_sub(lower.fee_growth_outside_0_x128),
                fee_growth_global_1_x128.wrapping_sub(lower.fee_growth_outside_1_x128),
            )
        };

        let (above_0, above_1) = if current_tick < tick_upper {
            (
                upper.fee_growth_outside_0_x128,
                upper.fee_growth_outside_1_x128,
            )
        } else {
            (
                fee_growth_global_0_x128.wrapping_sub(upper.fee_growth_outside_0_x128),
                fee_growth_global_1_x128.wrapping_sub(upper.fee_growth_outside_1_x128),
            )
        };

        (
            fee_growth_global_0_x128
                .wrapping_sub(below_0)
                .wrapping_sub(above_0),
            fee_growth_global_1_x128
                .wrapping_sub(below_1)
                .wrapping_sub(above_1),
        )
    }
}

fn compute_update(
    existing: &TickData,
    liquidity_delta: i128,
    upper: bool,
    max_liquidity: u128,
) -> Result<(u128, i128), Error> {
    let liquidity_gross_after = add_delta(existing.liquidity_gross, liquidity_delta)?;
    if liquidity_gross_after > max_liquidity {
        return Err(StateError::LiquidityPerTickExceeded.into());
    }

    // Upper ticks subtract the delta on left-to-right crossing.
    let liquidity_net_after = if upper {
        existing.liquidity_net.checked_sub(liquidity_delta)
    } else {
        existing.liquidity_net.checked_add(liquidity_delta)
    }
    .ok_or(MathError::Overflow)?;

    Ok((liquidity_gross_after, liquidity_net_after))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_LIQ: u128 = u128::MAX;

    #[test]
    fn first_reference_flips_tick_on() {
        let mut store = TickStore::default();
        let flipped = store
            .apply_update(60, 0, 100, U256::ZERO, U256::ZERO, false, MAX_LIQ)
            .unwrap();
        assert!(flipped);
        let data = store.get(60).unwrap();
        assert_eq!(data.liquidity_gross, 100);
        assert_eq!(data.liquidity_net, 100);
    }

    #[test]
    fn second_reference_does_not_flip() {
        let mut store = TickStore::default();
        store
            .apply_update(60, 0, 100, U256::ZERO, U256::ZERO, false, MAX_LIQ)
            .unwrap();
        let flipped = store
            .apply_update(60, 0, 50, U256::ZERO, U256::ZERO, false, MAX_LIQ)
            .unwrap();
        assert!(!flipped);
        assert_eq!(store.get(60).unwrap().liquidity_gross, 150);
    }

    #[test]
    fn removing_all_liquidity_flips_off() {
        let mut store = TickStore::default();
        store
            .apply_update(60, 0, 100, U256::ZERO, U256::ZERO, false, MAX_LIQ)
            .unwrap();
        let flipped = store
            .apply_update(60, 0, -100, U256::ZERO, U256::ZERO, false, MAX_LIQ)
            .unwrap();
        assert!(flipped);
        store.clear(60);
        assert!(store.get(60).is_none());
    }

    #[test]
    fn upper_tick_negates_net() {
        let mut store = TickStore::default();
        store
            .apply_update(60, 0, 100, U256::ZERO, U256::ZERO, true, MAX_LIQ)
            .unwrap();
        assert_eq!(store.get(60).unwrap().liquidity_net, -100);
        assert_eq!(store.get(60).unwrap().liquidity_gross, 100);
    }

    #[test]
    fn per_tick_cap_is_enforced_without_mutation() {
        let mut store = TickStore::default();
        store
            .apply_update(60, 0, 100, U256::ZERO, U256::ZERO, false, 150)
            .unwrap();
        let result = store.apply_update(60, 0, 51, U256::ZERO, U256::ZERO, false, 150);
        assert!(matches!(
            result,
            Err(Error::StateError(StateError::LiquidityPerTickExceeded))
        ));
        assert_eq!(store.get(60).unwrap().liquidity_gross, 100);
    }

    #[test]
    fn underflow_is_rejected() {
        let mut store = TickStore::default();
        let result = store.apply_update(60, 0, -1, U256::ZERO, U256::ZERO, false, MAX_LIQ);
        assert!(matches!(
            result,
            Err(Error::MathError(MathError::Underflow))
        ));
        assert!(store.get(60).is_none());
    }

    #[test]
    fn outside_growth_seeded_below_current_tick() {
        let mut store = TickStore::default();
        let fg0 = U256::from(1000u32);
        let fg1 = U256::from(2000u32);

        // tick below current: seeded with globals
        store.apply_update(-60, 0, 100, fg0, fg1, false, MAX_LIQ).unwrap();
        let below = store.get(-60).unwrap();
        assert_eq!(below.fee_growth_outside_0_x128, fg0);
        assert_eq!(below.fee_growth_outside_1_x128, fg1);

        // tick above current: starts at zero
        store.apply_update(60, 0, 100, fg0, fg1, true, MAX_LIQ).unwrap();
        let above = store.get(60).unwrap();
        assert_eq!(above.fee_growth_outside_0_x128, U256::ZERO);
        assert_eq!(above.fee_growth_outside_1_x128, U256::ZERO);
    }

    #[test]
    fn cross_flips_outside_growth() {
        let mut store = TickStore::default();
        store
            .apply_update(-60, 0, 100, U256::from(50u8), U256::ZERO, false, MAX_LIQ)
            .unwrap();

        let net = store.cross(-60, U256::from(80u8), U256::from(7u8));
        assert_eq!(net, 100);
        let data = store.get(-60).unwrap();
        assert_eq!(data.fee_growth_outside_0_x128, U256::from(30u8));
        assert_eq!(data.fee_growth_outside_1_x128, U256::from(7u8));

        // crossing back restores the original
        store.cross(-60, U256::from(80u8), U256::from(7u8));
        let data = store.get(-60).unwrap();
        assert_eq!(data.fee_growth_outside_0_x128, U256::from(50u8));
        assert_eq!(data.fee_growth_outside_1_x128, U256::ZERO);
    }

    #[test]
    fn fee_growth_inside_straddling_range() {
        let mut store = TickStore::default();
        let fg0 = U256::from(1000u32);
        store.apply_update(-60, 0, 100, U256::ZERO, U256::ZERO, false, MAX_LIQ).unwrap();
        store.apply_update(60, 0, 100, U256::ZERO, U256::ZERO, true, MAX_LIQ).unwrap();

        // nothing recorded outside, so all growth is inside
        let (inside_0, inside_1) = store.fee_growth_inside(-60, 60, 0, fg0, U256::ZERO);
        assert_eq!(inside_0, fg0);
        assert_eq!(inside_1, U256::ZERO);
    }

    #[test]
    fn fee_growth_inside_excludes_outside_growth() {
        let mut store = TickStore::default();
        let fg0 = U256::from(1000u32);
        // lower tick seeded with 300 of growth that happened below it
        store
            .apply_update(-60, 0, 100, U256::from(300u32), U256::ZERO, false, MAX_LIQ)
            .unwrap();
        store.apply_update(60, 0, 100, U256::from(300u32), U256::ZERO, true, MAX_LIQ).unwrap();

        let (inside_0, _) = store.fee_growth_inside(-60, 60, 0, fg0, U256::ZERO);
        assert_eq!(inside_0, U256::from(700u32));
    }

    #[test]
    fn fee_growth_inside_wraps_cleanly() {
        // Snapshot deltas stay correct across counter wraparound.
        let mut store = TickStore::default();
        let near_max = U256::MAX - U256::from(10u8);
        store.apply_update(-60, 0, 100, near_max, U256::ZERO, false, MAX_LIQ).unwrap();
        store.apply_update(60, 0, 100, near_max, U256::ZERO, true, MAX_LIQ).unwrap();

        let (before, _) = store.fee_growth_inside(-60, 60, 0, near_max, U256::ZERO);
        // global wraps past zero
        let wrapped = near_max.wrapping_add(U256::from(30u8));
        let (after, _) = store.fee_growth_inside(-60, 60, 0, wrapped, U256::ZERO);
        assert_eq!(after.wrapping_sub(before), U256::from(30u8));
    }

    #[test]
    fn fee_growth_inside_excludes_growth_below_range() {
        let mut store = TickStore::default();
        let fg0 = U256::from(500u32);
        store.apply_update(60, 100, 10, fg0, U256::ZERO, false, MAX_LIQ).unwrap();
        store.apply_update(120, 100, 10, fg0, U256::ZERO, true, MAX_LIQ).unwrap();

        // all pre-existing growth sits below the lower tick, none inside
        let (inside_0, _) = store.fee_growth_inside(60, 120, 100, fg0, U256::ZERO);
        assert_eq!(inside_0, U256::ZERO);
    }
}
