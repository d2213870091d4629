use crate::error::StateError;
use alloy_primitives::U256;

/// Lowest tick for which the sqrt price still fits the Q64.96 range.
pub const MIN_TICK: i32 = -887272;
pub const MAX_TICK: i32 = -MIN_TICK;

/// `get_sqrt_ratio_at_tick(MIN_TICK)`.
pub const MIN_SQRT_RATIO: U256 = U256::from_limbs([4295128739, 0, 0, 0]);
/// `get_sqrt_ratio_at_tick(MAX_TICK)`. Valid prices are strictly below this.
pub const MAX_SQRT_RATIO: U256 =
    U256::from_limbs([6743328256752651558, 17280870778742802505, 4294805859, 0]);

/// Returns the sqrt price (Q64.96) at a given tick index, or
/// `StateError::TickOutOfBounds` if the tick is outside
/// `[MIN_TICK, MAX_TICK]`.
///
/// The tick is decomposed into its binary digits; each set bit multiplies
/// in a precomputed Q128.128 power of `sqrt(1.0001)^(2^i)`, and the result
/// is rounded up into Q64.96 at the end.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<U256, StateError> {
    let abs_tick = tick.unsigned_abs();

    if abs_tick > MAX_TICK as u32 {
        return Err(StateError::TickOutOfBounds);
    }

    let mut ratio = if abs_tick & 1 != 0 {
        U256::from_limbs([12262481743371124737, 18445821805675392311, 0, 0])
    } else {
        U256::from_limbs([0, 0, 1, 0])
    };

    macro_rules! mul_power {
        ($bit:expr, $l0:expr, $l1:expr) => {
            if abs_tick & $bit != 0 {
                ratio = ratio.wrapping_mul(U256::from_limbs([$l0, $l1, 0, 0])) >> 128;
            }
        };
    }

    mul_power!(2, 6459403834229662010, 18444899583751176498);
    mul_power!(4, 17226890335427755468, 18443055278223354162);
    mul_power!(8, 2032852871939366096, 18439367220385604838);
    mul_power!(16, 14545316742740207172, 18431993317065449817);
    mul_power!(32, 5129152022828963008, 18417254355718160513);
    mul_power!(64, 4894419605888772193, 18387811781193591352);
    mul_power!(128, 1280255884321894483, 18329067761203520168);
    mul_power!(256, 15924666964335305636, 18212142134806087854);
    mul_power!(512, 8010504389359918676, 17980523815641551639);
    mul_power!(1024, 10668036004952895731, 17526086738831147013);
    mul_power!(2048, 4878133418470705625, 16651378430235024244);
    mul_power!(4096, 9537173718739605541, 15030750278693429944);
    mul_power!(8192, 9972618978014552549, 12247334978882834399);
    mul_power!(16384, 10428997489610666743, 8131365268884726200);
    mul_power!(32768, 9305304367709015974, 3584323654723342297);
    mul_power!(65536, 14301143598189091785, 696457651847595233);
    mul_power!(131072, 7393154844743099908, 26294789957452057);
    mul_power!(262144, 2209338891292245656, 37481735321082);
    mul_power!(524288, 10518117631919034274, 76158723);

    // The table encodes negative powers; invert for positive ticks.
    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the inverse mapping stays
    // consistent at tick boundaries.
    let dust = (ratio.as_limbs()[0] & 0xFFFF_FFFF) as u32;
    Ok((ratio >> 32) + U256::from((dust != 0) as u64))
}

/// Returns the greatest tick whose sqrt price is `<= sqrt_price_x96`.
///
/// Implemented as a bisection over the tick range against
/// [`get_sqrt_ratio_at_tick`], which makes the round trip
/// `get_tick_at_sqrt_ratio(get_sqrt_ratio_at_tick(t)) == t` exact for
/// every valid tick. Roughly 21 iterations; each one is a handful of
/// 256-bit multiplies.
pub fn get_tick_at_sqrt_ratio(sqrt_price_x96: U256) -> Result<i32, StateError> {
    if sqrt_price_x96 < MIN_SQRT_RATIO || sqrt_price_x96 >= MAX_SQRT_RATIO {
        return Err(StateError::SqrtPriceOutOfBounds);
    }

    // Invariant: ratio(lo) <= price < ratio(hi)
    let mut lo = MIN_TICK;
    let mut hi = MAX_TICK;
    while hi - lo > 1 {
        let mid = (lo + hi) >> 1;
        if get_sqrt_ratio_at_tick(mid)? <= sqrt_price_x96 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}

/// Aligns `tick` to a multiple of `spacing`: toward negative infinity by
/// default, toward positive infinity when `round_up`. `spacing` must be
/// positive.
pub fn round_to_spacing(tick: i32, spacing: i32, round_up: bool) -> i32 {
    let floored = tick.div_euclid(spacing) * spacing;
    if round_up && floored != tick {
        floored + spacing
    } else {
        floored
    }
}

/// The maximum liquidity a single tick may carry so that the sum over
/// every usable tick cannot overflow `u128`.
pub fn max_liquidity_per_tick(tick_spacing: i32) -> u128 {
    let min_tick = (MIN_TICK / tick_spacing) * tick_spacing;
    let max_tick = (MAX_TICK / tick_spacing) * tick_spacing;
    let num_ticks = ((max_tick - min_tick) / tick_spacing) as u128 + 1;
    u128::MAX / num_ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    #[test]
    fn sqrt_ratio_respects_tick_bounds() {
        assert!(matches!(
            get_sqrt_ratio_at_tick(MIN_TICK - 1),
            Err(StateError::TickOutOfBounds)
        ));
        assert!(matches!(
            get_sqrt_ratio_at_tick(MAX_TICK + 1),
            Err(StateError::TickOutOfBounds)
        ));
    }

    #[test]
    fn sqrt_ratio_reference_values() {
        assert_eq!(
            get_sqrt_ratio_at_tick(MIN_TICK).unwrap(),
            U256::from(4295128739u64)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(MIN_TICK + 1).unwrap(),
            U256::from(4295343490u64)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(MAX_TICK - 1).unwrap(),
            U256::from_str("1461373636630004318706518188784493106690254656249").unwrap()
        );
        assert_eq!(get_sqrt_ratio_at_tick(MAX_TICK).unwrap(), MAX_SQRT_RATIO);
        assert_eq!(
            get_sqrt_ratio_at_tick(0).unwrap(),
            U256::from(79228162514264337593543950336u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(50).unwrap(),
            U256::from(79426470787362580746886972461u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(100).unwrap(),
            U256::from(79625275426524748796330556128u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(250).unwrap(),
            U256::from(80224679980005306637834519095u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(500).unwrap(),
            U256::from(81233731461783161732293370115u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(1000).unwrap(),
            U256::from(83290069058676223003182343270u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(2500).unwrap(),
            U256::from(89776708723587163891445672585u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(3000).unwrap(),
            U256::from(92049301871182272007977902845u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(5000).unwrap(),
            U256::from(101729702841318637793976746270u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(50000).unwrap(),
            U256::from(965075977353221155028623082916u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(150000).unwrap(),
            U256::from(143194173941309278083010301478497u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(250000).unwrap(),
            U256::from(21246587762933397357449903968194344u128)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(500000).unwrap(),
            U256::from_str("5697689776495288729098254600827762987878").unwrap()
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(738203).unwrap(),
            U256::from_str("847134979253254120489401328389043031315994541").unwrap()
        );
    }

    #[test]
    fn tick_at_sqrt_ratio_rejects_out_of_range() {
        assert!(matches!(
            get_tick_at_sqrt_ratio(MIN_SQRT_RATIO - U256::ONE),
            Err(StateError::SqrtPriceOutOfBounds)
        ));
        assert!(matches!(
            get_tick_at_sqrt_ratio(MAX_SQRT_RATIO),
            Err(StateError::SqrtPriceOutOfBounds)
        ));
    }

    #[test]
    fn tick_at_sqrt_ratio_boundary_values() {
        assert_eq!(get_tick_at_sqrt_ratio(MIN_SQRT_RATIO).unwrap(), MIN_TICK);
        assert_eq!(
            get_tick_at_sqrt_ratio(U256::from(4295343490u64)).unwrap(),
            MIN_TICK + 1
        );
        assert_eq!(
            get_tick_at_sqrt_ratio(MAX_SQRT_RATIO - U256::ONE).unwrap(),
            MAX_TICK - 1
        );
    }

    #[test]
    fn tick_at_sqrt_ratio_between_ticks_maps_down() {
        // a price strictly between tick 100 and tick 101 belongs to 100
        let at_100 = get_sqrt_ratio_at_tick(100).unwrap();
        let at_101 = get_sqrt_ratio_at_tick(101).unwrap();
        let mid = (at_100 + at_101) >> 1usize;
        assert_eq!(get_tick_at_sqrt_ratio(mid).unwrap(), 100);
        assert_eq!(get_tick_at_sqrt_ratio(at_101 - U256::ONE).unwrap(), 100);
        assert_eq!(get_tick_at_sqrt_ratio(at_101).unwrap(), 101);
    }

    #[test]
    fn round_trip_exact_at_selected_ticks() {
        for tick in [
            MIN_TICK,
            MIN_TICK + 1,
            -887220,
            -100_000,
            -60,
            -1,
            0,
            1,
            60,
            100_000,
            887220,
            MAX_TICK - 1,
        ] {
            let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
            assert_eq!(get_tick_at_sqrt_ratio(ratio).unwrap(), tick, "tick {tick}");
        }
    }

    #[test]
    fn round_to_spacing_floors_toward_negative_infinity() {
        assert_eq!(round_to_spacing(125, 60, false), 120);
        assert_eq!(round_to_spacing(-125, 60, false), -180);
        assert_eq!(round_to_spacing(-60, 60, false), -60);
        assert_eq!(round_to_spacing(0, 60, false), 0);
        assert_eq!(round_to_spacing(59, 60, false), 0);
        assert_eq!(round_to_spacing(-1, 60, false), -60);
    }

    #[test]
    fn round_to_spacing_ceils_when_requested() {
        assert_eq!(round_to_spacing(125, 60, true), 180);
        assert_eq!(round_to_spacing(-125, 60, true), -120);
        assert_eq!(round_to_spacing(-60, 60, true), -60);
        assert_eq!(round_to_spacing(1, 60, true), 60);
        assert_eq!(round_to_spacing(-59, 60, true), 0);
    }

    #[test]
    fn max_liquidity_per_tick_reference_values() {
        assert_eq!(
            max_liquidity_per_tick(10),
            1917569901783203986719870431555990
        );
        assert_eq!(
            max_liquidity_per_tick(60),
            11505743598341114571880798222544994
        );
        assert_eq!(
            max_liquidity_per_tick(200),
            38350317471085141830651933667504588
        );
        assert_eq!(
            max_liquidity_per_tick(1),
            191757530477355301479181766273477
        );
    }

    proptest! {
        /// Round trip is exact for every valid tick, by construction of
        /// the bisection.
        #[test]
        fn prop_round_trip(tick in MIN_TICK..MAX_TICK) {
            let ratio = get_sqrt_ratio_at_tick(tick).unwrap();
            prop_assert_eq!(get_tick_at_sqrt_ratio(ratio).unwrap(), tick);
        }

        /// sqrt price is strictly monotone in the tick.
        #[test]
        fn prop_monotone(tick in MIN_TICK..MAX_TICK) {
            let a = get_sqrt_ratio_at_tick(tick).unwrap();
            let b = get_sqrt_ratio_at_tick(tick + 1).unwrap();
            prop_assert!(a < b);
        }
    }
}
