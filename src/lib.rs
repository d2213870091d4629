//! Concentrated-liquidity AMM engine in pure Rust.
//!
//! Liquidity is deposited against discrete price ranges ("ticks"); the price
//! moves continuously along a bonding curve parameterized by the square root
//! of price, and swaps consume liquidity range by range. This crate exposes:
//!
//! - Low-level math primitives (`math::*`): wide multiply-divide, fixed-point
//!   families, tick <-> sqrt-price conversion, and a sparse tick bitmap.
//! - A self-contained in-memory [`Pool`] with the full position lifecycle:
//!   mint, increase/decrease liquidity, collect, burn, and swap.
//!
//! # Examples
//!
//! ```no_run
//! use clamm::{Pool, math::tick_math::get_sqrt_ratio_at_tick, Address};
//!
//! let owner = Address::from([1u8; 20]);
//! let mut pool = Pool::new(3000, 60, get_sqrt_ratio_at_tick(0).unwrap()).unwrap();
//!
//! let minted = pool
//!     .mint(owner, -60, 60, 1_000_000, 1_000_000, 0, 0)
//!     .unwrap();
//! assert!(minted.liquidity > 0);
//!
//! let out = pool.swap_exact_input(true, 1_000, 1, None).unwrap();
//! println!("received {out} of token1");
//! ```

pub use alloy_primitives::{Address, I256, U256};

pub mod error;
mod hash;
pub mod math;
pub mod pool;
pub mod position;
pub mod tick;

pub use hash::FastMap;
pub use pool::{MintReceipt, Pool, Slot0, SwapParams, SwapResult};
pub use position::{PositionData, PositionHandle, PositionId};

pub(crate) const U256_1: U256 = U256::from_limbs([1, 0, 0, 0]);
pub(crate) const U256_E6: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);

pub(crate) const U160_MAX: U256 = U256::from_limbs([u64::MAX, u64::MAX, u32::MAX as u64, 0]);

/// Fractional bits of the sqrt-price representation.
pub const RESOLUTION: u8 = 96;
/// 2^96, the unit of the Q64.96 sqrt-price convention.
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
/// 2^128, the unit of the Q128.128 fee-growth accumulators.
pub const Q128: U256 = U256::from_limbs([0, 0, 1, 0]);

/// Upper bound (exclusive) for pool fees, in parts per million.
pub const MAX_FEE_PIPS: u32 = 1_000_000;
