//! Sparse bitmap of initialized ticks.
//!
//! Compressed tick indices (tick / spacing) are packed 256 per word into a
//! `FastMap<i16, U256>`. Words that become all-zero are removed, so the map
//! size tracks the number of populated regions rather than the full tick
//! range.

use crate::FastMap;
use crate::U256_1;
use crate::error::{MathError, StateError};
use crate::math::bit_math::{least_significant_bit, most_significant_bit};
use alloy_primitives::U256;

/// Maps a compressed tick to its `(word, bit)` coordinates. Floor division
/// keeps negative ticks in the right word.
pub fn position(compressed: i32) -> (i16, u8) {
    (
        compressed.div_euclid(256) as i16,
        compressed.rem_euclid(256) as u8,
    )
}

/// Returns the bitmap word stored at `word`, or zero if absent.
pub fn get_word(bitmap: &FastMap<i16, U256>, word: i16) -> U256 {
    bitmap.get(&word).copied().unwrap_or(U256::ZERO)
}

/// Toggles the initialized flag of `tick`. The tick must be aligned to
/// `tick_spacing`. A word whose last bit clears is dropped from the map.
pub fn flip_tick(
    tick_bitmap: &mut FastMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
) -> Result<(), StateError> {
    if tick % tick_spacing != 0 {
        return Err(StateError::TickNotAligned);
    }

    let (word_pos, bit_pos) = position(tick / tick_spacing);
    let mask = U256_1 << bit_pos;
    let word = get_word(tick_bitmap, word_pos) ^ mask;
    if word.is_zero() {
        tick_bitmap.remove(&word_pos);
    } else {
        tick_bitmap.insert(word_pos, word);
    }
    Ok(())
}

/// Searches the 256-tick word containing `tick` for the nearest initialized
/// tick at or below it (`lte`), or strictly above it (`!lte`).
///
/// Returns the boundary tick and whether it is initialized; when no bit is
/// set in the remainder of the word, the word's edge is returned so the
/// caller can continue the scan from there.
pub fn next_initialized_tick_within_one_word(
    bitmap: &FastMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
    lte: bool,
) -> Result<(i32, bool), MathError> {
    let compressed = tick.div_euclid(tick_spacing);

    if lte {
        let (word_pos, bit_pos) = position(compressed);

        // bits at or below bit_pos
        let mask = (U256_1 << bit_pos) - U256_1 + (U256_1 << bit_pos);
        let masked = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();
        let next = if initialized {
            (compressed - (bit_pos - most_significant_bit(masked)?) as i32) * tick_spacing
        } else {
            (compressed - bit_pos as i32) * tick_spacing
        };
        Ok((next, initialized))
    } else {
        let (word_pos, bit_pos) = position(compressed + 1);

        // bits at or above bit_pos
        let mask = !((U256_1 << bit_pos) - U256_1);
        let masked = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();
        let next = if initialized {
            (compressed + 1 + (least_significant_bit(masked)? - bit_pos) as i32) * tick_spacing
        } else {
            (compressed + 1 + (255u8 - bit_pos) as i32) * tick_spacing
        };
        Ok((next, initialized))
    }
}
