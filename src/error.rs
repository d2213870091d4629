use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - underflow")]
    Underflow,
    #[error("Math error - out of bounds")]
    OutOfBounds,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("BitMath error - zero input value")]
    ZeroValue,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("State error - sqrtPrice out of bounds")]
    SqrtPriceOutOfBounds,
    #[error("State error - sqrtPrice is 0")]
    SqrtPriceIsZero,
    #[error("State error - sqrtRatio is 0")]
    SqrtRatioIsZero,

    #[error("State error - tick out of bounds")]
    TickOutOfBounds,
    #[error("State error - tick not aligned to spacing")]
    TickNotAligned,
    #[error("State error - lower tick must be below upper tick")]
    TickRangeInverted,
    #[error("State error - tick spacing must be positive")]
    InvalidTickSpacing,
    #[error("State error - fee exceeds maximum")]
    FeeTooHigh,
    #[error("State error - liquidity exceeds per-tick maximum")]
    LiquidityPerTickExceeded,

    #[error("State error - liquidity is 0")]
    LiquidityIsZero,

    #[error("State error - requested amount exceeds pool reserves")]
    InsufficientReserves,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SwapError {
    #[error("Swap error - amount specified is 0")]
    AmountSpecifiedIsZero,
    #[error("Swap error - sqrtPrice limit out of bounds")]
    SqrtPriceLimitOutOfBounds,
    #[error("Swap error - realized amounts violate caller limits")]
    SlippageExceeded,
    #[error("Swap error - not enough in-range liquidity to fill the request")]
    InsufficientLiquidity,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("Position error - unknown position id")]
    UnknownPosition,
    #[error("Position error - caller does not own this position")]
    NotOwner,
    #[error("Position error - position still has liquidity")]
    LiquidityOutstanding,
    #[error("Position error - position still has uncollected tokens")]
    TokensOwedOutstanding,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] MathError),

    #[error(transparent)]
    StateError(#[from] StateError),

    #[error(transparent)]
    SwapError(#[from] SwapError),

    #[error(transparent)]
    PositionError(#[from] PositionError),
}
