pub mod state;
pub mod swap;

pub use state::{MintReceipt, Pool};
pub use swap::{Slot0, SwapParams, SwapResult};
