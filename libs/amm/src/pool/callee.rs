//! Flash-swap callback seam

use crate::error::PoolError;
use crate::types::Address;

/// Receiver of optimistic swap output
///
/// Invoked after the requested outputs have been transferred and before the
/// pool verifies payment. The callee settles by transferring input back to the
/// pool; anything it fails to settle is caught by the constant-product check
/// and the whole swap rolls back.
pub trait FlashSwapCallee: Send + Sync {
    fn on_flash_swap(
        &self,
        sender: Address,
        amount0_out: u128,
        amount1_out: u128,
        data: &[u8],
    ) -> Result<(), PoolError>;
}

impl<F> FlashSwapCallee for F
where
    F: Fn(Address, u128, u128, &[u8]) -> Result<(), PoolError> + Send + Sync,
{
    fn on_flash_swap(
        &self,
        sender: Address,
        amount0_out: u128,
        amount1_out: u128,
        data: &[u8],
    ) -> Result<(), PoolError> {
        self(sender, amount0_out, amount1_out, data)
    }
}
