//! # Safe Multiplication and Division
//!
//! Share/asset conversions compute `(x * y) / denominator` with a 256-bit
//! intermediate so the product never overflows. Every conversion in the
//! vault rounds down, in the vault's favor.

use uint::construct_uint;

use crate::errors::VaultError;

construct_uint! {
    pub struct U256(4);
}

/// Performs `floor((x * y) / denominator)`.
///
/// # Errors
///
/// - `DivisionByZero` if `denominator` is zero
/// - `MathOverflow` if the quotient does not fit in a `u128`
///
/// # Example
///
/// ```ignore
/// // shares = net * total_shares / staked
/// let shares = mul_div(50_000, 100_000, 100_000)?;
/// assert_eq!(shares, 50_000);
/// ```
pub fn mul_div(x: u128, y: u128, denominator: u128) -> Result<u128, VaultError> {
    if denominator == 0 {
        return Err(VaultError::DivisionByZero);
    }

    let result = U256::from(x) * U256::from(y) / U256::from(denominator);
    if result > U256::from(u128::MAX) {
        return Err(VaultError::MathOverflow);
    }

    Ok(result.as_u128())
}
