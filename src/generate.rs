//! # Generate
//!
//! Generate random values for proof request nonces.

/// Bit width of a proof request nonce.
const NONCE_BITS: u32 = 80;

/// Generates a decimal nonce string for a proof request. Uses fastrand so is
/// not cryptographically secure.
#[must_use]
pub fn pr_nonce() -> String {
    let rnd = fastrand::u128(..) >> (128 - NONCE_BITS);
    rnd.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_is_decimal() {
        let nonce = pr_nonce();
        assert!(!nonce.is_empty());
        assert!(nonce.chars().all(|c| c.is_ascii_digit()));
        // 80 bits is at most 25 decimal digits
        assert!(nonce.len() <= 25);
    }
}
