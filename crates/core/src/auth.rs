//! Pairing token for the TV control channel
//!
//! The TV hands out a token once the user allows this controller on the
//! "new device" prompt. It must be replayed on every later connection,
//! otherwise the TV prompts again.
//!
//! ## Provisional tokens
//!
//! Before the first handshake there is nothing to replay, so a random
//! numeric placeholder is generated. The TV ignores unknown tokens and
//! simply starts the pairing prompt; the placeholder only needs to be
//! non-empty. `is_provisional()` stays true until a
//! value is loaded from storage or issued by the TV.

use crate::error::CoreError;
use rand::Rng;
use std::fmt;

/// Number of decimal digits in a generated placeholder
const PROVISIONAL_DIGITS: u32 = 8;

/// Opaque pairing token
///
/// The value is never interpreted; it is percent-encoded when placed in
/// the handshake URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairingToken {
    value: String,
    provisional: bool,
}

impl PairingToken {
    /// Wrap a token confirmed by the TV or read back from storage
    ///
    /// # Errors
    /// - `InvalidTokenFormat` if the value is empty after trimming
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(CoreError::InvalidTokenFormat);
        }
        Ok(Self {
            value,
            provisional: false,
        })
    }

    /// Generate a placeholder used until the TV issues a real token
    ///
    /// # Example
    /// ```
    /// # use sstc_core::auth::PairingToken;
    /// let token = PairingToken::provisional();
    /// assert!(token.is_provisional());
    /// assert!(!token.as_str().is_empty());
    /// ```
    pub fn provisional() -> Self {
        let upper = 10u64.pow(PROVISIONAL_DIGITS);
        let n = rand::thread_rng().gen_range(upper / 10..upper);
        Self {
            value: n.to_string(),
            provisional: true,
        }
    }

    /// Raw token value as sent in the `token` query parameter
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// True until the token has been confirmed or persisted
    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    /// Compare token values, ignoring the provisional flag
    pub fn same_value(&self, other: &str) -> bool {
        self.value == other
    }
}

impl fmt::Display for PairingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisional_token_shape() {
        let token = PairingToken::provisional();
        assert!(token.is_provisional());
        assert_eq!(token.as_str().len(), PROVISIONAL_DIGITS as usize);
        assert!(token.as_str().chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_confirmed_token_trims_whitespace() {
        let token = PairingToken::new("  12345678\n").unwrap();
        assert_eq!(token.as_str(), "12345678");
        assert!(!token.is_provisional());
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            PairingToken::new("   "),
            Err(CoreError::InvalidTokenFormat)
        ));
    }

    #[test]
    fn test_token_value_is_opaque() {
        assert_eq!(PairingToken::new("ab+c/d=").unwrap().as_str(), "ab+c/d=");
        assert_eq!(PairingToken::new("abc&name=x").unwrap().as_str(), "abc&name=x");
    }

    #[test]
    fn test_same_value_ignores_provisional_flag() {
        let provisional = PairingToken::provisional();
        let confirmed = PairingToken::new(provisional.as_str()).unwrap();
        assert!(confirmed.same_value(provisional.as_str()));
        assert_ne!(confirmed, provisional);
    }

    #[test]
    fn test_display_is_raw_value() {
        let token = PairingToken::new("tok-1").unwrap();
        assert_eq!(token.to_string(), "tok-1");
    }
}
