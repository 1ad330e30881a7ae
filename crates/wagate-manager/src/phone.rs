// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recipient phone-number normalization.
//!
//! Recipients arrive in operator-entered shapes: `+CC...`, `00CC...`, bare
//! national numbers with or without a leading zero, and with arbitrary
//! punctuation. Everything is reduced to a plain digit string in
//! international format before it reaches a driver.

use wagate_core::WagateError;

/// Minimum digits in a normalized international number.
const MIN_DIGITS: usize = 8;
/// Maximum digits per E.164.
const MAX_DIGITS: usize = 15;
/// Longest national significant number that country-code expansion applies to.
const MAX_NATIONAL_DIGITS: usize = 10;

/// Normalize `input` into international digit-only form.
///
/// `default_country_code` (e.g. `"966"`) expands bare national numbers and
/// leading-zero numbers; when empty, such inputs are rejected.
pub fn normalize_recipient(input: &str, default_country_code: &str) -> Result<String, WagateError> {
    let trimmed = input.trim();
    let had_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        return Err(WagateError::InvalidRecipient(format!(
            "no digits in {input:?}"
        )));
    }

    let normalized = if had_plus {
        digits
    } else if let Some(rest) = digits.strip_prefix("00") {
        // International dialing prefix.
        rest.to_string()
    } else if let Some(rest) = digits.strip_prefix('0') {
        // National format with trunk zero; needs a country code to expand.
        if default_country_code.is_empty() {
            return Err(WagateError::InvalidRecipient(format!(
                "{input:?} has a leading zero and no default country code is configured"
            )));
        }
        format!("{default_country_code}{rest}")
    } else if !default_country_code.is_empty()
        && !digits.starts_with(default_country_code)
        && digits.len() <= MAX_NATIONAL_DIGITS
    {
        // Bare national number without trunk zero.
        format!("{default_country_code}{digits}")
    } else {
        digits
    };

    if !(MIN_DIGITS..=MAX_DIGITS).contains(&normalized.len()) {
        return Err(WagateError::InvalidRecipient(format!(
            "{input:?} normalizes to {} digits, expected {MIN_DIGITS}-{MAX_DIGITS}",
            normalized.len()
        )));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_zero_expands_with_country_code() {
        assert_eq!(
            normalize_recipient("0501234567", "966").unwrap(),
            "966501234567"
        );
    }

    #[test]
    fn plus_prefix_is_stripped() {
        assert_eq!(
            normalize_recipient("+966501234567", "966").unwrap(),
            "966501234567"
        );
    }

    #[test]
    fn double_zero_prefix_is_stripped() {
        assert_eq!(
            normalize_recipient("00966501234567", "966").unwrap(),
            "966501234567"
        );
    }

    #[test]
    fn bare_national_number_gets_country_code() {
        assert_eq!(
            normalize_recipient("501234567", "966").unwrap(),
            "966501234567"
        );
    }

    #[test]
    fn already_international_is_untouched() {
        assert_eq!(
            normalize_recipient("966501234567", "966").unwrap(),
            "966501234567"
        );
    }

    #[test]
    fn punctuation_is_stripped() {
        assert_eq!(
            normalize_recipient("+966 50-123 45 67", "966").unwrap(),
            "966501234567"
        );
    }

    #[test]
    fn too_short_is_rejected() {
        assert!(normalize_recipient("123", "966").is_err());
    }

    #[test]
    fn too_long_is_rejected() {
        assert!(normalize_recipient("+12345678901234567890", "").is_err());
    }

    #[test]
    fn no_digits_is_rejected() {
        assert!(normalize_recipient("abc", "966").is_err());
        assert!(normalize_recipient("", "966").is_err());
    }

    #[test]
    fn leading_zero_without_country_code_is_rejected() {
        assert!(normalize_recipient("0501234567", "").is_err());
    }

    #[test]
    fn long_number_without_plus_is_not_expanded() {
        // Longer than a national number: assume it already carries its code.
        assert_eq!(
            normalize_recipient("14155552671888", "966").unwrap(),
            "14155552671888"
        );
    }
}
