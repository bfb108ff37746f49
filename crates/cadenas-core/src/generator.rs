//! Cryptographically random numeric codes.

use rand::{rngs::OsRng, Rng};

use cadenas_contracts::settings::{DEFAULT_CODE_LENGTH, MAX_CODE_LENGTH, MIN_CODE_LENGTH};

use crate::traits::CodeGenerator;

/// Map a requested code length onto the supported range.
///
/// Anything outside `MIN_CODE_LENGTH..=MAX_CODE_LENGTH` falls back to
/// `DEFAULT_CODE_LENGTH` rather than being clamped to the nearest bound.
pub fn normalize_code_length(requested: i64) -> usize {
    if (MIN_CODE_LENGTH as i64..=MAX_CODE_LENGTH as i64).contains(&requested) {
        requested as usize
    } else {
        DEFAULT_CODE_LENGTH as usize
    }
}

/// Draws every digit independently from the operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngCodeGenerator;

impl CodeGenerator for OsRngCodeGenerator {
    fn generate(&self, length: usize) -> String {
        (0..length)
            .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
            .collect()
    }
}

/// Generate a code of `length` digits (normalized) with the OS CSPRNG.
pub fn generate_code(length: i64) -> String {
    OsRngCodeGenerator.generate(normalize_code_length(length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths_in_range_are_kept() {
        for len in 4..=10 {
            assert_eq!(normalize_code_length(len), len as usize);
        }
    }

    #[test]
    fn test_out_of_range_lengths_fall_back_to_default() {
        assert_eq!(normalize_code_length(3), 4);
        assert_eq!(normalize_code_length(11), 4);
        assert_eq!(normalize_code_length(0), 4);
        assert_eq!(normalize_code_length(-6), 4);
    }

    #[test]
    fn test_generated_codes_are_digits_of_requested_length() {
        for len in [4, 6, 10] {
            let code = generate_code(len);
            assert_eq!(code.len(), len as usize);
            assert!(code.bytes().all(|b| b.is_ascii_digit()), "non-digit in {code}");
        }
    }

    #[test]
    fn test_digits_are_not_constant() {
        // 200 ten-digit codes being identical has probability 10^-1990.
        let first = generate_code(10);
        assert!((0..200).any(|_| generate_code(10) != first));
    }
}
