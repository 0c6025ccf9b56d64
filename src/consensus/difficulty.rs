//! Difficulty targets
//!
//! Headers carry the target in compact form: one exponent byte (target byte
//! length) followed by a 23-bit mantissa and a sign bit. HARBI never has
//! negative targets, so a set sign bit decodes to a zero target, which no
//! proof of work can meet.

use num_bigint::BigUint;
use num_traits::Zero;

const MANTISSA_MASK: u32 = 0x007f_ffff;
const SIGN_BIT: u32 = 0x0080_0000;

/// Convert compact difficulty bits to the full target
pub fn compact_to_target(bits: u32) -> BigUint {
    let exponent = bits >> 24;
    let mantissa = bits & MANTISSA_MASK;

    if bits & SIGN_BIT != 0 || mantissa == 0 {
        return BigUint::zero();
    }

    if exponent <= 3 {
        BigUint::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigUint::from(mantissa) << (8 * (exponent - 3) as usize)
    }
}

/// Convert a target to compact difficulty bits
pub fn target_to_compact(target: &BigUint) -> u32 {
    if target.is_zero() {
        return 0;
    }

    let bytes = target.to_bytes_be();
    let mut exponent = bytes.len() as u32;

    let mut mantissa = if bytes.len() <= 3 {
        let mut word = 0u32;
        for b in &bytes {
            word = (word << 8) | *b as u32;
        }
        word << (8 * (3 - bytes.len()))
    } else {
        ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32
    };

    // Keep the sign bit clear
    if mantissa & SIGN_BIT != 0 {
        mantissa >>= 8;
        exponent += 1;
    }

    (exponent << 24) | mantissa
}

/// Expected number of hashes needed to meet `bits`: 2^256 / (target + 1)
pub fn calc_work(bits: u32) -> BigUint {
    let target = compact_to_target(bits);
    if target.is_zero() {
        return BigUint::zero();
    }
    (BigUint::from(1u8) << 256usize) / (target + 1u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_roundtrip_on_network_bits() {
        for bits in [0x1e7fffff, 0x207fffff, 0x1d00ffff, 0x1b0404cb] {
            assert_eq!(target_to_compact(&compact_to_target(bits)), bits);
        }
    }

    #[test]
    fn test_small_exponents() {
        assert_eq!(compact_to_target(0x03123456), BigUint::from(0x123456u32));
        assert_eq!(compact_to_target(0x02123456), BigUint::from(0x1234u32));
        assert_eq!(compact_to_target(0x01123456), BigUint::from(0x12u32));
        assert_eq!(target_to_compact(&BigUint::from(0x12u32)), 0x01120000);
    }

    #[test]
    fn test_sign_bit_and_zero_mantissa() {
        assert!(compact_to_target(0x1e800000).is_zero());
        assert!(compact_to_target(0x1e000000).is_zero());
        assert_eq!(target_to_compact(&BigUint::zero()), 0);
    }

    #[test]
    fn test_high_mantissa_bit_moves_exponent() {
        // 0x80 in the top byte would read as the sign bit
        let target = BigUint::from(0x80u32);
        let bits = target_to_compact(&target);
        assert_eq!(bits & SIGN_BIT, 0);
        assert_eq!(compact_to_target(bits), target);
    }

    #[test]
    fn test_work_grows_with_difficulty() {
        assert!(calc_work(0x1d00ffff) > calc_work(0x1e7fffff));
        assert!(calc_work(0x1e7fffff) > calc_work(0x207fffff));
        assert!(calc_work(0x1e800000).is_zero());
    }
}
