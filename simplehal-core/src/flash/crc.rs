//! CRC-16/CCITT-FALSE

use crc::{Crc, CRC_16_IBM_3740};

/// Polynomial 0x1021, initial value 0xFFFF, no reflection, no final XOR
const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Checksum used by flash records and wear-levelled slots
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_check_value() {
        assert_eq!(crc16(b"123456789"), 0x29B1);
    }

    #[test]
    fn test_empty_is_init() {
        assert_eq!(crc16(&[]), 0xFFFF);
    }

    proptest! {
        #[test]
        fn test_single_bit_flip_detected(
            data in proptest::collection::vec(any::<u8>(), 1..60),
            bit in 0usize..480,
        ) {
            let bit = bit % (data.len() * 8);
            let mut flipped = data.clone();
            flipped[bit / 8] ^= 1 << (bit % 8);
            prop_assert_ne!(crc16(&data), crc16(&flipped));
        }
    }
}
