use byteorder::{BigEndian, ByteOrder};

use crate::{Coil, ProtocolError, Result};

/// Number of bytes needed to carry `count` packed bits.
pub fn packed_size(count: u16) -> usize {
    (count as usize).div_ceil(8)
}

/// Turn big-endian byte pairs into 16bit register values.
pub fn pack_bytes(bytes: &[u8]) -> Result<Vec<u16>> {
    if !bytes.len().is_multiple_of(2) {
        return Err(ProtocolError::OddByteCount(bytes.len()).into());
    }
    Ok(bytes.chunks_exact(2).map(BigEndian::read_u16).collect())
}

/// Take the first `count` bits out of `bytes`, least significant bit first.
pub fn unpack_bits(bytes: &[u8], count: u16) -> Vec<Coil> {
    (0..count as usize)
        .map(|i| {
            let set = bytes
                .get(i / 8)
                .is_some_and(|byte| byte & (1 << (i % 8)) != 0);
            Coil::from(set)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn registers_are_big_endian() {
        let regs = pack_bytes(&[0x00, 0x0a, 0x12, 0x34]).unwrap();
        assert_eq!(regs, vec![10, 0x1234]);
        assert!(pack_bytes(&[]).unwrap().is_empty());
    }

    #[test]
    fn odd_byte_count_reports_its_length() {
        // lengths past 255 are reported as is
        for len in [1usize, 3, 301] {
            match pack_bytes(&vec![0u8; len]) {
                Err(Error::Protocol(ProtocolError::OddByteCount(n))) => assert_eq!(n, len),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn bits_are_lsb_first() {
        let coils = unpack_bits(&[0b0000_0101, 0b0000_0001], 10);
        assert_eq!(coils.len(), 10);
        assert_eq!(coils[0], Coil::On);
        assert_eq!(coils[1], Coil::Off);
        assert_eq!(coils[2], Coil::On);
        assert_eq!(coils[8], Coil::On);
        assert_eq!(coils[9], Coil::Off);
    }

    #[test]
    fn missing_bytes_read_as_off() {
        assert_eq!(unpack_bits(&[0xff], 10)[9], Coil::Off);
    }

    #[test]
    fn packed_sizes() {
        assert_eq!(packed_size(0), 0);
        assert_eq!(packed_size(1), 1);
        assert_eq!(packed_size(8), 1);
        assert_eq!(packed_size(9), 2);
        assert_eq!(packed_size(2000), 250);
    }
}
