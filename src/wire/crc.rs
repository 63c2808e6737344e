//! CRC-8 used for frame trailers and the sync handshake.

/// CRC-8, polynomial 0x07, initial value 0, MSB-first, no reflection.
///
/// The microcontroller runs the same update over every received frame and
/// rejects the frame on mismatch, so this has to stay bit-exact.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ 0x07;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc8(&[]), 0);
    }

    #[test]
    fn known_command_vectors() {
        // Trailer bytes for the two framed handshake commands.
        assert_eq!(crc8(&[0x33]), 0x99);
        assert_eq!(crc8(&[0xCC]), 0x6A);
    }

    #[test]
    fn deterministic() {
        let payload = [0x00, 0x02, 0x00, 0x80, 0x80, 0x80, 0x80, 0x00];
        assert_eq!(crc8(&payload), crc8(&payload));
    }

    #[test]
    fn appending_crc_cancels_to_zero() {
        // A frame with a valid trailer always re-checksums to 0. The
        // firmware relies on this to validate frames in one pass.
        for payload in [
            &[0x33][..],
            &[0xCC][..],
            &[0x00, 0x02, 0x00, 0x80, 0x80, 0x80, 0x80, 0x00][..],
            &[0xFF; 9][..],
        ] {
            let mut frame = payload.to_vec();
            frame.push(crc8(payload));
            assert_eq!(crc8(&frame), 0, "payload {payload:02X?}");
        }
    }
}
