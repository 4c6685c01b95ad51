//! Frame check sequence: CRC-32 over the MPDU, transmitted least
//! significant byte first.
use crc::{Crc, CRC_32_ISO_HDLC};

use crate::{Error, Result};

pub const FCS_LEN: usize = 4;

const FCS: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Computes the FCS of the given MPDU (without FCS).
pub fn compute(mpdu: &[u8]) -> u32 {
    FCS.checksum(mpdu)
}

/// Verifies the trailing FCS of a received MPDU and returns the MPDU without
/// it.
pub fn check_and_strip(mpdu_with_fcs: &[u8]) -> Result<&[u8]> {
    let payload_len = mpdu_with_fcs.len().checked_sub(FCS_LEN).ok_or(Error)?;
    let (mpdu, fcs) = mpdu_with_fcs.split_at(payload_len);
    let fcs = u32::from_le_bytes([fcs[0], fcs[1], fcs[2], fcs[3]]);
    if compute(mpdu) != fcs {
        return Err(Error);
    }
    Ok(mpdu)
}

/// Returns the MPDU without its trailing FCS, without verifying it. For
/// radios that already dropped frames with a bad FCS.
pub fn strip(mpdu_with_fcs: &[u8]) -> Result<&[u8]> {
    let payload_len = mpdu_with_fcs.len().checked_sub(FCS_LEN).ok_or(Error)?;
    Ok(&mpdu_with_fcs[..payload_len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_value() {
        assert_eq!(compute(b"123456789"), 0xcbf4_3926);
    }

    #[test]
    fn verify_and_strip() {
        let mut frame = [0u8; 32];
        frame[..28].copy_from_slice(&[0x5a; 28]);
        let fcs = compute(&frame[..28]);
        frame[28..].copy_from_slice(&fcs.to_le_bytes());

        assert_eq!(check_and_strip(&frame).unwrap(), &frame[..28]);

        frame[3] ^= 0x01;
        assert!(check_and_strip(&frame).is_err());
        assert_eq!(strip(&frame).unwrap().len(), 28);
    }

    #[test]
    fn too_short_for_fcs() {
        assert!(check_and_strip(&[0u8; 3]).is_err());
        assert!(strip(&[0u8; 3]).is_err());
    }
}
