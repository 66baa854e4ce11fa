//! Trusted Platform Module 2 table (`TPM2`).
//!
//! The fixed part ends at offset 52. What follows depends on the declared
//! length: up to 12 bytes of start-method-specific parameters, optionally
//! followed by the 12-byte log area descriptor.
//!
//! | bytes after offset 52 | parameters | log area |
//! |-----------------------|-----------:|----------|
//! | 0..=12                | all of them | no |
//! | 24                    | 12 | yes |
//! | anything else         | 12 | no, the excess is discarded |

use crate::header::open;
use crate::{AcpiError, TableHeader};
use log::warn;

pub const SIGNATURE: &[u8; 4] = b"TPM2";

const FIXED_LEN: usize = 52;
const PARAMETERS_LEN: usize = 12;
const LOG_AREA_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tpm2 {
    pub header: TableHeader,
    pub platform_class: u16,
    pub control_area_address: u64,
    pub start_method: StartMethod,
    pub start_method_parameters: Vec<u8>,
    pub log_area: Option<LogArea>,
}

impl Tpm2 {
    #[must_use]
    pub const fn start_method_data_len(&self) -> usize {
        self.start_method_parameters.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogArea {
    /// Log Area Minimum Length.
    pub minimum_length: u32,
    /// Log Area Start Address.
    pub start_address: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMethod {
    AcpiStart,
    Mmio,
    CommandResponseBuffer,
    CommandResponseBufferWithAcpiStart,
    CommandResponseBufferWithArmSmc,
    FifoOverI2c,
    Reserved(u32),
}

impl From<u32> for StartMethod {
    fn from(v: u32) -> Self {
        match v {
            2 => Self::AcpiStart,
            6 => Self::Mmio,
            7 => Self::CommandResponseBuffer,
            8 => Self::CommandResponseBufferWithAcpiStart,
            11 => Self::CommandResponseBufferWithArmSmc,
            12 => Self::FifoOverI2c,
            _ => Self::Reserved(v),
        }
    }
}

/// Decodes a `TPM2` table.
///
/// # Errors
/// Header errors, or a table shorter than the 52-byte fixed part.
pub fn decode(bytes: &[u8]) -> Result<Tpm2, AcpiError> {
    let (header, mut c) = open(bytes, SIGNATURE)?;
    let platform_class = c.u16()?;
    c.skip(2)?;
    let control_area_address = c.u64()?;
    let start_method = StartMethod::from(c.u32()?);

    let data_len = c.len().saturating_sub(FIXED_LEN);
    let (parameters_len, has_log_area) = match data_len {
        0..=PARAMETERS_LEN => (data_len, false),
        n if n == PARAMETERS_LEN + LOG_AREA_LEN => (PARAMETERS_LEN, true),
        n => {
            warn!(
                "TPM2: {} unexpected byte(s) after the start method parameters are ignored",
                n - PARAMETERS_LEN
            );
            (PARAMETERS_LEN, false)
        }
    };
    let start_method_parameters = c.bytes(parameters_len)?.to_vec();
    let log_area = if has_log_area {
        Some(LogArea {
            minimum_length: c.u32()?,
            start_address: c.u64()?,
        })
    } else {
        None
    };

    Ok(Tpm2 {
        header,
        platform_class,
        control_area_address,
        start_method,
        start_method_parameters,
        log_area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::test_util::table;

    fn tpm2(tail: usize) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0u16.to_le_bytes());
        b.extend_from_slice(&0xFED4_0040u64.to_le_bytes());
        b.extend_from_slice(&7u32.to_le_bytes());
        b.extend((0..tail).map(|i| u8::try_from(i).unwrap()));
        table(SIGNATURE, 4, &b)
    }

    #[test]
    fn no_tail() {
        let t = decode(&tpm2(0)).unwrap();
        assert_eq!(t.header.length, 52);
        assert_eq!(t.start_method, StartMethod::CommandResponseBuffer);
        assert_eq!(t.start_method_data_len(), 0);
        assert!(t.log_area.is_none());
    }

    #[test]
    fn parameters_only() {
        let t = decode(&tpm2(12)).unwrap();
        assert_eq!(t.start_method_data_len(), 12);
        assert!(t.log_area.is_none());
    }

    #[test]
    fn short_parameters() {
        let t = decode(&tpm2(4)).unwrap();
        assert_eq!(t.start_method_parameters, vec![0, 1, 2, 3]);
        assert!(t.log_area.is_none());
    }

    #[test]
    fn parameters_and_log_area() {
        let t = decode(&tpm2(24)).unwrap();
        assert_eq!(t.start_method_data_len(), 12);
        let log = t.log_area.unwrap();
        assert_eq!(log.minimum_length, u32::from_le_bytes([12, 13, 14, 15]));
        assert_eq!(
            log.start_address,
            u64::from_le_bytes([16, 17, 18, 19, 20, 21, 22, 23])
        );
    }

    #[test]
    fn excess_tail_discarded() {
        let t = decode(&tpm2(40)).unwrap();
        assert_eq!(t.start_method_data_len(), 12);
        assert!(t.log_area.is_none());
    }

    #[test]
    fn decode_is_idempotent() {
        let raw = tpm2(24);
        assert_eq!(decode(&raw).unwrap(), decode(&raw).unwrap());
    }
}
