use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const SERIAL_LEN: usize = 6;

/// Stable device identity, the target MAC-like serial a light reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Serial([u8; SERIAL_LEN]);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SerialParseError {
    #[error("serial must be {expected} hex digits, got {0}", expected = SERIAL_LEN * 2)]
    Length(usize),
    #[error("invalid hex digit in serial: {0}")]
    Digit(String),
}

impl Serial {
    pub const fn new(bytes: [u8; SERIAL_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SERIAL_LEN] {
        &self.0
    }
}

impl From<[u8; SERIAL_LEN]> for Serial {
    fn from(bytes: [u8; SERIAL_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl FromStr for Serial {
    type Err = SerialParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != SERIAL_LEN * 2 || !s.is_ascii() {
            return Err(SerialParseError::Length(s.len()));
        }
        let mut bytes = [0u8; SERIAL_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            let pair = &s[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16)
                .map_err(|_| SerialParseError::Digit(pair.to_string()))?;
        }
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_lowercase_hex() {
        let serial = Serial::new([0xd0, 0x73, 0xd5, 0x01, 0xAB, 0x0f]);
        assert_eq!(serial.to_string(), "d073d501ab0f");
    }

    #[test]
    fn test_parse_accepts_mixed_case() {
        let serial: Serial = "D073D501ab0F".parse().unwrap();
        assert_eq!(serial.as_bytes(), &[0xd0, 0x73, 0xd5, 0x01, 0xab, 0x0f]);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            "d073d5".parse::<Serial>(),
            Err(SerialParseError::Length(6))
        );
        assert_eq!(
            "d073d5zz0000".parse::<Serial>(),
            Err(SerialParseError::Digit("zz".to_string()))
        );
    }
}
