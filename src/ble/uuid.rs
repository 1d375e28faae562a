//! GATT UUIDs.
//!
//! 128-bit UUIDs are stored big-endian, in the order they are written as
//! text. Platforms that hand out little-endian arrays convert at their
//! boundary with [`Uuid::from_le_bytes`].

/// A 16-bit SIG-assigned or full 128-bit UUID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uuid {
    Uuid16(u16),
    Uuid128([u8; 16]),
}

/// Client Characteristic Configuration Descriptor.
pub const CCCD: Uuid = Uuid::Uuid16(0x2902);

impl Uuid {
    pub const fn from_u128(value: u128) -> Self {
        Uuid::Uuid128(value.to_be_bytes())
    }

    /// Build from the little-endian byte order used on the air.
    pub fn from_le_bytes(mut bytes: [u8; 16]) -> Self {
        bytes.reverse();
        Uuid::Uuid128(bytes)
    }

    /// Little-endian byte order used on the air.
    pub fn to_le_bytes(&self) -> Option<[u8; 16]> {
        self.as_uuid128().map(|b| {
            let mut out = *b;
            out.reverse();
            out
        })
    }

    pub fn as_uuid128(&self) -> Option<&[u8; 16]> {
        match self {
            Uuid::Uuid128(bytes) => Some(bytes),
            Uuid::Uuid16(_) => None,
        }
    }

    pub fn is_128(&self) -> bool {
        matches!(self, Uuid::Uuid128(_))
    }

    /// Parse the canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` form or a
    /// four-digit 16-bit UUID.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.as_bytes();
        if text.len() == 4 {
            let mut value = 0u16;
            for &c in text {
                value = (value << 4) | hex_digit(c)? as u16;
            }
            return Some(Uuid::Uuid16(value));
        }

        if text.len() != 36 {
            return None;
        }

        let mut bytes = [0u8; 16];
        let mut nibbles = 0usize;
        for (i, &c) in text.iter().enumerate() {
            if matches!(i, 8 | 13 | 18 | 23) {
                if c != b'-' {
                    return None;
                }
                continue;
            }
            let digit = hex_digit(c)?;
            let byte = &mut bytes[nibbles / 2];
            *byte = (*byte << 4) | digit;
            nibbles += 1;
        }
        Some(Uuid::Uuid128(bytes))
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical_128() {
        let uuid = Uuid::parse("00050000-0000-1000-0000-d8492fffa821").unwrap();
        assert_eq!(uuid, Uuid::from_u128(0x00050000_0000_1000_0000_d8492fffa821));
        assert_eq!(uuid.as_uuid128().unwrap()[0..4], [0x00, 0x05, 0x00, 0x00]);
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Uuid::parse("").is_none());
        assert!(Uuid::parse("00050000_0000-1000-0000-d8492fffa821").is_none());
        assert!(Uuid::parse("0005000g-0000-1000-0000-d8492fffa821").is_none());
        assert!(Uuid::parse("00050000-0000-1000-0000-d8492fffa82").is_none());
    }

    #[test]
    fn parse_16_bit() {
        assert_eq!(Uuid::parse("2902"), Some(CCCD));
    }

    #[test]
    fn le_conversion_reverses() {
        let uuid = Uuid::from_u128(0x0102030405060708090a0b0c0d0e0f10);
        let le = uuid.to_le_bytes().unwrap();
        assert_eq!(le[0], 0x10);
        assert_eq!(le[15], 0x01);
        assert_eq!(Uuid::from_le_bytes(le), uuid);
        assert!(CCCD.to_le_bytes().is_none());
    }
}
