//! 128-bit interface and class identifiers.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// A GUID, laid out like the native `GUID` struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid {
    /// First 32 bits.
    pub data1: u32,
    /// Next 16 bits.
    pub data2: u16,
    /// Next 16 bits.
    pub data3: u16,
    /// Last 64 bits, in byte order.
    pub data4: [u8; 8],
}

impl Guid {
    /// The all-zero GUID.
    pub const NULL: Self = Self::from_u128(0);

    /// Builds a GUID from its big-endian 128-bit value, as written in source.
    ///
    /// ```
    /// use ergonomic_win32::guid::Guid;
    ///
    /// let iid = Guid::from_u128(0x00000000_0000_0000_c000_000000000046);
    /// assert_eq!(iid.to_string(), "{00000000-0000-0000-C000-000000000046}");
    /// ```
    pub const fn from_u128(v: u128) -> Self {
        Self {
            data1: (v >> 96) as u32,
            data2: (v >> 80 & 0xFFFF) as u16,
            data3: (v >> 64 & 0xFFFF) as u16,
            data4: (v as u64).to_be_bytes(),
        }
    }

    /// Returns the big-endian 128-bit value.
    pub const fn to_u128(self) -> u128 {
        ((self.data1 as u128) << 96)
            | ((self.data2 as u128) << 80)
            | ((self.data3 as u128) << 64)
            | u64::from_be_bytes(self.data4) as u128
    }

    /// Parses the registry form, with or without braces.
    ///
    /// Hex digits are case-insensitive.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let inner = match (s.starts_with('{'), s.ends_with('}')) {
            (true, true) if s.len() >= 2 => &s[1..s.len() - 1],
            (false, false) => s,
            _ => return Err(Error::string_conversion(format!("Unbalanced braces in GUID: {s}"))),
        };

        let groups: Vec<&str> = inner.split('-').collect();
        let lens = [8, 4, 4, 4, 12];
        if groups.len() != lens.len()
            || groups.iter().zip(lens).any(|(g, n)| g.len() != n)
            || !groups.iter().all(|g| g.bytes().all(|b| b.is_ascii_hexdigit()))
        {
            return Err(Error::string_conversion(format!("Malformed GUID: {s}")));
        }

        let hex: String = groups.concat();
        u128::from_str_radix(&hex, 16)
            .map(Self::from_u128)
            .map_err(|_| Error::string_conversion(format!("Malformed GUID: {s}")))
    }

    /// Returns true for the all-zero GUID.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

#[cfg(windows)]
impl From<Guid> for windows::core::GUID {
    fn from(g: Guid) -> Self {
        windows::core::GUID::from_values(g.data1, g.data2, g.data3, g.data4)
    }
}

#[cfg(windows)]
impl From<windows::core::GUID> for Guid {
    fn from(g: windows::core::GUID) -> Self {
        Self {
            data1: g.data1,
            data2: g.data2,
            data3: g.data3,
            data4: g.data4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IID_IUNKNOWN: u128 = 0x00000000_0000_0000_c000_000000000046;
    const CLSID_FILTER_GRAPH: u128 = 0xe436ebb3_524f_11ce_9f53_0020af0ba770;

    #[test]
    fn test_u128_layout() {
        let g = Guid::from_u128(CLSID_FILTER_GRAPH);
        assert_eq!(g.data1, 0xe436ebb3);
        assert_eq!(g.data2, 0x524f);
        assert_eq!(g.data3, 0x11ce);
        assert_eq!(g.data4, [0x9f, 0x53, 0x00, 0x20, 0xaf, 0x0b, 0xa7, 0x70]);
        assert_eq!(g.to_u128(), CLSID_FILTER_GRAPH);
    }

    #[test]
    fn test_display() {
        let g = Guid::from_u128(CLSID_FILTER_GRAPH);
        assert_eq!(g.to_string(), "{E436EBB3-524F-11CE-9F53-0020AF0BA770}");
    }

    #[test]
    fn test_parse_forms() {
        let braced: Guid = "{00000000-0000-0000-C000-000000000046}".parse().unwrap();
        let bare = Guid::parse("00000000-0000-0000-c000-000000000046").unwrap();
        assert_eq!(braced, bare);
        assert_eq!(braced.to_u128(), IID_IUNKNOWN);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Guid::parse("").is_err());
        assert!(Guid::parse("{00000000-0000-0000-C000-000000000046").is_err());
        assert!(Guid::parse("00000000-0000-0000-C000-00000000004G").is_err());
        assert!(Guid::parse("0000000-00000-0000-C000-000000000046").is_err());
        assert!(Guid::parse("00000000000000000C000000000000046").is_err());
    }

    #[test]
    fn test_null() {
        assert!(Guid::NULL.is_null());
        assert!(Guid::default().is_null());
        assert!(!Guid::from_u128(IID_IUNKNOWN).is_null());
    }

    #[cfg(windows)]
    #[test]
    fn test_native_conversion() {
        let native = windows::core::GUID::from_u128(CLSID_FILTER_GRAPH);
        let ours: Guid = native.into();
        assert_eq!(ours.to_u128(), CLSID_FILTER_GRAPH);
        let back: windows::core::GUID = ours.into();
        assert_eq!(back, native);
    }
}
