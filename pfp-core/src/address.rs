//! PCI function addressing
//!
//! An [`Sbdf`] names one PCI function as `segment:bus:device.function`.
//! Two textual forms exist:
//!
//! - the full sysfs form used by the kernel (`0000:00:1f.3`), produced by
//!   [`Display`](std::fmt::Display);
//! - the compact stanza form (`1f.3`, `3:0.0`, `1:3:0.0`), produced by
//!   [`Sbdf::compact`], which drops a zero segment and a zero bus.
//!
//! [`FromStr`] accepts both: `segment:bus:device.function`,
//! `bus:device.function` and `device.function`, with omitted components
//! defaulting to zero.

use std::fmt;
use std::str::FromStr;

use pfp_error::PfpError;
use serde::{Deserialize, Serialize};

/// Highest device number on a PCI bus
pub const MAX_DEVICE: u8 = 0x1f;

/// Highest function number of a PCI device
pub const MAX_FUNCTION: u8 = 7;

/// Segment:Bus:Device.Function address of a PCI function
///
/// Field order matters: the derived `Ord` compares segment, bus, device and
/// function in that order, which is the canonical fallback sort order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sbdf {
    pub segment: u32,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl Sbdf {
    pub const fn new(segment: u32, bus: u8, device: u8, function: u8) -> Self {
        Self {
            segment,
            bus,
            device,
            function,
        }
    }

    /// Compact stanza form: the segment is written only when non-zero (and
    /// then the bus is always written), the bus only when non-zero.
    pub fn compact(&self) -> String {
        if self.segment != 0 {
            format!(
                "{:x}:{:x}:{:x}.{:o}",
                self.segment, self.bus, self.device, self.function
            )
        } else if self.bus != 0 {
            format!("{:x}:{:x}.{:o}", self.bus, self.device, self.function)
        } else {
            format!("{:x}.{:o}", self.device, self.function)
        }
    }
}

impl fmt::Display for Sbdf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:o}",
            self.segment, self.bus, self.device, self.function
        )
    }
}

impl FromStr for Sbdf {
    type Err = PfpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PfpError::invalid_address(s);
        let s_trim = s.trim();

        let (prefix, dev_fn) = match s_trim.rsplit_once(':') {
            Some((prefix, dev_fn)) => (Some(prefix), dev_fn),
            None => (None, s_trim),
        };

        let (segment, bus) = match prefix {
            None => (0, 0),
            Some(prefix) => match prefix.split_once(':') {
                Some((segment, bus)) => (
                    parse_hex::<u32>(segment).ok_or_else(invalid)?,
                    parse_hex::<u8>(bus).ok_or_else(invalid)?,
                ),
                None => (0, parse_hex::<u8>(prefix).ok_or_else(invalid)?),
            },
        };

        let (device, function) = dev_fn.split_once('.').ok_or_else(invalid)?;
        let device = parse_device(device).ok_or_else(invalid)?;
        let function = parse_function(function).ok_or_else(invalid)?;

        Ok(Self::new(segment, bus, device, function))
    }
}

/// Device number in hex, at most 0x1f
pub(crate) fn parse_device(s: &str) -> Option<u8> {
    parse_hex::<u8>(s).filter(|d| *d <= MAX_DEVICE)
}

/// Function number: a single octal digit
pub(crate) fn parse_function(s: &str) -> Option<u8> {
    if s.len() != 1 {
        return None;
    }
    u8::from_str_radix(s, 8).ok().filter(|f| *f <= MAX_FUNCTION)
}

/// Strict hexadecimal parse: digits only, no sign, no `0x` prefix
pub(crate) fn parse_hex<T: FromHexStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    T::from_hex(s)
}

pub(crate) trait FromHexStr: Sized {
    fn from_hex(s: &str) -> Option<Self>;
}

macro_rules! impl_from_hex {
    ($($t:ty),*) => {
        $(impl FromHexStr for $t {
            fn from_hex(s: &str) -> Option<Self> {
                <$t>::from_str_radix(s, 16).ok()
            }
        })*
    };
}

impl_from_hex!(u8, u16, u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_form() {
        let addr: Sbdf = "0000:00:1f.3".parse().unwrap();
        assert_eq!(addr, Sbdf::new(0, 0, 0x1f, 3));

        let addr: Sbdf = "10000:e1:00.7".parse().unwrap();
        assert_eq!(addr, Sbdf::new(0x10000, 0xe1, 0, 7));
    }

    #[test]
    fn test_parse_short_forms_default_to_zero() {
        assert_eq!("3:0.1".parse::<Sbdf>().unwrap(), Sbdf::new(0, 3, 0, 1));
        assert_eq!("1c.4".parse::<Sbdf>().unwrap(), Sbdf::new(0, 0, 0x1c, 4));
        assert_eq!(" 2.0 ".parse::<Sbdf>().unwrap(), Sbdf::new(0, 0, 2, 0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "1f", "1f.8", "1f.", "20.0", "0:0:0:0.0", "x:0.0", "0.12", "+1.0", "100:0.0"] {
            assert!(bad.parse::<Sbdf>().is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_display_is_sysfs_form() {
        assert_eq!(Sbdf::new(0, 0, 0x1f, 6).to_string(), "0000:00:1f.6");
        assert_eq!(Sbdf::new(1, 0x3a, 2, 0).to_string(), "0001:3a:02.0");
    }

    #[test]
    fn test_compact_form() {
        assert_eq!(Sbdf::new(0, 0, 0x1f, 6).compact(), "1f.6");
        assert_eq!(Sbdf::new(0, 3, 0, 0).compact(), "3:0.0");
        assert_eq!(Sbdf::new(0xc1, 0, 0, 0).compact(), "c1:0:0.0");
    }

    #[test]
    fn test_compact_parses_back() {
        for addr in [Sbdf::new(0, 0, 0, 0), Sbdf::new(0, 5, 0x1f, 7), Sbdf::new(2, 0, 1, 1)] {
            assert_eq!(addr.compact().parse::<Sbdf>().unwrap(), addr);
        }
    }

    #[test]
    fn test_ordering_is_tuple_order() {
        let mut addrs = vec![
            Sbdf::new(1, 0, 0, 0),
            Sbdf::new(0, 2, 0, 0),
            Sbdf::new(0, 0, 3, 1),
            Sbdf::new(0, 0, 3, 0),
        ];
        addrs.sort();
        assert_eq!(
            addrs,
            vec![
                Sbdf::new(0, 0, 3, 0),
                Sbdf::new(0, 0, 3, 1),
                Sbdf::new(0, 2, 0, 0),
                Sbdf::new(1, 0, 0, 0),
            ]
        );
    }
}
