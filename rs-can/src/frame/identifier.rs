use bitflags::bitflags;
use crate::constants::{EFF_MASK, SFF_MASK};

bitflags! {
    /// Identifier flags carried above the 29-bit identifier.
    ///
    /// Bit 31 marks an extended identifier, as in the Linux [SocketCAN][socketcan] format,
    /// so a small extended identifier can travel as one 32-bit value between layers.
    ///
    /// [socketcan]: https://www.kernel.org/doc/Documentation/networking/can.txt
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct IdentifierFlags: u32 {
        /// The frame is using the extended format i.e. 29-bit extended identifiers.
        const EXTENDED = 0x8000_0000;
    }
}

/// Acceptance filter, a frame passes when `id & can_mask == can_id & can_mask`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Filter {
    pub can_id: u32,
    pub can_mask: u32,
    pub extended: bool
}

impl Filter {
    /// A filter that lets every frame through.
    #[inline]
    pub const fn accept_all(extended: bool) -> Self {
        Self { can_id: 0, can_mask: 0, extended }
    }

    #[inline]
    pub fn matches(&self, id: Id) -> bool {
        let bits = id.into_bits();
        bits & self.can_mask == self.can_id & self.can_mask
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Id {
    Standard(u16),
    Extended(u32),
}

impl From<Id> for u32 {
    #[inline]
    fn from(id: Id) -> Self {
        id.into_bits()
    }
}

impl From<u32> for Id {
    #[inline]
    fn from(id: u32) -> Self {
        Self::from_raw(id)
    }
}

impl Id {
    #[inline]
    pub fn new_standard(id: u16) -> Self {
        Self::Standard(id & SFF_MASK as u16)
    }

    #[inline]
    pub fn new_extended(id: u32) -> Self {
        Self::Extended(id & EFF_MASK)
    }

    /// `force_extend` keeps a small value in the 29-bit format.
    #[inline]
    pub fn from_bits(id: u32, force_extend: Option<bool>) -> Self {
        match force_extend {
            Some(true) => Self::new_extended(id),
            _ => Self::from_raw(id)
        }
    }

    #[inline]
    pub fn into_bits(self) -> u32 {
        match self {
            Self::Standard(id) => id as u32,
            Self::Extended(id) => id,
        }
    }

    #[inline]
    pub fn from_hex(hex_str: &str, force_extend: Option<bool>) -> Option<Self> {
        let bits = u32::from_str_radix(hex_str, 16).ok()?;

        Some(Self::from_bits(bits, force_extend))
    }

    #[inline]
    pub fn into_hex(self) -> String {
        format!("{:08X}", self.into_bits())
    }

    /// Returns the Base ID part of this extended identifier.
    #[inline]
    pub fn standard_id(self) -> Self {
        match self {
            Self::Standard(_) => self,
            Self::Extended(v) => Self::Standard((v >> 18) as u16),     // ID-28 to ID-18
        }
    }

    /// Returns this CAN Identifier as a raw 32-bit integer.
    #[inline]
    pub fn as_raw(self) -> u32 {
        self.into_bits()
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }

    /// Values above the 11-bit range, or carrying [`IdentifierFlags::EXTENDED`], are extended.
    #[inline]
    fn from_raw(id: u32) -> Self {
        match id & IdentifierFlags::EXTENDED.bits() {
            0 => if id > SFF_MASK {
                Self::new_extended(id)
            } else {
                Self::new_standard(id as u16)
            }
            _ => Self::new_extended(id),
        }
    }
}
