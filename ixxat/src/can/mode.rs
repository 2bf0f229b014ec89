use std::str::FromStr;
use bitflags::bitflags;
use crate::error::VciError;

bitflags! {
    /// Controller operating mode, `CAN_OPMODE_*`. Empty is undefined.
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct OperatingMode: u8 {
        /// reception of 11-bit id messages
        const STANDARD = 0x01;
        /// reception of 29-bit id messages
        const EXTENDED = 0x02;
        /// enable reception of error frames
        const ERRFRAME = 0x04;
        /// listen only mode (TX passive)
        const LISTONLY = 0x08;
        /// use low speed bus interface
        const LOWSPEED = 0x10;
    }
}

impl Default for OperatingMode {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl FromStr for OperatingMode {
    type Err = VciError;

    /// Comma separated, e.g. `"29bit,listen"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .try_fold(Self::empty(), |mode, item| {
                let flag = match item.to_ascii_lowercase().as_str() {
                    "11bit" | "standard" | "base" => Self::STANDARD,
                    "29bit" | "extended" => Self::EXTENDED,
                    "err" | "errframe" => Self::ERRFRAME,
                    "listen" | "listenonly" | "listonly" => Self::LISTONLY,
                    "low" | "lowspeed" => Self::LOWSPEED,
                    other => return Err(VciError::InvalidArgument(format!("operating mode `{}`", other))),
                };
                Ok(mode | flag)
            })
    }
}
