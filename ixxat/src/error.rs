use std::fmt::{Display, Formatter};
use rs_can::CanError;

/// Result code returned by every VCI call. Layout: severity(2) | reserved(1) | customer(1)
/// | facility(12) | status(16).
#[repr(transparent)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VciCode(pub u32);

pub const SEV_INFO: u32 = 0x4000_0000;
pub const SEV_WARN: u32 = 0x8000_0000;
pub const SEV_ERROR: u32 = 0xC000_0000;
pub const SEV_MASK: u32 = 0xC000_0000;
pub const CUSTOMER_FLAG: u32 = 0x2000_0000;
pub const STATUS_MASK: u32 = 0x0000_FFFF;
pub const FACILITY_MASK: u32 = 0x0FFF_0000;
pub const FACILITY_VCI: u32 = 0x0001_0000;
const SEV_VCI_ERROR: u32 = SEV_ERROR | CUSTOMER_FLAG | FACILITY_VCI;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

macro_rules! vci_codes {
    ($($name: ident = $status: literal => $text: literal,)+) => {
        impl VciCode {
            $(pub const $name: Self = Self(SEV_VCI_ERROR | $status);)+

            /// Short text of the codes the VCI facility defines.
            pub fn name(&self) -> Option<&'static str> {
                match *self {
                    Self::OK => Some("The operation completed successfully"),
                    $(Self::$name => Some($text),)+
                    _ => None,
                }
            }
        }
    };
}

vci_codes! {
    UNEXPECTED = 0x0001 => "Unexpected failure",
    NOT_IMPLEMENTED = 0x0002 => "Not implemented",
    OUTOFMEMORY = 0x0003 => "Not enough storage is available to complete this operation",
    INVALIDARG = 0x0004 => "One or more parameters are invalid",
    NOINTERFACE = 0x0005 => "The object does not support the requested interface",
    INVPOINTER = 0x0006 => "Invalid pointer",
    INVHANDLE = 0x0007 => "Invalid handle",
    ABORT = 0x0008 => "Operation aborted",
    FAIL = 0x0009 => "Unspecified error",
    ACCESSDENIED = 0x000A => "Access is denied",
    TIMEOUT = 0x000B => "This operation returned because the timeout period expired",
    BUSY = 0x000C => "The requested resource is currently busy",
    PENDING = 0x000D => "The data necessary to complete this operation is not yet available",
    NO_DATA = 0x000E => "No more data available",
    NO_MORE_ITEMS = 0x000F => "No more entries are available from an enumeration operation",
    NOT_INITIALIZED = 0x0010 => "The component is not initialized",
    ALREADY_INITIALIZED = 0x0011 => "An attempt was made to reinitialize an already initialized component",
    RXQUEUE_EMPTY = 0x0012 => "Receive queue empty",
    TXQUEUE_FULL = 0x0013 => "Transmit queue full",
    BUFFER_OVERFLOW = 0x0014 => "The data was too large to fit into the specified buffer",
    INVALID_STATE = 0x0015 => "The component is not in a valid state to perform this request",
    OBJECT_ALREADY_EXISTS = 0x0016 => "The object already exists",
    INVALID_INDEX = 0x0017 => "Invalid index",
    END_OF_FILE = 0x0018 => "The end-of-file marker has been reached",
    DISCONNECTED = 0x0019 => "Attempt to send a message to a disconnected communication port",
    WRONG_FLASHFWVERSION = 0x001A => "Invalid flash firmware version",
}

impl VciCode {
    pub const OK: Self = Self(0);

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        match self.0 & SEV_MASK {
            0 => Severity::Success,
            SEV_INFO => Severity::Info,
            SEV_WARN => Severity::Warning,
            _ => Severity::Error,
        }
    }

    #[inline]
    pub fn facility(&self) -> u16 {
        ((self.0 & FACILITY_MASK) >> 16) as u16
    }

    #[inline]
    pub fn status(&self) -> u16 {
        (self.0 & STATUS_MASK) as u16
    }

    /// Map a raw driver return value onto `Result`.
    #[inline]
    pub fn check(self) -> Result<(), VciCode> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }
}

impl From<i32> for VciCode {
    #[inline]
    fn from(value: i32) -> Self {
        Self(value as u32)
    }
}

impl Display for VciCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.name() {
            Some(name) => write!(f, "0x{:08X}({})", self.0, name),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl std::error::Error for VciCode {}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VciError {
    #[error("IXXAT-VCI - slot: {0} is out of range")]
    SlotOutOfRange(usize),
    #[error("IXXAT-VCI - data length: {0} is too large")]
    DataOutOfRange(usize),
    #[error("IXXAT-VCI - invalid argument: {0}")]
    InvalidArgument(String),
    #[error("IXXAT-VCI - slot: {0} has no opened {1}")]
    InvalidHandle(usize, &'static str),
    #[error("IXXAT-VCI - slot: {0} controller is initialized with another bitrate")]
    Busy(usize),
    #[error("IXXAT-VCI - no data frame available")]
    NoData,
    #[error("IXXAT-VCI - bitrate detection returned index: {0} out of candidates")]
    NoBitrateMatch(i32),
    #[error("IXXAT-VCI - driver error {0}")]
    Driver(VciCode),
}

impl VciError {
    /// The result code this error stands for.
    pub fn code(&self) -> VciCode {
        match self {
            Self::SlotOutOfRange(_)
            | Self::DataOutOfRange(_)
            | Self::InvalidArgument(_) => VciCode::INVALIDARG,
            Self::InvalidHandle(..) => VciCode::INVHANDLE,
            Self::Busy(_) => VciCode::BUSY,
            Self::NoData => VciCode::NO_DATA,
            Self::NoBitrateMatch(_) => VciCode::INVALID_INDEX,
            Self::Driver(code) => *code,
        }
    }
}

impl From<VciCode> for VciError {
    #[inline]
    fn from(code: VciCode) -> Self {
        Self::Driver(code)
    }
}

impl From<VciError> for CanError {
    fn from(e: VciError) -> Self {
        match e {
            VciError::DataOutOfRange(len) => CanError::DataOutOfRange(len),
            VciError::InvalidHandle(_, "device") => CanError::DeviceNotOpened,
            VciError::InvalidHandle(slot, _) => CanError::ChannelNotOpened(slot.to_string()),
            VciError::Driver(VciCode::TIMEOUT) => CanError::TimeoutError(e.to_string()),
            e => CanError::OperationError(e.to_string()),
        }
    }
}
