/// Capacity of the session table.
pub const CAN_DEV_MAX: usize = 10;

pub(crate) const RX_FIFO_SIZE: u16 = 1024;
pub(crate) const RX_THRESHOLD: u16 = 1;
pub(crate) const TX_FIFO_SIZE: u16 = 128;
pub(crate) const TX_THRESHOLD: u16 = 1;

/// Read timeout of [`crate::SessionManager::receive_wait`].
pub const RECEIVE_TIMEOUT_MS: u32 = 100;
/// Wait until the transmit FIFO has room.
pub const INFINITE: u32 = 0xFFFF_FFFF;
/// Default bitrate detection timeout.
pub const DETECT_TIMEOUT_MS: u16 = 5000;
/// Maximum length of a driver error string.
pub const VCI_MAX_ERRSTRLEN: usize = 256;

pub(crate) const BITRATE_CFG_FILENAME: &str = "bitrate.cfg.yaml";
pub(crate) const IXXAT_ENV: &str = "ixxat.env";
pub(crate) const IXXAT_VAR: &str = "IXXAT_LIBRARY";
#[cfg(target_os = "windows")]
pub(crate) const IXXAT_LIBRARY_DEFAULT: &str = "vcinpl.dll";
#[cfg(not(target_os = "windows"))]
pub(crate) const IXXAT_LIBRARY_DEFAULT: &str = "libvcinpl.so";

/// `DeviceBuilder`/`ChannelConfig` keys.
pub const MODE: &str = "mode";
pub const SELECT: &str = "select";
pub const DETECT: &str = "detect";
pub const TIMEOUT: &str = "timeout";
pub const LIBRARY: &str = "library";
