#[allow(non_snake_case, non_camel_case_types)]
mod vcinpl;
pub use vcinpl::Vcinpl;

use std::ffi::{c_char, c_uchar, c_void};
use crate::can::{BitrateRegisterPair, CanChanStatus, CanLineStatus, CanMsg, OperatingMode};
use crate::error::{VciCode, VciError};
use crate::utils::c_str_to_string;

/// Opaque driver handle, `HANDLE`.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Handle(usize);

impl Handle {
    #[inline]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }
    #[inline]
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        if ptr.is_null() { None } else { Some(Self(ptr as usize)) }
    }
    #[inline]
    pub fn as_ptr(&self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

/// `VCIID`, the locally unique id of a device.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct VciId(pub i64);

/// `VCIDEVICEINFO`. Only the leading object id and the two strings are read, the
/// remaining driver fields are kept as raw bytes.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct VciDeviceInfo {
    pub(crate) object_id: VciId,
    pub(crate) device_class: [c_uchar; 16],
    pub(crate) versions: [c_uchar; 8],
    pub(crate) unique_hardware_id: [c_uchar; 16],
    pub(crate) description: [c_char; 128],
    pub(crate) manufacturer: [c_char; 126],
    pub(crate) reserved: [c_uchar; 210],
}

impl Default for VciDeviceInfo {
    fn default() -> Self {
        Self {
            object_id: Default::default(),
            device_class: [0; 16],
            versions: [0; 8],
            unique_hardware_id: [0; 16],
            description: [0; 128],
            manufacturer: [0; 126],
            reserved: [0; 210],
        }
    }
}

impl std::fmt::Debug for VciDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VciDeviceInfo")
            .field("object_id", &self.object_id)
            .field("description", &self.description())
            .field("manufacturer", &self.manufacturer())
            .finish()
    }
}

impl VciDeviceInfo {
    pub fn new(object_id: VciId, description: &str) -> Self {
        let mut info = Self { object_id, ..Default::default() };
        description.bytes()
            .take(info.description.len() - 1)
            .enumerate()
            .for_each(|(i, b)| info.description[i] = b as c_char);
        info
    }

    #[inline]
    pub fn object_id(&self) -> VciId {
        self.object_id
    }

    pub fn description(&self) -> String {
        c_array_to_string(&self.description)
    }

    pub fn manufacturer(&self) -> String {
        c_array_to_string(&self.manufacturer)
    }
}

#[inline]
fn c_array_to_string(src: &[c_char]) -> String {
    if src.contains(&0) {
        c_str_to_string(src.as_ptr()).unwrap_or_default()
    } else {
        String::new()
    }
}

/// The vendor CAN driver, one method per consumed `vci*`/`can*` call. Every call reports
/// the driver's result code verbatim on failure.
#[allow(unused_variables)]
pub trait VciApi {
    /// Bring the driver up, `library` overrides the default library location.
    fn load(library: Option<String>) -> Result<Self, VciError>
    where
        Self: Sized;

    fn enum_device_open(&self) -> Result<Handle, VciCode>;
    fn enum_device_next(&self, enumerator: Handle) -> Result<VciDeviceInfo, VciCode>;
    fn enum_device_close(&self, enumerator: Handle) -> Result<(), VciCode>;
    /// Interactive device selection dialog.
    fn select_device_dialog(&self) -> Result<VciId, VciCode> {
        Err(VciCode::NOT_IMPLEMENTED)
    }
    fn device_open(&self, id: VciId) -> Result<Handle, VciCode>;
    fn device_close(&self, device: Handle) -> Result<(), VciCode>;

    fn channel_open(&self, device: Handle, can_no: u32, exclusive: bool) -> Result<Handle, VciCode>;
    fn channel_initialize(
        &self,
        channel: Handle,
        rx_fifo_size: u16,
        rx_threshold: u16,
        tx_fifo_size: u16,
        tx_threshold: u16,
    ) -> Result<(), VciCode>;
    fn channel_activate(&self, channel: Handle, enable: bool) -> Result<(), VciCode>;
    fn channel_send(&self, channel: Handle, timeout: u32, msg: &CanMsg) -> Result<(), VciCode>;
    fn channel_read(&self, channel: Handle, timeout: u32) -> Result<CanMsg, VciCode>;
    fn channel_peek(&self, channel: Handle) -> Result<CanMsg, VciCode>;
    fn channel_status(&self, channel: Handle) -> Result<CanChanStatus, VciCode>;
    fn channel_close(&self, channel: Handle) -> Result<(), VciCode>;

    fn control_open(&self, device: Handle, can_no: u32) -> Result<Handle, VciCode>;
    fn control_initialize(&self, control: Handle, mode: OperatingMode, bitrate: BitrateRegisterPair) -> Result<(), VciCode>;
    fn control_status(&self, control: Handle) -> Result<CanLineStatus, VciCode>;
    fn control_set_acc_filter(&self, control: Handle, extended: bool, code: u32, mask: u32) -> Result<(), VciCode>;
    fn control_start(&self, control: Handle, start: bool) -> Result<(), VciCode>;
    fn control_reset(&self, control: Handle) -> Result<(), VciCode>;
    fn control_close(&self, control: Handle) -> Result<(), VciCode>;
    /// Test the bus with each `(btr0[i], btr1[i])` and return the matching index. The index
    /// may be negative or out of range when nothing matched.
    fn detect_bitrate(&self, control: Handle, timeout: u16, btr0: &[u8], btr1: &[u8]) -> Result<i32, VciCode>;

    fn format_error(&self, code: VciCode) -> String {
        code.to_string()
    }
}
