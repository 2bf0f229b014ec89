use std::ffi::{c_char, c_int, c_uchar, c_uint, c_ushort, c_void};
use std::ptr::null_mut;
use std::sync::Arc;
use dlopen2::symbor::{Container, Symbol, SymBorApi};
use crate::api::{Handle, VciApi, VciDeviceInfo, VciId};
use crate::can::{BitrateRegisterPair, CanChanStatus, CanLineStatus, CanMsg, OperatingMode};
use crate::constant::{IXXAT_ENV, IXXAT_LIBRARY_DEFAULT, IXXAT_VAR, VCI_MAX_ERRSTRLEN};
use crate::error::{VciCode, VciError};
use crate::utils::{c_bool, c_str_to_string};

type HANDLE = *mut c_void;
type HRESULT = c_int;

#[derive(Debug, Clone, SymBorApi)]
pub(crate) struct VcinplApi<'a> {
    /// HRESULT vciEnumDeviceOpen(PHANDLE phEnum);
    vciEnumDeviceOpen: Symbol<'a, unsafe extern "system" fn(enumerator: *mut HANDLE) -> HRESULT>,
    /// HRESULT vciEnumDeviceClose(HANDLE hEnum);
    vciEnumDeviceClose: Symbol<'a, unsafe extern "system" fn(enumerator: HANDLE) -> HRESULT>,
    /// HRESULT vciEnumDeviceNext(HANDLE hEnum, PVCIDEVICEINFO pInfo);
    vciEnumDeviceNext: Symbol<'a, unsafe extern "system" fn(enumerator: HANDLE, info: *mut VciDeviceInfo) -> HRESULT>,
    /// HRESULT vciSelectDeviceDlg(HWND hwndParent, PVCIID pVciid);
    vciSelectDeviceDlg: Option<Symbol<'a, unsafe extern "system" fn(parent: HANDLE, id: *mut VciId) -> HRESULT>>,
    /// HRESULT vciDeviceOpen(REFVCIID rVciid, PHANDLE phDevice);
    vciDeviceOpen: Symbol<'a, unsafe extern "system" fn(id: *const VciId, device: *mut HANDLE) -> HRESULT>,
    /// HRESULT vciDeviceClose(HANDLE hDevice);
    vciDeviceClose: Symbol<'a, unsafe extern "system" fn(device: HANDLE) -> HRESULT>,
    /// void vciFormatError(HRESULT hrError, PCHAR pszText, UINT32 dwsize);
    vciFormatError: Symbol<'a, unsafe extern "system" fn(code: HRESULT, text: *mut c_char, size: c_uint)>,

    /// HRESULT canChannelOpen(HANDLE hDevice, UINT32 dwCanNo, BOOL fExclusive, PHANDLE phCanChn);
    canChannelOpen: Symbol<'a, unsafe extern "system" fn(device: HANDLE, can_no: c_uint, exclusive: c_int, channel: *mut HANDLE) -> HRESULT>,
    /// HRESULT canChannelInitialize(HANDLE hCanChn, UINT16 wRxFifoSize, UINT16 wRxThreshold, UINT16 wTxFifoSize, UINT16 wTxThreshold);
    canChannelInitialize: Symbol<'a, unsafe extern "system" fn(channel: HANDLE, rx_size: c_ushort, rx_threshold: c_ushort, tx_size: c_ushort, tx_threshold: c_ushort) -> HRESULT>,
    /// HRESULT canChannelActivate(HANDLE hCanChn, BOOL fEnable);
    canChannelActivate: Symbol<'a, unsafe extern "system" fn(channel: HANDLE, enable: c_int) -> HRESULT>,
    /// HRESULT canChannelSendMessage(HANDLE hCanChn, UINT32 dwMsTimeout, PCANMSG pCanMsg);
    canChannelSendMessage: Symbol<'a, unsafe extern "system" fn(channel: HANDLE, timeout: c_uint, msg: *const CanMsg) -> HRESULT>,
    /// HRESULT canChannelReadMessage(HANDLE hCanChn, UINT32 dwMsTimeout, PCANMSG pCanMsg);
    canChannelReadMessage: Symbol<'a, unsafe extern "system" fn(channel: HANDLE, timeout: c_uint, msg: *mut CanMsg) -> HRESULT>,
    /// HRESULT canChannelPeekMessage(HANDLE hCanChn, PCANMSG pCanMsg);
    canChannelPeekMessage: Symbol<'a, unsafe extern "system" fn(channel: HANDLE, msg: *mut CanMsg) -> HRESULT>,
    /// HRESULT canChannelGetStatus(HANDLE hCanChn, PCANCHANSTATUS pStatus);
    canChannelGetStatus: Symbol<'a, unsafe extern "system" fn(channel: HANDLE, status: *mut CanChanStatus) -> HRESULT>,
    /// HRESULT canChannelClose(HANDLE hCanChn);
    canChannelClose: Symbol<'a, unsafe extern "system" fn(channel: HANDLE) -> HRESULT>,

    /// HRESULT canControlOpen(HANDLE hDevice, UINT32 dwCanNo, PHANDLE phCanCtl);
    canControlOpen: Symbol<'a, unsafe extern "system" fn(device: HANDLE, can_no: c_uint, control: *mut HANDLE) -> HRESULT>,
    /// HRESULT canControlInitialize(HANDLE hCanCtl, UINT8 bMode, UINT8 bBtr0, UINT8 bBtr1);
    canControlInitialize: Symbol<'a, unsafe extern "system" fn(control: HANDLE, mode: c_uchar, btr0: c_uchar, btr1: c_uchar) -> HRESULT>,
    /// HRESULT canControlGetStatus(HANDLE hCanCtl, PCANLINESTATUS pStatus);
    canControlGetStatus: Symbol<'a, unsafe extern "system" fn(control: HANDLE, status: *mut CanLineStatus) -> HRESULT>,
    /// HRESULT canControlSetAccFilter(HANDLE hCanCtl, BOOL fExtend, UINT32 dwCode, UINT32 dwMask);
    canControlSetAccFilter: Symbol<'a, unsafe extern "system" fn(control: HANDLE, extended: c_int, code: c_uint, mask: c_uint) -> HRESULT>,
    /// HRESULT canControlStart(HANDLE hCanCtl, BOOL fStart);
    canControlStart: Symbol<'a, unsafe extern "system" fn(control: HANDLE, start: c_int) -> HRESULT>,
    /// HRESULT canControlReset(HANDLE hCanCtl);
    canControlReset: Symbol<'a, unsafe extern "system" fn(control: HANDLE) -> HRESULT>,
    /// HRESULT canControlClose(HANDLE hCanCtl);
    canControlClose: Symbol<'a, unsafe extern "system" fn(control: HANDLE) -> HRESULT>,
    /// HRESULT canControlDetectBitrate(HANDLE hCanCtl, UINT16 wMsTimeout, UINT32 dwCount, PUINT8 pabBtr0, PUINT8 pabBtr1, PINT32 plIndex);
    canControlDetectBitrate: Symbol<'a, unsafe extern "system" fn(control: HANDLE, timeout: c_ushort, count: c_uint, btr0: *const c_uchar, btr1: *const c_uchar, index: *mut c_int) -> HRESULT>,
}

/// The vendor library loaded at runtime.
#[derive(Clone)]
pub struct Vcinpl {
    api: Arc<Container<VcinplApi<'static>>>,
}

impl Vcinpl {
    /// Load the library named by `IXXAT_LIBRARY` (optionally set in `ixxat.env`), else the
    /// platform default.
    pub fn new() -> Result<Self, VciError> {
        if let Err(e) = dotenvy::from_filename(IXXAT_ENV) {
            log::debug!("IXXAT-VCI - `{}` not loaded: {}", IXXAT_ENV, e);
        }
        let libpath = std::env::var(IXXAT_VAR)
            .unwrap_or_else(|_| IXXAT_LIBRARY_DEFAULT.into());
        Self::from_path(&libpath)
    }

    pub fn from_path(libpath: &str) -> Result<Self, VciError> {
        log::info!("IXXAT-VCI - loading library: {}", libpath);
        let api = unsafe { Container::load(libpath) }
            .map_err(|e| VciError::InvalidArgument(format!("load `{}` failed: {}", libpath, e)))?;

        Ok(Self { api: Arc::new(api) })
    }

    #[inline(always)]
    fn open_handle(ret: HRESULT, handle: HANDLE) -> Result<Handle, VciCode> {
        VciCode::from(ret).check()?;
        Handle::from_ptr(handle).ok_or(VciCode::INVHANDLE)
    }
}

impl VciApi for Vcinpl {
    fn load(library: Option<String>) -> Result<Self, VciError> {
        match library {
            Some(libpath) => Self::from_path(&libpath),
            None => Self::new(),
        }
    }

    fn enum_device_open(&self) -> Result<Handle, VciCode> {
        let mut handle = null_mut();
        let ret = unsafe { (self.api.vciEnumDeviceOpen)(&mut handle) };
        Self::open_handle(ret, handle)
    }

    fn enum_device_next(&self, enumerator: Handle) -> Result<VciDeviceInfo, VciCode> {
        let mut info = VciDeviceInfo::default();
        VciCode::from(unsafe { (self.api.vciEnumDeviceNext)(enumerator.as_ptr(), &mut info) }).check()?;
        Ok(info)
    }

    fn enum_device_close(&self, enumerator: Handle) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.vciEnumDeviceClose)(enumerator.as_ptr()) }).check()
    }

    fn select_device_dialog(&self) -> Result<VciId, VciCode> {
        match &self.api.vciSelectDeviceDlg {
            Some(func) => {
                let mut id = VciId::default();
                VciCode::from(unsafe { (**func)(null_mut(), &mut id) }).check()?;
                Ok(id)
            },
            None => Err(VciCode::NOT_IMPLEMENTED),
        }
    }

    fn device_open(&self, id: VciId) -> Result<Handle, VciCode> {
        let mut handle = null_mut();
        let ret = unsafe { (self.api.vciDeviceOpen)(&id, &mut handle) };
        Self::open_handle(ret, handle)
    }

    fn device_close(&self, device: Handle) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.vciDeviceClose)(device.as_ptr()) }).check()
    }

    fn channel_open(&self, device: Handle, can_no: u32, exclusive: bool) -> Result<Handle, VciCode> {
        let mut handle = null_mut();
        let ret = unsafe { (self.api.canChannelOpen)(device.as_ptr(), can_no, c_bool(exclusive), &mut handle) };
        Self::open_handle(ret, handle)
    }

    fn channel_initialize(
        &self,
        channel: Handle,
        rx_fifo_size: u16,
        rx_threshold: u16,
        tx_fifo_size: u16,
        tx_threshold: u16,
    ) -> Result<(), VciCode> {
        VciCode::from(unsafe {
            (self.api.canChannelInitialize)(channel.as_ptr(), rx_fifo_size, rx_threshold, tx_fifo_size, tx_threshold)
        }).check()
    }

    fn channel_activate(&self, channel: Handle, enable: bool) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.canChannelActivate)(channel.as_ptr(), c_bool(enable)) }).check()
    }

    fn channel_send(&self, channel: Handle, timeout: u32, msg: &CanMsg) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.canChannelSendMessage)(channel.as_ptr(), timeout, msg) }).check()
    }

    fn channel_read(&self, channel: Handle, timeout: u32) -> Result<CanMsg, VciCode> {
        let mut msg = CanMsg::default();
        VciCode::from(unsafe { (self.api.canChannelReadMessage)(channel.as_ptr(), timeout, &mut msg) }).check()?;
        Ok(msg)
    }

    fn channel_peek(&self, channel: Handle) -> Result<CanMsg, VciCode> {
        let mut msg = CanMsg::default();
        VciCode::from(unsafe { (self.api.canChannelPeekMessage)(channel.as_ptr(), &mut msg) }).check()?;
        Ok(msg)
    }

    fn channel_status(&self, channel: Handle) -> Result<CanChanStatus, VciCode> {
        let mut status = CanChanStatus::default();
        VciCode::from(unsafe { (self.api.canChannelGetStatus)(channel.as_ptr(), &mut status) }).check()?;
        Ok(status)
    }

    fn channel_close(&self, channel: Handle) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.canChannelClose)(channel.as_ptr()) }).check()
    }

    fn control_open(&self, device: Handle, can_no: u32) -> Result<Handle, VciCode> {
        let mut handle = null_mut();
        let ret = unsafe { (self.api.canControlOpen)(device.as_ptr(), can_no, &mut handle) };
        Self::open_handle(ret, handle)
    }

    fn control_initialize(&self, control: Handle, mode: OperatingMode, bitrate: BitrateRegisterPair) -> Result<(), VciCode> {
        VciCode::from(unsafe {
            (self.api.canControlInitialize)(control.as_ptr(), mode.bits(), bitrate.btr0, bitrate.btr1)
        }).check()
    }

    fn control_status(&self, control: Handle) -> Result<CanLineStatus, VciCode> {
        let mut status = CanLineStatus::default();
        VciCode::from(unsafe { (self.api.canControlGetStatus)(control.as_ptr(), &mut status) }).check()?;
        Ok(status)
    }

    fn control_set_acc_filter(&self, control: Handle, extended: bool, code: u32, mask: u32) -> Result<(), VciCode> {
        VciCode::from(unsafe {
            (self.api.canControlSetAccFilter)(control.as_ptr(), c_bool(extended), code, mask)
        }).check()
    }

    fn control_start(&self, control: Handle, start: bool) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.canControlStart)(control.as_ptr(), c_bool(start)) }).check()
    }

    fn control_reset(&self, control: Handle) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.canControlReset)(control.as_ptr()) }).check()
    }

    fn control_close(&self, control: Handle) -> Result<(), VciCode> {
        VciCode::from(unsafe { (self.api.canControlClose)(control.as_ptr()) }).check()
    }

    fn detect_bitrate(&self, control: Handle, timeout: u16, btr0: &[u8], btr1: &[u8]) -> Result<i32, VciCode> {
        if btr0.len() != btr1.len() {
            return Err(VciCode::INVALIDARG);
        }

        let mut index: c_int = -1;
        VciCode::from(unsafe {
            (self.api.canControlDetectBitrate)(
                control.as_ptr(),
                timeout,
                btr0.len() as c_uint,
                btr0.as_ptr(),
                btr1.as_ptr(),
                &mut index,
            )
        }).check()?;
        Ok(index)
    }

    fn format_error(&self, code: VciCode) -> String {
        let mut text = [0 as c_char; VCI_MAX_ERRSTRLEN];
        unsafe { (self.api.vciFormatError)(code.0 as HRESULT, text.as_mut_ptr(), text.len() as c_uint) };

        match c_str_to_string(text.as_ptr()) {
            Ok(v) if !v.is_empty() => v,
            _ => code.to_string(),
        }
    }
}
