use std::ffi::{c_int, c_uchar, c_uint};
use bitflags::bitflags;
use derive_getters::Getters;
use rs_can::{EFF_MASK, MAX_FRAME_SIZE, SFF_MASK};
use crate::can::{BitrateRegisterPair, OperatingMode};
use crate::error::VciError;

/// `CAN_MSGTYPE_*`
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CanMsgType {
    Data = 0,
    Info = 1,
    Error = 2,
    Status = 3,
    Wakeup = 4,
    TimeOverrun = 5,
    TimeReset = 6,
}

impl TryFrom<u8> for CanMsgType {
    type Error = VciError;
    fn try_from(value: u8) -> Result<Self, VciError> {
        match value {
            0 => Ok(Self::Data),
            1 => Ok(Self::Info),
            2 => Ok(Self::Error),
            3 => Ok(Self::Status),
            4 => Ok(Self::Wakeup),
            5 => Ok(Self::TimeOverrun),
            6 => Ok(Self::TimeReset),
            v => Err(VciError::InvalidArgument(format!("message type {}", v))),
        }
    }
}

const DLC_MASK: u8 = 0x0F;
const FLAG_OVR: u8 = 0x10;
const FLAG_SRR: u8 = 0x20;
const FLAG_RTR: u8 = 0x40;
const FLAG_EXT: u8 = 0x80;

/// `CANMSGINFO`, the byte view of the message info union.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CanMsgInfo {
    pub(crate) r#type: c_uchar,
    pub(crate) add_flags: c_uchar,
    /// dlc:4 | ovr:1 | srr:1 | rtr:1 | ext:1
    pub(crate) flags: c_uchar,
    pub(crate) accept: c_uchar,
}

impl CanMsgInfo {
    #[inline]
    pub fn msg_type(&self) -> Result<CanMsgType, VciError> {
        CanMsgType::try_from(self.r#type)
    }
    #[inline]
    pub fn dlc(&self) -> u8 {
        self.flags & DLC_MASK
    }
    #[inline]
    pub fn is_overrun(&self) -> bool {
        self.flags & FLAG_OVR != 0
    }
    #[inline]
    pub fn is_self_reception(&self) -> bool {
        self.flags & FLAG_SRR != 0
    }
    #[inline]
    pub fn is_remote(&self) -> bool {
        self.flags & FLAG_RTR != 0
    }
    #[inline]
    pub fn is_extended(&self) -> bool {
        self.flags & FLAG_EXT != 0
    }

    /// `CAN_MAKE_MSGFLAGS`
    #[inline]
    pub fn make_flags(dlc: u8, ovr: bool, srr: bool, rtr: bool, ext: bool) -> u8 {
        (dlc & DLC_MASK)
            | if ovr { FLAG_OVR } else { 0 }
            | if srr { FLAG_SRR } else { 0 }
            | if rtr { FLAG_RTR } else { 0 }
            | if ext { FLAG_EXT } else { 0 }
    }
}

/// `CANMSG`, the message structure exchanged with the channel FIFOs.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CanMsg {
    pub(crate) time: c_uint,
    pub(crate) msg_id: c_uint,
    pub(crate) info: CanMsgInfo,
    pub(crate) data: [c_uchar; MAX_FRAME_SIZE],
}

impl CanMsg {
    /// Build an outgoing frame. Identifiers above the 11-bit range are sent extended and
    /// every identifier is cut to 29 bits. Remote frames ignore `payload` and `len`.
    /// Without `payload` the dlc is still `len` and the data bytes stay zero.
    pub fn encode(id: u32, remote: bool, payload: Option<&[u8]>, len: usize) -> Result<Self, VciError> {
        let extended = id > SFF_MASK;
        let mut msg = Self {
            msg_id: id & EFF_MASK,
            info: CanMsgInfo {
                r#type: CanMsgType::Data as u8,
                ..Default::default()
            },
            ..Default::default()
        };

        let dlc = if remote {
            0
        } else {
            if len > MAX_FRAME_SIZE {
                return Err(VciError::DataOutOfRange(len));
            }
            if let Some(payload) = payload {
                let src = payload.get(..len)
                    .ok_or_else(|| VciError::InvalidArgument(format!("payload shorter than {} bytes", len)))?;
                msg.data[..len].copy_from_slice(src);
            }
            len as u8
        };
        msg.info.flags = CanMsgInfo::make_flags(dlc, false, false, remote, extended);

        Ok(msg)
    }

    #[inline]
    pub fn time(&self) -> u32 {
        self.time
    }
    #[inline]
    pub fn set_time(&mut self, time: u32) -> &mut Self {
        self.time = time;
        self
    }
    #[inline]
    pub fn set_msg_type(&mut self, r#type: CanMsgType) -> &mut Self {
        self.info.r#type = r#type as u8;
        self
    }
    #[inline]
    pub fn msg_id(&self) -> u32 {
        self.msg_id
    }
    #[inline]
    pub fn info(&self) -> &CanMsgInfo {
        &self.info
    }
    /// Valid payload, at most 8 bytes even if the 4-bit dlc says more.
    #[inline]
    pub fn data(&self) -> &[u8] {
        let len = (self.info.dlc() as usize).min(MAX_FRAME_SIZE);
        &self.data[..len]
    }
}

bitflags! {
    /// `CAN_STATUS_*`
    #[repr(transparent)]
    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    pub struct ControllerStatus: u32 {
        const TX_PENDING = 0x01;
        const OVERRUN = 0x02;
        const ERROR_LIMIT = 0x04;
        const BUS_OFF = 0x08;
        const INIT_MODE = 0x10;
        const BUS_COUPLING_ERROR = 0x20;
    }
}

/// `CANLINESTATUS`
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Getters)]
pub struct CanLineStatus {
    #[getter(skip)]
    pub(crate) op_mode: c_uchar,
    #[getter(skip)]
    pub(crate) bt_reg0: c_uchar,
    #[getter(skip)]
    pub(crate) bt_reg1: c_uchar,
    /// average bus load in percent (0..100)
    #[getter(copy)]
    pub(crate) bus_load: c_uchar,
    #[getter(skip)]
    pub(crate) status: c_uint,
}

impl CanLineStatus {
    pub fn new(mode: OperatingMode, bitrate: BitrateRegisterPair, bus_load: u8, status: ControllerStatus) -> Self {
        Self {
            op_mode: mode.bits(),
            bt_reg0: bitrate.btr0,
            bt_reg1: bitrate.btr1,
            bus_load,
            status: status.bits(),
        }
    }
    #[inline]
    pub fn op_mode(&self) -> OperatingMode {
        OperatingMode::from_bits_retain(self.op_mode)
    }
    /// Bus timing currently applied to the controller.
    #[inline]
    pub fn bitrate(&self) -> BitrateRegisterPair {
        BitrateRegisterPair::new(self.bt_reg0, self.bt_reg1)
    }
    #[inline]
    pub fn status(&self) -> ControllerStatus {
        ControllerStatus::from_bits_retain(self.status)
    }
}

/// `CANCHANSTATUS`
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Getters)]
pub struct CanChanStatus {
    #[getter(copy)]
    pub(crate) line_status: CanLineStatus,
    #[getter(skip)]
    pub(crate) activated: c_int,
    #[getter(skip)]
    pub(crate) rx_overrun: c_int,
    /// receive FIFO load in percent (0..100)
    #[getter(copy)]
    pub(crate) rx_fifo_load: c_uchar,
    /// transmit FIFO load in percent (0..100)
    #[getter(copy)]
    pub(crate) tx_fifo_load: c_uchar,
}

impl CanChanStatus {
    pub fn new(line_status: CanLineStatus, activated: bool, rx_overrun: bool, rx_fifo_load: u8, tx_fifo_load: u8) -> Self {
        Self {
            line_status,
            activated: activated as c_int,
            rx_overrun: rx_overrun as c_int,
            rx_fifo_load,
            tx_fifo_load,
        }
    }
    #[inline]
    pub fn is_activated(&self) -> bool {
        self.activated != 0
    }
    #[inline]
    pub fn is_rx_overrun(&self) -> bool {
        self.rx_overrun != 0
    }
}
