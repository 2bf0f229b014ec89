#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use ixxat_rs::api::{Handle, VciApi, VciDeviceInfo, VciId};
use ixxat_rs::can::{BitrateRegisterPair, CanChanStatus, CanLineStatus, CanMsg, OperatingMode};
use ixxat_rs::{VciCode, VciError};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    EnumOpen,
    EnumNext(Handle),
    EnumClose(Handle),
    SelectDialog,
    DeviceOpen(VciId),
    DeviceClose(Handle),
    ChannelOpen(Handle, u32, bool),
    ChannelInitialize(Handle, u16, u16, u16, u16),
    ChannelActivate(Handle, bool),
    ChannelSend(Handle, u32, CanMsg),
    ChannelRead(Handle, u32),
    ChannelPeek(Handle),
    ChannelStatus(Handle),
    ChannelClose(Handle),
    ControlOpen(Handle, u32),
    ControlInitialize(Handle, OperatingMode, BitrateRegisterPair),
    ControlStatus(Handle),
    ControlSetAccFilter(Handle, bool, u32, u32),
    ControlStart(Handle, bool),
    ControlReset(Handle),
    ControlClose(Handle),
    DetectBitrate(Handle, u16, Vec<u8>, Vec<u8>),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnumOpen => "enum_open",
            Self::EnumNext(..) => "enum_next",
            Self::EnumClose(..) => "enum_close",
            Self::SelectDialog => "select_dialog",
            Self::DeviceOpen(..) => "device_open",
            Self::DeviceClose(..) => "device_close",
            Self::ChannelOpen(..) => "channel_open",
            Self::ChannelInitialize(..) => "channel_initialize",
            Self::ChannelActivate(..) => "channel_activate",
            Self::ChannelSend(..) => "channel_send",
            Self::ChannelRead(..) => "channel_read",
            Self::ChannelPeek(..) => "channel_peek",
            Self::ChannelStatus(..) => "channel_status",
            Self::ChannelClose(..) => "channel_close",
            Self::ControlOpen(..) => "control_open",
            Self::ControlInitialize(..) => "control_initialize",
            Self::ControlStatus(..) => "control_status",
            Self::ControlSetAccFilter(..) => "control_set_acc_filter",
            Self::ControlStart(..) => "control_start",
            Self::ControlReset(..) => "control_reset",
            Self::ControlClose(..) => "control_close",
            Self::DetectBitrate(..) => "detect_bitrate",
        }
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub failures: HashMap<&'static str, VciCode>,
    pub devices: Vec<VciDeviceInfo>,
    pub enum_pos: usize,
    pub picker: Option<VciId>,
    pub next_handle: usize,
    pub rx: VecDeque<CanMsg>,
    /// Code of a read on an empty queue, `TIMEOUT` when unset.
    pub empty_rx: Option<VciCode>,
    pub line_status: CanLineStatus,
    pub chan_status: CanChanStatus,
    pub detect_index: i32,
    pub formatted: Vec<VciCode>,
}

/// Scripted in-memory driver. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MockVci(Arc<Mutex<MockState>>);

impl MockVci {
    /// A driver with one attached device, id 42.
    pub fn with_device() -> Self {
        let mock = Self::default();
        mock.state().devices.push(VciDeviceInfo::new(VciId(42), "USB-to-CAN V2"));
        mock
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fail(&self, name: &'static str, code: VciCode) -> &Self {
        self.state().failures.insert(name, code);
        self
    }

    pub fn clear_failure(&self, name: &'static str) -> &Self {
        self.state().failures.remove(name);
        self
    }

    pub fn push_rx(&self, msg: CanMsg) -> &Self {
        self.state().rx.push_back(msg);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.state().calls.iter().map(Call::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.state().calls.iter().filter(|c| c.name() == name).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    fn record(&self, call: Call) -> Result<(), VciCode> {
        let mut state = self.state();
        let name = call.name();
        state.calls.push(call);
        match state.failures.get(name) {
            Some(&code) => Err(code),
            None => Ok(()),
        }
    }

    fn handle(&self) -> Handle {
        let mut state = self.state();
        state.next_handle += 1;
        Handle::new(0x1000 + state.next_handle)
    }
}

impl VciApi for MockVci {
    fn load(_: Option<String>) -> Result<Self, VciError> {
        Ok(Self::with_device())
    }

    fn enum_device_open(&self) -> Result<Handle, VciCode> {
        self.record(Call::EnumOpen)?;
        self.state().enum_pos = 0;
        Ok(self.handle())
    }

    fn enum_device_next(&self, enumerator: Handle) -> Result<VciDeviceInfo, VciCode> {
        self.record(Call::EnumNext(enumerator))?;
        let mut state = self.state();
        let pos = state.enum_pos;
        match state.devices.get(pos).copied() {
            Some(info) => {
                state.enum_pos += 1;
                Ok(info)
            },
            None => Err(VciCode::NO_MORE_ITEMS),
        }
    }

    fn enum_device_close(&self, enumerator: Handle) -> Result<(), VciCode> {
        self.record(Call::EnumClose(enumerator))
    }

    fn select_device_dialog(&self) -> Result<VciId, VciCode> {
        self.record(Call::SelectDialog)?;
        self.state().picker.ok_or(VciCode::NOT_IMPLEMENTED)
    }

    fn device_open(&self, id: VciId) -> Result<Handle, VciCode> {
        self.record(Call::DeviceOpen(id))?;
        Ok(self.handle())
    }

    fn device_close(&self, device: Handle) -> Result<(), VciCode> {
        self.record(Call::DeviceClose(device))
    }

    fn channel_open(&self, device: Handle, can_no: u32, exclusive: bool) -> Result<Handle, VciCode> {
        self.record(Call::ChannelOpen(device, can_no, exclusive))?;
        Ok(self.handle())
    }

    fn channel_initialize(
        &self,
        channel: Handle,
        rx_fifo_size: u16,
        rx_threshold: u16,
        tx_fifo_size: u16,
        tx_threshold: u16,
    ) -> Result<(), VciCode> {
        self.record(Call::ChannelInitialize(channel, rx_fifo_size, rx_threshold, tx_fifo_size, tx_threshold))
    }

    fn channel_activate(&self, channel: Handle, enable: bool) -> Result<(), VciCode> {
        self.record(Call::ChannelActivate(channel, enable))
    }

    fn channel_send(&self, channel: Handle, timeout: u32, msg: &CanMsg) -> Result<(), VciCode> {
        self.record(Call::ChannelSend(channel, timeout, *msg))
    }

    fn channel_read(&self, channel: Handle, timeout: u32) -> Result<CanMsg, VciCode> {
        self.record(Call::ChannelRead(channel, timeout))?;
        let mut state = self.state();
        let empty = state.empty_rx.unwrap_or(VciCode::TIMEOUT);
        state.rx.pop_front().ok_or(empty)
    }

    fn channel_peek(&self, channel: Handle) -> Result<CanMsg, VciCode> {
        self.record(Call::ChannelPeek(channel))?;
        self.state().rx.front().copied().ok_or(VciCode::NO_DATA)
    }

    fn channel_status(&self, channel: Handle) -> Result<CanChanStatus, VciCode> {
        self.record(Call::ChannelStatus(channel))?;
        Ok(self.state().chan_status)
    }

    fn channel_close(&self, channel: Handle) -> Result<(), VciCode> {
        self.record(Call::ChannelClose(channel))
    }

    fn control_open(&self, device: Handle, can_no: u32) -> Result<Handle, VciCode> {
        self.record(Call::ControlOpen(device, can_no))?;
        Ok(self.handle())
    }

    fn control_initialize(&self, control: Handle, mode: OperatingMode, bitrate: BitrateRegisterPair) -> Result<(), VciCode> {
        self.record(Call::ControlInitialize(control, mode, bitrate))
    }

    fn control_status(&self, control: Handle) -> Result<CanLineStatus, VciCode> {
        self.record(Call::ControlStatus(control))?;
        Ok(self.state().line_status)
    }

    fn control_set_acc_filter(&self, control: Handle, extended: bool, code: u32, mask: u32) -> Result<(), VciCode> {
        self.record(Call::ControlSetAccFilter(control, extended, code, mask))
    }

    fn control_start(&self, control: Handle, start: bool) -> Result<(), VciCode> {
        self.record(Call::ControlStart(control, start))
    }

    fn control_reset(&self, control: Handle) -> Result<(), VciCode> {
        self.record(Call::ControlReset(control))
    }

    fn control_close(&self, control: Handle) -> Result<(), VciCode> {
        self.record(Call::ControlClose(control))
    }

    fn detect_bitrate(&self, control: Handle, timeout: u16, btr0: &[u8], btr1: &[u8]) -> Result<i32, VciCode> {
        self.record(Call::DetectBitrate(control, timeout, btr0.to_vec(), btr1.to_vec()))?;
        Ok(self.state().detect_index)
    }

    fn format_error(&self, code: VciCode) -> String {
        self.state().formatted.push(code);
        format!("mock: {}", code)
    }
}
