//! The session table: up to [`CAN_DEV_MAX`] devices, each addressed by the slot number it
//! was selected into.
//!
//! Every call blocks on the driver. The manager holds no lock of its own, mutating calls
//! take `&mut self`, so sharing it between threads needs an outer `Mutex`
//! (see [`crate::IxxatCan`]).

use derive_getters::Getters;
use rs_can::{Filter, Frame};
use crate::api::{Handle, VciApi, VciDeviceInfo};
use crate::can::{BitrateRegisterPair, CanChanStatus, CanMessage, CanMsg, OperatingMode};
use crate::constant::{CAN_DEV_MAX, INFINITE, RECEIVE_TIMEOUT_MS, RX_FIFO_SIZE, RX_THRESHOLD, TX_FIFO_SIZE, TX_THRESHOLD};
use crate::error::{VciCode, VciError};

/// Handles owned by one slot.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Getters)]
pub struct Session {
    #[getter(copy)]
    device: Option<Handle>,
    #[getter(copy)]
    control: Option<Handle>,
    #[getter(copy)]
    channel: Option<Handle>,
    #[getter(copy)]
    mode: OperatingMode,
    /// Bus timing the controller runs with once connected.
    #[getter(copy)]
    bitrate: Option<BitrateRegisterPair>,
}

impl Session {
    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.device.is_some()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.bitrate.is_some()
    }
}

/// Receives every failed lifecycle call with the driver's text for it.
pub trait DiagnosticSink: Send {
    fn enabled(&self) -> bool {
        true
    }
    fn report(&self, code: VciCode, text: &str);
}

#[derive(Debug, Default, Copy, Clone)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    #[inline]
    fn enabled(&self) -> bool {
        false
    }
    #[inline]
    fn report(&self, _: VciCode, _: &str) {}
}

#[derive(Debug, Default, Copy, Clone)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&self, code: VciCode, text: &str) {
        log::error!("IXXAT-VCI - {}: {}", code, text);
    }
}

pub struct SessionManager<A: VciApi> {
    api: A,
    sessions: [Session; CAN_DEV_MAX],
    diagnostics: Box<dyn DiagnosticSink>,
}

impl<A: VciApi> SessionManager<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            sessions: Default::default(),
            diagnostics: Box::new(NoopSink),
        }
    }

    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    #[inline]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[inline]
    pub fn session(&self, slot: usize) -> Result<&Session, VciError> {
        Self::check_slot(slot)?;
        Ok(&self.sessions[slot])
    }

    /// Slots holding a selected device.
    pub fn assigned_slots(&self) -> Vec<usize> {
        self.sessions.iter()
            .enumerate()
            .filter(|(_, s)| s.is_assigned())
            .map(|(i, _)| i)
            .collect()
    }

    /// Every device the driver reports, in enumeration order.
    pub fn list_devices(&self) -> Result<Vec<VciDeviceInfo>, VciError> {
        let enumerator = self.api.enum_device_open()?;
        let mut devices = Vec::new();
        let ret = loop {
            match self.api.enum_device_next(enumerator) {
                Ok(info) => devices.push(info),
                Err(VciCode::NO_MORE_ITEMS) => break Ok(devices),
                Err(code) => break Err(VciError::from(code)),
            }
        };
        self.close_enumerator(enumerator);

        ret
    }

    /// Open a device and assign it to `slot`, the mode is reset to 11-bit.
    ///
    /// With `use_picker` the device comes from the interactive dialog. Without it the first
    /// enumerated device is opened, and that device always lands in slot 0 while the mode is
    /// still reset on `slot`. An assigned slot keeps its device and connection until the new
    /// device is open.
    pub fn select_device(&mut self, use_picker: bool, slot: usize) -> Result<(), VciError> {
        Self::check_slot(slot)?;

        let (target, ret) = if use_picker {
            (slot, self.api.select_device_dialog())
        } else {
            (0, self.first_device().map(|info| info.object_id()))
        };

        match ret.and_then(|id| self.api.device_open(id)) {
            Ok(device) => {
                if self.sessions[target].is_assigned() {
                    log::warn!("IXXAT-VCI - slot: {} is reassigned, closing previous device", target);
                    self.release(target);
                }
                log::info!("IXXAT-VCI - device opened in slot: {}", target);
                self.sessions[target].device = Some(device);
                self.sessions[slot].mode = OperatingMode::STANDARD;
                Ok(())
            },
            Err(code) => Err(self.report(code.into())),
        }
    }

    /// Stored unconditionally, applied by the next connection open.
    pub fn set_operating_mode(&mut self, slot: usize, mode: OperatingMode) -> Result<(), VciError> {
        Self::check_slot(slot)?;
        self.sessions[slot].mode = mode;

        Ok(())
    }

    /// Open channel and controller with a fixed bitrate, accept all identifiers and start
    /// the controller.
    ///
    /// When another application already runs the controller, the connection is shared as
    /// long as its bitrate equals `bitrate`, otherwise [`VciError::Busy`] is returned.
    pub fn open_connection(&mut self, slot: usize, bitrate: BitrateRegisterPair) -> Result<(), VciError> {
        Self::check_slot(slot)?;

        self.prepare(slot)
            .and_then(|control| self.configure(slot, control, bitrate))
            .map_err(|e| self.report(e))
    }

    /// Like [`Self::open_connection`], with the bitrate detected on the bus from `candidates`.
    /// Returns the index of the matched candidate.
    pub fn open_connection_autodetect(
        &mut self,
        slot: usize,
        timeout_ms: u16,
        candidates: &[BitrateRegisterPair],
    ) -> Result<usize, VciError> {
        Self::check_slot(slot)?;
        if candidates.is_empty() {
            return Err(VciError::InvalidArgument("bitrate candidates are empty".into()));
        }

        self.prepare(slot)
            .and_then(|control| {
                let (btr0, btr1): (Vec<u8>, Vec<u8>) = candidates.iter()
                    .map(|p| (p.btr0, p.btr1))
                    .unzip();
                let index = self.api.detect_bitrate(control, timeout_ms, &btr0, &btr1)?;
                let matched = usize::try_from(index).ok()
                    .filter(|i| *i < candidates.len())
                    .ok_or(VciError::NoBitrateMatch(index))?;
                log::debug!("IXXAT-VCI - slot: {} detected bitrate {:?}", slot, candidates[matched]);

                self.configure(slot, control, candidates[matched])?;
                Ok(matched)
            })
            .map_err(|e| self.report(e))
    }

    /// Send one frame, waiting for room in the transmit FIFO without limit.
    ///
    /// Identifiers above 0x7FF are sent extended. `len` is the dlc of a data frame and must
    /// not exceed 8, a remote frame ignores `payload` and `len`.
    pub fn transmit(
        &self,
        slot: usize,
        id: u32,
        remote: bool,
        payload: Option<&[u8]>,
        len: usize,
    ) -> Result<(), VciError> {
        Self::check_slot(slot)?;
        let msg = CanMsg::encode(id, remote, payload, len)?;

        self.send(slot, &msg)
    }

    pub fn transmit_message(&self, slot: usize, msg: &CanMessage) -> Result<(), VciError> {
        Self::check_slot(slot)?;
        let raw = CanMsg::try_from(msg)?;

        self.send(slot, &raw)
    }

    /// Read one frame, waiting up to 100ms. Timeouts come back as the driver reports them.
    #[inline]
    pub fn receive_wait(&self, slot: usize) -> Result<CanMessage, VciError> {
        self.receive(slot, RECEIVE_TIMEOUT_MS)
    }

    /// Read one frame, waiting up to `timeout_ms`.
    pub fn receive(&self, slot: usize, timeout_ms: u32) -> Result<CanMessage, VciError> {
        Self::check_slot(slot)?;
        let channel = self.channel(slot)?;
        let raw = self.api.channel_read(channel, timeout_ms)?;

        Self::decode(slot, &raw)
    }

    /// Look at the next frame without waiting and without removing it.
    pub fn receive_peek(&self, slot: usize) -> Result<CanMessage, VciError> {
        Self::check_slot(slot)?;
        let channel = self.channel(slot)?;
        let raw = self.api.channel_peek(channel)?;

        Self::decode(slot, &raw)
    }

    pub fn get_status(&self, slot: usize) -> Result<CanChanStatus, VciError> {
        Self::check_slot(slot)?;
        let channel = self.channel(slot)?;

        Ok(self.api.channel_status(channel)?)
    }

    /// Release every handle of the slot and reset it to unassigned. Teardown failures are
    /// logged only, closing always succeeds for a valid slot.
    pub fn close(&mut self, slot: usize) -> Result<(), VciError> {
        Self::check_slot(slot)?;
        self.release(slot);

        Ok(())
    }

    #[inline]
    pub fn format_error(&self, code: VciCode) -> String {
        self.api.format_error(code)
    }

    #[inline(always)]
    fn check_slot(slot: usize) -> Result<(), VciError> {
        if slot < CAN_DEV_MAX { Ok(()) } else { Err(VciError::SlotOutOfRange(slot)) }
    }

    #[inline(always)]
    fn channel(&self, slot: usize) -> Result<Handle, VciError> {
        self.sessions[slot].channel
            .ok_or(VciError::InvalidHandle(slot, "channel"))
    }

    fn send(&self, slot: usize, msg: &CanMsg) -> Result<(), VciError> {
        let channel = self.channel(slot)?;
        log::trace!("IXXAT-VCI - slot: {} transmit {:?}", slot, msg);

        Ok(self.api.channel_send(channel, INFINITE, msg)?)
    }

    fn decode(slot: usize, raw: &CanMsg) -> Result<CanMessage, VciError> {
        let mut msg = CanMessage::try_from(raw)?;
        msg.set_channel(slot as u8);
        log::trace!("IXXAT-VCI - slot: {} received {}", slot, msg);

        Ok(msg)
    }

    fn first_device(&self) -> Result<VciDeviceInfo, VciCode> {
        let enumerator = self.api.enum_device_open()?;
        let ret = self.api.enum_device_next(enumerator);
        self.close_enumerator(enumerator);

        ret
    }

    fn close_enumerator(&self, enumerator: Handle) {
        self.api.enum_device_close(enumerator)
            .unwrap_or_else(|e| log::warn!("IXXAT-VCI - error {} when close enumerator", e));
    }

    /// Channel open, FIFO setup, activation and controller open. Handles are stored as soon
    /// as they exist so that [`Self::close`] releases them after a failed step.
    fn prepare(&mut self, slot: usize) -> Result<Handle, VciError> {
        let device = self.sessions[slot].device
            .ok_or(VciError::InvalidHandle(slot, "device"))?;

        if self.sessions[slot].channel.is_some() || self.sessions[slot].control.is_some() {
            log::debug!("IXXAT-VCI - slot: {} reopening connection", slot);
            self.release_connection(slot);
        }

        let channel = self.api.channel_open(device, 0, false)?;
        self.sessions[slot].channel = Some(channel);
        log::debug!("IXXAT-VCI - slot: {} channel opened", slot);

        self.api.channel_initialize(channel, RX_FIFO_SIZE, RX_THRESHOLD, TX_FIFO_SIZE, TX_THRESHOLD)?;
        self.api.channel_activate(channel, true)?;
        log::debug!("IXXAT-VCI - slot: {} channel activated", slot);

        let control = self.api.control_open(device, 0)?;
        self.sessions[slot].control = Some(control);
        log::debug!("IXXAT-VCI - slot: {} controller opened", slot);

        Ok(control)
    }

    fn configure(&mut self, slot: usize, control: Handle, bitrate: BitrateRegisterPair) -> Result<(), VciError> {
        let mode = self.sessions[slot].mode;
        match self.api.control_initialize(control, mode, bitrate) {
            Ok(()) => {
                let filter = Filter::accept_all(false);
                self.api.control_set_acc_filter(control, filter.extended, filter.can_id, filter.can_mask)?;
                self.api.control_start(control, true)?;
                log::info!("IXXAT-VCI - slot: {} started with {:?}", slot, bitrate);
            },
            // initialized by another application
            Err(VciCode::ACCESSDENIED) => {
                let current = self.api.control_status(control)?.bitrate();
                if current != bitrate {
                    log::warn!("IXXAT-VCI - slot: {} controller runs with {:?}", slot, current);
                    return Err(VciError::Busy(slot));
                }
                log::info!("IXXAT-VCI - slot: {} shares running controller with {:?}", slot, bitrate);
            },
            Err(code) => return Err(code.into()),
        }

        self.sessions[slot].bitrate = Some(bitrate);
        Ok(())
    }

    fn release_connection(&mut self, slot: usize) {
        let session = &mut self.sessions[slot];
        if let Some(control) = session.control {
            self.api.control_reset(control)
                .unwrap_or_else(|e| log::warn!("IXXAT-VCI - slot: {} error {} when reset controller", slot, e));
        }
        if let Some(channel) = session.channel.take() {
            self.api.channel_close(channel)
                .unwrap_or_else(|e| log::warn!("IXXAT-VCI - slot: {} error {} when close channel", slot, e));
        }
        if let Some(control) = session.control.take() {
            self.api.control_close(control)
                .unwrap_or_else(|e| log::warn!("IXXAT-VCI - slot: {} error {} when close controller", slot, e));
        }
        session.bitrate = None;
    }

    fn release(&mut self, slot: usize) {
        self.release_connection(slot);
        if let Some(device) = self.sessions[slot].device {
            self.api.device_close(device)
                .unwrap_or_else(|e| log::warn!("IXXAT-VCI - slot: {} error {} when close device", slot, e));
            log::info!("IXXAT-VCI - device closed in slot: {}", slot);
        }
        self.sessions[slot] = Session::default();
    }

    fn report(&self, e: VciError) -> VciError {
        if self.diagnostics.enabled() {
            let code = e.code();
            self.diagnostics.report(code, &self.api.format_error(code));
        }
        e
    }
}
