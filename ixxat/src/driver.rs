use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc::{channel, Receiver, Sender, TryRecvError}};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use rs_can::{CanError, ChannelConfig, Device, DeviceBuilder, Filter, Frame, Id, Listener};
use crate::api::{VciApi, Vcinpl};
use crate::can::{BitrateRegisterPair, BitrateTable, CanChanStatus, CanMessage, OperatingMode};
use crate::constant::{CAN_DEV_MAX, DETECT, DETECT_TIMEOUT_MS, LIBRARY, MODE, RECEIVE_TIMEOUT_MS, RX_FIFO_SIZE, SELECT, TIMEOUT};
use crate::error::{VciCode, VciError};
use crate::session::{LogSink, SessionManager};
use crate::subscriber::Subscriber;

type Listeners = Arc<Mutex<HashMap<String, Box<dyn Listener<u8, CanMessage>>>>>;

#[derive(Debug, Default)]
struct ReceiveCounters {
    ok: AtomicUsize,
    err: AtomicUsize,
}

struct Reader {
    stop_tx: Sender<()>,
    task: JoinHandle<()>,
}

/// IXXAT device surface, one slot per channel.
///
/// Clones share the sessions, the listeners and the background reader.
pub struct IxxatCan<A: VciApi = Vcinpl> {
    manager: Arc<Mutex<SessionManager<A>>>,
    listeners: Listeners,
    counters: Arc<ReceiveCounters>,
    reader: Arc<Mutex<Option<Reader>>>,
}

impl<A: VciApi> Clone for IxxatCan<A> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            listeners: Arc::clone(&self.listeners),
            counters: Arc::clone(&self.counters),
            reader: Arc::clone(&self.reader),
        }
    }
}

impl<A: VciApi + Send + 'static> IxxatCan<A> {
    /// Select, configure and open every channel of `builder` on `api`.
    pub fn with_api(api: A, builder: &DeviceBuilder) -> Result<Self, CanError> {
        let table = BitrateTable::new()?;
        let mut manager = SessionManager::new(api)
            .with_diagnostics(LogSink);

        let mut configs = builder.channel_configs().iter()
            .map(|(name, cfg)| Self::parse_slot(name).map(|slot| (slot, cfg)))
            .collect::<Result<Vec<_>, _>>()?;
        configs.sort_by_key(|(slot, _)| *slot);

        for (slot, cfg) in configs {
            if let Err(e) = Self::init_channel(&mut manager, &table, slot, cfg) {
                log::warn!("IXXAT-VCI - slot: {} initialize failed: {}", slot, e);
                manager.assigned_slots().into_iter()
                    .for_each(|s| manager.close(s)
                        .unwrap_or_else(|e| log::warn!("IXXAT-VCI - slot: {} error {} when close", s, e)));
                return Err(e);
            }
        }

        Ok(Self {
            manager: Arc::new(Mutex::new(manager)),
            listeners: Default::default(),
            counters: Default::default(),
            reader: Default::default(),
        })
    }

    pub fn register_listener(&self, name: String, listener: Box<dyn Listener<u8, CanMessage>>) -> bool {
        log::debug!("IXXAT-VCI - register listener {}", name);
        match self.listeners.lock() {
            Ok(mut listeners) => {
                listeners.insert(name, listener);
                true
            },
            Err(e) => {
                log::warn!("IXXAT-VCI - listener error {} when registering listener {}", e, name);
                false
            }
        }
    }

    pub fn unregister_listener(&self, name: &str) -> bool {
        log::debug!("IXXAT-VCI - unregister listener {}", name);
        match self.listeners.lock() {
            Ok(mut listeners) => {
                listeners.remove(name);
                true
            },
            Err(e) => {
                log::warn!("IXXAT-VCI - listener error {} when unregistering listener {}", e, name);
                false
            }
        }
    }

    pub fn unregister_all_listeners(&self) -> bool {
        match self.listeners.lock() {
            Ok(mut listeners) => {
                listeners.clear();
                true
            },
            Err(e) => {
                log::warn!("IXXAT-VCI - listener error {} when unregistering all listeners", e);
                false
            }
        }
    }

    pub fn listener_names(&self) -> Vec<String> {
        match self.listeners.lock() {
            Ok(listeners) => {
                listeners.keys()
                    .cloned()
                    .collect()
            },
            Err(e) => {
                log::warn!("IXXAT-VCI - listener error {} when getting listener names", e);
                Vec::new()
            }
        }
    }

    /// A copy of every frame the background reader receives that passes `filters`.
    ///
    /// The channel closes when `name` is unregistered or the device shuts down.
    pub fn subscribe(&self, name: &str, filters: Vec<Filter>) -> Receiver<CanMessage> {
        let (tx, rx) = channel();
        self.register_listener(name.into(), Box::new(Subscriber::new(tx, filters)));
        rx
    }

    /// Start the background reader, it polls every opened channel each `interval`.
    pub fn start(&self, interval: Duration) {
        match self.reader.lock() {
            Ok(mut reader) => {
                if reader.is_some() {
                    log::warn!("IXXAT-VCI - receive task is already running");
                    return;
                }
                let (stop_tx, stop_rx) = channel();
                let device = self.clone();
                let task = thread::spawn(move || Self::receive_loop(device, interval, stop_rx));
                *reader = Some(Reader { stop_tx, task });
                log::info!("IXXAT-VCI - receive task started");
            },
            Err(e) => log::warn!("IXXAT-VCI - reader error {} when starting", e),
        }
    }

    pub fn stop(&self) {
        let reader = match self.reader.lock() {
            Ok(mut reader) => reader.take(),
            Err(e) => {
                log::warn!("IXXAT-VCI - reader error {} when stopping", e);
                None
            }
        };

        if let Some(Reader { stop_tx, task }) = reader {
            log::info!("IXXAT-VCI - stopping receive task");
            if let Err(e) = stop_tx.send(()) {
                log::debug!("IXXAT-VCI - error {} when stopping receive task", e);
            }
            if task.join().is_err() {
                log::warn!("IXXAT-VCI - receive task panicked");
            }
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.reader.lock()
            .map(|r| r.is_some())
            .unwrap_or_default()
    }

    /// Frames the background reader handed to the listeners.
    #[inline]
    pub fn received_count(&self) -> usize {
        self.counters.ok.load(Ordering::Relaxed)
    }

    /// Failed background receive calls.
    #[inline]
    pub fn error_count(&self) -> usize {
        self.counters.err.load(Ordering::Relaxed)
    }

    /// Block until a frame matching `predicate` arrives on `channel` or `timeout` elapses.
    ///
    /// Frames are taken one at a time and everything behind the match stays queued. While
    /// the background reader runs, the frames are taken from it instead.
    pub fn wait_for<P>(&self, channel: u8, timeout: Duration, predicate: P) -> Result<Option<CanMessage>, CanError>
    where
        P: Fn(&CanMessage) -> bool,
    {
        if self.is_running() {
            return Ok(self.wait_subscribed(channel, timeout, predicate));
        }

        let slot = channel as usize;
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let wait = remaining.as_millis().min(RECEIVE_TIMEOUT_MS as u128) as u32;
            let ret = self.with_manager(|m| match m.receive(slot, wait) {
                Ok(msg) => Ok(Some(msg)),
                // status or error frame
                Err(VciError::NoData) => Ok(None),
                Err(VciError::Driver(VciCode::NO_DATA | VciCode::TIMEOUT | VciCode::RXQUEUE_EMPTY)) => Ok(None),
                Err(e) => Err(e),
            })?;
            if let Some(msg) = ret {
                if predicate(&msg) {
                    return Ok(Some(msg));
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    #[inline]
    pub fn wait_for_id(&self, channel: u8, id: impl Into<Id>, timeout: Duration) -> Result<Option<CanMessage>, CanError> {
        let id = id.into();
        self.wait_for(channel, timeout, |m| !m.is_remote() && m.id() == id)
    }

    #[inline]
    pub fn wait_for_id_len(&self, channel: u8, id: impl Into<Id>, len: usize, timeout: Duration) -> Result<Option<CanMessage>, CanError> {
        let id = id.into();
        self.wait_for(channel, timeout, |m| !m.is_remote() && m.id() == id && m.length() == len)
    }

    #[inline]
    pub fn wait_for_remote(&self, channel: u8, id: impl Into<Id>, timeout: Duration) -> Result<Option<CanMessage>, CanError> {
        let id = id.into();
        self.wait_for(channel, timeout, |m| m.is_remote() && m.id() == id)
    }

    pub fn status(&self, channel: u8) -> Result<CanChanStatus, CanError> {
        self.with_manager(|m| m.get_status(channel as usize))
    }

    /// Average bus load in percent.
    #[inline]
    pub fn bus_load(&self, channel: u8) -> Result<u8, CanError> {
        self.status(channel)
            .map(|s| s.line_status().bus_load())
    }

    /// Bus timing the channel was started with, either configured or detected.
    pub fn detected_bitrate(&self, channel: u8) -> Result<Option<BitrateRegisterPair>, CanError> {
        self.with_manager(|m| Ok(m.session(channel as usize)?.bitrate()))
    }

    pub fn with_manager<C, T>(&self, callback: C) -> Result<T, CanError>
    where
        C: FnOnce(&mut SessionManager<A>) -> Result<T, VciError>,
    {
        match self.manager.lock() {
            Ok(mut manager) => callback(&mut manager).map_err(CanError::from),
            Err(e) => Err(CanError::other_error(format!("IXXAT-VCI - session lock poisoned: {}", e))),
        }
    }

    fn wait_subscribed<P>(&self, channel: u8, timeout: Duration, predicate: P) -> Option<CanMessage>
    where
        P: Fn(&CanMessage) -> bool,
    {
        let name = format!("wait_for-{:?}", thread::current().id());
        let receiver = self.subscribe(&name, Vec::new());
        let deadline = Instant::now() + timeout;
        let ret = loop {
            match receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(msg) if msg.channel() == channel && predicate(&msg) => break Some(msg),
                Ok(_) => {},
                Err(_) => break None,
            }
        };
        self.unregister_listener(&name);

        ret
    }

    fn receive_loop(device: Self, interval: Duration, stop_rx: Receiver<()>) {
        loop {
            if device.is_closed() {
                log::info!("IXXAT-VCI - device closed, receive task exits");
                break;
            }
            device.receive_callback();

            match stop_rx.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {},
            }
            thread::sleep(interval);
        }
    }

    fn receive_callback(&self) {
        for channel in self.opened_channels() {
            match self.receive(channel, Some(0)) {
                Ok(frames) => {
                    if frames.is_empty() {
                        continue;
                    }
                    self.counters.ok.fetch_add(frames.len(), Ordering::Relaxed);
                    self.notify(|l| l.on_frame_received(channel, &frames));
                },
                Err(e) => {
                    self.counters.err.fetch_add(1, Ordering::Relaxed);
                    log::warn!("IXXAT-VCI - channel: {} error {} when receive", channel, e);
                },
            }
        }
    }

    fn notify<C>(&self, callback: C)
    where
        C: Fn(&dyn Listener<u8, CanMessage>),
    {
        match self.listeners.lock() {
            Ok(listeners) => listeners.values()
                .for_each(|l| callback(l.as_ref())),
            Err(e) => log::warn!("IXXAT-VCI - listener error {} when notify listeners", e),
        }
    }

    fn parse_slot(name: &str) -> Result<usize, CanError> {
        name.parse::<usize>()
            .ok()
            .filter(|v| *v < CAN_DEV_MAX)
            .ok_or_else(|| CanError::DeviceConfigError(format!("channel `{}` is not a slot in 0..{}", name, CAN_DEV_MAX)))
    }

    fn init_channel(
        manager: &mut SessionManager<A>,
        table: &BitrateTable,
        slot: usize,
        cfg: &ChannelConfig,
    ) -> Result<(), CanError> {
        let use_picker = cfg.get_other::<bool>(SELECT)?.unwrap_or_default();
        if !use_picker && slot != 0 {
            return Err(CanError::DeviceConfigError(
                format!("slot: {} requires `{}`, the first enumerated device is always opened in slot 0", slot, SELECT)
            ));
        }
        manager.select_device(use_picker, slot)?;

        if let Some(mode) = cfg.get_other::<String>(MODE)? {
            manager.set_operating_mode(slot, mode.parse::<OperatingMode>()?)?;
        }

        match cfg.get_other::<Vec<u32>>(DETECT)? {
            Some(bitrates) => {
                let candidates = if bitrates.is_empty() {
                    BitrateRegisterPair::COMMON.to_vec()
                }
                else {
                    bitrates.iter()
                        .map(|&b| Self::register_pair(table, b))
                        .collect::<Result<Vec<_>, _>>()?
                };
                let timeout = cfg.get_other::<u16>(TIMEOUT)?.unwrap_or(DETECT_TIMEOUT_MS);
                let index = manager.open_connection_autodetect(slot, timeout, &candidates)?;
                log::info!("IXXAT-VCI - slot: {} detected {:?}", slot, table.lookup(candidates[index]));
            },
            None => {
                let bitrate = Self::register_pair(table, cfg.bitrate())?;
                manager.open_connection(slot, bitrate)?;
            },
        }

        Ok(())
    }

    #[inline(always)]
    fn register_pair(table: &BitrateTable, bitrate: u32) -> Result<BitrateRegisterPair, CanError> {
        table.get(bitrate)
            .ok_or_else(|| CanError::DeviceConfigError(format!("bitrate: {} is not configured", bitrate)))
    }
}

impl<A: VciApi + Send + 'static> TryFrom<DeviceBuilder> for IxxatCan<A> {
    type Error = CanError;

    fn try_from(builder: DeviceBuilder) -> Result<Self, Self::Error> {
        let api = A::load(builder.get_other::<String>(LIBRARY)?)?;
        Self::with_api(api, &builder)
    }
}

impl<A: VciApi + Send + 'static> Device for IxxatCan<A> {
    type Channel = u8;
    type Frame = CanMessage;

    fn opened_channels(&self) -> Vec<Self::Channel> {
        self.with_manager(|m| Ok(m.assigned_slots()))
            .unwrap_or_default()
            .into_iter()
            .map(|s| s as u8)
            .collect()
    }

    fn transmit(&self, msg: Self::Frame, _: Option<u32>) -> Result<(), CanError> {
        let channel = msg.channel();
        self.notify(|l| l.on_frame_transmitting(channel, &msg));
        self.with_manager(|m| m.transmit_message(channel as usize, &msg))?;
        self.notify(|l| l.on_frame_transmitted(channel, msg.id()));

        Ok(())
    }

    /// Wait up to `timeout` ms (100 when `None`) for the first frame, then drain whatever
    /// is already queued. A read error after the first frame ends the drain.
    fn receive(&self, channel: Self::Channel, timeout: Option<u32>) -> Result<Vec<Self::Frame>, CanError> {
        let slot = channel as usize;
        self.with_manager(|m| {
            let mut results = Vec::new();
            let mut wait = timeout.unwrap_or(RECEIVE_TIMEOUT_MS);
            for _ in 0..RX_FIFO_SIZE {
                match m.receive(slot, wait) {
                    Ok(msg) => results.push(msg),
                    // status or error frame
                    Err(VciError::NoData) => {},
                    Err(VciError::Driver(VciCode::NO_DATA | VciCode::TIMEOUT | VciCode::RXQUEUE_EMPTY)) => break,
                    Err(e) if !results.is_empty() => {
                        log::warn!("IXXAT-VCI - slot: {} error {} after {} frames received", slot, e, results.len());
                        break;
                    },
                    Err(e) => return Err(e),
                }
                wait = 0;
            }
            if !results.is_empty() {
                log::trace!("IXXAT-VCI - slot: {} received: {}", slot, results.len());
            }

            Ok(results)
        })
    }

    fn shutdown(&mut self) {
        self.stop();
        self.unregister_all_listeners();
        self.with_manager(|m| {
            for slot in m.assigned_slots() {
                m.close(slot)?;
            }
            Ok(())
        })
        .unwrap_or_else(|e| log::warn!("IXXAT-VCI - error {} when shutdown", e));
    }
}
