mod common;

use std::sync::{Arc, Mutex};
use common::{Call, MockVci};
use ixxat_rs::api::{Handle, VciApi, VciId};
use ixxat_rs::can::{BitrateRegisterPair, CanChanStatus, CanLineStatus, CanMsg, CanMsgType, ControllerStatus, OperatingMode};
use ixxat_rs::constant::{CAN_DEV_MAX, INFINITE, RECEIVE_TIMEOUT_MS};
use ixxat_rs::{DiagnosticSink, SessionManager, VciCode, VciError};
use rs_can::{Direct, Frame, Id};

fn connected(mock: &MockVci, slot: usize) -> anyhow::Result<SessionManager<MockVci>> {
    let mut manager = SessionManager::new(mock.clone());
    if slot == 0 {
        manager.select_device(false, 0)?;
    }
    else {
        mock.state().picker = Some(VciId(42));
        manager.select_device(true, slot)?;
    }
    manager.open_connection(slot, BitrateRegisterPair::BITRATE_1000K)?;
    mock.clear_calls();

    Ok(manager)
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<(VciCode, String)>>>);

impl DiagnosticSink for RecordingSink {
    fn report(&self, code: VciCode, text: &str) {
        if let Ok(mut v) = self.0.lock() {
            v.push((code, text.to_owned()));
        }
    }
}

#[test]
fn test_slot_out_of_range() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());

    for slot in [CAN_DEV_MAX, CAN_DEV_MAX + 1, usize::MAX] {
        let results = [
            manager.select_device(false, slot).err(),
            manager.select_device(true, slot).err(),
            manager.set_operating_mode(slot, OperatingMode::EXTENDED).err(),
            manager.open_connection(slot, BitrateRegisterPair::BITRATE_500K).err(),
            manager.open_connection_autodetect(slot, 100, &BitrateRegisterPair::COMMON).err(),
            manager.transmit(slot, 0x123, false, Some(&[0x01]), 1).err(),
            manager.receive_wait(slot).err(),
            manager.receive_peek(slot).err(),
            manager.get_status(slot).err(),
            manager.close(slot).err(),
        ];
        for ret in results {
            let err = ret.ok_or_else(|| anyhow::anyhow!("slot {} accepted", slot))?;
            assert!(matches!(err, VciError::SlotOutOfRange(s) if s == slot));
            assert_eq!(err.code(), VciCode::INVALIDARG);
        }
    }
    assert!(mock.calls().is_empty());

    Ok(())
}

#[test]
fn test_auto_select_lands_in_slot_zero() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());

    manager.select_device(false, 3)?;
    assert!(manager.session(0)?.device().is_some());
    assert!(manager.session(3)?.device().is_none());
    assert_eq!(manager.session(3)?.mode(), OperatingMode::STANDARD);
    assert_eq!(mock.call_names(), vec!["enum_open", "enum_next", "enum_close", "device_open"]);
    assert_eq!(mock.calls()[3], Call::DeviceOpen(VciId(42)));

    Ok(())
}

#[test]
fn test_picker_select_uses_slot() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    mock.state().picker = Some(VciId(7));
    let mut manager = SessionManager::new(mock.clone());

    manager.select_device(true, 5)?;
    assert!(manager.session(5)?.device().is_some());
    assert!(manager.session(0)?.device().is_none());
    assert_eq!(mock.calls(), vec![Call::SelectDialog, Call::DeviceOpen(VciId(7))]);
    assert_eq!(manager.assigned_slots(), vec![5]);

    Ok(())
}

#[test]
fn test_select_resets_mode() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());

    manager.set_operating_mode(0, OperatingMode::EXTENDED | OperatingMode::LISTONLY)?;
    assert_eq!(manager.session(0)?.mode(), OperatingMode::EXTENDED | OperatingMode::LISTONLY);
    manager.select_device(false, 0)?;
    assert_eq!(manager.session(0)?.mode(), OperatingMode::STANDARD);

    Ok(())
}

#[test]
fn test_select_enumeration_failure() -> anyhow::Result<()> {
    let mock = MockVci::default();
    let mut manager = SessionManager::new(mock.clone());

    let err = manager.select_device(false, 0).unwrap_err();
    assert_eq!(err.code(), VciCode::NO_MORE_ITEMS);
    assert_eq!(mock.call_names(), vec!["enum_open", "enum_next", "enum_close"]);
    assert!(!manager.session(0)?.is_assigned());

    mock.clear_calls();
    let err = manager.select_device(true, 1).unwrap_err();
    assert_eq!(err.code(), VciCode::NOT_IMPLEMENTED);
    assert_eq!(manager.session(1)?.mode(), OperatingMode::empty());

    Ok(())
}

#[test]
fn test_failed_reselect_keeps_session() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = connected(&mock, 0)?;
    let before = *manager.session(0)?;
    mock.fail("device_open", VciCode::ACCESSDENIED);

    let err = manager.select_device(false, 0).unwrap_err();
    assert_eq!(err.code(), VciCode::ACCESSDENIED);
    assert_eq!(*manager.session(0)?, before);
    assert!(manager.session(0)?.is_connected());
    assert_eq!(mock.call_names(), vec!["enum_open", "enum_next", "enum_close", "device_open"]);

    mock.clear_failure("device_open").clear_calls();
    manager.select_device(false, 0)?;
    assert_eq!(
        mock.call_names(),
        vec!["enum_open", "enum_next", "enum_close", "device_open", "control_reset", "channel_close", "control_close", "device_close"]
    );
    assert!(manager.session(0)?.is_assigned());
    assert!(!manager.session(0)?.is_connected());

    Ok(())
}

#[test]
fn test_list_devices() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    mock.state().devices.push(ixxat_rs::api::VciDeviceInfo::new(VciId(43), "USB-to-CAN FD"));
    let manager = SessionManager::new(mock.clone());

    let devices = manager.list_devices()?;
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].object_id(), VciId(42));
    assert_eq!(devices[1].description(), "USB-to-CAN FD");
    assert_eq!(mock.count("enum_next"), 3);
    assert_eq!(mock.count("enum_close"), 1);

    Ok(())
}

#[test]
fn test_set_mode_without_device() -> anyhow::Result<()> {
    let mock = MockVci::default();
    let mut manager = SessionManager::new(mock.clone());

    manager.set_operating_mode(9, OperatingMode::EXTENDED)?;
    assert_eq!(manager.session(9)?.mode(), OperatingMode::EXTENDED);
    assert!(mock.calls().is_empty());

    Ok(())
}

#[test]
fn test_open_connection_sequence() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;
    manager.set_operating_mode(0, OperatingMode::STANDARD | OperatingMode::EXTENDED)?;
    mock.clear_calls();

    manager.open_connection(0, BitrateRegisterPair::new(0x00, 0x14))?;

    let session = *manager.session(0)?;
    let device = session.device().ok_or_else(|| anyhow::anyhow!("no device"))?;
    let channel = session.channel().ok_or_else(|| anyhow::anyhow!("no channel"))?;
    let control = session.control().ok_or_else(|| anyhow::anyhow!("no control"))?;
    assert_eq!(mock.calls(), vec![
        Call::ChannelOpen(device, 0, false),
        Call::ChannelInitialize(channel, 1024, 1, 128, 1),
        Call::ChannelActivate(channel, true),
        Call::ControlOpen(device, 0),
        Call::ControlInitialize(control, OperatingMode::STANDARD | OperatingMode::EXTENDED, BitrateRegisterPair::BITRATE_1000K),
        Call::ControlSetAccFilter(control, false, 0, 0),
        Call::ControlStart(control, true),
    ]);
    assert_eq!(session.bitrate(), Some(BitrateRegisterPair::BITRATE_1000K));
    assert!(session.is_connected());

    Ok(())
}

#[test]
fn test_open_connection_without_device() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());

    let err = manager.open_connection(2, BitrateRegisterPair::BITRATE_500K).unwrap_err();
    assert!(matches!(err, VciError::InvalidHandle(2, _)));
    assert_eq!(err.code(), VciCode::INVHANDLE);
    assert!(mock.calls().is_empty());

    Ok(())
}

#[test]
fn test_open_connection_short_circuit() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;
    mock.clear_calls();
    mock.fail("channel_activate", VciCode::INVALID_STATE);

    let err = manager.open_connection(0, BitrateRegisterPair::BITRATE_250K).unwrap_err();
    assert_eq!(err.code(), VciCode::INVALID_STATE);
    assert_eq!(mock.call_names(), vec!["channel_open", "channel_initialize", "channel_activate"]);
    assert!(manager.session(0)?.channel().is_some());
    assert!(manager.session(0)?.control().is_none());
    assert!(!manager.session(0)?.is_connected());

    Ok(())
}

#[test]
fn test_access_denied_same_bitrate() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    mock.fail("control_initialize", VciCode::ACCESSDENIED);
    mock.state().line_status = CanLineStatus::new(
        OperatingMode::STANDARD,
        BitrateRegisterPair::BITRATE_500K,
        12,
        ControllerStatus::empty(),
    );
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;
    mock.clear_calls();

    manager.open_connection(0, BitrateRegisterPair::BITRATE_500K)?;
    assert_eq!(mock.count("control_status"), 1);
    assert_eq!(mock.count("control_set_acc_filter"), 0);
    assert_eq!(mock.count("control_start"), 0);
    assert_eq!(manager.session(0)?.bitrate(), Some(BitrateRegisterPair::BITRATE_500K));

    Ok(())
}

#[test]
fn test_access_denied_other_bitrate() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    mock.fail("control_initialize", VciCode::ACCESSDENIED);
    mock.state().line_status = CanLineStatus::new(
        OperatingMode::STANDARD,
        BitrateRegisterPair::BITRATE_250K,
        0,
        ControllerStatus::empty(),
    );
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;

    let err = manager.open_connection(0, BitrateRegisterPair::BITRATE_500K).unwrap_err();
    assert!(matches!(err, VciError::Busy(0)));
    assert_eq!(err.code(), VciCode::BUSY);
    assert_eq!(mock.count("control_start"), 0);

    Ok(())
}

#[test]
fn test_reopen_releases_previous_connection() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = connected(&mock, 0)?;
    let previous = *manager.session(0)?;

    manager.open_connection(0, BitrateRegisterPair::BITRATE_125K)?;
    let calls = mock.calls();
    assert_eq!(&calls[..3], &[
        Call::ControlReset(previous.control().ok_or_else(|| anyhow::anyhow!("no control"))?),
        Call::ChannelClose(previous.channel().ok_or_else(|| anyhow::anyhow!("no channel"))?),
        Call::ControlClose(previous.control().ok_or_else(|| anyhow::anyhow!("no control"))?),
    ]);
    assert_ne!(manager.session(0)?.channel(), previous.channel());
    assert_eq!(manager.session(0)?.device(), previous.device());

    Ok(())
}

#[test]
fn test_autodetect() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    mock.state().detect_index = 7;
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;
    mock.clear_calls();

    let index = manager.open_connection_autodetect(0, 5000, &BitrateRegisterPair::COMMON)?;
    assert_eq!(index, 7);
    assert_eq!(BitrateRegisterPair::COMMON[index].bitrate(), Some(500_000));

    let calls = mock.calls();
    let control = manager.session(0)?.control().ok_or_else(|| anyhow::anyhow!("no control"))?;
    let (btr0, btr1): (Vec<u8>, Vec<u8>) = BitrateRegisterPair::COMMON.iter()
        .map(|p| (p.btr0, p.btr1))
        .unzip();
    assert_eq!(calls[4], Call::DetectBitrate(control, 5000, btr0, btr1));
    assert_eq!(calls[5], Call::ControlInitialize(control, OperatingMode::STANDARD, BitrateRegisterPair::BITRATE_500K));
    assert_eq!(mock.call_names()[6..], ["control_set_acc_filter", "control_start"]);
    assert_eq!(manager.session(0)?.bitrate(), Some(BitrateRegisterPair::BITRATE_500K));

    Ok(())
}

#[test]
fn test_autodetect_no_match() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;

    for index in [-1, 10, i32::MAX] {
        mock.state().detect_index = index;
        mock.clear_calls();
        let err = manager.open_connection_autodetect(0, 100, &BitrateRegisterPair::COMMON).unwrap_err();
        assert!(matches!(err, VciError::NoBitrateMatch(i) if i == index));
        assert_eq!(err.code(), VciCode::INVALID_INDEX);
        assert_eq!(mock.count("control_initialize"), 0);
    }

    Ok(())
}

#[test]
fn test_autodetect_detection_failure() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    mock.fail("detect_bitrate", VciCode::TIMEOUT);
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;

    let err = manager.open_connection_autodetect(0, 100, &BitrateRegisterPair::COMMON).unwrap_err();
    assert_eq!(err.code(), VciCode::TIMEOUT);
    assert_eq!(mock.count("control_initialize"), 0);

    let err = manager.open_connection_autodetect(0, 100, &[]).unwrap_err();
    assert!(matches!(err, VciError::InvalidArgument(_)));

    Ok(())
}

#[test]
fn test_transmit_standard() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;
    let channel = manager.session(0)?.channel().ok_or_else(|| anyhow::anyhow!("no channel"))?;

    manager.transmit(0, 0x123, false, Some(&[0xDE, 0xAD]), 2)?;
    let calls = mock.calls();
    let Call::ChannelSend(handle, timeout, msg) = &calls[0] else {
        anyhow::bail!("unexpected call {:?}", calls[0]);
    };
    assert_eq!(*handle, channel);
    assert_eq!(*timeout, INFINITE);
    assert_eq!(msg.msg_id(), 0x123);
    assert!(!msg.info().is_extended());
    assert!(!msg.info().is_remote());
    assert_eq!(msg.info().dlc(), 2);
    assert_eq!(msg.data(), hex::decode("DEAD")?.as_slice());

    Ok(())
}

#[test]
fn test_transmit_extended() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;

    manager.transmit(0, 0x800, false, None, 0)?;
    manager.transmit(0, 0xFFFF_FFFF, false, Some(&hex::decode("0102030405060708")?), 8)?;
    let sent = mock.calls().into_iter()
        .filter_map(|c| match c {
            Call::ChannelSend(_, _, msg) => Some(msg),
            _ => None,
        })
        .collect::<Vec<CanMsg>>();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].info().is_extended());
    assert_eq!(sent[0].msg_id(), 0x800);
    assert!(sent[1].info().is_extended());
    assert_eq!(sent[1].msg_id(), 0x1FFF_FFFF);
    assert_eq!(sent[1].data(), &[1, 2, 3, 4, 5, 6, 7, 8]);

    Ok(())
}

#[test]
fn test_transmit_remote() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;

    manager.transmit(0, 0x7FF, true, Some(&[0xAA; 8]), 42)?;
    let Call::ChannelSend(_, _, msg) = mock.calls()[0] else {
        anyhow::bail!("nothing sent");
    };
    assert!(msg.info().is_remote());
    assert_eq!(msg.info().dlc(), 0);
    assert!(msg.data().is_empty());

    Ok(())
}

#[test]
fn test_transmit_payload_too_large() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;

    let err = manager.transmit(0, 0x123, false, Some(&[0; 9]), 9).unwrap_err();
    assert!(matches!(err, VciError::DataOutOfRange(9)));
    assert_eq!(err.code(), VciCode::INVALIDARG);
    assert!(mock.calls().is_empty());

    Ok(())
}

#[test]
fn test_transmit_without_channel() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = SessionManager::new(mock.clone());

    let err = manager.transmit(4, 0x123, false, None, 0).unwrap_err();
    assert_eq!(err.code(), VciCode::INVHANDLE);
    assert!(mock.calls().is_empty());

    Ok(())
}

#[test]
fn test_transmit_driver_error_verbatim() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;
    mock.fail("channel_send", VciCode::TXQUEUE_FULL);

    let err = manager.transmit(0, 0x123, false, None, 0).unwrap_err();
    assert!(matches!(err, VciError::Driver(VciCode::TXQUEUE_FULL)));
    assert_eq!(mock.count("channel_send"), 1);

    Ok(())
}

#[test]
fn test_receive_wait() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mock_slot = 2;
    let manager = connected(&mock, mock_slot)?;
    let mut raw = CanMsg::encode(0x18DA_F110, false, Some(&[0x02, 0x10, 0x03]), 3)?;
    raw.set_time(1500);
    mock.push_rx(raw);

    let msg = manager.receive_wait(mock_slot)?;
    assert_eq!(msg.id(), Id::from_bits(0x18DA_F110, Some(true)));
    assert!(msg.is_extended());
    assert!(!msg.is_remote());
    assert_eq!(msg.data(), &[0x02, 0x10, 0x03]);
    assert_eq!(msg.length(), 3);
    assert_eq!(msg.channel(), mock_slot as u8);
    assert_eq!(msg.direct(), Direct::Receive);
    assert_eq!(msg.timestamp(), 1500);

    let channel = manager.session(mock_slot)?.channel().ok_or_else(|| anyhow::anyhow!("no channel"))?;
    assert_eq!(mock.calls(), vec![Call::ChannelRead(channel, RECEIVE_TIMEOUT_MS)]);

    Ok(())
}

#[test]
fn test_receive_wait_timeout() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;

    let err = manager.receive_wait(0).unwrap_err();
    assert_eq!(err.code(), VciCode::TIMEOUT);

    Ok(())
}

#[test]
fn test_receive_non_data_frame() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;
    let mut raw = CanMsg::default();
    raw.set_msg_type(CanMsgType::Status);
    mock.push_rx(raw);
    mock.push_rx(raw);

    let err = manager.receive_peek(0).unwrap_err();
    assert!(matches!(err, VciError::NoData));
    assert_eq!(err.code(), VciCode::NO_DATA);
    let err = manager.receive_wait(0).unwrap_err();
    assert_eq!(err.code(), VciCode::NO_DATA);
    assert_eq!(mock.state().rx.len(), 1);

    Ok(())
}

#[test]
fn test_receive_peek_keeps_frame() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;
    mock.push_rx(CanMsg::encode(0x7DF, true, None, 0)?);

    let peeked = manager.receive_peek(0)?;
    assert!(peeked.is_remote());
    let read = manager.receive_wait(0)?;
    assert_eq!(peeked, read);
    assert_eq!(mock.call_names(), vec!["channel_peek", "channel_read"]);

    let err = manager.receive_peek(0).unwrap_err();
    assert_eq!(err.code(), VciCode::NO_DATA);

    Ok(())
}

#[test]
fn test_get_status() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let manager = connected(&mock, 0)?;
    let line = CanLineStatus::new(OperatingMode::STANDARD, BitrateRegisterPair::BITRATE_1000K, 37, ControllerStatus::TX_PENDING);
    mock.state().chan_status = CanChanStatus::new(line, true, false, 3, 0);

    let status = manager.get_status(0)?;
    assert!(status.is_activated());
    assert!(!status.is_rx_overrun());
    assert_eq!(status.rx_fifo_load(), 3);
    assert_eq!(status.line_status().bus_load(), 37);
    assert_eq!(status.line_status().bitrate(), BitrateRegisterPair::BITRATE_1000K);
    assert_eq!(status.line_status().status(), ControllerStatus::TX_PENDING);

    let err = manager.get_status(1).unwrap_err();
    assert_eq!(err.code(), VciCode::INVHANDLE);

    Ok(())
}

#[test]
fn test_end_to_end() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());

    manager.select_device(false, 0)?;
    manager.open_connection(0, BitrateRegisterPair::new(0x00, 0x14))?;
    manager.transmit(0, 0x123, false, Some(&[0xDE, 0xAD]), 2)?;
    manager.close(0)?;

    assert_eq!(*manager.session(0)?, Default::default());
    assert_eq!(mock.call_names()[mock.call_names().len() - 4..], [
        "control_reset", "channel_close", "control_close", "device_close",
    ]);

    Ok(())
}

#[test]
fn test_close_after_failed_open() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());
    manager.select_device(false, 0)?;
    mock.fail("control_open", VciCode::ACCESSDENIED)
        .fail("channel_close", VciCode::FAIL)
        .fail("device_close", VciCode::FAIL);

    assert!(manager.open_connection(0, BitrateRegisterPair::BITRATE_500K).is_err());
    mock.clear_calls();

    manager.close(0)?;
    assert!(manager.session(0)?.device().is_none());
    assert!(manager.session(0)?.channel().is_none());
    assert_eq!(manager.session(0)?.mode(), OperatingMode::empty());
    assert_eq!(mock.call_names(), vec!["channel_close", "device_close"]);

    Ok(())
}

#[test]
fn test_close_unassigned_slot() -> anyhow::Result<()> {
    let mock = MockVci::default();
    let mut manager = SessionManager::new(mock.clone());

    manager.close(9)?;
    assert!(mock.calls().is_empty());

    Ok(())
}

#[test]
fn test_diagnostics() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let sink = RecordingSink::default();
    let mut manager = SessionManager::new(mock.clone())
        .with_diagnostics(sink.clone());

    // validation errors stay silent
    assert!(manager.select_device(false, CAN_DEV_MAX).is_err());
    assert!(manager.open_connection(0, BitrateRegisterPair::BITRATE_500K).is_err());
    manager.select_device(false, 0)?;
    mock.fail("control_start", VciCode::INVALID_STATE);
    assert!(manager.open_connection(0, BitrateRegisterPair::BITRATE_500K).is_err());

    let reports = sink.0.lock().map_err(|e| anyhow::anyhow!("{}", e))?.clone();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].0, VciCode::INVHANDLE);
    assert_eq!(reports[1], (VciCode::INVALID_STATE, format!("mock: {}", VciCode::INVALID_STATE)));

    Ok(())
}

#[test]
fn test_noop_diagnostics_skip_formatter() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    let mut manager = SessionManager::new(mock.clone());

    assert!(manager.open_connection(0, BitrateRegisterPair::BITRATE_500K).is_err());
    assert!(mock.state().formatted.is_empty());
    assert_eq!(manager.format_error(VciCode::BUSY), format!("mock: {}", VciCode::BUSY));
    assert_eq!(manager.api().format_error(VciCode::OK), format!("mock: {}", VciCode::OK));

    Ok(())
}

#[test]
fn test_handles_not_shared() -> anyhow::Result<()> {
    let mock = MockVci::with_device();
    mock.state().picker = Some(VciId(42));
    let mut manager = SessionManager::new(mock.clone());
    for slot in [1, 2] {
        manager.select_device(true, slot)?;
        manager.open_connection(slot, BitrateRegisterPair::BITRATE_500K)?;
    }

    let a = *manager.session(1)?;
    let b = *manager.session(2)?;
    let handles = |s: ixxat_rs::Session| -> Vec<Option<Handle>> { vec![s.device(), s.channel(), s.control()] };
    for h in handles(a) {
        assert!(!handles(b).contains(&h));
    }

    Ok(())
}
