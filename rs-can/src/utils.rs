use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::{DEFAULT_PADDING, MAX_FRAME_SIZE};

/// resize data with default padding.
#[inline]
pub fn data_resize(data: &mut Vec<u8>, size: usize) {
    data.resize(size, DEFAULT_PADDING);
}

/// get CAN dlc, `None` when the length can't be carried by a classic frame.
#[inline]
pub fn can_dlc(length: usize) -> Option<u8> {
    match length {
        0..=MAX_FRAME_SIZE => Some(length as u8),
        _ => None,
    }
}

#[inline]
pub fn system_timestamp() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(v) => v.as_millis() as u64,
        Err(e) => {
            log::warn!("RUST-CAN - SystemTimeError: {0} when conversion failed!", e);
            0
        }
    }
}
