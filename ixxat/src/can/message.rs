use std::fmt::{Display, Formatter};
use rs_can::{utils, Direct, Frame, Id, IdentifierFlags, MAX_FRAME_SIZE};
use crate::can::{CanMsg, CanMsgType};
use crate::error::VciError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanMessage {
    timestamp: u64,
    arbitration_id: u32,
    is_extended_id: bool,
    is_remote_frame: bool,
    is_error_frame: bool,
    channel: u8,
    length: usize,
    data: Vec<u8>,
    direct: Direct,
}

impl Frame for CanMessage {
    type Channel = u8;
    #[inline]
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let length = data.len();

        match length {
            0..=MAX_FRAME_SIZE => {
                let id: Id = id.into();
                Some(Self {
                    timestamp: 0,
                    arbitration_id: id.as_raw(),
                    is_extended_id: id.is_extended(),
                    is_remote_frame: false,
                    is_error_frame: false,
                    channel: Default::default(),
                    length,
                    data: data.to_vec(),
                    direct: Default::default(),
                })
            }
            _ => None,
        }
    }

    #[inline]
    fn new_remote(id: impl Into<Id>, len: usize) -> Option<Self> {
        match len {
            0..=MAX_FRAME_SIZE => {
                let id: Id = id.into();
                let mut data = Vec::new();
                utils::data_resize(&mut data, len);
                Some(Self {
                    timestamp: 0,
                    arbitration_id: id.as_raw(),
                    is_extended_id: id.is_extended(),
                    is_remote_frame: true,
                    is_error_frame: false,
                    channel: Default::default(),
                    length: len,
                    data,
                    direct: Default::default(),
                })
            }
            _ => None,
        }
    }

    #[inline]
    fn timestamp(&self) -> u64 {
        self.timestamp
    }

    #[inline]
    fn set_timestamp(&mut self, value: Option<u64>) -> &mut Self {
        self.timestamp = value.unwrap_or_else(utils::system_timestamp);
        self
    }

    #[inline]
    fn id(&self) -> Id {
        Id::from_bits(self.arbitration_id, Some(self.is_extended_id))
    }

    #[inline]
    fn is_remote(&self) -> bool {
        self.is_remote_frame
    }

    #[inline]
    fn is_extended(&self) -> bool {
        self.is_extended_id
    }

    #[inline]
    fn direct(&self) -> Direct {
        self.direct
    }

    #[inline]
    fn set_direct(&mut self, direct: Direct) -> &mut Self {
        self.direct = direct;
        self
    }

    #[inline]
    fn is_error_frame(&self) -> bool {
        self.is_error_frame
    }

    #[inline]
    fn set_error_frame(&mut self, value: bool) -> &mut Self {
        self.is_error_frame = value;
        self
    }

    #[inline]
    fn channel(&self) -> Self::Channel {
        self.channel
    }

    #[inline]
    fn set_channel(&mut self, value: Self::Channel) -> &mut Self {
        self.channel = value;
        self
    }

    #[inline]
    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    #[inline]
    fn length(&self) -> usize {
        self.length
    }
}

impl Display for CanMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <dyn Frame<Channel = u8> as Display>::fmt(self, f)
    }
}

impl TryFrom<&CanMessage> for CanMsg {
    type Error = VciError;

    /// The extended marker is carried as bit 31 so small extended identifiers keep their format.
    fn try_from(msg: &CanMessage) -> Result<Self, Self::Error> {
        let mut id = msg.arbitration_id;
        if msg.is_extended_id {
            id |= IdentifierFlags::EXTENDED.bits();
        }

        CanMsg::encode(id, msg.is_remote_frame, Some(msg.data()), msg.length)
    }
}

impl TryFrom<&CanMsg> for CanMessage {
    type Error = VciError;

    /// Only data frames carry a message, info/status/error frames yield [`VciError::NoData`].
    fn try_from(raw: &CanMsg) -> Result<Self, Self::Error> {
        match raw.info().msg_type() {
            Ok(CanMsgType::Data) => {},
            _ => return Err(VciError::NoData),
        }

        let info = raw.info();
        let data = raw.data();
        Ok(Self {
            timestamp: raw.time() as u64,
            arbitration_id: raw.msg_id(),
            is_extended_id: info.is_extended(),
            is_remote_frame: info.is_remote(),
            is_error_frame: false,
            channel: Default::default(),
            length: data.len(),
            data: data.to_vec(),
            direct: Direct::Receive,
        })
    }
}
