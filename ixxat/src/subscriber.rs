use std::sync::mpsc::Sender;
use rs_can::{Filter, Frame, Listener};
use crate::can::CanMessage;

/// Copies received frames into a channel. Dropping the subscriber closes the channel.
pub struct Subscriber {
    sender: Sender<CanMessage>,
    filters: Vec<Filter>,
}

impl Subscriber {
    pub fn new(sender: Sender<CanMessage>, filters: Vec<Filter>) -> Self {
        Self { sender, filters }
    }

    /// Without filters every frame passes, otherwise any one filter has to match.
    #[inline]
    pub fn accepts(&self, msg: &CanMessage) -> bool {
        self.filters.is_empty()
            || self.filters.iter().any(|f| f.matches(msg.id()))
    }
}

impl Listener<u8, CanMessage> for Subscriber {
    fn on_frame_received(&self, channel: u8, frames: &[CanMessage]) {
        for msg in frames.iter().filter(|m| self.accepts(m)) {
            if self.sender.send(msg.clone()).is_err() {
                log::debug!("IXXAT-VCI - channel: {} subscriber is gone", channel);
                break;
            }
        }
    }
}
