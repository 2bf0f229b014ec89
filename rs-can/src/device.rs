use std::{any::Any, collections::HashMap, fmt::Display};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use crate::error::CanError;
use crate::frame::{Frame, Id};

pub trait Listener<C, F: Frame>: Send {
    /// Callback when frame transmitting.
    fn on_frame_transmitting(&self, _channel: C, _frame: &F) {}
    /// Callback when frame transmit success.
    fn on_frame_transmitted(&self, _channel: C, _id: Id) {}
    /// Callback when frames received.
    fn on_frame_received(&self, channel: C, frames: &[F]);
}

pub trait Device: Clone + TryFrom<DeviceBuilder, Error = CanError> {
    type Channel: Display;
    type Frame: Frame<Channel = Self::Channel>;
    #[inline]
    fn is_closed(&self) -> bool {
        self.opened_channels().is_empty()
    }
    /// get all channels that has opened
    fn opened_channels(&self) -> Vec<Self::Channel>;
    /// Transmit a CAN Frame.
    fn transmit(&self, msg: Self::Frame, timeout: Option<u32>) -> Result<(), CanError>;
    /// Receive CAN Frames.
    fn receive(&self, channel: Self::Channel, timeout: Option<u32>) -> Result<Vec<Self::Frame>, CanError>;
    /// Close CAN device.
    fn shutdown(&mut self);
}

#[derive(Debug, Default, Deserialize, Serialize, Getters)]
pub struct ChannelConfig {
    #[getter(copy)]
    bitrate: u32,
    #[serde(skip)]
    others: HashMap<String, Box<dyn Any>>,
}

impl ChannelConfig {
    pub fn new(bitrate: u32) -> Self {
        Self {
            bitrate,
            ..Default::default()
        }
    }

    pub fn add_other(&mut self, name: &str, other: Box<dyn Any>) -> &mut Self {
        self.others.insert(name.into(), other);
        self
    }

    pub fn get_other<T: Clone + 'static>(&self, name: &str) -> Result<Option<T>, CanError> {
        get_other(&self.others, name)
    }
}

#[derive(Debug, Default, Getters)]
pub struct DeviceBuilder {
    interface: String,
    #[getter(rename = "channel_configs")]
    configs: HashMap<String, ChannelConfig>,
    others: HashMap<String, Box<dyn Any>>,
}

impl DeviceBuilder {
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.into(),
            ..Default::default()
        }
    }

    pub fn add_config<S: Into<String>>(&mut self, channel: S, cfg: ChannelConfig) -> &mut Self {
        self.configs.insert(channel.into(), cfg);
        self
    }

    pub fn add_other(&mut self, name: &str, cfg: Box<dyn Any>) -> &mut Self {
        self.others.insert(name.into(), cfg);
        self
    }

    pub fn get_other<T: Clone + 'static>(&self, name: &str) -> Result<Option<T>, CanError> {
        get_other(&self.others, name)
    }

    pub fn build<T: Device>(self) -> Result<T, CanError> {
        self.try_into()
    }
}

#[inline(always)]
fn get_other<T: Clone + 'static>(
    others: &HashMap<String, Box<dyn Any>>,
    name: &str
) -> Result<Option<T>, CanError> {
    match others.get(name)  {
        Some(v) => Ok(Some(
            v.downcast_ref::<T>()
                .ok_or(CanError::other_error(format!("type of `{}` mismatched", name)))?
                .clone()
        )),
        None => Ok(None),
    }
}
