mod bitrate;
mod frame;
mod message;
mod mode;

pub use bitrate::*;
pub use frame::*;
pub use message::*;
pub use mode::*;
