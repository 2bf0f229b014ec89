//! **`rs-can`**, A unified CAN driver, just like [python-can](https://github.com/hardbyte/python-can)

mod device;
pub use device::*;
mod frame;
pub use frame::*;

pub mod constants;
pub use constants::*;
pub mod error;
pub use error::CanError;
pub mod utils;
