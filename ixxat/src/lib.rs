//! **`ixxat`**, IXXAT VCI driver of [rs-can](https://github.com/zhuyu4839/rust-can).

pub mod api;
pub mod can;
pub mod constant;
pub mod error;
mod driver;
pub use driver::*;
mod session;
pub use session::*;
mod subscriber;
pub use subscriber::*;
mod utils;

pub use error::{VciCode, VciError};
