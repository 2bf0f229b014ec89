/// Errors shared by every driver of the workspace.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanError {
    #[error("RUST-CAN - device configuration error: {0}")]
    DeviceConfigError(String),
    #[error("RUST-CAN - device is not opened")]
    DeviceNotOpened,

    #[error("RUST-CAN - data length: {0} exceeds a classic frame")]
    DataOutOfRange(usize),

    #[error("RUST-CAN - channel: {0} is not opened")]
    ChannelNotOpened(String),

    #[error("RUST-CAN - driver operation failed: {0}")]
    OperationError(String),
    #[error("RUST-CAN - timeout on {0}")]
    TimeoutError(String),

    #[error("RUST-CAN - {0}")]
    OtherError(String),
}

impl CanError {
    #[inline]
    pub fn other_error<T: Into<String>>(msg: T) -> Self {
        Self::OtherError(msg.into())
    }

    /// Errors a caller may retry on, the driver stays usable.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TimeoutError(_))
    }
}
