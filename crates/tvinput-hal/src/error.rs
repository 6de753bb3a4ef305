//! HAL error type and status code mapping
//!
//! Every operation of the TV input contract reports failure through an
//! integer status: `0` on success, a negated errno value for the documented
//! failures, anything else for an unspecified failure. [`HalError`] is the
//! typed view of those codes.

use crate::version::ApiVersion;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HalError {
    /// Another stream has to be closed before this one can be opened
    #[error("Resource busy: close another stream first")]
    Busy,

    #[error("Stream already open")]
    AlreadyOpen,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The stream was not open
    #[error("Stream not open")]
    NotFound,

    #[error("Device not initialized")]
    NotInitialized,

    #[error("Device already initialized")]
    AlreadyInitialized,

    #[error("Device closed")]
    Closed,

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Unsupported API version {found}, supported up to {supported}")]
    UnsupportedVersion {
        found: ApiVersion,
        supported: ApiVersion,
    },

    #[error("Invalid hardware description: {0}")]
    Description(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown failure (status {0})")]
    Unknown(i32),
}

impl HalError {
    /// Raw status code for this error, as returned across the HAL boundary
    pub fn status(&self) -> i32 {
        match self {
            HalError::Busy => -libc::EBUSY,
            HalError::AlreadyOpen => -libc::EEXIST,
            HalError::InvalidArgument(_) => -libc::EINVAL,
            HalError::NotFound => -libc::ENOENT,
            HalError::NotInitialized | HalError::Closed => -libc::ENODEV,
            HalError::AlreadyInitialized => -libc::EALREADY,
            HalError::ModuleNotFound(_) => -libc::ENXIO,
            HalError::UnsupportedVersion { .. } => -libc::ENOSYS,
            HalError::Description(_) | HalError::Io(_) => -libc::EIO,
            // Zero would read as success
            HalError::Unknown(0) => -1,
            HalError::Unknown(code) => *code,
        }
    }

    /// Decode a raw status code
    ///
    /// Only the codes the contract documents are mapped to dedicated
    /// variants; every other non-zero value becomes [`HalError::Unknown`].
    pub fn from_status(status: i32) -> crate::Result<()> {
        if status == 0 {
            return Ok(());
        }

        let err = match -status {
            libc::EBUSY => HalError::Busy,
            libc::EEXIST => HalError::AlreadyOpen,
            libc::EINVAL => HalError::InvalidArgument(format!("status {status}")),
            libc::ENOENT => HalError::NotFound,
            _ => HalError::Unknown(status),
        };
        Err(err)
    }

    /// Shorthand for an invalid device id
    pub(crate) fn invalid_device(device_id: i32) -> Self {
        HalError::InvalidArgument(format!("unknown device id {device_id}"))
    }

    /// Shorthand for a stream id that is not part of the device's configurations
    pub(crate) fn invalid_stream(device_id: i32, stream_id: i32) -> Self {
        HalError::InvalidArgument(format!(
            "unknown stream id {stream_id} for device {device_id}"
        ))
    }
}

/// Collapse an operation result into its raw status code
pub fn status_of<T>(result: &crate::Result<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => err.status(),
    }
}
