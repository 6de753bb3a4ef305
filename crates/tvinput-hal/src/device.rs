//! The TV input device operation table
//!
//! A hardware-specific implementation provides [`TvInputDevice`]; the
//! platform calls through it and receives notifications on the callback
//! registered with [`TvInputDevice::initialize`].
//!
//! # Lifecycle
//!
//! ```text
//! opened --initialize--> initialized --close--> closed
//! ```
//!
//! Per stream id: `closed --open_stream--> open --close_stream--> closed`.
//! A [`crate::Event::StreamConfigurationsChanged`] notification moves every
//! open stream of that device back to closed.
//!
//! # Extending
//!
//! New operations are added as provided methods gated on
//! [`TvInputDevice::api_version`], so implementations built against an older
//! version keep compiling and report the older version.

use crate::{ApiVersion, DeviceId, EventCallback, Stream, StreamConfig, StreamId};
use std::sync::Arc;

pub trait TvInputDevice: Send + Sync {
    /// Device API version implemented
    fn api_version(&self) -> ApiVersion;

    /// Register the notification callback and start operation
    ///
    /// No device is available before this call. Once it returns (or while
    /// it runs), a [`crate::Event::DeviceAvailable`] notification has been
    /// emitted for every device currently present, built-in ones included.
    fn initialize(&self, callback: Arc<dyn EventCallback>) -> crate::Result<()>;

    /// Current stream configurations of a device
    ///
    /// The returned set describes the device until the next call or until a
    /// configuration change is notified, whichever comes first.
    ///
    /// Fails with [`crate::HalError::InvalidArgument`] for an unknown device.
    fn get_stream_configurations(&self, device_id: DeviceId) -> crate::Result<Vec<StreamConfig>>;

    /// Open the stream of one configuration
    ///
    /// Fails with [`crate::HalError::Busy`] when another stream has to be
    /// closed first, [`crate::HalError::AlreadyOpen`] when the stream is
    /// open already and [`crate::HalError::InvalidArgument`] for unknown ids.
    fn open_stream(&self, device_id: DeviceId, stream_id: StreamId) -> crate::Result<Stream>;

    /// Close a stream opened with [`TvInputDevice::open_stream`]
    ///
    /// Fails with [`crate::HalError::NotFound`] when the stream is not open
    /// and [`crate::HalError::InvalidArgument`] for unknown ids. The handle
    /// returned by the matching open is obsolete afterwards.
    fn close_stream(&self, device_id: DeviceId, stream_id: StreamId) -> crate::Result<()>;

    /// Tear the device down
    fn close(&self) -> crate::Result<()> {
        Ok(())
    }
}
