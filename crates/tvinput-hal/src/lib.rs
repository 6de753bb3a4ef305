//! TV input Hardware Abstraction Layer (HAL)
//!
//! This crate defines the contract between the platform and TV input
//! hardware (HDMI ports, built-in tuners, passthrough inputs): the records
//! exchanged, the operation table a hardware implementation provides as
//! [`TvInputDevice`], and the notifications it sends back through an
//! [`EventCallback`].
//!
//! It also carries an in-memory reference implementation ([`mock`]) and a
//! consumer-side [`TvInputSession`] that keeps track of snapshots and open
//! streams the way the contract asks consumers to.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tvinput_hal::mock::{MockModule, MockProfile};
//! use tvinput_hal::{
//!     Event, ModuleRegistry, TvInputSession, TV_INPUT_DEFAULT_DEVICE,
//!     TV_INPUT_DEVICE_API_VERSION_0_1, TV_INPUT_HARDWARE_MODULE_ID,
//! };
//!
//! fn main() -> tvinput_hal::Result<()> {
//!     let mut registry = ModuleRegistry::new();
//!     registry.register(Arc::new(MockModule::new(MockProfile::TunerBox)));
//!
//!     let device = registry.open_device(
//!         TV_INPUT_HARDWARE_MODULE_ID,
//!         TV_INPUT_DEFAULT_DEVICE,
//!         TV_INPUT_DEVICE_API_VERSION_0_1,
//!     )?;
//!
//!     let session = TvInputSession::new(device);
//!     session.initialize(Arc::new(|event: &Event| println!("{event:?}")))?;
//!
//!     for info in session.available_devices() {
//!         for config in session.stream_configurations(info.device_id)? {
//!             let stream = session.open_stream(info.device_id, config.stream_id)?;
//!             println!("Opened {:?}", stream);
//!             session.close_stream(info.device_id, config.stream_id)?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod callback;
pub mod device;
pub mod error;
pub mod mock;
pub mod module;
pub mod session;
pub mod types;
pub mod version;

pub use callback::{EventCallback, EventSender, event_channel};
pub use device::TvInputDevice;
pub use error::{HalError, status_of};
pub use module::{
    HardwareModule, ModuleInfo, ModuleRegistry, TV_INPUT_DEFAULT_DEVICE,
    TV_INPUT_HARDWARE_MODULE_ID,
};
pub use session::TvInputSession;
pub use types::{
    DeviceId, DeviceInfo, Event, EventType, InputType, SidebandHandle, Stream, StreamConfig,
    StreamHandle, StreamId, StreamType,
};
pub use version::{
    ApiVersion, HAL_API_VERSION, TV_INPUT_DEVICE_API_VERSION_0_1, TV_INPUT_MODULE_API_VERSION_0_1,
};

/// HAL Result type
pub type Result<T> = std::result::Result<T, HalError>;
