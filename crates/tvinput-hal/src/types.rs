//! Data records exchanged across the TV input HAL boundary

use crate::HalError;
use serde::{Deserialize, Serialize};

/// Identifier of a physical TV input, assigned by the implementation
pub type DeviceId = i32;

/// Identifier of a stream configuration, relative to one device
pub type StreamId = i32;

/// Type of physical TV input
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Hdmi = 1,
    BuiltInTuner = 2,
    Passthrough = 3,
}

impl InputType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }

    pub fn name(&self) -> &'static str {
        match self {
            InputType::Hdmi => "hdmi",
            InputType::BuiltInTuner => "built_in_tuner",
            InputType::Passthrough => "passthrough",
        }
    }
}

impl TryFrom<i32> for InputType {
    type Error = HalError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(InputType::Hdmi),
            2 => Ok(InputType::BuiltInTuner),
            3 => Ok(InputType::Passthrough),
            _ => Err(HalError::InvalidArgument(format!("unknown input type {raw}"))),
        }
    }
}

/// Description of one physical input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: DeviceId,
    #[serde(rename = "type")]
    pub input_type: InputType,
}

impl DeviceInfo {
    pub fn new(device_id: DeviceId, input_type: InputType) -> Self {
        Self {
            device_id,
            input_type,
        }
    }
}

/// Raw event tag
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    DeviceAvailable = 1,
    DeviceUnavailable = 2,
    StreamConfigurationsChanged = 3,
}

impl EventType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for EventType {
    type Error = HalError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(EventType::DeviceAvailable),
            2 => Ok(EventType::DeviceUnavailable),
            3 => Ok(EventType::StreamConfigurationsChanged),
            _ => Err(HalError::InvalidArgument(format!("unknown event type {raw}"))),
        }
    }
}

/// Notification sent by the implementation to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A device became available
    DeviceAvailable(DeviceInfo),
    /// A device went away
    DeviceUnavailable { device_id: DeviceId },
    /// Every open stream on the device is closed and its configurations
    /// must be queried again before reopening
    StreamConfigurationsChanged { device_id: DeviceId },
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Event::DeviceAvailable(_) => EventType::DeviceAvailable,
            Event::DeviceUnavailable { .. } => EventType::DeviceUnavailable,
            Event::StreamConfigurationsChanged { .. } => EventType::StreamConfigurationsChanged,
        }
    }

    pub fn device_id(&self) -> DeviceId {
        match self {
            Event::DeviceAvailable(info) => info.device_id,
            Event::DeviceUnavailable { device_id }
            | Event::StreamConfigurationsChanged { device_id } => *device_id,
        }
    }
}

/// Type of a stream
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    /// Video delivered out of band through a sideband handle
    IndependentVideoSource = 1,
    /// Reserved, no implementation produces it yet
    BufferProducer = 2,
}

impl StreamType {
    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for StreamType {
    type Error = HalError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(StreamType::IndependentVideoSource),
            2 => Ok(StreamType::BufferProducer),
            _ => Err(HalError::InvalidArgument(format!("unknown stream type {raw}"))),
        }
    }
}

/// One streamable profile of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamConfig {
    pub stream_id: StreamId,
    #[serde(rename = "type", default = "default_stream_type")]
    pub stream_type: StreamType,
    pub max_video_width: u32,
    pub max_video_height: u32,
}

fn default_stream_type() -> StreamType {
    StreamType::IndependentVideoSource
}

impl StreamConfig {
    pub fn video(stream_id: StreamId, max_video_width: u32, max_video_height: u32) -> Self {
        Self {
            stream_id,
            stream_type: StreamType::IndependentVideoSource,
            max_video_width,
            max_video_height,
        }
    }
}

/// Opaque native handle of a sideband video source
///
/// Laid out like a native handle (file descriptors followed by integers).
/// Consumers pass it on to the video pipeline without looking inside.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SidebandHandle {
    fds: Vec<i32>,
    ints: Vec<i32>,
}

impl SidebandHandle {
    pub fn new(fds: Vec<i32>, ints: Vec<i32>) -> Self {
        Self { fds, ints }
    }

    pub fn fds(&self) -> &[i32] {
        &self.fds
    }

    pub fn ints(&self) -> &[i32] {
        &self.ints
    }
}

/// Data handed to the consumer for an open stream
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamHandle {
    Sideband(SidebandHandle),
}

/// An open stream
///
/// The handle stays valid until the stream is closed or the device reports a
/// configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub stream_id: StreamId,
    pub stream_type: StreamType,
    pub handle: StreamHandle,
}

impl Stream {
    pub fn sideband(stream_id: StreamId, handle: SidebandHandle) -> Self {
        Self {
            stream_id,
            stream_type: StreamType::IndependentVideoSource,
            handle: StreamHandle::Sideband(handle),
        }
    }

    pub fn sideband_handle(&self) -> Option<&SidebandHandle> {
        match &self.handle {
            StreamHandle::Sideband(handle) => Some(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_values() {
        assert_eq!(InputType::Hdmi.as_raw(), 1);
        assert_eq!(InputType::BuiltInTuner.as_raw(), 2);
        assert_eq!(InputType::Passthrough.as_raw(), 3);

        assert_eq!(EventType::DeviceAvailable.as_raw(), 1);
        assert_eq!(EventType::DeviceUnavailable.as_raw(), 2);
        assert_eq!(EventType::StreamConfigurationsChanged.as_raw(), 3);

        assert_eq!(StreamType::IndependentVideoSource.as_raw(), 1);
        assert_eq!(StreamType::BufferProducer.as_raw(), 2);
    }

    #[test]
    fn test_try_from_raw() {
        assert_eq!(InputType::try_from(2).unwrap(), InputType::BuiltInTuner);
        assert_eq!(
            EventType::try_from(3).unwrap(),
            EventType::StreamConfigurationsChanged
        );
        assert_eq!(
            StreamType::try_from(1).unwrap(),
            StreamType::IndependentVideoSource
        );

        assert!(matches!(
            InputType::try_from(0),
            Err(HalError::InvalidArgument(_))
        ));
        assert!(EventType::try_from(4).is_err());
        assert!(StreamType::try_from(-1).is_err());
    }

    #[test]
    fn test_event_accessors() {
        let available = Event::DeviceAvailable(DeviceInfo::new(4, InputType::Hdmi));
        assert_eq!(available.event_type(), EventType::DeviceAvailable);
        assert_eq!(available.device_id(), 4);

        let gone = Event::DeviceUnavailable { device_id: 7 };
        assert_eq!(gone.event_type(), EventType::DeviceUnavailable);
        assert_eq!(gone.device_id(), 7);

        let changed = Event::StreamConfigurationsChanged { device_id: 2 };
        assert_eq!(changed.event_type(), EventType::StreamConfigurationsChanged);
        assert_eq!(changed.device_id(), 2);
    }

    #[test]
    fn test_stream_sideband_handle() {
        let stream = Stream::sideband(3, SidebandHandle::new(vec![42], vec![1, 3]));

        assert_eq!(stream.stream_type, StreamType::IndependentVideoSource);
        let handle = stream.sideband_handle().unwrap();
        assert_eq!(handle.fds(), &[42]);
        assert_eq!(handle.ints(), &[1, 3]);
    }

    #[test]
    fn test_stream_config_toml() {
        let config: StreamConfig = toml::from_str(
            r#"
stream_id = 1
max_video_width = 1920
max_video_height = 1080
"#,
        )
        .expect("Failed to parse");

        assert_eq!(config, StreamConfig::video(1, 1920, 1080));
    }

    #[test]
    fn test_device_info_json() {
        let info = DeviceInfo::new(1, InputType::BuiltInTuner);
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, r#"{"device_id":1,"type":"built_in_tuner"}"#);
    }
}
